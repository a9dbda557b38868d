// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! Init command - add a stage to the pipeline file

use colored::Colorize;
use miette::Result;

use super::StageArgs;
use crate::config::Config;
use crate::stage::{self, InitOptions, StageType, TerminalPrompter};
use crate::utils::print_success;

/// Run the init command
pub fn run(
    name: Option<String>,
    stage_type: StageType,
    interactive: bool,
    force: bool,
    values: StageArgs,
    verbose: bool,
) -> Result<()> {
    let repo_root = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
    let config = Config::load(&repo_root)?;

    let options = InitOptions {
        name,
        stage_type,
        defaults: config.defaults.to_values(),
        overrides: values.to_values(),
        interactive,
        force,
    };

    let mut prompter = TerminalPrompter::new();
    let stage = stage::init(&repo_root, &config.pipeline.file, options, &mut prompter)?;

    println!();
    print_success(&format!(
        "Added stage '{}' to {}",
        stage.name,
        config.pipeline.file.display()
    ));

    let ignored: Vec<&str> = stage.cached_outputs().collect();
    if !ignored.is_empty() {
        print_success(&format!("Ignored {} in git", ignored.join(", ")));
    }

    println!();
    println!("Next steps:");
    println!(
        "  1. Review the stage in {}",
        config.pipeline.file.display().to_string().cyan()
    );
    println!("  2. Commit the pipeline file and .gitignore changes");
    println!();

    if verbose {
        println!("{}", "Generated stage:".dimmed());
        println!("{}", "─".repeat(50).dimmed());
        println!("{}", stage.to_pipeline_yaml()?.dimmed());
    }

    Ok(())
}
