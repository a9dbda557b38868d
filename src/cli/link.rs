// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! Link command - place a file using the configured link types

use miette::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::errors::{RecoverySuggestion, StagelinkError};
use crate::link::{LinkTypes, Linker};
use crate::utils::{print_error, print_success};

/// Run the link command
pub fn run(
    source: PathBuf,
    target: PathBuf,
    link_types: Option<LinkTypes>,
    verbose: bool,
) -> Result<()> {
    let link_types = match link_types {
        Some(types) => types,
        None => {
            let working_dir = std::env::current_dir()
                .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
            Config::load(&working_dir)?.cache.link_types
        }
    };

    if verbose {
        println!("Trying link types: {}", link_types);
    }

    let linker = Linker::new(link_types);
    match linker.link(&source, &target) {
        Ok(used) => {
            print_success(&format!(
                "{} -> {} ({})",
                source.display(),
                target.display(),
                used
            ));
            Ok(())
        }
        Err(StagelinkError::Filesystem(err)) => {
            print_error(&format!("Failed to link {}", target.display()));

            let last = linker.types().as_slice().last().copied();
            if let Some(suggestion) = last.and_then(|t| RecoverySuggestion::for_link_failure(t, &err)) {
                eprintln!();
                eprintln!("{}", suggestion.format());
            }

            Err(StagelinkError::Filesystem(err).into())
        }
        Err(e) => Err(e.into()),
    }
}
