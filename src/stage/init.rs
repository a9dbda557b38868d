// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! Stage init wizard
//!
//! Turns defaults, explicit overrides and (optionally) prompted answers
//! into a stage, writes it to the pipeline file and ignores its outputs.

use colored::Colorize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

use super::definition::{Output, PipelineFile, StageDefinition};
use super::params::load_param_keys;
use super::prompt::Prompter;
use super::{validate_stage_name, StageKey, StageType, StageValues};
use crate::errors::{StagelinkError, StagelinkResult};

const PRIMARY_KEYS: [StageKey; 5] = [
    StageKey::Cmd,
    StageKey::Code,
    StageKey::Data,
    StageKey::Models,
    StageKey::Params,
];

/// Options for [`init`]
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    /// Stage name, defaults to the stage type's name
    pub name: Option<String>,
    pub stage_type: StageType,
    /// Fallback values, shown as prompt defaults
    pub defaults: StageValues,
    /// Values given explicitly; never prompted for
    pub overrides: StageValues,
    pub interactive: bool,
    /// Replace an existing stage of the same name
    pub force: bool,
}

/// Ask for every key not already provided
///
/// Returns the answered values. When nothing needs asking the result is
/// empty, so no defaults apply at all.
pub fn init_interactive(
    name: &str,
    pipeline_file: &str,
    defaults: &StageValues,
    provided: &StageValues,
    show_tree: bool,
    live: bool,
    prompter: &mut dyn Prompter,
) -> StagelinkResult<StageValues> {
    let secondary_keys: &[StageKey] = if live {
        &[StageKey::Live]
    } else {
        &[StageKey::Metrics, StageKey::Plots]
    };

    let primary: Vec<StageKey> = PRIMARY_KEYS
        .into_iter()
        .filter(|k| !provided.contains_key(k))
        .collect();
    let secondary: Vec<StageKey> = secondary_keys
        .iter()
        .copied()
        .filter(|k| !provided.contains_key(k))
        .collect();

    if primary.is_empty() && secondary.is_empty() {
        return Ok(StageValues::new());
    }

    prompter.note(&format!(
        "This command will guide you to set up a {} stage in {}.\n",
        name.bright_blue(),
        pipeline_file.green()
    ));

    if show_tree {
        let mut workspace: StageValues = defaults.clone();
        workspace.extend(provided.iter().map(|(k, v)| (*k, v.clone())));
        workspace.remove(&StageKey::Cmd);
        if !live && !provided.contains_key(&StageKey::Live) {
            workspace.remove(&StageKey::Live);
        }

        let mut values: Vec<&String> = workspace.values().collect();
        values.sort();

        let mut tree = String::from("stagelink assumes the following workspace structure:");
        for value in values {
            tree.push_str(&format!("\n├── {}", value.green()));
        }
        tree.push('\n');
        prompter.note(&tree);
    }

    let mut answers = StageValues::new();
    for key in primary.into_iter().chain(secondary) {
        let default = defaults.get(&key).map(String::as_str);
        if let Some(value) = prompter.ask(key, default)? {
            answers.insert(key, value);
        }
    }

    Ok(answers)
}

/// Create a stage and write it into the pipeline file
///
/// `pipeline_file` is relative to `repo_root`, as are all paths in the
/// resulting stage.
pub fn init(
    repo_root: &Path,
    pipeline_file: &Path,
    options: InitOptions,
    prompter: &mut dyn Prompter,
) -> StagelinkResult<StageDefinition> {
    let name = options
        .name
        .clone()
        .unwrap_or_else(|| options.stage_type.to_string());
    validate_stage_name(&name)?;

    let pipeline_display = pipeline_file.display().to_string();
    let mut pipeline = PipelineFile::load(&repo_root.join(pipeline_file))?;

    if !options.force && pipeline.exists() && pipeline.contains_stage(&name) {
        return Err(StagelinkError::DuplicateStage {
            stage: name,
            file: pipeline_display,
        });
    }

    let live = options.stage_type == StageType::Live;
    let mut defaults = options.defaults;
    if options.interactive {
        defaults = init_interactive(
            &name,
            &pipeline_display,
            &defaults,
            &options.overrides,
            true,
            live,
            prompter,
        )?;
    } else if live {
        // Live stages log metrics themselves unless asked otherwise
        defaults.remove(&StageKey::Metrics);
        defaults.remove(&StageKey::Params);
    } else {
        defaults.remove(&StageKey::Live);
    }

    let mut context = defaults;
    context.extend(options.overrides);
    debug!("Stage '{}' context: {:?}", name, context);

    let stage = build_stage(repo_root, &name, &context)?;

    if options.interactive {
        prompter.note(&"─".repeat(50).green().to_string());
        prompter.note(&stage.to_pipeline_yaml()?);
        if !prompter.confirm(&format!(
            "Do you want to add the above contents to {}?",
            pipeline_display
        ))? {
            return Err(StagelinkError::Aborted);
        }
    }

    pipeline.upsert(&stage)?;
    pipeline.save()?;
    debug!("Wrote {}", pipeline.path().display());
    info!("Added stage '{}' to {}", name, pipeline_display);

    for gitignore in stage.ignore_outs(repo_root)? {
        info!("Updated {}", gitignore.display());
    }

    Ok(stage)
}

fn build_stage(repo_root: &Path, name: &str, context: &StageValues) -> StagelinkResult<StageDefinition> {
    let get = |key: StageKey| context.get(&key).filter(|v| !v.is_empty()).cloned();

    let cmd = get(StageKey::Cmd)
        .ok_or_else(|| StagelinkError::invalid_stage(name, "a command is required"))?;
    let mut stage = StageDefinition::new(name, cmd);

    stage.deps = [StageKey::Code, StageKey::Data]
        .into_iter()
        .filter_map(get)
        .collect();

    if let Some(params) = get(StageKey::Params) {
        let keys = load_param_keys(&repo_root.join(&params), name)?;
        let mut group = BTreeMap::new();
        group.insert(params, keys);
        stage.params = vec![group];
    }

    stage.metrics = get(StageKey::Metrics).map(Output::uncached).into_iter().collect();
    stage.plots = get(StageKey::Plots).map(Output::uncached).into_iter().collect();
    stage.live = get(StageKey::Live);

    if let Some(models) = get(StageKey::Models) {
        // With live logging every checkpoint overwrites the model output
        stage.outs = vec![if stage.live.is_some() {
            Output::checkpoint(models)
        } else {
            Output::Path(models)
        }];
    }

    Ok(stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::prompt::tests::ScriptedPrompter;
    use tempfile::TempDir;

    const PIPELINE: &str = "pipeline.yaml";

    fn values(pairs: &[(StageKey, &str)]) -> StageValues {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    fn all_defaults() -> StageValues {
        values(&[
            (StageKey::Code, "src"),
            (StageKey::Data, "data"),
            (StageKey::Models, "models"),
            (StageKey::Params, "params.yaml"),
            (StageKey::Metrics, "metrics.json"),
            (StageKey::Plots, "plots"),
            (StageKey::Live, "live"),
        ])
    }

    fn repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("params.yaml"), "lr: 0.1\nepochs: 5\n").unwrap();
        dir
    }

    #[test]
    fn test_non_interactive_default_stage() {
        let dir = repo();
        let mut prompter = ScriptedPrompter::new(&[]);

        let stage = init(
            dir.path(),
            Path::new(PIPELINE),
            InitOptions {
                name: Some("train".into()),
                defaults: all_defaults(),
                overrides: values(&[(StageKey::Cmd, "python src/train.py")]),
                ..Default::default()
            },
            &mut prompter,
        )
        .unwrap();

        assert_eq!(stage.cmd, "python src/train.py");
        assert_eq!(stage.deps, vec!["src", "data"]);
        assert_eq!(stage.outs, vec![Output::Path("models".into())]);
        assert_eq!(stage.metrics, vec![Output::uncached("metrics.json")]);
        assert_eq!(stage.plots, vec![Output::uncached("plots")]);
        assert_eq!(stage.live, None);
        assert_eq!(
            stage.params[0].get("params.yaml").unwrap(),
            &vec!["lr".to_string(), "epochs".to_string()]
        );
        assert!(prompter.prompts.is_empty());

        let pipeline = PipelineFile::load(&dir.path().join(PIPELINE)).unwrap();
        assert_eq!(pipeline.get_stage("train").unwrap().unwrap(), stage);

        let gitignore = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(gitignore, "/models\n");
    }

    #[test]
    fn test_non_interactive_live_stage() {
        let dir = repo();
        let mut prompter = ScriptedPrompter::new(&[]);

        let stage = init(
            dir.path(),
            Path::new(PIPELINE),
            InitOptions {
                stage_type: StageType::Live,
                defaults: all_defaults(),
                overrides: values(&[(StageKey::Cmd, "python train.py")]),
                ..Default::default()
            },
            &mut prompter,
        )
        .unwrap();

        assert_eq!(stage.name, "live");
        assert!(stage.metrics.is_empty());
        assert!(stage.params.is_empty());
        assert_eq!(stage.live.as_deref(), Some("live"));
        assert_eq!(stage.outs, vec![Output::checkpoint("models")]);
    }

    #[test]
    fn test_live_stage_keeps_explicit_metrics() {
        let dir = repo();
        let mut prompter = ScriptedPrompter::new(&[]);

        let stage = init(
            dir.path(),
            Path::new(PIPELINE),
            InitOptions {
                stage_type: StageType::Live,
                defaults: all_defaults(),
                overrides: values(&[
                    (StageKey::Cmd, "python train.py"),
                    (StageKey::Metrics, "scores.json"),
                ]),
                ..Default::default()
            },
            &mut prompter,
        )
        .unwrap();

        assert_eq!(stage.metrics, vec![Output::uncached("scores.json")]);
    }

    #[test]
    fn test_missing_cmd_is_invalid() {
        let dir = repo();
        let mut prompter = ScriptedPrompter::new(&[]);

        let result = init(
            dir.path(),
            Path::new(PIPELINE),
            InitOptions {
                defaults: all_defaults(),
                ..Default::default()
            },
            &mut prompter,
        );

        assert!(matches!(result, Err(StagelinkError::InvalidStage { .. })));
        assert!(!dir.path().join(PIPELINE).exists());
    }

    #[test]
    fn test_duplicate_stage_requires_force() {
        let dir = repo();
        std::fs::write(
            dir.path().join(PIPELINE),
            "stages:\n  train:\n    cmd: echo old\n",
        )
        .unwrap();

        let options = InitOptions {
            name: Some("train".into()),
            overrides: values(&[(StageKey::Cmd, "echo new")]),
            ..Default::default()
        };

        let mut prompter = ScriptedPrompter::new(&[]);
        match init(dir.path(), Path::new(PIPELINE), options.clone(), &mut prompter) {
            Err(StagelinkError::DuplicateStage { stage, file }) => {
                assert_eq!(stage, "train");
                assert_eq!(file, PIPELINE);
            }
            other => panic!("expected duplicate stage error, got {:?}", other),
        }

        let forced = InitOptions {
            force: true,
            ..options
        };
        init(dir.path(), Path::new(PIPELINE), forced, &mut prompter).unwrap();

        let pipeline = PipelineFile::load(&dir.path().join(PIPELINE)).unwrap();
        assert_eq!(pipeline.get_stage("train").unwrap().unwrap().cmd, "echo new");
    }

    #[test]
    fn test_invalid_name_rejected() {
        let dir = repo();
        let mut prompter = ScriptedPrompter::new(&[]);

        let result = init(
            dir.path(),
            Path::new(PIPELINE),
            InitOptions {
                name: Some("a/b".into()),
                overrides: values(&[(StageKey::Cmd, "echo")]),
                ..Default::default()
            },
            &mut prompter,
        );
        assert!(matches!(result, Err(StagelinkError::InvalidStage { .. })));
    }

    #[test]
    fn test_interactive_asks_missing_keys_in_order() {
        let mut prompter = ScriptedPrompter::new(&["python train.py", "", "n", "", "", "", ""]);
        let provided = values(&[(StageKey::Code, "lib")]);

        let answers = init_interactive(
            "train",
            PIPELINE,
            &all_defaults(),
            &provided,
            false,
            false,
            &mut prompter,
        )
        .unwrap();

        // cmd, data, models, params, metrics, plots
        assert_eq!(prompter.prompts.len(), 6);
        assert!(prompter.prompts[0].starts_with("Command to execute"));
        assert!(prompter.prompts[4].starts_with("Path to a metrics file"));

        assert_eq!(
            answers,
            values(&[
                (StageKey::Cmd, "python train.py"),
                (StageKey::Data, "data"),
                (StageKey::Params, "params.yaml"),
                (StageKey::Metrics, "metrics.json"),
                (StageKey::Plots, "plots"),
            ])
        );
    }

    #[test]
    fn test_interactive_nothing_to_ask() {
        let mut prompter = ScriptedPrompter::new(&[]);
        let provided = values(&[
            (StageKey::Cmd, "echo"),
            (StageKey::Code, "src"),
            (StageKey::Data, "data"),
            (StageKey::Models, "models"),
            (StageKey::Params, "params.yaml"),
            (StageKey::Live, "live"),
        ]);

        let answers = init_interactive(
            "train",
            PIPELINE,
            &all_defaults(),
            &provided,
            true,
            true,
            &mut prompter,
        )
        .unwrap();

        assert!(answers.is_empty());
        assert!(prompter.notes.is_empty());
    }

    #[test]
    fn test_interactive_tree_hides_live_for_default_stage() {
        let mut prompter = ScriptedPrompter::new(&["echo", "n", "n", "n", "n", "n", "n"]);

        init_interactive(
            "train",
            PIPELINE,
            &all_defaults(),
            &StageValues::new(),
            true,
            false,
            &mut prompter,
        )
        .unwrap();

        let tree = &prompter.notes[1];
        assert!(tree.contains("metrics.json"));
        assert!(tree.contains("src"));
        assert!(!tree.contains("live"));
    }

    #[test]
    fn test_interactive_init_writes_after_confirmation() {
        let dir = repo();
        let mut prompter =
            ScriptedPrompter::new(&["python train.py", "n", "n", "", "n", "n", "n", "y"]);

        let stage = init(
            dir.path(),
            Path::new(PIPELINE),
            InitOptions {
                name: Some("train".into()),
                defaults: all_defaults(),
                interactive: true,
                ..Default::default()
            },
            &mut prompter,
        )
        .unwrap();

        assert!(stage.deps.is_empty());
        assert_eq!(stage.outs, vec![Output::Path("models".into())]);
        assert!(stage.metrics.is_empty());
        assert!(prompter.notes.iter().any(|n| n.contains("cmd: python train.py")));
        assert!(dir.path().join(PIPELINE).exists());
    }

    #[test]
    fn test_interactive_init_declined() {
        let dir = repo();
        let mut prompter = ScriptedPrompter::new(&["echo", "n", "n", "n", "n", "n", "n", "no"]);

        let result = init(
            dir.path(),
            Path::new(PIPELINE),
            InitOptions {
                defaults: all_defaults(),
                interactive: true,
                ..Default::default()
            },
            &mut prompter,
        );

        assert!(matches!(result, Err(StagelinkError::Aborted)));
        assert!(!dir.path().join(PIPELINE).exists());
        assert!(!dir.path().join(".gitignore").exists());
    }
}
