// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 stagelink contributors

//! Stage definition structures
//!
//! A stage is stored under `stages.<name>` in the pipeline file.

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::errors::{StagelinkError, StagelinkResult};

/// A single pipeline stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDefinition {
    /// Stage name, stored as the key in the pipeline file
    #[serde(skip)]
    pub name: String,

    /// Command to execute
    pub cmd: String,

    /// Dependencies (code, data)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub deps: Vec<String>,

    /// Parameter keys grouped by parameters file
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<BTreeMap<String, Vec<String>>>,

    /// Outputs (models, checkpoints)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outs: Vec<Output>,

    /// Metrics files
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metrics: Vec<Output>,

    /// Plots files or directories
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plots: Vec<Output>,

    /// Directory for live metrics logging
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live: Option<String>,
}

impl StageDefinition {
    pub fn new(name: impl Into<String>, cmd: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cmd: cmd.into(),
            deps: Vec::new(),
            params: Vec::new(),
            outs: Vec::new(),
            metrics: Vec::new(),
            plots: Vec::new(),
            live: None,
        }
    }

    /// Outputs whose content goes to the cache and must stay out of git
    pub fn cached_outputs(&self) -> impl Iterator<Item = &str> {
        self.outs
            .iter()
            .chain(&self.metrics)
            .chain(&self.plots)
            .filter(|out| out.is_cached())
            .map(Output::path)
    }

    /// Render as a pipeline file fragment, `<name>: {...}`
    pub fn to_pipeline_yaml(&self) -> StagelinkResult<String> {
        let mut fragment = Mapping::new();
        fragment.insert(Value::String(self.name.clone()), serde_yaml::to_value(self)?);
        Ok(serde_yaml::to_string(&fragment)?)
    }

    /// Write this stage into the pipeline file at `path`
    pub fn dump(&self, path: &Path) -> StagelinkResult<()> {
        let mut pipeline = PipelineFile::load(path)?;
        pipeline.upsert(self)?;
        pipeline.save()
    }

    /// Add every cached output to the `.gitignore` next to it
    ///
    /// Returns the `.gitignore` files that were changed.
    pub fn ignore_outs(&self, repo_root: &Path) -> StagelinkResult<Vec<PathBuf>> {
        let mut changed = Vec::new();
        for out in self.cached_outputs() {
            if let Some(gitignore) = ignore_path(repo_root, out)? {
                if !changed.contains(&gitignore) {
                    changed.push(gitignore);
                }
            }
        }
        Ok(changed)
    }
}

/// Append `/<file name>` for `out` to its directory's `.gitignore`
fn ignore_path(repo_root: &Path, out: &str) -> StagelinkResult<Option<PathBuf>> {
    let Some(relative) = relative_to_repo(repo_root, Path::new(out)) else {
        debug!("Not ignoring '{}': outside {}", out, repo_root.display());
        return Ok(None);
    };
    let full = repo_root.join(relative);
    let (Some(parent), Some(file_name)) = (full.parent(), full.file_name()) else {
        return Ok(None);
    };

    let entry = format!("/{}", file_name.to_string_lossy());
    let gitignore = parent.join(".gitignore");

    let existing = match std::fs::read_to_string(&gitignore) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => {
            return Err(StagelinkError::FileReadError {
                path: gitignore,
                error: e.to_string(),
            })
        }
    };

    if existing.lines().any(|line| line.trim() == entry) {
        return Ok(None);
    }

    let mut content = existing;
    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push_str(&entry);
    content.push('\n');

    std::fs::create_dir_all(parent).map_err(|e| StagelinkError::FileWriteError {
        path: parent.to_path_buf(),
        error: e.to_string(),
    })?;
    std::fs::write(&gitignore, content).map_err(|e| StagelinkError::FileWriteError {
        path: gitignore.clone(),
        error: e.to_string(),
    })?;

    debug!("Added '{}' to {}", entry, gitignore.display());
    Ok(Some(gitignore))
}

/// `out` normalised to a path strictly below `repo_root`
fn relative_to_repo(repo_root: &Path, out: &Path) -> Option<PathBuf> {
    let out = if out.is_absolute() {
        out.strip_prefix(repo_root).ok()?
    } else {
        out
    };

    let mut normalized = PathBuf::new();
    for component in out.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    return None;
                }
            }
            Component::RootDir | Component::Prefix(_) => return None,
        }
    }

    (!normalized.as_os_str().is_empty()).then_some(normalized)
}

/// Stage output, either a bare path or a path with flags
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Output {
    /// Cached output at a path
    Path(String),

    /// Output with explicit flags, `{<path>: {cache: false}}`
    Flagged(BTreeMap<String, OutputFlags>),
}

impl Output {
    /// Output that is not stored in the cache
    pub fn uncached(path: impl Into<String>) -> Self {
        Self::with_flags(
            path,
            OutputFlags {
                cache: Some(false),
                checkpoint: None,
            },
        )
    }

    /// Cached output that is overwritten by every checkpoint
    pub fn checkpoint(path: impl Into<String>) -> Self {
        Self::with_flags(
            path,
            OutputFlags {
                cache: None,
                checkpoint: Some(true),
            },
        )
    }

    fn with_flags(path: impl Into<String>, flags: OutputFlags) -> Self {
        let mut map = BTreeMap::new();
        map.insert(path.into(), flags);
        Self::Flagged(map)
    }

    /// Path of the output
    pub fn path(&self) -> &str {
        match self {
            Self::Path(p) => p,
            Self::Flagged(map) => map.keys().next().map(String::as_str).unwrap_or_default(),
        }
    }

    /// Whether the output goes to the cache
    pub fn is_cached(&self) -> bool {
        match self {
            Self::Path(_) => true,
            Self::Flagged(map) => map.values().all(|flags| flags.cache != Some(false)),
        }
    }
}

/// Per-output flags
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputFlags {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<bool>,
}

/// A pipeline file on disk
///
/// Kept as a raw YAML document so that stages and keys this crate does
/// not model survive a rewrite unchanged.
#[derive(Debug, Clone)]
pub struct PipelineFile {
    path: PathBuf,
    document: Mapping,
    exists: bool,
}

impl PipelineFile {
    /// Load the pipeline file; a missing file is an empty pipeline
    pub fn load(path: &Path) -> StagelinkResult<Self> {
        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                document: Mapping::new(),
                exists: false,
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| StagelinkError::FileReadError {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let document = match serde_yaml::from_str::<Value>(&content)? {
            Value::Null => Mapping::new(),
            Value::Mapping(mapping) => mapping,
            _ => {
                return Err(StagelinkError::InvalidPipeline {
                    path: path.to_path_buf(),
                    reason: "top level must be a mapping".into(),
                })
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            document,
            exists: true,
        })
    }

    /// Location the file is saved to
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the file was present when loaded
    pub fn exists(&self) -> bool {
        self.exists
    }

    fn stages(&self) -> Option<&Mapping> {
        self.document.get("stages").and_then(Value::as_mapping)
    }

    /// Names of all stages, in file order
    pub fn stage_names(&self) -> Vec<String> {
        self.stages()
            .map(|stages| {
                stages
                    .keys()
                    .filter_map(|k| k.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains_stage(&self, name: &str) -> bool {
        self.stages().is_some_and(|stages| stages.contains_key(name))
    }

    /// Get a stage by name
    pub fn get_stage(&self, name: &str) -> StagelinkResult<Option<StageDefinition>> {
        let Some(value) = self.stages().and_then(|stages| stages.get(name)) else {
            return Ok(None);
        };
        let mut stage: StageDefinition = serde_yaml::from_value(value.clone())?;
        stage.name = name.to_string();
        Ok(Some(stage))
    }

    /// Insert the stage, replacing one with the same name in place
    pub fn upsert(&mut self, stage: &StageDefinition) -> StagelinkResult<()> {
        let value = serde_yaml::to_value(stage)?;

        let stages = self
            .document
            .entry(Value::String("stages".into()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));

        if stages.is_null() {
            *stages = Value::Mapping(Mapping::new());
        }

        let Some(stages) = stages.as_mapping_mut() else {
            return Err(StagelinkError::InvalidPipeline {
                path: self.path.clone(),
                reason: "'stages' must be a mapping".into(),
            });
        };

        stages.insert(Value::String(stage.name.clone()), value);
        Ok(())
    }

    /// Serialize pipeline to YAML
    pub fn to_yaml(&self) -> StagelinkResult<String> {
        serde_yaml::to_string(&self.document).map_err(Into::into)
    }

    /// Write the pipeline back to its path
    pub fn save(&mut self) -> StagelinkResult<()> {
        let yaml = self.to_yaml()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| StagelinkError::FileWriteError {
                path: parent.to_path_buf(),
                error: e.to_string(),
            })?;
        }

        std::fs::write(&self.path, yaml).map_err(|e| StagelinkError::FileWriteError {
            path: self.path.clone(),
            error: e.to_string(),
        })?;

        self.exists = true;
        debug!("Wrote {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_stage() -> StageDefinition {
        let mut stage = StageDefinition::new("train", "python src/train.py");
        stage.deps = vec!["src".into(), "data".into()];
        stage.outs = vec![Output::Path("models".into())];
        stage.metrics = vec![Output::uncached("metrics.json")];
        stage.plots = vec![Output::uncached("plots")];
        stage
    }

    #[test]
    fn test_parse_stage_outputs() {
        let yaml = r#"
stages:
  train:
    cmd: python train.py
    deps:
      - data
    outs:
      - models:
          checkpoint: true
    metrics:
      - metrics.json:
          cache: false
"#;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(&path, yaml).unwrap();

        let pipeline = PipelineFile::load(&path).unwrap();
        let stage = pipeline.get_stage("train").unwrap().unwrap();

        assert_eq!(stage.name, "train");
        assert_eq!(stage.outs, vec![Output::checkpoint("models")]);
        assert_eq!(stage.metrics[0].path(), "metrics.json");
        assert!(!stage.metrics[0].is_cached());
        assert!(stage.outs[0].is_cached());
    }

    #[test]
    fn test_fragment_omits_empty_fields() {
        let stage = StageDefinition::new("prepare", "make data");
        let yaml = stage.to_pipeline_yaml().unwrap();

        assert!(yaml.starts_with("prepare:"));
        assert!(yaml.contains("cmd: make data"));
        assert!(!yaml.contains("deps"));
        assert!(!yaml.contains("live"));
    }

    #[test]
    fn test_dump_preserves_other_stages() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(
            &path,
            "vars:\n  - config.yaml\nstages:\n  prepare:\n    cmd: make data\n    frozen: true\n",
        )
        .unwrap();

        sample_stage().dump(&path).unwrap();

        let pipeline = PipelineFile::load(&path).unwrap();
        assert_eq!(pipeline.stage_names(), vec!["prepare", "train"]);

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("frozen: true"));
        assert!(content.starts_with("vars:"));
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline.yaml");

        let mut pipeline = PipelineFile::load(&path).unwrap();
        assert!(!pipeline.exists());
        pipeline.upsert(&StageDefinition::new("a", "one")).unwrap();
        pipeline.upsert(&StageDefinition::new("b", "two")).unwrap();
        pipeline.upsert(&StageDefinition::new("a", "three")).unwrap();
        pipeline.save().unwrap();

        let reloaded = PipelineFile::load(&path).unwrap();
        assert!(reloaded.exists());
        assert_eq!(reloaded.path(), path.as_path());
        assert_eq!(reloaded.stage_names(), vec!["a", "b"]);
        assert_eq!(reloaded.get_stage("a").unwrap().unwrap().cmd, "three");
    }

    #[test]
    fn test_load_rejects_non_mapping() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(&path, "- just\n- a list\n").unwrap();

        assert!(matches!(
            PipelineFile::load(&path),
            Err(StagelinkError::InvalidPipeline { .. })
        ));
    }

    #[test]
    fn test_ignore_outs_only_cached() {
        let dir = TempDir::new().unwrap();
        let stage = sample_stage();

        let changed = stage.ignore_outs(dir.path()).unwrap();
        assert_eq!(changed, vec![dir.path().join(".gitignore")]);

        let content = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content, "/models\n");
    }

    #[test]
    fn test_ignore_outs_is_idempotent_and_nested() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(".gitignore"), "/target").unwrap();

        let mut stage = StageDefinition::new("train", "python train.py");
        stage.outs = vec![
            Output::Path("models".into()),
            Output::checkpoint("out/model.pkl"),
        ];

        stage.ignore_outs(dir.path()).unwrap();
        let changed = stage.ignore_outs(dir.path()).unwrap();
        assert!(changed.is_empty());

        let root = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(root, "/target\n/models\n");

        let nested = std::fs::read_to_string(dir.path().join("out").join(".gitignore")).unwrap();
        assert_eq!(nested, "/model.pkl\n");
    }

    #[test]
    fn test_ignore_outs_skips_paths_outside_repo() {
        let outer = TempDir::new().unwrap();
        let repo = outer.path().join("repo");
        let external = outer.path().join("external");
        std::fs::create_dir_all(&repo).unwrap();

        let mut stage = StageDefinition::new("train", "python train.py");
        stage.outs = vec![
            Output::Path(external.join("model.pkl").to_string_lossy().into_owned()),
            Output::Path(".".into()),
            Output::Path("./".into()),
            Output::Path("../shared/data".into()),
            Output::Path("models/../..".into()),
        ];

        let changed = stage.ignore_outs(&repo).unwrap();
        assert!(changed.is_empty());
        assert!(!external.join(".gitignore").exists());
        assert!(!outer.path().join(".gitignore").exists());
        assert!(!repo.join(".gitignore").exists());
    }

    #[test]
    fn test_ignore_outs_normalizes_paths_inside_repo() {
        let dir = TempDir::new().unwrap();

        let mut stage = StageDefinition::new("train", "python train.py");
        stage.outs = vec![
            Output::Path(dir.path().join("models").to_string_lossy().into_owned()),
            Output::Path("./out/../out/model.pkl".into()),
        ];

        stage.ignore_outs(dir.path()).unwrap();

        let root = std::fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(root, "/models\n");
        let nested = std::fs::read_to_string(dir.path().join("out").join(".gitignore")).unwrap();
        assert_eq!(nested, "/model.pkl\n");
    }
}
