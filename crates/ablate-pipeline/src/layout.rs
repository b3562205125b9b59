use std::path::{Path, PathBuf};

use ablate_core::ExperimentConfig;
use sha2::{Digest, Sha256};

use crate::error::PipelineResult;

/// Canonical artifact locations for one experiment.
///
/// All paths are descendants of `root`. The root and `config_file` are
/// materialized eagerly by [`persist_config`]; the remaining artifacts are
/// created lazily by the stage that owns them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentPaths {
    pub root: PathBuf,
    pub dataset: PathBuf,
    pub weights: PathBuf,
    pub results: PathBuf,
    pub results_file: PathBuf,
    pub config_file: PathBuf,
}

/// Derives isolated experiment directories from configuration content.
///
/// Resolution is pure: the same source identity and configuration content
/// produce the same paths across process restarts and machines, which is what
/// lets a rerun recognize prior artifacts.
#[derive(Debug, Clone)]
pub struct ExperimentLayout {
    save_dir: PathBuf,
    source_stem: String,
}

impl ExperimentLayout {
    pub fn new(config_source: &Path, save_dir: &Path) -> Self {
        let source_stem = config_source
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("config")
            .to_string();
        Self { save_dir: save_dir.to_path_buf(), source_stem }
    }

    pub fn resolve(&self, config: &ExperimentConfig) -> PipelineResult<ExperimentPaths> {
        let digest = config_digest(config)?;
        let root = self.save_dir.join(format!("{}-{}", self.source_stem, &digest[..12]));
        Ok(ExperimentPaths {
            dataset: root.join("dataset.jsonl"),
            weights: root.join("weights"),
            results: root.join("results"),
            results_file: root.join("results").join("results.jsonl"),
            config_file: root.join("config.yml"),
            root,
        })
    }
}

/// Hex SHA-256 of the canonical YAML serialization of a configuration.
pub fn config_digest(config: &ExperimentConfig) -> PipelineResult<String> {
    let yaml = config.to_yaml()?;
    let digest = Sha256::digest(yaml.as_bytes());
    Ok(hex::encode(digest))
}

/// Materialize the experiment root and write the configuration to
/// `config_file`, before any stage runs.
///
/// The persisted copy is the checkpoint boundary: orchestration re-reads it,
/// so a retry after a crash reconstructs the same configuration from disk
/// even if the original input file has changed.
pub fn persist_config(paths: &ExperimentPaths, config: &ExperimentConfig) -> PipelineResult<()> {
    std::fs::create_dir_all(&paths.root)?;
    std::fs::write(&paths.config_file, config.to_yaml()?)?;
    Ok(())
}
