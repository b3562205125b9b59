use std::path::{Path, PathBuf};

use ablate_core::{expand_ablation, ExperimentConfig, ValidationFailure};
use serde_yaml::Value;

use crate::error::{PipelineError, PipelineResult};
use crate::layout::{persist_config, ExperimentLayout};
use crate::orchestrator::PipelineOrchestrator;
use crate::progress::{PipelineEvent, ProgressSink};
use crate::stages::StageFactory;

/// Outcome of one sweep member, in enumeration order.
#[derive(Debug)]
pub struct SweepOutcome {
    pub index: usize,
    pub root: Option<PathBuf>,
    pub status: SweepStatus,
}

#[derive(Debug)]
pub enum SweepStatus {
    Completed,
    ValidationFailed(ValidationFailure),
    Failed(PipelineError),
}

#[derive(Debug, Default)]
pub struct SweepReport {
    pub outcomes: Vec<SweepOutcome>,
}

impl SweepReport {
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| matches!(o.status, SweepStatus::Completed))
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| matches!(o.status, SweepStatus::Completed)).count()
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.completed()
    }
}

/// Top-level driver: expands an experiment description into concrete
/// configurations and runs each through the staged pipeline, strictly
/// sequentially.
///
/// A member that fails validation is reported and skipped; it is never
/// persisted or run. A member whose stage fails is recorded with its stage
/// and the sweep moves on to the next member. Either way the report carries
/// the failure for the caller's exit-code policy.
pub struct SweepRunner<'a> {
    factory: &'a dyn StageFactory,
    progress: &'a dyn ProgressSink,
}

impl<'a> SweepRunner<'a> {
    pub fn new(factory: &'a dyn StageFactory, progress: &'a dyn ProgressSink) -> Self {
        Self { factory, progress }
    }

    pub async fn run_all(&self, config_path: &Path) -> PipelineResult<SweepReport> {
        let text = std::fs::read_to_string(config_path)?;
        let raw: Value = serde_yaml::from_str(&text)?;
        let candidates = expand_ablation(&raw).map_err(PipelineError::Config)?;
        let total = candidates.len();
        tracing::info!(experiments = total, config = %config_path.display(), "expanded experiment description");

        let mut report = SweepReport::default();
        for (index, candidate) in candidates.into_iter().enumerate() {
            report.outcomes.push(self.run_candidate(config_path, index, total, candidate).await);
        }
        Ok(report)
    }

    async fn run_candidate(
        &self,
        config_path: &Path,
        index: usize,
        total: usize,
        candidate: Value,
    ) -> SweepOutcome {
        let config = match ExperimentConfig::from_value(candidate) {
            Ok(config) => config,
            Err(failure) => {
                tracing::warn!(sweep_index = index, "configuration failed validation, skipping");
                self.progress
                    .on_event(PipelineEvent::ValidationFailed { index, failure: failure.clone() });
                return SweepOutcome { index, root: None, status: SweepStatus::ValidationFailed(failure) };
            }
        };

        match self.run_validated(config_path, index, total, &config).await {
            Ok(root) => SweepOutcome { index, root: Some(root), status: SweepStatus::Completed },
            Err(err) => {
                tracing::error!(sweep_index = index, error = %err, "experiment failed");
                self.progress.on_event(PipelineEvent::ExperimentFailed {
                    index,
                    stage: err.stage(),
                    message: err.to_string(),
                });
                SweepOutcome { index, root: None, status: SweepStatus::Failed(err) }
            }
        }
    }

    async fn run_validated(
        &self,
        config_path: &Path,
        index: usize,
        total: usize,
        config: &ExperimentConfig,
    ) -> PipelineResult<PathBuf> {
        let layout = ExperimentLayout::new(config_path, &config.save_dir);
        let paths = layout.resolve(config)?;
        persist_config(&paths, config)?;

        // Commit config to stable storage, then operate only on the stable
        // copy: re-read, re-validate, re-resolve. A retry after a crash
        // reconstructs the experiment from disk alone.
        let reloaded = ExperimentConfig::load(&paths.config_file)?;
        let paths = layout.resolve(&reloaded)?;

        self.progress.on_event(PipelineEvent::ExperimentStarted {
            index,
            total,
            root: paths.root.clone(),
        });
        PipelineOrchestrator::new(self.factory, self.progress).run(&reloaded, &paths).await?;
        self.progress.on_event(PipelineEvent::ExperimentFinished { index });
        Ok(paths.root)
    }
}
