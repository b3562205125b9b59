//! Collaborator contracts for the three pipeline stages.
//!
//! The orchestrator owns sequencing and caching; everything heavy lives
//! behind these traits. Implementations are constructed per experiment by a
//! [`StageFactory`], which is also the seam tests use to observe which
//! "do work" paths actually run.

use ablate_core::ExperimentConfig;
use async_trait::async_trait;

use crate::dataset::{Example, SplitDataset};
use crate::error::PipelineResult;
use crate::layout::ExperimentPaths;

/// Builds train/test example sets from the experiment's data section.
#[async_trait]
pub trait DatasetGenerator: Send + Sync {
    /// Column names the results artifact reports alongside generations.
    fn test_columns(&self) -> &[String];

    async fn generate(&self) -> PipelineResult<SplitDataset>;
}

/// Consumes the train split and produces weights in the experiment's
/// weights directory.
#[async_trait]
pub trait Finetuner: Send + Sync {
    async fn finetune(&mut self, train: &[Example]) -> PipelineResult<()>;

    async fn save_weights(&self) -> PipelineResult<()>;
}

/// Runs inference over every test example, writing the results artifact.
#[async_trait]
pub trait InferenceRunner: Send + Sync {
    async fn infer_all(&mut self) -> PipelineResult<()>;
}

/// Constructs stage collaborators for one concrete experiment.
pub trait StageFactory: Send + Sync {
    fn dataset_generator(
        &self,
        config: &ExperimentConfig,
    ) -> PipelineResult<Box<dyn DatasetGenerator>>;

    fn finetuner(
        &self,
        config: &ExperimentConfig,
        paths: &ExperimentPaths,
    ) -> PipelineResult<Box<dyn Finetuner>>;

    fn inference_runner(
        &self,
        test: Vec<Example>,
        test_columns: Vec<String>,
        config: &ExperimentConfig,
        paths: &ExperimentPaths,
    ) -> PipelineResult<Box<dyn InferenceRunner>>;
}
