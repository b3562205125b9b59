use ablate_core::ExperimentConfig;
use ablate_pipeline::{
    DatasetGenerator, Example, ExperimentPaths, Finetuner, InferenceRunner, PipelineResult,
    StageFactory,
};

use crate::finetuner::BigramFinetuner;
use crate::generator::PromptDatasetGenerator;
use crate::inference::BigramInferenceRunner;

/// Wires the local collaborators into the pipeline's stage contracts.
#[derive(Debug, Default, Clone)]
pub struct LocalStageFactory;

impl StageFactory for LocalStageFactory {
    fn dataset_generator(
        &self,
        config: &ExperimentConfig,
    ) -> PipelineResult<Box<dyn DatasetGenerator>> {
        Ok(Box::new(PromptDatasetGenerator::new(config.data.clone())?))
    }

    fn finetuner(
        &self,
        config: &ExperimentConfig,
        paths: &ExperimentPaths,
    ) -> PipelineResult<Box<dyn Finetuner>> {
        Ok(Box::new(BigramFinetuner::new(config, paths)))
    }

    fn inference_runner(
        &self,
        test: Vec<Example>,
        test_columns: Vec<String>,
        config: &ExperimentConfig,
        paths: &ExperimentPaths,
    ) -> PipelineResult<Box<dyn InferenceRunner>> {
        Ok(Box::new(BigramInferenceRunner::new(test, test_columns, config, paths)))
    }
}
