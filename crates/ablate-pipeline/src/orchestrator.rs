use ablate_core::ExperimentConfig;

use crate::dataset::{Example, SplitDataset};
use crate::error::{PipelineError, PipelineResult, Stage};
use crate::layout::ExperimentPaths;
use crate::presence;
use crate::progress::{PipelineEvent, ProgressSink};
use crate::stages::StageFactory;

/// Runs the three pipeline stages against one concrete configuration.
///
/// Each stage is a two-state machine (pending → done), moved forward either
/// by finding its artifact already present or by doing the work and writing
/// it. A stage failure aborts the remaining stages for this configuration,
/// wrapped with the stage it surfaced in.
pub struct PipelineOrchestrator<'a> {
    factory: &'a dyn StageFactory,
    progress: &'a dyn ProgressSink,
}

impl<'a> PipelineOrchestrator<'a> {
    pub fn new(factory: &'a dyn StageFactory, progress: &'a dyn ProgressSink) -> Self {
        Self { factory, progress }
    }

    pub async fn run(&self, config: &ExperimentConfig, paths: &ExperimentPaths) -> PipelineResult<()> {
        let (split, test_columns) = self
            .dataset_stage(config, paths)
            .await
            .map_err(|e| e.in_stage(Stage::Dataset))?;

        self.finetune_stage(config, paths, &split.train)
            .await
            .map_err(|e| e.in_stage(Stage::Finetune))?;

        self.inference_stage(config, paths, split.test, test_columns)
            .await
            .map_err(|e| e.in_stage(Stage::Inference))?;

        Ok(())
    }

    /// Stage 1: load the dataset artifact when present, generate it otherwise.
    ///
    /// The generator is constructed on both branches: its column metadata is
    /// needed by the inference stage even on a cache hit. Only `generate` is
    /// the cached work.
    async fn dataset_stage(
        &self,
        config: &ExperimentConfig,
        paths: &ExperimentPaths,
    ) -> PipelineResult<(SplitDataset, Vec<String>)> {
        let generator = self.factory.dataset_generator(config)?;
        let test_columns = generator.test_columns().to_vec();

        let split = if presence::dataset_present(paths) {
            self.progress.on_event(PipelineEvent::DatasetFound { path: paths.dataset.clone() });
            SplitDataset::load(&paths.dataset)?
        } else {
            let split = generator.generate().await?;
            split.save(&paths.dataset)?;
            self.progress.on_event(PipelineEvent::DatasetGenerated {
                path: paths.dataset.clone(),
                train: split.train.len(),
                test: split.test.len(),
            });
            split
        };

        let (Some(train_head), Some(test_head)) = (split.train.first(), split.test.first()) else {
            return Err(PipelineError::Dataset(
                "train and test splits must each contain at least one example".to_string(),
            ));
        };
        self.progress.on_event(PipelineEvent::SampleExamples {
            train: train_head.clone(),
            test: test_head.clone(),
        });

        Ok((split, test_columns))
    }

    /// Stage 2: skip when the weights directory is already non-empty.
    async fn finetune_stage(
        &self,
        config: &ExperimentConfig,
        paths: &ExperimentPaths,
        train: &[Example],
    ) -> PipelineResult<()> {
        if presence::weights_present(paths) {
            self.progress.on_event(PipelineEvent::WeightsFound { path: paths.weights.clone() });
            return Ok(());
        }

        self.progress.on_event(PipelineEvent::FinetuneStarted);
        let mut finetuner = self.factory.finetuner(config, paths)?;
        finetuner.finetune(train).await?;
        finetuner.save_weights().await?;
        self.progress.on_event(PipelineEvent::FinetuneFinished { weights: paths.weights.clone() });
        Ok(())
    }

    /// Stage 3: skip when the results file already exists. Weights are not
    /// re-verified here; the runner surfaces their absence itself.
    async fn inference_stage(
        &self,
        config: &ExperimentConfig,
        paths: &ExperimentPaths,
        test: Vec<Example>,
        test_columns: Vec<String>,
    ) -> PipelineResult<()> {
        if presence::results_present(paths) {
            self.progress.on_event(PipelineEvent::ResultsFound { path: paths.results.clone() });
            return Ok(());
        }

        self.progress.on_event(PipelineEvent::InferenceStarted { count: test.len() });
        let mut runner = self.factory.inference_runner(test, test_columns, config, paths)?;
        runner.infer_all().await?;
        self.progress
            .on_event(PipelineEvent::InferenceFinished { results: paths.results_file.clone() });
        Ok(())
    }
}
