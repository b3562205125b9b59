//! Orchestration-flow tests: skip/recompute decisions, idempotence,
//! isolation between sweep members, and failure propagation, exercised
//! through mock stage collaborators that count their "do work" paths.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ablate_core::ExperimentConfig;
use ablate_pipeline::{
    DatasetGenerator, Example, ExperimentLayout, ExperimentPaths, Finetuner, InferenceRunner,
    PipelineError, PipelineOrchestrator, PipelineResult, RecordingProgressSink, SplitDataset,
    Stage, StageFactory, SweepRunner, SweepStatus,
};
use async_trait::async_trait;
use tempfile::TempDir;

fn example(prompt: &str, completion: &str) -> Example {
    Example { prompt: prompt.to_string(), completion: completion.to_string(), metadata: serde_json::Value::Null }
}

fn fixture_split() -> SplitDataset {
    SplitDataset {
        train: vec![example("p1", "c1"), example("p2", "c2")],
        test: vec![example("p3", "c3")],
    }
}

#[derive(Default)]
struct StageCalls {
    generate: AtomicUsize,
    finetune: AtomicUsize,
    save_weights: AtomicUsize,
    infer: AtomicUsize,
}

struct MockFactory {
    calls: Arc<StageCalls>,
    split: SplitDataset,
    fail_finetune: bool,
}

impl MockFactory {
    fn new(split: SplitDataset) -> Self {
        Self { calls: Arc::new(StageCalls::default()), split, fail_finetune: false }
    }

    fn failing_finetune(split: SplitDataset) -> Self {
        Self { calls: Arc::new(StageCalls::default()), split, fail_finetune: true }
    }
}

struct MockGenerator {
    calls: Arc<StageCalls>,
    split: SplitDataset,
    columns: Vec<String>,
}

#[async_trait]
impl DatasetGenerator for MockGenerator {
    fn test_columns(&self) -> &[String] {
        &self.columns
    }

    async fn generate(&self) -> PipelineResult<SplitDataset> {
        self.calls.generate.fetch_add(1, Ordering::SeqCst);
        Ok(self.split.clone())
    }
}

struct MockFinetuner {
    calls: Arc<StageCalls>,
    weights_dir: std::path::PathBuf,
    fail: bool,
}

#[async_trait]
impl Finetuner for MockFinetuner {
    async fn finetune(&mut self, _train: &[Example]) -> PipelineResult<()> {
        self.calls.finetune.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PipelineError::Weights("simulated training crash".to_string()));
        }
        Ok(())
    }

    async fn save_weights(&self) -> PipelineResult<()> {
        self.calls.save_weights.fetch_add(1, Ordering::SeqCst);
        std::fs::create_dir_all(&self.weights_dir)?;
        std::fs::write(self.weights_dir.join("adapter.json"), "{\"trained\":true}")?;
        Ok(())
    }
}

struct MockInferenceRunner {
    calls: Arc<StageCalls>,
    results_file: std::path::PathBuf,
    count: usize,
}

#[async_trait]
impl InferenceRunner for MockInferenceRunner {
    async fn infer_all(&mut self) -> PipelineResult<()> {
        self.calls.infer.fetch_add(1, Ordering::SeqCst);
        if let Some(parent) = self.results_file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.results_file, format!("{{\"generated\":{}}}\n", self.count))?;
        Ok(())
    }
}

impl StageFactory for MockFactory {
    fn dataset_generator(
        &self,
        _config: &ExperimentConfig,
    ) -> PipelineResult<Box<dyn DatasetGenerator>> {
        Ok(Box::new(MockGenerator {
            calls: self.calls.clone(),
            split: self.split.clone(),
            columns: vec!["answer".to_string()],
        }))
    }

    fn finetuner(
        &self,
        _config: &ExperimentConfig,
        paths: &ExperimentPaths,
    ) -> PipelineResult<Box<dyn Finetuner>> {
        Ok(Box::new(MockFinetuner {
            calls: self.calls.clone(),
            weights_dir: paths.weights.clone(),
            fail: self.fail_finetune,
        }))
    }

    fn inference_runner(
        &self,
        test: Vec<Example>,
        _test_columns: Vec<String>,
        _config: &ExperimentConfig,
        paths: &ExperimentPaths,
    ) -> PipelineResult<Box<dyn InferenceRunner>> {
        Ok(Box::new(MockInferenceRunner {
            calls: self.calls.clone(),
            results_file: paths.results_file.clone(),
            count: test.len(),
        }))
    }
}

fn config_with_save_dir(save_dir: &Path) -> ExperimentConfig {
    let yaml = format!(
        "save_dir: {}\ndata:\n  path: ./records.jsonl\n  prompt: \"q: {{q}}\"\n  prompt_stub: \"{{a}}\"\nmodel:\n  base_model: base-7b\n",
        save_dir.display()
    );
    let raw: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();
    ExperimentConfig::from_value(raw).unwrap()
}

fn resolve(config: &ExperimentConfig) -> ExperimentPaths {
    ExperimentLayout::new(Path::new("config.yml"), &config.save_dir).resolve(config).unwrap()
}

#[tokio::test]
async fn test_fresh_run_executes_all_three_stages() {
    let temp = TempDir::new().unwrap();
    let config = config_with_save_dir(temp.path());
    let paths = resolve(&config);

    let factory = MockFactory::new(fixture_split());
    let sink = RecordingProgressSink::default();
    PipelineOrchestrator::new(&factory, &sink).run(&config, &paths).await.unwrap();

    assert_eq!(factory.calls.generate.load(Ordering::SeqCst), 1);
    assert_eq!(factory.calls.finetune.load(Ordering::SeqCst), 1);
    assert_eq!(factory.calls.save_weights.load(Ordering::SeqCst), 1);
    assert_eq!(factory.calls.infer.load(Ordering::SeqCst), 1);

    // End-to-end artifact postconditions.
    assert_eq!(SplitDataset::load(&paths.dataset).unwrap(), fixture_split());
    assert!(paths.weights.join("adapter.json").exists());
    assert!(paths.results_file.exists());
}

#[tokio::test]
async fn test_prepopulated_dataset_skips_generation_only() {
    let temp = TempDir::new().unwrap();
    let config = config_with_save_dir(temp.path());
    let paths = resolve(&config);
    fixture_split().save(&paths.dataset).unwrap();

    let factory = MockFactory::new(fixture_split());
    let sink = RecordingProgressSink::default();
    PipelineOrchestrator::new(&factory, &sink).run(&config, &paths).await.unwrap();

    assert_eq!(factory.calls.generate.load(Ordering::SeqCst), 0);
    assert_eq!(factory.calls.finetune.load(Ordering::SeqCst), 1);
    assert_eq!(factory.calls.infer.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_second_run_is_idempotent_and_byte_identical() {
    let temp = TempDir::new().unwrap();
    let config = config_with_save_dir(temp.path());
    let paths = resolve(&config);

    let factory = MockFactory::new(fixture_split());
    let sink = RecordingProgressSink::default();
    let orchestrator = PipelineOrchestrator::new(&factory, &sink);

    orchestrator.run(&config, &paths).await.unwrap();
    let dataset_bytes = std::fs::read(&paths.dataset).unwrap();
    let results_bytes = std::fs::read(&paths.results_file).unwrap();

    orchestrator.run(&config, &paths).await.unwrap();

    // No stage did work the second time.
    assert_eq!(factory.calls.generate.load(Ordering::SeqCst), 1);
    assert_eq!(factory.calls.finetune.load(Ordering::SeqCst), 1);
    assert_eq!(factory.calls.infer.load(Ordering::SeqCst), 1);

    assert_eq!(std::fs::read(&paths.dataset).unwrap(), dataset_bytes);
    assert_eq!(std::fs::read(&paths.results_file).unwrap(), results_bytes);
}

#[tokio::test]
async fn test_finetune_failure_aborts_before_inference() {
    let temp = TempDir::new().unwrap();
    let config = config_with_save_dir(temp.path());
    let paths = resolve(&config);

    let factory = MockFactory::failing_finetune(fixture_split());
    let sink = RecordingProgressSink::default();
    let err = PipelineOrchestrator::new(&factory, &sink).run(&config, &paths).await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Finetune));
    assert_eq!(factory.calls.infer.load(Ordering::SeqCst), 0);
    assert!(!paths.results_file.exists());
}

#[tokio::test]
async fn test_empty_test_split_is_a_dataset_stage_error() {
    let temp = TempDir::new().unwrap();
    let config = config_with_save_dir(temp.path());
    let paths = resolve(&config);

    let factory = MockFactory::new(SplitDataset { train: vec![example("p", "c")], test: vec![] });
    let sink = RecordingProgressSink::default();
    let err = PipelineOrchestrator::new(&factory, &sink).run(&config, &paths).await.unwrap_err();
    assert_eq!(err.stage(), Some(Stage::Dataset));
}

fn write_sweep_config(dir: &Path, save_dir: &Path) -> std::path::PathBuf {
    let config_path = dir.join("config.yml");
    let yaml = format!(
        r#"save_dir: {}
ablation:
  use_ablate: true
  factors:
    training.learning_rate: [0.001, 0.0001]
    lora.r: [8, 16]
data:
  path: ./records.jsonl
  prompt: "q: {{q}}"
  prompt_stub: "{{a}}"
model:
  base_model: base-7b
"#,
        save_dir.display()
    );
    std::fs::write(&config_path, yaml).unwrap();
    config_path
}

#[tokio::test]
async fn test_sweep_runs_every_member_in_isolated_roots() {
    let temp = TempDir::new().unwrap();
    let save_dir = temp.path().join("experiments");
    let config_path = write_sweep_config(temp.path(), &save_dir);

    let factory = MockFactory::new(fixture_split());
    let sink = RecordingProgressSink::default();
    let report = SweepRunner::new(&factory, &sink).run_all(&config_path).await.unwrap();

    assert_eq!(report.outcomes.len(), 4);
    assert!(report.all_succeeded());
    assert_eq!(factory.calls.finetune.load(Ordering::SeqCst), 4);

    let mut roots: Vec<_> = report.outcomes.iter().map(|o| o.root.clone().unwrap()).collect();
    roots.sort();
    roots.dedup();
    assert_eq!(roots.len(), 4);
    for root in &roots {
        assert!(root.join("config.yml").exists());
        assert!(root.join("results").join("results.jsonl").exists());
    }
}

#[tokio::test]
async fn test_sweep_rerun_hits_every_cache() {
    let temp = TempDir::new().unwrap();
    let save_dir = temp.path().join("experiments");
    let config_path = write_sweep_config(temp.path(), &save_dir);

    let factory = MockFactory::new(fixture_split());
    let sink = RecordingProgressSink::default();
    let runner = SweepRunner::new(&factory, &sink);

    runner.run_all(&config_path).await.unwrap();
    let report = runner.run_all(&config_path).await.unwrap();

    assert!(report.all_succeeded());
    assert_eq!(factory.calls.generate.load(Ordering::SeqCst), 4);
    assert_eq!(factory.calls.finetune.load(Ordering::SeqCst), 4);
    assert_eq!(factory.calls.infer.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn test_invalid_sweep_member_is_skipped_and_reported() {
    let temp = TempDir::new().unwrap();
    let save_dir = temp.path().join("experiments");
    let config_path = temp.path().join("config.yml");
    // Second learning-rate candidate fails validation.
    let yaml = format!(
        r#"save_dir: {}
ablation:
  use_ablate: true
  factors:
    training.learning_rate: [0.001, -1.0]
data:
  path: ./records.jsonl
  prompt: "q: {{q}}"
  prompt_stub: "{{a}}"
model:
  base_model: base-7b
"#,
        save_dir.display()
    );
    std::fs::write(&config_path, yaml).unwrap();

    let factory = MockFactory::new(fixture_split());
    let sink = RecordingProgressSink::default();
    let report = SweepRunner::new(&factory, &sink).run_all(&config_path).await.unwrap();

    assert_eq!(report.outcomes.len(), 2);
    assert_eq!(report.completed(), 1);
    assert!(matches!(report.outcomes[1].status, SweepStatus::ValidationFailed(_)));
    assert!(report.outcomes[1].root.is_none());
    // Only the valid member ran.
    assert_eq!(factory.calls.finetune.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_stage_failure_does_not_abort_the_sweep() {
    let temp = TempDir::new().unwrap();
    let save_dir = temp.path().join("experiments");
    let config_path = write_sweep_config(temp.path(), &save_dir);

    let factory = MockFactory::failing_finetune(fixture_split());
    let sink = RecordingProgressSink::default();
    let report = SweepRunner::new(&factory, &sink).run_all(&config_path).await.unwrap();

    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.failed(), 4);
    for outcome in &report.outcomes {
        match &outcome.status {
            SweepStatus::Failed(err) => assert_eq!(err.stage(), Some(Stage::Finetune)),
            other => panic!("expected a stage failure, got {other:?}"),
        }
    }
    // Every member was still attempted.
    assert_eq!(factory.calls.finetune.load(Ordering::SeqCst), 4);
    assert_eq!(factory.calls.infer.load(Ordering::SeqCst), 0);
}
