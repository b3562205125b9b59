use std::path::PathBuf;
use std::sync::Mutex;

use ablate_core::ValidationFailure;

use crate::dataset::Example;
use crate::error::Stage;

/// Observational pipeline events. Sinks never affect control flow.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    ExperimentStarted { index: usize, total: usize, root: PathBuf },
    ExperimentFinished { index: usize },
    ValidationFailed { index: usize, failure: ValidationFailure },
    ExperimentFailed { index: usize, stage: Option<Stage>, message: String },
    DatasetFound { path: PathBuf },
    DatasetGenerated { path: PathBuf, train: usize, test: usize },
    SampleExamples { train: Example, test: Example },
    FinetuneStarted,
    FinetuneFinished { weights: PathBuf },
    WeightsFound { path: PathBuf },
    InferenceStarted { count: usize },
    InferenceFinished { results: PathBuf },
    ResultsFound { path: PathBuf },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: PipelineEvent);
}

/// Plain stdout sink used by the CLI.
#[derive(Debug, Default)]
pub struct StdoutProgressSink;

impl ProgressSink for StdoutProgressSink {
    fn on_event(&self, event: PipelineEvent) {
        match event {
            PipelineEvent::ExperimentStarted { index, total, root } => {
                println!("[experiment {}/{}] {}", index + 1, total, root.display());
            }
            PipelineEvent::ExperimentFinished { index } => {
                println!("[experiment {}] finished", index + 1);
            }
            PipelineEvent::ValidationFailed { index, failure } => {
                eprintln!("[experiment {}] invalid configuration:\n{failure}", index + 1);
            }
            PipelineEvent::ExperimentFailed { index, stage, message } => match stage {
                Some(stage) => eprintln!("[experiment {}] {stage} stage failed: {message}", index + 1),
                None => eprintln!("[experiment {}] failed: {message}", index + 1),
            },
            PipelineEvent::DatasetFound { path } => {
                println!("[dataset] found existing artifact at {}", path.display());
            }
            PipelineEvent::DatasetGenerated { path, train, test } => {
                println!("[dataset] wrote {train} train / {test} test examples to {}", path.display());
            }
            PipelineEvent::SampleExamples { train, test } => {
                println!("[dataset] sample train prompt: {}", first_line(&train.prompt));
                println!("[dataset] sample test prompt:  {}", first_line(&test.prompt));
            }
            PipelineEvent::FinetuneStarted => println!("[fine-tune] started"),
            PipelineEvent::FinetuneFinished { weights } => {
                println!("[fine-tune] weights saved to {}", weights.display());
            }
            PipelineEvent::WeightsFound { path } => {
                println!("[fine-tune] found existing weights at {}, skipping", path.display());
            }
            PipelineEvent::InferenceStarted { count } => {
                println!("[inference] running over {count} test examples");
            }
            PipelineEvent::InferenceFinished { results } => {
                println!("[inference] results written to {}", results.display());
            }
            PipelineEvent::ResultsFound { path } => {
                println!("[inference] found existing results at {}, skipping", path.display());
            }
        }
    }
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

/// Records every event for inspection; used by tests.
#[derive(Debug, Default)]
pub struct RecordingProgressSink {
    events: Mutex<Vec<PipelineEvent>>,
}

impl RecordingProgressSink {
    #[must_use]
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl ProgressSink for RecordingProgressSink {
    fn on_event(&self, event: PipelineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
