//! Ablate Pipeline
//!
//! Orchestration and caching layer for resumable fine-tuning experiments:
//! - Deriving isolated, content-addressed experiment directories (`ExperimentLayout`)
//! - Deciding skip/recompute per stage from artifact presence
//! - Sequencing dataset → fine-tune → inference (`PipelineOrchestrator`)
//! - Driving a whole sweep of concrete configurations (`SweepRunner`)

pub mod dataset;
pub mod error;
pub mod layout;
pub mod orchestrator;
pub mod presence;
pub mod progress;
pub mod stages;
pub mod sweep;

pub use dataset::{Example, SplitDataset};
pub use error::{PipelineError, PipelineResult, Stage};
pub use layout::{config_digest, persist_config, ExperimentLayout, ExperimentPaths};
pub use orchestrator::PipelineOrchestrator;
pub use progress::{PipelineEvent, ProgressSink, RecordingProgressSink, StdoutProgressSink};
pub use stages::{DatasetGenerator, Finetuner, InferenceRunner, StageFactory};
pub use sweep::{SweepOutcome, SweepReport, SweepRunner, SweepStatus};
