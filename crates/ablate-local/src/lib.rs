//! Ablate Local
//!
//! Local, dependency-free stage collaborators so the pipeline runs end-to-end
//! on one machine:
//! - `PromptDatasetGenerator`: records + prompt templates → train/test splits
//! - `BigramFinetuner`: character-bigram adapter standing in for a training backend
//! - `BigramInferenceRunner`: greedy/sampled generation over the trained adapter
//! - `LocalStageFactory`: wires the three into the pipeline's stage contracts

pub mod factory;
pub mod finetuner;
pub mod generator;
pub mod inference;
pub mod records;

pub use factory::LocalStageFactory;
pub use finetuner::{AdapterManifest, BigramAdapter, BigramFinetuner};
pub use generator::PromptDatasetGenerator;
pub use inference::{BigramInferenceRunner, ResultRow};
pub use records::{load_records, Record};
