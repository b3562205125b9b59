//! Ablate Core
//!
//! Configuration primitives for the experiment pipeline:
//! - Typed experiment configuration (`ExperimentConfig`) with schema validation
//! - Structured validation failures (`ValidationFailure`)
//! - Ablation sweep expansion over raw YAML configurations (`expand_ablation`)

pub mod config;
pub mod error;
pub mod expand;

pub use config::{
    AblationConfig, DataConfig, Device, ExperimentConfig, FileType, InferenceConfig, LoraConfig,
    ModelConfig, TrainingConfig,
};
pub use error::{ConfigError, ConfigResult, ValidationFailure, ValidationIssue};
pub use expand::expand_ablation;
