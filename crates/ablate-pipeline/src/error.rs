use std::fmt;

use ablate_core::ConfigError;
use thiserror::Error;

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

/// The three pipeline stages, used to tag failures with where they happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Dataset,
    Finetune,
    Inference,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dataset => write!(f, "dataset"),
            Self::Finetune => write!(f, "fine-tune"),
            Self::Inference => write!(f, "inference"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} stage failed: {source}")]
    StageFailed {
        stage: Stage,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("weights error: {0}")]
    Weights(String),

    #[error("inference error: {0}")]
    Inference(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PipelineError {
    /// Wrap this error with the stage it surfaced in.
    #[must_use]
    pub fn in_stage(self, stage: Stage) -> Self {
        Self::StageFailed { stage, source: Box::new(self) }
    }

    /// The failing stage, when this error carries one.
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::StageFailed { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}
