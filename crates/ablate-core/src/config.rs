use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigResult, ValidationFailure};

/// Typed form of one experiment description.
///
/// Immutable once validated. Equality is field-for-field, which is what the
/// persisted-config round-trip relies on: serializing to YAML and reading the
/// file back must reproduce an equal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Parent directory for all experiment roots derived from this description.
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,
    #[serde(default)]
    pub ablation: AblationConfig,
    pub data: DataConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub lora: LoraConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
}

fn default_save_dir() -> PathBuf {
    PathBuf::from("./experiment")
}

/// Sweep declaration: dotted parameter paths mapped to candidate values.
///
/// Factors iterate in lexicographic path order, candidates in declared order,
/// so repeated runs enumerate the same experiments in the same order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AblationConfig {
    #[serde(default)]
    pub use_ablate: bool,
    #[serde(default)]
    pub factors: BTreeMap<String, Vec<serde_yaml::Value>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    /// Source records file, one of `file_type`.
    pub path: PathBuf,
    #[serde(default)]
    pub file_type: FileType,
    /// Prompt template; `{column}` placeholders are filled from each record.
    pub prompt: String,
    /// Completion template, the ground-truth side of each example.
    pub prompt_stub: String,
    #[serde(default = "default_test_size")]
    pub test_size: f64,
    #[serde(default = "default_train_size")]
    pub train_size: f64,
    #[serde(default = "default_split_seed")]
    pub train_test_split_seed: u64,
}

fn default_test_size() -> f64 {
    0.1
}

fn default_train_size() -> f64 {
    0.9
}

fn default_split_seed() -> u64 {
    42
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    #[default]
    Jsonl,
    Json,
    Csv,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Base model identifier handed to the fine-tuning backend.
    pub base_model: String,
    #[serde(default)]
    pub device: Device,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Device {
    #[default]
    Auto,
    Cpu,
    Cuda,
    Metal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoraConfig {
    pub r: u32,
    pub alpha: u32,
    pub dropout: f64,
    #[serde(default)]
    pub target_modules: Vec<String>,
}

impl Default for LoraConfig {
    fn default() -> Self {
        Self { r: 8, alpha: 16, dropout: 0.05, target_modules: Vec::new() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub seed: u64,
    pub epochs: u32,
    pub learning_rate: f64,
    pub batch_size: u32,
    pub max_seq_len: u32,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self { seed: 42, epochs: 1, learning_rate: 2e-5, batch_size: 1, max_seq_len: 2048 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub max_new_tokens: u32,
    /// 0.0 selects greedy decoding; anything above samples.
    pub temperature: f64,
    pub seed: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self { max_new_tokens: 256, temperature: 0.0, seed: 42 }
    }
}

impl ExperimentConfig {
    /// Map a raw configuration value onto the typed schema.
    ///
    /// Returns every issue found rather than the first: deserialization
    /// problems surface as a single `<config>` issue, semantic problems as
    /// one issue per offending field path.
    pub fn from_value(raw: serde_yaml::Value) -> Result<Self, ValidationFailure> {
        let config: Self = serde_yaml::from_value(raw).map_err(|e| {
            let mut failure = ValidationFailure::default();
            failure.push("<config>", e.to_string());
            failure
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a persisted configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let raw: serde_yaml::Value = serde_yaml::from_str(&text)?;
        Ok(Self::from_value(raw)?)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ValidationFailure> {
        let mut failure = ValidationFailure::default();

        if self.data.path.as_os_str().is_empty() {
            failure.push("data.path", "a records file is required");
        }
        if self.data.prompt.trim().is_empty() {
            failure.push("data.prompt", "prompt template must not be empty");
        }
        if self.data.prompt_stub.trim().is_empty() {
            failure.push("data.prompt_stub", "completion template must not be empty");
        }
        if !(self.data.test_size.is_finite() && self.data.test_size > 0.0) {
            failure.push("data.test_size", "must be > 0");
        }
        if !(self.data.train_size.is_finite() && self.data.train_size > 0.0) {
            failure.push("data.train_size", "must be > 0");
        }
        if self.data.test_size + self.data.train_size > 1.0 {
            failure.push("data.train_size", "train_size + test_size must not exceed 1");
        }

        if self.model.base_model.trim().is_empty() {
            failure.push("model.base_model", "a base model identifier is required");
        }

        if self.lora.r == 0 {
            failure.push("lora.r", "must be >= 1");
        }
        if self.lora.alpha == 0 {
            failure.push("lora.alpha", "must be >= 1");
        }
        if !(self.lora.dropout.is_finite() && (0.0..1.0).contains(&self.lora.dropout)) {
            failure.push("lora.dropout", "must be in [0, 1)");
        }

        if self.training.epochs == 0 {
            failure.push("training.epochs", "must be >= 1");
        }
        if !(self.training.learning_rate.is_finite() && self.training.learning_rate > 0.0) {
            failure.push("training.learning_rate", "must be > 0");
        }
        if self.training.batch_size == 0 {
            failure.push("training.batch_size", "must be >= 1");
        }
        if self.training.max_seq_len == 0 {
            failure.push("training.max_seq_len", "must be >= 1");
        }

        if self.inference.max_new_tokens == 0 {
            failure.push("inference.max_new_tokens", "must be >= 1");
        }
        if !(self.inference.temperature.is_finite() && self.inference.temperature >= 0.0) {
            failure.push("inference.temperature", "must be >= 0");
        }

        failure.into_result()
    }
}
