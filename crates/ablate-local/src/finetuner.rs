use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use ablate_core::{ExperimentConfig, LoraConfig};
use ablate_pipeline::{Example, ExperimentPaths, Finetuner, PipelineError, PipelineResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Character-bigram adapter: the local stand-in for trained weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigramAdapter {
    pub base_model: String,
    /// Stable (sorted) vocabulary; one entry per character.
    pub vocab: Vec<String>,
    /// Transition counts with Laplace smoothing, `vocab.len()` squared.
    pub transitions: Vec<Vec<f32>>,
}

pub const ADAPTER_FILE: &str = "adapter.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Metadata written next to the adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterManifest {
    pub base_model: String,
    pub created_at: DateTime<Utc>,
    pub lora: LoraConfig,
    pub train_examples: usize,
    pub vocab_size: usize,
    pub adapter_sha256: String,
}

/// Fine-tunes a bigram adapter over the train split and persists it into the
/// experiment's weights directory.
pub struct BigramFinetuner {
    base_model: String,
    lora: LoraConfig,
    weights_dir: PathBuf,
    adapter: Option<BigramAdapter>,
    train_examples: usize,
}

impl BigramFinetuner {
    #[must_use]
    pub fn new(config: &ExperimentConfig, paths: &ExperimentPaths) -> Self {
        Self {
            base_model: config.model.base_model.clone(),
            lora: config.lora.clone(),
            weights_dir: paths.weights.clone(),
            adapter: None,
            train_examples: 0,
        }
    }
}

fn build_adapter(base_model: &str, corpus: &str) -> PipelineResult<BigramAdapter> {
    if corpus.is_empty() {
        return Err(PipelineError::Weights("training corpus is empty".to_string()));
    }

    let vocab: Vec<char> = corpus.chars().collect::<BTreeSet<_>>().into_iter().collect();
    let mut index = HashMap::new();
    for (i, ch) in vocab.iter().enumerate() {
        index.insert(*ch, i);
    }

    let n = vocab.len();
    let mut counts = vec![vec![1f32; n]; n];
    let mut prev: Option<usize> = None;
    for ch in corpus.chars() {
        let cur = *index
            .get(&ch)
            .ok_or_else(|| PipelineError::Weights("failed to index character".to_string()))?;
        if let Some(p) = prev {
            counts[p][cur] += 1.0;
        }
        prev = Some(cur);
    }

    Ok(BigramAdapter {
        base_model: base_model.to_string(),
        vocab: vocab.into_iter().map(|c| c.to_string()).collect(),
        transitions: counts,
    })
}

fn sha256_file(path: &Path) -> PipelineResult<String> {
    let bytes = std::fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}

#[async_trait]
impl Finetuner for BigramFinetuner {
    async fn finetune(&mut self, train: &[Example]) -> PipelineResult<()> {
        if train.is_empty() {
            return Err(PipelineError::Weights("train split is empty".to_string()));
        }

        let mut corpus = String::new();
        for example in train {
            corpus.push_str(&example.prompt);
            corpus.push_str(&example.completion);
            corpus.push('\n');
        }

        tracing::debug!(examples = train.len(), chars = corpus.len(), "fitting bigram adapter");
        self.adapter = Some(build_adapter(&self.base_model, &corpus)?);
        self.train_examples = train.len();
        Ok(())
    }

    async fn save_weights(&self) -> PipelineResult<()> {
        let adapter = self.adapter.as_ref().ok_or_else(|| {
            PipelineError::Weights("no trained adapter to persist; run finetune first".to_string())
        })?;

        std::fs::create_dir_all(&self.weights_dir)?;
        let adapter_path = self.weights_dir.join(ADAPTER_FILE);
        std::fs::write(&adapter_path, serde_json::to_string_pretty(adapter)?)?;

        let manifest = AdapterManifest {
            base_model: self.base_model.clone(),
            created_at: Utc::now(),
            lora: self.lora.clone(),
            train_examples: self.train_examples,
            vocab_size: adapter.vocab.len(),
            adapter_sha256: sha256_file(&adapter_path)?,
        };
        std::fs::write(self.weights_dir.join(MANIFEST_FILE), serde_json::to_string_pretty(&manifest)?)?;
        Ok(())
    }
}
