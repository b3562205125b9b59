use std::path::PathBuf;

use ablate_core::{ExperimentConfig, InferenceConfig};
use ablate_pipeline::{Example, ExperimentPaths, InferenceRunner, PipelineError, PipelineResult};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::finetuner::{BigramAdapter, ADAPTER_FILE};

/// One line of the results artifact, in test-split order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    pub index: usize,
    pub prompt: String,
    /// Ground-truth completion from the test split.
    pub reference: String,
    pub completion: String,
}

/// Generates a completion for every test example using the trained bigram
/// adapter and writes the results artifact.
///
/// `temperature == 0` decodes greedily; anything above samples from the
/// transition weights with the configured seed. The adapter is only loaded
/// here: missing weights surface as an inference error, not earlier.
pub struct BigramInferenceRunner {
    test: Vec<Example>,
    test_columns: Vec<String>,
    inference: InferenceConfig,
    weights_dir: PathBuf,
    results_dir: PathBuf,
    results_file: PathBuf,
}

impl BigramInferenceRunner {
    #[must_use]
    pub fn new(
        test: Vec<Example>,
        test_columns: Vec<String>,
        config: &ExperimentConfig,
        paths: &ExperimentPaths,
    ) -> Self {
        Self {
            test,
            test_columns,
            inference: config.inference.clone(),
            weights_dir: paths.weights.clone(),
            results_dir: paths.results.clone(),
            results_file: paths.results_file.clone(),
        }
    }

    fn load_adapter(&self) -> PipelineResult<BigramAdapter> {
        let path = self.weights_dir.join(ADAPTER_FILE);
        if !path.exists() {
            return Err(PipelineError::Inference(format!(
                "no adapter found at {}; run the fine-tune stage first",
                path.display()
            )));
        }
        let adapter: BigramAdapter = serde_json::from_str(&std::fs::read_to_string(&path)?)?;
        let square = adapter.transitions.len() == adapter.vocab.len()
            && adapter.transitions.iter().all(|row| row.len() == adapter.vocab.len());
        if adapter.vocab.is_empty() || adapter.vocab.iter().any(String::is_empty) || !square {
            return Err(PipelineError::Inference(format!(
                "adapter at {} is malformed",
                path.display()
            )));
        }
        Ok(adapter)
    }
}

fn generate(
    adapter: &BigramAdapter,
    prompt: &str,
    max_new_tokens: u32,
    temperature: f64,
    rng: &mut StdRng,
) -> String {
    let chars: Vec<char> = adapter
        .vocab
        .iter()
        .filter_map(|entry| entry.chars().next())
        .collect();

    let mut cur = prompt
        .chars()
        .rev()
        .find_map(|ch| chars.iter().position(|&c| c == ch))
        .unwrap_or(0);

    let mut out = String::new();
    for _ in 0..max_new_tokens {
        let row = &adapter.transitions[cur];
        let next = if temperature <= f64::EPSILON {
            argmax(row)
        } else {
            sample(row, temperature, rng)
        };
        let Some(next) = next else { break };
        out.push(chars[next]);
        cur = next;
    }
    out
}

fn argmax(row: &[f32]) -> Option<usize> {
    row.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(i, _)| i)
}

fn sample(row: &[f32], temperature: f64, rng: &mut StdRng) -> Option<usize> {
    let weights: Vec<f64> = row.iter().map(|&w| f64::from(w).powf(1.0 / temperature)).collect();
    let total: f64 = weights.iter().sum();
    if !(total.is_finite() && total > 0.0) {
        return argmax(row);
    }
    let mut target = rng.r#gen::<f64>() * total;
    for (i, w) in weights.iter().enumerate() {
        target -= w;
        if target <= 0.0 {
            return Some(i);
        }
    }
    Some(weights.len() - 1)
}

#[async_trait]
impl InferenceRunner for BigramInferenceRunner {
    async fn infer_all(&mut self) -> PipelineResult<()> {
        let adapter = self.load_adapter()?;
        std::fs::create_dir_all(&self.results_dir)?;

        // Column metadata sidecar for downstream evaluation tooling.
        std::fs::write(
            self.results_dir.join("columns.json"),
            serde_json::to_string_pretty(&self.test_columns)?,
        )?;

        let mut rng = StdRng::seed_from_u64(self.inference.seed);
        let mut out = String::new();
        for (index, example) in self.test.iter().enumerate() {
            let completion = generate(
                &adapter,
                &example.prompt,
                self.inference.max_new_tokens,
                self.inference.temperature,
                &mut rng,
            );
            let row = ResultRow {
                index,
                prompt: example.prompt.clone(),
                reference: example.completion.clone(),
                completion,
            };
            out.push_str(&serde_json::to_string(&row)?);
            out.push('\n');
        }

        // The results file is the completeness signal, so it is written last.
        std::fs::write(&self.results_file, out)?;
        tracing::debug!(examples = self.test.len(), path = %self.results_file.display(), "inference complete");
        Ok(())
    }
}
