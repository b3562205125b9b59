use ablate_core::DataConfig;
use ablate_pipeline::{DatasetGenerator, Example, PipelineError, PipelineResult, SplitDataset};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use regex::Regex;

use crate::records::{load_records, value_text, Record};

/// Builds train/test splits by injecting record values into the configured
/// prompt templates.
///
/// `{column}` placeholders in `data.prompt` and `data.prompt_stub` are filled
/// from each record; the rendered stub is the completion (ground-truth) side.
/// Records are shuffled with `train_test_split_seed` and split by the
/// configured fractions, so the same configuration always produces the same
/// splits in the same order.
pub struct PromptDatasetGenerator {
    data: DataConfig,
    placeholder: Regex,
    test_columns: Vec<String>,
}

impl PromptDatasetGenerator {
    pub fn new(data: DataConfig) -> PipelineResult<Self> {
        let placeholder = Regex::new(r"\{([A-Za-z0-9_]+)\}")
            .map_err(|e| PipelineError::Dataset(format!("invalid placeholder pattern: {e}")))?;
        let test_columns = columns_in(&placeholder, &data.prompt_stub);
        Ok(Self { data, placeholder, test_columns })
    }

    fn render(&self, template: &str, record: &Record) -> PipelineResult<String> {
        let mut out = String::with_capacity(template.len());
        let mut last = 0;
        for caps in self.placeholder.captures_iter(template) {
            let Some(whole) = caps.get(0) else { continue };
            let column = &caps[1];
            let value = record.get(column).ok_or_else(|| {
                PipelineError::Dataset(format!(
                    "record is missing column `{column}` referenced by a template"
                ))
            })?;
            out.push_str(&template[last..whole.start()]);
            out.push_str(&value_text(value));
            last = whole.end();
        }
        out.push_str(&template[last..]);
        Ok(out)
    }

    fn example(&self, index: usize, record: &Record) -> PipelineResult<Example> {
        Ok(Example {
            prompt: self.render(&self.data.prompt, record)?,
            completion: self.render(&self.data.prompt_stub, record)?,
            metadata: serde_json::json!({ "record_index": index }),
        })
    }
}

fn columns_in(placeholder: &Regex, template: &str) -> Vec<String> {
    let mut columns = Vec::new();
    for caps in placeholder.captures_iter(template) {
        let column = caps[1].to_string();
        if !columns.contains(&column) {
            columns.push(column);
        }
    }
    columns
}

#[async_trait]
impl DatasetGenerator for PromptDatasetGenerator {
    fn test_columns(&self) -> &[String] {
        &self.test_columns
    }

    async fn generate(&self) -> PipelineResult<SplitDataset> {
        let records = load_records(&self.data.path, self.data.file_type)?;
        if records.len() < 2 {
            return Err(PipelineError::Dataset(format!(
                "need at least 2 records to split, found {} in {}",
                records.len(),
                self.data.path.display()
            )));
        }

        let mut indexed: Vec<(usize, Record)> = records.into_iter().enumerate().collect();
        let mut rng = StdRng::seed_from_u64(self.data.train_test_split_seed);
        indexed.shuffle(&mut rng);

        let n = indexed.len();
        let test_len = usize::max(1, (n as f64 * self.data.test_size).round() as usize).min(n - 1);
        let train_len =
            usize::max(1, (n as f64 * self.data.train_size).round() as usize).min(n - test_len);

        let mut split = SplitDataset::default();
        for (index, record) in &indexed[..train_len] {
            split.train.push(self.example(*index, record)?);
        }
        for (index, record) in &indexed[train_len..train_len + test_len] {
            split.test.push(self.example(*index, record)?);
        }

        tracing::debug!(
            records = n,
            train = split.train.len(),
            test = split.test.len(),
            "generated dataset splits"
        );
        Ok(split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ablate_core::FileType;
    use tempfile::TempDir;

    fn write_records(dir: &TempDir, count: usize) -> std::path::PathBuf {
        let path = dir.path().join("records.jsonl");
        let mut out = String::new();
        for i in 0..count {
            out.push_str(&format!("{{\"question\": \"q{i}\", \"answer\": \"a{i}\"}}\n"));
        }
        std::fs::write(&path, out).unwrap();
        path
    }

    fn data_config(path: std::path::PathBuf) -> DataConfig {
        DataConfig {
            path,
            file_type: FileType::Jsonl,
            prompt: "Question: {question}\nAnswer: ".to_string(),
            prompt_stub: "{answer}".to_string(),
            test_size: 0.25,
            train_size: 0.75,
            train_test_split_seed: 7,
        }
    }

    #[tokio::test]
    async fn test_split_is_deterministic_for_a_seed() {
        let temp = TempDir::new().unwrap();
        let config = data_config(write_records(&temp, 8));

        let first = PromptDatasetGenerator::new(config.clone()).unwrap().generate().await.unwrap();
        let second = PromptDatasetGenerator::new(config).unwrap().generate().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.train.len(), 6);
        assert_eq!(first.test.len(), 2);
    }

    #[tokio::test]
    async fn test_templates_are_rendered_from_records() {
        let temp = TempDir::new().unwrap();
        let config = data_config(write_records(&temp, 4));

        let split = PromptDatasetGenerator::new(config).unwrap().generate().await.unwrap();
        let example = &split.train[0];
        assert!(example.prompt.starts_with("Question: q"));
        assert!(example.prompt.ends_with("Answer: "));
        assert!(example.completion.starts_with('a'));
    }

    #[tokio::test]
    async fn test_missing_column_is_reported() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("records.jsonl");
        std::fs::write(&path, "{\"question\": \"q\"}\n{\"question\": \"r\"}\n").unwrap();

        let err = PromptDatasetGenerator::new(data_config(path))
            .unwrap()
            .generate()
            .await
            .unwrap_err();
        assert!(err.to_string().contains("missing column `answer`"));
    }

    #[test]
    fn test_test_columns_come_from_the_stub() {
        let temp = TempDir::new().unwrap();
        let generator = PromptDatasetGenerator::new(data_config(write_records(&temp, 2))).unwrap();
        assert_eq!(generator.test_columns(), ["answer".to_string()]);
    }
}
