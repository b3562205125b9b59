use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, PipelineResult};

/// A single prompt/completion example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub prompt: String,
    pub completion: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Train and test example sets. Order is significant: display and indexed
/// access into the results artifact depend on it, so persistence preserves it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SplitDataset {
    pub train: Vec<Example>,
    pub test: Vec<Example>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SplitTag {
    Train,
    Test,
}

#[derive(Debug, Serialize, Deserialize)]
struct TaggedExample {
    split: SplitTag,
    #[serde(flatten)]
    example: Example,
}

impl SplitDataset {
    /// Persist both splits as a single JSONL artifact, train lines first.
    pub fn save(&self, path: &Path) -> PipelineResult<()> {
        let mut out = String::new();
        for (tag, examples) in [(SplitTag::Train, &self.train), (SplitTag::Test, &self.test)] {
            for example in examples {
                let line = TaggedExample { split: tag, example: example.clone() };
                out.push_str(&serde_json::to_string(&line)?);
                out.push('\n');
            }
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, out)?;
        Ok(())
    }

    pub fn load(path: &Path) -> PipelineResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut dataset = Self::default();
        for (idx, line) in contents.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let tagged: TaggedExample = serde_json::from_str(line).map_err(|e| {
                PipelineError::Dataset(format!(
                    "failed to parse dataset line {} in {}: {}",
                    idx + 1,
                    path.display(),
                    e
                ))
            })?;
            match tagged.split {
                SplitTag::Train => dataset.train.push(tagged.example),
                SplitTag::Test => dataset.test.push(tagged.example),
            }
        }
        Ok(dataset)
    }
}
