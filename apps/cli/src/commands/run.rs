//! `ablate run` - drive every experiment in a description.

use std::path::PathBuf;

use ablate_local::LocalStageFactory;
use ablate_pipeline::{StdoutProgressSink, SweepRunner, SweepStatus};
use anyhow::{Context, Result};
use colored::Colorize;

pub async fn execute(config_path: PathBuf) -> Result<()> {
    let factory = LocalStageFactory;
    let progress = StdoutProgressSink;
    let runner = SweepRunner::new(&factory, &progress);

    let report = runner
        .run_all(&config_path)
        .await
        .with_context(|| format!("failed to run experiments from {}", config_path.display()))?;

    println!();
    println!(
        "{}",
        format!("Experiments: {} completed, {} failed", report.completed(), report.failed()).bold()
    );
    for outcome in &report.outcomes {
        match &outcome.status {
            SweepStatus::Completed => {
                if let Some(root) = &outcome.root {
                    println!(
                        "  {} {}",
                        format!("[{}]", outcome.index + 1).green(),
                        root.display().to_string().dimmed()
                    );
                }
            }
            SweepStatus::ValidationFailed(failure) => {
                println!("  {} invalid configuration:", format!("[{}]", outcome.index + 1).red());
                println!("{failure}");
            }
            SweepStatus::Failed(err) => {
                println!("  {} {}", format!("[{}]", outcome.index + 1).red(), err);
            }
        }
    }
    println!();

    if !report.all_succeeded() {
        anyhow::bail!("{} of {} experiments failed", report.failed(), report.outcomes.len());
    }
    Ok(())
}
