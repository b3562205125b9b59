//! `ablate generate config` - write the bundled example description.

use anyhow::{Context, Result};
use colored::Colorize;

const EXAMPLE_CONFIG: &str = include_str!("../../assets/config.yml");
const EXAMPLE_CONFIG_FNAME: &str = "config.yml";

pub fn execute_config() -> Result<()> {
    let destination = std::env::current_dir()?.join(EXAMPLE_CONFIG_FNAME);
    std::fs::write(&destination, EXAMPLE_CONFIG)
        .with_context(|| format!("failed to write {}", destination.display()))?;

    println!("{} {}", "Wrote".green().bold(), destination.display());
    println!("  Edit the data section to point at your records, then run {}.", "ablate run".cyan());
    Ok(())
}
