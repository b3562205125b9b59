//! Ablate CLI - resumable fine-tuning experiment pipelines
//!
//! Provides the `ablate` command: `run` drives a whole experiment description
//! (expanding ablation sweeps, reusing cached stage artifacts), `generate
//! config` writes an example description to start from.

mod commands;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(
    name = "ablate",
    author,
    version,
    about = "Resumable fine-tuning experiment pipelines with ablation sweeps"
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the entire experiment pipeline
    ///
    /// Expands the description into concrete experiments, then runs dataset
    /// preparation, fine-tuning, and inference for each, skipping any stage
    /// whose artifact already exists.
    Run {
        /// Path of the experiment description YAML file
        #[arg(default_value = "./config.yml")]
        config_path: String,
    },

    /// Generate various artefacts, such as config files
    #[command(subcommand)]
    Generate(GenerateCommand),
}

#[derive(Subcommand, Debug)]
enum GenerateCommand {
    /// Write an example `config.yml` into the current directory
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = match args.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber =
        FmtSubscriber::builder().with_max_level(level).without_time().with_target(false).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Run { config_path } => commands::run::execute(config_path.into()).await,
        Command::Generate(GenerateCommand::Config) => commands::generate::execute_config(),
    }
}
