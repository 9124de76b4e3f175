//! examshield CLI: take timed practice tests from TOML question banks.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

mod commands;

#[derive(Parser)]
#[command(name = "examshield", version, about = "Timed practice test engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Result output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate question bank TOML files
    Validate {
        /// Path to a bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Take a test by replaying an answer script against a bank
    Take {
        /// Path to the question bank
        #[arg(long)]
        bank: PathBuf,

        /// Answer script with [[events]] to replay
        #[arg(long)]
        answers: PathBuf,

        /// Subject to check the bank against (defaults to the bank's own)
        #[arg(long)]
        subject: Option<String>,

        /// Difficulty: easy, medium, hard (sets the default time budget)
        #[arg(long)]
        difficulty: Option<String>,

        /// Total time in minutes, overriding the difficulty default
        #[arg(long)]
        minutes: Option<u32>,

        /// Real milliseconds per simulated second
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the effective configuration
    ShowConfig {
        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create a starter config, question bank, and answer script
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("examshield=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Take {
            bank,
            answers,
            subject,
            difficulty,
            minutes,
            tick_ms,
            format,
            config,
        } => {
            commands::take::execute(commands::take::TakeArgs {
                bank,
                answers,
                subject,
                difficulty,
                minutes,
                tick_ms,
                format,
                config,
            })
            .await
        }
        Commands::ShowConfig { config } => commands::show_config::execute(config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
