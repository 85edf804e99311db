//! Focuspath - adaptive study companion
//!
//! Command-line entry point over the companion: plan a task, rate answers,
//! critique them, inspect and tune the learner profile and knowledge memory.

use clap::{Parser, Subcommand};
use focuspath_core::{
    error::Result,
    types::{Difficulty, DurationVerdict},
};
use std::path::PathBuf;
use tracing::{debug, Level};
use tracing_subscriber::{self, EnvFilter};

mod cli;

use cli::helpers::GlobalArgs;

#[derive(Parser)]
#[command(name = "focuspath")]
#[command(about = "Adaptive study companion that learns from your feedback", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Set log level
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Data directory (overrides configuration)
    #[arg(long, env = "FOCUSPATH_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Never use the web, whatever the profile says
    #[arg(long)]
    offline: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Decide where the content for a task comes from and show the bundle
    Plan {
        /// Task text
        task: String,

        /// Subject (maths, histoire, ...)
        #[arg(short, long)]
        subject: String,

        /// Topic within the subject
        #[arg(short, long)]
        topic: Option<String>,

        /// School level (seconde, premiere, terminale, ...)
        #[arg(long)]
        level: Option<String>,

        /// Ask for web enrichment (still requires consent)
        #[arg(long)]
        web: bool,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Parse a critique of an answer and remember what was missing
    Critique {
        /// Critique text
        text: String,

        #[arg(short, long)]
        subject: String,

        #[arg(short, long)]
        topic: Option<String>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Rate an answer or a session
    Rate {
        #[command(subcommand)]
        action: cli::rate::RateAction,
    },

    /// Report a finished task
    Complete {
        #[arg(short, long)]
        subject: String,

        /// Duration history bucket (usually the task type)
        #[arg(short, long, default_value = "autre")]
        category: String,

        #[arg(short, long, default_value = "medium")]
        difficulty: Difficulty,

        /// Estimated minutes
        #[arg(short, long)]
        estimated: u32,

        /// Actual minutes
        #[arg(short, long)]
        actual: u32,

        /// Task identifier (generated when absent)
        #[arg(long)]
        task_id: Option<String>,

        /// too_short, accurate or too_long (derived when absent)
        #[arg(long)]
        verdict: Option<DurationVerdict>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show or change the learner profile
    Profile {
        #[command(subcommand)]
        action: cli::profile::ProfileAction,
    },

    /// Inspect or maintain the knowledge memory
    Memory {
        #[command(subcommand)]
        action: cli::memory::MemoryAction,
    },

    /// Adaptation suggestions, detail level and web advice
    Suggest {
        /// Task text, for web advice
        #[arg(long)]
        task: Option<String>,

        /// Subject, for detail level and web advice
        #[arg(short, long)]
        subject: Option<String>,

        /// Apply the detail level suggestion when there is one
        #[arg(long)]
        apply: bool,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.log_level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Our crates at the requested level, HTTP stack kept quiet
    let filter = EnvFilter::new(format!(
        "focuspath={lvl},focuspath_core={lvl},reqwest=warn,hyper=warn",
        lvl = level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr) // Write logs to stderr, not stdout
        .init();

    debug!("Focuspath v{} starting...", env!("CARGO_PKG_VERSION"));

    let global = GlobalArgs {
        data_dir: cli.data_dir,
        config: cli.config,
        offline: cli.offline,
    };

    match cli.command {
        Commands::Plan {
            task,
            subject,
            topic,
            level,
            web,
            format,
        } => cli::plan::handle(&global, task, subject, topic, level, web, format).await,
        Commands::Critique {
            text,
            subject,
            topic,
            format,
        } => cli::critique::handle(&global, text, subject, topic, format).await,
        Commands::Rate { action } => cli::rate::handle(&global, action).await,
        Commands::Complete {
            subject,
            category,
            difficulty,
            estimated,
            actual,
            task_id,
            verdict,
            format,
        } => {
            let task = focuspath_core::CompletedTask {
                task_id,
                subject,
                category,
                difficulty,
                estimated_minutes: estimated,
                actual_minutes: actual,
                verdict,
            };
            cli::complete::handle(&global, task, format).await
        }
        Commands::Profile { action } => cli::profile::handle(&global, action).await,
        Commands::Memory { action } => cli::memory::handle(&global, action).await,
        Commands::Suggest {
            task,
            subject,
            apply,
            format,
        } => cli::suggest::handle(&global, task, subject, apply, format).await,
    }
}
