//! depscan CLI entry point

use clap::{Parser, Subcommand};
use depscan_core::{MatchStrategy, Settings};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "depscan")]
#[command(about = "Naive textual file-dependency graphs for git repositories", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to ./depscan.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the repository clones
    #[arg(long, global = true)]
    repositories: Option<PathBuf>,

    /// Directory for graph snapshots
    #[arg(long, global = true)]
    analysis: Option<PathBuf>,

    /// Matcher worker threads
    #[arg(short = 'j', long, global = true)]
    threads: Option<usize>,

    /// Matching strategy: streaming or double-scan
    #[arg(long, global = true)]
    strategy: Option<MatchStrategy>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST server
    Serve {
        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,
    },
    /// Analyse one repository and write its snapshot
    Analyse {
        /// Path to the repository checkout
        path: PathBuf,

        /// Revision to analyse (defaults to HEAD)
        #[arg(long = "rev")]
        version: Option<String>,
    },
    /// Analyse every repository in the repository directory
    AnalyseAll,
    /// Print the dependency edges of a repository version
    Query {
        repo: String,
        version: String,
    },
    /// Print a synthetic ring graph as DOT
    Demo {
        /// small, medium or large
        #[arg(short, long, default_value = "medium")]
        size: String,
    },
    /// Remove every snapshot
    Clear,
    /// Show version
    Version,
}

impl Cli {
    fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref())?;
        if let Some(dir) = &self.repositories {
            settings.repository_directory = dir.clone();
        }
        if let Some(dir) = &self.analysis {
            settings.analysis_directory = dir.clone();
        }
        if let Some(threads) = self.threads {
            settings.threads = threads;
        }
        if let Some(strategy) = self.strategy {
            settings.strategy = strategy;
        }
        settings.validate()?;
        Ok(settings)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!("depscan={}", log_level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Commands::Version = cli.command {
        println!("depscan v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let settings = cli.settings()?;
    tracing::info!("depscan v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Settings: {:?}", settings);

    match cli.command {
        Commands::Serve { port, host } => commands::serve(settings, host, port).await,
        Commands::Analyse { path, version } => {
            commands::analyse(settings, path, version).await
        }
        Commands::AnalyseAll => commands::analyse_all(settings).await,
        Commands::Query { repo, version } => commands::query(settings, repo, version).await,
        Commands::Demo { size } => commands::demo(settings, &size).await,
        Commands::Clear => commands::clear(&settings),
        Commands::Version => Ok(()),
    }
}
