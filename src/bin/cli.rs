//! CLI binary for moodlist.

use anyhow::Context;
use clap::{Parser, Subcommand};
use moodlist::catalog::{CatalogSource, CsvCatalogSource, JsonCatalogSource, SqliteCatalogSource};
use moodlist::comment::comment_for_labels;
use moodlist::{MoodConfig, build_recommender};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Moodlist: recommend songs from the emotions in a diary entry.
#[derive(Parser)]
#[command(name = "moodlist", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Where the diary text comes from: an argument, a file, or stdin.
#[derive(clap::Args)]
struct DiaryInput {
    /// Diary text. Read from stdin when neither this nor --file is given.
    text: Option<String>,

    /// Read the diary from a file.
    #[arg(short, long, conflicts_with = "text")]
    file: Option<PathBuf>,
}

impl DiaryInput {
    fn read(self) -> anyhow::Result<String> {
        if let Some(text) = self.text {
            return Ok(text);
        }
        if let Some(path) = self.file {
            return std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()));
        }
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("failed to read diary from stdin")?;
        Ok(text)
    }
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Analyze a diary and print recommended songs as JSON.
    Recommend {
        #[command(flatten)]
        input: DiaryInput,

        /// Number of songs to return (overrides ranking.top_k).
        #[arg(long)]
        top_k: Option<usize>,
    },

    /// Print per-sentence emotions and the paragraph classification as JSON.
    Analyze {
        #[command(flatten)]
        input: DiaryInput,
    },

    /// Print the comment for stored labels, e.g. a quadrant and intensity
    /// read back from a saved result.
    Comment {
        /// Quadrant number (1-4).
        quadrant: u8,

        /// Intensity label: neutral, low, medium or high.
        intensity: String,
    },

    /// Write the default configuration file.
    InitConfig {
        /// Destination (defaults to the user config directory).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },

    /// Import a JSON or CSV song catalog into the SQLite catalog table.
    ImportCatalog {
        /// JSON array of songs, or a CSV file (by `.csv` extension).
        file: PathBuf,

        /// Target database (defaults to catalog.path from the config).
        #[arg(long)]
        db: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Users can override with RUST_LOG=debug to see everything.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("moodlist=info,ort=warn,hf_hub=warn")),
        )
        .init();

    let cli = Cli::parse();

    let config = if let Some(ref path) = cli.config {
        MoodConfig::from_file(path)?
    } else {
        MoodConfig::default()
    };

    match cli.command {
        Command::Recommend { input, top_k } => run_recommend(config, input, top_k).await,
        Command::Analyze { input } => run_analyze(&config, input),
        Command::Comment {
            quadrant,
            intensity,
        } => {
            println!("{}", comment_for_labels(quadrant, &intensity));
            Ok(())
        }
        Command::InitConfig { output, force } => init_config(output, force),
        Command::ImportCatalog { file, db } => import_catalog(&config, &file, db),
    }
}

async fn run_recommend(
    mut config: MoodConfig,
    input: DiaryInput,
    top_k: Option<usize>,
) -> anyhow::Result<()> {
    if let Some(k) = top_k {
        config.ranking.top_k = k;
    }
    let text = input.read()?;
    let recommender = Arc::new(build_recommender(&config)?);

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("received Ctrl+C, cancelling...");
            cancel_clone.cancel();
        }
    });

    let result = recommender.recommend_async(text, cancel).await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn run_analyze(config: &MoodConfig, input: DiaryInput) -> anyhow::Result<()> {
    let text = input.read()?;
    let recommender = build_recommender(config)?;
    let report = recommender.analyze(&text)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn init_config(output: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = output.unwrap_or_else(MoodConfig::default_config_path);
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    MoodConfig::default().save_to_file(&path)?;
    println!("wrote {}", path.display());
    Ok(())
}

fn import_catalog(config: &MoodConfig, file: &Path, db: Option<PathBuf>) -> anyhow::Result<()> {
    let is_csv = file
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
    let source: Box<dyn CatalogSource> = if is_csv {
        Box::new(CsvCatalogSource::new(file))
    } else {
        Box::new(JsonCatalogSource::new(file))
    };
    let catalog = source.load()?;
    info!("read {} songs from {}", catalog.len(), source.describe());
    let db = db.unwrap_or_else(|| config.catalog.path.clone());
    let target = SqliteCatalogSource::new(db, &config.catalog.table)?;
    let written = target.write_songs(catalog.songs())?;
    println!("imported {written} songs into {}", target.describe());
    Ok(())
}
