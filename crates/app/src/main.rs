use chrono::Utc;
use clap::{Parser, Subcommand};
use multimodal_rag_core::{FileOutcome, RagConfig, RagSystem};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "multimodal-rag", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// TOML configuration file. Created with defaults when missing.
    #[arg(long, global = true, env = "RAG_CONFIG", default_value = "config.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default configuration file.
    InitConfig {
        /// Overwrite an existing file.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Ingest every supported file below a folder, recursively.
    Ingest {
        #[arg(long)]
        folder: PathBuf,
    },
    /// Ingest a single file.
    IngestFile {
        #[arg(long)]
        path: PathBuf,
    },
    /// Semantic search over everything ingested so far.
    Search {
        #[arg(long)]
        query: String,
        /// Number of results. Defaults to retrieval.default_top_k.
        #[arg(long)]
        top_k: Option<usize>,
        /// Minimum similarity in [0, 1]. Defaults to retrieval.similarity_threshold.
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Print index statistics.
    Stats,
}

fn init_tracing(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");
    let cli = Cli::parse();

    if let Command::InitConfig { force } = cli.command {
        if cli.config.exists() && !force {
            anyhow::bail!(
                "{} already exists (use --force to overwrite)",
                cli.config.display()
            );
        }
        RagConfig::default().write(&cli.config)?;
        println!("wrote {}", cli.config.display());
        return Ok(());
    }

    let config = RagConfig::load_or_init(&cli.config)?;
    init_tracing(&config.logging.level);
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        config = %cli.config.display(),
        "multimodal-rag boot"
    );

    let system = RagSystem::from_config(config).await?;

    match cli.command {
        Command::InitConfig { .. } => {}
        Command::Ingest { folder } => {
            let stats = system.process_folder(&folder).await?;

            for failed in &stats.failed_files {
                warn!(path = %failed.path.display(), reason = %failed.reason, "file not ingested");
            }

            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::IngestFile { path } => {
            let outcome = system.process_file(&path).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);

            if let FileOutcome::Failed { error, .. } = outcome {
                anyhow::bail!("{} was not ingested: {error}", path.display());
            }
        }
        Command::Search {
            query,
            top_k,
            threshold,
        } => {
            let results = system.search(&query, top_k, threshold).await?;

            println!("query: {query}");
            if results.is_empty() {
                println!("no results above the similarity threshold");
            }

            for (rank, result) in results.iter().enumerate() {
                let mut location = result.metadata.filename.clone();
                if let Some(page) = result.metadata.page_number {
                    location.push_str(&format!(" page={page}"));
                }
                println!(
                    "{}. [{}] score={:.4} source={} id={}",
                    rank + 1,
                    result.document_type,
                    result.score,
                    location,
                    result.id
                );
                println!("   {}", result.content.replace('\n', "\n   "));
            }
        }
        Command::Stats => {
            let stats = system.get_stats().await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    Ok(())
}
