use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::EnvFilter;

use guardian_memory::storage::{StorageConfig, StorageManager};
use guardian_memory::{BrainEngine, EngineConfig};

#[derive(Parser)]
#[command(name = "guardian-memory", version, about = "Query a lexical knowledge base")]
struct Cli {
    /// Association window size
    #[arg(long, global = true, default_value_t = 50)]
    window: usize,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Find the best matching line for some text
    Query {
        corpus: PathBuf,
        text: String,
        #[arg(short, long, default_value_t = 5)]
        limit: usize,
    },
    /// Print index statistics
    Stats { corpus: PathBuf },
    /// Build the index and write a compressed snapshot
    Snapshot { corpus: PathBuf, out: PathBuf },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = EngineConfig {
        association_window: cli.window,
        ..EngineConfig::default()
    };

    match run(cli.command, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Command, config: EngineConfig) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::Query {
            corpus,
            text,
            limit,
        } => {
            let engine = BrainEngine::from_text(&std::fs::read_to_string(corpus)?, config);
            let outcome = engine.query(&text, limit);
            println!("found:      {}", outcome.found);
            println!("confidence: {:.2}", outcome.confidence);
            println!("best match: {}", outcome.best_match);
            for alt in &outcome.alternatives {
                println!("  - {alt}");
            }
        }
        Command::Stats { corpus } => {
            let engine = BrainEngine::from_text(&std::fs::read_to_string(corpus)?, config);
            let stats = engine.stats();
            println!("nodes:           {}", stats.total_nodes);
            println!("distinct tokens: {}", stats.distinct_tokens);
            println!("categories:      {}", stats.categories);
            println!("edges:           {}", stats.association_edges);
            println!("avg connections: {:.2}", stats.avg_connections);
        }
        Command::Snapshot { corpus, out } => {
            let engine = BrainEngine::from_text(&std::fs::read_to_string(corpus)?, config);
            let storage = StorageManager::new(StorageConfig {
                log_path: out.with_extension("log"),
                snapshot_path: out,
                ..StorageConfig::default()
            })?;
            let metrics = storage.save_snapshot(&engine)?;
            println!(
                "wrote {} nodes, {} -> {} bytes",
                engine.len(),
                metrics.original_size,
                metrics.compressed_size
            );
        }
    }
    Ok(())
}
