//! devgraph CLI - structural dependency graphs for source trees.
//!
//! Usage:
//!   devgraph build                  # Full build, writes .devgraph/graph.json
//!   devgraph update <files>...      # Merge changed files into the saved graph
//!   devgraph stats                  # Graph statistics of the saved graph
//!   devgraph scan                   # Count source files by language
//!   devgraph watch                  # Stream graph updates as JSON lines

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use devgraph::graph::Layout;
use devgraph::{
    build_graph, merge_incremental, scan_stats, start_watching, DevGraphConfig, GraphService,
    GraphSnapshot, GraphState,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "devgraph")]
#[command(about = "devgraph - structural dependency graphs for source trees", long_about = None)]
struct Cli {
    /// Repository root directory (default: current directory)
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    /// Config file (default: <root>/.devgraph/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the graph from scratch and save the snapshot
    Build {
        /// Where to write the snapshot JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Merge changed files into a saved snapshot
    Update {
        /// Repo-relative paths of the changed files
        #[arg(required = true)]
        files: Vec<String>,

        /// Snapshot to update in place
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },

    /// Show graph statistics for a saved snapshot
    Stats {
        /// Snapshot to read
        #[arg(short, long)]
        snapshot: Option<PathBuf>,
    },

    /// Count the source files a build would scan
    Scan,

    /// Keep the graph live and print every update as one JSON line
    Watch,
}

fn main() {
    // Logs go to stderr; stdout carries snapshots and stats.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let root = cli.root.canonicalize().unwrap_or(cli.root);
    let data_dir = root.join(".devgraph");
    let config_path = cli.config.unwrap_or_else(|| data_dir.join("config.toml"));
    let config = DevGraphConfig::load(&config_path);
    let default_snapshot = data_dir.join("graph.json");

    match cli.command {
        Commands::Build { output } => {
            let output = output.unwrap_or(default_snapshot);
            eprintln!("Building graph...");
            let state = build_graph(&root, &config);
            state
                .snapshot()
                .save(&output)
                .with_context(|| format!("failed to save snapshot to {}", output.display()))?;

            let stats = state.stats();
            println!("✓ Graph built → {}", output.display());
            println!("  Files:     {}", stats.file_count);
            println!("  Classes:   {}", stats.class_count);
            println!("  Functions: {}", stats.function_count);
            println!("  External:  {}", stats.external_count);
            println!("  Links:     {}", stats.total_links);
        }

        Commands::Update { files, snapshot } => {
            let path = snapshot.unwrap_or(default_snapshot);
            let mut state = load_state(&path, &config)?;
            let before = (state.node_count(), state.link_count());

            let updated = merge_incremental(&mut state, &root, &files, &config.scan);
            updated
                .save(&path)
                .with_context(|| format!("failed to save snapshot to {}", path.display()))?;

            println!(
                "✓ Merged {} file(s): +{} nodes, +{} links",
                files.len(),
                state.node_count() - before.0,
                state.link_count() - before.1
            );
        }

        Commands::Stats { snapshot } => {
            let path = snapshot.unwrap_or(default_snapshot);
            let state = load_state(&path, &config)?;
            let json = serde_json::to_string_pretty(&state.stats())?;
            println!("{}", json);
        }

        Commands::Scan => {
            println!("{}", scan_stats(&root, &config.scan));
        }

        Commands::Watch => watch(root, config)?,
    }

    Ok(())
}

/// Load a saved snapshot into a graph state, keeping its coordinates.
fn load_state(path: &Path, config: &DevGraphConfig) -> Result<GraphState> {
    let snapshot = GraphSnapshot::load(path).with_context(|| {
        format!(
            "no usable snapshot at {} (run `devgraph build` first)",
            path.display()
        )
    })?;
    Ok(GraphState::from_snapshot(
        snapshot,
        Layout::new(config.layout.extent),
    ))
}

fn watch(root: PathBuf, config: DevGraphConfig) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async move {
        let graph = GraphService::spawn(root.clone(), config.clone());
        let mut subscription = graph.subscribe().await?;

        let initial = graph.rebuild().await?;
        info!(
            nodes = initial.nodes.len(),
            links = initial.links.len(),
            "initial graph ready"
        );

        let _watcher = match start_watching(&root, &config, graph.clone()) {
            Ok(handle) => {
                info!("file watcher active, graph updates in real-time");
                Some(handle)
            }
            Err(e) => {
                warn!(error = %e, "file watcher failed to start, graph will be static");
                None
            }
        };

        let mut stdout = std::io::stdout();
        loop {
            tokio::select! {
                update = subscription.updates.recv() => {
                    let Some(snapshot) = update else { break };
                    serde_json::to_writer(&mut stdout, snapshot.as_ref())?;
                    writeln!(stdout)?;
                    stdout.flush()?;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupted, shutting down");
                    break;
                }
            }
        }

        graph.unsubscribe(subscription.id).await.ok();
        Ok::<(), anyhow::Error>(())
    })
}
