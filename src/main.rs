//! Trellis CLI entry point

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trellis_cache::CacheOutputType;

mod commands;

#[derive(Parser)]
#[command(name = "trellis")]
#[command(about = "Dependency graph queries, linting and build cache keys", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Repository root path (defaults to current directory)
    #[arg(short, long, default_value = ".")]
    root: PathBuf,

    /// Graph description file, relative to the root
    #[arg(short, long, global = true, default_value = commands::DEFAULT_GRAPH_FILE)]
    graph: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint the graph and fail on errors
    Lint,
    /// Query the dependencies of a target
    Deps {
        /// Target name
        #[arg(short, long)]
        target: String,

        /// Project path of the target, when the name is ambiguous
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Which dependencies to list
        #[arg(short, long, value_enum, default_value_t = Query::Direct)]
        query: Query,
    },
    /// Compute content hashes of every cacheable target
    Hash {
        /// Cache profile (defaults to the configured default profile)
        #[arg(short, long)]
        profile: Option<String>,

        /// Cache output type
        #[arg(short, long, default_value = "framework")]
        output: CacheOutputType,

        /// Save a hash report and show what changed since the last one
        #[arg(short, long)]
        write: bool,
    },
    /// List the buildable targets of the entry projects
    Targets,
    /// Clear the cache
    Clear,
    /// Show version
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Query {
    Direct,
    Transitive,
    Static,
    Resources,
    Extensions,
    Tests,
    Linkable,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(format!(
            "trellis={log_level},trellis_graph={log_level},trellis_cache={log_level}"
        )))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::debug!("Trellis v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!("Repository root: {}", cli.root.display());

    let graph_file = cli.root.join(&cli.graph);
    match cli.command {
        Commands::Lint => commands::lint(&cli.root, &graph_file),
        Commands::Deps {
            target,
            path,
            query,
        } => commands::deps(&cli.root, &graph_file, &target, path.as_deref(), query),
        Commands::Hash {
            profile,
            output,
            write,
        } => commands::hash(&cli.root, &graph_file, profile.as_deref(), output, write),
        Commands::Targets => commands::targets(&cli.root, &graph_file),
        Commands::Clear => commands::clear(&cli.root),
        Commands::Version => {
            println!("Trellis v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
