mod cmd;
mod logging;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "indexq", version, about = "Inspect and maintain the persisted re-indexing queue")]
struct Cli {
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true)]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Validate configuration and print resolved paths
    Doctor,

    /// Show the number of pending queue rows
    Status(StatusArgs),

    /// List the oldest pending queue rows
    List(ListArgs),

    /// Remove pending queue rows
    Purge(PurgeArgs),

    /// Query the full-text index
    Search(SearchArgs),
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Maximum number of rows to show
    #[arg(long, default_value_t = 50)]
    pub limit: usize,

    /// Print machine-readable JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct PurgeArgs {
    /// Remove every row for one content item
    #[arg(long)]
    pub content_id: Option<i64>,

    /// Remove every row for one content type
    #[arg(long)]
    pub content_type: Option<i64>,

    /// Remove all pending rows
    #[arg(long)]
    pub all: bool,
}

#[derive(Debug, Args)]
pub struct SearchArgs {
    /// FTS5 query string
    pub query: String,

    /// Maximum number of hits
    #[arg(long, default_value_t = 20)]
    pub limit: usize,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let config = cli.config.as_deref();
    let profile = cli.profile.as_deref();

    match cli.command {
        Commands::Doctor => cmd::doctor::run(config, profile),
        Commands::Status(args) => cmd::status::run(config, profile, &args)?,
        Commands::List(args) => cmd::list::run(config, profile, &args)?,
        Commands::Purge(args) => cmd::purge::run(config, profile, &args)?,
        Commands::Search(args) => cmd::search::run(config, profile, &args)?,
    }
    Ok(())
}
