use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::Context;

#[derive(Parser)]
#[command(name = "walls")]
#[command(about = "walls (wallpaper library with precached effects)")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true, env = "WALLS_VERBOSE")]
    verbose: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, env = "WALLS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add an image, or every image in a directory, to the library
    #[command(visible_alias = "a")]
    Add {
        /// Id to store the wallpaper under (defaults to the file name)
        #[arg(long)]
        id: Option<String>,

        /// Skip precaching effects for the added wallpapers
        #[arg(long)]
        no_precache: bool,

        path: PathBuf,
    },

    /// Apply configured effects ahead of time
    Precache {
        /// Re-run effects even if they are already cached
        #[arg(long)]
        force: bool,

        /// Exit with an error if any wallpaper failed to precache
        #[arg(long)]
        strict: bool,

        /// Wallpapers to precache (all when omitted)
        ids: Vec<String>,
    },

    /// List wallpapers in the library
    #[command(visible_aliases = ["ls", "l"])]
    List {
        /// Show details and effect cache status
        #[arg(short, long)]
        long: bool,

        /// Print JSON instead of text
        #[arg(short, long)]
        json: bool,
    },

    /// Delete a wallpaper and its cached effects
    #[command(visible_aliases = ["rm", "del"])]
    Delete {
        /// Warn instead of failing on missing wallpapers or files
        #[arg(short, long)]
        force: bool,

        id: String,
    },

    /// Set the wallpaper (a random enabled one when no id is given)
    #[command(visible_alias = "s")]
    Set { id: Option<String> },
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => walls_config::default_config_path().map_err(commands::report)?,
    };
    let mut ctx = Context::load(&config_path)?;

    match cli.command {
        Commands::Add {
            id,
            no_precache,
            path,
        } => commands::add(&mut ctx, &path, id.as_deref(), !no_precache).await,
        Commands::Precache { force, strict, ids } => {
            commands::precache(&ctx, &ids, force, strict).await
        }
        Commands::List { long, json } => commands::list(&ctx, long, json),
        Commands::Delete { force, id } => commands::delete(&mut ctx, &id, force),
        Commands::Set { id } => commands::set(&ctx, id.as_deref()).await,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // the command future is dropped on ctrl-c, killing any running effect commands
    let outcome = tokio::select! {
        result = run(cli) => Some(result),
        _ = tokio::signal::ctrl_c() => None,
    };

    match outcome {
        Some(result) => result,
        None => {
            log::warn!("Interrupted");
            Err(anyhow::anyhow!("interrupted"))
        }
    }
}
