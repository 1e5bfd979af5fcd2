//! GeoContext CLI - Command-line interface
//!
//! Queries the services listed in the registry document for a map point and
//! prints the results as JSON or GeoJSON on stdout. Logs go to the log file
//! and, on a terminal, to stderr.

mod commands;
mod error;
mod runner;

use clap::{Parser, Subcommand};

use commands::cache::CacheAction;
use commands::query::{PointArgs, Target};
use error::CliError;
use runner::CliRunner;

#[derive(Parser)]
#[command(name = "geocontext")]
#[command(version = geocontext::VERSION)]
#[command(about = "Contextual information for any map point", long_about = None)]
struct Cli {
    /// Do not log to stderr
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Look up the value of one service at a point
    Service {
        /// Service key from the registry
        key: String,

        #[command(flatten)]
        point: PointArgs,
    },

    /// Look up every service of a group at a point
    Group {
        /// Group key from the registry
        key: String,

        #[command(flatten)]
        point: PointArgs,
    },

    /// Look up every group of a collection at a point
    Collection {
        /// Collection key from the registry
        key: String,

        #[command(flatten)]
        point: PointArgs,
    },

    /// Check services at their configured test points
    Check {
        /// Service key, all services with a test point when omitted
        key: Option<String>,
    },

    /// Cache management
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        e.exit();
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let runner = CliRunner::new(cli.quiet)?;

    match cli.command {
        Commands::Service { key, point } => {
            runner.log_startup("service");
            commands::query::run(&runner, Target::Service, &key, point).await
        }
        Commands::Group { key, point } => {
            runner.log_startup("group");
            commands::query::run(&runner, Target::Group, &key, point).await
        }
        Commands::Collection { key, point } => {
            runner.log_startup("collection");
            commands::query::run(&runner, Target::Collection, &key, point).await
        }
        Commands::Check { key } => {
            runner.log_startup("check");
            commands::check::run(&runner, key).await
        }
        Commands::Cache { action } => {
            runner.log_startup("cache");
            commands::cache::run(&runner, action).await
        }
    }
}
