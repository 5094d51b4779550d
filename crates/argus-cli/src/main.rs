mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "argus-cli")]
#[command(about = "argus intelligence pipeline command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Seed sources and PIRs from the bootstrap YAML into the database.
    Seed {
        /// Override the bootstrap file path from config.
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Ingest a CSV export into the processing queue.
    Ingest {
        /// CSV file to ingest.
        file: PathBuf,
        /// Slug of the (csv-kind) source to attribute items to.
        #[arg(long, default_value = "csv-uploads")]
        source: String,
    },
    /// Add a single analyst-entered item.
    Add {
        #[arg(long)]
        title: String,
        #[arg(long)]
        body: String,
        #[arg(long)]
        link: Option<String>,
    },
    /// Fetch feed sources now.
    Refresh {
        /// Refresh only the source with this slug; all active feed sources
        /// otherwise.
        #[arg(long)]
        source: Option<String>,
    },
    /// Drain pending queue entries through classification.
    Process {
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// List queue entries by status.
    Queue {
        #[arg(long, default_value = "pending")]
        status: String,
    },
    /// Review operations.
    Review {
        #[command(subcommand)]
        command: ReviewCommands,
    },
}

#[derive(Debug, Subcommand)]
enum ReviewCommands {
    /// List entries awaiting an analyst decision.
    List,
    /// Approve one entry.
    Approve {
        id: i64,
        #[arg(long, default_value = "cli")]
        by: String,
    },
    /// Reject one entry.
    Reject {
        id: i64,
        #[arg(long, default_value = "cli")]
        by: String,
    },
    /// Publish all approved entries to the intelligence feed.
    Publish,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let config = argus_core::load_app_config()?;
    let pool_config = argus_db::PoolConfig::from_app_config(&config);
    let pool = argus_db::connect_pool(&config.database_url, pool_config).await?;
    argus_db::run_migrations(&pool).await?;
    match cli.command {
        Commands::Seed { path } => {
            let path = path.unwrap_or_else(|| config.bootstrap_path.clone());
            commands::seed(&pool, &path).await?;
        }
        Commands::Ingest { file, source } => {
            commands::ingest_csv(&pool, &file, &source).await?;
        }
        Commands::Add { title, body, link } => {
            commands::add_manual(&pool, &title, &body, link.as_deref()).await?;
        }
        Commands::Refresh { source } => {
            commands::refresh(&pool, &config, source.as_deref()).await?;
        }
        Commands::Process { limit } => {
            commands::process(&pool, &config, limit).await?;
        }
        Commands::Queue { status } => {
            commands::list_queue(&pool, &status).await?;
        }
        Commands::Review { command } => match command {
            ReviewCommands::List => commands::list_review(&pool).await?,
            ReviewCommands::Approve { id, by } => {
                commands::decide(&pool, id, argus_core::Decision::Approved, &by).await?;
            }
            ReviewCommands::Reject { id, by } => {
                commands::decide(&pool, id, argus_core::Decision::Rejected, &by).await?;
            }
            ReviewCommands::Publish => commands::publish(&pool).await?,
        },
    }

    Ok(())
}
