mod runs;
mod schedule;
mod sync;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cellar-cli")]
#[command(about = "Supplier feed reconciliation for the wine catalog")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one sync across every active supplier
    Sync {
        /// Fetch and aggregate offers, print the winners, write nothing
        #[arg(long)]
        dry_run: bool,
        /// Ignore the minimum interval since the last run
        #[arg(long)]
        force: bool,
    },
    /// Run syncs on the configured cron schedule until interrupted
    Schedule,
    /// Database management
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// List recent sync runs
    Runs {
        /// Maximum number of runs to show
        #[arg(long, default_value = "20")]
        limit: i64,
        /// Show one run in detail, including its stored report
        #[arg(long)]
        id: Option<i64>,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Apply pending migrations
    Migrate,
    /// Upsert suppliers from the suppliers file
    Seed,
    /// Check database connectivity
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cellar_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::debug!(?config, env = %config.env, "configuration loaded");

    let Some(command) = cli.command else {
        println!("cellar-cli: no command given; see --help");
        return Ok(());
    };

    let pool = cellar_db::connect_pool(&config).await?;

    match command {
        Commands::Sync { dry_run: true, .. } => sync::run_preview(&pool, &config).await?,
        Commands::Sync {
            dry_run: false,
            force,
        } => {
            sync::run_sync_command(&pool, &config, cellar_db::TRIGGER_CLI, force).await?;
        }
        Commands::Schedule => schedule::run_schedule(pool, config).await?,
        Commands::Db { command } => run_db_command(&pool, &config, command).await?,
        Commands::Runs { id: Some(id), .. } => runs::run_show_run(&pool, id).await?,
        Commands::Runs { limit, id: None } => runs::run_list_runs(&pool, limit).await?,
    }

    Ok(())
}

async fn run_db_command(
    pool: &sqlx::PgPool,
    config: &cellar_core::AppConfig,
    command: DbCommands,
) -> anyhow::Result<()> {
    match command {
        DbCommands::Migrate => {
            let applied = cellar_db::run_migrations(pool).await?;
            println!("applied {applied} migration(s)");
        }
        DbCommands::Seed => {
            let file = cellar_core::load_suppliers(&config.suppliers_path)?;
            let count = cellar_db::seed_suppliers(pool, &file.suppliers).await?;
            println!(
                "seeded {count} supplier(s) from {}",
                config.suppliers_path.display()
            );
        }
        DbCommands::Ping => {
            cellar_db::ping(pool).await?;
            println!("database ok");
        }
    }
    Ok(())
}

/// Marks a run as failed, logging rather than propagating any error in doing so.
pub(crate) async fn fail_run_best_effort(pool: &sqlx::PgPool, run_id: i64, message: String) {
    if let Err(mark_err) = cellar_db::fail_sync_run(pool, run_id, &message).await {
        tracing::error!(
            run_id,
            error = %mark_err,
            "failed to mark sync run as failed"
        );
    }
}
