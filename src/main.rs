use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use indexpilot::config::Config;
use indexpilot::db::{Database, PostgresBackend, SqliteBackend, MANAGED_INDEX_PREFIX};
use indexpilot::tuner::plan::{inspect, normalize_sql};
use indexpilot::tuner::{Optimizer, TrainingSummary};
use std::path::PathBuf;
use std::sync::Arc;

/// Online reinforcement-learning index advisor
#[derive(Parser, Debug)]
#[command(name = "indexpilot", about = "Learn which secondary index makes a slow query fast")]
struct Cli {
    /// Path to configuration file (TOML)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Postgres connection string (overrides the config file)
    #[arg(long)]
    db_url: Option<String>,

    /// SQLite database file (overrides the config file)
    #[arg(long)]
    sqlite: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the tuning loop against one query and report the summary
    Optimize {
        /// Target SQL query
        #[arg(long)]
        query: String,

        /// Episode budget (defaults to the configured value)
        #[arg(long)]
        episodes: Option<usize>,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the plan and candidate actions without touching the schema
    Explain {
        /// Target SQL query
        #[arg(long)]
        query: String,
    },

    /// Drop every advisor-managed (idx_-prefixed) index
    ResetIndexes {
        /// Actually drop; without this flag only list what would go
        #[arg(long)]
        yes: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref())?;
    let db = open_database(&cli, &config)?;

    match cli.command {
        Commands::Optimize {
            query,
            episodes,
            json,
        } => {
            let episodes = episodes.unwrap_or(config.tuner.episodes);
            let optimizer = Optimizer::new(db, config.tuner.clone());
            let summary = optimizer.optimize(&query, episodes);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Commands::Explain { query } => {
            let query = normalize_sql(&query);
            let plan_rows = inspect(db.as_ref(), &query);
            if plan_rows.is_empty() {
                println!("no plan available (inspection failed or returned nothing)");
            }
            for row in &plan_rows {
                println!(
                    "table={}  key={}  est_rows={}",
                    row.table,
                    row.access_key.as_deref().unwrap_or("-"),
                    row.estimated_rows
                );
            }
            let optimizer = Optimizer::new(db, config.tuner.clone());
            let env = optimizer.environment(&query);
            println!("\ncandidate actions:");
            for (i, action) in env.catalog().actions().iter().enumerate() {
                println!("  {i:2}  {action}");
            }
        }
        Commands::ResetIndexes { yes } => {
            let indexes = db.list_managed_indexes(MANAGED_INDEX_PREFIX)?;
            if indexes.is_empty() {
                println!("no advisor-managed indexes found");
                return Ok(());
            }
            for index in &indexes {
                if yes {
                    db.drop_index(index)?;
                    println!("dropped {} (on {})", index.name, index.table);
                } else {
                    println!("would drop {} (on {})", index.name, index.table);
                }
            }
            if !yes {
                println!("\nrerun with --yes to drop {} index(es)", indexes.len());
            }
        }
    }

    Ok(())
}

fn open_database(cli: &Cli, config: &Config) -> Result<Arc<dyn Database>> {
    if let Some(path) = cli.sqlite.as_ref().or(config.database.sqlite_path.as_ref()) {
        return Ok(Arc::new(SqliteBackend::new(path)));
    }
    if let Some(url) = cli.db_url.as_deref().or(config.database.url.as_deref()) {
        return Ok(Arc::new(PostgresBackend::new(url)));
    }
    bail!("no database configured: pass --db-url or --sqlite, or set [database] in the config file")
}

fn print_summary(summary: &TrainingSummary) {
    println!("query: {}", summary.query);
    println!("initial latency:  {:.4} s", summary.initial_latency);
    println!("mean after:       {:.4} s", summary.mean_latency_after);
    println!(
        "aggregate gain:   {:.4} s ({:+.2} ms)",
        summary.aggregate_gain,
        summary.aggregate_gain * 1000.0
    );
    println!(
        "best action:      {} - {}",
        summary.best_action, summary.best_description
    );
    if let (Some(before), Some(after)) = (
        summary.slow_probability_before,
        summary.slow_probability_after,
    ) {
        println!("model slow probability: {before:.2} -> {after:.2}");
    }
    for ep in &summary.episodes {
        println!(
            "  episode {:02}  action={}  before={:.4}s  after={:.4}s  reward={:+.4}",
            ep.episode, ep.action, ep.latency_before, ep.latency_after, ep.reward
        );
    }
}
