use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod alerts;
mod classes;
mod collector;
mod config;
mod dashboard;
mod db;
mod distribution;
mod error;
mod models;
mod normalize;
mod performers;
mod report;
mod revenue;
mod sources;
mod students;
mod teachers;
mod teaching;
mod window;

use config::{Backend, Config};
use dashboard::DashboardService;
use sources::{DirectorySource, Feed, RecordSource};

#[derive(Parser)]
#[command(name = "dashboard-analytics")]
#[command(about = "Analytics aggregation for the admin and teacher dashboards", long_about = None)]
struct Cli {
    /// Read `<feed>.json` / `<feed>.csv` files from this directory instead of Postgres
    #[arg(long, global = true, env = "DASHBOARD_DATA_DIR")]
    data_dir: Option<PathBuf>,
    /// Per-source fetch timeout
    #[arg(long, global = true, env = "DASHBOARD_SOURCE_TIMEOUT_MS", default_value_t = 5000)]
    source_timeout_ms: u64,
    /// Maximum alerts shown on the teacher dashboard
    #[arg(long, global = true, default_value_t = 8)]
    alert_limit: usize,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data for every feed
    Seed,
    /// Import raw records for one feed from a CSV or JSON file
    Import {
        #[arg(long, value_enum)]
        feed: Feed,
        #[arg(long)]
        file: PathBuf,
    },
    /// Build the admin dashboard
    Admin {
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Build the teacher dashboard, optionally for one teacher
    Teacher {
        #[arg(long)]
        teacher_id: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Markdown,
}

async fn connect(database_url: &str) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

async fn record_source(config: &Config) -> anyhow::Result<Arc<dyn RecordSource>> {
    Ok(match &config.backend {
        Backend::Directory(dir) => {
            info!(dir = %dir.display(), "reading feeds from directory");
            Arc::new(DirectorySource::new(dir.clone()))
        }
        Backend::Postgres(url) => Arc::new(db::PgSource::new(connect(url).await?)),
    })
}

fn render<T: Serialize>(
    payload: &T,
    format: OutputFormat,
    markdown: impl FnOnce(&T) -> String,
) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(payload).context("failed to serialize dashboard")
        }
        OutputFormat::Markdown => Ok(markdown(payload)),
    }
}

fn emit(content: &str, out: Option<&PathBuf>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Dashboard written to {}.", path.display());
        }
        None => println!("{content}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let now = chrono::Utc::now().naive_utc();

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&Config::database_url()?).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&Config::database_url()?).await?;
            let inserted = db::seed(&pool, now).await?;
            println!("Seed data inserted ({inserted} new records).");
        }
        Commands::Import { feed, file } => {
            let pool = connect(&Config::database_url()?).await?;
            let inserted = db::import_file(&pool, feed, &file).await?;
            println!("Inserted {inserted} {feed} records from {}.", file.display());
        }
        Commands::Admin { format, out } => {
            let config = Config::resolve(
                cli.data_dir,
                std::env::var("DATABASE_URL").ok(),
                cli.source_timeout_ms,
                cli.alert_limit,
            )?;
            let service = DashboardService::new(
                record_source(&config).await?,
                config.source_timeout,
                config.alert_limit,
            );
            let dashboard = service.admin_dashboard(now).await?;
            let content = render(&dashboard, format, report::build_admin_report)?;
            emit(&content, out.as_ref())?;
        }
        Commands::Teacher {
            teacher_id,
            format,
            out,
        } => {
            let config = Config::resolve(
                cli.data_dir,
                std::env::var("DATABASE_URL").ok(),
                cli.source_timeout_ms,
                cli.alert_limit,
            )?;
            let service = DashboardService::new(
                record_source(&config).await?,
                config.source_timeout,
                config.alert_limit,
            );
            let dashboard = service.teacher_dashboard(teacher_id.as_deref(), now).await?;
            let content = render(&dashboard, format, |d| {
                report::build_teacher_report(d, teacher_id.as_deref())
            })?;
            emit(&content, out.as_ref())?;
        }
    }

    Ok(())
}
