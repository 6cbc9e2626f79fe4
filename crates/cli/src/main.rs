use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;

use stockwise_analytics::{AnalyticsFacade, ProductQuery};
use stockwise_infra::{DatabaseConfig, PostgresRecordStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockwise_observability::init();

    let cli = Cli::parse();

    let config = DatabaseConfig::from_env().context("reading database configuration")?;
    tracing::debug!(?config, "database configuration loaded");

    let pool = PgPoolOptions::new()
        .max_connections(cli.max_connections)
        .connect_with(config.connect_options()?)
        .await
        .context("connecting to the database")?;

    let store = PostgresRecordStore::new(pool);
    let facade = AnalyticsFacade::new(store);

    match cli.command {
        Command::Migrate => {
            facade.store().ensure_schema().await?;
            tracing::info!("schema ready");
        }
        Command::Stats => {
            let stats = blocking(move || Ok(facade.compute_stats())).await?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Products(args) => {
            let query = args.into_query();
            let products = blocking(move || Ok(facade.list_products(&query)?)).await?;
            println!("{}", serde_json::to_string_pretty(&products)?);
        }
        Command::Report(args) => {
            let format = args.format;
            let report = blocking(move || Ok(facade.generate_report(format.as_deref())?)).await?;

            tokio::fs::create_dir_all(&args.output)
                .await
                .with_context(|| format!("creating {}", args.output.display()))?;
            let path = args.output.join(report.file_name);
            tokio::fs::write(&path, &report.bytes)
                .await
                .with_context(|| format!("writing {}", path.display()))?;

            tracing::info!(
                path = %path.display(),
                rows = report.row_count,
                grand_total = %report.grand_total,
                "report written"
            );
            println!("{}", path.display());
        }
    }

    Ok(())
}

/// Run synchronous analytics work off the async worker threads.
async fn blocking<T, F>(f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("analytics task panicked")?
}

/// Inventory statistics and stock reports.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Maximum number of pooled database connections.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the products and stock_movements tables if they are missing.
    Migrate,
    /// Print dashboard statistics as JSON.
    Stats,
    /// Print a filtered product listing as JSON.
    Products(ProductsArgs),
    /// Write a stock report over every product.
    Report(ReportArgs),
}

#[derive(Debug, Parser)]
struct ProductsArgs {
    /// Case-insensitive name substring.
    #[arg(long)]
    name: Option<String>,

    /// Exact category.
    #[arg(long)]
    category: Option<String>,

    /// Minimum quantity (ignored if not a number).
    #[arg(long)]
    min: Option<String>,

    /// Maximum quantity (ignored if not a number).
    #[arg(long)]
    max: Option<String>,
}

impl ProductsArgs {
    fn into_query(self) -> ProductQuery {
        ProductQuery {
            name: self.name,
            category: self.category,
            min: self.min,
            max: self.max,
        }
    }
}

#[derive(Debug, Parser)]
struct ReportArgs {
    /// `pdf` or `csv`; defaults to pdf.
    #[arg(long)]
    format: Option<String>,

    /// Directory the report file is written to.
    #[arg(long, default_value = ".")]
    output: PathBuf,
}
