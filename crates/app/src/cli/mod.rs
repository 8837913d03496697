use clap::{Args, Parser, Subcommand, ValueEnum};
use repricer::products::ProductId;
use repricer_app::context::{AppContext, ServiceOptions};
use rust_decimal::Decimal;

use crate::config::{DatabaseConfig, LoggingConfig};

mod audit;
mod db;
mod output;
mod prices;
mod sweep;
mod temporal;

#[derive(Debug, Parser)]
#[command(name = "repricer-app", about = "Repricer CLI", long_about = None)]
pub(crate) struct Cli {
    #[command(flatten)]
    pub(crate) logging: LoggingConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Db(db::DbCommand),
    Prices(prices::PricesCommand),
    Temporal(temporal::TemporalCommand),
    Audit(audit::AuditCommand),
    Sweep(sweep::SweepArgs),
}

impl Cli {
    pub(crate) async fn run(self) -> Result<(), String> {
        match self.command {
            Commands::Db(command) => db::run(command).await,
            Commands::Prices(command) => prices::run(command).await,
            Commands::Temporal(command) => temporal::run(command).await,
            Commands::Audit(command) => audit::run(command).await,
            Commands::Sweep(args) => sweep::run(args).await,
        }
    }
}

/// Which way prices move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum DirectionArg {
    Increase,
    Decrease,
}

impl DirectionArg {
    fn is_increase(self) -> bool {
        self == Self::Increase
    }
}

/// Products and percentage shared by every adjustment command.
#[derive(Debug, Args)]
struct AdjustmentArgs {
    /// Product id; repeat the flag or separate ids with commas
    #[arg(long = "product", value_delimiter = ',', required = true)]
    product_ids: Vec<ProductId>,

    /// Percentage in (0, 100]
    #[arg(long)]
    percentage: Decimal,

    /// Whether prices go up or down
    #[arg(long, value_enum)]
    direction: DirectionArg,
}

async fn connect(
    database: &DatabaseConfig,
    options: ServiceOptions,
) -> Result<AppContext, String> {
    AppContext::from_database_url(&database.database_url, options)
        .await
        .map_err(|error| format!("failed to connect to database: {error}"))
}
