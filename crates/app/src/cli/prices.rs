use clap::{Args, Subcommand};
use repricer_app::{context::ServiceOptions, domain::adjustments::data::NewPermanentAdjustment};

use crate::{
    cli::{AdjustmentArgs, connect, output},
    config::{DatabaseConfig, OutputConfig},
};

#[derive(Debug, Args)]
pub(super) struct PricesCommand {
    #[command(subcommand)]
    pub(super) command: PricesSubcommand,
}

#[derive(Debug, Subcommand)]
pub(super) enum PricesSubcommand {
    /// Preview a permanent adjustment without writing
    Simulate(SimulateArgs),

    /// Apply a permanent adjustment and record it in the audit log
    Apply(ApplyArgs),
}

#[derive(Debug, Args)]
pub(super) struct SimulateArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    #[command(flatten)]
    output: OutputConfig,

    #[command(flatten)]
    adjustment: AdjustmentArgs,
}

#[derive(Debug, Args)]
pub(super) struct ApplyArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    #[command(flatten)]
    pub(super) adjustment: AdjustmentArgs,

    /// Free-text reason stored with the adjustment
    #[arg(long, default_value = "")]
    description: String,

    /// User recorded as the author
    #[arg(long, env = "REPRICER_ACTOR")]
    actor: String,
}

pub(super) async fn run(command: PricesCommand) -> Result<(), String> {
    match command.command {
        PricesSubcommand::Simulate(args) => simulate(args).await,
        PricesSubcommand::Apply(args) => apply(args).await,
    }
}

async fn simulate(args: SimulateArgs) -> Result<(), String> {
    let currency = output::currency(&args.output.currency)?;
    let context = connect(&args.database, ServiceOptions::default()).await?;

    let rows = context
        .permanent
        .simulate(
            &args.adjustment.product_ids,
            args.adjustment.percentage,
            args.adjustment.direction.is_increase(),
        )
        .await
        .map_err(|error| format!("failed to simulate adjustment: {error}"))?;

    if rows.is_empty() {
        println!("no matching products");
        return Ok(());
    }

    println!("{}", output::preview_table(&rows, currency));

    Ok(())
}

async fn apply(args: ApplyArgs) -> Result<(), String> {
    let context = connect(&args.database, ServiceOptions::default()).await?;

    let record = context
        .permanent
        .apply(NewPermanentAdjustment {
            product_ids: args.adjustment.product_ids,
            percentage: args.adjustment.percentage,
            is_increase: args.adjustment.direction.is_increase(),
            description: args.description,
            actor: args.actor,
        })
        .await
        .map_err(|error| format!("failed to apply adjustment: {error}"))?;

    output::print_record(&record);

    Ok(())
}
