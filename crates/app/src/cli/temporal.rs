use clap::{Args, Subcommand};
use jiff::Timestamp;
use repricer_app::{
    context::ServiceOptions,
    domain::adjustments::{
        data::NewTemporalAdjustment,
        records::{AdjustmentState, AdjustmentUuid},
    },
};

use crate::{
    cli::{AdjustmentArgs, connect, output},
    config::{DatabaseConfig, OutputConfig},
};

#[derive(Debug, Args)]
pub(super) struct TemporalCommand {
    #[command(subcommand)]
    command: TemporalSubcommand,
}

#[derive(Debug, Subcommand)]
enum TemporalSubcommand {
    /// Preview a temporal adjustment without writing
    Simulate(SimulateArgs),

    /// Register a temporal adjustment
    Create(CreateArgs),

    /// Apply a scheduled adjustment now
    Activate(TransitionArgs),

    /// Restore the prices an active adjustment replaced
    Finalize(TransitionArgs),

    /// List adjustments in one state
    List(ListArgs),
}

/// Start and end of the adjustment window, as RFC 3339 timestamps.
#[derive(Debug, Args)]
struct WindowArgs {
    #[arg(long)]
    starts_at: Timestamp,

    #[arg(long)]
    ends_at: Timestamp,
}

#[derive(Debug, Args)]
struct SimulateArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    #[command(flatten)]
    output: OutputConfig,

    #[command(flatten)]
    adjustment: AdjustmentArgs,

    #[command(flatten)]
    window: WindowArgs,
}

#[derive(Debug, Args)]
struct CreateArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    #[command(flatten)]
    adjustment: AdjustmentArgs,

    #[command(flatten)]
    window: WindowArgs,

    /// Category label, e.g. promo or seasonal
    #[arg(long)]
    category: String,

    /// Free-text reason stored with the adjustment
    #[arg(long, default_value = "")]
    description: String,

    /// User recorded as the author
    #[arg(long, env = "REPRICER_ACTOR")]
    actor: String,
}

#[derive(Debug, Args)]
struct TransitionArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    /// User recorded in the audit entry
    #[arg(long, env = "REPRICER_ACTOR")]
    actor: String,

    /// Adjustment UUID
    adjustment_uuid: AdjustmentUuid,
}

#[derive(Debug, Args)]
struct ListArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    #[arg(long, value_enum, default_value_t = AdjustmentState::Scheduled)]
    state: AdjustmentState,
}

pub(super) async fn run(command: TemporalCommand) -> Result<(), String> {
    match command.command {
        TemporalSubcommand::Simulate(args) => simulate(args).await,
        TemporalSubcommand::Create(args) => create(args).await,
        TemporalSubcommand::Activate(args) => activate(args).await,
        TemporalSubcommand::Finalize(args) => finalize(args).await,
        TemporalSubcommand::List(args) => list(args).await,
    }
}

async fn simulate(args: SimulateArgs) -> Result<(), String> {
    let currency = output::currency(&args.output.currency)?;
    let context = connect(&args.database, ServiceOptions::default()).await?;

    let preview = context
        .temporal
        .simulate(
            &args.adjustment.product_ids,
            args.adjustment.percentage,
            args.adjustment.direction.is_increase(),
            args.window.starts_at,
            args.window.ends_at,
        )
        .await
        .map_err(|error| format!("failed to simulate adjustment: {error}"))?;

    if !preview.rows.is_empty() {
        println!("{}", output::preview_table(&preview.rows, currency));
    }

    println!("duration_days: {}", preview.duration_days);

    Ok(())
}

async fn create(args: CreateArgs) -> Result<(), String> {
    let context = connect(&args.database, ServiceOptions::default()).await?;

    let record = context
        .temporal
        .create(
            NewTemporalAdjustment {
                product_ids: args.adjustment.product_ids,
                percentage: args.adjustment.percentage,
                is_increase: args.adjustment.direction.is_increase(),
                description: args.description,
                actor: args.actor,
                starts_at: args.window.starts_at,
                ends_at: args.window.ends_at,
                category: args.category,
            },
            Timestamp::now(),
        )
        .await
        .map_err(|error| format!("failed to create adjustment: {error}"))?;

    output::print_record(&record);

    Ok(())
}

async fn activate(args: TransitionArgs) -> Result<(), String> {
    let context = connect(&args.database, ServiceOptions::default()).await?;

    let record = context
        .temporal
        .activate(args.adjustment_uuid, &args.actor)
        .await
        .map_err(|error| format!("failed to activate adjustment: {error}"))?;

    output::print_record(&record);

    Ok(())
}

async fn finalize(args: TransitionArgs) -> Result<(), String> {
    let context = connect(&args.database, ServiceOptions::default()).await?;

    let record = context
        .temporal
        .finalize(args.adjustment_uuid, &args.actor)
        .await
        .map_err(|error| format!("failed to finalize adjustment: {error}"))?;

    output::print_record(&record);

    Ok(())
}

async fn list(args: ListArgs) -> Result<(), String> {
    let context = connect(&args.database, ServiceOptions::default()).await?;

    let records = context
        .temporal
        .list_by_state(args.state)
        .await
        .map_err(|error| format!("failed to list adjustments: {error}"))?;

    if records.is_empty() {
        println!("no {} adjustments", args.state);
        return Ok(());
    }

    for record in &records {
        output::print_record(record);
        println!();
    }

    Ok(())
}
