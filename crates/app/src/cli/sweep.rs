use clap::Args;
use jiff::Timestamp;
use repricer_app::context::ServiceOptions;
use tracing::error;

use crate::{
    cli::connect,
    config::{DatabaseConfig, SweepConfig},
    shutdown,
};

#[derive(Debug, Args)]
pub(super) struct SweepArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    #[command(flatten)]
    sweep: SweepConfig,

    /// Run a single sweep and exit
    #[arg(long)]
    once: bool,
}

pub(super) async fn run(args: SweepArgs) -> Result<(), String> {
    let context = connect(&args.database, ServiceOptions::default()).await?;
    let sweeper = context.sweeper(args.sweep.interval());

    if args.once {
        let report = sweeper
            .run_once(Timestamp::now())
            .await
            .map_err(|error| format!("sweep failed: {error}"))?;

        println!("activated: {}", report.activated);
        println!("finalized: {}", report.finalized);
        println!("failed: {}", report.failed);

        return Ok(());
    }

    sweeper
        .run_until(async {
            if let Err(error) = shutdown::listen().await {
                error!(%error, "shutdown listener failed");
            }
        })
        .await;

    Ok(())
}
