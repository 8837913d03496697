use clap::{Args, Subcommand};
use repricer_app::{context::ServiceOptions, domain::audit::records::AuditEntryUuid};

use crate::{
    cli::{connect, output},
    config::{DatabaseConfig, RollbackConfig},
};

#[derive(Debug, Args)]
pub(super) struct AuditCommand {
    #[command(subcommand)]
    pub(super) command: AuditSubcommand,
}

#[derive(Debug, Subcommand)]
pub(super) enum AuditSubcommand {
    /// Show the most recent audit entries
    List(ListArgs),

    /// Undo the change an audit entry recorded
    Revert(RevertArgs),
}

#[derive(Debug, Args)]
pub(super) struct ListArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    /// Maximum number of entries
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

#[derive(Debug, Args)]
pub(super) struct RevertArgs {
    #[command(flatten)]
    database: DatabaseConfig,

    #[command(flatten)]
    pub(super) rollback: RollbackConfig,

    /// User recorded as the reverter
    #[arg(long, env = "REPRICER_ACTOR")]
    actor: String,

    /// Audit entry UUID
    entry_uuid: AuditEntryUuid,
}

pub(super) async fn run(command: AuditCommand) -> Result<(), String> {
    match command.command {
        AuditSubcommand::List(args) => list(args).await,
        AuditSubcommand::Revert(args) => revert(args).await,
    }
}

async fn list(args: ListArgs) -> Result<(), String> {
    let context = connect(&args.database, ServiceOptions::default()).await?;

    let entries = context
        .stores
        .audit
        .list_entries(args.limit)
        .await
        .map_err(|error| format!("failed to list audit entries: {error}"))?;

    if entries.is_empty() {
        println!("no audit entries");
        return Ok(());
    }

    println!("{}", output::audit_table(&entries));

    Ok(())
}

async fn revert(args: RevertArgs) -> Result<(), String> {
    let context = connect(&args.database, args.rollback.service_options()).await?;

    let outcome = context
        .rollback
        .revert(args.entry_uuid, &args.actor)
        .await
        .map_err(|error| format!("failed to revert entry {}: {error}", args.entry_uuid))?;

    output::print_revert(&outcome);

    Ok(())
}
