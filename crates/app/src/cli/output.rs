//! Terminal rendering for previews, records and audit entries.

use repricer_app::domain::{
    adjustments::{preview::PreviewRow, records::AdjustmentRecord},
    audit::records::AuditEntry,
    rollback::RevertOutcome,
};
use rust_decimal::Decimal;
use rusty_money::{Money, iso};
use tabled::{
    builder::Builder,
    settings::{
        Alignment, Color, Style,
        object::{Columns, Rows},
    },
};

/// Looks up an ISO 4217 currency by code.
pub(super) fn currency(code: &str) -> Result<&'static iso::Currency, String> {
    iso::find(code).ok_or_else(|| format!("unknown currency code {code:?}"))
}

fn money(amount: Decimal, currency: &iso::Currency) -> String {
    Money::from_decimal(amount, currency).to_string()
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |value| value.to_string())
}

pub(super) fn preview_table(rows: &[PreviewRow], currency: &iso::Currency) -> String {
    let mut builder = Builder::default();

    builder.push_record([
        "Id", "Product", "Cost", "Cash", "List", "New cost", "New cash", "New list",
    ]);

    for row in rows {
        builder.push_record([
            row.id.to_string(),
            row.name.clone(),
            money(row.old.cost, currency),
            money(row.old.cash, currency),
            money(row.old.list, currency),
            money(row.new.cost, currency),
            money(row.new.cash, currency),
            money(row.new.list, currency),
        ]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Color::BOLD);
    table.modify(Columns::new(2..), Alignment::right());

    table.to_string()
}

pub(super) fn audit_table(entries: &[AuditEntry]) -> String {
    let mut builder = Builder::default();

    builder.push_record([
        "Entry", "At", "Actor", "Entity", "Action", "Key", "Reverted",
    ]);

    for entry in entries {
        builder.push_record([
            entry.uuid.to_string(),
            entry.occurred_at.to_string(),
            entry.actor.clone(),
            entry.entity_type.to_string(),
            entry.action.to_string(),
            entry.primary_key.clone(),
            or_dash(entry.reverted_by.as_ref()),
        ]);
    }

    let mut table = builder.build();

    table.with(Style::modern_rounded());
    table.modify(Rows::first(), Color::BOLD);

    table.to_string()
}

pub(super) fn record_lines(record: &AdjustmentRecord) -> Vec<String> {
    let product_ids = record
        .product_ids
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",");

    let mut lines = vec![
        format!("adjustment_uuid: {}", record.uuid),
        format!("products: {product_ids}"),
        format!("percentage: {}", record.percentage),
        format!("direction: {}", record.direction),
        format!("description: {}", record.description),
        format!("created_by: {}", record.created_by),
        format!("created_at: {}", record.created_at),
        format!("audit_entry: {}", or_dash(record.audit_entry)),
        format!("reverted: {}", record.is_reverted),
    ];

    if let Some(temporal) = &record.temporal {
        lines.extend([
            format!("category: {}", temporal.category),
            format!("state: {}", temporal.state),
            format!("starts_at: {}", temporal.window.starts_at()),
            format!("ends_at: {}", temporal.window.ends_at()),
            format!("activated_at: {}", or_dash(temporal.activated_at)),
            format!("finalized_at: {}", or_dash(temporal.finalized_at)),
        ]);
    }

    lines
}

pub(super) fn print_record(record: &AdjustmentRecord) {
    for line in record_lines(record) {
        println!("{line}");
    }
}

pub(super) fn print_revert(outcome: &RevertOutcome) {
    println!("entry_uuid: {}", outcome.entry.uuid);
    println!("action: {} {}", outcome.entry.entity_type, outcome.entry.action);
    println!("reverted_by: {}", or_dash(outcome.entry.reverted_by.as_ref()));

    for id in &outcome.restored {
        println!("restored: product {id}");
    }

    for skipped in &outcome.skipped {
        println!("skipped: {skipped}");
    }
}
