//! Audit Records

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::uuids::TypedUuid;

/// Audit Entry UUID
pub type AuditEntryUuid = TypedUuid<AuditEntry>;

/// Kind of entity an audit entry refers to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum EntityType {
    /// `Producto`
    Product,

    /// `Venta`
    Sale,

    /// `AjusteTemporal`
    TemporalAdjustment,

    /// Any entity recorded by another part of the back office.
    Other(String),
}

impl EntityType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Product => "Producto",
            Self::Sale => "Venta",
            Self::TemporalAdjustment => "AjusteTemporal",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for EntityType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Producto" => Self::Product,
            "Venta" => Self::Sale,
            "AjusteTemporal" => Self::TemporalAdjustment,
            _ => Self::Other(value),
        }
    }
}

impl From<EntityType> for String {
    fn from(value: EntityType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action recorded by an audit entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum AuditAction {
    /// `Create`
    Create,

    /// `UpdatePrices`: a permanent price adjustment.
    UpdatePrices,

    /// `CreateAjuste`: a temporal adjustment was registered.
    CreateAdjustment,

    /// `ActivarAjusteTemporal`
    ActivateTemporal,

    /// `FinalizarAjusteTemporal`
    FinalizeTemporal,

    /// Any action recorded by another part of the back office.
    Other(String),
}

impl AuditAction {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Create => "Create",
            Self::UpdatePrices => "UpdatePrices",
            Self::CreateAdjustment => "CreateAjuste",
            Self::ActivateTemporal => "ActivarAjusteTemporal",
            Self::FinalizeTemporal => "FinalizarAjusteTemporal",
            Self::Other(name) => name,
        }
    }
}

impl From<String> for AuditAction {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Create" => Self::Create,
            "UpdatePrices" => Self::UpdatePrices,
            "CreateAjuste" => Self::CreateAdjustment,
            "ActivarAjusteTemporal" => Self::ActivateTemporal,
            "FinalizarAjusteTemporal" => Self::FinalizeTemporal,
            _ => Self::Other(value),
        }
    }
}

impl From<AuditAction> for String {
    fn from(value: AuditAction) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Audit Entry Record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub uuid: AuditEntryUuid,
    pub occurred_at: Timestamp,
    pub actor: String,
    pub entity_type: EntityType,
    pub action: AuditAction,

    /// Key of the affected record, as text.
    pub primary_key: String,

    /// Reversible diff for price actions; empty otherwise.
    pub detail: String,

    pub is_reverted: bool,
    pub reverted_by: Option<String>,
    pub reverted_at: Option<Timestamp>,
}

/// New Audit Entry Data
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
    pub uuid: AuditEntryUuid,
    pub occurred_at: Timestamp,
    pub actor: String,
    pub entity_type: EntityType,
    pub action: AuditAction,
    pub primary_key: String,
    pub detail: String,
}

impl NewAuditEntry {
    /// Starts an entry stamped with the current time and a fresh id.
    pub fn now(
        actor: &str,
        entity_type: EntityType,
        action: AuditAction,
        primary_key: impl fmt::Display,
        detail: String,
    ) -> Self {
        Self {
            uuid: AuditEntryUuid::new(),
            occurred_at: Timestamp::now(),
            actor: actor.to_string(),
            entity_type,
            action,
            primary_key: primary_key.to_string(),
            detail,
        }
    }
}

impl From<NewAuditEntry> for AuditEntry {
    fn from(entry: NewAuditEntry) -> Self {
        Self {
            uuid: entry.uuid,
            occurred_at: entry.occurred_at,
            actor: entry.actor,
            entity_type: entry.entity_type,
            action: entry.action,
            primary_key: entry.primary_key,
            detail: entry.detail,
            is_reverted: false,
            reverted_by: None,
            reverted_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_names_map_to_variants() {
        assert_eq!(EntityType::from("Venta".to_string()), EntityType::Sale);
        assert_eq!(
            AuditAction::from("UpdatePrices".to_string()),
            AuditAction::UpdatePrices
        );
        assert_eq!(
            AuditAction::from("FinalizarAjusteTemporal".to_string()),
            AuditAction::FinalizeTemporal
        );
    }

    #[test]
    fn unknown_names_are_preserved() {
        let entity = EntityType::from("Cliente".to_string());

        assert_eq!(entity, EntityType::Other("Cliente".to_string()));
        assert_eq!(entity.as_str(), "Cliente");
        assert_eq!(AuditAction::from("Delete".to_string()).to_string(), "Delete");
    }
}
