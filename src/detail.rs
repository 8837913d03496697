//! Audit detail encoding
//!
//! Price changes are recorded as human-readable text so an audit row can be inspected by eye and
//! reversed later:
//!
//! ```text
//! detail    := segment ("|" segment)*
//! segment   := productId ":" fieldDiff (";" fieldDiff)*
//! fieldDiff := fieldName "=" oldValue "->" newValue
//! ```
//!
//! Field names are the audit names of [`PriceField`]. Amounts are plain decimals with a dot
//! separator and no sign, exponent or grouping. Encoding normalises amounts, so `110.00` is written
//! as `110`.

use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::{
    pricing::{PriceField, PriceFields},
    products::ProductId,
};

const SEGMENT_SEPARATOR: &str = "|";
const PRODUCT_SEPARATOR: char = ':';
const FIELD_SEPARATOR: char = ';';
const ASSIGNMENT: char = '=';
const ARROW: &str = "->";

/// Errors raised while parsing a single detail segment.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DetailError {
    /// The segment has no `:` between product id and field diffs.
    #[error("segment {segment:?} has no product separator")]
    MissingProductSeparator {
        /// Offending segment.
        segment: String,
    },

    /// The product id is not a non-negative integer.
    #[error("segment {segment:?} has an invalid product id {value:?}")]
    InvalidProductId {
        /// Offending segment.
        segment: String,

        /// Text found where the id was expected.
        value: String,
    },

    /// A field diff is not of the form `name=old->new`.
    #[error("segment {segment:?} has a malformed field diff {diff:?}")]
    MalformedFieldDiff {
        /// Offending segment.
        segment: String,

        /// Offending field diff.
        diff: String,
    },

    /// The field name is not a known price field.
    #[error("segment {segment:?} names unknown field {name:?}")]
    UnknownField {
        /// Offending segment.
        segment: String,

        /// Unknown field name.
        name: String,
    },

    /// An amount is not a plain decimal.
    #[error("segment {segment:?} has an invalid amount {value:?}")]
    InvalidAmount {
        /// Offending segment.
        segment: String,

        /// Offending amount text.
        value: String,
    },

    /// The same field appears twice in one segment.
    #[error("segment {segment:?} repeats field {field}")]
    DuplicateField {
        /// Offending segment.
        segment: String,

        /// Repeated field.
        field: PriceField,
    },
}

impl DetailError {
    /// Returns the raw segment the error was raised for.
    pub fn segment(&self) -> &str {
        match self {
            Self::MissingProductSeparator { segment }
            | Self::InvalidProductId { segment, .. }
            | Self::MalformedFieldDiff { segment, .. }
            | Self::UnknownField { segment, .. }
            | Self::InvalidAmount { segment, .. }
            | Self::DuplicateField { segment, .. } => segment,
        }
    }
}

/// The before and after value of one price field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDiff {
    /// Field that changed.
    pub field: PriceField,

    /// Value before the change.
    pub old: Decimal,

    /// Value after the change.
    pub new: Decimal,
}

impl fmt::Display for FieldDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{ASSIGNMENT}{}{ARROW}{}",
            self.field,
            self.old.normalize(),
            self.new.normalize()
        )
    }
}

/// All field changes recorded for one product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceDiff {
    /// Product the diff applies to.
    pub product_id: ProductId,

    /// Changed fields, in recorded order.
    pub fields: SmallVec<[FieldDiff; 3]>,
}

impl PriceDiff {
    /// Builds a diff covering every price field of a product.
    pub fn between(product_id: ProductId, before: &PriceFields, after: &PriceFields) -> Self {
        Self {
            product_id,
            fields: PriceField::ALL
                .into_iter()
                .map(|field| FieldDiff {
                    field,
                    old: before.get(field),
                    new: after.get(field),
                })
                .collect(),
        }
    }

    /// Returns `current` with every recorded field set back to its old value.
    pub fn restore_onto(&self, current: &PriceFields) -> PriceFields {
        let mut restored = *current;

        for diff in &self.fields {
            restored.set(diff.field, diff.old);
        }

        restored
    }
}

impl fmt::Display for PriceDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{PRODUCT_SEPARATOR}", self.product_id)?;

        for (index, diff) in self.fields.iter().enumerate() {
            if index > 0 {
                write!(f, "{FIELD_SEPARATOR}")?;
            }

            write!(f, "{diff}")?;
        }

        Ok(())
    }
}

impl FromStr for PriceDiff {
    type Err = DetailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_segment(s)
    }
}

/// Encodes a set of product diffs as a detail string.
pub fn encode_detail(diffs: &[PriceDiff]) -> String {
    diffs
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(SEGMENT_SEPARATOR)
}

/// Parses every segment of a detail string.
///
/// Segments are parsed independently so callers can decide whether one bad segment should abort
/// the whole operation. An empty detail yields no segments.
pub fn parse_detail(detail: &str) -> Vec<Result<PriceDiff, DetailError>> {
    if detail.is_empty() {
        return Vec::new();
    }

    detail.split(SEGMENT_SEPARATOR).map(parse_segment).collect()
}

/// Parses a single `productId:fieldDiff;...` segment.
///
/// # Errors
///
/// Returns a [`DetailError`] describing the first problem found in the segment.
pub fn parse_segment(segment: &str) -> Result<PriceDiff, DetailError> {
    let Some((id, diffs)) = segment.split_once(PRODUCT_SEPARATOR) else {
        return Err(DetailError::MissingProductSeparator {
            segment: segment.to_string(),
        });
    };

    let product_id = parse_product_id(id).ok_or_else(|| DetailError::InvalidProductId {
        segment: segment.to_string(),
        value: id.to_string(),
    })?;

    let mut fields: SmallVec<[FieldDiff; 3]> = SmallVec::new();

    for raw in diffs.split(FIELD_SEPARATOR) {
        let diff = parse_field_diff(segment, raw)?;

        if fields.iter().any(|existing| existing.field == diff.field) {
            return Err(DetailError::DuplicateField {
                segment: segment.to_string(),
                field: diff.field,
            });
        }

        fields.push(diff);
    }

    Ok(PriceDiff { product_id, fields })
}

fn parse_field_diff(segment: &str, raw: &str) -> Result<FieldDiff, DetailError> {
    let malformed = || DetailError::MalformedFieldDiff {
        segment: segment.to_string(),
        diff: raw.to_string(),
    };

    let (name, values) = raw.split_once(ASSIGNMENT).ok_or_else(malformed)?;
    let (old, new) = values.split_once(ARROW).ok_or_else(malformed)?;

    let field = name
        .parse::<PriceField>()
        .map_err(|unknown| DetailError::UnknownField {
            segment: segment.to_string(),
            name: unknown.0,
        })?;

    Ok(FieldDiff {
        field,
        old: parse_amount(segment, old)?,
        new: parse_amount(segment, new)?,
    })
}

fn parse_product_id(value: &str) -> Option<ProductId> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    value.parse().ok()
}

fn parse_amount(segment: &str, value: &str) -> Result<Decimal, DetailError> {
    let invalid = || DetailError::InvalidAmount {
        segment: segment.to_string(),
        value: value.to_string(),
    };

    let (whole, fraction) = value.split_once('.').unwrap_or((value, ""));
    let is_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());

    if whole.is_empty()
        || !is_digits(whole)
        || !is_digits(fraction)
        || (value.contains('.') && fraction.is_empty())
    {
        return Err(invalid());
    }

    Decimal::from_str(value).map_err(|_err| invalid())
}
