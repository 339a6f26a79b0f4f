//! Recovery bookkeeping for malformed records.
//!
//! A malformed record never stops the parse. The tokenizer discards it, resumes
//! at the next record boundary and reports the [`Malformation`] here, where it
//! is counted and logged at `warn` level together with the offending segment.

use crate::record::Attribute;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a record was rejected during tokenization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Malformation {
    /// `<item` was followed by something other than whitespace.
    #[error("missing separator after item open")]
    MissingSeparator,

    /// Attribute text with no `=` (or an empty name before it).
    #[error("incomplete attribute")]
    MissingEquals,

    /// A recognized attribute appeared twice in one record.
    #[error("duplicate {0}")]
    DuplicateAttribute(Attribute),

    /// The value did not start with `"` or had no closing `"`.
    #[error("can't extract {0} value")]
    UnquotedValue(String),

    /// `city`, `street` or `house` decoded to an empty string.
    #[error("empty {0} value")]
    EmptyValue(Attribute),

    /// `house` arrived before any `street` for the record.
    #[error("house without street")]
    HouseBeforeStreet,

    /// `floor` was not a positive 16-bit decimal integer.
    #[error("incorrect house floor {0:?}")]
    InvalidFloor(String),
}

impl Malformation {
    /// Coarse classification used for per-kind counts.
    #[must_use]
    pub fn kind(&self) -> MalformationKind {
        match self {
            Malformation::MissingSeparator => MalformationKind::MissingSeparator,
            Malformation::MissingEquals => MalformationKind::MissingEquals,
            Malformation::DuplicateAttribute(_) => MalformationKind::DuplicateAttribute,
            Malformation::UnquotedValue(_) => MalformationKind::UnquotedValue,
            Malformation::EmptyValue(_) => MalformationKind::EmptyValue,
            Malformation::HouseBeforeStreet => MalformationKind::HouseBeforeStreet,
            Malformation::InvalidFloor(_) => MalformationKind::InvalidFloor,
        }
    }
}

/// Payload-free mirror of [`Malformation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MalformationKind {
    /// See [`Malformation::MissingSeparator`]
    MissingSeparator,
    /// See [`Malformation::MissingEquals`]
    MissingEquals,
    /// See [`Malformation::DuplicateAttribute`]
    DuplicateAttribute,
    /// See [`Malformation::UnquotedValue`]
    UnquotedValue,
    /// See [`Malformation::EmptyValue`]
    EmptyValue,
    /// See [`Malformation::HouseBeforeStreet`]
    HouseBeforeStreet,
    /// See [`Malformation::InvalidFloor`]
    InvalidFloor,
}

/// Running tally of recovered malformations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryContext {
    broken: u64,
    by_kind: BTreeMap<MalformationKind, u64>,
}

impl RecoveryContext {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Count a rejected record and log it with the segment it came from.
    pub fn record(&mut self, malformation: &Malformation, segment: &[u8]) {
        self.broken += 1;
        *self.by_kind.entry(malformation.kind()).or_default() += 1;
        log::warn!(
            "{malformation} in: {}",
            String::from_utf8_lossy(segment).trim_matches(&['\r', '\n'][..])
        );
    }

    /// Total records rejected so far.
    #[must_use]
    pub fn broken(&self) -> u64 {
        self.broken
    }

    /// Records rejected for one particular reason.
    #[must_use]
    pub fn count(&self, kind: MalformationKind) -> u64 {
        self.by_kind.get(&kind).copied().unwrap_or(0)
    }

    /// Non-zero per-kind counts in kind order.
    pub fn breakdown(&self) -> impl Iterator<Item = (MalformationKind, u64)> + '_ {
        self.by_kind.iter().map(|(kind, count)| (*kind, *count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recovery_context_default() {
        let ctx = RecoveryContext::default();
        assert_eq!(ctx.broken(), 0);
        assert_eq!(ctx.breakdown().count(), 0);
    }

    #[test]
    fn test_record_counts_by_kind() {
        let mut ctx = RecoveryContext::new();
        ctx.record(&Malformation::DuplicateAttribute(Attribute::City), b"<item />");
        ctx.record(&Malformation::DuplicateAttribute(Attribute::Floor), b"<item />");
        ctx.record(&Malformation::InvalidFloor("0".to_string()), b"<item />\r\n");

        assert_eq!(ctx.broken(), 3);
        assert_eq!(ctx.count(MalformationKind::DuplicateAttribute), 2);
        assert_eq!(ctx.count(MalformationKind::InvalidFloor), 1);
        assert_eq!(ctx.count(MalformationKind::MissingEquals), 0);
        assert_eq!(
            ctx.breakdown().collect::<Vec<_>>(),
            vec![
                (MalformationKind::DuplicateAttribute, 2),
                (MalformationKind::InvalidFloor, 1)
            ]
        );
    }

    #[test]
    fn test_malformation_display() {
        assert_eq!(
            Malformation::DuplicateAttribute(Attribute::Street).to_string(),
            "duplicate street"
        );
        assert_eq!(
            Malformation::UnquotedValue("city".to_string()).to_string(),
            "can't extract city value"
        );
        assert_eq!(
            Malformation::InvalidFloor("abc".to_string()).to_string(),
            "incorrect house floor \"abc\""
        );
    }
}
