//! Input validation helpers shared by the ledger services.
//!
//! Inputs arrive as plain typed structs (usually deserialized from JSON). Each
//! service runs a `validate` step that trims strings, checks ranges, and
//! collects [`FieldIssue`]s so a single `VALIDATION_ERROR` can report every
//! bad field at once.

use crate::errors::{Error, FieldIssue, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Tri-state update for an optional relation column.
///
/// Deserializes from a missing field (`Unset`), an explicit `null` (`Cleared`)
/// or an id string (`Set`). Use with `#[serde(default)]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RelationPatch {
    /// Leave the stored value untouched
    #[default]
    Unset,
    /// Remove the reference
    Cleared,
    /// Point at another entity
    Set(String),
}

impl RelationPatch {
    /// The id this patch points at, if it sets one.
    #[must_use]
    pub fn as_set(&self) -> Option<&str> {
        match self {
            Self::Set(id) => Some(id),
            Self::Unset | Self::Cleared => None,
        }
    }

    /// Whether the patch leaves the column alone.
    #[must_use]
    pub const fn is_unset(&self) -> bool {
        matches!(self, Self::Unset)
    }

    /// Applies the patch on top of the current value.
    #[must_use]
    pub fn apply(&self, current: Option<String>) -> Option<String> {
        match self {
            Self::Unset => current,
            Self::Cleared => None,
            Self::Set(id) => Some(id.clone()),
        }
    }

    /// Trims a set id; an id that trims to nothing is reported as an issue.
    fn normalized(self, field: &str, issues: &mut Vec<FieldIssue>) -> Self {
        match self {
            Self::Set(id) => {
                let trimmed = id.trim();
                if trimmed.is_empty() {
                    issues.push(FieldIssue::new(field, "must not be empty"));
                    Self::Unset
                } else {
                    Self::Set(trimmed.to_string())
                }
            }
            other => other,
        }
    }
}

impl<'de> Deserialize<'de> for RelationPatch {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<String>::deserialize(deserializer)?.map_or(Self::Cleared, Self::Set))
    }
}

/// Collects field issues while an input is being checked.
#[derive(Debug, Default)]
pub(crate) struct Validator {
    issues: Vec<FieldIssue>,
}

impl Validator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, field: &str, message: impl Into<String>) {
        self.issues.push(FieldIssue::new(field, message));
    }

    /// Trims `value` and checks its length in characters.
    pub(crate) fn text(&mut self, field: &str, value: &str, min: usize, max: usize) -> String {
        let trimmed = value.trim();
        let len = trimmed.chars().count();
        if len < min {
            self.push(field, format!("must be at least {min} characters"));
        } else if len > max {
            self.push(field, format!("must be at most {max} characters"));
        }
        trimmed.to_string()
    }

    pub(crate) fn positive(&mut self, field: &str, value: Decimal) {
        if value <= Decimal::ZERO {
            self.push(field, "must be greater than zero");
        }
    }

    pub(crate) fn in_range<T>(&mut self, field: &str, value: T, min: T, max: T)
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            self.push(field, format!("must be between {min} and {max}"));
        }
    }

    /// Trims an optional id; blank ids are rejected.
    pub(crate) fn relation(&mut self, field: &str, value: Option<String>) -> Option<String> {
        let patch = value.map_or(RelationPatch::Unset, RelationPatch::Set);
        patch.normalized(field, &mut self.issues).as_set().map(str::to_string)
    }

    pub(crate) fn relation_patch(&mut self, field: &str, value: RelationPatch) -> RelationPatch {
        value.normalized(field, &mut self.issues)
    }

    /// Finishes validation, yielding `value` when no issue was recorded.
    pub(crate) fn finish<T>(self, value: T) -> Result<T> {
        if self.issues.is_empty() {
            Ok(value)
        } else {
            Err(Error::invalid_payload(self.issues))
        }
    }
}

/// Error for a patch that carries no field at all.
pub(crate) fn empty_patch() -> Error {
    Error::invalid_field("body", "No fields to update")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]
    use super::*;
    use rust_decimal_macros::dec;

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct Patch {
        #[serde(default)]
        card_id: RelationPatch,
    }

    #[test]
    fn test_relation_patch_tri_state() {
        let unset: Patch = serde_json::from_str("{}").unwrap();
        assert_eq!(unset.card_id, RelationPatch::Unset);

        let cleared: Patch = serde_json::from_str(r#"{"cardId": null}"#).unwrap();
        assert_eq!(cleared.card_id, RelationPatch::Cleared);

        let set: Patch = serde_json::from_str(r#"{"cardId": "card-1"}"#).unwrap();
        assert_eq!(set.card_id, RelationPatch::Set("card-1".to_string()));
    }

    #[test]
    fn test_relation_patch_apply() {
        let current = Some("card-1".to_string());
        assert_eq!(RelationPatch::Unset.apply(current.clone()), current);
        assert_eq!(RelationPatch::Cleared.apply(current.clone()), None);
        assert_eq!(
            RelationPatch::Set("card-2".to_string()).apply(current),
            Some("card-2".to_string())
        );
    }

    #[test]
    fn test_validator_collects_every_issue() {
        let mut v = Validator::new();
        let name = v.text("name", "   ", 1, 120);
        v.positive("value", dec!(-1));
        v.in_range("billingDay", 32, 1, 31);
        let card = v.relation("cardId", Some("  ".to_string()));

        assert_eq!(name, "");
        assert_eq!(card, None);
        match v.finish(()) {
            Err(Error::Validation { issues, .. }) => {
                let fields: Vec<_> = issues.iter().map(|i| i.field.as_str()).collect();
                assert_eq!(fields, vec!["name", "value", "billingDay", "cardId"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_text_trims_and_counts_chars() {
        let mut v = Validator::new();
        assert_eq!(v.text("description", "  Café  ", 1, 4), "Café");
        assert!(v.finish(()).is_ok());
    }
}
