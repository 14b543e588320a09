//! Rewrite pass results: changes, warnings, and the mutated tree.

use serde::Serialize;
use serde_json::Value;

use crate::path::NodePath;
use crate::reference::{FieldKind, FieldReference};

/// How a reference occurs in the layout tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OccurrenceForm {
    /// A structural reference record (discriminated expression object).
    Record,
    /// A dotted `Table.Field` string under a role key.
    Text,
}

impl std::fmt::Display for OccurrenceForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Record => "record",
            Self::Text => "text",
        })
    }
}

/// One rewritten occurrence, recorded for auditability.
#[derive(Debug, Clone, Serialize)]
pub struct RewriteChange {
    pub path: NodePath,
    pub before: FieldReference,
    pub after: FieldReference,
    pub form: OccurrenceForm,
}

/// Why an occurrence was skipped instead of rewritten.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WarningKind {
    /// A reference-shaped node carried a discriminator the grammar does not
    /// recognize.
    UnsupportedBinding,
    /// The patch for a matched occurrence could not be constructed.
    Encode,
    /// A cross-table rename of an alias-based reference found no alias for
    /// the target table in the enclosing query scope.
    TargetAliasUnavailable,
}

/// A recoverable per-occurrence failure. Warnings accumulate in the result
/// and are surfaced to the user; they never abort the pass.
#[derive(Debug, Clone, Serialize)]
pub struct RewriteWarning {
    pub path: NodePath,
    pub kind: WarningKind,
    pub message: String,
}

/// The outcome of one rewrite pass over a layout tree.
#[derive(Debug)]
pub struct RewriteResult {
    /// The mutated tree. Structurally identical to the input except for the
    /// scalar leaves recorded in `changes`.
    pub tree: Value,
    pub changes: Vec<RewriteChange>,
    pub warnings: Vec<RewriteWarning>,
}

impl RewriteResult {
    #[must_use]
    pub fn changed(&self) -> usize {
        self.changes.len()
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Paths touched by the pass, for callers that track which subtrees
    /// need re-serialization.
    pub fn touched_paths(&self) -> impl Iterator<Item = &NodePath> {
        self.changes.iter().map(|change| &change.path)
    }
}

/// One distinct field found by the inventory pass, keyed by its dotted
/// name. Structural occurrences contribute their kinds; textual occurrences
/// carry none.
#[derive(Debug, Clone, Serialize)]
pub struct FieldOccurrence {
    /// Dotted `Table.Field` name (`Table.Hierarchy.Level` for levels).
    pub name: String,
    /// Distinct structural kinds seen for this name, sorted.
    pub kinds: Vec<FieldKind>,
    pub occurrences: usize,
}

impl FieldOccurrence {
    /// True when `query` names this field, either as the full dotted name
    /// or as the bare final component.
    #[must_use]
    pub fn matches_query(&self, query: &str) -> bool {
        if query.contains('.') {
            self.name == query
        } else {
            self.name.rsplit('.').next() == Some(query)
        }
    }
}
