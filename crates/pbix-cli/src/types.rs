//! Outcome types produced by the command runners.

use std::path::PathBuf;

use pbix_model::{FieldOccurrence, NodePath, RewriteChange, RewriteWarning};

/// Result of renaming fields in one report.
#[derive(Debug)]
pub struct RenameOutcome {
    pub report: PathBuf,
    pub changes: Vec<RewriteChange>,
    pub warnings: Vec<RewriteWarning>,
    /// False for dry runs and for reports with nothing to update.
    pub written: bool,
}

/// Result of a directory-wide rename.
#[derive(Debug)]
pub struct BatchOutcome {
    pub outcomes: Vec<RenameOutcome>,
    /// Per-report fatal errors; these do not stop the batch.
    pub errors: Vec<String>,
}

impl BatchOutcome {
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    #[must_use]
    pub fn total_changes(&self) -> usize {
        self.outcomes.iter().map(|outcome| outcome.changes.len()).sum()
    }
}

/// Result of a field inventory.
#[derive(Debug)]
pub struct FieldsOutcome {
    pub report: PathBuf,
    pub fields: Vec<FieldOccurrence>,
    /// Each `--contains` query with whether it matched anything.
    pub queries: Vec<(String, bool)>,
}

/// Result of a slicer reset.
#[derive(Debug)]
pub struct ResetOutcome {
    pub report: PathBuf,
    pub cleared: Vec<NodePath>,
    pub written: bool,
}
