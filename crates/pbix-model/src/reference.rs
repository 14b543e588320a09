//! Data-model field references.
//!
//! A [`FieldReference`] names one field of the shared data model a thin
//! report is bound to: a column, a measure, a hierarchy, or one level of a
//! hierarchy. Two references are equal only when every component matches
//! exactly (case-sensitive); rewriting never normalizes or fuzzy-matches.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpecError};

/// The discriminator distinguishing reference shapes in the layout tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Column,
    Measure,
    Hierarchy,
    HierarchyLevel,
}

impl FieldKind {
    /// The discriminator key used by structural reference records.
    #[must_use]
    pub const fn discriminator(self) -> &'static str {
        match self {
            Self::Column => "Column",
            Self::Measure => "Measure",
            Self::Hierarchy => "Hierarchy",
            Self::HierarchyLevel => "HierarchyLevel",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.discriminator())
    }
}

/// One field of the data model, as referenced from a report layout.
///
/// `field` holds the property name for columns and measures, and the
/// hierarchy name for hierarchies and hierarchy levels. `level` is present
/// exactly when `kind` is [`FieldKind::HierarchyLevel`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldReference {
    pub table: String,
    pub field: String,
    pub kind: FieldKind,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub level: Option<String>,
}

impl FieldReference {
    pub fn column(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            kind: FieldKind::Column,
            level: None,
        }
    }

    pub fn measure(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field: field.into(),
            kind: FieldKind::Measure,
            level: None,
        }
    }

    pub fn hierarchy(table: impl Into<String>, hierarchy: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            field: hierarchy.into(),
            kind: FieldKind::Hierarchy,
            level: None,
        }
    }

    pub fn hierarchy_level(
        table: impl Into<String>,
        hierarchy: impl Into<String>,
        level: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            field: hierarchy.into(),
            kind: FieldKind::HierarchyLevel,
            level: Some(level.into()),
        }
    }

    /// Parse a `Table.Field` spec with the given kind.
    ///
    /// The table name is everything before the first dot, so field names may
    /// themselves contain dots. [`FieldKind::HierarchyLevel`] specs take the
    /// `Table.Hierarchy.Level` form instead.
    pub fn parse_spec(spec: &str, kind: FieldKind) -> Result<Self> {
        if kind == FieldKind::HierarchyLevel {
            return Self::parse_level_spec(spec);
        }
        let (table, field) = spec
            .split_once('.')
            .filter(|(table, field)| !table.is_empty() && !field.is_empty())
            .ok_or_else(|| SpecError::InvalidFieldSpec {
                spec: spec.to_string(),
            })?;
        Ok(Self {
            table: table.to_string(),
            field: field.to_string(),
            kind,
            level: None,
        })
    }

    fn parse_level_spec(spec: &str) -> Result<Self> {
        let invalid = || SpecError::InvalidLevelSpec {
            spec: spec.to_string(),
        };
        let (table, rest) = spec.split_once('.').ok_or_else(invalid)?;
        let (hierarchy, level) = rest.split_once('.').ok_or_else(invalid)?;
        if table.is_empty() || hierarchy.is_empty() || level.is_empty() {
            return Err(invalid());
        }
        Ok(Self::hierarchy_level(table, hierarchy, level))
    }

    /// The dotted `Table.Field` form used by textual occurrences.
    #[must_use]
    pub fn dotted(&self) -> String {
        format!("{}.{}", self.table, self.field)
    }

    /// True when `other` names the same table and field, ignoring the kind.
    ///
    /// Textual occurrences carry no discriminator, so this is the equality
    /// they are matched under.
    #[must_use]
    pub fn same_dotted(&self, other: &Self) -> bool {
        self.table == other.table && self.field == other.field
    }
}

impl fmt::Display for FieldReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.field)?;
        if let Some(level) = &self.level {
            write!(f, ".{level}")?;
        }
        Ok(())
    }
}
