//! The reference grammar: how field references are encoded in a layout tree.
//!
//! References occur in two forms. Structural records are small discriminated
//! expression objects:
//!
//! ```json
//! {"Measure": {"Expression": {"SourceRef": {"Entity": "Sales"}}, "Property": "Revenue"}}
//! {"Column": {"Expression": {"SourceRef": {"Source": "s"}}, "Property": "Region"}}
//! {"Hierarchy": {"Expression": {"SourceRef": {"Entity": "Dates"}}, "Hierarchy": "Calendar"}}
//! {"HierarchyLevel": {"Expression": {"Hierarchy": {…}}, "Level": "Year"}}
//! ```
//!
//! The `SourceRef` either names a table directly (`Entity`) or points into
//! an enclosing query scope's `From` list (`Source`). Textual references are
//! dotted `Table.Field` strings stored under a handful of role keys
//! (projections, query select names, transform selects, object selectors).
//!
//! [`extract`] parses structural records and fails closed: anything
//! malformed or partial yields [`Extraction::Malformed`] or
//! [`Extraction::NotARef`], never a guess. [`encode`] goes the other way by
//! cloning a template record and patching only the scalars that carry
//! reference components, which is how every opaque sibling attribute
//! survives substitution.

use pbix_model::{FieldKind, FieldReference};
use serde_json::{Map, Value};
use thiserror::Error;

/// Role keys whose string values carry dotted `Table.Field` references.
pub const TEXTUAL_KEYS: &[&str] = &["queryRef", "Name", "queryName", "metadata"];

const DISCRIMINATORS: [FieldKind; 4] = [
    FieldKind::Column,
    FieldKind::Measure,
    FieldKind::Hierarchy,
    FieldKind::HierarchyLevel,
];

/// How a structural record names its table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRef {
    /// Direct table name.
    Entity(String),
    /// Alias into the enclosing query scope's `From` list.
    Source(String),
}

/// A parsed structural reference record, table not yet resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordRef {
    pub kind: FieldKind,
    pub table: TableRef,
    /// Property name, or hierarchy name for the hierarchy kinds.
    pub field: String,
    /// Level name, present only for [`FieldKind::HierarchyLevel`].
    pub level: Option<String>,
}

impl RecordRef {
    /// Resolve into a [`FieldReference`] given the table name.
    #[must_use]
    pub fn resolve(&self, table: &str) -> FieldReference {
        FieldReference {
            table: table.to_string(),
            field: self.field.clone(),
            kind: self.kind,
            level: self.level.clone(),
        }
    }
}

/// Outcome of attempting to parse a node as a structural record.
#[derive(Debug)]
pub enum Extraction {
    /// A well-formed reference record.
    Ref(RecordRef),
    /// Reference-shaped, but not usable: unknown discriminator, missing
    /// required component, or an unsupported table expression.
    Malformed { discriminator: String, reason: String },
    /// Not a reference record at all.
    NotARef,
}

/// Failures constructing a patch for a matched occurrence. These are
/// recovered per occurrence by the engine, never fatal.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("template is not a reference record")]
    NotARecord,

    /// The template's discriminator differs from the target's kind; patching
    /// across kinds would have to add or remove keys.
    #[error("cannot encode a {target} reference into a {template} template")]
    KindMismatch {
        target: FieldKind,
        template: FieldKind,
    },

    /// The template is alias-based and no alias for the target table exists.
    #[error("no alias for table '{table}' in the enclosing query scope")]
    AliasUnavailable { table: String },

    #[error("hierarchy level target is missing its level name")]
    MissingLevel,

    /// The template lost its validated shape mid-patch. Indicates a bug more
    /// than bad input, but recovered the same way.
    #[error("template record has no {slot} slot")]
    Shape { slot: &'static str },
}

/// Try to parse `node` as a structural reference record.
///
/// The discriminator key may sit alongside other keys (query select entries
/// carry a sibling `Name`), but its value must be an object; a discriminator
/// key with a scalar value is how record *interiors* look and is not itself
/// a record.
#[must_use]
pub fn extract(node: &Value) -> Extraction {
    let Some(map) = node.as_object() else {
        return Extraction::NotARef;
    };
    for kind in DISCRIMINATORS {
        if let Some(inner) = map.get(kind.discriminator()) {
            if let Some(inner) = inner.as_object() {
                return parse_record(kind, inner);
            }
            return Extraction::NotARef;
        }
    }
    unrecognized_discriminator(map)
}

fn parse_record(kind: FieldKind, inner: &Map<String, Value>) -> Extraction {
    let malformed = |reason: &str| Extraction::Malformed {
        discriminator: kind.discriminator().to_string(),
        reason: reason.to_string(),
    };
    match kind {
        FieldKind::Column | FieldKind::Measure => {
            let Some(property) = inner.get("Property").and_then(Value::as_str) else {
                return malformed("missing Property");
            };
            let Some(table) = parse_source_ref(inner.get("Expression")) else {
                return malformed("unsupported table expression");
            };
            Extraction::Ref(RecordRef {
                kind,
                table,
                field: property.to_string(),
                level: None,
            })
        }
        FieldKind::Hierarchy => {
            let Some(name) = inner.get("Hierarchy").and_then(Value::as_str) else {
                return malformed("missing Hierarchy name");
            };
            let Some(table) = parse_source_ref(inner.get("Expression")) else {
                return malformed("unsupported table expression");
            };
            Extraction::Ref(RecordRef {
                kind,
                table,
                field: name.to_string(),
                level: None,
            })
        }
        FieldKind::HierarchyLevel => {
            let Some(level) = inner.get("Level").and_then(Value::as_str) else {
                return malformed("missing Level");
            };
            let hierarchy = inner
                .get("Expression")
                .and_then(Value::as_object)
                .and_then(|expression| expression.get("Hierarchy"))
                .and_then(Value::as_object);
            let Some(hierarchy) = hierarchy else {
                return malformed("missing inner Hierarchy record");
            };
            let Some(name) = hierarchy.get("Hierarchy").and_then(Value::as_str) else {
                return malformed("missing Hierarchy name");
            };
            let Some(table) = parse_source_ref(hierarchy.get("Expression")) else {
                return malformed("unsupported table expression");
            };
            Extraction::Ref(RecordRef {
                kind,
                table,
                field: name.to_string(),
                level: Some(level.to_string()),
            })
        }
    }
}

fn parse_source_ref(expression: Option<&Value>) -> Option<TableRef> {
    let source_ref = expression?
        .as_object()?
        .get("SourceRef")?
        .as_object()?;
    if let Some(entity) = source_ref.get("Entity").and_then(Value::as_str) {
        return Some(TableRef::Entity(entity.to_string()));
    }
    if let Some(source) = source_ref.get("Source").and_then(Value::as_str) {
        return Some(TableRef::Source(source.to_string()));
    }
    None
}

/// Detect objects that look like reference records under a discriminator the
/// grammar does not know. Kept narrow: the candidate value must carry both a
/// `Property` string and an `Expression.SourceRef`, so expression wrappers
/// like aggregations do not trip it.
fn unrecognized_discriminator(map: &Map<String, Value>) -> Extraction {
    for (key, value) in map {
        let Some(inner) = value.as_object() else {
            continue;
        };
        let property = inner.get("Property").is_some_and(Value::is_string);
        let sourced = inner
            .get("Expression")
            .and_then(Value::as_object)
            .is_some_and(|expression| expression.contains_key("SourceRef"));
        if property && sourced {
            return Extraction::Malformed {
                discriminator: key.clone(),
                reason: "unrecognized discriminator".to_string(),
            };
        }
    }
    Extraction::NotARef
}

/// Build the patched record for `target`, using `template` as the shape.
///
/// The result is `template` with only the entity/property/discriminator
/// scalars replaced; every other key is copied unchanged. `alias` supplies
/// the `Source` value when the template is alias-based (the engine resolves
/// it against the enclosing scope); entity-based templates ignore it.
pub fn encode(
    target: &FieldReference,
    template: &Value,
    alias: Option<&str>,
) -> Result<Value, EncodeError> {
    let record = match extract(template) {
        Extraction::Ref(record) => record,
        Extraction::Malformed { .. } | Extraction::NotARef => return Err(EncodeError::NotARecord),
    };
    if record.kind != target.kind {
        return Err(EncodeError::KindMismatch {
            target: target.kind,
            template: record.kind,
        });
    }

    let mut patched = template.clone();
    let inner = patched
        .as_object_mut()
        .and_then(|map| map.get_mut(target.kind.discriminator()))
        .and_then(Value::as_object_mut)
        .ok_or(EncodeError::Shape {
            slot: "discriminator",
        })?;

    match target.kind {
        FieldKind::Column | FieldKind::Measure => {
            inner.insert("Property".to_string(), Value::String(target.field.clone()));
            patch_source_ref(inner, &target.table, alias)?;
        }
        FieldKind::Hierarchy => {
            inner.insert("Hierarchy".to_string(), Value::String(target.field.clone()));
            patch_source_ref(inner, &target.table, alias)?;
        }
        FieldKind::HierarchyLevel => {
            let level = target.level.clone().ok_or(EncodeError::MissingLevel)?;
            inner.insert("Level".to_string(), Value::String(level));
            let hierarchy = inner
                .get_mut("Expression")
                .and_then(Value::as_object_mut)
                .and_then(|expression| expression.get_mut("Hierarchy"))
                .and_then(Value::as_object_mut)
                .ok_or(EncodeError::Shape { slot: "Hierarchy" })?;
            hierarchy.insert("Hierarchy".to_string(), Value::String(target.field.clone()));
            patch_source_ref(hierarchy, &target.table, alias)?;
        }
    }
    Ok(patched)
}

fn patch_source_ref(
    inner: &mut Map<String, Value>,
    table: &str,
    alias: Option<&str>,
) -> Result<(), EncodeError> {
    let source_ref = inner
        .get_mut("Expression")
        .and_then(Value::as_object_mut)
        .and_then(|expression| expression.get_mut("SourceRef"))
        .and_then(Value::as_object_mut)
        .ok_or(EncodeError::Shape { slot: "SourceRef" })?;
    if source_ref.contains_key("Entity") {
        source_ref.insert("Entity".to_string(), Value::String(table.to_string()));
        return Ok(());
    }
    if source_ref.contains_key("Source") {
        let alias = alias.ok_or_else(|| EncodeError::AliasUnavailable {
            table: table.to_string(),
        })?;
        source_ref.insert("Source".to_string(), Value::String(alias.to_string()));
        return Ok(());
    }
    Err(EncodeError::Shape { slot: "SourceRef" })
}

/// The textual rendering of a reference: `Table.Field`, with the level
/// appended for hierarchy levels.
#[must_use]
pub fn text_form(reference: &FieldReference) -> String {
    reference.to_string()
}

/// Parse a dotted textual occurrence into its table and field parts.
#[must_use]
pub fn parse_dotted(text: &str) -> Option<(&str, &str)> {
    text.split_once('.')
        .filter(|(table, field)| !table.is_empty() && !field.is_empty())
}
