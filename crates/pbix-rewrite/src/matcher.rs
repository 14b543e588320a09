//! Binding detection over visited nodes.
//!
//! The matcher decides, for each node the walker shows it, whether the node
//! roots a binding and which references it carries. Detection is keyed on
//! shape alone — a structural record discriminator, or a dotted string under
//! a known role key — never on visual type names, so unknown visual types
//! are handled the same way as known ones. Genuinely novel binding shapes
//! are an accepted false-negative gap.

use pbix_model::{FieldReference, NodePath, PathSegment};
use serde_json::Value;

use crate::grammar::{self, Extraction, TableRef};

/// A query scope opened by an object carrying a `From` list, mapping table
/// aliases to table names for everything beneath it.
#[derive(Debug)]
struct QueryScope {
    path: NodePath,
    /// `(alias, table)` pairs in list order.
    aliases: Vec<(String, String)>,
}

/// The stack of query scopes enclosing the current traversal position.
///
/// The engine prunes and feeds this from the walker's path stream; the
/// matcher only reads it. `From` lists are read, never restructured.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<QueryScope>,
}

impl ScopeStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop scopes that no longer enclose `current`.
    pub fn prune(&mut self, current: &NodePath) {
        while let Some(scope) = self.scopes.last() {
            if scope.path.is_prefix_of(current) {
                break;
            }
            self.scopes.pop();
        }
    }

    /// Open a scope if `node` carries a usable `From` list.
    pub fn enter(&mut self, node: &Value, path: &NodePath) {
        if let Some(aliases) = parse_from_list(node) {
            self.scopes.push(QueryScope {
                path: path.clone(),
                aliases,
            });
        }
    }

    /// Resolve an alias to its table name, innermost scope first.
    #[must_use]
    pub fn resolve(&self, alias: &str) -> Option<&str> {
        self.scopes.iter().rev().find_map(|scope| {
            scope
                .aliases
                .iter()
                .find(|(name, _)| name == alias)
                .map(|(_, table)| table.as_str())
        })
    }

    /// An existing alias for `table` in the innermost scope, if any. Only
    /// the innermost scope is consulted: an outer scope's alias would not be
    /// addressable from a nested query's select list.
    #[must_use]
    pub fn alias_for(&self, table: &str) -> Option<&str> {
        self.scopes.last().and_then(|scope| {
            scope
                .aliases
                .iter()
                .find(|(_, entity)| entity == table)
                .map(|(name, _)| name.as_str())
        })
    }
}

fn parse_from_list(node: &Value) -> Option<Vec<(String, String)>> {
    let entries = node.as_object()?.get("From")?.as_array()?;
    let aliases: Vec<(String, String)> = entries
        .iter()
        .filter_map(|entry| {
            let name = entry.get("Name")?.as_str()?;
            let entity = entry.get("Entity")?.as_str()?;
            Some((name.to_string(), entity.to_string()))
        })
        .collect();
    if aliases.is_empty() {
        None
    } else {
        Some(aliases)
    }
}

/// A reference found at a node.
#[derive(Debug)]
pub enum Found {
    /// A structural record rooted at the node itself; `table` keeps the
    /// record's own table form for alias-aware patching.
    Record {
        reference: FieldReference,
        table: TableRef,
    },
    /// A dotted string under a role key, one of
    /// [`grammar::TEXTUAL_KEYS`].
    Text { key: String, value: String },
    /// Reference-shaped but unusable; skipped with a warning.
    Malformed {
        discriminator: String,
        reason: String,
    },
}

/// One identification: a reference (or malformed shape) at a path relative
/// to the visited node. Records sit at the node itself (empty relative
/// path); textual references sit one key below. A query select entry
/// carrying both a display `Name` and the underlying expression reports
/// two entries here, and each is rewritten independently.
#[derive(Debug)]
pub struct Identified {
    pub rel: NodePath,
    pub found: Found,
}

/// Identify every reference rooted at `node`.
#[must_use]
pub fn identify(node: &Value, scopes: &ScopeStack) -> Vec<Identified> {
    let mut identified = Vec::new();
    match grammar::extract(node) {
        Extraction::Ref(record) => {
            let found = match &record.table {
                TableRef::Entity(table) => Found::Record {
                    reference: record.resolve(table),
                    table: record.table.clone(),
                },
                TableRef::Source(alias) => match scopes.resolve(alias) {
                    Some(table) => Found::Record {
                        reference: record.resolve(table),
                        table: record.table.clone(),
                    },
                    None => Found::Malformed {
                        discriminator: record.kind.discriminator().to_string(),
                        reason: format!("unresolved table alias '{alias}'"),
                    },
                },
            };
            identified.push(Identified {
                rel: NodePath::root(),
                found,
            });
        }
        Extraction::Malformed {
            discriminator,
            reason,
        } => identified.push(Identified {
            rel: NodePath::root(),
            found: Found::Malformed {
                discriminator,
                reason,
            },
        }),
        Extraction::NotARef => {}
    }
    if let Some(map) = node.as_object() {
        for key in grammar::TEXTUAL_KEYS {
            if let Some(Value::String(value)) = map.get(*key) {
                if grammar::parse_dotted(value).is_some() {
                    identified.push(Identified {
                        rel: NodePath::from(vec![PathSegment::Key((*key).to_string())]),
                        found: Found::Text {
                            key: (*key).to_string(),
                            value: value.clone(),
                        },
                    });
                }
            }
        }
    }
    identified
}

/// Exact reference equality, the only match rule for structural records.
#[must_use]
pub fn matches_record(found: &FieldReference, source: &FieldReference) -> bool {
    found == source
}

/// Whole-string equality against the source's textual rendering. Textual
/// occurrences carry no discriminator, so the kind does not participate.
#[must_use]
pub fn matches_text(value: &str, source: &FieldReference) -> bool {
    value == grammar::text_form(source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn scoped_stack() -> ScopeStack {
        let mut scopes = ScopeStack::new();
        let query = json!({
            "From": [
                {"Name": "s", "Entity": "Sales", "Type": 0},
                {"Name": "f", "Entity": "Finance", "Type": 0}
            ],
            "Select": []
        });
        scopes.enter(&query, &NodePath::root().child_key("prototypeQuery"));
        scopes
    }

    #[test]
    fn resolves_alias_through_scope() {
        let scopes = scoped_stack();
        assert_eq!(scopes.resolve("s"), Some("Sales"));
        assert_eq!(scopes.resolve("x"), None);
        assert_eq!(scopes.alias_for("Finance"), Some("f"));
    }

    #[test]
    fn prune_pops_left_scopes() {
        let mut scopes = scoped_stack();
        scopes.prune(&NodePath::root().child_key("prototypeQuery").child_key("Select"));
        assert_eq!(scopes.resolve("s"), Some("Sales"));
        scopes.prune(&NodePath::root().child_key("objects"));
        assert_eq!(scopes.resolve("s"), None);
    }

    #[test]
    fn identifies_select_entry_twice() {
        let scopes = scoped_stack();
        let entry = json!({
            "Measure": {
                "Expression": {"SourceRef": {"Source": "s"}},
                "Property": "Revenue"
            },
            "Name": "Sales.Revenue"
        });
        let identified = identify(&entry, &scopes);
        assert_eq!(identified.len(), 2);
        assert!(matches!(
            &identified[0].found,
            Found::Record { reference, .. }
                if *reference == FieldReference::measure("Sales", "Revenue")
        ));
        assert!(matches!(
            &identified[1].found,
            Found::Text { key, value } if key == "Name" && value == "Sales.Revenue"
        ));
    }

    #[test]
    fn unresolved_alias_is_malformed() {
        let scopes = ScopeStack::new();
        let entry = json!({
            "Column": {
                "Expression": {"SourceRef": {"Source": "q"}},
                "Property": "Region"
            }
        });
        let identified = identify(&entry, &scopes);
        assert_eq!(identified.len(), 1);
        assert!(matches!(
            &identified[0].found,
            Found::Malformed { reason, .. } if reason.contains("q")
        ));
    }

    #[test]
    fn undotted_role_values_are_ignored() {
        let scopes = ScopeStack::new();
        let entry = json!({"Name": "s", "Entity": "Sales"});
        assert!(identify(&entry, &scopes).is_empty());
    }
}
