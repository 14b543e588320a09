//! Field inventory: a read-only pass listing every reference a layout uses.
//!
//! Useful before a rename to see what a report actually binds to, and to
//! check whether given fields occur at all.

use std::collections::{BTreeMap, BTreeSet};

use pbix_model::{FieldKind, FieldOccurrence};
use serde_json::Value;

use crate::grammar;
use crate::matcher::{self, Found, ScopeStack};
use crate::walker::walk_ref;

/// Collect every reference in `tree`, deduplicated by dotted name and
/// sorted. Structural records contribute their kinds; textual occurrences
/// count toward the same name without one.
#[must_use]
pub fn collect_fields(tree: &Value) -> Vec<FieldOccurrence> {
    let mut scopes = ScopeStack::new();
    let mut tally: BTreeMap<String, (BTreeSet<FieldKind>, usize)> = BTreeMap::new();

    walk_ref(tree, &mut |node, path| {
        scopes.prune(path);
        scopes.enter(node, path);
        let mut descend = true;
        for identified in matcher::identify(node, &scopes) {
            match identified.found {
                Found::Record { reference, .. } => {
                    let entry = tally.entry(grammar::text_form(&reference)).or_default();
                    entry.0.insert(reference.kind);
                    entry.1 += 1;
                    // The record subtree is consumed as one reference.
                    descend = false;
                }
                Found::Text { value, .. } => {
                    let entry = tally.entry(value).or_default();
                    entry.1 += 1;
                }
                Found::Malformed { .. } => {}
            }
        }
        descend
    });

    tally
        .into_iter()
        .map(|(name, (kinds, occurrences))| FieldOccurrence {
            name,
            kinds: kinds.into_iter().collect(),
            occurrences,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tallies_records_and_text() {
        let tree = json!({
            "singleVisual": {
                "projections": {
                    "Values": [{"queryRef": "Sales.Revenue"}],
                    "Category": [{"queryRef": "Sales.Region"}]
                },
                "prototypeQuery": {
                    "From": [{"Name": "s", "Entity": "Sales", "Type": 0}],
                    "Select": [
                        {
                            "Measure": {
                                "Expression": {"SourceRef": {"Source": "s"}},
                                "Property": "Revenue"
                            },
                            "Name": "Sales.Revenue"
                        },
                        {
                            "Column": {
                                "Expression": {"SourceRef": {"Source": "s"}},
                                "Property": "Region"
                            },
                            "Name": "Sales.Region"
                        }
                    ]
                }
            }
        });
        let fields = collect_fields(&tree);
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].name, "Sales.Region");
        assert_eq!(fields[0].kinds, vec![FieldKind::Column]);
        assert_eq!(fields[0].occurrences, 3);
        assert_eq!(fields[1].name, "Sales.Revenue");
        assert_eq!(fields[1].kinds, vec![FieldKind::Measure]);
        assert_eq!(fields[1].occurrences, 3);
    }

    #[test]
    fn query_matches_full_or_bare_name() {
        let tree = json!({
            "filters": [{
                "expression": {
                    "Measure": {
                        "Expression": {"SourceRef": {"Entity": "Sales"}},
                        "Property": "Revenue"
                    }
                }
            }]
        });
        let fields = collect_fields(&tree);
        assert_eq!(fields.len(), 1);
        assert!(fields[0].matches_query("Sales.Revenue"));
        assert!(fields[0].matches_query("Revenue"));
        assert!(!fields[0].matches_query("Sales"));
        assert!(!fields[0].matches_query("Other.Revenue"));
    }
}
