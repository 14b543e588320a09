//! Slicer selection reset.
//!
//! Multi-select slicers that were saved with "Select all" carry an
//! `isInvertedSelectionMode` marker in their data properties. Clearing the
//! marker returns the slicer to an unselected state on next open — but only
//! when the slicer has no explicit default selection, which lives in a
//! `general` properties filter. This pass is the one place a key is removed
//! from the tree; every removal is recorded by path.

use pbix_model::NodePath;
use serde_json::Value;

use crate::walker::{VisitAction, walk};

const MARKER: &str = "isInvertedSelectionMode";

/// Outcome of a slicer reset pass.
#[derive(Debug)]
pub struct SlicerReset {
    pub tree: Value,
    /// Paths of the removed selection markers.
    pub cleared: Vec<NodePath>,
}

impl SlicerReset {
    #[must_use]
    pub fn changed(&self) -> usize {
        self.cleared.len()
    }
}

/// Clear the inverted-selection marker from every slicer configuration that
/// has no default selection.
#[must_use]
pub fn reset_slicers(mut tree: Value) -> SlicerReset {
    let mut cleared = Vec::new();
    walk(&mut tree, &mut |node, path| {
        let Some(single) = node.get("singleVisual") else {
            return VisitAction::Keep;
        };
        if single.get("visualType").and_then(Value::as_str) != Some("slicer") {
            return VisitAction::Keep;
        }
        if has_default_selection(single) || !has_marker(single) {
            return VisitAction::Keep;
        }

        let mut patched = node.clone();
        if let Some(data) = patched
            .get_mut("singleVisual")
            .and_then(|sv| sv.get_mut("objects"))
            .and_then(|objects| objects.get_mut("data"))
            .and_then(Value::as_array_mut)
        {
            for (index, item) in data.iter_mut().enumerate() {
                let Some(properties) = item
                    .get_mut("properties")
                    .and_then(Value::as_object_mut)
                else {
                    continue;
                };
                // shift_remove keeps the remaining key order stable.
                if properties.shift_remove(MARKER).is_some() {
                    cleared.push(
                        path.child_key("singleVisual")
                            .child_key("objects")
                            .child_key("data")
                            .child_index(index)
                            .child_key("properties")
                            .child_key(MARKER),
                    );
                }
            }
        }
        VisitAction::Replace {
            node: patched,
            descend: false,
        }
    });
    SlicerReset { tree, cleared }
}

fn has_marker(single: &Value) -> bool {
    single
        .get("objects")
        .and_then(|objects| objects.get("data"))
        .and_then(Value::as_array)
        .is_some_and(|data| {
            data.iter().any(|item| {
                item.get("properties")
                    .and_then(Value::as_object)
                    .is_some_and(|properties| properties.contains_key(MARKER))
            })
        })
}

fn has_default_selection(single: &Value) -> bool {
    single
        .get("objects")
        .and_then(|objects| objects.get("general"))
        .and_then(Value::as_array)
        .is_some_and(|general| {
            general
                .iter()
                .any(|item| item.get("properties").and_then(|p| p.get("filter")).is_some())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slicer_config(with_default: bool) -> Value {
        let mut general = json!([{"properties": {"outlineColor": {}}}]);
        if with_default {
            general = json!([{"properties": {"filter": {"From": [], "Where": []}}}]);
        }
        json!({
            "singleVisual": {
                "visualType": "slicer",
                "objects": {
                    "data": [{
                        "properties": {
                            "isInvertedSelectionMode": {"expr": {"Literal": {"Value": "true"}}},
                            "mode": {"expr": {"Literal": {"Value": "'Basic'"}}}
                        }
                    }],
                    "general": general
                }
            }
        })
    }

    #[test]
    fn clears_marker_without_default_selection() {
        let tree = json!({"config": slicer_config(false)});
        let result = reset_slicers(tree);
        assert_eq!(result.changed(), 1);
        let properties = &result.tree["config"]["singleVisual"]["objects"]["data"][0]["properties"];
        assert!(properties.get("isInvertedSelectionMode").is_none());
        // Sibling settings survive.
        assert!(properties.get("mode").is_some());
        assert_eq!(
            result.cleared[0].to_string(),
            "$.config.singleVisual.objects.data[0].properties.isInvertedSelectionMode"
        );
    }

    #[test]
    fn keeps_marker_when_default_selection_exists() {
        let tree = json!({"config": slicer_config(true)});
        let original = tree.clone();
        let result = reset_slicers(tree);
        assert_eq!(result.changed(), 0);
        assert_eq!(result.tree, original);
    }

    #[test]
    fn ignores_non_slicer_visuals() {
        let tree = json!({
            "config": {
                "singleVisual": {
                    "visualType": "barChart",
                    "objects": {
                        "data": [{"properties": {"isInvertedSelectionMode": {}}}]
                    }
                }
            }
        });
        let original = tree.clone();
        let result = reset_slicers(tree);
        assert_eq!(result.changed(), 0);
        assert_eq!(result.tree, original);
    }
}
