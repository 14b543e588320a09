//! The layout entry codec.
//!
//! `Report/Layout` is a UTF-16LE JSON document. It nests further JSON
//! documents as strings: each visual container stores its `config`,
//! `filters`, `query`, and `dataTransforms` that way, and sections do the
//! same for their own `config` and `filters`. The codec inflates those
//! embedded documents into real subtrees so a rewrite pass sees one uniform
//! tree, and deflates them on the way out.
//!
//! Deflation keeps the original string verbatim for any slot whose subtree
//! the pass did not touch; only touched slots are re-serialized. Untouched
//! content therefore round-trips byte-for-byte even through inflation.

use encoding_rs::UTF_16LE;
use pbix_model::{NodePath, PathSegment};
use serde_json::Value;
use tracing::debug;

use crate::error::{ContainerError, Result};

/// Keys whose string values hold embedded JSON documents.
const EMBEDDED_KEYS: &[&str] = &["config", "filters", "query", "dataTransforms"];

#[derive(Debug)]
struct EmbeddedSlot {
    path: NodePath,
    original: String,
}

/// A parsed layout document with its embedded-document bookkeeping.
#[derive(Debug)]
pub struct LayoutDocument {
    tree: Value,
    slots: Vec<EmbeddedSlot>,
}

impl LayoutDocument {
    /// Decode and parse a layout entry, inflating embedded documents.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let (text, _, had_errors) = UTF_16LE.decode(bytes);
        if had_errors {
            return Err(ContainerError::Encoding);
        }
        let mut tree: Value =
            serde_json::from_str(&text).map_err(|source| ContainerError::Parse { source })?;
        let mut slots = Vec::new();
        let mut path = NodePath::root();
        inflate(&mut tree, &mut path, &mut slots);
        debug!(embedded = slots.len(), "layout parsed");
        Ok(Self { tree, slots })
    }

    #[must_use]
    pub fn tree(&self) -> &Value {
        &self.tree
    }

    /// Take the tree out for a rewrite pass. Put the result back with
    /// [`LayoutDocument::replace_tree`] before encoding.
    pub fn take_tree(&mut self) -> Value {
        std::mem::take(&mut self.tree)
    }

    pub fn replace_tree(&mut self, tree: Value) {
        self.tree = tree;
    }

    /// Serialize back to UTF-16LE bytes.
    ///
    /// `touched` lists the paths a pass modified; embedded slots containing
    /// none of them are restored from their original strings verbatim.
    pub fn to_bytes(&self, touched: &[NodePath]) -> Result<Vec<u8>> {
        let mut tree = self.tree.clone();
        for slot in &self.slots {
            let Some(node) = node_at_mut(&mut tree, &slot.path) else {
                continue;
            };
            if touched.iter().any(|path| slot.path.is_prefix_of(path)) {
                let text = serde_json::to_string(node)
                    .map_err(|source| ContainerError::Serialize { source })?;
                *node = Value::String(text);
            } else {
                *node = Value::String(slot.original.clone());
            }
        }
        let text =
            serde_json::to_string(&tree).map_err(|source| ContainerError::Serialize { source })?;
        Ok(encode_utf16le(&text))
    }
}

fn inflate(node: &mut Value, path: &mut NodePath, slots: &mut Vec<EmbeddedSlot>) {
    match node {
        Value::Object(map) => {
            for (key, child) in map.iter_mut() {
                path.push(PathSegment::Key(key.clone()));
                if EMBEDDED_KEYS.contains(&key.as_str()) && try_inflate(child, path, slots) {
                    path.pop();
                    continue;
                }
                inflate(child, path, slots);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter_mut().enumerate() {
                path.push(PathSegment::Index(index));
                inflate(child, path, slots);
                path.pop();
            }
        }
        _ => {}
    }
}

/// Inflate a single embedded slot in place. Strings that do not parse to a
/// JSON object or array are left alone.
fn try_inflate(child: &mut Value, path: &NodePath, slots: &mut Vec<EmbeddedSlot>) -> bool {
    let Value::String(text) = child else {
        return false;
    };
    let trimmed = text.trim_start();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return false;
    }
    let Ok(parsed) = serde_json::from_str::<Value>(text) else {
        return false;
    };
    if !(parsed.is_object() || parsed.is_array()) {
        return false;
    }
    let original = std::mem::take(text);
    *child = parsed;
    slots.push(EmbeddedSlot {
        path: path.clone(),
        original,
    });
    true
}

fn node_at_mut<'a>(tree: &'a mut Value, path: &NodePath) -> Option<&'a mut Value> {
    let mut node = tree;
    for segment in path.segments() {
        node = match segment {
            PathSegment::Key(key) => node.get_mut(key.as_str())?,
            PathSegment::Index(index) => node.get_mut(index)?,
        };
    }
    Some(node)
}

fn encode_utf16le(text: &str) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(text.len() * 2);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn utf16(text: &str) -> Vec<u8> {
        encode_utf16le(text)
    }

    #[test]
    fn inflates_visual_container_slots() {
        let layout = r#"{"sections":[{"name":"p1","visualContainers":[{"x":1.0,"config":"{\"singleVisual\":{\"visualType\":\"card\"}}","filters":"[]"}]}]}"#;
        let document = LayoutDocument::parse(&utf16(layout)).unwrap();
        let container = &document.tree()["sections"][0]["visualContainers"][0];
        assert_eq!(
            container["config"]["singleVisual"]["visualType"],
            json!("card")
        );
        assert_eq!(container["filters"], json!([]));
    }

    #[test]
    fn untouched_slots_round_trip_verbatim() {
        // The embedded config carries non-canonical spacing; a byte-for-byte
        // round trip proves the original string was kept, not re-serialized.
        let layout = r#"{"sections":[{"visualContainers":[{"config":"{ \"singleVisual\": { \"visualType\": \"card\" } }"}]}]}"#;
        let bytes = utf16(layout);
        let document = LayoutDocument::parse(&bytes).unwrap();
        assert_eq!(document.to_bytes(&[]).unwrap(), bytes);
    }

    #[test]
    fn touched_slots_are_reserialized() {
        let layout = r#"{"sections":[{"visualContainers":[{"config":"{\"singleVisual\":{\"visualType\":\"card\"}}"}]}]}"#;
        let mut document = LayoutDocument::parse(&utf16(layout)).unwrap();
        let mut tree = document.take_tree();
        let touched = NodePath::root()
            .child_key("sections")
            .child_index(0)
            .child_key("visualContainers")
            .child_index(0)
            .child_key("config")
            .child_key("singleVisual")
            .child_key("visualType");
        tree["sections"][0]["visualContainers"][0]["config"]["singleVisual"]["visualType"] =
            json!("slicer");
        document.replace_tree(tree);
        let bytes = document.to_bytes(&[touched]).unwrap();
        let (text, _, _) = UTF_16LE.decode(&bytes);
        assert!(text.contains(r#"{\"singleVisual\":{\"visualType\":\"slicer\"}}"#));
    }

    #[test]
    fn non_json_strings_stay_scalars() {
        let layout = r#"{"sections":[{"visualContainers":[{"config":"not json"}]}]}"#;
        let bytes = utf16(layout);
        let document = LayoutDocument::parse(&bytes).unwrap();
        assert_eq!(
            document.tree()["sections"][0]["visualContainers"][0]["config"],
            json!("not json")
        );
        assert_eq!(document.to_bytes(&[]).unwrap(), bytes);
    }

    #[test]
    fn malformed_utf16_is_a_parse_failure() {
        // An odd byte count cannot be UTF-16.
        let mut bytes = utf16(r#"{"sections":[]}"#);
        bytes.push(0x22);
        // Truncation may decode with replacement characters or fail JSON
        // parsing; either way the document is rejected.
        assert!(LayoutDocument::parse(&bytes).is_err());
    }

    #[test]
    fn invalid_json_is_rejected() {
        let bytes = utf16(r#"{"sections":"#);
        assert!(matches!(
            LayoutDocument::parse(&bytes),
            Err(ContainerError::Parse { .. })
        ));
    }

    #[test]
    fn bom_is_tolerated() {
        let mut bytes = vec![0xFF, 0xFE];
        bytes.extend_from_slice(&utf16(r#"{"id":7}"#));
        let document = LayoutDocument::parse(&bytes).unwrap();
        assert_eq!(document.tree()["id"], json!(7));
    }
}
