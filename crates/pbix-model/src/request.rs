//! Rewrite requests.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SpecError};
use crate::reference::{FieldKind, FieldReference};

/// One unit of rewrite work: every binding equal to `source` becomes
/// `target`. A batch of requests is applied in a single traversal; when two
/// requests share a source, the later one wins for each occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteRequest {
    pub source: FieldReference,
    pub target: FieldReference,
}

impl RewriteRequest {
    /// Build a request, rejecting self-renames (they would match on every
    /// pass and break idempotence).
    pub fn new(source: FieldReference, target: FieldReference) -> Result<Self> {
        if source == target {
            return Err(SpecError::IdentityRename {
                spec: format!("{source}={target}"),
            });
        }
        Ok(Self { source, target })
    }

    /// Parse an `OLD=NEW` rename spec where both sides use the given kind.
    pub fn parse(spec: &str, kind: FieldKind) -> Result<Self> {
        let (old, new) = spec
            .split_once('=')
            .ok_or_else(|| SpecError::InvalidRenameSpec {
                spec: spec.to_string(),
            })?;
        Self::new(
            FieldReference::parse_spec(old.trim(), kind)?,
            FieldReference::parse_spec(new.trim(), kind)?,
        )
    }
}
