//! The rewrite engine: one traversal pass applying a batch of requests.
//!
//! The engine owns the tree for the duration of the pass and is a pure
//! function of `(tree, requests)`. It drives the walker, maintains the
//! query-scope stack for the matcher, and turns matches into in-place
//! substitutions built by the grammar's `encode`. Per-occurrence failures
//! become warnings in the result; nothing here aborts the pass.

use pbix_model::{
    FieldReference, NodePath, OccurrenceForm, RewriteChange, RewriteRequest, RewriteResult,
    RewriteWarning, WarningKind,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::grammar::{self, EncodeError, TableRef};
use crate::matcher::{self, Found, ScopeStack};
use crate::walker::{VisitAction, walk};

/// Apply `requests` to `tree` in a single pass.
///
/// When two requests share a source, the later one wins for each occurrence.
/// An empty request batch, or a batch matching nothing, returns the tree
/// unchanged with zero changes.
#[must_use]
pub fn rewrite(mut tree: Value, requests: &[RewriteRequest]) -> RewriteResult {
    let mut changes: Vec<RewriteChange> = Vec::new();
    let mut warnings: Vec<RewriteWarning> = Vec::new();
    if requests.is_empty() {
        return RewriteResult {
            tree,
            changes,
            warnings,
        };
    }

    let mut scopes = ScopeStack::new();
    walk(&mut tree, &mut |node, path| {
        scopes.prune(path);
        scopes.enter(node, path);
        visit(node, path, requests, &scopes, &mut changes, &mut warnings)
    });

    info!(
        requests = requests.len(),
        changes = changes.len(),
        warnings = warnings.len(),
        "rewrite pass complete"
    );
    RewriteResult {
        tree,
        changes,
        warnings,
    }
}

fn visit(
    node: &Value,
    path: &NodePath,
    requests: &[RewriteRequest],
    scopes: &ScopeStack,
    changes: &mut Vec<RewriteChange>,
    warnings: &mut Vec<RewriteWarning>,
) -> VisitAction {
    let identified = matcher::identify(node, scopes);
    if identified.is_empty() {
        return VisitAction::Keep;
    }

    // Resolved record patch for the node itself, plus textual patches one
    // key below. A failed record patch skips the node's textual siblings
    // too, so a select entry never ends up half renamed.
    let mut record_patch: Option<(Value, RewriteChange)> = None;
    let mut record_failed = false;
    let mut text_patches: Vec<(String, RewriteChange)> = Vec::new();

    for identified in identified {
        match identified.found {
            Found::Record { reference, table } => {
                let Some(request) = last_matching(requests, |source| {
                    matcher::matches_record(&reference, source)
                }) else {
                    continue;
                };
                match build_record_patch(node, path, &reference, &table, request, scopes) {
                    Ok(patch) => record_patch = Some(patch),
                    Err(warning) => {
                        record_failed = true;
                        push_warning(warnings, warning);
                    }
                }
            }
            Found::Text { key, value } => {
                let Some(request) =
                    last_matching(requests, |source| matcher::matches_text(&value, source))
                else {
                    continue;
                };
                let change = RewriteChange {
                    path: path.join(&identified.rel),
                    before: request.source.clone(),
                    after: request.target.clone(),
                    form: OccurrenceForm::Text,
                };
                text_patches.push((key, change));
            }
            Found::Malformed {
                discriminator,
                reason,
            } => {
                push_warning(
                    warnings,
                    RewriteWarning {
                        path: path.clone(),
                        kind: WarningKind::UnsupportedBinding,
                        message: format!(
                            "reference-shaped node with discriminator '{discriminator}' skipped: {reason}"
                        ),
                    },
                );
            }
        }
    }

    if record_failed {
        return VisitAction::Keep;
    }

    match (record_patch, text_patches.is_empty()) {
        (Some((mut patched, change)), _) => {
            push_change(changes, change);
            // Textual siblings land inside the already patched record.
            for (key, text_change) in text_patches {
                if let Some(map) = patched.as_object_mut() {
                    map.insert(
                        key,
                        Value::String(grammar::text_form(&text_change.after)),
                    );
                }
                push_change(changes, text_change);
            }
            VisitAction::Replace {
                node: patched,
                descend: false,
            }
        }
        (None, false) => {
            let mut patched = node.clone();
            for (key, text_change) in text_patches {
                if let Some(map) = patched.as_object_mut() {
                    map.insert(
                        key,
                        Value::String(grammar::text_form(&text_change.after)),
                    );
                }
                push_change(changes, text_change);
            }
            // The node was only touched at textual leaves; its other
            // subtrees still need their visits.
            VisitAction::Replace {
                node: patched,
                descend: true,
            }
        }
        (None, true) => VisitAction::Keep,
    }
}

/// The last request whose source matches, per the closed tie-break rule.
fn last_matching<'a>(
    requests: &'a [RewriteRequest],
    matches: impl Fn(&FieldReference) -> bool,
) -> Option<&'a RewriteRequest> {
    requests.iter().rev().find(|request| matches(&request.source))
}

fn build_record_patch(
    node: &Value,
    path: &NodePath,
    reference: &FieldReference,
    table: &TableRef,
    request: &RewriteRequest,
    scopes: &ScopeStack,
) -> Result<(Value, RewriteChange), RewriteWarning> {
    let alias = match table {
        TableRef::Entity(_) => None,
        TableRef::Source(alias) => {
            if request.target.table == reference.table {
                Some(alias.clone())
            } else if let Some(existing) = scopes.alias_for(&request.target.table) {
                Some(existing.to_string())
            } else {
                // Growing the From list would change the tree's shape, so a
                // cross-table rename needs an alias that already exists.
                return Err(RewriteWarning {
                    path: path.clone(),
                    kind: WarningKind::TargetAliasUnavailable,
                    message: format!(
                        "skipped {reference}: no alias for table '{}' in the enclosing query scope",
                        request.target.table
                    ),
                });
            }
        }
    };
    match grammar::encode(&request.target, node, alias.as_deref()) {
        Ok(patched) => Ok((
            patched,
            RewriteChange {
                path: path.clone(),
                before: reference.clone(),
                after: request.target.clone(),
                form: OccurrenceForm::Record,
            },
        )),
        Err(error) => Err(RewriteWarning {
            path: path.clone(),
            kind: match error {
                EncodeError::AliasUnavailable { .. } => WarningKind::TargetAliasUnavailable,
                _ => WarningKind::Encode,
            },
            message: format!("skipped {reference}: {error}"),
        }),
    }
}

fn push_change(changes: &mut Vec<RewriteChange>, change: RewriteChange) {
    debug!(path = %change.path, before = %change.before, after = %change.after, "rewrote binding");
    changes.push(change);
}

fn push_warning(warnings: &mut Vec<RewriteWarning>, warning: RewriteWarning) {
    warn!(path = %warning.path, "{}", warning.message);
    warnings.push(warning);
}
