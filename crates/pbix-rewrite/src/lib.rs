//! Field-reference rewriting for Power BI thin-report layouts.
//!
//! A thin report binds its visuals to an external shared data model. When a
//! model field moves or is renamed, every visual, filter, and query in the
//! report's layout still points at the old (table, field) pair. This crate
//! walks the parsed layout tree, finds those bindings structurally, and
//! substitutes the new reference in place, leaving everything else —
//! display overrides, selection state, formatting, unknown visual types —
//! untouched.
//!
//! The pieces, leaves first:
//!
//! - [`grammar`] — how a reference is encoded (structural records and
//!   dotted role strings) and how patched records are built.
//! - [`walker`] — generic deterministic traversal; knows nothing about
//!   references.
//! - [`matcher`] — shape detection plus query-scope alias resolution.
//! - [`engine`] — the single-pass rewrite orchestrating the three above.
//! - [`fields`], [`slicer`] — auxiliary passes: reference inventory and
//!   slicer selection reset.
//!
//! A rewrite pass is a pure function from `(tree, requests)` to a
//! [`pbix_model::RewriteResult`]; there is no global state, so independent
//! reports can be processed in parallel by independent invocations.

pub mod engine;
pub mod fields;
pub mod grammar;
pub mod matcher;
pub mod slicer;
pub mod walker;

pub use engine::rewrite;
pub use fields::collect_fields;
pub use grammar::{EncodeError, Extraction, RecordRef, TableRef, encode, extract};
pub use matcher::{Found, Identified, ScopeStack, identify};
pub use slicer::{SlicerReset, reset_slicers};
pub use walker::{VisitAction, walk, walk_ref};
