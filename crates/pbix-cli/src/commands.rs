//! Command runners wiring the container adapter to the rewrite passes.

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, info_span};

use pbix_container::{LayoutDocument, ReportArchive};
use pbix_model::{FieldKind, NodePath, RewriteRequest, RewriteResult};
use pbix_rewrite::{collect_fields, reset_slicers, rewrite};

use crate::cli::{FieldsArgs, KindArg, RenameArgs, RenameDirArgs, ResetSlicersArgs};
use crate::types::{BatchOutcome, FieldsOutcome, RenameOutcome, ResetOutcome};

pub fn run_rename(args: &RenameArgs) -> Result<RenameOutcome> {
    let requests = build_requests(&args.renames, args.kind)?;
    let archive = ReportArchive::open(&args.report)?;
    rename_archive(&archive, &requests, args.output.as_deref(), args.dry_run)
}

pub fn run_rename_dir(args: &RenameDirArgs) -> Result<BatchOutcome> {
    let requests = build_requests(&args.renames, args.kind)?;
    let mut reports = Vec::new();
    discover_reports(&args.directory, args.model.as_deref(), &mut reports)
        .with_context(|| format!("scan {}", args.directory.display()))?;
    reports.sort();
    info!(reports = reports.len(), "directory scan complete");

    let mut outcomes = Vec::new();
    let mut errors = Vec::new();
    for path in reports {
        let renamed = ReportArchive::open(&path)
            .map_err(anyhow::Error::from)
            .and_then(|archive| rename_archive(&archive, &requests, None, args.dry_run));
        match renamed {
            Ok(outcome) => outcomes.push(outcome),
            Err(error) => errors.push(format!("{}: {error:#}", path.display())),
        }
    }
    Ok(BatchOutcome { outcomes, errors })
}

pub fn run_fields(args: &FieldsArgs) -> Result<FieldsOutcome> {
    let archive = ReportArchive::open(&args.report)?;
    let document = LayoutDocument::parse(&archive.read_layout()?)?;
    let mut fields = collect_fields(document.tree());
    let queries: Vec<(String, bool)> = args
        .contains
        .iter()
        .map(|query| {
            let present = fields.iter().any(|field| field.matches_query(query));
            (query.clone(), present)
        })
        .collect();
    if !args.contains.is_empty() {
        fields.retain(|field| {
            args.contains
                .iter()
                .any(|query| field.matches_query(query))
        });
    }
    Ok(FieldsOutcome {
        report: args.report.clone(),
        fields,
        queries,
    })
}

pub fn run_reset_slicers(args: &ResetSlicersArgs) -> Result<ResetOutcome> {
    let archive = ReportArchive::open(&args.report)?;
    let span = info_span!("reset_slicers", report = %archive.path().display());
    let _guard = span.enter();

    let mut document = LayoutDocument::parse(&archive.read_layout()?)?;
    let reset = reset_slicers(document.take_tree());
    let cleared = reset.cleared;
    document.replace_tree(reset.tree);

    let written = if args.dry_run || (cleared.is_empty() && args.output.is_none()) {
        false
    } else {
        let bytes = document.to_bytes(&cleared)?;
        write_layout(&archive, &bytes, args.output.as_deref())?;
        true
    };
    info!(cleared = cleared.len(), written, "slicer reset complete");
    Ok(ResetOutcome {
        report: archive.path().to_path_buf(),
        cleared,
        written,
    })
}

/// Apply one rewrite pass to an opened archive.
pub fn rename_archive(
    archive: &ReportArchive,
    requests: &[RewriteRequest],
    output: Option<&Path>,
    dry_run: bool,
) -> Result<RenameOutcome> {
    let span = info_span!("rename", report = %archive.path().display());
    let _guard = span.enter();

    let mut document = LayoutDocument::parse(&archive.read_layout()?)?;
    let result = rewrite(document.take_tree(), requests);
    let touched: Vec<NodePath> = result.touched_paths().cloned().collect();
    let RewriteResult {
        tree,
        changes,
        warnings,
    } = result;
    document.replace_tree(tree);

    // In-place updates are skipped when nothing changed; an explicit output
    // path is honored either way so the caller always gets their file.
    let written = if dry_run || (changes.is_empty() && output.is_none()) {
        false
    } else {
        let bytes = document.to_bytes(&touched)?;
        write_layout(archive, &bytes, output)?;
        true
    };
    info!(
        changes = changes.len(),
        warnings = warnings.len(),
        written,
        "rename complete"
    );
    Ok(RenameOutcome {
        report: archive.path().to_path_buf(),
        changes,
        warnings,
        written,
    })
}

fn write_layout(archive: &ReportArchive, bytes: &[u8], output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => archive.write_with_layout(bytes, path)?,
        None => archive.replace_layout(bytes)?,
    }
    Ok(())
}

/// Expand rename specs into engine requests per the kind flag. `auto`
/// addresses each spec as both a column and a measure; the report decides
/// which shape actually matches.
pub fn build_requests(specs: &[String], kind: KindArg) -> Result<Vec<RewriteRequest>> {
    let mut requests = Vec::new();
    for spec in specs {
        for field_kind in kinds_for(kind) {
            let request = RewriteRequest::parse(spec, *field_kind)
                .with_context(|| format!("invalid rename spec '{spec}'"))?;
            requests.push(request);
        }
    }
    Ok(requests)
}

const fn kinds_for(kind: KindArg) -> &'static [FieldKind] {
    match kind {
        KindArg::Auto => &[FieldKind::Column, FieldKind::Measure],
        KindArg::Column => &[FieldKind::Column],
        KindArg::Measure => &[FieldKind::Measure],
        KindArg::Hierarchy => &[FieldKind::Hierarchy],
        KindArg::HierarchyLevel => &[FieldKind::HierarchyLevel],
    }
}

fn discover_reports(
    directory: &Path,
    model: Option<&str>,
    found: &mut Vec<PathBuf>,
) -> io::Result<()> {
    for entry in std::fs::read_dir(directory)? {
        let path = entry?.path();
        if path.is_dir() {
            discover_reports(&path, model, found)?;
            continue;
        }
        let is_report = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension.eq_ignore_ascii_case("pbix"));
        if !is_report {
            continue;
        }
        if let Some(model) = model {
            if path.file_name().and_then(|name| name.to_str()) == Some(model) {
                debug!(path = %path.display(), "skipping shared model");
                continue;
            }
        }
        found.push(path);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_expands_to_column_and_measure() {
        let requests = build_requests(
            &["Sales.Revenue=Finance.TotalRevenue".to_string()],
            KindArg::Auto,
        )
        .unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].source.kind, FieldKind::Column);
        assert_eq!(requests[1].source.kind, FieldKind::Measure);
        assert_eq!(requests[1].target.table, "Finance");
    }

    #[test]
    fn hierarchy_level_specs_take_three_parts() {
        let requests = build_requests(
            &["Dates.Calendar.Year=Dates.Fiscal.Year".to_string()],
            KindArg::HierarchyLevel,
        )
        .unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].source.level.as_deref(), Some("Year"));
    }

    #[test]
    fn invalid_spec_is_rejected() {
        assert!(build_requests(&["Sales.Revenue".to_string()], KindArg::Auto).is_err());
        assert!(build_requests(&["Revenue=Other".to_string()], KindArg::Measure).is_err());
    }
}
