//! Console summaries rendered with comfy-table.

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use pbix_model::FieldKind;

use crate::types::{BatchOutcome, FieldsOutcome, RenameOutcome, ResetOutcome};

pub fn print_rename_summary(outcome: &RenameOutcome) {
    println!("Report: {}", outcome.report.display());
    if outcome.changes.is_empty() {
        println!("No fields to update");
    } else {
        let mut table = Table::new();
        table.set_header(vec![
            header_cell("Path"),
            header_cell("Before"),
            header_cell("After"),
            header_cell("Form"),
        ]);
        apply_table_style(&mut table);
        for change in &outcome.changes {
            table.add_row(vec![
                Cell::new(change.path.to_string()),
                Cell::new(change.before.to_string()),
                Cell::new(change.after.to_string()),
                Cell::new(change.form.to_string()),
            ]);
        }
        println!("{table}");
        let suffix = if outcome.written {
            ""
        } else {
            " (not written)"
        };
        println!("{} binding(s) updated{suffix}", outcome.changes.len());
    }
    print_warnings(outcome);
}

pub fn print_batch_summary(batch: &BatchOutcome) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Report"),
        header_cell("Changes"),
        header_cell("Warnings"),
        header_cell("Written"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    align_column(&mut table, 3, CellAlignment::Center);
    for outcome in &batch.outcomes {
        table.add_row(vec![
            Cell::new(outcome.report.display()),
            Cell::new(outcome.changes.len()),
            warning_cell(outcome.warnings.len()),
            written_cell(outcome.written),
        ]);
    }
    println!("{table}");
    println!(
        "{} report(s), {} binding(s) updated",
        batch.outcomes.len(),
        batch.total_changes()
    );
    for outcome in &batch.outcomes {
        print_warnings(outcome);
    }
    if !batch.errors.is_empty() {
        eprintln!("Errors:");
        for error in &batch.errors {
            eprintln!("- {error}");
        }
    }
}

pub fn print_fields_summary(outcome: &FieldsOutcome) {
    println!("Report: {}", outcome.report.display());
    if outcome.fields.is_empty() {
        println!("No fields found");
    } else {
        let mut table = Table::new();
        table.set_header(vec![
            header_cell("Field"),
            header_cell("Kinds"),
            header_cell("Occurrences"),
        ]);
        apply_table_style(&mut table);
        align_column(&mut table, 2, CellAlignment::Right);
        for field in &outcome.fields {
            table.add_row(vec![
                Cell::new(&field.name),
                Cell::new(kinds_label(&field.kinds)),
                Cell::new(field.occurrences),
            ]);
        }
        println!("{table}");
    }
    for (query, present) in &outcome.queries {
        if *present {
            println!("{query}: used");
        } else {
            println!("{query}: not used");
        }
    }
}

pub fn print_reset_summary(outcome: &ResetOutcome) {
    println!("Report: {}", outcome.report.display());
    if outcome.cleared.is_empty() {
        println!("No slicers to update");
        return;
    }
    for path in &outcome.cleared {
        println!("- {path}");
    }
    let suffix = if outcome.written {
        ""
    } else {
        " (not written)"
    };
    println!("{} slicer(s) updated{suffix}", outcome.cleared.len());
}

fn print_warnings(outcome: &RenameOutcome) {
    if outcome.warnings.is_empty() {
        return;
    }
    eprintln!("Warnings for {}:", outcome.report.display());
    for warning in &outcome.warnings {
        eprintln!("- {}: {}", warning.path, warning.message);
    }
}

fn kinds_label(kinds: &[FieldKind]) -> String {
    if kinds.is_empty() {
        return "-".to_string();
    }
    kinds
        .iter()
        .map(|kind| kind.to_string())
        .collect::<Vec<_>>()
        .join("/")
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(text: &str) -> Cell {
    Cell::new(text).add_attribute(Attribute::Bold)
}

fn warning_cell(count: usize) -> Cell {
    if count == 0 {
        Cell::new(count)
    } else {
        Cell::new(count).fg(Color::Yellow)
    }
}

fn written_cell(written: bool) -> Cell {
    if written {
        Cell::new("✓").fg(Color::Green)
    } else {
        Cell::new("-")
    }
}
