use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use archiver_store::{FailureKind, RunOutcome, location_for_entry};

use crate::driver::RunReport;

pub fn print_summary(report: &RunReport) {
    println!("Archive: {}", report.target.display());
    for seed in &report.seeds {
        println!("Seed: {seed}");
    }
    println!("{}", summary_table(report));
    if let Some(table) = failure_table(report) {
        println!();
        println!("Failures:");
        println!("{table}");
    }
    if let Some(location) = &report.summary.aborted {
        eprintln!("Aborted: schema resource {location} failed to load");
    }
    if let Some(error) = &report.commit_error {
        eprintln!("Archive not written: {error}");
    }
}

fn summary_table(report: &RunReport) -> Table {
    let summary = &report.summary;
    let mut table = Table::new();
    table.set_header(vec![header_cell("Step"), header_cell("Count")]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);

    let rows = [
        ("Resources mirrored", report.resources, None),
        ("Verified fetches", report.verified, None),
        ("Saved", summary.saved.len(), Some(Color::Green)),
        ("Unchanged", summary.unchanged.len(), None),
        ("Ignored", summary.ignored.len(), None),
        ("Failures", summary.failures.len(), Some(Color::Red)),
        ("Deleted", summary.deleted.len(), Some(Color::Yellow)),
        ("Retained", summary.retained.len(), Some(Color::Yellow)),
        ("Unresolved proxies", report.unresolved, Some(Color::Yellow)),
    ];
    for (label, count, color) in rows {
        table.add_row(vec![Cell::new(label), count_cell(count, color)]);
    }
    table.add_row(vec![
        Cell::new("Outcome")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        outcome_cell(report.outcome),
    ]);
    table
}

fn failure_table(report: &RunReport) -> Option<Table> {
    let failures = &report.summary.failures;
    if failures.is_empty() {
        return None;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Location"),
        header_cell("Step"),
        header_cell("Message"),
    ]);
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(160);
    align_column(&mut table, 1, CellAlignment::Center);
    for failure in failures {
        let message = if failure.messages.is_empty() {
            "no content".to_string()
        } else {
            failure.messages.join("\n")
        };
        table.add_row(vec![
            Cell::new(failure.location.as_str()),
            kind_cell(failure.kind),
            Cell::new(message),
        ]);
    }
    Some(table)
}

/// One line per entry: the entry name and the location it mirrors.
pub fn render_entries(names: &[String]) -> String {
    let width = names.iter().map(String::len).max().unwrap_or(0);
    let mut out = String::new();
    for name in names {
        let source = match location_for_entry(name) {
            Ok(location) => location.to_string(),
            Err(_) => "-".to_string(),
        };
        out.push_str(&format!("{name:<width$}  {source}\n"));
    }
    out
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(80);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn count_cell(count: usize, color: Option<Color>) -> Cell {
    match color {
        Some(color) if count > 0 => Cell::new(count).fg(color).add_attribute(Attribute::Bold),
        _ => dim_cell(count),
    }
}

fn outcome_cell(outcome: RunOutcome) -> Cell {
    let color = match outcome {
        RunOutcome::Unchanged => Color::DarkGrey,
        RunOutcome::Created | RunOutcome::Updated => Color::Green,
        RunOutcome::FailedCreate | RunOutcome::RejectedNew | RunOutcome::ReplaceFailed => {
            Color::Red
        }
    };
    Cell::new(outcome.label())
        .fg(color)
        .add_attribute(Attribute::Bold)
}

fn kind_cell(kind: FailureKind) -> Cell {
    match kind {
        FailureKind::Load => Cell::new("LOAD").fg(Color::Red),
        FailureKind::Save => Cell::new("SAVE")
            .fg(Color::Red)
            .add_attribute(Attribute::Bold),
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
