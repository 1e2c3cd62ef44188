//! Console presentation of a ledger.

use crate::snapshot::EventWindow;
use vcevidence_schema::{EvidenceRecord, Summary};

const HEADERS: [&str; 7] = [
    "Timestamp", "Category", "Scope", "Ref", "Key", "Value", "Severity",
];

/// Widest a cell may get before it is cut.
const MAX_CELL_WIDTH: usize = 60;

fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_CELL_WIDTH {
        return text.to_string();
    }
    let cut: String = text.chars().take(MAX_CELL_WIDTH - 3).collect();
    format!("{}...", cut)
}

fn row(record: &EvidenceRecord) -> [String; 7] {
    [
        record.timestamp.to_display(),
        record.category.to_string(),
        truncate(&record.scope),
        record.reference.clone(),
        truncate(&record.key),
        truncate(&record.value),
        record.severity.to_string(),
    ]
}

/// Render records as an aligned text table. Records are printed in the
/// order given.
pub fn render_table(records: &[EvidenceRecord]) -> String {
    let rows: Vec<[String; 7]> = records.iter().map(row).collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_line = |cells: &[&str]| -> String {
        let padded: Vec<String> = cells
            .iter()
            .zip(widths.iter())
            .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
            .collect();
        padded.join("  ").trim_end().to_string()
    };

    let mut out = String::new();
    out.push_str(&format_line(&HEADERS));
    out.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("  "));
    out.push('\n');
    for row in &rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&format_line(&cells));
        out.push('\n');
    }
    out
}

/// Summary block for the run's evidence window.
pub fn render_summary(summary: &Summary, window: &EventWindow, completed: bool) -> String {
    let mut out = format!(
        "Evidence summary ({} days, {})\n  Total: {}\n  Pass:  {}\n  Info:  {}\n  \
         Warn:  {}\n  Fail:  {}\n",
        window.days_back,
        window.scope(),
        summary.total,
        summary.pass,
        summary.info,
        summary.warn,
        summary.fail
    );
    if !completed {
        out.push_str("  Run was cancelled; the ledger is partial.\n");
    }
    out
}
