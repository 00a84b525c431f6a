//! Shared rendering helpers
//!
//! Status coloring for watch lines and the plain-text table format used
//! by both the lifecycle stream blocks and the one-shot CLI commands.

use console::Style;
use serde_json::Value;

/// Fixed colors for enumerated posture statuses. Everything else renders
/// in the default accent color; color codes are only produced when the
/// caller asked for them (interactive, non-JSON output).
pub fn colorize_status(status: &str, use_color: bool) -> String {
    let normalized = status.replace('_', "-").to_lowercase();
    if !use_color {
        return normalized;
    }
    let style = match normalized.as_str() {
        "trusted" => Style::new().green(),
        "untrusted" => Style::new().red(),
        "unknown" | "pending" | "stale" => Style::new().yellow(),
        _ => Style::new().cyan(),
    };
    style
        .force_styling(true)
        .apply_to(normalized)
        .to_string()
}

/// Render rows as a left-justified table: header, dash separator, rows.
///
/// Cells are rendered as passed; callers stringify their own values.
pub fn render_table(columns: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = columns.iter().map(|c| c.len()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(cell.len());
        }
    }

    let pad = |cells: Vec<String>| {
        cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| format!("{cell:<width$}", width = widths[idx]))
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(pad(columns.iter().map(|c| c.to_string()).collect()));
    lines.push(
        widths
            .iter()
            .map(|w| "-".repeat(*w))
            .collect::<Vec<_>>()
            .join(" "),
    );
    for row in rows {
        let mut cells = row.clone();
        cells.resize(columns.len(), String::new());
        lines.push(pad(cells));
    }
    lines.join("\n")
}

/// Compact JSON summary for table cells, truncated with an ellipsis.
pub fn summarize_json(value: Option<&Value>, max_length: usize) -> String {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return "-".to_string();
    };
    let text = value.to_string();
    if text.len() <= max_length {
        text
    } else {
        format!("{}...", &text[..max_length.saturating_sub(3)])
    }
}

/// JSON-ish literal rendering for delta field values.
pub fn literal(value: &Value) -> String {
    value.to_string()
}
