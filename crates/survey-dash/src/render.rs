//! Plain-text and JSON rendering of an assembled [`Report`].
//!
//! The text form lays every result table out as aligned columns; widths are
//! measured in terminal cells so that non-ASCII answers line up.

use survey_core::formatting::{format_count, format_number, format_share};
use survey_core::models::{
    ColumnSummary, CrossTab, FrequencyTable, GroupedMean, Report, ResultTable, SegmentCounts,
};
use survey_core::schema::{REGION_REST, REGION_US};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Cells wider than this are cut and end in an ellipsis.
const MAX_CELL_WIDTH: usize = 40;

// ── Public API ────────────────────────────────────────────────────────────────

/// Pretty-printed JSON for downstream tooling.
pub fn render_json(report: &Report) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Human-readable report: a header, one section per completed analysis and
/// a trailing list of skipped analyses with their reasons.
pub fn render_text(report: &Report) -> String {
    let meta = &report.metadata;
    let mut out = String::new();

    out.push_str("Survey Data Analysis\n");
    out.push_str(&format!(
        "Source: {} | Rows: {} | Reference year: {} | Top N: {}\n",
        meta.source,
        format_count(meta.rows_loaded as u64),
        meta.reference_year,
        meta.top_n
    ));

    for analysis in report.completed() {
        let Some(table) = analysis.table() else {
            continue;
        };
        out.push('\n');
        out.push_str(&section_heading(&analysis.title));
        out.push_str(&render_table(table).render());
    }

    let skipped: Vec<_> = report.skipped().collect();
    if !skipped.is_empty() {
        out.push('\n');
        out.push_str(&section_heading("Skipped analyses"));
        for analysis in skipped {
            out.push_str(&format!(
                "- {}: {}\n",
                analysis.name,
                analysis.skip_reason().unwrap_or("unknown reason")
            ));
        }
    }

    out
}

// ── Table builders ────────────────────────────────────────────────────────────

fn render_table(table: &ResultTable) -> TextTable {
    match table {
        ResultTable::Segments(counts) => segments_table(counts),
        ResultTable::Frequency(freq) => frequency_table(freq),
        ResultTable::CrossTab(tab) => cross_tab_table(tab),
        ResultTable::GroupedMean(means) => grouped_mean_table(means),
        ResultTable::Summary(columns) => summary_table(columns),
    }
}

fn segments_table(counts: &SegmentCounts) -> TextTable {
    let total = counts.total;
    let mut table = TextTable::new(&["Region", "Respondents", "Share"], &[false, true, true]);
    table.push(vec![
        REGION_US.to_string(),
        format_count(counts.matching),
        format_share(counts.matching, total),
    ]);
    table.push(vec![
        REGION_REST.to_string(),
        format_count(counts.non_matching),
        format_share(counts.non_matching, total),
    ]);
    table.push(vec!["Total".to_string(), format_count(total), format_share(total, total)]);
    table
}

fn frequency_table(freq: &FrequencyTable) -> TextTable {
    let total = freq.total();
    let mut table = TextTable::new(&["Value", "Count", "Share"], &[false, true, true]);
    for (value, count) in freq.iter() {
        table.push(vec![
            value.to_string(),
            format_count(count),
            format_share(count, total),
        ]);
    }
    table
}

fn cross_tab_table(tab: &CrossTab) -> TextTable {
    let columns: Vec<&str> = tab.column_keys().collect();

    let mut headers = vec![""];
    headers.extend(columns.iter().copied());
    headers.push("Total");
    let mut align = vec![true; headers.len()];
    align[0] = false;

    let mut table = TextTable::new(&headers, &align);
    for (i, row_key) in tab.row_keys().enumerate() {
        let counts = tab.row_counts(i).unwrap_or(&[]);
        let mut row = vec![row_key.to_string()];
        row.extend(counts.iter().map(|c| format_count(*c)));
        row.push(format_count(tab.row_total(row_key)));
        table.push(row);
    }
    table
}

fn grouped_mean_table(means: &GroupedMean) -> TextTable {
    let mut table = TextTable::new(&["Group", "Mean", "N"], &[false, true, true]);
    for (group, stat) in means.iter() {
        table.push(vec![
            group.to_string(),
            format_number(stat.mean, 2),
            format_count(stat.count),
        ]);
    }
    table
}

fn summary_table(columns: &[ColumnSummary]) -> TextTable {
    let mut table = TextTable::new(
        &["Column", "count", "unique", "top", "freq"],
        &[false, true, true, false, true],
    );
    for summary in columns {
        table.push(vec![
            summary.column.clone(),
            format_count(summary.count),
            format_count(summary.unique),
            summary.top.clone().unwrap_or_else(|| "-".to_string()),
            summary.freq.map(format_count).unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table
}

// ── TextTable ─────────────────────────────────────────────────────────────────

/// Column-aligned plain-text table.
struct TextTable {
    headers: Vec<String>,
    right_align: Vec<bool>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    fn new(headers: &[&str], right_align: &[bool]) -> Self {
        Self {
            headers: headers.iter().map(|h| truncate(h, MAX_CELL_WIDTH)).collect(),
            right_align: right_align.to_vec(),
            rows: Vec::new(),
        }
    }

    fn push(&mut self, row: Vec<String>) {
        self.rows
            .push(row.iter().map(|c| truncate(c, MAX_CELL_WIDTH)).collect());
    }

    fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.width()).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if let Some(w) = widths.get_mut(i) {
                    *w = (*w).max(cell.width());
                }
            }
        }

        let mut out = String::new();
        out.push_str(&self.render_line(&self.headers, &widths));
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        out.push_str(&rule.join("  "));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&self.render_line(row, &widths));
        }
        out
    }

    fn render_line(&self, cells: &[String], widths: &[usize]) -> String {
        let padded: Vec<String> = widths
            .iter()
            .enumerate()
            .map(|(i, &width)| {
                let cell = cells.get(i).map(String::as_str).unwrap_or("");
                let fill = " ".repeat(width.saturating_sub(cell.width()));
                if self.right_align.get(i).copied().unwrap_or(false) {
                    format!("{}{}", fill, cell)
                } else {
                    format!("{}{}", cell, fill)
                }
            })
            .collect();
        format!("{}\n", padded.join("  ").trim_end())
    }
}

fn section_heading(title: &str) -> String {
    format!("{}\n{}\n", title, "=".repeat(title.width()))
}

/// Cut `s` to at most `max` terminal cells, marking the cut with `…`.
fn truncate(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in s.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > max.saturating_sub(1) {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
