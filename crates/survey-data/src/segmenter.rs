//! Partitioning of a relation by exact equality on one field.

use survey_core::error::Result;
use survey_core::models::{Cell, Relation, SegmentCounts};
use tracing::debug;

/// Split `relation` into the rows whose `field` equals `target` and all the
/// others.
///
/// Comparison is exact string equality: no trimming beyond what the loader
/// already did and no case folding. Rows with a missing value land in the
/// non-matching side. Every row appears in exactly one output.
pub fn segment(relation: &Relation, field: &str, target: &str) -> Result<(Relation, Relation)> {
    let idx = relation.require_column(field)?;
    let matching = relation.filter_rows(|row| is_match(row[idx].as_ref(), target));
    let non_matching = relation.filter_rows(|row| !is_match(row[idx].as_ref(), target));
    debug!(
        field,
        target,
        matching = matching.len(),
        non_matching = non_matching.len(),
        "segmented relation"
    );
    Ok((matching, non_matching))
}

/// Sizes of the two sides of [`segment`] without materialising them.
pub fn segment_counts(relation: &Relation, field: &str, target: &str) -> Result<SegmentCounts> {
    let matching = relation
        .column(field)?
        .filter(|cell| is_match(*cell, target))
        .count() as u64;
    Ok(SegmentCounts::new(
        matching,
        relation.len() as u64 - matching,
    ))
}

/// Attach a column `out_field` holding `match_label` or `other_label` for each
/// row, following the same rule as [`segment`].
pub fn label_segments(
    relation: &Relation,
    field: &str,
    target: &str,
    out_field: &str,
    match_label: &str,
    other_label: &str,
) -> Result<Relation> {
    let idx = relation.require_column(field)?;
    Ok(relation.with_derived(out_field, |row| {
        let label = if is_match(row[idx].as_ref(), target) {
            match_label
        } else {
            other_label
        };
        Some(Cell::Text(label.to_string()))
    }))
}

fn is_match(cell: Option<&Cell>, target: &str) -> bool {
    match cell {
        Some(Cell::Text(s)) => s == target,
        Some(Cell::Int(n)) => n.to_string() == target,
        None => false,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
