//! Frequency counts, cross-tabulations, grouped means and column summaries.
//!
//! Every operation reads a [`Relation`] and returns a fresh table. Missing
//! values never form a bucket of their own: each operation states which rows
//! it excludes.

use indexmap::IndexMap;
use survey_core::error::Result;
use survey_core::models::{ColumnSummary, CrossTab, FrequencyTable, GroupedMean, Relation};

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Stateless helper grouping relation rows by categorical values.
pub struct Aggregator;

impl Aggregator {
    /// Occurrences of each distinct non-missing value of `field`, in
    /// first-seen order. Missing values are left out entirely, so the counts
    /// sum to the number of rows where `field` is present.
    pub fn value_counts(relation: &Relation, field: &str) -> Result<FrequencyTable> {
        let mut table = FrequencyTable::new();
        for cell in relation.column(field)?.flatten() {
            table.increment(&cell.key());
        }
        Ok(table)
    }

    /// The `n` highest-count entries of `table`, highest first.
    ///
    /// Ties keep the table's iteration order, so for a table built by
    /// [`value_counts`](Self::value_counts) the value seen first in the input
    /// wins. This matters downstream: the winners decide which categories get
    /// cross-tabulated.
    pub fn top_n(table: &FrequencyTable, n: usize) -> FrequencyTable {
        table
            .sorted_by_count()
            .iter()
            .take(n)
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    /// Co-occurrence counts of `field_a` (rows) and `field_b` (columns).
    ///
    /// A row missing either value is skipped. Combinations that never occur
    /// read as zero.
    pub fn cross_tab(relation: &Relation, field_a: &str, field_b: &str) -> Result<CrossTab> {
        let ia = relation.require_column(field_a)?;
        let ib = relation.require_column(field_b)?;

        let mut tab = CrossTab::new(field_a, field_b);
        for row in relation.rows() {
            if let (Some(a), Some(b)) = (&row[ia], &row[ib]) {
                tab.increment(&a.key(), &b.key());
            }
        }
        Ok(tab)
    }

    /// Arithmetic mean of `measure_field` per distinct `group_field` value.
    ///
    /// Only rows where the group is present and the measure is numeric
    /// contribute. A group with no such row does not appear.
    pub fn grouped_mean(
        relation: &Relation,
        group_field: &str,
        measure_field: &str,
    ) -> Result<GroupedMean> {
        let ig = relation.require_column(group_field)?;
        let im = relation.require_column(measure_field)?;

        let mut sums: IndexMap<String, (f64, u64)> = IndexMap::new();
        for row in relation.rows() {
            let (Some(group), Some(measure)) = (&row[ig], &row[im]) else {
                continue;
            };
            let Some(value) = measure.as_f64() else {
                continue;
            };
            let acc = sums.entry(group.key()).or_insert((0.0, 0));
            acc.0 += value;
            acc.1 += 1;
        }

        Ok(GroupedMean::from_sums(sums))
    }

    /// Count, distinct values, most frequent value and its frequency for a
    /// categorical column, labelled `label`.
    pub fn describe(relation: &Relation, field: &str, label: &str) -> Result<ColumnSummary> {
        let counts = Self::value_counts(relation, field)?;

        let mut top: Option<(&str, u64)> = None;
        for (value, count) in counts.iter() {
            if top.map_or(true, |(_, best)| count > best) {
                top = Some((value, count));
            }
        }

        Ok(ColumnSummary {
            column: label.to_string(),
            count: counts.total(),
            unique: counts.len() as u64,
            top: top.map(|(v, _)| v.to_string()),
            freq: top.map(|(_, c)| c),
        })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
