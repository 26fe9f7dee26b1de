use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SurveyError};
use crate::schema::{DEFAULT_REFERENCE_YEAR, DEFAULT_TOP_N};

// ── Cell ──────────────────────────────────────────────────────────────────────

/// A single non-missing value in a [`Relation`].
///
/// Survey answers are read as text; derived numeric fields (tenure) are
/// stored as integers. A missing value is represented by `None` at the
/// `Option<Cell>` level, never by an empty `Text`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Int(i64),
    Text(String),
}

impl Cell {
    /// Build a cell from raw input text. Empty or whitespace-only input is
    /// missing.
    pub fn from_raw(raw: &str) -> Option<Cell> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Cell::Text(trimmed.to_string()))
        }
    }

    /// Borrow the text of a `Text` cell.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s.as_str()),
            Cell::Int(_) => None,
        }
    }

    /// Numeric view of the cell: integers directly, text when it parses as
    /// a finite number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(n) => Some(*n as f64),
            Cell::Text(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        }
    }

    /// Grouping key used by the aggregation tables.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Int(n) => write!(f, "{}", n),
            Cell::Text(s) => f.write_str(s),
        }
    }
}

/// One row of a [`Relation`].
pub type Row = Vec<Option<Cell>>;

// ── Relation ──────────────────────────────────────────────────────────────────

/// Row-major in-memory table with a fixed, ordered column set.
///
/// Every transformation returns a new relation; nothing here mutates `self`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relation {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Relation {
    /// Create a relation. Rows shorter than the column list are padded with
    /// missing cells; longer rows are truncated.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, None);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Build a relation from string literals. Empty strings are missing.
    pub fn from_text_rows(columns: &[&str], rows: &[&[&str]]) -> Self {
        Self::new(
            columns.iter().map(|c| c.to_string()).collect(),
            rows.iter()
                .map(|row| row.iter().map(|raw| Cell::from_raw(raw)).collect())
                .collect(),
        )
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Option<Cell>]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    /// Position of `name`; the first occurrence wins for duplicate headers.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Like [`column_index`](Self::column_index) but absent columns are a
    /// [`SurveyError::Schema`].
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| SurveyError::missing_column(name))
    }

    /// Iterate over the values of column `name`, missing cells as `None`.
    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = Option<&Cell>> + '_> {
        let idx = self.require_column(name)?;
        Ok(self.rows.iter().map(move |row| row[idx].as_ref()))
    }

    /// Value at (`row`, `col`), `None` when missing or out of range.
    pub fn value(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col)).and_then(|c| c.as_ref())
    }

    /// Keep the rows for which `keep` returns `true`.
    pub fn filter_rows(&self, mut keep: impl FnMut(&[Option<Cell>]) -> bool) -> Relation {
        Relation {
            columns: self.columns.clone(),
            rows: self.rows.iter().filter(|r| keep(r.as_slice())).cloned().collect(),
        }
    }

    /// Attach a column computed per row. An existing column with the same
    /// name is replaced in place, otherwise the column is appended.
    pub fn with_derived(
        &self,
        name: &str,
        mut derive: impl FnMut(&[Option<Cell>]) -> Option<Cell>,
    ) -> Relation {
        let existing = self.column_index(name);
        let mut columns = self.columns.clone();
        if existing.is_none() {
            columns.push(name.to_string());
        }

        let rows = self
            .rows
            .iter()
            .map(|row| {
                let value = derive(row);
                let mut out = row.clone();
                match existing {
                    Some(idx) => out[idx] = value,
                    None => out.push(value),
                }
                out
            })
            .collect();

        Relation { columns, rows }
    }

    /// Remove every column whose name is in `names`. Names not present are
    /// ignored.
    pub fn without_columns(&self, names: &[&str]) -> Relation {
        let keep: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, c)| !names.contains(&c.as_str()))
            .map(|(i, _)| i)
            .collect();
        self.project(&keep)
    }

    /// Project onto `names`, in that order.
    pub fn select_columns(&self, names: &[&str]) -> Result<Relation> {
        let indices = names
            .iter()
            .map(|n| self.require_column(n))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.project(&indices))
    }

    /// Drop rows with a missing value in any of `names`.
    pub fn drop_rows_missing_any(&self, names: &[&str]) -> Result<Relation> {
        let indices = names
            .iter()
            .map(|n| self.require_column(n))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.filter_rows(|row| indices.iter().all(|&i| row[i].is_some())))
    }

    fn project(&self, indices: &[usize]) -> Relation {
        Relation {
            columns: indices.iter().map(|&i| self.columns[i].clone()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        }
    }
}

// ── FrequencyTable ────────────────────────────────────────────────────────────

/// Distinct value → occurrence count, in first-seen order unless re-sorted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrequencyTable {
    counts: IndexMap<String, u64>,
}

impl FrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one more occurrence of `key`.
    pub fn increment(&mut self, key: &str) {
        match self.counts.get_mut(key) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(key.to_string(), 1);
            }
        }
    }

    /// Count for `key`, `0` when never seen.
    pub fn get(&self, key: &str) -> u64 {
        self.counts.get(key).copied().unwrap_or(0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.counts.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all counts.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(|k| k.as_str())
    }

    /// Copy of the table ordered by descending count. The sort is stable, so
    /// equal counts keep their current relative order.
    pub fn sorted_by_count(&self) -> FrequencyTable {
        let mut counts = self.counts.clone();
        counts.sort_by(|_, a, _, b| b.cmp(a));
        FrequencyTable { counts }
    }
}

impl FromIterator<(String, u64)> for FrequencyTable {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}

// ── CrossTab ──────────────────────────────────────────────────────────────────

/// Co-occurrence counts of two categorical fields.
///
/// Row keys come from the first field and column keys from the second, both
/// in first-seen order. The matrix is dense: every (row, column) pair has a
/// count, zero when the combination never occurred.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrossTab {
    row_field: String,
    column_field: String,
    row_keys: IndexSet<String>,
    column_keys: IndexSet<String>,
    counts: Vec<Vec<u64>>,
}

impl CrossTab {
    pub fn new(row_field: impl Into<String>, column_field: impl Into<String>) -> Self {
        Self {
            row_field: row_field.into(),
            column_field: column_field.into(),
            ..Default::default()
        }
    }

    /// Record one co-occurrence of (`row`, `column`).
    pub fn increment(&mut self, row: &str, column: &str) {
        let ri = match self.row_keys.get_index_of(row) {
            Some(i) => i,
            None => {
                self.row_keys.insert(row.to_string());
                self.counts.push(vec![0; self.column_keys.len()]);
                self.row_keys.len() - 1
            }
        };
        let ci = match self.column_keys.get_index_of(column) {
            Some(i) => i,
            None => {
                self.column_keys.insert(column.to_string());
                for counts in &mut self.counts {
                    counts.push(0);
                }
                self.column_keys.len() - 1
            }
        };
        self.counts[ri][ci] += 1;
    }

    /// Count for (`row`, `column`); zero for unknown keys.
    pub fn get(&self, row: &str, column: &str) -> u64 {
        match (
            self.row_keys.get_index_of(row),
            self.column_keys.get_index_of(column),
        ) {
            (Some(ri), Some(ci)) => self.counts[ri][ci],
            _ => 0,
        }
    }

    pub fn row_field(&self) -> &str {
        &self.row_field
    }

    pub fn column_field(&self) -> &str {
        &self.column_field
    }

    pub fn row_keys(&self) -> impl Iterator<Item = &str> {
        self.row_keys.iter().map(|k| k.as_str())
    }

    pub fn column_keys(&self) -> impl Iterator<Item = &str> {
        self.column_keys.iter().map(|k| k.as_str())
    }

    /// Counts for the row at `index`, aligned with [`column_keys`](Self::column_keys).
    pub fn row_counts(&self, index: usize) -> Option<&[u64]> {
        self.counts.get(index).map(|r| r.as_slice())
    }

    pub fn row_total(&self, row: &str) -> u64 {
        self.row_keys
            .get_index_of(row)
            .map(|ri| self.counts[ri].iter().sum())
            .unwrap_or(0)
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.row_keys.is_empty()
    }

    /// The same counts with the two dimensions swapped.
    pub fn transpose(&self) -> CrossTab {
        let counts = (0..self.column_keys.len())
            .map(|ci| self.counts.iter().map(|row| row[ci]).collect())
            .collect();
        CrossTab {
            row_field: self.column_field.clone(),
            column_field: self.row_field.clone(),
            row_keys: self.column_keys.clone(),
            column_keys: self.row_keys.clone(),
            counts,
        }
    }
}

// ── GroupedMean ───────────────────────────────────────────────────────────────

/// Mean and number of contributing members for one group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroupStat {
    pub mean: f64,
    pub count: u64,
}

/// Group key → mean of a numeric measure. Groups with no eligible members
/// are never present.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupedMean {
    groups: IndexMap<String, GroupStat>,
}

impl GroupedMean {
    /// Build from per-group `(sum, count)` accumulators. Entries with a zero
    /// count are skipped.
    pub fn from_sums(sums: impl IntoIterator<Item = (String, (f64, u64))>) -> Self {
        let groups = sums
            .into_iter()
            .filter(|(_, (_, count))| *count > 0)
            .map(|(key, (sum, count))| {
                (
                    key,
                    GroupStat {
                        mean: sum / count as f64,
                        count,
                    },
                )
            })
            .collect();
        Self { groups }
    }

    pub fn get(&self, group: &str) -> Option<GroupStat> {
        self.groups.get(group).copied()
    }

    pub fn mean(&self, group: &str) -> Option<f64> {
        self.get(group).map(|s| s.mean)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, GroupStat)> {
        self.groups.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

// ── Summaries ─────────────────────────────────────────────────────────────────

/// Descriptive summary of a categorical column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSummary {
    /// Display label of the column.
    pub column: String,
    /// Non-missing values.
    pub count: u64,
    /// Distinct non-missing values.
    pub unique: u64,
    /// Most frequent value; first-seen wins on ties.
    pub top: Option<String>,
    /// Occurrences of `top`.
    pub freq: Option<u64>,
}

/// Record counts on each side of a segment split.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCounts {
    pub matching: u64,
    pub non_matching: u64,
    /// Always `matching + non_matching`.
    pub total: u64,
}

impl SegmentCounts {
    pub fn new(matching: u64, non_matching: u64) -> Self {
        Self {
            matching,
            non_matching,
            total: matching + non_matching,
        }
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

/// The result table of a single analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "table", rename_all = "snake_case")]
pub enum ResultTable {
    Segments(SegmentCounts),
    Frequency(FrequencyTable),
    CrossTab(CrossTab),
    GroupedMean(GroupedMean),
    Summary(Vec<ColumnSummary>),
}

/// Whether an analysis produced a table or was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnalysisStatus {
    Completed { result: ResultTable },
    Skipped { reason: String },
}

/// One named entry of the assembled report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    /// Stable identifier, e.g. `"top_countries"`.
    pub name: String,
    /// Human-readable heading.
    pub title: String,
    #[serde(flatten)]
    pub status: AnalysisStatus,
}

impl AnalysisOutcome {
    pub fn table(&self) -> Option<&ResultTable> {
        match &self.status {
            AnalysisStatus::Completed { result } => Some(result),
            AnalysisStatus::Skipped { .. } => None,
        }
    }

    pub fn skip_reason(&self) -> Option<&str> {
        match &self.status {
            AnalysisStatus::Completed { .. } => None,
            AnalysisStatus::Skipped { reason } => Some(reason),
        }
    }
}

/// Metadata produced alongside the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Path of the survey export that was analysed.
    pub source: String,
    /// Rows in the cleaned relation.
    pub rows_loaded: usize,
    pub reference_year: i32,
    pub top_n: usize,
    /// ISO-8601 timestamp when the report was assembled.
    pub generated_at: String,
}

/// Every analysis of one run, in a fixed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub analyses: Vec<AnalysisOutcome>,
}

impl Report {
    pub fn get(&self, name: &str) -> Option<&AnalysisOutcome> {
        self.analyses.iter().find(|a| a.name == name)
    }

    pub fn table(&self, name: &str) -> Option<&ResultTable> {
        self.get(name).and_then(|a| a.table())
    }

    pub fn completed(&self) -> impl Iterator<Item = &AnalysisOutcome> {
        self.analyses.iter().filter(|a| a.table().is_some())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &AnalysisOutcome> {
        self.analyses.iter().filter(|a| a.table().is_none())
    }
}

// ── AnalysisConfig ────────────────────────────────────────────────────────────

/// The two tunables of the aggregation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Year tenure is measured against; fixed so runs are reproducible.
    pub reference_year: i32,
    /// Number of countries kept by the top-N selection.
    pub top_n: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            reference_year: DEFAULT_REFERENCE_YEAR,
            top_n: DEFAULT_TOP_N,
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
