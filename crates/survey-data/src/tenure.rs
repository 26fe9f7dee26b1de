//! Membership tenure derived from the free-form join-date answer.

use survey_core::dates::JoinDateParser;
use survey_core::error::Result;
use survey_core::models::{Cell, Relation};
use survey_core::schema::TENURE_YEARS;
use tracing::debug;

/// Attach [`TENURE_YEARS`] = `reference_year - join year` to every row.
///
/// Unparsable or missing join dates leave the tenure missing for that row;
/// parsing never fails the call. Join years after `reference_year` give a
/// negative tenure, which is kept as is. The result depends only on
/// `join_date_field`, so deriving twice gives the same column as deriving
/// once.
///
/// Fails only when `join_date_field` is not a column of `relation`.
pub fn derive_tenure(
    relation: &Relation,
    join_date_field: &str,
    reference_year: i32,
) -> Result<Relation> {
    let idx = relation.require_column(join_date_field)?;

    let mut unparsable = 0usize;
    let derived = relation.with_derived(TENURE_YEARS, |row| {
        let cell = row[idx].as_ref()?;
        match tenure_years(&cell.to_string(), reference_year) {
            Some(years) => Some(Cell::Int(years)),
            None => {
                unparsable += 1;
                None
            }
        }
    });

    debug!(
        rows = relation.len(),
        unparsable, reference_year, "derived tenure"
    );
    Ok(derived)
}

/// Tenure for a single join-date answer.
pub fn tenure_years(join_date: &str, reference_year: i32) -> Option<i64> {
    JoinDateParser::year(join_date).map(|year| i64::from(reference_year) - i64::from(year))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
