//! CSV loading for the survey export.
//!
//! Reads the delimited export into a [`Relation`], checks that the required
//! headers are present and strips the identifying columns.

use std::borrow::Cow;
use std::io::Read;
use std::path::Path;

use survey_core::error::{Result, SurveyError};
use survey_core::models::{Cell, Relation, Row};
use survey_core::schema::{IDENTIFIER_COLUMNS, REQUIRED_COLUMNS};
use tracing::{debug, warn};

// ── Public API ────────────────────────────────────────────────────────────────

/// Load the survey export at `path` and return the cleaned relation.
///
/// Fails with [`SurveyError::FileRead`] when the file cannot be opened,
/// [`SurveyError::Csv`] when it is not delimited text, and
/// [`SurveyError::Schema`] when a required column is absent. Every data row
/// of the file becomes exactly one row of the result.
pub fn load_survey(path: &Path) -> Result<Relation> {
    let file = std::fs::File::open(path).map_err(|source| SurveyError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let relation = read_survey(std::io::BufReader::new(file))?;
    debug!(
        "Loaded {} rows, {} columns from {}",
        relation.len(),
        relation.columns().len(),
        path.display()
    );
    Ok(relation)
}

/// Same as [`load_survey`] over any byte source.
pub fn read_survey<R: Read>(source: R) -> Result<Relation> {
    let raw = read_relation(source)?;

    for column in REQUIRED_COLUMNS {
        raw.require_column(column)?;
    }

    Ok(raw.without_columns(&IDENTIFIER_COLUMNS))
}

/// Parse delimited text with a header row into a [`Relation`] without any
/// schema checks.
///
/// Rows with a different number of fields than the header are padded or
/// truncated. Bytes that are not valid UTF-8 are replaced rather than
/// rejected so that no row is lost.
pub fn read_relation<R: Read>(source: R) -> Result<Relation> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let mut lossy_fields = 0u64;

    let headers: Vec<String> = reader
        .byte_headers()?
        .iter()
        .map(|h| decode(h, &mut lossy_fields).into_owned())
        .collect();

    let mut rows: Vec<Row> = Vec::new();
    let mut record = csv::ByteRecord::new();
    while reader.read_byte_record(&mut record)? {
        let row: Row = record
            .iter()
            .map(|field| Cell::from_raw(&decode(field, &mut lossy_fields)))
            .collect();
        rows.push(row);
    }

    if lossy_fields > 0 {
        warn!(
            "{} field(s) contained invalid UTF-8 and were decoded lossily",
            lossy_fields
        );
    }

    Ok(Relation::new(headers, rows))
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn decode<'a>(bytes: &'a [u8], lossy_fields: &mut u64) -> Cow<'a, str> {
    let text = String::from_utf8_lossy(bytes);
    if matches!(text, Cow::Owned(_)) {
        *lossy_fields += 1;
    }
    text
}

// ── Tests ─────────────────────────────────────────────────────────────────────
