//! Report assembly for the survey dashboard.
//!
//! Loads the export once, then runs every named analysis against the same
//! read-only relation. Analyses are independent: one that fails (typically
//! because an optional column is absent from this export) is recorded as
//! skipped with its reason and the rest of the report is still produced.

use std::path::Path;

use chrono::Utc;
use survey_core::error::Result;
use survey_core::models::{
    AnalysisConfig, AnalysisOutcome, AnalysisStatus, FrequencyTable, Relation, Report,
    ReportMetadata, ResultTable,
};
use survey_core::schema::{
    AGE, CONFERENCES, COUNTRY, DEMOGRAPHIC_LABELS, EXHIBITIONS, JOIN_DATE, MEMBERSHIP_CHANGE,
    MEMBERSHIP_LEVEL, PROFESSION, REGION, REGION_REST, REGION_US, STATE, TENURE_YEARS, US_COUNTRY,
};
use tracing::{info, warn};

use crate::aggregator::Aggregator;
use crate::cache::LoadCache;
use crate::reader::load_survey;
use crate::segmenter::{label_segments, segment, segment_counts};
use crate::tenure::derive_tenure;

// ── Analysis catalogue ────────────────────────────────────────────────────────

type AnalysisFn = fn(&Relation, &AnalysisConfig) -> Result<ResultTable>;

struct Analysis {
    name: &'static str,
    title: &'static str,
    run: AnalysisFn,
}

/// Every analysis of a report, in output order.
const ANALYSES: &[Analysis] = &[
    Analysis {
        name: "segment_counts",
        title: "Respondents: United States vs. rest of world",
        run: run_segment_counts,
    },
    Analysis {
        name: "top_countries",
        title: "Top countries represented",
        run: run_top_countries,
    },
    Analysis {
        name: "profession_by_country",
        title: "Respondents by profession in the top countries",
        run: run_profession_by_country,
    },
    Analysis {
        name: "demographics_summary",
        title: "Demographics summary",
        run: run_demographics_summary,
    },
    Analysis {
        name: "exhibition_participation",
        title: "Participation in NAHP exhibitions",
        run: run_exhibition_participation,
    },
    Analysis {
        name: "conference_attendance",
        title: "Attendance at NAHP conferences",
        run: run_conference_attendance,
    },
    Analysis {
        name: "us_state_distribution",
        title: "Respondents by state (United States)",
        run: run_us_state_distribution,
    },
    Analysis {
        name: "membership_by_region",
        title: "Membership level by region",
        run: run_membership_by_region,
    },
    Analysis {
        name: "membership_change_by_level",
        title: "Membership upgrades and downgrades by level",
        run: run_membership_change_by_level,
    },
    Analysis {
        name: "tenure_by_membership_level",
        title: "Mean membership tenure (years) by level",
        run: run_tenure_by_membership_level,
    },
    Analysis {
        name: "tenure_by_region",
        title: "Mean membership tenure (years) by region",
        run: run_tenure_by_region,
    },
];

/// Names of every analysis, in report order.
pub fn analysis_names() -> impl Iterator<Item = &'static str> {
    ANALYSES.iter().map(|a| a.name)
}

// ── ReportAssembler ───────────────────────────────────────────────────────────

/// Runs the fixed analysis catalogue over one survey export.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportAssembler {
    config: AnalysisConfig,
}

impl ReportAssembler {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Load `path` and run every analysis.
    ///
    /// Load errors are fatal and produce no report. Per-analysis errors are
    /// captured in the report.
    pub fn assemble(&self, path: &Path) -> Result<Report> {
        let relation = load_survey(path)?;
        Ok(self.assemble_relation(&relation, &path.display().to_string()))
    }

    /// Same as [`assemble`](Self::assemble), reusing `cache` for the load.
    pub fn assemble_with_cache(&self, cache: &mut LoadCache, path: &Path) -> Result<Report> {
        let relation = cache.get_or_load(path)?;
        Ok(self.assemble_relation(&relation, &path.display().to_string()))
    }

    /// Run every analysis over an already-loaded relation.
    pub fn assemble_relation(&self, relation: &Relation, source: &str) -> Report {
        info!(
            source,
            rows = relation.len(),
            reference_year = self.config.reference_year,
            top_n = self.config.top_n,
            "assembling report"
        );

        let analyses: Vec<AnalysisOutcome> = ANALYSES
            .iter()
            .map(|analysis| {
                let status = match (analysis.run)(relation, &self.config) {
                    Ok(result) => AnalysisStatus::Completed { result },
                    Err(e) => {
                        warn!(analysis = analysis.name, error = %e, "analysis skipped");
                        AnalysisStatus::Skipped {
                            reason: e.to_string(),
                        }
                    }
                };
                AnalysisOutcome {
                    name: analysis.name.to_string(),
                    title: analysis.title.to_string(),
                    status,
                }
            })
            .collect();

        let report = Report {
            metadata: ReportMetadata {
                source: source.to_string(),
                rows_loaded: relation.len(),
                reference_year: self.config.reference_year,
                top_n: self.config.top_n,
                generated_at: Utc::now().to_rfc3339(),
            },
            analyses,
        };

        info!(
            completed = report.completed().count(),
            skipped = report.skipped().count(),
            "report assembled"
        );
        report
    }
}

// ── Shared derivations ────────────────────────────────────────────────────────

fn top_countries(relation: &Relation, config: &AnalysisConfig) -> Result<FrequencyTable> {
    let counts = Aggregator::value_counts(relation, COUNTRY)?;
    Ok(Aggregator::top_n(&counts, config.top_n))
}

/// The four demographic columns, keeping rows that answered age, exhibition
/// and conference questions. The join date may still be missing.
fn demographics(relation: &Relation) -> Result<Relation> {
    let columns: Vec<&str> = DEMOGRAPHIC_LABELS.iter().map(|(c, _)| *c).collect();
    relation
        .select_columns(&columns)?
        .drop_rows_missing_any(&[AGE, EXHIBITIONS, CONFERENCES])
}

fn with_region(relation: &Relation) -> Result<Relation> {
    label_segments(relation, COUNTRY, US_COUNTRY, REGION, REGION_US, REGION_REST)
}

// ── Analyses ──────────────────────────────────────────────────────────────────

fn run_segment_counts(relation: &Relation, _: &AnalysisConfig) -> Result<ResultTable> {
    let counts = segment_counts(relation, COUNTRY, US_COUNTRY)?;
    Ok(ResultTable::Segments(counts))
}

fn run_top_countries(relation: &Relation, config: &AnalysisConfig) -> Result<ResultTable> {
    Ok(ResultTable::Frequency(top_countries(relation, config)?))
}

fn run_profession_by_country(relation: &Relation, config: &AnalysisConfig) -> Result<ResultTable> {
    relation.require_column(PROFESSION)?;
    let top = top_countries(relation, config)?;
    let country = relation.require_column(COUNTRY)?;
    let in_top = relation.filter_rows(|row| {
        row[country]
            .as_ref()
            .is_some_and(|c| top.contains(&c.key()))
    });
    Ok(ResultTable::CrossTab(Aggregator::cross_tab(
        &in_top, COUNTRY, PROFESSION,
    )?))
}

fn run_demographics_summary(relation: &Relation, _: &AnalysisConfig) -> Result<ResultTable> {
    let demo = demographics(relation)?;
    let summaries = DEMOGRAPHIC_LABELS
        .iter()
        .map(|(column, label)| Aggregator::describe(&demo, column, label))
        .collect::<Result<Vec<_>>>()?;
    Ok(ResultTable::Summary(summaries))
}

fn run_exhibition_participation(relation: &Relation, _: &AnalysisConfig) -> Result<ResultTable> {
    let demo = demographics(relation)?;
    let counts = Aggregator::value_counts(&demo, EXHIBITIONS)?;
    Ok(ResultTable::Frequency(counts.sorted_by_count()))
}

fn run_conference_attendance(relation: &Relation, _: &AnalysisConfig) -> Result<ResultTable> {
    let demo = demographics(relation)?;
    let counts = Aggregator::value_counts(&demo, CONFERENCES)?;
    Ok(ResultTable::Frequency(counts.sorted_by_count()))
}

/// States are counted over the US segment only. A state answered by a
/// respondent outside the United States is not counted.
fn run_us_state_distribution(relation: &Relation, _: &AnalysisConfig) -> Result<ResultTable> {
    relation.require_column(STATE)?;
    let (us, _) = segment(relation, COUNTRY, US_COUNTRY)?;
    let counts = Aggregator::value_counts(&us, STATE)?;
    Ok(ResultTable::Frequency(counts.sorted_by_count()))
}

fn run_membership_by_region(relation: &Relation, _: &AnalysisConfig) -> Result<ResultTable> {
    relation.require_column(MEMBERSHIP_LEVEL)?;
    let labelled = with_region(relation)?;
    Ok(ResultTable::CrossTab(Aggregator::cross_tab(
        &labelled,
        REGION,
        MEMBERSHIP_LEVEL,
    )?))
}

fn run_membership_change_by_level(relation: &Relation, _: &AnalysisConfig) -> Result<ResultTable> {
    Ok(ResultTable::CrossTab(Aggregator::cross_tab(
        relation,
        MEMBERSHIP_LEVEL,
        MEMBERSHIP_CHANGE,
    )?))
}

fn run_tenure_by_membership_level(
    relation: &Relation,
    config: &AnalysisConfig,
) -> Result<ResultTable> {
    relation.require_column(MEMBERSHIP_LEVEL)?;
    let derived = derive_tenure(relation, JOIN_DATE, config.reference_year)?;
    Ok(ResultTable::GroupedMean(Aggregator::grouped_mean(
        &derived,
        MEMBERSHIP_LEVEL,
        TENURE_YEARS,
    )?))
}

fn run_tenure_by_region(relation: &Relation, config: &AnalysisConfig) -> Result<ResultTable> {
    let derived = derive_tenure(relation, JOIN_DATE, config.reference_year)?;
    let labelled = with_region(&derived)?;
    Ok(ResultTable::GroupedMean(Aggregator::grouped_mean(
        &labelled,
        REGION,
        TENURE_YEARS,
    )?))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use survey_core::error::SurveyError;
    use survey_core::models::Cell;
    use survey_core::schema::{IP, SUBMISSION_ID};
    use tempfile::TempDir;

    const HEADERS: [&str; 11] = [
        IP,
        SUBMISSION_ID,
        COUNTRY,
        STATE,
        PROFESSION,
        JOIN_DATE,
        AGE,
        EXHIBITIONS,
        CONFERENCES,
        MEMBERSHIP_LEVEL,
        MEMBERSHIP_CHANGE,
    ];

    const ROWS: [[&str; 11]; 6] = [
        ["1.1.1.1", "101", "United States", "Ohio", "Artist", "2015-01-01", "40-49", "Yes", "Every year", "Patron", "Upgraded"],
        ["1.1.1.2", "102", "United States", "Iowa", "Librarian", "not-a-date", "50-59", "No", "Never", "Basic", ""],
        ["1.1.1.3", "103", "France", "", "Artist", "2020-06-01", "30-39", "Yes", "Sometimes", "Basic", "Downgraded"],
        ["1.1.1.4", "104", "United States", "Ohio", "Conservator", "2010", "", "Yes", "Never", "Patron", "No change"],
        ["1.1.1.5", "105", "France", "", "Librarian", "2018-03-15", "60+", "No", "Never", "Basic", "No change"],
        ["1.1.1.6", "106", "Japan", "", "Artist", "", "40-49", "Yes", "Sometimes", "", ""],
    ];

    fn csv_body(headers: &[&str], rows: &[Vec<&str>]) -> String {
        let quote = |s: &&str| format!("\"{}\"", s);
        let mut body = headers.iter().map(quote).collect::<Vec<_>>().join(",");
        body.push('\n');
        for row in rows {
            body.push_str(&row.iter().map(quote).collect::<Vec<_>>().join(","));
            body.push('\n');
        }
        body
    }

    fn full_rows() -> Vec<Vec<&'static str>> {
        ROWS.iter().map(|r| r.to_vec()).collect()
    }

    fn write_survey(dir: &Path, headers: &[&str], rows: &[Vec<&str>]) -> std::path::PathBuf {
        let path = dir.join("survey_data.csv");
        std::fs::write(&path, csv_body(headers, rows)).unwrap();
        path
    }

    /// Write the fixture without the column `drop`.
    fn write_survey_without(dir: &Path, drop: &str) -> std::path::PathBuf {
        let keep: Vec<usize> = (0..HEADERS.len()).filter(|&i| HEADERS[i] != drop).collect();
        let headers: Vec<&str> = keep.iter().map(|&i| HEADERS[i]).collect();
        let rows: Vec<Vec<&str>> = ROWS
            .iter()
            .map(|r| keep.iter().map(|&i| r[i]).collect())
            .collect();
        write_survey(dir, &headers, &rows)
    }

    fn assemble(path: &Path) -> Report {
        ReportAssembler::new(AnalysisConfig {
            reference_year: 2024,
            top_n: 2,
        })
        .assemble(path)
        .unwrap()
    }

    // ── assemble ──────────────────────────────────────────────────────────────

    #[test]
    fn test_full_report_every_analysis_completes() {
        let dir = TempDir::new().unwrap();
        let report = assemble(&write_survey(dir.path(), &HEADERS, &full_rows()));

        assert_eq!(report.analyses.len(), ANALYSES.len());
        assert_eq!(report.skipped().count(), 0);
        assert_eq!(report.metadata.rows_loaded, 6);
        assert_eq!(report.metadata.top_n, 2);
        let names: Vec<_> = report.analyses.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, analysis_names().collect::<Vec<_>>());
    }

    #[test]
    fn test_segment_counts() {
        let dir = TempDir::new().unwrap();
        let report = assemble(&write_survey(dir.path(), &HEADERS, &full_rows()));
        let Some(ResultTable::Segments(counts)) = report.table("segment_counts") else {
            panic!("segment_counts missing");
        };
        assert_eq!(counts.matching, 3);
        assert_eq!(counts.non_matching, 3);
        assert_eq!(counts.total, 6);
    }

    #[test]
    fn test_top_countries_and_profession_breakdown() {
        let dir = TempDir::new().unwrap();
        let report = assemble(&write_survey(dir.path(), &HEADERS, &full_rows()));

        let Some(ResultTable::Frequency(top)) = report.table("top_countries") else {
            panic!("top_countries missing");
        };
        assert_eq!(top.keys().collect::<Vec<_>>(), vec!["United States", "France"]);

        let Some(ResultTable::CrossTab(tab)) = report.table("profession_by_country") else {
            panic!("profession_by_country missing");
        };
        assert_eq!(
            tab.row_keys().collect::<Vec<_>>(),
            vec!["United States", "France"]
        );
        assert_eq!(tab.get("United States", "Artist"), 1);
        assert_eq!(tab.get("France", "Conservator"), 0);
        assert_eq!(tab.get("Japan", "Artist"), 0);
        assert_eq!(tab.total(), 5);
    }

    #[test]
    fn test_demographics_drop_incomplete_rows() {
        let dir = TempDir::new().unwrap();
        let report = assemble(&write_survey(dir.path(), &HEADERS, &full_rows()));

        let Some(ResultTable::Summary(summaries)) = report.table("demographics_summary") else {
            panic!("demographics_summary missing");
        };
        let labels: Vec<_> = summaries.iter().map(|s| s.column.as_str()).collect();
        assert_eq!(
            labels,
            vec!["Join_Date", "Age", "Participate_Exhibitions", "Attend_Conferences"]
        );
        // Row 4 has no age and is dropped; row 6 keeps its missing join date.
        assert_eq!(summaries[1].count, 5);
        assert_eq!(summaries[0].count, 4);
        assert_eq!(summaries[1].top.as_deref(), Some("40-49"));

        let Some(ResultTable::Frequency(exh)) = report.table("exhibition_participation") else {
            panic!("exhibition_participation missing");
        };
        assert_eq!(exh.get("Yes"), 3);
        assert_eq!(exh.get("No"), 2);

        let Some(ResultTable::Frequency(conf)) = report.table("conference_attendance") else {
            panic!("conference_attendance missing");
        };
        assert_eq!(conf.keys().next(), Some("Never"));
        assert_eq!(conf.total(), 5);
    }

    #[test]
    fn test_us_state_distribution_only_us_rows() {
        let dir = TempDir::new().unwrap();
        let mut rows = full_rows();
        // A non-US respondent who answered the state question anyway.
        rows[2][3] = "Ohio";
        let report = assemble(&write_survey(dir.path(), &HEADERS, &rows));

        let Some(ResultTable::Frequency(states)) = report.table("us_state_distribution") else {
            panic!("us_state_distribution missing");
        };
        assert_eq!(states.get("Ohio"), 2);
        assert_eq!(states.get("Iowa"), 1);
        assert_eq!(states.keys().next(), Some("Ohio"));
    }

    #[test]
    fn test_membership_tables() {
        let dir = TempDir::new().unwrap();
        let report = assemble(&write_survey(dir.path(), &HEADERS, &full_rows()));

        let Some(ResultTable::CrossTab(by_region)) = report.table("membership_by_region") else {
            panic!("membership_by_region missing");
        };
        assert_eq!(by_region.get(REGION_US, "Patron"), 2);
        assert_eq!(by_region.get(REGION_US, "Basic"), 1);
        assert_eq!(by_region.get(REGION_REST, "Basic"), 2);
        assert_eq!(by_region.get(REGION_REST, "Patron"), 0);

        let Some(ResultTable::CrossTab(changes)) = report.table("membership_change_by_level")
        else {
            panic!("membership_change_by_level missing");
        };
        assert_eq!(changes.get("Patron", "Upgraded"), 1);
        assert_eq!(changes.get("Basic", "No change"), 1);
        assert_eq!(changes.total(), 4);
    }

    #[test]
    fn test_tenure_tables() {
        let dir = TempDir::new().unwrap();
        let report = assemble(&write_survey(dir.path(), &HEADERS, &full_rows()));

        let Some(ResultTable::GroupedMean(by_level)) = report.table("tenure_by_membership_level")
        else {
            panic!("tenure_by_membership_level missing");
        };
        // Patron: 9 and 14. Basic: unparsable, 4 and 6.
        assert_eq!(by_level.mean("Patron"), Some(11.5));
        assert_eq!(by_level.mean("Basic"), Some(5.0));
        assert_eq!(by_level.get("Basic").unwrap().count, 2);

        let Some(ResultTable::GroupedMean(by_region)) = report.table("tenure_by_region") else {
            panic!("tenure_by_region missing");
        };
        assert_eq!(by_region.mean(REGION_US), Some(11.5));
        assert_eq!(by_region.mean(REGION_REST), Some(5.0));
    }

    // ── partial failure ───────────────────────────────────────────────────────

    #[test]
    fn test_missing_optional_column_skips_only_dependent_analyses() {
        let dir = TempDir::new().unwrap();
        let report = assemble(&write_survey_without(dir.path(), MEMBERSHIP_LEVEL));

        let skipped: Vec<_> = report.skipped().map(|a| a.name.as_str()).collect();
        assert_eq!(
            skipped,
            vec![
                "membership_by_region",
                "membership_change_by_level",
                "tenure_by_membership_level"
            ]
        );
        assert!(report
            .get("membership_by_region")
            .and_then(|a| a.skip_reason())
            .unwrap()
            .contains(MEMBERSHIP_LEVEL));
        assert!(report.table("tenure_by_region").is_some());
        assert!(report.table("top_countries").is_some());
    }

    #[test]
    fn test_missing_state_column_skips_state_distribution() {
        let dir = TempDir::new().unwrap();
        let report = assemble(&write_survey_without(dir.path(), STATE));
        let skipped: Vec<_> = report.skipped().map(|a| a.name.as_str()).collect();
        assert_eq!(skipped, vec!["us_state_distribution"]);
    }

    #[test]
    fn test_missing_age_column_skips_demographics() {
        let dir = TempDir::new().unwrap();
        let report = assemble(&write_survey_without(dir.path(), AGE));
        let skipped: Vec<_> = report.skipped().map(|a| a.name.as_str()).collect();
        assert_eq!(
            skipped,
            vec![
                "demographics_summary",
                "exhibition_participation",
                "conference_attendance"
            ]
        );
    }

    #[test]
    fn test_missing_country_column_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = write_survey_without(dir.path(), COUNTRY);
        let err = ReportAssembler::default().assemble(&path).unwrap_err();
        assert!(matches!(err, SurveyError::Schema { ref column } if column == COUNTRY));
    }

    #[test]
    fn test_unreadable_file_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = ReportAssembler::default()
            .assemble(&dir.path().join("absent.csv"))
            .unwrap_err();
        assert!(matches!(err, SurveyError::FileRead { .. }));
    }

    // ── relation is read-only ─────────────────────────────────────────────────

    #[test]
    fn test_assemble_relation_leaves_input_untouched() {
        let relation = Relation::from_text_rows(
            &[COUNTRY, JOIN_DATE, MEMBERSHIP_LEVEL],
            &[&["United States", "2015", "Basic"], &["France", "", "Patron"]],
        );
        let before = relation.clone();
        let report = ReportAssembler::default().assemble_relation(&relation, "inline");

        assert_eq!(relation, before);
        assert!(!relation.has_column(TENURE_YEARS));
        assert_eq!(report.metadata.source, "inline");
        assert!(report.table("tenure_by_membership_level").is_some());
    }

    #[test]
    fn test_assemble_with_cache_reuses_load() {
        let dir = TempDir::new().unwrap();
        let path = write_survey(dir.path(), &HEADERS, &full_rows());
        let assembler = ReportAssembler::default();
        let mut cache = LoadCache::new();

        let first = assembler.assemble_with_cache(&mut cache, &path).unwrap();
        let second = assembler.assemble_with_cache(&mut cache, &path).unwrap();

        assert_eq!(cache.hits(), 1);
        assert_eq!(first.analyses, second.analyses);
    }

    #[test]
    fn test_tenure_values_are_integers_in_derived_relation() {
        let relation = Relation::from_text_rows(&[JOIN_DATE], &[&["2015-01-01"]]);
        let derived = derive_tenure(&relation, JOIN_DATE, 2024).unwrap();
        assert_eq!(
            derived.column(TENURE_YEARS).unwrap().next(),
            Some(Some(&Cell::Int(9)))
        );
    }
}
