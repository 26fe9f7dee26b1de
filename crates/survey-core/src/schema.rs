//! Exact header strings of the survey export and fixed pipeline constants.
//!
//! Headers are matched by exact string equality; the CSV reader only trims
//! surrounding whitespace.

/// Respondent IP address. Identifying; dropped on load.
pub const IP: &str = "IP";
/// Form submission identifier. Identifying; dropped on load.
pub const SUBMISSION_ID: &str = "Submission ID";

pub const COUNTRY: &str = "What country do you live in?";
pub const STATE: &str = "If United States, please select your state:";
pub const PROFESSION: &str = "Are you a full-time professional papermaker, artist, paper/book conservator, or librarian, or are you engaged in other professions?";
pub const JOIN_DATE: &str = "When did you first join NAHP/FDH/FDHPM?";
pub const AGE: &str = "How would you describe your age:";
pub const EXHIBITIONS: &str = "Have you ever participated in an NAHP exhibition?";
pub const CONFERENCES: &str = "How often do you try to attend NAHP conferences?";
pub const MEMBERSHIP_LEVEL: &str = "What is your current membership level?";
pub const MEMBERSHIP_CHANGE: &str = "Have you upgraded or downgraded your membership?";

/// Columns removed from every loaded relation, wherever they appear.
pub const IDENTIFIER_COLUMNS: [&str; 2] = [IP, SUBMISSION_ID];

/// Columns whose absence makes the whole run fail.
pub const REQUIRED_COLUMNS: [&str; 1] = [COUNTRY];

/// Country value selecting the US segment.
pub const US_COUNTRY: &str = "United States";

/// Name of the derived segment column.
pub const REGION: &str = "region";
pub const REGION_US: &str = "United States";
pub const REGION_REST: &str = "Rest of World";

/// Name of the derived tenure column.
pub const TENURE_YEARS: &str = "tenure_years";

/// Short labels used for the demographics summary, in display order.
pub const DEMOGRAPHIC_LABELS: [(&str, &str); 4] = [
    (JOIN_DATE, "Join_Date"),
    (AGE, "Age"),
    (EXHIBITIONS, "Participate_Exhibitions"),
    (CONFERENCES, "Attend_Conferences"),
];

/// Default reference year for tenure computation.
pub const DEFAULT_REFERENCE_YEAR: i32 = 2024;

/// Default number of countries kept by the top-N selection.
pub const DEFAULT_TOP_N: usize = 5;
