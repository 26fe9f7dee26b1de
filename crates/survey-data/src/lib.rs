//! Aggregation pipeline for the survey dashboard.
//!
//! Loads the survey export into a cleaned [`Relation`](survey_core::models::Relation),
//! splits it by country, derives membership tenure, computes frequency,
//! cross-tabulation and grouped-mean tables, and assembles them into a
//! [`Report`](survey_core::models::Report) for the presentation layer.

pub mod aggregator;
pub mod analysis;
pub mod cache;
pub mod reader;
pub mod segmenter;
pub mod tenure;
