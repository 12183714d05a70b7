//! Shared record types flowing through the pipeline.

use serde::{Deserialize, Serialize};

/// Raw course entry as scraped from the catalog, before normalization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCourse {
    /// Combined "NUMBER. Title. (N Hours)" text from the catalog table.
    pub text: String,
    /// Absolute URL of the course detail page.
    pub url: String,
    /// Description block text, or the "No description found" sentinel.
    pub description: String,
}

/// One normalized course. Immutable after construction; the position of
/// a record in the persisted metadata list is the join key against the
/// vector index, so the list order must never change independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    /// Short course code such as "DS 5110"; empty when extraction failed.
    pub course_number: String,
    pub title: String,
    /// Credit hours, absent when the "(N Hours)" annotation is missing.
    pub credits: Option<u32>,
    pub url: String,
    pub description: String,
    /// Synthesized text embedded into the index, derived deterministically
    /// from the other fields.
    pub document: String,
}

/// One ranked retrieval hit. Constructed fresh per query, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// 1-based position in the returned list (contiguous even when raw
    /// index rows were skipped).
    pub rank: usize,
    pub course_number: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    /// Inner-product similarity in [-1, 1]; higher is better.
    pub score: f32,
}
