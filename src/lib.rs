//! CourseScout - retrieval-augmented search over a university course catalog
//!
//! Pipeline: scrape the catalog into raw records, normalize them into
//! structured courses, embed each course document into a unit vector and
//! build a flat inner-product index, then serve top-k retrieval and
//! Gemini-composed answers over HTTP.
//!
//! The index and the course metadata are persisted as a pair; row i of
//! the metadata list joins vector i of the index, so both artifacts must
//! always come from the same build.

pub mod errors;
pub mod types;
pub mod config;

pub mod scrape;
pub mod normalize;
pub mod embedding;
pub mod index;
pub mod retrieval;
pub mod answer;
pub mod server;

// Re-export commonly used types
pub use errors::{Result, ScoutError};
pub use types::{CourseRecord, RawCourse, RetrievalResult};
