//! Query-time retrieval: embed the question, search the index, join the
//! hits back to course metadata by row position.

use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::embedding::Embedder;
use crate::errors::Result;
use crate::index::CourseIndex;
use crate::types::{CourseRecord, RetrievalResult};

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: CourseIndex,
    courses: Vec<CourseRecord>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: CourseIndex, courses: Vec<CourseRecord>) -> Self {
        if index.len() != courses.len() {
            // Row position is the only join key; a length mismatch means the
            // artifacts came from different builds and results are suspect.
            warn!(
                index_rows = index.len(),
                metadata_rows = courses.len(),
                "index and metadata row counts differ; rebuild both artifacts"
            );
        }
        Retriever {
            embedder,
            index,
            courses,
        }
    }

    /// Load both persisted artifacts from disk.
    pub fn load(
        embedder: Arc<dyn Embedder>,
        index_path: &Path,
        metadata_path: &Path,
    ) -> Result<Self> {
        let index = CourseIndex::load(index_path)?;
        let contents = std::fs::read_to_string(metadata_path)?;
        let courses: Vec<CourseRecord> = serde_json::from_str(&contents)?;
        Ok(Self::new(embedder, index, courses))
    }

    pub fn course_count(&self) -> usize {
        self.courses.len()
    }

    /// Top-k courses for a free-text question, best first. Rows outside
    /// the metadata range are skipped; ranks stay contiguous from 1.
    pub fn search(&self, question: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        let query_vector = self.embedder.embed(question)?;
        let hits = self.index.search(&query_vector, top_k)?;

        let mut results = Vec::with_capacity(hits.len());
        for (row, score) in hits {
            let Some(course) = self.courses.get(row) else {
                continue;
            };
            results.push(RetrievalResult {
                rank: results.len() + 1,
                course_number: Some(course.course_number.clone()),
                title: Some(course.title.clone()),
                description: Some(course.description.clone()),
                url: Some(course.url.clone()),
                score,
            });
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::l2_normalize;
    use crate::errors::ScoutError;

    /// Maps each known phrase onto its own axis; unknown text embeds to
    /// a diagonal so scores stay defined.
    struct AxisEmbedder;

    impl Embedder for AxisEmbedder {
        fn dimension(&self) -> usize {
            3
        }

        fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
            texts
                .iter()
                .map(|t| {
                    let v = match *t {
                        "databases" => vec![1.0, 0.0, 0.0],
                        "statistics" => vec![0.0, 1.0, 0.0],
                        "visualization" => vec![0.0, 0.0, 1.0],
                        _ => vec![1.0, 1.0, 1.0],
                    };
                    Ok(l2_normalize(&v))
                })
                .collect()
        }
    }

    fn course(number: &str, doc: &str) -> CourseRecord {
        CourseRecord {
            course_number: number.to_string(),
            title: format!("{number} title"),
            credits: Some(4),
            url: format!("https://example.edu/{number}"),
            description: format!("{number} description"),
            document: doc.to_string(),
        }
    }

    fn build_retriever(courses: Vec<CourseRecord>) -> Retriever {
        let embedder = Arc::new(AxisEmbedder);
        let index =
            crate::index::build_index(embedder.as_ref(), &courses, |_| {}).expect("build failed");
        Retriever::new(embedder, index, courses)
    }

    #[test]
    fn test_self_similarity_ranks_first() {
        let retriever = build_retriever(vec![
            course("DS 5110", "databases"),
            course("DS 5220", "statistics"),
            course("DS 6390", "visualization"),
        ]);

        let results = retriever.search("statistics", 3).unwrap();
        assert_eq!(results[0].rank, 1);
        assert_eq!(results[0].course_number.as_deref(), Some("DS 5220"));
        assert!((results[0].score - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_ranks_contiguous_and_bounded() {
        let retriever = build_retriever(vec![
            course("A 1", "databases"),
            course("B 2", "statistics"),
            course("C 3", "visualization"),
        ]);

        let results = retriever.search("databases", 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(
            results.iter().map(|r| r.rank).collect::<Vec<_>>(),
            vec![1, 2]
        );
        assert!(results.iter().all(|r| r.score >= -1.0 - 1e-6 && r.score <= 1.0 + 1e-6));
    }

    #[test]
    fn test_out_of_range_rows_skipped_ranks_stay_contiguous() {
        let courses = vec![course("A 1", "databases"), course("B 2", "statistics")];
        let embedder = Arc::new(AxisEmbedder);
        // Index carries one extra vector with no metadata row behind it
        let mut index =
            crate::index::build_index(embedder.as_ref(), &courses, |_| {}).expect("build failed");
        index.add(l2_normalize(&[0.0, 0.0, 1.0])).unwrap();
        let retriever = Retriever::new(embedder, index, courses);

        let results = retriever.search("visualization", 3).unwrap();
        // The orphan row scored highest but has no metadata; it is dropped
        assert_eq!(results.len(), 2);
        assert_eq!(
            results.iter().map(|r| r.rank).collect::<Vec<_>>(),
            vec![1, 2]
        );
    }

    #[test]
    fn test_embedder_failure_propagates() {
        struct FailingEmbedder;
        impl Embedder for FailingEmbedder {
            fn dimension(&self) -> usize {
                3
            }
            fn embed_batch(&self, _texts: &[&str]) -> Result<Vec<Vec<f32>>> {
                Err(ScoutError::Embedding("backend unavailable".to_string()))
            }
        }

        let retriever = Retriever::new(
            Arc::new(FailingEmbedder),
            crate::index::CourseIndex::new(3),
            Vec::new(),
        );
        assert!(retriever.search("anything", 5).is_err());
    }
}
