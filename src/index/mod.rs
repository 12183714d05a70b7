//! Flat inner-product vector index with JSON persistence.
//!
//! Exact brute-force search: scores are inner products, which equal
//! cosine similarity because every stored vector (and every query
//! vector) is unit length. Vectors are stored in insertion order and
//! row i must correspond to row i of the persisted course metadata;
//! the two artifacts are only valid as a pair from a single build.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::embedding::Embedder;
use crate::errors::{Result, ScoutError};
use crate::types::CourseRecord;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseIndex {
    dimension: usize,
    vectors: Vec<Vec<f32>>,
}

impl CourseIndex {
    pub fn new(dimension: usize) -> Self {
        CourseIndex {
            dimension,
            vectors: Vec::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Append a vector, preserving insertion order.
    pub fn add(&mut self, vector: Vec<f32>) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(ScoutError::Index(format!(
                "expected dimension {}, got {}",
                self.dimension,
                vector.len()
            )));
        }
        self.vectors.push(vector);
        Ok(())
    }

    /// Top-k nearest rows by inner product, in descending score order.
    /// Returns fewer than `top_k` pairs when the index is smaller.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<(usize, f32)>> {
        if query.len() != self.dimension {
            return Err(ScoutError::Index(format!(
                "query dimension {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(row, vector)| {
                let score = vector.iter().zip(query).map(|(a, b)| a * b).sum::<f32>();
                (row, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);

        Ok(scored)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let index: CourseIndex = serde_json::from_str(&contents)?;
        if let Some(bad) = index.vectors.iter().find(|v| v.len() != index.dimension) {
            return Err(ScoutError::Index(format!(
                "corrupt index: row of dimension {} in a {}-dimensional index",
                bad.len(),
                index.dimension
            )));
        }
        Ok(index)
    }
}

/// Embed every course document in order and assemble the index.
/// `on_batch` is called with the number of documents completed per batch
/// (drives the CLI progress bar). Any embedding failure aborts the build.
pub fn build_index(
    embedder: &dyn Embedder,
    courses: &[CourseRecord],
    mut on_batch: impl FnMut(usize),
) -> Result<CourseIndex> {
    const BATCH_SIZE: usize = 32;

    let mut index = CourseIndex::new(embedder.dimension());
    for batch in courses.chunks(BATCH_SIZE) {
        let texts: Vec<&str> = batch.iter().map(|c| c.document.as_str()).collect();
        let vectors = embedder.embed_batch(&texts)?;
        if vectors.len() != batch.len() {
            return Err(ScoutError::Embedding(format!(
                "embedder returned {} vectors for {} documents",
                vectors.len(),
                batch.len()
            )));
        }
        for vector in vectors {
            index.add(vector)?;
        }
        on_batch(batch.len());
    }

    Ok(index)
}
