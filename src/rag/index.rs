//! Flat (exhaustive) similarity index and its on-disk snapshot.
//!
//! The index scans every stored vector on each query and scores by squared
//! Euclidean distance, nearest first. Rebuilds are wholesale; there is no
//! incremental add or remove.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::ingest::Chunk;
use crate::core::errors::RagError;

/// Brute-force nearest-neighbour index over fixed-length f32 vectors.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dimension: usize,
    vectors: Vec<f32>,
}

impl FlatIndex {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: Vec::new(),
        }
    }

    /// Builds an index from one row per chunk. All rows must share a length.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self, RagError> {
        let dimension = rows
            .first()
            .map(|row| row.len())
            .ok_or(RagError::EmptyStore)?;

        let mut index = FlatIndex::new(dimension);
        for row in rows {
            index.add(row)?;
        }
        Ok(index)
    }

    pub fn add(&mut self, vector: &[f32]) -> Result<(), RagError> {
        if vector.len() != self.dimension {
            return Err(RagError::Retrieval(format!(
                "vector length {} does not match index dimension {}",
                vector.len(),
                self.dimension
            )));
        }
        self.vectors.extend_from_slice(vector);
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed vectors.
    pub fn ntotal(&self) -> usize {
        if self.dimension == 0 {
            0
        } else {
            self.vectors.len() / self.dimension
        }
    }

    /// k-nearest-neighbour search by squared Euclidean distance.
    ///
    /// Returns `(position, distance)` pairs sorted ascending by distance;
    /// positions are the insertion order, which is the sole key back into the
    /// document store.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>, RagError> {
        if query.len() != self.dimension {
            return Err(RagError::Retrieval(format!(
                "query length {} does not match index dimension {}",
                query.len(),
                self.dimension
            )));
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(pos, row)| {
                let dist = row
                    .iter()
                    .zip(query)
                    .map(|(a, b)| (a - b) * (a - b))
                    .sum::<f32>();
                (pos, dist)
            })
            .collect();

        scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }
}

#[derive(Serialize, Deserialize)]
struct IndexFile {
    dimension: usize,
    ntotal: usize,
    vectors: Vec<f32>,
}

#[derive(Serialize, Deserialize)]
struct EmbeddingsFile {
    rows: Vec<Vec<f32>>,
}

/// The three co-located snapshot artifacts. All must be present and mutually
/// consistent for a load to succeed; anything else is treated as corrupt and
/// forces a full rebuild.
pub struct Snapshot {
    index_path: PathBuf,
    chunks_path: PathBuf,
    embeddings_path: PathBuf,
}

impl Snapshot {
    pub fn new(dir: &Path) -> Self {
        Self {
            index_path: dir.join("flat.index.json"),
            chunks_path: dir.join("chunks.json"),
            embeddings_path: dir.join("embeddings.json"),
        }
    }

    pub fn exists(&self) -> bool {
        self.index_path.exists() && self.chunks_path.exists() && self.embeddings_path.exists()
    }

    pub fn save(
        &self,
        index: &FlatIndex,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<(), RagError> {
        if let Some(parent) = self.index_path.parent() {
            fs::create_dir_all(parent).map_err(|e| RagError::Snapshot(e.to_string()))?;
        }

        let index_file = IndexFile {
            dimension: index.dimension,
            ntotal: index.ntotal(),
            vectors: index.vectors.clone(),
        };
        write_json(&self.index_path, &index_file)?;
        write_json(&self.chunks_path, &chunks)?;
        write_json(
            &self.embeddings_path,
            &EmbeddingsFile {
                rows: embeddings.to_vec(),
            },
        )?;
        Ok(())
    }

    /// Loads all three artifacts and cross-checks them: equal row counts and
    /// a uniform dimension. Any missing file or mismatch is `RagError::Snapshot`.
    pub fn load(&self) -> Result<(FlatIndex, Vec<Chunk>, Vec<Vec<f32>>), RagError> {
        if !self.exists() {
            return Err(RagError::Snapshot(
                "one or more snapshot files are missing".to_string(),
            ));
        }

        let index_file: IndexFile = read_json(&self.index_path)?;
        let chunks: Vec<Chunk> = read_json(&self.chunks_path)?;
        let embeddings: EmbeddingsFile = read_json(&self.embeddings_path)?;

        let expected_len = index_file
            .ntotal
            .checked_mul(index_file.dimension)
            .unwrap_or(usize::MAX);
        if index_file.vectors.len() != expected_len {
            return Err(RagError::Snapshot(
                "index vector data does not match its header".to_string(),
            ));
        }
        if chunks.len() != index_file.ntotal || embeddings.rows.len() != index_file.ntotal {
            return Err(RagError::Snapshot(format!(
                "row count mismatch: index={}, chunks={}, embeddings={}",
                index_file.ntotal,
                chunks.len(),
                embeddings.rows.len()
            )));
        }
        if embeddings
            .rows
            .iter()
            .any(|row| row.len() != index_file.dimension)
        {
            return Err(RagError::Snapshot(
                "embedding row dimension mismatch".to_string(),
            ));
        }

        let index = FlatIndex {
            dimension: index_file.dimension,
            vectors: index_file.vectors,
        };
        Ok((index, chunks, embeddings.rows))
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), RagError> {
    let raw = serde_json::to_vec(value).map_err(|e| RagError::Snapshot(e.to_string()))?;
    fs::write(path, raw).map_err(|e| RagError::Snapshot(e.to_string()))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, RagError> {
    let raw = fs::read(path).map_err(|e| RagError::Snapshot(e.to_string()))?;
    serde_json::from_slice(&raw).map_err(|e| RagError::Snapshot(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> Vec<Vec<f32>> {
        vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.6, 0.8, 0.0],
        ]
    }

    #[test]
    fn search_returns_nearest_first() {
        let index = FlatIndex::from_rows(&sample_rows()).unwrap();
        let hits = index.search(&[1.0, 0.0, 0.0], 3).unwrap();

        assert_eq!(hits.len(), 3);
        assert_eq!(hits[0].0, 0);
        assert!(hits[0].1 < 1e-6);
        // Distances ascend
        assert!(hits[0].1 <= hits[1].1 && hits[1].1 <= hits[2].1);
    }

    #[test]
    fn search_respects_k() {
        let index = FlatIndex::from_rows(&sample_rows()).unwrap();
        assert_eq!(index.search(&[1.0, 0.0, 0.0], 2).unwrap().len(), 2);
        assert!(index.search(&[1.0, 0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let index = FlatIndex::from_rows(&sample_rows()).unwrap();
        assert!(index.search(&[1.0, 0.0], 1).is_err());

        let mut index = FlatIndex::new(3);
        assert!(index.add(&[1.0]).is_err());
    }

    #[test]
    fn empty_rows_report_empty_store() {
        assert!(matches!(
            FlatIndex::from_rows(&[]),
            Err(RagError::EmptyStore)
        ));
    }

    #[test]
    fn snapshot_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::new(tmp.path());

        let rows = sample_rows();
        let index = FlatIndex::from_rows(&rows).unwrap();
        let chunks = vec![
            Chunk { text: "a".into() },
            Chunk { text: "b".into() },
            Chunk { text: "c".into() },
        ];

        snapshot.save(&index, &chunks, &rows).unwrap();
        let (loaded_index, loaded_chunks, loaded_rows) = snapshot.load().unwrap();

        assert_eq!(loaded_index, index);
        assert_eq!(loaded_chunks, chunks);
        assert_eq!(loaded_rows, rows);
    }

    #[test]
    fn partial_snapshot_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::new(tmp.path());

        let rows = sample_rows();
        let index = FlatIndex::from_rows(&rows).unwrap();
        let chunks = vec![
            Chunk { text: "a".into() },
            Chunk { text: "b".into() },
            Chunk { text: "c".into() },
        ];
        snapshot.save(&index, &chunks, &rows).unwrap();

        std::fs::remove_file(tmp.path().join("embeddings.json")).unwrap();
        assert!(matches!(snapshot.load(), Err(RagError::Snapshot(_))));
    }

    #[test]
    fn inconsistent_snapshot_is_corrupt() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = Snapshot::new(tmp.path());

        let rows = sample_rows();
        let index = FlatIndex::from_rows(&rows).unwrap();
        let chunks = vec![
            Chunk { text: "a".into() },
            Chunk { text: "b".into() },
            Chunk { text: "c".into() },
        ];
        snapshot.save(&index, &chunks, &rows).unwrap();

        // Rewrite the chunk list with a different row count
        std::fs::write(tmp.path().join("chunks.json"), "[{\"text\":\"a\"}]").unwrap();
        assert!(matches!(snapshot.load(), Err(RagError::Snapshot(_))));
    }
}
