//! Durable per-document vector index.
//!
//! Each uploaded document owns a collection of chunk embeddings, keyed by
//! document id in the `chunk_vectors` table. Re-processing a file replaces
//! the collection wholesale: delete-then-insert inside one transaction, so a
//! caller never observes a merge of stale and fresh chunks. Writers for the
//! same document id are serialized through a per-id mutex.

use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use tokio::sync::Mutex;

use crate::error::{ChatError, Result};
use crate::models::{Chunk, RetrievedChunk};

/// Shown when a query arrives for a document that was never indexed.
pub const INDEX_NOT_FOUND: &str =
    "No index available for this file. Please process the file first.";

/// Handle to one document's live index.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    pub document_id: String,
    pub chunk_count: i64,
}

pub struct IndexStore {
    pool: SqlitePool,
    // One lock per document id; guards the delete+insert window.
    writers: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IndexStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            writers: StdMutex::new(HashMap::new()),
        }
    }

    fn writer_lock(&self, document_id: &str) -> Arc<Mutex<()>> {
        let mut writers = self.writers.lock().expect("writer map poisoned");
        writers
            .entry(document_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Replace any existing index for `document_id` with a fresh one built
    /// from `chunks` and their embeddings.
    pub async fn create_or_replace(
        &self,
        document_id: &str,
        chunks: &[Chunk],
        embeddings: &[Vec<f32>],
    ) -> Result<IndexHandle> {
        if chunks.len() != embeddings.len() {
            return Err(ChatError::Internal(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let lock = self.writer_lock(document_id);
        let _guard = lock.lock().await;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunk_vectors WHERE document_id = ?")
            .bind(document_id)
            .execute(&mut *tx)
            .await?;

        for (chunk, vector) in chunks.iter().zip(embeddings.iter()) {
            sqlx::query(
                r#"
                INSERT INTO chunk_vectors (chunk_id, document_id, chunk_index, text, hash, embedding)
                VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(&chunk.id)
            .bind(document_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.text)
            .bind(&chunk.hash)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        Ok(IndexHandle {
            document_id: document_id.to_string(),
            chunk_count: chunks.len() as i64,
        })
    }

    /// Look up the live index for `document_id`.
    ///
    /// Missing index is a user-facing condition, not an internal error: the
    /// file has to be processed before it can be queried.
    pub async fn get(&self, document_id: &str) -> Result<IndexHandle> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM chunk_vectors WHERE document_id = ?")
                .bind(document_id)
                .fetch_one(&self.pool)
                .await?;

        if count == 0 {
            return Err(ChatError::NotFound(INDEX_NOT_FOUND.to_string()));
        }

        Ok(IndexHandle {
            document_id: document_id.to_string(),
            chunk_count: count,
        })
    }

    /// Similarity search over one document's chunks: cosine similarity
    /// against `query_vector`, descending, truncated to `top_k`.
    pub async fn search(
        &self,
        document_id: &str,
        query_vector: &[f32],
        top_k: usize,
    ) -> Result<Vec<RetrievedChunk>> {
        let rows = sqlx::query(
            "SELECT chunk_index, text, embedding FROM chunk_vectors WHERE document_id = ?",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        let mut candidates: Vec<RetrievedChunk> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                let vector = blob_to_vec(&blob);
                RetrievedChunk {
                    chunk_index: row.get("chunk_index"),
                    text: row.get("text"),
                    score: cosine_similarity(query_vector, &vector) as f64,
                }
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        candidates.truncate(top_k);

        Ok(candidates)
    }
}

/// Encode a float vector as little-endian f32 bytes for BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in [-1, 1]; 0.0 for empty or mismatched vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        assert_eq!(blob.len(), 20);
        assert_eq!(blob_to_vec(&blob), vec);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_empty_or_mismatched() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }
}
