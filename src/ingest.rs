//! Index construction for an uploaded file: read, chunk, embed, store.

use std::path::Path;

use tracing::info;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::error::{ChatError, Result};
use crate::index::{IndexHandle, IndexStore};
use crate::llm::LanguageModel;
use crate::models::Chunk;
use crate::reader;

/// Chunks embedded per service call.
const EMBED_BATCH: usize = 16;

/// Build (or rebuild) the vector index for one document.
///
/// Reads the file, chunks every produced document with the configured
/// window and overlap, embeds the chunks in batches, and replaces the
/// document's index in one shot. Fails with [`ChatError::EmptyDocument`]
/// when the file yields no indexable text.
pub async fn build_index(
    config: &Config,
    llm: &dyn LanguageModel,
    embedding_model: &str,
    index: &IndexStore,
    document_id: &str,
    file_path: &Path,
) -> Result<IndexHandle> {
    let documents = reader::read_file(file_path)?;
    if documents.is_empty() {
        return Err(ChatError::EmptyDocument);
    }

    // Chunk indices are contiguous across all documents from the file.
    let mut chunks: Vec<Chunk> = Vec::new();
    for document in &documents {
        let offset = chunks.len() as i64;
        for mut chunk in chunk_text(
            document_id,
            &document.text,
            config.chunking.chunk_size,
            config.chunking.chunk_overlap,
        ) {
            chunk.chunk_index += offset;
            chunks.push(chunk);
        }
    }

    if chunks.is_empty() {
        return Err(ChatError::EmptyDocument);
    }

    let mut embeddings: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
    for batch in chunks.chunks(EMBED_BATCH) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        embeddings.extend(llm.embed(embedding_model, &texts).await?);
    }

    let handle = index
        .create_or_replace(document_id, &chunks, &embeddings)
        .await?;

    info!(
        document_id,
        chunks = handle.chunk_count,
        file = %file_path.display(),
        "index built"
    );

    Ok(handle)
}
