use crate::chunking::make_chunks;
use crate::embeddings::TextEmbedder;
use crate::error::IngestError;
use crate::models::{ChunkingOptions, DocumentChunk};
use crate::traits::ChunkStore;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

/// Stable digest of a resource's extracted text. Callers compare it against
/// the stored value to skip re-chunking unchanged resources.
pub fn fingerprint_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Chunks one resource's extracted text into numbered `DocumentChunk`s.
/// Indices are 1-based and unique within the resource.
pub fn build_resource_chunks(
    session_id: Uuid,
    resource_id: Uuid,
    extracted_text: &str,
    options: &ChunkingOptions,
) -> Result<Vec<DocumentChunk>, IngestError> {
    let created_at = Utc::now();
    let chunks = make_chunks(extracted_text, options)?
        .into_iter()
        .enumerate()
        .map(|(index, (page_ref, text))| DocumentChunk {
            chunk_id: Uuid::new_v4(),
            session_id,
            resource_id,
            chunk_index: index as u32 + 1,
            page_ref,
            text,
            embedding: None,
            created_at,
        })
        .collect();
    Ok(chunks)
}

#[derive(Debug, Clone)]
pub struct RechunkReport {
    pub resource_id: Uuid,
    pub chunks_written: usize,
    pub embedded: usize,
    pub text_fingerprint: String,
}

/// Rebuilds a resource's chunk set from its extracted text and swaps it into
/// the store as one atomic replacement. When an embedder is supplied, every
/// chunk is embedded before the swap so the new set is never half-embedded.
pub async fn rechunk_resource<S, E>(
    store: &S,
    embedder: Option<&E>,
    session_id: Uuid,
    resource_id: Uuid,
    extracted_text: &str,
    options: &ChunkingOptions,
) -> Result<RechunkReport, IngestError>
where
    S: ChunkStore + Send + Sync,
    E: TextEmbedder + Send + Sync,
{
    let mut chunks = build_resource_chunks(session_id, resource_id, extracted_text, options)?;

    let mut embedded = 0;
    if let Some(embedder) = embedder {
        for chunk in &mut chunks {
            chunk.embedding = Some(embedder.embed(&chunk.text).await?);
            embedded += 1;
        }
    }

    let chunks_written = store
        .replace_chunks(resource_id, &chunks)
        .await
        .map_err(|error| IngestError::Store(error.to_string()))?;

    info!(
        %resource_id,
        chunks_written,
        embedded,
        "replaced chunk set"
    );

    Ok(RechunkReport {
        resource_id,
        chunks_written,
        embedded,
        text_fingerprint: fingerprint_text(extracted_text),
    })
}
