use crate::error::SearchError;
use crate::models::{ChunkHit, DocumentChunk};
use async_trait::async_trait;
use uuid::Uuid;

/// Full-text search over persisted chunks. Hits come back best-first by the
/// backend's own relevance rank.
#[async_trait]
pub trait LexicalIndex {
    async fn search_lexical(&self, query: &str, limit: usize)
        -> Result<Vec<ChunkHit>, SearchError>;
}

/// Vector-similarity search over persisted chunks. Hits come back best-first
/// by similarity, normalized so 1.0 means identical and 0.0 unrelated.
#[async_trait]
pub trait SemanticIndex {
    async fn search_semantic(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkHit>, SearchError>;
}

#[async_trait]
impl<T> LexicalIndex for std::sync::Arc<T>
where
    T: LexicalIndex + Send + Sync,
{
    async fn search_lexical(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ChunkHit>, SearchError> {
        (**self).search_lexical(query, limit).await
    }
}

#[async_trait]
impl<T> SemanticIndex for std::sync::Arc<T>
where
    T: SemanticIndex + Send + Sync,
{
    async fn search_semantic(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkHit>, SearchError> {
        (**self).search_semantic(query_vector, limit).await
    }
}

/// Durable chunk storage. `replace_chunks` swaps a resource's entire chunk
/// set atomically: a concurrent query sees the old set or the new set, never
/// a mix. Returns the number of chunks written.
#[async_trait]
pub trait ChunkStore {
    async fn replace_chunks(
        &self,
        resource_id: Uuid,
        chunks: &[DocumentChunk],
    ) -> Result<usize, SearchError>;
}
