use crate::error::SearchError;
use crate::models::{ChunkHit, DocumentChunk};
use crate::traits::{ChunkStore, LexicalIndex, SemanticIndex};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

/// In-memory backend implementing all three storage seams. Serves the CLI
/// and integration tests; a deployment would point the traits at a real
/// full-text index and vector store instead.
pub struct MemoryIndex {
    default_filename: String,
    state: RwLock<State>,
}

#[derive(Default)]
struct State {
    filenames: HashMap<Uuid, String>,
    chunks: HashMap<Uuid, Vec<DocumentChunk>>,
}

impl MemoryIndex {
    pub fn new(default_filename: impl Into<String>) -> Self {
        Self {
            default_filename: default_filename.into(),
            state: RwLock::new(State::default()),
        }
    }

    /// Associates a display filename with a resource; hits for unregistered
    /// resources fall back to the index's default filename.
    pub fn register_resource(&self, resource_id: Uuid, filename: impl Into<String>) {
        let mut state = self.state.write().expect("memory index lock poisoned");
        state.filenames.insert(resource_id, filename.into());
    }

    pub fn chunk_count(&self) -> usize {
        let state = self.state.read().expect("memory index lock poisoned");
        state.chunks.values().map(Vec::len).sum()
    }

    fn hit_for(&self, state: &State, chunk: &DocumentChunk, rank: f64) -> ChunkHit {
        let filename = state
            .filenames
            .get(&chunk.resource_id)
            .cloned()
            .unwrap_or_else(|| self.default_filename.clone());
        ChunkHit {
            chunk_id: chunk.chunk_id,
            resource_id: chunk.resource_id,
            filename,
            page_ref: chunk.page_ref.clone(),
            text: chunk.text.clone(),
            rank,
        }
    }
}

#[async_trait]
impl ChunkStore for MemoryIndex {
    async fn replace_chunks(
        &self,
        resource_id: Uuid,
        chunks: &[DocumentChunk],
    ) -> Result<usize, SearchError> {
        let mut state = self.state.write().expect("memory index lock poisoned");
        state.chunks.insert(resource_id, chunks.to_vec());
        Ok(chunks.len())
    }
}

#[async_trait]
impl LexicalIndex for MemoryIndex {
    async fn search_lexical(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ChunkHit>, SearchError> {
        let terms: Vec<String> = query
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let state = self.state.read().expect("memory index lock poisoned");
        let mut scored: Vec<(f64, &DocumentChunk)> = Vec::new();

        for chunk in state.chunks.values().flatten() {
            let lowered = chunk.text.to_lowercase();
            let matched = terms.iter().filter(|term| lowered.contains(*term)).count();
            if matched > 0 {
                scored.push((matched as f64 / terms.len() as f64, chunk));
            }
        }

        scored.sort_by(|left, right| {
            right
                .0
                .total_cmp(&left.0)
                .then_with(|| left.1.chunk_id.cmp(&right.1.chunk_id))
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(rank, chunk)| self.hit_for(&state, chunk, rank))
            .collect())
    }
}

#[async_trait]
impl SemanticIndex for MemoryIndex {
    async fn search_semantic(
        &self,
        query_vector: &[f32],
        limit: usize,
    ) -> Result<Vec<ChunkHit>, SearchError> {
        let state = self.state.read().expect("memory index lock poisoned");
        let mut scored: Vec<(f64, &DocumentChunk)> = Vec::new();

        for chunk in state.chunks.values().flatten() {
            let Some(embedding) = &chunk.embedding else {
                continue;
            };
            if let Some(similarity) = cosine(query_vector, embedding) {
                scored.push((similarity, chunk));
            }
        }

        scored.sort_by(|left, right| {
            right
                .0
                .total_cmp(&left.0)
                .then_with(|| left.1.chunk_id.cmp(&right.1.chunk_id))
        });

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(rank, chunk)| self.hit_for(&state, chunk, rank))
            .collect())
    }
}

fn cosine(left: &[f32], right: &[f32]) -> Option<f64> {
    if left.len() != right.len() || left.is_empty() {
        return None;
    }
    let mut dot = 0f64;
    let mut left_norm = 0f64;
    let mut right_norm = 0f64;
    for (a, b) in left.iter().zip(right) {
        dot += f64::from(*a) * f64::from(*b);
        left_norm += f64::from(*a) * f64::from(*a);
        right_norm += f64::from(*b) * f64::from(*b);
    }
    if left_norm == 0.0 || right_norm == 0.0 {
        return None;
    }
    Some(dot / (left_norm.sqrt() * right_norm.sqrt()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{HashedNgramEmbedder, TextEmbedder};
    use chrono::Utc;

    fn chunk(resource_id: Uuid, index: u32, text: &str) -> DocumentChunk {
        DocumentChunk {
            chunk_id: Uuid::new_v4(),
            session_id: Uuid::from_u128(1),
            resource_id,
            chunk_index: index,
            page_ref: Some(format!("page {index}")),
            text: text.to_string(),
            embedding: None,
            created_at: Utc::now(),
        }
    }

    async fn embedded(resource_id: Uuid, index: u32, text: &str) -> DocumentChunk {
        let embedder = HashedNgramEmbedder { dimensions: 64 };
        let mut out = chunk(resource_id, index, text);
        out.embedding = Some(embedder.embed(text).await.unwrap());
        out
    }

    #[tokio::test]
    async fn replace_is_all_or_nothing_per_resource() {
        let index = MemoryIndex::new("notes.pdf");
        let resource_id = Uuid::new_v4();

        index
            .replace_chunks(resource_id, &[chunk(resource_id, 1, "old")])
            .await
            .unwrap();
        index
            .replace_chunks(
                resource_id,
                &[chunk(resource_id, 1, "new"), chunk(resource_id, 2, "more")],
            )
            .await
            .unwrap();

        assert_eq!(index.chunk_count(), 2);
        let hits = index.search_lexical("old", 10).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn lexical_search_ranks_fuller_matches_first() {
        let index = MemoryIndex::new("notes.pdf");
        let resource_id = Uuid::new_v4();
        index.register_resource(resource_id, "os-lecture.pdf");
        index
            .replace_chunks(
                resource_id,
                &[
                    chunk(resource_id, 1, "Paging and segmentation of memory"),
                    chunk(resource_id, 2, "Paging only"),
                    chunk(resource_id, 3, "Unrelated material"),
                ],
            )
            .await
            .unwrap();

        let hits = index.search_lexical("paging segmentation", 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].text, "Paging and segmentation of memory");
        assert_eq!(hits[0].filename, "os-lecture.pdf");
        assert!(hits[0].rank > hits[1].rank);
    }

    #[tokio::test]
    async fn semantic_search_prefers_similar_text() {
        let index = MemoryIndex::new("notes.pdf");
        let resource_id = Uuid::new_v4();
        index
            .replace_chunks(
                resource_id,
                &[
                    embedded(resource_id, 1, "the translation lookaside buffer").await,
                    embedded(resource_id, 2, "completely different topic entirely").await,
                ],
            )
            .await
            .unwrap();

        let embedder = HashedNgramEmbedder { dimensions: 64 };
        let query = embedder.embed("translation lookaside buffer").await.unwrap();
        let hits = index.search_semantic(&query, 10).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits[0].text.contains("translation"));
        assert!(hits[0].rank > hits[1].rank);
    }

    #[tokio::test]
    async fn limits_are_respected() {
        let index = MemoryIndex::new("notes.pdf");
        let resource_id = Uuid::new_v4();
        let chunks: Vec<DocumentChunk> = (1..=10)
            .map(|i| chunk(resource_id, i, "shared term everywhere"))
            .collect();
        index.replace_chunks(resource_id, &chunks).await.unwrap();

        let hits = index.search_lexical("shared", 3).await.unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[tokio::test]
    async fn chunks_without_embeddings_are_skipped_semantically() {
        let index = MemoryIndex::new("notes.pdf");
        let resource_id = Uuid::new_v4();
        index
            .replace_chunks(resource_id, &[chunk(resource_id, 1, "no vector here")])
            .await
            .unwrap();

        let hits = index.search_semantic(&[1.0, 0.0], 10).await.unwrap();
        assert!(hits.is_empty());
    }
}
