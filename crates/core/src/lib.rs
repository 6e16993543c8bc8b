pub mod chunking;
pub mod embeddings;
pub mod error;
pub mod ingest;
pub mod models;
pub mod ollama;
pub mod prompt;
pub mod ranker;
pub mod stores;
pub mod traits;

pub use chunking::{
    chunk_text, last_paragraph_break, make_chunks, parse_page_marker, split_page_markers,
    TextBlock,
};
pub use embeddings::{HashedNgramEmbedder, TextEmbedder, DEFAULT_EMBEDDING_DIMENSIONS};
pub use error::{IngestError, SearchError};
pub use ingest::{build_resource_chunks, fingerprint_text, rechunk_resource, RechunkReport};
pub use models::{
    BackendKind, ChunkHit, ChunkingOptions, DocumentChunk, Provenance, RankedHit,
    RetrievalOptions,
};
pub use ollama::OllamaClient;
pub use prompt::{build_prompt, keywordize};
pub use ranker::{HybridRanker, RankedResults};
pub use stores::MemoryIndex;
pub use traits::{ChunkStore, LexicalIndex, SemanticIndex};
