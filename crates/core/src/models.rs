use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::error::IngestError;

/// One retrievable unit of a resource's extracted text. The whole chunk set
/// for a resource is rebuilt and replaced together whenever the extracted
/// text changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub chunk_id: Uuid,
    pub session_id: Uuid,
    pub resource_id: Uuid,
    /// 1-based position within the resource.
    pub chunk_index: u32,
    /// Short reference like "page 3" or "slide 12", when the source text
    /// carried boundary markers.
    pub page_ref: Option<String>,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
}

/// A single backend's search result. `rank` is higher-is-better and only
/// comparable to ranks from the same backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkHit {
    pub chunk_id: Uuid,
    pub resource_id: Uuid,
    pub filename: String,
    pub page_ref: Option<String>,
    pub text: String,
    pub rank: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Lexical,
    Semantic,
    Both,
}

impl Provenance {
    /// Tie-break priority: both > semantic > lexical.
    pub(crate) fn priority(self) -> u8 {
        match self {
            Provenance::Lexical => 0,
            Provenance::Semantic => 1,
            Provenance::Both => 2,
        }
    }
}

/// A hit after hybrid merging. `rank` holds the final combined score; the
/// per-backend sub-scores are not retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedHit {
    pub chunk_id: Uuid,
    pub resource_id: Uuid,
    pub filename: String,
    pub page_ref: Option<String>,
    pub text: String,
    pub rank: f64,
    pub provenance: Provenance,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Lexical,
    Semantic,
    Both,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            BackendKind::Lexical => "lexical",
            BackendKind::Semantic => "semantic",
            BackendKind::Both => "lexical+semantic",
        };
        formatter.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ChunkingOptions {
    /// Target chunk length in characters.
    pub max_chars: usize,
    /// Characters of overlap carried from one chunk into the next.
    pub overlap_chars: usize,
    /// A paragraph boundary is taken as the cut point only when it sits at
    /// least this fraction of `max_chars` into the window.
    pub paragraph_cut_ratio: f64,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            max_chars: 1_400,
            overlap_chars: 150,
            paragraph_cut_ratio: 0.6,
        }
    }
}

impl ChunkingOptions {
    /// Rejects configurations that would stall the chunk loop or produce
    /// degenerate windows. Checked once up front, never mid-loop.
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.max_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "max_chars must be at least 1".to_string(),
            ));
        }
        if self.overlap_chars == 0 {
            return Err(IngestError::InvalidChunkConfig(
                "overlap_chars must be at least 1".to_string(),
            ));
        }
        if self.overlap_chars >= self.max_chars {
            return Err(IngestError::InvalidChunkConfig(format!(
                "overlap_chars ({}) must be smaller than max_chars ({})",
                self.overlap_chars, self.max_chars
            )));
        }
        if !(self.paragraph_cut_ratio > 0.0 && self.paragraph_cut_ratio < 1.0) {
            return Err(IngestError::InvalidChunkConfig(format!(
                "paragraph_cut_ratio ({}) must lie strictly between 0 and 1",
                self.paragraph_cut_ratio
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetrievalOptions {
    /// Result cap per backend call and for the merged list.
    pub limit: usize,
    pub w_lexical: f64,
    pub w_semantic: f64,
    /// Independent bound on each backend call.
    pub backend_timeout: Duration,
    /// When one backend fails, fall back to the survivor's results instead
    /// of propagating the error. Both backends failing is always an error.
    pub degrade_on_failure: bool,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            limit: 6,
            w_lexical: 0.45,
            w_semantic: 0.55,
            backend_timeout: Duration::from_secs(10),
            degrade_on_failure: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chunking_options_are_valid() {
        assert!(ChunkingOptions::default().validate().is_ok());
    }

    #[test]
    fn zero_max_chars_is_rejected() {
        let options = ChunkingOptions {
            max_chars: 0,
            ..ChunkingOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn zero_overlap_is_rejected() {
        let options = ChunkingOptions {
            overlap_chars: 0,
            ..ChunkingOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn overlap_reaching_max_chars_is_rejected() {
        let options = ChunkingOptions {
            max_chars: 100,
            overlap_chars: 100,
            ..ChunkingOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn cut_ratio_must_be_a_proper_fraction() {
        for ratio in [0.0, 1.0, 1.5, -0.2] {
            let options = ChunkingOptions {
                paragraph_cut_ratio: ratio,
                ..ChunkingOptions::default()
            };
            assert!(options.validate().is_err(), "ratio {ratio} should fail");
        }
    }
}
