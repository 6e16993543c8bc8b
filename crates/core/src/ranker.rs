use crate::error::SearchError;
use crate::models::{BackendKind, ChunkHit, Provenance, RankedHit, RetrievalOptions};
use crate::traits::{LexicalIndex, SemanticIndex};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::time::{error::Elapsed, timeout};
use tracing::warn;
use uuid::Uuid;

/// Merges lexical full-text hits and vector-similarity hits into one ranked
/// list. The two backends run concurrently per query, each bounded by its
/// own timeout; the merge map is local to each call.
pub struct HybridRanker<L, S>
where
    L: LexicalIndex,
    S: SemanticIndex,
{
    lexical: L,
    semantic: S,
    options: RetrievalOptions,
}

/// Outcome of a hybrid query. `degraded` names the backend whose results
/// are missing when the query survived a single-backend failure.
#[derive(Debug, Clone)]
pub struct RankedResults {
    pub hits: Vec<RankedHit>,
    pub degraded: Option<BackendKind>,
}

impl<L, S> HybridRanker<L, S>
where
    L: LexicalIndex + Send + Sync,
    S: SemanticIndex + Send + Sync,
{
    pub fn new(lexical: L, semantic: S) -> Self {
        Self::with_options(lexical, semantic, RetrievalOptions::default())
    }

    pub fn with_options(lexical: L, semantic: S, options: RetrievalOptions) -> Self {
        Self {
            lexical,
            semantic,
            options,
        }
    }

    pub fn options(&self) -> &RetrievalOptions {
        &self.options
    }

    pub async fn hybrid_search(
        &self,
        query: &str,
        query_vector: &[f32],
    ) -> Result<RankedResults, SearchError> {
        if query.trim().is_empty() {
            return Err(SearchError::Request("query is empty".to_string()));
        }

        let limit = self.options.limit;
        let lexical_call = timeout(
            self.options.backend_timeout,
            self.lexical.search_lexical(query, limit),
        );
        let semantic_call = timeout(
            self.options.backend_timeout,
            self.semantic.search_semantic(query_vector, limit),
        );
        let (lexical_outcome, semantic_outcome) = tokio::join!(lexical_call, semantic_call);

        let lexical_hits = settle(lexical_outcome, BackendKind::Lexical);
        let semantic_hits = settle(semantic_outcome, BackendKind::Semantic);

        let (lexical_hits, semantic_hits, degraded) = match (lexical_hits, semantic_hits) {
            (Ok(lexical), Ok(semantic)) => (lexical, semantic, None),
            (Err(lexical_error), Err(semantic_error)) => {
                return Err(SearchError::BackendUnavailable {
                    backend: BackendKind::Both,
                    reason: format!("{lexical_error}; {semantic_error}"),
                });
            }
            (Ok(lexical), Err(error)) if self.options.degrade_on_failure => {
                warn!(%error, "semantic backend lost, serving lexical hits only");
                (lexical, Vec::new(), Some(BackendKind::Semantic))
            }
            (Err(error), Ok(semantic)) if self.options.degrade_on_failure => {
                warn!(%error, "lexical backend lost, serving semantic hits only");
                (Vec::new(), semantic, Some(BackendKind::Lexical))
            }
            (Err(error), _) | (_, Err(error)) => return Err(error),
        };

        Ok(RankedResults {
            hits: merge_hits(lexical_hits, semantic_hits, &self.options),
            degraded,
        })
    }
}

fn settle(
    outcome: Result<Result<Vec<ChunkHit>, SearchError>, Elapsed>,
    backend: BackendKind,
) -> Result<Vec<ChunkHit>, SearchError> {
    match outcome {
        Ok(Ok(hits)) => Ok(hits),
        Ok(Err(error)) => Err(SearchError::BackendUnavailable {
            backend,
            reason: error.to_string(),
        }),
        Err(_) => Err(SearchError::BackendUnavailable {
            backend,
            reason: "timed out".to_string(),
        }),
    }
}

struct MergedHit {
    hit: ChunkHit,
    score: f64,
    provenance: Provenance,
}

/// Linear blend keyed by chunk identity: a lexical hit seeds
/// `rank * w_lexical`, a semantic hit adds `rank * w_semantic` and upgrades
/// provenance to `Both` when the chunk was already seen. Ties break by
/// provenance priority, then chunk id, so equal scores order
/// deterministically.
fn merge_hits(
    lexical: Vec<ChunkHit>,
    semantic: Vec<ChunkHit>,
    options: &RetrievalOptions,
) -> Vec<RankedHit> {
    let mut combined: HashMap<Uuid, MergedHit> = HashMap::new();

    for hit in lexical {
        let score = hit.rank * options.w_lexical;
        combined.insert(
            hit.chunk_id,
            MergedHit {
                hit,
                score,
                provenance: Provenance::Lexical,
            },
        );
    }

    for hit in semantic {
        match combined.entry(hit.chunk_id) {
            Entry::Occupied(mut slot) => {
                let merged = slot.get_mut();
                merged.score += hit.rank * options.w_semantic;
                merged.provenance = Provenance::Both;
            }
            Entry::Vacant(slot) => {
                let score = hit.rank * options.w_semantic;
                slot.insert(MergedHit {
                    hit,
                    score,
                    provenance: Provenance::Semantic,
                });
            }
        }
    }

    let mut merged: Vec<MergedHit> = combined.into_values().collect();
    merged.sort_by(|left, right| {
        right
            .score
            .total_cmp(&left.score)
            .then_with(|| right.provenance.priority().cmp(&left.provenance.priority()))
            .then_with(|| left.hit.chunk_id.cmp(&right.hit.chunk_id))
    });
    merged.truncate(options.limit);

    merged
        .into_iter()
        .map(|item| RankedHit {
            chunk_id: item.hit.chunk_id,
            resource_id: item.hit.resource_id,
            filename: item.hit.filename,
            page_ref: item.hit.page_ref,
            text: item.hit.text,
            rank: item.score,
            provenance: item.provenance,
        })
        .collect()
}
