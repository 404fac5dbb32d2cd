//! Best-match lookup over the memory index.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use super::entry::MemoryNode;
use super::index::MemoryIndex;
use super::tokenizer::tokenize;

/// Returned as `best_match` when nothing has been loaded
pub const NO_MEMORY_SENTINEL: &str = "Memory not loaded: no knowledge base is available.";

/// What a caller gets back from a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryOutcome {
    pub best_match: String,
    pub found: bool,
    pub confidence: f32,
    pub alternatives: Vec<String>,
}

impl QueryOutcome {
    fn empty_memory() -> Self {
        Self {
            best_match: NO_MEMORY_SENTINEL.to_string(),
            found: false,
            confidence: 0.0,
            alternatives: Vec::new(),
        }
    }
}

/// A scored candidate, borrowed from the index
#[derive(Debug, Clone, Copy)]
pub struct ScoredNode<'a> {
    pub node: &'a MemoryNode,
    pub score: f32,
    /// Matched by containing the whole query
    pub exact: bool,
}

impl MemoryIndex {
    /// Scores every node against `text`, best first, deduplicated and cut to `limit`.
    pub fn search(&self, text: &str, limit: usize) -> Vec<ScoredNode<'_>> {
        let query = text.to_lowercase();
        let query_tokens = tokenize(&query);
        let gate_len = self.config.min_gate_token_len;
        let threshold = self.config.match_threshold;

        let mut scored: Vec<ScoredNode<'_>> = self
            .nodes
            .iter()
            .filter_map(|node| {
                let candidate = node.content().to_lowercase();
                if !query.is_empty() && candidate.contains(&query) {
                    return Some(ScoredNode {
                        node,
                        score: 1.0,
                        exact: true,
                    });
                }

                let gated = query_tokens
                    .iter()
                    .any(|t| t.chars().count() >= gate_len && candidate.contains(t.as_str()));
                if !gated {
                    return None;
                }

                let hits = query_tokens
                    .iter()
                    .filter(|t| node.tokens().iter().any(|ct| ct.contains(t.as_str())))
                    .count();
                let score = hits as f32 / query_tokens.len().max(1) as f32;
                (score > threshold).then_some(ScoredNode {
                    node,
                    score,
                    exact: false,
                })
            })
            .collect();

        // stable: equal scores keep load order, except whole-query hits go first
        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| b.exact.cmp(&a.exact))
        });

        let prefix_len = self.config.dedup_prefix_chars;
        let mut seen = HashSet::new();
        scored.retain(|s| {
            let key: String = s.node.content().chars().take(prefix_len).collect();
            seen.insert(key)
        });
        scored.truncate(limit.max(1));
        scored
    }

    /// Runs a query, falling back to a random early line when nothing matches.
    pub fn query_with_rng<R: Rng>(&self, text: &str, limit: usize, rng: &mut R) -> QueryOutcome {
        if self.nodes.is_empty() {
            return QueryOutcome::empty_memory();
        }

        let results = self.search(text, limit);
        match results.split_first() {
            Some((top, rest)) if top.score > self.config.match_threshold => {
                top.node.record_access();
                debug!(
                    id = %top.node.id(),
                    confidence = top.score,
                    alternatives = rest.len(),
                    "Memory match"
                );
                QueryOutcome {
                    best_match: top.node.content().to_string(),
                    found: true,
                    confidence: top.score,
                    alternatives: rest.iter().map(|s| s.node.content().to_string()).collect(),
                }
            }
            _ => {
                let pool = self.nodes.len().min(self.config.fallback_pool.max(1));
                let pick = &self.nodes[rng.gen_range(0..pool)];
                debug!(id = %pick.id(), pool, "No memory match, using contextual fallback");
                QueryOutcome {
                    best_match: pick.content().to_string(),
                    found: false,
                    confidence: 0.0,
                    alternatives: Vec::new(),
                }
            }
        }
    }

    /// Runs a query using the thread-local RNG for the fallback pick.
    pub fn query(&self, text: &str, limit: usize) -> QueryOutcome {
        self.query_with_rng(text, limit, &mut rand::thread_rng())
    }
}
