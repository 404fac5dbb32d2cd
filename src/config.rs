use serde::{Deserialize, Serialize};

/// Tuning knobs for indexing and matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many following (or, on insert, preceding) nodes each node is compared against
    pub association_window: usize,
    /// Minimum strength for an association edge (exclusive)
    pub association_threshold: f32,
    /// Minimum score for a result to count as a match (exclusive)
    pub match_threshold: f32,
    /// Results sharing this many leading characters are duplicates
    pub dedup_prefix_chars: usize,
    /// Random fallback draws from the first N nodes
    pub fallback_pool: usize,
    /// A query token must be at least this long to admit a candidate to token scoring
    pub min_gate_token_len: usize,
    /// Category assigned before any header is seen
    pub default_category: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            association_window: 50,
            association_threshold: 0.1,
            match_threshold: 0.3,
            dedup_prefix_chars: 50,
            fallback_pool: 100,
            min_gate_token_len: 4,
            default_category: "general".to_string(),
        }
    }
}
