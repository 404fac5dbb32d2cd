use parking_lot::RwLock;
use rand::Rng;
use tracing::info;

use super::entry::{MemoryNode, NodeId};
use super::index::{IndexStats, MemoryIndex};
use super::query::QueryOutcome;
use crate::config::EngineConfig;

/// Shared handle over a memory index.
///
/// Reloads build the replacement index before taking the write lock, so a
/// query sees either the old index or the new one. Queries share the read
/// lock; inserts and reloads are serialized by the write lock.
pub struct BrainEngine {
    config: EngineConfig,
    index: RwLock<MemoryIndex>,
}

impl BrainEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            index: RwLock::new(MemoryIndex::new(config.clone())),
            config,
        }
    }

    /// Creates an engine already loaded with `raw`
    pub fn from_text(raw: &str, config: EngineConfig) -> Self {
        let engine = Self::new(config);
        engine.load(raw);
        engine
    }

    /// Wraps a prebuilt index, e.g. one restored from a snapshot
    pub fn from_index(index: MemoryIndex) -> Self {
        Self {
            config: index.config().clone(),
            index: RwLock::new(index),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replaces the whole memory with the lines of `raw`.
    pub fn load(&self, raw: &str) {
        let fresh = MemoryIndex::from_text(raw, self.config.clone());
        let stats = fresh.stats();
        *self.index.write() = fresh;
        info!(
            nodes = stats.total_nodes,
            categories = stats.categories,
            edges = stats.association_edges,
            "Loaded memory"
        );
    }

    /// Appends a single line; see [`MemoryIndex::insert`].
    pub fn insert(&self, line: &str, category: Option<&str>) -> Option<NodeId> {
        self.index.write().insert(line, category)
    }

    /// Records a conversation turn under the `INTERACTIONS` category.
    pub fn insert_interaction(&self, user: &str, response: &str) -> Option<NodeId> {
        self.insert(&format_interaction(user, response), Some(INTERACTIONS_CATEGORY))
    }

    pub fn query(&self, text: &str, limit: usize) -> QueryOutcome {
        self.index.read().query(text, limit)
    }

    pub fn query_with_rng<R: Rng>(&self, text: &str, limit: usize, rng: &mut R) -> QueryOutcome {
        self.index.read().query_with_rng(text, limit, rng)
    }

    pub fn node(&self, id: &NodeId) -> Option<MemoryNode> {
        self.index.read().node(id).cloned()
    }

    /// Associated lines with their strengths, strongest first
    pub fn related(&self, id: &NodeId, limit: usize) -> Vec<(String, f32)> {
        self.index
            .read()
            .related(id, limit)
            .into_iter()
            .map(|(node, strength)| (node.content().to_string(), strength))
            .collect()
    }

    pub fn stats(&self) -> IndexStats {
        self.index.read().stats()
    }

    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Copies out every node in load order
    pub fn snapshot_nodes(&self) -> Vec<MemoryNode> {
        self.index.read().nodes().to_vec()
    }

    /// Runs `f` against the current index under the read lock
    pub fn with_index<T>(&self, f: impl FnOnce(&MemoryIndex) -> T) -> T {
        f(&self.index.read())
    }
}

pub const INTERACTIONS_CATEGORY: &str = "INTERACTIONS";

/// Flattens a conversation turn into one storable line.
pub fn format_interaction(user: &str, response: &str) -> String {
    let flatten = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ");
    format!("User: {} | Response: {}", flatten(user), flatten(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_reload_replaces_state() {
        let engine = BrainEngine::from_text("old fact about lathes\n", EngineConfig::default());
        assert_eq!(engine.len(), 1);

        engine.load("new fact about mills\nanother fact about drills\n");
        assert_eq!(engine.len(), 2);
        assert!(!engine.query("lathes", 3).found);

        engine.load("");
        assert!(engine.is_empty());
    }

    #[test]
    fn test_interaction_logging() {
        let engine = BrainEngine::new(EngineConfig::default());
        let id = engine
            .insert_interaction("what is the\nlead time?", "Usually five days.")
            .unwrap();
        let node = engine.node(&id).unwrap();
        assert_eq!(node.content(), "User: what is the lead time? | Response: Usually five days.");
        assert_eq!(node.category(), INTERACTIONS_CATEGORY);

        let outcome = engine.query("lead time", 3);
        assert!(outcome.found);
        assert_eq!(outcome.best_match, node.content());
    }

    #[test]
    fn test_concurrent_queries_and_inserts() {
        let corpus: String = (0..200).map(|i| format!("stock item {i} aluminium\n")).collect();
        let engine = Arc::new(BrainEngine::from_text(&corpus, EngineConfig::default()));

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    for i in 0..25 {
                        if t % 2 == 0 {
                            engine.insert(&format!("worker {t} note {i} titanium"), None);
                        } else {
                            assert!(engine.query("aluminium", 3).found);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.len(), 250);
        assert!(engine.query("titanium", 3).found);
    }
}
