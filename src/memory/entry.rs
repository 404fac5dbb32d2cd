use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use super::tokenizer::{content_id, tokenize};

/// Content-derived identifier of a memory node
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Retrieval bookkeeping. Atomic so lookups can record hits under a shared borrow.
#[derive(Debug, Default)]
pub struct AccessStats {
    count: AtomicU64,
    // unix millis, 0 = never
    last_accessed: AtomicU64,
}

impl AccessStats {
    fn touch(&self) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.count.fetch_add(1, Ordering::Relaxed);
        // max() keeps a clock step backwards from looking like "never"
        self.last_accessed.fetch_max(now.max(1), Ordering::Relaxed);
    }
}

impl Clone for AccessStats {
    fn clone(&self) -> Self {
        Self {
            count: AtomicU64::new(self.count.load(Ordering::Relaxed)),
            last_accessed: AtomicU64::new(self.last_accessed.load(Ordering::Relaxed)),
        }
    }
}

/// A single line of knowledge held in memory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryNode {
    id: NodeId,
    content: String,
    tokens: Vec<String>,
    weight: f32, // reserved for decay, not used in scoring
    connections: BTreeMap<NodeId, f32>,
    category: String,
    #[serde(skip)]
    access: AccessStats,
}

impl MemoryNode {
    /// Creates a node from a trimmed line
    pub fn new(content: &str, category: &str) -> Self {
        let content = content.trim();
        Self {
            id: content_id(content),
            content: content.to_string(),
            tokens: tokenize(content),
            weight: 1.0,
            connections: BTreeMap::new(),
            category: category.to_string(),
            access: AccessStats::default(),
        }
    }

    // Getters
    pub fn id(&self) -> &NodeId { &self.id }
    pub fn content(&self) -> &str { &self.content }
    pub fn tokens(&self) -> &[String] { &self.tokens }
    pub fn weight(&self) -> f32 { self.weight }
    pub fn category(&self) -> &str { &self.category }
    pub fn connections(&self) -> &BTreeMap<NodeId, f32> { &self.connections }

    pub fn access_count(&self) -> u64 {
        self.access.count.load(Ordering::Relaxed)
    }

    /// Unix millis of the last successful retrieval
    pub fn last_accessed(&self) -> Option<u64> {
        match self.access.last_accessed.load(Ordering::Relaxed) {
            0 => None,
            ms => Some(ms),
        }
    }

    /// Records a retrieval hit
    pub fn record_access(&self) {
        self.access.touch();
    }

    pub(crate) fn set_category(&mut self, category: &str) {
        self.category = category.to_string();
    }

    /// Sets (or overwrites) the association strength to a neighbor
    pub(crate) fn connect(&mut self, neighbor: &NodeId, strength: f32) {
        self.connections.insert(neighbor.clone(), strength);
    }
}
