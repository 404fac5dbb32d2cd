use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use super::associations;
use super::entry::{MemoryNode, NodeId};
use super::loader::parse_lines;
use crate::config::EngineConfig;

/// Nodes in load order plus the token and category indexes derived from them.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    pub(crate) config: EngineConfig,
    pub(crate) nodes: Vec<MemoryNode>,
    positions: HashMap<NodeId, usize>,
    token_index: BTreeMap<String, BTreeSet<NodeId>>, // token -> ids
    category_index: BTreeMap<String, BTreeSet<NodeId>>,
}

impl MemoryIndex {
    /// Creates an empty index
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Builds an index from raw corpus text. Never fails; unusable input
    /// gives an empty index.
    pub fn from_text(raw: &str, config: EngineConfig) -> Self {
        let mut index = Self::new(config);
        let default_category = index.config.default_category.clone();
        for (content, category) in parse_lines(raw, &default_category) {
            index.upsert(MemoryNode::new(content, category));
        }

        let edges = associations::build_windowed(
            &mut index.nodes,
            index.config.association_window,
            index.config.association_threshold,
        );
        index.rebuild_indexes();

        debug!(
            nodes = index.nodes.len(),
            tokens = index.token_index.len(),
            edges,
            "Built memory index"
        );
        index
    }

    /// Rebuilds an index from stored nodes, keeping their connections as is.
    pub fn from_nodes(nodes: Vec<MemoryNode>, config: EngineConfig) -> Self {
        let mut index = Self::new(config);
        for node in nodes {
            index.upsert(node);
        }
        index.rebuild_indexes();
        index
    }

    /// Appends one line, associating it only with the most recent nodes.
    ///
    /// Returns `None` for blank input. A line already present keeps its
    /// position and connections and moves to the new category.
    pub fn insert(&mut self, line: &str, category: Option<&str>) -> Option<NodeId> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let category = category.unwrap_or(self.config.default_category.as_str()).to_string();
        let node = MemoryNode::new(line, &category);
        let id = node.id().clone();

        if let Some(&pos) = self.positions.get(&id) {
            let old = self.nodes[pos].category().to_string();
            if let Some(ids) = self.category_index.get_mut(&old) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.category_index.remove(&old);
                }
            }
            self.nodes[pos].set_category(&category);
            self.category_index.entry(category).or_default().insert(id.clone());
            return Some(id);
        }

        let pos = self.upsert(node);
        self.index_node(pos);
        let edges = associations::link_recent(
            &mut self.nodes,
            pos,
            self.config.association_window,
            self.config.association_threshold,
        );
        debug!(id = %id, edges, "Inserted memory node");
        Some(id)
    }

    /// Stores a node, replacing any node with the same id in place.
    fn upsert(&mut self, node: MemoryNode) -> usize {
        match self.positions.get(node.id()) {
            Some(&pos) => {
                self.nodes[pos] = node;
                pos
            }
            None => {
                let pos = self.nodes.len();
                self.positions.insert(node.id().clone(), pos);
                self.nodes.push(node);
                pos
            }
        }
    }

    fn rebuild_indexes(&mut self) {
        self.token_index.clear();
        self.category_index.clear();
        for pos in 0..self.nodes.len() {
            self.index_node(pos);
        }
    }

    fn index_node(&mut self, pos: usize) {
        let node = &self.nodes[pos];
        for token in node.tokens() {
            self.token_index
                .entry(token.clone())
                .or_default()
                .insert(node.id().clone());
        }
        self.category_index
            .entry(node.category().to_string())
            .or_default()
            .insert(node.id().clone());
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// All nodes in load order
    pub fn nodes(&self) -> &[MemoryNode] {
        &self.nodes
    }

    pub fn node(&self, id: &NodeId) -> Option<&MemoryNode> {
        self.positions.get(id).map(|&pos| &self.nodes[pos])
    }

    pub fn token_index(&self) -> &BTreeMap<String, BTreeSet<NodeId>> {
        &self.token_index
    }

    pub fn category_index(&self) -> &BTreeMap<String, BTreeSet<NodeId>> {
        &self.category_index
    }

    /// Nodes containing the normalized token, in load order
    pub fn nodes_with_token(&self, token: &str) -> Vec<&MemoryNode> {
        self.collect_ordered(self.token_index.get(&token.to_lowercase()))
    }

    /// Nodes under a category header, in load order
    pub fn nodes_in_category(&self, category: &str) -> Vec<&MemoryNode> {
        self.collect_ordered(self.category_index.get(category))
    }

    fn collect_ordered(&self, ids: Option<&BTreeSet<NodeId>>) -> Vec<&MemoryNode> {
        let Some(ids) = ids else {
            return Vec::new();
        };
        let mut positions: Vec<usize> = ids
            .iter()
            .filter_map(|id| self.positions.get(id).copied())
            .collect();
        positions.sort_unstable();
        positions.into_iter().map(|pos| &self.nodes[pos]).collect()
    }

    /// Associated neighbors, strongest first
    pub fn related(&self, id: &NodeId, limit: usize) -> Vec<(&MemoryNode, f32)> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let mut neighbors: Vec<(&MemoryNode, f32)> = node
            .connections()
            .iter()
            .filter_map(|(other, &strength)| self.node(other).map(|n| (n, strength)))
            .collect();
        neighbors.sort_by(|a, b| b.1.total_cmp(&a.1));
        neighbors.truncate(limit);
        neighbors
    }

    /// Returns statistics about the current index
    pub fn stats(&self) -> IndexStats {
        let directed: usize = self.nodes.iter().map(|n| n.connections().len()).sum();
        IndexStats {
            total_nodes: self.nodes.len(),
            distinct_tokens: self.token_index.len(),
            categories: self.category_index.len(),
            association_edges: directed / 2,
            avg_connections: if self.nodes.is_empty() {
                0.0
            } else {
                directed as f32 / self.nodes.len() as f32
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndexStats {
    pub total_nodes: usize,
    pub distinct_tokens: usize,
    pub categories: usize,
    pub association_edges: usize,
    pub avg_connections: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CORPUS: &str = "\
ARA Guardian answers shop questions
MATERIALS
=========
Aluminium 6061 machines quickly
Titanium machines slowly and costs more
Aluminium anodizing adds two days
SHIPPING
Parts ship within five business days
";

    #[test]
    fn test_build_from_text() {
        let index = MemoryIndex::from_text(CORPUS, EngineConfig::default());
        assert_eq!(index.len(), 5);
        assert_eq!(index.nodes()[0].category(), "general");
        assert_eq!(index.nodes_in_category("MATERIALS").len(), 3);
        assert_eq!(index.nodes_in_category("SHIPPING").len(), 1);

        let aluminium = index.nodes_with_token("Aluminium");
        assert_eq!(aluminium.len(), 2);
        assert_eq!(aluminium[0].content(), "Aluminium 6061 machines quickly");
    }

    #[test]
    fn test_empty_and_malformed_text() {
        assert!(MemoryIndex::from_text("", EngineConfig::default()).is_empty());
        assert!(MemoryIndex::from_text("\n---\n\n", EngineConfig::default()).is_empty());
        assert_eq!(MemoryIndex::default().stats().avg_connections, 0.0);
    }

    #[test]
    fn test_duplicate_lines_last_write_wins() {
        let raw = "steel brackets in stock\nINVENTORY\nsteel brackets in stock\n";
        let index = MemoryIndex::from_text(raw, EngineConfig::default());
        assert_eq!(index.len(), 1);
        assert_eq!(index.nodes()[0].category(), "INVENTORY");
        assert!(index.nodes_in_category("general").is_empty());
    }

    #[test]
    fn test_reload_is_idempotent() {
        let once = MemoryIndex::from_text(CORPUS, EngineConfig::default());
        let twice = MemoryIndex::from_text(CORPUS, EngineConfig::default());
        assert_eq!(once.len(), twice.len());
        assert_eq!(once.token_index(), twice.token_index());
        for (a, b) in once.nodes().iter().zip(twice.nodes()) {
            assert_eq!(a.id(), b.id());
            assert_eq!(a.connections(), b.connections());
        }
    }

    #[test]
    fn test_associations_are_symmetric() {
        let index = MemoryIndex::from_text(CORPUS, EngineConfig::default());
        assert!(index.stats().association_edges > 0);
        for node in index.nodes() {
            for (other, strength) in node.connections() {
                let back = index.node(other).unwrap().connections().get(node.id());
                assert_eq!(back, Some(strength));
                assert!(*strength > 0.1 && *strength <= 1.0);
            }
        }
    }

    #[test]
    fn test_insert_links_recent_nodes() {
        let mut index = MemoryIndex::from_text(CORPUS, EngineConfig::default());
        let id = index
            .insert("Titanium brackets need coolant", Some("MATERIALS"))
            .unwrap();
        assert_eq!(index.len(), 6);
        assert_eq!(index.nodes_in_category("MATERIALS").len(), 4);

        let related = index.related(&id, 5);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].0.content(), "Titanium machines slowly and costs more");
        assert!(index.nodes_with_token("coolant").iter().any(|n| n.id() == &id));
    }

    #[test]
    fn test_insert_window_is_bounded() {
        let config = EngineConfig {
            association_window: 1,
            ..EngineConfig::default()
        };
        let mut index = MemoryIndex::from_text(CORPUS, config);
        let id = index.insert("Titanium brackets need coolant", None).unwrap();
        // the only titanium line is outside the one-node window
        assert!(index.related(&id, 5).is_empty());
        assert_eq!(index.node(&id).unwrap().category(), "general");
    }

    #[test]
    fn test_insert_edge_cases() {
        let mut index = MemoryIndex::new(EngineConfig::default());
        assert_eq!(index.insert("   ", None), None);

        let id = index.insert("?!", None).unwrap();
        assert!(index.node(&id).unwrap().tokens().is_empty());
        assert!(index.token_index().is_empty());
        // no tokens, still reachable by substring
        assert!(index.query("?!", 3).found);

        let again = index.insert("?!", Some("NOTES")).unwrap();
        assert_eq!(id, again);
        assert_eq!(index.len(), 1);
        assert_eq!(index.nodes_in_category("NOTES").len(), 1);
        assert!(index.nodes_in_category("general").is_empty());
    }
}
