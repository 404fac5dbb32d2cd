//! Co-occurrence association graph between nearby nodes.

use std::collections::HashSet;

use super::entry::MemoryNode;

/// Shared distinct tokens over the longer token sequence.
/// `None` when either side has no tokens.
pub fn association_strength(a: &[String], b: &[String]) -> Option<f32> {
    let longest = a.len().max(b.len());
    if a.is_empty() || b.is_empty() {
        return None;
    }
    let left: HashSet<&str> = a.iter().map(String::as_str).collect();
    let right: HashSet<&str> = b.iter().map(String::as_str).collect();
    let shared = left.intersection(&right).count();
    Some(shared as f32 / longest as f32)
}

/// Links every node to up to `window` following nodes in load order.
/// Returns the number of edges written.
pub fn build_windowed(nodes: &mut [MemoryNode], window: usize, threshold: f32) -> usize {
    let mut edges = Vec::new();
    for i in 0..nodes.len() {
        let end = nodes.len().min(i + 1 + window);
        for j in (i + 1)..end {
            if let Some(strength) = strength_above(&nodes[i], &nodes[j], threshold) {
                edges.push((i, j, strength));
            }
        }
    }
    apply(nodes, &edges)
}

/// Links the node at `pos` to up to `window` nodes immediately before it.
pub fn link_recent(nodes: &mut [MemoryNode], pos: usize, window: usize, threshold: f32) -> usize {
    let start = pos.saturating_sub(window);
    let edges: Vec<_> = (start..pos)
        .filter_map(|j| strength_above(&nodes[pos], &nodes[j], threshold).map(|s| (pos, j, s)))
        .collect();
    apply(nodes, &edges)
}

fn strength_above(a: &MemoryNode, b: &MemoryNode, threshold: f32) -> Option<f32> {
    if a.id() == b.id() {
        return None;
    }
    association_strength(a.tokens(), b.tokens()).filter(|&s| s > threshold)
}

fn apply(nodes: &mut [MemoryNode], edges: &[(usize, usize, f32)]) -> usize {
    for &(i, j, strength) in edges {
        let (id_i, id_j) = (nodes[i].id().clone(), nodes[j].id().clone());
        nodes[i].connect(&id_j, strength);
        nodes[j].connect(&id_i, strength);
    }
    edges.len()
}
