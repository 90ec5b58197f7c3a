//! Text rendering for the three report shapes the CLI emits.
//!
//! The data types carry everything needed to reproduce these listings, so a
//! different presentation layer can format them its own way; this module is
//! the reference rendering.

use crate::sample::{AdjacencySample, SmallGraph};
use crate::stats::GraphStats;

/// One-line structural summary.
pub fn summary_line(stats: &GraphStats, weak_threshold: u32) -> String {
    format!(
        "Graph structure summary: total_nodes={} active={} frozen={} total_edges={} \
         degree_min={} degree_avg={} degree_max={} weak_count(deg<{})={} entry_point={}",
        stats.total_nodes,
        stats.active_nodes,
        stats.frozen_nodes,
        stats.total_edges,
        stats.degree_min,
        stats.degree_avg,
        stats.degree_max,
        weak_threshold,
        stats.weak_count,
        stats.entry_point,
    )
}

/// Bounded adjacency listing: one `id: [n1, n2, ... (K total)]` line per
/// sampled node.
pub fn adjacency_listing(sample: &AdjacencySample) -> String {
    let mut out = format!(
        "Adjacency sample (first {} nodes, entry_point={}):\n",
        sample.requested, sample.entry_point
    );
    for node in &sample.nodes {
        out.push_str(&format!("  {}: [", node.id));
        out.push_str(&join_ids(&node.neighbors));
        if node.degree as usize > node.neighbors.len() {
            out.push_str(&format!(", ... ({} total)", node.degree));
        }
        out.push_str("]\n");
    }
    out
}

/// Forward plus referenced-by listing over the small-graph window, with the
/// forward side capped at `max_neighbors` ids per node (`0` = uncapped).
pub fn small_graph_listing(graph: &SmallGraph, max_neighbors: usize) -> String {
    let mut out = format!(
        "Small graph (first {} nodes, entry_point={}): out-neighbors and referenced_by within sample\n",
        graph.len(),
        graph.entry_point
    );
    for (id, neighbors) in graph.out_neighbors.iter().enumerate() {
        let shown = if max_neighbors > 0 && neighbors.len() > max_neighbors {
            max_neighbors
        } else {
            neighbors.len()
        };
        out.push_str(&format!("  {id}: out ["));
        out.push_str(&join_ids(&neighbors[..shown]));
        if neighbors.len() > shown {
            out.push_str(&format!(", ... ({} total)", neighbors.len()));
        }
        out.push_str("]  referenced_by [");
        out.push_str(&join_ids(&graph.referenced_by[id]));
        out.push_str("]\n");
    }
    out
}

fn join_ids(ids: &[u32]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
