//! Heuristic anomaly detectors over a [`FinancialNetwork`].
//!
//! Both detectors are pure functions of the network snapshot: calling them
//! twice on the same network yields identical output.

use std::fmt;

use petgraph::algo::{astar, dijkstra};
use petgraph::graph::NodeIndex;
use rayon::prelude::*;
use tracing::debug;

use crate::network::{FinancialNetwork, NodeId};

pub const DEFAULT_DEGREE_THRESHOLD: usize = 3;
pub const DEFAULT_MAX_PATH_LENGTH: usize = 3;

/// `(source, target, shortest path length in hops)`.
pub type LongPath = (NodeId, NodeId, usize);

/// Institutions whose total degree is strictly greater than `threshold`,
/// in increasing id order.
pub fn detect_high_degree(network: &FinancialNetwork, threshold: usize) -> Vec<NodeId> {
    let anomalies: Vec<NodeId> = network
        .node_ids()
        .filter(|&id| network.degree(id) > threshold)
        .collect();
    debug!(threshold, flagged = anomalies.len(), "high-degree scan");
    anomalies
}

/// Ordered pairs whose shortest directed path is longer than `max_length` hops.
///
/// Unreachable pairs are skipped. Output is sorted by source, then target.
pub fn detect_long_paths(network: &FinancialNetwork, max_length: usize) -> Vec<LongPath> {
    let graph = network.graph();

    // One unit-cost traversal per source; collected in source order.
    let per_source: Vec<Vec<LongPath>> = (0..network.node_count())
        .into_par_iter()
        .map(|source| {
            let distances = dijkstra(graph, NodeIndex::new(source), None, |_| 1usize);
            let mut found: Vec<LongPath> = distances
                .into_iter()
                .map(|(target, length)| (source, target.index(), length))
                .filter(|&(source, target, length)| source != target && length > max_length)
                .collect();
            found.sort_unstable_by_key(|&(_, target, _)| target);
            found
        })
        .collect();

    let long_paths: Vec<LongPath> = per_source.into_iter().flatten().collect();
    debug!(max_length, flagged = long_paths.len(), "long-path scan");
    long_paths
}

/// One shortest directed path from `source` to `target`, endpoints included.
pub fn shortest_path(
    network: &FinancialNetwork,
    source: NodeId,
    target: NodeId,
) -> Option<Vec<NodeId>> {
    if source >= network.node_count() || target >= network.node_count() {
        return None;
    }
    let goal = NodeIndex::new(target);
    astar(
        network.graph(),
        NodeIndex::new(source),
        |node| node == goal,
        |_| 1usize,
        |_| 0,
    )
    .map(|(_, path)| path.into_iter().map(NodeIndex::index).collect())
}

/// Output of both detectors for one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnomalyReport {
    pub high_degree: Vec<NodeId>,
    pub long_paths: Vec<LongPath>,
    pub max_length: usize,
}

impl AnomalyReport {
    pub fn detect(network: &FinancialNetwork, threshold: usize, max_length: usize) -> Self {
        Self {
            high_degree: detect_high_degree(network, threshold),
            long_paths: detect_long_paths(network, max_length),
            max_length,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.high_degree.is_empty() && self.long_paths.is_empty()
    }
}

impl fmt::Display for AnomalyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "High-degree anomalies (excessive clustering): {:?}",
            self.high_degree
        )?;
        write!(
            f,
            "Long transaction paths (length > {}): {:?}",
            self.max_length, self.long_paths
        )
    }
}
