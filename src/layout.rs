//! Fruchterman-Reingold spring layout.
//!
//! Nodes repel each other with force `k^2 / d` and transactions pull their
//! endpoints together with force `d^2 / k`, where `k = 1 / sqrt(n)`. The
//! final positions are centred on the origin and scaled into `[-1, 1]`.

use std::collections::HashSet;

use petgraph::graph::NodeIndex;
use rand::Rng;
use rayon::prelude::*;

use crate::network::{FinancialNetwork, NodeId};

/// Distances are clamped to this to keep coincident nodes finite.
const MIN_DISTANCE: f64 = 0.01;

#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub iterations: usize,
    /// Fixed seed for the initial positions; `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            iterations: 50,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    positions: Vec<[f64; 2]>,
}

impl Layout {
    pub fn position(&self, id: NodeId) -> Option<[f64; 2]> {
        self.positions.get(id).copied()
    }

    pub fn positions(&self) -> &[[f64; 2]] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

pub fn spring_layout<R: Rng + ?Sized>(
    network: &FinancialNetwork,
    iterations: usize,
    rng: &mut R,
) -> Layout {
    let n = network.node_count();
    match n {
        0 => return Layout { positions: Vec::new() },
        1 => return Layout { positions: vec![[0.0, 0.0]] },
        _ => {}
    }

    let linked = neighbor_sets(network);

    let mut positions: Vec<[f64; 2]> = (0..n)
        .map(|_| [rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0)])
        .collect();
    let k = (1.0 / n as f64).sqrt();
    let mut temperature = 0.1 * span(&positions);
    let cooling = temperature / (iterations as f64 + 1.0);

    for _ in 0..iterations {
        let displacement: Vec<[f64; 2]> = (0..n)
            .into_par_iter()
            .map(|i| {
                let mut total = [0.0, 0.0];
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let dx = positions[i][0] - positions[j][0];
                    let dy = positions[i][1] - positions[j][1];
                    let distance = dx.hypot(dy).max(MIN_DISTANCE);
                    let attraction = if linked[i].contains(&j) {
                        distance / k
                    } else {
                        0.0
                    };
                    let factor = k * k / (distance * distance) - attraction;
                    total[0] += dx * factor;
                    total[1] += dy * factor;
                }
                total
            })
            .collect();

        for (position, delta) in positions.iter_mut().zip(&displacement) {
            let length = delta[0].hypot(delta[1]).max(MIN_DISTANCE);
            position[0] += delta[0] * temperature / length;
            position[1] += delta[1] * temperature / length;
        }
        temperature -= cooling;
    }

    rescale(&mut positions);
    Layout { positions }
}

/// Undirected neighbors of every node; edges attract regardless of direction.
fn neighbor_sets(network: &FinancialNetwork) -> Vec<HashSet<NodeId>> {
    network
        .node_ids()
        .map(|id| {
            network
                .graph()
                .neighbors_undirected(NodeIndex::new(id))
                .map(NodeIndex::index)
                .collect()
        })
        .collect()
}

/// Largest extent of the point cloud along either axis.
fn span(positions: &[[f64; 2]]) -> f64 {
    (0..2)
        .map(|axis| {
            let (lo, hi) = positions
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
                    (lo.min(p[axis]), hi.max(p[axis]))
                });
            hi - lo
        })
        .fold(0.0, f64::max)
}

fn rescale(positions: &mut [[f64; 2]]) {
    let n = positions.len() as f64;
    let mean = positions
        .iter()
        .fold([0.0, 0.0], |acc, p| [acc[0] + p[0] / n, acc[1] + p[1] / n]);
    for p in positions.iter_mut() {
        p[0] -= mean[0];
        p[1] -= mean[1];
    }
    let limit = positions
        .iter()
        .flat_map(|p| [p[0].abs(), p[1].abs()])
        .fold(0.0, f64::max);
    if limit > 0.0 {
        for p in positions.iter_mut() {
            p[0] /= limit;
            p[1] /= limit;
        }
    }
}
