//! Synthetic transaction network between financial institutions.
//!
//! Institutions are nodes of a directed petgraph graph; transactions are edges
//! carrying an amount. Each ordered (source, target) pair holds at most one
//! transaction: recording the same pair again overwrites its amount, so a
//! network generated from `n` draws may hold fewer than `n` edges.

use petgraph::Direction;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use tracing::{debug, trace};

use crate::error::NetworkError;

/// Dense 0-based institution id, equal to the petgraph node index.
pub type NodeId = usize;

pub const MIN_AMOUNT: u32 = 100;
pub const MAX_AMOUNT: u32 = 10_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Institution {
    pub name: String,
}

impl Institution {
    /// Institutions are named `Inst_1`, `Inst_2`, ... after their id.
    pub fn for_id(id: NodeId) -> Self {
        Self {
            name: format!("Inst_{}", id + 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transaction {
    pub amount: u32,
}

#[derive(Debug, Clone, Default)]
pub struct FinancialNetwork {
    graph: DiGraph<Institution, Transaction>,
}

impl FinancialNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `count` institutions with no transactions between them.
    pub fn with_institutions(count: usize) -> Self {
        let mut network = Self {
            graph: DiGraph::with_capacity(count, 0),
        };
        for _ in 0..count {
            network.add_institution();
        }
        network
    }

    pub fn add_institution(&mut self) -> NodeId {
        let id = self.graph.node_count();
        self.graph.add_node(Institution::for_id(id)).index()
    }

    /// Records a transaction from `source` to `target`.
    ///
    /// If the pair already carries a transaction its amount is replaced and
    /// the previous amount is returned.
    pub fn record_transaction(
        &mut self,
        source: NodeId,
        target: NodeId,
        amount: u32,
    ) -> Result<Option<u32>, NetworkError> {
        let from = self.index_of(source)?;
        let to = self.index_of(target)?;

        if let Some(edge) = self.graph.find_edge(from, to) {
            let previous = std::mem::replace(&mut self.graph[edge].amount, amount);
            trace!(source, target, previous, amount, "overwrote transaction");
            return Ok(Some(previous));
        }

        self.graph.add_edge(from, to, Transaction { amount });
        Ok(None)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Institution ids in insertion order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices().map(NodeIndex::index)
    }

    pub fn institution(&self, id: NodeId) -> Option<&Institution> {
        self.graph.node_weight(NodeIndex::new(id))
    }

    /// All transactions as `(source, target, amount)`, in insertion order.
    pub fn transactions(&self) -> impl Iterator<Item = (NodeId, NodeId, u32)> + '_ {
        self.graph
            .edge_references()
            .map(|edge| (edge.source().index(), edge.target().index(), edge.weight().amount))
    }

    /// The amount on the direct edge `source -> target`, if any.
    pub fn transaction(&self, source: NodeId, target: NodeId) -> Option<u32> {
        self.find_edge(source, target).map(|edge| self.graph[edge].amount)
    }

    /// In-degree plus out-degree. Counts distinct neighbor-direction
    /// relationships since pairs are never duplicated.
    pub fn degree(&self, id: NodeId) -> usize {
        let node = NodeIndex::new(id);
        self.graph.edges_directed(node, Direction::Outgoing).count()
            + self.graph.edges_directed(node, Direction::Incoming).count()
    }

    pub fn graph(&self) -> &DiGraph<Institution, Transaction> {
        &self.graph
    }

    pub(crate) fn find_edge(&self, source: NodeId, target: NodeId) -> Option<EdgeIndex> {
        if source >= self.node_count() || target >= self.node_count() {
            return None;
        }
        self.graph
            .find_edge(NodeIndex::new(source), NodeIndex::new(target))
    }

    fn index_of(&self, id: NodeId) -> Result<NodeIndex, NetworkError> {
        if id < self.graph.node_count() {
            Ok(NodeIndex::new(id))
        } else {
            Err(NetworkError::UnknownInstitution(id))
        }
    }
}

/// Builds an RNG from `seed`, or from OS entropy when no seed is given.
pub fn seeded_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Generates `num_nodes` institutions and `num_edges` random transactions.
///
/// Each draw picks two distinct institutions without replacement and an
/// amount in `MIN_AMOUNT..=MAX_AMOUNT`. Repeated pairs overwrite earlier
/// amounts.
pub fn generate_financial_network<R: Rng + ?Sized>(
    num_nodes: usize,
    num_edges: usize,
    rng: &mut R,
) -> Result<FinancialNetwork, NetworkError> {
    if num_nodes < 2 {
        return Err(NetworkError::TooFewInstitutions {
            requested: num_nodes,
        });
    }

    let mut network = FinancialNetwork::with_institutions(num_nodes);
    for _ in 0..num_edges {
        let pair = index::sample(rng, num_nodes, 2);
        let (source, target) = (pair.index(0), pair.index(1));
        let amount = rng.gen_range(MIN_AMOUNT..=MAX_AMOUNT);
        network.record_transaction(source, target, amount)?;
    }

    debug!(
        institutions = num_nodes,
        draws = num_edges,
        transactions = network.edge_count(),
        "generated financial network"
    );
    Ok(network)
}
