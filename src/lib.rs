//! Synthetic financial transaction network with heuristic anomaly detection.
//!
//! A run generates a random directed network of institutions, flags
//! institutions with unusually many counterparties and pairs connected only
//! through long chains of transactions, and renders the network through
//! Graphviz with both kinds of anomaly highlighted.

pub mod config;
pub mod detect;
pub mod error;
pub mod layout;
pub mod network;
pub mod render;

pub use config::RunConfig;
pub use detect::{AnomalyReport, LongPath, detect_high_degree, detect_long_paths};
pub use error::{Error, NetworkError, RenderError, Result};
pub use network::{FinancialNetwork, NodeId, generate_financial_network, seeded_rng};
pub use render::{PathOverlay, RenderConfig, RenderTarget, Rendered, render};

/// Generates the network described by `config` and runs both detectors.
pub fn analyze(config: &RunConfig) -> Result<(FinancialNetwork, AnomalyReport)> {
    let mut rng = seeded_rng(config.seed);
    let network = generate_financial_network(config.num_nodes, config.num_edges, &mut rng)?;
    let report = AnomalyReport::detect(&network, config.degree_threshold, config.max_path_length);
    Ok((network, report))
}
