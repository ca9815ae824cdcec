use crate::detect::{DEFAULT_DEGREE_THRESHOLD, DEFAULT_MAX_PATH_LENGTH};
use crate::render::RenderConfig;

/// Parameters for one generate, detect and render run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub num_nodes: usize,
    pub num_edges: usize,
    pub degree_threshold: usize,
    pub max_path_length: usize,
    /// Seed for network generation; `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub render: RenderConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            num_nodes: 10,
            num_edges: 15,
            degree_threshold: DEFAULT_DEGREE_THRESHOLD,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
            seed: None,
            render: RenderConfig::default(),
        }
    }
}
