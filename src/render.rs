//! Rendering of the network with its anomalies highlighted.
//!
//! The network is laid out with [`spring_layout`] and written as a Graphviz
//! DOT document with every node position pinned. `neato -n2` then turns the
//! document into an image without moving any node.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, EdgeReference, NodeIndex};
use petgraph::visit::EdgeRef;
use tracing::{debug, info};

use crate::detect::{LongPath, shortest_path};
use crate::error::RenderError;
use crate::layout::{Layout, LayoutConfig, spring_layout};
use crate::network::{FinancialNetwork, Institution, NodeId, Transaction, seeded_rng};

pub const DEFAULT_TITLE: &str = "Financial Network with Anomaly Detection";

const POINTS_PER_INCH: f64 = 72.0;

const NODE_COLOR: &str = "lightblue";
const HIGH_DEGREE_COLOR: &str = "red";
const EDGE_COLOR: &str = "gray";
const LONG_PATH_COLOR: &str = "orange";

/// Where the rendered figure goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderTarget {
    /// Render a PNG to `image` and open it with the platform viewer.
    Window { image: PathBuf },
    /// Render to `path` in the given Graphviz output format (`png`, `svg`, `dot`, ...).
    File { path: PathBuf, format: String },
    /// Build the DOT document only.
    Headless,
}

impl Default for RenderTarget {
    fn default() -> Self {
        RenderTarget::Window {
            image: env::temp_dir().join("financial_network.png"),
        }
    }
}

/// Which edges a flagged long path highlights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathOverlay {
    /// The direct `source -> target` edge, when one exists. Pairs without a
    /// direct edge highlight nothing.
    #[default]
    DirectEdge,
    /// Every edge along one shortest `source -> target` path.
    ShortestPath,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    pub target: RenderTarget,
    pub title: String,
    /// Figure size in inches.
    pub width: f64,
    pub height: f64,
    pub layout: LayoutConfig,
    pub overlay: PathOverlay,
    /// Graphviz layout engine invoked for non-headless targets.
    pub engine: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            target: RenderTarget::default(),
            title: DEFAULT_TITLE.to_string(),
            width: 12.0,
            height: 8.0,
            layout: LayoutConfig::default(),
            overlay: PathOverlay::default(),
            engine: "neato".to_string(),
        }
    }
}

impl RenderConfig {
    pub fn headless() -> Self {
        Self {
            target: RenderTarget::Headless,
            ..Self::default()
        }
    }
}

/// Artifacts of one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub dot: String,
    /// The image written to disk, if the target produced one.
    pub image: Option<PathBuf>,
}

pub fn render(
    network: &FinancialNetwork,
    high_degree: &[NodeId],
    long_paths: &[LongPath],
    config: &RenderConfig,
) -> Result<Rendered, RenderError> {
    let layout = spring_layout(
        network,
        config.layout.iterations,
        &mut seeded_rng(config.layout.seed),
    );
    let dot = network_to_dot(network, &layout, high_degree, long_paths, config);

    let image = match &config.target {
        RenderTarget::Headless => None,
        RenderTarget::File { path, format } => {
            write_image(&dot, path, format, &config.engine)?;
            Some(path.clone())
        }
        RenderTarget::Window { image } => {
            write_image(&dot, image, "png", &config.engine)?;
            open_image(image)?;
            Some(image.clone())
        }
    };

    Ok(Rendered { dot, image })
}

/// Builds the DOT document: base style, anomaly overlay, pinned positions.
pub fn network_to_dot(
    network: &FinancialNetwork,
    layout: &Layout,
    high_degree: &[NodeId],
    long_paths: &[LongPath],
    config: &RenderConfig,
) -> String {
    let flagged: HashSet<NodeId> = high_degree.iter().copied().collect();
    let highlighted = highlighted_edges(network, long_paths, config.overlay);
    debug!(
        nodes = flagged.len(),
        edges = highlighted.len(),
        "anomaly overlay"
    );

    let width_pt = config.width * POINTS_PER_INCH;
    let height_pt = config.height * POINTS_PER_INCH;

    let node_attrs = |_: &DiGraph<Institution, Transaction>,
                      (index, institution): (NodeIndex, &Institution)|
     -> String {
        let id = index.index();
        let [x, y] = layout.position(id).unwrap_or([0.0, 0.0]);
        let color = if flagged.contains(&id) {
            HIGH_DEGREE_COLOR
        } else {
            NODE_COLOR
        };
        format!(
            "label=\"{}\", tooltip=\"{}\", style=filled, fillcolor=\"{}\", pos=\"{:.1},{:.1}!\"",
            id,
            institution.name,
            color,
            (x + 1.0) / 2.0 * width_pt,
            (y + 1.0) / 2.0 * height_pt,
        )
    };
    let edge_attrs =
        |_: &DiGraph<Institution, Transaction>, edge: EdgeReference<Transaction>| -> String {
            let pair = (edge.source().index(), edge.target().index());
            if highlighted.contains(&pair) {
                format!(
                    "label=\"{}\", color=\"{}\", penwidth=2",
                    edge.weight().amount,
                    LONG_PATH_COLOR
                )
            } else {
                format!(
                    "label=\"{}\", color=\"{}\"",
                    edge.weight().amount,
                    EDGE_COLOR
                )
            }
        };

    let dot = Dot::with_attr_getters(
        network.graph(),
        &[
            Config::NodeNoLabel,
            Config::EdgeNoLabel,
            Config::GraphContentOnly,
        ],
        &edge_attrs,
        &node_attrs,
    );

    format!(
        "digraph {{\n    label=\"{}\";\n    labelloc=t;\n    size=\"{},{}!\";\n    node [shape=circle, fixedsize=true, width=0.5];\n{:?}}}\n",
        escape_label(&config.title),
        config.width,
        config.height,
        dot
    )
}

/// Escapes `"` and `\` for use inside a quoted DOT string.
fn escape_label(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn highlighted_edges(
    network: &FinancialNetwork,
    long_paths: &[LongPath],
    overlay: PathOverlay,
) -> HashSet<(NodeId, NodeId)> {
    match overlay {
        PathOverlay::DirectEdge => long_paths
            .iter()
            .map(|&(source, target, _)| (source, target))
            .filter(|&(source, target)| network.transaction(source, target).is_some())
            .collect(),
        PathOverlay::ShortestPath => long_paths
            .iter()
            .filter_map(|&(source, target, _)| shortest_path(network, source, target))
            .flat_map(|path| {
                path.windows(2)
                    .map(|hop| (hop[0], hop[1]))
                    .collect::<Vec<_>>()
            })
            .collect(),
    }
}

fn write_image(dot: &str, path: &Path, format: &str, engine: &str) -> Result<(), RenderError> {
    if format == "dot" {
        return fs::write(path, dot).map_err(|source| RenderError::Io {
            path: path.to_path_buf(),
            source,
        });
    }

    // DOT goes in on stdin so nothing but `path` lands on disk.
    let mut child = Command::new(engine)
        .arg("-n2")
        .arg(format!("-T{format}"))
        .arg("-o")
        .arg(path)
        .stdin(Stdio::piped())
        .spawn()
        .map_err(|source| RenderError::Launch {
            program: engine.to_string(),
            source,
        })?;

    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(dot.as_bytes()),
        None => Ok(()),
    };
    let status = child.wait().map_err(|source| RenderError::Launch {
        program: engine.to_string(),
        source,
    })?;
    if !status.success() {
        return Err(RenderError::CommandFailed {
            program: engine.to_string(),
            status,
        });
    }
    written.map_err(|source| RenderError::Pipe {
        program: engine.to_string(),
        source,
    })?;

    info!(image = %path.display(), "rendered network");
    Ok(())
}

fn open_image(image: &Path) -> Result<(), RenderError> {
    let mut command = if cfg!(target_os = "windows") {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]);
        command
    } else if cfg!(target_os = "macos") {
        Command::new("open")
    } else {
        Command::new("xdg-open")
    };
    let program = command.get_program().to_string_lossy().into_owned();

    let status = command
        .arg(image)
        .status()
        .map_err(|source| RenderError::Launch {
            program: program.clone(),
            source,
        })?;
    if !status.success() {
        return Err(RenderError::CommandFailed { program, status });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{detect_high_degree, detect_long_paths};

    fn seeded_config() -> RenderConfig {
        RenderConfig {
            layout: LayoutConfig {
                seed: Some(17),
                ..LayoutConfig::default()
            },
            ..RenderConfig::headless()
        }
    }

    /// A single chain 0 -> 1 -> 2 -> 3 -> 4.
    fn path_network() -> FinancialNetwork {
        let mut network = FinancialNetwork::with_institutions(5);
        for (s, t, amount) in [(0, 1, 110), (1, 2, 220), (2, 3, 330), (3, 4, 440)] {
            network.record_transaction(s, t, amount).unwrap();
        }
        network
    }

    #[test]
    fn test_headless_render_writes_nothing() {
        let network = path_network();
        let rendered = render(&network, &[], &[], &seeded_config()).unwrap();
        assert!(rendered.image.is_none());
        assert!(rendered.dot.starts_with("digraph {"));
        assert!(rendered.dot.contains(DEFAULT_TITLE));
        assert!(rendered.dot.contains("size=\"12,8!\""));
    }

    #[test]
    fn test_dot_styles_nodes_and_labels_amounts() {
        let network = path_network();
        let rendered = render(&network, &[1, 3], &[], &seeded_config()).unwrap();
        let dot = rendered.dot;

        assert_eq!(dot.matches("fillcolor=\"red\"").count(), 2);
        assert_eq!(dot.matches("fillcolor=\"lightblue\"").count(), 3);
        assert!(dot.contains("tooltip=\"Inst_1\""));
        assert!(dot.contains("tooltip=\"Inst_5\""));
        for amount in [110, 220, 330, 440] {
            assert!(dot.contains(&format!("label=\"{amount}\"")));
        }
        assert_eq!(dot.matches("color=\"gray\"").count(), 4);
        assert!(!dot.contains("orange"));
    }

    #[test]
    fn test_direct_edge_overlay_needs_direct_edge() {
        let mut network = path_network();
        let long_paths = detect_long_paths(&network, 3);
        assert_eq!(long_paths, vec![(0, 4, 4)]);

        let dot = render(&network, &[], &long_paths, &seeded_config())
            .unwrap()
            .dot;
        assert!(!dot.contains("orange"));

        network.record_transaction(0, 4, 999).unwrap();
        let dot = render(&network, &[], &[(0, 4, 4)], &seeded_config())
            .unwrap()
            .dot;
        assert_eq!(dot.matches("color=\"orange\", penwidth=2").count(), 1);
        assert!(dot.contains("0 -> 4 [ label=\"999\", color=\"orange\""));
    }

    #[test]
    fn test_shortest_path_overlay_traces_hops() {
        let network = path_network();
        let long_paths = detect_long_paths(&network, 3);
        let config = RenderConfig {
            overlay: PathOverlay::ShortestPath,
            ..seeded_config()
        };
        let dot = render(&network, &[], &long_paths, &config).unwrap().dot;
        assert_eq!(dot.matches("color=\"orange\", penwidth=2").count(), 4);
    }

    #[test]
    fn test_render_without_edges() {
        let network = FinancialNetwork::with_institutions(4);
        let high_degree = detect_high_degree(&network, 3);
        let long_paths = detect_long_paths(&network, 3);
        let rendered = render(&network, &high_degree, &long_paths, &seeded_config()).unwrap();
        assert!(!rendered.dot.contains("->"));
        assert_eq!(rendered.dot.matches("fillcolor=\"lightblue\"").count(), 4);
    }

    #[test]
    fn test_seeded_render_is_reproducible() {
        let network = path_network();
        let a = render(&network, &[2], &[], &seeded_config()).unwrap();
        let b = render(&network, &[2], &[], &seeded_config()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_file_target_writes_dot_format() {
        let path = env::temp_dir().join(format!("financial_network_{}.dot", std::process::id()));
        let config = RenderConfig {
            target: RenderTarget::File {
                path: path.clone(),
                format: "dot".to_string(),
            },
            ..seeded_config()
        };
        let rendered = render(&path_network(), &[], &[], &config).unwrap();

        assert_eq!(rendered.image.as_deref(), Some(path.as_path()));
        assert_eq!(fs::read_to_string(&path).unwrap(), rendered.dot);
        fs::remove_file(&path).unwrap();
    }

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!(
            "financial_network_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn entries(dir: &Path) -> Vec<PathBuf> {
        let mut found: Vec<_> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect();
        found.sort();
        found
    }

    #[cfg(unix)]
    #[test]
    fn test_file_target_creates_only_the_image() {
        use std::os::unix::fs::PermissionsExt;

        // Stand-in engine: copies stdin to the `-o` argument.
        let bin = scratch_dir("engine");
        let engine = bin.join("fake-neato");
        fs::write(&engine, "#!/bin/sh\ncat > \"$4\"\n").unwrap();
        fs::set_permissions(&engine, fs::Permissions::from_mode(0o755)).unwrap();

        let out = scratch_dir("image");
        let path = out.join("network.svg");
        let config = RenderConfig {
            target: RenderTarget::File {
                path: path.clone(),
                format: "svg".to_string(),
            },
            engine: engine.to_string_lossy().into_owned(),
            ..seeded_config()
        };
        let rendered = render(&path_network(), &[], &[], &config).unwrap();

        assert_eq!(entries(&out), vec![path.clone()]);
        assert_eq!(fs::read_to_string(&path).unwrap(), rendered.dot);
        fs::remove_dir_all(&out).unwrap();
        fs::remove_dir_all(&bin).unwrap();
    }

    #[test]
    fn test_missing_engine_leaves_no_files() {
        let out = scratch_dir("missing_engine");
        let config = RenderConfig {
            target: RenderTarget::File {
                path: out.join("network.png"),
                format: "png".to_string(),
            },
            engine: "no-such-graphviz-engine".to_string(),
            ..seeded_config()
        };
        let err = render(&path_network(), &[], &[], &config).unwrap_err();

        assert!(matches!(
            err,
            RenderError::Launch { ref program, .. } if program == "no-such-graphviz-engine"
        ));
        assert!(entries(&out).is_empty());
        fs::remove_dir_all(&out).unwrap();
    }

    #[test]
    fn test_title_is_escaped() {
        let config = RenderConfig {
            title: r#"Flows "Q3" C:\ledger"#.to_string(),
            ..seeded_config()
        };
        let dot = render(&path_network(), &[], &[], &config).unwrap().dot;
        assert!(dot.contains(r#"label="Flows \"Q3\" C:\\ledger";"#));
    }
}
