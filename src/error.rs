use std::path::PathBuf;
use std::process::ExitStatus;

use thiserror::Error;

use crate::network::NodeId;

/// Errors raised while building a [`FinancialNetwork`](crate::network::FinancialNetwork).
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Drawing two distinct endpoints needs at least two institutions.
    #[error("a transaction network needs at least 2 institutions, got {requested}")]
    TooFewInstitutions { requested: usize },

    #[error("no institution with id {0}")]
    UnknownInstitution(NodeId),
}

/// Errors raised while rendering the network figure.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to stream DOT into `{program}`: {source}")]
    Pipe {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}")]
    CommandFailed { program: String, status: ExitStatus },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
