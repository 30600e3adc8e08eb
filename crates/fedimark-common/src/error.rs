//! Error types for the fedimark tools

use fedimark_renderer::{RenderError, SegmentError};
use miette::Diagnostic;

/// Main error type for fedimark operations
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum FedimarkError {
    /// Reading an input or config file failed
    #[error("could not read {path}")]
    #[diagnostic(code(fedimark::io))]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Input was not a valid mdast JSON tree, or output could not be encoded
    #[error(transparent)]
    #[diagnostic(code(fedimark::json))]
    Json(#[from] serde_json::Error),

    /// Config file is not valid KDL
    #[error("invalid config file {path}")]
    #[diagnostic(
        code(fedimark::config),
        help("config files are KDL documents, e.g. `origin \"https://example.social\"`")
    )]
    Config {
        path: String,
        #[source]
        source: kdl::KdlError,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Segment(#[from] SegmentError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Render(#[from] RenderError),
}

impl FedimarkError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
