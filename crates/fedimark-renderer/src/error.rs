use miette::Diagnostic;
use thiserror::Error;

use crate::ast::NodeKind;

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum SegmentError {
    #[error("document nesting exceeds the segmentation depth limit of {limit}")]
    #[diagnostic(
        code(fedimark::mention::depth_exceeded),
        help("raise `max-depth` in the config if the input is trusted")
    )]
    DepthExceeded { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum RenderError {
    #[error("unhandled node kind: {kind}")]
    #[diagnostic(
        code(fedimark::render::unhandled_kind),
        help("the default rule for `{kind}` is disabled, register an override for it")
    )]
    UnhandledKind { kind: NodeKind },

    #[error("document nesting exceeds the render depth limit of {limit}")]
    #[diagnostic(code(fedimark::render::depth_exceeded))]
    DepthExceeded { limit: usize },
}

/// A math expression the compiler could not turn into markup.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
#[error("invalid math expression: {message}")]
#[diagnostic(code(fedimark::math::invalid))]
pub struct MathError {
    pub message: String,
}

impl MathError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
