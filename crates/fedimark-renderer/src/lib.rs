//! Fedimark renderer
//!
//! Turns a parsed markdown tree into host UI elements. Text leaves are first
//! split into plain text and `@user` / `@user@host` mention nodes by
//! [`mention::segment`]; [`render::TreeRenderer`] then maps every node kind to
//! an element through a caller-overridable rule table.
//!
//! ```text
//! markdown --parse--> Node --segment--> Node --render--> [UiElement] --> HTML / JSON
//! ```

pub mod ast;
pub mod element;
pub mod error;
pub mod math;
pub mod mention;
pub mod parse;
pub mod render;

pub use ast::{Align, Node, NodeKind, UnknownNode};
pub use element::{Attributes, Content, ElementBuilder, ElementTag, UiElement, UiTreeBuilder};
pub use error::{MathError, RenderError, SegmentError};
pub use math::{LatexMathCompiler, MathCompiler};
pub use mention::{MentionOptions, segment};
pub use parse::{ParseOptions, parse_markdown};
pub use render::{RenderOptions, StyleTable, TreeRenderer, render};
