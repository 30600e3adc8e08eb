//! KDL configuration for the renderer pipeline.
//!
//! ```kdl
//! skip-mention-parsing false
//! link-children-opaque true
//! origin "https://example.social"
//! max-depth 256
//! style "mention" "pill"
//! ```
//!
//! Unknown nodes and values of the wrong type are skipped with a warning so
//! that an old binary keeps working against a newer config.

use std::collections::BTreeMap;
use std::path::Path;

use fedimark_renderer::{MentionOptions, NodeKind, RenderOptions, StyleTable};
use kdl::{KdlDocument, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};

use crate::error::FedimarkError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub skip_mention_parsing: bool,
    pub link_children_opaque: bool,
    /// Origin treated as in-app when classifying links.
    pub origin: Option<String>,
    /// Applies to both segmentation and rendering.
    pub max_depth: Option<usize>,
    pub styles: BTreeMap<NodeKind, String>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, FedimarkError> {
        let display = path.display().to_string();
        let content =
            std::fs::read_to_string(path).map_err(|e| FedimarkError::io(display.clone(), e))?;
        Self::parse(&content, &display)
    }

    pub fn from_kdl_str(content: &str) -> Result<Self, FedimarkError> {
        Self::parse(content, "<inline>")
    }

    fn parse(content: &str, path: &str) -> Result<Self, FedimarkError> {
        let doc: KdlDocument = content.parse().map_err(|source| FedimarkError::Config {
            path: path.to_string(),
            source,
        })?;

        let mut config = Config::default();
        for node in doc.nodes() {
            config.apply(node);
        }
        tracing::debug!(path, ?config, "loaded config");
        Ok(config)
    }

    fn apply(&mut self, node: &KdlNode) {
        let name = node.name().value();
        let args: Vec<&KdlValue> = node.entries().iter().map(|e| e.value()).collect();
        match name {
            "skip-mention-parsing" => {
                if let Some(flag) = flag(name, &args) {
                    self.skip_mention_parsing = flag;
                }
            }
            "link-children-opaque" => {
                if let Some(flag) = flag(name, &args) {
                    self.link_children_opaque = flag;
                }
            }
            "origin" => match args.first().and_then(|v| v.as_string()) {
                Some(origin) => self.origin = Some(origin.to_string()),
                None => tracing::warn!(node = name, "expected a string, ignoring"),
            },
            "max-depth" => match args
                .first()
                .and_then(|v| v.as_i64())
                .and_then(|depth| usize::try_from(depth).ok())
                .filter(|depth| *depth > 0)
            {
                Some(depth) => self.max_depth = Some(depth),
                None => tracing::warn!(node = name, "expected a positive integer, ignoring"),
            },
            "style" => {
                let (Some(kind), Some(style)) = (
                    args.first().and_then(|v| v.as_string()),
                    args.get(1).and_then(|v| v.as_string()),
                ) else {
                    tracing::warn!(node = name, "expected `style \"<kind>\" \"<value>\"`, ignoring");
                    return;
                };
                match kind.parse::<NodeKind>() {
                    Ok(kind) => {
                        self.styles.insert(kind, style.to_string());
                    }
                    Err(err) => tracing::warn!(node = name, %err, "ignoring style"),
                }
            }
            other => tracing::warn!(node = other, "unknown config node, ignoring"),
        }
    }

    pub fn mention_options(&self) -> MentionOptions {
        let defaults = MentionOptions::default();
        MentionOptions {
            skip_mention_parsing: self.skip_mention_parsing,
            treat_link_children_as_opaque: self.link_children_opaque,
            max_depth: self.max_depth.unwrap_or(defaults.max_depth),
        }
    }

    /// Render options carrying everything a config file can express.
    /// Overrides are code, so the result has none.
    pub fn render_options<E>(&self) -> RenderOptions<E> {
        let mut options = RenderOptions::default();
        if let Some(origin) = &self.origin {
            options = options.with_origin(origin.clone());
        }
        if let Some(depth) = self.max_depth {
            options.max_depth = depth;
        }
        let styles = self
            .styles
            .iter()
            .fold(StyleTable::default(), |table, (kind, style)| {
                table.with(*kind, style.as_str())
            });
        options.with_styles(styles)
    }
}

/// A bare flag node means `true`.
fn flag(name: &str, args: &[&KdlValue]) -> Option<bool> {
    match args.first() {
        None => Some(true),
        Some(value) => {
            let flag = value.as_bool();
            if flag.is_none() {
                tracing::warn!(node = name, "expected a boolean, ignoring");
            }
            flag
        }
    }
}
