//! Document tree
//!
//! The node shape follows the mdast JSON layout: every node carries a `type`
//! tag, structural nodes carry `children`, leaves carry a `value`. Positions and
//! other fields the renderer does not need are dropped on input.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Column alignment of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Center,
    Right,
}

impl Align {
    pub fn as_str(&self) -> &'static str {
        match self {
            Align::Left => "left",
            Align::Center => "center",
            Align::Right => "right",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Node {
    Root {
        #[serde(default)]
        children: Vec<Node>,
    },
    Paragraph {
        #[serde(default)]
        children: Vec<Node>,
    },
    Text {
        value: String,
    },
    Heading {
        #[serde(default)]
        depth: u32,
        #[serde(default)]
        children: Vec<Node>,
    },
    Emphasis {
        #[serde(default)]
        children: Vec<Node>,
    },
    Strong {
        #[serde(default)]
        children: Vec<Node>,
    },
    InlineCode {
        value: String,
    },
    Code {
        value: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lang: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        meta: Option<String>,
    },
    Blockquote {
        #[serde(default)]
        children: Vec<Node>,
    },
    List {
        #[serde(default)]
        ordered: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        spread: Option<bool>,
        #[serde(default)]
        children: Vec<Node>,
    },
    ListItem {
        /// `None` when the item is not a task, otherwise whether it is ticked.
        #[serde(default)]
        checked: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        spread: Option<bool>,
        #[serde(default)]
        children: Vec<Node>,
    },
    ThematicBreak,
    Break,
    Link {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default)]
        children: Vec<Node>,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt: Option<String>,
    },
    Table {
        #[serde(default)]
        align: Vec<Option<Align>>,
        #[serde(default)]
        children: Vec<Node>,
    },
    TableRow {
        #[serde(default)]
        children: Vec<Node>,
    },
    TableCell {
        #[serde(default)]
        children: Vec<Node>,
    },
    Delete {
        #[serde(default)]
        children: Vec<Node>,
    },
    Html {
        value: String,
    },
    Mention {
        value: String,
    },
    InlineMath {
        value: String,
    },
    Math {
        value: String,
    },
    /// Anything the tokenizer produced that is not one of the kinds above.
    #[serde(untagged)]
    Unknown(UnknownNode),
}

/// A node with a `type` tag this crate does not know about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnknownNode {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Node {
    pub fn root(children: Vec<Node>) -> Self {
        Node::Root { children }
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Node::Paragraph { children }
    }

    pub fn text(value: impl Into<String>) -> Self {
        Node::Text {
            value: value.into(),
        }
    }

    pub fn mention(value: impl Into<String>) -> Self {
        Node::Mention {
            value: value.into(),
        }
    }

    pub fn heading(depth: u32, children: Vec<Node>) -> Self {
        Node::Heading { depth, children }
    }

    pub fn link(url: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Link {
            url: url.into(),
            title: None,
            children,
        }
    }

    /// The known kind of this node, `None` for [`Node::Unknown`].
    pub fn kind(&self) -> Option<NodeKind> {
        Some(match self {
            Node::Root { .. } => NodeKind::Root,
            Node::Paragraph { .. } => NodeKind::Paragraph,
            Node::Text { .. } => NodeKind::Text,
            Node::Heading { .. } => NodeKind::Heading,
            Node::Emphasis { .. } => NodeKind::Emphasis,
            Node::Strong { .. } => NodeKind::Strong,
            Node::InlineCode { .. } => NodeKind::InlineCode,
            Node::Code { .. } => NodeKind::Code,
            Node::Blockquote { .. } => NodeKind::Blockquote,
            Node::List { .. } => NodeKind::List,
            Node::ListItem { .. } => NodeKind::ListItem,
            Node::ThematicBreak => NodeKind::ThematicBreak,
            Node::Break => NodeKind::Break,
            Node::Link { .. } => NodeKind::Link,
            Node::Image { .. } => NodeKind::Image,
            Node::Table { .. } => NodeKind::Table,
            Node::TableRow { .. } => NodeKind::TableRow,
            Node::TableCell { .. } => NodeKind::TableCell,
            Node::Delete { .. } => NodeKind::Delete,
            Node::Html { .. } => NodeKind::Html,
            Node::Mention { .. } => NodeKind::Mention,
            Node::InlineMath { .. } => NodeKind::InlineMath,
            Node::Math { .. } => NodeKind::Math,
            Node::Unknown(_) => return None,
        })
    }

    /// The `type` tag as it appears in serialized form.
    pub fn type_name(&self) -> &str {
        match self {
            Node::Unknown(unknown) => &unknown.kind,
            known => known.kind().map(|k| k.as_str()).unwrap_or_default(),
        }
    }

    pub fn children(&self) -> Option<&[Node]> {
        match self {
            Node::Root { children }
            | Node::Paragraph { children }
            | Node::Heading { children, .. }
            | Node::Emphasis { children }
            | Node::Strong { children }
            | Node::Blockquote { children }
            | Node::List { children, .. }
            | Node::ListItem { children, .. }
            | Node::Link { children, .. }
            | Node::Table { children, .. }
            | Node::TableRow { children }
            | Node::TableCell { children }
            | Node::Delete { children } => Some(children),
            Node::Unknown(unknown) => Some(&unknown.children),
            _ => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Root { children }
            | Node::Paragraph { children }
            | Node::Heading { children, .. }
            | Node::Emphasis { children }
            | Node::Strong { children }
            | Node::Blockquote { children }
            | Node::List { children, .. }
            | Node::ListItem { children, .. }
            | Node::Link { children, .. }
            | Node::Table { children, .. }
            | Node::TableRow { children }
            | Node::TableCell { children }
            | Node::Delete { children } => Some(children),
            Node::Unknown(unknown) => Some(&mut unknown.children),
            _ => None,
        }
    }

    /// Literal value of a leaf node.
    pub fn value(&self) -> Option<&str> {
        match self {
            Node::Text { value }
            | Node::InlineCode { value }
            | Node::Code { value, .. }
            | Node::Html { value }
            | Node::Mention { value }
            | Node::InlineMath { value }
            | Node::Math { value } => Some(value),
            Node::Unknown(unknown) => unknown.value.as_deref(),
            _ => None,
        }
    }

    /// Concatenated literal values of this node and all of its descendants.
    pub fn to_plain_text(&self) -> String {
        let mut out = String::new();
        self.push_plain_text(&mut out);
        out
    }

    fn push_plain_text(&self, out: &mut String) {
        if let Some(value) = self.value() {
            out.push_str(value);
        }
        if let Some(children) = self.children() {
            for child in children {
                child.push_plain_text(out);
            }
        }
    }
}

/// The closed set of node kinds the renderer has default rules for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    Root,
    Paragraph,
    Text,
    Heading,
    Emphasis,
    Strong,
    InlineCode,
    Code,
    Blockquote,
    List,
    ListItem,
    ThematicBreak,
    Break,
    Link,
    Image,
    Table,
    TableRow,
    TableCell,
    Delete,
    Html,
    Mention,
    InlineMath,
    Math,
}

impl NodeKind {
    pub const ALL: [NodeKind; 23] = [
        NodeKind::Root,
        NodeKind::Paragraph,
        NodeKind::Text,
        NodeKind::Heading,
        NodeKind::Emphasis,
        NodeKind::Strong,
        NodeKind::InlineCode,
        NodeKind::Code,
        NodeKind::Blockquote,
        NodeKind::List,
        NodeKind::ListItem,
        NodeKind::ThematicBreak,
        NodeKind::Break,
        NodeKind::Link,
        NodeKind::Image,
        NodeKind::Table,
        NodeKind::TableRow,
        NodeKind::TableCell,
        NodeKind::Delete,
        NodeKind::Html,
        NodeKind::Mention,
        NodeKind::InlineMath,
        NodeKind::Math,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Root => "root",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Text => "text",
            NodeKind::Heading => "heading",
            NodeKind::Emphasis => "emphasis",
            NodeKind::Strong => "strong",
            NodeKind::InlineCode => "inlineCode",
            NodeKind::Code => "code",
            NodeKind::Blockquote => "blockquote",
            NodeKind::List => "list",
            NodeKind::ListItem => "listItem",
            NodeKind::ThematicBreak => "thematicBreak",
            NodeKind::Break => "break",
            NodeKind::Link => "link",
            NodeKind::Image => "image",
            NodeKind::Table => "table",
            NodeKind::TableRow => "tableRow",
            NodeKind::TableCell => "tableCell",
            NodeKind::Delete => "delete",
            NodeKind::Html => "html",
            NodeKind::Mention => "mention",
            NodeKind::InlineMath => "inlineMath",
            NodeKind::Math => "math",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown node kind: {0}")]
pub struct UnknownKind(pub String);

impl FromStr for NodeKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NodeKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_mdast_json() {
        let json = r#"{
            "type": "root",
            "children": [
                {
                    "type": "heading",
                    "depth": 2,
                    "children": [{ "type": "text", "value": "Title" }],
                    "position": { "start": { "line": 1, "column": 1, "offset": 0 } }
                },
                { "type": "thematicBreak" },
                {
                    "type": "table",
                    "align": ["left", null, "right"],
                    "children": []
                }
            ]
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        let Node::Root { children } = &node else {
            panic!("expected root, got {node:?}");
        };
        assert_eq!(children[0], Node::heading(2, vec![Node::text("Title")]));
        assert_eq!(children[1], Node::ThematicBreak);
        assert_eq!(
            children[2],
            Node::Table {
                align: vec![Some(Align::Left), None, Some(Align::Right)],
                children: vec![],
            }
        );
    }

    #[test]
    fn unknown_tags_are_preserved() {
        let json = r#"{ "type": "footnoteReference", "value": "1" }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.kind(), None);
        assert_eq!(node.type_name(), "footnoteReference");
        assert_eq!(node.value(), Some("1"));

        let back = serde_json::to_value(&node).unwrap();
        assert_eq!(back["type"], "footnoteReference");
    }

    #[test]
    fn kind_names_round_trip() {
        for kind in NodeKind::ALL {
            assert_eq!(kind.as_str().parse::<NodeKind>(), Ok(kind));
        }
        assert!("footnote".parse::<NodeKind>().is_err());
    }

    #[test]
    fn plain_text_collects_descendants() {
        let node = Node::paragraph(vec![
            Node::text("write to "),
            Node::Strong {
                children: vec![Node::text("me")],
            },
            Node::InlineCode {
                value: "@once".into(),
            },
        ]);
        assert_eq!(node.to_plain_text(), "write to me@once");
    }
}
