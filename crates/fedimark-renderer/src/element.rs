//! UI element construction
//!
//! The renderer never builds host elements itself. It describes each element
//! as a tag, an attribute map and content, and hands that to an
//! [`ElementBuilder`]. [`UiTreeBuilder`] is the built-in host: it produces a
//! plain [`UiElement`] tree that serializes to HTML or JSON.

use markdown_weaver_escape::{
    FmtWriter, StrWrite, escape_href, escape_html, escape_html_body_text,
};
use serde::Serialize;
use smol_str::SmolStr;
use std::collections::BTreeMap;
use std::fmt;

/// Element shapes the default render rules ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ElementTag {
    /// Generic block container.
    Container,
    Paragraph,
    /// Inline run of literal text.
    Text,
    /// Heading level, always within 1..=6.
    Heading(u8),
    Emphasis,
    Strong,
    InlineCode,
    CodeBlock,
    Preformatted,
    Blockquote,
    OrderedList,
    UnorderedList,
    ListItem,
    Rule,
    LineBreak,
    /// Link leaving the application.
    Anchor,
    /// In-app navigation to a relative or same-origin location.
    AppLink,
    Image,
    Table,
    TableRow,
    TableHeaderCell,
    TableCell,
    Strikethrough,
    RawHtml,
    Mention,
    MathInline,
    MathBlock,
    /// Stand-in for a node kind nobody knows how to draw.
    Placeholder,
}

impl ElementTag {
    pub fn html_name(&self) -> &'static str {
        match self {
            ElementTag::Container | ElementTag::RawHtml | ElementTag::MathBlock => "div",
            ElementTag::Placeholder => "div",
            ElementTag::Paragraph => "p",
            ElementTag::Text | ElementTag::Mention | ElementTag::MathInline => "span",
            ElementTag::Heading(level) => match level {
                2 => "h2",
                3 => "h3",
                4 => "h4",
                5 => "h5",
                6 => "h6",
                _ => "h1",
            },
            ElementTag::Emphasis => "em",
            ElementTag::Strong => "strong",
            ElementTag::InlineCode | ElementTag::CodeBlock => "code",
            ElementTag::Preformatted => "pre",
            ElementTag::Blockquote => "blockquote",
            ElementTag::OrderedList => "ol",
            ElementTag::UnorderedList => "ul",
            ElementTag::ListItem => "li",
            ElementTag::Rule => "hr",
            ElementTag::LineBreak => "br",
            ElementTag::Anchor | ElementTag::AppLink => "a",
            ElementTag::Image => "img",
            ElementTag::Table => "table",
            ElementTag::TableRow => "tr",
            ElementTag::TableHeaderCell => "th",
            ElementTag::TableCell => "td",
            ElementTag::Strikethrough => "del",
        }
    }

    /// Elements that never have content or a closing tag.
    pub fn is_void(&self) -> bool {
        matches!(
            self,
            ElementTag::Rule | ElementTag::LineBreak | ElementTag::Image
        )
    }
}

/// Ordered attribute map attached to every element.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Attributes(BTreeMap<SmolStr, String>);

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<SmolStr>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<SmolStr>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// What goes inside an element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Content<E> {
    Empty,
    /// Literal text; hosts must display it as text, never as markup.
    Text(String),
    /// Trusted markup injected as-is. No sanitization happens here.
    Markup(String),
    Children(Vec<E>),
}

/// The UI host capability.
pub trait ElementBuilder {
    type Element;

    fn element(
        &self,
        tag: ElementTag,
        attrs: Attributes,
        content: Content<Self::Element>,
    ) -> Self::Element;
}

impl<T: ElementBuilder + ?Sized> ElementBuilder for &T {
    type Element = T::Element;

    fn element(
        &self,
        tag: ElementTag,
        attrs: Attributes,
        content: Content<Self::Element>,
    ) -> Self::Element {
        (**self).element(tag, attrs, content)
    }
}

/// Built-in host producing [`UiElement`]s.
#[derive(Debug, Default, Clone, Copy)]
pub struct UiTreeBuilder;

impl ElementBuilder for UiTreeBuilder {
    type Element = UiElement;

    fn element(&self, tag: ElementTag, attrs: Attributes, content: Content<UiElement>) -> UiElement {
        UiElement {
            tag,
            attrs,
            content,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiElement {
    pub tag: ElementTag,
    pub attrs: Attributes,
    pub content: Content<UiElement>,
}

impl UiElement {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key)
    }

    pub fn children(&self) -> &[UiElement] {
        match &self.content {
            Content::Children(children) => children.as_slice(),
            _ => &[],
        }
    }

    /// Literal text of this element and its descendants. Markup is skipped.
    pub fn text_content(&self) -> String {
        match &self.content {
            Content::Text(text) => text.clone(),
            Content::Children(children) => children.iter().map(UiElement::text_content).collect(),
            Content::Empty | Content::Markup(_) => String::new(),
        }
    }

    /// Writes the element as HTML.
    pub fn write_html<W: StrWrite>(&self, w: &mut W) -> Result<(), W::Error> {
        let name = self.tag.html_name();
        w.write_str("<")?;
        w.write_str(name)?;
        for (key, value) in self.attrs.iter() {
            w.write_str(" ")?;
            escape_html(&mut *w, key)?;
            w.write_str("=\"")?;
            match key {
                "href" | "src" => escape_href(&mut *w, value)?,
                _ => escape_html(&mut *w, value)?,
            }
            w.write_str("\"")?;
        }
        if self.tag.is_void() {
            return w.write_str(" />");
        }
        w.write_str(">")?;

        match &self.content {
            Content::Empty => {}
            Content::Text(text) => escape_html_body_text(&mut *w, text)?,
            Content::Markup(markup) => w.write_str(markup)?,
            Content::Children(children) => {
                for child in children {
                    child.write_html(w)?;
                }
            }
        }

        w.write_str("</")?;
        w.write_str(name)?;
        w.write_str(">")
    }

    pub fn to_html(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for UiElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_html(&mut FmtWriter(f))
    }
}

/// Concatenated HTML of a rendered element list.
pub fn to_html(elements: &[UiElement]) -> String {
    elements.iter().map(UiElement::to_html).collect()
}
