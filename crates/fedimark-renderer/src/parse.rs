//! Markdown source to [`Node`] trees
//!
//! Adapts the markdown-weaver event stream into the mdast-shaped tree the
//! segmenter and renderer work on. The adapter keeps an explicit frame stack
//! instead of recursing, so arbitrarily nested input cannot exhaust the stack
//! here.

use markdown_weaver::{Alignment, CodeBlockKind, Event, HeadingLevel, LinkType, Options, Parser, Tag};

use crate::ast::{Align, Node};
use crate::error::SegmentError;
use crate::mention::{MentionOptions, segment};

#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Run mention segmentation on the parsed tree.
    pub mentions: Option<MentionOptions>,
}

impl ParseOptions {
    pub fn with_mentions(options: MentionOptions) -> Self {
        Self {
            mentions: Some(options),
        }
    }
}

pub fn markdown_options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_MATH
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_GFM
}

#[tracing::instrument(level = "debug", skip_all, fields(len = text.len()))]
pub fn parse_markdown(text: &str, options: &ParseOptions) -> Result<Node, SegmentError> {
    let mut builder = TreeBuilder::new();
    for event in Parser::new_ext(text, markdown_options()) {
        builder.event(event);
    }
    let mut tree = builder.finish();
    if let Some(mentions) = &options.mentions {
        segment(&mut tree, mentions)?;
    }
    Ok(tree)
}

#[derive(Debug)]
enum Frame {
    Root,
    Paragraph,
    Heading(u32),
    Blockquote,
    Code {
        lang: Option<String>,
        meta: Option<String>,
    },
    HtmlBlock,
    List {
        ordered: bool,
        start: Option<u64>,
    },
    Item {
        checked: Option<bool>,
    },
    Table(Vec<Option<Align>>),
    /// Head cells arrive without a row of their own.
    TableHead,
    TableRow,
    TableCell,
    Emphasis,
    Strong,
    Delete,
    Link {
        url: String,
        title: Option<String>,
    },
    Image {
        url: String,
        title: Option<String>,
    },
    /// Children are handed to the parent unchanged.
    Transparent,
    /// Children are discarded.
    Dropped,
}

impl Frame {
    fn from_tag(tag: Tag<'_>) -> Self {
        match tag {
            Tag::Paragraph => Frame::Paragraph,
            Tag::Heading { level, .. } => Frame::Heading(heading_depth(level)),
            Tag::BlockQuote(_) => Frame::Blockquote,
            Tag::CodeBlock(CodeBlockKind::Indented) => Frame::Code {
                lang: None,
                meta: None,
            },
            Tag::CodeBlock(CodeBlockKind::Fenced(info)) => {
                let info = info.trim();
                let (lang, meta) = match info.split_once(char::is_whitespace) {
                    Some((lang, meta)) => (lang, meta.trim()),
                    None => (info, ""),
                };
                Frame::Code {
                    lang: non_empty(lang),
                    meta: non_empty(meta),
                }
            }
            Tag::HtmlBlock => Frame::HtmlBlock,
            Tag::List(start) => Frame::List {
                ordered: start.is_some(),
                start,
            },
            Tag::Item => Frame::Item { checked: None },
            Tag::Table(alignments) => Frame::Table(alignments.iter().map(align).collect()),
            Tag::TableHead => Frame::TableHead,
            Tag::TableRow => Frame::TableRow,
            Tag::TableCell => Frame::TableCell,
            Tag::Emphasis => Frame::Emphasis,
            Tag::Strong => Frame::Strong,
            Tag::Strikethrough => Frame::Delete,
            Tag::Link {
                link_type,
                dest_url,
                title,
                ..
            } => {
                let url = if matches!(link_type, LinkType::Email) {
                    format!("mailto:{dest_url}")
                } else {
                    dest_url.to_string()
                };
                Frame::Link {
                    url,
                    title: non_empty(&title),
                }
            }
            Tag::Image {
                dest_url, title, ..
            } => Frame::Image {
                url: dest_url.to_string(),
                title: non_empty(&title),
            },
            Tag::MetadataBlock(_) | Tag::FootnoteDefinition(_) => Frame::Dropped,
            _ => Frame::Transparent,
        }
    }
}

fn heading_depth(level: HeadingLevel) -> u32 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn align(alignment: &Alignment) -> Option<Align> {
    match alignment {
        Alignment::None => None,
        Alignment::Left => Some(Align::Left),
        Alignment::Center => Some(Align::Center),
        Alignment::Right => Some(Align::Right),
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

struct TreeBuilder {
    stack: Vec<(Frame, Vec<Node>)>,
}

impl TreeBuilder {
    fn new() -> Self {
        Self {
            stack: vec![(Frame::Root, Vec::new())],
        }
    }

    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.stack.push((Frame::from_tag(tag), Vec::new())),
            // Start and end events always pair up, so the tag itself is not needed.
            Event::End(_) => self.close(),
            Event::Text(text) => self.push_text(&text),
            Event::SoftBreak => self.push_text("\n"),
            Event::Code(code) => self.push(Node::InlineCode {
                value: code.to_string(),
            }),
            Event::InlineMath(math) => self.push(Node::InlineMath {
                value: math.to_string(),
            }),
            Event::DisplayMath(math) => self.push(Node::Math {
                value: math.trim().to_string(),
            }),
            Event::Html(html) | Event::InlineHtml(html) => {
                if matches!(self.top(), Frame::HtmlBlock) {
                    self.push_text(&html);
                } else {
                    self.push(Node::Html {
                        value: html.to_string(),
                    });
                }
            }
            Event::HardBreak => self.push(Node::Break),
            Event::Rule => self.push(Node::ThematicBreak),
            Event::FootnoteReference(name) => self.push_text(&format!("[^{name}]")),
            Event::TaskListMarker(checked) => {
                let item = self
                    .stack
                    .iter_mut()
                    .rev()
                    .find_map(|(frame, _)| match frame {
                        Frame::Item { checked: slot } => Some(slot),
                        _ => None,
                    });
                if let Some(slot) = item {
                    *slot = Some(checked);
                }
            }
            Event::WeaverBlock(_) => {}
        }
    }

    fn top(&self) -> &Frame {
        self.stack
            .last()
            .map(|(frame, _)| frame)
            .unwrap_or(&Frame::Root)
    }

    fn children(&mut self) -> &mut Vec<Node> {
        if self.stack.is_empty() {
            self.stack.push((Frame::Root, Vec::new()));
        }
        let last = self.stack.len() - 1;
        &mut self.stack[last].1
    }

    fn push(&mut self, node: Node) {
        self.children().push(node);
    }

    fn push_text(&mut self, text: &str) {
        let children = self.children();
        if let Some(Node::Text { value }) = children.last_mut() {
            value.push_str(text);
        } else {
            children.push(Node::text(text));
        }
    }

    fn close(&mut self) {
        // Never pop the root, even on an unbalanced end event.
        if self.stack.len() < 2 {
            return;
        }
        let Some((frame, children)) = self.stack.pop() else {
            return;
        };
        match frame {
            Frame::Transparent => {
                for child in children {
                    match child {
                        Node::Text { value } => self.push_text(&value),
                        other => self.push(other),
                    }
                }
            }
            Frame::Dropped => {}
            frame => {
                if let Some(node) = build(frame, children) {
                    self.push(node);
                }
            }
        }
    }

    fn finish(mut self) -> Node {
        while self.stack.len() > 1 {
            self.close();
        }
        let children = self
            .stack
            .pop()
            .map(|(_, children)| children)
            .unwrap_or_default();
        Node::root(children)
    }
}

fn build(frame: Frame, children: Vec<Node>) -> Option<Node> {
    let node = match frame {
        Frame::Root => Node::root(children),
        Frame::Paragraph => Node::paragraph(children),
        Frame::Heading(depth) => Node::heading(depth, children),
        Frame::Blockquote => Node::Blockquote { children },
        Frame::Code { lang, meta } => {
            let mut value = Node::root(children).to_plain_text();
            if value.ends_with('\n') {
                value.pop();
            }
            Node::Code { value, lang, meta }
        }
        Frame::HtmlBlock => Node::Html {
            value: Node::root(children)
                .to_plain_text()
                .trim_end_matches('\n')
                .to_string(),
        },
        Frame::List { ordered, start } => Node::List {
            ordered,
            start,
            spread: None,
            children,
        },
        Frame::Item { checked } => Node::ListItem {
            checked,
            spread: None,
            children,
        },
        Frame::Table(align) => Node::Table { align, children },
        Frame::TableHead | Frame::TableRow => Node::TableRow { children },
        Frame::TableCell => Node::TableCell { children },
        Frame::Emphasis => Node::Emphasis { children },
        Frame::Strong => Node::Strong { children },
        Frame::Delete => Node::Delete { children },
        Frame::Link { url, title } => Node::Link {
            url,
            title,
            children,
        },
        Frame::Image { url, title } => {
            let alt = Node::root(children).to_plain_text();
            Node::Image {
                url,
                title,
                alt: non_empty(&alt),
            }
        }
        Frame::Transparent | Frame::Dropped => return None,
    };
    Some(node)
}
