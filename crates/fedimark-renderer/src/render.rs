//! Node tree to UI elements
//!
//! Every node kind has a default rule. Callers can replace the rule for any
//! kind with an override; the override's element is used as-is, and overrides
//! are consulted again at every depth while the default rules recurse.

use smol_str::SmolStr;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::ast::{Align, Node, NodeKind};
use crate::element::{Attributes, Content, ElementBuilder, ElementTag, UiElement, UiTreeBuilder};
use crate::error::RenderError;
use crate::math::{LatexMathCompiler, MathCompiler};

pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Attribute carrying the node kind on every default element.
pub const NODE_TYPE_ATTR: &str = "data-node-type";
/// Attribute carrying the style hook from the [`StyleTable`].
pub const NODE_STYLE_ATTR: &str = "data-node-style";

/// Caller-supplied rule for one node kind.
pub type Override<E> = Box<dyn Fn(&Node) -> E + Send + Sync>;

/// Style hook value per node kind, written to `data-node-style`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleTable {
    fallback: SmolStr,
    per_kind: HashMap<NodeKind, SmolStr>,
}

impl StyleTable {
    pub const DEFAULT_STYLE: &'static str = "default";

    pub fn get(&self, kind: NodeKind) -> &str {
        self.per_kind.get(&kind).unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn set(&mut self, kind: NodeKind, style: impl Into<SmolStr>) {
        self.per_kind.insert(kind, style.into());
    }

    pub fn with(mut self, kind: NodeKind, style: impl Into<SmolStr>) -> Self {
        self.set(kind, style);
        self
    }
}

impl Default for StyleTable {
    fn default() -> Self {
        Self {
            fallback: SmolStr::new_static(Self::DEFAULT_STYLE),
            per_kind: HashMap::new(),
        }
    }
}

pub struct RenderOptions<E> {
    pub overrides: HashMap<NodeKind, Override<E>>,
    pub styles: StyleTable,
    /// Origin of the page the output is shown on, e.g. `https://example.social`.
    /// Links under it are rendered as in-app navigation.
    pub origin: Option<String>,
    pub max_depth: usize,
    /// Kinds whose default rule is withdrawn; they need an override.
    pub disabled_defaults: HashSet<NodeKind>,
}

impl<E> Default for RenderOptions<E> {
    fn default() -> Self {
        Self {
            overrides: HashMap::new(),
            styles: StyleTable::default(),
            origin: None,
            max_depth: DEFAULT_MAX_DEPTH,
            disabled_defaults: HashSet::new(),
        }
    }
}

impl<E> RenderOptions<E> {
    pub fn with_override(
        mut self,
        kind: NodeKind,
        render: impl Fn(&Node) -> E + Send + Sync + 'static,
    ) -> Self {
        self.overrides.insert(kind, Box::new(render));
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_styles(mut self, styles: StyleTable) -> Self {
        self.styles = styles;
        self
    }

    pub fn without_default(mut self, kind: NodeKind) -> Self {
        self.disabled_defaults.insert(kind);
        self
    }
}

impl<E> fmt::Debug for RenderOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut overridden: Vec<_> = self.overrides.keys().collect();
        overridden.sort();
        f.debug_struct("RenderOptions")
            .field("overrides", &overridden)
            .field("styles", &self.styles)
            .field("origin", &self.origin)
            .field("max_depth", &self.max_depth)
            .field("disabled_defaults", &self.disabled_defaults)
            .finish()
    }
}

/// Render `tree` with the built-in [`UiElement`] host and LaTeX math.
pub fn render(
    tree: &Node,
    options: RenderOptions<UiElement>,
) -> Result<Vec<UiElement>, RenderError> {
    TreeRenderer::new(UiTreeBuilder)
        .with_options(options)
        .render(tree)
}

pub struct TreeRenderer<B: ElementBuilder, M = LatexMathCompiler> {
    builder: B,
    math: M,
    options: RenderOptions<B::Element>,
}

impl<B: ElementBuilder> TreeRenderer<B> {
    pub fn new(builder: B) -> Self {
        Self {
            builder,
            math: LatexMathCompiler,
            options: RenderOptions::default(),
        }
    }
}

impl<B: ElementBuilder, M: MathCompiler> TreeRenderer<B, M> {
    pub fn with_options(mut self, options: RenderOptions<B::Element>) -> Self {
        self.options = options;
        self
    }

    pub fn with_math<N: MathCompiler>(self, math: N) -> TreeRenderer<B, N> {
        TreeRenderer {
            builder: self.builder,
            math,
            options: self.options,
        }
    }

    pub fn options(&self) -> &RenderOptions<B::Element> {
        &self.options
    }

    /// Render a whole tree. The result always holds at least one element.
    #[tracing::instrument(level = "debug", skip_all, fields(root = tree.type_name()))]
    pub fn render(&self, tree: &Node) -> Result<Vec<B::Element>, RenderError> {
        let element = self.render_node(tree, Scope::root())?;
        Ok(vec![element])
    }

    fn render_node(&self, node: &Node, scope: Scope<'_>) -> Result<B::Element, RenderError> {
        if scope.depth > self.options.max_depth {
            return Err(RenderError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        // Overrides and withdrawn defaults are keyed by known kinds only.
        if let Some(kind) = node.kind() {
            if let Some(render) = self.options.overrides.get(&kind) {
                return Ok(render(node));
            }
            if self.options.disabled_defaults.contains(&kind) {
                return Err(RenderError::UnhandledKind { kind });
            }
        }

        let mut attrs = self.attrs(node);
        let element = match node {
            Node::Root { children } => self.wrap(ElementTag::Container, attrs, children, scope)?,
            Node::Paragraph { children } => {
                self.wrap(ElementTag::Paragraph, attrs, children, scope)?
            }
            Node::Text { value } => self.text(ElementTag::Text, attrs, value),
            Node::Heading { depth, children } => {
                let level = u8::try_from(*depth)
                    .ok()
                    .filter(|level| (1..=6).contains(level))
                    .unwrap_or(1);
                self.wrap(ElementTag::Heading(level), attrs, children, scope)?
            }
            Node::Emphasis { children } => self.wrap(ElementTag::Emphasis, attrs, children, scope)?,
            Node::Strong { children } => self.wrap(ElementTag::Strong, attrs, children, scope)?,
            Node::InlineCode { value } => self.text(ElementTag::InlineCode, attrs, value),
            Node::Code { value, lang, .. } => {
                let mut code_attrs = attrs.clone();
                if let Some(lang) = lang.as_deref().filter(|l| !l.is_empty()) {
                    code_attrs.insert("class", format!("language-{lang}"));
                    code_attrs.insert("data-lang", lang);
                }
                let code = self.text(ElementTag::CodeBlock, code_attrs, value);
                self.builder
                    .element(ElementTag::Preformatted, attrs, Content::Children(vec![code]))
            }
            Node::Blockquote { children } => {
                self.wrap(ElementTag::Blockquote, attrs, children, scope)?
            }
            Node::List {
                ordered,
                start,
                children,
                ..
            } => {
                let tag = if *ordered {
                    if let Some(start) = start.filter(|s| *s != 1) {
                        attrs.insert("start", start.to_string());
                    }
                    ElementTag::OrderedList
                } else {
                    ElementTag::UnorderedList
                };
                self.wrap(tag, attrs, children, scope)?
            }
            Node::ListItem {
                checked, children, ..
            } => {
                if let Some(checked) = checked {
                    attrs.insert("data-checked", checked.to_string());
                }
                self.wrap(ElementTag::ListItem, attrs, children, scope)?
            }
            Node::ThematicBreak => self.builder.element(ElementTag::Rule, attrs, Content::Empty),
            Node::Break => self
                .builder
                .element(ElementTag::LineBreak, attrs, Content::Empty),
            Node::Link {
                url,
                title,
                children,
            } => {
                attrs.insert("href", url.as_str());
                if let Some(title) = title {
                    attrs.insert("title", title.as_str());
                }
                let tag = if self.is_internal(url) {
                    attrs.insert("data-link", "internal");
                    ElementTag::AppLink
                } else {
                    attrs.insert("data-link", "external");
                    ElementTag::Anchor
                };
                self.wrap(tag, attrs, children, scope)?
            }
            Node::Image { url, title, alt } => {
                attrs.insert("src", url.as_str());
                if let Some(alt) = alt {
                    attrs.insert("alt", alt.as_str());
                }
                if let Some(title) = title {
                    attrs.insert("title", title.as_str());
                }
                self.builder.element(ElementTag::Image, attrs, Content::Empty)
            }
            Node::Table { align, children } => {
                let mut rows = Vec::with_capacity(children.len());
                for (index, row) in children.iter().enumerate() {
                    let table = TableScope {
                        align,
                        header: index == 0,
                        column: 0,
                    };
                    rows.push(self.render_node(row, scope.in_table(table))?);
                }
                self.builder
                    .element(ElementTag::Table, attrs, Content::Children(rows))
            }
            Node::TableRow { children } => {
                let mut cells = Vec::with_capacity(children.len());
                for (column, cell) in children.iter().enumerate() {
                    let cell_scope = match scope.table {
                        Some(table) => scope.in_table(TableScope { column, ..table }),
                        None => scope.child(),
                    };
                    cells.push(self.render_node(cell, cell_scope)?);
                }
                self.builder
                    .element(ElementTag::TableRow, attrs, Content::Children(cells))
            }
            Node::TableCell { children } => {
                let tag = match scope.table {
                    Some(table) => {
                        if let Some(align) = table.alignment() {
                            attrs.insert("data-align", align.as_str());
                        }
                        if table.header {
                            ElementTag::TableHeaderCell
                        } else {
                            ElementTag::TableCell
                        }
                    }
                    None => ElementTag::TableCell,
                };
                self.wrap(tag, attrs, children, scope)?
            }
            Node::Delete { children } => {
                self.wrap(ElementTag::Strikethrough, attrs, children, scope)?
            }
            Node::Html { value } => {
                self.builder
                    .element(ElementTag::RawHtml, attrs, Content::Markup(value.clone()))
            }
            Node::Mention { value } => {
                attrs.insert("class", "mention");
                self.text(ElementTag::Mention, attrs, value)
            }
            Node::InlineMath { value } => self.math(value, false, attrs),
            Node::Math { value } => self.math(value, true, attrs),
            Node::Unknown(unknown) => {
                tracing::debug!(kind = %unknown.kind, "no render rule for node kind");
                self.text(
                    ElementTag::Placeholder,
                    attrs,
                    &format!("Unknown node type: {}", unknown.kind),
                )
            }
        };
        Ok(element)
    }

    /// Node type and style hook. Unknown kinds get the fallback style.
    fn attrs(&self, node: &Node) -> Attributes {
        let style = match node.kind() {
            Some(kind) => self.options.styles.get(kind),
            None => self.options.styles.fallback(),
        };
        Attributes::new()
            .with(NODE_TYPE_ATTR, node.type_name())
            .with(NODE_STYLE_ATTR, style)
    }

    fn text(&self, tag: ElementTag, attrs: Attributes, value: &str) -> B::Element {
        self.builder
            .element(tag, attrs, Content::Text(value.to_string()))
    }

    fn wrap(
        &self,
        tag: ElementTag,
        attrs: Attributes,
        children: &[Node],
        scope: Scope<'_>,
    ) -> Result<B::Element, RenderError> {
        let children = children
            .iter()
            .map(|child| self.render_node(child, scope.child()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self
            .builder
            .element(tag, attrs, Content::Children(children)))
    }

    fn math(&self, source: &str, display_mode: bool, mut attrs: Attributes) -> B::Element {
        match self.math.compile(source, display_mode) {
            Ok(markup) => {
                let tag = if display_mode {
                    ElementTag::MathBlock
                } else {
                    ElementTag::MathInline
                };
                self.builder.element(tag, attrs, Content::Markup(markup))
            }
            Err(err) => {
                tracing::debug!(%err, display_mode, "math fell back to source text");
                attrs.insert("class", "math-error");
                let tag = if display_mode {
                    ElementTag::Container
                } else {
                    ElementTag::Text
                };
                self.text(tag, attrs, source)
            }
        }
    }

    fn is_internal(&self, url: &str) -> bool {
        // `//host/path` is protocol-relative, so it leaves the app.
        if url.starts_with('/') {
            return !url.starts_with("//");
        }
        if url.starts_with('#') || url.starts_with("./") {
            return true;
        }
        let Some(origin) = self
            .options
            .origin
            .as_deref()
            .map(|o| o.trim_end_matches('/'))
            .filter(|o| !o.is_empty())
        else {
            return false;
        };
        url.strip_prefix(origin)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with(['/', '?', '#']))
    }
}

#[derive(Debug, Clone, Copy)]
struct Scope<'t> {
    depth: usize,
    table: Option<TableScope<'t>>,
}

impl<'t> Scope<'t> {
    fn root() -> Self {
        Self {
            depth: 1,
            table: None,
        }
    }

    fn child(&self) -> Self {
        Self {
            depth: self.depth + 1,
            table: None,
        }
    }

    fn in_table(&self, table: TableScope<'t>) -> Self {
        Self {
            depth: self.depth + 1,
            table: Some(table),
        }
    }
}

/// Position of a row or cell inside the table being rendered.
#[derive(Debug, Clone, Copy)]
struct TableScope<'t> {
    align: &'t [Option<Align>],
    header: bool,
    column: usize,
}

impl TableScope<'_> {
    fn alignment(&self) -> Option<Align> {
        self.align.get(self.column).copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::to_html;
    use crate::error::MathError;

    fn html(tree: &Node) -> String {
        to_html(&render(tree, RenderOptions::default()).unwrap())
    }

    struct FailingMath;

    impl MathCompiler for FailingMath {
        fn compile(&self, _expr: &str, _display_mode: bool) -> Result<String, MathError> {
            Err(MathError::new("nope"))
        }
    }

    struct EchoMath;

    impl MathCompiler for EchoMath {
        fn compile(&self, expr: &str, display_mode: bool) -> Result<String, MathError> {
            Ok(format!("<math display=\"{display_mode}\">{expr}</math>"))
        }
    }

    #[test]
    fn heading_wraps_text() {
        let tree = Node::heading(2, vec![Node::text("Title")]);
        let rendered = render(&tree, RenderOptions::default()).unwrap();
        assert_eq!(rendered.len(), 1);
        let heading = &rendered[0];
        assert_eq!(heading.tag, ElementTag::Heading(2));
        assert_eq!(heading.attr(NODE_TYPE_ATTR), Some("heading"));
        assert_eq!(heading.children().len(), 1);
        assert_eq!(heading.children()[0].tag, ElementTag::Text);
        assert_eq!(heading.children()[0].content, Content::Text("Title".into()));
    }

    #[test]
    fn out_of_range_heading_depth_clamps_to_one() {
        for depth in [0, 7, 300] {
            let rendered = render(&Node::heading(depth, vec![]), RenderOptions::default()).unwrap();
            assert_eq!(rendered[0].tag, ElementTag::Heading(1));
        }
    }

    #[test]
    fn override_replaces_default_rule() {
        let options = RenderOptions::default().with_override(NodeKind::Heading, |node| {
            UiTreeBuilder.element(
                ElementTag::Strong,
                Attributes::new(),
                Content::Text(node.to_plain_text().to_uppercase()),
            )
        });
        let tree = Node::heading(2, vec![Node::text("Title")]);
        let rendered = render(&tree, options).unwrap();
        assert_eq!(rendered[0].tag, ElementTag::Strong);
        assert_eq!(rendered[0].content, Content::Text("TITLE".into()));
        assert!(rendered[0].attrs.is_empty());
    }

    #[test]
    fn overrides_apply_at_every_depth() {
        let options = RenderOptions::default().with_override(NodeKind::Mention, |node| {
            UiTreeBuilder.element(
                ElementTag::Anchor,
                Attributes::new().with("href", format!("/profile/{}", node.to_plain_text())),
                Content::Text(node.to_plain_text()),
            )
        });
        let tree = Node::root(vec![Node::paragraph(vec![Node::Emphasis {
            children: vec![Node::mention("@alice")],
        }])]);
        let rendered = render(&tree, options).unwrap();
        let mention = &rendered[0].children()[0].children()[0].children()[0];
        assert_eq!(mention.tag, ElementTag::Anchor);
        assert_eq!(mention.attr("href"), Some("/profile/@alice"));
    }

    #[test]
    fn empty_root_is_one_empty_container() {
        let rendered = render(&Node::root(vec![]), RenderOptions::default()).unwrap();
        assert_eq!(rendered.len(), 1);
        assert_eq!(rendered[0].tag, ElementTag::Container);
        assert_eq!(rendered[0].content, Content::Children(vec![]));
    }

    #[test]
    fn invalid_math_falls_back_to_source() {
        let renderer = TreeRenderer::new(UiTreeBuilder).with_math(FailingMath);
        let rendered = renderer
            .render(&Node::InlineMath {
                value: r"\frac{a".into(),
            })
            .unwrap();
        let inline = &rendered[0];
        assert_eq!(inline.tag, ElementTag::Text);
        assert_eq!(inline.content, Content::Text(r"\frac{a".into()));
        assert_eq!(inline.attr(NODE_TYPE_ATTR), Some("inlineMath"));

        let rendered = renderer
            .render(&Node::Math {
                value: "x^".into(),
            })
            .unwrap();
        let block = &rendered[0];
        assert_eq!(block.tag, ElementTag::Container);
        assert_eq!(block.content, Content::Text("x^".into()));
    }

    #[test]
    fn compiled_math_is_injected_as_markup() {
        let renderer = TreeRenderer::new(UiTreeBuilder).with_math(EchoMath);
        let rendered = renderer
            .render(&Node::Math {
                value: "y".into(),
            })
            .unwrap();
        let block = &rendered[0];
        assert_eq!(block.tag, ElementTag::MathBlock);
        assert_eq!(
            block.content,
            Content::Markup("<math display=\"true\">y</math>".into())
        );
    }

    #[test]
    fn unknown_kind_renders_placeholder() {
        let tree = Node::root(vec![Node::Unknown(crate::ast::UnknownNode {
            kind: "footnoteDefinition".into(),
            children: vec![],
            value: None,
        })]);
        insta::assert_snapshot!(
            html(&tree),
            @r#"<div data-node-style="default" data-node-type="root"><div data-node-style="default" data-node-type="footnoteDefinition">Unknown node type: footnoteDefinition</div></div>"#
        );
    }

    #[test]
    fn unknown_kind_ignores_withdrawn_defaults() {
        let mut options = RenderOptions::default();
        for kind in NodeKind::ALL {
            options = options.without_default(kind);
        }
        let tree = Node::Unknown(crate::ast::UnknownNode {
            kind: "mdxJsxFlowElement".into(),
            children: vec![Node::text("@alice")],
            value: None,
        });
        let rendered = render(&tree, options).unwrap();
        assert_eq!(rendered[0].tag, ElementTag::Placeholder);
        assert_eq!(rendered[0].attr(NODE_TYPE_ATTR), Some("mdxJsxFlowElement"));
        assert_eq!(
            rendered[0].text_content(),
            "Unknown node type: mdxJsxFlowElement"
        );
    }

    #[cfg(feature = "math")]
    #[test]
    fn unbalanced_latex_renders_its_source() {
        let tree = Node::InlineMath {
            value: r"\frac{a".into(),
        };
        let rendered = render(&tree, RenderOptions::default()).unwrap();
        assert_eq!(rendered[0].tag, ElementTag::Text);
        assert_eq!(rendered[0].content, Content::Text(r"\frac{a".into()));
        assert_eq!(rendered[0].attr("class"), Some("math-error"));
    }

    #[test]
    fn disabled_default_without_override_fails_loudly() {
        let options = RenderOptions::default().without_default(NodeKind::Mention);
        let tree = Node::paragraph(vec![Node::mention("@alice")]);
        assert_eq!(
            render(&tree, options).unwrap_err(),
            RenderError::UnhandledKind {
                kind: NodeKind::Mention
            }
        );

        let options = RenderOptions::default()
            .without_default(NodeKind::Mention)
            .with_override(NodeKind::Mention, |_| {
                UiTreeBuilder.element(ElementTag::Text, Attributes::new(), Content::Empty)
            });
        assert!(render(&tree, options).is_ok());
    }

    #[test]
    fn links_split_into_internal_and_external() {
        let renderer = TreeRenderer::new(UiTreeBuilder)
            .with_options(RenderOptions::default().with_origin("https://example.social/"));
        let tag_of = |url: &str| renderer.render(&Node::link(url, vec![])).unwrap()[0].tag;

        assert_eq!(tag_of("/notes/1"), ElementTag::AppLink);
        assert_eq!(tag_of("#section"), ElementTag::AppLink);
        assert_eq!(tag_of("./sibling"), ElementTag::AppLink);
        assert_eq!(tag_of("https://example.social"), ElementTag::AppLink);
        assert_eq!(tag_of("https://example.social/@alice"), ElementTag::AppLink);
        assert_eq!(tag_of("https://example.social.evil.net/"), ElementTag::Anchor);
        assert_eq!(tag_of("//cdn.example.com/x.js"), ElementTag::Anchor);
        assert_eq!(tag_of("https://elsewhere.org"), ElementTag::Anchor);
    }

    #[test]
    fn mention_is_styled_but_not_linked() {
        let tree = Node::paragraph(vec![Node::text("hi "), Node::mention("@bob@example.com")]);
        insta::assert_snapshot!(
            html(&tree),
            @r#"<p data-node-style="default" data-node-type="paragraph"><span data-node-style="default" data-node-type="text">hi </span><span class="mention" data-node-style="default" data-node-type="mention">@bob@example.com</span></p>"#
        );
    }

    #[test]
    fn table_marks_header_row_and_alignment() {
        let cell = |text: &str| Node::TableCell {
            children: vec![Node::text(text)],
        };
        let tree = Node::Table {
            align: vec![Some(Align::Left), None],
            children: vec![
                Node::TableRow {
                    children: vec![cell("a"), cell("b")],
                },
                Node::TableRow {
                    children: vec![cell("1"), cell("2")],
                },
            ],
        };
        let rendered = render(&tree, RenderOptions::default()).unwrap();
        let rows = rendered[0].children();
        assert_eq!(rows[0].children()[0].tag, ElementTag::TableHeaderCell);
        assert_eq!(rows[0].children()[0].attr("data-align"), Some("left"));
        assert_eq!(rows[0].children()[1].attr("data-align"), None);
        assert_eq!(rows[1].children()[0].tag, ElementTag::TableCell);
        assert_eq!(rows[1].children()[0].attr("data-align"), Some("left"));
    }

    #[test]
    fn code_block_carries_language() {
        let tree = Node::Code {
            value: "fn main() {}".into(),
            lang: Some("rust".into()),
            meta: None,
        };
        insta::assert_snapshot!(
            html(&tree),
            @r#"<pre data-node-style="default" data-node-type="code"><code class="language-rust" data-lang="rust" data-node-style="default" data-node-type="code">fn main() {}</code></pre>"#
        );
    }

    #[test]
    fn style_table_feeds_style_attribute() {
        let options = RenderOptions::default()
            .with_styles(StyleTable::default().with(NodeKind::Strong, "loud"));
        let tree = Node::Strong {
            children: vec![],
        };
        let rendered = render(&tree, options).unwrap();
        assert_eq!(rendered[0].attr(NODE_STYLE_ATTR), Some("loud"));
    }

    #[test]
    fn raw_html_is_not_sanitized() {
        let tree = Node::Html {
            value: "<script>alert(1)</script>".into(),
        };
        let rendered = render(&tree, RenderOptions::default()).unwrap();
        assert_eq!(
            rendered[0].content,
            Content::Markup("<script>alert(1)</script>".into())
        );
    }

    #[test]
    fn deep_trees_are_refused() {
        let mut tree = Node::text("x");
        for _ in 0..20 {
            tree = Node::Strong {
                children: vec![tree],
            };
        }
        let options = RenderOptions {
            max_depth: 10,
            ..Default::default()
        };
        assert_eq!(
            render(&tree, options).unwrap_err(),
            RenderError::DepthExceeded { limit: 10 }
        );
    }
}
