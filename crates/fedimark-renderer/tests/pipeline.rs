use fedimark_renderer::element::to_html;
use fedimark_renderer::{
    ElementTag, MentionOptions, Node, NodeKind, ParseOptions, RenderOptions, UiElement,
    parse_markdown, render, segment,
};

fn render_markdown(text: &str, options: RenderOptions<UiElement>) -> String {
    let tree = parse_markdown(text, &ParseOptions::with_mentions(MentionOptions::default()))
        .expect("segmentation succeeds");
    to_html(&render(&tree, options).expect("render succeeds"))
}

#[test]
fn mentions_render_as_styled_spans() {
    insta::assert_snapshot!(
        render_markdown("hello @alice and @bob@example.com!", RenderOptions::default()),
        @r#"<div data-node-style="default" data-node-type="root"><p data-node-style="default" data-node-type="paragraph"><span data-node-style="default" data-node-type="text">hello </span><span class="mention" data-node-style="default" data-node-type="mention">@alice</span><span data-node-style="default" data-node-type="text"> and </span><span class="mention" data-node-style="default" data-node-type="mention">@bob@example.com</span><span data-node-style="default" data-node-type="text">!</span></p></div>"#
    );
}

#[test]
fn mail_links_collapse_to_plain_text() {
    insta::assert_snapshot!(
        render_markdown("write to <foo@bar.com>", RenderOptions::default()),
        @r#"<div data-node-style="default" data-node-type="root"><p data-node-style="default" data-node-type="paragraph"><span data-node-style="default" data-node-type="text">write to foo@bar.com</span></p></div>"#
    );
}

#[test]
fn links_respect_origin() {
    let html = render_markdown(
        "[home](https://example.social/about) and [away](https://other.net)",
        RenderOptions::default().with_origin("https://example.social"),
    );
    assert!(html.contains(r#"data-link="internal" data-node-style="default" data-node-type="link" href="https://example.social/about""#));
    assert!(html.contains(r#"data-link="external" data-node-style="default" data-node-type="link" href="https://other.net""#));
}

#[test]
fn mention_override_can_link_profiles() {
    let options = RenderOptions::default().with_override(NodeKind::Mention, |node| UiElement {
        tag: ElementTag::AppLink,
        attrs: fedimark_renderer::Attributes::new()
            .with("href", format!("/users/{}", node.to_plain_text().trim_start_matches('@'))),
        content: fedimark_renderer::Content::Text(node.to_plain_text()),
    });
    insta::assert_snapshot!(
        render_markdown("cc @carol", options),
        @r#"<div data-node-style="default" data-node-type="root"><p data-node-style="default" data-node-type="paragraph"><span data-node-style="default" data-node-type="text">cc </span><a href="/users/carol">@carol</a></p></div>"#
    );
}

#[test]
fn external_mdast_trees_are_accepted() {
    let mut tree: Node = serde_json::from_str(
        r#"{
            "type": "root",
            "children": [
                {"type": "paragraph", "children": [
                    {"type": "text", "value": "ping @dave@host.example"}
                ]},
                {"type": "footnoteDefinition", "identifier": "1", "children": []}
            ]
        }"#,
    )
    .unwrap();
    segment(&mut tree, &MentionOptions::default()).unwrap();
    let rendered = render(&tree, RenderOptions::default()).unwrap();
    let root = &rendered[0];
    assert_eq!(root.children().len(), 2);
    assert_eq!(root.children()[0].children()[1].tag, ElementTag::Mention);
    assert_eq!(root.children()[1].tag, ElementTag::Placeholder);
    assert_eq!(
        root.children()[1].text_content(),
        "Unknown node type: footnoteDefinition"
    );
}

#[test]
fn segmented_tree_round_trips_through_json() {
    let tree = parse_markdown(
        "# Hi @erin\n\n- [x] done",
        &ParseOptions::with_mentions(MentionOptions::default()),
    )
    .unwrap();
    let json = serde_json::to_string(&tree).unwrap();
    let back: Node = serde_json::from_str(&json).unwrap();
    assert_eq!(back, tree);
    assert!(json.contains(r#"{"type":"mention","value":"@erin"}"#));
}

#[test]
fn math_renders_to_mathml() {
    let html = render_markdown("$$\n\\frac{1}{2}\n$$", RenderOptions::default());
    if cfg!(feature = "math") {
        assert!(html.contains("<math"), "{html}");
    } else {
        assert!(html.contains("math-error"), "{html}");
    }
}
