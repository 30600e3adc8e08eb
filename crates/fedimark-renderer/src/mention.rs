//! Mention segmentation
//!
//! Splits text leaves of a parsed tree into alternating `text` and `mention`
//! nodes. A mention is `@name` or the federated `@name@domain.tld`. Email
//! addresses are never mentions: links to `mailto:` are first dissolved back
//! into prose, and any `@` that continues an address is left as plain text.

use regex::{Match, Regex};
use std::sync::LazyLock;

use crate::ast::Node;
use crate::error::SegmentError;

/// The single source of truth for the mention grammar.
///
/// `@`, an identifier that starts and ends with a letter, digit or `_` and may
/// contain `.` and `-` in between, then optionally `@` and a dotted domain whose
/// last label is at least two letters. Letters and digits are Unicode aware.
pub static MENTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"@[\p{L}\p{N}_](?:[\p{L}\p{N}_.-]*[\p{L}\p{N}_])?(?:@(?:[\p{L}\p{N}-]+\.)+\p{L}{2,})?",
    )
    .unwrap()
});

const MAILTO: &str = "mailto:";

pub const DEFAULT_MAX_DEPTH: usize = 512;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionOptions {
    /// Turn the whole pass off, including `mailto:` link normalization.
    pub skip_mention_parsing: bool,
    /// Leave text sitting directly under a link alone. Link labels often
    /// already spell out a full address.
    pub treat_link_children_as_opaque: bool,
    /// Deepest nesting the traversal will follow before giving up.
    pub max_depth: usize,
}

impl Default for MentionOptions {
    fn default() -> Self {
        Self {
            skip_mention_parsing: false,
            treat_link_children_as_opaque: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Segment every eligible text leaf of `tree` in place.
///
/// Text nodes without a mention are left exactly as they were. A bare leaf
/// passed as `tree` has no parent to splice into and is left alone as well.
#[tracing::instrument(level = "debug", skip_all, fields(skip = options.skip_mention_parsing))]
pub fn segment(tree: &mut Node, options: &MentionOptions) -> Result<(), SegmentError> {
    if options.skip_mention_parsing {
        return Ok(());
    }
    let mut segmenter = Segmenter {
        options,
        mentions: 0,
    };
    segmenter.visit(tree, 1)?;
    tracing::debug!(mentions = segmenter.mentions, "segmented document");
    Ok(())
}

struct Segmenter<'o> {
    options: &'o MentionOptions,
    mentions: usize,
}

impl Segmenter<'_> {
    fn visit(&mut self, node: &mut Node, depth: usize) -> Result<(), SegmentError> {
        if depth > self.options.max_depth {
            return Err(SegmentError::DepthExceeded {
                limit: self.options.max_depth,
            });
        }
        // Unrecognised structure passes through untouched.
        if matches!(node, Node::Unknown(_)) {
            return Ok(());
        }
        let opaque = self.options.treat_link_children_as_opaque && matches!(node, Node::Link { .. });
        let Some(children) = node.children_mut() else {
            return Ok(());
        };

        dissolve_mail_links(children);

        for child in children.iter_mut() {
            self.visit(child, depth + 1)?;
        }

        if opaque {
            return Ok(());
        }

        // Collect first, then splice back to front so earlier indices stay valid.
        let edits: Vec<(usize, Vec<Node>)> = children
            .iter()
            .enumerate()
            .filter_map(|(index, child)| match child {
                Node::Text { value } => split_mentions(value).map(|segments| (index, segments)),
                _ => None,
            })
            .collect();

        for (index, segments) in edits.into_iter().rev() {
            self.mentions += segments
                .iter()
                .filter(|s| matches!(s, Node::Mention { .. }))
                .count();
            children.splice(index..=index, segments);
        }
        Ok(())
    }
}

/// Split `text` into text and mention nodes.
///
/// Returns `None` when the text holds no mention, so the caller can keep the
/// original node. Concatenating the values of the returned nodes gives back
/// `text`, and no returned text node is empty.
pub fn split_mentions(text: &str) -> Option<Vec<Node>> {
    let mut segments = Vec::new();
    let mut last = 0;

    for found in mention_matches(text) {
        if found.start() > last {
            segments.push(Node::text(&text[last..found.start()]));
        }
        segments.push(Node::mention(found.as_str()));
        last = found.end();
    }

    if segments.is_empty() {
        return None;
    }
    if last < text.len() {
        segments.push(Node::text(&text[last..]));
    }
    Some(segments)
}

/// Mentions in `text`, in order, with email fragments filtered out.
pub fn mention_matches(text: &str) -> impl Iterator<Item = Match<'_>> {
    MENTION_RE
        .find_iter(text)
        .filter(move |found| is_mention(text, found))
}

fn is_mention(text: &str, found: &Match<'_>) -> bool {
    let before = &text[..found.start()];
    // `someone@host`, `a+tag@host`, `@@x`: the `@` continues an address.
    if before.chars().next_back().is_some_and(continues_address) {
        return false;
    }
    if before
        .len()
        .checked_sub(MAILTO.len())
        .and_then(|at| before.get(at..))
        .is_some_and(|tail| tail.eq_ignore_ascii_case(MAILTO))
    {
        return false;
    }
    // `@bob@localhost`: a federated handle whose domain did not match.
    // `@bob@example.com1`: the match stops short of the real token.
    !text[found.end()..]
        .chars()
        .next()
        .is_some_and(|c| c == '@' || is_word_char(c))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn continues_address(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '-' | '+' | '@')
}

fn strip_mailto(s: &str) -> Option<&str> {
    s.get(..MAILTO.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(MAILTO))
        .map(|_| &s[MAILTO.len()..])
}

fn is_mail_link(node: &Node) -> bool {
    matches!(node, Node::Link { url, .. } if strip_mailto(url).is_some())
}

/// Replace every `mailto:` link among `children` with its label as plain text,
/// merged into the text siblings on either side.
fn dissolve_mail_links(children: &mut Vec<Node>) {
    if !children.iter().any(is_mail_link) {
        return;
    }

    let mut out = Vec::with_capacity(children.len());
    let mut absorb_next = false;

    for child in std::mem::take(children) {
        match child {
            Node::Link { url, children, .. } if strip_mailto(&url).is_some() => {
                let label: String = children.iter().map(Node::to_plain_text).collect();
                let label = strip_mailto(&label).unwrap_or(&label);
                match out.last_mut() {
                    Some(Node::Text { value }) => value.push_str(label),
                    // An empty label with nothing to merge into simply vanishes.
                    _ if label.is_empty() => {}
                    _ => out.push(Node::text(label)),
                }
                absorb_next = matches!(out.last(), Some(Node::Text { .. }));
            }
            Node::Text { value } if absorb_next => {
                match out.last_mut() {
                    Some(Node::Text { value: prev }) => prev.push_str(&value),
                    _ => out.push(Node::Text { value }),
                }
                absorb_next = false;
            }
            other => {
                absorb_next = false;
                out.push(other);
            }
        }
    }

    *children = out;
}
