//! Lazy, document-order traversal yielding every string position that could
//! hold an image URL.
//!
//! Bare string literals are reported on their own, independently of the JSX
//! attribute and object property visitors. A `src="..."` value is therefore
//! yielded twice (once as an attribute, once as a literal); deduplication
//! happens downstream on the URL value.

use tree_sitter::{Node, Tree, TreeCursor};

use super::document::LiteralSlot;

/// JSX attributes whose string values are inspected.
pub const JSX_URL_ATTRIBUTES: &[&str] = &["src", "srcSet", "href", "background", "backgroundImage"];

/// Object property keys whose string values are inspected.
pub const OBJECT_URL_KEYS: &[&str] = &["src", "url", "image", "backgroundImage"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Literal,
    JsxAttribute,
    ObjectProperty,
    Template,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub kind: CandidateKind,
    pub value: String,
    /// 1-based line of the literal.
    pub line: usize,
    /// `None` for template literals, which are reported but never rewritten.
    pub slot: Option<LiteralSlot>,
}

impl Candidate {
    pub fn is_rewritable(&self) -> bool {
        self.slot.is_some()
    }
}

/// The node shapes that can carry a candidate.
enum CandidateNode<'t> {
    Literal(Node<'t>),
    JsxAttribute { value: Node<'t> },
    ObjectProperty { value: Node<'t> },
    Template(Node<'t>),
}

impl<'t> CandidateNode<'t> {
    fn from_node(node: Node<'t>, source: &str) -> Option<Self> {
        // The `string` type keyword is an anonymous node of the same kind.
        if !node.is_named() {
            return None;
        }
        match node.kind() {
            "string" => Some(Self::Literal(node)),
            "template_string" => Some(Self::Template(node)),
            "jsx_attribute" => {
                let mut cursor = node.walk();
                let parts: Vec<Node<'t>> = node.named_children(&mut cursor).collect();
                let [name, .., value] = parts.as_slice() else {
                    return None;
                };
                let name = name.utf8_text(source.as_bytes()).ok()?;
                (value.kind() == "string" && JSX_URL_ATTRIBUTES.contains(&name))
                    .then_some(Self::JsxAttribute { value: *value })
            }
            "pair" => {
                let key = node.child_by_field_name("key")?;
                let value = node.child_by_field_name("value")?;
                if value.kind() != "string" {
                    return None;
                }
                let key_name = match key.kind() {
                    "property_identifier" => key.utf8_text(source.as_bytes()).ok()?.to_string(),
                    "string" => string_value(key, source)?,
                    _ => return None,
                };
                OBJECT_URL_KEYS
                    .contains(&key_name.as_str())
                    .then_some(Self::ObjectProperty { value })
            }
            _ => None,
        }
    }

    fn kind(&self) -> CandidateKind {
        match self {
            Self::Literal(_) => CandidateKind::Literal,
            Self::JsxAttribute { .. } => CandidateKind::JsxAttribute,
            Self::ObjectProperty { .. } => CandidateKind::ObjectProperty,
            Self::Template(_) => CandidateKind::Template,
        }
    }

    fn node(&self) -> Node<'t> {
        match self {
            Self::Literal(n) | Self::Template(n) => *n,
            Self::JsxAttribute { value } | Self::ObjectProperty { value } => *value,
        }
    }

    fn read_value(&self, source: &str) -> Option<String> {
        match self {
            Self::Template(node) => template_value(*node, source),
            _ => string_value(self.node(), source),
        }
    }

    fn slot(&self, source: &str) -> Option<LiteralSlot> {
        if let Self::Template(_) = self {
            return None;
        }
        let node = self.node();
        let quote = source.get(node.start_byte()..)?.chars().next()?;
        Some(LiteralSlot {
            range: node.start_byte()..node.end_byte(),
            quote,
            jsx: is_jsx_string(node),
        })
    }
}

/// Pre-order iterator over the candidates of one tree.
pub struct CandidateWalker<'t> {
    cursor: TreeCursor<'t>,
    source: &'t str,
    done: bool,
}

impl<'t> CandidateWalker<'t> {
    pub fn new(tree: &'t Tree, source: &'t str) -> Self {
        Self {
            cursor: tree.walk(),
            source,
            done: false,
        }
    }

    fn next_node(&mut self) -> Option<Node<'t>> {
        if self.done {
            return None;
        }
        let node = self.cursor.node();
        if !self.cursor.goto_first_child() {
            while !self.cursor.goto_next_sibling() {
                if !self.cursor.goto_parent() {
                    self.done = true;
                    break;
                }
            }
        }
        Some(node)
    }
}

impl Iterator for CandidateWalker<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            let node = self.next_node()?;
            let Some(shape) = CandidateNode::from_node(node, self.source) else {
                continue;
            };
            let Some(value) = shape.read_value(self.source) else {
                continue;
            };
            return Some(Candidate {
                kind: shape.kind(),
                value,
                line: node.start_position().row + 1,
                slot: shape.slot(self.source),
            });
        }
    }
}

fn is_jsx_string(node: Node) -> bool {
    node.parent().is_some_and(|p| p.kind() == "jsx_attribute")
}

/// Cooked value of a string literal node.
fn string_value(node: Node, source: &str) -> Option<String> {
    let (start, end) = (node.start_byte(), node.end_byte());
    if end < start + 2 {
        return None;
    }
    let inner = source.get(start + 1..end - 1)?;
    if is_jsx_string(node) {
        Some(inner.to_string())
    } else {
        Some(decode_escapes(inner))
    }
}

/// Concatenation of the static chunks of a template literal, substitutions dropped.
fn template_value(node: Node, source: &str) -> Option<String> {
    let (start, end) = (node.start_byte(), node.end_byte());
    if end < start + 2 {
        return None;
    }
    let mut out = String::new();
    let mut pos = start + 1;
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if child.kind() == "template_substitution" {
            out.push_str(&decode_escapes(source.get(pos..child.start_byte())?));
            pos = child.end_byte();
        }
    }
    out.push_str(&decode_escapes(source.get(pos..end - 1)?));
    Some(out)
}

/// Decode JavaScript string escape sequences.
fn decode_escapes(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(esc) = chars.next() else {
            out.push('\\');
            break;
        };
        match esc {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' if !chars.peek().is_some_and(char::is_ascii_digit) => out.push('\0'),
            // Line continuation.
            '\n' | '\u{2028}' | '\u{2029}' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            'x' => {
                let hex: String = chars.by_ref().take(2).collect();
                push_code_point(&mut out, &hex, "\\x");
            }
            'u' => {
                let hex: String = if chars.peek() == Some(&'{') {
                    chars.next();
                    chars.by_ref().take_while(|&c| c != '}').collect()
                } else {
                    chars.by_ref().take(4).collect()
                };
                push_code_point(&mut out, &hex, "\\u");
            }
            other => out.push(other),
        }
    }
    out
}

fn push_code_point(out: &mut String, hex: &str, prefix: &str) {
    match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => {
            out.push_str(prefix);
            out.push_str(hex);
        }
    }
}
