//! An exclusively owned, parsed source file plus the literal edits queued
//! against it.
//!
//! The tree-sitter tree is never rebuilt while walking. Writes are recorded as
//! byte-range replacements of whole string literals and spliced into the
//! original text by [`SourceDocument::render`], so everything outside the
//! replaced literals (formatting, comments, line structure) is kept as is.

use std::collections::BTreeMap;
use std::ops::Range;

use thiserror::Error;
use tree_sitter::{Language, Node, Parser, Tree};

use super::languages::SourceLanguage;
use super::walker::CandidateWalker;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("grammar could not be loaded: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("parser produced no tree")]
    NoTree,

    #[error("syntax error at line {line}, column {column}")]
    Syntax { line: usize, column: usize },
}

/// Write handle for one string literal in the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralSlot {
    /// Byte range of the literal, quotes included.
    pub range: Range<usize>,
    pub quote: char,
    /// JSX attribute strings have no escape sequences.
    pub jsx: bool,
}

pub struct SourceDocument {
    language: Language,
    text: String,
    tree: Tree,
    edits: BTreeMap<usize, (Range<usize>, String)>,
}

impl SourceDocument {
    /// Parse `text` with the grammar for `language`.
    ///
    /// tree-sitter always recovers, so any ERROR or MISSING node in the tree is
    /// treated as a failed parse.
    pub fn parse(text: String, language: &SourceLanguage) -> Result<Self, DocumentError> {
        let tree = parse_clean(&language.language, &text)?;
        Ok(Self {
            language: language.language.clone(),
            text,
            tree,
            edits: BTreeMap::new(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Every candidate position in document order.
    pub fn candidates(&self) -> CandidateWalker<'_> {
        CandidateWalker::new(&self.tree, &self.text)
    }

    /// Replace the literal at `slot` so that it evaluates to `value`.
    ///
    /// Writing the same slot twice keeps the last value.
    pub fn set_literal(&mut self, slot: &LiteralSlot, value: &str) {
        self.edits.insert(
            slot.range.start,
            (slot.range.clone(), encode_literal(value, slot)),
        );
    }

    pub fn is_modified(&self) -> bool {
        !self.edits.is_empty()
    }

    /// Produce the rewritten source text.
    ///
    /// The result is re-parsed; output that no longer parses cleanly is
    /// rejected instead of returned.
    pub fn render(&self) -> Result<String, DocumentError> {
        let mut out = String::with_capacity(self.text.len());
        let mut pos = 0;
        for (range, replacement) in self.edits.values() {
            if range.start < pos {
                continue;
            }
            out.push_str(&self.text[pos..range.start]);
            out.push_str(replacement);
            pos = range.end;
        }
        out.push_str(&self.text[pos..]);

        parse_clean(&self.language, &out)?;
        Ok(out)
    }
}

fn parse_clean(language: &Language, text: &str) -> Result<Tree, DocumentError> {
    let mut parser = Parser::new();
    parser.set_language(language)?;
    let tree = parser.parse(text, None).ok_or(DocumentError::NoTree)?;

    let root = tree.root_node();
    if root.has_error() {
        let at = first_error(root).unwrap_or(root).start_position();
        return Err(DocumentError::Syntax {
            line: at.row + 1,
            column: at.column + 1,
        });
    }
    Ok(tree)
}

fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

/// Render `value` as a literal using the slot's original quote style.
fn encode_literal(value: &str, slot: &LiteralSlot) -> String {
    if slot.jsx {
        let quote = if value.contains(slot.quote) {
            if slot.quote == '"' { '\'' } else { '"' }
        } else {
            slot.quote
        };
        return format!("{quote}{value}{quote}");
    }

    let mut out = String::with_capacity(value.len() + 2);
    out.push(slot.quote);
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if c == slot.quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(slot.quote);
    out
}
