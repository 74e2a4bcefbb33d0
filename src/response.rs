//! Parsing of generated replacement code.
//!
//! A generator's answer is only usable if it parses cleanly as Rust. Any
//! ERROR or MISSING node rejects the whole response; callers treat a
//! [`ParseFailure`] as "no usable replacement", never as a fatal error.

use crate::document::Span;
use crate::ts::{ErrorNode, SyntaxCategory, SyntaxNode, SyntaxTree, TreeSitterError};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// One error-severity problem found while parsing a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub span: Span,
    /// 1-based line
    pub line: usize,
    /// 1-based column (bytes)
    pub column: usize,
    /// Kind of token the parser had to insert, for MISSING nodes
    pub missing: Option<&'static str>,
}

impl From<&ErrorNode> for Diagnostic {
    fn from(node: &ErrorNode) -> Self {
        Diagnostic {
            span: node.span,
            line: node.row + 1,
            column: node.column + 1,
            missing: node.missing,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.missing {
            Some(kind) => write!(f, "{}:{}: missing `{}`", self.line, self.column, kind),
            None => write!(f, "{}:{}: unexpected syntax", self.line, self.column),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("response contains no code")]
    Empty,

    #[error("response has {} syntax error(s)", .diagnostics.len())]
    Syntax { diagnostics: Vec<Diagnostic> },

    #[error("parser unavailable: {0}")]
    Parser(#[from] TreeSitterError),
}

/// A response that parsed without errors.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    tree: SyntaxTree,
}

impl ParsedResponse {
    /// The file-unit wrapper produced by the parser.
    pub fn root(&self) -> SyntaxNode<'_> {
        self.tree.root()
    }

    /// The full response text, as it will be inserted.
    pub fn text(&self) -> &str {
        self.tree.text()
    }

    /// Category the original node must have to be replaced by this response.
    pub fn target_category(&self) -> SyntaxCategory {
        crate::resolve::target_category(self.root())
    }

    /// Top-level constructs, excluding comments.
    pub fn declarations(&self) -> impl Iterator<Item = SyntaxNode<'_>> + '_ {
        self.root().significant_children()
    }
}

/// Raw generator output together with its parse outcome.
#[derive(Debug, Clone)]
pub struct GeneratedResponse {
    pub raw: String,
    pub outcome: Result<ParsedResponse, ParseFailure>,
}

impl GeneratedResponse {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let outcome = parse(&raw);
        Self { raw, outcome }
    }

    pub fn is_valid(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Parse generated code.
///
/// The text must not be empty: that is a caller bug and trips a debug
/// assertion. Text with no code besides whitespace and comments is
/// [`ParseFailure::Empty`], so an empty answer can never collapse a document.
pub fn parse(text: &str) -> Result<ParsedResponse, ParseFailure> {
    debug_assert!(!text.is_empty(), "response text must not be empty");

    if text.trim().is_empty() {
        return Err(ParseFailure::Empty);
    }

    let tree = SyntaxTree::parse(Arc::from(text))?;

    if tree.has_errors() {
        let diagnostics: Vec<Diagnostic> = tree.errors().iter().map(Diagnostic::from).collect();
        tracing::debug!(errors = diagnostics.len(), "response rejected");
        return Err(ParseFailure::Syntax { diagnostics });
    }

    if tree.root().significant_children().next().is_none() {
        return Err(ParseFailure::Empty);
    }

    let response = ParsedResponse { tree };
    tracing::debug!(
        declarations = response.declarations().count(),
        target = %response.target_category(),
        "response parsed"
    );
    Ok(response)
}
