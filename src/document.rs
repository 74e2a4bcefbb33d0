//! Immutable, versioned source documents.
//!
//! A [`SourceDocument`] never changes after construction. Every edit produces
//! a new document with the next [`DocumentVersion`]; the previous value stays
//! valid. The syntax tree is derived lazily the first time it is requested and
//! cached for that version only.

use crate::edit::{EditError, TextEdit};
use crate::ts::{SyntaxTree, TreeSitterError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, OnceLock};
use xxhash_rust::xxh3::xxh3_64;

/// A contiguous byte range `[start, end)` within a text buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    /// Create a span from start and end offsets.
    ///
    /// # Panics
    ///
    /// Panics in debug builds if `end < start`.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "span end {end} precedes start {start}");
        Self { start, end }
    }

    /// Create a span from a start offset and a length.
    pub fn at(start: usize, len: usize) -> Self {
        Self {
            start,
            end: start + len,
        }
    }

    /// An empty span (insertion point) at `offset`.
    pub fn empty(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// True if `other` lies entirely inside this span.
    pub fn contains(&self, other: Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Error parsing a `START..END` span literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid span '{input}': expected START..END with START <= END")]
pub struct SpanParseError {
    pub input: String,
}

impl FromStr for Span {
    type Err = SpanParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || SpanParseError {
            input: s.to_string(),
        };
        let (start, end) = s.split_once("..").ok_or_else(err)?;
        let start: usize = start.trim().parse().map_err(|_| err())?;
        let end: usize = end.trim().parse().map_err(|_| err())?;
        if end < start {
            return Err(err());
        }
        Ok(Span { start, end })
    }
}

/// Monotonic version of a document lineage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentVersion(pub u64);

impl DocumentVersion {
    pub fn next(self) -> Self {
        DocumentVersion(self.0 + 1)
    }
}

impl fmt::Display for DocumentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// An immutable snapshot of a source buffer.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    text: Arc<str>,
    version: DocumentVersion,
    fingerprint: u64,
    tree: OnceLock<Arc<SyntaxTree>>,
}

impl SourceDocument {
    /// Create the first version of a document.
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        Self::with_version(text, DocumentVersion(0))
    }

    pub fn with_version(text: impl Into<Arc<str>>, version: DocumentVersion) -> Self {
        let text = text.into();
        let fingerprint = xxh3_64(text.as_bytes());
        Self {
            text,
            version,
            fingerprint,
            tree: OnceLock::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Shared handle to the buffer.
    pub fn buffer(&self) -> Arc<str> {
        Arc::clone(&self.text)
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn version(&self) -> DocumentVersion {
        self.version
    }

    /// xxh3 hash of the buffer contents.
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }

    /// Text covered by `span`, if the span is in bounds and on char boundaries.
    pub fn slice(&self, span: Span) -> Option<&str> {
        self.text.get(span.start..span.end)
    }

    /// The syntax tree for this version, parsed on first use.
    pub fn syntax_tree(&self) -> Result<Arc<SyntaxTree>, TreeSitterError> {
        if let Some(tree) = self.tree.get() {
            return Ok(Arc::clone(tree));
        }
        let parsed = Arc::new(SyntaxTree::parse(self.buffer())?);
        Ok(Arc::clone(self.tree.get_or_init(|| parsed)))
    }

    /// True once the tree for this version has been derived.
    pub fn has_tree(&self) -> bool {
        self.tree.get().is_some()
    }

    /// Replace `span` with `new_text`, returning the next document version.
    ///
    /// All text outside `span` is preserved byte-for-byte. The new document's
    /// tree is not derived until it is requested.
    pub fn patch(&self, span: Span, new_text: &str) -> Result<SourceDocument, EditError> {
        TextEdit::against(self, span, new_text)?.apply_to(self)
    }

    /// Build the successor version holding `text`.
    pub(crate) fn successor(&self, text: String) -> SourceDocument {
        SourceDocument::with_version(text, self.version.next())
    }
}

impl PartialEq for SourceDocument {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
            && self.fingerprint == other.fingerprint
            && self.text == other.text
    }
}

impl Eq for SourceDocument {}
