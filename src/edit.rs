use crate::document::{DocumentVersion, SourceDocument, Span};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The span-text patch primitive: one verified byte-span replacement.
///
/// Resolution decides *where* generated code goes; applying it is always this
/// single substitution. Everything outside `span` is carried over untouched and
/// no tree is derived for the result.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "TextEdit does nothing until it is applied"]
pub struct TextEdit {
    /// Byte range `[start, end)` to replace
    pub span: Span,
    /// New text to insert at `span`
    pub new_text: String,
    /// Verification of what we expect to find before applying
    pub expected_before: EditVerification,
    /// Document version the edit was computed against, if any
    pub base_version: Option<DocumentVersion>,
}

/// Verification strategy for edit safety.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large spans)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("before-text verification failed at {span}")]
    BeforeTextMismatch {
        span: Span,
        expected: String,
        found: String,
    },

    #[error("invalid byte range {span} in buffer of length {len}")]
    InvalidByteRange { span: Span, len: usize },

    #[error("byte range {span} splits a UTF-8 character")]
    NotCharBoundary { span: Span },

    #[error("edit computed against {expected} applied to {found}")]
    VersionMismatch {
        expected: DocumentVersion,
        found: DocumentVersion,
    },

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Result of applying an edit to a file.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "EditResult should be checked for success/already-applied"]
pub enum EditResult {
    /// Edit was successfully applied
    Applied { file: PathBuf, bytes_changed: usize },
    /// Edit was already applied (current text matches new_text)
    AlreadyApplied { file: PathBuf },
}

impl TextEdit {
    /// Create an edit verified against `expected_before`.
    pub fn new(span: Span, new_text: impl Into<String>, expected_before: &str) -> Self {
        Self {
            span,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(expected_before),
            base_version: None,
        }
    }

    /// Create an edit against the current contents of `document`.
    ///
    /// Fails if `span` is out of range or splits a character, so a returned
    /// edit always applies cleanly to the same document.
    pub fn against(
        document: &SourceDocument,
        span: Span,
        new_text: impl Into<String>,
    ) -> Result<Self, EditError> {
        let before = checked_slice(document.text(), span)?;
        Ok(Self {
            span,
            new_text: new_text.into(),
            expected_before: EditVerification::from_text(before),
            base_version: Some(document.version()),
        })
    }

    /// Insert `text` at `offset` without removing anything.
    pub fn insertion(
        document: &SourceDocument,
        offset: usize,
        text: impl Into<String>,
    ) -> Result<Self, EditError> {
        Self::against(document, Span::empty(offset), text)
    }

    /// Validate the edit against `content`.
    ///
    /// Returns the current text at `span` if validation succeeds.
    fn validate<'a>(&self, content: &'a str) -> Result<&'a str, EditError> {
        let current = checked_slice(content, self.span)?;

        // Already applied
        if current == self.new_text {
            return Ok(current);
        }

        if !self.expected_before.matches(current) {
            return Err(EditError::BeforeTextMismatch {
                span: self.span,
                expected: format!("{:?}", self.expected_before),
                found: current.to_string(),
            });
        }

        Ok(current)
    }

    /// Splice the edit into `content`, returning the new buffer.
    pub fn splice(&self, content: &str) -> Result<String, EditError> {
        self.validate(content)?;

        let mut out = String::with_capacity(content.len() - self.span.len() + self.new_text.len());
        out.push_str(&content[..self.span.start]);
        out.push_str(&self.new_text);
        out.push_str(&content[self.span.end..]);
        Ok(out)
    }

    /// Apply the edit to a document, producing its successor version.
    ///
    /// All-or-nothing: on any error no document is produced.
    pub fn apply_to(&self, document: &SourceDocument) -> Result<SourceDocument, EditError> {
        if let Some(expected) = self.base_version {
            if expected != document.version() {
                return Err(EditError::VersionMismatch {
                    expected,
                    found: document.version(),
                });
            }
        }

        let text = self.splice(document.text())?;
        tracing::debug!(
            span = %self.span,
            removed = self.span.len(),
            inserted = self.new_text.len(),
            version = %document.version().next(),
            "applied text edit"
        );
        Ok(document.successor(text))
    }

    /// Apply this edit to a file atomically.
    ///
    /// Uses tempfile + fsync + rename for crash safety.
    pub fn apply_to_file(&self, file: &Path) -> Result<EditResult, EditError> {
        let original = String::from_utf8(fs::read(file)?)?;

        let current = self.validate(&original)?;
        if current == self.new_text {
            return Ok(EditResult::AlreadyApplied {
                file: file.to_path_buf(),
            });
        }

        let new_content = self.splice(&original)?;
        atomic_write(file, new_content.as_bytes())?;

        // Update mtime to invalidate incremental compilation
        let now = filetime::FileTime::now();
        filetime::set_file_mtime(file, now)?;

        Ok(EditResult::Applied {
            file: file.to_path_buf(),
            bytes_changed: self.new_text.len(),
        })
    }
}

fn checked_slice(content: &str, span: Span) -> Result<&str, EditError> {
    if span.start > span.end || span.end > content.len() {
        return Err(EditError::InvalidByteRange {
            span,
            len: content.len(),
        });
    }
    content
        .get(span.start..span.end)
        .ok_or(EditError::NotCharBoundary { span })
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or nothing changes.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    Ok(())
}
