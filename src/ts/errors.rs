use crate::document::Span;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeSitterError {
    #[error("failed to set language for parser")]
    LanguageSet,

    #[error("failed to parse source code")]
    ParseFailed,

    #[error("selection {span} lies outside the document (length {len})")]
    SpanOutOfBounds { span: Span, len: usize },
}
