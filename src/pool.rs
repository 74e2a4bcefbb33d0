//! Thread-local parser pooling.
//!
//! Documents and generated responses are parsed many times per session;
//! each thread keeps one [`RustParser`] and reuses it for every parse.

use crate::ts::{RustParser, TreeSitterError};
use std::cell::RefCell;

thread_local! {
    static RUST_PARSER: RefCell<Option<RustParser>> = const { RefCell::new(None) };
}

/// Execute function with pooled parser instance.
///
/// On first call per thread, creates new parser. Subsequent calls reuse
/// the same parser instance.
///
/// # Example
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use splice_refactor::pool::with_parser;
///
/// let has_errors = with_parser(|parser| {
///     parser.parse("fn main() {}").map(|parsed| parsed.has_errors())
/// })??;
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(f: F) -> Result<R, TreeSitterError>
where
    F: FnOnce(&mut RustParser) -> R,
{
    RUST_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        let parser = match slot.take() {
            Some(parser) => parser,
            None => RustParser::new()?,
        };
        Ok(f(slot.insert(parser)))
    })
}
