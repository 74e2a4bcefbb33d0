//! Tree-sitter integration for Rust syntax trees.
//!
//! Parsing goes through tree-sitter, and the named nodes are copied into an
//! owned [`SyntaxTree`] with parent links and a closed [`SyntaxCategory`]
//! per node. Byte spans are exact, so comments and formatting outside an edit
//! are never touched.

pub mod category;
pub mod errors;
pub mod parser;
pub mod tree;

pub use category::SyntaxCategory;
pub use errors::TreeSitterError;
pub use parser::{ErrorNode, ParsedSource, RustParser};
pub use tree::{NodeId, SyntaxNode, SyntaxTree};
