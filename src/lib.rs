//! Splice Refactor: put generated code back where it belongs
//!
//! Given a Rust source document, a selected node and replacement code from an
//! external generator, work out which node of the original tree the code
//! should replace and apply it as one span-exact text edit.
//!
//! # Architecture
//!
//! All changes compile down to a single primitive: [`TextEdit`], a verified
//! byte-span replacement. The interesting part is choosing the span:
//!
//! 1. [`SyntaxTree::find_node_at`] turns the selection into an anchor node.
//! 2. [`response::parse`] parses the generated text, rejecting anything with
//!    syntax errors.
//! 3. [`resolve::resolve`] walks from the anchor to the first ancestor of the
//!    replacement's category.
//! 4. The edit is applied to an immutable [`SourceDocument`], producing the
//!    next version.
//!
//! [`session`] wraps these steps in a per-view state machine that collects a
//! prompt, calls a [`Generator`] and handles cancellation.
//!
//! # Safety
//!
//! - Edits verify the expected before-text before applying
//! - Unparsable responses never touch the original code
//! - Everything outside the replaced span is preserved byte for byte
//! - Atomic file writes (tempfile + fsync + rename)
//!
//! # Example
//!
//! ```
//! use splice_refactor::{resolve, response, SourceDocument, Span};
//!
//! let source = "impl S {\n    fn m(&self) {\n        self.a();\n    }\n}\n";
//! let document = SourceDocument::new(source);
//! let start = document.text().find("self.a();").unwrap();
//! let selection = Span::at(start, "self.a();".len());
//!
//! let reply = response::parse("fn m(&self) {\n        self.b();\n    }").unwrap();
//! let splice = resolve::plan_splice_at(&document, selection, &reply).unwrap();
//! let updated = splice.edit.apply_to(&document).unwrap();
//!
//! assert!(updated.text().contains("self.b();"));
//! assert!(!updated.text().contains("self.a();"));
//! ```

pub mod annotate;
pub mod config;
pub mod document;
pub mod edit;
pub mod generator;
pub mod pool;
pub mod resolve;
pub mod response;
pub mod session;
pub mod ts;

// Re-exports
pub use config::{discover, load_from_path, load_from_str, ConfigError, SpliceConfig};
pub use document::{DocumentVersion, SourceDocument, Span};
pub use edit::{EditError, EditResult, EditVerification, TextEdit};
pub use generator::{
    CommandGenerator, GenerationError, GenerationRequest, Generator, StaticGenerator,
};
pub use resolve::{Resolution, ResolutionKind, Splice, SpliceError};
pub use response::{GeneratedResponse, ParseFailure, ParsedResponse};
pub use session::{Invocation, Outcome, PromptReply, PromptUi, RefactorSession, Refactorer};
pub use ts::{SyntaxCategory, SyntaxNode, SyntaxTree, TreeSitterError};
