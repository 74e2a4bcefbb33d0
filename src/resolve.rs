//! Node-to-replace resolution.
//!
//! Generated code rarely has the same granularity as the selection: a user
//! selects one statement and receives the whole method back, or asks about a
//! struct and gets the struct plus a new impl. The resolver walks from the
//! anchor (the node at the selection) towards the root and picks the first
//! node of the same [`SyntaxCategory`] as the replacement, which is the
//! smallest enclosing construct of the right shape.
//!
//! # Algorithm
//!
//! 1. If the replacement is a file unit with at least one significant child,
//!    the target category is that of its first child; otherwise it is the
//!    replacement's own category.
//! 2. Walk `anchor`, `anchor.parent()`, ... and return the first match.
//! 3. If nothing matches, including the root itself, return the root anyway
//!    (whole-document replacement). The walk takes at most
//!    `anchor.depth() + 1` steps.
//!
//! Matching is category equality only. A larger ancestor of the right
//! category wins over a same-span node of another category.

use crate::document::{SourceDocument, Span};
use crate::edit::{EditError, TextEdit};
use crate::response::ParsedResponse;
use crate::ts::{SyntaxCategory, SyntaxNode, TreeSitterError};
use thiserror::Error;

/// How the node to replace was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'t> {
    /// An ancestor-or-self of the anchor matched, `steps` parent links up.
    Matched { node: SyntaxNode<'t>, steps: usize },
    /// Only the root matched.
    RootMatched { node: SyntaxNode<'t> },
    /// Nothing matched; the whole document is replaced.
    RootFallback { node: SyntaxNode<'t> },
}

impl<'t> Resolution<'t> {
    pub fn node(&self) -> SyntaxNode<'t> {
        match *self {
            Resolution::Matched { node, .. }
            | Resolution::RootMatched { node }
            | Resolution::RootFallback { node } => node,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::RootFallback { .. })
    }

    pub fn kind(&self) -> ResolutionKind {
        match self {
            Resolution::Matched { steps, .. } => ResolutionKind::Matched { steps: *steps },
            Resolution::RootMatched { .. } => ResolutionKind::RootMatched,
            Resolution::RootFallback { .. } => ResolutionKind::RootFallback,
        }
    }
}

/// [`Resolution`] without the borrowed node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResolutionKind {
    Matched { steps: usize },
    RootMatched,
    RootFallback,
}

/// Effective top-level category of a replacement tree.
///
/// A file unit wrapping at least one construct is transparent: the first
/// child that is neither a comment nor an inner attribute decides. A unit
/// of inner attributes only is an attribute. Any other node stands for
/// itself.
pub fn target_category(replacement: SyntaxNode<'_>) -> SyntaxCategory {
    if replacement.category() == SyntaxCategory::FileUnit {
        let mut children = replacement.significant_children().peekable();
        let first = children.peek().copied();
        if let Some(decisive) = children.find(|c| c.kind() != "inner_attribute_item").or(first) {
            return decisive.category();
        }
    }
    replacement.category()
}

/// Resolve the node of `root`'s tree that `replacement` should replace.
pub fn resolve<'t>(
    root: SyntaxNode<'t>,
    anchor: SyntaxNode<'t>,
    replacement: SyntaxNode<'_>,
) -> Resolution<'t> {
    resolve_category(root, anchor, target_category(replacement))
}

/// The node to replace, without resolution details.
pub fn resolve_node<'t>(
    root: SyntaxNode<'t>,
    anchor: SyntaxNode<'t>,
    replacement: SyntaxNode<'_>,
) -> SyntaxNode<'t> {
    resolve(root, anchor, replacement).node()
}

/// Resolve against an already computed target category.
pub fn resolve_category<'t>(
    root: SyntaxNode<'t>,
    anchor: SyntaxNode<'t>,
    target: SyntaxCategory,
) -> Resolution<'t> {
    debug_assert!(
        std::ptr::eq(root.tree(), anchor.tree()),
        "anchor must belong to the root's tree"
    );

    for (steps, node) in anchor.ancestors().enumerate() {
        if node.category() == target {
            if node.is_root() && steps > 0 {
                return Resolution::RootMatched { node };
            }
            tracing::debug!(%target, steps, kind = node.kind(), "matched replacement target");
            return Resolution::Matched { node, steps };
        }
    }

    tracing::warn!(
        %target,
        anchor = anchor.kind(),
        "no ancestor matches the replacement; replacing the whole document"
    );
    Resolution::RootFallback { node: root }
}

#[derive(Error, Debug)]
pub enum SpliceError {
    #[error(transparent)]
    TreeSitter(#[from] TreeSitterError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// A resolved replacement, ready to apply.
#[derive(Debug, Clone)]
pub struct Splice {
    /// Category the response asked for.
    pub target_category: SyntaxCategory,
    /// Category of the node that is replaced; differs on fallback.
    pub replaced_category: SyntaxCategory,
    pub replaced_kind: &'static str,
    pub resolution: ResolutionKind,
    pub edit: TextEdit,
}

impl Splice {
    pub fn target_span(&self) -> Span {
        self.edit.span
    }
}

/// Plan the edit that puts `response` in place of the node resolved from
/// `anchor`. The full response text is inserted, even when it holds several
/// declarations.
pub fn plan_splice(
    document: &SourceDocument,
    anchor: SyntaxNode<'_>,
    response: &ParsedResponse,
) -> Result<Splice, SpliceError> {
    let root = anchor.tree().root();
    let target = target_category(response.root());
    let resolution = resolve_category(root, anchor, target);
    let node = resolution.node();
    let edit = TextEdit::against(document, node.span(), response.text())?;

    Ok(Splice {
        target_category: target,
        replaced_category: node.category(),
        replaced_kind: node.kind(),
        resolution: resolution.kind(),
        edit,
    })
}

/// Plan a splice for a selection span in `document`.
pub fn plan_splice_at(
    document: &SourceDocument,
    selection: Span,
    response: &ParsedResponse,
) -> Result<Splice, SpliceError> {
    let tree = document.syntax_tree()?;
    let anchor = tree.find_node_at(selection)?;
    plan_splice(document, anchor, response)
}
