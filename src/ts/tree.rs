//! Owned syntax tree with parent links.
//!
//! [`SyntaxTree`] copies the named nodes of a tree-sitter parse into an arena
//! so nodes can be navigated upward ([`SyntaxNode::parent`]) and shared across
//! threads without holding the tree-sitter tree. Anonymous tokens (`{`, `fn`,
//! `;`) are left out.
//!
//! Outer attributes belong to the construct they annotate: an `attribute_item`
//! is folded into its next significant sibling, whose span then starts at the
//! first attribute. Comments between the attributes and the construct are
//! folded with them.

use crate::document::Span;
use crate::pool;
use crate::ts::category::SyntaxCategory;
use crate::ts::errors::TreeSitterError;
use crate::ts::parser::ErrorNode;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct NodeData {
    category: SyntaxCategory,
    kind: &'static str,
    span: Span,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Immutable arena of syntax nodes over a shared text buffer.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    text: Arc<str>,
    nodes: Vec<NodeData>,
    errors: Vec<ErrorNode>,
}

impl SyntaxTree {
    /// Parse `text` with a pooled Rust parser.
    ///
    /// Syntax errors do not fail the parse; they are recorded and available
    /// through [`SyntaxTree::errors`].
    pub fn parse(text: Arc<str>) -> Result<Self, TreeSitterError> {
        pool::with_parser(|parser| {
            let parsed = parser.parse(&text)?;
            let errors = parsed.error_nodes();
            let mut builder = Builder { nodes: Vec::new() };
            builder.push_root(parsed.root_node(), text.len());
            Ok(SyntaxTree {
                nodes: builder.nodes,
                errors,
                text: Arc::clone(&text),
            })
        })?
    }

    pub fn root(&self) -> SyntaxNode<'_> {
        SyntaxNode {
            tree: self,
            id: NodeId(0),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// ERROR and MISSING nodes found while parsing.
    pub fn errors(&self) -> &[ErrorNode] {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn node(&self, id: NodeId) -> SyntaxNode<'_> {
        SyntaxNode { tree: self, id }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find the node for a selection.
    ///
    /// Descends to the deepest node whose span contains `span`, then climbs
    /// to the outermost ancestor that has exactly the same span.
    pub fn find_node_at(&self, span: Span) -> Result<SyntaxNode<'_>, TreeSitterError> {
        let root = self.root();
        if span.start > span.end || !root.span().contains(span) {
            return Err(TreeSitterError::SpanOutOfBounds {
                span,
                len: self.text.len(),
            });
        }

        let mut node = root;
        while let Some(child) = node.children().find(|c| c.span().contains(span)) {
            node = child;
        }

        while let Some(parent) = node.parent() {
            if parent.span() != node.span() {
                break;
            }
            node = parent;
        }

        Ok(node)
    }
}

struct Builder {
    nodes: Vec<NodeData>,
}

impl Builder {
    fn push_root(&mut self, root: tree_sitter::Node<'_>, text_len: usize) {
        // The root always covers the whole buffer, including leading and
        // trailing trivia that tree-sitter leaves outside `source_file`.
        self.nodes.push(NodeData {
            category: SyntaxCategory::classify(root),
            kind: root.kind(),
            span: Span::new(0, text_len),
            parent: None,
            children: Vec::new(),
        });
        let children = self.push_children(root, NodeId(0));
        self.nodes[0].children = children;
    }

    fn push_node(
        &mut self,
        node: tree_sitter::Node<'_>,
        parent: NodeId,
        leading: &[tree_sitter::Node<'_>],
    ) -> NodeId {
        let start = leading.first().map_or(node.start_byte(), |n| n.start_byte());
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData {
            category: SyntaxCategory::classify(node),
            kind: node.kind(),
            span: Span::new(start, node.end_byte()),
            parent: Some(parent),
            children: Vec::new(),
        });

        let mut children = Vec::new();
        for attr in leading {
            children.push(self.push_node(*attr, id, &[]));
        }
        children.extend(self.push_children(node, id));
        self.nodes[id.0].children = children;
        id
    }

    fn push_children(&mut self, node: tree_sitter::Node<'_>, id: NodeId) -> Vec<NodeId> {
        let mut cursor = node.walk();
        let named: Vec<tree_sitter::Node<'_>> = node.named_children(&mut cursor).collect();

        let mut children = Vec::with_capacity(named.len());
        let mut pending: Vec<tree_sitter::Node<'_>> = Vec::new();
        for child in named {
            let kind = child.kind();
            if kind == "attribute_item" || (!pending.is_empty() && is_comment_kind(kind)) {
                pending.push(child);
                continue;
            }
            children.push(self.push_node(child, id, &pending));
            pending.clear();
        }
        // attributes with nothing after them stay as plain children
        for orphan in pending {
            children.push(self.push_node(orphan, id, &[]));
        }
        children
    }
}

fn is_comment_kind(kind: &str) -> bool {
    matches!(kind, "line_comment" | "block_comment")
}

/// A handle to one node of a [`SyntaxTree`].
#[derive(Clone, Copy)]
pub struct SyntaxNode<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl<'t> SyntaxNode<'t> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    fn data(&self) -> &'t NodeData {
        &self.tree.nodes[self.id.0]
    }

    pub fn category(&self) -> SyntaxCategory {
        self.data().category
    }

    /// Raw grammar kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        self.data().kind
    }

    pub fn span(&self) -> Span {
        self.data().span
    }

    pub fn text(&self) -> &'t str {
        let span = self.span();
        &self.tree.text[span.start..span.end]
    }

    pub fn parent(&self) -> Option<SyntaxNode<'t>> {
        self.data().parent.map(|id| self.tree.node(id))
    }

    pub fn is_root(&self) -> bool {
        self.data().parent.is_none()
    }

    pub fn children(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        let tree = self.tree;
        self.data().children.iter().map(move |&id| tree.node(id))
    }

    pub fn child_count(&self) -> usize {
        self.data().children.len()
    }

    /// Children that are not comments.
    pub fn significant_children(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        self.children()
            .filter(|c| c.category() != SyntaxCategory::Comment)
    }

    /// This node followed by its parent chain up to the root.
    pub fn ancestors(&self) -> impl Iterator<Item = SyntaxNode<'t>> + 't {
        std::iter::successors(Some(*self), |n| n.parent())
    }

    /// Number of parent links between this node and the root.
    pub fn depth(&self) -> usize {
        self.ancestors().count() - 1
    }
}

impl PartialEq for SyntaxNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for SyntaxNode<'_> {}

impl fmt::Debug for SyntaxNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({}) @ {}", self.category(), self.kind(), self.span())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(source: &str) -> SyntaxTree {
        SyntaxTree::parse(Arc::from(source)).unwrap()
    }

    fn assert_span_invariants(node: SyntaxNode<'_>) {
        let mut prev_end = node.span().start;
        for child in node.children() {
            assert!(
                node.span().contains(child.span()),
                "{child:?} escapes {node:?}"
            );
            assert!(child.span().start >= prev_end, "{child:?} overlaps a sibling");
            prev_end = child.span().end;
            assert_eq!(child.parent(), Some(node));
            assert_span_invariants(child);
        }
    }

    #[test]
    fn root_covers_buffer() {
        let source = "\n\n// leading\nfn main() {}\n\n";
        let tree = tree(source);
        let root = tree.root();
        assert_eq!(root.category(), SyntaxCategory::FileUnit);
        assert_eq!(root.span(), Span::new(0, source.len()));
        assert!(root.is_root());
    }

    #[test]
    fn spans_nest_and_order() {
        let tree = tree(
            r#"
#[derive(Debug)]
struct Point { x: i32, y: i32 }

impl Point {
    /// Length.
    #[inline]
    fn len(&self) -> f64 {
        let sq = (self.x * self.x + self.y * self.y) as f64;
        sq.sqrt()
    }
}
"#,
        );
        assert_span_invariants(tree.root());
    }

    #[test]
    fn attributes_fold_into_item() {
        let source = "#[derive(Debug)]\n#[allow(dead_code)]\nstruct Foo;\n";
        let tree = tree(source);
        let items: Vec<_> = tree.root().children().collect();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].category(), SyntaxCategory::Struct);
        assert_eq!(items[0].text(), "#[derive(Debug)]\n#[allow(dead_code)]\nstruct Foo;");

        let inner: Vec<_> = items[0].children().map(|c| c.category()).collect();
        assert_eq!(&inner[..2], &[SyntaxCategory::Attribute, SyntaxCategory::Attribute]);
    }

    #[test]
    fn trailing_attribute_stays_standalone() {
        let tree = tree("fn a() {}\n#[cfg(test)]\n");
        let kinds: Vec<_> = tree.root().children().map(|c| c.category()).collect();
        assert_eq!(kinds, vec![SyntaxCategory::Function, SyntaxCategory::Attribute]);
    }

    #[test]
    fn find_node_at_statement() {
        let source = "fn main() {\n    let x = 1;\n    x + 1;\n}\n";
        let tree = tree(source);
        let start = source.find("let").unwrap();
        let end = start + "let x = 1;".len();

        let node = tree.find_node_at(Span::new(start, end)).unwrap();
        assert_eq!(node.category(), SyntaxCategory::Statement);
        assert_eq!(node.text(), "let x = 1;");
    }

    #[test]
    fn find_node_at_prefers_outermost_with_same_span() {
        // a lone item shares its span with the file unit
        let tree = tree("fn a() {}");
        let node = tree.find_node_at(Span::new(0, 9)).unwrap();
        assert!(node.is_root());

        let name = tree.find_node_at(Span::at(3, 1)).unwrap();
        assert_eq!(name.category(), SyntaxCategory::Identifier);
    }

    #[test]
    fn find_node_at_rejects_out_of_bounds() {
        let tree = tree("fn a() {}");
        let err = tree.find_node_at(Span::new(3, 100)).unwrap_err();
        assert!(matches!(err, TreeSitterError::SpanOutOfBounds { len: 9, .. }));
    }

    #[test]
    fn ancestors_end_at_root() {
        let source = "mod m { fn f() { call(); } }";
        let tree = tree(source);
        let start = source.find("call").unwrap();
        let node = tree.find_node_at(Span::at(start, 4)).unwrap();
        let last = node.ancestors().last().unwrap();
        assert!(last.is_root());
        assert_eq!(node.depth(), node.ancestors().count() - 1);
        assert!(node
            .ancestors()
            .any(|n| n.category() == SyntaxCategory::Module));
    }

    #[test]
    fn errors_are_recorded() {
        let tree = tree("fn a( {");
        assert!(tree.has_errors());
    }
}
