use crate::document::Span;
use crate::ts::errors::TreeSitterError;
use ast_grep_language::{LanguageExt, SupportLang};
use tree_sitter::{Node, Parser, Tree};

/// Tree-sitter parser loaded with the Rust grammar.
pub struct RustParser {
    parser: Parser,
}

impl RustParser {
    pub fn new() -> Result<Self, TreeSitterError> {
        let mut parser = Parser::new();
        // The grammar comes from the ast-grep language bundle
        let language = SupportLang::Rust.get_ts_language();
        parser
            .set_language(&language)
            .map_err(|_| TreeSitterError::LanguageSet)?;

        Ok(Self { parser })
    }

    /// Parse `text`. Syntax errors do not fail the parse; they show up in
    /// [`ParsedSource::error_nodes`].
    pub fn parse<'s>(&mut self, text: &'s str) -> Result<ParsedSource<'s>, TreeSitterError> {
        let tree: Tree = self
            .parser
            .parse(text, None)
            .ok_or(TreeSitterError::ParseFailed)?;
        Ok(ParsedSource { text, tree })
    }
}

/// A buffer together with its tree-sitter tree.
pub struct ParsedSource<'s> {
    pub text: &'s str,
    pub tree: Tree,
}

impl ParsedSource<'_> {
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn has_errors(&self) -> bool {
        !self.error_nodes().is_empty()
    }

    /// ERROR and MISSING nodes, in document order.
    ///
    /// Visits every node: a MISSING token can sit under a subtree that does
    /// not report `has_error`.
    pub fn error_nodes(&self) -> Vec<ErrorNode> {
        let mut errors = Vec::new();
        let mut cursor = self.tree.walk();

        loop {
            let node = cursor.node();
            if node.is_error() || node.is_missing() {
                errors.push(ErrorNode::from_node(node));
            }

            if cursor.goto_first_child() || cursor.goto_next_sibling() {
                continue;
            }
            // climb until a sibling is found, or stop at the root
            loop {
                if !cursor.goto_parent() {
                    return errors;
                }
                if cursor.goto_next_sibling() {
                    break;
                }
            }
        }
    }
}

/// An ERROR or MISSING node of a parse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorNode {
    pub span: Span,
    /// 0-based row of the node start
    pub row: usize,
    /// 0-based byte column of the node start
    pub column: usize,
    /// Kind of the token the parser inserted, for MISSING nodes
    pub missing: Option<&'static str>,
}

impl ErrorNode {
    fn from_node(node: Node<'_>) -> Self {
        let start = node.start_position();
        Self {
            span: Span::new(node.start_byte(), node.end_byte()),
            row: start.row,
            column: start.column,
            missing: node.is_missing().then(|| node.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_rust() {
        let mut parser = RustParser::new().unwrap();
        let parsed = parser.parse("fn main() { println!(\"hello\"); }").unwrap();

        assert!(!parsed.has_errors());
        assert_eq!(parsed.root_node().kind(), "source_file");
    }

    #[test]
    fn reports_error_nodes_in_order() {
        let mut parser = RustParser::new().unwrap();
        let parsed = parser.parse("fn a( {}\nfn b() {}\nfn c( {}\n").unwrap();

        let errors = parsed.error_nodes();
        assert!(!errors.is_empty());
        assert!(errors.windows(2).all(|w| w[0].span.start <= w[1].span.start));
        assert_eq!(errors[0].row, 0);
    }

    #[test]
    fn missing_closing_brace_is_reported() {
        let mut parser = RustParser::new().unwrap();
        let parsed = parser.parse("fn main() {").unwrap();
        assert!(parsed.has_errors());
    }
}
