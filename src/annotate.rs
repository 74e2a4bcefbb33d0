//! Keep rejected responses as inert comments.
//!
//! When generated text does not parse, the original code stays as it is and
//! the raw response is inserted as a block of line comments on the line
//! before the anchor, indented like it. Line comments are used because Rust
//! block comments nest and a stray `/*` in the response would swallow code.

use crate::document::SourceDocument;
use crate::edit::{EditError, TextEdit};
use crate::ts::SyntaxNode;

/// First line of every annotation block.
pub const ANNOTATION_HEADER: &str = "AI suggestion (could not be parsed):";

/// Build the edit that inserts `raw` as a comment block above `anchor`.
///
/// The block goes above the nearest ancestor-or-self that begins its line,
/// so it never lands inside a multi-line literal the anchor belongs to.
pub fn annotation_edit(
    document: &SourceDocument,
    anchor: SyntaxNode<'_>,
    raw: &str,
) -> Result<TextEdit, EditError> {
    let text = document.text();
    let (line_start, node_start) = anchor
        .ancestors()
        .filter(|node| !node.is_root())
        .find_map(|node| {
            let start = node.span().start;
            let line_start = line_start_of(text, start);
            text[line_start..start]
                .chars()
                .all(char::is_whitespace)
                .then_some((line_start, start))
        })
        .unwrap_or((0, 0));
    let indent = &text[line_start..node_start];
    let newline = if text.contains("\r\n") { "\r\n" } else { "\n" };

    let block = comment_block(raw, indent, newline);
    TextEdit::insertion(document, line_start, block)
}

fn line_start_of(text: &str, offset: usize) -> usize {
    text[..offset].rfind('\n').map_or(0, |i| i + 1)
}

fn comment_block(raw: &str, indent: &str, newline: &str) -> String {
    let mut block = String::with_capacity(raw.len() + 64);
    push_comment_line(&mut block, indent, ANNOTATION_HEADER, newline);
    for line in raw.trim_end().lines() {
        push_comment_line(&mut block, indent, line, newline);
    }
    block
}

fn push_comment_line(block: &mut String, indent: &str, line: &str, newline: &str) {
    block.push_str(indent);
    block.push_str("//");
    let line = line.trim_end();
    if !line.is_empty() {
        block.push(' ');
        block.push_str(line);
    }
    block.push_str(newline);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Span;
    use crate::response;

    #[test]
    fn inserts_indented_block_before_anchor_line() {
        let doc = SourceDocument::new("fn a() {\n    let x = 1;\n}\n");
        let tree = doc.syntax_tree().unwrap();
        let start = doc.text().find("let").unwrap();
        let anchor = tree.find_node_at(Span::at(start, 10)).unwrap();

        let edit = annotation_edit(&doc, anchor, "let x = {\n\n  broken").unwrap();
        let annotated = edit.apply_to(&doc).unwrap();

        assert_eq!(
            annotated.text(),
            concat!(
                "fn a() {\n",
                "    // AI suggestion (could not be parsed):\n",
                "    // let x = {\n",
                "    //\n",
                "    //   broken\n",
                "    let x = 1;\n",
                "}\n",
            )
        );
    }

    #[test]
    fn annotated_document_still_parses() {
        let doc = SourceDocument::new("struct S;\n");
        let tree = doc.syntax_tree().unwrap();
        let anchor = tree.find_node_at(Span::new(0, 9)).unwrap();

        let edit = annotation_edit(&doc, anchor, "struct S { /* unterminated").unwrap();
        let annotated = edit.apply_to(&doc).unwrap();

        assert!(annotated.text().ends_with("struct S;\n"));
        assert!(!annotated.syntax_tree().unwrap().has_errors());
        assert!(response::parse(annotated.text()).is_ok());
    }

    #[test]
    fn block_never_lands_inside_a_multi_line_string() {
        let source = "fn a() {\n    let s = \"one\n\ttwo\";\n}\n";
        let doc = SourceDocument::new(source);
        let tree = doc.syntax_tree().unwrap();
        let start = source.find("two").unwrap();
        let anchor = tree.find_node_at(Span::at(start, 3)).unwrap();
        assert!(!anchor.text().starts_with("let"));

        let edit = annotation_edit(&doc, anchor, "broken(").unwrap();
        let annotated = edit.apply_to(&doc).unwrap();

        assert_eq!(
            annotated.text(),
            concat!(
                "fn a() {\n",
                "    // AI suggestion (could not be parsed):\n",
                "    // broken(\n",
                "    let s = \"one\n\ttwo\";\n",
                "}\n",
            )
        );
    }

    #[test]
    fn keeps_crlf_line_endings() {
        let doc = SourceDocument::new("fn a() {}\r\nfn b() {}\r\n");
        let tree = doc.syntax_tree().unwrap();
        let start = doc.text().find("fn b").unwrap();
        let anchor = tree.find_node_at(Span::at(start, 9)).unwrap();

        let edit = annotation_edit(&doc, anchor, "oops(").unwrap();
        assert_eq!(edit.span, Span::empty(start));
        assert!(edit.new_text.ends_with("// oops(\r\n"));
        assert!(!edit.new_text.replace("\r\n", "").contains('\n'));
    }
}
