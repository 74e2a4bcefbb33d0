//! Closed classification of Rust grammar constructs.
//!
//! Replacement matching compares [`SyntaxCategory`] values, never raw
//! tree-sitter kind strings. Several grammar kinds fold into one category
//! where the language treats them as the same construct (`struct` and `union`,
//! `const` and `static`, the statement forms), so a generator that answers with
//! a sibling form still lands on the right node.

use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyntaxCategory {
    /// Synthetic top-level container (`source_file`).
    FileUnit,
    Function,
    Struct,
    Enum,
    Trait,
    Impl,
    Module,
    TypeAlias,
    Constant,
    Use,
    MacroDefinition,
    Attribute,
    Statement,
    Block,
    Expression,
    Field,
    Variant,
    MatchArm,
    DeclarationList,
    Parameters,
    Parameter,
    Type,
    Pattern,
    Identifier,
    Literal,
    Comment,
    Other,
}

impl SyntaxCategory {
    /// Classify a tree-sitter node.
    ///
    /// Macro invocations in item position (directly under a file or an item
    /// body) classify as statements, which is how the same invocation appears
    /// inside a function body.
    pub fn classify(node: tree_sitter::Node<'_>) -> Self {
        let kind = node.kind();
        if kind == "macro_invocation" {
            let item_position = node
                .parent()
                .is_some_and(|p| matches!(p.kind(), "source_file" | "declaration_list"));
            return if item_position {
                SyntaxCategory::Statement
            } else {
                SyntaxCategory::Expression
            };
        }
        Self::from_kind(kind)
    }

    /// Classify a grammar kind without positional context.
    pub fn from_kind(kind: &str) -> Self {
        use SyntaxCategory::*;

        match kind {
            "source_file" => FileUnit,
            "function_item" | "function_signature_item" => Function,
            "struct_item" | "union_item" => Struct,
            "enum_item" => Enum,
            "trait_item" => Trait,
            "impl_item" => Impl,
            "mod_item" | "foreign_mod_item" => Module,
            "type_item" | "associated_type" => TypeAlias,
            "const_item" | "static_item" => Constant,
            "use_declaration" | "extern_crate_declaration" => Use,
            "macro_definition" => MacroDefinition,
            "attribute_item" | "inner_attribute_item" => Attribute,
            "let_declaration" | "expression_statement" | "empty_statement" => Statement,
            "block" => Block,
            "field_declaration" => Field,
            "enum_variant" => Variant,
            "match_arm" => MatchArm,
            "declaration_list"
            | "field_declaration_list"
            | "ordered_field_declaration_list"
            | "enum_variant_list" => DeclarationList,
            "parameters" | "closure_parameters" => Parameters,
            "parameter" | "self_parameter" | "variadic_parameter" => Parameter,
            "line_comment" | "block_comment" => Comment,
            "identifier"
            | "field_identifier"
            | "shorthand_field_identifier"
            | "type_identifier" => Identifier,
            "macro_invocation" | "unsafe_block" | "async_block" | "const_block" | "try_block"
            | "gen_block" => Expression,
            "primitive_type" | "mutable_specifier" => Type,
            k if k.ends_with("_expression") => Expression,
            k if k.ends_with("_literal") => Literal,
            k if k.ends_with("_type") => Type,
            k if k.ends_with("_pattern") => Pattern,
            _ => Other,
        }
    }

    /// Named declarations that can stand on their own at file or module level.
    pub fn is_item(self) -> bool {
        use SyntaxCategory::*;

        matches!(
            self,
            Function
                | Struct
                | Enum
                | Trait
                | Impl
                | Module
                | TypeAlias
                | Constant
                | Use
                | MacroDefinition
        )
    }

    pub fn as_str(self) -> &'static str {
        use SyntaxCategory::*;

        match self {
            FileUnit => "file-unit",
            Function => "function",
            Struct => "struct",
            Enum => "enum",
            Trait => "trait",
            Impl => "impl",
            Module => "module",
            TypeAlias => "type-alias",
            Constant => "constant",
            Use => "use",
            MacroDefinition => "macro-definition",
            Attribute => "attribute",
            Statement => "statement",
            Block => "block",
            Expression => "expression",
            Field => "field",
            Variant => "variant",
            MatchArm => "match-arm",
            DeclarationList => "declaration-list",
            Parameters => "parameters",
            Parameter => "parameter",
            Type => "type",
            Pattern => "pattern",
            Identifier => "identifier",
            Literal => "literal",
            Comment => "comment",
            Other => "other",
        }
    }
}

impl fmt::Display for SyntaxCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_kinds() {
        assert_eq!(SyntaxCategory::from_kind("function_item"), SyntaxCategory::Function);
        assert_eq!(SyntaxCategory::from_kind("union_item"), SyntaxCategory::Struct);
        assert_eq!(SyntaxCategory::from_kind("static_item"), SyntaxCategory::Constant);
        assert!(SyntaxCategory::Impl.is_item());
        assert!(!SyntaxCategory::Statement.is_item());
    }

    #[test]
    fn suffix_families() {
        assert_eq!(SyntaxCategory::from_kind("binary_expression"), SyntaxCategory::Expression);
        assert_eq!(SyntaxCategory::from_kind("string_literal"), SyntaxCategory::Literal);
        assert_eq!(SyntaxCategory::from_kind("reference_type"), SyntaxCategory::Type);
        assert_eq!(SyntaxCategory::from_kind("tuple_pattern"), SyntaxCategory::Pattern);
        assert_eq!(SyntaxCategory::from_kind("ERROR"), SyntaxCategory::Other);
    }

    #[test]
    fn statements_share_a_category() {
        assert_eq!(
            SyntaxCategory::from_kind("let_declaration"),
            SyntaxCategory::from_kind("expression_statement")
        );
    }
}
