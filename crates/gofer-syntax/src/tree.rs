//! `tree-sitter-go` plumbing shared by the extractors.

use std::cell::RefCell;

use gofer_core::{TextRange, TextSize};
use tree_sitter::{Node, Parser, Tree};

thread_local! {
    static GO_PARSER: RefCell<Result<Parser, String>> = RefCell::new({
        let mut parser = Parser::new();
        match parser.set_language(tree_sitter_go::language()) {
            Ok(()) => Ok(parser),
            Err(_) => Err("tree-sitter-go language load failed".to_string()),
        }
    });
}

/// Parse Go source text with `tree-sitter-go`.
///
/// Syntax errors do not fail the parse; they show up as `ERROR` and missing
/// nodes in the returned tree.
pub fn parse_go(source: &str) -> Result<Tree, String> {
    GO_PARSER.with(|parser_cell| {
        let mut parser = parser_cell
            .try_borrow_mut()
            .map_err(|_| "tree-sitter parser is already in use".to_string())?;
        let parser = match parser.as_mut() {
            Ok(parser) => parser,
            Err(err) => return Err(err.clone()),
        };

        parser
            .parse(source, None)
            .ok_or_else(|| "tree-sitter failed to produce a syntax tree".to_string())
    })
}

/// Visit every node in a tree-sitter subtree (depth-first, pre-order).
pub(crate) fn visit_nodes<'a, F: FnMut(Node<'a>)>(node: Node<'a>, f: &mut F) {
    f(node);
    if node.child_count() == 0 {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        visit_nodes(child, f);
    }
}

pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    let children = node.named_children(&mut cursor).collect();
    children
}

pub(crate) fn field_children<'a>(node: Node<'a>, field: &str) -> Vec<Node<'a>> {
    let mut cursor = node.walk();
    let children = node.children_by_field_name(field, &mut cursor).collect();
    children
}

/// Find the first named child with the given kind.
pub(crate) fn find_named_child<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    let result = node
        .named_children(&mut cursor)
        .find(|child| child.kind() == kind);
    result
}

/// Whether `node` has an anonymous `:=` token among its direct children.
pub(crate) fn has_define(node: Node<'_>) -> bool {
    let mut cursor = node.walk();
    let result = node.children(&mut cursor).any(|child| child.kind() == ":=");
    result
}

/// Specs of `kind` directly under a declaration, looking through the
/// parenthesized `*_list` wrapper some grammar versions emit.
pub(crate) fn specs<'a>(decl: Node<'a>, kind: &str) -> Vec<Node<'a>> {
    let mut out = Vec::new();
    for child in named_children(decl) {
        if child.kind() == kind {
            out.push(child);
        } else if child.kind().ends_with("_list") {
            out.extend(named_children(child).into_iter().filter(|n| n.kind() == kind));
        }
    }
    out
}

/// Return the byte slice for `node` within `source`.
pub(crate) fn node_text<'a>(source: &'a str, node: Node<'_>) -> &'a str {
    &source[node.byte_range()]
}

pub(crate) fn node_range(node: Node<'_>) -> TextRange {
    TextRange::new(offset(node.start_byte()), offset(node.end_byte()))
}

pub(crate) fn offset(byte: usize) -> TextSize {
    TextSize::from(byte as u32)
}
