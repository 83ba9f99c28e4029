//! Function-local bindings.
//!
//! Only names declared inside function bodies and signatures are recorded.
//! Package-level declarations can't share a name with an import, so they never
//! hide one.

use gofer_core::{TextRange, TextSize};
use serde::Serialize;
use tree_sitter::Node;

use crate::tree::{field_children, has_define, named_children, node_range, node_text, offset};

/// A name bound inside a function, and the part of the file where it is visible.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalBinding {
    pub name: String,
    pub range: TextRange,
    pub scope: TextRange,
}

pub(crate) fn local_bindings(src: &str, root: Node<'_>) -> Vec<LocalBinding> {
    let mut scopes = Scopes {
        src,
        ends: Vec::new(),
        out: Vec::new(),
    };
    scopes.walk(root);
    scopes.out
}

struct Scopes<'s> {
    src: &'s str,
    /// End offsets of the enclosing scopes, innermost last.
    ends: Vec<TextSize>,
    out: Vec<LocalBinding>,
}

impl Scopes<'_> {
    fn declare(&mut self, ident: Node<'_>, from: TextSize) {
        let Some(&end) = self.ends.last() else {
            return;
        };
        let name = node_text(self.src, ident);
        if name == "_" || name.is_empty() || from > end {
            return;
        }
        self.out.push(LocalBinding {
            name: name.to_string(),
            range: node_range(ident),
            scope: TextRange::new(from, end),
        });
    }

    fn declare_all(&mut self, list: Node<'_>, from: TextSize) {
        for ident in identifiers(list) {
            self.declare(ident, from);
        }
    }

    fn scoped(&mut self, node: Node<'_>, f: impl FnOnce(&mut Self)) {
        self.ends.push(offset(node.end_byte()));
        f(self);
        self.ends.pop();
    }

    fn walk_children(&mut self, node: Node<'_>) {
        for child in named_children(node) {
            self.walk(child);
        }
    }

    fn walk_fields(&mut self, node: Node<'_>, fields: &[&str]) {
        for field in fields {
            for child in field_children(node, field) {
                self.walk(child);
            }
        }
    }

    fn walk(&mut self, node: Node<'_>) {
        match node.kind() {
            "function_declaration" | "method_declaration" | "func_literal" => self.function(node),
            "type_switch_statement" => self.scoped(node, |s| {
                let value = node.child_by_field_name("value");
                if let Some(init) = node.child_by_field_name("initializer") {
                    s.walk(init);
                }
                if let Some(value) = value {
                    s.walk(value);
                }
                if let (Some(alias), Some(value)) = (node.child_by_field_name("alias"), value) {
                    s.declare_all(alias, offset(value.end_byte()));
                }
                for child in named_children(node) {
                    if child.kind().ends_with("case") {
                        s.walk(child);
                    }
                }
            }),
            "block"
            | "if_statement"
            | "for_statement"
            | "expression_switch_statement"
            | "select_statement"
            | "expression_case"
            | "type_case"
            | "default_case"
            | "communication_case" => self.scoped(node, |s| s.walk_children(node)),
            "short_var_declaration" => {
                self.walk_fields(node, &["right"]);
                if let Some(left) = node.child_by_field_name("left") {
                    self.declare_all(left, offset(node.end_byte()));
                }
            }
            "range_clause" | "receive_statement" => {
                self.walk_fields(node, &["right"]);
                if has_define(node) {
                    if let Some(left) = node.child_by_field_name("left") {
                        self.declare_all(left, offset(node.end_byte()));
                    }
                }
            }
            "var_spec" | "const_spec" => {
                self.walk_fields(node, &["type", "value"]);
                for name in field_children(node, "name") {
                    self.declare(name, offset(node.end_byte()));
                }
            }
            "type_spec" | "type_alias" => {
                // A type is in scope inside its own definition.
                if let Some(name) = node.child_by_field_name("name") {
                    self.declare(name, offset(name.start_byte()));
                }
                self.walk_fields(node, &["type_parameters", "type"]);
            }
            _ => self.walk_children(node),
        }
    }

    /// Receiver, parameters and named results are visible in the body only,
    /// so qualified types in the signature still resolve at file scope.
    fn function(&mut self, node: Node<'_>) {
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        self.walk_fields(node, &["receiver", "type_parameters", "parameters", "result"]);
        self.scoped(body, |s| {
            let from = offset(body.start_byte());
            for field in ["receiver", "type_parameters", "parameters", "result"] {
                let Some(list) = node.child_by_field_name(field) else {
                    continue;
                };
                // A bare result type declares nothing.
                if list.kind().ends_with("parameter_list") {
                    for param in named_children(list) {
                        for name in field_children(param, "name") {
                            s.declare(name, from);
                        }
                    }
                }
            }
            s.walk(body);
        });
    }
}

/// The identifiers of an `expression_list`, or the node itself when it is one.
fn identifiers(node: Node<'_>) -> Vec<Node<'_>> {
    if node.kind() == "identifier" {
        return vec![node];
    }
    named_children(node)
        .into_iter()
        .filter(|child| child.kind() == "identifier")
        .collect()
}
