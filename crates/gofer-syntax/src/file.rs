use gofer_core::{TextRange, TextSize};
use serde::Serialize;
use tree_sitter::Node;

use crate::scope::{local_bindings, LocalBinding};
use crate::tree::{find_named_child, named_children, node_range, node_text, offset, parse_go, specs, visit_nodes};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageClause {
    pub name: String,
    pub name_range: TextRange,
    /// From the `package` keyword to the end of the name.
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportName {
    pub text: String,
    pub range: TextRange,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportSpec {
    pub name: Option<ImportName>,
    pub path: String,
    /// The path contents, excluding quotes.
    pub path_range: TextRange,
    /// The quoted literal.
    pub literal_range: TextRange,
    pub range: TextRange,
}

impl ImportSpec {
    pub fn is_blank(&self) -> bool {
        self.name.as_ref().is_some_and(|name| name.text == "_")
    }

    pub fn is_dot(&self) -> bool {
        self.name.as_ref().is_some_and(|name| name.text == ".")
    }

    /// The explicit local name, unless the import is blank or dot.
    pub fn alias(&self) -> Option<&str> {
        match &self.name {
            Some(name) if name.text != "_" && name.text != "." => Some(name.text.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeclKind {
    Func,
    Const,
    Var,
    Type,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decl {
    pub name: String,
    pub range: TextRange,
    pub kind: DeclKind,
}

/// `x.Sel` with a plain identifier operand, in expression (`fmt.Println`) or
/// type (`lib.T`) position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualifiedRef {
    pub qualifier: String,
    pub qualifier_range: TextRange,
    pub selector: String,
    pub selector_range: TextRange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedFile {
    pub package: Option<PackageClause>,
    pub imports: Vec<ImportSpec>,
    /// Package-level declarations; methods are not included.
    pub decls: Vec<Decl>,
    pub qualified_refs: Vec<QualifiedRef>,
    pub locals: Vec<LocalBinding>,
}

impl ParsedFile {
    pub fn package_name(&self) -> Option<&str> {
        self.package.as_ref().map(|clause| clause.name.as_str())
    }

    pub fn import_at(&self, offset: TextSize) -> Option<&ImportSpec> {
        self.imports
            .iter()
            .find(|spec| spec.range.contains_inclusive(offset))
    }

    pub fn qualifier_at(&self, offset: TextSize) -> Option<&QualifiedRef> {
        self.qualified_refs
            .iter()
            .find(|r| r.qualifier_range.contains_inclusive(offset))
    }

    pub fn selector_at(&self, offset: TextSize) -> Option<&QualifiedRef> {
        self.qualified_refs
            .iter()
            .find(|r| r.selector_range.contains_inclusive(offset))
    }

    /// The innermost function-local binding of `name` visible at `offset`.
    pub fn local_binding(&self, name: &str, offset: TextSize) -> Option<&LocalBinding> {
        self.locals
            .iter()
            .filter(|b| b.name == name && b.scope.contains(offset))
            .max_by_key(|b| b.scope.start())
    }

    /// Whether the qualifier names a local rather than anything declared at
    /// file scope (an import in particular).
    pub fn is_shadowed(&self, reference: &QualifiedRef) -> bool {
        self.local_binding(&reference.qualifier, reference.qualifier_range.start())
            .is_some()
    }

    pub fn decl_at(&self, offset: TextSize) -> Option<&Decl> {
        self.decls
            .iter()
            .find(|decl| decl.range.contains_inclusive(offset))
    }
}

pub fn parse_file(src: &str) -> ParsedFile {
    let Ok(tree) = parse_go(src) else {
        return ParsedFile::default();
    };
    let root = tree.root_node();
    let mut out = ParsedFile::default();
    top_level(src, root, &mut out);
    out.qualified_refs = qualified_refs(src, root);
    out.locals = local_bindings(src, root);
    out
}

fn top_level(src: &str, parent: Node<'_>, out: &mut ParsedFile) {
    for node in named_children(parent) {
        match node.kind() {
            "package_clause" if out.package.is_none() => out.package = package_clause(src, node),
            "import_declaration" => out.imports.extend(
                specs(node, "import_spec")
                    .into_iter()
                    .filter_map(|spec| import_spec(src, spec)),
            ),
            "function_declaration" => {
                if let Some(name) = node.child_by_field_name("name") {
                    out.decls.push(decl(src, name, DeclKind::Func));
                }
            }
            "const_declaration" => value_decls(src, node, "const_spec", DeclKind::Const, out),
            "var_declaration" => value_decls(src, node, "var_spec", DeclKind::Var, out),
            "type_declaration" => {
                let types = specs(node, "type_spec")
                    .into_iter()
                    .chain(specs(node, "type_alias"))
                    .filter_map(|spec| spec.child_by_field_name("name"));
                let mut types: Vec<_> = types.collect();
                types.sort_by_key(|name| name.start_byte());
                out.decls
                    .extend(types.into_iter().map(|name| decl(src, name, DeclKind::Type)));
            }
            // Keep whatever tree-sitter recovered around a syntax error.
            "ERROR" => top_level(src, node, out),
            _ => {}
        }
    }
}

fn package_clause(src: &str, node: Node<'_>) -> Option<PackageClause> {
    let name = find_named_child(node, "package_identifier").filter(|n| !n.is_missing())?;
    Some(PackageClause {
        name: node_text(src, name).to_string(),
        name_range: node_range(name),
        range: node_range(node),
    })
}

fn import_spec(src: &str, node: Node<'_>) -> Option<ImportSpec> {
    let literal = node.child_by_field_name("path").filter(|n| !n.is_missing())?;
    let text = node_text(src, literal);
    let start = literal.start_byte() + 1;
    let end = match text.chars().next() {
        Some(quote) if text.len() >= 2 && text.ends_with(quote) => literal.end_byte() - 1,
        Some(_) => literal.end_byte(),
        None => return None,
    };
    let path_range = TextRange::new(offset(start), offset(end));
    let name = node.child_by_field_name("name").map(|name| ImportName {
        text: node_text(src, name).to_string(),
        range: node_range(name),
    });

    Some(ImportSpec {
        name,
        path: src[path_range].to_string(),
        path_range,
        literal_range: node_range(literal),
        range: node_range(node),
    })
}

fn value_decls(src: &str, node: Node<'_>, spec_kind: &str, kind: DeclKind, out: &mut ParsedFile) {
    for spec in specs(node, spec_kind) {
        let mut cursor = spec.walk();
        let names: Vec<_> = spec.children_by_field_name("name", &mut cursor).collect();
        out.decls
            .extend(names.into_iter().map(|name| decl(src, name, kind)));
    }
}

fn decl(src: &str, name: Node<'_>, kind: DeclKind) -> Decl {
    Decl {
        name: node_text(src, name).to_string(),
        range: node_range(name),
        kind,
    }
}

/// Only the head of a selector chain can name a package, so the operand has
/// to be a bare identifier.
fn qualified_refs(src: &str, root: Node<'_>) -> Vec<QualifiedRef> {
    let mut out = Vec::new();
    visit_nodes(root, &mut |node| {
        let (qualifier, selector) = match node.kind() {
            "selector_expression" => (
                node.child_by_field_name("operand"),
                node.child_by_field_name("field"),
            ),
            "qualified_type" => (
                node.child_by_field_name("package"),
                node.child_by_field_name("name"),
            ),
            _ => return,
        };
        let (Some(qualifier), Some(selector)) = (qualifier, selector) else {
            return;
        };
        if !matches!(qualifier.kind(), "identifier" | "package_identifier")
            || qualifier.is_missing()
            || selector.is_missing()
        {
            return;
        }
        out.push(QualifiedRef {
            qualifier: node_text(src, qualifier).to_string(),
            qualifier_range: node_range(qualifier),
            selector: node_text(src, selector).to_string(),
            selector_range: node_range(selector),
        });
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    fn names(file: &ParsedFile) -> Vec<(&str, DeclKind)> {
        file.decls
            .iter()
            .map(|decl| (decl.name.as_str(), decl.kind))
            .collect()
    }

    #[test]
    fn parses_package_imports_and_declarations() {
        let src = r#"// Package lib does things.
package lib

import (
	"fmt"
	lib1 "mod.com/lib/nested"
	_ "embed"
	. "strings"
)

import "os"

const (
	A, B = 1, 2
	C    = iota
)

var x = struct {
	field int
}{}

type (
	T struct {
		Inner int
	}
	U = T
)

func (t T) Method() {}

func F[P any](p P) {
	fmt.Println(p)
}
"#;
        let file = parse_file(src);
        let clause = file.package.as_ref().unwrap();
        assert_eq!(clause.name, "lib");
        assert_eq!(&src[clause.range], "package lib");

        let imports: Vec<_> = file
            .imports
            .iter()
            .map(|spec| (spec.name.as_ref().map(|n| n.text.as_str()), spec.path.as_str()))
            .collect();
        assert_eq!(
            imports,
            vec![
                (None, "fmt"),
                (Some("lib1"), "mod.com/lib/nested"),
                (Some("_"), "embed"),
                (Some("."), "strings"),
                (None, "os"),
            ]
        );
        assert_eq!(file.imports[1].alias(), Some("lib1"));
        assert!(file.imports[2].is_blank());
        assert!(file.imports[3].is_dot());
        assert_eq!(&src[file.imports[1].range], r#"lib1 "mod.com/lib/nested""#);
        assert_eq!(&src[file.imports[1].path_range], "mod.com/lib/nested");

        assert_eq!(
            names(&file),
            vec![
                ("A", DeclKind::Const),
                ("B", DeclKind::Const),
                ("C", DeclKind::Const),
                ("x", DeclKind::Var),
                ("T", DeclKind::Type),
                ("U", DeclKind::Type),
                ("F", DeclKind::Func),
            ]
        );

        let refs: Vec<_> = file
            .qualified_refs
            .iter()
            .map(|r| (r.qualifier.as_str(), r.selector.as_str()))
            .collect();
        assert_eq!(refs, vec![("fmt", "Println")]);
    }

    #[test]
    fn file_without_package_clause() {
        let file = parse_file("import \"fmt\"\n\nconst A = 1\n\nfunc bar() {\n\tfmt.Println(\"Bar\")\n}\n");
        assert_eq!(file.package, None);
        assert_eq!(file.imports.len(), 1);
        assert_eq!(names(&file), vec![("A", DeclKind::Const), ("bar", DeclKind::Func)]);
    }

    #[test]
    fn keeps_imports_ahead_of_a_syntax_error() {
        let src = "package lib_test\n\nimport (\n\t\"mod.com/lib\"\n\t\"fmt\"\n)\n\nconst C = 1\n\nfunc broken( {\n";
        let file = parse_file(src);
        assert_eq!(file.package_name(), Some("lib_test"));
        let paths: Vec<_> = file.imports.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(paths, vec!["mod.com/lib", "fmt"]);
        assert!(names(&file).contains(&("C", DeclKind::Const)));
    }

    #[test]
    fn raw_string_import_paths() {
        let src = "package main\n\nimport r `mod.com/raw`\n";
        let file = parse_file(src);
        let spec = &file.imports[0];
        assert_eq!(spec.path, "mod.com/raw");
        assert_eq!(&src[spec.literal_range], "`mod.com/raw`");
        assert_eq!(spec.alias(), Some("r"));
    }

    #[test]
    fn only_selector_chain_heads_are_qualifiers() {
        let file = parse_file("package main\n\nfunc main() {\n\tfoo.Bar().baz.Qux()\n\tx := 1.5\n}\n");
        let refs: Vec<_> = file
            .qualified_refs
            .iter()
            .map(|r| (r.qualifier.as_str(), r.selector.as_str()))
            .collect();
        assert_eq!(refs, vec![("foo", "Bar")]);
    }

    #[test]
    fn positions_map_to_syntax() {
        let src = "package main\n\nimport \"mod.com/foo\"\n\nfunc main() { foo.Bar() }\n";
        let file = parse_file(src);
        let at = |needle: &str| TextSize::from(src.find(needle).unwrap() as u32);

        assert_eq!(file.import_at(at("mod.com")).map(|s| s.path.as_str()), Some("mod.com/foo"));
        assert_eq!(file.qualifier_at(at("foo.Bar")).map(|r| r.selector.as_str()), Some("Bar"));
        assert_eq!(file.selector_at(at("Bar")).map(|r| r.qualifier.as_str()), Some("foo"));
        assert_eq!(file.decl_at(at("main()")).map(|d| d.kind), Some(DeclKind::Func));
    }

    #[test]
    fn qualified_types_are_references() {
        let src = "package main\n\nimport \"mod.com/lib\"\n\nvar v = []lib.T{lib.Make()}\n\nfunc f(p *lib.T) lib.G { return lib.Zero }\n";
        let file = parse_file(src);
        let refs: Vec<_> = file
            .qualified_refs
            .iter()
            .map(|r| (r.qualifier.as_str(), r.selector.as_str()))
            .collect();
        assert_eq!(
            refs,
            vec![
                ("lib", "T"),
                ("lib", "Make"),
                ("lib", "T"),
                ("lib", "G"),
                ("lib", "Zero"),
            ]
        );
        assert!(file.qualified_refs.iter().all(|r| !file.is_shadowed(r)));
    }

    #[test]
    fn locals_shadow_qualifiers() {
        let src = r#"package main

import "mod.com/lib"

func f(lib lib.T) int { return lib.N }

func g() {
	_ = lib.A
	if lib := lib.New(); lib.Ok {
		_ = lib.B
	}
	_ = lib.C
	for _, lib := range lib.List() {
		_ = lib.D
	}
	h := func() {
		var lib = 2
		_ = lib.E
	}
	h()
	_ = lib.F
}

func (lib *T) m() { _ = lib.G }
"#;
        let file = parse_file(src);
        let shadowed: Vec<_> = file
            .qualified_refs
            .iter()
            .map(|r| (r.selector.as_str(), file.is_shadowed(r)))
            .collect();
        assert_eq!(
            shadowed,
            vec![
                ("T", false),
                ("N", true),
                ("A", false),
                ("New", false),
                ("Ok", true),
                ("B", true),
                ("C", false),
                ("List", false),
                ("D", true),
                ("E", true),
                ("F", false),
                ("G", true),
            ]
        );

        let param = file.local_binding("lib", TextSize::from(src.find("lib.N").unwrap() as u32));
        assert_eq!(param.map(|b| &src[b.range]), Some("lib"));
        assert_eq!(param.map(|b| b.range.start()), Some(TextSize::from(src.find("lib lib.T").unwrap() as u32)));
    }
}
