//! Go source extraction on top of `tree-sitter-go`.
//!
//! Recovers the facts the workspace model needs (package clause, import specs,
//! top-level declaration names, qualified references and the function-local
//! bindings that can hide an import) and tolerates malformed input.

mod file;
mod ident;
mod scope;
mod tree;

pub use file::{parse_file, Decl, DeclKind, ImportName, ImportSpec, PackageClause, ParsedFile, QualifiedRef};
pub use ident::{is_identifier, is_keyword, is_valid_package_name, KEYWORDS};
pub use scope::LocalBinding;
pub use tree::parse_go;
