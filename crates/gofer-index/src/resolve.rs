use std::path::{Path, PathBuf};

use gofer_core::{TextRange, TextSize};

use crate::WorkspaceIndex;

/// What a source position denotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    /// The package clause of a file in `dir`.
    PackageClause { dir: PathBuf },
    /// An import spec, or a qualifier bound by one.
    ImportedPackage { import_path: String },
    /// Any other declaration or reference.
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub object: Resolved,
    /// The identifier (or path literal) under the cursor.
    pub range: TextRange,
    pub text: String,
}

/// Maps a file position to the object it denotes.
pub trait PositionResolver: Send + Sync {
    /// `None` means nothing resolvable sits at `offset`.
    fn resolve(&self, file: &Path, offset: TextSize) -> Option<Resolution>;
}

impl PositionResolver for WorkspaceIndex {
    fn resolve(&self, path: &Path, offset: TextSize) -> Option<Resolution> {
        let file = self.file(path)?;
        let syntax = &file.syntax;
        // Without a package clause nothing in the file type-checks.
        let clause = syntax.package.as_ref()?;

        if clause.range.contains_inclusive(offset) {
            return Some(Resolution {
                object: Resolved::PackageClause {
                    dir: file.dir().to_path_buf(),
                },
                range: clause.name_range,
                text: clause.name.clone(),
            });
        }

        if let Some(spec) = syntax.import_at(offset) {
            let (range, text) = match &spec.name {
                Some(name) if name.range.contains_inclusive(offset) => {
                    (name.range, name.text.clone())
                }
                _ => (spec.path_range, spec.path.clone()),
            };
            return Some(Resolution {
                object: Resolved::ImportedPackage {
                    import_path: spec.path.clone(),
                },
                range,
                text,
            });
        }

        if let Some(reference) = syntax.qualifier_at(offset) {
            let spec = if syntax.is_shadowed(reference) {
                None
            } else {
                syntax.imports.iter().find(|spec| {
                    self.bound_identifier(spec).as_deref() == Some(reference.qualifier.as_str())
                })
            };
            return Some(Resolution {
                object: match spec {
                    Some(spec) => Resolved::ImportedPackage {
                        import_path: spec.path.clone(),
                    },
                    None => Resolved::Other,
                },
                range: reference.qualifier_range,
                text: reference.qualifier.clone(),
            });
        }

        if let Some(reference) = syntax.selector_at(offset) {
            return Some(Resolution {
                object: Resolved::Other,
                range: reference.selector_range,
                text: reference.selector.clone(),
            });
        }

        syntax.decl_at(offset).map(|decl| Resolution {
            object: Resolved::Other,
            range: decl.range,
            text: decl.name.clone(),
        })
    }
}
