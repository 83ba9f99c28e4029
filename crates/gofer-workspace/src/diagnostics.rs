use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use gofer_core::TextRange;
use gofer_index::WorkspaceIndex;
use gofer_project::{FileKind, Package};
use gofer_syntax::DeclKind;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    DuplicateDeclaration,
    PackageNameMismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub file: PathBuf,
    pub range: TextRange,
    pub kind: DiagnosticKind,
    pub message: String,
    /// Other files participating in the problem.
    pub related: Vec<PathBuf>,
}

pub type DiagnosticMap = BTreeMap<PathBuf, Vec<Diagnostic>>;

/// Diagnostics of every file directly inside `dir`.
///
/// Files without problems are absent from the result.
pub fn package_diagnostics(index: &WorkspaceIndex, dir: &Path) -> DiagnosticMap {
    let mut out = DiagnosticMap::new();
    let Some(package) = index.package(dir) else {
        return out;
    };
    duplicate_declarations(index, package, &mut out);
    name_mismatches(index, package, &mut out);
    for diagnostics in out.values_mut() {
        diagnostics.sort_by_key(|d| (d.range.start(), d.kind as u8));
    }
    out
}

/// Diagnostics for every package in the index.
pub fn workspace_diagnostics(index: &WorkspaceIndex) -> DiagnosticMap {
    let mut out = DiagnosticMap::new();
    for package in index.packages() {
        out.extend(package_diagnostics(index, &package.dir));
    }
    out
}

fn duplicate_declarations(index: &WorkspaceIndex, package: &Package, out: &mut DiagnosticMap) {
    // Files declaring the same package name are type-checked together.
    let mut by_name: BTreeMap<&str, BTreeMap<&str, Vec<(&Path, TextRange)>>> = BTreeMap::new();
    for path in &package.files {
        let Some(file) = index.file(path) else {
            continue;
        };
        let Some(declared) = file.package_name() else {
            continue;
        };
        for decl in &file.syntax.decls {
            if decl.name == "_" || (decl.kind == DeclKind::Func && decl.name == "init") {
                continue;
            }
            by_name
                .entry(declared)
                .or_default()
                .entry(decl.name.as_str())
                .or_default()
                .push((file.path.as_path(), decl.range));
        }
    }

    for (name, sites) in by_name.into_values().flatten() {
        if sites.len() < 2 {
            continue;
        }
        for &(path, range) in &sites {
            let mut related: Vec<PathBuf> = sites
                .iter()
                .filter(|(other, _)| *other != path)
                .map(|(other, _)| other.to_path_buf())
                .collect();
            related.dedup();
            out.entry(path.to_path_buf()).or_default().push(Diagnostic {
                file: path.to_path_buf(),
                range,
                kind: DiagnosticKind::DuplicateDeclaration,
                message: format!("{name} redeclared in this block"),
                related,
            });
        }
    }
}

fn name_mismatches(index: &WorkspaceIndex, package: &Package, out: &mut DiagnosticMap) {
    let config = index.config();
    let Some(expected) = package.name.as_deref() else {
        return;
    };
    let files: Vec<_> = package
        .files
        .iter()
        .filter_map(|path| index.file(path))
        .collect();
    let mismatched: Vec<_> = files
        .iter()
        .filter(|file| package.is_mismatched(file, config))
        .collect();

    for file in &mismatched {
        let (Some(clause), Some(declared)) = (&file.syntax.package, file.package_name()) else {
            continue;
        };
        let message = if package.ambiguous_name && file.kind != FileKind::ExternalTest {
            let mut names: Vec<&str> = files
                .iter()
                .filter(|f| f.kind != FileKind::ExternalTest)
                .filter_map(|f| f.package_name())
                .collect();
            names.sort_unstable();
            names.dedup();
            format!(
                "found packages {} in {}",
                names.join(" and "),
                package.dir.display()
            )
        } else {
            let wanted = match file.kind {
                FileKind::ExternalTest => config.external_test_name(expected),
                FileKind::Regular | FileKind::InternalTest => expected.to_owned(),
            };
            format!("package {declared}; expected package {wanted}")
        };
        let related = mismatched
            .iter()
            .filter(|other| other.path != file.path)
            .map(|other| other.path.clone())
            .collect();
        out.entry(file.path.clone()).or_default().push(Diagnostic {
            file: file.path.clone(),
            range: clause.range,
            kind: DiagnosticKind::PackageNameMismatch,
            message,
            related,
        });
    }
}
