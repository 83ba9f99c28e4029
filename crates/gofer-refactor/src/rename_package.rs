use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use gofer_core::{normalize_path, rebase_path, relative_path, TextEdit, TextRange, WorkspaceEdit};
use gofer_index::{ImportGraph, WorkspaceIndex};
use gofer_project::{FileKind, Module, SourceFile};
use gofer_syntax::is_valid_package_name;
use gofer_vfs::FileSystem;

use crate::alias::{resolve_aliases, ImportEntry, ImportForm};
use crate::plan::{ImportRewrite, RenamePlan};
use crate::{RenameError, RenameTarget};

/// A package whose import path or name changes with the rename.
#[derive(Debug)]
struct Cascaded {
    old_path: String,
    new_path: String,
    old_ident: String,
    new_ident: String,
}

/// Plan renaming `target` to `new_name`.
///
/// The package directory moves to a sibling named `new_name` unless it is a
/// module root or already has that name. Packages below it in the same module
/// follow along; nested modules move physically but keep their import paths.
pub fn plan_package_rename(
    index: &WorkspaceIndex,
    graph: &dyn ImportGraph,
    fs: &dyn FileSystem,
    target: &RenameTarget,
    new_name: &str,
    base_version: u64,
) -> Result<RenamePlan, RenameError> {
    if !is_valid_package_name(new_name) {
        return Err(RenameError::InvalidPackageName {
            name: new_name.to_owned(),
        });
    }
    let module = index
        .module_by_root(&target.module_root)
        .ok_or_else(|| RenameError::MissingModuleInfo {
            package: target.name.clone(),
        })?;

    let new_dir = destination_dir(target, module, new_name);
    if let Some(new_dir) = &new_dir {
        if fs.exists(new_dir) {
            return Err(RenameError::NameCollisionOnDisk {
                path: new_dir.clone(),
            });
        }
    }
    let relocate = |path: &Path| -> PathBuf {
        new_dir
            .as_deref()
            .and_then(|to| rebase_path(path, &target.dir, to))
            .unwrap_or_else(|| path.to_path_buf())
    };

    let cascade = cascade_set(index, module, target, new_name, &relocate);
    let by_old_path: HashMap<&str, &Cascaded> = cascade
        .iter()
        .map(|pkg| (pkg.old_path.as_str(), pkg))
        .collect();

    let mut edit = WorkspaceEdit::new();
    if let Some(new_dir) = &new_dir {
        edit.add_move(&target.dir, new_dir);
    }

    for file in index.files_in_dir(&target.dir) {
        let Some(clause) = &file.syntax.package else {
            continue;
        };
        let wanted = match file.kind {
            FileKind::ExternalTest => index.config().external_test_name(new_name),
            FileKind::Regular | FileKind::InternalTest => new_name.to_owned(),
        };
        if clause.name != wanted {
            edit.add_edit(relocate(&file.path), TextEdit::new(clause.name_range, wanted));
        }
    }

    let importers: BTreeSet<PathBuf> = cascade
        .iter()
        .flat_map(|pkg| graph.find_importers(&pkg.old_path))
        .collect();
    for path in &importers {
        let Some(file) = index.file(path) else {
            continue;
        };
        rewrite_importer(index, file, &by_old_path, &relocate(path), &mut edit);
    }

    if new_dir.is_some() {
        for module in index.modules() {
            rewrite_replaces(module, &relocate, &mut edit);
        }
    }

    edit.normalize()?;

    let import_rewrites: Vec<ImportRewrite> = cascade
        .iter()
        .filter(|pkg| pkg.old_path != pkg.new_path)
        .map(|pkg| ImportRewrite {
            old_path: pkg.old_path.clone(),
            new_path: pkg.new_path.clone(),
        })
        .collect();

    tracing::debug!(
        target: "gofer.refactor",
        package = %target.import_path,
        new_name,
        moves = edit.moves.len(),
        files = edit.text_edits.len(),
        import_rewrites = import_rewrites.len(),
        importers = importers.len(),
        "package rename planned"
    );

    Ok(RenamePlan {
        base_version,
        target: target.clone(),
        new_name: new_name.to_owned(),
        import_rewrites,
        edit,
    })
}

fn destination_dir(target: &RenameTarget, module: &Module, new_name: &str) -> Option<PathBuf> {
    if target.dir == module.root {
        return None;
    }
    if target.dir.file_name().and_then(|name| name.to_str()) == Some(new_name) {
        return None;
    }
    Some(target.dir.parent()?.join(new_name))
}

fn cascade_set(
    index: &WorkspaceIndex,
    module: &Module,
    target: &RenameTarget,
    new_name: &str,
    relocate: &dyn Fn(&Path) -> PathBuf,
) -> Vec<Cascaded> {
    let mut out = Vec::new();
    for package in index.packages_under(&target.dir) {
        // Packages of a nested module keep their identity.
        if package.module_root.as_deref() != Some(module.root.as_path()) {
            continue;
        }
        let Some(old_path) = package.import_path.clone() else {
            continue;
        };
        let Some(new_path) = module.import_path_for(&relocate(&package.dir)) else {
            continue;
        };
        let old_ident = package
            .name
            .clone()
            .unwrap_or_else(|| last_segment(&old_path).to_owned());
        let new_ident = if package.dir == target.dir {
            new_name.to_owned()
        } else {
            old_ident.clone()
        };
        out.push(Cascaded {
            old_path,
            new_path,
            old_ident,
            new_ident,
        });
    }
    out
}

fn rewrite_importer(
    index: &WorkspaceIndex,
    file: &SourceFile,
    cascade: &HashMap<&str, &Cascaded>,
    dest: &Path,
    edit: &mut WorkspaceEdit,
) {
    let specs = &file.syntax.imports;
    let entries: Vec<ImportEntry> = specs
        .iter()
        .map(|spec| {
            let cascaded = cascade.get(spec.path.as_str());
            let path = cascaded.map_or_else(|| spec.path.clone(), |pkg| pkg.new_path.clone());
            ImportEntry {
                default_ident: last_segment(&path).to_owned(),
                path,
                form: ImportForm::of(spec),
                rewritten: cascaded.is_some(),
            }
        })
        .collect();
    let forms = resolve_aliases(&entries);

    // Identifiers some import binds both before and after the rename.
    let mut kept: BTreeSet<String> = BTreeSet::new();
    let mut renamed_qualifiers: Vec<(String, String)> = Vec::new();
    for ((spec, entry), form) in specs.iter().zip(&entries).zip(&forms) {
        let cascaded = cascade.get(spec.path.as_str());
        let (old_bound, new_bound) = match cascaded {
            Some(pkg) => (
                bound_identifier(&entry.form, &pkg.old_ident),
                bound_identifier(form, &pkg.new_ident),
            ),
            None => {
                let ident = index.default_identifier(&spec.path);
                (bound_identifier(form, &ident), bound_identifier(form, &ident))
            }
        };

        if let Some(pkg) = cascaded {
            if entry.path != spec.path {
                edit.add_edit(dest, TextEdit::new(spec.path_range, entry.path.clone()));
            }
            match (&entry.form, form, &spec.name) {
                (ImportForm::Alias(_), ImportForm::Implicit, Some(name)) => {
                    let range = TextRange::new(name.range.start(), spec.literal_range.start());
                    edit.add_edit(dest, TextEdit::delete(range));
                }
                (ImportForm::Implicit, ImportForm::Alias(alias), _) => {
                    edit.add_edit(
                        dest,
                        TextEdit::insert(spec.literal_range.start(), format!("{alias} ")),
                    );
                }
                (ImportForm::Alias(old), ImportForm::Alias(new), Some(name)) if old != new => {
                    edit.add_edit(dest, TextEdit::new(name.range, new.clone()));
                }
                _ => {}
            }
            tracing::trace!(
                target: "gofer.refactor",
                file = %file.path.display(),
                old_path = %pkg.old_path,
                new_path = %entry.path,
                "import rewritten"
            );
        }

        match (old_bound, new_bound) {
            (Some(old), Some(new)) if old == new => {
                kept.insert(old);
            }
            (Some(old), Some(new)) => {
                if !renamed_qualifiers.iter().any(|(o, _)| *o == old) {
                    renamed_qualifiers.push((old, new));
                }
            }
            _ => {}
        }
    }

    for (old, new) in renamed_qualifiers {
        // An import that still binds the old identifier keeps its uses.
        if kept.contains(&old) {
            continue;
        }
        for reference in file
            .syntax
            .qualified_refs
            .iter()
            .filter(|r| r.qualifier == old && !file.syntax.is_shadowed(r))
        {
            edit.add_edit(dest, TextEdit::new(reference.qualifier_range, new.clone()));
        }
    }
}

/// The identifier an import of the given form binds, if any.
fn bound_identifier(form: &ImportForm, default_ident: &str) -> Option<String> {
    match form {
        ImportForm::Alias(alias) => Some(alias.clone()),
        ImportForm::Implicit => Some(default_ident.to_owned()),
        ImportForm::Blank | ImportForm::Dot => None,
    }
}

/// Keep local `replace` targets pointing at the same directories after the move.
fn rewrite_replaces(module: &Module, relocate: &dyn Fn(&Path) -> PathBuf, edit: &mut WorkspaceEdit) {
    let new_root = relocate(&module.root);
    for replace in &module.replaces {
        let written = Path::new(&replace.new_path);
        let old_target = normalize_path(&module.root.join(written));
        let new_target = relocate(&old_target);
        if new_root == module.root && new_target == old_target {
            continue;
        }
        let text = if written.is_absolute() {
            new_target.to_string_lossy().into_owned()
        } else {
            local_path_text(&relative_path(&new_root, &new_target))
        };
        if text != replace.new_path {
            edit.add_edit(
                relocate(&module.modfile),
                TextEdit::new(replace.new_path_range, text),
            );
        }
    }
}

/// Render a relative path the way module files spell local targets.
fn local_path_text(rel: &Path) -> String {
    let segments: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    match segments.first().map(String::as_str) {
        None => ".".to_owned(),
        Some("..") => segments.join("/"),
        Some(_) => format!("./{}", segments.join("/")),
    }
}

fn last_segment(import_path: &str) -> &str {
    import_path.rsplit('/').next().unwrap_or(import_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use gofer_config::LanguageConfig;
    use gofer_core::apply_text_edits;
    use gofer_test_utils::{Fixture, TempWorkspace};
    use gofer_vfs::LocalFs;
    use pretty_assertions::assert_eq;

    use crate::analyze_position;

    fn plan(fixture: &str, new_name: &str) -> (TempWorkspace, Result<RenamePlan, RenameError>) {
        let ws = Fixture::parse(fixture).materialize();
        let index =
            WorkspaceIndex::load(&LocalFs, ws.root(), Arc::new(LanguageConfig::default())).unwrap();
        let (file, offset) = ws.marker();
        let target = analyze_position(&index, &index, &file, offset).unwrap();
        let plan = plan_package_rename(&index, &index, &LocalFs, &target, new_name, 7);
        (ws, plan)
    }

    /// Text of `rel` (a pre-move path) after the plan's edits, read from disk.
    fn edited(ws: &TempWorkspace, plan: &RenamePlan, old_rel: &str, new_rel: &str) -> String {
        let edits = plan.edit.edits_for(&ws.path(new_rel));
        apply_text_edits(&ws.read(old_rel), edits).unwrap()
    }

    #[test]
    fn local_path_rendering() {
        assert_eq!(local_path_text(Path::new("foox/bar")), "./foox/bar");
        assert_eq!(local_path_text(Path::new("../other")), "../other");
        assert_eq!(local_path_text(Path::new("")), ".");
    }

    #[test]
    fn moves_directory_and_rewrites_cascade() {
        let (ws, plan) = plan(
            r#"
//- /go.mod
module mod.com
//- /lib/a.go
package l$0ib

const A = 1
//- /lib/a_test.go
package lib_test
//- /lib/nested/a.go
package nested
//- /main.go
package main

import (
	"mod.com/lib"
	"mod.com/lib/nested"
)

func main() {
	println(lib.A, nested.B)
}
"#,
            "lib1",
        );
        let plan = plan.unwrap();
        assert_eq!(plan.base_version, 7);
        assert_eq!(plan.edit.moves.len(), 1);
        assert_eq!(plan.edit.moves[0].from, ws.path("lib"));
        assert_eq!(plan.edit.moves[0].to, ws.path("lib1"));
        assert_eq!(
            plan.import_rewrites,
            vec![
                ImportRewrite {
                    old_path: "mod.com/lib".into(),
                    new_path: "mod.com/lib1".into()
                },
                ImportRewrite {
                    old_path: "mod.com/lib/nested".into(),
                    new_path: "mod.com/lib1/nested".into()
                },
            ]
        );

        assert_eq!(edited(&ws, &plan, "lib/a.go", "lib1/a.go"), "package lib1\n\nconst A = 1\n");
        assert_eq!(edited(&ws, &plan, "lib/a_test.go", "lib1/a_test.go"), "package lib1_test\n");
        assert!(plan.edit.edits_for(&ws.path("lib1/nested/a.go")).is_empty());
        assert_eq!(
            edited(&ws, &plan, "main.go", "main.go"),
            r#"package main

import (
	"mod.com/lib1"
	"mod.com/lib1/nested"
)

func main() {
	println(lib1.A, nested.B)
}
"#
        );
    }

    #[test]
    fn existing_destination_is_a_collision() {
        let (ws, plan) = plan(
            r#"
//- /go.mod
module mod.com
//- /lib/a.go
package l$0ib
//- /lib1/README
taken
"#,
            "lib1",
        );
        match plan {
            Err(RenameError::NameCollisionOnDisk { path }) => assert_eq!(path, ws.path("lib1")),
            other => panic!("expected a collision, got {other:?}"),
        }
    }

    #[test]
    fn module_root_package_is_renamed_in_place() {
        let (ws, plan) = plan(
            r#"
//- /go.mod
module mod.com
//- /root.go
package r$0oot

func F() {}
//- /cmd/main.go
package main

import "mod.com"

func main() { root.F() }
"#,
            "top",
        );
        let plan = plan.unwrap();
        assert!(plan.edit.moves.is_empty());
        assert!(plan.import_rewrites.is_empty());
        assert_eq!(edited(&ws, &plan, "root.go", "root.go"), "package top\n\nfunc F() {}\n");
        assert_eq!(
            edited(&ws, &plan, "cmd/main.go", "cmd/main.go"),
            "package main\n\nimport \"mod.com\"\n\nfunc main() { top.F() }\n"
        );
    }

    #[test]
    fn invalid_names_are_rejected() {
        let (_ws, plan) = plan(
            "//- /go.mod\nmodule mod.com\n//- /lib/a.go\npackage l$0ib\n",
            "func",
        );
        assert!(matches!(plan, Err(RenameError::InvalidPackageName { name }) if name == "func"));
    }

    #[test]
    fn nested_module_moves_but_keeps_its_path() {
        let (ws, plan) = plan(
            r#"
//- /go.mod
module mod.com

require mod.com/foo/bar v0.0.0

replace mod.com/foo/bar => ./foo/bar
//- /foo/foo.go
package f$0oo

func Bar() {}
//- /foo/bar/go.mod
module mod.com/foo/bar
//- /foo/bar/bar.go
package bar

import "mod.com/foo"

func F() { foo.Bar() }
"#,
            "foox",
        );
        let plan = plan.unwrap();
        assert_eq!(plan.edit.moves[0].to, ws.path("foox"));
        assert_eq!(
            plan.import_rewrites,
            vec![ImportRewrite {
                old_path: "mod.com/foo".into(),
                new_path: "mod.com/foox".into()
            }]
        );
        assert_eq!(
            edited(&ws, &plan, "go.mod", "go.mod"),
            "module mod.com\n\nrequire mod.com/foo/bar v0.0.0\n\nreplace mod.com/foo/bar => ./foox/bar\n"
        );
        assert_eq!(
            edited(&ws, &plan, "foo/bar/bar.go", "foox/bar/bar.go"),
            "package bar\n\nimport \"mod.com/foox\"\n\nfunc F() { foox.Bar() }\n"
        );
    }
}
