use gofer_workspace::{DiagnosticKind, FileChange, PathMove, TextEdit, TextRange};
use pretty_assertions::assert_eq;

use super::workspace;

const DUPLICATES: &str = r#"
//- /go.mod
module mod.com
//- /a/a.go
package a

const X = 1
//- /a/x.go
package a

var X = 2
//- /b/b.go
package b
"#;

fn kinds(ws: &gofer_workspace::Workspace, file: &std::path::Path) -> Vec<DiagnosticKind> {
    ws.snapshot()
        .diagnostics_for(file)
        .iter()
        .map(|d| d.kind)
        .collect()
}

#[test]
fn diagnostics_follow_moved_files() {
    let (tmp, ws) = workspace(DUPLICATES);
    let a = tmp.path("a/a.go");
    assert_eq!(kinds(&ws, &a), vec![DiagnosticKind::DuplicateDeclaration]);
    assert_eq!(
        kinds(&ws, &tmp.path("a/x.go")),
        vec![DiagnosticKind::DuplicateDeclaration]
    );

    ws.move_path(&tmp.path("a/x.go"), &tmp.path("b/x.go")).unwrap();
    assert!(kinds(&ws, &a).is_empty());
    assert!(kinds(&ws, &tmp.path("a/x.go")).is_empty());
    for rel in ["b/b.go", "b/x.go"] {
        let diags = ws.snapshot().diagnostics_for(&tmp.path(rel)).to_vec();
        assert_eq!(diags.len(), 1, "{rel}: {diags:?}");
        assert_eq!(diags[0].kind, DiagnosticKind::PackageNameMismatch);
        assert_eq!(diags[0].range.start(), 0.into());
    }

    ws.move_path(&tmp.path("b/x.go"), &tmp.path("a/x.go")).unwrap();
    assert_eq!(kinds(&ws, &a), vec![DiagnosticKind::DuplicateDeclaration]);
    assert!(ws.diagnostics(&tmp.path("b")).is_empty());
    assert_eq!(ws.version(), 2);
}

#[test]
fn directory_move_carries_open_buffers() {
    let (tmp, ws) = workspace(DUPLICATES);
    let old = tmp.path("a/x.go");
    ws.open_document(old.clone(), "package a\n\nvar Y = 2\n", 3).unwrap();
    assert!(ws.diagnostics(&tmp.path("a")).is_empty());

    ws.move_path(&tmp.path("a"), &tmp.path("x")).unwrap();
    let new = tmp.path("x/x.go");
    assert!(ws.document(&old).is_none());
    let doc = ws.document(&new).unwrap();
    assert_eq!(doc.text(), "package a\n\nvar Y = 2\n");
    assert_eq!(doc.version(), 3);
    assert!(ws.diagnostics(&tmp.path("a")).is_empty());
    assert!(ws.diagnostics(&tmp.path("x")).is_empty());

    // Reintroduce the duplicate through the buffer, then undo it.
    let y = TextRange::at(15.into(), 1.into());
    ws.change_document(&new, &[TextEdit::new(y, "X")]).unwrap();
    assert_eq!(
        kinds(&ws, &tmp.path("x/a.go")),
        vec![DiagnosticKind::DuplicateDeclaration]
    );
    assert!(ws.undo_document(&new).unwrap());
    assert!(ws.diagnostics(&tmp.path("x")).is_empty());
    assert!(!ws.undo_document(&new).unwrap());

    // Closing falls back to the disk copy, which still declares X.
    ws.close_document(&new).unwrap();
    assert_eq!(kinds(&ws, &new), vec![DiagnosticKind::DuplicateDeclaration]);
}

#[test]
fn watcher_events_are_reconciled() {
    let (tmp, ws) = workspace(DUPLICATES);
    std::fs::rename(tmp.path("a/x.go"), tmp.path("b/x.go")).unwrap();
    std::fs::write(tmp.path("a/y.go"), "package a\n\nfunc X() {}\n").unwrap();

    ws.apply_filesystem_events(&[
        FileChange::Moved {
            from: tmp.path("a/x.go"),
            to: tmp.path("b/x.go"),
        },
        FileChange::Created {
            path: tmp.path("a/y.go"),
        },
    ])
    .unwrap();
    assert_eq!(
        kinds(&ws, &tmp.path("a/y.go")),
        vec![DiagnosticKind::DuplicateDeclaration]
    );
    assert_eq!(
        kinds(&ws, &tmp.path("b/x.go")),
        vec![DiagnosticKind::PackageNameMismatch]
    );

    std::fs::rename(tmp.path("b/x.go"), tmp.path("a/x.go")).unwrap();
    ws.on_paths_moved(&[PathMove::new(tmp.path("b/x.go"), tmp.path("a/x.go"))])
        .unwrap();
    assert!(ws.diagnostics(&tmp.path("b")).is_empty());
    assert_eq!(ws.diagnostics(&tmp.path("a")).len(), 3);
}
