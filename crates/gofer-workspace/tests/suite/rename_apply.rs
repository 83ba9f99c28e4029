use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use gofer_workspace::{ApplyError, RenameError, TextSize};
use pretty_assertions::assert_eq;

use super::workspace;

const LIB: &str = r#"
//- /go.mod
module mod.com

go 1.18
//- /lib/a.go
package l$0ib

// A is exported.
const A = 1
//- /lib/a_test.go
package lib_test

import "mod.com/lib"

var _ = lib.A
//- /main.go
package main

import "mod.com/lib"

func main() { _ = lib.A }
"#;

#[test]
fn rename_moves_directory_and_rewrites_importers() {
    let (tmp, ws) = workspace(LIB);
    let (file, offset) = tmp.marker();

    let prepared = ws.prepare_rename(&file, offset).unwrap();
    assert_eq!(prepared.text, "lib");
    assert_eq!(prepared.target.import_path, "mod.com/lib");

    let plan = ws.rename(&file, offset, "lib1").unwrap();
    assert_eq!(plan.base_version, 0);
    let version = ws.apply_plan(&plan).unwrap();
    assert_eq!(version, 1);
    assert_eq!(ws.version(), 1);

    assert!(!tmp.path("lib").exists());
    assert_eq!(
        tmp.read("lib1/a.go"),
        "package lib1\n\n// A is exported.\nconst A = 1\n"
    );
    assert_eq!(
        tmp.read("lib1/a_test.go"),
        "package lib1_test\n\nimport \"mod.com/lib1\"\n\nvar _ = lib1.A\n"
    );
    assert_eq!(
        tmp.read("main.go"),
        "package main\n\nimport \"mod.com/lib1\"\n\nfunc main() { _ = lib1.A }\n"
    );
    assert!(ws.diagnostics(tmp.root()).is_empty());

    let snapshot = ws.snapshot();
    assert!(snapshot.index().package_by_import_path("mod.com/lib1").is_some());
    assert!(snapshot.index().package_by_import_path("mod.com/lib").is_none());
}

#[test]
fn open_buffers_are_edited_in_memory() {
    let (tmp, ws) = workspace(LIB);
    let main = tmp.path("main.go");
    let lib = tmp.path("lib/a.go");
    ws.open_document(main.clone(), tmp.read("main.go"), 1).unwrap();
    ws.open_document(lib.clone(), tmp.read("lib/a.go"), 1).unwrap();

    let (file, offset) = tmp.marker();
    let plan = ws.rename(&file, offset, "lib1").unwrap();
    ws.apply_plan(&plan).unwrap();

    // The unsaved buffer carries the edit; the disk copy does not.
    assert_eq!(
        ws.document_text(&main).unwrap(),
        "package main\n\nimport \"mod.com/lib1\"\n\nfunc main() { _ = lib1.A }\n"
    );
    assert_eq!(
        tmp.read("main.go"),
        "package main\n\nimport \"mod.com/lib\"\n\nfunc main() { _ = lib.A }\n"
    );

    assert!(ws.document(&lib).is_none());
    let moved = ws.document(&tmp.path("lib1/a.go")).unwrap();
    assert!(moved.text().starts_with("package lib1\n"));
    assert!(moved.is_dirty());
    assert_eq!(tmp.read("lib1/a.go"), "package lib\n\n// A is exported.\nconst A = 1\n");
    assert!(ws.diagnostics(tmp.root()).is_empty());
}

#[test]
fn rejected_targets() {
    let (tmp, ws) = workspace(
        r#"
//- /go.mod
module mod.com
//- /main.go
package main

// comment
func main() {}
//- /lib/a.go
package lib
"#,
    );
    let main = tmp.path("main.go");

    let err = ws.prepare_rename(&main, 9.into()).unwrap_err();
    assert_eq!(err, RenameError::CannotRenameMainPackage { name: "main".into() });
    assert_eq!(err.to_string(), "can't rename package \"main\"");

    let comment = tmp.offset_of("main.go", "comment");
    assert_eq!(
        ws.prepare_rename(&main, comment).unwrap_err(),
        RenameError::NoObjectFound
    );

    let lib = tmp.path("lib/a.go");
    assert_eq!(
        ws.rename(&lib, 8.into(), "not-valid").unwrap_err(),
        RenameError::InvalidPackageName { name: "not-valid".into() }
    );
    assert_eq!(ws.version(), 0);
}

#[test]
fn workspace_without_module_cannot_rename() {
    let (tmp, ws) = workspace(
        r#"
//- /lib/a.go
package lib
"#,
    );
    let err = ws
        .prepare_rename(&tmp.path("lib/a.go"), TextSize::from(8))
        .unwrap_err();
    assert!(matches!(err, RenameError::MissingModuleInfo { .. }), "{err:?}");
}

#[test]
fn stale_plan_is_rejected_and_can_be_replanned() {
    let (tmp, ws) = workspace(LIB);
    let (file, offset) = tmp.marker();
    let plan = ws.rename(&file, offset, "lib1").unwrap();

    let main = tmp.path("main.go");
    ws.open_document(main.clone(), tmp.read("main.go"), 1).unwrap();

    let err = ws.apply_plan(&plan).unwrap_err();
    assert!(err.is_recoverable());
    assert!(matches!(
        err,
        ApplyError::Rename(RenameError::PlanStale { planned: 0, current: 1 })
    ));
    assert!(tmp.path("lib/a.go").exists());

    let plan = ws.rename(&file, offset, "lib1").unwrap();
    assert_eq!(plan.base_version, 1);
    assert_eq!(ws.apply_plan(&plan).unwrap(), 2);
    assert!(tmp.path("lib1/a.go").exists());
}

#[test]
fn failed_apply_rolls_back_every_step() {
    let (tmp, ws) = workspace(LIB);
    let (file, offset) = tmp.marker();
    let plan = ws.rename(&file, offset, "lib1").unwrap();
    let before = tmp.read("lib/a.go");

    // Removed behind the workspace's back, so writing the importer fails.
    fs::remove_file(tmp.path("main.go")).unwrap();

    let err = ws.apply_plan(&plan).unwrap_err();
    assert!(matches!(err, ApplyError::PartialApplyFailure { .. }), "{err:?}");
    assert!(!err.is_recoverable());

    assert!(!tmp.path("lib1").exists());
    assert_eq!(tmp.read("lib/a.go"), before);
    assert_eq!(
        tmp.read("lib/a_test.go"),
        "package lib_test\n\nimport \"mod.com/lib\"\n\nvar _ = lib.A\n"
    );
    assert_eq!(ws.version(), 0);
}

#[test]
fn conflicting_import_gets_fresh_alias_on_disk() {
    let (tmp, ws) = workspace(
        r#"
//- /go.mod
module mod.com
//- /lib/a.go
package l$0ib

const A = 1
//- /lib/nested/a.go
package nested

const N = 1
//- /main.go
package main

import (
	"mod.com/lib"
	"mod.com/lib/nested"
)

func main() { _ = lib.A + nested.N }
"#,
    );
    let (file, offset) = tmp.marker();
    let plan = ws.rename(&file, offset, "nested").unwrap();
    ws.apply_plan(&plan).unwrap();

    assert_eq!(
        tmp.read("main.go"),
        r#"package main

import (
	"mod.com/nested"
	nested1 "mod.com/nested/nested"
)

func main() { _ = nested.A + nested1.N }
"#
    );
    assert_eq!(tmp.read("nested/nested/a.go"), "package nested\n\nconst N = 1\n");
    assert!(ws.diagnostics(tmp.root()).is_empty());
}

#[test]
fn renaming_back_restores_import_paths() {
    let (tmp, ws) = workspace(
        r#"
//- /go.mod
module mod.com
//- /lib/a.go
package l$0ib

const A = 1
//- /lib/nested/a.go
package nested

const N = 1
//- /main.go
package main

import (
	"mod.com/lib"
	"mod.com/lib/nested"
)

func main() { _ = lib.A + nested.N }
"#,
    );
    let (file, offset) = tmp.marker();
    let plan = ws.rename(&file, offset, "nested").unwrap();
    ws.apply_plan(&plan).unwrap();

    let plan = ws
        .rename(&tmp.path("nested/a.go"), TextSize::from(8), "lib")
        .unwrap();
    assert_eq!(plan.base_version, 1);
    assert_eq!(ws.apply_plan(&plan).unwrap(), 2);

    // The synthesized alias stays; the paths are the original ones.
    assert_eq!(
        tmp.read("main.go"),
        r#"package main

import (
	"mod.com/lib"
	nested1 "mod.com/lib/nested"
)

func main() { _ = lib.A + nested1.N }
"#
    );
    assert!(!tmp.path("nested").exists());
    assert_eq!(tmp.read("lib/a.go"), "package lib\n\nconst A = 1\n");
    assert_eq!(tmp.read("lib/nested/a.go"), "package nested\n\nconst N = 1\n");
    assert!(ws.diagnostics(tmp.root()).is_empty());
}

#[test]
fn snapshots_keep_the_buffers_they_were_built_from() {
    let (tmp, ws) = workspace(LIB);
    let main = tmp.path("main.go");
    let original = tmp.read("main.go");
    ws.open_document(main.clone(), original.clone(), 1).unwrap();
    let before = ws.snapshot();

    let (file, offset) = tmp.marker();
    let plan = ws.rename(&file, offset, "lib1").unwrap();

    let done = AtomicBool::new(false);
    let observed = thread::scope(|scope| {
        let reader = scope.spawn(|| {
            let mut seen = Vec::new();
            loop {
                let finished = done.load(Ordering::Acquire);
                let snapshot = ws.snapshot();
                let edited = snapshot
                    .document_text(&main)
                    .is_some_and(|text| text.contains("lib1.A"));
                let moved = snapshot
                    .index()
                    .package_by_import_path("mod.com/lib1")
                    .is_some();
                seen.push((snapshot.version(), edited, moved));
                if finished {
                    return seen;
                }
            }
        });
        ws.apply_plan(&plan).unwrap();
        done.store(true, Ordering::Release);
        reader.join().unwrap()
    });

    // Buffers never run ahead of (or lag behind) the index they belong to.
    for &(version, edited, moved) in &observed {
        assert_eq!((edited, moved), (version == 2, version == 2), "version {version}");
    }
    assert_eq!(observed.last().map(|seen| seen.0), Some(2));

    assert_eq!(before.version(), 1);
    assert_eq!(before.document_text(&main), Some(original));
    assert!(ws.document_text(&main).unwrap().contains("lib1.A"));
}
