mod file_moves;
mod rename_apply;

use gofer_test_utils::{Fixture, TempWorkspace};
use gofer_workspace::Workspace;

pub(crate) fn workspace(fixture: &str) -> (TempWorkspace, Workspace) {
    let tmp = Fixture::parse(fixture).materialize();
    let workspace = Workspace::open(tmp.root()).unwrap();
    (tmp, workspace)
}
