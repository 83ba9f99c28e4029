use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use gofer_core::{canonicalize_or_self, TextSize};
use tempfile::TempDir;
use walkdir::WalkDir;

/// A minimal multi-file fixture.
///
/// Files start with a `//- /relative/path` header line. At most one `$0`
/// marker may appear across the whole fixture; it is stripped from the text
/// and its offset recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fixture {
    pub files: Vec<(String, String)>,
    marker: Option<(String, usize)>,
}

impl Fixture {
    #[must_use]
    pub fn parse(fixture: &str) -> Self {
        let mut current_path: Option<String> = None;
        let mut current_text = String::new();
        let mut files: Vec<(String, String)> = Vec::new();

        for line in fixture.lines() {
            if let Some(rest) = line.strip_prefix("//-") {
                if let Some(path) = current_path.take() {
                    files.push((path, std::mem::take(&mut current_text)));
                }
                current_path = Some(rest.trim().trim_start_matches('/').to_string());
                continue;
            }
            if current_path.is_none() {
                continue;
            }
            current_text.push_str(line);
            current_text.push('\n');
        }
        if let Some(path) = current_path.take() {
            files.push((path, current_text));
        }

        let mut marker = None;
        for (path, text) in files.iter_mut() {
            if let Some(offset) = text.find("$0") {
                if let Some((prev, _)) = &marker {
                    panic!("duplicate fixture marker $0 (first in {prev}, again in {path})");
                }
                text.replace_range(offset..offset + 2, "");
                marker = Some((path.clone(), offset));
            }
        }

        Self { files, marker }
    }

    /// Write the fixture into a fresh temporary directory.
    #[must_use]
    pub fn materialize(&self) -> TempWorkspace {
        let dir = tempfile::tempdir().expect("failed to create fixture tempdir");
        let root = canonicalize_or_self(dir.path());
        for (path, text) in &self.files {
            let path = root.join(path);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap_or_else(|err| {
                    panic!("failed to create fixture dir {}: {err}", parent.display())
                });
            }
            fs::write(&path, text)
                .unwrap_or_else(|err| panic!("failed to write fixture {}: {err}", path.display()));
        }
        TempWorkspace {
            _dir: dir,
            marker: self
                .marker
                .as_ref()
                .map(|(path, offset)| (root.join(path), TextSize::from(*offset as u32))),
            root,
        }
    }
}

/// A fixture written to disk. The directory is deleted on drop.
#[derive(Debug)]
pub struct TempWorkspace {
    _dir: TempDir,
    root: PathBuf,
    marker: Option<(PathBuf, TextSize)>,
}

impl TempWorkspace {
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path of a workspace-relative path.
    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    /// The file and offset of the `$0` marker.
    #[track_caller]
    pub fn marker(&self) -> (PathBuf, TextSize) {
        self.marker.clone().expect("fixture has no $0 marker")
    }

    #[track_caller]
    pub fn read(&self, rel: impl AsRef<Path>) -> String {
        let path = self.path(rel);
        fs::read_to_string(&path)
            .unwrap_or_else(|err| panic!("failed to read {}: {err}", path.display()))
    }

    /// Offset of the first occurrence of `needle` in a file.
    #[track_caller]
    pub fn offset_of(&self, rel: impl AsRef<Path>, needle: &str) -> TextSize {
        let text = self.read(&rel);
        let offset = text.find(needle).unwrap_or_else(|| {
            panic!("{needle:?} not found in {}", rel.as_ref().display())
        });
        TextSize::from(offset as u32)
    }

    /// Every file in the workspace keyed by its `/`-separated relative path.
    pub fn tree(&self) -> BTreeMap<String, String> {
        read_tree(&self.root)
    }
}

/// Read every file below `root`, keyed by `/`-separated relative path.
pub fn read_tree(root: &Path) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.expect("failed to walk fixture tree");
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .expect("walkdir yields paths under root")
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let text = fs::read_to_string(entry.path()).unwrap_or_default();
        out.insert(rel, text);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_files_and_marker() {
        let fixture = Fixture::parse(
            "//- /go.mod\nmodule mod.com\n//- /lib/a.go\npackage $0lib\n",
        );
        assert_eq!(
            fixture.files,
            vec![
                ("go.mod".to_string(), "module mod.com\n".to_string()),
                ("lib/a.go".to_string(), "package lib\n".to_string()),
            ]
        );

        let ws = fixture.materialize();
        let (file, offset) = ws.marker();
        assert_eq!(file, ws.path("lib/a.go"));
        assert_eq!(offset, TextSize::from(8));
        assert_eq!(ws.read("lib/a.go"), "package lib\n");
        assert_eq!(ws.tree().len(), 2);
    }

    #[test]
    #[should_panic(expected = "duplicate fixture marker $0")]
    fn duplicate_markers_panic() {
        let _ = Fixture::parse("//- /a.go\n$0\n//- /b.go\n$0\n");
    }
}
