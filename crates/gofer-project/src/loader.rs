use std::io;
use std::path::{Path, PathBuf};

use gofer_config::LanguageConfig;
use gofer_syntax::parse_file;
use gofer_vfs::FileSystem;
use walkdir::WalkDir;

use crate::model::{Module, SourceFile};
use crate::modfile::parse_modfile;
use crate::ProjectError;

/// Directories and module files found below a root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeScan {
    pub dirs: Vec<PathBuf>,
    pub modfiles: Vec<PathBuf>,
}

/// Walk `root` on disk, skipping ignored directories.
///
/// A missing root yields an empty scan.
pub fn scan_tree(root: &Path, config: &LanguageConfig) -> Result<TreeScan, ProjectError> {
    let mut scan = TreeScan::default();
    if !root.exists() {
        return Ok(scan);
    }

    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            entry.depth() == 0
                || !entry.file_type().is_dir()
                || !entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| config.is_ignored_dir(name))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // Entries can vanish while we walk; the next change event rescans them.
            Err(err) if err.io_error().map(io::Error::kind) == Some(io::ErrorKind::NotFound) => {
                continue
            }
            Err(source) => {
                return Err(ProjectError::Walk {
                    root: root.to_path_buf(),
                    source,
                })
            }
        };
        if entry.file_type().is_dir() {
            scan.dirs.push(entry.into_path());
        } else if config.is_module_file(entry.path()) {
            scan.modfiles.push(entry.into_path());
        }
    }
    Ok(scan)
}

pub fn load_module(fs: &dyn FileSystem, modfile: &Path) -> Result<Module, ProjectError> {
    let text = fs.read_to_string(modfile).map_err(|source| ProjectError::Io {
        path: modfile.to_path_buf(),
        source,
    })?;
    let parsed = parse_modfile(&text);
    if parsed.module.is_none() {
        tracing::debug!(
            target: "gofer.project",
            path = %modfile.display(),
            "module file has no module directive"
        );
    }
    Ok(Module {
        root: modfile.parent().unwrap_or(Path::new("")).to_path_buf(),
        path: parsed.module.map(|m| m.path),
        modfile: modfile.to_path_buf(),
        replaces: parsed.replaces,
    })
}

/// Read and scan every source file directly inside `dir`.
pub fn load_dir(
    fs: &dyn FileSystem,
    dir: &Path,
    config: &LanguageConfig,
) -> Result<Vec<SourceFile>, ProjectError> {
    let entries = match fs.read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(ProjectError::Io {
                path: dir.to_path_buf(),
                source,
            })
        }
    };

    let mut files = Vec::new();
    for path in entries {
        if !config.is_source_file(&path) || fs.is_dir(&path) {
            continue;
        }
        let text = match fs.read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(source) => return Err(ProjectError::Io { path, source }),
        };
        files.push(SourceFile::new(path, parse_file(&text), config));
    }
    Ok(files)
}

/// The innermost module whose root contains `dir`.
pub fn owning_module<'a>(modules: &'a [Module], dir: &Path) -> Option<&'a Module> {
    modules
        .iter()
        .filter(|module| dir.starts_with(&module.root))
        .max_by_key(|module| module.root.components().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::fs;

    use gofer_vfs::LocalFs;

    use crate::model::FileKind;

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn scan_skips_ignored_directories() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "go.mod", "module mod.com\n");
        write(root, "lib/a.go", "package lib\n");
        write(root, "lib/testdata/x.go", "package x\n");
        write(root, ".git/y.go", "package y\n");
        write(root, "foo/bar/go.mod", "module mod.com/foo/bar\n");

        let scan = scan_tree(root, &LanguageConfig::default()).unwrap();
        let dirs: Vec<_> = scan
            .dirs
            .iter()
            .map(|d| d.strip_prefix(root).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            dirs,
            vec![
                PathBuf::new(),
                PathBuf::from("foo"),
                PathBuf::from("foo/bar"),
                PathBuf::from("lib"),
            ]
        );
        assert_eq!(
            scan.modfiles,
            vec![root.join("foo/bar/go.mod"), root.join("go.mod")]
        );
    }

    #[test]
    fn nested_modules_own_their_subtree() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "go.mod", "module mod.com\n");
        write(root, "foo/bar/go.mod", "module mod.com/foo/bar\n");

        let scan = scan_tree(root, &LanguageConfig::default()).unwrap();
        let modules: Vec<Module> = scan
            .modfiles
            .iter()
            .map(|m| load_module(&LocalFs, m).unwrap())
            .collect();

        let inner = owning_module(&modules, &root.join("foo/bar/baz")).unwrap();
        assert_eq!(inner.path.as_deref(), Some("mod.com/foo/bar"));
        assert_eq!(
            inner.import_path_for(&root.join("foo/bar/baz")).as_deref(),
            Some("mod.com/foo/bar/baz")
        );
        let outer = owning_module(&modules, &root.join("foo")).unwrap();
        assert_eq!(outer.path.as_deref(), Some("mod.com"));
    }

    #[test]
    fn load_dir_reads_only_source_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "lib/a.go", "package lib\n\nconst A = 1\n");
        write(root, "lib/a_test.go", "package lib_test\n");
        write(root, "lib/README.md", "docs\n");
        write(root, "lib/nested/b.go", "package nested\n");

        let files = load_dir(&LocalFs, &root.join("lib"), &LanguageConfig::default()).unwrap();
        let summary: Vec<_> = files
            .iter()
            .map(|f| (f.path.file_name().unwrap().to_str().unwrap(), f.kind))
            .collect();
        assert_eq!(
            summary,
            vec![("a.go", FileKind::Regular), ("a_test.go", FileKind::ExternalTest)]
        );
        assert!(load_dir(&LocalFs, &root.join("missing"), &LanguageConfig::default())
            .unwrap()
            .is_empty());
    }
}
