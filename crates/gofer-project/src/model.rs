use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use gofer_config::LanguageConfig;
use gofer_syntax::ParsedFile;
use serde::Serialize;

use crate::modfile::Replace;

/// A directory tree rooted at a module file with its own declared path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Module {
    pub root: PathBuf,
    /// Declared module path; `None` when the module file has no `module` directive.
    pub path: Option<String>,
    pub modfile: PathBuf,
    pub replaces: Vec<Replace>,
}

impl Module {
    /// Import path of the package in `dir`, if `dir` lies within this module.
    pub fn import_path_for(&self, dir: &Path) -> Option<String> {
        let module_path = self.path.as_deref()?;
        let rel = dir.strip_prefix(&self.root).ok()?;
        let mut out = module_path.to_owned();
        for component in rel.components() {
            let Component::Normal(segment) = component else {
                return None;
            };
            out.push('/');
            out.push_str(segment.to_str()?);
        }
        Some(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FileKind {
    Regular,
    /// A test file compiled into the package itself.
    InternalTest,
    /// A test file declaring the `<name>_test` package.
    ExternalTest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: FileKind,
    pub syntax: Arc<ParsedFile>,
}

impl SourceFile {
    pub fn new(path: PathBuf, syntax: ParsedFile, config: &LanguageConfig) -> Self {
        let kind = if !config.is_test_file(&path) {
            FileKind::Regular
        } else if syntax
            .package_name()
            .and_then(|name| config.strip_external_test_suffix(name))
            .is_some()
        {
            FileKind::ExternalTest
        } else {
            FileKind::InternalTest
        };
        Self {
            path,
            kind,
            syntax: Arc::new(syntax),
        }
    }

    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }

    pub fn package_name(&self) -> Option<&str> {
        self.syntax.package_name()
    }
}

/// All source files of one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    pub dir: PathBuf,
    /// The declared name most files agree on.
    ///
    /// On a tie the lexicographically smallest contender is reported and
    /// `ambiguous_name` is set.
    pub name: Option<String>,
    pub ambiguous_name: bool,
    pub import_path: Option<String>,
    pub module_root: Option<PathBuf>,
    pub files: Vec<PathBuf>,
}

impl Package {
    /// Derive a package from its directory's files.
    pub fn from_files(
        dir: PathBuf,
        files: &[&SourceFile],
        module: Option<&Module>,
        config: &LanguageConfig,
    ) -> Self {
        let (name, ambiguous_name) = canonical_name(files, config);
        let mut paths: Vec<PathBuf> = files.iter().map(|file| file.path.clone()).collect();
        paths.sort();
        Self {
            import_path: module.and_then(|m| m.import_path_for(&dir)),
            module_root: module.map(|m| m.root.clone()),
            dir,
            name,
            ambiguous_name,
            files: paths,
        }
    }

    /// Whether `file` declares a name inconsistent with its directory.
    pub fn is_mismatched(&self, file: &SourceFile, config: &LanguageConfig) -> bool {
        let Some(declared) = file.package_name() else {
            return false;
        };
        let Some(canonical) = self.name.as_deref() else {
            return false;
        };
        match file.kind {
            FileKind::ExternalTest => {
                config.strip_external_test_suffix(declared) != Some(canonical)
            }
            FileKind::Regular | FileKind::InternalTest => {
                self.ambiguous_name || declared != canonical
            }
        }
    }
}

fn canonical_name(files: &[&SourceFile], config: &LanguageConfig) -> (Option<String>, bool) {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for file in files.iter().filter(|f| f.kind != FileKind::ExternalTest) {
        let Some(name) = file.package_name() else {
            continue;
        };
        match counts.iter_mut().find(|(n, _)| *n == name) {
            Some((_, count)) => *count += 1,
            None => counts.push((name, 1)),
        }
    }

    let Some(max) = counts.iter().map(|(_, count)| *count).max() else {
        // Only external tests: their base name stands in for the package.
        let name = files
            .iter()
            .filter_map(|f| f.package_name())
            .filter_map(|name| config.strip_external_test_suffix(name))
            .min()
            .map(str::to_owned);
        return (name, false);
    };

    let mut leaders: Vec<&str> = counts
        .iter()
        .filter(|(_, count)| *count == max)
        .map(|(name, _)| *name)
        .collect();
    leaders.sort_unstable();
    (Some(leaders[0].to_owned()), leaders.len() > 1)
}
