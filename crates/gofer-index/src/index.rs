use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gofer_config::LanguageConfig;
use gofer_project::{
    load_dir, load_module, owning_module, scan_tree, Module, Package, ProjectError, SourceFile,
};
use gofer_syntax::{parse_file, ImportSpec};
use gofer_vfs::FileSystem;

/// Immutable view of every module, package and source file in a workspace.
///
/// Updates never mutate an index; [`WorkspaceIndex::rescan`] builds a new one.
#[derive(Debug, Clone)]
pub struct WorkspaceIndex {
    root: PathBuf,
    config: Arc<LanguageConfig>,
    modules: Arc<Vec<Module>>,
    files: BTreeMap<PathBuf, Arc<SourceFile>>,
    packages: BTreeMap<PathBuf, Package>,
    by_import_path: HashMap<String, PathBuf>,
    importers: HashMap<String, BTreeSet<PathBuf>>,
}

impl WorkspaceIndex {
    /// Scan `root` from scratch.
    pub fn load(
        fs: &dyn FileSystem,
        root: &Path,
        config: Arc<LanguageConfig>,
    ) -> Result<Self, ProjectError> {
        let scan = scan_tree(root, &config)?;
        let modules = scan
            .modfiles
            .iter()
            .map(|modfile| load_module(fs, modfile))
            .collect::<Result<Vec<_>, _>>()?;

        let mut files = BTreeMap::new();
        for dir in &scan.dirs {
            for file in load_dir(fs, dir, &config)? {
                files.insert(file.path.clone(), Arc::new(file));
            }
        }

        let index = Self::assemble(root.to_path_buf(), config, Arc::new(modules), files);
        tracing::debug!(
            target: "gofer.index",
            root = %root.display(),
            modules = index.modules.len(),
            packages = index.packages.len(),
            files = index.files.len(),
            "workspace indexed"
        );
        Ok(index)
    }

    /// Build a new index in which everything at or below each of `paths` is
    /// re-read from `fs`. Other entries are shared with `self`.
    ///
    /// Package membership and import edges are always re-derived from the
    /// resulting file set.
    pub fn rescan(&self, fs: &dyn FileSystem, paths: &[PathBuf]) -> Result<Self, ProjectError> {
        let mut files = self.files.clone();
        let mut modules_changed = false;

        for path in paths {
            files.retain(|file, _| !file.starts_with(path));
            modules_changed |= self
                .modules
                .iter()
                .any(|module| module.modfile.starts_with(path));

            if fs.is_dir(path) {
                if self.is_ignored(path) {
                    continue;
                }
                let scan = scan_tree(path, &self.config)?;
                modules_changed |= !scan.modfiles.is_empty();
                for dir in &scan.dirs {
                    for file in load_dir(fs, dir, &self.config)? {
                        files.insert(file.path.clone(), Arc::new(file));
                    }
                }
            } else if self.config.is_module_file(path) {
                modules_changed = true;
            } else if self.config.is_source_file(path) && !self.is_ignored(path) {
                match fs.read_to_string(path) {
                    Ok(text) => {
                        let file = SourceFile::new(path.clone(), parse_file(&text), &self.config);
                        files.insert(path.clone(), Arc::new(file));
                    }
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                    Err(source) => {
                        return Err(ProjectError::Io {
                            path: path.clone(),
                            source,
                        })
                    }
                }
            }
        }

        let modules = if modules_changed {
            let scan = scan_tree(&self.root, &self.config)?;
            let modules = scan
                .modfiles
                .iter()
                .map(|modfile| load_module(fs, modfile))
                .collect::<Result<Vec<_>, _>>()?;
            Arc::new(modules)
        } else {
            Arc::clone(&self.modules)
        };

        Ok(Self::assemble(
            self.root.clone(),
            Arc::clone(&self.config),
            modules,
            files,
        ))
    }

    fn assemble(
        root: PathBuf,
        config: Arc<LanguageConfig>,
        modules: Arc<Vec<Module>>,
        files: BTreeMap<PathBuf, Arc<SourceFile>>,
    ) -> Self {
        let mut by_dir: BTreeMap<PathBuf, Vec<&SourceFile>> = BTreeMap::new();
        let mut importers: HashMap<String, BTreeSet<PathBuf>> = HashMap::new();
        for file in files.values() {
            by_dir
                .entry(file.dir().to_path_buf())
                .or_default()
                .push(file.as_ref());
            for spec in &file.syntax.imports {
                importers
                    .entry(spec.path.clone())
                    .or_default()
                    .insert(file.path.clone());
            }
        }

        let mut packages = BTreeMap::new();
        let mut by_import_path = HashMap::new();
        for (dir, dir_files) in by_dir {
            let module = owning_module(&modules, &dir);
            let package = Package::from_files(dir.clone(), &dir_files, module, &config);
            if let Some(import_path) = &package.import_path {
                by_import_path.insert(import_path.clone(), dir.clone());
            }
            packages.insert(dir, package);
        }

        Self {
            root,
            config,
            modules,
            files,
            packages,
            by_import_path,
            importers,
        }
    }

    fn is_ignored(&self, path: &Path) -> bool {
        let Ok(rel) = path.strip_prefix(&self.root) else {
            return true;
        };
        let mut dirs = rel.components().collect::<Vec<_>>();
        if !path.is_dir() {
            dirs.pop();
        }
        dirs.iter().any(|component| {
            component
                .as_os_str()
                .to_str()
                .is_some_and(|name| self.config.is_ignored_dir(name))
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &LanguageConfig {
        &self.config
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    pub fn module_by_root(&self, root: &Path) -> Option<&Module> {
        self.modules.iter().find(|module| module.root == root)
    }

    pub fn files(&self) -> impl Iterator<Item = &Arc<SourceFile>> {
        self.files.values()
    }

    pub fn file(&self, path: &Path) -> Option<&Arc<SourceFile>> {
        self.files.get(path)
    }

    pub fn files_in_dir<'a>(&'a self, dir: &'a Path) -> impl Iterator<Item = &'a Arc<SourceFile>> {
        self.files
            .range(dir.to_path_buf()..)
            .take_while(move |(path, _)| path.starts_with(dir))
            .filter(move |(path, _)| path.parent() == Some(dir))
            .map(|(_, file)| file)
    }

    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    pub fn package(&self, dir: &Path) -> Option<&Package> {
        self.packages.get(dir)
    }

    pub fn package_by_import_path(&self, import_path: &str) -> Option<&Package> {
        self.packages.get(self.by_import_path.get(import_path)?)
    }

    pub(crate) fn importers_of(&self, import_path: &str) -> Option<&BTreeSet<PathBuf>> {
        self.importers.get(import_path)
    }

    /// Packages at or below `dir`.
    pub fn packages_under<'a>(&'a self, dir: &'a Path) -> impl Iterator<Item = &'a Package> {
        self.packages
            .range(dir.to_path_buf()..)
            .take_while(move |(path, _)| path.starts_with(dir))
            .map(|(_, package)| package)
    }

    /// The identifier an implicit import of `import_path` binds: the imported
    /// package's declared name when it is part of the workspace, otherwise the
    /// last path segment.
    pub fn default_identifier(&self, import_path: &str) -> String {
        self.package_by_import_path(import_path)
            .and_then(|package| package.name.clone())
            .unwrap_or_else(|| last_segment(import_path).to_owned())
    }

    /// The identifier `spec` introduces into its file, if any.
    pub fn bound_identifier(&self, spec: &ImportSpec) -> Option<String> {
        if spec.is_blank() || spec.is_dot() {
            return None;
        }
        Some(match spec.alias() {
            Some(alias) => alias.to_owned(),
            None => self.default_identifier(&spec.path),
        })
    }
}

pub(crate) fn last_segment(import_path: &str) -> &str {
    import_path.rsplit('/').next().unwrap_or(import_path)
}
