//! Workspace configuration (`gofer.toml`) and tracing setup.
//!
//! Example:
//!
//! ```toml
//! [logging]
//! level = "gofer.refactor=debug,info"
//! json = false
//!
//! [language]
//! entry_point_name = "main"
//! ignored_dir_names = ["testdata"]
//!
//! [reconcile]
//! parallel = true
//! ```

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod logging;

pub use logging::{init_tracing, LoggingConfig};

/// Environment variable overriding config discovery.
pub const GOFER_CONFIG_ENV_VAR: &str = "GOFER_CONFIG_PATH";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GoferConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub language: LanguageConfig,

    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

/// Source layout conventions of the workspace language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LanguageConfig {
    /// Extension of source files, without the dot.
    pub source_extension: String,

    /// File name marking a module root.
    pub module_file: String,

    /// Package name that cannot be renamed (the program entry point).
    pub entry_point_name: String,

    /// Suffix appended to a package name to form its external test package.
    pub external_test_suffix: String,

    /// Suffix of test file names.
    pub test_file_suffix: String,

    /// Directory names never scanned for packages. Names starting with `.` or
    /// `_` are always skipped.
    pub ignored_dir_names: Vec<String>,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            source_extension: "go".to_owned(),
            module_file: "go.mod".to_owned(),
            entry_point_name: "main".to_owned(),
            external_test_suffix: "_test".to_owned(),
            test_file_suffix: "_test.go".to_owned(),
            ignored_dir_names: vec!["testdata".to_owned(), "vendor".to_owned()],
        }
    }
}

impl LanguageConfig {
    pub fn is_source_file(&self, path: &Path) -> bool {
        path.extension()
            .is_some_and(|ext| ext == self.source_extension.as_str())
    }

    pub fn is_test_file(&self, path: &Path) -> bool {
        path.file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.ends_with(&self.test_file_suffix))
    }

    pub fn is_module_file(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name == self.module_file.as_str())
    }

    pub fn is_ignored_dir(&self, name: &str) -> bool {
        name.starts_with('.')
            || name.starts_with('_')
            || self.ignored_dir_names.iter().any(|ignored| ignored == name)
    }

    pub fn external_test_name(&self, package: &str) -> String {
        format!("{package}{}", self.external_test_suffix)
    }

    /// `lib_test` -> `Some("lib")`.
    pub fn strip_external_test_suffix<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_suffix(&self.external_test_suffix)
            .filter(|base| !base.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ReconcileConfig {
    /// Reconcile unrelated directory moves on a thread pool.
    pub parallel: bool,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { parallel: true }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse toml config: {0}")]
    Toml(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        // `Display` for `toml::de::Error` includes a snippet of the input; keep only the message.
        ConfigError::Toml(err.message().to_owned())
    }
}

impl GoferConfig {
    pub fn load_from_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&text)
    }
}

static CONFIG_ENV_LOCK: Mutex<()> = Mutex::new(());

/// Run `f` while holding the config environment lock.
///
/// Tests that set [`GOFER_CONFIG_ENV_VAR`] must wrap the mutation and the
/// discovery in this helper, since environment variables are process-global.
pub fn with_config_env_lock<R>(f: impl FnOnce() -> R) -> R {
    let _guard = CONFIG_ENV_LOCK.lock();
    f()
}

/// Locate the config file for a workspace root.
///
/// Search order:
/// 1) `GOFER_CONFIG_PATH` (absolute or relative to `workspace_root`)
/// 2) `gofer.toml`
/// 3) `.gofer.toml`
pub fn discover_config_path(workspace_root: &Path) -> Option<PathBuf> {
    if let Some(value) = std::env::var_os(GOFER_CONFIG_ENV_VAR) {
        let candidate = PathBuf::from(value);
        return Some(if candidate.is_absolute() {
            candidate
        } else {
            workspace_root.join(candidate)
        });
    }

    ["gofer.toml", ".gofer.toml"]
        .into_iter()
        .map(|name| workspace_root.join(name))
        .find(|path| path.is_file())
}

/// Load the configuration for a workspace root.
///
/// If no config is present, returns [`GoferConfig::default`] and `None`.
pub fn load_for_workspace(
    workspace_root: &Path,
) -> Result<(GoferConfig, Option<PathBuf>), ConfigError> {
    let Some(path) = discover_config_path(workspace_root) else {
        return Ok((GoferConfig::default(), None));
    };
    let config = GoferConfig::load_from_path(&path)?;
    Ok((config, Some(path)))
}
