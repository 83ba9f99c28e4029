//! Module and package discovery.
//!
//! Package membership is always derived from a directory's current contents;
//! nothing is carried over from a previous load.

mod loader;
mod model;
mod modfile;

pub use loader::{load_dir, load_module, owning_module, scan_tree, TreeScan};
pub use model::{FileKind, Module, Package, SourceFile};
pub use modfile::{parse_modfile, ModFile, ModuleDirective, Replace};

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}
