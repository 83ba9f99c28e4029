use std::path::{Path, PathBuf};

use gofer_core::{TextRange, TextSize};
use gofer_index::{PositionResolver, Resolved, WorkspaceIndex};
use serde::Serialize;

use crate::RenameError;

/// The package a rename request points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenameTarget {
    pub dir: PathBuf,
    /// Current declared name.
    pub name: String,
    pub import_path: String,
    pub module_root: PathBuf,
    /// Identifier (or import path literal) under the cursor.
    pub range: TextRange,
    pub text: String,
}

/// Decide whether the identifier at `offset` names a renameable package.
///
/// Checks run in a fixed order: nothing resolvable, not a package, the entry
/// point package, then missing module information.
pub fn analyze_position(
    index: &WorkspaceIndex,
    resolver: &dyn PositionResolver,
    file: &Path,
    offset: TextSize,
) -> Result<RenameTarget, RenameError> {
    let resolution = resolver
        .resolve(file, offset)
        .ok_or(RenameError::NoObjectFound)?;

    let package = match &resolution.object {
        Resolved::PackageClause { dir } => index.package(dir).ok_or(RenameError::NoObjectFound)?,
        Resolved::ImportedPackage { import_path } => index
            .package_by_import_path(import_path)
            .ok_or_else(|| RenameError::MissingModuleInfo {
                package: import_path.clone(),
            })?,
        Resolved::Other => {
            return Err(RenameError::NotAPackage {
                name: resolution.text,
            })
        }
    };

    let name = package.name.clone().ok_or(RenameError::NoObjectFound)?;
    if name == index.config().entry_point_name {
        return Err(RenameError::CannotRenameMainPackage { name });
    }

    let (Some(import_path), Some(module_root)) = (&package.import_path, &package.module_root)
    else {
        return Err(RenameError::MissingModuleInfo { package: name });
    };

    tracing::debug!(
        target: "gofer.refactor",
        dir = %package.dir.display(),
        package = %name,
        import_path = %import_path,
        "rename target resolved"
    );

    Ok(RenameTarget {
        dir: package.dir.clone(),
        import_path: import_path.clone(),
        module_root: module_root.clone(),
        name,
        range: resolution.range,
        text: resolution.text,
    })
}
