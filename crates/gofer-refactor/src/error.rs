use std::path::PathBuf;

use gofer_core::EditError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenameError {
    #[error("can't rename package \"{name}\"")]
    CannotRenameMainPackage { name: String },

    #[error("no object found")]
    NoObjectFound,

    #[error("can't rename package: missing module information for package \"{package}\"")]
    MissingModuleInfo { package: String },

    #[error("can't rename package: {} already exists", path.display())]
    NameCollisionOnDisk { path: PathBuf },

    #[error("invalid package name {name:?}")]
    InvalidPackageName { name: String },

    #[error("can't rename {name:?}: not a package")]
    NotAPackage { name: String },

    #[error("workspace changed since the rename was planned (planned at version {planned}, now at {current})")]
    PlanStale { planned: u64, current: u64 },

    #[error(transparent)]
    Edit(#[from] EditError),
}

impl RenameError {
    /// Only a stale plan can succeed by planning again.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RenameError::PlanStale { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offender() {
        assert_eq!(
            RenameError::CannotRenameMainPackage {
                name: "main".into()
            }
            .to_string(),
            "can't rename package \"main\""
        );
        assert_eq!(RenameError::NoObjectFound.to_string(), "no object found");
        assert_eq!(
            RenameError::MissingModuleInfo {
                package: "lib".into()
            }
            .to_string(),
            "can't rename package: missing module information for package \"lib\""
        );
        assert!(RenameError::PlanStale {
            planned: 1,
            current: 2
        }
        .is_recoverable());
        assert!(!RenameError::NoObjectFound.is_recoverable());
    }
}
