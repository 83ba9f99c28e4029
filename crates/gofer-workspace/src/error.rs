use gofer_project::ProjectError;
use gofer_refactor::RenameError;
use gofer_vfs::DocumentError;
use thiserror::Error;

/// Failure to apply a [`gofer_refactor::RenamePlan`].
///
/// Every variant leaves the workspace exactly as it was before the attempt.
#[derive(Debug, Error)]
pub enum ApplyError {
    #[error(transparent)]
    Rename(#[from] RenameError),

    /// A step failed midway; every completed step has been rolled back.
    #[error("failed while {step}; all changes were rolled back: {source}")]
    PartialApplyFailure {
        step: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl ApplyError {
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ApplyError::Rename(err) if err.is_recoverable())
    }

    pub(crate) fn partial(
        step: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ApplyError::PartialApplyFailure {
            step: step.into(),
            source: source.into(),
        }
    }
}

/// Failure of a buffer or file-system notification update.
#[derive(Debug, Error)]
pub enum WorkspaceError {
    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error(transparent)]
    Project(#[from] ProjectError),

    #[error("failed to move {from} to {to}: {source}")]
    Move {
        from: String,
        to: String,
        #[source]
        source: std::io::Error,
    },
}
