use std::fmt;
use std::path::PathBuf;

use gofer_vfs::{atomic_write, rename_path, Document, FileSystem, OverlayFs};

/// A completed, reversible step of plan application.
pub(crate) enum Step {
    Moved { from: PathBuf, to: PathBuf },
    Rebound { from: PathBuf, to: PathBuf },
    Wrote { path: PathBuf, previous: String },
    EditedBuffer { path: PathBuf, previous: Document },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Moved { from, to } => write!(f, "move {} -> {}", from.display(), to.display()),
            Step::Rebound { from, to } => {
                write!(f, "rebind buffer {} -> {}", from.display(), to.display())
            }
            Step::Wrote { path, .. } => write!(f, "write {}", path.display()),
            Step::EditedBuffer { path, .. } => write!(f, "edit buffer {}", path.display()),
        }
    }
}

/// Steps applied so far, undone in reverse order on failure.
#[derive(Default)]
pub(crate) struct Journal {
    steps: Vec<Step>,
}

impl Journal {
    pub(crate) fn record(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub(crate) fn len(&self) -> usize {
        self.steps.len()
    }

    pub(crate) fn rollback<F: FileSystem>(self, overlay: &OverlayFs<F>) {
        tracing::warn!(
            target: "gofer.workspace",
            steps = self.steps.len(),
            "rolling back partially applied plan"
        );
        for step in self.steps.into_iter().rev() {
            let result = match &step {
                Step::Moved { from, to } => rename_path(to, from),
                Step::Rebound { from, to } => {
                    overlay.rebind_tree(to, from);
                    Ok(())
                }
                Step::Wrote { path, previous } => atomic_write(path, previous),
                Step::EditedBuffer { path, previous } => {
                    overlay.restore(path.clone(), previous.clone());
                    Ok(())
                }
            };
            if let Err(err) = result {
                tracing::error!(
                    target: "gofer.workspace",
                    step = %step,
                    error = %err,
                    "rollback step failed"
                );
            }
        }
    }
}
