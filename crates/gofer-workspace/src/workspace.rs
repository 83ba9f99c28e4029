use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use crossbeam_channel::{Receiver, Sender, TrySendError};
use gofer_config::{load_for_workspace, GoferConfig};
use gofer_core::{apply_text_edits, canonicalize_or_self, PathMove, TextEdit, TextRange, TextSize};
use gofer_index::WorkspaceIndex;
use gofer_project::ProjectError;
use gofer_refactor::{analyze_position, plan_package_rename, RenameError, RenamePlan, RenameTarget};
use gofer_vfs::{atomic_write, rename_path, Document, FileChange, FileSystem, LocalFs, OverlayFs};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::diagnostics::{workspace_diagnostics, Diagnostic};
use crate::error::{ApplyError, WorkspaceError};
use crate::journal::{Journal, Step};
use crate::reconcile::{move_chains, rebind_buffers, refresh, ReconcilePool, Refresh};
use crate::snapshot::{WorkspaceEvent, WorkspaceSnapshot};

/// Events are dropped for subscribers that fall this far behind.
const SUBSCRIBER_QUEUE_CAPACITY: usize = 1024;

/// What an editor needs to start a rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrepareRename {
    /// Range to highlight.
    pub range: TextRange,
    /// Current text of that range.
    pub text: String,
    pub target: RenameTarget,
}

pub struct Workspace {
    root: PathBuf,
    config: GoferConfig,
    overlay: OverlayFs<LocalFs>,
    state: RwLock<Arc<WorkspaceSnapshot>>,
    /// Serializes every writer; readers never take it.
    write_lock: Mutex<()>,
    pool: ReconcilePool,
    subscribers: Mutex<Vec<Sender<WorkspaceEvent>>>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("root", &self.root)
            .field("version", &self.version())
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Open the workspace rooted at `root`, loading `gofer.toml` if present.
    pub fn open(root: impl AsRef<Path>) -> anyhow::Result<Self> {
        let root = root.as_ref();
        let root = workspace_root(root)
            .with_context(|| format!("failed to open workspace root {}", root.display()))?;
        let (config, config_path) = load_for_workspace(&root)
            .with_context(|| format!("failed to load configuration for {}", root.display()))?;
        if let Some(path) = &config_path {
            tracing::debug!(target: "gofer.workspace", path = %path.display(), "loaded config");
        }
        Self::with_config(root.clone(), config)
            .with_context(|| format!("failed to index workspace {}", root.display()))
    }

    pub fn with_config(root: PathBuf, config: GoferConfig) -> Result<Self, ProjectError> {
        let overlay = OverlayFs::new(LocalFs);
        let index = WorkspaceIndex::load(&overlay, &root, Arc::new(config.language.clone()))?;
        let diagnostics = workspace_diagnostics(&index);
        tracing::info!(
            target: "gofer.workspace",
            root = %root.display(),
            modules = index.modules().len(),
            files_with_diagnostics = diagnostics.len(),
            "workspace opened"
        );
        let initial = WorkspaceSnapshot::new(0, index, diagnostics, overlay.fork());
        Ok(Self {
            pool: ReconcilePool::new(config.reconcile.parallel),
            root,
            config,
            overlay,
            state: RwLock::new(Arc::new(initial)),
            write_lock: Mutex::new(()),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &GoferConfig {
        &self.config
    }

    /// The current snapshot. Holding it never blocks writers.
    pub fn snapshot(&self) -> Arc<WorkspaceSnapshot> {
        Arc::clone(&self.state.read())
    }

    pub fn version(&self) -> u64 {
        self.state.read().version()
    }

    /// Subscribe to workspace events.
    ///
    /// The channel is bounded; a subscriber that does not keep up misses events.
    pub fn subscribe(&self) -> Receiver<WorkspaceEvent> {
        let (tx, rx) = crossbeam_channel::bounded(SUBSCRIBER_QUEUE_CAPACITY);
        self.subscribers.lock().push(tx);
        rx
    }

    /// Diagnostics of a file, or of every file below a directory.
    pub fn diagnostics(&self, path: &Path) -> Vec<Diagnostic> {
        self.snapshot().diagnostics_under(path)
    }

    /// The open buffer at `path` in the current snapshot.
    pub fn document(&self, path: &Path) -> Option<Document> {
        self.snapshot().document(path)
    }

    pub fn document_text(&self, path: &Path) -> Option<String> {
        self.snapshot().document_text(path)
    }

    pub fn prepare_rename(&self, file: &Path, offset: TextSize) -> Result<PrepareRename, RenameError> {
        let snapshot = self.snapshot();
        let index = snapshot.index();
        let target = analyze_position(index, index, file, offset)?;
        Ok(PrepareRename {
            range: target.range,
            text: target.text.clone(),
            target,
        })
    }

    /// Plan renaming the package at `file:offset`. Nothing is changed until the
    /// plan is passed to [`Workspace::apply_plan`].
    pub fn rename(
        &self,
        file: &Path,
        offset: TextSize,
        new_name: &str,
    ) -> Result<RenamePlan, RenameError> {
        let snapshot = self.snapshot();
        let index = snapshot.index();
        let target = analyze_position(index, index, file, offset)?;
        plan_package_rename(
            index,
            index,
            snapshot.buffers(),
            &target,
            new_name,
            snapshot.version(),
        )
    }

    /// Apply `plan` as one unit and return the new snapshot version.
    ///
    /// Fails with [`RenameError::PlanStale`] if the workspace changed since the
    /// plan was computed. On any other failure every completed step is undone.
    pub fn apply_plan(&self, plan: &RenamePlan) -> Result<u64, ApplyError> {
        let _guard = self.write_lock.lock();
        let prev = self.snapshot();
        if plan.base_version != prev.version() {
            return Err(RenameError::PlanStale {
                planned: plan.base_version,
                current: prev.version(),
            }
            .into());
        }

        let mut journal = Journal::default();
        let refresh = match self.apply_steps(plan, &prev, &mut journal) {
            Ok(refresh) => refresh,
            Err(err) => {
                tracing::warn!(
                    target: "gofer.workspace",
                    package = %plan.target.import_path,
                    completed_steps = journal.len(),
                    error = %err,
                    "failed to apply rename"
                );
                journal.rollback(&self.overlay);
                return Err(err);
            }
        };

        let edited_files: Vec<PathBuf> = plan.edit.edited_files().map(PathBuf::from).collect();
        let extra = WorkspaceEvent::PlanApplied {
            version: prev.version() + 1,
            moves: plan.edit.moves.clone(),
            edited_files: edited_files.clone(),
        };
        let version = self.publish(&prev, refresh, vec![extra]);
        tracing::info!(
            target: "gofer.workspace",
            package = %plan.target.import_path,
            new_name = %plan.new_name,
            moves = plan.edit.moves.len(),
            files = edited_files.len(),
            version,
            "rename applied"
        );
        Ok(version)
    }

    fn apply_steps(
        &self,
        plan: &RenamePlan,
        prev: &WorkspaceSnapshot,
        journal: &mut Journal,
    ) -> Result<Refresh, ApplyError> {
        for mv in &plan.edit.moves {
            rename_path(&mv.from, &mv.to).map_err(|err| {
                ApplyError::partial(
                    format!("moving {} to {}", mv.from.display(), mv.to.display()),
                    err,
                )
            })?;
            journal.record(Step::Moved {
                from: mv.from.clone(),
                to: mv.to.clone(),
            });
        }

        let chains = move_chains(&plan.edit.moves);
        for (from, to) in rebind_buffers(&self.overlay, &chains, &self.pool) {
            journal.record(Step::Rebound { from, to });
        }

        for (path, edits) in &plan.edit.text_edits {
            if let Some(previous) = self.overlay.document(path) {
                self.overlay.apply_edits(path, edits).map_err(|err| {
                    ApplyError::partial(format!("editing buffer {}", path.display()), err)
                })?;
                journal.record(Step::EditedBuffer {
                    path: path.clone(),
                    previous,
                });
            } else {
                let step = || format!("editing {}", path.display());
                let previous = self
                    .overlay
                    .base()
                    .read_to_string(path)
                    .map_err(|err| ApplyError::partial(step(), err))?;
                let text =
                    apply_text_edits(&previous, edits).map_err(|err| ApplyError::partial(step(), err))?;
                atomic_write(path, &text).map_err(|err| ApplyError::partial(step(), err))?;
                journal.record(Step::Wrote {
                    path: path.clone(),
                    previous,
                });
            }
        }

        let mut groups = chain_paths(&chains);
        groups.extend(plan.edit.text_edits.keys().map(|path| vec![path.clone()]));
        refresh(prev, &self.overlay, &groups, &self.pool)
            .map_err(|err| ApplyError::partial("re-indexing the workspace", err))
    }

    /// Reconcile moves that already happened on disk.
    pub fn on_paths_moved(&self, moves: &[PathMove]) -> Result<u64, WorkspaceError> {
        let _guard = self.write_lock.lock();
        self.reconcile_locked(moves, &[])
    }

    /// Move a file or directory on disk and reconcile the workspace.
    pub fn move_path(&self, from: &Path, to: &Path) -> Result<u64, WorkspaceError> {
        let _guard = self.write_lock.lock();
        rename_path(from, to).map_err(|source| WorkspaceError::Move {
            from: from.display().to_string(),
            to: to.display().to_string(),
            source,
        })?;
        self.reconcile_locked(&[PathMove::new(from, to)], &[])
    }

    /// Reconcile a batch of file watcher notifications.
    pub fn apply_filesystem_events(&self, changes: &[FileChange]) -> Result<u64, WorkspaceError> {
        let mut moves = Vec::new();
        let mut paths = Vec::new();
        for change in changes {
            match change {
                FileChange::Moved { from, to } => moves.push(PathMove::new(from, to)),
                FileChange::Created { path }
                | FileChange::Modified { path }
                | FileChange::Deleted { path } => paths.push(path.clone()),
            }
        }
        let _guard = self.write_lock.lock();
        self.reconcile_locked(&moves, &paths)
    }

    pub fn open_document(
        &self,
        path: impl Into<PathBuf>,
        text: impl Into<String>,
        version: i32,
    ) -> Result<u64, WorkspaceError> {
        let path = path.into();
        let _guard = self.write_lock.lock();
        self.overlay.open(path.clone(), text, version);
        self.reconcile_locked(&[], &[path])
    }

    pub fn change_document(&self, path: &Path, edits: &[TextEdit]) -> Result<u64, WorkspaceError> {
        let _guard = self.write_lock.lock();
        self.overlay.apply_edits(path, edits)?;
        self.reconcile_locked(&[], &[path.to_path_buf()])
    }

    /// Undo the last edit of an open buffer. Returns `false` if there was none.
    pub fn undo_document(&self, path: &Path) -> Result<bool, WorkspaceError> {
        let _guard = self.write_lock.lock();
        if !self.overlay.undo(path)? {
            return Ok(false);
        }
        self.reconcile_locked(&[], &[path.to_path_buf()])?;
        Ok(true)
    }

    pub fn close_document(&self, path: &Path) -> Result<u64, WorkspaceError> {
        let _guard = self.write_lock.lock();
        self.overlay.close(path);
        self.reconcile_locked(&[], &[path.to_path_buf()])
    }

    /// Shared by every trigger: rebind buffers, rescan, recompute diagnostics,
    /// publish. Callers hold the write lock.
    fn reconcile_locked(&self, moves: &[PathMove], paths: &[PathBuf]) -> Result<u64, WorkspaceError> {
        let prev = self.snapshot();
        let chains = move_chains(moves);
        let rebound = rebind_buffers(&self.overlay, &chains, &self.pool);

        let mut groups = chain_paths(&chains);
        groups.extend(paths.iter().map(|path| vec![path.clone()]));
        let refresh = refresh(&prev, &self.overlay, &groups, &self.pool)?;

        let extra = if moves.is_empty() {
            Vec::new()
        } else {
            tracing::info!(
                target: "gofer.workspace",
                moves = moves.len(),
                chains = chains.len(),
                buffers = rebound.len(),
                "reconciled moved paths"
            );
            vec![WorkspaceEvent::PathsMoved {
                moves: moves.to_vec(),
            }]
        };
        Ok(self.publish(&prev, refresh, extra))
    }

    /// Callers hold the write lock, so the live buffers can't change between
    /// the refresh and the fork taken here.
    fn publish(&self, prev: &WorkspaceSnapshot, refresh: Refresh, extra: Vec<WorkspaceEvent>) -> u64 {
        let version = prev.version() + 1;
        let next = WorkspaceSnapshot::new(
            version,
            refresh.index,
            refresh.diagnostics,
            self.overlay.fork(),
        );
        *self.state.write() = Arc::new(next);

        let events = refresh
            .updated
            .into_iter()
            .map(|(file, diagnostics)| WorkspaceEvent::DiagnosticsUpdated { file, diagnostics })
            .chain(extra);
        self.broadcast(events);
        version
    }

    fn broadcast(&self, events: impl IntoIterator<Item = WorkspaceEvent>) {
        let mut subscribers = self.subscribers.lock();
        if subscribers.is_empty() {
            return;
        }
        for event in events {
            subscribers.retain(|tx| match tx.try_send(event.clone()) {
                Ok(()) | Err(TrySendError::Full(_)) => true,
                Err(TrySendError::Disconnected(_)) => false,
            });
        }
    }
}

fn chain_paths(chains: &[Vec<PathMove>]) -> Vec<Vec<PathBuf>> {
    chains
        .iter()
        .map(|chain| {
            chain
                .iter()
                .flat_map(|mv| [mv.from.clone(), mv.to.clone()])
                .collect()
        })
        .collect()
}

fn workspace_root(root: &Path) -> std::io::Result<PathBuf> {
    if !root.is_dir() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "not a directory",
        ));
    }
    Ok(canonicalize_or_self(root))
}
