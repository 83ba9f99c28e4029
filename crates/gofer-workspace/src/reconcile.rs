use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use gofer_core::{is_within, PathMove};
use gofer_index::WorkspaceIndex;
use gofer_project::ProjectError;
use gofer_vfs::{FileSystem, OverlayFs};
use rayon::prelude::*;

use crate::diagnostics::{package_diagnostics, Diagnostic, DiagnosticMap};
use crate::snapshot::WorkspaceSnapshot;

/// Runs independent reconciliation work, on a thread pool when one is available.
#[derive(Debug)]
pub(crate) enum ReconcilePool {
    Rayon(rayon::ThreadPool),
    Inline,
}

impl ReconcilePool {
    pub(crate) fn new(parallel: bool) -> Self {
        if !parallel {
            return ReconcilePool::Inline;
        }
        let mut threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(8);
        loop {
            match rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .thread_name(|idx| format!("gofer-reconcile-{idx}"))
                .build()
            {
                Ok(pool) => return ReconcilePool::Rayon(pool),
                Err(_) if threads > 1 => threads = (threads / 2).max(1),
                Err(err) => {
                    tracing::warn!(
                        target: "gofer.workspace",
                        error = %err,
                        "no reconcile threads available; reconciling inline"
                    );
                    return ReconcilePool::Inline;
                }
            }
        }
    }

    /// Map `f` over `items`, preserving order.
    pub(crate) fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync + Send,
    {
        match self {
            ReconcilePool::Rayon(pool) => pool.install(|| items.par_iter().map(&f).collect()),
            ReconcilePool::Inline => items.iter().map(f).collect(),
        }
    }
}

fn related(a: &PathMove, b: &PathMove) -> bool {
    [&a.from, &a.to].into_iter().any(|x| {
        [&b.from, &b.to]
            .into_iter()
            .any(|y| is_within(x, y) || is_within(y, x))
    })
}

/// Partition `moves` into chains of moves whose paths are ancestors or
/// descendants of one another.
///
/// Chains are independent of each other. Within a chain moves keep their batch
/// order, so a move below a directory observes that directory's earlier move.
pub fn move_chains(moves: &[PathMove]) -> Vec<Vec<PathMove>> {
    let mut parent: Vec<usize> = (0..moves.len()).collect();
    fn find(parent: &mut [usize], mut idx: usize) -> usize {
        while parent[idx] != idx {
            parent[idx] = parent[parent[idx]];
            idx = parent[idx];
        }
        idx
    }
    for i in 0..moves.len() {
        for j in i + 1..moves.len() {
            if related(&moves[i], &moves[j]) {
                let (a, b) = (find(&mut parent, i), find(&mut parent, j));
                parent[a.max(b)] = a.min(b);
            }
        }
    }

    let mut chains: Vec<(usize, Vec<PathMove>)> = Vec::new();
    for (idx, mv) in moves.iter().enumerate() {
        let root = find(&mut parent, idx);
        match chains.iter_mut().find(|(r, _)| *r == root) {
            Some((_, chain)) => chain.push(mv.clone()),
            None => chains.push((root, vec![mv.clone()])),
        }
    }
    chains.into_iter().map(|(_, chain)| chain).collect()
}

/// Move open buffers along with their files. Returns every `(old, new)` rebinding.
pub(crate) fn rebind_buffers<F: FileSystem>(
    overlay: &OverlayFs<F>,
    chains: &[Vec<PathMove>],
    pool: &ReconcilePool,
) -> Vec<(PathBuf, PathBuf)> {
    pool.map(chains, |chain| {
        chain
            .iter()
            .flat_map(|mv| overlay.rebind_tree(&mv.from, &mv.to))
            .collect::<Vec<_>>()
    })
    .into_iter()
    .flatten()
    .collect()
}

/// The next index and diagnostics after the paths in `groups` changed.
#[derive(Debug)]
pub(crate) struct Refresh {
    pub index: WorkspaceIndex,
    pub diagnostics: DiagnosticMap,
    /// Files whose diagnostics must be republished, with their new set.
    pub updated: Vec<(PathBuf, Vec<Diagnostic>)>,
}

/// Re-read every path in `groups` and recompute diagnostics of the packages
/// they touch. Each group is handled as one unit of parallel work.
pub(crate) fn refresh(
    prev: &WorkspaceSnapshot,
    fs: &dyn FileSystem,
    groups: &[Vec<PathBuf>],
    pool: &ReconcilePool,
) -> Result<Refresh, ProjectError> {
    let old = prev.index();
    let paths: Vec<PathBuf> = groups.iter().flatten().cloned().collect();
    let index = old.rescan(fs, &paths)?;

    let results = pool.map(groups, |group| {
        let mut dirs: BTreeSet<PathBuf> = BTreeSet::new();
        for path in group {
            dirs.extend(old.packages_under(path).map(|p| p.dir.clone()));
            dirs.extend(index.packages_under(path).map(|p| p.dir.clone()));
            if let Some(parent) = path.parent() {
                dirs.insert(parent.to_path_buf());
            }
        }
        let mut diagnostics = DiagnosticMap::new();
        for dir in &dirs {
            diagnostics.extend(package_diagnostics(&index, dir));
        }
        (dirs, diagnostics)
    });

    let mut dirs: BTreeSet<PathBuf> = BTreeSet::new();
    let mut fresh = DiagnosticMap::new();
    for (group_dirs, group_diagnostics) in results {
        dirs.extend(group_dirs);
        fresh.extend(group_diagnostics);
    }

    let in_dirs = |file: &Path| file.parent().is_some_and(|parent| dirs.contains(parent));
    let mut diagnostics: DiagnosticMap = prev
        .diagnostics()
        .iter()
        .filter(|(file, _)| !in_dirs(file))
        .map(|(file, diags)| (file.clone(), diags.clone()))
        .collect();
    diagnostics.extend(fresh);

    let mut reported: BTreeSet<PathBuf> = BTreeSet::new();
    for dir in &dirs {
        for source in [old, &index] {
            if let Some(package) = source.package(dir) {
                reported.extend(package.files.iter().cloned());
            }
        }
    }
    reported.extend(prev.diagnostics().keys().filter(|file| in_dirs(file)).cloned());
    let updated = reported
        .into_iter()
        .map(|file| {
            let diags = diagnostics.get(&file).cloned().unwrap_or_default();
            (file, diags)
        })
        .collect();

    Ok(Refresh {
        index,
        diagnostics,
        updated,
    })
}
