use std::collections::BTreeSet;

use gofer_syntax::ImportSpec;

/// How an import spec binds its package.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ImportForm {
    /// No name; binds the package's default identifier.
    Implicit,
    Alias(String),
    /// `_ "path"`
    Blank,
    /// `. "path"`
    Dot,
}

impl ImportForm {
    pub fn of(spec: &ImportSpec) -> Self {
        if spec.is_blank() {
            ImportForm::Blank
        } else if spec.is_dot() {
            ImportForm::Dot
        } else {
            match spec.alias() {
                Some(alias) => ImportForm::Alias(alias.to_owned()),
                None => ImportForm::Implicit,
            }
        }
    }

    pub fn alias(&self) -> Option<&str> {
        match self {
            ImportForm::Alias(alias) => Some(alias),
            _ => None,
        }
    }
}

/// One import of a file, after its path has (possibly) been rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportEntry {
    pub path: String,
    /// The form the import had before the rename.
    pub form: ImportForm,
    /// Identifier an implicit import of `path` would bind.
    pub default_ident: String,
    /// Whether the rename rewrote this import. Untouched imports never change.
    pub rewritten: bool,
}

/// Decide the final form of every import in one file.
///
/// Rewritten aliases that now equal their default identifier are dropped.
/// Rewritten implicit imports that collide with another import's identifier
/// get a fresh alias `<ident><n>` with the smallest unused `n >= 1`. Imports of
/// one path always share a form, so identical paths never collide with each
/// other. When nothing untouched holds an identifier, the first import in file
/// order keeps it unaliased.
pub fn resolve_aliases(entries: &[ImportEntry]) -> Vec<ImportForm> {
    let mut forms: Vec<ImportForm> = entries
        .iter()
        .map(|entry| match &entry.form {
            ImportForm::Alias(alias) if entry.rewritten && *alias == entry.default_ident => {
                ImportForm::Implicit
            }
            form => form.clone(),
        })
        .collect();

    let explicit: BTreeSet<String> = forms
        .iter()
        .filter_map(|form| form.alias().map(str::to_owned))
        .collect();
    let mut used = explicit.clone();
    let mut groups: Vec<(&str, Vec<usize>)> = Vec::new();
    for (idx, entry) in entries.iter().enumerate() {
        if forms[idx] != ImportForm::Implicit {
            continue;
        }
        used.insert(entry.default_ident.clone());
        match groups
            .iter_mut()
            .find(|(ident, _)| *ident == entry.default_ident)
        {
            Some((_, members)) => members.push(idx),
            None => groups.push((entry.default_ident.as_str(), vec![idx])),
        }
    }

    for (ident, members) in groups {
        let untouched = members.iter().find(|&&idx| !entries[idx].rewritten);
        // An explicit alias already owns the identifier unless an untouched
        // import shares it; then both were in conflict before the rename.
        let holder = match untouched {
            Some(&idx) => Some(entries[idx].path.as_str()),
            None if explicit.contains(ident) => None,
            None => members.first().map(|&idx| entries[idx].path.as_str()),
        };

        let mut seen_paths: Vec<&str> = Vec::new();
        for &idx in &members {
            let path = entries[idx].path.as_str();
            if Some(path) == holder || seen_paths.contains(&path) {
                continue;
            }
            seen_paths.push(path);

            let rewritten: Vec<usize> = members
                .iter()
                .copied()
                .filter(|&other| entries[other].path == path && entries[other].rewritten)
                .collect();
            if rewritten.is_empty() {
                continue;
            }
            let alias = fresh_alias(ident, &used);
            used.insert(alias.clone());
            for other in rewritten {
                forms[other] = ImportForm::Alias(alias.clone());
            }
        }
    }

    forms
}

fn fresh_alias(ident: &str, used: &BTreeSet<String>) -> String {
    (1u32..)
        .map(|n| format!("{ident}{n}"))
        .find(|candidate| !used.contains(candidate))
        .unwrap_or_else(|| format!("{ident}_"))
}
