//! Change report between two CRD directories

use std::fmt;

use crate::directory::CrdDirectory;

/// Legend printed above the report rows
pub const LEGEND: &str = "+: added, -: removed, %: changed";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

impl ChangeKind {
    pub fn symbol(&self) -> char {
        match self {
            Self::Added => '+',
            Self::Removed => '-',
            Self::Modified => '%',
        }
    }
}

/// One CRD that differs between the two directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrdChange {
    pub kind: ChangeKind,
    pub name: String,
    /// File the CRD was found in (source side for added and modified)
    pub file: String,
    /// Bundle-side file for modified CRDs
    pub other_file: Option<String>,
}

impl CrdChange {
    /// Fixed-width report row
    pub fn row(&self) -> String {
        format!(
            "{} {:<55} {:<60} {:<50}",
            self.kind.symbol(),
            self.name,
            self.file,
            self.other_file.as_deref().unwrap_or("")
        )
    }
}

/// Differences between a source CRD set and a bundle CRD set
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeReport {
    /// Ordered by kind (added, removed, modified), then by name
    pub changes: Vec<CrdChange>,
}

impl ChangeReport {
    /// Compare `source` against `bundle`
    ///
    /// - added: in `source`, not in `bundle`
    /// - removed: in `bundle`, not in `source`
    /// - modified: in both, with different raw-content digests
    pub fn between(source: &CrdDirectory, bundle: &CrdDirectory) -> Self {
        let mut changes = Vec::new();

        for name in source.names_missing(bundle) {
            if let Some(crd) = source.get(name) {
                changes.push(CrdChange {
                    kind: ChangeKind::Added,
                    name: name.to_string(),
                    file: crd.filename(),
                    other_file: None,
                });
            }
        }

        for name in bundle.names_missing(source) {
            if let Some(crd) = bundle.get(name) {
                changes.push(CrdChange {
                    kind: ChangeKind::Removed,
                    name: name.to_string(),
                    file: crd.filename(),
                    other_file: None,
                });
            }
        }

        for name in source.names_intersecting(bundle) {
            let (Some(new), Some(old)) = (source.get(name), bundle.get(name)) else {
                continue;
            };
            if new.digest() != old.digest() {
                changes.push(CrdChange {
                    kind: ChangeKind::Modified,
                    name: name.to_string(),
                    file: new.filename(),
                    other_file: Some(old.filename()),
                });
            }
        }

        Self { changes }
    }

    pub fn of_kind(&self, kind: ChangeKind) -> impl Iterator<Item = &CrdChange> {
        self.changes.iter().filter(move |c| c.kind == kind)
    }

    pub fn added(&self) -> impl Iterator<Item = &CrdChange> {
        self.of_kind(ChangeKind::Added)
    }

    pub fn removed(&self) -> impl Iterator<Item = &CrdChange> {
        self.of_kind(ChangeKind::Removed)
    }

    pub fn modified(&self) -> impl Iterator<Item = &CrdChange> {
        self.of_kind(ChangeKind::Modified)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl fmt::Display for ChangeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", LEGEND)?;
        for change in &self.changes {
            writeln!(f, "{}", change.row())?;
        }
        Ok(())
    }
}
