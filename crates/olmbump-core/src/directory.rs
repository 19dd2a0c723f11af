//! Index of the CRDs found under a directory tree

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::crd::Crd;
use crate::error::{CoreError, Result};

/// CRDs found under a directory, keyed by `metadata.name`
///
/// Built once by [`CrdDirectory::scan`] and read-only afterwards. Iteration
/// is in name order.
#[derive(Debug, Clone)]
pub struct CrdDirectory {
    path: PathBuf,
    crds: BTreeMap<String, Crd>,
}

impl CrdDirectory {
    /// Scan `path` recursively and index every YAML file that is a CRD
    ///
    /// Files are visited in file-name order. When two files declare the same
    /// CRD name, the one visited last wins.
    pub fn scan(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.is_dir() {
            return Err(CoreError::io(
                &path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "directory does not exist"),
            ));
        }

        let mut crds = BTreeMap::new();
        for file in yaml_files(&path)? {
            let crd = Crd::load(&file)?;
            if !crd.is_crd() {
                tracing::debug!("Skipping non-CRD document {}", file.display());
                continue;
            }

            let name = crd.name()?.to_string();
            if let Some(previous) = crds.insert(name.clone(), crd) {
                tracing::warn!(
                    "CRD {} declared in both {} and {}; keeping the latter",
                    name,
                    previous.path().display(),
                    file.display()
                );
            }
        }

        tracing::debug!("Indexed {} CRD(s) under {}", crds.len(), path.display());
        Ok(Self { path, crds })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All CRDs in name order
    pub fn crds(&self) -> impl Iterator<Item = &Crd> {
        self.crds.values()
    }

    pub fn get(&self, name: &str) -> Option<&Crd> {
        self.crds.get(name)
    }

    pub fn names(&self) -> BTreeSet<&str> {
        self.crds.keys().map(String::as_str).collect()
    }

    /// Names present here but not in `other`
    pub fn names_missing<'a>(&'a self, other: &CrdDirectory) -> BTreeSet<&'a str> {
        self.crds
            .keys()
            .filter(|name| !other.crds.contains_key(*name))
            .map(String::as_str)
            .collect()
    }

    /// Names present both here and in `other`
    pub fn names_intersecting<'a>(&'a self, other: &CrdDirectory) -> BTreeSet<&'a str> {
        self.crds
            .keys()
            .filter(|name| other.crds.contains_key(*name))
            .map(String::as_str)
            .collect()
    }

    /// Sorted, deduplicated API groups of all CRDs
    pub fn groups(&self) -> Result<Vec<String>> {
        let groups = self
            .crds()
            .map(|crd| crd.group().map(str::to_string))
            .collect::<Result<BTreeSet<_>>>()?;
        Ok(groups.into_iter().collect())
    }

    pub fn len(&self) -> usize {
        self.crds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.crds.is_empty()
    }
}

fn yaml_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            let source = e
                .into_io_error()
                .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
            CoreError::io(path, source)
        })?;

        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        if let Some(ext) = path.extension() {
            let ext = ext.to_string_lossy().to_lowercase();
            if matches!(ext.as_str(), "yaml" | "yml") {
                files.push(path.to_path_buf());
            }
        }
    }

    Ok(files)
}
