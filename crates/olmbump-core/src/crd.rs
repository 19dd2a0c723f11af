//! CustomResourceDefinition records
//!
//! A [`Crd`] wraps one parsed CRD file together with its raw bytes, so that
//! change detection can compare exact file contents while the bundle
//! builder reads typed fields from the parsed tree.

use serde_yaml::Value;
use sha1::{Digest, Sha1};
use std::path::{Path, PathBuf};

use crate::document::{self, YamlStore};
use crate::error::{CoreError, Result};

/// Kind of a CustomResourceDefinition document
pub const CRD_KIND: &str = "CustomResourceDefinition";

/// A CRD file loaded from disk
#[derive(Debug, Clone)]
pub struct Crd {
    path: PathBuf,
    contents: String,
    document: Value,
}

impl Crd {
    /// Load a CRD candidate from a file
    ///
    /// The file is not required to be a CRD; check [`Crd::is_crd`].
    pub fn load(path: &Path) -> Result<Self> {
        let contents = document::read_file(path)?;
        Self::from_contents(path, contents)
    }

    /// Build a record from already-read file contents
    pub fn from_contents(path: &Path, contents: String) -> Result<Self> {
        let document = document::parse(&contents, path)?;
        Ok(Self {
            path: path.to_path_buf(),
            contents,
            document,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Raw file contents as read from disk
    pub fn contents(&self) -> &str {
        &self.contents
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    pub fn is_crd(&self) -> bool {
        document::get(&self.document, &["kind"]).and_then(Value::as_str) == Some(CRD_KIND)
    }

    /// `metadata.name`
    pub fn name(&self) -> Result<&str> {
        self.field(&["metadata", "name"])
    }

    /// `spec.group`
    pub fn group(&self) -> Result<&str> {
        self.field(&["spec", "group"])
    }

    /// `spec.names.kind`
    pub fn kind(&self) -> Result<&str> {
        self.field(&["spec", "names", "kind"])
    }

    /// Served version of the resource
    ///
    /// Uses `spec.version` when present, otherwise the storage version from
    /// `spec.versions` (or its first entry when none is marked as storage).
    pub fn version(&self) -> Result<&str> {
        if let Some(version) = document::get(&self.document, &["spec", "version"]) {
            return version
                .as_str()
                .ok_or_else(|| CoreError::field_type("spec.version", "string"));
        }

        let versions = document::get(&self.document, &["spec", "versions"])
            .and_then(Value::as_sequence)
            .ok_or_else(|| CoreError::missing(self.path.display(), "spec.version"))?;

        versions
            .iter()
            .find(|v| v.get("storage").and_then(Value::as_bool) == Some(true))
            .or_else(|| versions.first())
            .and_then(|v| v.get("name"))
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::missing(self.path.display(), "spec.versions[].name"))
    }

    /// Schema description, falling back to the CRD name
    pub fn description(&self) -> Result<&str> {
        let legacy = document::get(
            &self.document,
            &["spec", "validation", "openAPIV3Schema", "description"],
        );
        let versioned = || {
            document::get(&self.document, &["spec", "versions"])
                .and_then(Value::as_sequence)
                .and_then(|versions| {
                    versions.iter().find_map(|v| {
                        document::get(v, &["schema", "openAPIV3Schema", "description"])
                    })
                })
        };

        match legacy.or_else(versioned).and_then(Value::as_str) {
            Some(d) if !d.is_empty() => Ok(d),
            _ => self.name(),
        }
    }

    /// SHA-1 of the raw file contents, hex encoded
    pub fn digest(&self) -> String {
        let mut hasher = Sha1::new();
        hasher.update(self.contents.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Base name of the file this record was loaded from
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// File name used inside a bundle: `<name>.yaml`
    pub fn bundle_filename(&self) -> Result<String> {
        Ok(format!("{}.yaml", self.name()?))
    }

    /// Re-serialize the document into `dir` under its bundle file name
    pub fn write_to(&self, store: &YamlStore, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(self.bundle_filename()?);
        store.dump(&self.document, &path)?;
        tracing::debug!("Wrote CRD {} to {}", self.name()?, path.display());
        Ok(path)
    }

    fn field(&self, path: &[&str]) -> Result<&str> {
        match document::get(&self.document, path) {
            Some(Value::String(s)) => Ok(s),
            Some(_) => Err(CoreError::field_type(path.join("."), "string")),
            None => Err(CoreError::missing(self.path.display(), path.join("."))),
        }
    }
}
