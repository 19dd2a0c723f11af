//! Package manifest channel pointer

use serde::Serialize;
use serde_yaml::Value;
use std::path::{Path, PathBuf};

use crate::document::{self, YamlStore};
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Channel {
    pub name: String,
    #[serde(rename = "currentCSV")]
    pub current_csv: String,
}

/// The bundle's package manifest (`<product>.package.yaml`)
#[derive(Debug, Clone)]
pub struct PackageManifest {
    path: PathBuf,
}

impl PackageManifest {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Point the package at `csv_name` on a single channel
    ///
    /// Any existing channel list is replaced, not merged.
    pub fn set_current_csv(&self, store: &YamlStore, channel: &str, csv_name: &str) -> Result<Value> {
        let mut doc = store.load(&self.path)?;
        let channels = vec![Channel {
            name: channel.to_string(),
            current_csv: csv_name.to_string(),
        }];
        document::set(&mut doc, &["channels"], serde_yaml::to_value(channels)?)?;
        store.dump(&doc, &self.path)?;

        tracing::info!("{} now points {} at {}", self.path.display(), channel, csv_name);
        Ok(doc)
    }
}
