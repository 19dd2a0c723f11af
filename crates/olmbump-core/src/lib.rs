//! olmbump Core - upgrade an Operator Lifecycle Manager bundle to a new release
//!
//! This crate provides the building blocks of a bundle upgrade:
//! - `YamlStore`: YAML load/dump with explicit string-style settings
//! - `Crd`: One CustomResourceDefinition file with typed accessors and a digest
//! - `CrdDirectory`: CRDs found under a directory tree, indexed by name
//! - `ChangeReport`: Added/removed/modified CRDs between two directories
//! - `ClusterServiceVersion`: Renders a new CSV from the previous one
//! - `PackageManifest`: Points the package channel at the new CSV
//! - `Profile`: Product-specific names and catalog metadata
//! - `Upgrader`: Plans and applies the whole upgrade

pub mod crd;
pub mod csv;
pub mod directory;
pub mod document;
pub mod error;
pub mod package;
pub mod profile;
pub mod report;
pub mod upgrade;

pub use crd::{Crd, CRD_KIND};
pub use csv::{ClusterServiceVersion, validate_version};
pub use directory::CrdDirectory;
pub use document::{DumpOptions, YamlStore};
pub use error::{CoreError, Result};
pub use package::{Channel, PackageManifest};
pub use profile::{DescriptionSource, Link, Profile, STATIC_DESCRIPTION};
pub use report::{ChangeKind, ChangeReport, CrdChange, LEGEND};
pub use upgrade::{UpgradeOptions, UpgradeOutcome, UpgradePlan, Upgrader};
