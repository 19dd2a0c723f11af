//! Bundle upgrade
//!
//! Orchestrates one release bump of an operator bundle:
//!
//! 1. index the CRDs shipped by the product source tree and by the
//!    current bundle version, and compare them
//! 2. copy the source CRDs into the new bundle version directory
//! 3. render the new ClusterServiceVersion from the current one
//! 4. point the package manifest's channel at the new CSV
//!
//! Both version strings are validated before anything is written. A failure
//! after that point can leave the new version directory partially populated;
//! every individual file write is atomic.

use chrono::{DateTime, Utc};
use serde_yaml::Value;
use std::fs;
use std::path::PathBuf;

use crate::csv::{self, ClusterServiceVersion};
use crate::directory::CrdDirectory;
use crate::document::YamlStore;
use crate::error::{CoreError, Result};
use crate::package::PackageManifest;
use crate::profile::Profile;
use crate::report::ChangeReport;

/// Inputs of a bundle upgrade
#[derive(Debug, Clone)]
pub struct UpgradeOptions {
    /// Root of the product source tree
    pub source_root: PathBuf,
    /// Root of the bundle, holding one directory per version
    pub bundle_root: PathBuf,
    /// Version currently published in the bundle
    pub current_version: String,
    /// Version to create
    pub new_version: String,
    pub profile: Profile,
    /// Creation timestamp for the CSV; the current time when unset
    pub created_at: Option<DateTime<Utc>>,
}

impl UpgradeOptions {
    pub fn new(
        source_root: impl Into<PathBuf>,
        bundle_root: impl Into<PathBuf>,
        current_version: impl Into<String>,
        new_version: impl Into<String>,
    ) -> Self {
        Self {
            source_root: source_root.into(),
            bundle_root: bundle_root.into(),
            current_version: current_version.into(),
            new_version: new_version.into(),
            profile: Profile::default(),
            created_at: None,
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = profile;
        self
    }

    pub fn crd_source_dir(&self) -> PathBuf {
        self.source_root.join(&self.profile.crd_subdir)
    }

    pub fn current_dir(&self) -> PathBuf {
        self.bundle_root.join(&self.current_version)
    }

    pub fn new_dir(&self) -> PathBuf {
        self.bundle_root.join(&self.new_version)
    }

    pub fn package_path(&self) -> PathBuf {
        self.bundle_root.join(&self.profile.package_file)
    }
}

/// CRD indexes and their differences, computed before anything is written
#[derive(Debug)]
pub struct UpgradePlan {
    source: CrdDirectory,
    current: CrdDirectory,
    report: ChangeReport,
    description: String,
}

impl UpgradePlan {
    pub fn report(&self) -> &ChangeReport {
        &self.report
    }

    /// CRDs found in the product source tree
    pub fn source(&self) -> &CrdDirectory {
        &self.source
    }

    /// CRDs of the current bundle version
    pub fn current(&self) -> &CrdDirectory {
        &self.current
    }
}

/// What an upgrade produced
#[derive(Debug)]
pub struct UpgradeOutcome {
    pub report: ChangeReport,
    /// CRD files written into the new version directory, in CRD name order
    pub crd_files: Vec<PathBuf>,
    pub csv_name: String,
    pub csv_path: PathBuf,
    /// The rendered CSV document
    pub csv: Value,
    pub package_path: PathBuf,
}

/// Runs a bundle upgrade
///
/// [`Upgrader::plan`] only reads; [`Upgrader::apply`] writes the new
/// version. [`Upgrader::run`] does both.
pub struct Upgrader {
    options: UpgradeOptions,
    crd_store: YamlStore,
    csv_store: YamlStore,
}

impl Upgrader {
    pub fn new(options: UpgradeOptions) -> Self {
        Self {
            options,
            crd_store: YamlStore::default(),
            csv_store: YamlStore::new(csv::dump_options()),
        }
    }

    pub fn options(&self) -> &UpgradeOptions {
        &self.options
    }

    pub fn run(&self) -> Result<UpgradeOutcome> {
        let plan = self.plan()?;
        self.apply(plan)
    }

    /// Validate the inputs, index both CRD sets and compare them
    pub fn plan(&self) -> Result<UpgradePlan> {
        let opts = &self.options;
        let profile = &opts.profile;
        profile.validate()?;
        csv::validate_version(&opts.current_version)?;
        csv::validate_version(&opts.new_version)?;
        if opts.current_version == opts.new_version {
            return Err(CoreError::InvalidVersion {
                version: opts.new_version.clone(),
                reason: "must differ from the current version".to_string(),
            });
        }

        tracing::info!(
            "Upgrading {} bundle from {} to {}",
            profile.product,
            opts.current_version,
            opts.new_version
        );

        let source = CrdDirectory::scan(opts.crd_source_dir())?;
        let current = CrdDirectory::scan(opts.current_dir())?;
        let report = ChangeReport::between(&source, &current);

        let previous = ClusterServiceVersion::new(&opts.current_version, &current, profile)?;
        if !previous.path().is_file() {
            return Err(CoreError::MissingPreviousCsv {
                name: previous.name(),
                path: previous.path(),
            });
        }
        let description = profile.long_description(&opts.source_root)?;

        Ok(UpgradePlan {
            source,
            current,
            report,
            description,
        })
    }

    /// Write the new bundle version described by `plan`
    pub fn apply(&self, plan: UpgradePlan) -> Result<UpgradeOutcome> {
        let opts = &self.options;
        let profile = &opts.profile;
        let UpgradePlan {
            source,
            current,
            report,
            description,
        } = plan;

        let previous = ClusterServiceVersion::new(&opts.current_version, &current, profile)?;

        let new_dir = opts.new_dir();
        fs::create_dir_all(&new_dir).map_err(|e| CoreError::io(&new_dir, e))?;
        let crd_files = source
            .crds()
            .map(|crd| crd.write_to(&self.crd_store, &new_dir))
            .collect::<Result<Vec<_>>>()?;
        tracing::info!("Copied {} CRD(s) into {}", crd_files.len(), new_dir.display());

        let bundle = CrdDirectory::scan(&new_dir)?;
        let next = ClusterServiceVersion::new(&opts.new_version, &bundle, profile)?
            .with_previous(&previous)
            .with_description(description);

        let rendered = match opts.created_at {
            Some(at) => next.render_at(&self.csv_store, at)?,
            None => next.render(&self.csv_store)?,
        };
        let csv_path = next.write(&self.csv_store, &rendered)?;

        let package = PackageManifest::new(opts.package_path());
        package.set_current_csv(&self.crd_store, &profile.channel, &next.name())?;

        Ok(UpgradeOutcome {
            report,
            crd_files,
            csv_name: next.name(),
            csv_path,
            csv: rendered,
            package_path: package.path().to_path_buf(),
        })
    }
}
