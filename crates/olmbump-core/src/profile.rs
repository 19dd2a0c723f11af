//! Product profile
//!
//! Everything product-specific about a bundle upgrade: naming, image
//! repository, where CRDs live in the source tree, and the static catalog
//! metadata written into every ClusterServiceVersion.
//!
//! The built-in profile describes Crossplane. A YAML file can override any
//! subset of fields:
//!
//! ```yaml
//! product: crossplane
//! imageRepository: crossplane/crossplane
//! descriptionSource:
//!   type: readme
//!   path: docs/README.md
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::document;
use crate::error::{CoreError, Result};

/// Long-form CSV description shipped with the tool
pub const STATIC_DESCRIPTION: &str = include_str!("assets/description.md");

/// Where the CSV long-form description comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DescriptionSource {
    /// The embedded [`STATIC_DESCRIPTION`]
    Static,
    /// A file relative to the source product root
    Readme { path: PathBuf },
}

/// A named link shown in the operator catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub name: String,
    pub url: String,
}

impl Link {
    fn new(name: &str, url: &str) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Profile {
    /// Product name; prefixes CSV names and names the deployments
    pub product: String,

    /// Container image repository, tagged with `v<version>`
    pub image_repository: String,

    /// CRD directory relative to the source product root
    pub crd_subdir: PathBuf,

    /// Package manifest file relative to the bundle root
    pub package_file: PathBuf,

    /// Channel recorded in the package manifest
    pub channel: String,

    /// Provider name
    pub provider: String,

    /// Short description annotation
    pub description_annotation: String,

    pub description_source: DescriptionSource,

    pub keywords: Vec<String>,

    pub links: Vec<Link>,
}

impl Default for Profile {
    fn default() -> Self {
        let keywords = [
            "cloud",
            "infrastructure",
            "services",
            "application",
            "database",
            "cache",
            "bucket",
            "infra",
            "app",
            "ops",
            "oam",
            "gcp",
            "azure",
            "aws",
            "alibaba",
            "cloudsql",
            "rds",
            "s3",
            "azuredatabase",
            "asparadb",
            "gke",
            "aks",
            "eks",
        ];

        Self {
            product: "crossplane".to_string(),
            image_repository: "crossplane/crossplane".to_string(),
            crd_subdir: PathBuf::from("cluster/charts/crossplane-types/crds"),
            package_file: PathBuf::from("crossplane.package.yaml"),
            channel: "alpha".to_string(),
            provider: "Upbound".to_string(),
            description_annotation:
                "Manage any infrastructure your applications need directly from Kubernetes."
                    .to_string(),
            description_source: DescriptionSource::Static,
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            links: vec![
                Link::new("GitHub", "https://github.com/crossplane/crossplane"),
                Link::new("Website", "https://crossplane.io"),
                Link::new("Twitter", "https://twitter.com/crossplane_io"),
                Link::new("Slack", "https://slack.crossplane.io/"),
            ],
        }
    }
}

impl Profile {
    /// Load a profile file; absent fields keep their built-in values
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = document::read_file(path)?;
        let profile: Self = serde_yaml::from_str(&content).map_err(|source| CoreError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        profile.validate()?;
        Ok(profile)
    }

    pub fn validate(&self) -> Result<()> {
        if self.product.trim().is_empty() {
            return Err(CoreError::InvalidProfile {
                message: "product must not be empty".to_string(),
            });
        }
        if self.image_repository.trim().is_empty() {
            return Err(CoreError::InvalidProfile {
                message: "imageRepository must not be empty".to_string(),
            });
        }
        if self.channel.trim().is_empty() {
            return Err(CoreError::InvalidProfile {
                message: "channel must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// `<product>.v<version>`
    pub fn csv_name(&self, version: &str) -> String {
        format!("{}.v{}", self.product, version)
    }

    /// `<image_repository>:v<version>`
    pub fn image(&self, version: &str) -> String {
        format!("{}:v{}", self.image_repository, version)
    }

    /// Name of the main operator deployment and its service account
    pub fn operator_deployment(&self) -> &str {
        &self.product
    }

    /// Name of the package manager deployment and its service account
    pub fn package_manager_deployment(&self) -> String {
        format!("{}-package-manager", self.product)
    }

    /// Resolve the long-form description for a source tree
    pub fn long_description(&self, source_root: &Path) -> Result<String> {
        match &self.description_source {
            DescriptionSource::Static => Ok(STATIC_DESCRIPTION.to_string()),
            DescriptionSource::Readme { path } => document::read_file(&source_root.join(path)),
        }
    }
}
