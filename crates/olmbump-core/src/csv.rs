//! ClusterServiceVersion rendering
//!
//! A new CSV is never written from scratch. It starts as a copy of the
//! previous release's CSV and has a fixed set of fields replaced:
//!
//! | field                                         | new value                        |
//! |-----------------------------------------------|----------------------------------|
//! | `metadata.name`                               | `<product>.v<version>`           |
//! | `metadata.annotations.containerImage`         | `<image>:v<version>`             |
//! | `metadata.annotations.createdAt`              | render time, RFC 3339 UTC        |
//! | `metadata.annotations.description`            | profile annotation               |
//! | `spec.description`                            | long-form text, literal block    |
//! | `spec.version`                                | `<version>`                      |
//! | `spec.customresourcedefinitions.owned`        | one entry per bundled CRD        |
//! | `spec.install.spec.deployments[*]` images     | `<image>:v<version>`             |
//! | `spec.keywords`, `spec.links`, `spec.provider`| profile values                   |
//! | `spec.install.spec.clusterPermissions`        | fixed policy, CRD groups merged  |
//! | `spec.replaces`                               | previous CSV name                |
//!
//! Everything else in the previous document is carried over untouched.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_yaml::Value;
use std::path::PathBuf;

use crate::directory::CrdDirectory;
use crate::document::{self, DumpOptions, YamlStore};
use crate::error::{CoreError, Result};
use crate::profile::{Profile, STATIC_DESCRIPTION};

/// Environment variable carrying the package manager's own image
pub const PACKAGE_MANAGER_IMAGE_ENV: &str = "PACKAGE_MANAGER_IMAGE";

const DESCRIPTION_PATH: [&str; 2] = ["spec", "description"];

/// Serializer settings for CSV documents
pub fn dump_options() -> DumpOptions {
    DumpOptions::new().literal(&DESCRIPTION_PATH)
}

/// Check that a version string can be used to name a CSV
///
/// The `v` prefix is added by the naming scheme, so it must not be part of
/// the version itself.
pub fn validate_version(version: &str) -> Result<()> {
    if version.is_empty() {
        return Err(CoreError::InvalidVersion {
            version: version.to_string(),
            reason: "version must not be empty".to_string(),
        });
    }
    if version.starts_with('v') {
        return Err(CoreError::InvalidVersion {
            version: version.to_string(),
            reason: "version should not start with 'v'".to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OwnedCrd<'a> {
    description: &'a str,
    display_name: &'a str,
    kind: &'a str,
    name: &'a str,
    version: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PolicyRule {
    api_groups: Vec<String>,
    verbs: Vec<String>,
    resources: Vec<String>,
}

impl PolicyRule {
    fn new(api_groups: Vec<String>, verbs: &[&str], resources: &[&str]) -> Self {
        Self {
            api_groups,
            verbs: verbs.iter().map(|v| v.to_string()).collect(),
            resources: resources.iter().map(|r| r.to_string()).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClusterPermission {
    rules: Vec<PolicyRule>,
    service_account_name: String,
}

#[derive(Debug, Serialize)]
struct Provider<'a> {
    name: &'a str,
}

/// One version of the operator's ClusterServiceVersion
#[derive(Debug, Clone)]
pub struct ClusterServiceVersion<'a> {
    version: String,
    bundle: &'a CrdDirectory,
    profile: &'a Profile,
    previous: Option<&'a ClusterServiceVersion<'a>>,
    description: Option<String>,
}

impl<'a> ClusterServiceVersion<'a> {
    /// A CSV for `version`, owning the CRDs in `bundle`
    ///
    /// Fails if `version` starts with `v`.
    pub fn new(version: &str, bundle: &'a CrdDirectory, profile: &'a Profile) -> Result<Self> {
        validate_version(version)?;
        Ok(Self {
            version: version.to_string(),
            bundle,
            profile,
            previous: None,
            description: None,
        })
    }

    /// Derive this CSV from `previous` when rendering
    pub fn with_previous(mut self, previous: &'a ClusterServiceVersion<'a>) -> Self {
        self.previous = Some(previous);
        self
    }

    /// Long-form description; defaults to the embedded text
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn v_version(&self) -> String {
        format!("v{}", self.version)
    }

    /// `<product>.v<version>`
    pub fn name(&self) -> String {
        self.profile.csv_name(&self.version)
    }

    pub fn image(&self) -> String {
        self.profile.image(&self.version)
    }

    pub fn filename(&self) -> String {
        format!("{}.clusterserviceversion.yaml", self.name())
    }

    /// Location of this CSV inside its bundle directory
    pub fn path(&self) -> PathBuf {
        self.bundle.path().join(self.filename())
    }

    pub fn bundle(&self) -> &CrdDirectory {
        self.bundle
    }

    /// Load this CSV's document from its bundle directory
    pub fn read_document(&self, store: &YamlStore) -> Result<Value> {
        let path = self.path();
        if !path.is_file() {
            return Err(CoreError::MissingPreviousCsv {
                name: self.name(),
                path,
            });
        }
        store.load(&path)
    }

    /// Render with the current time as creation timestamp
    pub fn render(&self, store: &YamlStore) -> Result<Value> {
        self.render_at(store, Utc::now())
    }

    /// Render from the previous CSV's document
    pub fn render_at(&self, store: &YamlStore, created_at: DateTime<Utc>) -> Result<Value> {
        let previous = self.previous.ok_or_else(|| CoreError::NoPreviousCsv {
            name: self.name(),
        })?;

        tracing::info!("Rendering {} from {}", self.name(), previous.name());
        let mut doc = previous.read_document(store)?;
        let image = self.image();

        document::set(&mut doc, &["metadata", "name"], Value::from(self.name()))?;
        self.set_annotation(&mut doc, "containerImage", image.clone())?;
        self.set_annotation(
            &mut doc,
            "createdAt",
            created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        )?;
        let description = self.description.as_deref().unwrap_or(STATIC_DESCRIPTION);
        document::set(&mut doc, &DESCRIPTION_PATH, Value::from(description))?;
        self.set_annotation(
            &mut doc,
            "description",
            self.profile.description_annotation.clone(),
        )?;
        document::set(&mut doc, &["spec", "version"], Value::from(self.version.as_str()))?;
        self.update_owned_crds(&mut doc)?;
        self.update_deployments(&mut doc, &image)?;
        document::set(
            &mut doc,
            &["spec", "keywords"],
            serde_yaml::to_value(&self.profile.keywords)?,
        )?;
        document::set(
            &mut doc,
            &["spec", "links"],
            serde_yaml::to_value(&self.profile.links)?,
        )?;
        document::set(
            &mut doc,
            &["spec", "provider"],
            serde_yaml::to_value(Provider {
                name: &self.profile.provider,
            })?,
        )?;
        self.update_cluster_permissions(&mut doc)?;
        document::set(&mut doc, &["spec", "replaces"], Value::from(previous.name()))?;

        Ok(doc)
    }

    /// Write a rendered document to [`ClusterServiceVersion::path`]
    pub fn write(&self, store: &YamlStore, doc: &Value) -> Result<PathBuf> {
        let path = self.path();
        store.dump(doc, &path)?;
        tracing::debug!("Wrote {}", path.display());
        Ok(path)
    }

    fn set_annotation(&self, doc: &mut Value, key: &str, value: String) -> Result<()> {
        document::set(doc, &["metadata", "annotations", key], Value::from(value))
    }

    fn update_owned_crds(&self, doc: &mut Value) -> Result<()> {
        let owned = self
            .bundle
            .crds()
            .map(|crd| -> Result<OwnedCrd<'_>> {
                let kind = crd.kind()?;
                Ok(OwnedCrd {
                    description: crd.description()?,
                    display_name: kind,
                    kind,
                    name: crd.name()?,
                    version: crd.version()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        document::set(
            doc,
            &["spec", "customresourcedefinitions", "owned"],
            serde_yaml::to_value(owned)?,
        )
    }

    fn update_deployments(&self, doc: &mut Value, image: &str) -> Result<()> {
        let field = "spec.install.spec.deployments";
        let deployments = document::get_mut(doc, &["spec", "install", "spec", "deployments"])
            .ok_or_else(|| CoreError::missing(self.name(), field))?
            .as_sequence_mut()
            .ok_or_else(|| CoreError::field_type(field, "sequence"))?;

        let operator = self.profile.operator_deployment();
        let package_manager = self.profile.package_manager_deployment();

        for deployment in deployments.iter_mut() {
            let name = deployment
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let is_package_manager = if name == operator {
                false
            } else if name == package_manager {
                true
            } else {
                return Err(CoreError::UnrecognizedDeployment { name });
            };

            let container = first_container(deployment)
                .ok_or_else(|| CoreError::missing(&name, "spec.template.spec.containers[0]"))?;
            document::set(container, &["image"], Value::from(image))?;

            if is_package_manager {
                set_env(container, PACKAGE_MANAGER_IMAGE_ENV, image)?;
            }
            tracing::debug!("Deployment {} now uses {}", name, image);
        }

        Ok(())
    }

    fn update_cluster_permissions(&self, doc: &mut Value) -> Result<()> {
        let groups = self.bundle.groups()?;
        let core = || vec![String::new()];

        let permissions = vec![
            ClusterPermission {
                rules: vec![
                    PolicyRule::new(core(), &["create", "update", "patch", "delete"], &["events"]),
                    PolicyRule::new(
                        core(),
                        &["get", "list", "watch", "create", "update"],
                        &["secrets"],
                    ),
                    PolicyRule::new(
                        vec!["apiextensions.k8s.io".to_string()],
                        &["get", "list", "watch", "create", "update"],
                        &["customresourcedefinitions"],
                    ),
                    PolicyRule::new(groups, &["*"], &["*"]),
                ],
                service_account_name: self.profile.operator_deployment().to_string(),
            },
            ClusterPermission {
                rules: vec![PolicyRule::new(vec!["*".to_string()], &["*"], &["*"])],
                service_account_name: self.profile.package_manager_deployment(),
            },
        ];

        document::set(
            doc,
            &["spec", "install", "spec", "clusterPermissions"],
            serde_yaml::to_value(permissions)?,
        )
    }
}

fn first_container(deployment: &mut Value) -> Option<&mut Value> {
    document::get_mut(deployment, &["spec", "template", "spec", "containers"])?
        .as_sequence_mut()?
        .first_mut()
}

fn set_env(container: &mut Value, name: &str, value: &str) -> Result<()> {
    let Some(env) = container.get_mut("env").and_then(Value::as_sequence_mut) else {
        return Ok(());
    };
    for var in env.iter_mut() {
        if var.get("name").and_then(Value::as_str) == Some(name) {
            document::set(var, &["value"], Value::from(value))?;
        }
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::crd::tests::crd_yaml;
    use chrono::TimeZone;
    use std::fs;
    use tempfile::TempDir;

    /// A trimmed-down CSV as published for 0.1.0
    pub(crate) fn previous_csv_yaml(product: &str) -> String {
        format!(
            "apiVersion: operators.coreos.com/v1alpha1
kind: ClusterServiceVersion
metadata:
  name: {product}.v0.1.0
  namespace: placeholder
  annotations:
    capabilities: Basic Install
    containerImage: {product}/{product}:v0.1.0
    createdAt: 2020-01-01T00:00:00Z
spec:
  displayName: Crossplane
  description: old description
  version: 0.1.0
  icon:
    - base64data: aWNvbg==
      mediatype: image/png
  customresourcedefinitions:
    owned: []
  install:
    strategy: deployment
    spec:
      deployments:
        - name: {product}
          spec:
            template:
              spec:
                containers:
                  - name: {product}
                    image: {product}/{product}:v0.1.0
        - name: {product}-package-manager
          spec:
            template:
              spec:
                containers:
                  - name: {product}
                    image: {product}/{product}:v0.1.0
                    env:
                      - name: POD_NAMESPACE
                        value: default
                      - name: PACKAGE_MANAGER_IMAGE
                        value: {product}/{product}:v0.1.0
      clusterPermissions: []
  keywords: []
"
        )
    }

    struct Fixture {
        _tmp: TempDir,
        previous: CrdDirectory,
        next: CrdDirectory,
    }

    fn fixture(previous_csv: &str, crds: &[(&str, &str, &str)]) -> Fixture {
        let tmp = TempDir::new().unwrap();
        let prev_dir = tmp.path().join("0.1.0");
        let next_dir = tmp.path().join("0.2.0");
        fs::create_dir_all(&prev_dir).unwrap();
        fs::create_dir_all(&next_dir).unwrap();

        fs::write(
            prev_dir.join("crossplane.v0.1.0.clusterserviceversion.yaml"),
            previous_csv,
        )
        .unwrap();
        for (name, group, kind) in crds {
            fs::write(
                next_dir.join(format!("{name}.yaml")),
                crd_yaml(name, group, kind, None),
            )
            .unwrap();
        }

        Fixture {
            previous: CrdDirectory::scan(&prev_dir).unwrap(),
            next: CrdDirectory::scan(&next_dir).unwrap(),
            _tmp: tmp,
        }
    }

    fn default_fixture() -> Fixture {
        fixture(
            &previous_csv_yaml("crossplane"),
            &[
                ("one.b.io", "b.io", "One"),
                ("two.a.io", "a.io", "Two"),
                ("three.a.io", "a.io", "Three"),
            ],
        )
    }

    fn store() -> YamlStore {
        YamlStore::new(dump_options())
    }

    fn strings(value: &Value) -> Vec<&str> {
        value
            .as_sequence()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect()
    }

    #[test]
    fn test_version_prefix_rejected() {
        let f = default_fixture();
        let profile = Profile::default();
        let err = ClusterServiceVersion::new("v1.0.0", &f.next, &profile).unwrap_err();
        assert!(matches!(err, CoreError::InvalidVersion { .. }));
        assert!(validate_version("").is_err());
        assert!(validate_version("1.0.0").is_ok());
    }

    #[test]
    fn test_naming() {
        let f = default_fixture();
        let profile = Profile::default();
        let csv = ClusterServiceVersion::new("0.2.0", &f.next, &profile).unwrap();

        assert_eq!(csv.v_version(), "v0.2.0");
        assert_eq!(csv.name(), "crossplane.v0.2.0");
        assert_eq!(csv.image(), "crossplane/crossplane:v0.2.0");
        assert_eq!(
            csv.path(),
            f.next.path().join("crossplane.v0.2.0.clusterserviceversion.yaml")
        );
    }

    #[test]
    fn test_render_core_fields() {
        let f = default_fixture();
        let profile = Profile::default();
        let prev = ClusterServiceVersion::new("0.1.0", &f.previous, &profile).unwrap();
        let csv = ClusterServiceVersion::new("0.2.0", &f.next, &profile)
            .unwrap()
            .with_previous(&prev);

        let created = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let doc = csv.render_at(&store(), created).unwrap();

        assert_eq!(document::get_str(&doc, &["metadata", "name"]).unwrap(), "crossplane.v0.2.0");
        assert_eq!(document::get_str(&doc, &["spec", "version"]).unwrap(), "0.2.0");
        assert_eq!(document::get_str(&doc, &["spec", "replaces"]).unwrap(), "crossplane.v0.1.0");
        assert_eq!(
            document::get_str(&doc, &["metadata", "annotations", "containerImage"]).unwrap(),
            "crossplane/crossplane:v0.2.0"
        );
        assert_eq!(
            document::get_str(&doc, &["metadata", "annotations", "createdAt"]).unwrap(),
            "2024-05-06T07:08:09Z"
        );
        assert_eq!(
            document::get_str(&doc, &["metadata", "annotations", "description"]).unwrap(),
            profile.description_annotation
        );
        assert_eq!(
            document::get_str(&doc, &["spec", "description"]).unwrap(),
            STATIC_DESCRIPTION
        );
        assert_eq!(
            document::get_str(&doc, &["spec", "provider", "name"]).unwrap(),
            "Upbound"
        );
        assert_eq!(
            strings(document::get(&doc, &["spec", "keywords"]).unwrap()).len(),
            profile.keywords.len()
        );
        let links = document::get(&doc, &["spec", "links"]).unwrap().as_sequence().unwrap();
        assert_eq!(links.len(), 4);
        assert_eq!(links[0].get("name").and_then(Value::as_str), Some("GitHub"));
    }

    #[test]
    fn test_render_keeps_unrelated_fields() {
        let f = default_fixture();
        let profile = Profile::default();
        let prev = ClusterServiceVersion::new("0.1.0", &f.previous, &profile).unwrap();
        let csv = ClusterServiceVersion::new("0.2.0", &f.next, &profile)
            .unwrap()
            .with_previous(&prev);

        let before = fs::read_to_string(prev.path()).unwrap();
        let doc = csv.render(&store()).unwrap();

        assert_eq!(
            document::get_str(&doc, &["metadata", "annotations", "capabilities"]).unwrap(),
            "Basic Install"
        );
        assert_eq!(document::get_str(&doc, &["spec", "displayName"]).unwrap(), "Crossplane");
        assert!(document::get(&doc, &["spec", "icon"]).is_some());
        assert_eq!(fs::read_to_string(prev.path()).unwrap(), before);
    }

    #[test]
    fn test_owned_crds_in_name_order() {
        let f = default_fixture();
        let profile = Profile::default();
        let prev = ClusterServiceVersion::new("0.1.0", &f.previous, &profile).unwrap();
        let csv = ClusterServiceVersion::new("0.2.0", &f.next, &profile)
            .unwrap()
            .with_previous(&prev);

        let doc = csv.render(&store()).unwrap();
        let owned = document::get(&doc, &["spec", "customresourcedefinitions", "owned"])
            .unwrap()
            .as_sequence()
            .unwrap();

        let names: Vec<&str> = owned
            .iter()
            .map(|o| o.get("name").and_then(Value::as_str).unwrap())
            .collect();
        assert_eq!(names, vec!["one.b.io", "three.a.io", "two.a.io"]);

        let first = &owned[0];
        assert_eq!(first.get("kind").and_then(Value::as_str), Some("One"));
        assert_eq!(first.get("displayName").and_then(Value::as_str), Some("One"));
        assert_eq!(first.get("version").and_then(Value::as_str), Some("v1alpha1"));
        assert_eq!(first.get("description").and_then(Value::as_str), Some("one.b.io"));
    }

    #[test]
    fn test_api_groups_sorted_and_unique() {
        let f = default_fixture();
        let profile = Profile::default();
        let prev = ClusterServiceVersion::new("0.1.0", &f.previous, &profile).unwrap();
        let csv = ClusterServiceVersion::new("0.2.0", &f.next, &profile)
            .unwrap()
            .with_previous(&prev);

        let doc = csv.render(&store()).unwrap();
        let permissions = document::get(&doc, &["spec", "install", "spec", "clusterPermissions"])
            .unwrap()
            .as_sequence()
            .unwrap();
        assert_eq!(permissions.len(), 2);

        let operator = &permissions[0];
        assert_eq!(
            operator.get("serviceAccountName").and_then(Value::as_str),
            Some("crossplane")
        );
        let rules = operator.get("rules").unwrap().as_sequence().unwrap();
        assert_eq!(rules.len(), 4);
        assert_eq!(strings(rules[0].get("apiGroups").unwrap()), vec![""]);
        assert_eq!(strings(rules[2].get("apiGroups").unwrap()), vec!["apiextensions.k8s.io"]);
        assert_eq!(strings(rules[3].get("apiGroups").unwrap()), vec!["a.io", "b.io"]);

        let package_manager = &permissions[1];
        assert_eq!(
            package_manager.get("serviceAccountName").and_then(Value::as_str),
            Some("crossplane-package-manager")
        );
    }

    #[test]
    fn test_deployment_images_updated() {
        let f = default_fixture();
        let profile = Profile::default();
        let prev = ClusterServiceVersion::new("0.1.0", &f.previous, &profile).unwrap();
        let csv = ClusterServiceVersion::new("0.2.0", &f.next, &profile)
            .unwrap()
            .with_previous(&prev);

        let doc = csv.render(&store()).unwrap();
        let deployments = document::get(&doc, &["spec", "install", "spec", "deployments"])
            .unwrap()
            .as_sequence()
            .unwrap();

        for deployment in deployments {
            let container = &document::get(deployment, &["spec", "template", "spec", "containers"])
                .unwrap()
                .as_sequence()
                .unwrap()[0];
            assert_eq!(
                container.get("image").and_then(Value::as_str),
                Some("crossplane/crossplane:v0.2.0")
            );
        }

        let env = document::get(&deployments[1], &["spec", "template", "spec", "containers"])
            .unwrap()[0]
            .get("env")
            .unwrap()
            .as_sequence()
            .unwrap();
        assert_eq!(env[0].get("value").and_then(Value::as_str), Some("default"));
        assert_eq!(
            env[1].get("value").and_then(Value::as_str),
            Some("crossplane/crossplane:v0.2.0")
        );
    }

    #[test]
    fn test_unrecognized_deployment() {
        let previous = previous_csv_yaml("crossplane").replace(
            "- name: crossplane-package-manager",
            "- name: crossplane-sidecar",
        );
        let f = fixture(&previous, &[("one.b.io", "b.io", "One")]);
        let profile = Profile::default();
        let prev = ClusterServiceVersion::new("0.1.0", &f.previous, &profile).unwrap();
        let csv = ClusterServiceVersion::new("0.2.0", &f.next, &profile)
            .unwrap()
            .with_previous(&prev);

        match csv.render(&store()).unwrap_err() {
            CoreError::UnrecognizedDeployment { name } => assert_eq!(name, "crossplane-sidecar"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_render_requires_previous() {
        let f = default_fixture();
        let profile = Profile::default();
        let csv = ClusterServiceVersion::new("0.2.0", &f.next, &profile).unwrap();
        assert!(matches!(
            csv.render(&store()),
            Err(CoreError::NoPreviousCsv { .. })
        ));
    }

    #[test]
    fn test_missing_previous_file() {
        let f = default_fixture();
        let profile = Profile::default();
        let prev = ClusterServiceVersion::new("0.0.9", &f.previous, &profile).unwrap();
        let csv = ClusterServiceVersion::new("0.2.0", &f.next, &profile)
            .unwrap()
            .with_previous(&prev);

        match csv.render(&store()).unwrap_err() {
            CoreError::MissingPreviousCsv { name, .. } => assert_eq!(name, "crossplane.v0.0.9"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_write_uses_literal_description() {
        let f = default_fixture();
        let profile = Profile::default();
        let prev = ClusterServiceVersion::new("0.1.0", &f.previous, &profile).unwrap();
        let csv = ClusterServiceVersion::new("0.2.0", &f.next, &profile)
            .unwrap()
            .with_previous(&prev)
            .with_description("# Custom\n\nBody text.\n");

        let doc = csv.render(&store()).unwrap();
        let path = csv.write(&store(), &doc).unwrap();
        assert_eq!(path, csv.path());

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("description: |"), "got:\n{written}");
        assert!(written.contains("    # Custom"));

        let reloaded = store().load(&path).unwrap();
        assert_eq!(
            document::get_str(&reloaded, &["spec", "description"]).unwrap(),
            "# Custom\n\nBody text.\n"
        );
    }
}
