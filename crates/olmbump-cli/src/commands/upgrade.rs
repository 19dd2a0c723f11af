//! Upgrade command - bump a bundle to a new operator version

use olmbump_core::{Profile, UpgradeOptions, Upgrader, YamlStore, csv};
use std::path::Path;

use crate::display;
use crate::error::Result;

/// Run the upgrade command
pub fn run(
    source_root: &Path,
    bundle_root: &Path,
    current_version: &str,
    new_version: &str,
    profile_path: Option<&Path>,
    show_csv: bool,
) -> Result<()> {
    let profile = match profile_path {
        Some(path) => {
            tracing::debug!("Loading profile {}", path.display());
            Profile::load_from(path)?
        }
        None => Profile::default(),
    };

    let options = UpgradeOptions::new(source_root, bundle_root, current_version, new_version)
        .with_profile(profile);
    let upgrader = Upgrader::new(options);
    let plan = upgrader.plan()?;

    // Printed before the new version directory is touched
    display::print_change_report(plan.report());

    let outcome = upgrader.apply(plan)?;

    if show_csv {
        let rendered = YamlStore::new(csv::dump_options()).serialize(&outcome.csv)?;
        println!();
        println!("{}", rendered);
    }

    display::print_outcome(&outcome, bundle_root);
    Ok(())
}
