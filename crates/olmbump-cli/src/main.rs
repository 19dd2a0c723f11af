//! olmbump CLI - upgrade an Operator Lifecycle Manager bundle to a new release

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod display;
mod error;
mod exit_codes;

#[derive(Parser)]
#[command(name = "olmbump")]
#[command(author = "olmbump Contributors")]
#[command(version)]
#[command(
    about = "Upgrade an operator bundle: diff CRDs, copy them and render the next ClusterServiceVersion",
    long_about = None
)]
struct Cli {
    /// Product source root (the CRD directory is found below it)
    source_root: PathBuf,

    /// Bundle root holding one directory per version
    bundle_root: PathBuf,

    /// Version currently published in the bundle (without 'v')
    current_version: String,

    /// Version to create (without 'v')
    new_version: String,

    /// Product profile overriding the built-in Crossplane settings
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Print the rendered ClusterServiceVersion
    #[arg(long)]
    show_csv: bool,

    /// Enable debug output
    #[arg(long)]
    debug: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = commands::upgrade::run(
        &cli.source_root,
        &cli.bundle_root,
        &cli.current_version,
        &cli.new_version,
        cli.profile.as_deref(),
        cli.show_csv,
    );

    if let Err(err) = result {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// Log to stderr; `RUST_LOG` takes precedence over `--debug`
fn init_tracing(debug: bool) {
    let default = if debug {
        "olmbump=debug,olmbump_core=debug"
    } else {
        "warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}
