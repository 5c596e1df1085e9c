//! `install-pack`: install a modpack from a manifest, archive, mod-list or URL

mod reporter;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use modpack_installer::{
    InstallerConfig, IntoProgressCallback, Manifest, PackInstaller, SyncReport,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::reporter::ConsoleProgressReporter;

#[derive(Debug, Parser)]
#[command(name = "install-pack", version, about = "Install or update a modpack")]
struct Args {
    /// manifest.json, pack .zip, .ccip file, text mod-list, or pack URL
    input: String,

    /// Directory unpacked packs are placed under
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Resolve numeric project ids to slugs before downloading
    #[arg(long)]
    resolve_slugs: bool,

    /// Override the project host (e.g. a local mirror)
    #[arg(long)]
    base_url: Option<String>,

    /// More log output; repeat for trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = InstallerConfig::from_env().context("failed to load configuration")?;
    config.resolve_project_slugs |= args.resolve_slugs;
    if let Some(base_url) = &args.base_url {
        config.project_base_url = base_url.trim_end_matches('/').to_string();
    }
    debug!("Using project host {}", config.project_base_url);

    let installer = PackInstaller::new(config, &args.root)?
        .with_progress(ConsoleProgressReporter::new().into_callback());

    let outcome = installer
        .install(&args.input)
        .await
        .with_context(|| format!("failed to install modpack from '{}'", args.input))?;

    info!("Pack installed to {}", outcome.layout.game_dir().display());
    print_summary(&outcome.report);
    print_requirements(&outcome.manifest);
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn print_summary(report: &SyncReport) {
    println!();
    println!(
        "✅ Done: {} installed, {} skipped",
        report.installed_count, report.skipped_count
    );
    if report.superseded_count > 0 {
        println!("♻️  {} outdated files removed", report.superseded_count);
    }
}

fn print_requirements(manifest: &Manifest) {
    let requirements = manifest.requirements();
    println!();
    println!("Make sure your launcher profile uses:");
    println!("   - Minecraft {}", requirements.game_version);
    for loader in &requirements.loaders {
        println!("   - {}", loader.id);
        if let Some(page) = &loader.download_page {
            println!("     get it from {}", page);
        }
    }
}
