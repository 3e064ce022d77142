use std::path::PathBuf;

use charm_archive::{PackageArchive, PackageSource};
use miette::{Context, IntoDiagnostic};

#[derive(Debug, clap::Parser)]
pub struct Opt {
    /// Path to the package archive
    #[clap(required = true)]
    archive: PathBuf,

    /// Destination directory where the package will be expanded
    #[clap(required = true)]
    destination: PathBuf,

    /// Overrides the revision that is written to the expanded package
    #[clap(long)]
    revision: Option<u64>,
}

pub fn expand(opt: Opt) -> miette::Result<()> {
    let mut archive = PackageArchive::open(&opt.archive)
        .into_diagnostic()
        .with_context(|| format!("Failed to read package: {}", opt.archive.display()))?;
    if let Some(revision) = opt.revision {
        archive.set_revision(revision);
    }

    println!(
        "Expanding {} to {}",
        opt.archive.display(),
        opt.destination.display()
    );

    archive
        .expand_to(&opt.destination)
        .into_diagnostic()
        .with_context(|| format!("Failed to expand package: {}", opt.archive.display()))?;

    println!(
        "{} Successfully expanded package",
        console::style("✓").green(),
    );
    println!("  Name: {}", archive.meta().name);
    println!("  Revision: {}", archive.revision());
    println!("  Destination: {}", opt.destination.display());

    Ok(())
}
