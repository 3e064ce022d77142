use std::path::PathBuf;

use charm_archive::{
    fs::write_package_file,
    write::{CompressionLevel, WriteOptions},
    PackageDir, PackageSource,
};
use miette::{Context, IntoDiagnostic};

#[derive(Debug, clap::Parser)]
pub struct Opt {
    /// Path to the package directory
    #[clap(required = true)]
    directory: PathBuf,

    /// Path of the archive that is created
    #[clap(required = true)]
    output: PathBuf,

    /// Overrides the revision that is stored in the archive
    #[clap(long)]
    revision: Option<u64>,

    /// Compression level: `lowest`, `highest`, `default` or a number from 1 to 9
    #[clap(long, default_value = "default", value_parser = parse_compression_level)]
    compression_level: CompressionLevel,

    /// Store files without compression
    #[clap(long, conflicts_with = "compression_level")]
    stored: bool,
}

fn parse_compression_level(value: &str) -> Result<CompressionLevel, String> {
    match value {
        "lowest" => Ok(CompressionLevel::Lowest),
        "highest" => Ok(CompressionLevel::Highest),
        "default" => Ok(CompressionLevel::Default),
        number => match number.parse::<u32>() {
            Ok(level) if (1..=9).contains(&level) => Ok(CompressionLevel::Numeric(level)),
            _ => Err(format!(
                "expected `lowest`, `highest`, `default` or a number from 1 to 9, got `{number}`"
            )),
        },
    }
}

pub fn pack(opt: Opt) -> miette::Result<()> {
    let mut package = PackageDir::open(&opt.directory)
        .into_diagnostic()
        .with_context(|| format!("Failed to read package: {}", opt.directory.display()))?;
    if let Some(revision) = opt.revision {
        package.set_revision(revision);
    }

    let options = WriteOptions::default()
        .with_compression_level(opt.compression_level)
        .with_stored(opt.stored);

    println!(
        "Packing {} into {}",
        opt.directory.display(),
        opt.output.display()
    );

    write_package_file(&package, &opt.output, &options)
        .into_diagnostic()
        .with_context(|| format!("Failed to write package: {}", opt.output.display()))?;

    println!("{} Successfully packed package", console::style("✓").green());
    println!("  Name: {}", package.meta().name);
    println!("  Revision: {}", package.revision());
    println!("  Archive: {}", opt.output.display());

    Ok(())
}
