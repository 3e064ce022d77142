use std::collections::BTreeSet;
use std::path::PathBuf;

use charm_archive::{fs::read_package, Manifest};
use itertools::Itertools;
use miette::{Context, IntoDiagnostic};
use serde::Serialize;

#[derive(Debug, clap::Parser)]
pub struct Opt {
    /// Path to a package directory or archive
    #[clap(required = true)]
    path: PathBuf,

    /// Print the result as JSON
    #[clap(long)]
    json: bool,
}

#[derive(Serialize)]
struct Inspection<'a> {
    name: &'a str,
    summary: &'a str,
    revision: u64,
    hooks: BTreeSet<String>,
    config_options: Vec<&'a str>,
    actions: Vec<&'a str>,
    manifest: Manifest,
}

pub fn inspect(opt: Opt) -> miette::Result<()> {
    let package = read_package(&opt.path)
        .into_diagnostic()
        .with_context(|| format!("Failed to read package: {}", opt.path.display()))?;
    let manifest = package
        .manifest()
        .into_diagnostic()
        .context("Failed to compute the package manifest")?;

    let inspection = Inspection {
        name: &package.meta().name,
        summary: &package.meta().summary,
        revision: package.revision(),
        hooks: package.meta().hooks(),
        config_options: package.config().options.keys().map(String::as_str).collect(),
        actions: package
            .actions()
            .action_specs
            .keys()
            .map(String::as_str)
            .collect(),
        manifest,
    };

    if opt.json {
        let json = serde_json::to_string_pretty(&inspection).into_diagnostic()?;
        println!("{json}");
        return Ok(());
    }

    println!(
        "{} {}",
        console::style(inspection.name).bold(),
        console::style(format!("(revision {})", inspection.revision)).dim()
    );
    if !inspection.summary.is_empty() {
        println!("  {}", inspection.summary);
    }
    println!("  Hooks: {}", inspection.hooks.iter().join(", "));
    println!("  Config options: {}", list_or_none(&inspection.config_options));
    println!("  Actions: {}", list_or_none(&inspection.actions));
    println!("  Manifest ({} paths):", inspection.manifest.len());
    for path in inspection.manifest.iter() {
        println!("    {path}");
    }

    Ok(())
}

fn list_or_none(items: &[&str]) -> String {
    if items.is_empty() {
        String::from("none")
    } else {
        items.iter().join(", ")
    }
}
