use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::{filter::LevelFilter, util::SubscriberInitExt, EnvFilter};

mod commands;

/// Charm package CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log debug information about every entry that is processed
    #[clap(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Show the metadata and manifest of a package directory or archive
    Inspect(commands::inspect::Opt),

    /// Expand a package archive into a directory
    Expand(commands::expand::Opt),

    /// Serialize a package directory into an archive
    Pack(commands::pack::Opt),
}

/// Entry point of the `charm` cli.
fn main() -> miette::Result<()> {
    // Parse the command line arguments
    let cli = Cli::parse();

    // Setup default logging level
    let default_filter = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let env_filter = EnvFilter::builder()
        .with_default_directive(default_filter.into())
        .from_env()
        .into_diagnostic()?;

    // Setup the tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .without_time()
        .finish()
        .try_init()
        .into_diagnostic()?;

    // Dispatch the selected command
    match cli.command {
        Commands::Inspect(opt) => commands::inspect::inspect(opt),
        Commands::Expand(opt) => commands::expand::expand(opt),
        Commands::Pack(opt) => commands::pack::pack(opt),
    }
}
