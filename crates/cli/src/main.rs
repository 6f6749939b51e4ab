use std::{
    path::{Path, PathBuf},
    process,
};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod manifest;
mod pay;
mod sheet;
mod watch;

use manifest::Manifest;

#[derive(Clone, Debug)]
pub struct Context {
    pub manifest: Manifest,
}

impl Context {
    pub fn new(manifest: Manifest) -> Self {
        Context { manifest }
    }
}

#[derive(Parser, Debug)]
#[clap(author, version, about = "OnePay - Charity payments from the terminal", long_about = None)]
struct Opts {
    /// Path to the OnePay.toml manifest file (default: ./OnePay.toml)
    #[arg(
        long = "manifest-path",
        short = 'm',
        global = true,
        default_value = "./OnePay.toml"
    )]
    manifest_path: PathBuf,

    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long = "verbose", short = 'v', global = true, default_value = "false")]
    verbose: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, PartialEq, Clone, Debug)]
enum Command {
    /// Request a payment intent and authorize it
    Pay(pay::PayCommand),
    /// Follow a balance document in the document store
    Watch(watch::WatchCommand),
}

#[tokio::main]
async fn main() {
    let opts: Opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => {
            let _ = e.print();
            process::exit(e.exit_code());
        }
    };

    init_tracing(opts.verbose);

    // Get the directory containing the manifest file
    let manifest_dir = opts
        .manifest_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .to_path_buf();

    load_env_file(&manifest_dir);

    let manifest = match Manifest::load_or_default(&opts.manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let ctx = Context::new(manifest);

    if let Err(e) = handle_command(opts, &ctx).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Load environment variables from .env file in the manifest directory
fn load_env_file(manifest_dir: &Path) {
    let env_file_path = manifest_dir.join(".env");

    match dotenvy::from_path(&env_file_path) {
        Ok(_) => {
            tracing::debug!("Loaded environment from {}", env_file_path.display());
        }
        Err(e) if e.not_found() => {}
        Err(e) => {
            eprintln!(
                "Warning: Failed to load .env file at {}: {}",
                env_file_path.display(),
                e
            );
        }
    }
}

async fn handle_command(opts: Opts, ctx: &Context) -> Result<(), String> {
    match opts.command {
        Command::Pay(cmd) => cmd.execute(ctx).await,
        Command::Watch(cmd) => cmd.execute(ctx).await,
    }
}
