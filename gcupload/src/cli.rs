//! # gcupload CLI Interface
//!
//! Command parsing, the user-facing messages, and the exit contract. All upload logic
//! lives in [`gcupload_core`]; this module only gathers parameters and reports outcomes.
//!
//! - [`Cli`] defines the flags.
//! - [`run`] is the async entrypoint shared by `main()` and the integration tests.
use crate::load_config::resolve_invocation;
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use gcupload_core::Uploader;
use std::path::PathBuf;

pub const BANNER: &str = "gcupload - Uploads a file to a hosted project's download area.";

pub const USAGE: &str = "Usage: gcupload upload -u <username> -p <password> -n <project> -s <summary> -f <file> \
[-t <target-name>] [-l <label1>[,<label2>,...]] [--url <upload-url>] [--config <file.yaml>] [--quiet|-q]";

pub const SUCCESS_MESSAGE: &str = "File uploaded successfully.";

/// CLI for gcupload: upload one file to a project's downloads.
#[derive(Parser, Debug)]
#[clap(
    name = "gcupload",
    version,
    about = "Upload a file to a hosted project's download area over HTTPS"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload a single file with a summary and optional labels
    Upload(UploadArgs),
}

#[derive(Args, Debug, Default, Clone)]
pub struct UploadArgs {
    /// Account user name
    #[clap(short = 'u', long)]
    pub username: Option<String>,

    /// Upload password (the service-specific secret, not the account password).
    /// Falls back to GCUPLOAD_PASSWORD.
    #[clap(short = 'p', long)]
    pub password: Option<String>,

    /// Project whose upload URL is derived from its name
    #[clap(short = 'n', long)]
    pub project: Option<String>,

    /// Description of the file
    #[clap(short = 's', long)]
    pub summary: Option<String>,

    /// Path of the file to upload
    #[clap(short = 'f', long)]
    pub file: Option<PathBuf>,

    /// Name the file should have once uploaded (defaults to the file's own name)
    #[clap(short = 't', long)]
    pub target_name: Option<String>,

    /// Comma-separated labels, e.g. Featured,Type-Archive
    #[clap(short = 'l', long, value_delimiter = ',')]
    pub labels: Vec<String>,

    /// Explicit upload URL; takes precedence over --project
    #[clap(long)]
    pub url: Option<String>,

    /// Suppress the banner
    #[clap(short = 'q', long)]
    pub quiet: bool,

    /// Optional YAML file with defaults (no secrets)
    #[clap(long)]
    pub config: Option<PathBuf>,
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("upload command started");

    match cli.command {
        Commands::Upload(args) => {
            if !args.quiet {
                println!("{BANNER}");
                println!();
            }
            match upload(args).await {
                Ok(()) => {
                    println!("{SUCCESS_MESSAGE}");
                    tracing::info!(command = "upload", "Upload complete");
                    Ok(())
                }
                Err(e) => {
                    eprintln!("{USAGE}");
                    eprintln!();
                    eprintln!("{e}");
                    tracing::error!(command = "upload", error = %e, "Upload failed");
                    Err(e)
                }
            }
        }
    }
}

async fn upload(args: UploadArgs) -> Result<()> {
    let invocation = resolve_invocation(args)?;
    let uploader = Uploader::from_config(invocation.uploader)?;
    let uploaded = uploader.upload(invocation.request).await?;
    tracing::info!(
        url = %uploaded.url,
        target_name = %uploaded.target_name,
        location = uploaded.location.as_deref().unwrap_or(""),
        "Server accepted upload"
    );
    Ok(())
}
