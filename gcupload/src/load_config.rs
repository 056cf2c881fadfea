/// `load_config` module: merges command-line flags, an optional YAML file and environment
/// secrets into one upload request.
///
/// # Precedence
/// Command-line flag, then YAML file, then environment (`GCUPLOAD_USERNAME`). The password
/// is never read from YAML: it comes from `--password` or `GCUPLOAD_PASSWORD`, which may
/// live in a `.env` file.
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary. A missing file or
/// summary is reported before anything about credentials or destination.
use anyhow::Result;
use gcupload_core::{Credentials, Destination, UploadRequest, UploaderConfig};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

use crate::cli::UploadArgs;

pub const PASSWORD_ENV: &str = "GCUPLOAD_PASSWORD";
pub const USERNAME_ENV: &str = "GCUPLOAD_USERNAME";

/// Static, secret-free defaults read from YAML.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub username: Option<String>,
    pub project: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    pub upload_host: Option<String>,
    pub user_agent: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn uploader_config(&self) -> UploaderConfig {
        let defaults = UploaderConfig::default();
        UploaderConfig {
            upload_host: self.upload_host.clone().unwrap_or(defaults.upload_host),
            user_agent: self.user_agent.clone().unwrap_or(defaults.user_agent),
            timeout: self.timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Everything needed for one run of the upload command.
#[derive(Debug)]
pub struct Invocation {
    pub request: UploadRequest,
    pub uploader: UploaderConfig,
}

/// Loads a static YAML config file (no secrets).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<FileConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    match serde_yaml::from_str::<Option<FileConfig>>(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            Ok(conf.unwrap_or_default())
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML: {e}"))
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn env_secret(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => {
            info!(var = name, "Found value in environment");
            Some(value)
        }
        _ => None,
    }
}

/// Combines flags, the optional config file and the environment into an [`Invocation`].
pub fn resolve_invocation(args: UploadArgs) -> Result<Invocation> {
    if args.file.as_ref().map_or(true, |f| f.as_os_str().is_empty()) {
        error!("No source file supplied");
        anyhow::bail!("You must specify a file to upload");
    }
    if args.summary.as_deref().map_or(true, str::is_empty) {
        error!("No summary supplied");
        anyhow::bail!("You must specify a description of the file");
    }

    let file_config = match &args.config {
        Some(path) => load_config(path)?,
        None => FileConfig::default(),
    };

    let username = non_blank(args.username)
        .or_else(|| non_blank(file_config.username.clone()))
        .or_else(|| env_secret(USERNAME_ENV));
    let Some(username) = username else {
        error!("No username supplied");
        anyhow::bail!(
            "No username given: pass --username, set `username` in the config file, or set {USERNAME_ENV}"
        );
    };

    let Some(password) = non_blank(args.password).or_else(|| env_secret(PASSWORD_ENV)) else {
        error!("No password supplied");
        anyhow::bail!("No password given: pass --password or set {PASSWORD_ENV}");
    };

    let url = non_blank(args.url).or_else(|| non_blank(file_config.url.clone()));
    let project = non_blank(args.project).or_else(|| non_blank(file_config.project.clone()));
    let destination = Destination::from_parts(url.as_deref(), project.as_deref())?;

    let labels: Vec<String> = if args.labels.is_empty() {
        file_config.labels.clone()
    } else {
        args.labels
    }
    .into_iter()
    .map(|label| label.trim().to_string())
    .filter(|label| !label.is_empty())
    .collect();

    let mut request = UploadRequest::new(
        Credentials::new(username, password),
        destination,
        args.file.unwrap_or_else(PathBuf::new),
        args.summary.unwrap_or_default(),
    )
    .with_labels(labels);
    if let Some(target_name) = non_blank(args.target_name) {
        request = request.with_target_name(target_name);
    }

    let uploader = file_config.uploader_config();
    info!(
        destination = ?request.destination(),
        labels = request.labels().len(),
        upload_host = %uploader.upload_host,
        "Invocation resolved"
    );

    Ok(Invocation { request, uploader })
}
