//! Upload request model and the validation that runs before any network I/O.

use crate::config::UploaderConfig;
use crate::error::{UploadError, UploadResult};
use base64::{engine::general_purpose, Engine as _};
use reqwest::Url;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Basic auth credentials. The password is the service-specific upload secret,
/// not the account password.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Value for the `Authorization` header: `Basic base64(username:password)`.
    pub fn basic_authorization(&self) -> String {
        let token =
            general_purpose::STANDARD.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Where the file goes: an explicit upload URL, or a project whose URL is derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Url(String),
    Project(String),
}

impl Destination {
    /// Picks a destination from optional inputs. An explicit URL takes precedence over a
    /// project name when both are present; blank values count as absent.
    pub fn from_parts(url: Option<&str>, project: Option<&str>) -> UploadResult<Self> {
        let url = url.map(str::trim).filter(|u| !u.is_empty());
        let project = project.map(str::trim).filter(|p| !p.is_empty());
        match (url, project) {
            (Some(url), _) => Ok(Destination::Url(url.to_string())),
            (None, Some(project)) => Ok(Destination::Project(project.to_string())),
            (None, None) => Err(UploadError::invalid(
                "You must supply either an upload url or a project name",
            )),
        }
    }

    /// Resolves to the concrete upload URL. Explicit URLs are used verbatim.
    pub fn resolve(&self, config: &UploaderConfig) -> UploadResult<Url> {
        let raw = match self {
            Destination::Url(url) => url.clone(),
            Destination::Project(project) if project.trim().is_empty() => {
                return Err(UploadError::invalid("Project name must not be empty"));
            }
            Destination::Project(project) => config.project_url(project),
        };
        let url = Url::parse(&raw)
            .map_err(|e| UploadError::invalid(format!("Invalid upload url {raw:?}: {e}")))?;
        match url.scheme() {
            "https" | "http" => Ok(url),
            other => Err(UploadError::invalid(format!(
                "Unsupported upload url scheme {other:?} in {raw:?}"
            ))),
        }
    }
}

/// One upload, constructed once per invocation and consumed by a single attempt.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    credentials: Credentials,
    destination: Destination,
    source_path: PathBuf,
    target_name: Option<String>,
    summary: String,
    labels: Vec<String>,
}

impl UploadRequest {
    pub fn new(
        credentials: Credentials,
        destination: Destination,
        source_path: impl Into<PathBuf>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            credentials,
            destination,
            source_path: source_path.into(),
            target_name: None,
            summary: summary.into(),
            labels: Vec::new(),
        }
    }

    /// Display name for the uploaded file. Defaults to the source file name.
    pub fn with_target_name(mut self, target_name: impl Into<String>) -> Self {
        self.target_name = Some(target_name.into());
        self
    }

    /// Labels are kept in the given order, duplicates included.
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    pub fn target_name(&self) -> Option<&str> {
        self.target_name.as_deref()
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Checks every precondition that does not touch the filesystem or network.
    pub fn validate(&self, config: &UploaderConfig) -> UploadResult<ValidatedRequest> {
        if self.source_path.as_os_str().is_empty() {
            return Err(UploadError::invalid("You must specify a file to upload"));
        }
        if self.summary.is_empty() {
            return Err(UploadError::invalid(
                "You must specify a description of the file",
            ));
        }

        let url = self.destination.resolve(config)?;

        let target_name = match self.target_name.as_deref().filter(|t| !t.is_empty()) {
            Some(name) => name.to_string(),
            None => default_target_name(&self.source_path)?,
        };

        debug!(%url, target_name = %target_name, labels = self.labels.len(), "Upload request validated");

        Ok(ValidatedRequest {
            url,
            authorization: self.credentials.basic_authorization(),
            source_path: self.source_path.clone(),
            target_name,
            summary: self.summary.clone(),
            labels: self.labels.clone(),
        })
    }
}

/// Final path segment of the source path.
fn default_target_name(source_path: &Path) -> UploadResult<String> {
    source_path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(|| {
            UploadError::invalid(format!(
                "Cannot derive a target name from {}",
                source_path.display()
            ))
        })
}

/// A request whose destination and target name are settled.
#[derive(Clone)]
pub struct ValidatedRequest {
    pub url: Url,
    pub authorization: String,
    pub source_path: PathBuf,
    pub target_name: String,
    pub summary: String,
    pub labels: Vec<String>,
}

impl fmt::Debug for ValidatedRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatedRequest")
            .field("url", &self.url.as_str())
            .field("authorization", &"<redacted>")
            .field("source_path", &self.source_path)
            .field("target_name", &self.target_name)
            .field("summary", &self.summary)
            .field("labels", &self.labels)
            .finish()
    }
}
