use std::time::Duration;
use tracing::{debug, info};

/// Host whose per-project subdomains accept uploads at `/files`.
pub const DEFAULT_UPLOAD_HOST: &str = "googlecode.com";

/// Identifying user agent sent with every upload.
pub const DEFAULT_USER_AGENT: &str = concat!("gcupload/", env!("CARGO_PKG_VERSION"));

/// Settings that shape how requests are addressed and sent, independent of any single upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploaderConfig {
    pub upload_host: String,
    pub user_agent: String,
    /// Overall request timeout. `None` leaves the transport default in place.
    pub timeout: Option<Duration>,
}

impl Default for UploaderConfig {
    fn default() -> Self {
        Self {
            upload_host: DEFAULT_UPLOAD_HOST.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: None,
        }
    }
}

impl UploaderConfig {
    /// Upload URL for a project, following the host's per-project subdomain convention.
    pub fn project_url(&self, project: &str) -> String {
        format!("https://{}.{}/files", project, self.upload_host)
    }

    pub fn trace_loaded(&self) {
        info!(
            upload_host = %self.upload_host,
            user_agent = %self.user_agent,
            timeout_secs = self.timeout.map(|t| t.as_secs()),
            "Loaded UploaderConfig"
        );
        debug!(?self, "UploaderConfig loaded (full debug)");
    }
}
