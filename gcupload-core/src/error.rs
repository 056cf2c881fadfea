use std::path::PathBuf;
use thiserror::Error;

/// Boxed cause of a failed HTTP exchange, as produced by an [`HttpTransport`].
///
/// [`HttpTransport`]: crate::contract::HttpTransport
#[derive(Error, Debug)]
#[error("{0}")]
pub struct TransportError(#[source] pub Box<dyn std::error::Error + Send + Sync>);

impl TransportError {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self(err.into())
    }

    /// The size mismatch behind this failure, if the source file changed mid-upload.
    pub(crate) fn source_file_changed(&self) -> Option<&SourceFileChanged> {
        let mut cause: Option<&(dyn std::error::Error + 'static)> = Some(self.0.as_ref());
        while let Some(err) = cause {
            if let Some(changed) = err.downcast_ref::<SourceFileChanged>() {
                return Some(changed);
            }
            // io::Error::source skips its payload, so look inside explicitly.
            if let Some(changed) = err
                .downcast_ref::<std::io::Error>()
                .and_then(|io| io.get_ref())
                .and_then(|inner| inner.downcast_ref::<SourceFileChanged>())
            {
                return Some(changed);
            }
            cause = err.source();
        }
        None
    }
}

/// The source file no longer matches the length announced in `Content-Length`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("source file changed size during upload: expected {expected} bytes, read {read}")]
pub struct SourceFileChanged {
    pub expected: u64,
    pub read: u64,
}

/// Every way an upload can fail. All variants are terminal; nothing is retried.
#[derive(Error, Debug)]
pub enum UploadError {
    /// The caller supplied insufficient or unusable parameters. Never sent over the wire.
    #[error("Invalid upload request: {0}")]
    InvalidRequest(String),

    /// The source file could not be opened or inspected. Never sent over the wire.
    #[error("Cannot read source file {}: {source}", .path.display())]
    SourceFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The HTTP exchange could not be completed (DNS, connect, TLS, timeout, body I/O).
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The server answered with a non-success status.
    #[error("{message}")]
    ServerRejected { status: u16, message: String },
}

impl UploadError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}

pub type UploadResult<T> = Result<T, UploadError>;
