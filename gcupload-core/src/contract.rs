#![allow(unused)]

//! # contract: the seam between upload logic and the HTTP stack
//!
//! The [`Uploader`](crate::uploader::Uploader) builds a complete [`UploadHttpRequest`] and
//! hands it to an [`HttpTransport`]. The transport performs exactly one exchange and reports
//! either the server's reply (whatever its status) or a [`TransportError`].
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall`, so tests can assert that invalid requests never
//!   reach the network.
//! - Tests that need to inspect the body implement the trait directly and drain the stream.

use async_trait::async_trait;
use mockall::{automock, predicate::*};
use reqwest::Url;
use std::fmt;

use crate::error::TransportError;
use crate::multipart::BodyStream;

/// A fully assembled upload request, ready for the wire.
pub struct UploadHttpRequest {
    pub url: Url,
    /// `Basic <base64(user:pass)>`.
    pub authorization: String,
    pub user_agent: String,
    /// `multipart/form-data; boundary=...`.
    pub content_type: String,
    pub content_length: u64,
    pub body: BodyStream,
}

impl fmt::Debug for UploadHttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadHttpRequest")
            .field("url", &self.url.as_str())
            .field("authorization", &"<redacted>")
            .field("user_agent", &self.user_agent)
            .field("content_type", &self.content_type)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

/// What came back from the server, success or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    /// Canonical reason phrase for the status, if known.
    pub reason: Option<String>,
    /// `Location` header, which the upload host sets to the new file's page.
    pub location: Option<String>,
    /// Response headers in arrival order, for logging.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs one HTTP exchange. Implementations must not retry.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: UploadHttpRequest) -> Result<HttpReply, TransportError>;
}
