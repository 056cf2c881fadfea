//! # uploader: one file, one request, one outcome
//!
//! [`Uploader::upload`] walks a single request through
//! `Validating -> Sending -> AwaitingResponse` and ends in exactly one of:
//!
//! - `Ok(Uploaded)` for any 2xx reply, whatever its body says;
//! - [`UploadError::InvalidRequest`] / [`UploadError::SourceFile`] before anything is sent;
//! - [`UploadError::Transport`] when the exchange could not complete;
//! - [`UploadError::ServerRejected`] carrying the message scraped from the error page.
//!
//! Nothing is retried and no state survives the call.

use reqwest::Url;
use std::io;
use tracing::{debug, error, info, warn};

use crate::config::UploaderConfig;
use crate::contract::{HttpReply, HttpTransport, UploadHttpRequest};
use crate::error::{UploadError, UploadResult};
use crate::error_page::{ErrorPageExtractor, HtmlErrorPage};
use crate::multipart::{Boundary, MultipartBody};
use crate::request::{UploadRequest, ValidatedRequest};
use crate::transport::ReqwestTransport;

/// A successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Uploaded {
    pub url: Url,
    pub target_name: String,
    pub status: u16,
    /// Where the server says the uploaded file now lives, if it said.
    pub location: Option<String>,
}

pub struct Uploader<T, E = HtmlErrorPage> {
    transport: T,
    extractor: E,
    config: UploaderConfig,
}

impl Uploader<ReqwestTransport> {
    /// Uploader over the real HTTP stack.
    pub fn from_config(config: UploaderConfig) -> UploadResult<Self> {
        config.trace_loaded();
        let transport = ReqwestTransport::new(config.timeout)?;
        Ok(Uploader::new(transport, config))
    }
}

impl<T: HttpTransport> Uploader<T> {
    pub fn new(transport: T, config: UploaderConfig) -> Self {
        Self {
            transport,
            extractor: HtmlErrorPage,
            config,
        }
    }
}

impl<T: HttpTransport, E: ErrorPageExtractor> Uploader<T, E> {
    /// Swaps the error-page heuristic.
    pub fn with_extractor<E2: ErrorPageExtractor>(self, extractor: E2) -> Uploader<T, E2> {
        Uploader {
            transport: self.transport,
            extractor,
            config: self.config,
        }
    }

    /// Uploads the file described by `request`.
    pub async fn upload(&self, request: UploadRequest) -> UploadResult<Uploaded> {
        let validated = self.validate(&request)?;
        let mut texts: Vec<&str> = vec![&validated.summary, &validated.target_name];
        texts.extend(validated.labels.iter().map(String::as_str));
        let boundary = Boundary::generate_avoiding(&texts);
        self.send_validated(validated, boundary).await
    }

    /// Like [`upload`](Self::upload) with a caller-chosen boundary token.
    pub async fn upload_with_boundary(
        &self,
        request: UploadRequest,
        boundary: Boundary,
    ) -> UploadResult<Uploaded> {
        let validated = self.validate(&request)?;
        self.send_validated(validated, boundary).await
    }

    fn validate(&self, request: &UploadRequest) -> UploadResult<ValidatedRequest> {
        info!(
            username = request.credentials().username(),
            source_path = %request.source_path().display(),
            "Validating upload request"
        );
        request.validate(&self.config).map_err(|e| {
            error!(error = %e, "Upload request rejected before sending");
            e
        })
    }

    async fn send_validated(
        &self,
        validated: ValidatedRequest,
        boundary: Boundary,
    ) -> UploadResult<Uploaded> {
        let body = MultipartBody::open(&validated, boundary).await.map_err(|e| {
            error!(error = %e, "Could not open source file");
            e
        })?;

        let http_request = UploadHttpRequest {
            url: validated.url.clone(),
            authorization: validated.authorization.clone(),
            user_agent: self.config.user_agent.clone(),
            content_type: body.content_type(),
            content_length: body.content_length(),
            body: body.into_stream(),
        };

        info!(
            url = %validated.url,
            target_name = %validated.target_name,
            content_length = http_request.content_length,
            "Uploading file"
        );

        let reply = self.transport.send(http_request).await.map_err(|e| {
            error!(error = %e, url = %validated.url, "Upload transport failed");
            match e.source_file_changed().copied() {
                Some(changed) => UploadError::SourceFile {
                    path: validated.source_path.clone(),
                    source: io::Error::new(io::ErrorKind::UnexpectedEof, changed),
                },
                None => UploadError::from(e),
            }
        })?;

        info!(status = reply.status, "Upload response received");
        self.interpret(validated, reply)
    }

    fn interpret(&self, validated: ValidatedRequest, reply: HttpReply) -> UploadResult<Uploaded> {
        for (name, value) in &reply.headers {
            debug!(header = %name, value = %value, "Upload response header");
        }

        if reply.is_success() {
            debug!(body = %reply.body, "Upload response body");
            info!(
                status = reply.status,
                location = reply.location.as_deref().unwrap_or(""),
                "File uploaded successfully"
            );
            return Ok(Uploaded {
                url: validated.url,
                target_name: validated.target_name,
                status: reply.status,
                location: reply.location,
            });
        }

        let message = self
            .extractor
            .extract(&reply.body)
            .unwrap_or_else(|| generic_status_message(&reply));
        warn!(status = reply.status, message = %message, "Upload rejected by server");
        Err(UploadError::ServerRejected {
            status: reply.status,
            message,
        })
    }
}

fn generic_status_message(reply: &HttpReply) -> String {
    match reply.reason.as_deref() {
        Some(reason) => format!("Upload failed: HTTP {} {}", reply.status, reason),
        None => format!("Upload failed: HTTP {}", reply.status),
    }
}
