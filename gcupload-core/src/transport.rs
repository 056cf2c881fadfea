use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION, USER_AGENT};
use reqwest::{Body, Client};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::contract::{HttpReply, HttpTransport, UploadHttpRequest};
use crate::error::TransportError;

/// Production transport backed by `reqwest` with platform-default TLS (rustls).
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Option<Duration>) -> Result<Self, TransportError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(TransportError::new)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: UploadHttpRequest) -> Result<HttpReply, TransportError> {
        info!(url = %request.url, content_length = request.content_length, "Sending upload request");

        let response = self
            .client
            .post(request.url)
            .header(AUTHORIZATION, request.authorization)
            .header(USER_AGENT, request.user_agent)
            .header(CONTENT_TYPE, request.content_type)
            .header(CONTENT_LENGTH, request.content_length)
            .body(Body::wrap_stream(request.body))
            .send()
            .await
            .map_err(TransportError::new)?;

        let status = response.status();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        // A 2xx means the file is stored; the body is informational only.
        let body = if status.is_success() {
            response.text().await.unwrap_or_else(|e| {
                warn!(error = %e, status = status.as_u16(), "Could not read success response body");
                String::new()
            })
        } else {
            response.text().await.map_err(TransportError::new)?
        };
        debug!(status = status.as_u16(), body_len = body.len(), "Upload response received");

        Ok(HttpReply {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            location,
            headers,
            body,
        })
    }
}
