#![doc = "gcupload-core: upload logic for gcupload."]

//! This crate builds and sends a single authenticated `multipart/form-data` upload
//! and interprets the reply. It performs no console I/O; presenting results is the
//! caller's job.
//!
//! # Usage
//! Build an [`UploadRequest`], then hand it to [`Uploader::upload`]. Tests swap the
//! HTTP stack through [`HttpTransport`].

pub mod config;
pub mod contract;
pub mod error;
pub mod error_page;
pub mod multipart;
pub mod request;
pub mod transport;
pub mod uploader;

pub use config::UploaderConfig;
pub use contract::{HttpReply, HttpTransport, UploadHttpRequest};
pub use error::{SourceFileChanged, TransportError, UploadError, UploadResult};
pub use error_page::{ErrorPageExtractor, HtmlErrorPage};
pub use multipart::{Boundary, MultipartBody, CHUNK_SIZE};
pub use request::{Credentials, Destination, UploadRequest};
pub use transport::ReqwestTransport;
pub use uploader::{Uploaded, Uploader};
