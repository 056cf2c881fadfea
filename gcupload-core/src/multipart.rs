//! Hand-built `multipart/form-data` body.
//!
//! Layout, every line CRLF terminated:
//!
//! ```text
//! --<boundary>
//! Content-Disposition: form-data; name="summary"
//!
//! <summary>
//! --<boundary>                                    (once per label)
//! Content-Disposition: form-data; name="label"
//!
//! <label>
//! --<boundary>
//! Content-Disposition: form-data; name="filename"; filename="<target name>"
//! Content-Type: application/octet-stream
//!
//! <file bytes, streamed>
//! --<boundary>--
//! ```

use crate::error::{SourceFileChanged, UploadError, UploadResult};
use crate::request::ValidatedRequest;
use bytes::{BufMut, Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::borrow::Cow;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::AsyncReadExt;
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

/// Bytes read from the source file per chunk. Bounds upload memory regardless of file size.
pub const CHUNK_SIZE: usize = 4096;

const CRLF: &str = "\r\n";

/// Stream of body chunks as handed to the transport.
pub type BodyStream = BoxStream<'static, io::Result<Bytes>>;

/// Delimiter between body parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary(String);

impl Boundary {
    /// Random token that does not occur in any of the given texts. File content is not
    /// scanned; 122 random bits make a collision there vanishingly unlikely.
    pub fn generate_avoiding(texts: &[&str]) -> Self {
        loop {
            let token = format!("gcupload-{}", Uuid::new_v4().simple());
            if !texts.iter().any(|text| text.contains(&token)) {
                return Boundary(token);
            }
        }
    }

    /// A caller-chosen token, mainly for reproducible output in tests.
    pub fn fixed(token: impl Into<String>) -> Self {
        Boundary(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A multipart body whose file part is still on disk.
#[derive(Debug)]
pub struct MultipartBody {
    boundary: Boundary,
    prelude: Bytes,
    file: File,
    file_len: u64,
    epilogue: Bytes,
}

impl MultipartBody {
    /// Opens the source file and encodes the text parts around it.
    pub async fn open(request: &ValidatedRequest, boundary: Boundary) -> UploadResult<Self> {
        let source_error = |source: io::Error| UploadError::SourceFile {
            path: request.source_path.clone(),
            source,
        };

        let file = File::open(&request.source_path).await.map_err(source_error)?;
        let metadata = file.metadata().await.map_err(source_error)?;
        if !metadata.is_file() {
            return Err(source_error(io::Error::new(
                io::ErrorKind::InvalidInput,
                "not a regular file",
            )));
        }

        let prelude = encode_prelude(
            &boundary,
            &request.summary,
            &request.labels,
            &request.target_name,
        );
        let epilogue = encode_epilogue(&boundary);

        debug!(
            path = %request.source_path.display(),
            file_len = metadata.len(),
            prelude_len = prelude.len(),
            "Multipart body prepared"
        );

        Ok(MultipartBody {
            boundary,
            prelude,
            file,
            file_len: metadata.len(),
            epilogue,
        })
    }

    /// Value for the `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary.as_str())
    }

    /// Exact body size in bytes.
    pub fn content_length(&self) -> u64 {
        self.prelude.len() as u64 + self.file_len + self.epilogue.len() as u64
    }

    /// Text parts, then the file in [`CHUNK_SIZE`] reads, then the closing boundary.
    /// The file handle is released when the stream finishes or is dropped.
    ///
    /// Exactly the length measured at [`open`](Self::open) is read. A file that shrank in
    /// the meantime ends the stream with an error wrapping [`SourceFileChanged`].
    pub fn into_stream(self) -> BodyStream {
        let MultipartBody {
            prelude,
            file,
            file_len,
            epilogue,
            ..
        } = self;

        let read = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&read);
        let file_chunks = ReaderStream::with_capacity(file.take(file_len), CHUNK_SIZE)
            .inspect_ok(move |chunk| {
                counter.fetch_add(chunk.len() as u64, Ordering::Relaxed);
            });
        let closing = stream::once(async move {
            let read = read.load(Ordering::Relaxed);
            if read == file_len {
                Ok(epilogue)
            } else {
                Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    SourceFileChanged {
                        expected: file_len,
                        read,
                    },
                ))
            }
        });

        stream::once(async move { Ok::<_, io::Error>(prelude) })
            .chain(file_chunks)
            .chain(closing)
            .boxed()
    }
}

fn push_text_part(buf: &mut BytesMut, boundary: &Boundary, name: &str, value: &str) {
    buf.put_slice(format!("--{}{CRLF}", boundary.as_str()).as_bytes());
    buf.put_slice(format!("Content-Disposition: form-data; name=\"{name}\"{CRLF}").as_bytes());
    buf.put_slice(CRLF.as_bytes());
    buf.put_slice(value.as_bytes());
    buf.put_slice(CRLF.as_bytes());
}

/// Everything before the file bytes: summary, labels, file part headers.
pub(crate) fn encode_prelude(
    boundary: &Boundary,
    summary: &str,
    labels: &[String],
    target_name: &str,
) -> Bytes {
    let mut buf = BytesMut::new();
    push_text_part(&mut buf, boundary, "summary", summary);
    for label in labels {
        push_text_part(&mut buf, boundary, "label", label);
    }
    buf.put_slice(format!("--{}{CRLF}", boundary.as_str()).as_bytes());
    buf.put_slice(
        format!(
            "Content-Disposition: form-data; name=\"filename\"; filename=\"{}\"{CRLF}",
            escape_filename(target_name)
        )
        .as_bytes(),
    );
    buf.put_slice(format!("Content-Type: application/octet-stream{CRLF}").as_bytes());
    buf.put_slice(CRLF.as_bytes());
    buf.freeze()
}

pub(crate) fn encode_epilogue(boundary: &Boundary) -> Bytes {
    Bytes::from(format!("{CRLF}--{}--{CRLF}", boundary.as_str()))
}

/// Keeps the quoted `filename` parameter well formed.
fn escape_filename(name: &str) -> Cow<'_, str> {
    if !name.contains(['"', '\r', '\n']) {
        return Cow::Borrowed(name);
    }
    Cow::Owned(
        name.replace('"', "%22")
            .replace('\r', "%0D")
            .replace('\n', "%0A"),
    )
}
