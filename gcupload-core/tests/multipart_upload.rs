use async_trait::async_trait;
use futures::StreamExt;
use gcupload_core::{
    Boundary, Credentials, Destination, HttpReply, HttpTransport, TransportError, UploadError,
    UploadHttpRequest, UploadRequest, Uploader, UploaderConfig, CHUNK_SIZE,
};
use std::io::Write;
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// What the transport saw, with the body stream fully drained.
#[derive(Debug, Clone)]
struct Captured {
    url: String,
    authorization: String,
    user_agent: String,
    content_type: String,
    content_length: u64,
    body: Vec<u8>,
}

#[derive(Clone, Default)]
struct RecordingTransport {
    captured: Arc<Mutex<Vec<Captured>>>,
}

impl RecordingTransport {
    fn last(&self) -> Captured {
        self.captured
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("transport was never called")
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn send(&self, request: UploadHttpRequest) -> Result<HttpReply, TransportError> {
        let mut body = Vec::new();
        let mut stream = request.body;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(TransportError::new)?;
            body.extend_from_slice(&chunk);
        }
        self.captured.lock().unwrap().push(Captured {
            url: request.url.to_string(),
            authorization: request.authorization,
            user_agent: request.user_agent,
            content_type: request.content_type,
            content_length: request.content_length,
            body,
        });
        Ok(HttpReply {
            status: 200,
            reason: Some("OK".into()),
            location: None,
            headers: Vec::new(),
            body: String::new(),
        })
    }
}

/// Empties the source file before reading the body, like a writer racing the upload.
struct TruncatingTransport {
    path: std::path::PathBuf,
}

#[async_trait]
impl HttpTransport for TruncatingTransport {
    async fn send(&self, request: UploadHttpRequest) -> Result<HttpReply, TransportError> {
        std::fs::write(&self.path, b"").map_err(TransportError::new)?;
        let mut stream = request.body;
        while let Some(chunk) = stream.next().await {
            chunk.map_err(TransportError::new)?;
        }
        panic!("body stream ended without reporting the size change");
    }
}

#[derive(Debug)]
struct Part {
    name: String,
    filename: Option<String>,
    headers: String,
    content: Vec<u8>,
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

fn param(headers: &str, key: &str) -> Option<String> {
    let marker = format!("{key}=\"");
    let start = headers.find(&marker)? + marker.len();
    let end = headers[start..].find('"')? + start;
    Some(headers[start..end].to_string())
}

/// Reads the body back into its parts.
fn parse_parts(body: &[u8], boundary: &str) -> Vec<Part> {
    let opening = format!("--{boundary}\r\n");
    let delimiter = format!("\r\n--{boundary}");
    let closing = format!("\r\n--{boundary}--\r\n");
    assert!(body.starts_with(opening.as_bytes()), "body must open with boundary");
    assert!(body.ends_with(closing.as_bytes()), "body must end with closing boundary");

    let mut rest = &body[opening.len()..];
    let mut parts = Vec::new();
    loop {
        let end = find(rest, delimiter.as_bytes()).expect("part delimiter");
        let raw = &rest[..end];
        let header_end = find(raw, b"\r\n\r\n").expect("header terminator");
        let headers = String::from_utf8(raw[..header_end].to_vec()).expect("utf8 headers");
        parts.push(Part {
            name: param(&headers, "name").expect("part name"),
            filename: param(&headers, "filename"),
            headers,
            content: raw[header_end + 4..].to_vec(),
        });
        rest = &rest[end + delimiter.len()..];
        if rest == b"--\r\n" {
            break;
        }
        rest = rest.strip_prefix(b"\r\n").expect("CRLF after delimiter");
    }
    parts
}

fn boundary_of(content_type: &str) -> &str {
    content_type
        .strip_prefix("multipart/form-data; boundary=")
        .expect("multipart content type")
}

/// Deterministic bytes that never spell out a CRLF.
fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| ((i * 31 + 7) % 251) as u8).collect()
}

fn source_file(content: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content).expect("write temp file");
    file.flush().expect("flush temp file");
    file
}

fn request(path: &std::path::Path) -> UploadRequest {
    UploadRequest::new(
        Credentials::new("alice", "s3cret"),
        Destination::Project("demo".into()),
        path,
        "Release 1.2 sources",
    )
}

#[tokio::test]
async fn body_holds_summary_labels_and_file_in_order() {
    let content = payload(3 * CHUNK_SIZE + 17);
    let file = source_file(&content);
    let transport = RecordingTransport::default();
    let uploader = Uploader::new(transport.clone(), UploaderConfig::default());

    let labels = ["Featured", "Type-Source", "Featured"];
    uploader
        .upload(
            request(file.path())
                .with_target_name("demo-1.2-src.tar.gz")
                .with_labels(labels),
        )
        .await
        .expect("upload succeeds");

    let captured = transport.last();
    let parts = parse_parts(&captured.body, boundary_of(&captured.content_type));

    assert_eq!(parts.len(), 1 + labels.len() + 1);
    assert_eq!(parts[0].name, "summary");
    assert_eq!(parts[0].content, b"Release 1.2 sources");

    let label_parts: Vec<&Part> = parts.iter().filter(|p| p.name == "label").collect();
    assert_eq!(label_parts.len(), labels.len());
    for (part, label) in label_parts.iter().zip(labels) {
        assert_eq!(part.content, label.as_bytes());
    }

    let file_part = parts.last().unwrap();
    assert_eq!(file_part.name, "filename");
    assert_eq!(file_part.filename.as_deref(), Some("demo-1.2-src.tar.gz"));
    assert!(file_part
        .headers
        .contains("Content-Type: application/octet-stream"));
    assert_eq!(file_part.content, content);
    assert_eq!(parts.iter().filter(|p| p.filename.is_some()).count(), 1);
}

#[tokio::test]
async fn headers_carry_auth_agent_and_exact_length() {
    let file = source_file(b"tiny");
    let transport = RecordingTransport::default();
    let uploader = Uploader::new(transport.clone(), UploaderConfig::default());

    uploader.upload(request(file.path())).await.unwrap();

    let captured = transport.last();
    assert_eq!(captured.url, "https://demo.googlecode.com/files");
    assert_eq!(captured.authorization, "Basic YWxpY2U6czNjcmV0");
    assert_eq!(captured.user_agent, UploaderConfig::default().user_agent);
    assert_eq!(captured.content_length, captured.body.len() as u64);
}

#[tokio::test]
async fn default_target_name_is_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("archive.zip");
    std::fs::write(&path, b"zip bytes").unwrap();
    let transport = RecordingTransport::default();
    let uploader = Uploader::new(transport.clone(), UploaderConfig::default());

    let uploaded = uploader.upload(request(&path)).await.unwrap();
    assert_eq!(uploaded.target_name, "archive.zip");

    let captured = transport.last();
    let parts = parse_parts(&captured.body, boundary_of(&captured.content_type));
    assert_eq!(parts.last().unwrap().filename.as_deref(), Some("archive.zip"));
}

#[tokio::test]
async fn explicit_url_overrides_project() {
    let file = source_file(b"x");
    let transport = RecordingTransport::default();
    let uploader = Uploader::new(transport.clone(), UploaderConfig::default());

    let destination =
        Destination::from_parts(Some("https://upload.example.net/custom"), Some("demo")).unwrap();
    let req = UploadRequest::new(
        Credentials::new("alice", "s3cret"),
        destination,
        file.path(),
        "summary",
    );
    uploader.upload(req).await.unwrap();

    assert_eq!(transport.last().url, "https://upload.example.net/custom");
}

#[tokio::test]
async fn chunking_never_alters_bytes() {
    let transport = RecordingTransport::default();
    let uploader = Uploader::new(transport.clone(), UploaderConfig::default());
    let boundary = "FIXEDBOUNDARY";

    for len in [0, 10, CHUNK_SIZE - 1, CHUNK_SIZE, CHUNK_SIZE + 1, 5 * CHUNK_SIZE + 123] {
        let content = payload(len);
        let file = source_file(&content);
        uploader
            .upload_with_boundary(
                request(file.path()).with_target_name("f.bin"),
                Boundary::fixed(boundary),
            )
            .await
            .unwrap();

        let mut expected = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"summary\"\r\n\r\nRelease 1.2 sources\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"filename\"; filename=\"f.bin\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        expected.extend_from_slice(&content);
        expected.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let captured = transport.last();
        assert_eq!(captured.body, expected, "body mismatch for file of {len} bytes");
        assert_eq!(captured.content_length, expected.len() as u64);
    }
}

#[tokio::test]
async fn generated_boundary_does_not_occur_in_text_parts() {
    let file = source_file(b"data");
    let transport = RecordingTransport::default();
    let uploader = Uploader::new(transport.clone(), UploaderConfig::default());

    uploader
        .upload(request(file.path()).with_labels(["gcupload-label"]))
        .await
        .unwrap();

    let captured = transport.last();
    let boundary = boundary_of(&captured.content_type);
    assert!(!"Release 1.2 sources".contains(boundary));
    assert!(!"gcupload-label".contains(boundary));
    assert_eq!(parse_parts(&captured.body, boundary).len(), 3);
}

#[tokio::test]
async fn file_shrinking_mid_upload_is_a_source_file_error() {
    let file = source_file(&payload(2 * CHUNK_SIZE));
    let transport = TruncatingTransport {
        path: file.path().to_path_buf(),
    };
    let uploader = Uploader::new(transport, UploaderConfig::default());

    let err = uploader.upload(request(file.path())).await.unwrap_err();
    match err {
        UploadError::SourceFile { path, source } => {
            assert_eq!(path, file.path());
            assert_eq!(source.kind(), std::io::ErrorKind::UnexpectedEof);
            assert!(source.to_string().contains("changed size during upload"));
        }
        other => panic!("expected SourceFile, got {other:?}"),
    }
}
