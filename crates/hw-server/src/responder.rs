//! Static file resolution and response building.
//!
//! Requests are resolved against the static root below the base path. HTML
//! bodies are read fully into memory and every literal `</body>` is replaced
//! with the reload client's script tags; everything else is served as-is.

use std::io;
use std::path::{Component, Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Body;
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

use crate::base_path::BasePath;
use crate::content_type::{self, guess_content_type};

/// Files tried, in order, when a directory is requested.
pub const DEFAULT_FILENAMES: [&str; 2] = ["index.html", "index.htm"];

/// Closing tag the reload client is injected in front of.
const CLOSING_BODY: &[u8] = b"</body>";

/// Characters escaped when a decoded path is written back into `Location`.
const LOCATION_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A file that a request resolved to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedFile {
    /// Absolute filesystem path.
    pub path: PathBuf,
    /// Filesystem modification time.
    pub last_modified: SystemTime,
    /// Guessed content type.
    pub content_type: &'static str,
    /// On-disk size in bytes.
    pub size: u64,
}

impl ResolvedFile {
    /// Whether the body receives the reload script.
    #[must_use]
    pub fn is_html(&self) -> bool {
        self.content_type == content_type::HTML
    }
}

/// Outcome of resolving a request path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Serve this file.
    File(ResolvedFile),
    /// Directory requested without trailing slash; redirect permanently.
    Redirect {
        /// Decoded target path (request path plus `/`).
        location: String,
    },
    /// Nothing to serve.
    NotFound,
    /// Traversal attempt or a target that is not a regular file.
    Forbidden,
}

/// Serves files below a static root, instrumenting HTML with the reload client.
#[derive(Clone, Debug)]
pub struct StaticFileResponder {
    static_root: PathBuf,
    base_path: BasePath,
    injection: Vec<u8>,
    default_filenames: Vec<String>,
}

impl StaticFileResponder {
    /// Create a responder.
    ///
    /// `static_root` must be an absolute directory path. `script_url` and
    /// `push_url` are embedded verbatim in the injected script tags.
    #[must_use]
    pub fn new(static_root: PathBuf, base_path: BasePath, script_url: &str, push_url: &str) -> Self {
        debug_assert!(static_root.is_absolute(), "static root must be absolute");
        Self {
            static_root,
            base_path,
            injection: injection_payload(script_url, push_url).into_bytes(),
            default_filenames: DEFAULT_FILENAMES.iter().map(|&s| s.to_owned()).collect(),
        }
    }

    /// Replace the default documents tried for directory requests.
    #[must_use]
    pub fn with_default_filenames(mut self, filenames: Vec<String>) -> Self {
        self.default_filenames = filenames;
        self
    }

    /// Root directory being served.
    #[must_use]
    pub fn static_root(&self) -> &Path {
        &self.static_root
    }

    /// Base path the root is exposed under.
    #[must_use]
    pub fn base_path(&self) -> &BasePath {
        &self.base_path
    }

    /// Bytes that replace each `</body>` in HTML responses.
    #[must_use]
    pub fn injection(&self) -> &[u8] {
        &self.injection
    }

    /// Resolve a decoded request path (including the base path).
    pub fn resolve(&self, request_path: &str) -> Resolution {
        if request_path.contains("..") || request_path.contains('~') {
            return Resolution::Forbidden;
        }
        let Some(relative) = self.base_path.strip(request_path) else {
            return Resolution::NotFound;
        };

        let mut path = self.static_root.clone();
        for segment in relative.split('/').filter(|s| !s.is_empty()) {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(_)), None) => path.push(segment),
                (Some(Component::CurDir), None) => {}
                _ => return Resolution::Forbidden,
            }
        }

        let Ok(mut metadata) = path.metadata() else {
            return Resolution::NotFound;
        };

        if metadata.is_dir() {
            if !request_path.ends_with('/') {
                return Resolution::Redirect {
                    location: format!("{request_path}/"),
                };
            }
            let Some((index, index_metadata)) = self.find_default_file(&path) else {
                return Resolution::NotFound;
            };
            path = index;
            metadata = index_metadata;
        }

        if !metadata.is_file() {
            return Resolution::Forbidden;
        }

        Resolution::File(ResolvedFile {
            content_type: guess_content_type(&path),
            last_modified: metadata.modified().unwrap_or(UNIX_EPOCH),
            size: metadata.len(),
            path,
        })
    }

    /// First default document that exists as a regular file in `dir`.
    fn find_default_file(&self, dir: &Path) -> Option<(PathBuf, std::fs::Metadata)> {
        self.default_filenames.iter().find_map(|name| {
            let candidate = dir.join(name);
            let metadata = candidate.metadata().ok()?;
            metadata.is_file().then_some((candidate, metadata))
        })
    }

    /// Read a resolved file, injecting the reload script into HTML.
    pub async fn read_body(&self, file: &ResolvedFile) -> io::Result<Vec<u8>> {
        let content = tokio::fs::read(&file.path).await?;
        if file.is_html() {
            Ok(inject_reload_script(&content, &self.injection))
        } else {
            Ok(content)
        }
    }

    /// Answer a request for `uri_path` (still percent-encoded).
    ///
    /// Only GET and HEAD are served. HEAD carries the same headers as GET,
    /// including the post-injection `Content-Length` for HTML.
    pub async fn respond(&self, method: &Method, uri_path: &str) -> Response {
        let include_body = match *method {
            Method::GET => true,
            Method::HEAD => false,
            _ => return StatusCode::METHOD_NOT_ALLOWED.into_response(),
        };

        let decoded = percent_decode_str(uri_path).decode_utf8_lossy();
        match self.resolve(&decoded) {
            Resolution::File(file) => self.file_response(&file, include_body).await,
            Resolution::Redirect { location } => redirect(&location),
            Resolution::NotFound => StatusCode::NOT_FOUND.into_response(),
            Resolution::Forbidden => StatusCode::FORBIDDEN.into_response(),
        }
    }

    async fn file_response(&self, file: &ResolvedFile, include_body: bool) -> Response {
        let (length, body) = if include_body || file.is_html() {
            match self.read_body(file).await {
                Ok(bytes) => (bytes.len() as u64, include_body.then_some(bytes)),
                Err(err) => return io_error_response(&file.path, &err),
            }
        } else {
            (file.size, None)
        };

        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, file.content_type)
            .header(header::CONTENT_LENGTH, length)
            .header(header::LAST_MODIFIED, http_date(file.last_modified))
            .body(body.map_or_else(Body::empty, Body::from))
            .unwrap()
    }
}

/// Script tags that replace each `</body>`.
fn injection_payload(script_url: &str, push_url: &str) -> String {
    format!(
        "<script type=\"application/javascript\" src=\"{script_url}\"></script>\n\
         <script type=\"application/javascript\">{activate}(\"{push_url}\");</script>\n\
         </body>",
        activate = hw_assets::ACTIVATE_FUNCTION,
    )
}

/// Replace every literal `</body>` in `content` with `payload`.
fn inject_reload_script(content: &[u8], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + payload.len());
    let mut rest = content;

    while let Some(pos) = rest
        .windows(CLOSING_BODY.len())
        .position(|window| window == CLOSING_BODY)
    {
        out.extend_from_slice(&rest[..pos]);
        out.extend_from_slice(payload);
        rest = &rest[pos + CLOSING_BODY.len()..];
    }
    out.extend_from_slice(rest);
    out
}

fn redirect(location: &str) -> Response {
    let encoded = utf8_percent_encode(location, LOCATION_ENCODE_SET).to_string();
    (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, encoded)]).into_response()
}

/// Format a timestamp as an HTTP-date.
fn http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Map a failed body read to a status; a vanished file is a plain 404.
fn io_error_response(path: &Path, err: &io::Error) -> Response {
    match err.kind() {
        io::ErrorKind::NotFound => StatusCode::NOT_FOUND.into_response(),
        io::ErrorKind::PermissionDenied => StatusCode::FORBIDDEN.into_response(),
        _ => {
            tracing::error!(path = %path.display(), error = %err, "Failed to read file");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use axum::body::to_bytes;
    use pretty_assertions::assert_eq;

    const SCRIPT_URL: &str = "http://localhost:5555/httpwatcher.min.js";
    const PUSH_URL: &str = "ws://localhost:5555/httpwatcher";

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("index.html"),
            "<!DOCTYPE html><html><head><title>Hello world</title></head><body>Test</body></html>",
        )
        .unwrap();
        fs::create_dir_all(dir.path().join("subfolder/subsubfolder")).unwrap();
        fs::write(
            dir.path().join("subfolder/index.htm"),
            "<html><body>Level 1</body></html>",
        )
        .unwrap();
        fs::create_dir(dir.path().join("empty")).unwrap();
        fs::write(dir.path().join("style.css"), "body { color: red; }").unwrap();
        dir
    }

    fn responder(dir: &tempfile::TempDir, base: &str) -> StaticFileResponder {
        StaticFileResponder::new(
            dir.path().canonicalize().unwrap(),
            BasePath::parse(base).unwrap(),
            SCRIPT_URL,
            PUSH_URL,
        )
    }

    fn resolved_path(resolution: Resolution) -> PathBuf {
        match resolution {
            Resolution::File(file) => file.path,
            other => panic!("expected file, got {other:?}"),
        }
    }

    #[test]
    fn test_injection_payload_format() {
        assert_eq!(
            injection_payload(SCRIPT_URL, PUSH_URL),
            "<script type=\"application/javascript\" src=\"http://localhost:5555/httpwatcher.min.js\"></script>\n\
             <script type=\"application/javascript\">activate(\"ws://localhost:5555/httpwatcher\");</script>\n\
             </body>"
        );
    }

    #[test]
    fn test_inject_replaces_every_closing_body() {
        let out = inject_reload_script(b"a</body>b</body>c", b"[X]</body>");
        assert_eq!(out, b"a[X]</body>b[X]</body>c".to_vec());
    }

    #[test]
    fn test_inject_without_closing_body_is_unchanged() {
        let content = b"<html><BODY>upper case</BODY></html>";
        assert_eq!(inject_reload_script(content, b"[X]"), content.to_vec());
    }

    #[test]
    fn test_resolve_root_default_document() {
        let dir = fixture();
        let responder = responder(&dir, "/");

        let path = resolved_path(responder.resolve("/"));
        assert!(path.ends_with("index.html"));
    }

    #[test]
    fn test_resolve_falls_back_to_second_default() {
        let dir = fixture();
        let responder = responder(&dir, "/");

        let path = resolved_path(responder.resolve("/subfolder/"));
        assert!(path.ends_with("subfolder/index.htm"));
    }

    #[test]
    fn test_resolve_custom_default_filenames() {
        let dir = fixture();
        fs::write(dir.path().join("empty/home.html"), "<p>home</p>").unwrap();
        let responder =
            responder(&dir, "/").with_default_filenames(vec!["home.html".to_owned()]);

        let path = resolved_path(responder.resolve("/empty/"));
        assert!(path.ends_with("empty/home.html"));
        assert_eq!(responder.resolve("/"), Resolution::NotFound);
    }

    #[test]
    fn test_resolve_directory_without_slash_redirects() {
        let dir = fixture();

        assert_eq!(
            responder(&dir, "/").resolve("/subfolder"),
            Resolution::Redirect {
                location: "/subfolder/".to_owned()
            }
        );
        assert_eq!(
            responder(&dir, "/docs/").resolve("/docs/subfolder/subsubfolder"),
            Resolution::Redirect {
                location: "/docs/subfolder/subsubfolder/".to_owned()
            }
        );
    }

    #[test]
    fn test_resolve_directory_without_default_is_not_found() {
        let dir = fixture();
        assert_eq!(responder(&dir, "/").resolve("/empty/"), Resolution::NotFound);
    }

    #[test]
    fn test_resolve_missing_file() {
        let dir = fixture();
        assert_eq!(
            responder(&dir, "/").resolve("/missing.html"),
            Resolution::NotFound
        );
    }

    #[test]
    fn test_resolve_traversal_forbidden() {
        let dir = fixture();
        for base in ["/", "/docs/"] {
            let responder = responder(&dir, base);
            assert_eq!(responder.resolve("/../../etc/passwd"), Resolution::Forbidden);
            assert_eq!(responder.resolve("/docs/../secret"), Resolution::Forbidden);
            assert_eq!(responder.resolve("/~root/.profile"), Resolution::Forbidden);
        }
    }

    #[test]
    fn test_resolve_outside_base_path() {
        let dir = fixture();
        let responder = responder(&dir, "/docs/");

        assert_eq!(responder.resolve("/"), Resolution::NotFound);
        assert_eq!(responder.resolve("/index.html"), Resolution::NotFound);
        assert!(matches!(responder.resolve("/docs/"), Resolution::File(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_non_regular_file_forbidden() {
        let dir = fixture();
        std::os::unix::fs::symlink("/dev/null", dir.path().join("null")).unwrap();

        assert_eq!(responder(&dir, "/").resolve("/null"), Resolution::Forbidden);
    }

    #[test]
    fn test_resolved_file_metadata() {
        let dir = fixture();
        let Resolution::File(file) = responder(&dir, "/").resolve("/style.css") else {
            panic!("expected file");
        };

        assert_eq!(file.content_type, "text/css");
        assert_eq!(file.size, 20);
        assert!(!file.is_html());
    }

    #[tokio::test]
    async fn test_get_html_injects_and_counts_transformed_length() {
        let dir = fixture();
        let responder = responder(&dir, "/");

        let response = responder.respond(&Method::GET, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/html");

        let length: usize = response.headers()[header::CONTENT_LENGTH]
            .to_str()
            .unwrap()
            .parse()
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let original = fs::metadata(dir.path().join("index.html")).unwrap().len();

        assert_eq!(length, body.len());
        assert_ne!(length as u64, original);

        let text = std::str::from_utf8(&body).unwrap();
        let tail = String::from_utf8(responder.injection().to_vec()).unwrap() + "</html>";
        assert!(text.ends_with(&tail));
        assert_eq!(text.matches("<script").count(), 2);
    }

    #[tokio::test]
    async fn test_head_matches_get_headers_without_body() {
        let dir = fixture();
        let responder = responder(&dir, "/");

        let get = responder.respond(&Method::GET, "/index.html").await;
        let head = responder.respond(&Method::HEAD, "/index.html").await;

        assert_eq!(head.status(), StatusCode::OK);
        for name in [header::CONTENT_TYPE, header::CONTENT_LENGTH, header::LAST_MODIFIED] {
            assert_eq!(get.headers()[&name], head.headers()[&name]);
        }
        let body = to_bytes(head.into_body(), usize::MAX).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_get_non_html_is_untouched() {
        let dir = fixture();
        fs::write(dir.path().join("notes.txt"), "see </body> here").unwrap();
        let responder = responder(&dir, "/");

        let response = responder.respond(&Method::GET, "/notes.txt").await;
        assert_eq!(response.headers()[header::CONTENT_LENGTH], "16");
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"see </body> here");
    }

    #[tokio::test]
    async fn test_last_modified_is_http_date() {
        let dir = fixture();
        let response = responder(&dir, "/").respond(&Method::GET, "/style.css").await;

        let value = response.headers()[header::LAST_MODIFIED].to_str().unwrap();
        assert!(value.ends_with(" GMT"), "got {value}");
        assert!(DateTime::parse_from_rfc2822(&value.replace("GMT", "+0000")).is_ok());
    }

    #[tokio::test]
    async fn test_redirect_keeps_base_path_and_encodes() {
        let dir = fixture();
        fs::create_dir(dir.path().join("my docs")).unwrap();
        let responder = responder(&dir, "/docs/");

        let response = responder.respond(&Method::GET, "/docs/my%20docs").await;
        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(response.headers()[header::LOCATION], "/docs/my%20docs/");
    }

    #[tokio::test]
    async fn test_encoded_traversal_forbidden() {
        let dir = fixture();
        let response = responder(&dir, "/")
            .respond(&Method::GET, "/%2e%2e/%2e%2e/etc/passwd")
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_other_methods_not_allowed() {
        let dir = fixture();
        let response = responder(&dir, "/").respond(&Method::POST, "/").await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[test]
    fn test_io_error_mapping() {
        let path = Path::new("/site/gone.html");
        let gone = io::Error::from(io::ErrorKind::NotFound);
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        let other = io::Error::other("disk on fire");

        assert_eq!(io_error_response(path, &gone).status(), StatusCode::NOT_FOUND);
        assert_eq!(io_error_response(path, &denied).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            io_error_response(path, &other).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
