//! HTTP client abstraction.
//!
//! The WebDAV transport only needs "send one request, get status and body".
//! The actual HTTP library is abstracted via a trait so the engine can run
//! on reqwest, on a platform HTTP stack, or against an in-memory host in tests.

use std::fmt;
use std::sync::Arc;

/// The WebDAV verbs used by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DavMethod {
    /// Single-depth metadata query (existence probe).
    Propfind,
    /// Collection (directory) creation.
    Mkcol,
    /// Full-body upload.
    Put,
    /// Full-body download.
    Get,
    /// Removal.
    Delete,
    /// Server-side rename.
    Move,
}

impl DavMethod {
    /// Returns the verb as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            DavMethod::Propfind => "PROPFIND",
            DavMethod::Mkcol => "MKCOL",
            DavMethod::Put => "PUT",
            DavMethod::Get => "GET",
            DavMethod::Delete => "DELETE",
            DavMethod::Move => "MOVE",
        }
    }
}

impl fmt::Display for DavMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single request to the remote host.
#[derive(Debug, Clone)]
pub struct DavRequest {
    /// Verb.
    pub method: DavMethod,
    /// Absolute URL.
    pub url: String,
    /// Request headers.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Vec<u8>,
}

impl DavRequest {
    /// Creates a request without headers or body.
    pub fn new(method: DavMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Looks up a header value (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A response from the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

impl DavResponse {
    /// Creates a response.
    pub fn new(status: u16, body: Vec<u8>) -> Self {
        Self { status, body }
    }

    /// Creates a response with an empty body.
    pub fn empty(status: u16) -> Self {
        Self::new(status, Vec::new())
    }

    /// Returns true for 2xx statuses (including 207 Multi-Status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body as text, lossily decoded and cut to `limit` characters.
    pub fn body_excerpt(&self, limit: usize) -> String {
        String::from_utf8_lossy(&self.body).chars().take(limit).collect()
    }
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP transport. An `Err`
/// means no response was received at all (DNS, TLS, connection reset);
/// every response, whatever its status, is an `Ok`.
pub trait HttpClient: Send + Sync {
    /// Sends one request and returns the full response.
    fn execute(&self, request: DavRequest) -> Result<DavResponse, String>;
}

impl<T: HttpClient + ?Sized> HttpClient for Arc<T> {
    fn execute(&self, request: DavRequest) -> Result<DavResponse, String> {
        (**self).execute(request)
    }
}

/// Blocking HTTP client backed by reqwest.
#[cfg(feature = "reqwest-client")]
pub struct ReqwestClient {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "reqwest-client")]
impl ReqwestClient {
    /// Creates a client with the given request timeout.
    pub fn new(timeout: std::time::Duration) -> crate::error::SyncResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::error::SyncError::NotConfigured(e.to_string()))?;
        Ok(Self { client })
    }
}

#[cfg(feature = "reqwest-client")]
impl HttpClient for ReqwestClient {
    fn execute(&self, request: DavRequest) -> Result<DavResponse, String> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|e| e.to_string())?;
        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let response = builder
            .body(request.body)
            .send()
            .map_err(|e| e.to_string())?;
        let status = response.status().as_u16();
        let body = response.bytes().map_err(|e| e.to_string())?;
        Ok(DavResponse::new(status, body.to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoClient;

    impl HttpClient for EchoClient {
        fn execute(&self, request: DavRequest) -> Result<DavResponse, String> {
            Ok(DavResponse::new(200, request.url.into_bytes()))
        }
    }

    #[test]
    fn method_names() {
        assert_eq!(DavMethod::Propfind.to_string(), "PROPFIND");
        assert_eq!(DavMethod::Mkcol.as_str(), "MKCOL");
        assert_eq!(DavMethod::Move.as_str(), "MOVE");
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let request = DavRequest::new(DavMethod::Move, "https://h/a")
            .with_header("Destination", "https://h/b")
            .with_header("Overwrite", "T");
        assert_eq!(request.header("destination"), Some("https://h/b"));
        assert_eq!(request.header("OVERWRITE"), Some("T"));
        assert_eq!(request.header("Depth"), None);
    }

    #[test]
    fn success_range() {
        assert!(DavResponse::empty(201).is_success());
        assert!(DavResponse::empty(207).is_success());
        assert!(!DavResponse::empty(301).is_success());
        assert!(!DavResponse::empty(404).is_success());
    }

    #[test]
    fn body_excerpt_truncates() {
        let response = DavResponse::new(500, b"internal server error".to_vec());
        assert_eq!(response.body_excerpt(8), "internal");
    }

    #[test]
    fn shared_client_forwards() {
        let client: Arc<dyn HttpClient> = Arc::new(EchoClient);
        let response = client
            .execute(DavRequest::new(DavMethod::Get, "https://h/x"))
            .unwrap();
        assert_eq!(response.body, b"https://h/x");
    }
}
