//! WebDAV transport.
//!
//! A thin wrapper over the remote file protocol. Every operation is exactly
//! one request; there is no retry policy and no knowledge of locks or
//! conflicts.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::http::{DavMethod, DavRequest, DavResponse, HttpClient};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

/// Maximum number of response body characters kept in error messages.
const ERROR_BODY_LIMIT: usize = 512;

const STATUS_NOT_FOUND: u16 = 404;
const STATUS_METHOD_NOT_ALLOWED: u16 = 405;

/// WebDAV client for one remote host.
pub struct WebDavTransport<C: HttpClient> {
    /// Base URL without trailing slash.
    base_url: String,
    /// Precomputed `Authorization` header value.
    authorization: String,
    /// HTTP client implementation.
    client: C,
}

impl<C: HttpClient> WebDavTransport<C> {
    /// Creates a transport for `base_url` authenticating as `username`.
    pub fn new(base_url: impl Into<String>, username: &str, password: &str, client: C) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let token = STANDARD.encode(format!("{username}:{password}"));
        Self {
            base_url,
            authorization: format!("Basic {token}"),
            client,
        }
    }

    /// Creates a transport from a sync configuration.
    pub fn from_config(config: &SyncConfig, client: C) -> Self {
        Self::new(
            config.remote_url.clone(),
            &config.username,
            &config.password,
            client,
        )
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the absolute URL of a remote path.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Returns true if `path` exists.
    ///
    /// Any non-success status reads as "does not exist". Only a request that
    /// got no response at all is an error.
    pub fn exists(&self, path: &str) -> SyncResult<bool> {
        let response = self.send(DavMethod::Propfind, path, |r| r.with_header("Depth", "0"))?;
        Ok(response.is_success())
    }

    /// Creates a directory. An already existing directory is not an error.
    pub fn make_dir(&self, path: &str) -> SyncResult<()> {
        let response = self.send(DavMethod::Mkcol, path, |r| r)?;
        if response.is_success() || response.status == STATUS_METHOD_NOT_ALLOWED {
            return Ok(());
        }
        Err(Self::failure(DavMethod::Mkcol, path, &response))
    }

    /// Creates every directory in `chain`, outermost first.
    pub fn make_dir_all<S: AsRef<str>>(&self, chain: &[S]) -> SyncResult<()> {
        for dir in chain {
            self.make_dir(dir.as_ref())?;
        }
        Ok(())
    }

    /// Uploads `bytes` to `path`, replacing any existing file.
    pub fn put_file(&self, path: &str, bytes: &[u8], content_type: &str) -> SyncResult<()> {
        let response = self.send(DavMethod::Put, path, |r| {
            r.with_header("Content-Type", content_type)
                .with_body(bytes.to_vec())
        })?;
        if response.is_success() {
            return Ok(());
        }
        Err(Self::failure(DavMethod::Put, path, &response))
    }

    /// Downloads the file at `path`.
    pub fn get_file(&self, path: &str) -> SyncResult<Vec<u8>> {
        let response = self.send(DavMethod::Get, path, |r| r)?;
        if response.is_success() {
            return Ok(response.body);
        }
        Err(Self::failure(DavMethod::Get, path, &response))
    }

    /// Downloads the file at `path`, or `None` if the server answers 404.
    ///
    /// Every other failure status is an error, so a rejected credential is
    /// never mistaken for an empty remote.
    pub fn get_file_if_exists(&self, path: &str) -> SyncResult<Option<Vec<u8>>> {
        let response = self.send(DavMethod::Get, path, |r| r)?;
        if response.is_success() {
            return Ok(Some(response.body));
        }
        if response.status == STATUS_NOT_FOUND {
            return Ok(None);
        }
        Err(Self::failure(DavMethod::Get, path, &response))
    }

    /// Downloads the file at `path` as UTF-8 text.
    pub fn get_file_as_text(&self, path: &str) -> SyncResult<String> {
        let bytes = self.get_file(path)?;
        String::from_utf8(bytes)
            .map_err(|e| SyncError::Codec(format!("{path} is not valid UTF-8: {e}")))
    }

    /// Deletes the file at `path`. A missing file is not an error.
    pub fn delete_file(&self, path: &str) -> SyncResult<()> {
        let response = self.send(DavMethod::Delete, path, |r| r)?;
        if response.is_success() || response.status == STATUS_NOT_FOUND {
            return Ok(());
        }
        Err(Self::failure(DavMethod::Delete, path, &response))
    }

    /// Renames `from` onto `to` on the server.
    ///
    /// This is the atomic-commit primitive: the destination is replaced in a
    /// single step and is never observable half-written.
    pub fn move_file(&self, from: &str, to: &str, overwrite: bool) -> SyncResult<()> {
        let destination = self.url(to);
        let response = self.send(DavMethod::Move, from, |r| {
            r.with_header("Destination", destination)
                .with_header("Overwrite", if overwrite { "T" } else { "F" })
        })?;
        if response.is_success() {
            return Ok(());
        }
        Err(Self::failure(DavMethod::Move, from, &response))
    }

    fn send(
        &self,
        method: DavMethod,
        path: &str,
        build: impl FnOnce(DavRequest) -> DavRequest,
    ) -> SyncResult<DavResponse> {
        let request = build(
            DavRequest::new(method, self.url(path))
                .with_header("Authorization", self.authorization.clone()),
        );
        match self.client.execute(request) {
            Ok(response) => {
                debug!(%method, path, status = response.status, "webdav request");
                Ok(response)
            }
            Err(message) => {
                debug!(%method, path, error = %message, "webdav request failed");
                Err(SyncError::network(method, path, message))
            }
        }
    }

    fn failure(method: DavMethod, path: &str, response: &DavResponse) -> SyncError {
        let body = response.body_excerpt(ERROR_BODY_LIMIT);
        let message = if body.trim().is_empty() {
            format!("HTTP {}", response.status)
        } else {
            format!("HTTP {}: {}", response.status, body.trim())
        };
        SyncError::status(method, path, response.status, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Replays scripted responses and records every request.
    #[derive(Default)]
    struct ScriptedClient {
        responses: Mutex<VecDeque<Result<DavResponse, String>>>,
        requests: Mutex<Vec<DavRequest>>,
    }

    impl ScriptedClient {
        fn respond(self, response: Result<DavResponse, String>) -> Self {
            self.responses.lock().push_back(response);
            self
        }

        fn status(self, status: u16) -> Self {
            self.respond(Ok(DavResponse::empty(status)))
        }
    }

    impl HttpClient for ScriptedClient {
        fn execute(&self, request: DavRequest) -> Result<DavResponse, String> {
            self.requests.lock().push(request);
            self.responses
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err("no scripted response".into()))
        }
    }

    fn transport(client: ScriptedClient) -> WebDavTransport<ScriptedClient> {
        WebDavTransport::new("https://dav.example.com/files/", "alice", "wonder", client)
    }

    fn last_request(t: &WebDavTransport<ScriptedClient>) -> DavRequest {
        t.client.requests.lock().last().cloned().unwrap()
    }

    #[test]
    fn attaches_basic_auth_and_builds_urls() {
        let t = transport(ScriptedClient::default().status(207));
        assert!(t.exists("/root/p/state").unwrap());

        let request = last_request(&t);
        assert_eq!(request.method, DavMethod::Propfind);
        assert_eq!(request.url, "https://dav.example.com/files/root/p/state");
        assert_eq!(request.header("Depth"), Some("0"));
        // base64("alice:wonder")
        assert_eq!(request.header("Authorization"), Some("Basic YWxpY2U6d29uZGVy"));
    }

    #[test]
    fn exists_is_false_on_any_failure_status() {
        let t = transport(
            ScriptedClient::default()
                .status(404)
                .status(401)
                .status(500),
        );
        assert!(!t.exists("/a").unwrap());
        assert!(!t.exists("/a").unwrap());
        assert!(!t.exists("/a").unwrap());
    }

    #[test]
    fn exists_surfaces_network_failure() {
        let t = transport(ScriptedClient::default().respond(Err("connection refused".into())));
        let err = t.exists("/a").unwrap_err();
        assert!(matches!(err, SyncError::Transport { status: None, .. }));
    }

    #[test]
    fn make_dir_tolerates_existing() {
        let t = transport(ScriptedClient::default().status(201).status(405).status(409));
        t.make_dir("/root").unwrap();
        t.make_dir("/root").unwrap();
        let err = t.make_dir("/missing/parent").unwrap_err();
        assert!(matches!(err, SyncError::Transport { status: Some(409), .. }));
    }

    #[test]
    fn make_dir_all_creates_in_order() {
        let t = transport(ScriptedClient::default().status(405).status(201));
        t.make_dir_all(&["/root", "/root/p"]).unwrap();
        let urls: Vec<String> = t.client.requests.lock().iter().map(|r| r.url.clone()).collect();
        assert_eq!(
            urls,
            vec![
                "https://dav.example.com/files/root",
                "https://dav.example.com/files/root/p"
            ]
        );
    }

    #[test]
    fn put_fails_loudly_with_status_and_body() {
        let t = transport(
            ScriptedClient::default()
                .respond(Ok(DavResponse::new(507, b"Insufficient Storage".to_vec()))),
        );
        let err = t.put_file("/root/p/db", b"bytes", "application/octet-stream").unwrap_err();
        match err {
            SyncError::Transport {
                operation,
                status,
                message,
                ..
            } => {
                assert_eq!(operation, DavMethod::Put);
                assert_eq!(status, Some(507));
                assert_eq!(message, "HTTP 507: Insufficient Storage");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn put_sends_body_and_content_type() {
        let t = transport(ScriptedClient::default().status(201));
        t.put_file("/root/p/state", b"{}", "application/json").unwrap();
        let request = last_request(&t);
        assert_eq!(request.body, b"{}");
        assert_eq!(request.header("content-type"), Some("application/json"));
    }

    #[test]
    fn get_returns_body_or_fails() {
        let t = transport(
            ScriptedClient::default()
                .respond(Ok(DavResponse::new(200, b"hello".to_vec())))
                .status(404)
                .respond(Ok(DavResponse::new(200, vec![0xff, 0xfe]))),
        );
        assert_eq!(t.get_file("/f").unwrap(), b"hello");
        assert!(t.get_file("/f").is_err());
        assert!(matches!(t.get_file_as_text("/f"), Err(SyncError::Codec(_))));
    }

    #[test]
    fn optional_get_only_absorbs_not_found() {
        let t = transport(
            ScriptedClient::default()
                .respond(Ok(DavResponse::new(200, b"{}".to_vec())))
                .status(404)
                .status(401)
                .status(503),
        );
        assert_eq!(t.get_file_if_exists("/s").unwrap(), Some(b"{}".to_vec()));
        assert_eq!(t.get_file_if_exists("/s").unwrap(), None);
        assert!(matches!(
            t.get_file_if_exists("/s"),
            Err(SyncError::Transport { status: Some(401), .. })
        ));
        assert!(matches!(
            t.get_file_if_exists("/s"),
            Err(SyncError::Transport { status: Some(503), .. })
        ));
    }

    #[test]
    fn delete_tolerates_missing() {
        let t = transport(ScriptedClient::default().status(204).status(404).status(403));
        t.delete_file("/f").unwrap();
        t.delete_file("/f").unwrap();
        assert!(t.delete_file("/f").is_err());
    }

    #[test]
    fn move_sends_destination_and_overwrite() {
        let t = transport(ScriptedClient::default().status(204).status(412));
        t.move_file("/p/db.uploading", "/p/db", true).unwrap();

        let request = last_request(&t);
        assert_eq!(request.method, DavMethod::Move);
        assert_eq!(request.url, "https://dav.example.com/files/p/db.uploading");
        assert_eq!(request.header("Destination"), Some("https://dav.example.com/files/p/db"));
        assert_eq!(request.header("Overwrite"), Some("T"));

        let err = t.move_file("/p/db.uploading", "/p/db", false).unwrap_err();
        assert!(matches!(err, SyncError::Transport { status: Some(412), .. }));
        assert_eq!(last_request(&t).header("Overwrite"), Some("F"));
    }
}
