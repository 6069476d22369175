//! In-memory WebDAV host.
//!
//! Answers the six verbs the engine uses with the status codes a real host
//! would return, and can be told to fail specific requests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use blobsync_engine::{DavMethod, DavRequest, DavResponse, HttpClient};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// What an injected fault does to a matching request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAction {
    /// Answer with this status and leave host state untouched.
    Status(u16),
    /// Fail without any response.
    Network,
    /// Process the request but cut the body to this many bytes. A PUT
    /// stores the truncated body; a GET returns it.
    Truncate(usize),
}

#[derive(Debug, Clone)]
struct Fault {
    method: DavMethod,
    path_suffix: String,
    action: FaultAction,
    remaining: Option<usize>,
}

/// A request as the host saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    /// Verb.
    pub method: DavMethod,
    /// Host-relative path.
    pub path: String,
}

#[derive(Debug, Default)]
struct HostState {
    files: BTreeMap<String, Vec<u8>>,
    dirs: BTreeSet<String>,
    authorization: Option<String>,
    faults: Vec<Fault>,
    log: Vec<RecordedRequest>,
}

/// A WebDAV host held in memory.
///
/// Clones share the same files, so several clients can talk to one host.
#[derive(Debug, Clone)]
pub struct MemoryDavHost {
    base_url: String,
    state: Arc<Mutex<HostState>>,
}

impl MemoryDavHost {
    /// Creates an empty host serving below `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            state: Arc::new(Mutex::new(HostState::default())),
        }
    }

    /// Requires Basic authentication with these credentials.
    #[must_use]
    pub fn with_credentials(self, username: &str, password: &str) -> Self {
        let token = STANDARD.encode(format!("{username}:{password}"));
        self.state.lock().authorization = Some(format!("Basic {token}"));
        self
    }

    /// Fails every request matching `method` and `path_suffix`.
    pub fn fail(&self, method: DavMethod, path_suffix: &str, action: FaultAction) {
        self.add_fault(method, path_suffix, action, None);
    }

    /// Fails the next `times` requests matching `method` and `path_suffix`.
    pub fn fail_times(&self, method: DavMethod, path_suffix: &str, action: FaultAction, times: usize) {
        self.add_fault(method, path_suffix, action, Some(times));
    }

    /// Removes every injected fault.
    pub fn clear_faults(&self) {
        self.state.lock().faults.clear();
    }

    /// Returns the contents of a file.
    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(path).cloned()
    }

    /// Writes a file directly, creating its parent directories.
    pub fn put_raw(&self, path: &str, bytes: impl Into<Vec<u8>>) {
        let mut state = self.state.lock();
        let mut parent = parent_of(path);
        while parent != "/" {
            state.dirs.insert(parent.to_string());
            parent = parent_of(parent);
        }
        state.files.insert(path.to_string(), bytes.into());
    }

    /// Deletes a file directly.
    pub fn remove_raw(&self, path: &str) -> bool {
        self.state.lock().files.remove(path).is_some()
    }

    /// Returns true if a file or directory exists at `path`.
    pub fn has(&self, path: &str) -> bool {
        let state = self.state.lock();
        state.files.contains_key(path) || state.dirs.contains(path)
    }

    /// Returns true if a directory exists at `path`.
    pub fn has_dir(&self, path: &str) -> bool {
        self.state.lock().dirs.contains(path)
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().log.clone()
    }

    /// Number of received requests with `method` on a path ending in `path_suffix`.
    pub fn count(&self, method: DavMethod, path_suffix: &str) -> usize {
        self.state
            .lock()
            .log
            .iter()
            .filter(|r| r.method == method && r.path.ends_with(path_suffix))
            .count()
    }

    /// Forgets the request log.
    pub fn clear_requests(&self) {
        self.state.lock().log.clear();
    }

    fn add_fault(&self, method: DavMethod, path_suffix: &str, action: FaultAction, remaining: Option<usize>) {
        self.state.lock().faults.push(Fault {
            method,
            path_suffix: path_suffix.to_string(),
            action,
            remaining,
        });
    }

    fn relative<'a>(&self, url: &'a str) -> Option<&'a str> {
        url.strip_prefix(self.base_url.as_str())
            .filter(|p| p.starts_with('/'))
    }
}

impl HttpClient for MemoryDavHost {
    fn execute(&self, request: DavRequest) -> Result<DavResponse, String> {
        let Some(path) = self.relative(&request.url).map(str::to_string) else {
            return Ok(DavResponse::empty(400));
        };
        let mut state = self.state.lock();
        state.log.push(RecordedRequest {
            method: request.method,
            path: path.clone(),
        });

        if let Some(expected) = &state.authorization {
            if request.header("Authorization") != Some(expected.as_str()) {
                return Ok(DavResponse::new(401, b"Unauthorized".to_vec()));
            }
        }

        let mut truncate = None;
        match take_fault(&mut state, request.method, &path) {
            Some(FaultAction::Status(status)) => {
                return Ok(DavResponse::new(status, b"injected failure".to_vec()))
            }
            Some(FaultAction::Network) => return Err("injected network failure".into()),
            Some(FaultAction::Truncate(len)) => truncate = Some(len),
            None => {}
        }

        let response = match request.method {
            DavMethod::Propfind => propfind(&state, &path),
            DavMethod::Mkcol => mkcol(&mut state, &path),
            DavMethod::Put => {
                let mut body = request.body;
                if let Some(len) = truncate {
                    body.truncate(len);
                }
                put(&mut state, &path, body)
            }
            DavMethod::Get => {
                let mut response = get(&state, &path);
                if let Some(len) = truncate {
                    response.body.truncate(len);
                }
                response
            }
            DavMethod::Delete => delete(&mut state, &path),
            DavMethod::Move => {
                let destination = request
                    .header("Destination")
                    .and_then(|d| self.relative(d))
                    .map(str::to_string);
                let overwrite = request.header("Overwrite") != Some("F");
                match destination {
                    Some(to) => move_file(&mut state, &path, &to, overwrite),
                    None => DavResponse::new(400, b"bad Destination".to_vec()),
                }
            }
        };
        Ok(response)
    }
}

fn take_fault(state: &mut HostState, method: DavMethod, path: &str) -> Option<FaultAction> {
    let index = state
        .faults
        .iter()
        .position(|f| f.method == method && path.ends_with(&f.path_suffix))?;
    let fault = &mut state.faults[index];
    let action = fault.action;
    let exhausted = match fault.remaining.as_mut() {
        Some(remaining) => {
            *remaining = remaining.saturating_sub(1);
            *remaining == 0
        }
        None => false,
    };
    if exhausted {
        state.faults.remove(index);
    }
    Some(action)
}

fn parent_of(path: &str) -> &str {
    match path.trim_end_matches('/').rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

fn dir_exists(state: &HostState, path: &str) -> bool {
    path == "/" || state.dirs.contains(path)
}

fn propfind(state: &HostState, path: &str) -> DavResponse {
    if state.files.contains_key(path) || dir_exists(state, path) {
        DavResponse::empty(207)
    } else {
        DavResponse::empty(404)
    }
}

fn mkcol(state: &mut HostState, path: &str) -> DavResponse {
    if state.files.contains_key(path) || dir_exists(state, path) {
        return DavResponse::empty(405);
    }
    if !dir_exists(state, parent_of(path)) {
        return DavResponse::empty(409);
    }
    state.dirs.insert(path.to_string());
    DavResponse::empty(201)
}

fn put(state: &mut HostState, path: &str, body: Vec<u8>) -> DavResponse {
    if dir_exists(state, path) {
        return DavResponse::empty(405);
    }
    if !dir_exists(state, parent_of(path)) {
        return DavResponse::empty(409);
    }
    match state.files.insert(path.to_string(), body) {
        Some(_) => DavResponse::empty(204),
        None => DavResponse::empty(201),
    }
}

fn get(state: &HostState, path: &str) -> DavResponse {
    match state.files.get(path) {
        Some(body) => DavResponse::new(200, body.clone()),
        None => DavResponse::empty(404),
    }
}

fn delete(state: &mut HostState, path: &str) -> DavResponse {
    if state.files.remove(path).is_some() {
        return DavResponse::empty(204);
    }
    if state.dirs.remove(path) {
        let prefix = format!("{path}/");
        state.files.retain(|p, _| !p.starts_with(&prefix));
        state.dirs.retain(|p| !p.starts_with(&prefix));
        return DavResponse::empty(204);
    }
    DavResponse::empty(404)
}

fn move_file(state: &mut HostState, from: &str, to: &str, overwrite: bool) -> DavResponse {
    if !state.files.contains_key(from) {
        return DavResponse::empty(404);
    }
    if !dir_exists(state, parent_of(to)) {
        return DavResponse::empty(409);
    }
    let existed = state.files.contains_key(to);
    if existed && !overwrite {
        return DavResponse::empty(412);
    }
    let Some(body) = state.files.remove(from) else {
        return DavResponse::empty(404);
    };
    state.files.insert(to.to_string(), body);
    DavResponse::empty(if existed { 204 } else { 201 })
}
