//! The hosted content document and its revision tag.
//!
//! [`RemoteStore`] is a compare-and-swap over one file: `fetch` returns the
//! document together with an opaque [`Revision`], and `compare_and_swap`
//! writes a new document only if the stored revision still equals the one
//! the caller read. A concurrent writer therefore surfaces as
//! [`RemoteError::Conflict`] instead of being silently overwritten.
//!
//! Two implementations:
//!
//! - [`GithubStore`]: the GitHub contents API (`GET`/`PUT
//!   /repos/{owner}/{repo}/contents/{path}`), where the revision is the file's
//!   blob `sha` and content travels base64-encoded.
//! - [`MemoryStore`]: an in-process store for dry runs and tests, whose
//!   revision is the SHA-256 of the stored document.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use log::info;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::cell::RefCell;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("not authorized ({status}): {message}")]
    Auth { status: u16, message: String },
    #[error("content was changed by someone else: {message}")]
    Conflict { message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("remote error ({status}): {message}")]
    Remote { status: u16, message: String },
    #[error("unreadable remote content: {0}")]
    Decode(String),
}

/// Write credential for the remote store.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Repository identifier, persisted by the editor as `{"owner": …, "name": …}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    pub owner: String,
    pub name: String,
}

impl Repository {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/name`. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Option<Self> {
        let (owner, name) = input.trim().split_once('/')?;
        let repo = Self::new(owner.trim(), name.trim());
        repo.is_configured().then_some(repo)
    }

    pub fn is_configured(&self) -> bool {
        !self.owner.is_empty() && !self.name.is_empty()
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Opaque version tag of the remote document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision(String);

impl Revision {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The document as last read, with the revision a write must name.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    pub content: Value,
    pub revision: Revision,
}

pub trait RemoteStore {
    fn fetch(&self, credential: &Credential, repo: &Repository) -> Result<RemoteDocument, RemoteError>;

    /// Replace the document if its revision is still `expected`.
    ///
    /// Returns the revision of the newly written document.
    fn compare_and_swap(
        &self,
        credential: &Credential,
        repo: &Repository,
        expected: &Revision,
        content: &Value,
        message: &str,
    ) -> Result<Revision, RemoteError>;
}

/// Serialize a document the way it is committed: two-space pretty JSON, base64.
pub fn encode_content(content: &Value) -> Result<String, RemoteError> {
    let json = serde_json::to_string_pretty(content).map_err(|e| RemoteError::Decode(e.to_string()))?;
    Ok(STANDARD.encode(json.as_bytes()))
}

/// Decode base64 file content as returned by the contents API.
///
/// The API wraps the base64 text at 60 columns, so whitespace is dropped first.
pub fn decode_content(encoded: &str) -> Result<Value, RemoteError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| RemoteError::Decode(format!("base64: {e}")))?;
    let text = String::from_utf8(bytes).map_err(|e| RemoteError::Decode(format!("utf-8: {e}")))?;
    serde_json::from_str(&text).map_err(|e| RemoteError::Decode(format!("json: {e}")))
}

// ============================================================================
// GitHub contents API
// ============================================================================

#[derive(Deserialize)]
struct ContentsResponse {
    content: String,
    sha: String,
}

#[derive(Serialize)]
struct UpdateRequest<'a> {
    message: &'a str,
    content: String,
    sha: &'a str,
}

#[derive(Deserialize)]
struct UpdateResponse {
    content: UpdatedFile,
}

#[derive(Deserialize)]
struct UpdatedFile {
    sha: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

pub struct GithubStore {
    client: Client,
    api_base: String,
    content_path: String,
}

impl GithubStore {
    pub fn new(api_base: &str, content_path: &str) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .user_agent(concat!("simple-page/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::Network(e.to_string()))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            content_path: content_path.trim_start_matches('/').to_string(),
        })
    }

    pub fn contents_url(&self, repo: &Repository) -> String {
        format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base, repo.owner, repo.name, self.content_path
        )
    }
}

/// Map a non-2xx response to the error the editor reports.
fn classify_failure(status: StatusCode, body: &str) -> RemoteError {
    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
    match status.as_u16() {
        401 | 403 => RemoteError::Auth {
            status: status.as_u16(),
            message,
        },
        409 | 412 | 422 => RemoteError::Conflict { message },
        code => RemoteError::Remote {
            status: code,
            message,
        },
    }
}

fn network(e: reqwest::Error) -> RemoteError {
    RemoteError::Network(e.to_string())
}

impl RemoteStore for GithubStore {
    fn fetch(&self, credential: &Credential, repo: &Repository) -> Result<RemoteDocument, RemoteError> {
        let url = self.contents_url(repo);
        info!("fetching {url}");
        let resp = self
            .client
            .get(&url)
            .bearer_auth(credential.secret())
            .header("Accept", "application/vnd.github.v3+json")
            .send()
            .map_err(network)?;
        let status = resp.status();
        let body = resp.text().map_err(network)?;
        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        let file: ContentsResponse =
            serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(RemoteDocument {
            content: decode_content(&file.content)?,
            revision: Revision::new(file.sha),
        })
    }

    fn compare_and_swap(
        &self,
        credential: &Credential,
        repo: &Repository,
        expected: &Revision,
        content: &Value,
        message: &str,
    ) -> Result<Revision, RemoteError> {
        let url = self.contents_url(repo);
        info!("committing {url} over revision {expected}");
        let request = UpdateRequest {
            message,
            content: encode_content(content)?,
            sha: expected.as_str(),
        };
        let resp = self
            .client
            .put(&url)
            .bearer_auth(credential.secret())
            .header("Accept", "application/vnd.github.v3+json")
            .json(&request)
            .send()
            .map_err(network)?;
        let status = resp.status();
        let body = resp.text().map_err(network)?;
        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        let updated: UpdateResponse =
            serde_json::from_str(&body).map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(Revision::new(updated.content.sha))
    }
}

// ============================================================================
// In-memory store
// ============================================================================

#[derive(Debug)]
struct MemoryState {
    content: Value,
    revision: Revision,
    credential: Option<String>,
    write_after_fetch: Option<Value>,
    offline: bool,
    fetches: usize,
    writes: usize,
}

/// Single-document store held in memory.
///
/// Optionally requires a specific credential, can drop off the network, and
/// can simulate a second editor committing between our fetch and our write.
#[derive(Debug)]
pub struct MemoryStore {
    state: RefCell<MemoryState>,
}

/// SHA-256 of the committed (pretty JSON) form of the document.
pub fn revision_of(content: &Value) -> Revision {
    let json = serde_json::to_string_pretty(content).unwrap_or_default();
    Revision::new(format!("{:x}", Sha256::digest(json.as_bytes())))
}

impl MemoryStore {
    pub fn new(content: Value) -> Self {
        let revision = revision_of(&content);
        Self {
            state: RefCell::new(MemoryState {
                content,
                revision,
                credential: None,
                write_after_fetch: None,
                offline: false,
                fetches: 0,
                writes: 0,
            }),
        }
    }

    /// Reject every call whose credential differs from `secret`.
    pub fn require_credential(self, secret: &str) -> Self {
        self.state.borrow_mut().credential = Some(secret.to_string());
        self
    }

    /// Commit `content` as another editor right after the next fetch returns.
    pub fn write_after_next_fetch(&self, content: Value) {
        self.state.borrow_mut().write_after_fetch = Some(content);
    }

    /// Commit `content` as another editor now.
    pub fn replace(&self, content: Value) {
        let mut state = self.state.borrow_mut();
        state.revision = revision_of(&content);
        state.content = content;
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.borrow_mut().offline = offline;
    }

    pub fn content(&self) -> Value {
        self.state.borrow().content.clone()
    }

    pub fn revision(&self) -> Revision {
        self.state.borrow().revision.clone()
    }

    pub fn fetches(&self) -> usize {
        self.state.borrow().fetches
    }

    pub fn writes(&self) -> usize {
        self.state.borrow().writes
    }

    fn admit(&self, credential: &Credential) -> Result<(), RemoteError> {
        let state = self.state.borrow();
        if state.offline {
            return Err(RemoteError::Network("store is offline".to_string()));
        }
        match &state.credential {
            Some(expected) if expected != credential.secret() => Err(RemoteError::Auth {
                status: 401,
                message: "Bad credentials".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl RemoteStore for MemoryStore {
    fn fetch(&self, credential: &Credential, _repo: &Repository) -> Result<RemoteDocument, RemoteError> {
        self.admit(credential)?;
        let document = {
            let mut state = self.state.borrow_mut();
            state.fetches += 1;
            RemoteDocument {
                content: state.content.clone(),
                revision: state.revision.clone(),
            }
        };
        let pending = self.state.borrow_mut().write_after_fetch.take();
        if let Some(content) = pending {
            self.replace(content);
        }
        Ok(document)
    }

    fn compare_and_swap(
        &self,
        credential: &Credential,
        _repo: &Repository,
        expected: &Revision,
        content: &Value,
        _message: &str,
    ) -> Result<Revision, RemoteError> {
        self.admit(credential)?;
        let mut state = self.state.borrow_mut();
        if &state.revision != expected {
            return Err(RemoteError::Conflict {
                message: format!("is at {} but {} was expected", state.revision, expected),
            });
        }
        state.content = content.clone();
        state.revision = revision_of(content);
        state.writes += 1;
        Ok(state.revision.clone())
    }
}
