//! The edit session state machine.
//!
//! ```text
//! Loading ──► OnlineEditing ◄──────────────────────────┐
//!    │             │ publish                           │
//!    │             ▼                                   │
//!    │         Publishing ──► PublishSucceeded ────────┤
//!    │             │                                   │
//!    │             └────────► PublishFailed ───────────┘ (or OfflineEditing
//!    ▼                                                    without a baseline)
//! OfflineEditing ── publish ──► Publishing ──► …
//! ```
//!
//! All state that the browser editor kept in module globals (baseline
//! document, revision, credential, repository, status line) lives in
//! [`EditorSession`]. Capabilities are passed into each transition through
//! [`EditorEnv`], so the same machine runs from the CLI and in tests.
//!
//! Failures never end the session. A failed load degrades to offline
//! editing; a failed publish leaves the baseline and revision as they were
//! and returns to editing so the user can retry.

use super::activation::exit_url;
use super::capabilities::{KeyValueStore, Question, UserPrompt};
use super::page::{EditablePage, Region};
use super::remote::{Credential, RemoteError, RemoteStore, Repository, Revision};
use crate::config::EditorConfig;
use crate::path::{assign, resolve};
use log::{debug, info, warn};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Loading,
    OfflineEditing,
    OnlineEditing,
    Publishing,
    PublishSucceeded,
    PublishFailed,
}

/// Why the session is editing without a remote baseline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OfflineReason {
    CredentialMissing,
    RepositoryUnconfigured,
    FetchFailed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

/// The toolbar status line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub text: String,
    pub kind: StatusKind,
}

impl Status {
    fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Info,
        }
    }

    fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Success,
        }
    }

    fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            kind: StatusKind::Error,
        }
    }
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("publish cancelled: no access token")]
    CredentialMissing,
    #[error("publish cancelled: repository not configured")]
    RepositoryUnconfigured,
    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// What the session needs from `[editor]` in `site.toml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSettings {
    /// Preconfigured repository; unconfigured means "stored or ask".
    pub repository: Repository,
    pub commit_message: String,
    pub token_key: String,
    pub repo_key: String,
}

impl EditorSettings {
    pub fn from_config(config: &EditorConfig) -> Self {
        Self {
            repository: Repository::new(&config.owner, &config.name),
            commit_message: config.commit_message.clone(),
            token_key: format!("{}-token", config.storage_prefix),
            repo_key: format!("{}-repo", config.storage_prefix),
        }
    }
}

/// Capabilities injected into each transition.
pub struct EditorEnv<'a> {
    pub remote: &'a dyn RemoteStore,
    pub storage: &'a mut dyn KeyValueStore,
    pub prompt: &'a mut dyn UserPrompt,
}

#[derive(Debug)]
pub struct EditorSession {
    settings: EditorSettings,
    state: EditorState,
    status: Status,
    offline_reason: Option<OfflineReason>,
    credential: Option<Credential>,
    repository: Option<Repository>,
    baseline: Option<Value>,
    revision: Option<Revision>,
    transitions: Vec<EditorState>,
}

impl EditorSession {
    /// Run `Loading` and settle in online or offline editing.
    ///
    /// The page becomes editable either way.
    pub fn start(settings: EditorSettings, env: &mut EditorEnv<'_>, page: &mut dyn EditablePage) -> Self {
        let mut session = Self {
            settings,
            state: EditorState::Loading,
            status: Status::info("Loading content..."),
            offline_reason: None,
            credential: None,
            repository: None,
            baseline: None,
            revision: None,
            transitions: vec![EditorState::Loading],
        };

        match session.load(env) {
            Ok(()) => {
                session.status = Status::info("Edit mode");
                session.enter(EditorState::OnlineEditing);
            }
            Err(reason) => {
                warn!("editing offline: {reason:?}");
                session.status = match &reason {
                    OfflineReason::CredentialMissing => {
                        Status::info("Edit mode (offline: changes will not be published)")
                    }
                    OfflineReason::RepositoryUnconfigured => {
                        Status::info("Edit mode (offline: repository not configured)")
                    }
                    OfflineReason::FetchFailed(message) => {
                        Status::error(format!("Failed to load: {message} (offline editing)"))
                    }
                };
                session.offline_reason = Some(reason);
                session.enter(EditorState::OfflineEditing);
            }
        }
        page.enable_editing();
        session
    }

    fn load(&mut self, env: &mut EditorEnv<'_>) -> Result<(), OfflineReason> {
        let credential = self.credential(env).ok_or(OfflineReason::CredentialMissing)?;
        let repository = self.repository(env).ok_or(OfflineReason::RepositoryUnconfigured)?;
        let document = env
            .remote
            .fetch(&credential, &repository)
            .map_err(|e| OfflineReason::FetchFailed(e.to_string()))?;
        info!("loaded content at revision {}", document.revision);
        self.baseline = Some(document.content);
        self.revision = Some(document.revision);
        Ok(())
    }

    /// Collect the page into a snapshot and commit it over the current remote revision.
    ///
    /// The remote document is re-fetched first so the write is guarded by the
    /// newest revision. Only an accepted write replaces the baseline.
    pub fn publish(&mut self, env: &mut EditorEnv<'_>, page: &dyn EditablePage) -> Result<Revision, PublishError> {
        let Some(credential) = self.credential(env) else {
            self.status = Status::error(PublishError::CredentialMissing.to_string());
            return Err(PublishError::CredentialMissing);
        };
        let Some(repository) = self.repository(env) else {
            self.status = Status::error(PublishError::RepositoryUnconfigured.to_string());
            return Err(PublishError::RepositoryUnconfigured);
        };

        self.enter(EditorState::Publishing);
        self.status = Status::info("Publishing...");

        match self.commit(env.remote, &credential, &repository, page) {
            Ok((snapshot, revision)) => {
                info!("published {repository} at revision {revision}");
                self.baseline = Some(snapshot);
                self.revision = Some(revision.clone());
                self.offline_reason = None;
                self.status = Status::success("Published. The site updates in about a minute.");
                self.enter(EditorState::PublishSucceeded);
                self.enter(EditorState::OnlineEditing);
                Ok(revision)
            }
            Err(e) => {
                warn!("publish to {repository} failed: {e}");
                self.status = Status::error(format!("Error: {e}"));
                self.enter(EditorState::PublishFailed);
                self.enter(self.resting_state());
                Err(e.into())
            }
        }
    }

    fn commit(
        &self,
        remote: &dyn RemoteStore,
        credential: &Credential,
        repository: &Repository,
        page: &dyn EditablePage,
    ) -> Result<(Value, Revision), RemoteError> {
        let fresh = remote.fetch(credential, repository)?;
        let snapshot = collect(&fresh.content, &page.regions());
        let revision = remote.compare_and_swap(
            credential,
            repository,
            &fresh.revision,
            &snapshot,
            &self.settings.commit_message,
        )?;
        Ok((snapshot, revision))
    }

    /// Discard all edits and leave edit mode. Returns the URL to navigate to.
    pub fn cancel(self, page_url: &str) -> String {
        debug!("edit session cancelled in state {:?}", self.state);
        exit_url(page_url)
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn offline_reason(&self) -> Option<&OfflineReason> {
        self.offline_reason.as_ref()
    }

    pub fn baseline(&self) -> Option<&Value> {
        self.baseline.as_ref()
    }

    pub fn revision(&self) -> Option<&Revision> {
        self.revision.as_ref()
    }

    pub fn repository_in_use(&self) -> Option<&Repository> {
        self.repository.as_ref()
    }

    /// Every state entered so far, starting with `Loading`.
    pub fn transitions(&self) -> &[EditorState] {
        &self.transitions
    }

    pub fn publish_enabled(&self) -> bool {
        self.state != EditorState::Publishing
    }

    fn enter(&mut self, state: EditorState) {
        debug!("editor {:?} -> {:?}", self.state, state);
        self.state = state;
        self.transitions.push(state);
    }

    fn resting_state(&self) -> EditorState {
        if self.baseline.is_some() {
            EditorState::OnlineEditing
        } else {
            EditorState::OfflineEditing
        }
    }

    /// Stored credential, else ask. A new answer is stored for next time.
    fn credential(&mut self, env: &mut EditorEnv<'_>) -> Option<Credential> {
        if let Some(credential) = &self.credential {
            return Some(credential.clone());
        }
        let credential = match env.storage.get(&self.settings.token_key) {
            Some(stored) if !stored.trim().is_empty() => Credential::new(stored.trim()),
            _ => {
                let answer = env.prompt.ask(Question::Credential)?;
                let answer = answer.trim();
                if answer.is_empty() {
                    return None;
                }
                if let Err(e) = env.storage.set(&self.settings.token_key, answer) {
                    warn!("could not store access token: {e}");
                }
                Credential::new(answer)
            }
        };
        self.credential = Some(credential.clone());
        Some(credential)
    }

    /// Configured repository, else the stored record, else ask.
    fn repository(&mut self, env: &mut EditorEnv<'_>) -> Option<Repository> {
        if let Some(repository) = &self.repository {
            return Some(repository.clone());
        }
        let repository = if self.settings.repository.is_configured() {
            self.settings.repository.clone()
        } else if let Some(stored) = env
            .storage
            .get(&self.settings.repo_key)
            .and_then(|raw| serde_json::from_str::<Repository>(&raw).ok())
            .filter(Repository::is_configured)
        {
            stored
        } else {
            let repository = env.prompt.ask(Question::Repository).and_then(|a| Repository::parse(&a))?;
            match serde_json::to_string(&repository) {
                Ok(record) => {
                    if let Err(e) = env.storage.set(&self.settings.repo_key, &record) {
                        warn!("could not store repository: {e}");
                    }
                }
                Err(e) => warn!("could not store repository: {e}"),
            }
            repository
        };
        self.repository = Some(repository.clone());
        Some(repository)
    }
}

/// Fold region text back into a copy of `baseline`.
///
/// A region overwrites its path only when the baseline value there is a
/// string or missing, so editing the rendered text of a number, list or
/// mapping never replaces it with a string. Text is trimmed. Regions are
/// applied in order; the last region for a path wins.
pub fn collect(baseline: &Value, regions: &[Region]) -> Value {
    let mut content = baseline.clone();
    for region in regions {
        match resolve(baseline, &region.path) {
            None | Some(Value::String(_)) => {
                let text = Value::String(region.text.trim().to_string());
                if let Err(e) = assign(&mut content, &region.path, text) {
                    warn!("skipping region '{}': {e}", region.path);
                }
            }
            Some(_) => debug!("keeping non-string value at '{}'", region.path),
        }
    }
    content
}
