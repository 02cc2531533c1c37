//! Inline content editing.
//!
//! The built page marks every editable piece of text with
//! `data-content="field.path"`. An edit session reads those regions, lets the
//! owner change their text, and publishes the result back to the content
//! document in the site's repository, guarded by the document's revision so
//! concurrent edits are rejected rather than lost.
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | The state machine: load, edit, publish, cancel |
//! | [`page`] | `data-content` regions of a page and the editing rules |
//! | [`remote`] | Compare-and-swap document store: GitHub contents API, in-memory |
//! | [`capabilities`] | Local key/value storage and user prompts |
//! | [`activation`] | The `edit` URL flag |

pub mod activation;
pub mod capabilities;
pub mod page;
pub mod remote;
pub mod session;

pub use activation::{edit_requested, exit_url};
pub use capabilities::{
    FileStorage, KeyValueStore, MemoryStorage, Question, ScriptedPrompt, StdinPrompt, StorageError,
    UserPrompt,
};
pub use page::{
    Clipboard, EditablePage, HtmlPage, KeyAction, Modifiers, PageError, Region, key_action, plain_paste,
};
pub use remote::{
    Credential, GithubStore, MemoryStore, RemoteDocument, RemoteError, RemoteStore, Repository, Revision,
};
pub use session::{
    EditorEnv, EditorSession, EditorSettings, EditorState, OfflineReason, PublishError, Status,
    StatusKind, collect,
};
