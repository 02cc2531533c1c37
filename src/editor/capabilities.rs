//! Local capabilities the edit session depends on.
//!
//! In the browser these are `localStorage` and `prompt()`. Here they are
//! traits so the session can run from the CLI, against a state file and a
//! terminal, or in tests against in-memory doubles.

use log::debug;
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// String key/value persistence that survives between edit sessions.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Non-persistent store, lost when dropped.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: BTreeMap<String, String>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// JSON object on disk, rewritten on every `set`.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStorage {
    /// Open the state file. A missing file is an empty store; a corrupt one is an error.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let entries = match fs::read_to_string(path) {
            Ok(text) => serde_json::from_str(&text)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("no editor state at {}, starting empty", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries.insert(key.to_string(), value.to_string());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }
}

/// What the session may ask the person editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Question {
    /// Personal access token with read/write access to repository contents.
    Credential,
    /// Repository in `owner/name` form.
    Repository,
}

impl Question {
    pub fn text(self) -> &'static str {
        match self {
            Question::Credential => {
                "Access token (fine-grained personal access token with \
                 \"Contents: Read and write\" permission).\n\
                 It is stored locally for the next session."
            }
            Question::Repository => "Repository (format: owner/name)",
        }
    }
}

/// Asks the person editing for a missing value. `None` means they declined.
pub trait UserPrompt {
    fn ask(&mut self, question: Question) -> Option<String>;
}

/// Prompts on stderr and reads one line from stdin.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl UserPrompt for StdinPrompt {
    fn ask(&mut self, question: Question) -> Option<String> {
        let mut stderr = io::stderr();
        writeln!(stderr, "{}", question.text()).ok()?;
        write!(stderr, "> ").ok()?;
        stderr.flush().ok()?;

        let mut line = String::new();
        io::stdin().lock().read_line(&mut line).ok()?;
        let answer = line.trim();
        (!answer.is_empty()).then(|| answer.to_string())
    }
}

/// Answers prepared in advance; declines anything it has no answer for.
///
/// Backs the CLI's `--token`/`--repo` flags. Every question asked is
/// recorded, answered or not.
#[derive(Debug, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<(Question, String)>,
    asked: Vec<Question>,
}

impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, question: Question, value: impl Into<String>) -> Self {
        self.answers.push_back((question, value.into()));
        self
    }

    pub fn asked(&self) -> &[Question] {
        &self.asked
    }
}

impl UserPrompt for ScriptedPrompt {
    fn ask(&mut self, question: Question) -> Option<String> {
        self.asked.push(question);
        let pos = self.answers.iter().position(|(q, _)| *q == question)?;
        self.answers.remove(pos).map(|(_, answer)| answer)
    }
}
