//! Periodic draft snapshots in a local key-value store.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use web_time::{SystemTime, UNIX_EPOCH};

use crate::error::PlatformError;
use crate::registry::EditorRegistry;
use crate::types::EditorId;

pub const DRAFT_KEY_PREFIX: &str = "solvebook_draft:";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftSnapshot {
    pub content: String,
    pub saved_at_ms: u64,
}

/// Which page a draft belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftScope {
    New,
    Edit(SmolStr),
}

impl fmt::Display for DraftScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DraftScope::New => f.write_str("new"),
            DraftScope::Edit(id) => write!(f, "edit:{id}"),
        }
    }
}

impl DraftScope {
    pub fn draft_key(&self, prefix: &str, editor: &EditorId) -> String {
        format!("{prefix}{self}:{editor}")
    }
}

pub trait DraftStore {
    fn load(&self, key: &str) -> Result<Option<DraftSnapshot>, PlatformError>;
    fn save(&self, key: &str, snapshot: &DraftSnapshot) -> Result<(), PlatformError>;
    fn remove(&self, key: &str);
}

/// Keeps drafts as JSON strings, the way browser storage would.
#[derive(Debug, Clone, Default)]
pub struct MemoryDraftStore {
    entries: Rc<RefCell<BTreeMap<String, String>>>,
}

impl MemoryDraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    pub fn insert_raw(&self, key: &str, value: &str) {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }
}

impl DraftStore for MemoryDraftStore {
    fn load(&self, key: &str) -> Result<Option<DraftSnapshot>, PlatformError> {
        let entries = self.entries.borrow();
        let Some(raw) = entries.get(key) else {
            return Ok(None);
        };
        serde_json::from_str(raw)
            .map(Some)
            .map_err(|err| PlatformError(format!("corrupt draft `{key}`: {err}")))
    }

    fn save(&self, key: &str, snapshot: &DraftSnapshot) -> Result<(), PlatformError> {
        let raw = serde_json::to_string(snapshot)
            .map_err(|err| PlatformError(format!("could not encode draft: {err}")))?;
        self.entries.borrow_mut().insert(key.to_string(), raw);
        Ok(())
    }

    fn remove(&self, key: &str) {
        self.entries.borrow_mut().remove(key);
    }
}

/// When saved drafts are discarded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClearPolicy {
    Never,
    /// After a successful submission from the create page only.
    #[default]
    OnCreateSubmit,
    OnAnySubmit,
}

impl ClearPolicy {
    pub fn clears(self, scope: &DraftScope) -> bool {
        match self {
            ClearPolicy::Never => false,
            ClearPolicy::OnCreateSubmit => *scope == DraftScope::New,
            ClearPolicy::OnAnySubmit => true,
        }
    }
}

pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

pub struct Autosaver {
    store: Box<dyn DraftStore>,
    scope: DraftScope,
    prefix: String,
    policy: ClearPolicy,
    /// Last value written per editor.
    saved: BTreeMap<EditorId, String>,
}

impl fmt::Debug for Autosaver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Autosaver")
            .field("scope", &self.scope)
            .field("prefix", &self.prefix)
            .field("policy", &self.policy)
            .field("tracked", &self.saved.len())
            .finish()
    }
}

impl Autosaver {
    pub fn new(
        store: Box<dyn DraftStore>,
        scope: DraftScope,
        prefix: impl Into<String>,
        policy: ClearPolicy,
    ) -> Self {
        Self {
            store,
            scope,
            prefix: prefix.into(),
            policy,
            saved: BTreeMap::new(),
        }
    }

    pub fn scope(&self) -> &DraftScope {
        &self.scope
    }

    pub fn key(&self, editor: &EditorId) -> String {
        self.scope.draft_key(&self.prefix, editor)
    }

    /// Put saved drafts into editors that are still empty. Returns the ids
    /// that were restored.
    pub fn restore(&mut self, editors: &mut EditorRegistry) -> Vec<EditorId> {
        let mut restored = Vec::new();
        for editor in editors.iter_mut() {
            let key = self.key(editor.id());
            if !editor.is_attached() || !editor.value().is_empty() {
                continue;
            }
            match self.store.load(&key) {
                Ok(Some(draft)) if !draft.content.is_empty() => {
                    tracing::debug!(editor = %editor.id(), saved_at = draft.saved_at_ms, "restoring draft");
                    self.saved.insert(editor.id().clone(), draft.content.clone());
                    editor.set_value(draft.content);
                    restored.push(editor.id().clone());
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(key = %key, error = %err, "dropping unreadable draft");
                    self.store.remove(&key);
                }
            }
        }
        restored
    }

    /// Write every editor whose value changed since the last tick. An empty
    /// editor removes its draft.
    pub fn tick(&mut self, editors: &EditorRegistry, saved_at_ms: u64) -> usize {
        let mut written = 0;
        for editor in editors.iter().filter(|e| e.is_attached()) {
            let value = editor.value();
            let unchanged = match self.saved.get(editor.id()) {
                Some(last) => last == value,
                None => value.is_empty(),
            };
            if unchanged {
                continue;
            }
            let key = self.key(editor.id());
            if value.is_empty() {
                self.store.remove(&key);
            } else {
                let snapshot = DraftSnapshot {
                    content: value.to_string(),
                    saved_at_ms,
                };
                if let Err(err) = self.store.save(&key, &snapshot) {
                    tracing::warn!(key = %key, error = %err, "could not save draft");
                    continue;
                }
            }
            self.saved.insert(editor.id().clone(), value.to_string());
            written += 1;
        }
        if written > 0 {
            tracing::debug!(written, "drafts saved");
        }
        written
    }

    /// A submission went through; clear drafts if the policy says so.
    pub fn on_submitted(&mut self, editors: impl IntoIterator<Item = EditorId>) {
        if !self.policy.clears(&self.scope) {
            return;
        }
        for id in editors {
            let key = self.key(&id);
            self.store.remove(&key);
            self.saved.remove(&id);
        }
        tracing::debug!(scope = %self.scope, "drafts cleared after submission");
    }
}
