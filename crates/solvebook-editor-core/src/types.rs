//! Small shared types.

use std::fmt;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Stable identifier of an editor, one per form field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditorId(SmolStr);

impl EditorId {
    pub const SUMMARY: EditorId = EditorId(SmolStr::new_inline("summary"));
    pub const CODE: EditorId = EditorId(SmolStr::new_inline("code"));

    pub fn new(id: impl AsRef<str>) -> Self {
        Self(SmolStr::new(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Element id of the container an editor mounts into.
    pub fn container(&self) -> SmolStr {
        smol_str::format_smolstr!("{}-editor", self.0)
    }
}

impl fmt::Display for EditorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EditorId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl AsRef<str> for EditorId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Which pane of an editor is showing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Edit,
    Preview,
}

impl ViewMode {
    pub fn toggled(self) -> Self {
        match self {
            ViewMode::Edit => ViewMode::Preview,
            ViewMode::Preview => ViewMode::Edit,
        }
    }
}

/// Editing surface strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    /// A plain `<textarea>`.
    #[default]
    Textarea,
    /// A `contenteditable` element holding plain text.
    ContentEditable,
    /// An in-memory rope, for native hosts and tests.
    Buffer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_follows_id() {
        assert_eq!(EditorId::CODE.container(), "code-editor");
        assert_eq!(EditorId::new("summary"), EditorId::SUMMARY);
    }

    #[test]
    fn engine_names() {
        let engine: EngineKind = serde_json::from_str(r#""contenteditable""#).unwrap();
        assert_eq!(engine, EngineKind::ContentEditable);
        assert_eq!(serde_json::to_string(&EngineKind::Buffer).unwrap(), r#""buffer""#);
    }
}
