//! User-facing strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::EditorError;
use crate::types::EditorId;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Vi,
}

/// Localizable messages and placeholders.
///
/// `field_required` may contain `{field}`, replaced with the field's label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    pub not_ready: String,
    pub code_required: String,
    pub field_required: String,
    pub save_failed: String,
    pub summary_placeholder: String,
    pub code_placeholder: String,
    pub edit_label: String,
    pub preview_label: String,
    pub title_label: String,
    pub url_label: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self::english()
    }
}

impl Messages {
    pub fn english() -> Self {
        Self {
            not_ready: "The editor is still loading, please try again in a moment.".into(),
            code_required: "Please enter your solution!".into(),
            field_required: "Please enter the {field}!".into(),
            save_failed: "Your solution could not be prepared for submission. Please try again."
                .into(),
            summary_placeholder: "Summary of the exercise...".into(),
            code_placeholder: "Your solution...".into(),
            edit_label: "Edit".into(),
            preview_label: "Preview".into(),
            title_label: "title".into(),
            url_label: "problem URL".into(),
        }
    }

    pub fn vietnamese() -> Self {
        Self {
            not_ready: "Trình soạn thảo đang khởi tạo, vui lòng thử lại sau giây lát.".into(),
            code_required: "Vui lòng nhập phần giải!".into(),
            field_required: "Vui lòng nhập {field}!".into(),
            save_failed: "Không thể chuẩn bị bài giải để gửi. Vui lòng thử lại.".into(),
            summary_placeholder: "Tóm tắt về bài tập...".into(),
            code_placeholder: "Phần giải bài tập...".into(),
            edit_label: "Soạn thảo".into(),
            preview_label: "Xem trước".into(),
            title_label: "tiêu đề".into(),
            url_label: "đường dẫn bài tập".into(),
        }
    }

    pub fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::En => Self::english(),
            Locale::Vi => Self::vietnamese(),
        }
    }

    /// Replace individual messages by key, e.g. `{"code_required": "..."}`.
    pub fn with_overrides(self, overrides: &BTreeMap<String, String>) -> Self {
        if overrides.is_empty() {
            return self;
        }
        let mut value = match serde_json::to_value(&self) {
            Ok(value) => value,
            Err(err) => {
                tracing::warn!(error = %err, "could not apply message overrides");
                return self;
            }
        };
        if let Some(map) = value.as_object_mut() {
            for (key, text) in overrides {
                if map.contains_key(key) {
                    map.insert(key.clone(), text.clone().into());
                } else {
                    tracing::warn!(key = %key, "ignoring unknown message key");
                }
            }
        }
        match serde_json::from_value(value) {
            Ok(messages) => messages,
            Err(err) => {
                tracing::warn!(error = %err, "could not apply message overrides");
                self
            }
        }
    }

    pub fn placeholder(&self, id: &EditorId) -> &str {
        if *id == EditorId::CODE {
            &self.code_placeholder
        } else {
            &self.summary_placeholder
        }
    }

    pub fn field_label<'a>(&'a self, field: &'a str) -> &'a str {
        match field {
            "title" => &self.title_label,
            "url" => &self.url_label,
            other => other,
        }
    }

    pub fn field_required(&self, field: &str) -> String {
        self.field_required
            .replace("{field}", self.field_label(field))
    }

    /// The text shown to the user for a blocked submission.
    pub fn describe(&self, err: &EditorError) -> String {
        match err {
            EditorError::Validation { message, .. } => message.clone(),
            EditorError::NotReady { .. } | EditorError::MissingTarget { .. } => {
                self.not_ready.clone()
            }
            EditorError::Serialization { .. }
            | EditorError::Platform(_)
            | EditorError::Render(_) => self.save_failed.clone(),
        }
    }
}
