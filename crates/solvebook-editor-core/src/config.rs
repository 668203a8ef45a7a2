//! Editor configuration, loaded from JSON with every key optional.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use solvebook_renderer::RenderOptions;

use crate::autosave::{ClearPolicy, DRAFT_KEY_PREFIX};
use crate::error::ConfigError;
use crate::form::{TITLE_FIELD, URL_FIELD};
use crate::messages::{Locale, Messages};
use crate::timer::DEFAULT_DEBOUNCE;
use crate::types::{EditorId, EngineKind};

pub const MAX_DEBOUNCE_MS: u64 = 60_000;
pub const MIN_AUTOSAVE_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Quiet period before a preview re-render.
    pub debounce_ms: u64,
    pub engine: EngineKind,
    pub locale: Locale,
    /// Per-key replacements applied on top of the locale's messages.
    pub messages: BTreeMap<String, String>,
    pub placeholders: Placeholders,
    /// Plain form inputs that must be filled before submitting.
    pub required_inputs: Vec<SmolStr>,
    pub autosave: AutosaveConfig,
    pub render: RenderOptions,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE.as_millis() as u64,
            engine: EngineKind::default(),
            locale: Locale::default(),
            messages: BTreeMap::new(),
            placeholders: Placeholders::default(),
            required_inputs: vec![SmolStr::new(TITLE_FIELD), SmolStr::new(URL_FIELD)],
            autosave: AutosaveConfig::default(),
            render: RenderOptions::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Placeholders {
    pub summary: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    pub enabled: bool,
    pub interval_ms: u64,
    pub key_prefix: String,
    pub clear_policy: ClearPolicy,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 3000,
            key_prefix: DRAFT_KEY_PREFIX.to_string(),
            clear_policy: ClearPolicy::default(),
        }
    }
}

impl AutosaveConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl EditorConfig {
    /// Parse and validate. An empty string gives the defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_DEBOUNCE_MS).contains(&self.debounce_ms) {
            return Err(ConfigError::Debounce(self.debounce_ms));
        }
        if self.autosave.enabled && self.autosave.interval_ms < MIN_AUTOSAVE_INTERVAL_MS {
            return Err(ConfigError::AutosaveInterval(self.autosave.interval_ms));
        }
        Ok(())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// The locale's messages with configured overrides applied.
    pub fn resolved_messages(&self) -> Messages {
        Messages::for_locale(self.locale).with_overrides(&self.messages)
    }

    /// Placeholder for an editor: an explicit setting wins over the locale's.
    pub fn placeholder(&self, id: &EditorId, messages: &Messages) -> String {
        let configured = match id.as_str() {
            "summary" => self.placeholders.summary.as_deref(),
            "code" => self.placeholders.code.as_deref(),
            _ => None,
        };
        configured
            .unwrap_or_else(|| messages.placeholder(id))
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        assert_eq!(EditorConfig::from_json("").unwrap(), EditorConfig::default());
        assert_eq!(EditorConfig::from_json("{}").unwrap(), EditorConfig::default());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config = EditorConfig::from_json(
            r#"{
                "debounce_ms": 250,
                "engine": "contenteditable",
                "locale": "vi",
                "autosave": { "clear_policy": "on_any_submit" },
                "render": { "allow_raw_html": true }
            }"#,
        )
        .unwrap();
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.engine, EngineKind::ContentEditable);
        assert_eq!(config.autosave.clear_policy, ClearPolicy::OnAnySubmit);
        assert_eq!(config.autosave.interval_ms, 3000);
        assert!(config.render.allow_raw_html);
        assert!(config.render.hard_breaks);
        assert_eq!(config.required_inputs, ["title", "url"]);
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        assert!(matches!(
            EditorConfig::from_json(r#"{"debounce_ms": 0}"#),
            Err(ConfigError::Debounce(0))
        ));
        assert!(matches!(
            EditorConfig::from_json(r#"{"autosave": {"interval_ms": 10}}"#),
            Err(ConfigError::AutosaveInterval(10))
        ));
        // Interval is irrelevant when autosave is off.
        assert!(EditorConfig::from_json(r#"{"autosave": {"enabled": false, "interval_ms": 10}}"#).is_ok());
        assert!(matches!(
            EditorConfig::from_json(r#"{"engine": "monaco"}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn placeholders_fall_back_to_locale() {
        let config = EditorConfig::from_json(
            r#"{"locale": "vi", "placeholders": {"code": "Dán code vào đây"}}"#,
        )
        .unwrap();
        let messages = config.resolved_messages();
        assert_eq!(config.placeholder(&EditorId::CODE, &messages), "Dán code vào đây");
        assert_eq!(
            config.placeholder(&EditorId::SUMMARY, &messages),
            "Tóm tắt về bài tập..."
        );
    }
}
