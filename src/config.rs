use log::LevelFilter;
use serde::{Deserialize, Serialize};

pub const CONFIG_ELEMENT_ID: &str = "notes-panel-config";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct PanelConfig {
    /// Deprecated storage key holding a pre-sync note.
    pub legacy_note_key: String,
    pub credentials_key: String,
    pub editable_selector: String,
    pub focused_class: String,
    pub log_level: String,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            legacy_note_key: "notes2".to_string(),
            credentials_key: "credentials".to_string(),
            editable_selector: ".ck-editor__editable".to_string(),
            focused_class: "ck-focused".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl PanelConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn with_query(mut self, search: &str) -> Self {
        let level = search
            .trim_start_matches('?')
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "log")
            .map(|(_, value)| value);
        if let Some(level) = level {
            self.log_level = level.to_string();
        }
        self
    }

    pub fn level_filter(&self) -> LevelFilter {
        self.log_level.parse().unwrap_or(LevelFilter::Info)
    }

    pub fn from_document() -> Self {
        let window = leptos::prelude::window();
        let embedded = window
            .document()
            .and_then(|doc| doc.get_element_by_id(CONFIG_ELEMENT_ID))
            .and_then(|el| el.text_content());

        let config = match embedded {
            Some(json) => Self::from_json(&json).unwrap_or_else(|err| {
                log::warn!("ignoring malformed panel config: {err}");
                Self::default()
            }),
            None => Self::default(),
        };
        config.with_query(&window.location().search().unwrap_or_default())
    }
}
