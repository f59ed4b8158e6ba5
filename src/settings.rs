//! User settings stored as settings.json in the app data directory

use crate::constants::*;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Window geometry
    pub window_x: Option<f32>,
    pub window_y: Option<f32>,
    pub window_w: Option<f32>,
    pub window_h: Option<f32>,

    // Server
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub system_prompt: String,

    // Canvas
    pub node_width: f32,
    pub show_grid: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            window_x: None,
            window_y: None,
            window_w: None,
            window_h: None,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: None,
            system_prompt: "You are a helpful assistant.".to_string(),
            node_width: NODE_DEFAULT_WIDTH,
            show_grid: true,
        }
    }
}

impl Settings {
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join("settings.json");
        match std::fs::read_to_string(&path) {
            Ok(s) => match serde_json::from_str(&s) {
                Ok(settings) => {
                    debug!(path = %path.display(), "Settings loaded");
                    settings
                }
                Err(e) => {
                    warn!(error = %e, "Failed to parse settings, using defaults");
                    Self::default()
                }
            },
            Err(_) => {
                debug!("No settings file found, using defaults");
                Self::default()
            }
        }
    }

    pub fn save(&self, data_dir: &Path) {
        let path = data_dir.join("settings.json");
        match serde_json::to_string_pretty(self) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    warn!(error = %e, "Failed to save settings");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize settings"),
        }
    }

    /// Environment overrides for endpoint and model
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = lookup(ENDPOINT_ENV).filter(|v| !v.trim().is_empty()) {
            info!(endpoint = %endpoint, "Endpoint overridden from environment");
            self.endpoint = endpoint;
        }
        if let Some(model) = lookup(MODEL_ENV).filter(|v| !v.trim().is_empty()) {
            info!(model = %model, "Model overridden from environment");
            self.model = model;
        }
    }

    /// Clamp values edited by hand in settings.json
    pub fn sanitized(mut self) -> Self {
        self.temperature = if self.temperature.is_finite() {
            self.temperature.clamp(0.0, 2.0)
        } else {
            Self::default().temperature
        };
        self.node_width = self.node_width.max(NODE_MIN_WIDTH);
        if self.endpoint.trim().is_empty() {
            self.endpoint = DEFAULT_ENDPOINT.to_string();
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("chat-canvas-{}-{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn save_then_load_keeps_values() {
        let dir = temp_dir("roundtrip");
        let settings = Settings {
            model: "qwen".into(),
            max_tokens: Some(512),
            ..Default::default()
        };
        settings.save(&dir);
        assert_eq!(Settings::load(&dir), settings);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let dir = temp_dir("partial");
        std::fs::write(dir.join("settings.json"), r#"{"model":"llama"}"#).unwrap();
        let loaded = Settings::load(&dir);
        assert_eq!(loaded.model, "llama");
        assert_eq!(loaded.endpoint, DEFAULT_ENDPOINT);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn corrupt_file_gives_defaults() {
        let dir = temp_dir("corrupt");
        std::fs::write(dir.join("settings.json"), "{{{").unwrap();
        assert_eq!(Settings::load(&dir), Settings::default());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn env_overrides_endpoint_and_model() {
        let mut settings = Settings::default();
        settings.apply_env(|key| match key {
            ENDPOINT_ENV => Some("http://localhost:11434/v1/chat/completions".into()),
            MODEL_ENV => Some("  ".into()),
            _ => None,
        });
        assert_eq!(settings.endpoint, "http://localhost:11434/v1/chat/completions");
        assert_eq!(settings.model, DEFAULT_MODEL);
    }

    #[test]
    fn sanitize_clamps_values() {
        let s = Settings {
            temperature: 9.0,
            node_width: 3.0,
            endpoint: " ".into(),
            ..Default::default()
        }
        .sanitized();
        assert_eq!(s.temperature, 2.0);
        assert_eq!(s.node_width, NODE_MIN_WIDTH);
        assert_eq!(s.endpoint, DEFAULT_ENDPOINT);
    }
}
