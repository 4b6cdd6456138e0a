use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecommenderProvider {
    /// Google Gemini `generateContent` REST API.
    #[default]
    Gemini,
    /// Fixed text, no network. Useful for demos and tests.
    Static,
    /// Every call fails; workers fall back to the placeholder text.
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommenderConfig {
    #[serde(default)]
    pub provider: RecommenderProvider,
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub api_base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Text returned by the static provider.
    #[serde(default = "default_static_text")]
    pub static_text: String,
}

fn default_model_id() -> String {
    "gemini-2.0-flash-exp".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_static_text() -> String {
    "Follow standard operating procedures for this disruption.".to_string()
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            provider: RecommenderProvider::default(),
            model_id: default_model_id(),
            api_key: String::new(),
            api_base_url: None,
            timeout_secs: default_timeout_secs(),
            static_text: default_static_text(),
        }
    }
}

impl RecommenderConfig {
    pub fn base_url(&self) -> &str {
        match &self.api_base_url {
            Some(url) => url.trim_end_matches('/'),
            None => "https://generativelanguage.googleapis.com",
        }
    }

    /// Apply `GEMINI_API_KEY` / `GEMINI_MODEL_NAME` from the environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var("GEMINI_API_KEY").ok(),
            std::env::var("GEMINI_MODEL_NAME").ok(),
        );
    }

    fn apply_overrides(&mut self, api_key: Option<String>, model: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.is_empty()) {
            self.api_key = key;
        }
        if let Some(model) = model.filter(|m| !m.is_empty()) {
            self.model_id = model;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let cfg: RecommenderConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.provider, RecommenderProvider::Gemini);
        assert_eq!(cfg.model_id, "gemini-2.0-flash-exp");
        assert_eq!(cfg.timeout_secs, 30);
        assert_eq!(cfg.base_url(), "https://generativelanguage.googleapis.com");
    }

    #[test]
    fn test_custom_base_url_trims_slash() {
        let cfg: RecommenderConfig = toml::from_str(
            r#"
            provider = "static"
            api_base_url = "http://127.0.0.1:9999/"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.provider, RecommenderProvider::Static);
        assert_eq!(cfg.base_url(), "http://127.0.0.1:9999");
    }

    #[test]
    fn test_env_overrides_ignore_empty() {
        let mut cfg = RecommenderConfig::default();
        cfg.apply_overrides(Some("secret".into()), Some(String::new()));
        assert_eq!(cfg.api_key, "secret");
        assert_eq!(cfg.model_id, "gemini-2.0-flash-exp");
    }
}
