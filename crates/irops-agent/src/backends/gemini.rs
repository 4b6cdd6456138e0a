use super::Recommender;
use crate::config::RecommenderConfig;
use async_trait::async_trait;
use irops_core::{IropsError, IropsResult};
use std::time::Duration;
use tracing::debug;

/// Gemini `generateContent` backend.
pub struct GeminiBackend {
    config: RecommenderConfig,
    http: reqwest::Client,
}

impl GeminiBackend {
    pub fn new(config: RecommenderConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url(),
            self.config.model_id
        )
    }
}

#[async_trait]
impl Recommender for GeminiBackend {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> IropsResult<String> {
        let body = serde_json::json!({
            "contents": [{"parts": [{"text": prompt}]}]
        });

        let resp = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&body)
            .send()
            .await
            .map_err(|e| IropsError::ExternalService(e.to_string()))?;

        let status = resp.status();
        let resp_body: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| IropsError::ExternalService(e.to_string()))?;

        if !status.is_success() {
            return Err(IropsError::ExternalService(format!(
                "Gemini API error {status}: {resp_body}"
            )));
        }

        let text = parse_gemini_response(&resp_body)?;
        debug!(model = %self.config.model_id, chars = text.len(), "Gemini response generated");
        Ok(text)
    }
}

/// Pull `candidates[0].content.parts[0].text` out of a response body.
pub fn parse_gemini_response(body: &serde_json::Value) -> IropsResult<String> {
    body.pointer("/candidates/0/content/parts/0/text")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            IropsError::ExternalService(format!("Gemini response missing text: {body}"))
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_text() {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": "Reroute via ORD"}], "role": "model"}}]
        });
        assert_eq!(parse_gemini_response(&body).unwrap(), "Reroute via ORD");
    }

    #[test]
    fn test_parse_missing_candidates() {
        let err = parse_gemini_response(&json!({"promptFeedback": {}})).unwrap_err();
        assert!(matches!(err, IropsError::ExternalService(_)));
    }

    #[test]
    fn test_endpoint_format() {
        let cfg = RecommenderConfig {
            model_id: "gemini-pro".into(),
            api_base_url: Some("http://localhost:1".into()),
            ..RecommenderConfig::default()
        };
        let backend = GeminiBackend::new(cfg);
        assert_eq!(
            backend.endpoint(),
            "http://localhost:1/v1beta/models/gemini-pro:generateContent"
        );
    }
}
