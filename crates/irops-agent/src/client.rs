use crate::backends::canned::{DisabledRecommender, StaticRecommender};
use crate::backends::gemini::GeminiBackend;
use crate::backends::Recommender;
use crate::config::{RecommenderConfig, RecommenderProvider};
use std::sync::Arc;
use tracing::{info, warn};

/// Prefix of the text returned when the recommender call fails.
pub const UNAVAILABLE_PREFIX: &str = "AI analysis temporarily unavailable";

const EMPTY_RESPONSE: &str = "Unable to generate AI response";

/// Build the configured backend.
///
/// A Gemini provider without an API key degrades to a disabled backend so
/// workers still run and report the placeholder text.
pub fn build_recommender(config: &RecommenderConfig) -> Arc<dyn Recommender> {
    match config.provider {
        RecommenderProvider::Gemini if config.api_key.is_empty() => {
            warn!("GEMINI_API_KEY not set, recommendations disabled");
            Arc::new(DisabledRecommender::new(
                "AI service unavailable - please check configuration",
            ))
        }
        RecommenderProvider::Gemini => {
            info!(model = %config.model_id, "Gemini recommender initialized");
            Arc::new(GeminiBackend::new(config.clone()))
        }
        RecommenderProvider::Static => Arc::new(StaticRecommender::new(config.static_text.clone())),
        RecommenderProvider::Disabled => Arc::new(DisabledRecommender::default()),
    }
}

/// Call the recommender and never fail.
///
/// Errors become `"AI analysis temporarily unavailable: <reason>"`; an empty
/// answer becomes a fixed notice.
pub async fn best_effort(recommender: &dyn Recommender, prompt: &str) -> String {
    match recommender.generate(prompt).await {
        Ok(text) if text.trim().is_empty() => {
            warn!(backend = recommender.name(), "Recommender returned empty response");
            EMPTY_RESPONSE.to_string()
        }
        Ok(text) => text.trim().to_string(),
        Err(e) => {
            warn!(backend = recommender.name(), error = %e, "Recommender call failed");
            format!("{UNAVAILABLE_PREFIX}: {e}")
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_best_effort_trims() {
        let rec = StaticRecommender::new("  Hold departures  \n");
        assert_eq!(best_effort(&rec, "p").await, "Hold departures");
    }

    #[tokio::test]
    async fn test_best_effort_placeholder_on_error() {
        let rec = DisabledRecommender::new("quota exceeded");
        let text = best_effort(&rec, "p").await;
        assert!(text.starts_with(UNAVAILABLE_PREFIX));
        assert!(text.contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_best_effort_empty_answer() {
        let rec = StaticRecommender::new("   ");
        assert_eq!(best_effort(&rec, "p").await, EMPTY_RESPONSE);
    }

    #[test]
    fn test_gemini_without_key_is_disabled() {
        let rec = build_recommender(&RecommenderConfig::default());
        assert_eq!(rec.name(), "disabled");

        let cfg = RecommenderConfig {
            api_key: "k".into(),
            ..RecommenderConfig::default()
        };
        assert_eq!(build_recommender(&cfg).name(), "gemini");
    }
}
