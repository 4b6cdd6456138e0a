use super::Recommender;
use async_trait::async_trait;
use irops_core::{IropsError, IropsResult};

/// Always answers with the same text.
pub struct StaticRecommender {
    text: String,
}

impl StaticRecommender {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

#[async_trait]
impl Recommender for StaticRecommender {
    fn name(&self) -> &str {
        "static"
    }

    async fn generate(&self, _prompt: &str) -> IropsResult<String> {
        Ok(self.text.clone())
    }
}

/// Always fails with `ExternalService`.
pub struct DisabledRecommender {
    reason: String,
}

impl DisabledRecommender {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Default for DisabledRecommender {
    fn default() -> Self {
        Self::new("recommender disabled")
    }
}

#[async_trait]
impl Recommender for DisabledRecommender {
    fn name(&self) -> &str {
        "disabled"
    }

    async fn generate(&self, _prompt: &str) -> IropsResult<String> {
        Err(IropsError::ExternalService(self.reason.clone()))
    }
}
