pub mod canned;
pub mod gemini;

use async_trait::async_trait;
use irops_core::IropsResult;

/// A text-generation capability.
///
/// To add a provider: implement `Recommender` in `backends/`, add a variant to
/// `RecommenderProvider`, and wire it in `build_recommender`.
#[async_trait]
pub trait Recommender: Send + Sync {
    /// Short provider label for logs and status output.
    fn name(&self) -> &str;

    /// Generate free text for `prompt`.
    async fn generate(&self, prompt: &str) -> IropsResult<String>;
}
