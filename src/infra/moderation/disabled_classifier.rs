use crate::core::moderation::{ToxicityClassifier, ToxicityScores};
use async_trait::async_trait;

/// Stand-in used when no classifier API key is configured.
/// Never produces a signal, so only the lexical gate applies.
pub struct DisabledClassifier;

#[async_trait]
impl ToxicityClassifier for DisabledClassifier {
    async fn classify(&self, _text: &str) -> Option<ToxicityScores> {
        None
    }
}
