// =============================================================================
// PERSPECTIVE CLIENT - toxicity scoring over HTTP
// =============================================================================
//
// Implements `ToxicityClassifier` against a Perspective-style
// `comments:analyze` endpoint.
//
// **Request:** `POST {endpoint}?key=API_KEY` with the comment text and the
// four requested attributes (TOXICITY, INSULT, PROFANITY, THREAT).
// **Response:** each score lives at `attributeScores.<ATTR>.summaryScore.value`.
//
// Any failure (timeout, auth, quota, bad JSON) is logged and reported as
// `None` so moderation carries on without a toxicity signal.
//
// **Environment Variables:**
// - `PERSPECTIVE_API_KEY` - API key; without it the classifier is disabled
// - `PERSPECTIVE_ENDPOINT` - override for the analyze URL
// - `CLASSIFIER_TIMEOUT_SECS` - request timeout

use crate::core::moderation::{should_skip_classification, ToxicityClassifier, ToxicityScores};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::time::Duration;

pub const DEFAULT_PERSPECTIVE_ENDPOINT: &str =
    "https://commentanalyzer.googleapis.com/v1alpha1/comments:analyze";

const REQUESTED_ATTRIBUTES: [&str; 4] = ["TOXICITY", "INSULT", "PROFANITY", "THREAT"];

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
struct AnalyzeResponse {
    attribute_scores: HashMap<String, AttributeScore>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttributeScore {
    summary_score: SummaryScore,
}

#[derive(Debug, Deserialize)]
struct SummaryScore {
    value: f64,
}

impl AnalyzeResponse {
    /// Missing attributes count as 0; values are clamped to [0, 1].
    fn into_scores(self) -> ToxicityScores {
        let score = |name: &str| {
            self.attribute_scores
                .get(name)
                .map(|a| a.summary_score.value)
                .filter(|v| v.is_finite())
                .unwrap_or(0.0)
                .clamp(0.0, 1.0)
        };

        ToxicityScores {
            toxicity: score("TOXICITY"),
            insult: score("INSULT"),
            profanity: score("PROFANITY"),
            threat: score("THREAT"),
        }
    }
}

pub struct PerspectiveClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl PerspectiveClient {
    /// Create a client whose requests give up after `timeout`.
    pub fn new(
        api_key: String,
        endpoint: String,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            endpoint,
        })
    }

    async fn analyze(&self, text: &str) -> Result<ToxicityScores, Box<dyn Error + Send + Sync>> {
        let requested: serde_json::Map<String, serde_json::Value> = REQUESTED_ATTRIBUTES
            .iter()
            .map(|attr| (attr.to_string(), json!({})))
            .collect();

        let payload = json!({
            "comment": { "text": text },
            "languages": ["en"],
            "requestedAttributes": requested,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", &self.api_key)])
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Perspective API error: {} - {}", status, body).into());
        }

        let parsed: AnalyzeResponse = response.json().await?;
        Ok(parsed.into_scores())
    }
}

#[async_trait]
impl ToxicityClassifier for PerspectiveClient {
    async fn classify(&self, text: &str) -> Option<ToxicityScores> {
        if should_skip_classification(text) {
            tracing::debug!("Text not worth classifying, skipping Perspective call");
            return None;
        }

        match self.analyze(text).await {
            Ok(scores) => {
                tracing::debug!(
                    toxicity = scores.toxicity,
                    insult = scores.insult,
                    profanity = scores.profanity,
                    threat = scores.threat,
                    "Perspective scores"
                );
                Some(scores)
            }
            Err(e) => {
                tracing::warn!("Toxicity classification failed, continuing without it: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scores() {
        let body = r#"{
            "attributeScores": {
                "TOXICITY": { "summaryScore": { "value": 0.91, "type": "PROBABILITY" } },
                "INSULT": { "summaryScore": { "value": 0.12 } },
                "THREAT": { "summaryScore": { "value": 1.7 } }
            },
            "languages": ["en"]
        }"#;

        let parsed: AnalyzeResponse = serde_json::from_str(body).unwrap();
        let scores = parsed.into_scores();

        assert_eq!(scores.toxicity, 0.91);
        assert_eq!(scores.insult, 0.12);
        // Missing attribute
        assert_eq!(scores.profanity, 0.0);
        // Out-of-range value is clamped
        assert_eq!(scores.threat, 1.0);
    }

    #[test]
    fn test_empty_response_means_zero_scores() {
        let parsed: AnalyzeResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed.into_scores(), ToxicityScores::default());
    }

    #[tokio::test]
    async fn test_skippable_text_never_opens_a_connection() {
        // A listener that never answers; any request would sit on it until the timeout
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.set_nonblocking(true).unwrap();
        let endpoint = format!(
            "http://{}/v1alpha1/comments:analyze",
            listener.local_addr().unwrap()
        );
        let client =
            PerspectiveClient::new("test-key".to_string(), endpoint, Duration::from_secs(1))
                .unwrap();

        for text in ["", "hey", "aaaaaa", "noooooo way this is real"] {
            assert!(client.classify(text).await.is_none());
        }
        assert!(matches!(
            listener.accept(),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock
        ));

        // A real sentence does reach the endpoint (and times out, failing open)
        assert!(client
            .classify("someone called pretending to be my bank")
            .await
            .is_none());
        assert!(listener.accept().is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_open() {
        // Nothing listens on the discard port
        let client = PerspectiveClient::new(
            "test-key".to_string(),
            "http://127.0.0.1:9/v1alpha1/comments:analyze".to_string(),
            Duration::from_secs(2),
        )
        .unwrap();

        let result = client
            .classify("someone called pretending to be my bank")
            .await;
        assert!(result.is_none());
    }
}
