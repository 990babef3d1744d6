// src/services/ai_service.rs
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::{sync::Arc, time::Duration};
use thiserror::Error;
use tracing;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

const DEFAULT_REPLY: &str = "I'm here to help with rides, deliveries and your wallet. \
Could you tell me a bit more about what you need?";

// Keywords shorter than this only match whole words
const PREFIX_MATCH_MIN_LEN: usize = 5;

/// Checked in order, so safety questions win over everything else.
const KEYWORD_REPLIES: &[(&[&str], &str)] = &[
    (
        &["emergency", "unsafe", "danger", "accident", "safety", "sos"],
        "Your safety comes first. Use the SOS button to share your trip with your emergency contacts, \
or call 112 for immediate help.",
    ),
    (
        &["cancel"],
        "You can cancel a ride for free until the trip starts. Open your current ride and tap Cancel.",
    ),
    (
        &["fare", "fares", "price", "cost", "costs", "how much", "expensive"],
        "Fares are a base fare plus a per-km rate for your vehicle: Keke from 200 NGN, Okada from 150 NGN \
and Car from 500 NGN. Surge pricing may apply at busy times.",
    ),
    (
        &["driver", "where", "late", "eta"],
        "Your driver's position is shown live on the map once the ride is accepted. \
Most pickups take under 5 minutes.",
    ),
    (
        &["payment", "pay", "wallet", "refund", "top up", "topup"],
        "Rides are paid from your Keke wallet. Top up from the Wallet tab; every charge appears in your history.",
    ),
    (
        &["package", "parcel", "delivery", "deliver", "logistics"],
        "Send a package from the Logistics tab. Prices depend on size, weight and distance, \
and you get a KN tracking code to share with the recipient.",
    ),
    (
        &["hello", "hi", "hey", "good morning", "good afternoon", "good evening"],
        "Hello! Welcome to Keke Napepe Ride. Where would you like to go today?",
    ),
];

#[derive(Debug, Error)]
pub enum AiError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider returned no text")]
    EmptyResponse,

    #[error("could not parse trip estimate: {0}")]
    Parse(String),
}

/// Anything that turns a prompt into text.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
}

/// Client for the `generateContent` endpoint of the generative language API.
pub struct GeminiClient {
    http: reqwest::Client,
    config: GeminiConfig,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, config }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        let resp = self
            .http
            .post(self.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let out: GenerateResponse = resp.json().await?;
        let text: String = out
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().filter_map(|part| part.text).collect())
            .unwrap_or_default();

        let text = text.trim();
        if text.is_empty() {
            return Err(AiError::EmptyResponse);
        }
        Ok(text.to_string())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReplySource {
    Model,
    Keywords,
    Fallback,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatReply {
    pub reply: String,
    pub source: ReplySource,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TripEstimate {
    pub duration: String,
    pub distance: String,
    pub traffic: String,
}

impl TripEstimate {
    pub fn fallback() -> Self {
        Self {
            duration: "15 mins".to_string(),
            distance: "5 km".to_string(),
            traffic: "Moderate".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TripEstimateReply {
    #[serde(flatten)]
    pub estimate: TripEstimate,
    pub source: ReplySource,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TripEstimateRequest {
    pub pickup: String,
    pub dropoff: String,
}

/// Canned answer for the first keyword group found in `message`.
pub fn auto_reply(message: &str) -> &'static str {
    let message = message.to_lowercase();
    let words: Vec<&str> = message
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();

    KEYWORD_REPLIES
        .iter()
        .find(|(keywords, _)| {
            keywords.iter().any(|keyword| {
                if keyword.contains(' ') {
                    message.contains(keyword)
                } else if keyword.len() < PREFIX_MATCH_MIN_LEN {
                    words.iter().any(|word| word == keyword)
                } else {
                    words.iter().any(|word| word.starts_with(keyword))
                }
            })
        })
        .map(|(_, reply)| *reply)
        .unwrap_or(DEFAULT_REPLY)
}

/// Drops a surrounding Markdown code fence such as "```json ... ```".
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Skip the info string ("json") on the opening line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

pub fn parse_trip_estimate(text: &str) -> Result<TripEstimate, AiError> {
    serde_json::from_str(strip_code_fences(text)).map_err(|e| AiError::Parse(e.to_string()))
}

fn chat_prompt(message: &str) -> String {
    format!(
        "You are the in-app assistant of Keke Napepe Ride, a ride-hailing service in Lagos, Nigeria \
offering keke (tricycle), okada (motorbike) and car rides plus package delivery. \
Prices are in Naira. Answer in two or three friendly sentences.\n\nCustomer: {}",
        message
    )
}

fn estimate_prompt(pickup: &str, dropoff: &str) -> String {
    format!(
        "Estimate a trip in Lagos, Nigeria from \"{}\" to \"{}\". \
Reply with JSON only, in the form {{\"duration\": \"25 mins\", \"distance\": \"8 km\", \"traffic\": \"Light|Moderate|Heavy\"}}.",
        pickup, dropoff
    )
}

pub struct AiService {
    generator: Option<Arc<dyn TextGenerator>>,
}

impl AiService {
    pub fn new(generator: Option<Arc<dyn TextGenerator>>) -> Self {
        Self { generator }
    }

    pub fn is_model_enabled(&self) -> bool {
        self.generator.is_some()
    }

    /// Model answer when one is configured and reachable, keyword answer otherwise.
    pub async fn chat(&self, message: &str) -> ChatReply {
        if let Some(generator) = &self.generator {
            match generator.generate(&chat_prompt(message)).await {
                Ok(reply) => {
                    return ChatReply {
                        reply,
                        source: ReplySource::Model,
                    }
                }
                Err(e) => tracing::warn!("Assistant model failed, using keyword reply: {}", e),
            }
        }

        ChatReply {
            reply: auto_reply(message).to_string(),
            source: ReplySource::Keywords,
        }
    }

    pub async fn estimate_trip(&self, pickup: &str, dropoff: &str) -> TripEstimateReply {
        if let Some(generator) = &self.generator {
            let result = generator
                .generate(&estimate_prompt(pickup, dropoff))
                .await
                .and_then(|text| parse_trip_estimate(&text));
            match result {
                Ok(estimate) => {
                    return TripEstimateReply {
                        estimate,
                        source: ReplySource::Model,
                    }
                }
                Err(e) => tracing::warn!("Trip estimate failed, using fallback: {}", e),
            }
        }

        TripEstimateReply {
            estimate: TripEstimate::fallback(),
            source: ReplySource::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL_PATH: &str = "/v1beta/models/gemini-test:generateContent";

    fn client(server: &MockServer) -> Arc<dyn TextGenerator> {
        Arc::new(GeminiClient::new(GeminiConfig {
            api_key: "test-key".into(),
            model: "gemini-test".into(),
            base_url: server.uri(),
        }))
    }

    fn candidate(text: &str) -> serde_json::Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    }

    #[test]
    fn test_keyword_groups() {
        assert!(auto_reply("How much is the FARE to Yaba?").contains("base fare"));
        assert!(auto_reply("I want to cancel my ride").contains("cancel"));
        assert!(auto_reply("Where is my driver??").contains("map"));
        assert!(auto_reply("send a parcel to Ikeja").contains("tracking code"));
        assert!(auto_reply("hello").starts_with("Hello"));
        assert_eq!(auto_reply("asdfgh"), DEFAULT_REPLY);
    }

    #[test]
    fn test_safety_beats_other_groups() {
        assert!(auto_reply("hi, my driver is unsafe").contains("SOS"));
    }

    #[test]
    fn test_short_keywords_match_whole_words_only() {
        // "this" must not trigger the greeting group through "hi"
        assert_eq!(auto_reply("this"), DEFAULT_REPLY);
        for message in ["take the highway", "I want to hire a keke", "show my history", "heyday", "paying later"] {
            assert_eq!(auto_reply(message), DEFAULT_REPLY, "{}", message);
        }
        assert!(auto_reply("hi there").starts_with("Hello"));
        assert!(auto_reply("what are the fares").contains("base fare"));
        // Longer keywords still cover their inflections
        assert!(auto_reply("my ride was cancelled").contains("cancel"));
        assert!(auto_reply("two deliveries please").contains("tracking code"));
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_trip_estimate() {
        let estimate =
            parse_trip_estimate("```json\n{\"duration\":\"25 mins\",\"distance\":\"9 km\",\"traffic\":\"Heavy\"}\n```")
                .unwrap();
        assert_eq!(estimate.traffic, "Heavy");
        assert!(matches!(parse_trip_estimate("about 20 minutes"), Err(AiError::Parse(_))));
    }

    #[tokio::test]
    async fn test_without_key_uses_keywords_and_fallback() {
        let service = AiService::new(None);
        let reply = service.chat("what is the price").await;
        assert_eq!(reply.source, ReplySource::Keywords);

        let estimate = service.estimate_trip("Yaba", "Lekki").await;
        assert_eq!(estimate.source, ReplySource::Fallback);
        assert_eq!(estimate.estimate, TripEstimate::fallback());
    }

    #[tokio::test]
    async fn test_chat_uses_model_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate(" Welcome aboard! ")))
            .expect(1)
            .mount(&server)
            .await;

        let service = AiService::new(Some(client(&server)));
        let reply = service.chat("hello").await;
        assert_eq!(reply.source, ReplySource::Model);
        assert_eq!(reply.reply, "Welcome aboard!");
    }

    #[tokio::test]
    async fn test_chat_falls_back_on_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .expect(1)
            .mount(&server)
            .await;

        let service = AiService::new(Some(client(&server)));
        let reply = service.chat("how do I pay?").await;
        assert_eq!(reply.source, ReplySource::Keywords);
        assert!(reply.reply.contains("wallet"));
    }

    #[tokio::test]
    async fn test_empty_candidates_are_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let result = client(&server).generate("hi").await;
        assert!(matches!(result, Err(AiError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_estimate_parses_fenced_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate(
                "```json\n{\"duration\": \"32 mins\", \"distance\": \"14 km\", \"traffic\": \"Heavy\"}\n```",
            )))
            .mount(&server)
            .await;

        let service = AiService::new(Some(client(&server)));
        let reply = service.estimate_trip("Yaba", "Lekki Phase 1").await;
        assert_eq!(reply.source, ReplySource::Model);
        assert_eq!(reply.estimate.distance, "14 km");
    }

    #[tokio::test]
    async fn test_estimate_falls_back_on_prose() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(MODEL_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate("Roughly half an hour.")))
            .mount(&server)
            .await;

        let service = AiService::new(Some(client(&server)));
        let reply = service.estimate_trip("Yaba", "Lekki").await;
        assert_eq!(reply.source, ReplySource::Fallback);
        assert_eq!(reply.estimate, TripEstimate::fallback());
    }
}
