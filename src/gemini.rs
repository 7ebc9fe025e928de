//! Client for the hosted Gemini `generateContent` endpoint.

use crate::{
    config::GeminiConfig,
    model::{ContentPart, VisionModel},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

/// Errors raised while calling the hosted model.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    /// No credential was configured.
    #[error("API key not valid: GOOGLE_API_KEY is not set")]
    MissingApiKey,

    /// The request did not complete (connection, TLS, body read).
    #[error("Request to the model failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },

    /// The API returned no candidate, usually because the prompt was blocked.
    #[error("The model returned no candidates: {0}")]
    Blocked(String),

    /// The first candidate carried no text.
    #[error("The model returned no text (finish reason: {0})")]
    EmptyResponse(String),

    /// The body was not a valid `generateContent` response.
    #[error("Malformed model response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
enum Part<'a> {
    Text(&'a str),
    InlineData(Blob),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Blob {
    mime_type: &'static str,
    data: String,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(parts: &[ContentPart<'a>]) -> Self {
        let parts = parts
            .iter()
            .map(|part| match *part {
                ContentPart::Text(text) => Part::Text(text),
                ContentPart::Image(image) => Part::InlineData(Blob {
                    mime_type: image.format().mime_type(),
                    data: STANDARD.encode(image.encoded()),
                }),
            })
            .collect();

        Self {
            contents: [Content {
                role: "user",
                parts,
            }],
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerateContentResponse {
    // Concatenates the text parts of the first candidate.
    fn into_text(self) -> Result<String, GeminiError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|feedback| feedback.block_reason)
                .map(|reason| format!("blocked with reason {reason}"))
                .unwrap_or_else(|| "empty candidate list".to_string());
            return Err(GeminiError::Blocked(reason));
        };

        let texts: Vec<String> = candidate
            .content
            .map(|content| content.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|part| part.text)
            .collect();

        if texts.is_empty() {
            let reason = candidate
                .finish_reason
                .unwrap_or_else(|| "unspecified".to_string());
            return Err(GeminiError::EmptyResponse(reason));
        }

        Ok(texts.concat())
    }
}

fn api_error(status: StatusCode, body: &str) -> GeminiError {
    let message = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
        Err(_) => body.trim().to_string(),
    };
    GeminiError::Api { status, message }
}

/// [`VisionModel`] backed by the Gemini REST API.
pub struct GeminiModel {
    client: reqwest::Client,
    config: GeminiConfig,
}

impl GeminiModel {
    pub fn new(config: GeminiConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Uses a caller-provided HTTP client, e.g. one with a proxy configured.
    pub fn with_client(client: reqwest::Client, config: GeminiConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        let model = self.config.model.trim_start_matches("models/");
        format!("{}/models/{}:generateContent", self.config.base_url, model)
    }
}

impl VisionModel for GeminiModel {
    type Error = GeminiError;

    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, parts: &[ContentPart<'_>]) -> Result<String, Self::Error> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(GeminiError::MissingApiKey)?;

        let body = GenerateContentRequest::new(parts);
        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        log::debug!("Model answered with {} ({} bytes)", status, text.len());

        if !status.is_success() {
            return Err(api_error(status, &text));
        }

        serde_json::from_str::<GenerateContentResponse>(&text)?.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{asset::ImageAsset, asset::tests::encode};
    use serde_json::json;

    #[test]
    fn request_mirrors_part_order() {
        let bytes = encode(image::ImageFormat::Png, 2, 2);
        let image = ImageAsset::decode(None, bytes.clone()).unwrap();
        let parts = [ContentPart::Text("What is this?"), ContentPart::Image(&image)];

        let body = serde_json::to_value(GenerateContentRequest::new(&parts)).unwrap();

        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "What is this?" },
                        { "inlineData": { "mimeType": "image/png", "data": STANDARD.encode(&bytes) } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn joins_text_parts_of_first_candidate() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                { "content": { "role": "model", "parts": [{ "text": "A cat " }, { "text": "on a mat." }] }, "finishReason": "STOP" },
                { "content": { "parts": [{ "text": "ignored" }] } }
            ]
        }))
        .unwrap();

        assert_eq!(response.into_text().unwrap(), "A cat on a mat.");
    }

    #[test]
    fn blocked_prompt_reports_reason() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .unwrap();

        let err = response.into_text().unwrap_err();
        assert_eq!(
            err.to_string(),
            "The model returned no candidates: blocked with reason SAFETY"
        );
    }

    #[test]
    fn candidate_without_text_reports_finish_reason() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "finishReason": "RECITATION" }]
        }))
        .unwrap();

        assert!(matches!(
            response.into_text(),
            Err(GeminiError::EmptyResponse(reason)) if reason == "RECITATION"
        ));
    }

    #[test]
    fn api_error_prefers_structured_message() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted (e.g. check quota).","status":"RESOURCE_EXHAUSTED"}}"#;
        let err = api_error(StatusCode::TOO_MANY_REQUESTS, body);

        assert_eq!(
            err.to_string(),
            "429 Too Many Requests: Resource has been exhausted (e.g. check quota)."
        );
        assert_eq!(
            api_error(StatusCode::BAD_GATEWAY, "upstream down").to_string(),
            "502 Bad Gateway: upstream down"
        );
    }

    #[test]
    fn endpoint_accepts_prefixed_model_names() {
        let model = GeminiModel::new(
            GeminiConfig::default()
                .with_model("models/gemini-1.5-flash")
                .with_base_url("http://localhost:1234/v1beta/"),
        );

        assert_eq!(
            model.endpoint(),
            "http://localhost:1234/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(model.config().base_url, "http://localhost:1234/v1beta");
        assert!(model.config().api_key.is_none());
    }
}
