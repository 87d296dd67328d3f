use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::gateway::{
    GenerationTransport, TransportCall, TransportError, TransportFuture, TransportReply,
};
use crate::config::{DEFAULT_API_BASE_URL, StudioConfig};

const DEFAULT_TIMEOUT_MS: u64 = 60_000;
const JSON_MIME_TYPE: &str = "application/json";
const API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Debug, Clone)]
pub struct GeminiTransportConfig {
    pub api_base_url: String,
    pub timeout_ms: u64,
}

impl Default for GeminiTransportConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl From<&StudioConfig> for GeminiTransportConfig {
    fn from(config: &StudioConfig) -> Self {
        Self {
            api_base_url: config.api_base_url.clone(),
            timeout_ms: config.timeout_ms,
        }
    }
}

#[derive(Debug, Error)]
pub enum TransportBuildError {
    #[error("failed to build generative http client: {0}")]
    HttpClient(String),
}

#[derive(Clone)]
pub struct GeminiTransport {
    client: reqwest::Client,
    config: GeminiTransportConfig,
}

impl GeminiTransport {
    pub fn new(config: GeminiTransportConfig) -> Result<Self, TransportBuildError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|err| TransportBuildError::HttpClient(err.to_string()))?;

        Ok(Self { client, config })
    }

    fn endpoint_for(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.api_base_url.trim_end_matches('/'),
            model
        )
    }

    async fn send_once(&self, call: TransportCall) -> Result<TransportReply, TransportError> {
        let request_body = GenerateContentRequest::from_call(&call);

        let response = self
            .client
            .post(self.endpoint_for(&call.model))
            .header(API_KEY_HEADER, &call.credential)
            .json(&request_body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Network(err.without_url().to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError::Network(format!("response_body_read_failed: {err}")))?;

        if !status.is_success() {
            let details = parse_provider_error(&body);
            return Err(TransportError::Status {
                status: status.as_u16(),
                provider_status: details.status,
                reason: details.reason,
                message: details
                    .message
                    .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string()),
            });
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body)
            .map_err(|_| TransportError::Other("response_json_parse_failed".to_string()))?;

        Ok(TransportReply {
            text: parsed.first_candidate_text(),
            model_version: parsed.model_version,
        })
    }
}

impl GenerationTransport for GeminiTransport {
    fn send<'a>(&'a self, call: TransportCall) -> TransportFuture<'a> {
        Box::pin(self.send_once(call))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

impl GenerateContentRequest {
    fn from_call(call: &TransportCall) -> Self {
        Self {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: call.prompt.clone(),
                }],
            }],
            system_instruction: call.system_instruction.as_ref().map(|text| Content {
                role: None,
                parts: vec![Part { text: text.clone() }],
            }),
            generation_config: GenerationConfig {
                response_mime_type: call.response_schema.as_ref().map(|_| JSON_MIME_TYPE),
                response_schema: call.response_schema.clone(),
                max_output_tokens: call.max_output_tokens,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    model_version: Option<String>,
}

impl GenerateContentResponse {
    fn first_candidate_text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text = parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect::<String>();
        if text.is_empty() { None } else { Some(text) }
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ProviderErrorDetails {
    status: Option<String>,
    reason: Option<String>,
    message: Option<String>,
}

fn parse_provider_error(body: &str) -> ProviderErrorDetails {
    #[derive(Deserialize)]
    struct ProviderErrorEnvelope {
        error: Option<ProviderError>,
    }

    #[derive(Deserialize)]
    struct ProviderError {
        message: Option<String>,
        status: Option<String>,
        #[serde(default)]
        details: Vec<Value>,
    }

    let Some(error) = serde_json::from_str::<ProviderErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
    else {
        return ProviderErrorDetails::default();
    };

    let reason = error.details.iter().find_map(|detail| {
        detail
            .get("reason")
            .and_then(Value::as_str)
            .map(ToString::to_string)
    });

    ProviderErrorDetails {
        status: error.status,
        reason,
        message: error.message,
    }
}
