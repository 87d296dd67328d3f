use serde::Deserialize;
use serde_json::{Map, Value};
use studio_core::llm::{GenerationRequest, ModelTier, TransportError, TransportReply};

#[derive(Debug, Clone, Deserialize)]
pub struct EvalCaseFixture {
    pub case_id: String,
    pub description: String,
    pub request: GenerationRequest,
    #[serde(default = "default_tier")]
    pub tier: ModelTier,
    #[serde(default)]
    pub include_in_live_smoke: bool,
    #[serde(default)]
    pub recorded_reply: Option<RecordedReply>,
    #[serde(default)]
    pub expectations: EvalExpectations,
}

fn default_tier() -> ModelTier {
    ModelTier::Fast
}

/// Transport outcome captured from a real call, replayed in mocked mode.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordedReply {
    Text(String),
    Empty,
    Failure(RecordedFailure),
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordedFailure {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub provider_status: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    pub message: String,
}

impl RecordedReply {
    pub fn to_transport_result(&self) -> Result<TransportReply, TransportError> {
        match self {
            Self::Text(text) => Ok(TransportReply::text(text.clone())),
            Self::Empty => Ok(TransportReply::default()),
            Self::Failure(failure) => Err(match failure.status {
                Some(status) => TransportError::Status {
                    status,
                    provider_status: failure.provider_status.clone(),
                    reason: failure.reason.clone(),
                    message: failure.message.clone(),
                },
                None => TransportError::Other(failure.message.clone()),
            }),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct EvalExpectations {
    /// Expected `GenerationError::kind`; absent means the call must succeed.
    #[serde(default)]
    pub error_kind: Option<String>,
    /// Field values the result must contain.
    #[serde(default)]
    pub fields: Map<String, Value>,
}
