use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use super::contracts::SchemaDescriptor;
use super::prompts::{GenerationRequest, system_instruction};
use super::repair::repair_payload;
use super::validation::{OutputValidationError, validate_output_json};
use crate::config::StudioConfig;
use crate::credentials::KeyStore;

pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<TransportReply, TransportError>> + Send + 'a>>;

/// One outbound call to the generative content endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportCall {
    pub credential: String,
    pub model: String,
    pub system_instruction: Option<String>,
    pub prompt: String,
    pub response_schema: Option<Value>,
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportReply {
    pub text: Option<String>,
    pub model_version: Option<String>,
}

impl TransportReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            model_version: None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("generative endpoint request timed out")]
    Timeout,
    #[error("generative endpoint unreachable: {0}")]
    Network(String),
    #[error("generative endpoint returned status={status} provider_status={provider_status:?}: {message}")]
    Status {
        status: u16,
        provider_status: Option<String>,
        reason: Option<String>,
        message: String,
    },
    #[error("generative endpoint failure: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    Quota,
    Auth,
    Other,
}

const QUOTA_PROVIDER_STATUSES: [&str; 1] = ["RESOURCE_EXHAUSTED"];
const AUTH_PROVIDER_STATUSES: [&str; 2] = ["UNAUTHENTICATED", "PERMISSION_DENIED"];
const AUTH_REASONS: [&str; 2] = ["API_KEY_INVALID", "API_KEY_SERVICE_BLOCKED"];

impl TransportError {
    /// Classifies the failure from structured status first, message text last.
    pub fn classify(&self) -> FailureClass {
        match self {
            Self::Status {
                status,
                provider_status,
                reason,
                message,
            } => {
                let provider_status = provider_status.as_deref().unwrap_or_default();
                let reason = reason.as_deref().unwrap_or_default();
                if *status == 429 || QUOTA_PROVIDER_STATUSES.contains(&provider_status) {
                    FailureClass::Quota
                } else if matches!(*status, 401 | 403)
                    || AUTH_PROVIDER_STATUSES.contains(&provider_status)
                    || AUTH_REASONS.contains(&reason)
                {
                    FailureClass::Auth
                } else {
                    classify_message(message)
                }
            }
            Self::Network(message) | Self::Other(message) => classify_message(message),
            Self::Timeout => FailureClass::Other,
        }
    }
}

// Transports that only surface text carry the status code inside the message.
fn classify_message(message: &str) -> FailureClass {
    if message.contains("429") {
        FailureClass::Quota
    } else {
        FailureClass::Other
    }
}

pub trait GenerationTransport: Send + Sync {
    fn send<'a>(&'a self, call: TransportCall) -> TransportFuture<'a>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Fast,
    Quality,
}

impl ModelTier {
    pub const fn from_high_capability(use_high_capability_model: bool) -> Self {
        if use_high_capability_model {
            Self::Quality
        } else {
            Self::Fast
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Quality => "quality",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoute {
    pub fast_model: String,
    pub quality_model: String,
}

impl ModelRoute {
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast_model,
            ModelTier::Quality => &self.quality_model,
        }
    }
}

impl From<&StudioConfig> for ModelRoute {
    fn from(config: &StudioConfig) -> Self {
        Self {
            fast_model: config.fast_model.clone(),
            quality_model: config.quality_model.clone(),
        }
    }
}

/// Parsed and validated output of one generation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct GenerationResult {
    fields: Map<String, Value>,
}

impl GenerationResult {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("no credential is configured for the generative service")]
    MissingCredential,
    #[error("the generative service rejected the credential")]
    InvalidCredential,
    #[error("the generative service quota is exhausted")]
    QuotaExceeded,
    #[error("the generative service returned a malformed response: {0}")]
    MalformedResponse(String),
    #[error("the generative service is unavailable: {0}")]
    ServiceUnavailable(String),
}

/// What the caller is expected to do after a failed generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    SupplyCredential,
    ReplaceCredential,
    WaitAndRetry,
    RetryNow,
}

impl GenerationError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential => "missing_credential",
            Self::InvalidCredential => "invalid_credential",
            Self::QuotaExceeded => "quota_exceeded",
            Self::MalformedResponse(_) => "malformed_response",
            Self::ServiceUnavailable(_) => "service_unavailable",
        }
    }

    pub const fn recovery(&self) -> RecoveryAction {
        match self {
            Self::MissingCredential => RecoveryAction::SupplyCredential,
            Self::InvalidCredential => RecoveryAction::ReplaceCredential,
            Self::QuotaExceeded => RecoveryAction::WaitAndRetry,
            Self::MalformedResponse(_) | Self::ServiceUnavailable(_) => RecoveryAction::RetryNow,
        }
    }

    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::MissingCredential => "No API key is set. Add a key to start generating.",
            Self::InvalidCredential => "The API key was rejected. Please enter a different key.",
            Self::QuotaExceeded => {
                "The usage limit has been reached. Please wait a moment and try again."
            }
            Self::MalformedResponse(_) => "The content could not be generated. Please try again.",
            Self::ServiceUnavailable(_) => {
                "Could not reach the content service. Check your connection and try again."
            }
        }
    }

    fn from_transport(err: &TransportError) -> Self {
        match err.classify() {
            FailureClass::Quota => Self::QuotaExceeded,
            FailureClass::Auth => Self::InvalidCredential,
            FailureClass::Other => Self::ServiceUnavailable(err.to_string()),
        }
    }
}

impl From<OutputValidationError> for GenerationError {
    fn from(err: OutputValidationError) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

/// Builds prompts, issues one call per request and validates the reply.
#[derive(Clone)]
pub struct GenerationGateway {
    transport: Arc<dyn GenerationTransport>,
    key_store: Arc<dyn KeyStore>,
    route: ModelRoute,
    target_language: String,
}

impl GenerationGateway {
    pub fn new(
        transport: Arc<dyn GenerationTransport>,
        key_store: Arc<dyn KeyStore>,
        route: ModelRoute,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            key_store,
            route,
            target_language: target_language.into(),
        }
    }

    pub fn route(&self) -> &ModelRoute {
        &self.route
    }

    pub async fn generate(
        &self,
        request: &GenerationRequest,
        descriptor: &SchemaDescriptor,
        tier: ModelTier,
    ) -> Result<GenerationResult, GenerationError> {
        let credential = self.key_store.resolve_active_credential();
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(GenerationError::MissingCredential);
        }

        let model = self.route.model_for(tier).to_string();
        let call = TransportCall {
            credential: credential.to_string(),
            model: model.clone(),
            system_instruction: Some(system_instruction(&self.target_language)),
            prompt: request.compose_prompt(),
            response_schema: Some(descriptor.response_schema()),
            max_output_tokens: None,
        };

        let reply = self.transport.send(call).await.map_err(|err| {
            let mapped = GenerationError::from_transport(&err);
            warn!(
                kind = %request.kind,
                model = %model,
                error_kind = mapped.kind(),
                "generation request failed: {err}"
            );
            mapped
        })?;

        let cleaned = repair_payload(reply.text.as_deref());
        let fields = validate_output_json(descriptor, &cleaned).map_err(|err| {
            warn!(
                kind = %request.kind,
                model = %model,
                descriptor = descriptor.name,
                "generation output rejected: {err}"
            );
            GenerationError::from(err)
        })?;

        debug!(
            kind = %request.kind,
            model = reply.model_version.as_deref().unwrap_or(&model),
            field_count = fields.len(),
            "generation succeeded"
        );

        Ok(GenerationResult { fields })
    }
}
