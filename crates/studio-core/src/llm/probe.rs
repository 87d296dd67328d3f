use std::sync::Arc;

use tracing::{debug, info};

use super::gateway::{FailureClass, GenerationTransport, TransportCall};

const PROBE_PROMPT: &str = "Reply with the single word: ok";
const PROBE_MAX_OUTPUT_TOKENS: u32 = 1;

/// Cheap check that a credential is accepted by the generative service.
#[derive(Clone)]
pub struct ValidationProbe {
    transport: Arc<dyn GenerationTransport>,
    model: String,
}

impl ValidationProbe {
    pub fn new(transport: Arc<dyn GenerationTransport>, model: impl Into<String>) -> Self {
        Self {
            transport,
            model: model.into(),
        }
    }

    /// Returns `true` for a usable (possibly throttled) credential, `false` otherwise.
    pub async fn probe(&self, credential: &str) -> bool {
        let credential = credential.trim();
        if credential.is_empty() {
            return false;
        }

        let call = TransportCall {
            credential: credential.to_string(),
            model: self.model.clone(),
            system_instruction: None,
            prompt: PROBE_PROMPT.to_string(),
            response_schema: None,
            max_output_tokens: Some(PROBE_MAX_OUTPUT_TOKENS),
        };

        match self.transport.send(call).await {
            Ok(_) => true,
            Err(err) => match err.classify() {
                FailureClass::Quota => {
                    info!(model = %self.model, "credential probe throttled; treating key as valid");
                    true
                }
                FailureClass::Auth | FailureClass::Other => {
                    debug!(model = %self.model, "credential probe failed: {err}");
                    false
                }
            },
        }
    }
}
