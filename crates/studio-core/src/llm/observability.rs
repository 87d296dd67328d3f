use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::contracts::SchemaDescriptor;
use super::gateway::{GenerationError, GenerationGateway, GenerationResult, ModelTier};
use super::prompts::GenerationRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationSource {
    Cli,
    Eval,
}

impl GenerationSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Eval => "eval",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationTelemetryEvent {
    pub source: &'static str,
    pub kind: &'static str,
    pub descriptor: &'static str,
    pub tier: &'static str,
    pub model: String,
    pub outcome: &'static str,
    pub error_kind: Option<&'static str>,
    pub field_count: Option<usize>,
    pub latency_ms: u64,
}

impl GenerationTelemetryEvent {
    pub fn emit(&self) {
        match self.error_kind {
            None => info!(
                source = self.source,
                kind = self.kind,
                descriptor = self.descriptor,
                tier = self.tier,
                model = %self.model,
                outcome = self.outcome,
                field_count = self.field_count.unwrap_or_default(),
                latency_ms = self.latency_ms,
                "generation telemetry"
            ),
            Some(error_kind) => warn!(
                source = self.source,
                kind = self.kind,
                descriptor = self.descriptor,
                tier = self.tier,
                model = %self.model,
                outcome = self.outcome,
                error_kind,
                latency_ms = self.latency_ms,
                "generation telemetry"
            ),
        }
    }
}

pub async fn generate_with_telemetry(
    gateway: &GenerationGateway,
    source: GenerationSource,
    request: &GenerationRequest,
    descriptor: &SchemaDescriptor,
    tier: ModelTier,
) -> (
    Result<GenerationResult, GenerationError>,
    GenerationTelemetryEvent,
) {
    let started_at = Instant::now();
    let result = gateway.generate(request, descriptor, tier).await;
    let telemetry = GenerationTelemetryEvent {
        source: source.as_str(),
        kind: request.kind.as_str(),
        descriptor: descriptor.name,
        tier: tier.as_str(),
        model: gateway.route().model_for(tier).to_string(),
        outcome: if result.is_ok() { "success" } else { "failure" },
        error_kind: result.as_ref().err().map(GenerationError::kind),
        field_count: result.as_ref().ok().map(|output| output.fields().len()),
        latency_ms: duration_to_millis(started_at.elapsed()),
    };
    (result, telemetry)
}

fn duration_to_millis(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}
