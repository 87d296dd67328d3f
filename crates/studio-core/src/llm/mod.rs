pub mod contracts;
pub mod gateway;
pub mod gemini;
pub mod observability;
pub mod probe;
pub mod prompts;
pub mod repair;
pub mod validation;

pub use contracts::{ContentKind, FieldSpec, FieldType, SchemaDescriptor};
pub use gateway::{
    FailureClass, GenerationError, GenerationGateway, GenerationResult, GenerationTransport,
    ModelRoute, ModelTier, RecoveryAction, TransportCall, TransportError, TransportFuture,
    TransportReply,
};
pub use gemini::{GeminiTransport, GeminiTransportConfig, TransportBuildError};
pub use observability::{GenerationSource, GenerationTelemetryEvent, generate_with_telemetry};
pub use probe::ValidationProbe;
pub use prompts::{BirthDetails, ContentLength, GenerationRequest, system_instruction};
pub use repair::repair_payload;
pub use validation::{OutputValidationError, validate_output_json, validate_output_value};
