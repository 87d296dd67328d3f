use std::sync::Arc;

use serde_json::Value;
use studio_core::config::{ConfigError, StudioConfig};
use studio_core::credentials::{KeyStore, LayeredKeyStore, MemoryPreferenceStore};
use studio_core::llm::{
    GeminiTransport, GeminiTransportConfig, GenerationGateway, GenerationResult,
    GenerationSource, GenerationTransport, ModelRoute, TransportBuildError, TransportCall,
    TransportFuture, generate_with_telemetry,
};
use thiserror::Error;
use tracing::info;

use crate::case::{EvalCaseFixture, RecordedReply};
use crate::cli::{CliOptions, EvalMode};
use crate::fixture_io::{FixtureIoError, load_cases};

const REPLAY_CREDENTIAL: &str = "replay-credential";
const REPLAY_LANGUAGE: &str = "Hindi";

#[derive(Debug)]
pub struct EvalSummary {
    mode: EvalMode,
    results: Vec<CaseResult>,
}

impl EvalSummary {
    pub fn has_failures(&self) -> bool {
        self.results
            .iter()
            .any(|result| !result.failures.is_empty())
    }

    pub fn print(&self) {
        println!("Generation Eval Harness ({})", self.mode.as_str());

        let mut passed = 0usize;
        for result in &self.results {
            if result.failures.is_empty() {
                passed += 1;
                println!("[PASS] {}: {}", result.case_id, result.description);
            } else {
                println!("[FAIL] {}: {}", result.case_id, result.description);
                for failure in &result.failures {
                    println!("  - {failure}");
                }
            }
        }

        let total = self.results.len();
        let failed = total.saturating_sub(passed);
        println!(
            "Summary: {} total, {} passed, {} failed",
            total, passed, failed
        );
    }
}

#[derive(Debug)]
struct CaseResult {
    case_id: String,
    description: String,
    failures: Vec<String>,
}

#[derive(Debug, Error)]
pub enum EvalError {
    #[error(transparent)]
    Fixtures(#[from] FixtureIoError),
    #[error("failed to read studio config in live mode: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to initialize the live transport: {0}")]
    Transport(#[from] TransportBuildError),
    #[error("live mode requires an API key (GEMINI_API_KEY or a saved key)")]
    MissingLiveCredential,
    #[error("no fixture matched the selected cases")]
    NoCases,
}

/// Replays one recorded transport outcome.
struct ReplayTransport {
    reply: RecordedReply,
}

impl GenerationTransport for ReplayTransport {
    fn send<'a>(&'a self, _call: TransportCall) -> TransportFuture<'a> {
        let result = self.reply.to_transport_result();
        Box::pin(async move { result })
    }
}

pub async fn run_eval(options: &CliOptions) -> Result<EvalSummary, EvalError> {
    let mut cases = load_cases()?;
    cases.sort_by(|left, right| left.case_id.cmp(&right.case_id));

    if let Some(case_id) = options.case_id.as_deref() {
        cases.retain(|case| case.case_id == case_id);
    }
    if options.mode == EvalMode::Live {
        cases.retain(|case| case.include_in_live_smoke);
    }
    if cases.is_empty() {
        return Err(EvalError::NoCases);
    }

    let live_gateway = if options.mode == EvalMode::Live {
        Some(live_gateway()?)
    } else {
        None
    };

    let mut results = Vec::with_capacity(cases.len());
    for case in &cases {
        let result = match live_gateway.as_ref() {
            Some(gateway) => run_live_case(case, gateway).await,
            None => run_mocked_case(case).await,
        };
        results.push(result);
    }

    Ok(EvalSummary {
        mode: options.mode,
        results,
    })
}

fn live_gateway() -> Result<GenerationGateway, EvalError> {
    let config = StudioConfig::from_env()?;
    let key_store = Arc::new(LayeredKeyStore::from_config(&config));
    if key_store.resolve_active_credential().is_empty() {
        return Err(EvalError::MissingLiveCredential);
    }

    let transport = GeminiTransport::new(GeminiTransportConfig::from(&config))?;
    info!(
        fast_model = %config.fast_model,
        quality_model = %config.quality_model,
        "running live smoke cases"
    );
    Ok(GenerationGateway::new(
        Arc::new(transport),
        key_store,
        ModelRoute::from(&config),
        config.target_language.clone(),
    ))
}

fn replay_gateway(reply: RecordedReply) -> GenerationGateway {
    GenerationGateway::new(
        Arc::new(ReplayTransport { reply }),
        Arc::new(LayeredKeyStore::new(
            Arc::new(MemoryPreferenceStore::default()),
            Some(REPLAY_CREDENTIAL.to_string()),
        )),
        ModelRoute {
            fast_model: "replay-fast".to_string(),
            quality_model: "replay-quality".to_string(),
        },
        REPLAY_LANGUAGE,
    )
}

async fn run_mocked_case(case: &EvalCaseFixture) -> CaseResult {
    let Some(reply) = case.recorded_reply.clone() else {
        return case_result(
            case,
            vec!["recorded_reply: missing reply fixture for mocked mode".to_string()],
        );
    };

    let gateway = replay_gateway(reply);
    let (result, telemetry) = generate_with_telemetry(
        &gateway,
        GenerationSource::Eval,
        &case.request,
        case.request.kind.descriptor(),
        case.tier,
    )
    .await;
    telemetry.emit();

    let mut failures = Vec::new();
    match (result, case.expectations.error_kind.as_deref()) {
        (Ok(output), None) => check_expected_fields(case, &output, &mut failures),
        (Ok(_), Some(expected)) => {
            failures.push(format!("outcome: expected error {expected}, got success"));
        }
        (Err(err), None) => failures.push(format!("outcome: expected success, got {err}")),
        (Err(err), Some(expected)) => {
            if err.kind() != expected {
                failures.push(format!(
                    "error_kind: expected={expected}, actual={}",
                    err.kind()
                ));
            }
        }
    }

    case_result(case, failures)
}

async fn run_live_case(case: &EvalCaseFixture, gateway: &GenerationGateway) -> CaseResult {
    let (result, telemetry) = generate_with_telemetry(
        gateway,
        GenerationSource::Eval,
        &case.request,
        case.request.kind.descriptor(),
        case.tier,
    )
    .await;
    telemetry.emit();

    let failures = match result {
        Ok(_) => Vec::new(),
        Err(err) => vec![format!("live_request: {} ({err})", err.kind())],
    };
    case_result(case, failures)
}

fn check_expected_fields(
    case: &EvalCaseFixture,
    output: &GenerationResult,
    failures: &mut Vec<String>,
) {
    let descriptor = case.request.kind.descriptor();
    for (field, expected) in &case.expectations.fields {
        match descriptor.field(field) {
            None => {
                failures.push(format!(
                    "field {field}: not declared by {}",
                    descriptor.name
                ));
                continue;
            }
            Some(spec) if !spec.field_type.accepts(expected) => {
                failures.push(format!(
                    "field {field}: expected={expected} does not match declared type {:?}",
                    spec.field_type
                ));
                continue;
            }
            Some(_) => {}
        }

        match output.get(field) {
            Some(actual) if actual == expected => {}
            Some(actual) => failures.push(format!(
                "field {field}: expected={expected}, actual={actual}"
            )),
            None => failures.push(format!("field {field}: missing, expected={expected}")),
        }
    }

    if let Some(Value::String(title)) = output.get("title")
        && title.trim().is_empty()
    {
        failures.push("field title: must not be blank".to_string());
    }
}

fn case_result(case: &EvalCaseFixture, failures: Vec<String>) -> CaseResult {
    CaseResult {
        case_id: case.case_id.clone(),
        description: case.description.clone(),
        failures,
    }
}
