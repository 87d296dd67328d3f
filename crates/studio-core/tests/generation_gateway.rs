use std::collections::VecDeque;
use std::sync::Arc;

use serde_json::json;
use studio_core::credentials::{KeyStore, LayeredKeyStore, MemoryPreferenceStore};
use studio_core::llm::contracts::DAILY_ALMANAC;
use studio_core::llm::{
    ContentKind, FieldSpec, GenerationError, GenerationGateway, GenerationRequest,
    GenerationTransport, ModelRoute, ModelTier, SchemaDescriptor, TransportCall, TransportError,
    TransportFuture, TransportReply, ValidationProbe,
};
use tokio::sync::Mutex;

static SINGLE_FIELD: SchemaDescriptor =
    SchemaDescriptor::new("single_field", &[FieldSpec::number("a")]);

#[derive(Clone, Default)]
struct StubTransport {
    replies: Arc<Mutex<VecDeque<Result<TransportReply, TransportError>>>>,
    seen_calls: Arc<Mutex<Vec<TransportCall>>>,
}

impl StubTransport {
    fn with_replies(replies: Vec<Result<TransportReply, TransportError>>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen_calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn replying_text(text: &str) -> Self {
        Self::with_replies(vec![Ok(TransportReply::text(text))])
    }

    async fn calls(&self) -> usize {
        self.seen_calls.lock().await.len()
    }

    async fn seen_calls(&self) -> Vec<TransportCall> {
        self.seen_calls.lock().await.clone()
    }
}

impl GenerationTransport for StubTransport {
    fn send<'a>(&'a self, call: TransportCall) -> TransportFuture<'a> {
        Box::pin(async move {
            self.seen_calls.lock().await.push(call);
            self.replies.lock().await.pop_front().unwrap_or_else(|| {
                Err(TransportError::Other("missing_stub_reply".to_string()))
            })
        })
    }
}

fn key_store(credential: Option<&str>) -> Arc<LayeredKeyStore> {
    Arc::new(LayeredKeyStore::new(
        Arc::new(MemoryPreferenceStore::default()),
        credential.map(ToString::to_string),
    ))
}

fn gateway_for(transport: &StubTransport, credential: Option<&str>) -> GenerationGateway {
    GenerationGateway::new(
        Arc::new(transport.clone()),
        key_store(credential),
        ModelRoute {
            fast_model: "fast-model".to_string(),
            quality_model: "quality-model".to_string(),
        },
        "Hindi",
    )
}

fn almanac_payload() -> serde_json::Value {
    json!({
        "date": "2024-01-01",
        "weekday": "Monday",
        "tithi": "Panchami",
        "nakshatra": "Purva Phalguni",
        "yoga": "Ayushman",
        "karana": "Kaulava",
        "sunrise": "07:14",
        "sunset": "17:36",
        "auspicious_period": "12:04 - 12:46",
        "inauspicious_period": "08:32 - 09:50",
        "insight": "Begin new study after the midday window."
    })
}

#[tokio::test]
async fn fenced_almanac_payload_with_blank_topic_succeeds() {
    let raw = format!("```json\n{}\n```", almanac_payload());
    let transport = StubTransport::replying_text(&raw);
    let gateway = gateway_for(&transport, Some("test-key"));

    let request = GenerationRequest::new(ContentKind::DailyAlmanac, "", "DailyAlmanac");
    let result = gateway
        .generate(&request, &DAILY_ALMANAC, ModelTier::Fast)
        .await
        .expect("fenced almanac payload should be accepted");

    assert_eq!(result.get_str("date"), Some("2024-01-01"));
    assert_eq!(result.clone().into_value(), almanac_payload());

    let calls = transport.seen_calls().await;
    assert_eq!(calls.len(), 1);
    assert!(calls[0].prompt.contains("Category: DailyAlmanac"));
    assert_eq!(calls[0].credential, "test-key");
    assert_eq!(
        calls[0].response_schema.as_ref(),
        Some(&DAILY_ALMANAC.response_schema())
    );
    assert!(
        calls[0]
            .system_instruction
            .as_deref()
            .is_some_and(|instruction| instruction.contains("Respond only in Hindi"))
    );
}

#[tokio::test]
async fn commentary_around_payload_is_discarded() {
    let transport =
        StubTransport::replying_text("Sure! Here's your result: {\"a\":1} Hope that helps!");
    let gateway = gateway_for(&transport, Some("test-key"));

    let result = gateway
        .generate(
            &GenerationRequest::topical_post("Diwali", "Festivals"),
            &SINGLE_FIELD,
            ModelTier::Fast,
        )
        .await
        .expect("payload surrounded by commentary should be accepted");

    assert_eq!(result.into_value(), json!({"a": 1}));
}

#[tokio::test]
async fn missing_required_field_is_malformed() {
    let mut payload = almanac_payload();
    payload
        .as_object_mut()
        .expect("payload is an object")
        .remove("tithi");
    let transport = StubTransport::replying_text(&payload.to_string());
    let gateway = gateway_for(&transport, Some("test-key"));

    let err = gateway
        .generate(
            &GenerationRequest::new(ContentKind::DailyAlmanac, "", "DailyAlmanac"),
            &DAILY_ALMANAC,
            ModelTier::Fast,
        )
        .await
        .expect_err("missing field must be rejected");

    assert!(
        matches!(err, GenerationError::MalformedResponse(ref detail) if detail.contains("tithi")),
        "expected malformed response naming the field, got {err:?}"
    );
}

#[tokio::test]
async fn unparseable_and_empty_payloads_are_malformed() {
    let transport = StubTransport::with_replies(vec![
        Ok(TransportReply::text("{\"a\": 1,,}")),
        Ok(TransportReply::default()),
    ]);
    let gateway = gateway_for(&transport, Some("test-key"));
    let request = GenerationRequest::topical_post("Holi", "Festivals");

    for _ in 0..2 {
        let err = gateway
            .generate(&request, &SINGLE_FIELD, ModelTier::Fast)
            .await
            .expect_err("unusable payload must be rejected");
        assert!(
            matches!(err, GenerationError::MalformedResponse(_)),
            "expected malformed response, got {err:?}"
        );
    }
    assert_eq!(transport.calls().await, 2);
}

#[tokio::test]
async fn missing_credential_skips_the_network() {
    let transport = StubTransport::replying_text("{\"a\":1}");
    let gateway = gateway_for(&transport, None);

    let err = gateway
        .generate(
            &GenerationRequest::topical_post("Yoga", "Wellness"),
            &SINGLE_FIELD,
            ModelTier::Fast,
        )
        .await
        .expect_err("no credential must fail");

    assert_eq!(err, GenerationError::MissingCredential);
    assert_eq!(transport.calls().await, 0);
}

#[tokio::test]
async fn rate_limit_is_quota_for_generate_and_valid_for_probe() {
    let quota_error = || {
        TransportError::Other(
            "[GoogleGenerativeAI Error]: [429 ] Resource has been exhausted".to_string(),
        )
    };
    let transport = StubTransport::with_replies(vec![Err(quota_error()), Err(quota_error())]);
    let gateway = gateway_for(&transport, Some("test-key"));
    let probe = ValidationProbe::new(Arc::new(transport.clone()), "fast-model");

    assert!(probe.probe("test-key").await);

    let err = gateway
        .generate(
            &GenerationRequest::dilemma("How do I forgive?"),
            &SINGLE_FIELD,
            ModelTier::Fast,
        )
        .await
        .expect_err("quota failure must surface");
    assert_eq!(err, GenerationError::QuotaExceeded);
    assert_eq!(transport.calls().await, 2);
}

#[tokio::test]
async fn transport_failures_map_to_taxonomy_without_retry() {
    let transport = StubTransport::with_replies(vec![
        Err(TransportError::Status {
            status: 401,
            provider_status: Some("UNAUTHENTICATED".to_string()),
            reason: None,
            message: "bad key".to_string(),
        }),
        Err(TransportError::Status {
            status: 503,
            provider_status: Some("UNAVAILABLE".to_string()),
            reason: None,
            message: "overloaded".to_string(),
        }),
        Err(TransportError::Timeout),
    ]);
    let gateway = gateway_for(&transport, Some("test-key"));
    let request = GenerationRequest::topical_post("Guru Purnima", "Festivals");

    let first = gateway
        .generate(&request, &SINGLE_FIELD, ModelTier::Fast)
        .await
        .expect_err("auth failure must surface");
    assert_eq!(first, GenerationError::InvalidCredential);
    assert_eq!(transport.calls().await, 1);

    let second = gateway
        .generate(&request, &SINGLE_FIELD, ModelTier::Fast)
        .await
        .expect_err("server failure must surface");
    assert!(matches!(second, GenerationError::ServiceUnavailable(_)));

    let third = gateway
        .generate(&request, &SINGLE_FIELD, ModelTier::Fast)
        .await
        .expect_err("timeout must surface");
    assert!(matches!(third, GenerationError::ServiceUnavailable(_)));
    assert_eq!(transport.calls().await, 3);
}

#[tokio::test]
async fn tier_selects_model() {
    let transport = StubTransport::with_replies(vec![
        Ok(TransportReply::text("{\"a\":1}")),
        Ok(TransportReply::text("{\"a\":2}")),
    ]);
    let gateway = gateway_for(&transport, Some("test-key"));
    let request = GenerationRequest::zodiac_prediction("Leo", "This week");

    gateway
        .generate(&request, &SINGLE_FIELD, ModelTier::from_high_capability(false))
        .await
        .expect("fast call should succeed");
    gateway
        .generate(&request, &SINGLE_FIELD, ModelTier::from_high_capability(true))
        .await
        .expect("quality call should succeed");

    let models = transport
        .seen_calls()
        .await
        .into_iter()
        .map(|call| call.model)
        .collect::<Vec<_>>();
    assert_eq!(models, vec!["fast-model", "quality-model"]);
}

#[tokio::test]
async fn credential_is_read_at_call_time() {
    let transport = StubTransport::with_replies(vec![Ok(TransportReply::text("{\"a\":1}"))]);
    let store = key_store(None);
    let gateway = GenerationGateway::new(
        Arc::new(transport.clone()),
        store.clone(),
        ModelRoute {
            fast_model: "fast-model".to_string(),
            quality_model: "quality-model".to_string(),
        },
        "Hindi",
    );

    store.set_override_credential("typed-key");
    gateway
        .generate(
            &GenerationRequest::topical_post("Ekadashi", "Fasting"),
            &SINGLE_FIELD,
            ModelTier::Fast,
        )
        .await
        .expect("override credential should be used");

    assert_eq!(transport.seen_calls().await[0].credential, "typed-key");
}

#[tokio::test]
async fn probe_rejects_auth_failures_and_blank_keys() {
    let transport = StubTransport::with_replies(vec![
        Err(TransportError::Status {
            status: 400,
            provider_status: Some("INVALID_ARGUMENT".to_string()),
            reason: Some("API_KEY_INVALID".to_string()),
            message: "API key not valid".to_string(),
        }),
        Err(TransportError::Network("dns failure".to_string())),
        Ok(TransportReply::text("ok")),
    ]);
    let probe = ValidationProbe::new(Arc::new(transport.clone()), "fast-model");

    assert!(!probe.probe("   ").await);
    assert_eq!(transport.calls().await, 0);

    assert!(!probe.probe("bad-key").await);
    assert!(!probe.probe("offline-key").await);
    assert!(probe.probe("good-key").await);

    let calls = transport.seen_calls().await;
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|call| call.max_output_tokens == Some(1)));
    assert!(calls.iter().all(|call| call.response_schema.is_none()));
}
