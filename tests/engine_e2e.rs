//! End-to-end engine behavior with mocked and stubbed providers

mod mocks;

use std::sync::Arc;
use std::time::{Duration, Instant};

use mocks::*;
use nutriscan::config::{load_config_from_str, ConfigurableValue};
use nutriscan::mocks::{
	mock_provider_settings, mock_settings, sample_input, sample_items, MockBehavior,
	MockProviderAdapter,
};
use nutriscan::{
	AnalysisInput, CancellationToken, Confidence, CredentialSet, Engine, EngineBuilder,
	EngineError, ExecutionMode, MergeStrategy, Settings, GEMINI_ADAPTER_ID, OPENAI_ADAPTER_ID,
};

async fn ready_engine(settings: Settings, adapter: &MockProviderAdapter) -> Engine {
	let engine = EngineBuilder::new()
		.with_settings(settings)
		.with_adapter(Arc::new(adapter.clone()))
		.build()
		.unwrap();
	engine.initialize(None).await.unwrap();
	engine
}

#[tokio::test]
async fn test_partial_failure_still_aggregates() {
	let adapter = MockProviderAdapter::new()
		.returning("alpha", vec![rice(150.0, 200.0)])
		.returning("beta", vec![rice(170.0, 220.0)])
		.on("gamma", MockBehavior::TransportFailure);
	let settings = mock_settings(&["alpha", "beta", "gamma"], Some("central"));
	let engine = ready_engine(settings, &adapter).await;

	let result = engine
		.analyze(sample_input(), &CredentialSet::new())
		.await
		.unwrap();

	assert_eq!(result.mode, ExecutionMode::MultiProvider);
	assert_eq!(result.providers_used, 2);
	assert_eq!(result.providers_attempted, 3);
	assert_eq!(result.confidence, Confidence::High);
	assert_eq!(result.items.len(), 1);
	assert_eq!(result.items[0].quantity, 160.0);
	assert_eq!(result.items[0].calories, 210.0);
	assert_eq!(result.totals.calories, 210.0);
	assert_eq!(adapter.calls_for("central"), 0);
}

#[tokio::test]
async fn test_single_success_is_medium_confidence() {
	let adapter = MockProviderAdapter::new()
		.returning("alpha", sample_items())
		.on("beta", MockBehavior::Empty);
	let engine = ready_engine(mock_settings(&["alpha", "beta"], None), &adapter).await;

	let result = engine
		.analyze(sample_input(), &CredentialSet::new())
		.await
		.unwrap();
	assert_eq!(result.confidence, Confidence::Medium);
	assert_eq!(result.contributing_providers, vec!["alpha".to_string()]);
	assert_eq!(result.totals.calories, 398.0);
}

#[tokio::test]
async fn test_fallback_runs_exactly_once() {
	let adapter = MockProviderAdapter::new()
		.on("alpha", MockBehavior::Malformed)
		.on("beta", MockBehavior::TransportFailure)
		.returning("central", sample_items());
	let settings = mock_settings(&["alpha", "beta"], Some("central"));
	let engine = ready_engine(settings, &adapter).await;

	let result = engine
		.analyze(sample_input(), &CredentialSet::new())
		.await
		.unwrap();

	assert_eq!(result.mode, ExecutionMode::SingleProviderFallback);
	assert_eq!(result.confidence, Confidence::Low);
	assert_eq!(result.providers_used, 1);
	assert_eq!(result.providers_attempted, 3);
	assert_eq!(result.contributing_providers, vec!["central".to_string()]);
	assert_eq!(adapter.calls_for("central"), 1);
}

#[tokio::test]
async fn test_exhaustion_stops_after_fallback() {
	let adapter = MockProviderAdapter::new();
	let settings = mock_settings(&["alpha", "beta"], Some("central"));
	let engine = ready_engine(settings, &adapter).await;

	let err = engine
		.analyze(sample_input(), &CredentialSet::new())
		.await
		.unwrap_err();

	assert!(matches!(err, EngineError::ProvidersExhausted { .. }));
	assert_eq!(err.providers_attempted(), 3);
	assert_eq!(adapter.call_count(), 3);
	assert_eq!(adapter.calls_for("central"), 1);
}

#[tokio::test]
async fn test_exhaustion_without_fallback() {
	let adapter = MockProviderAdapter::new().otherwise(MockBehavior::Malformed);
	let engine = ready_engine(mock_settings(&["alpha", "beta"], None), &adapter).await;

	let err = engine
		.analyze(sample_input(), &CredentialSet::new())
		.await
		.unwrap_err();
	assert_eq!(err.providers_attempted(), 2);
}

#[tokio::test]
async fn test_no_providers_configured() {
	let engine = ready_engine(Settings::default(), &MockProviderAdapter::new()).await;
	let err = engine
		.analyze(sample_input(), &CredentialSet::new())
		.await
		.unwrap_err();
	assert_eq!(err, EngineError::NoProviders);
}

#[tokio::test]
async fn test_fallback_only_configuration() {
	let adapter = MockProviderAdapter::new().returning("central", sample_items());
	let engine = ready_engine(mock_settings(&[], Some("central")), &adapter).await;

	let result = engine
		.analyze(sample_input(), &CredentialSet::new())
		.await
		.unwrap();
	assert_eq!(result.mode, ExecutionMode::SingleProviderFallback);
	assert_eq!(result.providers_attempted, 1);
}

#[tokio::test]
async fn test_empty_image_fails_every_provider_without_calling_them() {
	let adapter = MockProviderAdapter::new().returning("alpha", sample_items());
	let engine = ready_engine(mock_settings(&["alpha"], None), &adapter).await;

	let err = engine
		.analyze(AnalysisInput::new("", "image/png"), &CredentialSet::new())
		.await
		.unwrap_err();
	assert!(matches!(err, EngineError::ProvidersExhausted { .. }));
	assert_eq!(adapter.call_count(), 0);
}

#[tokio::test]
async fn test_global_deadline_keeps_fast_results() {
	let adapter = MockProviderAdapter::new()
		.returning("fast", sample_items())
		.returning("slow", sample_items())
		.with_delay("slow", 3_000);
	let mut settings = mock_settings(&["fast", "slow"], None);
	settings.timeouts.global_ms = 200;
	let engine = ready_engine(settings, &adapter).await;

	let started = Instant::now();
	let result = engine
		.analyze(sample_input(), &CredentialSet::new())
		.await
		.unwrap();

	assert!(started.elapsed() < Duration::from_secs(2));
	assert_eq!(result.contributing_providers, vec!["fast".to_string()]);
	assert_eq!(result.providers_attempted, 2);
	assert_eq!(result.confidence, Confidence::Medium);
}

#[tokio::test]
async fn test_per_provider_timeout_triggers_fallback() {
	let adapter = MockProviderAdapter::new()
		.returning("alpha", sample_items())
		.with_delay("alpha", 2_000)
		.returning("central", sample_items());
	let mut settings = mock_settings(&["alpha"], Some("central"));
	if let Some(alpha) = settings.providers.get_mut("alpha") {
		alpha.timeout_ms = Some(100);
	}
	let engine = ready_engine(settings, &adapter).await;

	let result = engine
		.analyze(sample_input(), &CredentialSet::new())
		.await
		.unwrap();
	assert_eq!(result.mode, ExecutionMode::SingleProviderFallback);
}

#[tokio::test]
async fn test_shutdown_cancels_in_flight_request() {
	let adapter = MockProviderAdapter::new()
		.returning("alpha", sample_items())
		.with_delay("alpha", 5_000);
	let engine = Arc::new(ready_engine(mock_settings(&["alpha"], None), &adapter).await);

	let running = {
		let engine = Arc::clone(&engine);
		tokio::spawn(async move {
			engine
				.analyze(sample_input(), &CredentialSet::new())
				.await
		})
	};
	tokio::time::sleep(Duration::from_millis(50)).await;
	engine.shutdown().await;

	let err = tokio::time::timeout(Duration::from_secs(2), running)
		.await
		.expect("request should end promptly")
		.unwrap()
		.unwrap_err();
	assert_eq!(err, EngineError::Cancelled);
}

#[tokio::test]
async fn test_caller_cancellation_skips_fallback() {
	let adapter = MockProviderAdapter::new()
		.returning("alpha", sample_items())
		.with_delay("alpha", 5_000)
		.returning("central", sample_items());
	let engine = ready_engine(mock_settings(&["alpha"], Some("central")), &adapter).await;

	let cancel = CancellationToken::new();
	let trigger = cancel.clone();
	tokio::spawn(async move {
		tokio::time::sleep(Duration::from_millis(50)).await;
		trigger.cancel();
	});

	let err = engine
		.analyze_with_cancel(sample_input(), &CredentialSet::new(), cancel)
		.await
		.unwrap_err();
	assert_eq!(err, EngineError::Cancelled);
	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(adapter.calls_for("central"), 0);
}

#[tokio::test]
async fn test_signed_result_detects_tampering() {
	std::env::set_var("NUTRISCAN_E2E_SIGNING_KEY", "e2e-signing-key");
	let adapter = MockProviderAdapter::new()
		.returning("alpha", sample_items())
		.returning("beta", sample_items());
	let mut settings = mock_settings(&["alpha", "beta"], None);
	settings.security.signing_keys.insert(
		"kitchen".to_string(),
		ConfigurableValue::from_env("NUTRISCAN_E2E_SIGNING_KEY"),
	);
	settings.security.default_signing_identity = Some("kitchen".to_string());
	let engine = ready_engine(settings, &adapter).await;

	let result = engine
		.analyze(sample_input(), &CredentialSet::new())
		.await
		.unwrap();
	let proof = result.integrity.as_ref().unwrap();
	assert_eq!(proof.signer_id, "kitchen");
	assert_eq!(proof.algorithm, "HMAC-SHA256");
	assert!(engine.verify(&result).await.unwrap());

	let mut tampered = result.clone();
	tampered.items[0].name = "Fried rice".to_string();
	assert!(!engine.verify(&tampered).await.unwrap());

	let mut reordered = result;
	reordered.items.reverse();
	assert!(engine.verify(&reordered).await.unwrap());
}

#[tokio::test]
async fn test_fallback_results_are_unsigned() {
	let adapter = MockProviderAdapter::new().returning("central", sample_items());
	let mut settings = mock_settings(&["alpha"], Some("central"));
	settings.security.signing_keys.insert(
		"kitchen".to_string(),
		ConfigurableValue::from_plain("plain-signing-key"),
	);
	let engine = EngineBuilder::new()
		.with_settings(settings)
		.with_adapter(Arc::new(adapter.clone()))
		.build()
		.unwrap();
	engine.initialize(Some("kitchen")).await.unwrap();

	let result = engine
		.analyze(sample_input(), &CredentialSet::new())
		.await
		.unwrap();
	assert_eq!(result.mode, ExecutionMode::SingleProviderFallback);
	assert!(!result.is_signed());
}

#[tokio::test]
async fn test_missing_credential_only_fails_that_provider() {
	let adapter = MockProviderAdapter::new()
		.returning("alpha", sample_items())
		.returning("beta", sample_items());
	let mut settings = mock_settings(&["alpha"], None);
	let mut beta = mock_provider_settings("beta");
	beta.credential = Some(ConfigurableValue::from_env("NUTRISCAN_E2E_UNSET_CREDENTIAL"));
	settings.providers.insert("beta".to_string(), beta);
	let engine = ready_engine(settings, &adapter).await;

	let result = engine
		.analyze(sample_input(), &CredentialSet::new())
		.await
		.unwrap();
	assert_eq!(result.contributing_providers, vec!["alpha".to_string()]);
	assert_eq!(result.providers_attempted, 2);
	assert_eq!(adapter.calls_for("beta"), 0);
}

#[tokio::test]
async fn test_running_mean_strategy_from_config() {
	let toml = r#"
[aggregation]
merge_strategy = "running-mean"
"#;
	let mut settings = load_config_from_str(toml).unwrap();
	assert_eq!(settings.aggregation.merge_strategy, MergeStrategy::RunningMean);
	for id in ["a", "b", "c"] {
		settings
			.providers
			.insert(id.to_string(), mock_provider_settings(id));
	}

	let adapter = MockProviderAdapter::new()
		.returning("a", vec![rice(100.0, 100.0)])
		.returning("b", vec![rice(200.0, 200.0)])
		.returning("c", vec![rice(300.0, 300.0)]);
	let engine = ready_engine(settings, &adapter).await;

	let result = engine
		.analyze(sample_input(), &CredentialSet::new())
		.await
		.unwrap();
	assert_eq!(result.items[0].quantity, 200.0);
	assert_eq!(result.items[0].calories, 200.0);
}

#[tokio::test]
async fn test_http_providers_end_to_end() {
	let openai = StubProvider::spawn(StubReply::json(openai_completion(&meal_json(&[
		rice(150.0, 200.0),
		broccoli(),
	]))))
	.await;
	let gemini = StubProvider::spawn(StubReply::json(gemini_candidate(&meal_json(&[
		rice(170.0, 220.0),
	]))))
	.await;

	let mut settings = Settings::default();
	let mut openai_settings = mock_provider_settings("openai");
	openai_settings.adapter_id = OPENAI_ADAPTER_ID.to_string();
	openai_settings.endpoint = format!("{}/v1", openai.base_url);
	openai_settings.credential = None;
	let mut gemini_settings = mock_provider_settings("gemini");
	gemini_settings.adapter_id = GEMINI_ADAPTER_ID.to_string();
	gemini_settings.endpoint = format!("{}/v1beta", gemini.base_url);
	gemini_settings.credential = None;
	settings.providers.insert("openai".to_string(), openai_settings);
	settings.providers.insert("gemini".to_string(), gemini_settings);

	let engine = EngineBuilder::new().with_settings(settings).build().unwrap();
	engine.initialize(None).await.unwrap();

	let credentials = CredentialSet::new()
		.with("openai", "sk-e2e")
		.with("gemini", "g-e2e");
	let result = engine.analyze(sample_input(), &credentials).await.unwrap();

	assert_eq!(result.providers_used, 2);
	assert_eq!(result.confidence, Confidence::High);
	let rice_item = result
		.items
		.iter()
		.find(|item| item.normalized_key() == "rice")
		.unwrap();
	assert_eq!(rice_item.quantity, 160.0);
	assert_eq!(rice_item.calories, 210.0);
	assert!(result.items.iter().any(|item| item.name == "Broccoli"));
	assert_eq!(result.totals.calories, 237.0);

	assert_eq!(
		openai.requests()[0].headers.get("authorization").map(String::as_str),
		Some("Bearer sk-e2e")
	);
	assert_eq!(
		gemini.requests()[0].headers.get("x-goog-api-key").map(String::as_str),
		Some("g-e2e")
	);
}
