use std::sync::Arc;

use studio_core::config::StudioConfig;
use studio_core::credentials::{
    CredentialSource, KeyStore, LayeredKeyStore, PreferenceStoreError, ResolvedCredential,
};
use studio_core::llm::{
    GeminiTransport, GeminiTransportConfig, GenerationError, GenerationGateway, GenerationSource,
    ModelRoute, ModelTier, RecoveryAction, TransportBuildError, ValidationProbe,
    generate_with_telemetry,
};
use thiserror::Error;
use tokio::signal;
use tokio::time::{self, Duration};
use tracing::{info, warn};

use crate::cli::{Cli, Command, GenerateArgs, KeyAction, ProbeArgs};
use crate::request::{RequestError, build_request};

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error(transparent)]
    Transport(#[from] TransportBuildError),
    #[error(transparent)]
    Preferences(#[from] PreferenceStoreError),
    #[error("failed to encode generation result: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{}", .0.user_message())]
    Generation(GenerationError),
    #[error("the API key was not accepted by the content service")]
    CredentialRejected,
    #[error("no API key is configured")]
    NoCredential,
    #[error("--every must be at least 1 second")]
    InvalidInterval,
}

impl CommandError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Generation(_) | Self::CredentialRejected | Self::NoCredential => 1,
            _ => 2,
        }
    }
}

struct Studio {
    key_store: Arc<LayeredKeyStore>,
    transport: Arc<GeminiTransport>,
    route: ModelRoute,
    target_language: String,
}

impl Studio {
    fn new(cli_key: Option<&str>, config: &StudioConfig) -> Result<Self, CommandError> {
        let key_store = Arc::new(LayeredKeyStore::from_config(config));
        if let Some(key) = cli_key {
            key_store.set_override_credential(key);
        }

        Ok(Self {
            key_store,
            transport: Arc::new(GeminiTransport::new(GeminiTransportConfig::from(config))?),
            route: ModelRoute::from(config),
            target_language: config.target_language.clone(),
        })
    }

    fn gateway(&self) -> GenerationGateway {
        GenerationGateway::new(
            self.transport.clone(),
            self.key_store.clone(),
            self.route.clone(),
            self.target_language.clone(),
        )
    }

    fn probe(&self) -> ValidationProbe {
        ValidationProbe::new(self.transport.clone(), self.route.fast_model.clone())
    }
}

pub async fn run(cli: Cli, config: &StudioConfig) -> Result<(), CommandError> {
    let studio = Studio::new(cli.key.as_deref(), config)?;

    match cli.command {
        Command::Generate(args) => generate(&studio, &args).await,
        Command::Probe(args) => probe(&studio, &args).await,
        Command::Key { action } => key(&studio, action).await,
    }
}

async fn generate(studio: &Studio, args: &GenerateArgs) -> Result<(), CommandError> {
    let request = build_request(args)?;
    let descriptor = request.kind.descriptor();
    let tier = ModelTier::from_high_capability(args.quality);
    let credential_source = studio.key_store.resolve().map(|credential| credential.source);

    let (result, telemetry) = generate_with_telemetry(
        &studio.gateway(),
        GenerationSource::Cli,
        &request,
        descriptor,
        tier,
    )
    .await;
    telemetry.emit();

    match result {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(err) => {
            apply_recovery(&studio.key_store, &err, credential_source);
            Err(CommandError::Generation(err))
        }
    }
}

/// Caller-side policy; the gateway itself never retries.
fn apply_recovery(
    key_store: &LayeredKeyStore,
    err: &GenerationError,
    credential_source: Option<CredentialSource>,
) {
    match err.recovery() {
        RecoveryAction::ReplaceCredential => {
            if credential_source == Some(CredentialSource::Override) && key_store.clear_override()
            {
                warn!("discarded the rejected --key override");
            }
            if credential_source == Some(CredentialSource::Preference) {
                warn!("the saved key was rejected; run `studio key save <key>` with a new key");
            }
        }
        RecoveryAction::SupplyCredential => {
            warn!("set GEMINI_API_KEY, pass --key, or run `studio key save <key>`");
        }
        RecoveryAction::WaitAndRetry | RecoveryAction::RetryNow => {}
    }
}

async fn probe(studio: &Studio, args: &ProbeArgs) -> Result<(), CommandError> {
    let Some(credential) = studio.key_store.resolve() else {
        return Err(CommandError::NoCredential);
    };
    let validation_probe = studio.probe();

    let Some(every) = args.every else {
        return report_probe(&validation_probe, &credential).await;
    };
    if every == 0 {
        return Err(CommandError::InvalidInterval);
    }

    info!("probing {} every {every} seconds", credential.masked());
    let mut ticker = time::interval(Duration::from_secs(every));
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("shutdown signal received");
                return Ok(());
            }
            _ = ticker.tick() => {
                if let Err(err) = report_probe(&validation_probe, &credential).await {
                    warn!("{err}");
                }
            }
        }
    }
}

async fn report_probe(
    validation_probe: &ValidationProbe,
    credential: &ResolvedCredential,
) -> Result<(), CommandError> {
    let valid = validation_probe.probe(&credential.value).await;
    println!(
        "{} ({}): {}",
        credential.masked(),
        credential.source.as_str(),
        if valid { "valid" } else { "invalid" }
    );

    if valid {
        Ok(())
    } else {
        Err(CommandError::CredentialRejected)
    }
}

async fn key(studio: &Studio, action: KeyAction) -> Result<(), CommandError> {
    match action {
        KeyAction::Save { value, no_verify } => {
            if !no_verify && !studio.probe().probe(&value).await {
                return Err(CommandError::CredentialRejected);
            }
            studio.key_store.save_preference(&value)?;
            info!("saved API key");
            Ok(())
        }
        KeyAction::Clear => {
            studio.key_store.clear_preference()?;
            info!("removed saved API key");
            Ok(())
        }
        KeyAction::Show => {
            match studio.key_store.resolve() {
                Some(credential) => println!(
                    "{} ({})",
                    credential.masked(),
                    credential.source.as_str()
                ),
                None => println!("no API key configured"),
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use studio_core::credentials::{
        CredentialSource, KeyStore, LayeredKeyStore, MemoryPreferenceStore,
    };
    use studio_core::llm::GenerationError;

    use super::{CommandError, apply_recovery};

    fn key_store() -> LayeredKeyStore {
        LayeredKeyStore::new(
            Arc::new(MemoryPreferenceStore::default()),
            Some("ambient-key".to_string()),
        )
    }

    #[test]
    fn rejected_override_is_cleared() {
        let store = key_store();
        store.set_override_credential("typed-key");

        apply_recovery(
            &store,
            &GenerationError::InvalidCredential,
            Some(CredentialSource::Override),
        );

        assert!(!store.has_override());
        assert_eq!(store.resolve_active_credential(), "ambient-key");
    }

    #[test]
    fn quota_errors_keep_the_credential() {
        let store = key_store();
        store.set_override_credential("typed-key");

        apply_recovery(
            &store,
            &GenerationError::QuotaExceeded,
            Some(CredentialSource::Override),
        );

        assert_eq!(store.resolve_active_credential(), "typed-key");
    }

    #[test]
    fn generation_failures_exit_with_one_and_usage_errors_with_two() {
        assert_eq!(
            CommandError::Generation(GenerationError::QuotaExceeded).exit_code(),
            1
        );
        assert_eq!(CommandError::InvalidInterval.exit_code(), 2);
        assert_eq!(
            CommandError::Generation(GenerationError::QuotaExceeded).to_string(),
            "The usage limit has been reached. Please wait a moment and try again."
        );
    }
}
