use std::sync::{Arc, PoisonError, RwLock};

use tracing::warn;

use crate::config::StudioConfig;

mod preferences;

pub use preferences::{
    FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, PreferenceStoreError,
};

/// Namespace key under which the saved credential is persisted.
pub const CREDENTIAL_PREFERENCE_KEY: &str = "studio.generative_api_key";

/// Source of the credential used for generation calls.
pub trait KeyStore: Send + Sync {
    /// Active credential, or an empty string when none is configured.
    fn resolve_active_credential(&self) -> String;

    fn set_override_credential(&self, value: &str);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Override,
    Preference,
    Ambient,
}

impl CredentialSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Override => "override",
            Self::Preference => "preference",
            Self::Ambient => "ambient",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedCredential {
    pub value: String,
    pub source: CredentialSource,
}

impl ResolvedCredential {
    /// Display form that keeps only the last four characters.
    pub fn masked(&self) -> String {
        let visible = self
            .value
            .chars()
            .rev()
            .take(4)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<String>();
        format!("****{visible}")
    }
}

/// Resolves override, then saved preference, then ambient default.
pub struct LayeredKeyStore {
    override_credential: RwLock<Option<String>>,
    preferences: Arc<dyn PreferenceStore>,
    ambient: Option<String>,
}

impl LayeredKeyStore {
    pub fn new(preferences: Arc<dyn PreferenceStore>, ambient: Option<String>) -> Self {
        Self {
            override_credential: RwLock::new(None),
            preferences,
            ambient: non_blank(ambient.as_deref()),
        }
    }

    pub fn from_config(config: &StudioConfig) -> Self {
        Self::new(
            Arc::new(FilePreferenceStore::new(config.preferences_path.clone())),
            config.ambient_credential.clone(),
        )
    }

    pub fn resolve(&self) -> Option<ResolvedCredential> {
        if let Some(value) = self.current_override() {
            return Some(ResolvedCredential {
                value,
                source: CredentialSource::Override,
            });
        }

        match self.preferences.get(CREDENTIAL_PREFERENCE_KEY) {
            Ok(saved) => {
                if let Some(value) = non_blank(saved.as_deref()) {
                    return Some(ResolvedCredential {
                        value,
                        source: CredentialSource::Preference,
                    });
                }
            }
            Err(err) => warn!("failed to read saved credential preference: {err}"),
        }

        self.ambient.clone().map(|value| ResolvedCredential {
            value,
            source: CredentialSource::Ambient,
        })
    }

    pub fn has_override(&self) -> bool {
        self.current_override().is_some()
    }

    /// Drops the session override. Returns whether one was set.
    pub fn clear_override(&self) -> bool {
        let mut guard = self
            .override_credential
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        guard.take().is_some()
    }

    pub fn save_preference(&self, value: &str) -> Result<(), PreferenceStoreError> {
        match non_blank(Some(value)) {
            Some(value) => self.preferences.set(CREDENTIAL_PREFERENCE_KEY, &value),
            None => self.clear_preference(),
        }
    }

    pub fn clear_preference(&self) -> Result<(), PreferenceStoreError> {
        self.preferences.remove(CREDENTIAL_PREFERENCE_KEY)
    }

    fn current_override(&self) -> Option<String> {
        self.override_credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl KeyStore for LayeredKeyStore {
    fn resolve_active_credential(&self) -> String {
        self.resolve()
            .map(|credential| credential.value)
            .unwrap_or_default()
    }

    fn set_override_credential(&self, value: &str) {
        let mut guard = self
            .override_credential
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *guard = non_blank(Some(value));
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
}
