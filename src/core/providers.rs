use crate::core::builtin_providers::{find_builtin_provider, DEFAULT_PROVIDER_ID};
use crate::core::config::Config;
use crate::core::keyring::KeyringAccessError;
use std::error::Error;
use std::fmt;
use tracing::{debug, warn};

pub const API_KEY_ENV: &str = "FLUENTCOACH_API_KEY";
pub const BASE_URL_ENV: &str = "FLUENTCOACH_BASE_URL";

const DEFAULT_BASE_URL: &str = "https://api.siliconflow.com/v1";
const QUICK_FIXES: &[&str] = &[
    "fluentcoach auth siliconflow         # Store an API key (read from stdin)",
    "fluentcoach providers                # Check provider status",
    "export FLUENTCOACH_API_KEY=sk-...    # Use environment variable (defaults to SiliconFlow)",
];
const MODEL_QUICK_FIXES: &[&str] = &[
    "fluentcoach -m <model>                       # Pick a model for this run",
    "fluentcoach set default-model <provider> <model>",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderMetadata {
    pub id: String,
    pub display_name: String,
    pub base_url: String,
    pub default_model: Option<String>,
}

/// Everything needed to talk to one provider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProviderSession {
    pub api_key: String,
    pub base_url: String,
    pub provider_id: String,
    pub provider_display_name: String,
    pub default_model: Option<String>,
}

impl ProviderSession {
    /// Pick the model: explicit choice, then the configured default for this
    /// provider, then the provider's own default.
    pub fn resolve_model(
        &self,
        requested: Option<&str>,
        config: &Config,
    ) -> Result<String, ProviderResolutionError> {
        if let Some(model) = requested.map(str::trim).filter(|m| !m.is_empty()) {
            return Ok(model.to_string());
        }
        if let Some(model) = config.get_default_model(&self.provider_id) {
            return Ok(model.clone());
        }
        self.default_model
            .clone()
            .ok_or_else(|| ProviderResolutionError::model_not_configured(&self.provider_id))
    }
}

#[derive(Debug)]
pub struct ProviderResolutionError {
    message: String,
    quick_fixes: &'static [&'static str],
    exit_code: i32,
}

impl ProviderResolutionError {
    pub fn missing_authentication() -> Self {
        Self::new(
            format!(
                "❌ No API key stored and {API_KEY_ENV} environment variable not set\n\nPlease either:\n1. Run 'fluentcoach auth <provider>' and paste your key, or\n2. Set environment variables:\n   export {API_KEY_ENV}=\"your-api-key-here\"\n   export {BASE_URL_ENV}=\"{DEFAULT_BASE_URL}\"  # Optional"
            ),
            QUICK_FIXES,
            2,
        )
    }

    pub fn provider_not_configured(provider: &str) -> Self {
        Self::new(
            format!(
                "❌ No API key found for provider '{provider}'. Run 'fluentcoach auth {provider}' to store one."
            ),
            QUICK_FIXES,
            2,
        )
    }

    pub fn default_provider_missing(provider: &str) -> Self {
        Self::new(
            format!(
                "❌ No API key found for default provider '{provider}'. Run 'fluentcoach auth {provider}' to store one."
            ),
            QUICK_FIXES,
            2,
        )
    }

    pub fn model_not_configured(provider: &str) -> Self {
        Self::new(
            format!("❌ No model configured for provider '{provider}'."),
            MODEL_QUICK_FIXES,
            2,
        )
    }

    fn new(
        message: impl Into<String>,
        quick_fixes: &'static [&'static str],
        exit_code: i32,
    ) -> Self {
        Self {
            message: message.into(),
            quick_fixes,
            exit_code,
        }
    }

    pub fn quick_fixes(&self) -> &'static [&'static str] {
        self.quick_fixes
    }

    pub fn exit_code(&self) -> i32 {
        self.exit_code
    }
}

impl fmt::Display for ProviderResolutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl Error for ProviderResolutionError {}

pub enum ResolveSessionError {
    Provider(ProviderResolutionError),
    Source(Box<dyn Error>),
}

impl fmt::Debug for ResolveSessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveSessionError::Provider(err) => f
                .debug_struct("ResolveSessionError::Provider")
                .field("error", err)
                .finish(),
            ResolveSessionError::Source(err) => f
                .debug_struct("ResolveSessionError::Source")
                .field("error", err)
                .finish(),
        }
    }
}

impl From<ResolveSessionError> for Box<dyn Error> {
    fn from(err: ResolveSessionError) -> Self {
        match err {
            ResolveSessionError::Provider(err) => Box::new(err),
            ResolveSessionError::Source(err) => err,
        }
    }
}

/// Where provider metadata and stored API keys come from.
pub trait ProviderAuthSource {
    fn uses_keyring(&self) -> bool;
    fn find_provider_metadata(&self, provider: &str) -> Option<ProviderMetadata>;
    /// Returns `(base_url, api_key)` when a key is stored for the provider.
    fn get_auth_for_provider(
        &self,
        provider: &str,
    ) -> Result<Option<(String, String)>, Box<dyn Error>>;
    fn find_first_available_auth(&self) -> Option<(ProviderMetadata, String)>;
}

pub fn resolve_env_session() -> Result<ProviderSession, ProviderResolutionError> {
    let api_key = std::env::var(API_KEY_ENV)
        .ok()
        .filter(|key| !key.trim().is_empty())
        .ok_or_else(ProviderResolutionError::missing_authentication)?;

    let base_url = std::env::var(BASE_URL_ENV)
        .ok()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

    let session = match find_builtin_provider(DEFAULT_PROVIDER_ID) {
        Some(builtin) if builtin.base_url == base_url => ProviderSession {
            api_key,
            base_url,
            provider_id: builtin.id,
            provider_display_name: builtin.display_name,
            default_model: Some(builtin.default_model),
        },
        _ => ProviderSession {
            api_key,
            base_url,
            provider_id: "openai-compatible".to_string(),
            provider_display_name: "OpenAI-compatible".to_string(),
            default_model: None,
        },
    };
    debug!(provider = %session.provider_id, "Using credentials from environment");
    Ok(session)
}

pub fn resolve_session<S: ProviderAuthSource>(
    source: &S,
    config: &Config,
    provider_override: Option<&str>,
) -> Result<ProviderSession, ResolveSessionError> {
    let provider_override = provider_override.filter(|value| !value.is_empty());

    if let Some(provider_name) = provider_override {
        return resolve_specific_provider(source, provider_name);
    }

    if let Some(default_provider) = config.default_provider.as_deref() {
        return match source.get_auth_for_provider(default_provider) {
            Ok(Some((base_url, api_key))) => Ok(build_session(
                metadata_or_fallback(source, default_provider, &base_url),
                api_key,
                base_url,
            )),
            Ok(None) => Err(ResolveSessionError::Provider(
                ProviderResolutionError::default_provider_missing(default_provider),
            )),
            Err(err) => handle_keyring_failure(err, Some(default_provider)),
        };
    }

    if !source.uses_keyring() {
        return resolve_env_session().map_err(ResolveSessionError::Provider);
    }

    if let Some((metadata, api_key)) = source.find_first_available_auth() {
        return Ok(build_session(metadata, api_key, String::new()));
    }

    resolve_env_session().map_err(ResolveSessionError::Provider)
}

fn resolve_specific_provider<S: ProviderAuthSource>(
    source: &S,
    provider_name: &str,
) -> Result<ProviderSession, ResolveSessionError> {
    match source.get_auth_for_provider(provider_name) {
        Ok(Some((base_url, api_key))) => Ok(build_session(
            metadata_or_fallback(source, provider_name, &base_url),
            api_key,
            base_url,
        )),
        Ok(None) => Err(ResolveSessionError::Provider(
            ProviderResolutionError::provider_not_configured(provider_name),
        )),
        Err(err) => handle_keyring_failure(err, Some(provider_name)),
    }
}

fn metadata_or_fallback<S: ProviderAuthSource>(
    source: &S,
    provider_name: &str,
    base_url: &str,
) -> ProviderMetadata {
    source
        .find_provider_metadata(provider_name)
        .unwrap_or_else(|| ProviderMetadata {
            id: provider_name.to_string(),
            display_name: provider_name.to_string(),
            base_url: base_url.to_string(),
            default_model: None,
        })
}

fn handle_keyring_failure(
    err: Box<dyn Error>,
    provider_name: Option<&str>,
) -> Result<ProviderSession, ResolveSessionError> {
    match err.downcast::<KeyringAccessError>() {
        Ok(keyring_err) => {
            if keyring_err.is_recoverable() {
                warn!(
                    provider = provider_name.unwrap_or_default(),
                    error = %keyring_err,
                    "Unable to access stored credentials; falling back to environment variables"
                );
                resolve_env_session().map_err(ResolveSessionError::Provider)
            } else {
                Err(ResolveSessionError::Source(keyring_err))
            }
        }
        Err(original_err) => Err(ResolveSessionError::Source(original_err)),
    }
}

fn build_session(
    metadata: ProviderMetadata,
    api_key: String,
    base_url_from_auth: String,
) -> ProviderSession {
    let base_url = if base_url_from_auth.is_empty() {
        metadata.base_url.clone()
    } else {
        base_url_from_auth
    };

    ProviderSession {
        api_key,
        base_url,
        provider_id: metadata.id.to_lowercase(),
        provider_display_name: metadata.display_name,
        default_model: metadata.default_model,
    }
}
