use crate::core::builtin_providers::load_builtin_providers;
use crate::core::config::Config;
use crate::core::keyring::{self, SharedKeyringAccessError};
use crate::core::providers::{
    resolve_session, ProviderAuthSource, ProviderMetadata, ProviderSession,
};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Mutex, OnceLock};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provider {
    pub id: String,
    pub display_name: String,
    pub base_url: String,
    pub default_model: Option<String>,
    pub is_custom: bool,
}

impl Provider {
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            id: self.id.clone(),
            display_name: self.display_name.clone(),
            base_url: self.base_url.clone(),
            default_model: self.default_model.clone(),
        }
    }
}

/// Known providers plus the API keys stored for them in the system keyring.
pub struct AuthManager {
    providers: Vec<Provider>,
    use_keyring: bool,
}

#[derive(Clone, Debug)]
enum KeyringCacheEntry {
    Present(String),
    Missing,
    Error(SharedKeyringAccessError),
}

impl AuthManager {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        Self::new_with_keyring(true)
    }

    /// Construct an AuthManager, optionally disabling keyring access (`--env`, tests)
    pub fn new_with_keyring(use_keyring: bool) -> Result<Self, Box<dyn Error>> {
        let config = Config::load()?;
        Ok(Self::from_config(&config, use_keyring))
    }

    pub fn from_config(config: &Config, use_keyring: bool) -> Self {
        let mut providers: Vec<Provider> = load_builtin_providers()
            .into_iter()
            .map(|builtin| Provider {
                id: builtin.id,
                display_name: builtin.display_name,
                base_url: builtin.base_url,
                default_model: Some(builtin.default_model),
                is_custom: false,
            })
            .collect();

        for custom in config.list_custom_providers() {
            let provider = Provider {
                id: custom.id.clone(),
                display_name: custom.display_name.clone(),
                base_url: custom.base_url.clone(),
                default_model: custom.default_model.clone(),
                is_custom: true,
            };
            match providers
                .iter_mut()
                .find(|existing| existing.id.eq_ignore_ascii_case(&custom.id))
            {
                Some(existing) => *existing = provider,
                None => providers.push(provider),
            }
        }

        Self {
            providers,
            use_keyring,
        }
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn find_provider(&self, name: &str) -> Option<&Provider> {
        self.providers
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(name.trim()))
    }

    /// Pick the provider and API key for this run.
    pub fn resolve_session(
        &self,
        provider: Option<&str>,
        config: &Config,
    ) -> Result<ProviderSession, Box<dyn Error>> {
        Ok(resolve_session(self, config, provider)?)
    }

    pub fn store_token(&self, provider_name: &str, token: &str) -> Result<(), Box<dyn Error>> {
        let provider = self.require_provider(provider_name)?;
        let token = token.trim();
        if token.is_empty() {
            return Err("API key cannot be empty".into());
        }
        if !self.use_keyring {
            return Err("Keyring access is disabled; set FLUENTCOACH_API_KEY instead".into());
        }

        keyring::write_key(&provider.id, token)?;
        self.cache_lookup(&provider.id, KeyringCacheEntry::Present(token.to_string()));
        debug!(provider = %provider.id, "Stored API key");
        Ok(())
    }

    pub fn get_token(&self, provider_name: &str) -> Result<Option<String>, Box<dyn Error>> {
        if !self.use_keyring {
            return Ok(None);
        }
        if let Some(cached) = get_cached_entry(provider_name) {
            return match cached {
                KeyringCacheEntry::Present(token) => Ok(Some(token)),
                KeyringCacheEntry::Missing => Ok(None),
                KeyringCacheEntry::Error(err) => Err(Box::new(err)),
            };
        }

        match keyring::read_key(provider_name) {
            Ok(Some(token)) => {
                debug!(provider = provider_name, "Found stored API key");
                self.cache_lookup(provider_name, KeyringCacheEntry::Present(token.clone()));
                Ok(Some(token))
            }
            Ok(None) => {
                debug!(provider = provider_name, "No stored API key");
                self.cache_lookup(provider_name, KeyringCacheEntry::Missing);
                Ok(None)
            }
            Err(err) => {
                let shared_err = SharedKeyringAccessError::new(err);
                debug!(provider = provider_name, error = %shared_err, "Keyring lookup failed");
                self.cache_lookup(provider_name, KeyringCacheEntry::Error(shared_err.clone()));
                Err(Box::new(shared_err))
            }
        }
    }

    /// Delete the stored key; returns false when there was none.
    pub fn remove_token(&self, provider_name: &str) -> Result<bool, Box<dyn Error>> {
        let provider = self.require_provider(provider_name)?;
        if !self.use_keyring {
            return Err("Keyring access is disabled".into());
        }

        let removed = keyring::delete_key(&provider.id)?;
        self.cache_lookup(&provider.id, KeyringCacheEntry::Missing);
        Ok(removed)
    }

    /// Each provider with whether a key is stored for it.
    pub fn provider_statuses(&self) -> Vec<(&Provider, bool)> {
        self.providers
            .iter()
            .map(|provider| {
                let has_token = self.get_token(&provider.id).unwrap_or(None).is_some();
                (provider, has_token)
            })
            .collect()
    }

    pub fn get_auth_for_provider(
        &self,
        provider_name: &str,
    ) -> Result<Option<(String, String)>, Box<dyn Error>> {
        let Some(provider) = self.find_provider(provider_name) else {
            return Ok(None);
        };
        Ok(self
            .get_token(&provider.id)?
            .map(|token| (provider.base_url.clone(), token)))
    }

    pub fn find_first_available_auth(&self) -> Option<(&Provider, String)> {
        self.providers.iter().find_map(|provider| {
            self.get_token(&provider.id)
                .ok()
                .flatten()
                .map(|token| (provider, token))
        })
    }

    fn require_provider(&self, provider_name: &str) -> Result<&Provider, Box<dyn Error>> {
        self.find_provider(provider_name).ok_or_else(|| {
            let known: Vec<&str> = self.providers.iter().map(|p| p.id.as_str()).collect();
            format!(
                "Unknown provider '{provider_name}'. Known providers: {}",
                known.join(", ")
            )
            .into()
        })
    }

    fn cache_lookup(&self, provider_name: &str, entry: KeyringCacheEntry) {
        if !self.use_keyring {
            return;
        }

        if let Ok(mut cache) = token_cache().lock() {
            cache.insert(provider_name.to_lowercase(), entry);
        }
    }
}

fn get_cached_entry(provider_name: &str) -> Option<KeyringCacheEntry> {
    let cache = token_cache().lock().ok()?;
    cache.get(&provider_name.to_lowercase()).cloned()
}

fn token_cache() -> &'static Mutex<HashMap<String, KeyringCacheEntry>> {
    static TOKEN_CACHE: OnceLock<Mutex<HashMap<String, KeyringCacheEntry>>> = OnceLock::new();
    TOKEN_CACHE.get_or_init(|| Mutex::new(HashMap::new()))
}

impl ProviderAuthSource for AuthManager {
    fn uses_keyring(&self) -> bool {
        self.use_keyring
    }

    fn find_provider_metadata(&self, provider: &str) -> Option<ProviderMetadata> {
        self.find_provider(provider).map(Provider::metadata)
    }

    fn get_auth_for_provider(
        &self,
        provider: &str,
    ) -> Result<Option<(String, String)>, Box<dyn Error>> {
        AuthManager::get_auth_for_provider(self, provider)
    }

    fn find_first_available_auth(&self) -> Option<(ProviderMetadata, String)> {
        AuthManager::find_first_available_auth(self)
            .map(|(provider, token)| (provider.metadata(), token))
    }
}
