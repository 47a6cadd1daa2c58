//! Providers known out of the box, embedded from `builtins/providers.toml`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuiltinProvider {
    pub id: String,
    pub display_name: String,
    pub base_url: String,
    pub default_model: String,
}

#[derive(Debug, Deserialize)]
struct BuiltinProvidersConfig {
    providers: Vec<BuiltinProvider>,
}

/// The provider used when nothing else is configured.
pub const DEFAULT_PROVIDER_ID: &str = "siliconflow";

pub fn load_builtin_providers() -> Vec<BuiltinProvider> {
    const CONFIG_CONTENT: &str = include_str!("../builtins/providers.toml");

    let config: BuiltinProvidersConfig =
        toml::from_str(CONFIG_CONTENT).expect("Failed to parse builtins/providers.toml");

    config.providers
}

/// Find a built-in provider by ID (case-insensitive)
pub fn find_builtin_provider(id: &str) -> Option<BuiltinProvider> {
    load_builtin_providers()
        .into_iter()
        .find(|p| p.id.eq_ignore_ascii_case(id.trim()))
}
