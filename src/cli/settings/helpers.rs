//! Helper functions for settings operations.

use crate::core::builtin_providers::find_builtin_provider;
use crate::core::coach::CoachRegistry;
use crate::core::config::Config;

use super::error::SettingError;

/// Parse a boolean value from user input.
///
/// Accepts: on/off, true/false, yes/no (case-insensitive).
pub fn parse_bool(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "on" | "true" | "yes" | "1" => Some(true),
        "off" | "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

pub fn format_bool(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

/// Canonical id of a built-in or custom provider.
pub fn validate_provider(config: &Config, input: &str) -> Result<String, SettingError> {
    let input = input.trim();
    if let Some(provider) = find_builtin_provider(input) {
        return Ok(provider.id);
    }

    if let Some(provider) = config.get_custom_provider(input) {
        return Ok(provider.id.clone());
    }

    Err(SettingError::UnknownProvider {
        input: input.to_string(),
    })
}

/// Canonical id of a built-in or configured coach.
pub fn validate_coach(config: &Config, input: &str) -> Result<String, SettingError> {
    let registry = CoachRegistry::load(config);
    if let Some(coach) = registry.find(input) {
        return Ok(coach.id.clone());
    }

    let available: Vec<&str> = registry.list().iter().map(|c| c.id.as_str()).collect();
    Err(SettingError::UnknownCoach {
        input: input.trim().to_string(),
        available: available.join(", "),
    })
}
