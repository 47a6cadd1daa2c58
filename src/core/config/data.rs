use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CustomProvider {
    pub id: String,
    pub display_name: String,
    pub base_url: String,
    pub default_model: Option<String>,
}

/// A coaching persona: the system prompt that shapes every reply.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CoachProfile {
    pub id: String,
    pub display_name: String,
    pub system_prompt: String,
}

/// A conversation starter shown in the scenario list.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub title: String,
    pub prompt: String,
    #[serde(default = "default_scenario_icon")]
    pub icon: String,
}

pub(crate) fn default_scenario_icon() -> String {
    "💬".to_string()
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    pub default_provider: Option<String>,
    /// Default model per provider id (lowercase)
    #[serde(default)]
    pub default_models: HashMap<String, String>,
    /// Coach used when none is given on the command line
    pub default_coach: Option<String>,
    /// Sampling temperature sent with every request
    pub temperature: Option<f64>,
    /// Stream replies token by token (defaults to true)
    pub streaming: Option<bool>,
    #[serde(default)]
    pub custom_providers: Vec<CustomProvider>,
    /// User-defined coaches; an entry reusing a built-in id replaces it
    #[serde(default)]
    pub coaches: Vec<CoachProfile>,
    /// User-defined scenarios, listed after the built-in ones
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}

impl Config {
    pub fn add_custom_provider(&mut self, provider: CustomProvider) {
        self.remove_custom_provider(&provider.id);
        self.custom_providers.push(provider);
    }

    pub fn remove_custom_provider(&mut self, id: &str) {
        self.custom_providers
            .retain(|p| !p.id.eq_ignore_ascii_case(id));
    }

    pub fn get_custom_provider(&self, id: &str) -> Option<&CustomProvider> {
        self.custom_providers
            .iter()
            .find(|p| p.id.eq_ignore_ascii_case(id))
    }

    pub fn list_custom_providers(&self) -> Vec<&CustomProvider> {
        self.custom_providers.iter().collect()
    }

    pub fn streaming_enabled(&self) -> bool {
        self.streaming.unwrap_or(true)
    }
}

impl CustomProvider {
    pub fn new(
        id: String,
        display_name: String,
        base_url: String,
        default_model: Option<String>,
    ) -> Self {
        Self {
            id,
            display_name,
            base_url,
            default_model,
        }
    }
}
