use serde::Deserialize;

use crate::core::config::Config;

pub use crate::core::config::Scenario;

const CUSTOM_SCENARIO_ICON: &str = "✨";

#[derive(Debug, Deserialize)]
struct BuiltinScenarioConfig {
    scenarios: Vec<Scenario>,
}

pub fn load_builtin_scenarios() -> Vec<Scenario> {
    const CONFIG_CONTENT: &str = include_str!("../builtins/scenarios.toml");
    let config: BuiltinScenarioConfig =
        toml::from_str(CONFIG_CONTENT).expect("Failed to parse builtins/scenarios.toml");
    config.scenarios
}

/// Built-in scenarios followed by the user's own.
pub fn all_scenarios(config: &Config) -> Vec<Scenario> {
    let mut scenarios = load_builtin_scenarios();
    scenarios.extend(config.scenarios.iter().cloned());
    scenarios
}

pub fn find_scenario(config: &Config, title: &str) -> Option<Scenario> {
    let title = title.trim();
    all_scenarios(config)
        .into_iter()
        .find(|scenario| scenario.title.eq_ignore_ascii_case(title))
}

impl Config {
    pub fn add_scenario(&mut self, title: &str, prompt: &str, icon: &str) -> Result<(), String> {
        let title = title.trim();
        let prompt = prompt.trim();
        if title.is_empty() || prompt.is_empty() {
            return Err("A scenario needs both a title and a prompt".to_string());
        }

        let icon = match icon.trim() {
            "" => CUSTOM_SCENARIO_ICON,
            icon => icon,
        };

        self.scenarios.push(Scenario {
            title: title.to_string(),
            prompt: prompt.to_string(),
            icon: icon.to_string(),
        });
        Ok(())
    }

    /// Remove custom scenarios with this title; built-ins cannot be removed.
    pub fn remove_scenario(&mut self, title: &str) -> bool {
        let title = title.trim();
        let before = self.scenarios.len();
        self.scenarios
            .retain(|scenario| !scenario.title.eq_ignore_ascii_case(title));
        self.scenarios.len() != before
    }
}
