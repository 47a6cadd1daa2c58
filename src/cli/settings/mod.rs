//! Settings management for CLI set/unset commands.
//!
//! Each configuration key has a handler that validates the arguments and
//! applies the change to an in-memory [`Config`]; [`run_set`] and
//! [`run_unset`] load the config file, apply the change, and save it.

pub mod error;
pub mod handlers;
pub mod helpers;
pub mod registry;

pub use error::SettingError;
pub use registry::SettingRegistry;

use crate::core::config::Config;

/// Trait for handling a configuration setting.
pub trait SettingHandler: Send + Sync {
    /// The configuration key this handler manages.
    fn key(&self) -> &'static str;

    /// Apply `args` (everything after the key) and return the success message.
    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError>;

    /// Clear the value; `arg` is the optional selector (e.g. provider id).
    fn unset(&self, arg: Option<&str>, config: &mut Config) -> Result<String, SettingError>;

    /// Current value as shown by `fluentcoach set` with no arguments.
    fn format(&self, config: &Config) -> String;
}

/// All settings in display order, one entry per line.
pub fn describe_all(registry: &SettingRegistry, config: &Config) -> String {
    let mut lines = vec!["Current configuration:".to_string()];
    for key in registry.keys_display_order() {
        if let Some(handler) = registry.get(key) {
            lines.push(handler.format(config));
        }
    }
    lines.join("\n")
}

pub fn apply_set(
    registry: &SettingRegistry,
    config: &mut Config,
    key: &str,
    args: &[String],
) -> Result<String, SettingError> {
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    handler.set(args, config)
}

pub fn apply_unset(
    registry: &SettingRegistry,
    config: &mut Config,
    key: &str,
    arg: Option<&str>,
) -> Result<String, SettingError> {
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    handler.unset(arg, config)
}

pub fn run_set(key: Option<String>, args: Vec<String>) -> Result<(), SettingError> {
    let registry = SettingRegistry::new();
    let mut config = load_config()?;

    let Some(key) = key else {
        println!("{}", describe_all(&registry, &config));
        return Ok(());
    };

    let message = apply_set(&registry, &mut config, &key, &args)?;
    save_config(&config)?;
    println!("{message}");
    Ok(())
}

pub fn run_unset(key: String, arg: Option<String>) -> Result<(), SettingError> {
    let registry = SettingRegistry::new();
    let mut config = load_config()?;
    let message = apply_unset(&registry, &mut config, &key, arg.as_deref())?;
    save_config(&config)?;
    println!("{message}");
    Ok(())
}

fn load_config() -> Result<Config, SettingError> {
    Config::load().map_err(|e| SettingError::ConfigError(e.to_string()))
}

fn save_config(config: &Config) -> Result<(), SettingError> {
    config
        .save()
        .map_err(|e| SettingError::ConfigError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::with_test_config_env;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn unknown_key_is_rejected() {
        let registry = SettingRegistry::new();
        let mut config = Config::default();
        let err = apply_set(&registry, &mut config, "theme", &args(&["dark"])).unwrap_err();
        assert!(matches!(err, SettingError::UnknownKey(key) if key == "theme"));
    }

    #[test]
    fn describe_lists_every_key_in_order() {
        let registry = SettingRegistry::new();
        let mut config = Config::default();
        apply_set(&registry, &mut config, "default-coach", &args(&["campus-buddy"])).unwrap();

        let text = describe_all(&registry, &config);
        let expected_prefixes = [
            "Current configuration:",
            "  default-provider: (unset)",
            "  default-coach: campus-buddy",
            "  temperature: (unset, provider default)",
            "  streaming: (unset, default: on)",
            "  default-models: (none set)",
        ];
        for (line, expected) in text.lines().zip(expected_prefixes) {
            assert_eq!(line, expected);
        }
    }

    #[test]
    fn run_set_persists_to_the_config_file() {
        with_test_config_env(|path| {
            run_set(Some("temperature".to_string()), args(&["0.3"])).expect("set succeeds");
            run_set(
                Some("default-model".to_string()),
                args(&["groq", "llama-3.3-70b-versatile"]),
            )
            .expect("set succeeds");

            let saved = Config::load_from_path(path).expect("config saved");
            assert_eq!(saved.temperature, Some(0.3));
            assert_eq!(
                saved.get_default_model("groq").map(String::as_str),
                Some("llama-3.3-70b-versatile")
            );

            run_unset("temperature".to_string(), None).expect("unset succeeds");
            let saved = Config::load_from_path(path).expect("config saved");
            assert_eq!(saved.temperature, None);
        });
    }

    #[test]
    fn failed_set_leaves_the_file_untouched() {
        with_test_config_env(|path| {
            let err = run_set(Some("temperature".to_string()), args(&["hot"])).unwrap_err();
            assert!(matches!(err, SettingError::InvalidValue { .. }));
            assert!(!path.exists());
        });
    }
}
