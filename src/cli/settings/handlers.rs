//! Handlers for each configuration key.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{format_bool, parse_bool, validate_coach, validate_provider};
use crate::cli::settings::SettingHandler;
use crate::core::config::Config;

/// Handler for the `default-provider` setting.
pub struct DefaultProviderHandler;

impl SettingHandler for DefaultProviderHandler {
    fn key(&self) -> &'static str {
        "default-provider"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: "To set a default provider, specify the provider:",
                example: "fluentcoach set default-provider groq",
            });
        }

        let provider = validate_provider(config, &args.join(" "))?;
        let message = format!("✅ Set default-provider to: {provider}");
        config.default_provider = Some(provider);
        Ok(message)
    }

    fn unset(&self, _arg: Option<&str>, config: &mut Config) -> Result<String, SettingError> {
        config.default_provider = None;
        Ok("✅ Unset default-provider".to_string())
    }

    fn format(&self, config: &Config) -> String {
        match &config.default_provider {
            Some(provider) => format!("  default-provider: {provider}"),
            None => "  default-provider: (unset)".to_string(),
        }
    }
}

/// Handler for the `default-coach` setting.
pub struct DefaultCoachHandler;

impl SettingHandler for DefaultCoachHandler {
    fn key(&self) -> &'static str {
        "default-coach"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: "To set a default coach, specify the coach id:",
                example: "fluentcoach set default-coach toefl-examiner",
            });
        }

        let coach = validate_coach(config, &args.join(" "))?;
        let message = format!("✅ Set default-coach to: {coach}");
        config.set_default_coach(coach);
        Ok(message)
    }

    fn unset(&self, _arg: Option<&str>, config: &mut Config) -> Result<String, SettingError> {
        config.unset_default_coach();
        Ok("✅ Unset default-coach".to_string())
    }

    fn format(&self, config: &Config) -> String {
        match &config.default_coach {
            Some(coach) => format!("  default-coach: {coach}"),
            None => "  default-coach: (unset)".to_string(),
        }
    }
}

/// Handler for the `temperature` setting.
pub struct TemperatureHandler;

impl SettingHandler for TemperatureHandler {
    fn key(&self) -> &'static str {
        "temperature"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        let [value] = args else {
            return Err(SettingError::MissingArgs {
                hint: "To set the sampling temperature, give one number between 0 and 2:",
                example: "fluentcoach set temperature 0.7",
            });
        };

        let value: f64 = value.trim().parse().map_err(|_| SettingError::InvalidValue {
            key: "temperature",
            reason: format!("'{value}' is not a number"),
        })?;
        config
            .set_temperature(value)
            .map_err(|reason| SettingError::InvalidValue {
                key: "temperature",
                reason,
            })?;
        Ok(format!("✅ Set temperature to: {value}"))
    }

    fn unset(&self, _arg: Option<&str>, config: &mut Config) -> Result<String, SettingError> {
        config.temperature = None;
        Ok("✅ Unset temperature (will use the provider default)".to_string())
    }

    fn format(&self, config: &Config) -> String {
        match config.temperature {
            Some(value) => format!("  temperature: {value}"),
            None => "  temperature: (unset, provider default)".to_string(),
        }
    }
}

/// Handler for the `streaming` setting.
pub struct StreamingHandler;

impl SettingHandler for StreamingHandler {
    fn key(&self) -> &'static str {
        "streaming"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        if args.is_empty() {
            return Err(SettingError::MissingArgs {
                hint: "To turn token streaming on or off, specify on or off:",
                example: "fluentcoach set streaming off",
            });
        }

        let input = args.join(" ");
        let value = parse_bool(&input).ok_or(SettingError::InvalidBoolean(input))?;
        config.streaming = Some(value);
        Ok(format!("✅ Set streaming to: {}", format_bool(value)))
    }

    fn unset(&self, _arg: Option<&str>, config: &mut Config) -> Result<String, SettingError> {
        config.streaming = None;
        Ok("✅ Unset streaming (will use default: on)".to_string())
    }

    fn format(&self, config: &Config) -> String {
        match config.streaming {
            Some(value) => format!("  streaming: {}", format_bool(value)),
            None => "  streaming: (unset, default: on)".to_string(),
        }
    }
}

/// Handler for the `default-model` setting, keyed by provider.
pub struct DefaultModelHandler;

impl SettingHandler for DefaultModelHandler {
    fn key(&self) -> &'static str {
        "default-model"
    }

    fn set(&self, args: &[String], config: &mut Config) -> Result<String, SettingError> {
        if args.len() < 2 {
            return Err(SettingError::MissingArgs {
                hint: "To set a default model, specify the provider and model:",
                example: "fluentcoach set default-model groq llama-3.1-8b-instant",
            });
        }

        let provider = validate_provider(config, &args[0])?;
        let model = args[1..].join(" ");
        let message = format!("✅ Set default-model for provider '{provider}' to: {model}");
        config.set_default_model(provider, model);
        Ok(message)
    }

    fn unset(&self, arg: Option<&str>, config: &mut Config) -> Result<String, SettingError> {
        let provider = arg.ok_or(SettingError::MissingArgs {
            hint: "To unset a default model, specify the provider:",
            example: "fluentcoach unset default-model groq",
        })?;

        let provider = validate_provider(config, provider)?;
        config.unset_default_model(&provider);
        Ok(format!("✅ Unset default-model for provider: {provider}"))
    }

    fn format(&self, config: &Config) -> String {
        if config.default_models.is_empty() {
            return "  default-models: (none set)".to_string();
        }

        let mut entries: Vec<_> = config.default_models.iter().collect();
        entries.sort_by_key(|(provider, _)| *provider);
        let mut lines = vec!["  default-models:".to_string()];
        lines.extend(
            entries
                .into_iter()
                .map(|(provider, model)| format!("    {provider}: {model}")),
        );
        lines.join("\n")
    }
}
