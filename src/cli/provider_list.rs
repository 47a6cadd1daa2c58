use std::error::Error;

use crate::auth::{AuthManager, Provider};
use crate::core::config::Config;

/// Rows of the provider table; the default provider gets a trailing `*`.
pub fn format_provider_lines(
    statuses: &[(&Provider, bool)],
    default_provider: Option<&str>,
) -> Vec<String> {
    statuses
        .iter()
        .map(|(provider, has_token)| {
            let auth_status = if *has_token { "✅" } else { "❌" };
            let is_default =
                default_provider.is_some_and(|d| d.eq_ignore_ascii_case(&provider.id));
            let id = if is_default {
                format!("{}*", provider.id)
            } else {
                provider.id.clone()
            };
            let custom = if provider.is_custom { " (custom)" } else { "" };
            format!(
                "  {auth_status} {id:<14} {}{custom}  {}",
                provider.display_name, provider.base_url
            )
        })
        .collect()
}

pub fn list_providers() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let auth_manager = AuthManager::from_config(&config, true);
    let statuses = auth_manager.provider_statuses();

    if statuses.is_empty() {
        println!("No providers configured.");
        return Ok(());
    }

    println!("Configured providers:\n");
    for line in format_provider_lines(&statuses, config.default_provider.as_deref()) {
        println!("{line}");
    }

    if config.default_provider.is_some() {
        println!("\n* = default provider");
    }
    println!("\n💡 Store an API key with:");
    println!("   fluentcoach auth <provider>");

    Ok(())
}
