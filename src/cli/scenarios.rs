//! `fluentcoach scenarios`: list, add and remove practice scenarios.

use std::error::Error;

use crate::core::config::Config;
use crate::core::scenario::{all_scenarios, load_builtin_scenarios, Scenario};

pub fn format_scenario_lines(scenarios: &[Scenario]) -> Vec<String> {
    scenarios
        .iter()
        .map(|scenario| format!("  {} {}: {}", scenario.icon, scenario.title, scenario.prompt))
        .collect()
}

pub fn list_scenarios() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;

    println!("Practice scenarios:\n");
    for line in format_scenario_lines(&all_scenarios(&config)) {
        println!("{line}");
    }
    println!("\n💡 Start one with:");
    println!("   fluentcoach chat --scenario \"<title>\"");

    Ok(())
}

pub fn add_scenario(title: &str, prompt: &str, icon: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    if all_scenarios(&config)
        .iter()
        .any(|scenario| scenario.title.eq_ignore_ascii_case(title.trim()))
    {
        return Err(format!("A scenario titled '{}' already exists", title.trim()).into());
    }

    config.add_scenario(title, prompt, icon)?;
    config.save()?;
    println!("✅ Added scenario: {}", title.trim());
    Ok(())
}

pub fn remove_scenario(title: &str) -> Result<(), Box<dyn Error>> {
    let mut config = Config::load()?;
    if config.remove_scenario(title) {
        config.save()?;
        println!("✅ Removed scenario: {}", title.trim());
        return Ok(());
    }

    if load_builtin_scenarios()
        .iter()
        .any(|scenario| scenario.title.eq_ignore_ascii_case(title.trim()))
    {
        return Err(format!("'{}' is a built-in scenario and cannot be removed", title.trim()).into());
    }
    Err(format!("No custom scenario titled '{}'", title.trim()).into())
}
