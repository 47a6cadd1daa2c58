use crate::core::coach::CoachRegistry;
use crate::core::config::Config;
use std::error::Error;

/// One line per coach; `*` marks `active` (or the default when `None`).
pub fn format_coach_lines(coaches: &CoachRegistry, active: Option<&str>) -> Vec<String> {
    let marked = active
        .map(str::to_string)
        .or_else(|| coaches.default_profile().map(|coach| coach.id.clone()));

    coaches
        .list()
        .iter()
        .map(|coach| {
            let marker = if marked
                .as_deref()
                .is_some_and(|id| id.eq_ignore_ascii_case(&coach.id))
            {
                "*"
            } else {
                " "
            };
            format!("  {marker} {} ({})", coach.id, coach.display_name)
        })
        .collect()
}

pub fn list_coaches() -> Result<(), Box<dyn Error>> {
    let config = Config::load()?;
    let coaches = CoachRegistry::load(&config);

    println!("Available coaches:\n");
    for line in format_coach_lines(&coaches, None) {
        println!("{line}");
    }
    println!("\n* = default coach");
    println!("\n💡 Practice with a coach:");
    println!("   fluentcoach -c <coach-id>");

    Ok(())
}
