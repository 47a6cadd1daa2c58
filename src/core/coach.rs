use serde::Deserialize;
use tracing::warn;

use crate::core::config::Config;

pub use crate::core::config::CoachProfile;

pub const DEFAULT_COACH_ID: &str = "daily-coach";

#[derive(Debug, Deserialize)]
struct BuiltinCoachConfig {
    coaches: Vec<CoachProfile>,
}

pub fn load_builtin_coaches() -> Vec<CoachProfile> {
    const CONFIG_CONTENT: &str = include_str!("../builtins/coaches.toml");
    let config: BuiltinCoachConfig =
        toml::from_str(CONFIG_CONTENT).expect("Failed to parse builtins/coaches.toml");
    config.coaches
}

/// Read-only catalog of the coaches a session can switch between.
#[derive(Debug, Clone)]
pub struct CoachRegistry {
    coaches: Vec<CoachProfile>,
    default_index: usize,
}

impl CoachRegistry {
    /// Built-in coaches followed by the ones defined in configuration
    pub fn load(config: &Config) -> Self {
        let mut coaches = load_builtin_coaches();

        for custom in &config.coaches {
            if custom.id.trim().is_empty() || custom.system_prompt.trim().is_empty() {
                warn!(id = %custom.id, "Ignoring coach without an id or system prompt");
                continue;
            }
            match coaches
                .iter_mut()
                .find(|existing| existing.id.eq_ignore_ascii_case(&custom.id))
            {
                Some(existing) => *existing = custom.clone(),
                None => coaches.push(custom.clone()),
            }
        }

        Self::from_profiles(coaches, config.default_coach.as_deref())
    }

    pub fn from_profiles(coaches: Vec<CoachProfile>, default_id: Option<&str>) -> Self {
        let position = |id: &str| {
            coaches
                .iter()
                .position(|coach| coach.id.eq_ignore_ascii_case(id))
        };

        let default_index = match default_id {
            Some(id) => position(id).or_else(|| {
                warn!(coach = id, "Configured default coach not found");
                position(DEFAULT_COACH_ID)
            }),
            None => position(DEFAULT_COACH_ID),
        }
        .unwrap_or(0);

        Self {
            coaches,
            default_index,
        }
    }

    pub fn list(&self) -> &[CoachProfile] {
        &self.coaches
    }

    pub fn find(&self, id: &str) -> Option<&CoachProfile> {
        self.coaches
            .iter()
            .find(|coach| coach.id.eq_ignore_ascii_case(id.trim()))
    }

    pub fn default_profile(&self) -> Option<&CoachProfile> {
        self.coaches.get(self.default_index)
    }

    /// Look up a coach by id, or the default when no id is given
    pub fn resolve(&self, id: Option<&str>) -> Result<CoachProfile, String> {
        let found = match id.filter(|value| !value.trim().is_empty()) {
            Some(id) => self.find(id),
            None => self.default_profile(),
        };

        found.cloned().ok_or_else(|| {
            let available: Vec<&str> = self.coaches.iter().map(|c| c.id.as_str()).collect();
            format!(
                "Coach '{}' not found. Available coaches: {}",
                id.unwrap_or_default(),
                available.join(", ")
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn custom(id: &str, prompt: &str) -> CoachProfile {
        CoachProfile {
            id: id.to_string(),
            display_name: id.to_string(),
            system_prompt: prompt.to_string(),
        }
    }

    #[test]
    fn builtins_include_the_three_roles() {
        let ids: Vec<String> = load_builtin_coaches().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["daily-coach", "toefl-examiner", "campus-buddy"]);
    }

    #[test]
    fn default_is_daily_coach_without_config() {
        let registry = CoachRegistry::load(&Config::default());
        let coach = registry.default_profile().expect("default coach");
        assert_eq!(coach.id, DEFAULT_COACH_ID);
        assert!(coach.system_prompt.contains("English speaking coach"));
    }

    #[test]
    fn config_default_coach_is_honored_case_insensitively() {
        let config = Config {
            default_coach: Some("TOEFL-Examiner".to_string()),
            ..Default::default()
        };
        let registry = CoachRegistry::load(&config);
        assert_eq!(registry.default_profile().unwrap().id, "toefl-examiner");
    }

    #[test]
    fn unknown_default_falls_back_to_daily_coach() {
        let config = Config {
            default_coach: Some("pirate".to_string()),
            ..Default::default()
        };
        let registry = CoachRegistry::load(&config);
        assert_eq!(registry.default_profile().unwrap().id, DEFAULT_COACH_ID);
    }

    #[test]
    fn custom_coaches_extend_and_override_builtins() {
        let config = Config {
            coaches: vec![
                custom("interviewer", "You run mock job interviews."),
                custom("campus-buddy", "You are a British exchange student."),
                custom("broken", "   "),
            ],
            ..Default::default()
        };
        let registry = CoachRegistry::load(&config);

        assert_eq!(registry.list().len(), 4);
        assert!(registry.find("broken").is_none());
        assert_eq!(
            registry.find("interviewer").unwrap().system_prompt,
            "You run mock job interviews."
        );
        assert_eq!(
            registry.find("campus-buddy").unwrap().system_prompt,
            "You are a British exchange student."
        );
    }

    #[test]
    fn resolve_reports_available_ids() {
        let registry = CoachRegistry::load(&Config::default());
        assert_eq!(registry.resolve(None).unwrap().id, DEFAULT_COACH_ID);
        assert_eq!(registry.resolve(Some(" ")).unwrap().id, DEFAULT_COACH_ID);
        assert_eq!(
            registry.resolve(Some("campus-buddy")).unwrap().display_name,
            "Campus Buddy"
        );

        let err = registry.resolve(Some("pirate")).unwrap_err();
        assert!(err.contains("Coach 'pirate' not found"));
        assert!(err.contains("daily-coach, toefl-examiner, campus-buddy"));
    }
}
