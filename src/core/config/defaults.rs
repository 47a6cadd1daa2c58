use crate::core::config::data::Config;

impl Config {
    pub fn get_default_model(&self, provider: &str) -> Option<&String> {
        let normalized = provider.to_lowercase();
        self.default_models
            .get(&normalized)
            .or_else(|| self.default_models.get(provider))
    }

    pub fn set_default_model(&mut self, provider: String, model: String) {
        let normalized = provider.to_lowercase();
        self.default_models.insert(normalized.clone(), model);
        if normalized != provider {
            self.default_models.remove(&provider);
        }
    }

    pub fn unset_default_model(&mut self, provider: &str) {
        let normalized = provider.to_lowercase();
        self.default_models.remove(&normalized);
        if normalized != provider {
            self.default_models.remove(provider);
        }
    }

    pub fn set_default_coach(&mut self, coach_id: String) {
        self.default_coach = Some(coach_id.to_lowercase());
    }

    pub fn unset_default_coach(&mut self) {
        self.default_coach = None;
    }

    /// Set the sampling temperature; providers accept values from 0 to 2.
    pub fn set_temperature(&mut self, value: f64) -> Result<(), String> {
        if !(0.0..=2.0).contains(&value) {
            return Err(format!("Temperature must be between 0 and 2, got {value}"));
        }
        self.temperature = Some(value);
        Ok(())
    }
}
