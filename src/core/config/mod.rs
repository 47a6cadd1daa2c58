pub mod data;
pub mod defaults;
pub mod io;

pub use data::{CoachProfile, Config, CustomProvider, Scenario};
pub use io::ConfigError;
