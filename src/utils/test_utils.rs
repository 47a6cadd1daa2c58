use crate::core::config::io::CONFIG_PATH_ENV;
use crate::core::providers::{API_KEY_ENV, BASE_URL_ENV};
use std::ffi::OsString;
use std::path::Path;
use std::sync::{Mutex, PoisonError};
use tempfile::TempDir;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Restores every variable it touched when dropped.
///
/// Only use inside [`with_test_config_env`], which serializes access to the
/// process environment.
#[derive(Default)]
pub struct TestEnvVarGuard {
    saved: Vec<(String, Option<OsString>)>,
}

impl TestEnvVarGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn remember(&mut self, key: &str) {
        if self.saved.iter().all(|(saved, _)| saved != key) {
            self.saved.push((key.to_string(), std::env::var_os(key)));
        }
    }

    pub fn set_var(&mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) {
        self.remember(key);
        std::env::set_var(key, value);
    }

    pub fn remove_var(&mut self, key: &str) {
        self.remember(key);
        std::env::remove_var(key);
    }
}

impl Drop for TestEnvVarGuard {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..).rev() {
            match value {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}

/// Run `f` with the config file redirected into a fresh temp dir and the
/// credential variables cleared. `f` receives the config file path.
pub fn with_test_config_env<F, R>(f: F) -> R
where
    F: FnOnce(&Path) -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    let temp_dir = TempDir::new().expect("failed to create temp config dir");
    let config_path = temp_dir.path().join("config.toml");

    let mut guard = TestEnvVarGuard::new();
    guard.set_var(CONFIG_PATH_ENV, &config_path);
    guard.remove_var(API_KEY_ENV);
    guard.remove_var(BASE_URL_ENV);

    f(&config_path)
}
