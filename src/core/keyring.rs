//! Thin wrapper over the system keyring, one entry per provider id.

use keyring::Entry;
use std::error::Error;
use std::fmt;
use std::sync::Arc;

pub const KEYRING_SERVICE: &str = "fluentcoach";

/// Failure to reach or use the platform credential store.
///
/// `Recoverable` covers a locked or missing backend; callers may fall back
/// to environment variables. `Permanent` means the store answered but the
/// entry is unusable, which should be reported to the user.
#[derive(Debug)]
pub enum KeyringAccessError {
    Recoverable(keyring::Error),
    Permanent(keyring::Error),
}

impl KeyringAccessError {
    fn inner(&self) -> &keyring::Error {
        match self {
            KeyringAccessError::Recoverable(err) | KeyringAccessError::Permanent(err) => err,
        }
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, KeyringAccessError::Recoverable(_))
    }
}

impl From<keyring::Error> for KeyringAccessError {
    fn from(err: keyring::Error) -> Self {
        match err {
            keyring::Error::PlatformFailure(_) | keyring::Error::NoStorageAccess(_) => {
                KeyringAccessError::Recoverable(err)
            }
            other => KeyringAccessError::Permanent(other),
        }
    }
}

impl fmt::Display for KeyringAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_recoverable() {
            write!(f, "keyring unavailable: {}", self.inner())
        } else {
            write!(f, "keyring error: {}", self.inner())
        }
    }
}

impl Error for KeyringAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(self.inner())
    }
}

/// Cloneable handle so one lookup failure can be cached and returned again.
#[derive(Clone, Debug)]
pub struct SharedKeyringAccessError(Arc<KeyringAccessError>);

impl SharedKeyringAccessError {
    pub fn new(error: KeyringAccessError) -> Self {
        Self(Arc::new(error))
    }

    pub fn is_recoverable(&self) -> bool {
        self.0.is_recoverable()
    }
}

impl fmt::Display for SharedKeyringAccessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&*self.0, f)
    }
}

impl Error for SharedKeyringAccessError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.0.source()
    }
}

fn entry(provider_id: &str) -> Result<Entry, KeyringAccessError> {
    Ok(Entry::new(KEYRING_SERVICE, provider_id)?)
}

pub fn read_key(provider_id: &str) -> Result<Option<String>, KeyringAccessError> {
    match entry(provider_id)?.get_password() {
        Ok(key) => Ok(Some(key)),
        Err(keyring::Error::NoEntry) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub fn write_key(provider_id: &str, key: &str) -> Result<(), KeyringAccessError> {
    Ok(entry(provider_id)?.set_password(key)?)
}

/// Returns whether an entry existed.
pub fn delete_key(provider_id: &str) -> Result<bool, KeyringAccessError> {
    match entry(provider_id)?.delete_credential() {
        Ok(()) => Ok(true),
        Err(keyring::Error::NoEntry) => Ok(false),
        Err(err) => Err(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn backend_outages_are_recoverable() {
        let locked = KeyringAccessError::from(keyring::Error::NoStorageAccess(Box::new(
            io::Error::other("locked"),
        )));
        let failed = KeyringAccessError::from(keyring::Error::PlatformFailure(Box::new(
            io::Error::other("dbus down"),
        )));
        assert!(locked.is_recoverable());
        assert!(failed.is_recoverable());
        assert!(locked.to_string().starts_with("keyring unavailable: "));
    }

    #[test]
    fn unusable_entries_are_permanent() {
        let err = KeyringAccessError::from(keyring::Error::BadEncoding(vec![0xff]));
        assert!(!err.is_recoverable());
        assert!(err.to_string().starts_with("keyring error: "));
        assert!(err.source().is_some());
    }

    #[test]
    fn shared_error_clones_keep_the_classification() {
        let shared = SharedKeyringAccessError::new(KeyringAccessError::from(
            keyring::Error::NoStorageAccess(Box::new(io::Error::other("locked"))),
        ));
        let copy = shared.clone();
        assert!(copy.is_recoverable());
        assert_eq!(copy.to_string(), shared.to_string());
    }
}
