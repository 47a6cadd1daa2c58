pub mod builtin_providers;
pub mod coach;
pub mod config;
pub mod error;
pub mod keyring;
pub mod message;
pub mod providers;
pub mod scenario;
pub mod session;
pub mod sse;
pub mod transport;
