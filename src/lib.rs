//! FluentCoach is a terminal English speaking coach that chats with
//! OpenAI-compatible LLM APIs.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the conversation session, the SSE stream decoder, the
//!   HTTP transport, coach profiles, scenarios, provider resolution, and
//!   configuration.
//! - [`auth`] stores one API key per provider in the system keyring.
//! - [`cli`] parses arguments and runs the interactive chat and one-shot
//!   commands.
//! - [`api`] defines the chat completion payloads sent to and received from
//!   providers.
//!
//! The binary (`src/main.rs`) installs [`logging`] and routes through
//! [`crate::cli::main`].

pub mod api;
pub mod auth;
pub mod cli;
pub mod core;
pub mod logging;
pub mod utils;
