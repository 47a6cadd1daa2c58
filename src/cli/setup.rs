//! Shared startup for `chat` and `say`: config, credentials, model, coach.

use std::error::Error;
use std::sync::Arc;

use tracing::debug;

use crate::auth::AuthManager;
use crate::core::coach::{CoachProfile, CoachRegistry};
use crate::core::config::Config;
use crate::core::providers::{resolve_env_session, ProviderSession};
use crate::core::session::{ConversationSession, SessionEvent, SessionSettings};
use crate::core::transport::{ChatTransport, HttpTransport};
use tokio::sync::mpsc::UnboundedReceiver;

/// Command-line choices that shape a chat session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub coach: Option<String>,
    pub env_only: bool,
    pub no_stream: bool,
}

pub struct ChatContext {
    pub config: Config,
    pub provider: ProviderSession,
    pub coaches: CoachRegistry,
    pub coach: CoachProfile,
    pub settings: SessionSettings,
}

impl ChatContext {
    pub fn prepare(options: &SessionOptions) -> Result<Self, Box<dyn Error>> {
        let config = Config::load()?;

        let provider = if options.env_only {
            resolve_env_session()?
        } else {
            AuthManager::from_config(&config, true)
                .resolve_session(options.provider.as_deref(), &config)?
        };
        let model = provider.resolve_model(options.model.as_deref(), &config)?;

        let coaches = CoachRegistry::load(&config);
        let coach = coaches.resolve(options.coach.as_deref())?;

        let settings = SessionSettings {
            model,
            temperature: config.temperature,
            streaming: config.streaming_enabled() && !options.no_stream,
        };

        debug!(
            provider = %provider.provider_id,
            model = %settings.model,
            coach = %coach.id,
            streaming = settings.streaming,
            "Prepared chat session"
        );

        Ok(Self {
            config,
            provider,
            coaches,
            coach,
            settings,
        })
    }

    pub fn transport(&self) -> Arc<dyn ChatTransport> {
        Arc::new(HttpTransport::new(
            reqwest::Client::new(),
            &self.provider.base_url,
            &self.provider.api_key,
        ))
    }

    pub fn start_session(&self) -> (ConversationSession, UnboundedReceiver<SessionEvent>) {
        ConversationSession::new(
            self.transport(),
            self.coach.clone(),
            self.settings.clone(),
        )
    }
}
