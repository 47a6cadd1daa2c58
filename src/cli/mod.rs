//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod chat;
pub mod coach_list;
pub mod provider_list;
pub mod say;
pub mod scenarios;
pub mod settings;
pub mod setup;


use std::error::Error;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::auth::AuthManager;
use crate::cli::chat::run_chat;
use crate::cli::coach_list::list_coaches;
use crate::cli::provider_list::list_providers;
use crate::cli::say::run_say;
use crate::cli::scenarios::{add_scenario, list_scenarios, remove_scenario};
use crate::cli::settings::{run_set, run_unset, SettingError};
use crate::cli::setup::SessionOptions;
use crate::core::providers::ProviderResolutionError;

#[derive(Parser)]
#[command(name = "fluentcoach")]
#[command(version)]
#[command(about = "Practice spoken-style English with an AI conversation coach")]
#[command(
    long_about = "FluentCoach is a terminal chat client for practicing English with an AI coach. \
Pick a coach (everyday conversation, TOEFL examiner, campus buddy) or a practice scenario, \
and replies stream in as they are generated.\n\n\
Authentication:\n\
  Use 'fluentcoach auth <provider>' to store an API key in your system keyring.\n\
  Built in: SiliconFlow, Groq and Gemini; custom OpenAI-compatible providers go in config.toml.\n\n\
Environment Variables:\n\
  FLUENTCOACH_API_KEY    API key (used when no key is stored, or with --env)\n\
  FLUENTCOACH_BASE_URL   API base URL (optional, defaults to SiliconFlow)\n\
  FLUENTCOACH_LOG        Diagnostic log filter, e.g. debug or fluentcoach=trace\n\
  FLUENTCOACH_CONFIG     Path to an alternate config.toml\n\n\
Commands inside a chat:\n\
  /role [id]         Switch coach\n\
  /scenario [title]  Start a practice scenario\n\
  /clear             Forget the conversation so far\n\
  /quit              Leave"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Provider to use (see 'fluentcoach providers')
    #[arg(short = 'p', long, global = true, value_name = "PROVIDER")]
    pub provider: Option<String>,

    /// Model to request from the provider
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Coach to practice with (see 'fluentcoach coaches')
    #[arg(short = 'c', long, global = true, value_name = "COACH")]
    pub coach: Option<String>,

    /// Append the conversation to this transcript file
    #[arg(short = 'l', long, global = true, value_name = "FILE")]
    pub log: Option<PathBuf>,

    /// Use FLUENTCOACH_API_KEY/FLUENTCOACH_BASE_URL and skip the keyring
    #[arg(long, global = true)]
    pub env: bool,

    /// Wait for the whole reply instead of streaming it
    #[arg(long, global = true)]
    pub no_stream: bool,
}

impl Args {
    fn session_options(&self) -> SessionOptions {
        SessionOptions {
            provider: self.provider.clone(),
            model: self.model.clone(),
            coach: self.coach.clone(),
            env_only: self.env,
            no_stream: self.no_stream,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start an interactive practice session (default)
    Chat {
        /// Open the session with a practice scenario
        #[arg(short = 's', long, value_name = "TITLE")]
        scenario: Option<String>,
    },
    /// Send a single message and print the coach's reply
    Say {
        /// The message to send
        #[arg(trailing_var_arg = true, required = true)]
        prompt: Vec<String>,
    },
    /// List available coaches
    Coaches,
    /// List providers and whether an API key is stored for them
    Providers,
    /// List or manage practice scenarios
    Scenarios {
        #[command(subcommand)]
        command: Option<ScenarioCommands>,
    },
    /// Store an API key for a provider (read from stdin)
    Auth {
        /// Provider id, e.g. siliconflow
        provider: String,
    },
    /// Remove the stored API key for a provider
    Deauth {
        /// Provider id, e.g. siliconflow
        provider: String,
    },
    /// Set configuration values (lists them when no key is given)
    Set {
        /// Configuration key to set
        key: Option<String>,
        /// Value to set for the key (can be multiple words for default-model)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
        /// Value to unset for the key (the provider for default-model)
        value: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum ScenarioCommands {
    /// List built-in and custom scenarios
    List,
    /// Add a custom scenario
    Add {
        /// Title shown in the list
        title: String,
        /// Opening message sent to the coach
        prompt: String,
        /// Emoji shown next to the title
        #[arg(long, default_value = "")]
        icon: String,
    },
    /// Remove a custom scenario
    Remove {
        /// Title of the scenario to remove
        title: String,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    let runtime = tokio::runtime::Runtime::new()?;

    match runtime.block_on(run(args)) {
        Ok(()) => Ok(()),
        Err(err) => {
            if let Some(provider_err) = err.downcast_ref::<ProviderResolutionError>() {
                eprintln!("{provider_err}");
                let fixes = provider_err.quick_fixes();
                if !fixes.is_empty() {
                    eprintln!();
                    eprintln!("💡 Quick fixes:");
                    for fix in fixes {
                        eprintln!("  • {fix}");
                    }
                }
                std::process::exit(provider_err.exit_code());
            }
            if let Some(setting_err) = err.downcast_ref::<SettingError>() {
                setting_err.print();
                std::process::exit(setting_err.exit_code());
            }
            Err(err)
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let options = args.session_options();

    match args.command.unwrap_or(Commands::Chat { scenario: None }) {
        Commands::Chat { scenario } => run_chat(options, args.log, scenario).await,
        Commands::Say { prompt } => run_say(options, args.log, prompt).await,
        Commands::Coaches => list_coaches(),
        Commands::Providers => list_providers(),
        Commands::Scenarios { command } => match command.unwrap_or(ScenarioCommands::List) {
            ScenarioCommands::List => list_scenarios(),
            ScenarioCommands::Add {
                title,
                prompt,
                icon,
            } => add_scenario(&title, &prompt, &icon),
            ScenarioCommands::Remove { title } => remove_scenario(&title),
        },
        Commands::Auth { provider } => {
            let auth_manager = AuthManager::new()?;
            let key = read_api_key(&provider)?;
            auth_manager.store_token(&provider, &key)?;
            println!("✅ Stored API key for {provider}");
            Ok(())
        }
        Commands::Deauth { provider } => {
            let auth_manager = AuthManager::new()?;
            if auth_manager.remove_token(&provider)? {
                println!("✅ Removed API key for {provider}");
            } else {
                println!("No API key was stored for {provider}");
            }
            Ok(())
        }
        Commands::Set { key, value } => Ok(run_set(key, value)?),
        Commands::Unset { key, value } => Ok(run_unset(key, value)?),
    }
}

fn read_api_key(provider: &str) -> Result<String, Box<dyn Error>> {
    let stdin = io::stdin();
    if stdin.is_terminal() {
        print!("Enter API key for {provider}: ");
        io::stdout().flush()?;
    }

    let mut key = String::new();
    stdin.lock().read_line(&mut key)?;
    Ok(key.trim().to_string())
}
