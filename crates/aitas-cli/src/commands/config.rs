//! Configuration commands for CLI.

use clap::Subcommand;
use aitas_core::provider::ConnectionMode;
use aitas_core::review::{Personality, ReviewWeights};
use aitas_core::storage::{Database, SettingsStore};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,
    /// Set the AI personality: standard, yuru, maji
    SetPersonality {
        /// Personality name
        personality: String,
    },
    /// Set the connection mode: local, cloud, hybrid
    SetMode {
        /// Mode name
        mode: String,
    },
    /// Configure the local Ollama backend
    SetOllama {
        /// Host name or address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Port
        #[arg(long, default_value = "11434")]
        port: u16,
        /// Model name
        #[arg(long, default_value = "llama3.2")]
        model: String,
    },
    /// Configure the hosted Gemini backend
    SetGemini {
        /// API key
        #[arg(long)]
        api_key: String,
        /// Model name
        #[arg(long, default_value = "gemini-2.0-flash")]
        model: String,
    },
    /// Replace the sanctuary keyword list
    SetKeywords {
        /// Keywords; task titles containing any of these are sanctuary
        keywords: Vec<String>,
    },
    /// Override the review weights
    SetWeights {
        #[arg(long)]
        necessity: f64,
        #[arg(long)]
        feasibility: f64,
        #[arg(long)]
        decomposition: f64,
        #[arg(long)]
        efficiency: f64,
    },
    /// Drop the weight override and use the personality defaults
    ClearWeights,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open()?;
    let mut settings = SettingsStore::new(&mut db);

    match action {
        ConfigAction::Show => {
            let summary = serde_json::json!({
                "personality": settings.personality()?,
                "review_weights": settings.review_weights()?,
                "sanctuary_keywords": settings.sanctuary_keywords()?,
                "provider": settings.provider_config()?,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        ConfigAction::SetPersonality { personality } => {
            let personality = Personality::parse(&personality);
            settings.set_personality(personality)?;
            println!("Personality set: {}", personality.as_str());
        }
        ConfigAction::SetMode { mode } => {
            let mode = ConnectionMode::parse(&mode);
            settings.set_connection_mode(mode)?;
            println!("Connection mode set: {}", mode.as_str());
        }
        ConfigAction::SetOllama { host, port, model } => {
            settings.set_ollama(&host, port, &model)?;
            println!("Ollama backend set: http://{host}:{port} ({model})");
        }
        ConfigAction::SetGemini { api_key, model } => {
            settings.set_gemini(&api_key, &model)?;
            println!("Gemini backend set: {model}");
        }
        ConfigAction::SetKeywords { keywords } => {
            settings.set_sanctuary_keywords(&keywords)?;
            println!("Sanctuary keywords set: {}", keywords.join(", "));
        }
        ConfigAction::SetWeights {
            necessity,
            feasibility,
            decomposition,
            efficiency,
        } => {
            let weights = ReviewWeights {
                necessity,
                feasibility,
                decomposition,
                efficiency,
            };
            settings.set_review_weights(&weights)?;
            println!("{}", serde_json::to_string_pretty(&weights)?);
        }
        ConfigAction::ClearWeights => {
            settings.clear_review_weights()?;
            println!("Review weights reset to personality defaults");
        }
    }
    Ok(())
}
