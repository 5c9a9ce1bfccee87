//! Typed accessors over the settings key/value table.
//!
//! Settings are stored as individual string keys so the UI can update
//! them one at a time; this module is the only place that knows the key
//! names and encodings.

use chrono::NaiveDate;

use crate::error::Result;
use crate::provider::{ConnectionMode, ProviderConfig};
use crate::review::{Personality, ReviewWeights};
use crate::scoring::SelfReport;
use crate::storage::Database;

const KEY_PERSONALITY: &str = "personality";
const KEY_SANCTUARY_KEYWORDS: &str = "sanctuary_keywords";
const KEY_REVIEW_WEIGHTS: &str = "review_weights";
const KEY_SELF_REPORT: &str = "self_report";
const KEY_SELF_REPORT_DATE: &str = "self_report_date";
const KEY_CONNECTION_MODE: &str = "connection_mode";
const KEY_OLLAMA_HOST: &str = "ollama_host";
const KEY_OLLAMA_PORT: &str = "ollama_port";
const KEY_OLLAMA_MODEL: &str = "ollama_model";
const KEY_GEMINI_API_KEY: &str = "gemini_api_key";
const KEY_GEMINI_MODEL: &str = "gemini_model";

/// Typed view over the settings table.
pub struct SettingsStore<'a> {
    db: &'a mut Database,
}

impl<'a> SettingsStore<'a> {
    pub fn new(db: &'a mut Database) -> Self {
        SettingsStore { db }
    }

    // -----------------------------------------------------------------
    // Personality and review weights
    // -----------------------------------------------------------------

    pub fn personality(&self) -> Result<Personality> {
        Ok(self
            .db
            .setting_get(KEY_PERSONALITY)?
            .map(|v| Personality::parse(&v))
            .unwrap_or_default())
    }

    pub fn set_personality(&mut self, personality: Personality) -> Result<()> {
        self.db.setting_set(KEY_PERSONALITY, personality.as_str())?;
        Ok(())
    }

    /// The review weights in effect: an explicit override when one is
    /// stored, otherwise the personality's defaults.
    pub fn review_weights(&self) -> Result<ReviewWeights> {
        if let Some(json) = self.db.setting_get(KEY_REVIEW_WEIGHTS)? {
            if let Ok(weights) = serde_json::from_str::<ReviewWeights>(&json) {
                return Ok(weights);
            }
            tracing::warn!("stored review weights are unreadable, using personality defaults");
        }
        Ok(self.personality()?.default_weights())
    }

    pub fn set_review_weights(&mut self, weights: &ReviewWeights) -> Result<()> {
        let json = serde_json::to_string(weights)?;
        self.db.setting_set(KEY_REVIEW_WEIGHTS, &json)?;
        Ok(())
    }

    /// Drop the override and fall back to personality defaults.
    pub fn clear_review_weights(&mut self) -> Result<()> {
        self.db.setting_set_group(&[(KEY_REVIEW_WEIGHTS, None)])?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Sanctuary keywords
    // -----------------------------------------------------------------

    pub fn sanctuary_keywords(&self) -> Result<Vec<String>> {
        match self.db.setting_get(KEY_SANCTUARY_KEYWORDS)? {
            Some(json) => Ok(serde_json::from_str(&json).unwrap_or_default()),
            None => Ok(Vec::new()),
        }
    }

    pub fn set_sanctuary_keywords(&mut self, keywords: &[String]) -> Result<()> {
        let json = serde_json::to_string(keywords)?;
        self.db.setting_set(KEY_SANCTUARY_KEYWORDS, &json)?;
        Ok(())
    }

    // -----------------------------------------------------------------
    // Self-report
    // -----------------------------------------------------------------

    /// The stored self-report with the date it was made.
    pub fn self_report(&self) -> Result<Option<(SelfReport, NaiveDate)>> {
        let Some(raw) = self.db.setting_get(KEY_SELF_REPORT)? else {
            return Ok(None);
        };
        let Some(report) = SelfReport::parse(&raw) else {
            return Ok(None);
        };
        let Some(date) = self
            .db
            .setting_get(KEY_SELF_REPORT_DATE)?
            .and_then(|v| v.parse::<NaiveDate>().ok())
        else {
            return Ok(None);
        };
        Ok(Some((report, date)))
    }

    /// The self-report only if it was made today.
    pub fn self_report_today(&self, today: NaiveDate) -> Result<Option<SelfReport>> {
        Ok(self
            .self_report()?
            .filter(|(_, date)| *date == today)
            .map(|(report, _)| report))
    }

    // -----------------------------------------------------------------
    // Provider connection
    // -----------------------------------------------------------------

    /// Assemble the provider configuration from the individual keys,
    /// with defaults for anything unset.
    pub fn provider_config(&self) -> Result<ProviderConfig> {
        let defaults = ProviderConfig::default();
        let mode = self
            .db
            .setting_get(KEY_CONNECTION_MODE)?
            .map(|v| ConnectionMode::parse(&v))
            .unwrap_or(defaults.mode);

        let host = self
            .db
            .setting_get(KEY_OLLAMA_HOST)?
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let port = self
            .db
            .setting_get(KEY_OLLAMA_PORT)?
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(11434);

        Ok(ProviderConfig {
            mode,
            ollama_base_url: format!("http://{host}:{port}"),
            ollama_model: self
                .db
                .setting_get(KEY_OLLAMA_MODEL)?
                .unwrap_or(defaults.ollama_model),
            gemini_base_url: defaults.gemini_base_url,
            gemini_api_key: self
                .db
                .setting_get(KEY_GEMINI_API_KEY)?
                .unwrap_or_default(),
            gemini_model: self
                .db
                .setting_get(KEY_GEMINI_MODEL)?
                .unwrap_or(defaults.gemini_model),
        })
    }

    pub fn set_connection_mode(&mut self, mode: ConnectionMode) -> Result<()> {
        self.db.setting_set(KEY_CONNECTION_MODE, mode.as_str())?;
        Ok(())
    }

    pub fn set_ollama(&mut self, host: &str, port: u16, model: &str) -> Result<()> {
        self.db.setting_set_group(&[
            (KEY_OLLAMA_HOST, Some(host.to_string())),
            (KEY_OLLAMA_PORT, Some(port.to_string())),
            (KEY_OLLAMA_MODEL, Some(model.to_string())),
        ])?;
        Ok(())
    }

    pub fn set_gemini(&mut self, api_key: &str, model: &str) -> Result<()> {
        self.db.setting_set_group(&[
            (KEY_GEMINI_API_KEY, Some(api_key.to_string())),
            (KEY_GEMINI_MODEL, Some(model.to_string())),
        ])?;
        Ok(())
    }
}
