//! services/readerbot/src/config.rs
//!
//! Defines the bot's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local runs.

use readerbot_core::{CadencePolicy, DrawThresholds, MessageStyle, Summarizer};
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Credentials for posting to a Mastodon instance with a pre-issued access token.
#[derive(Clone, Debug)]
pub struct MastodonConfig {
    pub base_url: String,
    pub access_token: String,
}

/// The part of the configuration needed to open the history store and log.
#[derive(Clone, Debug)]
pub struct StoreConfig {
    pub database_url: String,
    pub log_level: Level,
}

impl StoreConfig {
    /// Loads only the storage and logging settings, e.g. for seeding.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url =
            lookup("DATABASE_URL").ok_or_else(|| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            database_url,
            log_level,
        })
    }
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub log_level: Level,
    pub sheet_url: String,
    pub min_gap_days: f64,
    pub mean_gap_days: f64,
    pub progress_draw_threshold: f64,
    pub rate_draw_threshold: f64,
    pub max_post_chars: Option<usize>,
    pub style: MessageStyle,
    pub mastodon: Option<MastodonConfig>,
}

/// Google Sheets CSV export URL for a spreadsheet key.
pub fn sheet_export_url(sheet_id: &str) -> String {
    format!(
        "https://spreadsheets.google.com/feeds/download/spreadsheets/Export?key={}&exportFormat=csv",
        sheet_id
    )
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory, but this is
    /// skipped in test builds to keep tests hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key/value lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        // --- Storage and Logging ---
        let StoreConfig {
            database_url,
            log_level,
        } = StoreConfig::from_lookup(&lookup)?;

        // --- Reading List Source ---
        let sheet_url = match lookup("SHEET_URL") {
            Some(url) => url,
            None => sheet_export_url(&required("SHEET_ID")?),
        };

        // --- Cadence and Draw Policy ---
        let min_gap_days = parse_var("MIN_GAP_DAYS", &or_default("MIN_GAP_DAYS", "2.5"))?;
        let mean_gap_days = parse_var("MEAN_GAP_DAYS", &or_default("MEAN_GAP_DAYS", "4.0"))?;
        let progress_draw_threshold = parse_var(
            "PROGRESS_DRAW_THRESHOLD",
            &or_default("PROGRESS_DRAW_THRESHOLD", "0.8"),
        )?;
        let rate_draw_threshold =
            parse_var("RATE_DRAW_THRESHOLD", &or_default("RATE_DRAW_THRESHOLD", "0.9"))?;

        // Zero disables the length limit.
        let max_post_chars = match parse_var::<usize>("MAX_POST_CHARS", &or_default("MAX_POST_CHARS", "270"))? {
            0 => None,
            n => Some(n),
        };

        // --- Message Style ---
        let defaults = MessageStyle::default();
        let style = MessageStyle {
            hashtag: lookup("HASHTAG").unwrap_or(defaults.hashtag),
            reader_name: lookup("READER_NAME").unwrap_or(defaults.reader_name),
            list_url: lookup("LIST_URL").unwrap_or(defaults.list_url),
            tracking_since: lookup("TRACKING_SINCE").unwrap_or(defaults.tracking_since),
        };

        // --- Publisher Credentials (optional) ---
        let mastodon = match (lookup("MASTODON_BASE_URL"), lookup("MASTODON_ACCESS_TOKEN")) {
            (Some(base_url), Some(access_token)) => Some(MastodonConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                access_token,
            }),
            _ => None,
        };

        let config = Self {
            database_url,
            log_level,
            sheet_url,
            min_gap_days,
            mean_gap_days,
            progress_draw_threshold,
            rate_draw_threshold,
            max_post_chars,
            style,
            mastodon,
        };

        // Surface inconsistent policy before any I/O happens.
        config.cadence_policy().map_err(|e| {
            ConfigError::InvalidValue("MIN_GAP_DAYS/MEAN_GAP_DAYS".to_string(), e.to_string())
        })?;
        config.summarizer().map_err(|e| {
            ConfigError::InvalidValue(
                "PROGRESS_DRAW_THRESHOLD/RATE_DRAW_THRESHOLD".to_string(),
                e.to_string(),
            )
        })?;

        Ok(config)
    }

    /// Mastodon credentials, required when posting there.
    pub fn require_mastodon(&self) -> Result<&MastodonConfig, ConfigError> {
        self.mastodon
            .as_ref()
            .ok_or_else(|| ConfigError::MissingVar("MASTODON_BASE_URL/MASTODON_ACCESS_TOKEN".to_string()))
    }

    pub fn cadence_policy(&self) -> readerbot_core::CoreResult<CadencePolicy> {
        CadencePolicy::new(self.min_gap_days, self.mean_gap_days)
    }

    pub fn summarizer(&self) -> readerbot_core::CoreResult<Summarizer> {
        let thresholds = DrawThresholds::new(self.progress_draw_threshold, self.rate_draw_threshold)?;
        Ok(Summarizer::new(thresholds, self.style.clone(), self.max_post_chars))
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(key.to_string(), format!("'{}' is not a number", value)))
}
