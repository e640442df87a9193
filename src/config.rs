//! Application settings
//!
//! Built-in defaults, overlaid by an optional TOML file, overlaid by
//! `JOINQUANT_`-prefixed environment variables (`__` separates sections,
//! e.g. `JOINQUANT_DATABASE__PATH`).

use crate::clients::fred::DEFAULT_BASE_URL;
use crate::error::{AppError, Result};
use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default settings file, resolved against the working directory
pub const DEFAULT_SETTINGS_FILE: &str = "joinquant.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub fred: FredSettings,
    pub catalog: CatalogSettings,
    pub digest: DigestSettings,
    pub mail: MailSettings,
    pub server: ServerSettings,
    pub schedule: ScheduleSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatabaseSettings {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FredSettings {
    pub base_url: String,
    /// Parameter path holding the API key
    pub api_key_path: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogSettings {
    /// Directory backing the file parameter store
    pub parameter_root: PathBuf,
    /// Series documents, merged in order
    pub series_paths: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DigestSettings {
    /// Channel whose rows are mailed
    pub channel: String,
    /// Public base URL of the web pages linked from digest headings
    pub web_base_url: String,
    pub subject: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MailSettings {
    pub endpoint: String,
    pub from: String,
    pub recipients: Vec<String>,
    /// Keychain entry holding relay credentials
    pub secret_id: String,
    /// Static credentials, used instead of the keychain when both are set
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleSettings {
    pub hour: u32,
    pub minute: u32,
    pub timezone: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database: DatabaseSettings {
                path: PathBuf::from("data/joinquant.db"),
            },
            fred: FredSettings {
                base_url: DEFAULT_BASE_URL.to_string(),
                api_key_path: "/joinquant/dev/fred/apikey".to_string(),
                timeout_secs: 30,
            },
            catalog: CatalogSettings {
                parameter_root: PathBuf::from("parameters"),
                series_paths: vec![
                    "/joinquant/dev/fred/series1".to_string(),
                    "/joinquant/dev/fred/series2".to_string(),
                ],
            },
            digest: DigestSettings {
                channel: "mail".to_string(),
                web_base_url: "http://localhost:5016".to_string(),
                subject: "Daily FRED Update".to_string(),
            },
            mail: MailSettings {
                endpoint: "http://localhost:8025/api/send".to_string(),
                from: "fred-bot@localhost".to_string(),
                recipients: Vec::new(),
                secret_id: "mail-relay".to_string(),
                username: None,
                password: None,
            },
            server: ServerSettings {
                host: "0.0.0.0".to_string(),
                port: 5016,
            },
            schedule: ScheduleSettings {
                hour: 7,
                minute: 0,
                timezone: "Australia/Sydney".to_string(),
            },
        }
    }
}

impl Settings {
    /// Load settings from defaults, the given (or default) TOML file, and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE));

        if path.is_some() && !file.exists() {
            return Err(AppError::Config(format!("Settings file {:?} not found", file)));
        }

        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(&file))
            .merge(Env::prefixed("JOINQUANT_").split("__"))
            .extract()?;

        settings.validate()?;
        tracing::debug!("Settings loaded from {:?}", file);
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.schedule.hour > 23 || self.schedule.minute > 59 {
            return Err(AppError::Config(format!(
                "Invalid schedule time {:02}:{:02}",
                self.schedule.hour, self.schedule.minute
            )));
        }
        self.schedule_timezone()?;
        Ok(())
    }

    /// Parsed schedule timezone
    pub fn schedule_timezone(&self) -> Result<Tz> {
        self.schedule
            .timezone
            .parse::<Tz>()
            .map_err(|e| AppError::Config(format!("Invalid timezone {}: {}", self.schedule.timezone, e)))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fred.timeout_secs)
    }
}
