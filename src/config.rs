//! Configuration loading.
//!
//! Sources, highest precedence first:
//! 1. Environment variables prefixed with `JOBDASH_`, nested with `__`
//!    (`JOBDASH_BACKEND__URL`, `JOBDASH_BACKEND__ANON_KEY`, ...)
//! 2. TOML file, by default `<config dir>/jobdash/config.toml`
//! 3. Defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const CONFIG_FILE_NAME: &str = "config.toml";
const SESSION_FILE_NAME: &str = "session.json";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub session: SessionConfig,
    pub auth: AuthConfig,
}

/// Where the hosted auth/data service lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project URL, e.g. `https://xyzcompany.supabase.co`
    pub url: String,
    /// Public (anon) API key sent with every request.
    pub anon_key: String,
    /// Table holding job applications.
    pub table: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Defaults to `<data dir>/jobdash/session.json`
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub oauth_provider: String,
    /// Where the provider sends the browser after an OAuth login.
    pub redirect_to: Option<String>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            table: "job_applications".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            oauth_provider: "google".to_string(),
            redirect_to: None,
        }
    }
}

impl Config {
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);
        tracing::debug!(path = %config_file.display(), "loading configuration");

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("JOBDASH_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn default_config_path() -> PathBuf {
        match directories::ProjectDirs::from("", "", "jobdash") {
            Some(dirs) => dirs.config_dir().join(CONFIG_FILE_NAME),
            None => PathBuf::from(CONFIG_FILE_NAME),
        }
    }

    pub fn session_path(&self) -> PathBuf {
        if let Some(path) = &self.session.path {
            return path.clone();
        }
        match directories::ProjectDirs::from("", "", "jobdash") {
            Some(dirs) => dirs.data_local_dir().join(SESSION_FILE_NAME),
            None => PathBuf::from(SESSION_FILE_NAME),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.backend.url.trim();
        if !url.is_empty() && !(url.starts_with("https://") || url.starts_with("http://")) {
            return Err(Error::ConfigValidation {
                message: format!("backend.url must be an http(s) URL, got '{url}'"),
            });
        }
        if self.backend.table.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "backend.table must not be empty".to_string(),
            });
        }
        if self.backend.timeout_secs == 0 {
            return Err(Error::ConfigValidation {
                message: "backend.timeout_secs must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

impl BackendConfig {
    /// Checks that enough is configured to reach the backend at all.
    pub fn require_endpoint(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: format!(
                    "backend.url is not set; add it to {} or set JOBDASH_BACKEND__URL",
                    Config::default_config_path().display()
                ),
            });
        }
        if self.anon_key.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "backend.anon_key is not set; set JOBDASH_BACKEND__ANON_KEY".to_string(),
            });
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The anon key with everything but its first few characters hidden.
    pub fn masked_key(&self) -> String {
        if self.anon_key.is_empty() {
            return "(not set)".to_string();
        }
        let shown: String = self.anon_key.chars().take(6).collect();
        format!("{shown}…")
    }
}
