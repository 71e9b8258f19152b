use serde::{Deserialize, Serialize};
use std::{
    env, fs,
    path::{Path, PathBuf},
};
use tracing::debug;
use url::Url;

use crate::auth::OAuthSettings;
use crate::error::{DashboardError, Result};
use crate::records::CsvOptions;

/// Env var naming the YAML config file.
pub const CONFIG_PATH_ENV: &str = "PMO_DASHBOARD_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "pmo-dashboard.yaml";

fn default_authority() -> String {
    "https://login.microsoftonline.com/common".to_string()
}

fn default_scopes() -> Vec<String> {
    vec!["Files.Read.All".to_string(), "Sites.Read.All".to_string()]
}

fn default_delimiter() -> char {
    ','
}

fn default_session_file() -> PathBuf {
    env::temp_dir().join("pmo-dashboard-session.json")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_authority")]
    pub authority: String,
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
    /// Drive item metadata URL of the export.
    #[serde(default)]
    pub file_url: String,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            authority: default_authority(),
            client_id: String::new(),
            redirect_uri: String::new(),
            scopes: default_scopes(),
            file_url: String::new(),
            delimiter: default_delimiter(),
            session_file: default_session_file(),
        }
    }
}

impl DashboardConfig {
    /// YAML file (from `PMO_DASHBOARD_CONFIG`, else `pmo-dashboard.yaml` if it
    /// exists), then `PMO_*` env overrides, then validation.
    pub fn load() -> Result<Self> {
        let explicit = env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let mut cfg = match explicit {
            Some(path) => Self::from_file(&path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        cfg.apply_overrides(|key| env::var(key).ok());
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "reading config");
        let text = fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).map_err(|e| DashboardError::Config(e.to_string()))
    }

    /// Apply `PMO_*` overrides using `lookup` (normally `std::env::var`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("PMO_AUTHORITY") {
            self.authority = v;
        }
        if let Some(v) = lookup("PMO_CLIENT_ID") {
            self.client_id = v;
        }
        if let Some(v) = lookup("PMO_REDIRECT_URI") {
            self.redirect_uri = v;
        }
        if let Some(v) = lookup("PMO_SCOPES") {
            self.scopes = v.split_whitespace().map(str::to_string).collect();
        }
        if let Some(v) = lookup("PMO_FILE_URL") {
            self.file_url = v;
        }
        if let Some(v) = lookup("PMO_SESSION_FILE") {
            self.session_file = PathBuf::from(v);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(DashboardError::Config("client_id is required".into()));
        }
        if self.scopes.is_empty() {
            return Err(DashboardError::Config("at least one scope is required".into()));
        }
        if !self.delimiter.is_ascii() || matches!(self.delimiter, '"' | '\n' | '\r') {
            return Err(DashboardError::Config(format!(
                "{:?} cannot be used as a delimiter",
                self.delimiter
            )));
        }
        for (name, value) in [
            ("authority", &self.authority),
            ("redirect_uri", &self.redirect_uri),
            ("file_url", &self.file_url),
        ] {
            Url::parse(value)
                .map_err(|e| DashboardError::Config(format!("{name} `{value}`: {e}")))?;
        }
        Ok(())
    }

    pub fn oauth(&self) -> OAuthSettings {
        OAuthSettings {
            authority: self.authority.clone(),
            client_id: self.client_id.clone(),
            redirect_uri: self.redirect_uri.clone(),
            scopes: self.scopes.clone(),
        }
    }

    pub fn csv_options(&self) -> CsvOptions {
        CsvOptions {
            delimiter: self.delimiter as u8,
        }
    }

    pub fn file_url(&self) -> Result<Url> {
        Ok(Url::parse(&self.file_url)?)
    }
}
