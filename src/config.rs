use crate::layout::{LayoutError, TrackerLayout};
use std::{env, path::PathBuf};
use thiserror::Error;
use tokio::fs;

const MEMORY_PATH: &str = ":memory:";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {name}")]
    InvalidValue { name: &'static str, value: String },

    #[error("failed to read layout file: {0}")]
    LayoutIo(#[from] std::io::Error),

    #[error("failed to parse layout file: {0}")]
    LayoutParse(#[from] serde_json::Error),

    #[error("invalid layout: {0}")]
    Layout(#[from] LayoutError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    /// `None` keeps documents in memory only.
    pub data_path: Option<PathBuf>,
    pub app_id: String,
    pub layout_path: Option<PathBuf>,
    pub anonymous_auth: bool,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidValue { name: "PORT", value })?,
            None => 8080,
        };

        let data_path = match lookup("APP_DATA_PATH") {
            Some(path) if path == MEMORY_PATH => None,
            Some(path) => Some(PathBuf::from(path)),
            None => Some(PathBuf::from("data/state.json")),
        };

        let app_id = lookup("APP_ID")
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| "default-progress-tracker".to_string());

        let anonymous_auth = match lookup("APP_ANONYMOUS_AUTH") {
            Some(value) => parse_flag("APP_ANONYMOUS_AUTH", value)?,
            None => true,
        };

        Ok(Self {
            port,
            data_path,
            app_id,
            layout_path: lookup("APP_LAYOUT_PATH").map(PathBuf::from),
            anonymous_auth,
        })
    }

    pub fn tracker_id(&self) -> String {
        format!("tana-financial-tracker-{}", self.app_id)
    }

    pub async fn load_layout(&self) -> Result<TrackerLayout, ConfigError> {
        let layout = match &self.layout_path {
            Some(path) => serde_json::from_slice(&fs::read(path).await?)?,
            None => TrackerLayout::default(),
        };
        layout.validate()?;
        Ok(layout)
    }
}

fn parse_flag(name: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue { name, value }),
    }
}
