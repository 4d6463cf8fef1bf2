// src/config.rs
use crate::errors::PromptError;
use std::path::PathBuf;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub model: String,
    pub api_base: String,
    pub bind_addr: String,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, PromptError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, PromptError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_key = get("API_KEY")
            .or_else(|| get("GEMINI_API_KEY"))
            .ok_or_else(|| {
                PromptError::Configuration("API_KEY environment variable not set".to_string())
            })?;

        let max_upload_bytes = match get("MAX_UPLOAD_BYTES") {
            Some(raw) => raw.parse::<usize>().map_err(|e| {
                PromptError::Configuration(format!("MAX_UPLOAD_BYTES must be a byte count: {}", e))
            })?,
            None => DEFAULT_MAX_UPLOAD_BYTES,
        };

        Ok(Self {
            api_key,
            model: get("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base: get("GEMINI_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            bind_addr: get("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            static_dir: get("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("static")),
            max_upload_bytes,
        })
    }

    /// `static_dir` resolves against the working directory.
    pub fn static_dir_present(&self) -> bool {
        self.static_dir.is_dir()
    }
}
