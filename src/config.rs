use serde::Deserialize;

use crate::client::DEFAULT_BASE_URL;
use crate::error::{LdError, Result};

pub const TOKEN_ENV: &str = "LAUNCHDARKLY_API_TOKEN";
pub const BASE_URL_ENV: &str = "LAUNCHDARKLY_BASE_URL";
pub const PROXY_ENV: &str = "LAUNCHDARKLY_PROXY";
pub const LOG_LEVEL_ENV: &str = "LOG_LEVEL";
pub const DEFAULT_CONFIG_PATH: &str = "ldutils.toml";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Contents of `ldutils.toml`.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct FileConfig {
    pub api: Option<ApiSection>,
    pub log_level: Option<String>,
}

/// `[api]` section of `ldutils.toml`.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct ApiSection {
    pub token: Option<String>,
    pub base_url: Option<String>,
    pub proxy: Option<String>,
}

/// Load the config file. A missing file is an empty config; a file that
/// exists but does not parse is an error.
pub fn load_file_config(config_path: &str) -> Result<FileConfig> {
    match std::fs::read_to_string(config_path) {
        Ok(content) => toml::from_str::<FileConfig>(&content)
            .map_err(|e| LdError::Config(format!("{}: {}", config_path, e))),
        Err(_) => Ok(FileConfig::default()),
    }
}

/// Fully resolved settings for one process. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_token: String,
    pub base_url: String,
    pub proxy: Option<String>,
    pub log_level: String,
}

impl Config {
    /// Resolve from: argument > process environment > config file > default.
    pub fn resolve(token_arg: Option<&str>, file: &FileConfig) -> Result<Self> {
        Self::resolve_with(token_arg, file, |name| std::env::var(name).ok())
    }

    /// Like [`Config::resolve`] with an explicit environment lookup.
    pub fn resolve_with<F>(token_arg: Option<&str>, file: &FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = |name: &str| env(name).filter(|v| !v.trim().is_empty());
        let api = file.api.clone().unwrap_or_default();

        let api_token = token_arg
            .map(String::from)
            .or_else(|| env(TOKEN_ENV))
            .or(api.token)
            .ok_or_else(|| {
                LdError::Config(format!(
                    "No API token specified. Use --token, set {}, or configure [api] token in {}",
                    TOKEN_ENV, DEFAULT_CONFIG_PATH
                ))
            })?;

        let base_url = env(BASE_URL_ENV)
            .or(api.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let proxy = env(PROXY_ENV)
            .or_else(|| env("HTTPS_PROXY"))
            .or_else(|| env("https_proxy"))
            .or(api.proxy);

        let log_level = resolve_log_level(None, file, env);

        Ok(Self {
            api_token,
            base_url,
            proxy,
            log_level,
        })
    }
}

/// Log level from: argument > `LOG_LEVEL` > config file > `info`.
pub fn resolve_log_level<F>(arg: Option<&str>, file: &FileConfig, env: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    arg.map(String::from)
        .or_else(|| env(LOG_LEVEL_ENV))
        .or_else(|| file.log_level.clone())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}
