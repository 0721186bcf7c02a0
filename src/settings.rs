//! Process settings.
//!
//! Values resolve with the precedence OS environment, then the env file, then
//! the built-in default. `APP_ENV` picks the env file (`.env.<APP_ENV>` when it
//! exists, `.env` otherwise) and is therefore only read from the OS environment.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_APP_ENV: &str = "local";
pub const DEFAULT_API_URL: &str = "https://api.mallory.ai/v1";
pub const DEFAULT_LOG_LEVEL: &str = "INFO";
pub const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: dotenv::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub app_env: String,
    pub mallory_api_key: String,
    pub mallory_api_url: String,
    pub log_level: String,
    pub log_dir: PathBuf,
}

impl Settings {
    /// Loads settings from the OS environment and the env file found in `env_dir`.
    pub fn load(env_dir: &Path) -> Result<Self, SettingsError> {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| DEFAULT_APP_ENV.to_string());
        let env_file = Self::env_file_path(env_dir, &app_env);
        let file_vars = read_env_file(&env_file)?;

        Ok(Self::resolve(|key| env::var(key).ok(), &file_vars))
    }

    /// `.env.<app_env>` if that file exists, `.env` otherwise.
    pub fn env_file_path(env_dir: &Path, app_env: &str) -> PathBuf {
        let specific = env_dir.join(format!(".env.{}", app_env));
        if specific.is_file() {
            specific
        } else {
            env_dir.join(".env")
        }
    }

    pub fn resolve<F>(os_lookup: F, file_vars: &HashMap<String, String>) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| -> String {
            os_lookup(key)
                .or_else(|| file_vars.get(key).cloned())
                .unwrap_or_else(|| default.to_string())
        };

        Self {
            app_env: get("APP_ENV", DEFAULT_APP_ENV),
            mallory_api_key: get("MALLORY_API_KEY", ""),
            mallory_api_url: get("MALLORY_API_URL", DEFAULT_API_URL),
            log_level: get("LOG_LEVEL", DEFAULT_LOG_LEVEL),
            log_dir: PathBuf::from(get("LOG_DIR", DEFAULT_LOG_DIR)),
        }
    }
}

// `from_path_iter` is deprecated in favour of loading into the process
// environment, which would let the file override OS variables.
#[allow(deprecated)]
fn read_env_file(path: &Path) -> Result<HashMap<String, String>, SettingsError> {
    if !path.is_file() {
        debug!(path = %path.display(), "No env file found, using OS environment and defaults");
        return Ok(HashMap::new());
    }

    let to_err = |source| SettingsError::EnvFile {
        path: path.to_path_buf(),
        source,
    };

    let mut vars = HashMap::new();
    for item in dotenv::from_path_iter(path).map_err(to_err)? {
        let (key, value) = item.map_err(to_err)?;
        vars.insert(key, value);
    }
    debug!(path = %path.display(), count = vars.len(), "Loaded env file");
    Ok(vars)
}
