//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "IGNITE_BACK_CONFIG_PATH";

const DEFAULT_EVENT_ID: &str = "ignite2";
const DEFAULT_TIMER_DURATION_SECS: u64 = 3600;
const DEFAULT_RESET_CONFIRMATION: &str = "RESET";
const DEFAULT_ACTOR: &str = "admin";
const DEFAULT_SSE_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Key of the competition singleton.
    pub event_id: String,
    /// Duration loaded into fresh and reset timers, in seconds.
    pub default_timer_duration_secs: u64,
    /// Token the caller must echo to run a global reset.
    pub reset_confirmation: String,
    /// Actor recorded when a command does not name one.
    pub default_actor: String,
    /// Buffer size of the public SSE broadcast channel.
    pub sse_capacity: usize,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        event_id = %app_config.event_id,
                        timer_secs = app_config.default_timer_duration_secs,
                        "loaded config"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        RawConfig::default().into()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    event_id: Option<String>,
    default_timer_duration_secs: Option<u64>,
    reset_confirmation: Option<String>,
    default_actor: Option<String>,
    sse_capacity: Option<usize>,
}

fn non_blank(value: Option<String>, fallback: &str) -> String {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| fallback.to_owned())
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            event_id: non_blank(value.event_id, DEFAULT_EVENT_ID),
            default_timer_duration_secs: value
                .default_timer_duration_secs
                .unwrap_or(DEFAULT_TIMER_DURATION_SECS),
            reset_confirmation: non_blank(value.reset_confirmation, DEFAULT_RESET_CONFIRMATION),
            default_actor: non_blank(value.default_actor, DEFAULT_ACTOR),
            sse_capacity: value
                .sse_capacity
                .filter(|capacity| *capacity > 0)
                .unwrap_or(DEFAULT_SSE_CAPACITY),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
