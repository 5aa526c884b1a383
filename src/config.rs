//! Application-level configuration loading: wheel tuning, room channels and external providers.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{dao::room_store::memory::DEFAULT_EVENT_CAPACITY, spin::wheel::WheelGeometry};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "ROULETTE_CONFIG_PATH";

const KAKAO_KEY_ENV: &str = "KAKAO_REST_API_KEY";
const GOOGLE_KEY_ENV: &str = "GOOGLE_PLACES_API_KEY";
const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";

#[derive(Debug, Clone, Default)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Wheel animation and landing parameters.
    pub spin: SpinSettings,
    /// Room store tuning.
    pub rooms: RoomSettings,
    /// Place search providers.
    pub places: PlaceSettings,
    /// Generated menu suggestions.
    pub suggestions: SuggestionSettings,
}

/// Wheel parameters, in the units of the config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpinSettings {
    pub duration_ms: u64,
    pub min_rotations: u32,
    pub jitter_ratio: f64,
    pub pointer_angle: f64,
}

impl Default for SpinSettings {
    fn default() -> Self {
        let geometry = WheelGeometry::default();
        Self {
            duration_ms: 4000,
            min_rotations: geometry.min_rotations,
            jitter_ratio: geometry.jitter_ratio,
            pointer_angle: geometry.pointer_angle,
        }
    }
}

impl SpinSettings {
    /// Wheel geometry with the jitter ratio capped to its allowed range.
    pub fn geometry(&self) -> WheelGeometry {
        WheelGeometry {
            pointer_angle: self.pointer_angle,
            min_rotations: self.min_rotations,
            jitter_ratio: self.jitter_ratio,
        }
        .clamped()
    }

    /// Spin animation length.
    pub fn duration(&self) -> Duration {
        Duration::from_millis(self.duration_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoomSettings {
    /// Buffered changes per room before slow subscribers start lagging.
    pub event_capacity: usize,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// Place search provider endpoints. API keys only come from the environment.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaceSettings {
    pub radius_meters: u32,
    pub kakao_base_url: String,
    pub google_base_url: String,
    #[serde(skip)]
    pub kakao_api_key: Option<String>,
    #[serde(skip)]
    pub google_api_key: Option<String>,
}

impl Default for PlaceSettings {
    fn default() -> Self {
        Self {
            radius_meters: 1000,
            kakao_base_url: "https://dapi.kakao.com".into(),
            google_base_url: "https://places.googleapis.com".into(),
            kakao_api_key: None,
            google_api_key: None,
        }
    }
}

/// OpenAI-compatible chat completion endpoint used for menu suggestions.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SuggestionSettings {
    pub base_url: String,
    pub model: String,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for SuggestionSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            model: "gpt-4o-mini".into(),
            api_key: None,
        }
    }
}

impl AppConfig {
    /// Load the configuration from disk, falling back to defaults, then read secrets from the
    /// environment.
    pub fn load() -> Self {
        let path = resolve_config_path();
        let config = match fs::read_to_string(&path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!(path = %path.display(), "loaded config");
                    config
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
        };
        config.with_env_secrets()
    }

    /// Parse the JSON config file format. Missing sections and fields keep their defaults.
    pub fn from_json(contents: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<RawConfig>(contents).map(Into::into)
    }

    fn with_env_secrets(mut self) -> Self {
        self.places.kakao_api_key = secret(KAKAO_KEY_ENV);
        self.places.google_api_key = secret(GOOGLE_KEY_ENV);
        self.suggestions.api_key = secret(OPENAI_KEY_ENV);
        self
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    spin: SpinSettings,
    rooms: RoomSettings,
    places: PlaceSettings,
    suggestions: SuggestionSettings,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            spin: value.spin,
            rooms: value.rooms,
            places: value.places,
            suggestions: value.suggestions,
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

fn secret(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = AppConfig::from_json(r#"{ "spin": { "durationMs": 2500 } }"#).unwrap();
        assert_eq!(config.spin.duration(), Duration::from_millis(2500));
        assert_eq!(config.spin.min_rotations, 5);
        assert_eq!(config.rooms.event_capacity, DEFAULT_EVENT_CAPACITY);
        assert_eq!(config.places.radius_meters, 1000);
    }

    #[test]
    fn secrets_are_never_read_from_the_file() {
        let config =
            AppConfig::from_json(r#"{ "suggestions": { "model": "m", "apiKey": "leak" } }"#).unwrap();
        assert_eq!(config.suggestions.model, "m");
        assert_eq!(config.suggestions.api_key, None);
    }

    #[test]
    fn jitter_is_capped() {
        let settings = SpinSettings {
            jitter_ratio: 0.9,
            ..SpinSettings::default()
        };
        assert_eq!(settings.geometry().jitter_ratio, 0.2);
    }

    #[test]
    fn malformed_file_is_an_error() {
        assert!(AppConfig::from_json("{ not json").is_err());
    }
}
