use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;

/// Environment variable holding the WeatherAPI.com credential.
pub const API_KEY_VAR: &str = "WEATHER_API_KEY";

/// Environment variable pointing at an alternative `.env` file.
pub const ENV_FILE_VAR: &str = "BARCAST_ENV_FILE";

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_VAR: &str = "BARCAST_CACHE_DIR";

const APP_DIR: &str = "barcast";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Temperature unit preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    /// Fahrenheit inside the United States, Celsius elsewhere.
    #[default]
    Auto,
    Celsius,
    Fahrenheit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// WeatherAPI.com key. Usually supplied through the environment.
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Directory holding `location.json`, `weather.json` and the lock file
    pub cache_dir: PathBuf,

    /// Timeout applied to every outbound request
    pub http_timeout_secs: u64,

    pub location: LocationConfig,

    pub weather: WeatherConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// IP geolocation endpoint
    pub endpoint: String,

    /// How long a cached location stays fresh
    pub cache_duration_secs: u64,

    /// How long a caller that lost the fetch lock waits before re-reading the cache
    pub busy_wait_ms: u64,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://ip-api.com/json/".to_string(),
            cache_duration_secs: 3600,
            busy_wait_ms: 1000,
        }
    }
}

impl LocationConfig {
    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_duration_secs)
    }

    pub fn busy_wait(&self) -> Duration {
        Duration::from_millis(self.busy_wait_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// WeatherAPI.com base URL (without the `/v1/...` path)
    pub endpoint: String,

    /// How long a cached forecast stays fresh
    pub cache_duration_secs: u64,

    /// Number of forecast days to request
    pub forecast_days: u8,

    /// Temperature unit preference
    pub temperature_unit: TemperatureUnit,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.weatherapi.com".to_string(),
            cache_duration_secs: 900,
            forecast_days: 7,
            temperature_unit: TemperatureUnit::Auto,
        }
    }
}

impl WeatherConfig {
    pub fn cache_duration(&self) -> Duration {
        Duration::from_secs(self.cache_duration_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join(APP_DIR);

        Self {
            api_key: String::new(),
            cache_dir,
            http_timeout_secs: 10,
            location: LocationConfig::default(),
            weather: WeatherConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the config file, the `.env` file and the process
    /// environment, in increasing order of precedence.
    ///
    /// An unreadable or malformed config file is logged and replaced by defaults.
    pub fn load() -> Self {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path).unwrap_or_else(|e| {
                tracing::warn!("Ignoring config file {}: {:#}", path.display(), e);
                Self::default()
            }),
            _ => Self::default(),
        };

        let process_env = |key: &str| std::env::var(key).ok();
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf));

        let dotenv = match locate_env_file(process_env, exe_dir.as_deref()) {
            Some(path) => match std::fs::read_to_string(&path) {
                Ok(contents) => {
                    tracing::debug!("Loaded env file {}", path.display());
                    parse_env_file(&contents)
                }
                Err(e) => {
                    tracing::warn!("Failed to read env file {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            None => HashMap::new(),
        };

        config.apply_env(|key| process_env(key).or_else(|| dotenv.get(key).cloned()));
        config
    }

    /// Load configuration and validate it
    ///
    /// # Errors
    ///
    /// See [`Config::into_validated`].
    pub fn load_validated() -> std::result::Result<(Self, ValidationResult), ConfigError> {
        Self::load().into_validated()
    }

    /// Validate, replacing invalid optional settings with their defaults.
    ///
    /// Returns the config along with the validation result of the repaired
    /// config, whose warnings have already been logged.
    ///
    /// # Errors
    ///
    /// A missing API key is the only fatal problem and is reported as
    /// [`ConfigError::MissingSetting`].
    pub fn into_validated(mut self) -> std::result::Result<(Self, ValidationResult), ConfigError> {
        let mut validation = self.validate();

        if validation.errors.iter().any(|e| e.field == API_KEY_VAR) {
            return Err(ConfigError::MissingSetting(API_KEY_VAR.to_string()));
        }

        if !validation.is_valid() {
            tracing::warn!("Invalid config, using defaults: {}", validation.error_summary());
            for error in &validation.errors {
                self.reset_field(&error.field);
            }
            validation = self.validate();
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((self, validation))
    }

    fn reset_field(&mut self, field: &str) {
        match field {
            "location.endpoint" => self.location.endpoint = LocationConfig::default().endpoint,
            "weather.endpoint" => self.weather.endpoint = WeatherConfig::default().endpoint,
            "weather.forecast_days" => {
                self.weather.forecast_days = WeatherConfig::default().forecast_days
            }
            _ => {}
        }
    }

    /// Parse a TOML config file. Missing sections fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        Ok(config)
    }

    /// Overlay environment values onto this config.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(API_KEY_VAR).filter(|k| !k.trim().is_empty()) {
            self.api_key = key.trim().to_string();
        }
        if let Some(dir) = lookup(CACHE_DIR_VAR).filter(|d| !d.is_empty()) {
            self.cache_dir = PathBuf::from(dir);
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Validate the configuration
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.api_key.is_empty() {
            result.add_error(
                API_KEY_VAR,
                "Weather API key not set. Set WEATHER_API_KEY in the environment or .env file.",
            );
        }

        validate_url(&self.location.endpoint, "location.endpoint", &mut result);
        validate_url(&self.weather.endpoint, "weather.endpoint", &mut result);

        if self.http_timeout_secs == 0 {
            result.add_warning("http_timeout_secs", "Requests have no time budget (0 seconds)");
        }

        if self.location.cache_duration_secs == 0 {
            result.add_warning(
                "location.cache_duration_secs",
                "Location caching disabled (0 seconds)",
            );
        }

        if self.weather.cache_duration_secs == 0 {
            result.add_warning(
                "weather.cache_duration_secs",
                "Forecast caching disabled (0 seconds)",
            );
        }

        if !(1..=14).contains(&self.weather.forecast_days) {
            result.add_error(
                "weather.forecast_days",
                format!(
                    "Forecast days must be between 1 and 14, got {}",
                    self.weather.forecast_days
                ),
            );
        }

        result
    }

    /// Get the path to the configuration file
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
    }
}

/// Validate a URL field
fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}

/// Pick the `.env` file to read.
///
/// `BARCAST_ENV_FILE` wins when set. Otherwise the first existing file among
/// `<config_dir>/barcast/.env`, `<exe_dir>/../.env` and `<exe_dir>/.env`.
pub fn locate_env_file(
    lookup: impl Fn(&str) -> Option<String>,
    exe_dir: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = lookup(ENV_FILE_VAR).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }

    let mut candidates = Vec::new();
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join(APP_DIR).join(".env"));
    }
    if let Some(dir) = exe_dir {
        if let Some(parent) = dir.parent() {
            candidates.push(parent.join(".env"));
        }
        candidates.push(dir.join(".env"));
    }

    candidates.into_iter().find(|p| p.is_file())
}

/// Parse `KEY=VALUE` lines. Blank lines and `#` comments are skipped, an
/// `export ` prefix is accepted, and surrounding quotes are stripped.
pub fn parse_env_file(contents: &str) -> HashMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let line = line.strip_prefix("export ").unwrap_or(line);
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}
