use serde::{Deserialize, Deserializer, Serialize};

use barcast_core::{AppError, NetworkError, ReqwestErrorExt};

/// A resolved location, as cached in `location.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub location_name: String,
    pub city: String,
    pub region: String,
    pub country: String,
}

impl LocationRecord {
    /// Build a record, deriving `location_name` as "City, Region", with the
    /// country appended outside the United States.
    pub fn new(
        latitude: f64,
        longitude: f64,
        city: impl Into<String>,
        region: impl Into<String>,
        country: impl Into<String>,
    ) -> Self {
        let city = city.into();
        let region = region.into();
        let country = country.into();

        let mut location_name = format!("{}, {}", city, region);
        if !is_united_states(&country) {
            location_name.push_str(", ");
            location_name.push_str(&country);
        }

        Self {
            latitude,
            longitude,
            location_name,
            city,
            region,
            country,
        }
    }

    pub fn in_united_states(&self) -> bool {
        is_united_states(&self.country)
    }
}

fn is_united_states(country: &str) -> bool {
    country == "United States"
}

/// Weather condition categories mapped from provider condition text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    Clear,
    PartlyCloudy,
    Cloudy,
    Thunderstorm,
    Rain,
    Drizzle,
    Snow,
    Fog,
    Windy,
    #[default]
    Unknown,
}

impl WeatherCondition {
    /// Classify free-form condition text such as "Patchy light rain with thunder".
    ///
    /// Checks run from most to least specific.
    pub fn from_text(text: &str) -> Self {
        let text = text.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| text.contains(w));

        if has(&["partly cloudy", "partly sunny"]) {
            Self::PartlyCloudy
        } else if has(&["sunny", "clear"]) {
            Self::Clear
        } else if has(&["cloudy", "overcast"]) {
            Self::Cloudy
        } else if has(&["thunder"]) {
            Self::Thunderstorm
        } else if has(&["drizzle"]) {
            Self::Drizzle
        } else if has(&["rain", "shower"]) {
            Self::Rain
        } else if has(&["snow", "blizzard", "sleet", "ice pellets"]) {
            Self::Snow
        } else if has(&["fog", "mist", "haze"]) {
            Self::Fog
        } else if has(&["wind"]) {
            Self::Windy
        } else {
            Self::Unknown
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Clear => "☀️",
            Self::PartlyCloudy => "⛅",
            Self::Cloudy => "☁️",
            Self::Thunderstorm => "⛈️",
            Self::Rain => "🌧️",
            Self::Drizzle => "🌦️",
            Self::Snow => "❄️",
            Self::Fog => "🌫️",
            Self::Windy => "💨",
            Self::Unknown => "❓",
        }
    }
}

/// Subset of WeatherAPI.com's `forecast.json` response.
///
/// Field names follow the provider so cached payloads round-trip unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPayload {
    #[serde(default)]
    pub location: PlaceInfo,
    pub current: CurrentConditions,
    #[serde(default)]
    pub forecast: Forecast,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceInfo {
    pub name: String,
    pub region: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConditionText {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temp_c: f64,
    pub temp_f: f64,
    #[serde(default)]
    pub feelslike_c: f64,
    #[serde(default)]
    pub feelslike_f: f64,
    #[serde(default)]
    pub wind_mph: f64,
    #[serde(default)]
    pub wind_kph: f64,
    #[serde(default)]
    pub wind_dir: String,
    #[serde(default)]
    pub humidity: f64,
    #[serde(default)]
    pub uv: f64,
    #[serde(default)]
    pub condition: ConditionText,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Forecast {
    #[serde(default)]
    pub forecastday: Vec<ForecastDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastDay {
    /// `YYYY-MM-DD`
    pub date: String,
    pub day: DaySummary,
    #[serde(default)]
    pub hour: Vec<HourForecast>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaySummary {
    pub maxtemp_c: f64,
    pub maxtemp_f: f64,
    pub mintemp_c: f64,
    pub mintemp_f: f64,
    #[serde(default)]
    pub condition: ConditionText,
    #[serde(default, deserialize_with = "lenient_percent")]
    pub daily_chance_of_rain: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourForecast {
    /// `YYYY-MM-DD HH:MM` in the location's local time
    pub time: String,
    pub temp_c: f64,
    pub temp_f: f64,
    #[serde(default)]
    pub condition: ConditionText,
    #[serde(default, deserialize_with = "lenient_percent")]
    pub chance_of_rain: u8,
}

/// Accept percentages sent either as numbers or as numeric strings.
fn lenient_percent<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Percent {
        Number(f64),
        Text(String),
    }

    let value = match Percent::deserialize(deserializer)? {
        Percent::Number(n) => n,
        Percent::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
    };
    Ok(value.clamp(0.0, 100.0).round() as u8)
}

/// One line of waybar `custom` module output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BarOutput {
    pub text: String,
    pub tooltip: String,
}

impl BarOutput {
    pub fn location_unavailable() -> Self {
        Self {
            text: "❌ Location".to_string(),
            tooltip: "Unable to determine current location".to_string(),
        }
    }

    /// No forecast could be produced; `detail` explains why when known.
    pub fn weather_unavailable(detail: Option<&str>) -> Self {
        let tooltip = match detail {
            Some(detail) => format!("Weather data unavailable\n{}", detail),
            None => "Weather data unavailable".to_string(),
        };
        Self {
            text: "❌ N/A".to_string(),
            tooltip,
        }
    }

    pub fn error(err: &AppError) -> Self {
        Self {
            text: "❌ Error".to_string(),
            tooltip: format!("Weather service error: {}", err),
        }
    }

    /// Serialize to a single JSON line.
    pub fn to_json_line(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize bar output: {}", e);
            r#"{"text":"❌ Error","tooltip":"Weather service error"}"#.to_string()
        })
    }
}

/// Location lookup errors
#[derive(Debug, thiserror::Error)]
pub enum LocationError {
    #[error("Location request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Location request timed out")]
    Timeout,
    #[error("Location service returned HTTP {0}")]
    Status(u16),
    #[error("Location service error: {0}")]
    Provider(String),
    #[error("Malformed location response: {0}")]
    Malformed(String),
}

impl LocationError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Malformed(e.to_string())
        } else {
            Self::Network(e)
        }
    }
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Forecast request timed out")]
    Timeout,
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("Weather API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
}

impl WeatherError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::Parse(e.to_string())
        } else {
            Self::Network(e)
        }
    }
}

impl From<LocationError> for AppError {
    fn from(e: LocationError) -> Self {
        match e {
            LocationError::Network(e) => AppError::Network(e.into_network_error()),
            LocationError::Timeout => AppError::Network(NetworkError::Timeout),
            other => AppError::Weather(barcast_core::WeatherError::LocationNotFound(
                other.to_string(),
            )),
        }
    }
}

impl From<WeatherError> for AppError {
    fn from(e: WeatherError) -> Self {
        use barcast_core::WeatherError as Core;
        match e {
            WeatherError::Network(e) => AppError::Network(e.into_network_error()),
            WeatherError::Timeout => AppError::Network(NetworkError::Timeout),
            WeatherError::InvalidApiKey => AppError::Weather(Core::InvalidApiKey),
            WeatherError::Api { status, .. } if status >= 500 => {
                AppError::Weather(Core::ServiceUnavailable)
            }
            WeatherError::Api { message, .. } => AppError::Weather(Core::ApiError(message)),
            WeatherError::Parse(msg) => AppError::Network(NetworkError::InvalidResponse(msg)),
        }
    }
}
