use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::types::{ForecastPayload, WeatherError};

/// Capability to fetch a multi-day forecast for a coordinate pair.
pub trait ForecastFetcher: Send + Sync {
    fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> impl Future<Output = Result<ForecastPayload, WeatherError>> + Send;
}

/// Error body returned by WeatherAPI.com on failure
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

// WeatherAPI.com error codes for key problems
const KEY_ERROR_CODES: [i64; 4] = [1002, 2006, 2007, 2008];

/// WeatherAPI.com forecast client
#[derive(Debug, Clone)]
pub struct WeatherProvider {
    client: Arc<Client>,
    endpoint: String,
    api_key: String,
    days: u8,
}

impl WeatherProvider {
    /// # Errors
    ///
    /// Fails only if the HTTP client cannot be built.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        days: u8,
        timeout: Duration,
    ) -> Result<Self, WeatherError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            days,
        })
    }

    fn forecast_url(&self) -> String {
        format!("{}/v1/forecast.json", self.endpoint.trim_end_matches('/'))
    }
}

impl ForecastFetcher for WeatherProvider {
    async fn fetch_forecast(
        &self,
        latitude: f64,
        longitude: f64,
    ) -> Result<ForecastPayload, WeatherError> {
        let query = format!("{},{}", latitude, longitude);
        let days = self.days.to_string();

        let response = self
            .client
            .get(self.forecast_url())
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", query.as_str()),
                ("days", days.as_str()),
                ("aqi", "no"),
                ("alerts", "no"),
            ])
            .send()
            .await
            .map_err(WeatherError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let payload: ForecastPayload = response
            .json()
            .await
            .map_err(WeatherError::from_reqwest)?;

        tracing::debug!(
            "Fetched forecast for {} ({} days)",
            query,
            payload.forecast.forecastday.len()
        );
        Ok(payload)
    }
}

fn classify_failure(status: StatusCode, body: &str) -> WeatherError {
    let detail = serde_json::from_str::<ApiErrorBody>(body).ok().map(|b| b.error);

    if status == StatusCode::UNAUTHORIZED
        || detail
            .as_ref()
            .is_some_and(|d| KEY_ERROR_CODES.contains(&d.code))
    {
        return WeatherError::InvalidApiKey;
    }

    let message = detail
        .map(|d| d.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());

    WeatherError::Api {
        status: status.as_u16(),
        message,
    }
}
