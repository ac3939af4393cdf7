//! IP-based geolocation via ip-api.com (free, no API key required).

use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

use crate::types::{LocationError, LocationRecord};

const USER_AGENT: &str = concat!("barcast/", env!("CARGO_PKG_VERSION"));

/// Capability to look up the caller's current location.
pub trait LocationFetcher: Send + Sync {
    fn fetch_location(
        &self,
    ) -> impl Future<Output = Result<LocationRecord, LocationError>> + Send;
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    status: Option<String>,
    message: Option<String>,
    lat: Option<f64>,
    lon: Option<f64>,
    city: Option<String>,
    #[serde(rename = "regionName")]
    region_name: Option<String>,
    country: Option<String>,
}

impl IpApiResponse {
    fn into_record(self) -> Result<LocationRecord, LocationError> {
        if self.status.as_deref() != Some("success") {
            return Err(LocationError::Provider(
                self.message.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        let missing = |field: &str| LocationError::Malformed(format!("missing field `{}`", field));
        let latitude = self.lat.ok_or_else(|| missing("lat"))?;
        let longitude = self.lon.ok_or_else(|| missing("lon"))?;
        let city = self.city.ok_or_else(|| missing("city"))?;
        let region = self.region_name.ok_or_else(|| missing("regionName"))?;
        let country = self.country.ok_or_else(|| missing("country"))?;

        Ok(LocationRecord::new(latitude, longitude, city, region, country))
    }
}

/// ip-api.com client.
#[derive(Debug, Clone)]
pub struct IpApiClient {
    client: Client,
    endpoint: String,
}

impl IpApiClient {
    /// # Errors
    ///
    /// Fails only if the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, LocationError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

impl LocationFetcher for IpApiClient {
    async fn fetch_location(&self) -> Result<LocationRecord, LocationError> {
        let response = self
            .client
            .get(&self.endpoint)
            .send()
            .await
            .map_err(LocationError::from_reqwest)?;

        if !response.status().is_success() {
            return Err(LocationError::Status(response.status().as_u16()));
        }

        let body: IpApiResponse = response
            .json()
            .await
            .map_err(LocationError::from_reqwest)?;

        let record = body.into_record()?;
        tracing::info!("Located via IP: {}", record.location_name);
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(value: serde_json::Value) -> IpApiResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_success_response() {
        let record = response(serde_json::json!({
            "status": "success",
            "lat": 45.42,
            "lon": -75.69,
            "city": "Ottawa",
            "regionName": "Ontario",
            "country": "Canada"
        }))
        .into_record()
        .unwrap();

        assert_eq!(record.location_name, "Ottawa, Ontario, Canada");
        assert_eq!(record.latitude, 45.42);
    }

    #[test]
    fn test_fail_status_carries_message() {
        let err = response(serde_json::json!({
            "status": "fail",
            "message": "reserved range"
        }))
        .into_record()
        .unwrap_err();

        assert!(matches!(err, LocationError::Provider(ref m) if m == "reserved range"));
    }

    #[test]
    fn test_missing_status_is_provider_error() {
        let err = response(serde_json::json!({})).into_record().unwrap_err();
        assert!(matches!(err, LocationError::Provider(ref m) if m == "Unknown error"));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let err = response(serde_json::json!({
            "status": "success",
            "lat": 45.42,
            "city": "Ottawa",
            "regionName": "Ontario",
            "country": "Canada"
        }))
        .into_record()
        .unwrap_err();

        assert!(matches!(err, LocationError::Malformed(ref m) if m.contains("lon")));
    }
}
