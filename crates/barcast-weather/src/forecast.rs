//! Forecast retrieval fronted by the `weather` cache artifact.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::cache::CacheStore;
use crate::provider::ForecastFetcher;
use crate::types::{ForecastPayload, LocationRecord, WeatherError};

pub const WEATHER_CACHE_KEY: &str = "weather";

/// Cached payloads are only reused for roughly the same spot (~1 km).
const COORD_TOLERANCE_DEG: f64 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedForecast {
    latitude: f64,
    longitude: f64,
    payload: ForecastPayload,
}

impl CachedForecast {
    fn matches(&self, location: &LocationRecord) -> bool {
        (self.latitude - location.latitude).abs() <= COORD_TOLERANCE_DEG
            && (self.longitude - location.longitude).abs() <= COORD_TOLERANCE_DEG
    }
}

pub struct ForecastService<F> {
    fetcher: F,
    cache: CacheStore,
}

impl<F: ForecastFetcher> ForecastService<F> {
    pub fn new(fetcher: F, cache_dir: &Path, cache_duration: Duration) -> Self {
        Self {
            fetcher,
            cache: CacheStore::new(cache_dir, WEATHER_CACHE_KEY, cache_duration),
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Forecast for `location`: fresh cache, then network, then stale cache.
    ///
    /// # Errors
    ///
    /// Returns the fetch error only when no cached payload for this location exists.
    pub async fn forecast(&self, location: &LocationRecord) -> Result<ForecastPayload, WeatherError> {
        if let Some(cached) = self
            .cache
            .read_fresh::<CachedForecast>()
            .filter(|c| c.matches(location))
        {
            tracing::debug!("Using cached forecast");
            return Ok(cached.payload);
        }

        match self
            .fetcher
            .fetch_forecast(location.latitude, location.longitude)
            .await
        {
            Ok(payload) => {
                self.cache.write(&CachedForecast {
                    latitude: location.latitude,
                    longitude: location.longitude,
                    payload: payload.clone(),
                });
                Ok(payload)
            }
            Err(e) => {
                tracing::warn!("Error fetching forecast: {}", e);
                match self
                    .cache
                    .read_any::<CachedForecast>()
                    .filter(|c| c.matches(location))
                {
                    Some(stale) => {
                        tracing::info!("Serving stale cached forecast");
                        Ok(stale.payload)
                    }
                    None => Err(e),
                }
            }
        }
    }
}
