//! Weather service for barcast
//!
//! Resolves the caller's location by IP with a cross-process single-flight
//! cache, fetches a WeatherAPI.com forecast, and renders waybar output.

pub mod cache;
pub mod forecast;
pub mod format;
pub mod location;
pub mod lock;
pub mod provider;
pub mod resolver;
pub mod types;

pub use cache::{ensure_cache_dir, CacheEntry, CacheStore};
pub use forecast::ForecastService;
pub use format::Formatter;
pub use location::{IpApiClient, LocationFetcher};
pub use lock::{try_acquire, LockGuard, TryAcquire};
pub use provider::{ForecastFetcher, WeatherProvider};
pub use resolver::{LocationResolver, Resolution, ResolveOutcome, ResolverConfig, LOCATION_CACHE_KEY};
pub use types::*;
