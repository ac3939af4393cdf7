//! Location resolution with caching, single-flight fetching and stale fallback.
//!
//! Many bar invocations can race after the cache expires. Only the one that
//! wins the lock goes to the network; the rest wait once and read what the
//! winner cached. Every failure below this layer ends as a fallback value or
//! `None`, never as an error.

use std::path::PathBuf;
use std::time::Duration;

use barcast_core::Config;

use crate::cache::CacheStore;
use crate::location::LocationFetcher;
use crate::lock::{self, TryAcquire};
use crate::types::{LocationError, LocationRecord};

/// Cache key shared by the location artifact and its lock.
pub const LOCATION_CACHE_KEY: &str = "location";

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub cache_dir: PathBuf,
    /// Maximum age of a cached location that is served without refetching
    pub cache_duration: Duration,
    /// Single wait before re-reading the cache when another caller holds the lock
    pub busy_wait: Duration,
    /// Upper bound on one location fetch
    pub fetch_timeout: Duration,
}

impl ResolverConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            cache_dir: config.cache_dir.clone(),
            cache_duration: config.location.cache_duration(),
            busy_wait: config.location.busy_wait(),
            fetch_timeout: config.http_timeout(),
        }
    }
}

/// Terminal state of one resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Fresh cache entry, no lock taken
    CacheFreshHit,
    /// Lock was busy; the winner's entry appeared during the wait
    BusyCacheHit,
    /// Lock acquired, but another caller had refreshed the cache meanwhile
    RecheckHit,
    /// Fetched and cached a new location
    FetchOk,
    /// Fetch failed; serving an expired entry
    StaleCacheHit,
    /// Nothing to serve
    Empty,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub location: Option<LocationRecord>,
    pub outcome: ResolveOutcome,
}

impl Resolution {
    fn hit(location: LocationRecord, outcome: ResolveOutcome) -> Self {
        Self {
            location: Some(location),
            outcome,
        }
    }

    fn empty() -> Self {
        Self {
            location: None,
            outcome: ResolveOutcome::Empty,
        }
    }
}

pub struct LocationResolver<F> {
    fetcher: F,
    cache: CacheStore,
    config: ResolverConfig,
}

impl<F: LocationFetcher> LocationResolver<F> {
    pub fn new(fetcher: F, config: ResolverConfig) -> Self {
        let cache = CacheStore::new(&config.cache_dir, LOCATION_CACHE_KEY, config.cache_duration);
        Self {
            fetcher,
            cache,
            config,
        }
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Resolve the current location, or `None` if nothing can be served.
    pub async fn resolve_location(&self) -> Option<LocationRecord> {
        self.resolve().await.location
    }

    /// Resolve the current location and report how it was obtained.
    pub async fn resolve(&self) -> Resolution {
        if let Some(location) = self.cache.read_fresh() {
            return Resolution::hit(location, ResolveOutcome::CacheFreshHit);
        }

        let guard = match lock::try_acquire(&self.config.cache_dir, LOCATION_CACHE_KEY) {
            Ok(TryAcquire::Acquired(guard)) => guard,
            Ok(TryAcquire::Busy) => return self.wait_for_winner().await,
            Err(e) => {
                tracing::warn!("Cannot lock location cache: {}", e);
                return self.stale_fallback();
            }
        };

        let resolution = self.fetch_locked().await;
        drop(guard);

        tracing::debug!("Location resolved: {:?}", resolution.outcome);
        resolution
    }

    /// Another caller is fetching: wait once, then take whatever it cached.
    async fn wait_for_winner(&self) -> Resolution {
        tracing::debug!(
            "Location fetch in progress elsewhere, waiting {:?}",
            self.config.busy_wait
        );
        tokio::time::sleep(self.config.busy_wait).await;

        match self.cache.read_fresh() {
            Some(location) => Resolution::hit(location, ResolveOutcome::BusyCacheHit),
            None => {
                tracing::info!("No location cached after waiting for concurrent fetch");
                Resolution::empty()
            }
        }
    }

    /// Runs with the lock held.
    async fn fetch_locked(&self) -> Resolution {
        if let Some(location) = self.cache.read_fresh() {
            return Resolution::hit(location, ResolveOutcome::RecheckHit);
        }

        let fetched = tokio::time::timeout(self.config.fetch_timeout, self.fetcher.fetch_location())
            .await
            .unwrap_or(Err(LocationError::Timeout));

        match fetched {
            Ok(location) => {
                self.cache.write(&location);
                Resolution::hit(location, ResolveOutcome::FetchOk)
            }
            Err(e) => {
                tracing::warn!("Error getting location: {}", e);
                self.stale_fallback()
            }
        }
    }

    fn stale_fallback(&self) -> Resolution {
        match self.cache.read_any() {
            Some(location) => {
                tracing::info!("Serving stale cached location");
                Resolution::hit(location, ResolveOutcome::StaleCacheHit)
            }
            None => Resolution::empty(),
        }
    }
}
