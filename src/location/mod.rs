//! Best-effort geolocation with a freshness-gated cache.
//!
//! `LocationCache::get` never fails: a failed refresh keeps whatever was
//! cached before, and the caller receives that (or nothing).

pub mod ipinfo;

use anyhow::Result;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

pub use ipinfo::IpInfoProvider;

pub const DEFAULT_LOCATION_TTL: Duration = Duration::from_secs(60);

/// A complete latitude/longitude fix.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// `[lat, lon]`, the wire layout used in notifications.
    pub fn to_array(self) -> [f64; 2] {
        [self.lat, self.lon]
    }
}

/// External geolocation collaborator.
pub trait GeoProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Look up the current position. Errors are absorbed by the cache.
    fn locate(&self) -> Result<Coordinates>;
}

#[derive(Clone, Copy, Debug)]
struct CachedLocation {
    coordinates: Coordinates,
    fetched_at: Instant,
}

/// Last known location with a time-to-live.
pub struct LocationCache {
    provider: Box<dyn GeoProvider>,
    ttl: Duration,
    // Coordinates and fetch time live in one value so they are replaced together.
    cached: Mutex<Option<CachedLocation>>,
}

impl LocationCache {
    pub fn new(provider: Box<dyn GeoProvider>, ttl: Duration) -> Self {
        Self {
            provider,
            ttl,
            cached: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Option<CachedLocation>> {
        self.cached.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Cached coordinates when fresh at `now`, otherwise refresh.
    ///
    /// The lock is held across the refresh, so concurrent callers wait for one
    /// lookup and then see its result.
    pub fn get(&self, now: Instant) -> Option<Coordinates> {
        let mut cached = self.lock();
        if let Some(entry) = *cached {
            if now.saturating_duration_since(entry.fetched_at) <= self.ttl {
                return Some(entry.coordinates);
            }
        }

        match self.provider.locate() {
            Ok(coordinates) => {
                log::info!(
                    "location updated via {}: {:.6}, {:.6}",
                    self.provider.name(),
                    coordinates.lat,
                    coordinates.lon
                );
                *cached = Some(CachedLocation {
                    coordinates,
                    fetched_at: now,
                });
                Some(coordinates)
            }
            Err(e) => {
                let previous = cached.map(|entry| entry.coordinates);
                log::warn!(
                    "location refresh via {} failed: {:#} (keeping {})",
                    self.provider.name(),
                    e,
                    if previous.is_some() {
                        "stale fix"
                    } else {
                        "no fix"
                    }
                );
                previous
            }
        }
    }

    /// Whatever is cached, fresh or not. Never calls the provider.
    pub fn last_known(&self) -> Option<Coordinates> {
        self.lock().map(|entry| entry.coordinates)
    }
}

/// Provider used when geolocation is disabled.
pub struct DisabledProvider;

impl GeoProvider for DisabledProvider {
    fn name(&self) -> &str {
        "disabled"
    }

    fn locate(&self) -> Result<Coordinates> {
        anyhow::bail!("geolocation disabled")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Replays scripted results and counts calls.
    struct ScriptedProvider {
        results: Mutex<Vec<Result<Coordinates>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedProvider {
        fn new(results: Vec<Result<Coordinates>>) -> (Self, Arc<AtomicUsize>) {
            let calls = Arc::new(AtomicUsize::new(0));
            let mut results = results;
            results.reverse();
            (
                Self {
                    results: Mutex::new(results),
                    calls: calls.clone(),
                },
                calls,
            )
        }
    }

    impl GeoProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn locate(&self) -> Result<Coordinates> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| Err(anyhow!("script exhausted")))
        }
    }

    const NYC: Coordinates = Coordinates {
        lat: 40.7128,
        lon: -74.006,
    };
    const LONDON: Coordinates = Coordinates {
        lat: 51.5074,
        lon: -0.1278,
    };

    #[test]
    fn fresh_value_skips_provider() {
        let (provider, calls) = ScriptedProvider::new(vec![Ok(NYC)]);
        let cache = LocationCache::new(Box::new(provider), Duration::from_secs(60));
        assert_eq!(cache.ttl(), Duration::from_secs(60));
        let t0 = Instant::now();

        assert_eq!(cache.get(t0), Some(NYC));
        assert_eq!(cache.get(t0 + Duration::from_secs(30)), Some(NYC));
        assert_eq!(cache.get(t0 + Duration::from_secs(60)), Some(NYC));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stale_value_is_refreshed() {
        let (provider, calls) = ScriptedProvider::new(vec![Ok(NYC), Ok(LONDON)]);
        let cache = LocationCache::new(Box::new(provider), Duration::from_secs(60));
        let t0 = Instant::now();

        assert_eq!(cache.get(t0), Some(NYC));
        assert_eq!(cache.get(t0 + Duration::from_secs(70)), Some(LONDON));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // The refresh restarted the TTL window.
        assert_eq!(cache.get(t0 + Duration::from_secs(100)), Some(LONDON));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failed_refresh_keeps_previous_fix() {
        let (provider, calls) =
            ScriptedProvider::new(vec![Ok(NYC), Err(anyhow!("network unreachable"))]);
        let cache = LocationCache::new(Box::new(provider), Duration::from_secs(60));
        let t0 = Instant::now();

        assert_eq!(cache.get(t0), Some(NYC));
        assert_eq!(cache.get(t0 + Duration::from_secs(120)), Some(NYC));
        assert_eq!(cache.last_known(), Some(NYC));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn failure_without_cache_is_absent() {
        let (provider, calls) = ScriptedProvider::new(vec![Err(anyhow!("offline"))]);
        let cache = LocationCache::new(Box::new(provider), Duration::from_secs(60));
        let t0 = Instant::now();

        assert_eq!(cache.get(t0), None);
        // Nothing cached: the next call retries.
        assert_eq!(cache.get(t0), None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn disabled_provider_never_yields_a_fix() {
        let cache = LocationCache::new(Box::new(DisabledProvider), DEFAULT_LOCATION_TTL);
        assert_eq!(cache.get(Instant::now()), None);
        assert_eq!(cache.last_known(), None);
    }

    #[test]
    fn concurrent_callers_share_one_refresh() {
        let (provider, calls) = ScriptedProvider::new(vec![Ok(NYC)]);
        let cache = Arc::new(LocationCache::new(
            Box::new(provider),
            Duration::from_secs(60),
        ));
        let now = Instant::now();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = cache.clone();
                std::thread::spawn(move || cache.get(now))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), Some(NYC));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
