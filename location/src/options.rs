use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Options for a single position request.
///
/// Defaults: a precise fix, at most 15 s of waiting, and cached fixes up to
/// 10 s old.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OneShotOptions {
    /// Prefer GPS over network providers.
    pub high_accuracy: bool,
    /// Give up after this many milliseconds.
    pub timeout_ms: u64,
    /// Accept a fix no older than this many milliseconds without a new read.
    pub max_cached_age_ms: u64,
    /// Minimum movement in meters, only used if the platform coalesces this
    /// request with other pending ones.
    pub min_distance_filter_m: f64,
    /// Ask the provider for a live fix instead of its last known value.
    pub force_fresh_fix: bool,
}

impl Default for OneShotOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_ms: 15_000,
            max_cached_age_ms: 10_000,
            min_distance_filter_m: 50.0,
            force_fresh_fix: true,
        }
    }
}

impl OneShotOptions {
    /// The timeout as a [`Duration`].
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set how old a cached fix may be.
    #[must_use]
    pub fn with_max_cached_age(mut self, age: Duration) -> Self {
        self.max_cached_age_ms = u64::try_from(age.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

/// Options for a continuous subscription.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchOptions {
    /// Prefer GPS over network providers.
    pub high_accuracy: bool,
    /// Skip fixes closer than this many meters to the last reported one.
    /// Zero reports every update.
    pub min_distance_filter_m: f64,
    /// Desired interval between updates, in milliseconds.
    pub target_interval_ms: u64,
    /// Updates arriving faster than this many milliseconds may be coalesced.
    pub fastest_interval_ms: u64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            min_distance_filter_m: 0.0,
            target_interval_ms: 5_000,
            fastest_interval_ms: 2_000,
        }
    }
}

impl WatchOptions {
    /// The target interval as a [`Duration`].
    #[must_use]
    pub const fn target_interval(&self) -> Duration {
        Duration::from_millis(self.target_interval_ms)
    }

    /// The fastest interval as a [`Duration`].
    #[must_use]
    pub const fn fastest_interval(&self) -> Duration {
        Duration::from_millis(self.fastest_interval_ms)
    }

    /// Whether a fix at `candidate` should be reported after `last`.
    #[must_use]
    pub fn passes_distance_filter(&self, last: Option<&crate::Coords>, candidate: &crate::Coords) -> bool {
        match last {
            Some(last) if self.min_distance_filter_m > 0.0 => {
                last.distance_to(candidate) >= self.min_distance_filter_m
            }
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Coords;

    #[test]
    fn one_shot_defaults() {
        let options = OneShotOptions::default();
        assert!(options.high_accuracy);
        assert_eq!(options.timeout(), Duration::from_secs(15));
        assert_eq!(options.max_cached_age_ms, 10_000);
        assert!((options.min_distance_filter_m - 50.0).abs() < f64::EPSILON);
        assert!(options.force_fresh_fix);
    }

    #[test]
    fn watch_defaults() {
        let options = WatchOptions::default();
        assert!(options.high_accuracy);
        assert!(options.min_distance_filter_m.abs() < f64::EPSILON);
        assert_eq!(options.target_interval(), Duration::from_secs(5));
        assert_eq!(options.fastest_interval(), Duration::from_secs(2));
    }

    #[test]
    fn options_use_camel_case_keys() {
        let json = serde_json::to_value(OneShotOptions::default()).unwrap();
        assert_eq!(json["timeoutMs"], 15_000);
        assert_eq!(json["maxCachedAgeMs"], 10_000);
        assert_eq!(json["forceFreshFix"], true);

        let json = serde_json::to_value(WatchOptions::default()).unwrap();
        assert_eq!(json["targetIntervalMs"], 5_000);
        assert_eq!(json["fastestIntervalMs"], 2_000);
    }

    #[test]
    fn zero_distance_filter_reports_everything() {
        let options = WatchOptions::default();
        let here = Coords::new(48.8566, 2.3522, 5.0);
        assert!(options.passes_distance_filter(Some(&here), &here));
    }

    #[test]
    fn distance_filter_drops_small_moves() {
        let options = WatchOptions {
            min_distance_filter_m: 50.0,
            ..WatchOptions::default()
        };
        let here = Coords::new(48.8566, 2.3522, 5.0);
        let nearby = Coords::new(48.8567, 2.3522, 5.0);
        let far = Coords::new(48.8600, 2.3522, 5.0);

        assert!(options.passes_distance_filter(None, &nearby));
        assert!(!options.passes_distance_filter(Some(&here), &nearby));
        assert!(options.passes_distance_filter(Some(&here), &far));
    }
}
