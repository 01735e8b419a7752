//! Earth-occlusion line-of-sight oracle with a time-windowed cache.
//!
//! The oracle answers "can A see B" for two points in the Earth-centered frame:
//!
//! 1. distance gate (`max_link_distance_km`)
//! 2. cached answer for the pair, if younger than the cache lifetime
//! 3. midpoint shortcut for high, same-hemisphere segments
//! 4. exact segment / sphere intersection test
//!
//! Caching goes through [`VisibilityCache`] so tests can swap in [`NoCache`] and get
//! fully deterministic geometry.

use crate::{PairKey, Positioned, EARTH_RADIUS_KM};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;

/// Midpoints farther than this (in Earth radii) skip the exact test when both
/// endpoints share a hemisphere.
const MIDPOINT_CLEARANCE: f64 = 1.1;

/// Grazing tolerance so surface points (ground stations) do not occlude themselves.
const SURFACE_TOLERANCE_KM: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    pub max_link_distance_km: f64,
    pub cache_lifetime_s: f64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            max_link_distance_km: 5000.0,
            cache_lifetime_s: 1.0,
        }
    }
}

/// Storage for previously computed visibility answers.
pub trait VisibilityCache {
    /// Cached answer for `key` if it is still trustworthy at `now`.
    fn lookup(&self, key: PairKey, now: f64) -> Option<bool>;
    fn store(&mut self, key: PairKey, visible: bool, now: f64);
    fn clear(&mut self);
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct CacheEntry {
    visible: bool,
    time: f64,
}

/// Cache whose entries expire `lifetime_s` after they were written.
///
/// Expired entries stay in the map until overwritten or [`VisibilityCache::clear`].
#[derive(Debug, Clone)]
pub struct TimedCache {
    lifetime_s: f64,
    entries: HashMap<PairKey, CacheEntry>,
}

impl TimedCache {
    pub fn new(lifetime_s: f64) -> Self {
        Self {
            lifetime_s,
            entries: HashMap::new(),
        }
    }

    pub fn lifetime_s(&self) -> f64 {
        self.lifetime_s
    }
}

impl VisibilityCache for TimedCache {
    fn lookup(&self, key: PairKey, now: f64) -> Option<bool> {
        let entry = self.entries.get(&key)?;
        let age = now - entry.time;
        // negative age means the clock was rewound; never trust it
        (0.0..=self.lifetime_s).contains(&age).then_some(entry.visible)
    }

    fn store(&mut self, key: PairKey, visible: bool, now: f64) {
        self.entries.insert(key, CacheEntry { visible, time: now });
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Cache that never remembers anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCache;

impl VisibilityCache for NoCache {
    fn lookup(&self, _key: PairKey, _now: f64) -> Option<bool> {
        None
    }

    fn store(&mut self, _key: PairKey, _visible: bool, _now: f64) {}

    fn clear(&mut self) {}

    fn len(&self) -> usize {
        0
    }
}

pub struct VisibilityOracle<C: VisibilityCache = TimedCache> {
    config: OracleConfig,
    cache: C,
}

impl VisibilityOracle<TimedCache> {
    pub fn new(config: OracleConfig) -> Self {
        Self {
            cache: TimedCache::new(config.cache_lifetime_s),
            config,
        }
    }
}

impl Default for VisibilityOracle<TimedCache> {
    fn default() -> Self {
        Self::new(OracleConfig::default())
    }
}

impl<C: VisibilityCache> VisibilityOracle<C> {
    pub fn with_cache(config: OracleConfig, cache: C) -> Self {
        Self { config, cache }
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    /// Drop every cached answer (constellation parameters changed).
    pub fn clear_cache(&mut self) {
        debug!("Clearing {} visibility cache entries", self.cache.len());
        self.cache.clear();
    }

    /// Uncached line-of-sight test between two positioned entities.
    pub fn is_visible<A, B>(&self, a: &A, b: &B) -> bool
    where
        A: Positioned + ?Sized,
        B: Positioned + ?Sized,
    {
        let (pa, pb) = (a.position(), b.position());
        if (pa - pb).norm() > self.config.max_link_distance_km {
            return false;
        }
        has_line_of_sight(&pa, &pb)
    }

    /// Line-of-sight test for a keyed pair, consulting and feeding the cache.
    pub fn is_visible_cached<A, B>(&mut self, key: PairKey, a: &A, b: &B, now: f64) -> bool
    where
        A: Positioned + ?Sized,
        B: Positioned + ?Sized,
    {
        let (pa, pb) = (a.position(), b.position());
        if (pa - pb).norm() > self.config.max_link_distance_km {
            return false;
        }
        if let Some(visible) = self.cache.lookup(key, now) {
            return visible;
        }

        let visible = has_line_of_sight(&pa, &pb);
        self.cache.store(key, visible, now);
        visible
    }
}

/// Pure occlusion test against a sphere of Earth's radius at the origin.
pub fn has_line_of_sight(a: &Vector3<f64>, b: &Vector3<f64>) -> bool {
    let midpoint = (a + b) * 0.5;
    if midpoint.norm() > MIDPOINT_CLEARANCE * EARTH_RADIUS_KM && a.dot(b) > 0.0 {
        return true;
    }

    // walk the segment from a canonical endpoint so A→B and B→A agree bit for bit
    let (start, end) = match cmp_points(a, b) {
        Ordering::Greater => (b, a),
        _ => (a, b),
    };
    !segment_hits_earth(start, end)
}

fn cmp_points(a: &Vector3<f64>, b: &Vector3<f64>) -> Ordering {
    a.x.total_cmp(&b.x)
        .then(a.y.total_cmp(&b.y))
        .then(a.z.total_cmp(&b.z))
}

/// Ray/sphere intersection restricted to the segment `[start, end]`.
fn segment_hits_earth(start: &Vector3<f64>, end: &Vector3<f64>) -> bool {
    let seg = end - start;
    let length = seg.norm();
    if length == 0.0 {
        return start.norm() < EARTH_RADIUS_KM - SURFACE_TOLERANCE_KM;
    }
    let dir = seg / length;

    // |start + t·dir|² = R²  →  t² + 2bt + c = 0
    let b = start.dot(&dir);
    let c = start.norm_squared() - EARTH_RADIUS_KM * EARTH_RADIUS_KM;
    let disc = b * b - c;
    if disc < 0.0 {
        return false;
    }

    let root = disc.sqrt();
    let t_near = -b - root;
    let t_far = -b + root;

    // chord inside the sphere overlaps the segment interior
    t_far > SURFACE_TOLERANCE_KM && t_near < length - SURFACE_TOLERANCE_KM
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::propagation::position;
    use proptest::prelude::*;

    fn oracle() -> VisibilityOracle<NoCache> {
        VisibilityOracle::with_cache(
            OracleConfig {
                max_link_distance_km: 50_000.0,
                cache_lifetime_s: 1.0,
            },
            NoCache,
        )
    }

    #[test]
    fn test_opposite_sides_blocked() {
        let a = Vector3::new(6921.0, 0.0, 0.0);
        let b = Vector3::new(-6921.0, 0.0, 0.0);
        assert!(!oracle().is_visible(&a, &b));
        assert!(!oracle().is_visible(&b, &a));

        // slightly off-axis still passes well inside the planet
        let c = Vector3::new(-6900.0, 500.0, 0.0);
        assert!(!oracle().is_visible(&a, &c));
    }

    #[test]
    fn test_neighbors_visible() {
        let a = position(550.0, 53.0, 0.0, 0.0);
        let b = position(550.0, 53.0, 0.0, 16.0);
        assert!(oracle().is_visible(&a, &b));
    }

    #[test]
    fn test_exact_test_beyond_shortcut() {
        // 90° apart at 550 km: midpoint below 1.1 R_E, chord dips to ~4894 km radius
        let a = position(550.0, 0.0, 0.0, 0.0);
        let b = position(550.0, 0.0, 0.0, 90.0);
        assert!(!has_line_of_sight(&a, &b));

        // 40° apart: chord stays above the surface
        let c = position(550.0, 0.0, 0.0, 40.0);
        assert!(has_line_of_sight(&a, &c));
    }

    #[test]
    fn test_distance_gate() {
        let strict = VisibilityOracle::with_cache(
            OracleConfig {
                max_link_distance_km: 1000.0,
                cache_lifetime_s: 1.0,
            },
            NoCache,
        );
        let a = position(550.0, 53.0, 0.0, 0.0);
        let b = position(550.0, 53.0, 0.0, 16.0); // ~1926 km apart
        assert!(!strict.is_visible(&a, &b));
    }

    #[test]
    fn test_surface_observer_not_self_occluded() {
        let gs = Vector3::new(EARTH_RADIUS_KM, 0.0, 0.0);
        let overhead = Vector3::new(EARTH_RADIUS_KM + 550.0, 0.0, 0.0);
        assert!(oracle().is_visible(&gs, &overhead));

        let low = Vector3::new(EARTH_RADIUS_KM + 550.0, 1500.0, 0.0);
        assert!(oracle().is_visible(&gs, &low));

        let behind = Vector3::new(-EARTH_RADIUS_KM - 550.0, 0.0, 0.0);
        assert!(!oracle().is_visible(&gs, &behind));
    }

    #[test]
    fn test_cache_trusted_within_lifetime() {
        let mut oracle = VisibilityOracle::new(OracleConfig {
            max_link_distance_km: 50_000.0,
            cache_lifetime_s: 2.0,
        });
        let key = PairKey::new(0, 1);
        let a = Vector3::new(6921.0, 0.0, 0.0);
        let near = Vector3::new(6900.0, 500.0, 0.0);
        let far_side = Vector3::new(-6921.0, 0.0, 0.0);

        assert!(oracle.is_visible_cached(key, &a, &near, 10.0));
        assert_eq!(oracle.cache().len(), 1);

        // geometry changed but the entry is still fresh
        assert!(oracle.is_visible_cached(key, &a, &far_side, 11.5));
        // expired: recomputed and overwritten
        assert!(!oracle.is_visible_cached(key, &a, &far_side, 12.5));
        // rewound clock is never trusted
        assert!(oracle.is_visible_cached(key, &a, &near, 5.0));

        oracle.clear_cache();
        assert!(oracle.cache().is_empty());
    }

    #[test]
    fn test_cache_keyed_by_unordered_pair() {
        let mut cache = TimedCache::new(1.0);
        cache.store(PairKey::new(4, 2), true, 0.0);
        assert_eq!(cache.lookup(PairKey::new(2, 4), 0.5), Some(true));
        assert_eq!(cache.lookup(PairKey::new(2, 4), 1.5), None);
        assert_eq!(NoCache.lookup(PairKey::new(2, 4), 0.0), None);
    }

    fn orbit_point() -> impl Strategy<Value = Vector3<f64>> {
        (0.0f64..2000.0, 0.0f64..180.0, 0.0f64..360.0, 0.0f64..360.0)
            .prop_map(|(alt, inc, raan, nu)| position(alt, inc, raan, nu))
    }

    proptest! {
        #[test]
        fn fuzz_visibility_symmetric(a in orbit_point(), b in orbit_point()) {
            let oracle = VisibilityOracle::with_cache(OracleConfig::default(), NoCache);
            prop_assert_eq!(oracle.is_visible(&a, &b), oracle.is_visible(&b, &a));
            prop_assert_eq!(has_line_of_sight(&a, &b), has_line_of_sight(&b, &a));
        }
    }
}
