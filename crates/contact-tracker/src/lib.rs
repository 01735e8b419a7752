//! Contact Tracker
//!
//! Detects transient line-of-sight windows ("contacts") between every pair of
//! satellites. Each unordered pair is a two-state machine:
//!
//! ```text
//!   no episode --visible--> open --not visible--> closed (history)
//!                            |  ^
//!                            +--+ visible: append (distance, latency) sample
//! ```
//!
//! At most one episode is open per pair, so episodes of the same pair never overlap.

use orbital_mechanics::{
    distance_km, latency_ms, PairKey, Positioned, VisibilityCache, VisibilityOracle,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactSample {
    pub distance_km: f64,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactEpisode {
    pub sat_a: usize,
    pub sat_b: usize,
    pub start_time: f64,
    /// `None` while the contact is still open
    pub end_time: Option<f64>,
    pub samples: Vec<ContactSample>,
    pub avg_distance_km: f64,
    pub avg_latency_ms: f64,
    /// 1-based orbital period the contact started in
    pub orbital_period: u32,
}

impl ContactEpisode {
    fn open(key: PairKey, now: f64, orbital_period: u32) -> Self {
        Self {
            sat_a: key.a,
            sat_b: key.b,
            start_time: now,
            end_time: None,
            samples: Vec::new(),
            avg_distance_km: 0.0,
            avg_latency_ms: 0.0,
            orbital_period,
        }
    }

    fn close(&mut self, now: f64) {
        self.end_time = Some(now);
        if !self.samples.is_empty() {
            let n = self.samples.len() as f64;
            self.avg_distance_km = self.samples.iter().map(|s| s.distance_km).sum::<f64>() / n;
            self.avg_latency_ms = self.samples.iter().map(|s| s.latency_ms).sum::<f64>() / n;
        }
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(self.sat_a, self.sat_b)
    }

    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// `end_time - start_time`, or 0 while open
    pub fn duration(&self) -> f64 {
        self.end_time.map_or(0.0, |end| end - self.start_time)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactStats {
    pub total: usize,
    pub completed: usize,
    pub active: usize,
    pub avg_duration_s: f64,
    pub avg_distance_km: f64,
    pub avg_latency_ms: f64,
}

/// Outcome of one tracker step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepSummary {
    pub opened: usize,
    pub closed: usize,
    pub visible: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ContactTracker {
    active: BTreeMap<PairKey, ContactEpisode>,
    history: Vec<ContactEpisode>,
    orbital_period_s: f64,
}

impl ContactTracker {
    pub fn new(orbital_period_s: f64) -> Self {
        Self {
            active: BTreeMap::new(),
            history: Vec::new(),
            orbital_period_s,
        }
    }

    /// Drop every open and closed episode (constellation changed).
    pub fn reset(&mut self, orbital_period_s: f64) {
        self.active.clear();
        self.history.clear();
        self.orbital_period_s = orbital_period_s;
    }

    fn period_index(&self, now: f64) -> u32 {
        if self.orbital_period_s > 0.0 && now >= 0.0 {
            (now / self.orbital_period_s).floor() as u32 + 1
        } else {
            1
        }
    }

    /// Feed one visibility observation for a pair.
    ///
    /// A newly opened contact records the observation as its first sample.
    pub fn observe(&mut self, key: PairKey, visible: bool, distance_km: f64, now: f64) -> Transition {
        let sample = ContactSample {
            distance_km,
            latency_ms: latency_ms(distance_km),
        };

        match (visible, self.active.get_mut(&key)) {
            (true, Some(episode)) => {
                episode.samples.push(sample);
                Transition::Extended
            }
            (true, None) => {
                let mut episode = ContactEpisode::open(key, now, self.period_index(now));
                episode.samples.push(sample);
                self.active.insert(key, episode);
                Transition::Opened
            }
            (false, Some(_)) => {
                if let Some(mut episode) = self.active.remove(&key) {
                    episode.close(now);
                    self.history.push(episode);
                }
                Transition::Closed
            }
            (false, None) => Transition::None,
        }
    }

    /// Evaluate every unordered satellite pair at `now`.
    pub fn update<P, C>(&mut self, positions: &[P], oracle: &mut VisibilityOracle<C>, now: f64) -> StepSummary
    where
        P: Positioned,
        C: VisibilityCache,
    {
        let mut summary = StepSummary::default();

        for (i, a) in positions.iter().enumerate() {
            for (j, b) in positions.iter().enumerate().skip(i + 1) {
                let key = PairKey::new(i, j);
                let visible = oracle.is_visible_cached(key, a, b, now);
                if !visible && !self.active.contains_key(&key) {
                    continue;
                }

                if visible {
                    summary.visible += 1;
                }
                match self.observe(key, visible, distance_km(a, b), now) {
                    Transition::Opened => summary.opened += 1,
                    Transition::Closed => summary.closed += 1,
                    _ => {}
                }
            }
        }

        debug!(
            "Contacts at t={:.1}s: {} visible, {} opened, {} closed, {} active",
            now,
            summary.visible,
            summary.opened,
            summary.closed,
            self.active.len()
        );
        summary
    }

    /// Close every open contact at `now` (end of a collection run).
    pub fn close_all(&mut self, now: f64) -> usize {
        let open = std::mem::take(&mut self.active);
        let count = open.len();
        for (_, mut episode) in open {
            episode.close(now);
            self.history.push(episode);
        }
        if count > 0 {
            info!("Closed {} open contacts at t={:.1}s", count, now);
        }
        count
    }

    pub fn history(&self) -> &[ContactEpisode] {
        &self.history
    }

    pub fn active(&self) -> impl Iterator<Item = &ContactEpisode> {
        self.active.values()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn stats(&self) -> ContactStats {
        let completed = self.history.len();
        let mean = |f: fn(&ContactEpisode) -> f64| {
            if completed == 0 {
                0.0
            } else {
                self.history.iter().map(f).sum::<f64>() / completed as f64
            }
        };

        ContactStats {
            total: completed + self.active.len(),
            completed,
            active: self.active.len(),
            avg_duration_s: mean(ContactEpisode::duration),
            avg_distance_km: mean(|e| e.avg_distance_km),
            avg_latency_ms: mean(|e| e.avg_latency_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    None,
    Opened,
    Extended,
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;
    use orbital_mechanics::{NoCache, OracleConfig};
    use proptest::prelude::*;

    fn oracle() -> VisibilityOracle<NoCache> {
        VisibilityOracle::with_cache(OracleConfig::default(), NoCache)
    }

    #[test]
    fn test_episode_lifecycle() {
        let mut tracker = ContactTracker::new(5700.0);
        let key = PairKey::new(3, 1);

        assert_eq!(tracker.observe(key, true, 1000.0, 10.0), Transition::Opened);
        assert_eq!(tracker.observe(key, true, 2000.0, 20.0), Transition::Extended);
        assert_eq!(tracker.active_count(), 1);
        assert_eq!(tracker.stats().total, 1);
        assert_eq!(tracker.stats().completed, 0);

        assert_eq!(tracker.observe(key, false, 9000.0, 30.0), Transition::Closed);
        assert_eq!(tracker.observe(key, false, 9000.0, 40.0), Transition::None);

        let episode = &tracker.history()[0];
        assert_eq!((episode.sat_a, episode.sat_b), (1, 3));
        assert_eq!(episode.start_time, 10.0);
        assert_eq!(episode.end_time, Some(30.0));
        assert_eq!(episode.duration(), 20.0);
        assert_eq!(episode.samples.len(), 2);
        assert_eq!(episode.avg_distance_km, 1500.0);
        assert!((episode.avg_latency_ms - latency_ms(1500.0)).abs() < 1e-12);
        assert_eq!(episode.orbital_period, 1);
    }

    #[test]
    fn test_reopen_does_not_overlap() {
        let mut tracker = ContactTracker::new(100.0);
        let key = PairKey::new(0, 1);

        tracker.observe(key, true, 500.0, 0.0);
        tracker.observe(key, false, 500.0, 10.0);
        tracker.observe(key, true, 500.0, 150.0);
        tracker.observe(key, false, 500.0, 160.0);

        let history = tracker.history();
        assert_eq!(history.len(), 2);
        assert!(history[0].end_time.unwrap() <= history[1].start_time);
        assert_eq!(history[1].orbital_period, 2);
    }

    #[test]
    fn test_update_with_geometry() {
        let mut tracker = ContactTracker::new(5700.0);
        let mut oracle = oracle();
        let a = Vector3::new(6921.0, 0.0, 0.0);
        let b = Vector3::new(6900.0, 500.0, 0.0);
        let hidden = Vector3::new(-6921.0, 0.0, 0.0);

        let step = tracker.update(&[a, b, hidden], &mut oracle, 0.0);
        assert_eq!(step.opened, 1);
        assert_eq!(tracker.active().next().map(|e| e.key()), Some(PairKey::new(0, 1)));

        // b moves behind the planet
        let step = tracker.update(&[a, hidden, hidden], &mut oracle, 20.0);
        assert_eq!(step.closed, 1);
        assert_eq!(tracker.stats().completed, 1);
        assert_eq!(tracker.stats().avg_duration_s, 20.0);
    }

    #[test]
    fn test_close_all() {
        let mut tracker = ContactTracker::new(5700.0);
        tracker.observe(PairKey::new(0, 1), true, 100.0, 0.0);
        tracker.observe(PairKey::new(2, 5), true, 300.0, 40.0);

        assert_eq!(tracker.close_all(100.0), 2);
        assert_eq!(tracker.active_count(), 0);

        let stats = tracker.stats();
        assert_eq!(stats.completed, 2);
        assert_eq!(stats.avg_duration_s, 80.0);
        assert_eq!(stats.avg_distance_km, 200.0);

        tracker.reset(5700.0);
        assert_eq!(tracker.stats(), ContactStats::default());
    }

    proptest! {
        #[test]
        fn fuzz_durations_match_bounds(pattern in prop::collection::vec(any::<bool>(), 1..200)) {
            let mut tracker = ContactTracker::new(5700.0);
            let key = PairKey::new(0, 1);
            for (step, visible) in pattern.iter().enumerate() {
                tracker.observe(key, *visible, 1000.0, step as f64 * 20.0);
            }
            tracker.close_all(pattern.len() as f64 * 20.0);

            let mut last_end = f64::NEG_INFINITY;
            for episode in tracker.history() {
                let end = episode.end_time.unwrap();
                prop_assert_eq!(episode.duration(), end - episode.start_time);
                prop_assert!(!episode.samples.is_empty());
                prop_assert!(episode.start_time >= last_end);
                last_end = end;
            }
        }
    }
}
