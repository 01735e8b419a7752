//! Ground link tracking
//!
//! Each station tracks at most one satellite. Per step:
//!
//! 1. The current link is valid while the satellite is visible and at or above
//!    `min_elevation_deg`.
//! 2. The best candidate is the visible satellite with the highest elevation at or above the
//!    minimum; ties go to the lowest index.
//! 3. An invalid current link switches to the best candidate at once (forced). A valid link
//!    switches only when the candidate beats it by more than `hysteresis_deg` and at least
//!    `min_handover_interval_s` has passed since the last handover.
//!
//! The tracked link is sampled for latency every step.

use crate::GroundStation;
use orbital_mechanics::transforms::elevation_deg;
use orbital_mechanics::{distance_km, latency_ms, Positioned, VisibilityCache, VisibilityOracle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandoverPolicy {
    pub min_elevation_deg: f64,
    pub hysteresis_deg: f64,
    pub min_handover_interval_s: f64,
}

impl Default for HandoverPolicy {
    fn default() -> Self {
        Self {
            min_elevation_deg: 25.0,
            hysteresis_deg: 15.0,
            min_handover_interval_s: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandoverAction {
    Connect,
    Handover,
    Disconnect,
}

impl HandoverAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandoverAction::Connect => "connect",
            HandoverAction::Handover => "handover",
            HandoverAction::Disconnect => "disconnect",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandoverEvent {
    pub time: f64,
    pub station_id: String,
    pub action: HandoverAction,
    pub from_sat: Option<usize>,
    pub to_sat: Option<usize>,
    pub latency_ms: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySample {
    pub t: f64,
    pub latency_ms: f64,
}

/// One uninterrupted station-to-satellite link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSegment {
    pub station_id: String,
    pub sat: usize,
    pub start_time: f64,
    pub end_time: Option<f64>,
    pub samples: Vec<LatencySample>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackingState {
    pub tracked: Option<usize>,
    pub last_handover_time: Option<f64>,
    /// Index into the timeline of the open segment
    #[serde(skip)]
    segment: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroundLinkStats {
    pub total_stations: usize,
    pub total_events: usize,
    pub connect_events: usize,
    pub handover_events: usize,
    pub disconnect_events: usize,
    pub total_samples: usize,
    pub avg_latency_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct GroundLinkTracker {
    policy: HandoverPolicy,
    states: HashMap<String, TrackingState>,
    events: Vec<HandoverEvent>,
    timeline: Vec<LinkSegment>,
}

impl GroundLinkTracker {
    pub fn new(policy: HandoverPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> &HandoverPolicy {
        &self.policy
    }

    pub fn state(&self, station_id: &str) -> Option<&TrackingState> {
        self.states.get(station_id)
    }

    pub fn events(&self) -> &[HandoverEvent] {
        &self.events
    }

    pub fn timeline(&self) -> &[LinkSegment] {
        &self.timeline
    }

    pub fn reset(&mut self) {
        self.states.clear();
        self.events.clear();
        self.timeline.clear();
    }

    /// Elevation of a satellite if it is visible and clears the minimum elevation.
    fn usable_elevation<P, C>(&self, station: &GroundStation, sat: &P, oracle: &VisibilityOracle<C>) -> Option<f64>
    where
        P: Positioned,
        C: VisibilityCache,
    {
        if !oracle.is_visible(station, sat) {
            return None;
        }
        let elevation = elevation_deg(&station.position(), &sat.position());
        (elevation >= self.policy.min_elevation_deg).then_some(elevation)
    }

    fn best_candidate<P, C>(&self, station: &GroundStation, sats: &[P], oracle: &VisibilityOracle<C>) -> Option<(usize, f64)>
    where
        P: Positioned,
        C: VisibilityCache,
    {
        let mut best: Option<(usize, f64)> = None;
        for (index, sat) in sats.iter().enumerate() {
            if let Some(elevation) = self.usable_elevation(station, sat, oracle) {
                if best.map_or(true, |(_, e)| elevation > e) {
                    best = Some((index, elevation));
                }
            }
        }
        best
    }

    /// Step every station at `now`. Returns the number of events emitted.
    pub fn update<P, C>(&mut self, stations: &[GroundStation], sats: &[P], oracle: &VisibilityOracle<C>, now: f64) -> usize
    where
        P: Positioned,
        C: VisibilityCache,
    {
        let before = self.events.len();
        for station in stations {
            self.step_station(station, sats, oracle, now);
        }
        self.events.len() - before
    }

    fn step_station<P, C>(&mut self, station: &GroundStation, sats: &[P], oracle: &VisibilityOracle<C>, now: f64)
    where
        P: Positioned,
        C: VisibilityCache,
    {
        let mut state = self.states.get(&station.id).cloned().unwrap_or_default();

        let current = state
            .tracked
            .and_then(|sat| sats.get(sat).map(|s| (sat, s)))
            .and_then(|(sat, s)| self.usable_elevation(station, s, oracle).map(|e| (sat, e)));
        let best = self.best_candidate(station, sats, oracle);

        let next = match (current, best) {
            (None, Some((sat, _))) => Some(sat),
            (None, None) => None,
            (Some((cur, cur_elev)), Some((sat, best_elev))) if sat != cur => {
                let dwell_ok = state
                    .last_handover_time
                    .map_or(true, |t| now - t >= self.policy.min_handover_interval_s);
                if best_elev - cur_elev > self.policy.hysteresis_deg && dwell_ok {
                    Some(sat)
                } else {
                    Some(cur)
                }
            }
            (Some((cur, _)), _) => Some(cur),
        };

        if next != state.tracked {
            self.transition(station, sats, &mut state, next, now);
        }

        if let (Some(sat), Some(segment)) = (state.tracked, state.segment) {
            if let (Some(s), Some(seg)) = (sats.get(sat), self.timeline.get_mut(segment)) {
                seg.samples.push(LatencySample {
                    t: now,
                    latency_ms: latency_ms(distance_km(station, s)),
                });
            }
        }

        self.states.insert(station.id.clone(), state);
    }

    fn transition<P: Positioned>(
        &mut self,
        station: &GroundStation,
        sats: &[P],
        state: &mut TrackingState,
        next: Option<usize>,
        now: f64,
    ) {
        let previous = state.tracked;
        let action = match (previous, next) {
            (None, Some(_)) => HandoverAction::Connect,
            (Some(_), Some(_)) => HandoverAction::Handover,
            (Some(_), None) => HandoverAction::Disconnect,
            (None, None) => return,
        };

        if let Some(seg) = state.segment.take().and_then(|i| self.timeline.get_mut(i)) {
            seg.end_time = Some(now);
        }

        let latency = next
            .and_then(|sat| sats.get(sat))
            .map(|s| latency_ms(distance_km(station, s)));

        match action {
            HandoverAction::Disconnect => {
                info!("{} lost satellite {:?} at t={:.1}s", station.id, previous, now);
            }
            _ => debug!(
                "{} {} {:?} -> {:?} at t={:.1}s",
                station.id,
                action.as_str(),
                previous,
                next,
                now
            ),
        }

        self.events.push(HandoverEvent {
            time: now,
            station_id: station.id.clone(),
            action,
            from_sat: previous,
            to_sat: next,
            latency_ms: latency,
        });

        state.tracked = next;
        if let Some(sat) = next {
            state.last_handover_time = Some(now);
            self.timeline.push(LinkSegment {
                station_id: station.id.clone(),
                sat,
                start_time: now,
                end_time: None,
                samples: Vec::new(),
            });
            state.segment = Some(self.timeline.len() - 1);
        }
    }

    /// Close every open segment at `now` and release all stations (end of a collection run).
    ///
    /// Events and the timeline are kept; a later update reconnects from scratch.
    pub fn close_all(&mut self, now: f64) {
        for state in self.states.values_mut() {
            if let Some(seg) = state.segment.take().and_then(|i| self.timeline.get_mut(i)) {
                seg.end_time = Some(now);
            }
            state.tracked = None;
        }
    }

    pub fn stats(&self, total_stations: usize) -> GroundLinkStats {
        let count = |action: HandoverAction| self.events.iter().filter(|e| e.action == action).count();
        let latencies: Vec<f64> = self
            .timeline
            .iter()
            .flat_map(|seg| seg.samples.iter().map(|s| s.latency_ms))
            .collect();
        let avg_latency_ms = if latencies.is_empty() {
            0.0
        } else {
            latencies.iter().sum::<f64>() / latencies.len() as f64
        };

        GroundLinkStats {
            total_stations,
            total_events: self.events.len(),
            connect_events: count(HandoverAction::Connect),
            handover_events: count(HandoverAction::Handover),
            disconnect_events: count(HandoverAction::Disconnect),
            total_samples: latencies.len(),
            avg_latency_ms,
        }
    }
}
