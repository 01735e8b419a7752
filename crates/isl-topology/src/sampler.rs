//! Periodic distance/latency sampling over the static ISL set.
//!
//! Links are permanent by construction, so no occlusion test is applied here.

use crate::{IslPair, LinkType};
use orbital_mechanics::{distance_km, latency_ms, PairKey, Positioned};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IslSample {
    pub pair: PairKey,
    pub timestamp: f64,
    pub distance_km: f64,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IslPairStats {
    pub sat_a: usize,
    pub sat_b: usize,
    pub link_type: LinkType,
    pub plane_a: usize,
    pub plane_b: usize,
    pub samples: usize,
    pub avg_distance_km: f64,
    pub min_distance_km: f64,
    pub max_distance_km: f64,
    pub avg_latency_ms: f64,
    pub min_latency_ms: f64,
    pub max_latency_ms: f64,
    /// Population variance (ms²)
    pub variance_latency_ms: f64,
    pub std_dev_latency_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IslGlobalStats {
    pub total_links: usize,
    pub intra_plane_links: usize,
    pub inter_plane_links: usize,
    pub total_samples: usize,
    pub avg_latency_intra_ms: f64,
    pub avg_latency_inter_ms: f64,
    pub avg_latency_overall_ms: f64,
}

#[derive(Debug, Clone, Default)]
pub struct IslSampler {
    pairs: Vec<IslPair>,
    series: BTreeMap<PairKey, Vec<IslSample>>,
}

impl IslSampler {
    pub fn new(pairs: Vec<IslPair>) -> Self {
        Self {
            pairs,
            series: BTreeMap::new(),
        }
    }

    /// Swap in a regenerated pair set; collected samples belong to the old topology.
    pub fn set_pairs(&mut self, pairs: Vec<IslPair>) {
        self.pairs = pairs;
        self.series.clear();
    }

    pub fn clear(&mut self) {
        self.series.clear();
    }

    pub fn pairs(&self) -> &[IslPair] {
        &self.pairs
    }

    pub fn series(&self, key: PairKey) -> &[IslSample] {
        self.series.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn total_samples(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    /// Record one sample per pair at `now`. Returns the number of samples taken.
    pub fn sample<P: Positioned>(&mut self, positions: &[P], now: f64) -> usize {
        let mut taken = 0;

        for pair in &self.pairs {
            let (Some(a), Some(b)) = (positions.get(pair.sat_a), positions.get(pair.sat_b)) else {
                warn!(
                    "ISL {} references a missing satellite ({} live), sample skipped",
                    pair.key(),
                    positions.len()
                );
                continue;
            };

            let distance = distance_km(a, b);
            self.series.entry(pair.key()).or_default().push(IslSample {
                pair: pair.key(),
                timestamp: now,
                distance_km: distance,
                latency_ms: latency_ms(distance),
            });
            taken += 1;
        }

        debug!("ISL sample at t={:.1}s: {} links", now, taken);
        taken
    }

    pub fn compute_stats(&self) -> Vec<IslPairStats> {
        self.pairs
            .iter()
            .map(|pair| pair_stats(pair, self.series(pair.key())))
            .collect()
    }

    /// Link counts and mean-of-per-link-mean latencies by link type.
    ///
    /// Links with no samples are counted but do not contribute to the latency means.
    pub fn global_stats(&self) -> IslGlobalStats {
        let stats = self.compute_stats();

        IslGlobalStats {
            total_links: self.pairs.len(),
            intra_plane_links: count_type(&self.pairs, LinkType::IntraPlane),
            inter_plane_links: count_type(&self.pairs, LinkType::InterPlane),
            total_samples: self.total_samples(),
            avg_latency_intra_ms: mean_latency(&stats, Some(LinkType::IntraPlane)),
            avg_latency_inter_ms: mean_latency(&stats, Some(LinkType::InterPlane)),
            avg_latency_overall_ms: mean_latency(&stats, None),
        }
    }
}

fn count_type(pairs: &[IslPair], link_type: LinkType) -> usize {
    pairs.iter().filter(|p| p.link_type == link_type).count()
}

/// Mean of per-link mean latencies over sampled links, optionally of one type
fn mean_latency(stats: &[IslPairStats], link_type: Option<LinkType>) -> f64 {
    let means: Vec<f64> = stats
        .iter()
        .filter(|s| s.samples > 0 && link_type.map_or(true, |t| s.link_type == t))
        .map(|s| s.avg_latency_ms)
        .collect();
    mean(&means)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// min / mean / max of a non-empty series; the mean is clamped into [min, max]
/// to absorb summation rounding.
fn summarize(values: &[f64]) -> (f64, f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (min, mean(values).clamp(min, max), max)
}

fn pair_stats(pair: &IslPair, samples: &[IslSample]) -> IslPairStats {
    let distances: Vec<f64> = samples.iter().map(|s| s.distance_km).collect();
    let latencies: Vec<f64> = samples.iter().map(|s| s.latency_ms).collect();

    let (min_distance, avg_distance, max_distance) = summarize(&distances);
    let (min_latency, avg_latency, max_latency) = summarize(&latencies);

    let variance = if latencies.is_empty() {
        0.0
    } else {
        latencies
            .iter()
            .map(|l| (l - avg_latency).powi(2))
            .sum::<f64>()
            / latencies.len() as f64
    };

    IslPairStats {
        sat_a: pair.sat_a,
        sat_b: pair.sat_b,
        link_type: pair.link_type,
        plane_a: pair.plane_a,
        plane_b: pair.plane_b,
        samples: samples.len(),
        avg_distance_km: avg_distance,
        min_distance_km: min_distance,
        max_distance_km: max_distance,
        avg_latency_ms: avg_latency,
        min_latency_ms: min_latency,
        max_latency_ms: max_latency,
        variance_latency_ms: variance,
        std_dev_latency_ms: variance.sqrt(),
    }
}
