//! ISL Topology - static inter-satellite links for Walker Delta constellations
//!
//! Provides the permanent link set the metrics engine samples:
//!
//! - Intra-plane rings (each satellite to the next one in its plane)
//! - Inter-plane phased links (each satellite to its phased neighbor in the next plane)
//! - Graph view for shortest-latency paths and connectivity checks
//! - Periodic distance/latency sampling with per-link statistics

use orbital_mechanics::{PairKey, PlaneLayout, WalkerDelta};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

pub mod graph;
pub mod sampler;

pub use graph::{GraphStats, IslGraph};
pub use sampler::{IslGlobalStats, IslPairStats, IslSample, IslSampler};

#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("Satellite not found: {0}")]
    SatelliteNotFound(usize),
    #[error("No path found between {0} and {1}")]
    NoPath(usize, usize),
}

pub type Result<T> = std::result::Result<T, TopologyError>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum LinkType {
    #[serde(rename = "intra-plane")]
    IntraPlane,
    #[serde(rename = "inter-plane")]
    InterPlane,
}

impl LinkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkType::IntraPlane => "intra-plane",
            LinkType::InterPlane => "inter-plane",
        }
    }
}

/// A permanent inter-satellite link, stored with `sat_a < sat_b`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IslPair {
    pub sat_a: usize,
    pub sat_b: usize,
    pub link_type: LinkType,
    pub plane_a: usize,
    pub plane_b: usize,
}

impl IslPair {
    /// Canonicalize a (satellite, plane) pair so the lower index comes first.
    pub fn new(x: (usize, usize), y: (usize, usize), link_type: LinkType) -> Self {
        let (lo, hi) = if x.0 <= y.0 { (x, y) } else { (y, x) };
        Self {
            sat_a: lo.0,
            sat_b: hi.0,
            link_type,
            plane_a: lo.1,
            plane_b: hi.1,
        }
    }

    pub fn key(&self) -> PairKey {
        PairKey::new(self.sat_a, self.sat_b)
    }
}

pub struct TopologyBuilder;

impl TopologyBuilder {
    pub fn from_walker(config: &WalkerDelta) -> Vec<IslPair> {
        Self::generate(config.total_satellites, config.planes, config.phasing)
    }

    /// Generate the deduplicated ISL set for `num_sats` satellites over `num_planes`.
    ///
    /// Plane `p` links to plane `(p + 1) % num_planes`, so the last plane closes the
    /// ring back onto the first.
    pub fn generate(num_sats: usize, num_planes: usize, phase: usize) -> Vec<IslPair> {
        if num_planes == 0 || num_sats == 0 {
            warn!(
                "Cannot build topology for {} satellites over {} planes",
                num_sats, num_planes
            );
            return Vec::new();
        }

        let layout = PlaneLayout::new(num_sats, num_planes);
        let mut set = PairSet::default();

        for plane in 0..num_planes {
            let count = layout.plane_size(plane);
            for slot in 0..count {
                let next = (slot + 1) % count;
                if let (Some(a), Some(b)) = (layout.index_of(plane, slot), layout.index_of(plane, next)) {
                    set.insert(IslPair::new((a, plane), (b, plane), LinkType::IntraPlane));
                }
            }
        }

        for plane in 0..num_planes {
            let next_plane = (plane + 1) % num_planes;
            let next_count = layout.plane_size(next_plane);
            if next_count == 0 {
                continue;
            }
            for slot in 0..layout.plane_size(plane) {
                let target = (slot as i64 - phase as i64).rem_euclid(next_count as i64) as usize;
                if let (Some(a), Some(b)) = (
                    layout.index_of(plane, slot),
                    layout.index_of(next_plane, target),
                ) {
                    set.insert(IslPair::new((a, plane), (b, next_plane), LinkType::InterPlane));
                }
            }
        }

        debug!(
            "Generated {} ISL pairs for {}/{}/{}",
            set.pairs.len(),
            num_sats,
            num_planes,
            phase
        );

        set.pairs
    }
}

/// Insertion-ordered pair set; self links are dropped and the first type seen wins.
#[derive(Default)]
struct PairSet {
    seen: HashSet<PairKey>,
    pairs: Vec<IslPair>,
}

impl PairSet {
    fn insert(&mut self, pair: IslPair) {
        let key = pair.key();
        if key.is_self_loop() || !self.seen.insert(key) {
            return;
        }
        self.pairs.push(pair);
    }
}
