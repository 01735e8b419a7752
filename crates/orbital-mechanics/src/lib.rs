//! Orbital Mechanics Library
//!
//! Circular two-body propagation, coordinate transforms, Walker Delta constellation
//! layout and Earth-occlusion line-of-sight testing for the link metrics engine.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod propagation;
pub mod transforms;
pub mod visibility;
pub mod walker;

pub use propagation::{Constellation, SatelliteState};
pub use visibility::{NoCache, OracleConfig, TimedCache, VisibilityCache, VisibilityOracle};
pub use walker::{PlaneLayout, WalkerDelta};

/// Earth gravitational parameter (km³/s²)
pub const GM_EARTH: f64 = 398_600.4418;
/// Mean spherical Earth radius (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;
/// Speed of light (km/s)
pub const SPEED_OF_LIGHT_KM_S: f64 = 299_792.458;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrbitalError {
    #[error("Invalid constellation descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("Field {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: String },
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
}

pub type Result<T> = std::result::Result<T, OrbitalError>;

/// Anything that occupies a point in the simulation frame (km, Earth-centered,
/// Z along the rotation axis).
pub trait Positioned {
    fn position(&self) -> Vector3<f64>;
}

impl Positioned for Vector3<f64> {
    fn position(&self) -> Vector3<f64> {
        *self
    }
}

/// One-way light-time latency in milliseconds for a path length in km.
pub fn latency_ms(distance_km: f64) -> f64 {
    distance_km / SPEED_OF_LIGHT_KM_S * 1000.0
}

/// Euclidean distance between two positioned entities (km).
pub fn distance_km<A: Positioned + ?Sized, B: Positioned + ?Sized>(a: &A, b: &B) -> f64 {
    (a.position() - b.position()).norm()
}

/// Unordered satellite pair, always stored with `a < b`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub a: usize,
    pub b: usize,
}

impl PairKey {
    pub fn new(x: usize, y: usize) -> Self {
        if x <= y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.a == self.b
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.a, self.b)
    }
}
