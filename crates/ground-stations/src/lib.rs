//! Ground Stations Library
//!
//! Fixed ground terminals on a spherical, non-rotating Earth, the plain-text station
//! descriptor loader, and per-station satellite tracking with elevation/hysteresis handover.

use nalgebra::Vector3;
use orbital_mechanics::transforms::{geodetic_to_cartesian, GeodeticPosition};
use orbital_mechanics::Positioned;
use serde::Serialize;
use thiserror::Error;

pub mod handover;
pub mod loader;

pub use handover::{
    GroundLinkStats, GroundLinkTracker, HandoverAction, HandoverEvent, HandoverPolicy,
    LatencySample, LinkSegment, TrackingState,
};
pub use loader::{parse_descriptor, ImportIssue, ImportReport};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StationError {
    #[error("Station not found: {0}")]
    NotFound(String),
    #[error("Expected `name lat lon`, got {0:?}")]
    MissingFields(String),
    #[error("Invalid {field} value {value:?}")]
    InvalidNumber { field: &'static str, value: String },
    #[error("Latitude {0} outside [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("Longitude {0} outside [-180, 180]")]
    LongitudeOutOfRange(f64),
}

pub type Result<T> = std::result::Result<T, StationError>;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroundStation {
    pub id: String,
    pub name: String,
    pub lat_deg: f64,
    pub lon_deg: f64,
    /// Surface point, km
    #[serde(skip)]
    position: Vector3<f64>,
}

impl GroundStation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, lat_deg: f64, lon_deg: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&lat_deg) || !lat_deg.is_finite() {
            return Err(StationError::LatitudeOutOfRange(lat_deg));
        }
        if !(-180.0..=180.0).contains(&lon_deg) || !lon_deg.is_finite() {
            return Err(StationError::LongitudeOutOfRange(lon_deg));
        }

        let position = geodetic_to_cartesian(&GeodeticPosition {
            latitude: lat_deg,
            longitude: lon_deg,
            altitude_km: 0.0,
        });

        Ok(Self {
            id: id.into(),
            name: name.into(),
            lat_deg,
            lon_deg,
            position,
        })
    }
}

impl Positioned for GroundStation {
    fn position(&self) -> Vector3<f64> {
        self.position
    }
}

/// Ordered station set; ids are `gs0, gs1, ...` in insertion order.
#[derive(Debug, Clone, Default)]
pub struct StationRegistry {
    stations: Vec<GroundStation>,
}

impl StationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> String {
        format!("gs{}", self.stations.len())
    }

    pub fn add(&mut self, name: impl Into<String>, lat_deg: f64, lon_deg: f64) -> Result<&GroundStation> {
        let station = GroundStation::new(self.next_id(), name, lat_deg, lon_deg)?;
        self.stations.push(station);
        Ok(&self.stations[self.stations.len() - 1])
    }

    /// Import descriptor text, keeping every valid line. Never fails as a whole.
    pub fn import(&mut self, text: &str) -> ImportReport {
        let mut report = parse_descriptor(text);
        for entry in report.take_entries() {
            if let Err(error) = self.add(entry.name, entry.lat_deg, entry.lon_deg) {
                report.push_issue(entry.line, error);
                continue;
            }
            report.imported += 1;
        }
        report
    }

    pub fn get(&self, id: &str) -> Result<&GroundStation> {
        self.stations
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| StationError::NotFound(id.to_string()))
    }

    pub fn stations(&self) -> &[GroundStation] {
        &self.stations
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn clear(&mut self) {
        self.stations.clear();
    }
}
