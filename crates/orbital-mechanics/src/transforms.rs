//! Coordinate transforms on a spherical Earth.

use crate::{OrbitalError, Result, EARTH_RADIUS_KM};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeodeticPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude_km: f64,
}

impl GeodeticPosition {
    pub fn new(latitude: f64, longitude: f64, altitude_km: f64) -> Result<Self> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(OrbitalError::InvalidCoordinates(format!(
                "lat {} lon {}",
                latitude, longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
            altitude_km,
        })
    }
}

/// Geodetic (spherical) to Earth-centered Cartesian, Z through the north pole.
pub fn geodetic_to_cartesian(pos: &GeodeticPosition) -> Vector3<f64> {
    let r = EARTH_RADIUS_KM + pos.altitude_km;
    let (sin_lat, cos_lat) = pos.latitude.to_radians().sin_cos();
    let (sin_lon, cos_lon) = pos.longitude.to_radians().sin_cos();

    Vector3::new(r * cos_lat * cos_lon, r * cos_lat * sin_lon, r * sin_lat)
}

pub fn cartesian_to_geodetic(v: &Vector3<f64>) -> GeodeticPosition {
    let r_xy = (v.x * v.x + v.y * v.y).sqrt();
    GeodeticPosition {
        latitude: v.z.atan2(r_xy).to_degrees(),
        longitude: v.y.atan2(v.x).to_degrees(),
        altitude_km: v.norm() - EARTH_RADIUS_KM,
    }
}

/// Elevation of `target` seen from `observer`, in degrees.
///
/// `90° − angle(observer→target, local outward normal)`. Returns -90° for a degenerate
/// (zero-length) geometry.
pub fn elevation_deg(observer: &Vector3<f64>, target: &Vector3<f64>) -> f64 {
    let to_target = target - observer;
    let range = to_target.norm();
    let radius = observer.norm();
    if range == 0.0 || radius == 0.0 {
        return -90.0;
    }

    let cos_angle = (to_target.dot(observer) / (range * radius)).clamp(-1.0, 1.0);
    90.0 - cos_angle.acos().to_degrees()
}
