//! Circular two-body propagation.
//!
//! Each satellite rides a circular orbit at constant angular velocity; only the true
//! anomaly changes between ticks.

use crate::{walker::WalkerDelta, Positioned, EARTH_RADIUS_KM, GM_EARTH};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::debug;

/// Mean motion of a circular orbit (rad/s)
pub fn angular_velocity(altitude_km: f64) -> f64 {
    let r = EARTH_RADIUS_KM + altitude_km;
    (GM_EARTH / r.powi(3)).sqrt()
}

/// Circular orbital speed (km/s)
pub fn orbital_velocity(altitude_km: f64) -> f64 {
    (GM_EARTH / (EARTH_RADIUS_KM + altitude_km)).sqrt()
}

/// T = 2π * sqrt(r³/μ) in seconds
pub fn orbital_period(altitude_km: f64) -> f64 {
    let r = EARTH_RADIUS_KM + altitude_km;
    2.0 * PI * (r.powi(3) / GM_EARTH).sqrt()
}

/// Cartesian position for a circular orbit.
///
/// In-plane coordinates are rotated about the line of nodes (X) by the inclination,
/// then about the polar axis (Z) by the RAAN.
pub fn position(
    altitude_km: f64,
    inclination_deg: f64,
    raan_deg: f64,
    true_anomaly_deg: f64,
) -> Vector3<f64> {
    let r = EARTH_RADIUS_KM + altitude_km;
    let nu = true_anomaly_deg.to_radians();
    let (sin_i, cos_i) = inclination_deg.to_radians().sin_cos();
    let (sin_o, cos_o) = raan_deg.to_radians().sin_cos();

    let x_orb = r * nu.cos();
    let y_orb = r * nu.sin();

    // inclination about X
    let x1 = x_orb;
    let y1 = y_orb * cos_i;
    let z1 = y_orb * sin_i;

    // RAAN about Z
    Vector3::new(x1 * cos_o - y1 * sin_o, x1 * sin_o + y1 * cos_o, z1)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SatelliteState {
    pub index: usize,
    pub plane: usize,
    pub altitude_km: f64,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub true_anomaly_deg: f64,
    pub angular_velocity_rad_s: f64,
    pub position: Vector3<f64>,
}

impl SatelliteState {
    pub fn new(
        index: usize,
        plane: usize,
        altitude_km: f64,
        inclination_deg: f64,
        raan_deg: f64,
        true_anomaly_deg: f64,
    ) -> Self {
        let true_anomaly_deg = true_anomaly_deg.rem_euclid(360.0);
        Self {
            index,
            plane,
            altitude_km,
            inclination_deg,
            raan_deg,
            true_anomaly_deg,
            angular_velocity_rad_s: angular_velocity(altitude_km),
            position: position(altitude_km, inclination_deg, raan_deg, true_anomaly_deg),
        }
    }

    pub fn angular_velocity_deg_s(&self) -> f64 {
        self.angular_velocity_rad_s.to_degrees()
    }

    /// Advance along the orbit by `dt` seconds of wall time scaled by `speed_factor`.
    pub fn advance(&mut self, dt: f64, speed_factor: f64) {
        self.true_anomaly_deg =
            (self.true_anomaly_deg + self.angular_velocity_deg_s() * dt * speed_factor).rem_euclid(360.0);
        self.position = position(
            self.altitude_km,
            self.inclination_deg,
            self.raan_deg,
            self.true_anomaly_deg,
        );
    }

    pub fn orbital_period(&self) -> f64 {
        orbital_period(self.altitude_km)
    }
}

impl Positioned for SatelliteState {
    fn position(&self) -> Vector3<f64> {
        self.position
    }
}

/// All satellites of one Walker Delta configuration.
#[derive(Debug, Clone)]
pub struct Constellation {
    pub config: WalkerDelta,
    satellites: Vec<SatelliteState>,
}

impl Constellation {
    /// Build every satellite at the epoch, numbered contiguously per plane (see [`crate::PlaneLayout`]).
    pub fn walker(config: WalkerDelta) -> Self {
        let layout = config.layout();
        let mut satellites = Vec::with_capacity(config.total_satellites);

        for plane in 0..layout.planes() {
            let raan = plane as f64 * config.plane_spacing_deg();
            let count = layout.plane_size(plane);
            let phase = plane as f64 * config.phase_offset_deg();

            for slot in 0..count {
                let anomaly = slot as f64 * 360.0 / count as f64 + phase;
                satellites.push(SatelliteState::new(
                    satellites.len(),
                    plane,
                    config.altitude_km,
                    config.inclination_deg,
                    raan,
                    anomaly,
                ));
            }
        }

        debug!(
            "Built constellation {} with {} satellites over {} planes",
            config,
            satellites.len(),
            layout.planes()
        );

        Self { config, satellites }
    }

    pub fn satellites(&self) -> &[SatelliteState] {
        &self.satellites
    }

    pub fn get(&self, index: usize) -> Option<&SatelliteState> {
        self.satellites.get(index)
    }

    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.satellites.is_empty()
    }

    pub fn advance(&mut self, dt: f64, speed_factor: f64) {
        for sat in &mut self.satellites {
            sat.advance(dt, speed_factor);
        }
    }

    pub fn orbital_period(&self) -> f64 {
        self.config.orbital_period_s()
    }
}
