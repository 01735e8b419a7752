//! Simulation configuration
//!
//! Loaded from an optional JSON file; every field has a default so partial files work.
//! CLI flags are applied on top by the binary.

use crate::{Result, SimError};
use ground_stations::HandoverPolicy;
use metrics_export::{ExportMode, DEFAULT_BANDWIDTH_MBPS};
use orbital_mechanics::{OracleConfig, WalkerDelta};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::info;

/// Starlink shell 1
pub const DEFAULT_CONSTELLATION: &str = "550:53:1584/72/1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Walker Delta descriptor `alt:inc:T/P/F`
    pub constellation: String,
    pub mode: ExportMode,
    pub sampling_interval_s: f64,
    pub num_periods: u32,
    /// Simulated seconds per wall-clock second
    pub speed_factor: f64,
    /// Wall-clock seconds per scheduler tick
    pub tick_s: f64,
    pub oracle: OracleConfig,
    pub handover: HandoverPolicy,
    pub bandwidth_mbps: f64,
    pub stations_file: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub write_csv: bool,
    pub write_summary: bool,
    pub split_periods: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            constellation: DEFAULT_CONSTELLATION.to_string(),
            mode: ExportMode::IslAverage,
            sampling_interval_s: 20.0,
            num_periods: 1,
            speed_factor: 100.0,
            tick_s: 1.0,
            oracle: OracleConfig::default(),
            handover: HandoverPolicy::default(),
            bandwidth_mbps: DEFAULT_BANDWIDTH_MBPS,
            stations_file: None,
            output_dir: PathBuf::from("output"),
            write_csv: false,
            write_summary: false,
            split_periods: false,
        }
    }
}

impl SimConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading simulation config from {:?}", path);

        let reader = BufReader::new(File::open(path)?);
        let config: SimConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn walker(&self) -> Result<WalkerDelta> {
        Ok(self.constellation.parse()?)
    }

    pub fn validate(&self) -> Result<()> {
        self.walker()?;

        let positive = [
            ("sampling_interval_s", self.sampling_interval_s),
            ("speed_factor", self.speed_factor),
            ("tick_s", self.tick_s),
            ("cache_lifetime_s", self.oracle.cache_lifetime_s),
            ("max_link_distance_km", self.oracle.max_link_distance_km),
        ];
        for (field, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimError::Config(format!("{} must be positive, got {}", field, value)));
            }
        }
        if self.num_periods == 0 {
            return Err(SimError::Config("num_periods must be at least 1".to_string()));
        }
        if self.split_periods && self.mode != ExportMode::IslTimeseries {
            return Err(SimError::Config(
                "period splitting requires isl-timeseries mode".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        let config = SimConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.walker().unwrap().total_satellites, 1584);
        assert_eq!(config.handover.min_elevation_deg, 25.0);
        assert_eq!(config.oracle.max_link_distance_km, 5000.0);
    }

    #[test]
    fn test_partial_json() {
        let config: SimConfig = serde_json::from_str(
            r#"{ "constellation": "550:53:24/6/1", "mode": "isl-timeseries", "handover": { "hysteresis_deg": 10.0 } }"#,
        )
        .unwrap();

        assert_eq!(config.mode, ExportMode::IslTimeseries);
        assert_eq!(config.handover.hysteresis_deg, 10.0);
        assert_eq!(config.handover.min_handover_interval_s, 10.0);
        assert_eq!(config.sampling_interval_s, 20.0);
    }

    #[test]
    fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, r#"{{ "num_periods": 3, "oracle": {{ "cache_lifetime_s": 2.5 }} }}"#).unwrap();

        let config = SimConfig::load(file.path()).unwrap();
        assert_eq!(config.num_periods, 3);
        assert_eq!(config.oracle.cache_lifetime_s, 2.5);
        assert_eq!(config.oracle.max_link_distance_km, 5000.0);
    }

    #[test]
    fn test_validation_errors() {
        let config = SimConfig {
            sampling_interval_s: 0.0,
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(SimError::Config(_))));

        let config = SimConfig {
            constellation: "550:53:24/6/6".to_string(),
            ..SimConfig::default()
        };
        assert!(matches!(config.validate(), Err(SimError::Orbital(_))));

        let config = SimConfig {
            split_periods: true,
            ..SimConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
