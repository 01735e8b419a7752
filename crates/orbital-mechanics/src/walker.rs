//! Walker Delta constellation descriptor and plane layout.
//!
//! Descriptor notation is `altitude_km:inclination_deg:T/P/F`, e.g. `550:53:1584/72/1`
//! (T total satellites, P planes, F phasing factor).

use crate::{propagation, OrbitalError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkerDelta {
    pub total_satellites: usize,
    pub planes: usize,
    pub phasing: usize,
    pub altitude_km: f64,
    pub inclination_deg: f64,
}

impl WalkerDelta {
    pub fn new(
        altitude_km: f64,
        inclination_deg: f64,
        total_satellites: usize,
        planes: usize,
        phasing: usize,
    ) -> Result<Self> {
        let walker = Self {
            total_satellites,
            planes,
            phasing,
            altitude_km,
            inclination_deg,
        };
        walker.validate()?;
        Ok(walker)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.altitude_km.is_finite() || self.altitude_km < 0.0 {
            return Err(out_of_range("altitude_km", self.altitude_km));
        }
        if !(0.0..=180.0).contains(&self.inclination_deg) {
            return Err(out_of_range("inclination_deg", self.inclination_deg));
        }
        if self.total_satellites == 0 {
            return Err(out_of_range("numSats", self.total_satellites));
        }
        if self.planes == 0 || self.planes > self.total_satellites {
            return Err(out_of_range("numPlanes", self.planes));
        }
        if self.phasing >= self.planes {
            return Err(out_of_range("phase", self.phasing));
        }
        Ok(())
    }

    /// Base satellites per plane; the first `remainder()` planes carry one more.
    pub fn satellites_per_plane(&self) -> usize {
        self.total_satellites / self.planes
    }

    pub fn remainder(&self) -> usize {
        self.total_satellites % self.planes
    }

    pub fn plane_spacing_deg(&self) -> f64 {
        360.0 / self.planes as f64
    }

    /// Along-track offset between adjacent planes: `F · 360 / T`
    pub fn phase_offset_deg(&self) -> f64 {
        self.phasing as f64 * 360.0 / self.total_satellites as f64
    }

    pub fn layout(&self) -> PlaneLayout {
        PlaneLayout::new(self.total_satellites, self.planes)
    }

    pub fn orbital_period_s(&self) -> f64 {
        propagation::orbital_period(self.altitude_km)
    }
}

impl FromStr for WalkerDelta {
    type Err = OrbitalError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut parts = s.splitn(3, ':');
        let (alt, inc, pattern) = match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(i), Some(p)) => (a, i, p),
            _ => {
                return Err(OrbitalError::InvalidDescriptor(format!(
                    "expected altitude:inclination:T/P/F, got '{}'",
                    s
                )))
            }
        };

        let pattern: Vec<&str> = pattern.split('/').collect();
        if pattern.len() != 3 {
            return Err(OrbitalError::InvalidDescriptor(format!(
                "expected T/P/F pattern, got '{}'",
                pattern.join("/")
            )));
        }

        WalkerDelta::new(
            parse_field("altitude_km", alt)?,
            parse_field("inclination_deg", inc)?,
            parse_field("numSats", pattern[0])?,
            parse_field("numPlanes", pattern[1])?,
            parse_field("phase", pattern[2])?,
        )
    }
}

impl fmt::Display for WalkerDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}/{}/{}",
            self.altitude_km, self.inclination_deg, self.total_satellites, self.planes, self.phasing
        )
    }
}

fn parse_field<T: FromStr>(field: &'static str, raw: &str) -> Result<T> {
    raw.trim().parse::<T>().map_err(|_| OrbitalError::InvalidDescriptor(format!(
        "{} is not a valid number: '{}'",
        field,
        raw.trim()
    )))
}

fn out_of_range(field: &'static str, value: impl fmt::Display) -> OrbitalError {
    OrbitalError::OutOfRange {
        field,
        value: value.to_string(),
    }
}

/// Mapping between global satellite indices and (plane, slot).
///
/// Indices are contiguous per plane, not round-robin: plane 0 holds `0..size(0)`, plane 1
/// follows, etc. Satellite ids in exported `satA`/`satB` fields use this numbering, so
/// `index_of(p, s) == offset(p) + s` and consecutive ids share a plane.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaneLayout {
    sizes: Vec<usize>,
    offsets: Vec<usize>,
}

impl PlaneLayout {
    pub fn new(total: usize, planes: usize) -> Self {
        if planes == 0 {
            return Self {
                sizes: Vec::new(),
                offsets: Vec::new(),
            };
        }
        let base = total / planes;
        let extra = total % planes;

        let sizes: Vec<usize> = (0..planes)
            .map(|p| if p < extra { base + 1 } else { base })
            .collect();
        let offsets = sizes
            .iter()
            .scan(0usize, |acc, &n| {
                let start = *acc;
                *acc += n;
                Some(start)
            })
            .collect();

        Self { sizes, offsets }
    }

    pub fn planes(&self) -> usize {
        self.sizes.len()
    }

    pub fn total(&self) -> usize {
        self.sizes.iter().sum()
    }

    pub fn plane_size(&self, plane: usize) -> usize {
        self.sizes.get(plane).copied().unwrap_or(0)
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn index_of(&self, plane: usize, slot: usize) -> Option<usize> {
        if slot < self.plane_size(plane) {
            Some(self.offsets[plane] + slot)
        } else {
            None
        }
    }

    /// (plane, slot) of a global index
    pub fn locate(&self, index: usize) -> Option<(usize, usize)> {
        // offsets are sorted; last plane whose offset <= index
        let plane = self.offsets.partition_point(|&o| o <= index).checked_sub(1)?;
        let slot = index - self.offsets[plane];
        (slot < self.sizes[plane]).then_some((plane, slot))
    }

    pub fn plane_of(&self, index: usize) -> Option<usize> {
        self.locate(index).map(|(plane, _)| plane)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_descriptor() {
        let w: WalkerDelta = "550:53:1584/72/1".parse().unwrap();
        assert_eq!(w.total_satellites, 1584);
        assert_eq!(w.planes, 72);
        assert_eq!(w.phasing, 1);
        assert_eq!(w.altitude_km, 550.0);
        assert_eq!(w.inclination_deg, 53.0);
        assert_eq!(w.satellites_per_plane(), 22);
        assert_eq!(w.to_string(), "550:53:1584/72/1");
    }

    #[test]
    fn test_parse_rejects_bad_fields() {
        assert!(matches!(
            "550:53".parse::<WalkerDelta>(),
            Err(OrbitalError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            "550:53:24/6".parse::<WalkerDelta>(),
            Err(OrbitalError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            "abc:53:24/6/1".parse::<WalkerDelta>(),
            Err(OrbitalError::InvalidDescriptor(_))
        ));
        assert!(matches!(
            "550:190:24/6/1".parse::<WalkerDelta>(),
            Err(OrbitalError::OutOfRange { field: "inclination_deg", .. })
        ));
        assert!(matches!(
            "-1:53:24/6/1".parse::<WalkerDelta>(),
            Err(OrbitalError::OutOfRange { field: "altitude_km", .. })
        ));
        assert!(matches!(
            "550:53:24/6/6".parse::<WalkerDelta>(),
            Err(OrbitalError::OutOfRange { field: "phase", .. })
        ));
        assert!(matches!(
            "550:53:4/6/1".parse::<WalkerDelta>(),
            Err(OrbitalError::OutOfRange { field: "numPlanes", .. })
        ));
    }

    #[test]
    fn test_scenario_24_6_1() {
        let w: WalkerDelta = "550:53:24/6/1".parse().unwrap();
        assert_eq!(w.satellites_per_plane(), 4);
        assert_eq!(w.remainder(), 0);
        assert_eq!(w.layout().sizes(), &[4, 4, 4, 4, 4, 4]);
        let period_min = w.orbital_period_s() / 60.0;
        assert!((period_min - 95.50).abs() < 0.05, "period {} min", period_min);
    }

    #[test]
    fn test_uneven_layout() {
        let layout = PlaneLayout::new(26, 6);
        assert_eq!(layout.sizes(), &[5, 5, 4, 4, 4, 4]);
        assert_eq!(layout.index_of(1, 0), Some(5));
        assert_eq!(layout.index_of(2, 4), None);
        assert_eq!(layout.locate(10), Some((2, 0)));
        assert_eq!(layout.locate(25), Some((5, 3)));
        assert_eq!(layout.locate(26), None);
    }

    #[test]
    fn test_indices_contiguous_not_round_robin() {
        let layout = PlaneLayout::new(24, 6);
        let planes: Vec<usize> = (0..8).map(|i| layout.plane_of(i).unwrap()).collect();
        assert_eq!(planes, vec![0, 0, 0, 0, 1, 1, 1, 1]);
        assert_eq!(layout.plane_of(23), Some(5));
    }

    proptest! {
        #[test]
        fn fuzz_layout_partitions_all_satellites(total in 1usize..2000, planes in 1usize..100) {
            prop_assume!(planes <= total);
            let layout = PlaneLayout::new(total, planes);
            prop_assert_eq!(layout.total(), total);
            prop_assert_eq!(layout.planes(), planes);
            for index in 0..total {
                let (plane, slot) = layout.locate(index).unwrap();
                prop_assert_eq!(layout.index_of(plane, slot), Some(index));
            }
        }
    }
}
