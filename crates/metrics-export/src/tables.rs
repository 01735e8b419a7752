//! CSV tables rendered to in-memory text.
//!
//! Headers are written explicitly so an empty table still carries them.

use crate::{ExportError, Result};
use contact_tracker::ContactEpisode;
use isl_topology::IslPairStats;
use serde::Serialize;

pub const CONTACT_HEADERS: [&str; 8] = [
    "sat_A",
    "sat_B",
    "timestamp",
    "orbital_period",
    "contact_start",
    "contact_duration",
    "distance_avg",
    "latency_avg",
];

pub const ISL_HEADERS: [&str; 12] = [
    "sat_A",
    "sat_B",
    "type",
    "plane_A",
    "plane_B",
    "samples",
    "avg_distance_km",
    "avg_latency_ms",
    "min_latency_ms",
    "max_latency_ms",
    "variance_latency_ms",
    "std_dev_latency_ms",
];

#[derive(Serialize)]
struct ContactRow {
    sat_a: usize,
    sat_b: usize,
    timestamp: f64,
    orbital_period: u32,
    contact_start: f64,
    contact_duration: f64,
    distance_avg: f64,
    latency_avg: f64,
}

#[derive(Serialize)]
struct IslRow<'a> {
    sat_a: usize,
    sat_b: usize,
    link_type: &'a str,
    plane_a: usize,
    plane_b: usize,
    samples: usize,
    avg_distance_km: f64,
    avg_latency_ms: f64,
    min_latency_ms: f64,
    max_latency_ms: f64,
    variance_latency_ms: f64,
    std_dev_latency_ms: f64,
}

fn render<R: Serialize>(headers: &[&str], rows: impl IntoIterator<Item = R>) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(headers)?;
    for row in rows {
        writer.serialize(row)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExportError::CsvBuffer(e.to_string()))?;
    String::from_utf8(bytes).map_err(|e| ExportError::CsvBuffer(e.to_string()))
}

/// One row per contact; `timestamp` is the contact start.
pub fn contact_csv(episodes: &[&ContactEpisode]) -> Result<String> {
    render(
        &CONTACT_HEADERS,
        episodes.iter().map(|e| ContactRow {
            sat_a: e.sat_a,
            sat_b: e.sat_b,
            timestamp: e.start_time,
            orbital_period: e.orbital_period,
            contact_start: e.start_time,
            contact_duration: e.duration(),
            distance_avg: e.avg_distance_km,
            latency_avg: e.avg_latency_ms,
        }),
    )
}

pub fn isl_csv(stats: &[IslPairStats]) -> Result<String> {
    render(
        &ISL_HEADERS,
        stats.iter().map(|s| IslRow {
            sat_a: s.sat_a,
            sat_b: s.sat_b,
            link_type: s.link_type.as_str(),
            plane_a: s.plane_a,
            plane_b: s.plane_b,
            samples: s.samples,
            avg_distance_km: s.avg_distance_km,
            avg_latency_ms: s.avg_latency_ms,
            min_latency_ms: s.min_latency_ms,
            max_latency_ms: s.max_latency_ms,
            variance_latency_ms: s.variance_latency_ms,
            std_dev_latency_ms: s.std_dev_latency_ms,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use contact_tracker::ContactTracker;
    use isl_topology::{IslSampler, TopologyBuilder};
    use orbital_mechanics::PairKey;

    #[test]
    fn test_contact_csv() {
        let mut tracker = ContactTracker::new(100.0);
        tracker.observe(PairKey::new(2, 7), true, 1000.0, 120.0);
        tracker.observe(PairKey::new(2, 7), true, 2000.0, 140.0);
        tracker.observe(PairKey::new(2, 7), false, 0.0, 160.0);

        let episodes: Vec<&ContactEpisode> = tracker.history().iter().collect();
        let text = contact_csv(&episodes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "sat_A,sat_B,timestamp,orbital_period,contact_start,contact_duration,distance_avg,latency_avg"
        );
        assert!(lines[1].starts_with("2,7,120.0,2,120.0,40.0,1500.0,"));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_empty_tables_keep_headers() {
        assert_eq!(contact_csv(&[]).unwrap().trim_end(), CONTACT_HEADERS.join(","));
        assert_eq!(isl_csv(&[]).unwrap().trim_end(), ISL_HEADERS.join(","));
    }

    #[test]
    fn test_isl_csv() {
        let sampler = IslSampler::new(TopologyBuilder::generate(6, 2, 0));
        let text = isl_csv(&sampler.compute_stats()).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            lines[0],
            "sat_A,sat_B,type,plane_A,plane_B,samples,avg_distance_km,avg_latency_ms,min_latency_ms,max_latency_ms,variance_latency_ms,std_dev_latency_ms"
        );
        assert_eq!(lines[1], "0,1,intra-plane,0,0,0,0.0,0.0,0.0,0.0,0.0,0.0");
        assert!(lines.iter().any(|l| l.contains(",inter-plane,0,1,")));
    }
}
