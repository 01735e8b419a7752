//! JSON document schema consumed by the network emulator.
//!
//! Field names follow the emulator's camelCase / unit-suffixed convention.

use chrono::{DateTime, Utc};
use isl_topology::LinkType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub metadata: Metadata,
    pub topology: Topology,
    #[serde(rename = "contactPlan", skip_serializing_if = "Option::is_none", default)]
    pub contact_plan: Option<Vec<ContactPlanEntry>>,
    #[serde(rename = "islLinks", skip_serializing_if = "Option::is_none", default)]
    pub isl_links: Option<Vec<IslLinkRecord>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub statistics: Option<Statistics>,
    #[serde(rename = "gsLinks", skip_serializing_if = "Option::is_none", default)]
    pub gs_links: Option<GsLinks>,
    #[serde(rename = "gsStatistics", skip_serializing_if = "Option::is_none", default)]
    pub gs_statistics: Option<GsStatistics>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "exportedAt")]
    pub exported_at: DateTime<Utc>,
    pub format: String,
    pub version: String,
    pub mode: String,
    #[serde(rename = "hasGroundStations")]
    pub has_ground_stations: bool,
    pub constellation: ConstellationMeta,
    pub simulation: SimulationMeta,
    /// 0-based, set on per-period slices
    #[serde(rename = "orbitalPeriodIndex", skip_serializing_if = "Option::is_none", default)]
    pub orbital_period_index: Option<usize>,
    #[serde(rename = "orbitalPeriodRange", skip_serializing_if = "Option::is_none", default)]
    pub orbital_period_range: Option<PeriodRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstellationMeta {
    #[serde(rename = "totalSatellites")]
    pub total_satellites: usize,
    pub planes: usize,
    pub phase: usize,
    pub altitude_km: f64,
    pub inclination_deg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationMeta {
    #[serde(rename = "orbitalPeriod_min")]
    pub orbital_period_min: f64,
    #[serde(rename = "samplingInterval_s")]
    pub sampling_interval_s: f64,
    #[serde(rename = "numPeriods")]
    pub num_periods: u32,
    pub duration_s: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodRange {
    pub start_s: f64,
    pub end_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub nodes: Vec<TopologyNode>,
    #[serde(rename = "groundStations", skip_serializing_if = "Vec::is_empty", default)]
    pub ground_stations: Vec<GroundStationNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologyNode {
    pub id: usize,
    pub plane: usize,
    pub position: NodePosition,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NodePosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroundStationNode {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactPlanEntry {
    #[serde(rename = "satA")]
    pub sat_a: usize,
    #[serde(rename = "satB")]
    pub sat_b: usize,
    #[serde(rename = "startTime")]
    pub start_time: f64,
    #[serde(rename = "endTime")]
    pub end_time: f64,
    pub duration: f64,
    #[serde(rename = "avgDistance_km")]
    pub avg_distance_km: f64,
    #[serde(rename = "avgLatency_ms")]
    pub avg_latency_ms: f64,
    pub bandwidth_mbps: f64,
    #[serde(rename = "type")]
    pub link_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IslLinkRecord {
    #[serde(rename = "satA")]
    pub sat_a: usize,
    #[serde(rename = "satB")]
    pub sat_b: usize,
    #[serde(rename = "type")]
    pub link_type: LinkType,
    #[serde(rename = "planeA")]
    pub plane_a: usize,
    #[serde(rename = "planeB")]
    pub plane_b: usize,
    pub bandwidth_mbps: f64,
    #[serde(flatten)]
    pub stats: Option<IslLinkStats>,
    #[serde(rename = "timeSeries", skip_serializing_if = "Option::is_none", default)]
    pub time_series: Option<Vec<TimeSeriesPoint>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IslLinkStats {
    pub samples: usize,
    #[serde(rename = "avgDistance_km")]
    pub avg_distance_km: f64,
    #[serde(rename = "minDistance_km")]
    pub min_distance_km: f64,
    #[serde(rename = "maxDistance_km")]
    pub max_distance_km: f64,
    #[serde(rename = "avgLatency_ms")]
    pub avg_latency_ms: f64,
    #[serde(rename = "minLatency_ms")]
    pub min_latency_ms: f64,
    #[serde(rename = "maxLatency_ms")]
    pub max_latency_ms: f64,
    #[serde(rename = "varianceLatency_ms")]
    pub variance_latency_ms: f64,
    #[serde(rename = "stdDevLatency_ms")]
    pub std_dev_latency_ms: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub timestamp: f64,
    pub distance_km: f64,
    pub latency_ms: f64,
}

/// Aggregate block; its shape follows the export mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Statistics {
    Isl(IslStatistics),
    Contacts(ContactStatistics),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContactStatistics {
    #[serde(rename = "totalContacts")]
    pub total_contacts: usize,
    #[serde(rename = "completedContacts")]
    pub completed_contacts: usize,
    #[serde(rename = "activeContacts")]
    pub active_contacts: usize,
    #[serde(rename = "avgDuration_s")]
    pub avg_duration_s: f64,
    #[serde(rename = "avgDistance_km")]
    pub avg_distance_km: f64,
    #[serde(rename = "avgLatency_ms")]
    pub avg_latency_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IslStatistics {
    #[serde(rename = "totalISLLinks")]
    pub total_isl_links: usize,
    #[serde(rename = "intraPlaneLinks")]
    pub intra_plane_links: usize,
    #[serde(rename = "interPlaneLinks")]
    pub inter_plane_links: usize,
    #[serde(rename = "totalSamples")]
    pub total_samples: usize,
    #[serde(rename = "avgLatencyIntraPlane_ms")]
    pub avg_latency_intra_plane_ms: f64,
    #[serde(rename = "avgLatencyInterPlane_ms")]
    pub avg_latency_inter_plane_ms: f64,
    #[serde(rename = "avgLatencyOverall_ms")]
    pub avg_latency_overall_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GsLinks {
    pub events: Vec<GsEventRecord>,
    pub timeline: Vec<GsTimelineRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GsEventRecord {
    pub t: f64,
    #[serde(rename = "gsId")]
    pub gs_id: String,
    pub action: String,
    #[serde(rename = "satId", skip_serializing_if = "Option::is_none", default)]
    pub sat_id: Option<usize>,
    #[serde(rename = "fromSatId", skip_serializing_if = "Option::is_none", default)]
    pub from_sat_id: Option<usize>,
    #[serde(rename = "toSatId", skip_serializing_if = "Option::is_none", default)]
    pub to_sat_id: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub latency_ms: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GsTimelineRecord {
    #[serde(rename = "gsId")]
    pub gs_id: String,
    #[serde(rename = "satId")]
    pub sat_id: usize,
    #[serde(rename = "startTime")]
    pub start_time: f64,
    #[serde(rename = "endTime")]
    pub end_time: Option<f64>,
    pub samples: Vec<GsSample>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GsSample {
    pub t: f64,
    pub latency_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GsStatistics {
    #[serde(rename = "totalGroundStations")]
    pub total_ground_stations: usize,
    #[serde(rename = "totalEvents")]
    pub total_events: usize,
    #[serde(rename = "connectEvents")]
    pub connect_events: usize,
    #[serde(rename = "handoverEvents")]
    pub handover_events: usize,
    #[serde(rename = "disconnectEvents")]
    pub disconnect_events: usize,
    #[serde(rename = "totalSamples")]
    pub total_samples: usize,
    #[serde(rename = "avgLatency_ms")]
    pub avg_latency_ms: f64,
}
