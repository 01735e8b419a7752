//! Human-readable run summary.

use crate::Metadata;
use contact_tracker::ContactStats;
use ground_stations::GroundLinkStats;
use isl_topology::{GraphStats, IslGlobalStats};
use std::fmt;

#[derive(Debug, Clone)]
pub struct SummaryReport {
    pub metadata: Metadata,
    pub contacts: Option<ContactStats>,
    pub isl: Option<IslGlobalStats>,
    pub graph: Option<GraphStats>,
    pub ground: Option<GroundLinkStats>,
}

impl SummaryReport {
    pub fn render(&self) -> String {
        self.to_string()
    }
}

fn banner(f: &mut fmt::Formatter<'_>, title: &str) -> fmt::Result {
    writeln!(f, "{}", "=".repeat(60))?;
    writeln!(f, "{}", title)?;
    writeln!(f, "{}", "=".repeat(60))
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let meta = &self.metadata;
        let c = &meta.constellation;
        let sim = &meta.simulation;

        banner(f, "CONSTELLATION CONFIGURATION")?;
        writeln!(f, "Exported:            {}", meta.exported_at.to_rfc3339())?;
        writeln!(f, "Mode:                {}", meta.mode)?;
        writeln!(
            f,
            "Walker Delta:        {}:{}:{}/{}/{}",
            c.altitude_km, c.inclination_deg, c.total_satellites, c.planes, c.phase
        )?;
        writeln!(f, "Orbital period:      {:.2} min", sim.orbital_period_min)?;
        writeln!(f, "Sampling interval:   {} s", sim.sampling_interval_s)?;
        writeln!(f, "Periods:             {}", sim.num_periods)?;
        writeln!(f, "Duration:            {:.1} s", sim.duration_s)?;
        writeln!(f)?;

        if let Some(contacts) = &self.contacts {
            banner(f, "CONTACTS")?;
            writeln!(f, "Total contacts:      {}", contacts.total)?;
            writeln!(f, "  Completed:         {}", contacts.completed)?;
            writeln!(f, "  Active:            {}", contacts.active)?;
            writeln!(f, "Avg duration:        {:.2} s", contacts.avg_duration_s)?;
            writeln!(f, "Avg distance:        {:.2} km", contacts.avg_distance_km)?;
            writeln!(f, "Avg latency:         {:.6} ms", contacts.avg_latency_ms)?;
            writeln!(f)?;
        }

        if let Some(isl) = &self.isl {
            banner(f, "ISL STATISTICS")?;
            writeln!(f, "Total ISL links:     {}", isl.total_links)?;
            writeln!(f, "  Intra-plane:       {}", isl.intra_plane_links)?;
            writeln!(f, "  Inter-plane:       {}", isl.inter_plane_links)?;
            writeln!(f, "Total samples:       {}", isl.total_samples)?;
            writeln!(f, "Avg latency (intra): {:.6} ms", isl.avg_latency_intra_ms)?;
            writeln!(f, "Avg latency (inter): {:.6} ms", isl.avg_latency_inter_ms)?;
            writeln!(f, "Avg latency (all):   {:.6} ms", isl.avg_latency_overall_ms)?;
            if let Some(graph) = &self.graph {
                writeln!(f, "Connected components: {}", graph.components)?;
                writeln!(f, "Node degree:         {}..{}", graph.min_degree, graph.max_degree)?;
            }
            writeln!(f)?;
        }

        if let Some(ground) = &self.ground {
            banner(f, "GROUND STATION STATISTICS")?;
            writeln!(f, "Ground stations:     {}", ground.total_stations)?;
            writeln!(f, "Events:              {}", ground.total_events)?;
            writeln!(f, "  Connect:           {}", ground.connect_events)?;
            writeln!(f, "  Handover:          {}", ground.handover_events)?;
            writeln!(f, "  Disconnect:        {}", ground.disconnect_events)?;
            writeln!(f, "Latency samples:     {}", ground.total_samples)?;
            writeln!(f, "Avg latency:         {:.6} ms", ground.avg_latency_ms)?;
        }

        Ok(())
    }
}
