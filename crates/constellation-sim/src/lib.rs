//! Constellation Simulation
//!
//! Owns every collection of a metrics run and drives them from a fixed-step scheduler:
//! propagate to each due sample instant, then feed the contact tracker, ISL sampler and
//! ground link tracker. Also writes the shaped exports to disk (the only file I/O in the
//! workspace).

use chrono::{DateTime, Utc};
use contact_tracker::ContactTracker;
use ground_stations::{GroundLinkTracker, ImportReport, StationError, StationRegistry};
use isl_topology::{IslSampler, TopologyBuilder};
use metrics_export::{ExportDocument, ExportError, ExportMode, ExportSettings, MetricsExporter};
use orbital_mechanics::{Constellation, OrbitalError, VisibilityOracle, WalkerDelta};
use thiserror::Error;
use tracing::{debug, info, warn};

pub mod config;
pub mod output;
pub mod scheduler;

pub use config::SimConfig;
pub use scheduler::FixedStepScheduler;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Orbital error: {0}")]
    Orbital(#[from] OrbitalError),
    #[error("Station error: {0}")]
    Station(#[from] StationError),
    #[error("Export error: {0}")]
    Export(#[from] ExportError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("No collection has been started")]
    NotCollecting,
}

pub type Result<T> = std::result::Result<T, SimError>;

/// Which trackers a collection feeds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Collectors {
    pub contacts: bool,
    pub isl: bool,
    pub ground: bool,
}

impl Collectors {
    pub fn for_mode(mode: ExportMode, has_stations: bool) -> Self {
        Self {
            contacts: mode == ExportMode::Contacts,
            isl: mode.is_isl(),
            ground: has_stations,
        }
    }
}

pub struct SimulationContext {
    config: SimConfig,
    constellation: Constellation,
    stations: StationRegistry,
    oracle: VisibilityOracle,
    contacts: ContactTracker,
    sampler: IslSampler,
    ground: GroundLinkTracker,
    scheduler: Option<FixedStepScheduler>,
    /// Simulation time the constellation is propagated to (s)
    sim_time: f64,
    last_sample: Option<f64>,
}

impl SimulationContext {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let walker = config.walker()?;
        let constellation = Constellation::walker(walker.clone());
        let period = constellation.orbital_period();

        info!(
            "Constellation {}: {} satellites, period {:.2} min",
            walker,
            constellation.len(),
            period / 60.0
        );

        Ok(Self {
            oracle: VisibilityOracle::new(config.oracle),
            contacts: ContactTracker::new(period),
            sampler: IslSampler::new(TopologyBuilder::from_walker(&walker)),
            ground: GroundLinkTracker::new(config.handover),
            stations: StationRegistry::new(),
            scheduler: None,
            sim_time: 0.0,
            last_sample: None,
            constellation,
            config,
        })
    }

    /// Swap in a new constellation; every collection and the visibility cache are dropped.
    pub fn reconfigure(&mut self, walker: WalkerDelta) -> Result<()> {
        walker.validate()?;
        info!("Reconfiguring constellation to {}", walker);

        self.config.constellation = walker.to_string();
        self.constellation = Constellation::walker(walker.clone());
        self.sampler.set_pairs(TopologyBuilder::from_walker(&walker));
        self.reset_collections();
        Ok(())
    }

    fn reset_collections(&mut self) {
        self.oracle.clear_cache();
        self.contacts.reset(self.constellation.orbital_period());
        self.sampler.clear();
        self.ground.reset();
        self.scheduler = None;
        self.last_sample = None;
    }

    /// Import station descriptor text; invalid lines are reported, not fatal.
    pub fn import_stations(&mut self, text: &str) -> ImportReport {
        let report = self.stations.import(text);
        if !report.is_clean() {
            warn!("{} station lines rejected", report.issues.len());
        }
        info!("{} ground stations loaded", self.stations.len());
        report
    }

    /// Reset to the epoch and arm the scheduler for `orbital period × num_periods`.
    pub fn start_collection(&mut self) {
        let walker = self.constellation.config.clone();
        self.constellation = Constellation::walker(walker);
        self.sim_time = 0.0;
        self.reset_collections();

        let duration = self.duration_s();
        let scheduler = FixedStepScheduler::for_duration(duration, self.config.sampling_interval_s);
        info!(
            "Collecting {} ({} samples every {} s over {:.1} s)",
            self.config.mode,
            scheduler.target(),
            self.config.sampling_interval_s,
            duration
        );
        self.scheduler = Some(scheduler);
    }

    /// Halt sampling and close everything still open.
    pub fn stop_collection(&mut self) {
        if let Some(scheduler) = self.scheduler.as_mut() {
            scheduler.stop();
        }
        self.finish();
    }

    pub fn is_collecting(&self) -> bool {
        self.scheduler.as_ref().map_or(false, |s| !s.is_done())
    }

    pub fn duration_s(&self) -> f64 {
        self.constellation.orbital_period() * self.config.num_periods as f64
    }

    /// Advance by `wall_dt` seconds of wall time, taking every sample that comes due.
    pub fn tick(&mut self, wall_dt: f64) -> Result<usize> {
        let target_time = self.sim_time + wall_dt * self.config.speed_factor;
        let due = self
            .scheduler
            .as_mut()
            .ok_or(SimError::NotCollecting)?
            .due(target_time);

        for &t in &due {
            self.propagate_to(t);
            self.collect_at(t);
        }
        self.propagate_to(target_time);

        if self.scheduler.as_ref().map_or(false, |s| s.is_complete()) {
            self.finish();
        }
        Ok(due.len())
    }

    fn propagate_to(&mut self, t: f64) {
        let dt = t - self.sim_time;
        if dt > 0.0 {
            self.constellation.advance(dt, 1.0);
            self.sim_time = t;
        }
    }

    fn collectors(&self) -> Collectors {
        Collectors::for_mode(self.config.mode, !self.stations.is_empty())
    }

    fn collect_at(&mut self, t: f64) {
        let collectors = self.collectors();
        let sats = self.constellation.satellites();

        if collectors.contacts {
            self.contacts.update(sats, &mut self.oracle, t);
        }
        if collectors.isl {
            self.sampler.sample(sats, t);
        }
        if collectors.ground {
            self.ground.update(self.stations.stations(), sats, &self.oracle, t);
        }
        self.last_sample = Some(t);
        debug!("Sample at t={:.1}s", t);
    }

    fn finish(&mut self) {
        let end = self.last_sample.unwrap_or(self.sim_time);
        self.contacts.close_all(end);
        self.ground.close_all(end);
        if let Some(scheduler) = &self.scheduler {
            info!(
                "Collection finished: {}/{} samples",
                scheduler.taken(),
                scheduler.target()
            );
        }
    }

    /// Run a whole collection with synthetic ticks of `config.tick_s`.
    pub fn run_headless(&mut self) -> Result<usize> {
        self.start_collection();
        let mut samples = 0;
        while self.is_collecting() {
            samples += self.tick(self.config.tick_s)?;
        }
        Ok(samples)
    }

    pub fn exporter(&self) -> MetricsExporter<'_> {
        MetricsExporter::new(
            &self.constellation,
            self.stations.stations(),
            ExportSettings {
                sampling_interval_s: self.config.sampling_interval_s,
                num_periods: self.config.num_periods,
                bandwidth_mbps: self.config.bandwidth_mbps,
            },
        )
    }

    /// JSON document for the configured mode.
    pub fn document(&self) -> ExportDocument {
        self.document_at(Utc::now())
    }

    pub fn document_at(&self, exported_at: DateTime<Utc>) -> ExportDocument {
        let exporter = self.exporter().exported_at(exported_at);
        let ground = self.collectors().ground.then_some(&self.ground);
        match self.config.mode {
            ExportMode::Contacts => exporter.contact_document(&self.contacts, ground),
            mode => exporter.isl_document(&self.sampler, mode, ground),
        }
    }

    pub fn csv(&self) -> metrics_export::Result<String> {
        let exporter = self.exporter();
        match self.config.mode {
            ExportMode::Contacts => exporter.contact_csv(&self.contacts),
            _ => exporter.isl_csv(&self.sampler),
        }
    }

    pub fn summary(&self) -> String {
        let collectors = self.collectors();
        self.exporter().summary(
            self.config.mode,
            collectors.contacts.then_some(&self.contacts),
            collectors.isl.then_some(&self.sampler),
            collectors.ground.then_some(&self.ground),
        )
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn constellation(&self) -> &Constellation {
        &self.constellation
    }

    pub fn stations(&self) -> &StationRegistry {
        &self.stations
    }

    pub fn contacts(&self) -> &ContactTracker {
        &self.contacts
    }

    pub fn sampler(&self) -> &IslSampler {
        &self.sampler
    }

    pub fn ground(&self) -> &GroundLinkTracker {
        &self.ground
    }

    pub fn oracle(&self) -> &VisibilityOracle {
        &self.oracle
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn scheduler(&self) -> Option<&FixedStepScheduler> {
        self.scheduler.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbital_mechanics::VisibilityCache;

    fn small(mode: ExportMode) -> SimConfig {
        SimConfig {
            constellation: "550:53:24/6/1".to_string(),
            mode,
            speed_factor: 500.0,
            ..SimConfig::default()
        }
    }

    #[test]
    fn test_collectors_follow_mode() {
        assert_eq!(
            Collectors::for_mode(ExportMode::Contacts, false),
            Collectors { contacts: true, isl: false, ground: false }
        );
        assert_eq!(
            Collectors::for_mode(ExportMode::IslTimeseries, true),
            Collectors { contacts: false, isl: true, ground: true }
        );
    }

    #[test]
    fn test_tick_requires_collection() {
        let mut ctx = SimulationContext::new(small(ExportMode::IslAverage)).unwrap();
        assert!(matches!(ctx.tick(1.0), Err(SimError::NotCollecting)));
    }

    #[test]
    fn test_large_tick_catches_up() {
        let mut ctx = SimulationContext::new(small(ExportMode::IslAverage)).unwrap();
        ctx.start_collection();

        // 1 s at 500x covers 26 sample instants (0, 20, ..., 500 s)
        assert_eq!(ctx.tick(1.0).unwrap(), 26);
        assert_eq!(ctx.sampler().total_samples(), 26 * 48);
        assert_eq!(ctx.sim_time(), 500.0);
    }

    #[test]
    fn test_reconfigure_drops_collections() {
        let mut ctx = SimulationContext::new(small(ExportMode::IslAverage)).unwrap();
        ctx.start_collection();
        ctx.tick(1.0).unwrap();
        assert!(ctx.sampler().total_samples() > 0);

        ctx.reconfigure("550:53:30/5/2".parse().unwrap()).unwrap();
        assert_eq!(ctx.sampler().total_samples(), 0);
        assert_eq!(ctx.sampler().pairs().len(), 60);
        assert_eq!(ctx.constellation().len(), 30);
        assert!(ctx.oracle().cache().is_empty());
        assert!(!ctx.is_collecting());
    }

    #[test]
    fn test_stop_collection_closes_contacts() {
        let mut ctx = SimulationContext::new(small(ExportMode::Contacts)).unwrap();
        ctx.start_collection();
        ctx.tick(1.0).unwrap();
        ctx.stop_collection();

        assert!(!ctx.is_collecting());
        assert_eq!(ctx.contacts().active_count(), 0);
        assert!(ctx.tick(1.0).unwrap() == 0);
    }

    #[test]
    fn test_headless_contacts_run() {
        // 12 per plane: in-plane neighbours sit 3582 km apart and never lose sight
        let config = SimConfig {
            constellation: "550:53:60/5/1".to_string(),
            mode: ExportMode::Contacts,
            sampling_interval_s: 60.0,
            ..SimConfig::default()
        };
        let mut ctx = SimulationContext::new(config).unwrap();
        ctx.import_stations("Quito -0.18 -78.47\n");
        let samples = ctx.run_headless().unwrap();

        assert_eq!(samples, ctx.scheduler().unwrap().target());
        assert_eq!(ctx.sampler().total_samples(), 0);
        assert_eq!(ctx.contacts().active_count(), 0);

        let history = ctx.contacts().history();
        assert!(history.len() >= 60);
        assert!(history.iter().all(|c| c.end_time.is_some()));
        assert!(history.iter().any(|c| c.key() == orbital_mechanics::PairKey::new(0, 1)));

        let doc = ctx.document();
        assert_eq!(doc.contact_plan.as_ref().unwrap().len(), history.len());
        assert!(doc.isl_links.is_none());
        assert!(ctx.csv().unwrap().starts_with("sat_A,sat_B,timestamp"));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["statistics"]["completedContacts"], history.len());
        assert_eq!(json["metadata"]["hasGroundStations"], true);
        let ground = doc.gs_links.as_ref().unwrap();
        assert_eq!(ground.events.len(), ctx.ground().events().len());
        assert_eq!(doc.gs_statistics.as_ref().unwrap().total_ground_stations, 1);
    }

    #[test]
    fn test_headless_timeseries_with_ground() {
        let config = SimConfig {
            constellation: "550:53:60/5/1".to_string(),
            mode: ExportMode::IslTimeseries,
            sampling_interval_s: 120.0,
            speed_factor: 1000.0,
            ..SimConfig::default()
        };
        let mut ctx = SimulationContext::new(config).unwrap();
        let report = ctx.import_stations("Quito -0.18 -78.47\nbroken line\n");
        assert_eq!(report.imported, 1);
        assert_eq!(report.issues.len(), 1);

        let samples = ctx.run_headless().unwrap();
        assert_eq!(ctx.sampler().total_samples(), samples * ctx.sampler().pairs().len());
        assert_eq!(ctx.contacts().history().len(), 0);

        let doc = ctx.document();
        let links = doc.isl_links.as_ref().unwrap();
        assert!(links.iter().all(|l| l.time_series.as_ref().map(Vec::len) == Some(samples)));

        let ground = doc.gs_links.as_ref().unwrap();
        assert!(ground.timeline.iter().all(|seg| seg.end_time.is_some()));
        assert!(ctx.ground().state("gs0").map_or(true, |s| s.tracked.is_none()));
        assert!(ctx.summary().contains("GROUND STATION STATISTICS"));
    }
}
