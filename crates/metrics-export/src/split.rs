//! Slice a time-series document into one self-contained document per orbital period.
//!
//! Each slice keeps the topology, shifts every timestamp so the period starts at 0, trims
//! ground-link timeline entries to the window, and opens with a synthetic `connect` event for
//! every station already connected when the period begins.

use crate::{
    ExportDocument, ExportError, GsEventRecord, GsLinks, GsSample, GsTimelineRecord, IslLinkRecord,
    PeriodRange, Result, TimeSeriesPoint,
};
use std::collections::BTreeMap;
use tracing::info;

/// Latency reported for a synthetic connect when the original event carried none
const FALLBACK_LATENCY_MS: f64 = 5.0;

fn round6(x: f64) -> f64 {
    (x * 1e6).round() / 1e6
}

fn in_window(t: f64, start: f64, end: f64) -> bool {
    start <= t && t < end
}

/// Latest timestamp across ISL samples, ground events and timeline samples.
fn last_timestamp(doc: &ExportDocument) -> f64 {
    let isl = doc
        .isl_links
        .iter()
        .flatten()
        .flat_map(|link| link.time_series.iter().flatten())
        .map(|s| s.timestamp);
    let (events, samples): (Vec<f64>, Vec<f64>) = match &doc.gs_links {
        Some(gs) => (
            gs.events.iter().map(|e| e.t).collect(),
            gs.timeline
                .iter()
                .flat_map(|entry| entry.samples.iter().map(|s| s.t))
                .collect(),
        ),
        None => (Vec::new(), Vec::new()),
    };

    isl.chain(events).chain(samples).fold(0.0, f64::max)
}

pub fn split_by_orbital_period(doc: &ExportDocument) -> Result<Vec<ExportDocument>> {
    let period_s = doc.metadata.simulation.orbital_period_min * 60.0;
    if !period_s.is_finite() || period_s <= 0.0 {
        return Err(ExportError::InvalidPeriod(period_s));
    }

    let links = doc.isl_links.as_ref().ok_or(ExportError::NotTimeSeries)?;
    if links.iter().any(|link| link.time_series.is_none()) {
        return Err(ExportError::NotTimeSeries);
    }

    let last = last_timestamp(doc);
    let count = (last / period_s).floor() as usize + 1;
    info!(
        "Splitting {:.0} s of data into {} orbital periods of {:.1} s",
        last, count, period_s
    );

    Ok((0..count)
        .map(|index| {
            let start = index as f64 * period_s;
            slice(doc, links, index, start, start + period_s)
        })
        .collect())
}

fn slice(doc: &ExportDocument, links: &[IslLinkRecord], index: usize, start: f64, end: f64) -> ExportDocument {
    let mut metadata = doc.metadata.clone();
    metadata.simulation.num_periods = 1;
    metadata.simulation.duration_s = round6(end - start);
    metadata.orbital_period_index = Some(index);
    metadata.orbital_period_range = Some(PeriodRange {
        start_s: round6(start),
        end_s: round6(end),
    });

    ExportDocument {
        metadata,
        topology: doc.topology.clone(),
        contact_plan: None,
        isl_links: Some(slice_links(links, start, end)),
        statistics: None,
        gs_links: doc.gs_links.as_ref().map(|gs| GsLinks {
            events: slice_events(&gs.events, start, end),
            timeline: slice_timeline(&gs.timeline, start, end),
        }),
        gs_statistics: None,
    }
}

/// Links with at least one sample in the window.
fn slice_links(links: &[IslLinkRecord], start: f64, end: f64) -> Vec<IslLinkRecord> {
    links
        .iter()
        .filter_map(|link| {
            let series: Vec<TimeSeriesPoint> = link
                .time_series
                .iter()
                .flatten()
                .filter(|s| in_window(s.timestamp, start, end))
                .map(|s| TimeSeriesPoint {
                    timestamp: round6(s.timestamp - start),
                    ..*s
                })
                .collect();
            if series.is_empty() {
                return None;
            }
            Some(IslLinkRecord {
                stats: None,
                time_series: Some(series),
                ..link.clone()
            })
        })
        .collect()
}

/// Replay events before `t` to find each station's satellite and last latency.
fn connected_at(events: &[GsEventRecord], t: f64) -> BTreeMap<String, (usize, f64)> {
    let mut ordered: Vec<&GsEventRecord> = events.iter().filter(|e| e.t < t).collect();
    ordered.sort_by(|a, b| a.t.total_cmp(&b.t));

    let mut active = BTreeMap::new();
    for event in ordered {
        let latency = event.latency_ms.unwrap_or(FALLBACK_LATENCY_MS);
        match (event.action.as_str(), event.sat_id, event.to_sat_id) {
            ("connect", Some(sat), _) | ("handover", _, Some(sat)) => {
                active.insert(event.gs_id.clone(), (sat, latency));
            }
            ("disconnect", _, _) => {
                active.remove(&event.gs_id);
            }
            _ => {}
        }
    }
    active
}

fn slice_events(events: &[GsEventRecord], start: f64, end: f64) -> Vec<GsEventRecord> {
    let initial = connected_at(events, start)
        .into_iter()
        .map(|(gs_id, (sat, latency))| GsEventRecord {
            t: 0.0,
            gs_id,
            action: "connect".to_string(),
            sat_id: Some(sat),
            from_sat_id: None,
            to_sat_id: None,
            latency_ms: Some(latency),
        });

    let window = events
        .iter()
        .filter(|e| in_window(e.t, start, end))
        .map(|e| GsEventRecord {
            t: round6(e.t - start),
            ..e.clone()
        });

    initial.chain(window).collect()
}

fn slice_timeline(timeline: &[GsTimelineRecord], start: f64, end: f64) -> Vec<GsTimelineRecord> {
    timeline
        .iter()
        .filter_map(|entry| {
            let entry_end = entry.end_time.unwrap_or(f64::INFINITY);
            if entry_end <= start || entry.start_time >= end {
                return None;
            }

            let samples: Vec<GsSample> = entry
                .samples
                .iter()
                .filter(|s| in_window(s.t, start, end))
                .map(|s| GsSample {
                    t: round6(s.t - start),
                    latency_ms: s.latency_ms,
                })
                .collect();
            if samples.is_empty() {
                return None;
            }

            Some(GsTimelineRecord {
                gs_id: entry.gs_id.clone(),
                sat_id: entry.sat_id,
                start_time: round6(entry.start_time.max(start) - start),
                end_time: Some(round6(entry_end.min(end) - start)),
                samples,
            })
        })
        .collect()
}
