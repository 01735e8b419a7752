//! Plain-text station descriptor loader.
//!
//! One station per line: `name lat lon`. The name may contain spaces, so the last two
//! whitespace-separated tokens are taken as the coordinates. Blank lines and lines starting
//! with `#` are ignored.

use crate::{Result, StationError};
use tracing::{info, warn};

/// Validate latitude is in valid range
fn is_valid_latitude(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && lat.is_finite()
}

/// Validate longitude is in valid range
fn is_valid_longitude(lon: f64) -> bool {
    (-180.0..=180.0).contains(&lon) && lon.is_finite()
}

#[derive(Debug, Clone, PartialEq)]
pub struct StationEntry {
    pub line: usize,
    pub name: String,
    pub lat_deg: f64,
    pub lon_deg: f64,
}

/// A rejected line (1-based line number).
#[derive(Debug, Clone, PartialEq)]
pub struct ImportIssue {
    pub line: usize,
    pub error: StationError,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    pub imported: usize,
    pub issues: Vec<ImportIssue>,
    entries: Vec<StationEntry>,
}

impl ImportReport {
    pub fn entries(&self) -> &[StationEntry] {
        &self.entries
    }

    pub(crate) fn take_entries(&mut self) -> Vec<StationEntry> {
        std::mem::take(&mut self.entries)
    }

    pub(crate) fn push_issue(&mut self, line: usize, error: StationError) {
        warn!("Station descriptor line {}: {}", line, error);
        self.issues.push(ImportIssue { line, error });
    }

    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

fn parse_coordinate(token: &str, field: &'static str) -> Result<f64> {
    token.parse::<f64>().map_err(|_| StationError::InvalidNumber {
        field,
        value: token.to_string(),
    })
}

/// Parse one non-empty descriptor line into `(name, lat, lon)`.
pub fn parse_line(line: &str) -> Result<(String, f64, f64)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return Err(StationError::MissingFields(line.trim().to_string()));
    }

    let n = tokens.len();
    let lat = parse_coordinate(tokens[n - 2], "latitude")?;
    let lon = parse_coordinate(tokens[n - 1], "longitude")?;
    if !is_valid_latitude(lat) {
        return Err(StationError::LatitudeOutOfRange(lat));
    }
    if !is_valid_longitude(lon) {
        return Err(StationError::LongitudeOutOfRange(lon));
    }

    Ok((tokens[..n - 2].join(" "), lat, lon))
}

/// Parse a whole descriptor, collecting valid entries and per-line issues.
pub fn parse_descriptor(text: &str) -> ImportReport {
    let mut report = ImportReport::default();

    for (i, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        match parse_line(line) {
            Ok((name, lat_deg, lon_deg)) => report.entries.push(StationEntry {
                line: i + 1,
                name,
                lat_deg,
                lon_deg,
            }),
            Err(error) => report.push_issue(i + 1, error),
        }
    }

    info!(
        "Parsed {} station lines ({} rejected)",
        report.entries.len(),
        report.issues.len()
    );
    report
}
