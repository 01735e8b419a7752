//! Export files on disk
//!
//! Every artifact of a run shares one stem, `{mode}_{YYYY-MM-DD_HH-MM-SS}`, so JSON, CSV and
//! summary from the same collection sort together. Split period documents go into a
//! directory named after the stem.

use crate::{Result, SimulationContext};
use chrono::{DateTime, Utc};
use metrics_export::{split_by_orbital_period, ExportDocument, ExportMode};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub fn file_stem(mode: ExportMode, at: DateTime<Utc>) -> String {
    format!("{}_{}", mode.as_str(), at.format("%Y-%m-%d_%H-%M-%S"))
}

/// Paths written by one export.
#[derive(Debug, Default, Clone)]
pub struct WrittenFiles {
    pub json: Option<PathBuf>,
    pub csv: Option<PathBuf>,
    pub summary: Option<PathBuf>,
    pub periods: Vec<PathBuf>,
}

impl WrittenFiles {
    pub fn all(&self) -> impl Iterator<Item = &PathBuf> {
        self.json
            .iter()
            .chain(self.csv.iter())
            .chain(self.summary.iter())
            .chain(self.periods.iter())
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    fs::write(path, text)?;
    Ok(())
}

/// Write one `orbital_period_NN.json` per period into `dir`.
pub fn write_periods(dir: &Path, document: &ExportDocument) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let slices = split_by_orbital_period(document)?;

    let mut paths = Vec::with_capacity(slices.len());
    for (index, slice) in slices.iter().enumerate() {
        let path = dir.join(format!("orbital_period_{:02}.json", index + 1));
        write_json(&path, slice)?;
        paths.push(path);
    }
    info!("Wrote {} orbital period files to {:?}", paths.len(), dir);
    Ok(paths)
}

/// Write every artifact the configuration asks for.
pub fn write_all(ctx: &SimulationContext, at: DateTime<Utc>) -> Result<WrittenFiles> {
    let config = ctx.config();
    let dir = &config.output_dir;
    fs::create_dir_all(dir)?;

    let stem = file_stem(config.mode, at);
    let document = ctx.document_at(at);

    let mut written = WrittenFiles::default();

    let json = dir.join(format!("{}.json", stem));
    write_json(&json, &document)?;
    info!("Wrote {:?}", json);
    written.json = Some(json);

    if config.write_csv {
        let path = dir.join(format!("{}.csv", stem));
        write_text(&path, &ctx.csv()?)?;
        info!("Wrote {:?}", path);
        written.csv = Some(path);
    }

    if config.write_summary {
        let path = dir.join(format!("{}_summary.txt", stem));
        write_text(&path, &ctx.summary())?;
        info!("Wrote {:?}", path);
        written.summary = Some(path);
    }

    if config.split_periods {
        written.periods = write_periods(&dir.join(&stem), &document)?;
    }

    Ok(written)
}
