use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::NaiveDate;

use crate::report::ReportSheet;

/// Destination for finished report sheets.
pub trait ReportSink {
    fn write_sheet(&mut self, sheet: &ReportSheet) -> anyhow::Result<()>;
}

/// Writes each sheet as `<title-slug>-<date>.csv` in a directory.
pub struct CsvDirSink {
    dir: PathBuf,
    date: NaiveDate,
    written: Vec<PathBuf>,
}

impl CsvDirSink {
    pub fn new(dir: impl Into<PathBuf>, date: NaiveDate) -> Self {
        Self {
            dir: dir.into(),
            date,
            written: Vec::new(),
        }
    }

    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    fn path_for(&self, title: &str) -> PathBuf {
        self.dir
            .join(format!("{}-{}.csv", slug(title), self.date.format("%Y-%m-%d")))
    }
}

impl ReportSink for CsvDirSink {
    fn write_sheet(&mut self, sheet: &ReportSheet) -> anyhow::Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("failed to create {}", self.dir.display()))?;

        let path = self.path_for(&sheet.title);
        write_csv(&path, sheet)?;
        tracing::info!(path = %path.display(), rows = sheet.rows.len(), "sheet written");
        self.written.push(path);
        Ok(())
    }
}

fn write_csv(path: &Path, sheet: &ReportSheet) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    writer.write_record(&sheet.columns)?;
    for row in &sheet.rows {
        writer.write_record(row.iter().map(|value| value.render()))?;
    }
    writer.flush()?;
    Ok(())
}

fn slug(title: &str) -> String {
    title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}
