use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use crate::analysis::basket::BasketSeries;
use crate::analysis::chart::ChartData;

/// Writes the files a run produces into one output directory, each named
/// after the report date.
pub struct ArtifactWriter {
    output_dir: PathBuf,
}

impl ArtifactWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)
            .with_context(|| format!("Failed to create output dir: {}", output_dir.display()))?;

        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Basket score per minute as `timestamp,basket_pips` CSV.
    pub fn write_basket_scores(&self, series: &BasketSeries, date: NaiveDate) -> Result<PathBuf> {
        let path = self.path_for("basket_scores", date, "csv");
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        let mut out = BufWriter::new(file);

        writeln!(out, "timestamp,basket_pips")?;
        for (minute, pips) in series {
            writeln!(out, "{},{:.2}", minute, pips)?;
        }
        out.flush()?;

        info!("Basket scores saved: {} ({} rows)", path.display(), series.len());
        Ok(path)
    }

    pub fn write_chart(&self, chart: &ChartData, date: NaiveDate) -> Result<PathBuf> {
        let json = serde_json::to_string_pretty(chart)?;
        let path = self.write_text(self.path_for("basket_chart", date, "json"), &json)?;
        info!("Chart data saved: {}", path.display());
        Ok(path)
    }

    pub fn write_prompt(&self, prompt: &str, date: NaiveDate) -> Result<PathBuf> {
        let path = self.write_text(self.path_for("blog_prompt", date, "txt"), prompt)?;
        info!("Blog prompt saved: {}", path.display());
        Ok(path)
    }

    pub fn write_post(&self, markdown: &str, date: NaiveDate) -> Result<PathBuf> {
        let path = self.write_text(self.path_for("trade_summary", date, "md"), markdown)?;
        info!("Post saved: {}", path.display());
        Ok(path)
    }

    fn path_for(&self, stem: &str, date: NaiveDate, ext: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}.{}", stem, date.format("%Y-%m-%d"), ext))
    }

    fn write_text(&self, path: PathBuf, contents: &str) -> Result<PathBuf> {
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(path)
    }
}
