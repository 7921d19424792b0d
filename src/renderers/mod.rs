//! Writes the climate table out as crop-model input files.

pub mod csv;
pub mod error;
pub mod met;
pub mod summary;
pub mod wth;

use crate::assembler::table::ClimateTable;
use crate::renderers::error::RenderError;
use crate::types::provider::Provider;
use crate::utils::ensure_dir_exists;
use chrono::NaiveDate;
use log::{debug, info};
use polars::prelude::DataFrame;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// APSIM `.met`
    #[default]
    Met,
    /// DSSAT `.WTH`
    Wth,
    Csv,
    /// One table per coordinate, printed instead of written to files.
    Stdout,
}

impl OutputFormat {
    pub fn name(&self) -> &'static str {
        match self {
            OutputFormat::Met => "met",
            OutputFormat::Wth => "wth",
            OutputFormat::Csv => "csv",
            OutputFormat::Stdout => "stdout",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for OutputFormat {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "met" => Ok(OutputFormat::Met),
            "wth" | "wht" => Ok(OutputFormat::Wth),
            "csv" => Ok(OutputFormat::Csv),
            "stdout" => Ok(OutputFormat::Stdout),
            other => Err(RenderError::UnknownFormat(other.to_string())),
        }
    }
}

/// Run-level details written into file headers.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    pub provider: Provider,
    pub created: NaiveDate,
}

/// The daily rows of one coordinate, ordered by year and day.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateRows {
    pub lat: f64,
    pub lon: f64,
    pub year: Vec<i32>,
    pub day: Vec<i32>,
    pub radn: Vec<Option<f64>>,
    pub maxt: Vec<Option<f64>>,
    pub mint: Vec<Option<f64>>,
    pub rain: Vec<Option<f64>>,
}

impl CoordinateRows {
    pub fn from_frame(lat: f64, lon: f64, frame: &DataFrame) -> Result<Self, RenderError> {
        let ints = |name: &str| -> Result<Vec<i32>, RenderError> {
            Ok(frame.column(name)?.i32()?.into_iter().flatten().collect())
        };
        let floats = |name: &str| -> Result<Vec<Option<f64>>, RenderError> {
            Ok(frame.column(name)?.f64()?.into_iter().collect())
        };

        Ok(Self {
            lat,
            lon,
            year: ints("year")?,
            day: ints("day")?,
            radn: floats("radn")?,
            maxt: floats("maxt")?,
            mint: floats("mint")?,
            rain: floats("rain")?,
        })
    }

    pub fn len(&self) -> usize {
        self.day.len()
    }

    pub fn is_empty(&self) -> bool {
        self.day.is_empty()
    }

    pub fn first_year(&self) -> Option<i32> {
        self.year.iter().copied().min()
    }

    pub fn last_year(&self) -> Option<i32> {
        self.year.iter().copied().max()
    }

    /// `(year, day, maxt, mint)` per row, for temperature summaries.
    pub fn temperatures(&self) -> impl Iterator<Item = (i32, i32, Option<f64>, Option<f64>)> + '_ {
        self.year
            .iter()
            .zip(&self.day)
            .zip(self.maxt.iter().zip(&self.mint))
            .map(|((year, day), (maxt, mint))| (*year, *day, *maxt, *mint))
    }
}

/// Coordinates as they appear in file names and headers: `-41.15`, `148.0`.
pub fn format_coordinate(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

pub(crate) fn format_value(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{:.*}", decimals, v),
        _ => "NaN".to_string(),
    }
}

/// Writes `table` to `output_dir` in `format`, one file per coordinate of
/// `latitudes` × the table's retained longitudes that has rows.
/// [`OutputFormat::Stdout`] prints instead and returns no paths.
pub async fn render(
    table: &ClimateTable,
    latitudes: &[f64],
    format: OutputFormat,
    context: RenderContext,
    output_dir: &Path,
) -> Result<Vec<PathBuf>, RenderError> {
    if format == OutputFormat::Stdout {
        let printed = print_coordinates(table, latitudes, &mut std::io::stdout().lock())?;
        info!("Printed {} coordinates", printed);
        return Ok(Vec::new());
    }

    ensure_dir_exists(output_dir)
        .await
        .map_err(|e| RenderError::OutputDir(output_dir.to_path_buf(), e))?;

    info!("Writing {} files to {}", format, output_dir.display());
    let mut written = Vec::new();
    for lat in latitudes.iter().copied() {
        for lon in table.pruned_lons().iter().copied() {
            let frame = table.coordinate(lat, lon)?;
            if frame.height() == 0 {
                debug!("No rows for lat {} lon {}", lat, lon);
                continue;
            }
            let path = match format {
                OutputFormat::Met => {
                    let rows = CoordinateRows::from_frame(lat, lon, &frame)?;
                    let path = output_dir.join(met::file_name(&rows));
                    write_text(path, met::render_met(&rows, &context)).await?
                }
                OutputFormat::Wth => {
                    let rows = CoordinateRows::from_frame(lat, lon, &frame)?;
                    let path = output_dir.join(wth::file_name(&rows));
                    write_text(path, wth::render_wth(&rows)).await?
                }
                OutputFormat::Csv => {
                    let path = output_dir.join(csv::file_name(lat, lon, context.provider));
                    csv::write_csv(frame, path).await?
                }
                OutputFormat::Stdout => continue,
            };
            written.push(path);
        }
    }

    if format == OutputFormat::Csv {
        let path = output_dir.join(csv::TABLE_FILE_NAME);
        written.push(csv::write_csv(table.frame().clone(), path).await?);
    }

    info!("Wrote {} files", written.len());
    Ok(written)
}

/// Prints the rows of every coordinate with data as its own table.
/// Returns the number of coordinates printed.
pub fn print_coordinates<W: Write>(
    table: &ClimateTable,
    latitudes: &[f64],
    out: &mut W,
) -> Result<usize, RenderError> {
    let mut printed = 0;
    for lat in latitudes.iter().copied() {
        for lon in table.pruned_lons().iter().copied() {
            let frame = table.coordinate(lat, lon)?;
            if frame.height() == 0 {
                continue;
            }
            writeln!(out, "{}", frame).map_err(RenderError::Print)?;
            printed += 1;
        }
    }
    out.flush().map_err(RenderError::Print)?;
    Ok(printed)
}

async fn write_text(path: PathBuf, contents: String) -> Result<PathBuf, RenderError> {
    tokio::fs::write(&path, contents)
        .await
        .map_err(|e| RenderError::Write(path.clone(), e))?;
    debug!("Wrote {}", path.display());
    Ok(path)
}
