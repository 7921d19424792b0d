//! Opened archive grids and point reads against them.

use crate::connectors::error::ConnectorError;
use crate::types::daily_series::{DailySeries, SeriesRequest};
use crate::types::variable::ClimateVariable;
use std::path::Path;
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::task;

const LATITUDE_NAMES: [&str; 2] = ["lat", "latitude"];
const LONGITUDE_NAMES: [&str; 2] = ["lon", "longitude"];

/// Random access to the daily values of one cell of a (time, lat, lon) grid.
pub trait CellReader: Send + Sync {
    fn latitudes(&self) -> &[f64];
    fn longitudes(&self) -> &[f64];
    /// All time steps of the cell at (`lat_index`, `lon_index`). Missing days are NaN.
    fn read_cell(&self, lat_index: usize, lon_index: usize) -> Result<Vec<f64>, ConnectorError>;
}

/// A grid opened for one (variable, year) scope.
///
/// Dropping the handle releases the underlying file, and deletes it when it
/// was streamed into a temporary file.
pub struct GridHandle {
    variable: ClimateVariable,
    year: i32,
    resource: String,
    reader: Arc<dyn CellReader>,
    // Declared after `reader` so the file is closed before it is unlinked.
    download: Option<NamedTempFile>,
}

impl GridHandle {
    pub fn new(
        variable: ClimateVariable,
        year: i32,
        resource: impl Into<String>,
        reader: Arc<dyn CellReader>,
    ) -> Self {
        Self {
            variable,
            year,
            resource: resource.into(),
            reader,
            download: None,
        }
    }

    pub(crate) fn with_download(mut self, download: NamedTempFile) -> Self {
        self.download = Some(download);
        self
    }

    pub fn variable(&self) -> ClimateVariable {
        self.variable
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Indices of the grid cell containing (`lat`, `lon`).
    ///
    /// A coordinate matches an axis value when it lies within half a grid step
    /// of it; anything further away is outside the grid.
    pub fn locate(&self, lat: f64, lon: f64) -> Option<(usize, usize)> {
        let lat_index = nearest_index(self.reader.latitudes(), lat)?;
        let lon_index = nearest_index(self.reader.longitudes(), lon)?;
        Some((lat_index, lon_index))
    }

    /// Reads the series for (`lat`, `lon`) on a blocking thread.
    pub async fn extract(&self, lat: f64, lon: f64) -> Result<DailySeries, ConnectorError> {
        let request = SeriesRequest::new(lat, lon, self.year, self.variable);
        let Some((lat_index, lon_index)) = self.locate(lat, lon) else {
            log::debug!("{} is outside grid {}", request, self.resource);
            return Err(ConnectorError::NoDataAtCoordinate { request });
        };

        let reader = Arc::clone(&self.reader);
        let values = task::spawn_blocking(move || reader.read_cell(lat_index, lon_index)).await??;
        DailySeries::from_values(request, values)
    }

    /// Releases the grid.
    pub fn close(self) {
        log::debug!("Closing grid {}", self.resource);
    }

    pub(crate) fn is_temporary(&self) -> bool {
        self.download.is_some()
    }
}

impl std::fmt::Debug for GridHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GridHandle")
            .field("variable", &self.variable)
            .field("year", &self.year)
            .field("resource", &self.resource)
            .finish()
    }
}

fn nearest_index(axis: &[f64], value: f64) -> Option<usize> {
    let tolerance = match axis {
        [a, b, ..] => (b - a).abs() / 2.0,
        _ => 1e-6,
    } + 1e-9;

    axis.iter()
        .enumerate()
        .map(|(i, v)| (i, (v - value).abs()))
        .filter(|(_, distance)| *distance <= tolerance)
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(i, _)| i)
}

/// A netCDF grid laid out as `variable(time, lat, lon)`.
pub struct NetcdfGrid {
    file: netcdf::File,
    resource: String,
    variable_name: String,
    latitudes: Vec<f64>,
    longitudes: Vec<f64>,
    fill_values: Vec<f64>,
    scale_factor: f64,
    add_offset: f64,
}

impl NetcdfGrid {
    pub fn open(path: &Path, variable: ClimateVariable) -> Result<Self, ConnectorError> {
        let resource = path.display().to_string();
        let file = netcdf::open(path).map_err(|source| ConnectorError::GridOpen {
            resource: resource.clone(),
            source,
        })?;

        let latitudes = read_axis(&file, &resource, &LATITUDE_NAMES)?;
        let longitudes = read_axis(&file, &resource, &LONGITUDE_NAMES)?;

        let variable_name = variable.name().to_string();
        let var = file
            .variable(&variable_name)
            .ok_or_else(|| ConnectorError::MissingGridVariable {
                resource: resource.clone(),
                name: variable_name.clone(),
            })?;

        let fill_values = ["_FillValue", "missing_value"]
            .into_iter()
            .filter_map(|name| get_f64_attr(&var, name))
            .collect();
        let scale_factor = get_f64_attr(&var, "scale_factor").unwrap_or(1.0);
        let add_offset = get_f64_attr(&var, "add_offset").unwrap_or(0.0);
        drop(var);

        log::debug!(
            "Opened grid {} ({} x {} cells)",
            resource,
            latitudes.len(),
            longitudes.len()
        );

        Ok(Self {
            file,
            resource,
            variable_name,
            latitudes,
            longitudes,
            fill_values,
            scale_factor,
            add_offset,
        })
    }
}

impl CellReader for NetcdfGrid {
    fn latitudes(&self) -> &[f64] {
        &self.latitudes
    }

    fn longitudes(&self) -> &[f64] {
        &self.longitudes
    }

    fn read_cell(&self, lat_index: usize, lon_index: usize) -> Result<Vec<f64>, ConnectorError> {
        let var = self.file.variable(&self.variable_name).ok_or_else(|| {
            ConnectorError::MissingGridVariable {
                resource: self.resource.clone(),
                name: self.variable_name.clone(),
            }
        })?;

        let raw: Vec<f64> = var
            .get_values::<f64, _>((.., lat_index, lon_index))
            .map_err(|source| ConnectorError::GridRead {
                resource: self.resource.clone(),
                name: self.variable_name.clone(),
                source,
            })?;

        Ok(raw
            .into_iter()
            .map(|v| {
                if v.is_nan() || self.fill_values.iter().any(|fill| *fill == v) {
                    f64::NAN
                } else {
                    v * self.scale_factor + self.add_offset
                }
            })
            .collect())
    }
}

fn read_axis(
    file: &netcdf::File,
    resource: &str,
    candidates: &[&str],
) -> Result<Vec<f64>, ConnectorError> {
    let Some((name, var)) = candidates
        .iter()
        .find_map(|name| file.variable(name).map(|var| (*name, var)))
    else {
        return Err(ConnectorError::MissingGridVariable {
            resource: resource.to_string(),
            name: candidates.join("|"),
        });
    };

    var.get_values::<f64, _>(..)
        .map_err(|source| ConnectorError::GridRead {
            resource: resource.to_string(),
            name: name.to_string(),
            source,
        })
}

/// Checked first so absent attributes don't make the library log errors.
fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

fn get_f64_attr(var: &netcdf::Variable, name: &str) -> Option<f64> {
    if !has_attr(var, name) {
        return None;
    }
    let attr_value = var.attribute_value(name)?.ok()?;
    f64::try_from(attr_value).ok()
}
