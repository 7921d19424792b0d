use crate::connectors::error::ConnectorError;
use crate::connectors::grid::{GridHandle, NetcdfGrid};
use crate::connectors::DataConnector;
use crate::resolver::years::YearRange;
use crate::types::daily_series::{DailySeries, SeriesRequest};
use crate::types::provider::Provider;
use crate::types::variable::ClimateVariable;
use crate::utils::ensure_dir_exists;
use async_trait::async_trait;
use futures_util::TryStreamExt;
use log::{debug, info, warn};
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tokio::{fs, task};
use tokio_util::io::StreamReader;

/// Public bucket holding one netCDF object per (variable, year).
pub const SILO_ARCHIVE_URL: &str = "https://s3-ap-southeast-2.amazonaws.com/silo-open-data";

/// Where the archive grids come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveSource {
    /// Bucket root; objects live at `annual/<variable>/<year>.<variable>.nc`.
    Remote { base_url: String },
    /// A directory of `<year>.<variable>.nc` files, or a single grid file.
    Local(PathBuf),
}

impl Default for ArchiveSource {
    fn default() -> Self {
        ArchiveSource::Remote {
            base_url: SILO_ARCHIVE_URL.to_string(),
        }
    }
}

/// Reads SILO daily grids, one (variable, year) grid at a time.
pub struct SiloArchiveConnector {
    source: ArchiveSource,
    client: Client,
    grid: Option<GridHandle>,
}

impl SiloArchiveConnector {
    pub fn new(source: ArchiveSource) -> Self {
        Self {
            source,
            client: Client::new(),
            grid: None,
        }
    }

    pub fn remote(base_url: impl Into<String>) -> Self {
        Self::new(ArchiveSource::Remote {
            base_url: base_url.into(),
        })
    }

    pub fn local(path: impl Into<PathBuf>) -> Self {
        Self::new(ArchiveSource::Local(path.into()))
    }

    pub fn source(&self) -> &ArchiveSource {
        &self.source
    }

    /// `<year>.<variable>.nc`
    pub fn file_name(variable: ClimateVariable, year: i32) -> String {
        format!("{}.{}.nc", year, variable.name())
    }

    /// `<base>/annual/<variable>/<year>.<variable>.nc`
    pub fn object_url(base_url: &str, variable: ClimateVariable, year: i32) -> String {
        format!(
            "{}/annual/{}/{}",
            base_url.trim_end_matches('/'),
            variable.name(),
            Self::file_name(variable, year)
        )
    }

    /// Opens the grid covering every cell of `variable` in `year`.
    ///
    /// # Errors
    ///
    /// Any failure here means the grid is unavailable ([`ConnectorError::kind`]
    /// is `SourceUnavailable`).
    pub async fn open_grid(
        &self,
        variable: ClimateVariable,
        year: i32,
    ) -> Result<GridHandle, ConnectorError> {
        match &self.source {
            ArchiveSource::Local(path) => {
                let path = if fs::metadata(path).await.map(|m| m.is_file()).unwrap_or(false) {
                    path.clone()
                } else {
                    path.join(Self::file_name(variable, year))
                };
                if fs::metadata(&path).await.is_err() {
                    return Err(ConnectorError::GridNotFound(path));
                }
                info!("Opening local grid {}", path.display());
                let grid = Self::open_netcdf(path.clone(), variable).await?;
                Ok(GridHandle::new(
                    variable,
                    year,
                    path.display().to_string(),
                    Arc::new(grid),
                ))
            }
            ArchiveSource::Remote { base_url } => {
                let url = Self::object_url(base_url, variable, year);
                let download = NamedTempFile::new()
                    .map_err(|e| ConnectorError::DownloadIo(std::env::temp_dir(), e))?;
                self.stream_to(&url, download.path()).await?;
                let grid = Self::open_netcdf(download.path().to_path_buf(), variable).await?;
                Ok(GridHandle::new(variable, year, url, Arc::new(grid)).with_download(download))
            }
        }
    }

    /// Reads the daily series of one cell from an opened grid.
    pub async fn extract_series(
        &self,
        handle: &GridHandle,
        lat: f64,
        lon: f64,
        variable: ClimateVariable,
        year: i32,
    ) -> Result<DailySeries, ConnectorError> {
        if handle.variable() != variable || handle.year() != year {
            warn!(
                "Grid {} holds {} for {}, not {} for {}",
                handle.resource(),
                handle.variable(),
                handle.year(),
                variable,
                year
            );
            return Err(ConnectorError::NoDataAtCoordinate {
                request: SeriesRequest::new(lat, lon, year, variable),
            });
        }
        handle.extract(lat, lon).await
    }

    /// Saves the remote object for (`variable`, `year`) into `dir`, returning the
    /// file path. Files already present are left untouched.
    pub async fn download_to(
        &self,
        variable: ClimateVariable,
        year: i32,
        dir: &Path,
    ) -> Result<PathBuf, ConnectorError> {
        let destination = dir.join(Self::file_name(variable, year));
        if fs::metadata(&destination).await.is_ok() {
            info!("Already downloaded: {}", destination.display());
            return Ok(destination);
        }

        let base_url = match &self.source {
            ArchiveSource::Remote { base_url } => base_url.as_str(),
            ArchiveSource::Local(_) => SILO_ARCHIVE_URL,
        };
        let url = Self::object_url(base_url, variable, year);

        ensure_dir_exists(dir)
            .await
            .map_err(|e| ConnectorError::DownloadIo(dir.to_path_buf(), e))?;
        let partial = destination.with_extension("nc.part");
        if let Err(e) = self.stream_to(&url, &partial).await {
            let _ = fs::remove_file(&partial).await;
            return Err(e);
        }
        fs::rename(&partial, &destination)
            .await
            .map_err(|e| ConnectorError::DownloadIo(destination.clone(), e))?;
        info!("Saved {} to {}", url, destination.display());
        Ok(destination)
    }

    async fn stream_to(&self, url: &str, path: &Path) -> Result<u64, ConnectorError> {
        info!("Downloading {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ConnectorError::NetworkRequest(url.to_string(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(match e.status() {
                    Some(status) => ConnectorError::HttpStatus {
                        url: url.to_string(),
                        status,
                        source: e,
                    },
                    None => ConnectorError::NetworkRequest(url.to_string(), e),
                });
            }
        };

        let stream = response
            .bytes_stream()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        let mut reader = StreamReader::new(stream);
        let mut file = fs::File::create(path)
            .await
            .map_err(|e| ConnectorError::DownloadIo(path.to_path_buf(), e))?;
        let written = tokio::io::copy(&mut reader, &mut file)
            .await
            .map_err(|e| ConnectorError::DownloadIo(path.to_path_buf(), e))?;
        debug!("Wrote {} bytes to {}", written, path.display());
        Ok(written)
    }

    async fn open_netcdf(
        path: PathBuf,
        variable: ClimateVariable,
    ) -> Result<NetcdfGrid, ConnectorError> {
        task::spawn_blocking(move || NetcdfGrid::open(&path, variable)).await?
    }

    fn release(&mut self) {
        if let Some(grid) = self.grid.take() {
            if grid.is_temporary() {
                debug!("Removing downloaded grid for {} {}", grid.variable(), grid.year());
            }
            grid.close();
        }
    }
}

#[async_trait]
impl DataConnector for SiloArchiveConnector {
    fn provider(&self) -> Provider {
        Provider::Silo
    }

    async fn open_scope(
        &mut self,
        variable: ClimateVariable,
        year: i32,
    ) -> Result<(), ConnectorError> {
        self.release();
        self.grid = Some(self.open_grid(variable, year).await?);
        Ok(())
    }

    async fn daily_series(
        &mut self,
        request: SeriesRequest,
        _years: &YearRange,
    ) -> Result<DailySeries, ConnectorError> {
        let in_scope = self
            .grid
            .as_ref()
            .is_some_and(|g| g.variable() == request.variable && g.year() == request.year);
        if !in_scope {
            self.open_scope(request.variable, request.year).await?;
        }
        let Some(grid) = self.grid.as_ref() else {
            return Err(ConnectorError::NoDataAtCoordinate { request });
        };
        self.extract_series(grid, request.lat, request.lon, request.variable, request.year)
            .await
    }

    async fn close_scope(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::error::ErrorKind;
    use crate::connectors::grid::tests::MemoryGrid;

    #[test]
    fn object_layout() {
        assert_eq!(
            SiloArchiveConnector::object_url(SILO_ARCHIVE_URL, ClimateVariable::DailyRain, 2010),
            "https://s3-ap-southeast-2.amazonaws.com/silo-open-data/annual/daily_rain/2010.daily_rain.nc"
        );
        assert_eq!(
            SiloArchiveConnector::object_url("http://localhost/", ClimateVariable::MaxTemp, 1999),
            "http://localhost/annual/max_temp/1999.max_temp.nc"
        );
    }

    #[tokio::test]
    async fn missing_local_grid_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let connector = SiloArchiveConnector::local(dir.path());
        let err = connector
            .open_grid(ClimateVariable::DailyRain, 2010)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ConnectorError::GridNotFound(ref p) if p.ends_with("2010.daily_rain.nc"))
        );
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }

    #[tokio::test]
    async fn unreadable_local_grid_is_source_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2010.max_temp.nc"), b"not a grid").unwrap();
        let connector = SiloArchiveConnector::local(dir.path());
        let err = connector
            .open_grid(ClimateVariable::MaxTemp, 2010)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceUnavailable);
    }

    #[tokio::test]
    async fn extraction_from_same_handle_is_repeatable() {
        let grid = MemoryGrid {
            latitudes: vec![-35.0, -34.95],
            longitudes: vec![148.0, 148.05],
            days: 365,
            missing: vec![(0, 0)],
        };
        let handle = GridHandle::new(ClimateVariable::DailyRain, 2010, "memory", Arc::new(grid));
        let connector = SiloArchiveConnector::local("unused");

        let first = connector
            .extract_series(&handle, -35.0, 148.05, ClimateVariable::DailyRain, 2010)
            .await
            .unwrap();
        let second = connector
            .extract_series(&handle, -35.0, 148.05, ClimateVariable::DailyRain, 2010)
            .await
            .unwrap();
        assert_eq!(first, second);

        let err = connector
            .extract_series(&handle, -35.0, 148.0, ClimateVariable::DailyRain, 2010)
            .await
            .unwrap_err();
        assert!(err.is_no_data());
        handle.close();
    }

    #[tokio::test]
    async fn handle_for_other_scope_is_rejected() {
        let grid = MemoryGrid {
            latitudes: vec![-35.0],
            longitudes: vec![148.0],
            days: 365,
            missing: Vec::new(),
        };
        let handle = GridHandle::new(ClimateVariable::DailyRain, 2010, "memory", Arc::new(grid));
        let connector = SiloArchiveConnector::local("unused");
        let err = connector
            .extract_series(&handle, -35.0, 148.0, ClimateVariable::MaxTemp, 2010)
            .await
            .unwrap_err();
        assert!(err.is_no_data());
    }

    #[tokio::test]
    async fn existing_download_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        let existing = dir.path().join("2015.radiation.nc");
        std::fs::write(&existing, b"cached").unwrap();

        let connector = SiloArchiveConnector::remote("http://127.0.0.1:9");
        let path = connector
            .download_to(ClimateVariable::Radiation, 2015, dir.path())
            .await
            .unwrap();
        assert_eq!(path, existing);
        assert_eq!(std::fs::read(&path).unwrap(), b"cached");
    }
}
