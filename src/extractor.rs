//! The configured end-to-end pipeline: resolve, assemble, render.

use crate::assembler::parallel::build_table_parallel;
use crate::assembler::table::ClimateTable;
use crate::assembler::{build_table, Extent};
use crate::connectors::error::ErrorKind;
use crate::connectors::nasa_power::{NasaPowerConnector, POWER_API_URL};
use crate::connectors::silo_archive::{ArchiveSource, SiloArchiveConnector, SILO_ARCHIVE_URL};
use crate::connectors::{Connector, ConnectorFactory};
use crate::error::ClimateError;
use crate::renderers::{render, OutputFormat, RenderContext};
use crate::resolver::coordinates::{resolve_coordinates, Axis, CoordinateSpec};
use crate::resolver::error::ResolveError;
use crate::resolver::years::YearRange;
use crate::types::provider::Provider;
use crate::types::variable::ClimateVariable;
use bon::bon;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything needed to build a connector, so each worker can build its own.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorSettings {
    pub provider: Provider,
    pub archive_dir: Option<PathBuf>,
    pub archive_url: String,
    pub power_url: String,
}

impl ConnectorSettings {
    pub fn archive_source(&self) -> ArchiveSource {
        match &self.archive_dir {
            Some(dir) => ArchiveSource::Local(dir.clone()),
            None => ArchiveSource::Remote {
                base_url: self.archive_url.clone(),
            },
        }
    }
}

impl ConnectorFactory for ConnectorSettings {
    type Connector = Connector;

    fn connector(&self) -> Connector {
        match self.provider {
            Provider::Silo => Connector::Archive(SiloArchiveConnector::new(self.archive_source())),
            Provider::NasaPower => Connector::Api(NasaPowerConnector::new(self.power_url.clone())),
        }
    }
}

/// Extracts gridded daily climate data for a set of coordinates and years.
///
/// Configure with [`ClimateExtractor::builder`], then call
/// [`extract`](ClimateExtractor::extract) for the table,
/// [`generate`](ClimateExtractor::generate) to also write output files, or
/// [`download`](ClimateExtractor::download) to fetch the raw SILO grids.
///
/// # Examples
///
/// ```no_run
/// # use climgrid::{ClimateExtractor, ClimateError, ClimateVariable, CoordinateSpec, OutputFormat, Provider, YearRange};
/// # use std::path::Path;
/// # #[tokio::main]
/// # async fn main() -> Result<(), ClimateError> {
/// let extractor = ClimateExtractor::builder()
///     .provider(Provider::Silo)
///     .variables(vec![ClimateVariable::DailyRain, ClimateVariable::MaxTemp])
///     .years(YearRange::span(2010, 2011))
///     .latitudes(CoordinateSpec::Span(-41.15, -41.05))
///     .longitudes(CoordinateSpec::Single(145.5))
///     .build();
///
/// let files = extractor.generate(OutputFormat::Met, Path::new("out")).await?;
/// println!("Wrote {} files", files.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ClimateExtractor {
    settings: ConnectorSettings,
    variables: Vec<ClimateVariable>,
    years: YearRange,
    latitudes: Option<CoordinateSpec>,
    longitudes: Option<CoordinateSpec>,
    parallel: bool,
    workers: usize,
}

#[bon]
impl ClimateExtractor {
    /// * `latitudes`, `longitudes` - required to extract, not to download.
    /// * `archive_dir` - read SILO grids from this directory (or file) instead of the bucket.
    /// * `archive_url` - SILO bucket root, defaults to [`SILO_ARCHIVE_URL`].
    /// * `power_url` - NASA POWER endpoint, defaults to [`POWER_API_URL`].
    /// * `workers` - task limit in parallel mode, defaults to the available parallelism.
    #[builder]
    pub fn new(
        #[builder(default)] provider: Provider,
        variables: Vec<ClimateVariable>,
        years: YearRange,
        latitudes: Option<CoordinateSpec>,
        longitudes: Option<CoordinateSpec>,
        archive_dir: Option<PathBuf>,
        archive_url: Option<String>,
        power_url: Option<String>,
        #[builder(default)] parallel: bool,
        workers: Option<usize>,
    ) -> Self {
        let workers = workers
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1);
        Self {
            settings: ConnectorSettings {
                provider,
                archive_dir,
                archive_url: archive_url.unwrap_or_else(|| SILO_ARCHIVE_URL.to_string()),
                power_url: power_url.unwrap_or_else(|| POWER_API_URL.to_string()),
            },
            variables,
            years,
            latitudes,
            longitudes,
            parallel,
            workers,
        }
    }

    pub fn provider(&self) -> Provider {
        self.settings.provider
    }

    pub fn settings(&self) -> &ConnectorSettings {
        &self.settings
    }

    /// Resolves the coordinate specs against the provider's grid.
    pub fn extent(&self) -> Result<Extent, ClimateError> {
        let provider = self.settings.provider;
        let resolve = |spec: &Option<CoordinateSpec>, axis: Axis| match spec {
            Some(spec) => resolve_coordinates(spec, axis, provider),
            None => Err(ResolveError::EmptySpec(axis.name())),
        };
        let latitudes = resolve(&self.latitudes, Axis::Latitude)?;
        let longitudes = resolve(&self.longitudes, Axis::Longitude)?;
        Ok(Extent::new(
            self.years.clone(),
            self.variables.clone(),
            latitudes,
            longitudes,
        ))
    }

    /// Assembles the climate table.
    ///
    /// # Errors
    ///
    /// * [`ClimateError::Resolve`] for coordinates outside the valid range, before any I/O.
    /// * [`ClimateError::Connector`] for variables the provider does not serve.
    /// * [`ClimateError::EmptyResult`] when no coordinate has data.
    /// * [`ClimateError::Interrupted`] when a parallel run is cancelled with Ctrl-C.
    pub async fn extract(&self) -> Result<ClimateTable, ClimateError> {
        let extent = self.extent()?;
        self.extract_extent(&extent).await
    }

    async fn extract_extent(&self, extent: &Extent) -> Result<ClimateTable, ClimateError> {
        info!(
            "Extracting {} variables for {} years over {} x {} coordinates from {}",
            extent.variables.len(),
            extent.years.len(),
            extent.latitudes.len(),
            extent.longitudes.len(),
            self.settings.provider
        );

        let table = if self.parallel {
            build_table_parallel(extent, Arc::new(self.settings.clone()), self.workers).await?
        } else {
            let mut connector = self.settings.connector();
            build_table(extent, &mut connector).await?
        };

        table.ensure_not_empty().inspect_err(|_| {
            error!("No data found for any requested coordinate; nothing to write");
        })
    }

    /// Assembles the table and writes it to `output_dir` as `format`.
    pub async fn generate(
        &self,
        format: OutputFormat,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, ClimateError> {
        let extent = self.extent()?;
        let table = self.extract_extent(&extent).await?;
        let context = RenderContext {
            provider: self.settings.provider,
            created: chrono::Local::now().date_naive(),
        };
        Ok(render(&table, extent.latitudes.values(), format, context, output_dir).await?)
    }

    /// Downloads the SILO grid of every (variable, year) into `dir`.
    /// Grids that cannot be fetched are logged and skipped.
    pub async fn download(&self, dir: &Path) -> Result<Vec<PathBuf>, ClimateError> {
        if self.settings.provider != Provider::Silo {
            warn!("{} has no archive to download", self.settings.provider);
            return Ok(Vec::new());
        }

        let connector = SiloArchiveConnector::remote(self.settings.archive_url.clone());
        let mut saved = Vec::new();
        for year in self.years.iter() {
            for variable in self.variables.iter().copied() {
                match connector.download_to(variable, year, dir).await {
                    Ok(path) => saved.push(path),
                    Err(e) if e.kind() == ErrorKind::SourceUnavailable => {
                        warn!("Could not download {} for {}: {}", variable, year, e);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        info!("Downloaded {} grids to {}", saved.len(), dir.display());
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::DataConnector;

    fn extractor(provider: Provider) -> ClimateExtractor {
        ClimateExtractor::builder()
            .provider(provider)
            .variables(vec![ClimateVariable::DailyRain])
            .years(YearRange::single(2010))
            .latitudes(CoordinateSpec::Span(-42.0, -40.0))
            .longitudes(CoordinateSpec::Single(145.5))
            .workers(2)
            .build()
    }

    #[test]
    fn builder_defaults() {
        let extractor = extractor(Provider::Silo);
        let settings = extractor.settings();
        assert_eq!(settings.archive_url, SILO_ARCHIVE_URL);
        assert_eq!(settings.power_url, POWER_API_URL);
        assert_eq!(
            settings.archive_source(),
            ArchiveSource::Remote {
                base_url: SILO_ARCHIVE_URL.to_string()
            }
        );
        assert_eq!(extractor.workers, 2);
        assert!(!extractor.parallel);
    }

    #[test]
    fn extent_snaps_to_provider_grid() {
        assert_eq!(extractor(Provider::Silo).extent().unwrap().latitudes.len(), 41);
        assert_eq!(
            extractor(Provider::NasaPower).extent().unwrap().latitudes.values(),
            &[-42.0, -41.0, -40.0]
        );
    }

    #[test]
    fn factory_builds_provider_connector() {
        let silo = extractor(Provider::Silo).settings().connector();
        assert!(matches!(silo, Connector::Archive(_)));
        let power = extractor(Provider::NasaPower).settings().connector();
        assert_eq!(power.provider(), Provider::NasaPower);
    }

    #[tokio::test]
    async fn unsupported_variable_fails_before_network() {
        let extractor = ClimateExtractor::builder()
            .provider(Provider::NasaPower)
            .variables(vec![ClimateVariable::EvapPan])
            .years(YearRange::single(2010))
            .latitudes(CoordinateSpec::Single(-41.0))
            .longitudes(CoordinateSpec::Single(145.0))
            .power_url("http://127.0.0.1:9".to_string())
            .build();
        let err = extractor.extract().await.unwrap_err();
        assert!(matches!(err, ClimateError::Connector(_)));
    }

    #[tokio::test]
    async fn missing_local_archive_is_an_empty_result() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = ClimateExtractor::builder()
            .variables(vec![ClimateVariable::DailyRain])
            .years(YearRange::single(2010))
            .latitudes(CoordinateSpec::Single(-41.0))
            .longitudes(CoordinateSpec::Single(145.0))
            .archive_dir(dir.path().to_path_buf())
            .build();
        let err = extractor.extract().await.unwrap_err();
        assert!(matches!(err, ClimateError::EmptyResult));
    }

    #[tokio::test]
    async fn generate_stops_before_rendering_an_empty_table() {
        let archive = tempfile::tempdir().unwrap();
        let output = archive.path().join("out");
        let extractor = ClimateExtractor::builder()
            .variables(vec![ClimateVariable::DailyRain])
            .years(YearRange::single(2010))
            .latitudes(CoordinateSpec::Single(-41.0))
            .longitudes(CoordinateSpec::Single(145.0))
            .archive_dir(archive.path().to_path_buf())
            .build();
        let err = extractor.generate(OutputFormat::Met, &output).await.unwrap_err();
        assert!(matches!(err, ClimateError::EmptyResult));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn generate_rejects_bad_coordinates_before_any_io() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out");
        let extractor = ClimateExtractor::builder()
            .variables(vec![ClimateVariable::DailyRain])
            .years(YearRange::single(2010))
            .latitudes(CoordinateSpec::Span(-41.0, f64::INFINITY))
            .longitudes(CoordinateSpec::Single(145.0))
            .archive_dir(dir.path().to_path_buf())
            .build();
        let err = extractor.generate(OutputFormat::Met, &output).await.unwrap_err();
        assert!(matches!(
            err,
            ClimateError::Resolve(ResolveError::OutOfRange { axis: "latitude", .. })
        ));
        assert!(!output.exists());
    }

    #[test]
    fn missing_coordinates_are_a_parse_error() {
        let extractor = ClimateExtractor::builder()
            .variables(vec![ClimateVariable::DailyRain])
            .years(YearRange::single(2010))
            .longitudes(CoordinateSpec::Single(145.0))
            .build();
        assert!(matches!(
            extractor.extent(),
            Err(ClimateError::Resolve(ResolveError::EmptySpec("latitude")))
        ));
    }

    #[tokio::test]
    async fn nothing_to_download_from_api() {
        let dir = tempfile::tempdir().unwrap();
        let saved = extractor(Provider::NasaPower).download(dir.path()).await.unwrap();
        assert!(saved.is_empty());
    }
}
