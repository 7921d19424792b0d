//! Drives a connector over the full request and assembles the climate table.

pub mod parallel;
pub mod table;

use crate::assembler::table::{ClimateTable, RowBuffer};
use crate::connectors::error::{ConnectorError, ErrorKind};
use crate::connectors::DataConnector;
use crate::error::ClimateError;
use crate::resolver::coordinates::CoordinateRange;
use crate::resolver::years::YearRange;
use crate::types::daily_series::SeriesRequest;
use crate::types::variable::ClimateVariable;
use log::{debug, info, warn};
use ordered_float::OrderedFloat;
use std::collections::BTreeSet;

/// Everything one assembly pass iterates over.
#[derive(Debug, Clone, PartialEq)]
pub struct Extent {
    pub years: YearRange,
    pub variables: Vec<ClimateVariable>,
    pub latitudes: CoordinateRange,
    pub longitudes: CoordinateRange,
}

impl Extent {
    pub fn new(
        years: YearRange,
        variables: Vec<ClimateVariable>,
        latitudes: CoordinateRange,
        longitudes: CoordinateRange,
    ) -> Self {
        Self {
            years,
            variables,
            latitudes,
            longitudes,
        }
    }

    /// Number of (year, variable, lat, lon) extractions before pruning.
    pub fn cell_count(&self) -> usize {
        self.years.len() * self.variables.len() * self.latitudes.len() * self.longitudes.len()
    }
}

/// One assembly pass over an [`Extent`].
///
/// Iterates year, then variable, then latitude, then longitude. A longitude
/// that comes back empty once is never requested again during the pass, for
/// any latitude, variable or year, and all of its rows are dropped from the
/// result.
pub struct Assembler<'a, C: DataConnector> {
    connector: &'a mut C,
    rows: RowBuffer,
    empty_lons: BTreeSet<OrderedFloat<f64>>,
}

enum ScopeOutcome {
    Completed,
    Abandoned,
}

impl<'a, C: DataConnector> Assembler<'a, C> {
    pub fn new(connector: &'a mut C) -> Self {
        Self {
            connector,
            rows: RowBuffer::new(),
            empty_lons: BTreeSet::new(),
        }
    }

    /// Runs the pass and returns the assembled table. An empty table is
    /// returned as is; use [`ClimateTable::ensure_not_empty`] to reject it.
    ///
    /// # Errors
    ///
    /// Configuration errors from the connector and table assembly failures.
    /// Missing cells and unavailable grids are logged and skipped.
    pub async fn run(mut self, extent: &Extent) -> Result<ClimateTable, ClimateError> {
        self.connector.prepare(&extent.variables)?;

        for year in extent.years.iter() {
            for variable in extent.variables.iter().copied() {
                info!("Extracting {} for {}", variable, year);
                match self.connector.open_scope(variable, year).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::Configuration => return Err(e.into()),
                    Err(e) => {
                        warn!("Skipping {} for {}: {}", variable, year, e);
                        self.connector.close_scope().await;
                        continue;
                    }
                }

                let outcome = self.extract_scope(extent, variable, year).await;
                self.connector.close_scope().await;
                if let ScopeOutcome::Abandoned = outcome? {
                    warn!("Abandoned {} for {} after a source failure", variable, year);
                }
            }
        }

        self.finish(extent)
    }

    async fn extract_scope(
        &mut self,
        extent: &Extent,
        variable: ClimateVariable,
        year: i32,
    ) -> Result<ScopeOutcome, ConnectorError> {
        for lat in extent.latitudes.iter() {
            for lon in extent.longitudes.iter() {
                if self.empty_lons.contains(&OrderedFloat(lon)) {
                    continue;
                }
                let request = SeriesRequest::new(lat, lon, year, variable);
                match self.connector.daily_series(request, &extent.years).await {
                    Ok(series) => {
                        debug!("Extracted {}", request);
                        self.rows.push_series(&series);
                    }
                    Err(e) => match e.kind() {
                        ErrorKind::NoData => {
                            warn!("{}; skipping longitude {} from now on", e, lon);
                            self.empty_lons.insert(OrderedFloat(lon));
                        }
                        ErrorKind::SourceUnavailable => {
                            warn!("{} unavailable: {}", request, e);
                            return Ok(ScopeOutcome::Abandoned);
                        }
                        ErrorKind::Configuration => return Err(e),
                    },
                }
            }
        }
        Ok(ScopeOutcome::Completed)
    }

    fn finish(mut self, extent: &Extent) -> Result<ClimateTable, ClimateError> {
        self.rows.remove_lons(&self.empty_lons);

        let pruned_lons: Vec<f64> = extent
            .longitudes
            .iter()
            .filter(|lon| !self.empty_lons.contains(&OrderedFloat(*lon)))
            .collect();
        let frame = self.rows.into_frame(&extent.variables)?;
        let table = ClimateTable::new(frame, pruned_lons);

        if table.is_empty() {
            warn!(
                "No data for any of the {} requested longitudes",
                extent.longitudes.len()
            );
        } else {
            info!(
                "Assembled {} rows; {} of {} longitudes pruned",
                table.height(),
                extent.longitudes.len() - table.pruned_lons().len(),
                extent.longitudes.len()
            );
        }
        Ok(table)
    }
}

/// Builds the climate table for `extent` with `connector`.
pub async fn build_table<C: DataConnector>(
    extent: &Extent,
    connector: &mut C,
) -> Result<ClimateTable, ClimateError> {
    Assembler::new(connector).run(extent).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::daily_series::DailySeries;
    use crate::types::provider::Provider;
    use crate::utils::days_in_year;
    use async_trait::async_trait;

    /// Grid stub that records every request and scope transition.
    #[derive(Default)]
    struct RecordingConnector {
        empty_lons: Vec<f64>,
        unavailable_years: Vec<i32>,
        /// (variable, year, lat) whose read fails as if the source went away.
        failing_read: Option<(ClimateVariable, i32, f64)>,
        requests: Vec<SeriesRequest>,
        open_scopes: usize,
        closed_scopes: usize,
    }

    #[async_trait]
    impl DataConnector for RecordingConnector {
        fn provider(&self) -> Provider {
            Provider::Silo
        }

        async fn open_scope(
            &mut self,
            _variable: ClimateVariable,
            year: i32,
        ) -> Result<(), ConnectorError> {
            if self.unavailable_years.contains(&year) {
                return Err(ConnectorError::GridNotFound(format!("{}.nc", year).into()));
            }
            self.open_scopes += 1;
            Ok(())
        }

        async fn daily_series(
            &mut self,
            request: SeriesRequest,
            _years: &YearRange,
        ) -> Result<DailySeries, ConnectorError> {
            self.requests.push(request);
            if self.failing_read == Some((request.variable, request.year, request.lat)) {
                return Err(ConnectorError::MalformedResponse {
                    url: "memory".to_string(),
                    reason: "truncated".to_string(),
                });
            }
            let days = days_in_year(request.year);
            let values = if self.empty_lons.contains(&request.lon) {
                vec![f64::NAN; days]
            } else {
                vec![request.lon - 100.0; days]
            };
            DailySeries::from_values(request, values)
        }

        async fn close_scope(&mut self) {
            self.closed_scopes += 1;
        }
    }

    fn extent(years: YearRange, lats: Vec<f64>, lons: Vec<f64>) -> Extent {
        Extent::new(
            years,
            vec![ClimateVariable::DailyRain, ClimateVariable::MaxTemp],
            CoordinateRange::new(lats),
            CoordinateRange::new(lons),
        )
    }

    #[tokio::test]
    async fn empty_longitude_is_never_queried_again() {
        let mut connector = RecordingConnector {
            empty_lons: vec![148.0],
            ..Default::default()
        };
        let extent = extent(
            YearRange::span(2010, 2011),
            vec![-35.0, -34.95],
            vec![148.0, 148.05],
        );
        let table = build_table(&extent, &mut connector).await.unwrap();

        let empty_requests = connector.requests.iter().filter(|r| r.lon == 148.0).count();
        assert_eq!(empty_requests, 1);
        assert_eq!(table.pruned_lons(), &[148.05]);
        assert_eq!(
            table.coordinates().unwrap(),
            vec![(-35.0, 148.05), (-34.95, 148.05)]
        );
        assert_eq!(table.height(), 2 * (365 + 365));
    }

    #[tokio::test]
    async fn scopes_are_always_released() {
        let mut connector = RecordingConnector {
            unavailable_years: vec![2011],
            ..Default::default()
        };
        let extent = extent(YearRange::span(2010, 2012), vec![-35.0], vec![148.0]);
        let table = build_table(&extent, &mut connector).await.unwrap();

        assert_eq!(connector.open_scopes, 4);
        assert_eq!(connector.closed_scopes, 6);
        // Unavailable grids skip the year without pruning anything.
        assert_eq!(table.pruned_lons(), &[148.0]);
        assert_eq!(table.height(), 365 + 366);
    }

    #[tokio::test]
    async fn source_failure_mid_scope_abandons_only_that_scope() {
        let mut connector = RecordingConnector {
            failing_read: Some((ClimateVariable::MaxTemp, 2010, -34.95)),
            ..Default::default()
        };
        let extent = extent(
            YearRange::span(2010, 2011),
            vec![-35.0, -34.95, -34.9],
            vec![148.0, 148.05],
        );
        let table = build_table(&extent, &mut connector).await.unwrap();

        assert_eq!(connector.open_scopes, 4);
        assert_eq!(connector.closed_scopes, connector.open_scopes);

        // The rest of the failed scope is skipped; later scopes query everything.
        let failed_scope: Vec<(f64, f64)> = connector
            .requests
            .iter()
            .filter(|r| r.variable == ClimateVariable::MaxTemp && r.year == 2010)
            .map(|r| (r.lat, r.lon))
            .collect();
        assert_eq!(failed_scope, vec![(-35.0, 148.0), (-35.0, 148.05), (-34.95, 148.0)]);
        let next_year = connector
            .requests
            .iter()
            .filter(|r| r.variable == ClimateVariable::MaxTemp && r.year == 2011)
            .count();
        assert_eq!(next_year, 6);

        assert_eq!(table.pruned_lons(), &[148.0, 148.05]);
        assert_eq!(table.height(), 3 * 2 * 365 * 2);
    }

    #[tokio::test]
    async fn unsupported_variable_aborts_before_any_request() {
        let mut connector = RecordingConnector::default();
        let extent = Extent::new(
            YearRange::single(2010),
            vec![ClimateVariable::DailyRain],
            CoordinateRange::new(vec![-35.0]),
            CoordinateRange::new(vec![148.0]),
        );

        struct PowerOnly(RecordingConnector);

        #[async_trait]
        impl DataConnector for PowerOnly {
            fn provider(&self) -> Provider {
                Provider::NasaPower
            }
            async fn open_scope(
                &mut self,
                variable: ClimateVariable,
                year: i32,
            ) -> Result<(), ConnectorError> {
                self.0.open_scope(variable, year).await
            }
            async fn daily_series(
                &mut self,
                request: SeriesRequest,
                years: &YearRange,
            ) -> Result<DailySeries, ConnectorError> {
                self.0.daily_series(request, years).await
            }
            async fn close_scope(&mut self) {
                self.0.close_scope().await
            }
        }

        let mut power = PowerOnly(RecordingConnector::default());
        let extent_vp = Extent {
            variables: vec![ClimateVariable::VapourPressure],
            ..extent.clone()
        };
        let err = build_table(&extent_vp, &mut power).await.unwrap_err();
        assert!(matches!(
            err,
            ClimateError::Connector(ConnectorError::UnsupportedVariable { .. })
        ));
        assert!(power.0.requests.is_empty());

        // The same extent with a supported variable runs fine.
        let table = build_table(&extent, &mut connector).await.unwrap();
        assert_eq!(table.height(), 365);
    }
}
