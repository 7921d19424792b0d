//! Data connectors: one contract, two backends.

pub mod error;
pub mod grid;
pub mod nasa_power;
pub mod power_response;
pub mod silo_archive;

use crate::connectors::error::ConnectorError;
use crate::connectors::nasa_power::NasaPowerConnector;
use crate::connectors::silo_archive::SiloArchiveConnector;
use crate::resolver::years::YearRange;
use crate::types::daily_series::{DailySeries, SeriesRequest};
use crate::types::provider::Provider;
use crate::types::variable::ClimateVariable;
use async_trait::async_trait;

/// Source of daily series for (lat, lon, year, variable) requests.
///
/// The assembler drives a connector through one scope per (variable, year):
/// [`open_scope`](DataConnector::open_scope), any number of
/// [`daily_series`](DataConnector::daily_series) calls, then
/// [`close_scope`](DataConnector::close_scope), which is always called, even
/// after failed extractions.
#[async_trait]
pub trait DataConnector: Send {
    fn provider(&self) -> Provider;

    /// Validates the requested variables before any I/O.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::UnsupportedVariable`] for a variable the provider does not serve.
    fn prepare(&mut self, variables: &[ClimateVariable]) -> Result<(), ConnectorError> {
        let provider = self.provider();
        match variables.iter().find(|v| !v.is_supported_by(provider)) {
            Some(variable) => Err(ConnectorError::UnsupportedVariable {
                variable: *variable,
                provider,
            }),
            None => Ok(()),
        }
    }

    async fn open_scope(&mut self, variable: ClimateVariable, year: i32)
        -> Result<(), ConnectorError>;

    /// `years` is the full span of the run; point providers may fetch all of it at once.
    async fn daily_series(
        &mut self,
        request: SeriesRequest,
        years: &YearRange,
    ) -> Result<DailySeries, ConnectorError>;

    async fn close_scope(&mut self);
}

/// The connector chosen for a run.
pub enum Connector {
    Archive(SiloArchiveConnector),
    Api(NasaPowerConnector),
}

#[async_trait]
impl DataConnector for Connector {
    fn provider(&self) -> Provider {
        match self {
            Connector::Archive(c) => c.provider(),
            Connector::Api(c) => c.provider(),
        }
    }

    fn prepare(&mut self, variables: &[ClimateVariable]) -> Result<(), ConnectorError> {
        match self {
            Connector::Archive(c) => c.prepare(variables),
            Connector::Api(c) => c.prepare(variables),
        }
    }

    async fn open_scope(
        &mut self,
        variable: ClimateVariable,
        year: i32,
    ) -> Result<(), ConnectorError> {
        match self {
            Connector::Archive(c) => c.open_scope(variable, year).await,
            Connector::Api(c) => c.open_scope(variable, year).await,
        }
    }

    async fn daily_series(
        &mut self,
        request: SeriesRequest,
        years: &YearRange,
    ) -> Result<DailySeries, ConnectorError> {
        match self {
            Connector::Archive(c) => c.daily_series(request, years).await,
            Connector::Api(c) => c.daily_series(request, years).await,
        }
    }

    async fn close_scope(&mut self) {
        match self {
            Connector::Archive(c) => c.close_scope().await,
            Connector::Api(c) => c.close_scope().await,
        }
    }
}

/// Builds a fresh connector per worker. Connectors hold per-instance caches
/// and open grids, so workers never share one.
pub trait ConnectorFactory: Send + Sync + 'static {
    type Connector: DataConnector + 'static;

    fn connector(&self) -> Self::Connector;
}

impl<F, C> ConnectorFactory for F
where
    F: Fn() -> C + Send + Sync + 'static,
    C: DataConnector + 'static,
{
    type Connector = C;

    fn connector(&self) -> C {
        self()
    }
}
