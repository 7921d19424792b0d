use crate::types::daily_series::SeriesRequest;
use crate::types::provider::Provider;
use crate::types::variable::ClimateVariable;
use std::path::PathBuf;
use thiserror::Error;

/// How the assembler reacts to a connector failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is invalid for the provider. Aborts the run.
    Configuration,
    /// The grid object or endpoint for a (variable, year) cannot be used.
    /// That (variable, year) is skipped; coordinates are not pruned.
    SourceUnavailable,
    /// The cell has no data. The longitude is pruned for the rest of the run.
    NoData,
}

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Variable '{variable}' is not served by {provider}")]
    UnsupportedVariable {
        variable: ClimateVariable,
        provider: Provider,
    },

    #[error("Grid file '{0}' does not exist")]
    GridNotFound(PathBuf),

    #[error("Failed to open grid '{resource}'")]
    GridOpen {
        resource: String,
        #[source]
        source: netcdf::Error,
    },

    #[error("Failed to read '{name}' from grid '{resource}'")]
    GridRead {
        resource: String,
        name: String,
        #[source]
        source: netcdf::Error,
    },

    #[error("Grid '{resource}' has no variable '{name}'")]
    MissingGridVariable { resource: String, name: String },

    #[error("Network request failed for {0}")]
    NetworkRequest(String, #[source] reqwest::Error),

    #[error("HTTP request failed for {url} with status {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to store download at '{0}'")]
    DownloadIo(PathBuf, #[source] std::io::Error),

    #[error("Malformed response from {url}: {reason}")]
    MalformedResponse { url: String, reason: String },

    #[error("Background task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),

    #[error("No data for {request}")]
    NoDataAtCoordinate { request: SeriesRequest },

    #[error("Expected {expected} daily values for {request}, found {found}")]
    SeriesLength {
        request: SeriesRequest,
        expected: usize,
        found: usize,
    },
}

impl ConnectorError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectorError::UnsupportedVariable { .. } => ErrorKind::Configuration,
            ConnectorError::NoDataAtCoordinate { .. } | ConnectorError::SeriesLength { .. } => {
                ErrorKind::NoData
            }
            ConnectorError::GridNotFound(_)
            | ConnectorError::GridOpen { .. }
            | ConnectorError::GridRead { .. }
            | ConnectorError::MissingGridVariable { .. }
            | ConnectorError::NetworkRequest(..)
            | ConnectorError::HttpStatus { .. }
            | ConnectorError::DownloadIo(..)
            | ConnectorError::MalformedResponse { .. }
            | ConnectorError::TaskJoin(_) => ErrorKind::SourceUnavailable,
        }
    }

    pub fn is_no_data(&self) -> bool {
        self.kind() == ErrorKind::NoData
    }
}
