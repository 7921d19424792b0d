use crate::connectors::error::ConnectorError;
use crate::renderers::error::RenderError;
use crate::resolver::error::ResolveError;
use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClimateError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Connector(#[from] ConnectorError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("No data was found for any requested coordinate")]
    EmptyResult,

    #[error("Extraction was interrupted")]
    Interrupted,

    #[error("Failed to assemble climate table")]
    DataFrame(#[from] PolarsError),

    #[error("Failed to create directory '{0}'")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Extraction worker failed")]
    WorkerFailed(#[source] tokio::task::JoinError),
}
