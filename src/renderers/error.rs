use polars::prelude::PolarsError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Unknown output format '{0}', expected one of met, wth, csv, stdout")]
    UnknownFormat(String),

    #[error("Failed to prepare output directory '{0}'")]
    OutputDir(PathBuf, #[source] std::io::Error),

    #[error("Failed to write '{0}'")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Failed to print the climate table")]
    Print(#[source] std::io::Error),

    #[error("Failed to write CSV '{0}'")]
    Csv(PathBuf, #[source] PolarsError),

    #[error("Failed to read rows from the climate table")]
    Table(#[from] PolarsError),

    #[error("Render task failed to complete")]
    TaskJoin(#[from] tokio::task::JoinError),
}
