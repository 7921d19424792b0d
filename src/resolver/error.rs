use polars::error::PolarsError;
use std::num::{ParseFloatError, ParseIntError};
use std::path::PathBuf;
use thiserror::Error;

/// Malformed request specs. Fatal: raised before any I/O happens.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("Empty {0} specification")]
    EmptySpec(&'static str),

    #[error("'{input}' is not a valid coordinate")]
    InvalidNumber {
        input: String,
        #[source]
        source: ParseFloatError,
    },

    #[error("'{input}' is not a valid year")]
    InvalidYear {
        input: String,
        #[source]
        source: ParseIntError,
    },

    #[error("Year range '{0}' must look like 'YYYY' or 'YYYY-YYYY'")]
    InvalidYearRange(String),

    #[error("Year {year} is outside the supported calendar [{min}, {max}]")]
    YearOutOfRange { year: i32, min: i32, max: i32 },

    #[error("{axis} value {value} is outside [{min}, {max}]")]
    OutOfRange {
        axis: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Unknown climate variable '{0}'")]
    UnknownVariable(String),

    #[error("Unknown data provider '{0}', expected 'silo' or 'nasapower'")]
    UnknownProvider(String),

    #[error("Failed to read coordinate file '{0}'")]
    CoordinateFile(PathBuf, #[source] PolarsError),

    #[error("Coordinate file '{0}' contains no values")]
    EmptyCoordinateFile(PathBuf),
}
