mod assembler;
mod connectors;
mod error;
mod extractor;
mod renderers;
mod resolver;
mod types;
mod utils;

pub use error::ClimateError;
pub use extractor::*;

pub use assembler::parallel::{
    build_table_parallel, build_table_partitioned, partition, partition_axis, PartitionAxis,
};
pub use assembler::table::{ClimateTable, RowBuffer, CANONICAL_VARIABLES, KEY_COLUMNS};
pub use assembler::{build_table, Assembler, Extent};

pub use connectors::error::{ConnectorError, ErrorKind};
pub use connectors::grid::{CellReader, GridHandle, NetcdfGrid};
pub use connectors::nasa_power::{
    HttpPowerTransport, NasaPowerConnector, PowerQuery, PowerTransport, POWER_API_URL,
};
pub use connectors::power_response::{DatedValues, PowerData};
pub use connectors::silo_archive::{ArchiveSource, SiloArchiveConnector, SILO_ARCHIVE_URL};
pub use connectors::{Connector, ConnectorFactory, DataConnector};

pub use renderers::error::RenderError;
pub use renderers::summary::{temperature_summary, TemperatureSummary};
pub use renderers::{format_coordinate, render, CoordinateRows, OutputFormat, RenderContext};

pub use resolver::coordinates::{
    resolve_coordinates, resolve_span, Axis, CoordinateRange, CoordinateSpec,
};
pub use resolver::error::ResolveError;
pub use resolver::years::{resolve_years, YearRange};

pub use types::daily_series::{DailySeries, SeriesRequest};
pub use types::provider::Provider;
pub use types::variable::ClimateVariable;

pub use utils::{days_in_year, default_download_dir, is_leap_year};
