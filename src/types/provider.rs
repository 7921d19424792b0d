//! The two climate data providers and their grid characteristics.

use crate::resolver::error::ResolveError;
use std::fmt;
use std::str::FromStr;

/// A remote source of gridded daily climate data.
///
/// The provider is chosen once per run; it decides which connector is built
/// and which grid step the coordinate resolver snaps spans to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Provider {
    /// SILO (Scientific Information for Land Owners), Australia only.
    /// Served as one netCDF grid per variable and year.
    #[default]
    Silo,
    /// NASA POWER, world wide. Served as point queries over a REST API.
    NasaPower,
}

impl Provider {
    pub fn name(&self) -> &'static str {
        match self {
            Provider::Silo => "silo",
            Provider::NasaPower => "nasapower",
        }
    }

    /// Step in decimal degrees between consecutive values of a resolved span.
    ///
    /// NASA POWER serves a 0.5° grid but spans are walked in whole degrees,
    /// so any two requested points within the same 0.5° box yield the same data.
    pub fn grid_step(&self) -> f64 {
        match self {
            Provider::Silo => 0.05,
            Provider::NasaPower => 1.0,
        }
    }

    /// Attribution line written into rendered file headers.
    pub fn attribution(&self) -> &'static str {
        match self {
            Provider::Silo => {
                "SILO (Scientific Information for Land Owners) (https://www.longpaddock.qld.gov.au/silo/)"
            }
            Provider::NasaPower => "NASA POWER (https://power.larc.nasa.gov/)",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Provider {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "silo" => Ok(Provider::Silo),
            "nasapower" | "nasa-power" | "nasa_power" => Ok(Provider::NasaPower),
            other => Err(ResolveError::UnknownProvider(other.to_string())),
        }
    }
}
