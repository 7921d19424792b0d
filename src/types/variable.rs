//! Climate variables and their provider-specific identifiers.

use crate::resolver::error::ResolveError;
use crate::types::provider::Provider;
use std::fmt;
use std::str::FromStr;

/// A daily climate quantity that can be requested from a provider.
///
/// The user-facing name (e.g. `daily_rain`) is the SILO variable name; each
/// provider has its own short code for it. SILO knows every variable, NASA POWER
/// only serves rain, the two temperature extremes and radiation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClimateVariable {
    DailyRain,
    MonthlyRain,
    MaxTemp,
    MinTemp,
    VapourPressure,
    VapourPressureDeficit,
    EvapPan,
    EvapSynthetic,
    EvapCombination,
    Radiation,
    RelativeHumidityAtTmax,
    RelativeHumidityAtTmin,
    EtShortCrop,
    EtTallCrop,
    EtMortonActual,
    EtMortonPotential,
    EtMortonWet,
    MeanSeaLevelPressure,
}

impl ClimateVariable {
    pub const ALL: [ClimateVariable; 18] = [
        ClimateVariable::DailyRain,
        ClimateVariable::MonthlyRain,
        ClimateVariable::MaxTemp,
        ClimateVariable::MinTemp,
        ClimateVariable::VapourPressure,
        ClimateVariable::VapourPressureDeficit,
        ClimateVariable::EvapPan,
        ClimateVariable::EvapSynthetic,
        ClimateVariable::EvapCombination,
        ClimateVariable::Radiation,
        ClimateVariable::RelativeHumidityAtTmax,
        ClimateVariable::RelativeHumidityAtTmin,
        ClimateVariable::EtShortCrop,
        ClimateVariable::EtTallCrop,
        ClimateVariable::EtMortonActual,
        ClimateVariable::EtMortonPotential,
        ClimateVariable::EtMortonWet,
        ClimateVariable::MeanSeaLevelPressure,
    ];

    /// The user-facing name, also the variable name inside SILO grids
    /// and the directory name in the SILO bucket.
    pub fn name(&self) -> &'static str {
        match self {
            ClimateVariable::DailyRain => "daily_rain",
            ClimateVariable::MonthlyRain => "monthly_rain",
            ClimateVariable::MaxTemp => "max_temp",
            ClimateVariable::MinTemp => "min_temp",
            ClimateVariable::VapourPressure => "vp",
            ClimateVariable::VapourPressureDeficit => "vp_deficit",
            ClimateVariable::EvapPan => "evap_pan",
            ClimateVariable::EvapSynthetic => "evap_syn",
            ClimateVariable::EvapCombination => "evap_comb",
            ClimateVariable::Radiation => "radiation",
            ClimateVariable::RelativeHumidityAtTmax => "rh_tmax",
            ClimateVariable::RelativeHumidityAtTmin => "rh_tmin",
            ClimateVariable::EtShortCrop => "et_short_crop",
            ClimateVariable::EtTallCrop => "et_tall_crop",
            ClimateVariable::EtMortonActual => "et_morton_actual",
            ClimateVariable::EtMortonPotential => "et_morton_potential",
            ClimateVariable::EtMortonWet => "et_morton_wet",
            ClimateVariable::MeanSeaLevelPressure => "mslp",
        }
    }

    /// SILO single-letter code. `daily_rain` and `monthly_rain` share `R`.
    pub fn silo_code(&self) -> char {
        match self {
            ClimateVariable::DailyRain => 'R',
            ClimateVariable::MonthlyRain => 'R',
            ClimateVariable::MaxTemp => 'X',
            ClimateVariable::MinTemp => 'N',
            ClimateVariable::VapourPressure => 'V',
            ClimateVariable::VapourPressureDeficit => 'D',
            ClimateVariable::EvapPan => 'E',
            ClimateVariable::EvapSynthetic => 'S',
            ClimateVariable::EvapCombination => 'C',
            ClimateVariable::Radiation => 'J',
            ClimateVariable::RelativeHumidityAtTmax => 'H',
            ClimateVariable::RelativeHumidityAtTmin => 'G',
            ClimateVariable::EtShortCrop => 'F',
            ClimateVariable::EtTallCrop => 'T',
            ClimateVariable::EtMortonActual => 'A',
            ClimateVariable::EtMortonPotential => 'P',
            ClimateVariable::EtMortonWet => 'W',
            ClimateVariable::MeanSeaLevelPressure => 'M',
        }
    }

    /// NASA POWER parameter code, `None` when the API does not serve the variable.
    pub fn power_code(&self) -> Option<&'static str> {
        match self {
            ClimateVariable::DailyRain => Some("PRECTOT"),
            ClimateVariable::MaxTemp => Some("T2M_MAX"),
            ClimateVariable::MinTemp => Some("T2M_MIN"),
            ClimateVariable::Radiation => Some("ALLSKY_SFC_SW_DWN"),
            _ => None,
        }
    }

    pub fn from_power_code(code: &str) -> Option<ClimateVariable> {
        ClimateVariable::ALL
            .into_iter()
            .find(|v| v.power_code() == Some(code))
    }

    /// Provider code as a string, `None` when the provider does not serve the variable.
    pub fn code_for(&self, provider: Provider) -> Option<String> {
        match provider {
            Provider::Silo => Some(self.silo_code().to_string()),
            Provider::NasaPower => self.power_code().map(str::to_string),
        }
    }

    pub fn is_supported_by(&self, provider: Provider) -> bool {
        self.code_for(provider).is_some()
    }

    /// Column name in the canonical table. The four crop-model drivers get their
    /// short names; everything else keeps the provider-native name.
    pub fn column_name(&self) -> &'static str {
        match self {
            ClimateVariable::DailyRain => "rain",
            ClimateVariable::MaxTemp => "maxt",
            ClimateVariable::MinTemp => "mint",
            ClimateVariable::Radiation => "radn",
            other => other.name(),
        }
    }
}

impl fmt::Display for ClimateVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ClimateVariable {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ClimateVariable::ALL
            .into_iter()
            .find(|v| v.name() == wanted)
            .ok_or_else(|| ResolveError::UnknownVariable(wanted.to_string()))
    }
}
