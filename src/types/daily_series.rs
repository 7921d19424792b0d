//! One year of daily values for a single grid cell and variable.

use crate::connectors::error::ConnectorError;
use crate::types::variable::ClimateVariable;
use crate::utils::{days_in_year, round_to};
use std::fmt;

/// Identifies one (lat, lon, year, variable) extraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesRequest {
    pub lat: f64,
    pub lon: f64,
    pub year: i32,
    pub variable: ClimateVariable,
}

impl SeriesRequest {
    pub fn new(lat: f64, lon: f64, year: i32, variable: ClimateVariable) -> Self {
        Self {
            lat,
            lon,
            year,
            variable,
        }
    }
}

impl fmt::Display for SeriesRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at lat {} lon {} for {}",
            self.variable, self.lat, self.lon, self.year
        )
    }
}

/// Daily values ordered by Julian day, starting at day 1.
///
/// A series is either fully populated (365 or 366 values) or it is not built
/// at all: missing data is all-or-nothing per grid cell and year, so only the
/// second day is inspected when deciding whether the cell has data. Values are
/// rounded to one decimal and never change after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySeries {
    request: SeriesRequest,
    values: Vec<f64>,
}

impl DailySeries {
    /// Builds a series from raw provider values, which may carry NaN for missing days.
    ///
    /// # Errors
    ///
    /// * [`ConnectorError::NoDataAtCoordinate`] if the sentinel day (day 2) is missing.
    /// * [`ConnectorError::SeriesLength`] if the value count does not match the year length.
    pub fn from_values(request: SeriesRequest, values: Vec<f64>) -> Result<Self, ConnectorError> {
        match values.get(1) {
            Some(sentinel) if !sentinel.is_nan() => {}
            _ => return Err(ConnectorError::NoDataAtCoordinate { request }),
        }

        let expected = days_in_year(request.year);
        if values.len() != expected {
            return Err(ConnectorError::SeriesLength {
                request,
                expected,
                found: values.len(),
            });
        }

        Ok(Self {
            request,
            values: values.into_iter().map(|v| round_to(v, 1)).collect(),
        })
    }

    pub fn request(&self) -> &SeriesRequest {
        &self.request
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// `(julian_day, value)` pairs, day numbering starting at 1.
    pub fn days(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, v)| (i as i32 + 1, *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(year: i32) -> SeriesRequest {
        SeriesRequest::new(-35.0, 148.0, year, ClimateVariable::DailyRain)
    }

    #[test]
    fn builds_full_year_and_rounds() {
        let values: Vec<f64> = (0..365).map(|i| i as f64 + 0.04).collect();
        let series = DailySeries::from_values(request(2010), values).unwrap();
        assert_eq!(series.len(), 365);
        assert_eq!(series.values()[3], 3.0);
        let days: Vec<i32> = series.days().map(|(d, _)| d).collect();
        assert_eq!(days.first(), Some(&1));
        assert_eq!(days.last(), Some(&365));
    }

    #[test]
    fn leap_year_needs_366_values() {
        let series = DailySeries::from_values(request(2020), vec![1.0; 366]).unwrap();
        assert_eq!(series.len(), 366);
        assert_eq!(series.days().last().map(|(d, _)| d), Some(366));

        let err = DailySeries::from_values(request(2020), vec![1.0; 365]).unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::SeriesLength {
                expected: 366,
                found: 365,
                ..
            }
        ));
    }

    #[test]
    fn missing_sentinel_day_means_no_data() {
        let mut values = vec![2.5; 365];
        values[1] = f64::NAN;
        let err = DailySeries::from_values(request(2010), values).unwrap_err();
        assert!(err.is_no_data());
    }

    #[test]
    fn sentinel_check_ignores_other_missing_days() {
        // Only day 2 decides; a NaN elsewhere passes through untouched.
        let mut values = vec![2.5; 365];
        values[0] = f64::NAN;
        let series = DailySeries::from_values(request(2010), values).unwrap();
        assert!(series.values()[0].is_nan());
    }

    #[test]
    fn empty_input_means_no_data() {
        let err = DailySeries::from_values(request(2010), Vec::new()).unwrap_err();
        assert!(err.is_no_data());
    }
}
