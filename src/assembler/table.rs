//! The canonical climate table and the row buffer it is built from.

use crate::error::ClimateError;
use crate::types::daily_series::DailySeries;
use crate::types::variable::ClimateVariable;
use ordered_float::OrderedFloat;
use polars::prelude::*;
use std::collections::BTreeSet;

/// Key columns, in output order.
pub const KEY_COLUMNS: [&str; 4] = ["lon", "lat", "year", "day"];

/// Variable columns every table carries, whether requested or not.
pub const CANONICAL_VARIABLES: [ClimateVariable; 4] = [
    ClimateVariable::Radiation,
    ClimateVariable::MaxTemp,
    ClimateVariable::MinTemp,
    ClimateVariable::DailyRain,
];

/// Append-only long-form rows: one per (lon, lat, year, day, variable).
#[derive(Debug, Default)]
pub struct RowBuffer {
    lon: Vec<f64>,
    lat: Vec<f64>,
    year: Vec<i32>,
    day: Vec<i32>,
    variable: Vec<&'static str>,
    value: Vec<f64>,
}

impl RowBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_series(&mut self, series: &DailySeries) {
        let request = series.request();
        let name = request.variable.name();
        let additional = series.len();
        self.lon.reserve(additional);
        self.lat.reserve(additional);
        self.year.reserve(additional);
        self.day.reserve(additional);
        self.variable.reserve(additional);
        self.value.reserve(additional);

        for (day, value) in series.days() {
            self.lon.push(request.lon);
            self.lat.push(request.lat);
            self.year.push(request.year);
            self.day.push(day);
            self.variable.push(name);
            self.value.push(value);
        }
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Drops every row whose longitude is in `lons`.
    pub fn remove_lons(&mut self, lons: &BTreeSet<OrderedFloat<f64>>) {
        if lons.is_empty() {
            return;
        }
        let keep: Vec<bool> = self
            .lon
            .iter()
            .map(|lon| !lons.contains(&OrderedFloat(*lon)))
            .collect();
        retain_by(&mut self.lon, &keep);
        retain_by(&mut self.lat, &keep);
        retain_by(&mut self.year, &keep);
        retain_by(&mut self.day, &keep);
        retain_by(&mut self.variable, &keep);
        retain_by(&mut self.value, &keep);
    }

    /// Joins the per-variable rows into one wide row per (lon, lat, year, day).
    ///
    /// Columns: `lon, lat, year, day, radn, maxt, mint, rain`, followed by any
    /// other requested variable under its own name. Canonical columns that were
    /// not requested are all null.
    pub fn into_frame(self, variables: &[ClimateVariable]) -> PolarsResult<DataFrame> {
        let long = df!(
            "lon" => self.lon,
            "lat" => self.lat,
            "year" => self.year,
            "day" => self.day,
            "variable" => self.variable,
            "value" => self.value,
        )?;

        let mut aggregations = Vec::new();
        let mut order: Vec<Expr> = KEY_COLUMNS.iter().map(|c| col(*c)).collect();
        for variable in ordered_variables(variables) {
            let column = variable.column_name();
            if variables.contains(&variable) {
                let is_variable = col("variable").eq(lit(variable.name()));
                aggregations.push(
                    when(is_variable.clone().any(true))
                        .then(col("value").filter(is_variable).sum())
                        .otherwise(lit(NULL).cast(DataType::Float64))
                        .alias(column),
                );
                order.push(col(column));
            } else {
                order.push(lit(NULL).cast(DataType::Float64).alias(column));
            }
        }

        long.lazy()
            .group_by(KEY_COLUMNS.map(col))
            .agg(aggregations)
            .select(order)
            .sort(KEY_COLUMNS, SortMultipleOptions::default())
            .collect()
    }
}

fn retain_by<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut flags = keep.iter();
    values.retain(|_| flags.next().copied().unwrap_or(false));
}

/// Canonical variables first, then the remaining requested ones in request order.
fn ordered_variables(variables: &[ClimateVariable]) -> Vec<ClimateVariable> {
    let mut ordered = CANONICAL_VARIABLES.to_vec();
    for variable in variables {
        if !ordered.contains(variable) {
            ordered.push(*variable);
        }
    }
    ordered
}

/// The assembled dataset: one wide row per coordinate, year and day, plus the
/// longitudes that kept their data.
#[derive(Debug, Clone)]
pub struct ClimateTable {
    frame: DataFrame,
    pruned_lons: Vec<f64>,
}

impl ClimateTable {
    pub fn new(frame: DataFrame, pruned_lons: Vec<f64>) -> Self {
        Self { frame, pruned_lons }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn into_frame(self) -> DataFrame {
        self.frame
    }

    /// Requested longitudes that never came back empty.
    pub fn pruned_lons(&self) -> &[f64] {
        &self.pruned_lons
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    pub fn is_empty(&self) -> bool {
        self.frame.height() == 0
    }

    /// # Errors
    ///
    /// [`ClimateError::EmptyResult`] when no coordinate produced any data.
    pub fn ensure_not_empty(self) -> Result<Self, ClimateError> {
        if self.is_empty() {
            Err(ClimateError::EmptyResult)
        } else {
            Ok(self)
        }
    }

    /// Distinct (lat, lon) pairs with rows, ordered by latitude then longitude.
    pub fn coordinates(&self) -> PolarsResult<Vec<(f64, f64)>> {
        let lats = self.frame.column("lat")?.f64()?;
        let lons = self.frame.column("lon")?.f64()?;
        let pairs: BTreeSet<(OrderedFloat<f64>, OrderedFloat<f64>)> = lats
            .into_iter()
            .zip(lons)
            .filter_map(|(lat, lon)| Some((OrderedFloat(lat?), OrderedFloat(lon?))))
            .collect();
        Ok(pairs.into_iter().map(|(lat, lon)| (lat.0, lon.0)).collect())
    }

    /// Rows of one coordinate, ordered by year and day.
    pub fn coordinate(&self, lat: f64, lon: f64) -> PolarsResult<DataFrame> {
        self.frame
            .clone()
            .lazy()
            .filter(col("lat").eq(lit(lat)).and(col("lon").eq(lit(lon))))
            .sort(["year", "day"], SortMultipleOptions::default())
            .collect()
    }

    /// Row union of several tables, with the union of their retained longitudes.
    pub fn merge(tables: Vec<ClimateTable>) -> PolarsResult<ClimateTable> {
        let mut lons: BTreeSet<OrderedFloat<f64>> = BTreeSet::new();
        let mut frame: Option<DataFrame> = None;
        for table in tables {
            lons.extend(table.pruned_lons.iter().copied().map(OrderedFloat));
            frame = Some(match frame {
                Some(acc) => acc.vstack(&table.frame)?,
                None => table.frame,
            });
        }

        let frame = match frame {
            Some(frame) => frame
                .lazy()
                .sort(KEY_COLUMNS, SortMultipleOptions::default())
                .collect()?,
            None => RowBuffer::new().into_frame(&[])?,
        };
        Ok(ClimateTable::new(
            frame,
            lons.into_iter().map(|lon| lon.0).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::daily_series::SeriesRequest;

    fn series(lat: f64, lon: f64, year: i32, variable: ClimateVariable, value: f64) -> DailySeries {
        let days = crate::utils::days_in_year(year);
        DailySeries::from_values(SeriesRequest::new(lat, lon, year, variable), vec![value; days])
            .unwrap()
    }

    #[test]
    fn joins_variables_into_wide_rows() {
        let mut buffer = RowBuffer::new();
        buffer.push_series(&series(-35.0, 148.0, 2010, ClimateVariable::DailyRain, 1.5));
        buffer.push_series(&series(-35.0, 148.0, 2010, ClimateVariable::MaxTemp, 25.0));
        assert_eq!(buffer.len(), 730);

        let frame = buffer
            .into_frame(&[ClimateVariable::DailyRain, ClimateVariable::MaxTemp])
            .unwrap();
        assert_eq!(frame.height(), 365);
        let names: Vec<&str> = frame.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["lon", "lat", "year", "day", "radn", "maxt", "mint", "rain"]
        );
        let rain = frame.column("rain").unwrap().f64().unwrap();
        assert_eq!(rain.get(0), Some(1.5));
        let radn = frame.column("radn").unwrap().f64().unwrap();
        assert_eq!(radn.null_count(), 365);
        let days = frame.column("day").unwrap().i32().unwrap();
        assert_eq!(days.get(0), Some(1));
        assert_eq!(days.get(364), Some(365));
    }

    #[test]
    fn extra_variables_follow_canonical_columns() {
        let mut buffer = RowBuffer::new();
        buffer.push_series(&series(-35.0, 148.0, 2010, ClimateVariable::VapourPressure, 12.0));
        let frame = buffer.into_frame(&[ClimateVariable::VapourPressure]).unwrap();
        let names: Vec<&str> = frame.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(
            names,
            vec!["lon", "lat", "year", "day", "radn", "maxt", "mint", "rain", "vp"]
        );
    }

    #[test]
    fn removed_lons_leave_no_rows() {
        let mut buffer = RowBuffer::new();
        buffer.push_series(&series(-35.0, 148.0, 2010, ClimateVariable::DailyRain, 1.0));
        buffer.push_series(&series(-35.0, 148.05, 2010, ClimateVariable::DailyRain, 2.0));
        buffer.remove_lons(&BTreeSet::from([OrderedFloat(148.0)]));
        assert_eq!(buffer.len(), 365);

        let table = ClimateTable::new(
            buffer.into_frame(&[ClimateVariable::DailyRain]).unwrap(),
            vec![148.05],
        );
        assert_eq!(table.coordinates().unwrap(), vec![(-35.0, 148.05)]);
    }

    #[test]
    fn empty_buffer_gives_empty_table() {
        let frame = RowBuffer::new()
            .into_frame(&[ClimateVariable::DailyRain])
            .unwrap();
        let table = ClimateTable::new(frame, Vec::new());
        assert!(table.is_empty());
        assert!(matches!(
            table.ensure_not_empty(),
            Err(ClimateError::EmptyResult)
        ));
    }

    #[test]
    fn merge_unions_rows_and_lons() {
        let variables = [ClimateVariable::MinTemp];
        let mut first = RowBuffer::new();
        first.push_series(&series(-35.0, 148.05, 2010, ClimateVariable::MinTemp, 5.0));
        let mut second = RowBuffer::new();
        second.push_series(&series(-34.95, 148.0, 2010, ClimateVariable::MinTemp, 6.0));

        let merged = ClimateTable::merge(vec![
            ClimateTable::new(first.into_frame(&variables).unwrap(), vec![148.05]),
            ClimateTable::new(second.into_frame(&variables).unwrap(), vec![148.0]),
        ])
        .unwrap();
        assert_eq!(merged.height(), 730);
        assert_eq!(merged.pruned_lons(), &[148.0, 148.05]);
        let first_lon = merged.frame().column("lon").unwrap().f64().unwrap().get(0);
        assert_eq!(first_lon, Some(148.0));

        let cell = merged.coordinate(-35.0, 148.05).unwrap();
        assert_eq!(cell.height(), 365);
    }
}
