use crate::resolver::error::ResolveError;
use crate::types::provider::Provider;
use crate::utils::round_to;
use polars::prelude::*;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Decimal places kept on generated grid coordinates.
const COORDINATE_DECIMALS: i32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    pub fn name(&self) -> &'static str {
        match self {
            Axis::Latitude => "latitude",
            Axis::Longitude => "longitude",
        }
    }

    fn bounds(&self) -> (f64, f64) {
        match self {
            Axis::Latitude => (-90.0, 90.0),
            Axis::Longitude => (-180.0, 360.0),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// How the user described the coordinates along one axis.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordinateSpec {
    Single(f64),
    /// Two endpoints, walked at the provider's grid step.
    Span(f64, f64),
    /// Explicit values, typically read from a file. Never snapped.
    List(Vec<f64>),
}

impl CoordinateSpec {
    /// Reads a headerless single-column file with one coordinate per line.
    pub fn from_file(path: &Path) -> Result<Self, ResolveError> {
        let to_err = |e| ResolveError::CoordinateFile(path.to_path_buf(), e);

        let df = CsvReadOptions::default()
            .with_has_header(false)
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(to_err)?
            .finish()
            .map_err(to_err)?;

        let Some(first) = df.get_columns().first() else {
            return Err(ResolveError::EmptyCoordinateFile(path.to_path_buf()));
        };
        let column = first.cast(&DataType::Float64).map_err(to_err)?;
        let values: Vec<f64> = column.f64().map_err(to_err)?.into_iter().flatten().collect();

        if values.is_empty() {
            return Err(ResolveError::EmptyCoordinateFile(path.to_path_buf()));
        }
        Ok(CoordinateSpec::List(values))
    }
}

impl FromStr for CoordinateSpec {
    type Err = ResolveError;

    /// Whitespace separated: one value, two span endpoints, or more values as a list.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let values = s
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|source| ResolveError::InvalidNumber {
                        input: token.to_string(),
                        source,
                    })
            })
            .collect::<Result<Vec<f64>, _>>()?;

        match values.as_slice() {
            [] => Err(ResolveError::EmptySpec("coordinate")),
            [single] => Ok(CoordinateSpec::Single(*single)),
            [start, end] => Ok(CoordinateSpec::Span(*start, *end)),
            _ => Ok(CoordinateSpec::List(values)),
        }
    }
}

/// Resolved coordinate values along one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateRange(Vec<f64>);

impl CoordinateRange {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.iter().copied()
    }
}

/// Resolves a coordinate spec into concrete values for `provider`'s grid.
pub fn resolve_coordinates(
    spec: &CoordinateSpec,
    axis: Axis,
    provider: Provider,
) -> Result<CoordinateRange, ResolveError> {
    let values = match spec {
        CoordinateSpec::Single(value) => vec![check_bounds(*value, axis)?],
        CoordinateSpec::Span(start, end) => {
            // Endpoints are checked first: the walk allocates one value per step.
            let (start, end) = (check_bounds(*start, axis)?, check_bounds(*end, axis)?);
            resolve_span(start, end, provider.grid_step())
        }
        CoordinateSpec::List(values) => values
            .iter()
            .map(|value| check_bounds(*value, axis))
            .collect::<Result<Vec<f64>, _>>()?,
    };

    if values.is_empty() {
        return Err(ResolveError::EmptySpec(axis.name()));
    }

    log::debug!("Resolved {} {} values for {}", values.len(), axis, provider);
    Ok(CoordinateRange(values))
}

fn check_bounds(value: f64, axis: Axis) -> Result<f64, ResolveError> {
    let (min, max) = axis.bounds();
    if value.is_finite() && (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ResolveError::OutOfRange {
            axis: axis.name(),
            value,
            min,
            max,
        })
    }
}

/// Walks `start..=end` in `step` increments, always yielding
/// `round(|end - start| / step) + 1` values.
///
/// Endpoints given in descending order are swapped. Plain float stepping
/// regularly lands one element short or long over real-world spans, so when
/// the exclusive walk has the wrong length it is redone with an inclusive
/// upper bound and trimmed to the expected count. Non-finite endpoints or a
/// non-positive step yield no values.
pub fn resolve_span(start: f64, end: f64, step: f64) -> Vec<f64> {
    if !(start.is_finite() && end.is_finite() && step.is_finite() && step > 0.0) {
        return Vec::new();
    }
    let (first, last) = if start > end {
        (end, start)
    } else {
        (start, end)
    };

    let expected = ((last - first).abs() / step).round() as usize + 1;
    let mut values = arange(first, last, step);

    if values.len() != expected {
        values = arange(first, round_to(last + step, COORDINATE_DECIMALS), step);
        values.truncate(expected);
    }
    values
}

/// Half-open `[start, stop)` walk with `ceil((stop - start) / step)` elements.
fn arange(start: f64, stop: f64, step: f64) -> Vec<f64> {
    let count = ((stop - start) / step).ceil().max(0.0) as usize;
    (0..count)
        .map(|i| round_to(start + i as f64 * step, COORDINATE_DECIMALS))
        .collect()
}
