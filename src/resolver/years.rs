use crate::resolver::error::ResolveError;
use chrono::{Datelike, NaiveDate};
use std::str::FromStr;

const YEAR_SEPARATOR: char = '-';

/// Years the day-of-year arithmetic can represent.
fn supported_years() -> (i32, i32) {
    (NaiveDate::MIN.year() + 1, NaiveDate::MAX.year() - 1)
}

/// An ascending sequence of calendar years, either a single year or an inclusive span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearRange(Vec<i32>);

impl YearRange {
    pub fn single(year: i32) -> Self {
        Self(vec![year])
    }

    /// Inclusive span; endpoints given in descending order are swapped.
    pub fn span(first: i32, last: i32) -> Self {
        let (first, last) = if first > last {
            (last, first)
        } else {
            (first, last)
        };
        Self((first..=last).collect())
    }

    pub fn years(&self) -> &[i32] {
        &self.0
    }

    pub fn first(&self) -> i32 {
        self.0[0]
    }

    pub fn last(&self) -> i32 {
        self.0[self.0.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = i32> + '_ {
        self.0.iter().copied()
    }
}

impl FromStr for YearRange {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        resolve_years(s)
    }
}

/// Resolves `"2015"` into `[2015]` and `"2000-2003"` into `[2000, 2001, 2002, 2003]`.
pub fn resolve_years(spec: &str) -> Result<YearRange, ResolveError> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(ResolveError::EmptySpec("year"));
    }

    match spec.split_once(YEAR_SEPARATOR) {
        Some((first, last)) => {
            if first.trim().is_empty() || last.trim().is_empty() || last.contains(YEAR_SEPARATOR)
            {
                return Err(ResolveError::InvalidYearRange(spec.to_string()));
            }
            Ok(YearRange::span(parse_year(first)?, parse_year(last)?))
        }
        None => Ok(YearRange::single(parse_year(spec)?)),
    }
}

fn parse_year(input: &str) -> Result<i32, ResolveError> {
    let input = input.trim();
    let year = input
        .parse::<i32>()
        .map_err(|source| ResolveError::InvalidYear {
            input: input.to_string(),
            source,
        })?;
    let (min, max) = supported_years();
    if (min..=max).contains(&year) {
        Ok(year)
    } else {
        Err(ResolveError::YearOutOfRange { year, min, max })
    }
}
