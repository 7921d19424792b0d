//! Annual average temperature (TAV) and monthly amplitude (AMP).

use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TemperatureSummary {
    pub tav: f64,
    pub amp: f64,
}

/// Computes TAV and AMP from daily `(year, day, maxt, mint)` values.
///
/// The daily mean is `(maxt + mint) / 2`, or whichever of the two is present.
/// Daily means are averaged per calendar month across all years; TAV is the
/// mean of those monthly means and AMP is the largest minus the smallest.
/// Returns `None` when no day has a temperature.
pub fn temperature_summary<I>(days: I) -> Option<TemperatureSummary>
where
    I: IntoIterator<Item = (i32, i32, Option<f64>, Option<f64>)>,
{
    let mut months: BTreeMap<u32, (f64, usize)> = BTreeMap::new();
    for (year, day, maxt, mint) in days {
        let Some(date) = NaiveDate::from_yo_opt(year, day as u32) else {
            continue;
        };
        let present: Vec<f64> = [maxt, mint]
            .into_iter()
            .flatten()
            .filter(|v| !v.is_nan())
            .collect();
        if present.is_empty() {
            continue;
        }
        let mean = present.iter().sum::<f64>() / present.len() as f64;
        let entry = months.entry(date.month()).or_insert((0.0, 0));
        entry.0 += mean;
        entry.1 += 1;
    }

    if months.is_empty() {
        return None;
    }
    let monthly: Vec<f64> = months.values().map(|(sum, n)| sum / *n as f64).collect();
    let tav = monthly.iter().sum::<f64>() / monthly.len() as f64;
    let max = monthly.iter().copied().fold(f64::MIN, f64::max);
    let min = monthly.iter().copied().fold(f64::MAX, f64::min);
    Some(TemperatureSummary {
        tav,
        amp: max - min,
    })
}
