//! DSSAT `.WTH` weather files.

use crate::renderers::summary::temperature_summary;
use crate::renderers::{format_coordinate, format_value, CoordinateRows};
use crate::utils::round_to;
use std::collections::BTreeSet;
use std::fmt::Write;

/// DSSAT station code; the grid has no real station.
const STATION: &str = "38fe";
const UNKNOWN: f64 = -99.0;

/// `<lat digits><lon digits><YY><number of years>.WTH`
pub fn file_name(rows: &CoordinateRows) -> String {
    let digits = |v: f64| format_coordinate(v).replace('.', "");
    let years: BTreeSet<i32> = rows.year.iter().copied().collect();
    let first = years.first().copied().unwrap_or_default();
    format!(
        "{}{}{:02}{}.WTH",
        digits(rows.lat),
        digits(rows.lon),
        first % 100,
        years.len()
    )
}

/// `YYDDD`
pub fn dssat_date(year: i32, day: i32) -> String {
    format!("{:02}{:03}", year % 100, day)
}

pub fn render_wth(rows: &CoordinateRows) -> String {
    let summary = temperature_summary(rows.temperatures());
    let tav = summary.map(|s| round_to(s.tav, 1));
    let amp = summary.map(|s| round_to(s.amp, 1));

    let mut out = String::new();
    let _ = writeln!(
        out,
        "*WEATHER DATA : {}-{}",
        format_coordinate(rows.lat),
        format_coordinate(rows.lon)
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:>6} {:>8} {:>8} {:>5} {:>5} {:>5} {:>5} {:>5}",
        "@ INSI", "LAT", "LONG", "ELEV", "TAV", "AMP", "REFHT", "WNDHT"
    );
    let _ = writeln!(
        out,
        "{:>6} {:>8.3} {:>8.3} {:>5.1} {:>5} {:>5} {:>5.1} {:>5.1}",
        STATION,
        rows.lat,
        rows.lon,
        UNKNOWN,
        format_value(tav, 1),
        format_value(amp, 1),
        UNKNOWN,
        UNKNOWN
    );
    let _ = writeln!(
        out,
        "{:>5} {:>5} {:>5} {:>5} {:>5}",
        "@DATE", "SRAD", "TMAX", "TMIN", "RAIN"
    );

    for i in 0..rows.len() {
        let _ = writeln!(
            out,
            "{:>5} {:>5} {:>5} {:>5} {:>5}",
            dssat_date(rows.year[i], rows.day[i]),
            format_value(rows.radn[i], 1),
            format_value(rows.maxt[i], 1),
            format_value(rows.mint[i], 1),
            format_value(rows.rain[i], 1),
        );
    }
    out
}
