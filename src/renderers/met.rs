//! APSIM `.met` weather files.

use crate::renderers::summary::temperature_summary;
use crate::renderers::{format_coordinate, format_value, CoordinateRows, RenderContext};
use crate::utils::round_to;
use std::fmt::Write;

const MET_COLUMNS: &str = "year day radn maxt mint rain";
const MET_UNITS: &str = "() () (MJ^m2) (oC) (oC) (mm)";

/// `<lat>-<lon>.met`
pub fn file_name(rows: &CoordinateRows) -> String {
    format!(
        "{}-{}.met",
        format_coordinate(rows.lat),
        format_coordinate(rows.lon)
    )
}

pub fn render_met(rows: &CoordinateRows, context: &RenderContext) -> String {
    let lat = format_coordinate(rows.lat);
    let lon = format_coordinate(rows.lon);
    let (tav, amp) = match temperature_summary(rows.temperatures()) {
        Some(summary) => (
            round_to(summary.tav, 5).to_string(),
            round_to(summary.amp, 5).to_string(),
        ),
        None => ("NaN".to_string(), "NaN".to_string()),
    };
    let period = |year: Option<i32>| year.map(|y| y.to_string()).unwrap_or_default();

    let mut out = String::new();
    let _ = writeln!(out, "[weather.met.weather]");
    let _ = writeln!(out, "!station number={}-{}", lat, lon);
    let _ = writeln!(
        out,
        "!This climate file was created by climgrid on {}",
        context.created.format("%d%m%Y")
    );
    let _ = writeln!(out, "!Source: {}", context.provider.attribution());
    let _ = writeln!(
        out,
        "!Date period from: {} to {}",
        period(rows.first_year()),
        period(rows.last_year())
    );
    let _ = writeln!(out, "Latitude={}", lat);
    let _ = writeln!(out, "Longitude={}", lon);
    let _ = writeln!(out, "tav={}", tav);
    let _ = writeln!(out, "amp={}", amp);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", MET_COLUMNS);
    let _ = writeln!(out, "{}", MET_UNITS);

    for i in 0..rows.len() {
        let _ = writeln!(
            out,
            "{} {} {} {} {} {}",
            rows.year[i],
            rows.day[i],
            format_value(rows.radn[i], 1),
            format_value(rows.maxt[i], 1),
            format_value(rows.mint[i], 1),
            format_value(rows.rain[i], 1),
        );
    }
    out
}
