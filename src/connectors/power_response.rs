//! Decoding of NASA POWER daily point responses.

use crate::connectors::error::ConnectorError;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

const DEFAULT_FILL_VALUE: f64 = -999.0;

/// Daily values keyed by `YYYYMMDD`.
pub type DatedValues = BTreeMap<String, Option<f64>>;

#[derive(Debug, Deserialize)]
struct RawResponse {
    #[serde(default)]
    header: Option<RawHeader>,
    /// Current envelope: a single GeoJSON feature.
    #[serde(default)]
    properties: Option<RawProperties>,
    /// Legacy envelope: a feature collection with one feature.
    #[serde(default)]
    features: Vec<RawFeature>,
}

#[derive(Debug, Deserialize)]
struct RawHeader {
    #[serde(default, alias = "fillValue")]
    fill_value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawFeature {
    properties: RawProperties,
}

#[derive(Debug, Deserialize)]
struct RawProperties {
    parameter: HashMap<String, DatedValues>,
}

/// All parameters of one point response, spanning the requested years.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerData {
    fill_value: f64,
    parameters: HashMap<String, DatedValues>,
}

impl PowerData {
    pub fn new(fill_value: f64, parameters: HashMap<String, DatedValues>) -> Self {
        Self {
            fill_value,
            parameters,
        }
    }

    /// Parses a JSON body, accepting both the current and the legacy envelope.
    pub fn from_json(body: &[u8], url: &str) -> Result<Self, ConnectorError> {
        let malformed = |reason: String| ConnectorError::MalformedResponse {
            url: url.to_string(),
            reason,
        };

        let raw: RawResponse =
            serde_json::from_slice(body).map_err(|e| malformed(e.to_string()))?;

        let fill_value = raw
            .header
            .and_then(|h| h.fill_value)
            .and_then(|v| match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            })
            .unwrap_or(DEFAULT_FILL_VALUE);

        let properties = match (raw.properties, raw.features.into_iter().next()) {
            (Some(properties), _) => properties,
            (None, Some(feature)) => feature.properties,
            (None, None) => {
                return Err(malformed("no parameter block in response".to_string()));
            }
        };

        Ok(Self::new(fill_value, properties.parameter))
    }

    pub fn fill_value(&self) -> f64 {
        self.fill_value
    }

    pub fn has_parameter(&self, code: &str) -> bool {
        self.parameters.contains_key(code)
    }

    /// Values of `code` for every day of `year` in date order. Fill values and
    /// nulls become NaN. `None` if the parameter is absent or has no day in `year`.
    pub fn year_values(&self, code: &str, year: i32) -> Option<Vec<f64>> {
        let prefix = format!("{:04}", year);
        let values: Vec<f64> = self
            .parameters
            .get(code)?
            .iter()
            .filter(|(date, _)| date.starts_with(&prefix))
            .map(|(_, value)| match value {
                Some(v) if (*v - self.fill_value).abs() > f64::EPSILON => *v,
                _ => f64::NAN,
            })
            .collect();

        if values.is_empty() {
            None
        } else {
            Some(values)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT: &str = r#"{
        "type": "Feature",
        "geometry": {"type": "Point", "coordinates": [145.5, -41.15, 325.05]},
        "properties": {"parameter": {
            "T2M_MAX": {"20091231": 20.0, "20100101": 25.31, "20100102": -999.0, "20100103": 22.0},
            "PRECTOT": {"20100101": 0.19, "20100102": 1.75}
        }},
        "header": {"title": "NASA/POWER", "fill_value": -999.0}
    }"#;

    const LEGACY: &str = r#"{
        "features": [{
            "geometry": {"coordinates": [145.5, -41.15, 325.05], "type": "Point"},
            "properties": {"parameter": {"PRECTOT": {"20100101": 0.19, "20100102": -99}}},
            "type": "Feature"
        }],
        "header": {"api_version": "1.1.0", "fillValue": "-99"},
        "type": "FeatureCollection"
    }"#;

    #[test]
    fn parses_current_envelope() {
        let data = PowerData::from_json(CURRENT.as_bytes(), "test").unwrap();
        assert_eq!(data.fill_value(), -999.0);
        let values = data.year_values("T2M_MAX", 2010).unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[0], 25.31);
        assert!(values[1].is_nan());
        assert_eq!(data.year_values("T2M_MAX", 2009), Some(vec![20.0]));
        assert_eq!(data.year_values("T2M_MIN", 2010), None);
        assert_eq!(data.year_values("PRECTOT", 2011), None);
    }

    #[test]
    fn parses_legacy_envelope_with_string_fill_value() {
        let data = PowerData::from_json(LEGACY.as_bytes(), "test").unwrap();
        assert_eq!(data.fill_value(), -99.0);
        let values = data.year_values("PRECTOT", 2010).unwrap();
        assert_eq!(values[0], 0.19);
        assert!(values[1].is_nan());
    }

    #[test]
    fn missing_parameter_block_is_malformed() {
        let err = PowerData::from_json(br#"{"messages": ["bad request"]}"#, "u").unwrap_err();
        assert!(matches!(err, ConnectorError::MalformedResponse { .. }));
        let err = PowerData::from_json(b"<html>", "u").unwrap_err();
        assert!(matches!(err, ConnectorError::MalformedResponse { .. }));
    }

    #[test]
    fn null_values_become_nan() {
        let body = r#"{"properties": {"parameter": {"T2M_MIN": {"20100101": null, "20100102": 3.0}}}}"#;
        let data = PowerData::from_json(body.as_bytes(), "u").unwrap();
        assert_eq!(data.fill_value(), DEFAULT_FILL_VALUE);
        let values = data.year_values("T2M_MIN", 2010).unwrap();
        assert!(values[0].is_nan());
        assert_eq!(values[1], 3.0);
    }
}
