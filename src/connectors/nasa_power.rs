use crate::connectors::error::ConnectorError;
use crate::connectors::power_response::PowerData;
use crate::connectors::DataConnector;
use crate::resolver::years::YearRange;
use crate::types::daily_series::{DailySeries, SeriesRequest};
use crate::types::provider::Provider;
use crate::types::variable::ClimateVariable;
use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;

/// Daily point endpoint of the NASA POWER API.
pub const POWER_API_URL: &str = "https://power.larc.nasa.gov/api/temporal/daily/point";

const POWER_COMMUNITY: &str = "AG";

/// One point request covering a span of whole years.
#[derive(Debug, Clone, PartialEq)]
pub struct PowerQuery {
    pub lat: f64,
    pub lon: f64,
    pub first_year: i32,
    pub last_year: i32,
    pub parameters: Vec<&'static str>,
}

impl PowerQuery {
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("parameters", self.parameters.join(",")),
            ("community", POWER_COMMUNITY.to_string()),
            ("latitude", self.lat.to_string()),
            ("longitude", self.lon.to_string()),
            ("start", format!("{}0101", self.first_year)),
            ("end", format!("{}1231", self.last_year)),
            ("format", "JSON".to_string()),
        ]
    }

    fn covers(&self, lat: f64, lon: f64, years: &YearRange) -> bool {
        self.lat == lat
            && self.lon == lon
            && self.first_year == years.first()
            && self.last_year == years.last()
    }
}

/// The HTTP exchange with the API.
#[async_trait]
pub trait PowerTransport: Send + Sync {
    async fn fetch(&self, query: &PowerQuery) -> Result<PowerData, ConnectorError>;
}

pub struct HttpPowerTransport {
    client: Client,
    base_url: String,
}

impl HttpPowerTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }
}

impl Default for HttpPowerTransport {
    fn default() -> Self {
        Self::new(POWER_API_URL)
    }
}

#[async_trait]
impl PowerTransport for HttpPowerTransport {
    async fn fetch(&self, query: &PowerQuery) -> Result<PowerData, ConnectorError> {
        let url = self.base_url.clone();
        info!(
            "Requesting {} for lat {} lon {} ({}-{})",
            query.parameters.join(","),
            query.lat,
            query.lon,
            query.first_year,
            query.last_year
        );

        let response = self
            .client
            .get(&url)
            .query(&query.query_pairs())
            .send()
            .await
            .map_err(|e| ConnectorError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                return Err(match e.status() {
                    Some(status) => ConnectorError::HttpStatus {
                        url,
                        status,
                        source: e,
                    },
                    None => ConnectorError::NetworkRequest(url, e),
                });
            }
        };

        let body = response
            .bytes()
            .await
            .map_err(|e| ConnectorError::NetworkRequest(url.clone(), e))?;
        PowerData::from_json(&body, &url)
    }
}

struct CachedPoint {
    query: PowerQuery,
    data: PowerData,
}

/// Point queries against NASA POWER.
///
/// One response carries every requested variable for every requested year at
/// one point, so the last response is kept and reused for as long as the
/// requested (lat, lon) and year span stay the same. The API snaps points to
/// its own 0.5° grid, so distinct nearby coordinates can yield identical
/// series.
pub struct NasaPowerConnector<T = HttpPowerTransport> {
    transport: T,
    parameters: Vec<&'static str>,
    cache: Option<CachedPoint>,
}

impl NasaPowerConnector<HttpPowerTransport> {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_transport(HttpPowerTransport::new(base_url))
    }
}

impl<T: PowerTransport> NasaPowerConnector<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            parameters: Vec::new(),
            cache: None,
        }
    }

    /// Sets the variables fetched with every request.
    ///
    /// # Errors
    ///
    /// [`ConnectorError::UnsupportedVariable`] if the API does not serve one of them.
    pub fn set_variables(&mut self, variables: &[ClimateVariable]) -> Result<(), ConnectorError> {
        let mut parameters = Vec::with_capacity(variables.len());
        for variable in variables {
            let code = Self::code(*variable)?;
            if !parameters.contains(&code) {
                parameters.push(code);
            }
        }
        if parameters != self.parameters {
            self.parameters = parameters;
            self.cache = None;
        }
        Ok(())
    }

    pub fn parameters(&self) -> &[&'static str] {
        &self.parameters
    }

    /// Series for `variable` at (`lat`, `lon`) in `year`, using the cached
    /// response when it covers the point and the whole of `years`.
    ///
    /// Network and decoding failures are logged and reported as
    /// [`ConnectorError::NoDataAtCoordinate`].
    pub async fn get_yearly_data(
        &mut self,
        lat: f64,
        lon: f64,
        year: i32,
        years: &YearRange,
        variable: ClimateVariable,
    ) -> Result<DailySeries, ConnectorError> {
        let code = Self::code(variable)?;
        if !self.parameters.contains(&code) {
            self.parameters.push(code);
            self.cache = None;
        }
        let request = SeriesRequest::new(lat, lon, year, variable);

        let cached = self
            .cache
            .as_ref()
            .is_some_and(|c| c.query.covers(lat, lon, years));
        if cached {
            debug!("Cache hit for lat {} lon {}", lat, lon);
        } else {
            self.cache = None;
            let query = PowerQuery {
                lat,
                lon,
                first_year: years.first(),
                last_year: years.last(),
                parameters: self.parameters.clone(),
            };
            match self.transport.fetch(&query).await {
                Ok(data) => self.cache = Some(CachedPoint { query, data }),
                Err(e) => {
                    warn!("NASA POWER request for lat {} lon {} failed: {}", lat, lon, e);
                    return Err(ConnectorError::NoDataAtCoordinate { request });
                }
            }
        }

        let values = self
            .cache
            .as_ref()
            .and_then(|c| c.data.year_values(code, year))
            .ok_or(ConnectorError::NoDataAtCoordinate { request })?;
        DailySeries::from_values(request, values)
    }

    fn code(variable: ClimateVariable) -> Result<&'static str, ConnectorError> {
        variable
            .power_code()
            .ok_or(ConnectorError::UnsupportedVariable {
                variable,
                provider: Provider::NasaPower,
            })
    }
}

#[async_trait]
impl<T: PowerTransport> DataConnector for NasaPowerConnector<T> {
    fn provider(&self) -> Provider {
        Provider::NasaPower
    }

    fn prepare(&mut self, variables: &[ClimateVariable]) -> Result<(), ConnectorError> {
        self.set_variables(variables)
    }

    async fn open_scope(
        &mut self,
        _variable: ClimateVariable,
        _year: i32,
    ) -> Result<(), ConnectorError> {
        Ok(())
    }

    async fn daily_series(
        &mut self,
        request: SeriesRequest,
        years: &YearRange,
    ) -> Result<DailySeries, ConnectorError> {
        self.get_yearly_data(request.lat, request.lon, request.year, years, request.variable)
            .await
    }

    async fn close_scope(&mut self) {}
}
