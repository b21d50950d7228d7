//! Open-Meteo geocoding and historical archive client
//!
//! The client is constructed explicitly from configuration and injected
//! wherever observations are needed. Transient failures are retried with
//! exponential backoff and successful responses are cached in memory.

use crate::cache::ResponseCache;
use crate::config::{ArchiveApiConfig, CacheConfig};
use crate::forms::DateRange;
use crate::models::{Granularity, Location, ObservationTable};
use crate::{ArchiveError, Result};
use async_trait::async_trait;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::fmt::Debug;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Source of geocoding results and archived observations
#[async_trait]
pub trait WeatherSource: Send + Sync {
    /// Best match for a place name or postcode, `None` when nothing matches
    async fn geocode(&self, query: &str) -> Result<Option<GeocodingResult>>;

    /// Archived observations for a location over a date range
    async fn fetch_observations(
        &self,
        location: &Location,
        range: &DateRange,
        granularity: Granularity,
    ) -> Result<ObservationTable>;
}

/// Geocoding match from the Open-Meteo search API
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct GeocodingResult {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// ISO 3166-1 alpha-2 code
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    /// First-level administrative area (state, region)
    #[serde(default)]
    pub admin1: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
}

impl From<GeocodingResult> for Location {
    fn from(geocoding: GeocodingResult) -> Self {
        match geocoding.country_code {
            Some(code) => {
                Location::with_country(geocoding.latitude, geocoding.longitude, geocoding.name, code)
            }
            None => Location::new(geocoding.latitude, geocoding.longitude, geocoding.name),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct GeocodingResponse {
    #[serde(default)]
    results: Option<Vec<GeocodingResult>>,
}

/// Archive API response; only the block matching the request is present
#[derive(Debug, Deserialize, Serialize)]
struct ArchiveResponse {
    #[serde(default)]
    timezone: Option<String>,
    #[serde(default)]
    daily: Option<ArchiveBlock>,
    #[serde(default)]
    daily_units: Option<HashMap<String, String>>,
    #[serde(default)]
    hourly: Option<ArchiveBlock>,
    #[serde(default)]
    hourly_units: Option<HashMap<String, String>>,
}

/// Parallel arrays keyed by API variable name; nulls mark missing values
#[derive(Debug, Deserialize, Serialize)]
struct ArchiveBlock {
    time: Vec<String>,
    #[serde(flatten)]
    values: HashMap<String, Vec<Option<f64>>>,
}

/// Error body returned by Open-Meteo on bad requests
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    reason: String,
}

impl ArchiveResponse {
    fn into_table(self, granularity: Granularity) -> Result<ObservationTable> {
        let (block, units) = match granularity {
            Granularity::Daily => (self.daily, self.daily_units),
            Granularity::Hourly => (self.hourly, self.hourly_units),
        };
        let mut block = block.ok_or_else(|| {
            ArchiveError::api(format!("Archive response has no {granularity} data"))
        })?;
        let units = units.unwrap_or_default();

        let mut table = ObservationTable::new(granularity, block.time);
        table.timezone = self.timezone;

        for (api_name, name) in granularity.variables() {
            let values = block.values.remove(*api_name).ok_or_else(|| {
                ArchiveError::api(format!("Archive response is missing '{api_name}'"))
            })?;
            let values = values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            table.push_series(*name, units.get(*api_name).cloned(), values)?;
        }

        Ok(table)
    }
}

/// HTTP client for the Open-Meteo geocoding and archive APIs
pub struct ArchiveClient {
    client: ClientWithMiddleware,
    cache: ResponseCache,
    config: ArchiveApiConfig,
}

impl ArchiveClient {
    /// Create a client with its own response cache
    pub fn new(config: &ArchiveApiConfig, cache: &CacheConfig) -> Result<Self> {
        Self::with_cache(
            config,
            ResponseCache::new(cache.ttl(), cache.max_entries),
        )
    }

    /// Create a client that shares an existing response cache
    pub fn with_cache(config: &ArchiveApiConfig, cache: ResponseCache) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ArchiveError::config(format!("Failed to create HTTP client: {e}")))?;

        let min_backoff = Duration::try_from_secs_f64(config.backoff_factor).unwrap_or_default();
        let max_backoff = min_backoff.saturating_mul(2_u32.saturating_pow(config.max_retries));
        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(min_backoff, max_backoff)
            .build_with_max_retries(config.max_retries);

        let client = ClientBuilder::new(client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            cache,
            config: config.clone(),
        })
    }

    fn geocoding_url(&self, query: &str) -> String {
        format!(
            "{}?name={}&count=1&language=en&format=json",
            self.config.geocoding_url,
            urlencoding::encode(query)
        )
    }

    fn archive_url(&self, location: &Location, range: &DateRange, granularity: Granularity) -> String {
        let (lat, lon) = location.rounded_coordinates(4);
        let variables: Vec<&str> = granularity.variables().iter().map(|v| v.0).collect();
        format!(
            "{}?latitude={}&longitude={}&start_date={}&end_date={}&{}={}&timezone=auto",
            self.config.archive_url,
            lat,
            lon,
            range.start,
            range.end,
            granularity.as_str(),
            variables.join(",")
        )
    }

    /// GET a JSON document, serving repeated URLs from the cache
    #[instrument(skip(self, timeout))]
    async fn get_json<T>(&self, url: &str, timeout: Duration) -> Result<T>
    where
        T: DeserializeOwned + Serialize + Debug,
    {
        if let Some(cached) = self.cache.get::<T>(url).await? {
            debug!("Serving response from cache");
            return Ok(cached);
        }

        let start_time = Instant::now();
        let response = self.client.get(url).timeout(timeout).send().await?;
        let status = response.status();

        if !status.is_success() {
            let reason = match response.json::<ApiErrorBody>().await {
                Ok(body) => body.reason,
                Err(_) => status.canonical_reason().unwrap_or("Unknown error").to_string(),
            };
            warn!("Upstream request failed with {}: {}", status, reason);
            return Err(ArchiveError::api(format!(
                "Request failed with status {status}: {reason}"
            )));
        }

        let value: T = response
            .json()
            .await
            .map_err(|e| ArchiveError::api(format!("Invalid response from upstream: {e}")))?;

        let total_duration = start_time.elapsed();
        info!("Upstream request succeeded in {:.3}s", total_duration.as_secs_f64());
        if total_duration.as_secs() > 5 {
            warn!("Slow upstream response: {:.3}s", total_duration.as_secs_f64());
        }

        self.cache.put(url, &value).await?;
        Ok(value)
    }
}

#[async_trait]
impl WeatherSource for ArchiveClient {
    #[instrument(skip(self))]
    async fn geocode(&self, query: &str) -> Result<Option<GeocodingResult>> {
        let url = self.geocoding_url(query);
        let response: GeocodingResponse = self
            .get_json(&url, self.config.geocoding_timeout())
            .await?;

        let best = response.results.unwrap_or_default().into_iter().next();
        match &best {
            Some(result) => debug!(
                "Found {} ({:.4}, {:.4})",
                result.name, result.latitude, result.longitude
            ),
            None => warn!("No geocoding results for '{}'", query),
        }
        Ok(best)
    }

    #[instrument(skip(self, location), fields(lat = location.latitude, lon = location.longitude))]
    async fn fetch_observations(
        &self,
        location: &Location,
        range: &DateRange,
        granularity: Granularity,
    ) -> Result<ObservationTable> {
        let url = self.archive_url(location, range, granularity);
        let response: ArchiveResponse = self
            .get_json(&url, self.config.archive_timeout())
            .await?;
        let table = response.into_table(granularity)?;
        info!("Fetched {} {} observations", table.len(), granularity);
        Ok(table)
    }
}
