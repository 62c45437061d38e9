//! HTTP client for the data and geocoding backend.

use std::{future::Future, time::Duration};

use reqwest::{
    Client, RequestBuilder,
    header::{AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde_json::Value;
use thiserror::Error;
use url::Url;

use crate::{
    core::filters::MapFilters,
    query::RestQuery,
    records::{SiteRecord, feature_collection, parse_rows},
    search::{SearchHits, SearchRoute, route_query},
    types::{Bbox, LngLat},
};

/// Failure of a backend call, with a human-readable message.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The call exceeded its time budget.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        /// Operation name.
        operation: &'static str,
        /// Budget that elapsed.
        after: Duration,
    },
    /// Non-success HTTP status.
    #[error("{operation} failed with HTTP {status}: {message}")]
    Status {
        /// Operation name.
        operation: &'static str,
        /// HTTP status code.
        status: u16,
        /// Response body excerpt.
        message: String,
    },
    /// Connection or protocol failure.
    #[error("{operation} failed: {message}")]
    Transport {
        /// Operation name.
        operation: &'static str,
        /// Cause.
        message: String,
    },
    /// Unexpected response body.
    #[error("{operation} returned an unexpected body: {message}")]
    Decode {
        /// Operation name.
        operation: &'static str,
        /// Cause.
        message: String,
    },
    /// Bad base URL or query.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    /// Invalid API key header value.
    #[error("invalid api key")]
    InvalidKey,
}

/// Per-operation time budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// Geocoding.
    pub geocode: Duration,
    /// Site search and geometry fetch.
    pub search: Duration,
    /// GeoJSON export.
    pub export: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            geocode: Duration::from_secs(5),
            search: Duration::from_secs(10),
            export: Duration::from_secs(30),
        }
    }
}

/// Where and how to reach the backend.
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Base URL; `/rest/...` and `/geocode` hang below it.
    pub base_url: Url,
    /// Anonymous API key, sent as `apikey` and bearer token.
    pub api_key: Option<String>,
    /// Table holding the sites.
    pub sites_table: String,
    /// Time budgets.
    pub timeouts: Timeouts,
    /// Geocoding hits inside this box are listed first.
    pub region: Option<Bbox>,
}

impl BackendConfig {
    /// Config with default table, timeouts and no region.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            api_key: None,
            sites_table: "siti".to_string(),
            timeouts: Timeouts::default(),
            region: None,
        }
    }
}

/// One geocoding result.
#[derive(Debug, Clone, PartialEq)]
pub struct GeocodeHit {
    /// Display label.
    pub label: String,
    /// Position.
    pub location: LngLat,
}

/// Async backend client.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    config: BackendConfig,
}

impl BackendClient {
    /// Builds the client with the key headers preset.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] when the key is not a valid header value or
    /// the HTTP client cannot be built.
    pub fn new(config: BackendConfig) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        if let Some(key) = &config.api_key {
            let apikey = HeaderValue::from_str(key).map_err(|_| BackendError::InvalidKey)?;
            let bearer = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| BackendError::InvalidKey)?;
            headers.insert("apikey", apikey);
            headers.insert(AUTHORIZATION, bearer);
        }
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(config.timeouts.geocode)
            .build()
            .map_err(|err| BackendError::Transport {
                operation: "client setup",
                message: err.to_string(),
            })?;
        Ok(Self { client, config })
    }

    /// Configuration in use.
    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Sites matching `filters`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on timeout, HTTP or decode failure.
    pub async fn fetch_sites(&self, filters: &MapFilters, limit: usize) -> Result<Vec<SiteRecord>, BackendError> {
        let url = RestQuery::new(&self.config.sites_table, filters)
            .limit(limit)
            .url(&self.config.base_url)?;
        let rows = self.get_json("fetch sites", self.config.timeouts.search, url).await?;
        rows_to_records("fetch sites", rows)
    }

    /// Server-side text search over name and description.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on timeout, HTTP or decode failure.
    pub async fn search_sites(&self, text: &str, limit: usize) -> Result<Vec<SiteRecord>, BackendError> {
        let pattern = sanitize_pattern(text);
        let mut url = RestQuery::new(&self.config.sites_table, &MapFilters::new())
            .limit(limit)
            .url(&self.config.base_url)?;
        url.query_pairs_mut()
            .append_pair("or", &format!("(nome.ilike.*{pattern}*,descrizione.ilike.*{pattern}*)"));
        let rows = self.get_json("search sites", self.config.timeouts.search, url).await?;
        rows_to_records("search sites", rows)
    }

    /// Geocodes `text`; hits inside the configured region come first.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on timeout, HTTP or decode failure.
    pub async fn geocode(&self, text: &str, limit: usize) -> Result<Vec<GeocodeHit>, BackendError> {
        let mut url = self.endpoint("geocode")?;
        url.query_pairs_mut()
            .append_pair("q", text)
            .append_pair("limit", &limit.to_string());
        let body = self.get_json("geocode", self.config.timeouts.geocode, url).await?;
        let Value::Array(items) = body else {
            return Err(BackendError::Decode {
                operation: "geocode",
                message: "expected an array".to_string(),
            });
        };
        let hits: Vec<GeocodeHit> = items.iter().filter_map(parse_hit).collect();
        Ok(prioritize_region(hits, self.config.region))
    }

    /// Routes `text` to the geocoder or the site search, at most `limit`
    /// hits either way.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] from the routed call.
    pub async fn search(&self, text: &str, limit: usize) -> Result<SearchHits, BackendError> {
        match route_query(text) {
            SearchRoute::Empty => Ok(SearchHits::Empty),
            SearchRoute::Geocode(q) => Ok(SearchHits::Places(self.geocode(&q, limit).await?)),
            SearchRoute::SiteSearch(q) => Ok(SearchHits::Sites(self.search_sites(&q, limit).await?)),
        }
    }

    /// Filtered sites as a GeoJSON `FeatureCollection`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError`] on timeout, HTTP or decode failure.
    pub async fn export_geojson(&self, filters: &MapFilters, limit: usize) -> Result<Value, BackendError> {
        let url = RestQuery::new(&self.config.sites_table, filters)
            .limit(limit)
            .url(&self.config.base_url)?;
        let rows = self.get_json("export", self.config.timeouts.export, url).await?;
        Ok(feature_collection(&rows_to_records("export", rows)?))
    }

    fn endpoint(&self, path: &str) -> Result<Url, BackendError> {
        let root = self.config.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{root}/{path}"))?)
    }

    async fn get_json(&self, operation: &'static str, budget: Duration, url: Url) -> Result<Value, BackendError> {
        tracing::debug!(%operation, %url, "backend request");
        let request = self.client.get(url).header("Accept", "application/json");
        with_timeout(operation, budget, send_json(operation, request)).await
    }
}

async fn with_timeout<T>(
    operation: &'static str,
    after: Duration,
    fut: impl Future<Output = Result<T, BackendError>>,
) -> Result<T, BackendError> {
    tokio::time::timeout(after, fut)
        .await
        .map_err(|_| BackendError::Timeout { operation, after })?
}

async fn send_json(operation: &'static str, request: RequestBuilder) -> Result<Value, BackendError> {
    let transport = |err: reqwest::Error| BackendError::Transport {
        operation,
        message: err.to_string(),
    };
    let response = request.send().await.map_err(transport)?;
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(BackendError::Status {
            operation,
            status: status.as_u16(),
            message: body.chars().take(200).collect(),
        });
    }
    response.json::<Value>().await.map_err(|err| BackendError::Decode {
        operation,
        message: err.to_string(),
    })
}

fn rows_to_records(operation: &'static str, body: Value) -> Result<Vec<SiteRecord>, BackendError> {
    match body {
        Value::Array(rows) => Ok(parse_rows(&rows)),
        _ => Err(BackendError::Decode {
            operation,
            message: "expected an array of rows".to_string(),
        }),
    }
}

/// Drops characters with meaning in PostgREST logic trees.
fn sanitize_pattern(text: &str) -> String {
    text.trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '(' | ')' | '*' | '"'))
        .collect()
}

fn parse_hit(item: &Value) -> Option<GeocodeHit> {
    let number = |keys: &[&str]| {
        keys.iter().find_map(|k| match item.get(*k)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        })
    };
    let lng = number(&["lon", "lng"])?;
    let lat = number(&["lat"])?;
    if !lng.is_finite() || !lat.is_finite() {
        return None;
    }
    let label = ["display_name", "label", "name"]
        .iter()
        .find_map(|k| item.get(*k).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();
    Some(GeocodeHit {
        label,
        location: LngLat { lng, lat },
    })
}

/// Stable partition: hits inside `region` first.
pub fn prioritize_region(hits: Vec<GeocodeHit>, region: Option<Bbox>) -> Vec<GeocodeHit> {
    let Some(region) = region else {
        return hits;
    };
    let (inside, outside): (Vec<_>, Vec<_>) = hits.into_iter().partition(|h| region.contains(h.location));
    inside.into_iter().chain(outside).collect()
}
