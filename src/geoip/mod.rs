//! IP geolocation lookup
//!
//! Used to show where connected peers are. The service answers with a
//! JSON object that carries a `type` key when it cannot locate an address.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Geolocation errors
#[derive(Debug, Error)]
pub enum GeoIpError {
    #[error("GeoIP transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("GeoIP service answered with HTTP {0}")]
    Status(StatusCode),
    #[error("Malformed GeoIP payload: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Country {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub time_zone: Option<String>,
}

/// What the service knows about an address
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoData {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub country: Option<Country>,
    #[serde(default)]
    pub location: Option<Location>,
}

impl GeoData {
    /// Country name, falling back to the country code
    pub fn country_name(&self) -> Option<&str> {
        let country = self.country.as_ref()?;
        country.name.as_deref().or(country.code.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum GeoIpLookup {
    Found(GeoData),
    /// The service could not locate the address (private range, bogus IP)
    NotFound,
}

/// Interpret a service answer
pub fn classify(body: serde_json::Value) -> Result<GeoIpLookup, serde_json::Error> {
    if body.get("type").is_some() {
        return Ok(GeoIpLookup::NotFound);
    }
    Ok(GeoIpLookup::Found(serde_json::from_value(body)?))
}

/// Strip the port from a peer address such as `1.2.3.4:9193` or `[::1]:9193`
pub fn peer_host(addr: &str) -> &str {
    if let Some(rest) = addr.strip_prefix('[') {
        return rest.split(']').next().unwrap_or(rest);
    }
    match addr.rsplit_once(':') {
        // A bare IPv6 address has more than one colon
        Some((host, _)) if !host.contains(':') => host,
        _ => addr,
    }
}

#[derive(Debug, Clone)]
pub struct GeoIpClient {
    base_url: String,
    client: Client,
}

impl GeoIpClient {
    /// `base_url` gets the IP appended, e.g. `https://geoip.nekudo.com/api/`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GeoIpError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            client,
        })
    }

    pub async fn lookup(&self, ip: &str) -> Result<GeoIpLookup, GeoIpError> {
        let url = format!("{}{}", self.base_url, ip);

        let result = self.fetch(&url).await;
        if let Err(e) = &result {
            warn!(%url, error = %e, "GeoIP lookup failed");
        }
        result
    }

    async fn fetch(&self, url: &str) -> Result<GeoIpLookup, GeoIpError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GeoIpError::Status(status));
        }

        let body = response.json::<serde_json::Value>().await?;
        Ok(classify(body)?)
    }
}
