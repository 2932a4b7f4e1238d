//! IP-based geolocation over HTTP.
//!
//! Queries a service that returns a JSON document with a `"loc": "lat,lon"`
//! field for the caller's public address (ipinfo.io layout).

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::time::Duration;

use super::{Coordinates, GeoProvider};

pub const DEFAULT_IPINFO_URL: &str = "https://ipinfo.io/json";

#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    loc: Option<String>,
}

pub struct IpInfoProvider {
    url: String,
    agent: ureq::Agent,
}

impl IpInfoProvider {
    pub fn new(url: &str, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            url: url.to_string(),
            agent,
        }
    }
}

impl GeoProvider for IpInfoProvider {
    fn name(&self) -> &str {
        "ipinfo"
    }

    fn locate(&self) -> Result<Coordinates> {
        let body = self
            .agent
            .get(&self.url)
            .set("Accept", "application/json")
            .call()
            .with_context(|| format!("geolocation request to {}", self.url))?
            .into_string()
            .context("read geolocation response")?;
        parse_ipinfo(&body)
    }
}

/// Extract coordinates from an ipinfo-style JSON body.
pub fn parse_ipinfo(body: &str) -> Result<Coordinates> {
    let response: IpInfoResponse =
        serde_json::from_str(body).map_err(|e| anyhow!("invalid geolocation response: {}", e))?;
    let loc = response
        .loc
        .ok_or_else(|| anyhow!("geolocation response has no 'loc' field"))?;
    parse_loc(&loc)
}

fn parse_loc(loc: &str) -> Result<Coordinates> {
    let (lat, lon) = loc
        .split_once(',')
        .ok_or_else(|| anyhow!("malformed loc '{}'", loc))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| anyhow!("malformed latitude in '{}'", loc))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| anyhow!("malformed longitude in '{}'", loc))?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(anyhow!("coordinates out of range in '{}'", loc));
    }
    Ok(Coordinates::new(lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_loc_field() {
        let body = r#"{"ip":"203.0.113.7","city":"New York","loc":"40.7128,-74.0060"}"#;
        let coords = parse_ipinfo(body).unwrap();
        assert_eq!(coords, Coordinates::new(40.7128, -74.006));
    }

    #[test]
    fn rejects_missing_or_bad_loc() {
        assert!(parse_ipinfo(r#"{"ip":"203.0.113.7"}"#).is_err());
        assert!(parse_ipinfo(r#"{"loc":"north,west"}"#).is_err());
        assert!(parse_ipinfo(r#"{"loc":"140.0,10.0"}"#).is_err());
        assert!(parse_ipinfo("not json").is_err());
    }
}
