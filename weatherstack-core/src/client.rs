use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::fmt::Debug;
use tracing::debug;

use crate::{
    config::Config,
    model::{RawResponse, WeatherRequest},
};

/// Anything that can answer a `GET /current` call.
#[async_trait]
pub trait CurrentWeatherApi: Send + Sync + Debug {
    async fn current(&self, access_key: &str, request: &WeatherRequest) -> Result<RawResponse>;
}

#[derive(Debug, Clone)]
pub struct WeatherstackClient {
    base_url: String,
    http: Client,
}

impl WeatherstackClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), http: Client::new() }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout() {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().context("Failed to build HTTP client")?;

        Ok(Self { base_url: config.base_url().to_string(), http })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/current", self.base_url.trim_end_matches('/'))
    }
}

/// `access_key` and `query` are always sent; `language` and `units` only when non-empty.
pub fn query_params<'a>(
    access_key: &'a str,
    request: &'a WeatherRequest,
) -> Vec<(&'static str, &'a str)> {
    let mut params = vec![("access_key", access_key), ("query", request.query.as_str())];

    if let Some(language) = request.language.as_deref().filter(|l| !l.is_empty()) {
        params.push(("language", language));
    }
    if let Some(units) = request.units.as_deref().filter(|u| !u.is_empty()) {
        params.push(("units", units));
    }

    params
}

#[async_trait]
impl CurrentWeatherApi for WeatherstackClient {
    async fn current(&self, access_key: &str, request: &WeatherRequest) -> Result<RawResponse> {
        debug!(
            query = %request.query,
            language = ?request.language,
            units = ?request.units,
            "sending current weather request"
        );

        let res = self
            .http
            .get(self.endpoint())
            .query(&query_params(access_key, request))
            .send()
            .await
            .context("Failed to send request to weatherstack (current)")?;

        let status = res.status();
        let body = res
            .text()
            .await
            .context("Failed to read weatherstack current response body")?;

        debug!(%status, bytes = body.len(), "received current weather response");

        let parsed: Value = serde_json::from_str(&body).with_context(|| {
            format!(
                "Failed to parse weatherstack current JSON (status {status}): {}",
                truncate_body(&body)
            )
        })?;

        Ok(RawResponse::new(status, parsed))
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_params_only_by_default() {
        let req = WeatherRequest::new("Taipei");
        assert_eq!(query_params("KEY", &req), vec![("access_key", "KEY"), ("query", "Taipei")]);
    }

    #[test]
    fn optional_params_appended_when_supplied() {
        let req = WeatherRequest::new("Taipei").with_language("zh").with_units("s");
        assert_eq!(
            query_params("KEY", &req),
            vec![("access_key", "KEY"), ("query", "Taipei"), ("language", "zh"), ("units", "s")]
        );
    }

    #[test]
    fn empty_optional_params_are_dropped() {
        let req = WeatherRequest::new("").with_language("").with_units("");
        assert_eq!(query_params("", &req), vec![("access_key", ""), ("query", "")]);
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        assert_eq!(
            WeatherstackClient::new("http://api.weatherstack.com/").endpoint(),
            "http://api.weatherstack.com/current"
        );
    }

    #[test]
    fn truncate_body_keeps_short_bodies() {
        assert_eq!(truncate_body("<html>"), "<html>");
        let long = "x".repeat(250);
        assert_eq!(truncate_body(&long).len(), 203);
    }
}
