//! HTTP client for the energy monitor.

pub mod digest;
pub mod endpoint;
pub mod xml;

use std::time::Duration;

use chrono::Utc;
use reqwest::{Client, StatusCode, Url, header};

use self::{
    digest::{Challenge, Credentials},
    endpoint::{Endpoint, Granularity},
    xml::{InstantData, InstantReading, StoredSeries},
};
use crate::prelude::*;

/// One failure taxonomy for the whole fetch boundary: transport problems,
/// HTTP status problems, malformed payloads, and requests that are invalid
/// before they ever reach the network.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("failed to reach the monitor: {0}")]
    Network(#[source] reqwest::Error),

    #[error("monitor returned HTTP {0}")]
    Status(StatusCode),

    #[error("malformed monitor payload: {0}")]
    Decode(String),

    #[error("invalid monitor request: {0}")]
    Configuration(String),
}

pub struct Monitor {
    client: Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl Monitor {
    /// The device answers on the local network within a second or two; a
    /// conservative fixed timeout keeps an unreachable address from hanging
    /// the run.
    const TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base_url: Url, credentials: Option<Credentials>) -> Result<Self, MonitorError> {
        let client = Client::builder()
            .timeout(Self::TIMEOUT)
            .build()
            .map_err(MonitorError::Network)?;
        Ok(Self { client, base_url, credentials })
    }

    /// Current register rates.
    #[instrument(skip_all, fields(base_url = %self.base_url))]
    pub async fn instantaneous(&self) -> Result<Vec<InstantReading>, MonitorError> {
        let payload = self.fetch(Endpoint::Instantaneous).await?;
        let data = InstantData::parse(&payload)?;
        let taken_at = data.taken_at();
        let readings = data.into_readings();
        info!(n_registers = readings.len(), ?taken_at, "fetched instantaneous readings");
        Ok(readings)
    }

    /// Cumulative register counters.
    #[instrument(skip_all, fields(base_url = %self.base_url))]
    pub async fn totals(&self) -> Result<Vec<InstantReading>, MonitorError> {
        let payload = self.fetch(Endpoint::Totals).await?;
        let data = InstantData::parse(&payload)?;
        let taken_at = data.taken_at();
        let readings = data.into_readings();
        info!(n_registers = readings.len(), ?taken_at, "fetched totals");
        Ok(readings)
    }

    /// Stored history: `rows` cumulative samples per register at the given
    /// granularity, decoded into ascending per-register series.
    #[instrument(skip_all, fields(%granularity, rows))]
    pub async fn stored(
        &self,
        granularity: Granularity,
        rows: u32,
    ) -> Result<StoredSeries, MonitorError> {
        let payload = self.fetch(Endpoint::Stored { granularity, rows }).await?;
        let series = StoredSeries::parse(&payload)?;
        info!(registers = ?series.names().collect::<Vec<_>>(), "fetched stored history");
        Ok(series)
    }

    /// One GET per call. The only re-request is the second leg of a digest
    /// authentication handshake; there is no retry policy beyond that.
    async fn fetch(&self, endpoint: Endpoint) -> Result<String, MonitorError> {
        if let Endpoint::Stored { rows: 0, .. } = endpoint {
            return Err(MonitorError::Configuration(
                "requested a zero-length time window".to_string(),
            ));
        }

        let url = self
            .base_url
            .join(&endpoint.path_and_query())
            .map_err(|error| MonitorError::Configuration(error.to_string()))?;
        let response =
            self.client.get(url.clone()).send().await.map_err(MonitorError::Network)?;

        let response = if response.status() == StatusCode::UNAUTHORIZED {
            self.answer_challenge(&url, response).await?
        } else {
            response
        };

        if !response.status().is_success() {
            return Err(MonitorError::Status(response.status()));
        }
        response.text().await.map_err(MonitorError::Network)
    }

    async fn answer_challenge(
        &self,
        url: &Url,
        response: reqwest::Response,
    ) -> Result<reqwest::Response, MonitorError> {
        let Some(credentials) = &self.credentials else {
            return Ok(response);
        };
        let Some(challenge) = response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|value| value.to_str().ok())
            .and_then(Challenge::parse)
        else {
            return Ok(response);
        };

        let uri = match url.query() {
            Some(query) => format!("{}?{query}", url.path()),
            None => url.path().to_string(),
        };
        let cnonce = format!("{:x}", md5::compute(Utc::now().to_rfc3339().as_bytes()));
        let authorization = challenge.answer(credentials, "GET", &uri, &cnonce[..8]);
        debug!("answering the digest challenge");
        self.client
            .get(url.clone())
            .header(header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(MonitorError::Network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A zero-length window is rejected before any request is issued.
    #[tokio::test]
    async fn test_zero_rows_is_a_configuration_error() {
        let monitor = Monitor::new(Url::parse("http://egauge.local").unwrap(), None).unwrap();
        let error = monitor.stored(Granularity::Hourly, 0).await.unwrap_err();
        assert!(matches!(error, MonitorError::Configuration(_)));
    }
}
