//! Open Exchange Rates `latest.json`

use super::RateSource;
use crate::error::ChatError;
use crate::models::RateTable;
use crate::Result;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

pub struct OpenExchangeSource {
    client: Client,
    base_url: String,
    app_id: String,
}

impl OpenExchangeSource {
    pub fn new(client: Client, base_url: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            app_id: app_id.into(),
        }
    }
}

#[async_trait::async_trait]
impl RateSource for OpenExchangeSource {
    async fn latest_rates(&self) -> Result<RateTable> {
        let url = format!("{}/api/latest.json", self.base_url);
        debug!("Open Exchange Rates latest");

        let response = self
            .client
            .get(&url)
            .query(&[("app_id", &self.app_id)])
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(ChatError::UpstreamStatus {
                service: "Open Exchange Rates",
                status: status.as_u16(),
            });
        }

        let body: LatestResponse = response.json().await?;
        Ok(RateTable {
            base: body.base,
            rates: body.rates,
            timestamp: body.timestamp,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    base: Option<String>,
    #[serde(default)]
    rates: HashMap<String, f64>,
    #[serde(default)]
    timestamp: i64,
}
