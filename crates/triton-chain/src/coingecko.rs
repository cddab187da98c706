//! Best-effort OLAS spot price from CoinGecko.

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use triton_core::{ports::PriceFeed, Error, Result};

const PRICE_URL: &str = "https://api.coingecko.com/api/v3/simple/price";

pub struct CoinGeckoPriceFeed {
    http: reqwest::Client,
    api_key: Option<String>,
}

impl CoinGeckoPriceFeed {
    pub fn new(api_key: Option<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Http(format!("failed to build http client: {e}")))?;
        Ok(Self { http, api_key })
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoPriceFeed {
    async fn olas_usd(&self) -> Option<f64> {
        let mut query = vec![("ids", "autonolas"), ("vs_currencies", "usd")];
        if let Some(key) = self.api_key.as_deref() {
            query.push(("x_cg_demo_api_key", key));
        }

        let response = match self
            .http
            .get(PRICE_URL)
            .query(&query)
            .header("accept", "application/json")
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!("OLAS price request failed: {e}");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!("OLAS price request returned {}", response.status());
            return None;
        }

        let body: serde_json::Value = match response.json().await {
            Ok(v) => v,
            Err(e) => {
                warn!("OLAS price response was not JSON: {e}");
                return None;
            }
        };

        let price = body.get("autonolas").and_then(|v| v.get("usd")).and_then(|v| v.as_f64());
        if price.is_none() {
            warn!("OLAS price missing from response");
        }
        price
    }
}
