use std::sync::Arc;

use futures::stream::{self, StreamExt};
use log::warn;
use reqwest::Client;
use serde_json::Value;
use tokio::time::{sleep, Duration};

use crate::config::EndpointConfig;
use crate::error::{AppError, Context, Result};
use crate::instrument::Instrument;

use super::{ensure_concurrency_limit, QUOTE_CONCURRENCY_LIMIT};

const USER_AGENT: &str = "pricewatch/0.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RETRIES: u32 = 3;

/// A successfully fetched ticker price.
#[derive(Debug, Clone)]
pub struct Quote {
    pub instrument: Instrument,
    pub price: f64,
}

/// Fetches ticker prices for the configured instruments with bounded concurrency.
pub struct QuoteFetcher {
    client: Client,
    endpoints: EndpointConfig,
    concurrency_limit: usize,
}

impl QuoteFetcher {
    pub fn new(endpoints: EndpointConfig, proxy_url: Option<&str>) -> Result<Self> {
        Self::with_concurrency_limit(endpoints, proxy_url, QUOTE_CONCURRENCY_LIMIT)
    }

    pub fn with_concurrency_limit(
        endpoints: EndpointConfig,
        proxy_url: Option<&str>,
        concurrency_limit: usize,
    ) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT);

        if let Some(proxy) = proxy_url {
            builder = builder.proxy(
                reqwest::Proxy::all(proxy)
                    .with_context(|| format!("invalid proxy URL {proxy}"))?,
            );
        }

        let client = builder.build().context("failed to construct HTTP client")?;

        Ok(Self {
            client,
            endpoints,
            concurrency_limit: ensure_concurrency_limit(concurrency_limit),
        })
    }

    /// Fetch every instrument, dropping the ones that fail this cycle.
    pub async fn fetch_all(&self, instruments: &[Instrument]) -> Result<Vec<Quote>> {
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.concurrency_limit));

        // Fan out the request list while honouring the concurrency guard to
        // stay friendly to the API.
        let results: Vec<Option<Quote>> = stream::iter(instruments.iter().cloned())
            .map(|instrument| {
                let semaphore = Arc::clone(&semaphore);
                let this = self;
                async move {
                    let _permit = semaphore.acquire().await.unwrap();
                    match this.fetch_quote(&instrument).await {
                        Ok(quote) => Some(quote),
                        Err(e) => {
                            warn!("skipping {instrument} this cycle: {e}");
                            None
                        }
                    }
                }
            })
            .buffer_unordered(self.concurrency_limit)
            .collect()
            .await;

        let quotes: Vec<Quote> = results.into_iter().flatten().collect();

        if quotes.is_empty() {
            return Err(AppError::message("failed to fetch any ticker price"));
        }

        Ok(quotes)
    }

    /// Fetch one instrument, retrying transient failures with exponential backoff.
    pub async fn fetch_quote(&self, instrument: &Instrument) -> Result<Quote> {
        let url = self.ticker_url(instrument);

        let mut retry_count = 0;

        loop {
            match self.client.get(&url).send().await {
                Ok(response) if response.status().is_success() => {
                    let body = response.text().await?;
                    let price = parse_ticker_price(&body).map_err(|e| AppError::Fetch {
                        symbol: instrument.key(),
                        reason: e.to_string(),
                    })?;

                    if price <= 0.0 {
                        return Err(AppError::InvalidPrice {
                            symbol: instrument.key(),
                            price,
                        });
                    }

                    return Ok(Quote {
                        instrument: instrument.clone(),
                        price,
                    });
                }
                Ok(response) => {
                    retry_count += 1;
                    if retry_count >= MAX_RETRIES {
                        return Err(AppError::Fetch {
                            symbol: instrument.key(),
                            reason: format!("status {}", response.status()),
                        });
                    }
                    sleep(backoff_delay(retry_count)).await;
                }
                Err(e) => {
                    retry_count += 1;
                    if retry_count >= MAX_RETRIES {
                        return Err(AppError::Fetch {
                            symbol: instrument.key(),
                            reason: e.to_string(),
                        });
                    }
                    // Back off exponentially on transport errors before retrying.
                    sleep(backoff_delay(retry_count)).await;
                }
            }
        }
    }

    fn ticker_url(&self, instrument: &Instrument) -> String {
        match instrument {
            Instrument::Spot(symbol) => format!(
                "{}/api/v3/ticker/price?symbol={symbol}",
                self.endpoints.spot_api_url
            ),
            Instrument::Perpetual(symbol) => format!(
                "{}/fapi/v1/ticker/price?symbol={symbol}",
                self.endpoints.futures_api_url
            ),
        }
    }
}

/// Pull the decimal price out of a `/ticker/price` payload.
fn parse_ticker_price(body: &str) -> Result<f64> {
    let json: Value = serde_json::from_str(body).context("failed to parse ticker JSON")?;
    let value = json.get("price").context("ticker payload has no price field")?;

    match value {
        Value::String(text) => text
            .parse::<f64>()
            .map_err(|_| AppError::message(format!("failed to parse price value: {text}"))),
        Value::Number(number) => number
            .as_f64()
            .context("ticker price is not representable as a float")
            .map_err(AppError::from),
        _ => Err(AppError::message("ticker price has an unexpected type")),
    }
}

fn backoff_delay(retry_count: u32) -> Duration {
    Duration::from_millis(2_u64.pow(retry_count) * 1000)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints() -> EndpointConfig {
        EndpointConfig {
            spot_api_url: "https://api.binance.com".to_string(),
            futures_api_url: "https://fapi.binance.com".to_string(),
        }
    }

    #[test]
    fn parses_string_and_numeric_price_payloads() {
        let price = parse_ticker_price(r#"{"symbol":"BTCUSDT","price":"43500.50"}"#).unwrap();
        assert!((price - 43500.5).abs() < 1e-9);

        let price = parse_ticker_price(r#"{"symbol":"BTCUSDT","price":43500.5}"#).unwrap();
        assert!((price - 43500.5).abs() < 1e-9);
    }

    #[test]
    fn rejects_payloads_without_a_usable_price() {
        assert!(parse_ticker_price(r#"{"symbol":"BTCUSDT"}"#).is_err());
        assert!(parse_ticker_price(r#"{"price":"not-a-number"}"#).is_err());
        assert!(parse_ticker_price(r#"{"price":[1.0]}"#).is_err());
        assert!(parse_ticker_price("not json").is_err());
    }

    #[test]
    fn routes_instruments_to_their_market_endpoint() {
        let fetcher = QuoteFetcher::new(endpoints(), None).unwrap();

        let spot = Instrument::parse("BTCUSDT").unwrap();
        assert_eq!(
            fetcher.ticker_url(&spot),
            "https://api.binance.com/api/v3/ticker/price?symbol=BTCUSDT"
        );

        let perp = Instrument::parse("BTCUSDT_PERP").unwrap();
        assert_eq!(
            fetcher.ticker_url(&perp),
            "https://fapi.binance.com/fapi/v1/ticker/price?symbol=BTCUSDT"
        );
    }

    #[test]
    fn concurrency_limit_never_drops_to_zero() {
        let fetcher = QuoteFetcher::with_concurrency_limit(endpoints(), None, 0).unwrap();
        assert_eq!(fetcher.concurrency_limit, 1);
    }
}
