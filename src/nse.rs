use crate::data_structures::StockQuote;
use async_trait::async_trait;
use rand::seq::IndexedRandom;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_NSE_BASE_URL: &str = "https://www.nseindia.com";

#[derive(Debug, thiserror::Error)]
pub enum NseError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("NSE responded with status {status}: {message}")]
    Status { status: u16, message: String },
    #[error("no quote available for symbol {0}")]
    NotFound(String),
    #[error("invalid NSE response: {0}")]
    InvalidResponse(String),
    #[error("symbol must not be empty")]
    EmptySymbol,
}

/// Market-data source for a single equity quote.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn get_quote(&self, symbol: &str) -> Result<StockQuote, NseError>;
}

// Raw shape of /api/quote-equity, only the fields we map
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEquityResponse {
    info: Option<EquityInfo>,
    price_info: Option<PriceInfo>,
}

#[derive(Debug, Deserialize)]
struct EquityInfo {
    symbol: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceInfo {
    last_price: f64,
    change: f64,
    p_change: f64,
    previous_close: f64,
    intra_day_high_low: IntraDayHighLow,
}

#[derive(Debug, Deserialize)]
struct IntraDayHighLow {
    min: f64,
    max: f64,
}

pub struct NseClient {
    client: Client,
    base_url: String,
    user_agents: Vec<String>,
    random_agent: bool,
    session_primed: AtomicBool,
}

impl NseClient {
    pub fn new(random_agent: bool, timeout: Option<Duration>) -> Result<Self, NseError> {
        let mut builder = Client::builder().cookie_store(true).gzip(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        let user_agents = vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:120.0) Gecko/20100101 Firefox/120.0".to_string(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.3 Safari/605.1.15".to_string(),
        ];

        Ok(NseClient {
            client,
            base_url: DEFAULT_NSE_BASE_URL.to_string(),
            user_agents,
            random_agent,
            session_primed: AtomicBool::new(false),
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    fn get_user_agent(&self) -> String {
        if self.random_agent {
            self.user_agents
                .choose(&mut rand::rng())
                .unwrap_or(&self.user_agents[0])
                .clone()
        } else {
            self.user_agents[0].clone()
        }
    }

    fn quote_request(&self, symbol: &str) -> RequestBuilder {
        self.client
            .get(format!("{}/api/quote-equity", self.base_url))
            .query(&[("symbol", symbol)])
            .header("User-Agent", self.get_user_agent())
            .header("Accept", "application/json, text/plain, */*")
            .header("Accept-Language", "en-US,en;q=0.9")
            .header(
                "Referer",
                format!(
                    "{}/get-quotes/equity?symbol={}",
                    self.base_url,
                    urlencoding::encode(symbol)
                ),
            )
    }

    // The JSON API rejects requests that lack the cookies set by the home page
    async fn prime_session(&self) -> Result<(), NseError> {
        if self.session_primed.load(Ordering::Acquire) {
            return Ok(());
        }

        debug!(base_url = %self.base_url, "Priming NSE session cookies");
        let response = self
            .client
            .get(&self.base_url)
            .header("User-Agent", self.get_user_agent())
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?;

        if !response.status().is_success() {
            warn!(status = %response.status(), "NSE home page did not return success while priming session");
        }
        self.session_primed.store(true, Ordering::Release);
        Ok(())
    }

    async fn fetch_quote_body(&self, symbol: &str) -> Result<String, NseError> {
        self.prime_session().await?;

        debug!(symbol, base_url = %self.base_url, "Requesting NSE quote");
        let response = self.quote_request(symbol).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            // Cookies expired; the next lookup starts a fresh session
            self.session_primed.store(false, Ordering::Release);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(NseError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl QuoteProvider for NseClient {
    async fn get_quote(&self, symbol: &str) -> Result<StockQuote, NseError> {
        if symbol.trim().is_empty() {
            return Err(NseError::EmptySymbol);
        }

        let body = self
            .fetch_quote_body(symbol)
            .await
            .inspect_err(|e| warn!(symbol, error = %e, "NSE quote request failed"))?;
        let quote = parse_quote(symbol, &body)?;

        info!(symbol = %quote.symbol, last_price = quote.last_price, "Fetched NSE quote");
        Ok(quote)
    }
}

pub fn parse_quote(symbol: &str, body: &str) -> Result<StockQuote, NseError> {
    let trimmed = body.trim();
    if trimmed.is_empty() || trimmed == "{}" {
        return Err(NseError::NotFound(symbol.to_string()));
    }

    let raw: QuoteEquityResponse = serde_json::from_str(trimmed)
        .map_err(|e| NseError::InvalidResponse(e.to_string()))?;

    match (raw.info, raw.price_info) {
        (Some(info), Some(price)) => Ok(StockQuote {
            symbol: info.symbol,
            last_price: price.last_price,
            change: price.change,
            percentage_change: price.p_change,
            high: price.intra_day_high_low.max,
            low: price.intra_day_high_low.min,
            previous_close: price.previous_close,
        }),
        _ => Err(NseError::NotFound(symbol.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_stub;
    use axum::{Router, extract::State, http::StatusCode as HttpStatus, routing::get};
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[derive(Clone, Default)]
    struct StubNse {
        home_hits: Arc<AtomicUsize>,
        quote_hits: Arc<AtomicUsize>,
        reject_quotes: Arc<AtomicBool>,
    }

    async fn stub_home(State(stub): State<StubNse>) -> &'static str {
        stub.home_hits.fetch_add(1, Ordering::SeqCst);
        "<html>NSE</html>"
    }

    async fn stub_quote(State(stub): State<StubNse>) -> (HttpStatus, &'static str) {
        stub.quote_hits.fetch_add(1, Ordering::SeqCst);
        if stub.reject_quotes.load(Ordering::SeqCst) {
            (HttpStatus::FORBIDDEN, "Access Denied")
        } else {
            (HttpStatus::OK, INFY_BODY)
        }
    }

    async fn stub_nse() -> (StubNse, NseClient) {
        let stub = StubNse::default();
        let app = Router::new()
            .route("/", get(stub_home))
            .route("/api/quote-equity", get(stub_quote))
            .with_state(stub.clone());
        let client = NseClient::new(false, None).unwrap().with_base_url(spawn_stub(app).await);
        (stub, client)
    }

    const INFY_BODY: &str = r#"{
        "info": {"symbol": "INFY", "companyName": "Infosys Limited", "isFNOSec": true},
        "metadata": {"series": "EQ"},
        "priceInfo": {
            "lastPrice": 1502.35,
            "change": -10.4,
            "pChange": -0.687,
            "previousClose": 1512.75,
            "open": 1510.0,
            "close": 0,
            "intraDayHighLow": {"min": 1495.1, "max": 1520.0, "value": 1502.35}
        }
    }"#;

    #[tokio::test]
    async fn test_nse_client_creation() {
        let client = NseClient::new(true, None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_parse_quote_maps_fields() {
        let quote = parse_quote("INFY", INFY_BODY).unwrap();
        assert_eq!(
            quote,
            StockQuote {
                symbol: "INFY".to_string(),
                last_price: 1502.35,
                change: -10.4,
                percentage_change: -0.687,
                high: 1520.0,
                low: 1495.1,
                previous_close: 1512.75,
            }
        );
    }

    #[test]
    fn test_parse_quote_empty_body_is_not_found() {
        assert!(matches!(parse_quote("NOPE", "{}"), Err(NseError::NotFound(s)) if s == "NOPE"));
        assert!(matches!(parse_quote("NOPE", ""), Err(NseError::NotFound(_))));
    }

    #[test]
    fn test_parse_quote_missing_price_info_is_not_found() {
        let body = r#"{"info": {"symbol": "XYZ"}}"#;
        assert!(matches!(parse_quote("XYZ", body), Err(NseError::NotFound(_))));
    }

    #[test]
    fn test_parse_quote_garbage_is_invalid() {
        assert!(matches!(
            parse_quote("INFY", "<html>Access Denied</html>"),
            Err(NseError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_quote_request_encodes_symbol() {
        let client = NseClient::new(false, None)
            .unwrap()
            .with_base_url("http://localhost:9000/");

        let request = client.quote_request("M&M").build().unwrap();
        assert_eq!(
            request.url().as_str(),
            "http://localhost:9000/api/quote-equity?symbol=M%26M"
        );
        assert_eq!(
            request.headers()["Referer"],
            "http://localhost:9000/get-quotes/equity?symbol=M%26M"
        );

        let request = client.quote_request("BAJAJ-AUTO").build().unwrap();
        assert_eq!(request.url().query(), Some("symbol=BAJAJ-AUTO"));
    }

    #[tokio::test]
    async fn test_session_primed_once_across_lookups() {
        let (stub, client) = stub_nse().await;

        let quote = client.get_quote("INFY").await.unwrap();
        assert_eq!(quote.symbol, "INFY");
        client.get_quote("INFY").await.unwrap();

        assert_eq!(stub.home_hits.load(Ordering::SeqCst), 1);
        assert_eq!(stub.quote_hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_forbidden_quote_reprimes_next_lookup() {
        let (stub, client) = stub_nse().await;
        client.get_quote("INFY").await.unwrap();

        stub.reject_quotes.store(true, Ordering::SeqCst);
        match client.get_quote("INFY").await {
            Err(NseError::Status { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "Access Denied");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        // Not retried
        assert_eq!(stub.quote_hits.load(Ordering::SeqCst), 2);
        assert_eq!(stub.home_hits.load(Ordering::SeqCst), 1);

        stub.reject_quotes.store(false, Ordering::SeqCst);
        client.get_quote("INFY").await.unwrap();
        assert_eq!(stub.home_hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_symbol_rejected_without_network() {
        let client = NseClient::new(false, None).unwrap();
        assert!(matches!(client.get_quote("  ").await, Err(NseError::EmptySymbol)));
    }
}
