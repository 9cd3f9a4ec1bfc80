use async_trait::async_trait;
use groq_briefs::data_structures::StockQuote;
use groq_briefs::nse::{NseError, QuoteProvider};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MockQuoteProvider {
    pub quotes: HashMap<String, StockQuote>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl MockQuoteProvider {
    pub fn with_quote(mut self, quote: StockQuote) -> Self {
        self.quotes.insert(quote.symbol.clone(), quote);
        self
    }
}

#[async_trait]
impl QuoteProvider for MockQuoteProvider {
    async fn get_quote(&self, symbol: &str) -> Result<StockQuote, NseError> {
        self.calls.lock().unwrap().push(symbol.to_string());
        self.quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| NseError::NotFound(symbol.to_string()))
    }
}

pub fn infy() -> StockQuote {
    StockQuote {
        symbol: "INFY".to_string(),
        last_price: 1502.35,
        change: -10.4,
        percentage_change: -0.69,
        high: 1520.0,
        low: 1495.1,
        previous_close: 1512.75,
    }
}
