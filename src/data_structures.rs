use crate::groq::CompletionProvider;
use crate::nse::QuoteProvider;
use crate::youtube::CaptionProvider;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// --- Core Data Structures ---

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    pub last_price: f64,
    pub change: f64,
    pub percentage_change: f64,
    pub high: f64,
    pub low: f64,
    pub previous_close: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaptionFragment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptResult {
    pub video_id: String,
    pub transcript: String,
}

impl TranscriptResult {
    pub fn from_fragments(video_id: impl Into<String>, fragments: &[CaptionFragment]) -> Self {
        let transcript = fragments
            .iter()
            .map(|f| f.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            video_id: video_id.into(),
            transcript,
        }
    }
}

// --- Wire Payloads ---

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StockResponse {
    Quote {
        stock_data: StockQuote,
        analysis: Option<String>,
    },
    Error {
        error: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TranscribeResponse {
    Transcript {
        video_id: String,
        transcript: String,
        summary: Option<String>,
    },
    Error {
        error: String,
    },
}

// --- Type Aliases for Shared State ---

pub type SharedQuoteProvider = Arc<dyn QuoteProvider>;
pub type SharedCaptionProvider = Arc<dyn CaptionProvider>;
pub type SharedCompletionProvider = Arc<dyn CompletionProvider>;

#[derive(Clone)]
pub struct StockState {
    pub quotes: SharedQuoteProvider,
    pub llm: SharedCompletionProvider,
    // Unset model is reported per request, like any other model-call failure
    pub model: Option<String>,
}

#[derive(Clone)]
pub struct TranscriptState {
    pub captions: SharedCaptionProvider,
    pub llm: SharedCompletionProvider,
    pub model: String,
}
