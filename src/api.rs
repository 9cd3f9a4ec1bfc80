use crate::analysis_service::{analyze_stock, summarize_transcript};
use crate::data_structures::{StockResponse, StockState, TranscribeResponse, TranscriptResult, TranscriptState};
use crate::youtube::extract_video_id;
use axum::{
    Router,
    extract::{Json, Query, State},
    routing::get,
};
use serde::{Deserialize, Deserializer, de};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Deserialize)]
pub struct StockParams {
    pub symbol: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub analyze: bool,
}

#[derive(Debug, Deserialize)]
pub struct TranscribeParams {
    pub video_url: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub summarize: bool,
}

/// Boolean query flag with the usual form spellings (`true`, `1`, `yes`, `on`, ...).
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" | "t" | "y" => Some(true),
        "false" | "0" | "no" | "off" | "f" | "n" => Some(false),
        _ => None,
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_flag(&raw).ok_or_else(|| de::Error::custom(format!("invalid boolean flag: {}", raw)))
}

#[instrument(skip(state), fields(symbol = %params.symbol, analyze = params.analyze))]
pub async fn get_stock_handler(
    State(state): State<StockState>,
    Query(params): Query<StockParams>,
) -> Json<StockResponse> {
    let symbol = params.symbol.to_uppercase();
    debug!(%symbol, "Received stock request");

    let quote = match state.quotes.get_quote(&symbol).await {
        Ok(quote) => quote,
        Err(e) => {
            warn!(%symbol, error = %e, "Stock lookup failed");
            return Json(StockResponse::Error {
                error: format!("Stock data not found: {}", e),
            });
        }
    };

    let analysis = if params.analyze {
        Some(analyze_stock(state.llm.as_ref(), state.model.as_deref(), &quote).await)
    } else {
        None
    };

    info!(symbol = %quote.symbol, last_price = quote.last_price, analyzed = analysis.is_some(), "Returning stock data");
    Json(StockResponse::Quote {
        stock_data: quote,
        analysis,
    })
}

#[instrument(skip(state), fields(video_url = %params.video_url, summarize = params.summarize))]
pub async fn transcribe_handler(
    State(state): State<TranscriptState>,
    Query(params): Query<TranscribeParams>,
) -> Json<TranscribeResponse> {
    let video_id = extract_video_id(&params.video_url);
    debug!(%video_id, "Received transcript request");

    // Failure is decided by the fetch result, never by the caption text
    let fragments = match state.captions.fetch_transcript(&video_id).await {
        Ok(fragments) => fragments,
        Err(e) => {
            warn!(%video_id, error = %e, "Transcript fetch failed");
            return Json(TranscribeResponse::Error {
                error: format!("Error: {}", e),
            });
        }
    };

    let TranscriptResult { video_id, transcript } = TranscriptResult::from_fragments(video_id, &fragments);

    let summary = if params.summarize {
        Some(summarize_transcript(state.llm.as_ref(), &state.model, &transcript).await)
    } else {
        None
    };

    info!(%video_id, transcript_chars = transcript.len(), summarized = summary.is_some(), "Returning transcript");
    Json(TranscribeResponse::Transcript {
        video_id,
        transcript,
        summary,
    })
}

pub fn stock_router(state: StockState) -> Router {
    Router::new()
        .route("/stock/", get(get_stock_handler))
        .route("/stock", get(get_stock_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

pub fn transcript_router(state: TranscriptState) -> Router {
    Router::new()
        .route("/transcribe/", get(transcribe_handler))
        .route("/transcribe", get(transcribe_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}
