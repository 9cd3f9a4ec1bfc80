use crate::data_structures::StockQuote;
use crate::groq::{CompletionProvider, GroqError};
use tracing::{info, warn};

pub const TRANSCRIPT_SUMMARY_MODEL: &str = "llama3-8b-8192";

const NO_ANALYSIS: &str = "No analysis available";
const NO_RESPONSE: &str = "No response";

pub fn format_stock_summary(quote: &StockQuote) -> String {
    format!(
        "Stock: {}\nLast Price: {} INR\nChange: {} ({}%)\nHigh: {}, Low: {}\nPrevious Close: {}",
        quote.symbol,
        quote.last_price,
        quote.change,
        quote.percentage_change,
        quote.high,
        quote.low,
        quote.previous_close,
    )
}

pub fn stock_prompt(quote: &StockQuote) -> String {
    format!("Analyze the following stock:\n\n{}", format_stock_summary(quote))
}

pub fn summary_prompt(text: &str) -> String {
    format!("Summarize the following text:\n\n{}", text)
}

/// Model failures never fail the request: they become the text of the field.
pub fn render_model_output(result: Result<Option<String>, GroqError>, empty_marker: &str) -> String {
    match result {
        Ok(Some(text)) => text,
        Ok(None) => empty_marker.to_string(),
        Err(e) => format!("Groq API Error: {}", e),
    }
}

async fn ask_model(
    llm: &dyn CompletionProvider,
    model: Option<&str>,
    prompt: &str,
) -> Result<Option<String>, GroqError> {
    let model = model.ok_or(GroqError::MissingModel)?;
    let response = llm.complete(model, prompt).await?;
    Ok(response.first_text())
}

pub async fn analyze_stock(llm: &dyn CompletionProvider, model: Option<&str>, quote: &StockQuote) -> String {
    let result = ask_model(llm, model, &stock_prompt(quote)).await;
    match &result {
        Ok(_) => info!(symbol = %quote.symbol, "Stock analysis completed"),
        Err(e) => warn!(symbol = %quote.symbol, error = %e, "Stock analysis failed"),
    }
    render_model_output(result, NO_ANALYSIS)
}

pub async fn summarize_transcript(llm: &dyn CompletionProvider, model: &str, transcript: &str) -> String {
    let result = ask_model(llm, Some(model), &summary_prompt(transcript)).await;
    match &result {
        Ok(_) => info!(model, transcript_chars = transcript.len(), "Transcript summary completed"),
        Err(e) => warn!(model, error = %e, "Transcript summary failed"),
    }
    render_model_output(result, NO_RESPONSE)
}
