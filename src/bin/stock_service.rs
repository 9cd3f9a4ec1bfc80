use groq_briefs::{
    api,
    config::AppConfig,
    data_structures::StockState,
    groq::GroqClient,
    nse::NseClient,
};
use std::sync::Arc;
use tracing::Instrument;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    groq_briefs::init_tracing();

    let app_config = AppConfig::load("stock-service")
        .inspect_err(|e| tracing::error!(error = %e, "Failed to load configuration"))?;

    // Set a global span with the service name for all subsequent logs
    let span = tracing::info_span!("service", name = %app_config.service_name);
    run(app_config).instrument(span).await
}

async fn run(app_config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting stock-service");
    tracing::info!(
        model = app_config.groq_model.as_deref().unwrap_or("<unset>"),
        nse_base_url = %app_config.nse_base_url,
        "Loaded configuration"
    );
    if app_config.groq_model.is_none() {
        tracing::warn!("GROQ_MODEL is not set; analyze=true requests will report a model error");
    }

    let quotes = NseClient::new(true, app_config.http_timeout)?.with_base_url(&app_config.nse_base_url);
    let llm = GroqClient::new(&app_config.groq_api_key, app_config.http_timeout)?
        .with_base_url(&app_config.groq_base_url);

    let state = StockState {
        quotes: Arc::new(quotes),
        llm: Arc::new(llm),
        model: app_config.groq_model.clone(),
    };
    let app = api::stock_router(state);

    let addr = app_config.listen_addr();
    tracing::info!(%addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
