use groq_briefs::{
    analysis_service::TRANSCRIPT_SUMMARY_MODEL,
    api,
    config::AppConfig,
    data_structures::TranscriptState,
    groq::GroqClient,
    youtube::YoutubeClient,
};
use std::sync::Arc;
use tracing::Instrument;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    groq_briefs::init_tracing();

    let app_config = AppConfig::load("transcript-service")
        .inspect_err(|e| tracing::error!(error = %e, "Failed to load configuration"))?;

    let span = tracing::info_span!("service", name = %app_config.service_name);
    run(app_config).instrument(span).await
}

async fn run(app_config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!("Starting transcript-service");
    tracing::info!(
        model = TRANSCRIPT_SUMMARY_MODEL,
        languages = ?app_config.transcript_languages,
        "Loaded configuration"
    );

    let captions = YoutubeClient::new(app_config.transcript_languages.clone(), app_config.http_timeout)?;
    let llm = GroqClient::new(&app_config.groq_api_key, app_config.http_timeout)?
        .with_base_url(&app_config.groq_base_url);

    let state = TranscriptState {
        captions: Arc::new(captions),
        llm: Arc::new(llm),
        model: TRANSCRIPT_SUMMARY_MODEL.to_string(),
    };
    let app = api::transcript_router(state);

    let addr = app_config.listen_addr();
    tracing::info!(%addr, "Server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
