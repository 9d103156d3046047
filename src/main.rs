use std::sync::Arc;

use career_assist::config::AppConfig;
use career_assist::llm::{LlmBackend, LlmConfig, create_embedder, create_provider};
use career_assist::notify::{NotificationSink, NullNotifier, TelegramNotifier};
use career_assist::pipeline::{
    IntakeGate, PipelineController, ResponseEvaluator, ResponseGenerator,
};
use career_assist::retrieval::{ContextRetriever, ResumeIndex};
use career_assist::server::routes;
use career_assist::store::InteractionLog;

/// Embedding model — cheap and good enough for résumé chunks.
const EMBEDDING_MODEL: &str = "text-embedding-3-small";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AppConfig::from_env()?;

    // ── LLM provider ─────────────────────────────────────────────────────
    let backend = match std::env::var("CAREER_ASSIST_BACKEND").as_deref() {
        Ok("anthropic") => LlmBackend::Anthropic,
        _ => LlmBackend::OpenAi,
    };
    let (key_var, default_model) = match backend {
        LlmBackend::Anthropic => ("ANTHROPIC_API_KEY", "claude-sonnet-4-20250514"),
        LlmBackend::OpenAi => ("OPENAI_API_KEY", "gpt-4o-mini"),
    };
    let api_key = std::env::var(key_var).unwrap_or_else(|_| {
        eprintln!("Error: {key_var} not set");
        std::process::exit(1);
    });
    let model =
        std::env::var("CAREER_ASSIST_MODEL").unwrap_or_else(|_| default_model.to_string());

    let llm = create_provider(&LlmConfig {
        backend,
        api_key: secrecy::SecretString::from(api_key),
        model: model.clone(),
        timeout: config.llm_timeout,
    })?;

    // Embeddings always need an OpenAI key, whatever the completion backend.
    let embedding_key = std::env::var("OPENAI_API_KEY").unwrap_or_else(|_| {
        eprintln!("Error: OPENAI_API_KEY not set (required for embeddings)");
        std::process::exit(1);
    });
    let embedder = create_embedder(
        &secrecy::SecretString::from(embedding_key),
        EMBEDDING_MODEL,
        config.llm_timeout,
    )?;

    eprintln!("🤖 Career Assist v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", model);
    eprintln!("   Resume: {}", config.resume_path.display());
    eprintln!("   API: http://0.0.0.0:{}", config.port);

    // ── Resume index ─────────────────────────────────────────────────────
    // Built (or loaded) before the listener binds: a missing resume is a
    // fatal configuration error, and no work is accepted until the index
    // exists.
    let index = ResumeIndex::build_or_load(
        &config.resume_path,
        &config.index_path,
        embedder.as_ref(),
        &config.pipeline,
    )
    .await
    .unwrap_or_else(|e| {
        eprintln!("Error: failed to build resume index: {e}");
        std::process::exit(1);
    });
    eprintln!("   Index: {} chunks", index.len());

    let retriever = Arc::new(ContextRetriever::new(
        index,
        embedder,
        config.pipeline.topic_top_k,
    ));

    // ── Notifications ────────────────────────────────────────────────────
    let notifier: Arc<dyn NotificationSink> = match TelegramNotifier::from_env() {
        Some(telegram) => {
            eprintln!("   Notifications: telegram");
            Arc::new(telegram)
        }
        None => {
            eprintln!("   Notifications: disabled");
            Arc::new(NullNotifier)
        }
    };

    // ── Pipeline ─────────────────────────────────────────────────────────
    let controller = Arc::new(PipelineController::new(
        IntakeGate::new(llm.clone(), retriever.clone()),
        ResponseGenerator::new(llm.clone(), retriever.clone()),
        ResponseEvaluator::new(llm, config.pipeline.score_threshold),
        notifier,
        config.pipeline.clone(),
    ));

    let log = Arc::new(InteractionLog::new(config.log_path.clone()));
    eprintln!("   Log: {}\n", config.log_path.display());

    // ── Serve ────────────────────────────────────────────────────────────
    let app = routes(controller, log);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Career Assist listening");
    axum::serve(listener, app).await?;

    Ok(())
}
