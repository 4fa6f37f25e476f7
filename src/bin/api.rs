use finance_chat_orchestrator::api::start_server;
use finance_chat_orchestrator::ledger::{InMemoryLedger, LedgerStore, PostgresLedger};
use finance_chat_orchestrator::llm::GeminiModel;
use finance_chat_orchestrator::pipeline::ChatPipeline;
use finance_chat_orchestrator::state::state_store_from_env;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let api_port: u16 = std::env::var("PORT")
        .or_else(|_| std::env::var("API_PORT"))
        .unwrap_or_else(|_| "8080".to_string())
        .parse()?;

    info!("Finance Chat Orchestrator - API Server");
    info!("Port: {}", api_port);

    // Ledger backend: Postgres when configured, in-memory otherwise
    let ledger: Arc<dyn LedgerStore> = match std::env::var("POSTGRES_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .and_then(|url| {
            sqlx::postgres::PgPoolOptions::new()
                .max_connections(5)
                .connect_lazy(&url)
                .ok()
        }) {
        Some(pool) => {
            info!("Ledger backend: postgres");
            Arc::new(PostgresLedger::new(pool))
        }
        None => {
            info!("Ledger backend: in-memory");
            Arc::new(InMemoryLedger::new())
        }
    };

    let state_store = state_store_from_env();

    // LLM fallback is optional; rules alone keep the pipeline functional
    let pipeline = match GeminiModel::from_env() {
        Some(model) => {
            info!("LLM fallback: gemini");
            ChatPipeline::with_model(state_store, ledger, Arc::new(model))
        }
        None => {
            info!("LLM fallback: disabled (rules only)");
            ChatPipeline::new(state_store, ledger)
        }
    };

    info!("Pipeline initialized, starting API server");

    start_server(Arc::new(pipeline), api_port).await?;

    Ok(())
}
