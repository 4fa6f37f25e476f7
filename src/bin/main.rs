use finance_chat_orchestrator::ledger::InMemoryLedger;
use finance_chat_orchestrator::models::{ChatTurn, Language};
use finance_chat_orchestrator::pipeline::ChatPipeline;
use finance_chat_orchestrator::state::InMemoryStateStore;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("Finance Chat Orchestrator demo starting");

    let ledger = Arc::new(InMemoryLedger::new());
    let state_store = Arc::new(InMemoryStateStore::new());
    let pipeline = ChatPipeline::new(state_store, ledger);

    let session_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    // A scripted conversation exercising the single-turn fast path, the
    // multi-turn slot filling, and a summary query
    let script = [
        "catat pengeluaran makan 50rb dari cash",
        "transfer ke ovo",
        "100000",
        "dari cash",
        "buat target tabungan liburan 5 juta",
        "berapa total pengeluaran bulan ini?",
    ];

    println!("\n=== CONVERSATION ===");
    for utterance in script {
        let reply = pipeline
            .handle_turn(&ChatTurn {
                session_id,
                user_id,
                utterance: utterance.to_string(),
                language: Language::Indonesian,
            })
            .await;

        println!("> {}", utterance);
        println!("  {}", reply.reply_text);
        if reply.should_refresh_financial_views {
            println!("  [views refreshed]");
        }
    }

    Ok(())
}
