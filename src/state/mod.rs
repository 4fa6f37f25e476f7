//! Conversation state persistence
//!
//! One in-progress multi-turn intent per chat session, with a sliding
//! 1-hour TTL. Expired rows are treated as absent and cleaned lazily on
//! the next access. Writes carry the `updated_at` observed at turn start
//! so two turns for the same session can never interleave silently.

use crate::error::PipelineError;
use crate::models::{ActionKind, ConversationState, FieldKind, FlowState};
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use tracing::info;
use uuid::Uuid;

/// Trait for conversation state persistence
#[async_trait::async_trait]
pub trait StateStore: Send + Sync {
    /// Load the active state for a session. Expired states are cleared and
    /// reported as absent.
    async fn get(&self, session_id: Uuid) -> Result<Option<ConversationState>>;

    /// Persist a state. `expected_updated_at` is the `updated_at` observed
    /// when the turn loaded the state (`None` when creating a fresh one);
    /// a mismatch means a concurrent turn won and yields `StateConflict`.
    async fn put(
        &self,
        state: ConversationState,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Remove any state for the session. Clearing an absent state is a no-op.
    async fn clear(&self, session_id: Uuid) -> Result<()>;
}

//
// ================= In-Memory Backend =================
//

/// In-memory state store for unit tests and the demo binary.
pub struct InMemoryStateStore {
    states: Arc<RwLock<HashMap<Uuid, ConversationState>>>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self {
            states: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl StateStore for InMemoryStateStore {
    async fn get(&self, session_id: Uuid) -> Result<Option<ConversationState>> {
        let now = Utc::now();

        {
            let states = self.states.read().await;
            match states.get(&session_id) {
                Some(state) if !state.is_expired(now) => return Ok(Some(state.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired: lazy delete under the write lock
        let mut states = self.states.write().await;
        if states
            .get(&session_id)
            .map(|s| s.is_expired(now))
            .unwrap_or(false)
        {
            states.remove(&session_id);
            info!(session_id = %session_id, "conversation state expired");
        }
        Ok(None)
    }

    async fn put(
        &self,
        state: ConversationState,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let now = Utc::now();
        let mut states = self.states.write().await;

        let existing = states
            .get(&state.session_id)
            .filter(|s| !s.is_expired(now))
            .map(|s| s.updated_at);

        if existing != expected_updated_at {
            return Err(PipelineError::StateConflict(state.session_id));
        }

        states.insert(state.session_id, state);
        Ok(())
    }

    async fn clear(&self, session_id: Uuid) -> Result<()> {
        let mut states = self.states.write().await;
        states.remove(&session_id);
        Ok(())
    }
}

//
// ================= Postgres Backend =================
//

/// Postgres-backed state store; the optimistic check rides on the
/// `updated_at` column in the UPDATE predicate.
pub struct PostgresStateStore {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PostgresStateStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: Arc::new(OnceCell::new()),
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS conversation_state (
                      session_id UUID PRIMARY KEY,
                      user_id UUID NOT NULL,
                      intent TEXT NOT NULL,
                      state TEXT NOT NULL,
                      awaiting TEXT,
                      partial_data TEXT NOT NULL,
                      created_at TIMESTAMPTZ NOT NULL,
                      updated_at TIMESTAMPTZ NOT NULL,
                      expires_at TIMESTAMPTZ NOT NULL
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;
                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| PipelineError::Database(format!("state schema init failed: {}", e)))?;
        Ok(())
    }

    fn row_to_state(row: &sqlx::postgres::PgRow) -> Result<ConversationState> {
        let intent_raw: String = row.try_get("intent")?;
        let state_raw: String = row.try_get("state")?;
        let awaiting_raw: Option<String> = row.try_get("awaiting")?;
        let partial_raw: String = row.try_get("partial_data")?;

        let intent = ActionKind::parse(&intent_raw)
            .ok_or_else(|| PipelineError::State(format!("unknown intent: {}", intent_raw)))?;
        let state = FlowState::parse(&state_raw)
            .ok_or_else(|| PipelineError::State(format!("unknown flow state: {}", state_raw)))?;
        let awaiting = awaiting_raw.as_deref().and_then(FieldKind::from_key);
        let partial_data: serde_json::Map<String, serde_json::Value> =
            serde_json::from_str(&partial_raw)?;

        Ok(ConversationState {
            session_id: row.try_get("session_id")?,
            user_id: row.try_get("user_id")?,
            intent,
            state,
            awaiting,
            partial_data,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            expires_at: row.try_get("expires_at")?,
        })
    }
}

#[async_trait::async_trait]
impl StateStore for PostgresStateStore {
    async fn get(&self, session_id: Uuid) -> Result<Option<ConversationState>> {
        self.ensure_schema().await?;

        // Lazy expiry
        sqlx::query("DELETE FROM conversation_state WHERE session_id = $1 AND expires_at <= NOW()")
            .bind(session_id)
            .execute(&self.pool)
            .await?;

        let row = sqlx::query(
            r#"
            SELECT session_id, user_id, intent, state, awaiting, partial_data,
                   created_at, updated_at, expires_at
            FROM conversation_state
            WHERE session_id = $1 AND expires_at > NOW()
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Self::row_to_state(&r)).transpose()
    }

    async fn put(
        &self,
        state: ConversationState,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.ensure_schema().await?;
        let partial_raw = serde_json::to_string(&state.partial_data)?;
        let awaiting = state.awaiting.map(|f| f.key().to_string());

        let affected = match expected_updated_at {
            Some(expected) => {
                sqlx::query(
                    r#"
                    UPDATE conversation_state
                    SET intent = $2, state = $3, awaiting = $4, partial_data = $5,
                        updated_at = $6, expires_at = $7
                    WHERE session_id = $1 AND updated_at = $8
                    "#,
                )
                .bind(state.session_id)
                .bind(state.intent.as_str())
                .bind(state.state.as_str())
                .bind(awaiting)
                .bind(partial_raw)
                .bind(state.updated_at)
                .bind(state.expires_at)
                .bind(expected)
                .execute(&self.pool)
                .await?
                .rows_affected()
            }
            None => {
                // Drop any expired leftover, then insert; a surviving row
                // means another turn created state first
                sqlx::query(
                    "DELETE FROM conversation_state WHERE session_id = $1 AND expires_at <= NOW()",
                )
                .bind(state.session_id)
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    INSERT INTO conversation_state
                      (session_id, user_id, intent, state, awaiting, partial_data,
                       created_at, updated_at, expires_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                    ON CONFLICT (session_id) DO NOTHING
                    "#,
                )
                .bind(state.session_id)
                .bind(state.user_id)
                .bind(state.intent.as_str())
                .bind(state.state.as_str())
                .bind(awaiting)
                .bind(partial_raw)
                .bind(state.created_at)
                .bind(state.updated_at)
                .bind(state.expires_at)
                .execute(&self.pool)
                .await?
                .rows_affected()
            }
        };

        if affected == 0 {
            return Err(PipelineError::StateConflict(state.session_id));
        }
        Ok(())
    }

    async fn clear(&self, session_id: Uuid) -> Result<()> {
        self.ensure_schema().await?;
        sqlx::query("DELETE FROM conversation_state WHERE session_id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// Build a state store from the environment: Postgres when `DATABASE_URL`
/// (or `POSTGRES_URL`) is set, in-memory otherwise.
pub fn state_store_from_env() -> Arc<dyn StateStore> {
    let database_url = std::env::var("POSTGRES_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok();

    if let Some(url) = database_url {
        match sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect_lazy(&url)
        {
            Ok(pool) => {
                info!("Conversation state backend: postgres");
                return Arc::new(PostgresStateStore::new(pool));
            }
            Err(error) => {
                tracing::warn!(
                    "Failed to initialize postgres state backend, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Conversation state backend: in-memory");
    Arc::new(InMemoryStateStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::STATE_TTL_SECONDS;

    fn sample_state() -> ConversationState {
        ConversationState::new(Uuid::new_v4(), Uuid::new_v4(), ActionKind::TransferFunds)
    }

    #[tokio::test]
    async fn test_put_get_clear_round_trip() {
        let store = InMemoryStateStore::new();
        let state = sample_state();
        let session_id = state.session_id;

        store.put(state.clone(), None).await.unwrap();
        let loaded = store.get(session_id).await.unwrap().unwrap();
        assert_eq!(loaded.intent, ActionKind::TransferFunds);
        assert_eq!(loaded.state, FlowState::AwaitingField);

        store.clear(session_id).await.unwrap();
        assert!(store.get(session_id).await.unwrap().is_none());

        // Clearing again is a no-op, never an error
        store.clear(session_id).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_state_is_absent() {
        let store = InMemoryStateStore::new();
        let mut state = sample_state();
        let session_id = state.session_id;

        state.updated_at = Utc::now() - chrono::Duration::seconds(STATE_TTL_SECONDS + 60);
        state.expires_at = Utc::now() - chrono::Duration::seconds(60);
        store.put(state, None).await.unwrap();

        assert!(store.get(session_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stale_write_is_rejected() {
        let store = InMemoryStateStore::new();
        let state = sample_state();
        let session_id = state.session_id;
        store.put(state, None).await.unwrap();

        let loaded = store.get(session_id).await.unwrap().unwrap();

        // A concurrent turn commits first
        let mut winner = loaded.clone();
        winner.touch();
        store.put(winner, Some(loaded.updated_at)).await.unwrap();

        // The slower turn still holds the old updated_at
        let mut loser = loaded.clone();
        loser.touch();
        let result = store.put(loser, Some(loaded.updated_at)).await;
        assert!(matches!(result, Err(PipelineError::StateConflict(_))));
    }

    #[tokio::test]
    async fn test_create_conflicts_with_existing() {
        let store = InMemoryStateStore::new();
        let state = sample_state();
        let session_id = state.session_id;
        store.put(state, None).await.unwrap();

        let fresh = ConversationState::new(
            session_id,
            Uuid::new_v4(),
            ActionKind::CreateSavingsGoal,
        );
        let result = store.put(fresh, None).await;
        assert!(matches!(result, Err(PipelineError::StateConflict(_))));
    }
}
