//! Ledger store interface and backends
//!
//! The pipeline consumes the ledger through the narrow `LedgerStore` trait.
//! Multi-row mutations (transfer pair, goal contribution) are single trait
//! ops so every backend can hold them inside one transaction boundary.
//! In-memory backend for tests and dev; Postgres backend for deployment.

use crate::error::PipelineError;
use crate::models::{
    AccountBalance, FinancialSummary, GoalPatch, SavingsGoal, SummaryPeriod, Transaction,
    TransactionKind, TransactionPatch,
};
use crate::Result;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{OnceCell, RwLock};
use uuid::Uuid;

/// Category recorded on the rows of an account-to-account transfer.
pub const TRANSFER_CATEGORY: &str = "Transfer";

/// Category recorded on goal-contribution rows.
pub const SAVINGS_CATEGORY: &str = "Tabungan";

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    pub category: String,
    pub amount: f64,
    pub account: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct NewGoal {
    pub user_id: Uuid,
    pub name: String,
    pub target_amount: f64,
    pub target_date: Option<NaiveDate>,
    pub description: String,
}

/// Narrow ledger contract. All ops are scoped by `user_id`; a lookup for a
/// row owned by another user fails with `NotFound`, never leaks the row.
#[async_trait::async_trait]
pub trait LedgerStore: Send + Sync {
    async fn insert_transaction(&self, tx: NewTransaction) -> Result<i64>;
    async fn update_transaction(
        &self,
        id: i64,
        user_id: Uuid,
        patch: &TransactionPatch,
    ) -> Result<()>;
    async fn delete_transaction(&self, id: i64, user_id: Uuid) -> Result<()>;
    async fn get_transaction(&self, id: i64, user_id: Uuid) -> Result<Transaction>;

    async fn insert_goal(&self, goal: NewGoal) -> Result<i64>;
    async fn update_goal(&self, id: i64, user_id: Uuid, patch: &GoalPatch) -> Result<()>;
    async fn delete_goal(&self, id: i64, user_id: Uuid) -> Result<()>;
    async fn get_goal(&self, id: i64, user_id: Uuid) -> Result<SavingsGoal>;

    async fn get_accounts_with_balances(&self, user_id: Uuid) -> Result<Vec<AccountBalance>>;
    async fn get_summary(&self, user_id: Uuid, period: SummaryPeriod) -> Result<FinancialSummary>;

    /// Move funds between accounts: one expense row on the source and one
    /// income row on the destination, committed together or not at all.
    async fn record_transfer(
        &self,
        user_id: Uuid,
        amount: f64,
        from_account: &str,
        to_account: &str,
        date: NaiveDate,
        description: &str,
    ) -> Result<(i64, i64)>;

    /// Contribute to a savings goal: a transfer row on the source account
    /// and the goal's `current_amount` increment, atomically. Returns the
    /// transaction id.
    async fn record_goal_contribution(
        &self,
        user_id: Uuid,
        goal_id: i64,
        amount: f64,
        from_account: &str,
        date: NaiveDate,
    ) -> Result<i64>;
}

//
// ================= In-Memory Backend =================
//

#[derive(Default)]
struct LedgerInner {
    transactions: HashMap<i64, Transaction>,
    goals: HashMap<i64, SavingsGoal>,
    next_transaction_id: i64,
    next_goal_id: i64,
}

impl LedgerInner {
    fn insert_transaction(&mut self, tx: NewTransaction) -> i64 {
        self.next_transaction_id += 1;
        let id = self.next_transaction_id;
        self.transactions.insert(
            id,
            Transaction {
                id,
                user_id: tx.user_id,
                date: tx.date,
                kind: tx.kind,
                category: tx.category,
                amount: tx.amount,
                account: tx.account,
                description: tx.description,
            },
        );
        id
    }
}

/// In-memory ledger for unit tests and the demo binary.
pub struct InMemoryLedger {
    inner: Arc<RwLock<LedgerInner>>,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(LedgerInner::default())),
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

fn signed_amount(tx: &Transaction) -> f64 {
    match tx.kind {
        TransactionKind::Income => tx.amount,
        // Transfer rows on an account are always outflows (the inflow side
        // is recorded as income on the destination)
        TransactionKind::Expense | TransactionKind::Transfer => -tx.amount,
    }
}

#[async_trait::async_trait]
impl LedgerStore for InMemoryLedger {
    async fn insert_transaction(&self, tx: NewTransaction) -> Result<i64> {
        let mut inner = self.inner.write().await;
        Ok(inner.insert_transaction(tx))
    }

    async fn update_transaction(
        &self,
        id: i64,
        user_id: Uuid,
        patch: &TransactionPatch,
    ) -> Result<()> {
        let mut inner = self.inner.write().await;
        let tx = inner
            .transactions
            .get_mut(&id)
            .filter(|t| t.user_id == user_id)
            .ok_or_else(|| PipelineError::NotFound(format!("transaction {}", id)))?;

        if let Some(date) = patch.date {
            tx.date = date;
        }
        if let Some(kind) = patch.kind {
            tx.kind = kind;
        }
        if let Some(category) = &patch.category {
            tx.category = category.clone();
        }
        if let Some(amount) = patch.amount {
            tx.amount = amount;
        }
        if let Some(account) = &patch.account {
            tx.account = account.clone();
        }
        if let Some(description) = &patch.description {
            tx.description = description.clone();
        }
        Ok(())
    }

    async fn delete_transaction(&self, id: i64, user_id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.transactions.get(&id) {
            Some(tx) if tx.user_id == user_id => {
                inner.transactions.remove(&id);
                Ok(())
            }
            _ => Err(PipelineError::NotFound(format!("transaction {}", id))),
        }
    }

    async fn get_transaction(&self, id: i64, user_id: Uuid) -> Result<Transaction> {
        let inner = self.inner.read().await;
        inner
            .transactions
            .get(&id)
            .filter(|t| t.user_id == user_id)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound(format!("transaction {}", id)))
    }

    async fn insert_goal(&self, goal: NewGoal) -> Result<i64> {
        let mut inner = self.inner.write().await;
        inner.next_goal_id += 1;
        let id = inner.next_goal_id;
        inner.goals.insert(
            id,
            SavingsGoal {
                id,
                user_id: goal.user_id,
                name: goal.name,
                target_amount: goal.target_amount,
                current_amount: 0.0,
                target_date: goal.target_date,
                description: goal.description,
            },
        );
        Ok(id)
    }

    async fn update_goal(&self, id: i64, user_id: Uuid, patch: &GoalPatch) -> Result<()> {
        let mut inner = self.inner.write().await;
        let goal = inner
            .goals
            .get_mut(&id)
            .filter(|g| g.user_id == user_id)
            .ok_or_else(|| PipelineError::NotFound(format!("goal {}", id)))?;

        if let Some(name) = &patch.name {
            goal.name = name.clone();
        }
        if let Some(target_amount) = patch.target_amount {
            goal.target_amount = target_amount;
        }
        if let Some(target_date) = patch.target_date {
            goal.target_date = Some(target_date);
        }
        if let Some(description) = &patch.description {
            goal.description = description.clone();
        }
        Ok(())
    }

    async fn delete_goal(&self, id: i64, user_id: Uuid) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.goals.get(&id) {
            Some(goal) if goal.user_id == user_id => {
                inner.goals.remove(&id);
                Ok(())
            }
            _ => Err(PipelineError::NotFound(format!("goal {}", id))),
        }
    }

    async fn get_goal(&self, id: i64, user_id: Uuid) -> Result<SavingsGoal> {
        let inner = self.inner.read().await;
        inner
            .goals
            .get(&id)
            .filter(|g| g.user_id == user_id)
            .cloned()
            .ok_or_else(|| PipelineError::NotFound(format!("goal {}", id)))
    }

    async fn get_accounts_with_balances(&self, user_id: Uuid) -> Result<Vec<AccountBalance>> {
        let inner = self.inner.read().await;
        let mut balances: HashMap<String, f64> = HashMap::new();

        for tx in inner.transactions.values().filter(|t| t.user_id == user_id) {
            *balances.entry(tx.account.clone()).or_insert(0.0) += signed_amount(tx);
        }

        let mut out: Vec<AccountBalance> = balances
            .into_iter()
            .map(|(account, balance)| AccountBalance { account, balance })
            .collect();
        out.sort_by(|a, b| a.account.cmp(&b.account));
        Ok(out)
    }

    async fn get_summary(&self, user_id: Uuid, period: SummaryPeriod) -> Result<FinancialSummary> {
        let inner = self.inner.read().await;

        let mut total_income = 0.0;
        let mut total_expense = 0.0;
        let mut by_category: HashMap<String, f64> = HashMap::new();

        for tx in inner
            .transactions
            .values()
            .filter(|t| t.user_id == user_id && period.contains(t.date))
        {
            match tx.kind {
                TransactionKind::Income => total_income += tx.amount,
                TransactionKind::Expense => {
                    total_expense += tx.amount;
                    *by_category.entry(tx.category.clone()).or_insert(0.0) += tx.amount;
                }
                TransactionKind::Transfer => {}
            }
        }

        let mut expense_by_category: Vec<(String, f64)> = by_category.into_iter().collect();
        expense_by_category
            .sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(FinancialSummary {
            period,
            total_income,
            total_expense,
            net: total_income - total_expense,
            expense_by_category,
        })
    }

    async fn record_transfer(
        &self,
        user_id: Uuid,
        amount: f64,
        from_account: &str,
        to_account: &str,
        date: NaiveDate,
        description: &str,
    ) -> Result<(i64, i64)> {
        // Single write-lock scope keeps both rows atomic
        let mut inner = self.inner.write().await;

        let out_id = inner.insert_transaction(NewTransaction {
            user_id,
            date,
            kind: TransactionKind::Expense,
            category: TRANSFER_CATEGORY.to_string(),
            amount,
            account: from_account.to_string(),
            description: format!("Transfer to {}: {}", to_account, description),
        });
        let in_id = inner.insert_transaction(NewTransaction {
            user_id,
            date,
            kind: TransactionKind::Income,
            category: TRANSFER_CATEGORY.to_string(),
            amount,
            account: to_account.to_string(),
            description: format!("Transfer from {}: {}", from_account, description),
        });

        Ok((out_id, in_id))
    }

    async fn record_goal_contribution(
        &self,
        user_id: Uuid,
        goal_id: i64,
        amount: f64,
        from_account: &str,
        date: NaiveDate,
    ) -> Result<i64> {
        let mut inner = self.inner.write().await;

        // Goal must still exist at commit time; nothing is written otherwise
        let goal_name = {
            let goal = inner
                .goals
                .get(&goal_id)
                .filter(|g| g.user_id == user_id)
                .ok_or_else(|| PipelineError::NotFound(format!("goal {}", goal_id)))?;
            goal.name.clone()
        };

        let tx_id = inner.insert_transaction(NewTransaction {
            user_id,
            date,
            kind: TransactionKind::Transfer,
            category: SAVINGS_CATEGORY.to_string(),
            amount,
            account: from_account.to_string(),
            description: format!("Menabung ke target: {}", goal_name),
        });

        if let Some(goal) = inner.goals.get_mut(&goal_id) {
            goal.current_amount += amount;
        }

        Ok(tx_id)
    }
}

//
// ================= Postgres Backend =================
//

/// Postgres-backed ledger. Composite ops run inside database transactions.
pub struct PostgresLedger {
    pool: PgPool,
    schema_ready: Arc<OnceCell<()>>,
}

impl PostgresLedger {
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
                    CREATE TABLE IF NOT EXISTS transactions (
                      id BIGSERIAL PRIMARY KEY,
                      user_id UUID NOT NULL,
                      date DATE NOT NULL,
                      type TEXT NOT NULL,
                      category TEXT NOT NULL,
                      amount DOUBLE PRECISION NOT NULL CHECK (amount > 0),
                      account TEXT NOT NULL,
                      description TEXT NOT NULL DEFAULT ''
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE TABLE IF NOT EXISTS savings_goals (
                      id BIGSERIAL PRIMARY KEY,
                      user_id UUID NOT NULL,
                      name TEXT NOT NULL,
                      target_amount DOUBLE PRECISION NOT NULL CHECK (target_amount > 0),
                      current_amount DOUBLE PRECISION NOT NULL DEFAULT 0,
                      target_date DATE,
                      description TEXT NOT NULL DEFAULT ''
                    );
                    "#,
                )
                .execute(&self.pool)
                .await?;

                sqlx::query(
                    r#"
                    CREATE INDEX IF NOT EXISTS idx_transactions_user_date
                    ON transactions (user_id, date);
                    "#,
                )
                .execute(&self.pool)
                .await?;

                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(|e| PipelineError::Database(format!("ledger schema init failed: {}", e)))?;

        Ok(())
    }

    fn row_to_transaction(row: &sqlx::postgres::PgRow) -> Result<Transaction> {
        let kind_raw: String = row.try_get("type")?;
        let kind = TransactionKind::parse(&kind_raw)
            .ok_or_else(|| PipelineError::Database(format!("bad transaction type: {}", kind_raw)))?;
        Ok(Transaction {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            date: row.try_get("date")?,
            kind,
            category: row.try_get("category")?,
            amount: row.try_get("amount")?,
            account: row.try_get("account")?,
            description: row.try_get("description")?,
        })
    }
}

#[async_trait::async_trait]
impl LedgerStore for PostgresLedger {
    async fn insert_transaction(&self, tx: NewTransaction) -> Result<i64> {
        self.ensure_schema().await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (user_id, date, type, category, amount, account, description)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(tx.user_id)
        .bind(tx.date)
        .bind(tx.kind.to_string())
        .bind(&tx.category)
        .bind(tx.amount)
        .bind(&tx.account)
        .bind(&tx.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update_transaction(
        &self,
        id: i64,
        user_id: Uuid,
        patch: &TransactionPatch,
    ) -> Result<()> {
        self.ensure_schema().await?;
        let result = sqlx::query(
            r#"
            UPDATE transactions SET
              date = COALESCE($3, date),
              type = COALESCE($4, type),
              category = COALESCE($5, category),
              amount = COALESCE($6, amount),
              account = COALESCE($7, account),
              description = COALESCE($8, description)
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(patch.date)
        .bind(patch.kind.map(|k| k.to_string()))
        .bind(patch.category.as_deref())
        .bind(patch.amount)
        .bind(patch.account.as_deref())
        .bind(patch.description.as_deref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PipelineError::NotFound(format!("transaction {}", id)));
        }
        Ok(())
    }

    async fn delete_transaction(&self, id: i64, user_id: Uuid) -> Result<()> {
        self.ensure_schema().await?;
        let result = sqlx::query("DELETE FROM transactions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PipelineError::NotFound(format!("transaction {}", id)));
        }
        Ok(())
    }

    async fn get_transaction(&self, id: i64, user_id: Uuid) -> Result<Transaction> {
        self.ensure_schema().await?;
        let row = sqlx::query(
            r#"
            SELECT id, user_id, date, type, category, amount, account, description
            FROM transactions WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| PipelineError::NotFound(format!("transaction {}", id)))?;

        Self::row_to_transaction(&row)
    }

    async fn insert_goal(&self, goal: NewGoal) -> Result<i64> {
        self.ensure_schema().await?;
        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO savings_goals (user_id, name, target_amount, target_date, description)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(goal.user_id)
        .bind(&goal.name)
        .bind(goal.target_amount)
        .bind(goal.target_date)
        .bind(&goal.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(id)
    }

    async fn update_goal(&self, id: i64, user_id: Uuid, patch: &GoalPatch) -> Result<()> {
        self.ensure_schema().await?;
        let result = sqlx::query(
            r#"
            UPDATE savings_goals SET
              name = COALESCE($3, name),
              target_amount = COALESCE($4, target_amount),
              target_date = COALESCE($5, target_date),
              description = COALESCE($6, description)
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .bind(patch.name.as_deref())
        .bind(patch.target_amount)
        .bind(patch.target_date)
        .bind(patch.description.as_deref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(PipelineError::NotFound(format!("goal {}", id)));
        }
        Ok(())
    }

    async fn delete_goal(&self, id: i64, user_id: Uuid) -> Result<()> {
        self.ensure_schema().await?;
        let result = sqlx::query("DELETE FROM savings_goals WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PipelineError::NotFound(format!("goal {}", id)));
        }
        Ok(())
    }

    async fn get_goal(&self, id: i64, user_id: Uuid) -> Result<SavingsGoal> {
        self.ensure_schema().await?;
        let row = sqlx::query(
            r#"
            SELECT id, user_id, name, target_amount, current_amount, target_date, description
            FROM savings_goals WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| PipelineError::NotFound(format!("goal {}", id)))?;

        Ok(SavingsGoal {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            name: row.try_get("name")?,
            target_amount: row.try_get("target_amount")?,
            current_amount: row.try_get("current_amount")?,
            target_date: row.try_get("target_date")?,
            description: row.try_get("description")?,
        })
    }

    async fn get_accounts_with_balances(&self, user_id: Uuid) -> Result<Vec<AccountBalance>> {
        self.ensure_schema().await?;
        let rows = sqlx::query(
            r#"
            SELECT account,
                   SUM(CASE WHEN type = 'income' THEN amount ELSE -amount END) AS balance
            FROM transactions
            WHERE user_id = $1
            GROUP BY account
            ORDER BY account
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                Ok(AccountBalance {
                    account: row.try_get("account")?,
                    balance: row.try_get("balance")?,
                })
            })
            .collect()
    }

    async fn get_summary(&self, user_id: Uuid, period: SummaryPeriod) -> Result<FinancialSummary> {
        self.ensure_schema().await?;
        let rows = sqlx::query(
            r#"
            SELECT type, category, SUM(amount) AS total
            FROM transactions
            WHERE user_id = $1
              AND EXTRACT(YEAR FROM date)::int = $2
              AND EXTRACT(MONTH FROM date)::int = $3
            GROUP BY type, category
            "#,
        )
        .bind(user_id)
        .bind(period.year)
        .bind(period.month as i32)
        .fetch_all(&self.pool)
        .await?;

        let mut total_income = 0.0;
        let mut total_expense = 0.0;
        let mut expense_by_category: Vec<(String, f64)> = Vec::new();

        for row in &rows {
            let kind: String = row.try_get("type")?;
            let category: String = row.try_get("category")?;
            let total: f64 = row.try_get("total")?;
            match kind.as_str() {
                "income" => total_income += total,
                "expense" => {
                    total_expense += total;
                    expense_by_category.push((category, total));
                }
                _ => {}
            }
        }
        expense_by_category
            .sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        Ok(FinancialSummary {
            period,
            total_income,
            total_expense,
            net: total_income - total_expense,
            expense_by_category,
        })
    }

    async fn record_transfer(
        &self,
        user_id: Uuid,
        amount: f64,
        from_account: &str,
        to_account: &str,
        date: NaiveDate,
        description: &str,
    ) -> Result<(i64, i64)> {
        self.ensure_schema().await?;
        let mut tx = self.pool.begin().await?;

        let out_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (user_id, date, type, category, amount, account, description)
            VALUES ($1, $2, 'expense', $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(TRANSFER_CATEGORY)
        .bind(amount)
        .bind(from_account)
        .bind(format!("Transfer to {}: {}", to_account, description))
        .fetch_one(&mut *tx)
        .await?;

        let in_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (user_id, date, type, category, amount, account, description)
            VALUES ($1, $2, 'income', $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(TRANSFER_CATEGORY)
        .bind(amount)
        .bind(to_account)
        .bind(format!("Transfer from {}: {}", from_account, description))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok((out_id, in_id))
    }

    async fn record_goal_contribution(
        &self,
        user_id: Uuid,
        goal_id: i64,
        amount: f64,
        from_account: &str,
        date: NaiveDate,
    ) -> Result<i64> {
        self.ensure_schema().await?;
        let mut tx = self.pool.begin().await?;

        let goal_name: Option<String> =
            sqlx::query_scalar("SELECT name FROM savings_goals WHERE id = $1 AND user_id = $2")
                .bind(goal_id)
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(goal_name) = goal_name else {
            return Err(PipelineError::NotFound(format!("goal {}", goal_id)));
        };

        let tx_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO transactions (user_id, date, type, category, amount, account, description)
            VALUES ($1, $2, 'transfer', $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(date)
        .bind(SAVINGS_CATEGORY)
        .bind(amount)
        .bind(from_account)
        .bind(format!("Menabung ke target: {}", goal_name))
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE savings_goals SET current_amount = current_amount + $3 WHERE id = $1 AND user_id = $2",
        )
        .bind(goal_id)
        .bind(user_id)
        .bind(amount)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(tx_id)
    }
}
