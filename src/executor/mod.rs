//! Action execution
//!
//! Exhaustive match over validated `ActionArgs`: each action maps to exactly
//! one ledger mutation, atomic at the store level. Stale references (the
//! target vanished between validation and execution) surface as retryable
//! errors; everything else is terminal for the conversation.

use crate::error::PipelineError;
use crate::ledger::LedgerStore;
use crate::models::{
    ActionArgs, ActionRequest, AffectedEntity, ExecutionReport, Language, TransactionKind,
};
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

/// Format an amount the Indonesian way: Rp 1.500.000
pub fn format_rupiah(amount: f64) -> String {
    let whole = amount.round() as i64;
    let digits = whole.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if whole < 0 {
        format!("-Rp {}", grouped)
    } else {
        format!("Rp {}", grouped)
    }
}

fn stale(e: PipelineError) -> PipelineError {
    match e {
        PipelineError::NotFound(what) => {
            PipelineError::execution(format!("stale reference: {}", what), true)
        }
        other => other,
    }
}

pub struct ActionExecutor {
    ledger: Arc<dyn LedgerStore>,
}

impl ActionExecutor {
    pub fn new(ledger: Arc<dyn LedgerStore>) -> Self {
        Self { ledger }
    }

    /// Execute one validated action. Trusts the validator completely; the
    /// only re-checking is what the ledger enforces transactionally.
    pub async fn execute(
        &self,
        request: &ActionRequest,
        language: Language,
    ) -> Result<ExecutionReport> {
        let user_id = request.user_id;
        let id = matches!(language, Language::Indonesian);

        info!(
            action = %request.args.kind(),
            %user_id,
            "executing action"
        );

        match &request.args {
            ActionArgs::AddTransaction {
                kind,
                amount,
                category,
                account,
                date,
                description,
            } => {
                let tx_id = self
                    .ledger
                    .insert_transaction(crate::ledger::NewTransaction {
                        user_id,
                        date: *date,
                        kind: *kind,
                        category: category.clone(),
                        amount: *amount,
                        account: account.clone(),
                        description: description.clone(),
                    })
                    .await?;

                let summary_text = if id {
                    let label = match kind {
                        TransactionKind::Income => "Pemasukan",
                        _ => "Pengeluaran",
                    };
                    format!(
                        "{} {} ({}) dari {} berhasil dicatat.",
                        label,
                        format_rupiah(*amount),
                        category,
                        account
                    )
                } else {
                    format!(
                        "Recorded {} {} ({}) on {}.",
                        kind,
                        format_rupiah(*amount),
                        category,
                        account
                    )
                };

                Ok(ExecutionReport {
                    summary_text,
                    affected: AffectedEntity::Transaction(tx_id),
                    refresh_views: true,
                })
            }

            ActionArgs::EditTransaction {
                transaction_id,
                patch,
            } => {
                self.ledger
                    .update_transaction(*transaction_id, user_id, patch)
                    .await
                    .map_err(stale)?;

                let summary_text = if id {
                    format!("Transaksi #{} berhasil diperbarui.", transaction_id)
                } else {
                    format!("Transaction #{} updated.", transaction_id)
                };
                Ok(ExecutionReport {
                    summary_text,
                    affected: AffectedEntity::Transaction(*transaction_id),
                    refresh_views: true,
                })
            }

            ActionArgs::DeleteTransaction { transaction_id } => {
                self.ledger
                    .delete_transaction(*transaction_id, user_id)
                    .await
                    .map_err(stale)?;

                let summary_text = if id {
                    format!("Transaksi #{} berhasil dihapus.", transaction_id)
                } else {
                    format!("Transaction #{} deleted.", transaction_id)
                };
                Ok(ExecutionReport {
                    summary_text,
                    affected: AffectedEntity::Transaction(*transaction_id),
                    refresh_views: true,
                })
            }

            ActionArgs::TransferFunds {
                amount,
                from_account,
                to_account,
                date,
                description,
            } => {
                let (out_id, in_id) = self
                    .ledger
                    .record_transfer(user_id, *amount, from_account, to_account, *date, description)
                    .await?;

                let summary_text = if id {
                    format!(
                        "Transfer {} dari {} ke {} berhasil.",
                        format_rupiah(*amount),
                        from_account,
                        to_account
                    )
                } else {
                    format!(
                        "Transferred {} from {} to {}.",
                        format_rupiah(*amount),
                        from_account,
                        to_account
                    )
                };
                Ok(ExecutionReport {
                    summary_text,
                    affected: AffectedEntity::TransactionPair(out_id, in_id),
                    refresh_views: true,
                })
            }

            ActionArgs::TransferToSavings {
                amount,
                from_account,
                goal_id,
                date,
            } => {
                let tx_id = self
                    .ledger
                    .record_goal_contribution(user_id, *goal_id, *amount, from_account, *date)
                    .await
                    .map_err(stale)?;

                // Progress line; the goal was just touched so this read is safe
                let progress = match self.ledger.get_goal(*goal_id, user_id).await {
                    Ok(goal) => {
                        if id {
                            format!(
                                " Progres '{}': {} dari {}.",
                                goal.name,
                                format_rupiah(goal.current_amount),
                                format_rupiah(goal.target_amount)
                            )
                        } else {
                            format!(
                                " '{}' progress: {} of {}.",
                                goal.name,
                                format_rupiah(goal.current_amount),
                                format_rupiah(goal.target_amount)
                            )
                        }
                    }
                    Err(e) => {
                        warn!(goal_id, "goal progress read failed after contribution: {}", e);
                        String::new()
                    }
                };

                let summary_text = if id {
                    format!(
                        "Berhasil menabung {} dari {}.{}",
                        format_rupiah(*amount),
                        from_account,
                        progress
                    )
                } else {
                    format!(
                        "Saved {} from {}.{}",
                        format_rupiah(*amount),
                        from_account,
                        progress
                    )
                };
                Ok(ExecutionReport {
                    summary_text,
                    affected: AffectedEntity::GoalContribution {
                        goal_id: *goal_id,
                        transaction_id: tx_id,
                    },
                    refresh_views: true,
                })
            }

            ActionArgs::CreateSavingsGoal {
                name,
                target_amount,
                target_date,
                description,
            } => {
                let goal_id = self
                    .ledger
                    .insert_goal(crate::ledger::NewGoal {
                        user_id,
                        name: name.clone(),
                        target_amount: *target_amount,
                        target_date: *target_date,
                        description: description.clone(),
                    })
                    .await?;

                let deadline = target_date
                    .map(|d| {
                        if id {
                            format!(" hingga {}", d)
                        } else {
                            format!(" by {}", d)
                        }
                    })
                    .unwrap_or_default();
                let summary_text = if id {
                    format!(
                        "Target tabungan '{}' dibuat (target {}{}).",
                        name,
                        format_rupiah(*target_amount),
                        deadline
                    )
                } else {
                    format!(
                        "Savings goal '{}' created (target {}{}).",
                        name,
                        format_rupiah(*target_amount),
                        deadline
                    )
                };
                Ok(ExecutionReport {
                    summary_text,
                    affected: AffectedEntity::Goal(goal_id),
                    refresh_views: true,
                })
            }

            ActionArgs::UpdateSavingsGoal { goal_id, patch } => {
                self.ledger
                    .update_goal(*goal_id, user_id, patch)
                    .await
                    .map_err(stale)?;

                let summary_text = if id {
                    format!("Target tabungan #{} berhasil diperbarui.", goal_id)
                } else {
                    format!("Savings goal #{} updated.", goal_id)
                };
                Ok(ExecutionReport {
                    summary_text,
                    affected: AffectedEntity::Goal(*goal_id),
                    refresh_views: true,
                })
            }

            ActionArgs::DeleteSavingsGoal { goal_id } => {
                self.ledger
                    .delete_goal(*goal_id, user_id)
                    .await
                    .map_err(stale)?;

                let summary_text = if id {
                    format!("Target tabungan #{} berhasil dihapus.", goal_id)
                } else {
                    format!("Savings goal #{} deleted.", goal_id)
                };
                Ok(ExecutionReport {
                    summary_text,
                    affected: AffectedEntity::Goal(*goal_id),
                    refresh_views: true,
                })
            }

            ActionArgs::QuerySummary { period } => {
                let summary = self.ledger.get_summary(user_id, *period).await?;

                let mut text = if id {
                    format!(
                        "Ringkasan {}: pemasukan {}, pengeluaran {}, selisih {}.",
                        summary.period,
                        format_rupiah(summary.total_income),
                        format_rupiah(summary.total_expense),
                        format_rupiah(summary.net)
                    )
                } else {
                    format!(
                        "Summary for {}: income {}, expenses {}, net {}.",
                        summary.period,
                        format_rupiah(summary.total_income),
                        format_rupiah(summary.total_expense),
                        format_rupiah(summary.net)
                    )
                };

                if let Some((category, total)) = summary.expense_by_category.first() {
                    if id {
                        text.push_str(&format!(
                            " Pengeluaran terbesar: {} ({}).",
                            category,
                            format_rupiah(*total)
                        ));
                    } else {
                        text.push_str(&format!(
                            " Top expense: {} ({}).",
                            category,
                            format_rupiah(*total)
                        ));
                    }
                }

                Ok(ExecutionReport {
                    summary_text: text,
                    affected: AffectedEntity::Summary,
                    refresh_views: false,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{InMemoryLedger, NewGoal};
    use crate::models::SummaryPeriod;
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 6).unwrap()
    }

    fn setup() -> (ActionExecutor, Arc<InMemoryLedger>) {
        let ledger = Arc::new(InMemoryLedger::new());
        (ActionExecutor::new(ledger.clone()), ledger)
    }

    #[test]
    fn test_rupiah_formatting() {
        assert_eq!(format_rupiah(50_000.0), "Rp 50.000");
        assert_eq!(format_rupiah(1_500_000.0), "Rp 1.500.000");
        assert_eq!(format_rupiah(999.0), "Rp 999");
        assert_eq!(format_rupiah(-2_000.0), "-Rp 2.000");
    }

    #[tokio::test]
    async fn test_add_transaction_reports_refresh() {
        let (executor, ledger) = setup();
        let user = Uuid::new_v4();

        let report = executor
            .execute(
                &ActionRequest {
                    user_id: user,
                    args: ActionArgs::AddTransaction {
                        kind: TransactionKind::Expense,
                        amount: 50_000.0,
                        category: "Makan".to_string(),
                        account: "Cash".to_string(),
                        date: today(),
                        description: String::new(),
                    },
                },
                Language::Indonesian,
            )
            .await
            .unwrap();

        assert!(report.refresh_views);
        assert!(report.summary_text.contains("Rp 50.000"));

        let AffectedEntity::Transaction(tx_id) = report.affected else {
            panic!("wrong entity");
        };
        assert!(ledger.get_transaction(tx_id, user).await.is_ok());
    }

    #[tokio::test]
    async fn test_transfer_executes_atomically() {
        let (executor, ledger) = setup();
        let user = Uuid::new_v4();

        let report = executor
            .execute(
                &ActionRequest {
                    user_id: user,
                    args: ActionArgs::TransferFunds {
                        amount: 100_000.0,
                        from_account: "Cash".to_string(),
                        to_account: "Ovo".to_string(),
                        date: today(),
                        description: String::new(),
                    },
                },
                Language::Indonesian,
            )
            .await
            .unwrap();

        let AffectedEntity::TransactionPair(out_id, in_id) = report.affected else {
            panic!("wrong entity");
        };
        assert!(ledger.get_transaction(out_id, user).await.is_ok());
        assert!(ledger.get_transaction(in_id, user).await.is_ok());
    }

    #[tokio::test]
    async fn test_stale_goal_is_retryable() {
        let (executor, _) = setup();
        let user = Uuid::new_v4();

        // Goal 999 was "deleted" between validation and execution
        let err = executor
            .execute(
                &ActionRequest {
                    user_id: user,
                    args: ActionArgs::TransferToSavings {
                        amount: 250_000.0,
                        from_account: "Cash".to_string(),
                        goal_id: 999,
                        date: today(),
                    },
                },
                Language::Indonesian,
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Execution { retryable: true, .. }
        ));
    }

    #[tokio::test]
    async fn test_goal_contribution_reports_progress() {
        let (executor, ledger) = setup();
        let user = Uuid::new_v4();
        let goal_id = ledger
            .insert_goal(NewGoal {
                user_id: user,
                name: "Liburan".to_string(),
                target_amount: 5_000_000.0,
                target_date: None,
                description: String::new(),
            })
            .await
            .unwrap();

        let report = executor
            .execute(
                &ActionRequest {
                    user_id: user,
                    args: ActionArgs::TransferToSavings {
                        amount: 250_000.0,
                        from_account: "Cash".to_string(),
                        goal_id,
                        date: today(),
                    },
                },
                Language::Indonesian,
            )
            .await
            .unwrap();

        assert!(report.summary_text.contains("Liburan"));
        assert!(report.summary_text.contains("Rp 250.000"));
    }

    #[tokio::test]
    async fn test_query_summary_does_not_refresh() {
        let (executor, _) = setup();
        let report = executor
            .execute(
                &ActionRequest {
                    user_id: Uuid::new_v4(),
                    args: ActionArgs::QuerySummary {
                        period: SummaryPeriod { year: 2026, month: 8 },
                    },
                },
                Language::English,
            )
            .await
            .unwrap();

        assert!(!report.refresh_views);
        assert!(report.summary_text.contains("Summary for 2026-08"));
    }
}
