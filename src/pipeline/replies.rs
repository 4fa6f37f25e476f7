//! Localized reply texts
//!
//! Every failure mode maps to one human reply with a next step; raw error
//! codes never reach the chat.

use crate::executor::format_rupiah;
use crate::models::{AccountBalance, ActionKind, ConversationState, FieldKind, Language};

pub fn cancelled(language: Language) -> String {
    match language {
        Language::Indonesian => "Oke, aksi dibatalkan.".to_string(),
        Language::English => "Okay, the action was cancelled.".to_string(),
    }
}

pub fn nothing_to_cancel(language: Language) -> String {
    match language {
        Language::Indonesian => "Tidak ada aksi yang sedang berjalan.".to_string(),
        Language::English => "There is nothing in progress to cancel.".to_string(),
    }
}

pub fn could_not_understand(language: Language) -> String {
    match language {
        Language::Indonesian => {
            "Maaf, saya belum mengerti. Coba ulangi dengan kata lain, misalnya 'catat pengeluaran makan 50rb dari cash'.".to_string()
        }
        Language::English => {
            "Sorry, I did not understand that. Try rephrasing, e.g. 'record a 50rb food expense from cash'.".to_string()
        }
    }
}

pub fn general_help(language: Language) -> String {
    match language {
        Language::Indonesian => {
            "Halo! Saya bisa mencatat transaksi, transfer antar akun, membuat target tabungan, dan menampilkan ringkasan keuangan. Coba: 'catat pengeluaran makan 50rb dari cash'.".to_string()
        }
        Language::English => {
            "Hi! I can record transactions, transfer between accounts, manage savings goals, and show summaries. Try: 'record a 50rb food expense from cash'.".to_string()
        }
    }
}

pub fn transient_trouble(language: Language) -> String {
    match language {
        Language::Indonesian => {
            "Maaf, ada gangguan sebentar. Coba kirim ulang pesannya ya.".to_string()
        }
        Language::English => {
            "Sorry, something went wrong for a moment. Please send that again.".to_string()
        }
    }
}

pub fn crossed_messages(language: Language) -> String {
    match language {
        Language::Indonesian => {
            "Pesan tadi bersilangan dengan pesan lain. Mohon ulangi sekali lagi.".to_string()
        }
        Language::English => {
            "That crossed with another message. Please repeat it once more.".to_string()
        }
    }
}

pub fn execution_failed(language: Language) -> String {
    match language {
        Language::Indonesian => {
            "Maaf, aksi gagal dijalankan. Percakapan direset; silakan coba dari awal.".to_string()
        }
        Language::English => {
            "Sorry, the action failed. The conversation was reset; please start over.".to_string()
        }
    }
}

pub fn rejected(reason: &str, language: Language) -> String {
    match language {
        Language::Indonesian => format!("{} Aksi tidak dijalankan.", reason),
        Language::English => format!("{} Nothing was changed.", reason),
    }
}

pub fn balances(balances: &[AccountBalance], language: Language) -> String {
    if balances.is_empty() {
        return match language {
            Language::Indonesian => "Belum ada transaksi tercatat.".to_string(),
            Language::English => "No transactions recorded yet.".to_string(),
        };
    }

    let list = balances
        .iter()
        .map(|b| format!("{} {}", b.account, format_rupiah(b.balance)))
        .collect::<Vec<_>>()
        .join(", ");

    match language {
        Language::Indonesian => format!("Saldo akun: {}.", list),
        Language::English => format!("Account balances: {}.", list),
    }
}

/// Yes/no question for the CONFIRMING step of destructive actions.
pub fn confirm_question(state: &ConversationState, language: Language) -> String {
    let id_of = |field: FieldKind| {
        state
            .partial_data
            .get(field.key())
            .and_then(|v| v.as_i64())
            .map(|id| id.to_string())
            .unwrap_or_else(|| "?".to_string())
    };

    match (state.intent, language) {
        (ActionKind::DeleteTransaction, Language::Indonesian) => format!(
            "Hapus transaksi #{}? Aksi ini tidak dapat dibatalkan. (Ya/Batal)",
            id_of(FieldKind::TransactionId)
        ),
        (ActionKind::DeleteTransaction, Language::English) => format!(
            "Delete transaction #{}? This cannot be undone. (Yes/Cancel)",
            id_of(FieldKind::TransactionId)
        ),
        (ActionKind::DeleteSavingsGoal, Language::Indonesian) => format!(
            "Hapus target tabungan #{}? Aksi ini tidak dapat dibatalkan. (Ya/Batal)",
            id_of(FieldKind::GoalId)
        ),
        (ActionKind::DeleteSavingsGoal, Language::English) => format!(
            "Delete savings goal #{}? This cannot be undone. (Yes/Cancel)",
            id_of(FieldKind::GoalId)
        ),
        (_, Language::Indonesian) => "Lanjutkan aksi ini? (Ya/Batal)".to_string(),
        (_, Language::English) => "Proceed with this action? (Yes/Cancel)".to_string(),
    }
}
