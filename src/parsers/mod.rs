//! Field-typed parsers for slot extraction
//!
//! Each parser turns a raw utterance fragment into a normalized value.
//! Parsers are pure and deterministic; they are shared by the slot-filling
//! state machine and the chat-independent form entry paths, so the same
//! amount grammar yields the same number everywhere.

pub mod account;
pub mod amount;
pub mod category;
pub mod date;

pub use account::{match_account, AccountMatch, MatchConfidence, SAVINGS_PASSTHROUGH};
pub use amount::{extract_amount, parse_amount};
pub use category::{categories_for, normalize_category, suggest_category};
pub use date::parse_date;
