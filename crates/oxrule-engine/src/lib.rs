//! Rule evaluation core: resolves event fields, applies condition operators
//! and folds a rule's AND/OR tree into a single verdict.
//!
//! Evaluation is pure except for `repeat_over`, which consults a
//! [`RepeatCounter`] backed by the shared key-value store.

pub mod condition;
pub mod field;
pub mod logic;


use anyhow::Result;
use async_trait::async_trait;
use oxrule_common::types::{Event, Rule};

pub use condition::{ConditionEvaluator, RepeatWindow};
pub use field::FieldValue;
pub use logic::{evaluate_node, evaluate_rule};

/// Fixed-window occurrence counter keyed by (rule, tenant, service,
/// environment).
///
/// The first call for a key starts a window of `window_minutes` and returns
/// 1; later calls inside the window return the post-increment count. Once
/// the window expires the next call starts over at 1.
#[async_trait]
pub trait RepeatCounter: Send + Sync {
    /// Records one occurrence of `event` for `rule` and returns the count in
    /// the current window.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store is unreachable. Callers treat
    /// this as "count unavailable" and fail the condition closed.
    async fn count_in_window(&self, event: &Event, rule: &Rule, window_minutes: u32)
        -> Result<i64>;
}
