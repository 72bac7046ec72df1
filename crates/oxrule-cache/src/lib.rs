//! Key-value backed state for the rule engine: the per-scope rule cache and
//! the windowed repeat counter.
//!
//! Both sit on [`KvStore`], implemented by [`RedisStore`] in production and
//! by [`MemoryStore`] in tests.

pub mod counter;
pub mod error;
pub mod rules;
pub mod store;


pub use counter::KvRepeatCounter;
pub use error::CacheError;
pub use rules::{KvRuleCache, RuleCache};
pub use store::{KvStore, MemoryStore, RedisStore};

use std::borrow::Cow;

/// Escapes `%` and `:` in one key segment so that distinct scopes never
/// produce the same key.
pub(crate) fn key_segment(raw: &str) -> Cow<'_, str> {
    if !raw.contains(['%', ':']) {
        return Cow::Borrowed(raw);
    }
    Cow::Owned(raw.replace('%', "%25").replace(':', "%3A"))
}
