//! Alert dispatch: routes triggered actions to per-channel outbound topics.
//!
//! Each action becomes one `{event, action}` message on the topic of its
//! channel (mail, chat or bot). Delivery to the end recipient is done by
//! downstream senders consuming those topics.

pub mod dispatcher;
pub mod error;
pub mod routing;


use anyhow::Result;
use async_trait::async_trait;

pub use dispatcher::{AlertDispatcher, DispatchReport};
pub use routing::{Channel, ChannelTopics};

/// Writes one message to a named outbound topic.
#[async_trait]
pub trait OutboundPublisher: Send + Sync {
    /// Appends `payload` to `topic`.
    ///
    /// # Errors
    ///
    /// Returns an error if the message log rejects the write or cannot be
    /// reached.
    async fn publish(&self, topic: &str, payload: &str) -> Result<()>;
}
