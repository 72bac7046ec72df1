use crate::error::{NotifyError, Result};
use crate::routing::{Channel, ChannelTopics};
use crate::OutboundPublisher;
use oxrule_common::types::{Action, Event};
use serde::Serialize;
use std::sync::Arc;

/// Outbound message body, one per (event, action) pair.
#[derive(Serialize)]
struct AlertMessage<'a> {
    event: &'a Event,
    action: &'a Action,
}

/// Outcome counts of one dispatch call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    pub failed: usize,
    /// Actions with no channel (`NONE` or unrecognized types).
    pub dropped: usize,
}

/// Best-effort fan-out of actions to channel topics.
///
/// Sends are independent: a failed channel is logged and counted, never
/// retried, and does not stop the remaining actions.
#[derive(Clone)]
pub struct AlertDispatcher {
    publisher: Arc<dyn OutboundPublisher>,
    topics: ChannelTopics,
}

impl AlertDispatcher {
    pub fn new(publisher: Arc<dyn OutboundPublisher>, topics: ChannelTopics) -> Self {
        Self { publisher, topics }
    }

    pub fn topics(&self) -> &ChannelTopics {
        &self.topics
    }

    pub async fn dispatch(&self, event: &Event, actions: &[Action]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for action in actions {
            let Some(channel) = Channel::for_action(&action.action_type) else {
                tracing::warn!(
                    action_type = %action.action_type,
                    service_name = %event.service_name,
                    "Unroutable action type, dropping"
                );
                report.dropped += 1;
                continue;
            };

            match self.send(channel, event, action).await {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    tracing::error!(channel = %channel, error = %e, "Failed to dispatch action");
                    report.failed += 1;
                }
            }
        }
        report
    }

    async fn send(&self, channel: Channel, event: &Event, action: &Action) -> Result<()> {
        let topic = self.topics.topic(channel);
        let payload = serde_json::to_string(&AlertMessage { event, action })?;
        self.publisher
            .publish(topic, &payload)
            .await
            .map_err(|e| NotifyError::Publish {
                topic: topic.to_string(),
                reason: e.to_string(),
            })?;
        tracing::debug!(channel = %channel, topic = %topic, "Action dispatched");
        Ok(())
    }
}
