use oxrule_common::types::ActionType;
use serde::{Deserialize, Serialize};

/// Outbound notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Mail,
    Chat,
    Bot,
}

impl Channel {
    /// Channel for an action type; `None` means the action is dropped.
    pub fn for_action(action_type: &ActionType) -> Option<Self> {
        match action_type {
            ActionType::Email => Some(Channel::Mail),
            ActionType::Discord => Some(Channel::Chat),
            ActionType::Telegram => Some(Channel::Bot),
            ActionType::Noop | ActionType::Other(_) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Mail => "mail",
            Channel::Chat => "chat",
            Channel::Bot => "bot",
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound topic per channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelTopics {
    #[serde(default = "default_mail_topic")]
    pub mail: String,
    #[serde(default = "default_chat_topic")]
    pub chat: String,
    #[serde(default = "default_bot_topic")]
    pub bot: String,
}

fn default_mail_topic() -> String {
    "mail-alert-topic".to_string()
}

fn default_chat_topic() -> String {
    "chat-alert-topic".to_string()
}

fn default_bot_topic() -> String {
    "bot-alert-topic".to_string()
}

impl Default for ChannelTopics {
    fn default() -> Self {
        Self {
            mail: default_mail_topic(),
            chat: default_chat_topic(),
            bot: default_bot_topic(),
        }
    }
}

impl ChannelTopics {
    pub fn topic(&self, channel: Channel) -> &str {
        match channel {
            Channel::Mail => &self.mail,
            Channel::Chat => &self.chat,
            Channel::Bot => &self.bot,
        }
    }
}
