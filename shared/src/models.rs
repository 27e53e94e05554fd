//! Bot Framework wire types.

use serde::{Deserialize, Serialize};

/// A conversation participant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelAccount {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The conversation a message belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationAccount {
    pub id: String,
    #[serde(default)]
    pub is_group: bool,
}

/// Channel-specific payload; only the Telegram inline query is of interest.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelData {
    #[serde(default)]
    pub inline_query: Option<InlineQuery>,
}

/// A Telegram inline query forwarded through the channel data.
#[derive(Debug, Clone, Deserialize)]
pub struct InlineQuery {
    pub query: String,
}

/// An inbound message activity.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub channel_data: Option<ChannelData>,
    pub from: ChannelAccount,
    pub recipient: ChannelAccount,
    pub conversation: ConversationAccount,
    pub service_url: String,
}

impl Activity {
    /// Build the reply activity: sender and recipient swapped, conversation
    /// kept, `replyToId` stamped with this message's id.
    pub fn reply(&self, text: impl Into<String>) -> ReplyActivity {
        ReplyActivity {
            activity_type: "message".to_string(),
            from: self.recipient.clone(),
            recipient: self.from.clone(),
            conversation: self.conversation.clone(),
            text: text.into(),
            reply_to_id: self.id.clone(),
        }
    }
}

/// The reply posted back to the connector.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyActivity {
    #[serde(rename = "type")]
    pub activity_type: String,
    pub from: ChannelAccount,
    pub recipient: ChannelAccount,
    pub conversation: ConversationAccount,
    pub text: String,
    pub reply_to_id: String,
}

/// A parsed activity plus the forced-refresh marker.
///
/// `expired` is false for a fresh transport event and true for the single
/// automatic retry (or an inbound event already flagged as one).
#[derive(Debug, Clone)]
pub struct RetryEnvelope {
    pub activity: Activity,
    pub expired: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound() -> Activity {
        serde_json::from_str(
            r#"{
                "id": "msg-1",
                "text": "/current",
                "channelId": "skype",
                "from": {"id": "user-1", "name": "Ada"},
                "recipient": {"id": "bot-1", "name": "SensorBot"},
                "conversation": {"id": "conv-1", "isGroup": false},
                "serviceUrl": "https://smba.example.com"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn parses_inbound_activity() {
        let activity = inbound();
        assert_eq!(activity.id, "msg-1");
        assert_eq!(activity.text.as_deref(), Some("/current"));
        assert_eq!(activity.conversation.id, "conv-1");
        assert_eq!(activity.service_url, "https://smba.example.com");
    }

    #[test]
    fn reply_swaps_sender_and_recipient() {
        let reply = inbound().reply("hello");

        assert_eq!(reply.activity_type, "message");
        assert_eq!(reply.from.id, "bot-1");
        assert_eq!(reply.recipient.id, "user-1");
        assert_eq!(reply.reply_to_id, "msg-1");
        assert_eq!(reply.text, "hello");
    }

    #[test]
    fn reply_serialises_with_wire_field_names() {
        let value = serde_json::to_value(inbound().reply("hi")).unwrap();

        assert_eq!(value["type"], "message");
        assert_eq!(value["replyToId"], "msg-1");
        assert_eq!(value["conversation"]["isGroup"], false);
    }

    #[test]
    fn parses_inline_query_channel_data() {
        let activity: Activity = serde_json::from_str(
            r#"{
                "id": "msg-2",
                "channelId": "telegram",
                "channelData": {"inline_query": {"query": "-current"}},
                "from": {"id": "user-1"},
                "recipient": {"id": "bot-1"},
                "conversation": {"id": "conv-1"},
                "serviceUrl": "https://smba.example.com"
            }"#,
        )
        .unwrap();

        let query = activity
            .channel_data
            .unwrap()
            .inline_query
            .unwrap()
            .query;
        assert_eq!(query, "-current");
    }
}
