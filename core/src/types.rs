/// Wire types shared by the history endpoint and the push channel
use serde::{Deserialize, Deserializer, Serialize};

/// Which side of the conversation wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Written by the counterpart ("received" bubble)
    Inbound,
    /// Written by the local user ("sent" bubble)
    Outbound,
}

/// One message record, as served by `/messages` and pushed as `new_message`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "chat_id", default, deserialize_with = "nullable_string")]
    pub conversation_id: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub sender: String,
    #[serde(rename = "message", default, deserialize_with = "nullable_string")]
    pub text: String,
    /// ISO-8601 timestamp as stated by the producer
    #[serde(default, deserialize_with = "nullable_string")]
    pub timestamp: String,
    #[serde(rename = "is_from_assistant", default, deserialize_with = "truthy")]
    pub inbound: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

impl ChatMessage {
    pub fn direction(&self) -> Direction {
        if self.inbound {
            Direction::Inbound
        } else {
            Direction::Outbound
        }
    }
}

/// Payload of a `send_message` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMessage {
    pub platform: String,
    #[serde(rename = "chat_id")]
    pub conversation_id: String,
    #[serde(rename = "message")]
    pub text: String,
}

/// Push channel envelope: `{"event": "...", "data": {...}}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ChannelEvent {
    /// A message was stored by the backend
    NewMessage(ChatMessage),
    /// The local user submitted a message
    SendMessage(OutgoingMessage),
}

/// The backend stores the flag as an SQLite boolean, so it shows up as
/// `true`/`false`, `0`/`1`, or not at all.
fn truthy<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        serde_json::Value::String(s) => !s.is_empty(),
        _ => true,
    })
}

/// Nullable TEXT columns come through as `null`; read them as empty
fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_record_with_integer_flag() {
        let json = r#"{
            "id": 7,
            "platform": "WhatsApp",
            "sender": "Asistente",
            "chat_id": "34600111222",
            "message": "Hola",
            "timestamp": "2024-03-01T09:15:00.123456",
            "is_from_assistant": 1
        }"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.conversation_id, "34600111222");
        assert_eq!(msg.text, "Hola");
        assert!(msg.inbound);
        assert_eq!(msg.direction(), Direction::Inbound);
        assert_eq!(msg.platform.as_deref(), Some("WhatsApp"));
    }

    #[test]
    fn test_missing_flag_is_outbound() {
        let json = r#"{"chat_id":"c1","sender":"Ana","message":"hi","timestamp":"2024-01-01T10:00:00Z","is_from_assistant":0}"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.direction(), Direction::Outbound);

        let json = r#"{"chat_id":"c1","sender":"Ana","message":"hi","timestamp":"2024-01-01T10:00:00Z"}"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert!(!msg.inbound);
        assert!(msg.platform.is_none());
    }

    #[test]
    fn test_null_text_columns_read_as_empty() {
        let json = r#"{"chat_id":"c1","sender":null,"message":null,"timestamp":null,"is_from_assistant":1}"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.conversation_id, "c1");
        assert_eq!(msg.sender, "");
        assert_eq!(msg.text, "");
        assert_eq!(msg.timestamp, "");
        assert!(msg.inbound);

        let json = r#"{"chat_id":null,"sender":"Ana","message":"hi","timestamp":"2024-01-01T10:00:00Z"}"#;
        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.conversation_id, "");
        assert_eq!(msg.text, "hi");
    }

    #[test]
    fn test_send_event_wire_shape() {
        let event = ChannelEvent::SendMessage(OutgoingMessage {
            platform: "WhatsApp".to_string(),
            conversation_id: "c1".to_string(),
            text: "ok".to_string(),
        });
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "event": "send_message",
                "data": {"platform": "WhatsApp", "chat_id": "c1", "message": "ok"}
            })
        );
    }

    #[test]
    fn test_new_message_event_parses() {
        let line = r#"{"event":"new_message","data":{"chat_id":"c2","sender":"Bo","message":"yo","timestamp":"2024-01-01T11:00:00Z","is_from_assistant":true}}"#;
        match serde_json::from_str::<ChannelEvent>(line).unwrap() {
            ChannelEvent::NewMessage(msg) => {
                assert_eq!(msg.conversation_id, "c2");
                assert!(msg.inbound);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let line = r#"{"event":"typing","data":{}}"#;
        assert!(serde_json::from_str::<ChannelEvent>(line).is_err());
    }
}
