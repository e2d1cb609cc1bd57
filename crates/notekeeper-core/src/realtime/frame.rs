//! Wire format of the realtime channel.
//!
//! Outbound: `{"event": "message", "from": "client", "data": <content>}`.
//! Inbound: `{"event": <name>, "data": <payload>}`.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::IncomingMessage;

const MESSAGE_EVENT: &str = "message";
const VAPID_EVENT: &str = "vapid";
const CLIENT_ORIGIN: &str = "client";

/// A decoded inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Chat message push
    Message(IncomingMessage),
    /// Server public key announced on connect
    VapidKey(String),
    /// Any event this client does not handle
    Other(String),
}

#[derive(Serialize)]
struct OutboundFrame<'a> {
    event: &'a str,
    from: &'a str,
    data: &'a str,
}

#[derive(Deserialize)]
struct InboundFrame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

/// Encode an outbound chat message.
pub fn encode_message_frame(content: &str) -> Result<String> {
    Ok(serde_json::to_string(&OutboundFrame {
        event: MESSAGE_EVENT,
        from: CLIENT_ORIGIN,
        data: content,
    })?)
}

/// Decode one inbound text frame.
pub fn decode_frame(text: &str) -> Result<ChannelEvent> {
    let frame: InboundFrame = serde_json::from_str(text)?;
    match frame.event.as_str() {
        MESSAGE_EVENT => Ok(ChannelEvent::Message(serde_json::from_value(frame.data)?)),
        VAPID_EVENT => match frame.data {
            serde_json::Value::String(key) => Ok(ChannelEvent::VapidKey(key)),
            other => Ok(ChannelEvent::VapidKey(other.to_string())),
        },
        _ => Ok(ChannelEvent::Other(frame.event)),
    }
}
