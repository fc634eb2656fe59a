//! Inbound webhook payload types
//!
//! The chat platform POSTs one JSON event per message. Only the fields
//! this system consumes are modeled; everything else is ignored by serde.

use serde::{Deserialize, Serialize};

/// Top-level webhook event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    #[serde(default)]
    pub instance: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventData {
    pub key: MessageKey,
    #[serde(rename = "pushName", default)]
    pub push_name: Option<String>,
    #[serde(rename = "messageType", default)]
    pub message_type: Option<String>,
    pub message: MessageBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageKey {
    /// Sender id
    #[serde(rename = "remoteJid")]
    pub remote_jid: String,
    /// True when the message was sent by this account itself
    #[serde(rename = "fromMe", default)]
    pub from_me: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageBody {
    /// Plain conversation text, empty for pure media messages
    #[serde(default)]
    pub conversation: String,
    #[serde(rename = "imageMessage", default)]
    pub image: Option<MediaRef>,
    #[serde(rename = "audioMessage", default)]
    pub audio: Option<MediaRef>,
}

/// Reference to a media attachment hosted by the chat platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaRef {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "mimetype", default)]
    pub mime_type: Option<String>,
}

impl InboundEvent {
    /// Parse a raw JSON body into an event.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }
}
