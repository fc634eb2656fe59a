//! Inbound webhook module

pub mod payload;
pub mod server;

pub use payload::{EventData, InboundEvent, MediaRef, MessageBody, MessageKey};
pub use server::WebhookServer;
