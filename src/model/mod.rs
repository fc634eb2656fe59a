//! Hosted model client module

pub mod client;
pub mod provider;
pub mod retry;

pub use client::HostedModelClient;
pub use provider::{
    ChatMessage, ChatRequest, ContentPart, FunctionCall, FunctionSpec, ImageUrl, MessageContent,
    ModelProvider, ToolCallRequest, ToolSpec,
};
pub use retry::with_retries;
