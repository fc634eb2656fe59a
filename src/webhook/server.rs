//! Inbound webhook server
//!
//! Minimal HTTP listener for chat-platform events: one POST per message,
//! answered with {"status":"ok"} on success, {"status":"error"} with 400
//! for malformed payloads and 500 for downstream failures. Media
//! attachments are transcoded to text before the agent sees the turn.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::agent::ConversationAgent;
use crate::core::AppState;
use crate::media::Transcoder;
use crate::model::ModelProvider;
use crate::session::SessionContext;

use super::payload::InboundEvent;

pub struct WebhookServer<P: ModelProvider + 'static> {
    host: String,
    port: u16,
    chat_model: String,
    state: Arc<AppState>,
    provider: Arc<P>,
}

impl<P: ModelProvider + 'static> WebhookServer<P> {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        chat_model: impl Into<String>,
        state: Arc<AppState>,
        provider: Arc<P>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            chat_model: chat_model.into(),
            state,
            provider,
        }
    }

    pub async fn run(&self) -> Result<()> {
        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind(&addr).await?;

        info!("Webhook server listening on {}", addr);

        loop {
            let (stream, addr) = listener.accept().await?;
            debug!("Accepted connection from {}", addr);

            let state = Arc::clone(&self.state);
            let provider = Arc::clone(&self.provider);
            let chat_model = self.chat_model.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, state, provider, chat_model).await {
                    error!("Error handling connection: {}", e);
                }
            });
        }
    }
}

async fn handle_connection<P: ModelProvider>(
    mut stream: TcpStream,
    state: Arc<AppState>,
    provider: Arc<P>,
    chat_model: String,
) -> Result<()> {
    let mut buffer = vec![0u8; 65536];

    loop {
        let n = stream.read(&mut buffer).await?;
        if n == 0 {
            break;
        }

        let request_str = String::from_utf8_lossy(&buffer[..n]);

        if !is_webhook_post(&request_str) {
            send_response(&mut stream, 404, r#"{"status":"error"}"#).await?;
            continue;
        }

        let json_body = match extract_json_body(&request_str) {
            Some(body) => body,
            None => {
                warn!("Webhook request without a JSON body");
                send_response(&mut stream, 400, r#"{"status":"error"}"#).await?;
                continue;
            }
        };

        let event = match InboundEvent::parse(&json_body) {
            Ok(event) => event,
            Err(e) => {
                warn!("Malformed webhook payload: {}", e);
                send_response(&mut stream, 400, r#"{"status":"error"}"#).await?;
                continue;
            }
        };

        match process_event(&state, &provider, &chat_model, event).await {
            Ok(()) => send_response(&mut stream, 200, r#"{"status":"ok"}"#).await?,
            Err(e) => {
                error!("Failed to process webhook event: {}", e);
                send_response(&mut stream, 500, r#"{"status":"error"}"#).await?;
            }
        }
    }

    Ok(())
}

/// Resolve the event to user text (transcribing media if present) and run
/// one agent turn for the sender's session.
async fn process_event<P: ModelProvider>(
    state: &Arc<AppState>,
    provider: &Arc<P>,
    chat_model: &str,
    event: InboundEvent,
) -> Result<()> {
    // Echoes of our own outbound messages come back through the webhook too.
    if event.data.key.from_me {
        debug!("Ignoring own message from {}", event.data.key.remote_jid);
        return Ok(());
    }

    let session = SessionContext::for_sender(
        event.data.key.remote_jid.clone(),
        event.data.push_name.clone(),
    );

    let transcoder = Transcoder::new(
        Arc::clone(provider),
        Arc::clone(&state.media_memo),
        state.config.retries,
    );

    let text = if let Some(audio) = &event.data.message.audio {
        let url = audio.url.as_deref().context("Audio message without a URL")?;
        let bytes = fetch_media(url).await?;
        transcoder.transcribe(&bytes, "voice-message.ogg").await
    } else if let Some(image) = &event.data.message.image {
        let url = image.url.as_deref().context("Image message without a URL")?;
        let bytes = fetch_media(url).await?;
        let mime = image.mime_type.as_deref().unwrap_or("image/jpeg");
        transcoder.describe(&bytes, mime).await?
    } else {
        event.data.message.conversation.clone()
    };

    if text.trim().is_empty() {
        anyhow::bail!("Event carried no usable text");
    }

    let mut agent = ConversationAgent::new(
        Arc::clone(provider),
        chat_model,
        state.db.clone(),
        state.config.retries,
    );

    let reply = agent.chat(&session.id, &text).await?;
    info!(
        "Replied to {} ({} chars{})",
        session.id,
        reply.text.len(),
        if reply.executed_sql.is_some() {
            ", 1 statement executed"
        } else {
            ""
        }
    );

    Ok(())
}

async fn fetch_media(url: &str) -> Result<Vec<u8>> {
    let response = reqwest::get(url)
        .await
        .with_context(|| format!("Failed to fetch media from {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Media fetch failed: {}", response.status());
    }

    let bytes = response.bytes().await.context("Failed to read media body")?;
    Ok(bytes.to_vec())
}

fn is_webhook_post(http_request: &str) -> bool {
    let first_line = http_request.lines().next().unwrap_or_default();
    first_line.starts_with("POST /webhook")
}

/// Extract JSON body from an HTTP request
fn extract_json_body(http_request: &str) -> Option<String> {
    let parts: Vec<&str> = http_request.splitn(2, "\r\n\r\n").collect();
    if parts.len() < 2 {
        let parts: Vec<&str> = http_request.splitn(2, "\n\n").collect();
        if parts.len() < 2 {
            return None;
        }
        return Some(parts[1].to_string());
    }
    Some(parts[1].to_string())
}

async fn send_response(stream: &mut TcpStream, status: u16, body: &str) -> Result<()> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Internal Server Error",
    };

    let http_response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );

    stream.write_all(http_response.as_bytes()).await?;
    stream.flush().await?;

    Ok(())
}
