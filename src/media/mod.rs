//! Media transcoder
//!
//! Two hosted-model round trips, independent of each other and side-effect
//! free from the ledger's perspective: speech-to-text for audio clips and
//! free-text description for images. Both are memoized by content hash so
//! re-sent attachments cost nothing.

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, warn};

use crate::cache::{content_hash, MemoCache};
use crate::model::{with_retries, ModelProvider};

/// Returned instead of text when transcription fails after retries.
pub const TRANSCRIPTION_UNAVAILABLE: &str = "[transcription unavailable]";

/// Domain hint sent with every transcription request.
const TRANSCRIPTION_PROMPT: &str =
    "Focus on financial information: amounts, merchants, dates, what was bought or received.";

/// Fixed instruction for image description.
const VISION_INSTRUCTION: &str =
    "Describe this image for a personal-finance ledger. Extract any monetary amounts, \
     a short description of what was bought or received, the date, the merchant, and \
     the document type (receipt, invoice, price tag, other).";

pub struct Transcoder<P: ModelProvider> {
    provider: Arc<P>,
    memo: Arc<MemoCache>,
    retries: u32,
}

impl<P: ModelProvider> Transcoder<P> {
    pub fn new(provider: Arc<P>, memo: Arc<MemoCache>, retries: u32) -> Self {
        Self {
            provider,
            memo,
            retries,
        }
    }

    /// Best-effort transcription; degrades to a fixed sentinel on failure.
    pub async fn transcribe(&self, audio: &[u8], filename: &str) -> String {
        let key = format!("stt:{}", content_hash(audio));
        if let Some(hit) = self.memo.get(&key) {
            debug!("Transcription memo hit for {}", filename);
            return hit;
        }

        let provider = Arc::clone(&self.provider);
        let result = with_retries(self.retries, "transcription", || {
            let provider = Arc::clone(&provider);
            async move {
                provider
                    .transcribe(audio, filename, TRANSCRIPTION_PROMPT)
                    .await
            }
        })
        .await;

        match result {
            Ok(text) => {
                self.memo.insert(key, text.clone());
                text
            }
            Err(e) => {
                warn!("Transcription failed for {}: {}", filename, e);
                TRANSCRIPTION_UNAVAILABLE.to_string()
            }
        }
    }

    /// Describe an image as free text the agent can classify.
    pub async fn describe(&self, image: &[u8], mime_type: &str) -> Result<String> {
        let key = format!("vision:{}", content_hash(image));
        if let Some(hit) = self.memo.get(&key) {
            debug!("Vision memo hit ({} bytes)", image.len());
            return Ok(hit);
        }

        let provider = Arc::clone(&self.provider);
        let text = with_retries(self.retries, "image description", || {
            let provider = Arc::clone(&provider);
            async move { provider.describe(image, mime_type, VISION_INSTRUCTION).await }
        })
        .await?;

        self.memo.insert(key, text.clone());
        Ok(text)
    }
}
