// Transcoder memoization and degradation tests

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use ledgerchat::cache::{content_hash, MemoCache};
use ledgerchat::media::{Transcoder, TRANSCRIPTION_UNAVAILABLE};
use ledgerchat::model::{ChatMessage, ChatRequest, ModelProvider};

/// Counts calls per capability; transcription can be forced to fail.
struct CountingProvider {
    transcribe_calls: AtomicU32,
    describe_calls: AtomicU32,
    fail_transcribe: bool,
}

impl CountingProvider {
    fn new(fail_transcribe: bool) -> Arc<Self> {
        Arc::new(Self {
            transcribe_calls: AtomicU32::new(0),
            describe_calls: AtomicU32::new(0),
            fail_transcribe,
        })
    }
}

#[async_trait]
impl ModelProvider for CountingProvider {
    async fn complete(&self, _request: ChatRequest) -> Result<ChatMessage> {
        Ok(ChatMessage::assistant("unused"))
    }

    async fn transcribe(&self, audio: &[u8], _filename: &str, _prompt: &str) -> Result<String> {
        self.transcribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_transcribe {
            anyhow::bail!("speech endpoint unavailable");
        }
        Ok(format!("heard {} bytes", audio.len()))
    }

    async fn describe(&self, image: &[u8], _mime: &str, _instruction: &str) -> Result<String> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("saw {} bytes", image.len()))
    }
}

#[tokio::test]
async fn test_transcribe_memoized_by_content() {
    let provider = CountingProvider::new(false);
    let memo = Arc::new(MemoCache::new(Duration::from_secs(3600)));
    let transcoder = Transcoder::new(Arc::clone(&provider), memo, 3);

    let clip = b"fake-ogg-bytes";
    let first = transcoder.transcribe(clip, "a.ogg").await;
    let second = transcoder.transcribe(clip, "a.ogg").await;

    assert_eq!(first, second);
    assert_eq!(provider.transcribe_calls.load(Ordering::SeqCst), 1);

    // Different content misses the memo
    transcoder.transcribe(b"other-bytes", "b.ogg").await;
    assert_eq!(provider.transcribe_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_transcribe_degrades_to_sentinel() {
    let provider = CountingProvider::new(true);
    let memo = Arc::new(MemoCache::new(Duration::from_secs(3600)));
    let transcoder = Transcoder::new(Arc::clone(&provider), memo, 3);

    let text = transcoder.transcribe(b"clip", "a.ogg").await;
    assert_eq!(text, TRANSCRIPTION_UNAVAILABLE);
    // Retried up to the bound before degrading
    assert_eq!(provider.transcribe_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_failed_transcription_is_not_memoized() {
    let provider = CountingProvider::new(true);
    let memo = Arc::new(MemoCache::new(Duration::from_secs(3600)));
    let transcoder = Transcoder::new(Arc::clone(&provider), Arc::clone(&memo), 1);

    transcoder.transcribe(b"clip", "a.ogg").await;
    assert!(memo.is_empty());
}

#[tokio::test]
async fn test_describe_memoized_by_content() {
    let provider = CountingProvider::new(false);
    let memo = Arc::new(MemoCache::new(Duration::from_secs(3600)));
    let transcoder = Transcoder::new(Arc::clone(&provider), memo, 3);

    let receipt = b"fake-png-bytes";
    let first = transcoder.describe(receipt, "image/png").await.unwrap();
    let second = transcoder.describe(receipt, "image/png").await.unwrap();

    assert_eq!(first, second);
    assert_eq!(provider.describe_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_content_hash_is_stable_and_distinct() {
    let a = content_hash(b"receipt-1");
    let b = content_hash(b"receipt-2");
    assert_eq!(a, content_hash(b"receipt-1"));
    assert_ne!(a, b);
    assert_eq!(a.len(), 64);
}

#[test]
fn test_memo_cache_ttl_expiry() {
    let memo = MemoCache::new(Duration::from_millis(0));
    memo.insert("key".to_string(), "value".to_string());
    // Zero TTL: the entry is already expired on read
    assert!(memo.get("key").is_none());
    assert!(memo.is_empty());
}
