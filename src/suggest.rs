use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::SuggestError;

/// Request/response exchange with the external completion service.
/// `complete` returns the raw suggestion payload; decoding it is the
/// pipeline's job (the upstream encoding is inconsistent, see
/// [`extract_suggestion`]).
pub trait CompletionService: Send + Sync + 'static {
    fn complete(
        &self,
        code: &str,
        language: &str,
    ) -> impl Future<Output = Result<String, SuggestError>> + Send;
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    suggestion: Option<String>,
    error: Option<String>,
}

/// One-shot WebSocket exchange per request: connect, send `{code, language}`,
/// take the first text frame, close. No connection reuse.
pub struct WsCompletionClient {
    url: String,
}

impl WsCompletionClient {
    pub fn new(url: &str) -> Self {
        Self { url: url.to_string() }
    }
}

impl CompletionService for WsCompletionClient {
    async fn complete(&self, code: &str, language: &str) -> Result<String, SuggestError> {
        let (mut ws, _) = connect_async(self.url.as_str())
            .await
            .map_err(|e| SuggestError::Transport(e.to_string()))?;

        let request = serde_json::json!({ "code": code, "language": language });
        ws.send(Message::Text(request.to_string().into()))
            .await
            .map_err(|e| SuggestError::Transport(e.to_string()))?;

        while let Some(msg) = ws.next().await {
            let msg = msg.map_err(|e| SuggestError::Transport(e.to_string()))?;
            match msg {
                Message::Text(text) => {
                    let _ = ws.close(None).await;
                    let resp: CompletionResponse = serde_json::from_str(text.as_str())
                        .map_err(|e| SuggestError::Service(e.to_string()))?;
                    if let Some(error) = resp.error {
                        return Err(SuggestError::Service(error));
                    }
                    return resp.suggestion.ok_or(SuggestError::NoResponse);
                }
                Message::Close(_) => break,
                _ => continue,
            }
        }

        Err(SuggestError::NoResponse)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionUpdate {
    Show(String),
    Clear,
}

/// Debounced, generation-guarded flow from keystrokes to surfaced
/// suggestions. Only the newest call within the quiescence window reaches the
/// network, and only the response to the newest issued request is surfaced;
/// anything older is dropped on arrival.
pub struct SuggestionPipeline<C> {
    client: Arc<C>,
    debounce: Duration,
    min_chars: usize,
    generation: Arc<AtomicU64>,
    pending: Option<CancellationToken>,
    terminated: bool,
    updates: mpsc::UnboundedSender<SuggestionUpdate>,
}

impl<C: CompletionService> SuggestionPipeline<C> {
    pub fn new(
        client: Arc<C>,
        debounce: Duration,
        min_chars: usize,
        updates: mpsc::UnboundedSender<SuggestionUpdate>,
    ) -> Self {
        Self {
            client,
            debounce,
            min_chars,
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
            terminated: false,
            updates,
        }
    }

    /// Feed one keystroke's worth of code. Supersedes any not-yet-issued
    /// request and invalidates any in-flight one. Ignored once the pipeline
    /// is shut down.
    pub fn request(&mut self, code: &str, language: &str) {
        if self.terminated {
            return;
        }

        if let Some(token) = self.pending.take() {
            token.cancel();
        }

        if code.trim().chars().count() < self.min_chars {
            // Too little input to complete on; also hide whatever is shown.
            self.generation.fetch_add(1, Ordering::SeqCst);
            let _ = self.updates.send(SuggestionUpdate::Clear);
            return;
        }

        let token = CancellationToken::new();
        self.pending = Some(token.clone());

        let id = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation = self.generation.clone();
        let client = self.client.clone();
        let updates = self.updates.clone();
        let debounce = self.debounce;
        let code = code.to_string();
        let language = language.to_string();

        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(debounce) => {}
            }

            let update = match client.complete(&code, &language).await {
                Ok(raw) => match extract_suggestion(&raw) {
                    Some(suggestion) => SuggestionUpdate::Show(suggestion),
                    None => SuggestionUpdate::Clear,
                },
                Err(e) => {
                    warn!("suggestion request failed: {}", e);
                    SuggestionUpdate::Clear
                }
            };

            if generation.load(Ordering::SeqCst) == id {
                let _ = updates.send(update);
            } else {
                debug!("dropping stale suggestion response (id {})", id);
            }
        });
    }

    /// Cancel the pending debounce, invalidate anything in flight, and stop
    /// accepting further requests.
    pub fn shutdown(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.terminated = true;
    }
}

impl<C> Drop for SuggestionPipeline<C> {
    fn drop(&mut self) {
        if let Some(token) = self.pending.take() {
            token.cancel();
        }
    }
}

const EMPTY_SENTINELS: &[&str] = &["\"\"", "''", "{}", "[]", "null", "undefined"];

/// Lenient decode of the upstream suggestion payload. Three shapes occur in
/// the wild: a plain string, a JSON envelope with a `suggested_code` field,
/// and malformed JSON from which `suggested_code` can still be fished out.
/// Returns `None` when the result is empty or one of the literal junk
/// sentinels the service emits instead of "no suggestion".
pub fn extract_suggestion(raw: &str) -> Option<String> {
    let candidate = match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => map
            .get("suggested_code")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or_else(|| raw.to_string()),
        Ok(serde_json::Value::String(s)) => s,
        Ok(_) => raw.to_string(),
        Err(_) => scan_suggested_code(raw).unwrap_or_else(|| raw.to_string()),
    };

    let trimmed = candidate.trim();
    if trimmed.is_empty() || EMPTY_SENTINELS.contains(&trimmed) {
        None
    } else {
        Some(candidate)
    }
}

/// Best-effort extraction of `"suggested_code": "..."` from a partial or
/// otherwise unparseable payload, with `\n` and `\"` unescaped.
fn scan_suggested_code(raw: &str) -> Option<String> {
    let key = "\"suggested_code\"";
    let rest = &raw[raw.find(key)? + key.len()..];
    let rest = rest.trim_start().strip_prefix(':')?;
    let rest = rest.trim_start().strip_prefix('"')?;
    let value = &rest[..rest.find('"')?];
    if value.is_empty() {
        return None;
    }
    Some(value.replace("\\n", "\n").replace("\\\"", "\""))
}

#[cfg(test)]
mod suggest_tests {
    use super::*;
    use std::sync::Mutex;

    struct MockCompletion {
        calls: Mutex<Vec<String>>,
        delay: Duration,
        reply: String,
    }

    impl MockCompletion {
        fn new(reply: &str) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                delay: Duration::ZERO,
                reply: reply.to_string(),
            }
        }

        fn with_delay(reply: &str, delay: Duration) -> Self {
            Self { delay, ..Self::new(reply) }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl CompletionService for MockCompletion {
        async fn complete(&self, code: &str, _language: &str) -> Result<String, SuggestError> {
            self.calls.lock().unwrap().push(code.to_string());
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            Ok(self.reply.replace("{code}", code))
        }
    }

    fn pipeline(
        client: Arc<MockCompletion>,
    ) -> (SuggestionPipeline<MockCompletion>, mpsc::UnboundedReceiver<SuggestionUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SuggestionPipeline::new(client, Duration::from_millis(500), 3, tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_issues_only_the_last_call() {
        let client = Arc::new(MockCompletion::new("done"));
        let (mut pipe, mut rx) = pipeline(client.clone());

        pipe.request("let a", "javascript");
        pipe.request("let ab", "javascript");
        pipe.request("let abc", "javascript");

        let update = rx.recv().await.unwrap();
        assert_eq!(update, SuggestionUpdate::Show("done".to_string()));
        assert_eq!(client.calls(), vec!["let abc".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_input_is_suppressed_and_clears() {
        let client = Arc::new(MockCompletion::new("done"));
        let (mut pipe, mut rx) = pipeline(client.clone());

        pipe.request("hi", "javascript");
        assert_eq!(rx.recv().await.unwrap(), SuggestionUpdate::Clear);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(client.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_response_is_dropped() {
        // Each request takes a full second; the first response lands after a
        // newer request has already been issued and must be discarded.
        let client = Arc::new(MockCompletion::with_delay(
            "sug:{code}",
            Duration::from_secs(1),
        ));
        let (mut pipe, mut rx) = pipeline(client.clone());

        pipe.request("first edit", "python");
        tokio::time::sleep(Duration::from_millis(600)).await;
        pipe.request("second edit", "python");

        let update = rx.recv().await.unwrap();
        assert_eq!(update, SuggestionUpdate::Show("sug:second edit".to_string()));
        assert_eq!(client.calls().len(), 2);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_request_after_shutdown_is_ignored() {
        let client = Arc::new(MockCompletion::new("done"));
        let (mut pipe, mut rx) = pipeline(client.clone());

        pipe.shutdown();
        pipe.request("let abc", "javascript");

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(client.calls().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmeaningful_reply_clears() {
        let client = Arc::new(MockCompletion::new("null"));
        let (mut pipe, mut rx) = pipeline(client);

        pipe.request("print(1)", "python");
        assert_eq!(rx.recv().await.unwrap(), SuggestionUpdate::Clear);
    }

    #[test]
    fn test_extract_plain_string() {
        assert_eq!(
            extract_suggestion("print(1)"),
            Some("print(1)".to_string())
        );
    }

    #[test]
    fn test_extract_json_envelope() {
        let raw = r#"{"suggested_code": "for i in range(3):\n    print(i)"}"#;
        assert_eq!(
            extract_suggestion(raw),
            Some("for i in range(3):\n    print(i)".to_string())
        );
    }

    #[test]
    fn test_extract_json_encoded_string() {
        assert_eq!(
            extract_suggestion(r#""print(2)""#),
            Some("print(2)".to_string())
        );
    }

    #[test]
    fn test_extract_from_malformed_json() {
        // Truncated envelope: not valid JSON, but the value is recoverable.
        let raw = r#"{"confidence": 0.9, "suggested_code":"foo()\n""#;
        assert_eq!(extract_suggestion(raw), Some("foo()\n".to_string()));
        assert!(!extract_suggestion(raw).unwrap().contains("\\n"));
    }

    #[test]
    fn test_sentinels_are_suppressed() {
        for raw in ["null", "undefined", "{}", "[]", "\"\"", "''", "", "   "] {
            assert_eq!(extract_suggestion(raw), None, "raw = {:?}", raw);
        }
    }
}
