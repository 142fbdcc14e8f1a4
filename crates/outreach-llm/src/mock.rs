use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use outreach_core::errors::CompletionError;
use outreach_core::messages::ChatMessage;
use outreach_core::provider::{CompletionOptions, CompletionProvider};

/// Pre-programmed replies for deterministic testing without API calls.
#[derive(Clone, Debug)]
pub enum MockReply {
    Text(String),
    Error(CompletionError),
    /// Wait, then resolve the inner reply.
    Delay(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn json(value: &serde_json::Value) -> Self {
        Self::Text(value.to_string())
    }

    pub fn delayed(delay: Duration, inner: MockReply) -> Self {
        Self::Delay(delay, Box::new(inner))
    }
}

/// Replies served to calls whose messages contain every needle.
///
/// Queued replies are served once each in order. A route built with
/// [`MockRoute::always`] keeps serving its reply after the queue drains.
#[derive(Clone, Debug)]
pub struct MockRoute {
    needles: Vec<String>,
    queued: VecDeque<MockReply>,
    sticky: Option<MockReply>,
}

impl MockRoute {
    pub fn when<I, S>(needles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            needles: needles.into_iter().map(Into::into).collect(),
            queued: VecDeque::new(),
            sticky: None,
        }
    }

    pub fn then(mut self, reply: MockReply) -> Self {
        self.queued.push_back(reply);
        self
    }

    pub fn always(mut self, reply: MockReply) -> Self {
        self.sticky = Some(reply);
        self
    }

    fn matches(&self, haystack: &str) -> bool {
        (!self.queued.is_empty() || self.sticky.is_some())
            && self.needles.iter().all(|n| haystack.contains(n.as_str()))
    }

    fn take(&mut self) -> Option<MockReply> {
        self.queued.pop_front().or_else(|| self.sticky.clone())
    }
}

struct Script {
    routes: Vec<MockRoute>,
    sequence: VecDeque<MockReply>,
}

/// Mock provider. Routes are consulted first (first match wins), then the
/// plain sequence. A call with nothing left to serve fails with
/// `CompletionError::Unavailable`, so an unexpected extra call is loud.
pub struct MockProvider {
    script: Mutex<Script>,
    call_count: AtomicUsize,
    calls: Mutex<Vec<(Vec<ChatMessage>, CompletionOptions)>>,
}

impl MockProvider {
    /// Replies served in call order.
    pub fn new(replies: Vec<MockReply>) -> Self {
        Self::with_script(Vec::new(), replies)
    }

    /// Replies chosen by prompt content, for concurrent callers whose order
    /// is not deterministic.
    pub fn routed(routes: Vec<MockRoute>) -> Self {
        Self::with_script(routes, Vec::new())
    }

    pub fn with_script(routes: Vec<MockRoute>, sequence: Vec<MockReply>) -> Self {
        Self {
            script: Mutex::new(Script {
                routes,
                sequence: sequence.into(),
            }),
            call_count: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Every message list received, in arrival order.
    pub fn calls(&self) -> Vec<Vec<ChatMessage>> {
        self.calls.lock().iter().map(|(msgs, _)| msgs.clone()).collect()
    }

    /// Number of received calls whose messages contain `needle`.
    pub fn calls_containing(&self, needle: &str) -> usize {
        self.options_containing(needle).len()
    }

    /// Options passed with each call whose messages contain `needle`.
    pub fn options_containing(&self, needle: &str) -> Vec<CompletionOptions> {
        self.calls
            .lock()
            .iter()
            .filter(|(msgs, _)| msgs.iter().any(|m| m.content.contains(needle)))
            .map(|(_, options)| options.clone())
            .collect()
    }

    fn next_reply(&self, messages: &[ChatMessage], idx: usize) -> Result<MockReply, CompletionError> {
        let haystack: String = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let mut script = self.script.lock();
        if let Some(route) = script.routes.iter_mut().find(|r| r.matches(&haystack)) {
            if let Some(reply) = route.take() {
                return Ok(reply);
            }
        }
        script.sequence.pop_front().ok_or_else(|| {
            CompletionError::Unavailable(format!("MockProvider: no reply configured for call {idx}"))
        })
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<String, CompletionError> {
        let idx = self.call_count.fetch_add(1, Ordering::Relaxed);
        self.calls.lock().push((messages.to_vec(), options.clone()));

        let mut reply = self.next_reply(messages, idx)?;
        loop {
            match reply {
                MockReply::Text(text) => return Ok(text),
                MockReply::Error(e) => return Err(e),
                MockReply::Delay(delay, inner) => {
                    tokio::time::sleep(delay).await;
                    reply = *inner;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(text: &str) -> Vec<ChatMessage> {
        vec![ChatMessage::system("frame"), ChatMessage::user(text)]
    }

    #[tokio::test]
    async fn sequence_in_order() {
        let mock = MockProvider::new(vec![MockReply::text("one"), MockReply::text("two")]);
        let opts = CompletionOptions::default();
        assert_eq!(mock.complete(&user("a"), &opts).await.unwrap(), "one");
        assert_eq!(mock.complete(&user("b"), &opts).await.unwrap(), "two");
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn records_options_per_call() {
        let mock = MockProvider::new(vec![MockReply::text("one"), MockReply::text("two")]);
        mock.complete(&user("research"), &CompletionOptions::with_max_tokens(2048))
            .await
            .unwrap();
        mock.complete(&user("draft"), &CompletionOptions::default()).await.unwrap();

        let research = mock.options_containing("research");
        assert_eq!(research.len(), 1);
        assert_eq!(research[0].max_tokens, 2048);
        assert_eq!(mock.options_containing("draft")[0].max_tokens, 1024);
    }

    #[tokio::test]
    async fn exhausted_sequence_fails() {
        let mock = MockProvider::new(vec![MockReply::text("only")]);
        let opts = CompletionOptions::default();
        let _ = mock.complete(&user("a"), &opts).await.unwrap();
        let err = mock.complete(&user("b"), &opts).await.unwrap_err();
        assert!(matches!(err, CompletionError::Unavailable(_)));
    }

    #[tokio::test]
    async fn error_reply() {
        let mock = MockProvider::new(vec![MockReply::Error(CompletionError::ProviderOverloaded)]);
        let err = mock
            .complete(&user("a"), &CompletionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::ProviderOverloaded));
    }

    #[tokio::test]
    async fn routes_match_on_all_needles() {
        let mock = MockProvider::routed(vec![
            MockRoute::when(["Evaluate", "Jane"]).always(MockReply::text("jane-eval")),
            MockRoute::when(["Evaluate"]).always(MockReply::text("other-eval")),
        ]);
        let opts = CompletionOptions::default();
        assert_eq!(mock.complete(&user("Evaluate Jane"), &opts).await.unwrap(), "jane-eval");
        assert_eq!(mock.complete(&user("Evaluate Michael"), &opts).await.unwrap(), "other-eval");
        assert_eq!(mock.calls_containing("Evaluate"), 2);
    }

    #[tokio::test]
    async fn queued_route_drains_then_falls_through() {
        let mock = MockProvider::with_script(
            vec![MockRoute::when(["draft"]).then(MockReply::text("first"))],
            vec![MockReply::text("fallback")],
        );
        let opts = CompletionOptions::default();
        assert_eq!(mock.complete(&user("draft"), &opts).await.unwrap(), "first");
        assert_eq!(mock.complete(&user("draft"), &opts).await.unwrap(), "fallback");
        assert!(mock.complete(&user("draft"), &opts).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_reply_resolves() {
        let mock = MockProvider::new(vec![MockReply::delayed(
            Duration::from_secs(5),
            MockReply::text("late"),
        )]);
        let text = mock
            .complete(&user("a"), &CompletionOptions::default())
            .await
            .unwrap();
        assert_eq!(text, "late");
    }

    #[tokio::test]
    async fn captures_messages() {
        let mock = MockProvider::new(vec![MockReply::text("ok")]);
        let _ = mock.complete(&user("hello"), &CompletionOptions::default()).await;
        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][1].content, "hello");
    }
}
