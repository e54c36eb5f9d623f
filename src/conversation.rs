//! Conversation controller
//!
//! Owns the message log, the input buffer and the single in-flight request.
//! The log is append-only: a user entry is pushed when a submit is accepted
//! and exactly one assistant entry is pushed when that request settles.

use std::sync::Arc;

use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info};

use crate::client::{ChatResponse, ChatTransport};
use crate::error::TransportError;
use crate::state::ChatMessage;

/// Shown in place of a reply when the backend call fails for any reason.
pub const FALLBACK_REPLY: &str = "Sorry, there was an error processing your request.";

/// Outcome of a submit attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// User entry appended and request issued
    Sent,
    /// Input was empty after trimming
    Empty,
    /// A request is already in flight
    Busy,
}

type PendingReply = JoinHandle<Result<ChatResponse, TransportError>>;

pub struct Conversation {
    transport: Arc<dyn ChatTransport>,
    messages: Vec<ChatMessage>,
    input: String,
    pending: Option<PendingReply>,
    last_trace_id: Option<String>,
}

impl Conversation {
    pub fn new(transport: Arc<dyn ChatTransport>) -> Self {
        Self {
            transport,
            messages: Vec::new(),
            input: String::new(),
            pending: None,
            last_trace_id: None,
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// True from an accepted submit until its request settles
    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    /// Trace id echoed by the backend on the most recent successful reply
    pub fn last_trace_id(&self) -> Option<&str> {
        self.last_trace_id.as_deref()
    }

    pub fn transport(&self) -> Arc<dyn ChatTransport> {
        Arc::clone(&self.transport)
    }

    /// Submit whatever is in the input buffer.
    pub fn submit_input(&mut self) -> Submission {
        let text = self.input.clone();
        self.submit(&text)
    }

    /// Append `text` (trimmed) as a user entry and start the backend call.
    ///
    /// Rejected without side effects while a call is in flight or when the
    /// trimmed text is empty. Must be called from within a tokio runtime.
    pub fn submit(&mut self, text: &str) -> Submission {
        if self.pending.is_some() {
            debug!("submit ignored, request already in flight");
            return Submission::Busy;
        }

        let content = text.trim();
        if content.is_empty() {
            return Submission::Empty;
        }
        let content = content.to_string();

        self.messages.push(ChatMessage::user(content.clone()));
        self.input.clear();

        let transport = Arc::clone(&self.transport);
        self.pending = Some(tokio::spawn(async move {
            transport.send_message(&content).await
        }));
        Submission::Sent
    }

    /// Settle the in-flight request if it has already finished.
    ///
    /// Returns true if an assistant entry was appended.
    pub async fn poll_reply(&mut self) -> bool {
        match &self.pending {
            Some(task) if task.is_finished() => self.wait_reply().await,
            _ => false,
        }
    }

    /// Wait for the in-flight request to settle. Returns false if nothing
    /// was in flight.
    pub async fn wait_reply(&mut self) -> bool {
        let Some(task) = self.pending.take() else {
            return false;
        };
        let outcome = task.await;
        self.settle(outcome);
        true
    }

    fn settle(&mut self, outcome: Result<Result<ChatResponse, TransportError>, JoinError>) {
        match outcome {
            Ok(Ok(reply)) => {
                info!(trace_id = %reply.trace_id, "received reply");
                self.last_trace_id = Some(reply.trace_id);
                self.messages.push(ChatMessage::assistant(reply.response));
            }
            Ok(Err(e)) => {
                let status = e.status().map(|s| s.as_u16());
                error!(error = %e, ?status, "Error sending message");
                self.messages.push(ChatMessage::assistant(FALLBACK_REPLY));
            }
            Err(e) => {
                error!(error = %e, "chat request task did not complete");
                self.messages.push(ChatMessage::assistant(FALLBACK_REPLY));
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::client::HealthStatus;
    use crate::state::ChatRole;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    pub(crate) enum Scripted {
        Reply(&'static str, &'static str),
        Fail,
        Hold(oneshot::Receiver<crate::error::Result<ChatResponse>>),
        Panic,
    }

    /// Backend double that answers from a queue and records every call
    #[derive(Default)]
    pub(crate) struct ScriptedTransport {
        script: Mutex<VecDeque<Scripted>>,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        pub(crate) fn new(script: Vec<Scripted>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    pub(crate) fn server_error() -> TransportError {
        TransportError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: "agent exploded".to_string(),
        }
    }

    pub(crate) fn reply(response: &str, trace_id: &str) -> ChatResponse {
        ChatResponse {
            response: response.to_string(),
            trace_id: trace_id.to_string(),
        }
    }

    #[async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn send_message(&self, text: &str) -> crate::error::Result<ChatResponse> {
            self.calls.lock().unwrap().push(text.to_string());
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Scripted::Reply(response, trace_id)) => Ok(reply(response, trace_id)),
                Some(Scripted::Hold(rx)) => rx.await.unwrap_or_else(|_| Err(server_error())),
                Some(Scripted::Panic) => panic!("transport blew up"),
                Some(Scripted::Fail) | None => Err(server_error()),
            }
        }

        async fn check_health(&self) -> crate::error::Result<HealthStatus> {
            Ok(HealthStatus {
                status: "healthy".to_string(),
            })
        }
    }

    fn conversation(transport: &Arc<ScriptedTransport>) -> Conversation {
        Conversation::new(transport.clone())
    }

    #[tokio::test]
    async fn test_successful_exchange() {
        let transport = ScriptedTransport::new(vec![Scripted::Reply("Hi there!", "t1")]);
        let mut conv = conversation(&transport);

        assert_eq!(conv.submit("Hello"), Submission::Sent);
        assert_eq!(conv.messages(), &[ChatMessage::user("Hello")]);
        assert!(conv.is_busy());

        assert!(conv.wait_reply().await);
        assert_eq!(
            conv.messages(),
            &[ChatMessage::user("Hello"), ChatMessage::assistant("Hi there!")]
        );
        assert!(!conv.is_busy());
        assert_eq!(transport.calls(), vec!["Hello".to_string()]);
        assert_eq!(conv.last_trace_id(), Some("t1"));
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let transport = ScriptedTransport::new(vec![]);
        let mut conv = conversation(&transport);

        for text in ["", "   ", "\t\n  "] {
            assert_eq!(conv.submit(text), Submission::Empty);
        }

        assert!(conv.messages().is_empty());
        assert!(!conv.is_busy());
        assert!(!conv.wait_reply().await);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failure_appends_fallback() {
        let transport = ScriptedTransport::new(vec![Scripted::Fail]);
        let mut conv = conversation(&transport);

        conv.submit("Balance?");
        conv.wait_reply().await;

        assert_eq!(
            conv.messages(),
            &[ChatMessage::user("Balance?"), ChatMessage::assistant(FALLBACK_REPLY)]
        );
        assert!(!conv.is_busy());
        assert_eq!(conv.last_trace_id(), None);
    }

    #[tokio::test]
    async fn test_panicking_transport_appends_fallback() {
        let transport = ScriptedTransport::new(vec![Scripted::Panic]);
        let mut conv = conversation(&transport);

        conv.submit("Balance?");
        conv.wait_reply().await;

        let last = conv.messages().last().unwrap();
        assert_eq!(last.role, ChatRole::Assistant);
        assert_eq!(last.content, FALLBACK_REPLY);
        assert!(!conv.is_busy());
    }

    #[tokio::test]
    async fn test_submit_while_awaiting_is_rejected() {
        let (tx, rx) = oneshot::channel();
        let transport = ScriptedTransport::new(vec![
            Scripted::Hold(rx),
            Scripted::Reply("Second answer", "t2"),
        ]);
        let mut conv = conversation(&transport);

        assert_eq!(conv.submit("First"), Submission::Sent);
        assert_eq!(conv.submit("Second"), Submission::Busy);
        assert_eq!(conv.submit("Third"), Submission::Busy);
        assert_eq!(conv.messages(), &[ChatMessage::user("First")]);

        // still pending, nothing to settle
        tokio::task::yield_now().await;
        assert!(!conv.poll_reply().await);
        assert!(conv.is_busy());

        tx.send(Ok(reply("First answer", "t1"))).unwrap();
        assert!(conv.wait_reply().await);
        assert_eq!(
            conv.messages(),
            &[ChatMessage::user("First"), ChatMessage::assistant("First answer")]
        );
        assert_eq!(transport.calls(), vec!["First".to_string()]);

        // idle again, next submit goes through
        assert_eq!(conv.submit("Second"), Submission::Sent);
        conv.wait_reply().await;
        assert_eq!(conv.messages().len(), 4);
        assert_eq!(transport.calls(), vec!["First".to_string(), "Second".to_string()]);
    }

    #[tokio::test]
    async fn test_log_grows_by_pairs_in_order() {
        let transport = ScriptedTransport::new(vec![
            Scripted::Reply("one", "t1"),
            Scripted::Fail,
            Scripted::Reply("three", "t3"),
        ]);
        let mut conv = conversation(&transport);

        for question in ["q1", "q2", "q3"] {
            let before = conv.messages().to_vec();
            conv.submit(question);
            conv.wait_reply().await;

            let after = conv.messages();
            assert_eq!(after.len(), before.len() + 2);
            assert_eq!(&after[..before.len()], before.as_slice());
            assert_eq!(after[before.len()], ChatMessage::user(question));
            assert!(!after[before.len() + 1].is_user());
        }

        let replies: Vec<&str> = conv
            .messages()
            .iter()
            .filter(|m| !m.is_user())
            .map(|m| m.content.as_str())
            .collect();
        assert_eq!(replies, vec!["one", FALLBACK_REPLY, "three"]);
        // failed exchange does not clobber the earlier trace id
        assert_eq!(conv.last_trace_id(), Some("t3"));
    }

    #[tokio::test]
    async fn test_submit_trims_content() {
        let transport = ScriptedTransport::new(vec![Scripted::Reply("ok", "t1")]);
        let mut conv = conversation(&transport);

        conv.submit("  Hello \n");
        conv.wait_reply().await;

        assert_eq!(conv.messages()[0].content, "Hello");
        assert_eq!(transport.calls(), vec!["Hello".to_string()]);
    }

    #[tokio::test]
    async fn test_submit_input_clears_buffer_only_when_sent() {
        let (tx, rx) = oneshot::channel();
        let transport = ScriptedTransport::new(vec![Scripted::Hold(rx)]);
        let mut conv = conversation(&transport);

        conv.input_mut().push_str("   ");
        assert_eq!(conv.submit_input(), Submission::Empty);
        assert_eq!(conv.input(), "   ");

        conv.input_mut().clear();
        conv.input_mut().push_str("  hi  ");
        assert_eq!(conv.submit_input(), Submission::Sent);
        assert_eq!(conv.input(), "");
        assert_eq!(conv.messages(), &[ChatMessage::user("hi")]);

        conv.input_mut().push_str("follow up");
        assert_eq!(conv.submit_input(), Submission::Busy);
        assert_eq!(conv.input(), "follow up");

        tx.send(Err(server_error())).unwrap();
        conv.wait_reply().await;
        assert_eq!(conv.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_poll_reply_settles_finished_request() {
        let transport = ScriptedTransport::new(vec![Scripted::Reply("Hi there!", "t1")]);
        let mut conv = conversation(&transport);

        assert!(!conv.poll_reply().await);

        conv.submit("Hello");
        let mut settled = false;
        for _ in 0..100 {
            if conv.poll_reply().await {
                settled = true;
                break;
            }
            tokio::task::yield_now().await;
        }

        assert!(settled);
        assert!(!conv.is_busy());
        assert_eq!(conv.messages().len(), 2);
    }
}
