//! Conversation session: history, the in-flight turn, and cancellation.
//!
//! A session owns the ordered message history sent to the provider and runs
//! at most one turn at a time. `send` records the user message and spawns a
//! task that streams the reply; every fragment is folded into the pending
//! assistant text and reported through the event channel. State changes and
//! event emission happen under one lock, so once a turn has been cancelled
//! no further fragment of that turn is applied or reported.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::ChatRequest;
use crate::core::coach::CoachProfile;
use crate::core::error::ChatError;
use crate::core::message::Message;
use crate::core::sse::fragment_stream;
use crate::core::transport::ChatTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    InFlight,
    /// The last turn was cancelled; behaves like `Idle` for the next send.
    Cancelled,
    /// The last turn failed; behaves like `Idle` for the next send.
    Errored,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConversationState {
    pub history: Vec<Message>,
    /// Assistant text received so far; only present while a turn is in flight.
    pub pending: Option<String>,
    pub status: SessionStatus,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            history: Vec::new(),
            pending: None,
            status: SessionStatus::Idle,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub model: String,
    pub temperature: Option<f64>,
    pub streaming: bool,
}

impl SessionSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            streaming: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    TurnStarted {
        turn: u64,
    },
    Fragment {
        turn: u64,
        delta: String,
        pending: String,
    },
    TurnCompleted {
        turn: u64,
        message: Message,
    },
    TurnCancelled {
        turn: u64,
    },
    /// Carries the synthetic assistant message describing the failure.
    TurnFailed {
        turn: u64,
        message: Message,
    },
    HistoryCleared,
    RoleChanged {
        profile_id: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    Completed(String),
    Cancelled,
    Failed(String),
}

pub struct TurnHandle {
    turn: u64,
    handle: JoinHandle<TurnOutcome>,
}

impl TurnHandle {
    pub fn turn(&self) -> u64 {
        self.turn
    }

    pub async fn outcome(self) -> TurnOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(err) => TurnOutcome::Failed(format!("Turn task ended unexpectedly: {err}")),
        }
    }
}

enum TurnStop {
    Cancelled,
    Failed(ChatError),
}

struct SessionInner {
    state: ConversationState,
    profile: CoachProfile,
    current_turn: u64,
    cancel_token: Option<CancellationToken>,
    last_error: Option<Message>,
}

impl SessionInner {
    fn is_active(&self, turn: u64) -> bool {
        self.current_turn == turn && self.state.status == SessionStatus::InFlight
    }

    fn refresh_system_prompt(&mut self) {
        let prompt = self.profile.system_prompt.clone();
        let history = &mut self.state.history;
        if history.first().is_some_and(Message::is_system) {
            history[0].content = prompt;
        } else {
            history.insert(0, Message::system(prompt));
        }
    }

    fn reset(&mut self) {
        self.state.history.clear();
        self.state.pending = None;
        self.state.status = SessionStatus::Idle;
        self.last_error = None;
    }
}

#[derive(Clone)]
pub struct ConversationSession {
    transport: Arc<dyn ChatTransport>,
    settings: SessionSettings,
    inner: Arc<Mutex<SessionInner>>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl ConversationSession {
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        profile: CoachProfile,
        settings: SessionSettings,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let inner = SessionInner {
            state: ConversationState::default(),
            profile,
            current_turn: 0,
            cancel_token: None,
            last_error: None,
        };

        (
            Self {
                transport,
                settings,
                inner: Arc::new(Mutex::new(inner)),
                events,
            },
            rx,
        )
    }

    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> ConversationState {
        self.lock().state.clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.lock().state.status
    }

    pub fn history(&self) -> Vec<Message> {
        self.lock().state.history.clone()
    }

    pub fn active_profile(&self) -> CoachProfile {
        self.lock().profile.clone()
    }

    /// The synthetic error message of the last failed turn, if any.
    pub fn last_error(&self) -> Option<Message> {
        self.lock().last_error.clone()
    }

    /// Record `text` as a user message and start streaming the reply.
    ///
    /// Must be called from within a tokio runtime. Blank input and a send
    /// while another reply is streaming are rejected without touching history.
    pub fn send(&self, text: &str) -> Result<TurnHandle, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| ChatError::NoRuntime)?;

        let (turn, request, token) = {
            let mut guard = self.lock();
            let inner = &mut *guard;
            if inner.state.status == SessionStatus::InFlight {
                return Err(ChatError::TurnInFlight);
            }

            inner.refresh_system_prompt();
            inner.state.history.push(Message::user(text));
            inner.state.pending = Some(String::new());
            inner.state.status = SessionStatus::InFlight;
            inner.last_error = None;
            inner.current_turn += 1;

            let token = CancellationToken::new();
            inner.cancel_token = Some(token.clone());

            let request = ChatRequest {
                model: self.settings.model.clone(),
                messages: inner.state.history.iter().map(Message::to_api).collect(),
                temperature: self.settings.temperature,
                stream: self.settings.streaming,
            };

            let turn = inner.current_turn;
            debug!(
                turn,
                model = %self.settings.model,
                messages = request.messages.len(),
                coach = %inner.profile.id,
                "Starting turn"
            );
            self.emit(SessionEvent::TurnStarted { turn });
            (turn, request, token)
        };

        let session = self.clone();
        let handle = runtime.spawn(async move { session.run_turn(turn, request, token).await });
        Ok(TurnHandle { turn, handle })
    }

    /// Abort the in-flight turn and discard its partial reply.
    ///
    /// Returns false (and changes nothing) when no turn is in flight.
    pub fn cancel(&self) -> bool {
        let mut guard = self.lock();
        if guard.state.status != SessionStatus::InFlight {
            return false;
        }
        self.cancel_locked(&mut guard);
        true
    }

    fn cancel_locked(&self, inner: &mut SessionInner) {
        if let Some(token) = inner.cancel_token.take() {
            token.cancel();
        }
        inner.state.pending = None;
        inner.state.status = SessionStatus::Cancelled;

        let turn = inner.current_turn;
        debug!(turn, "Turn cancelled");
        self.emit(SessionEvent::TurnCancelled { turn });
    }

    /// Switch coach and start a fresh conversation.
    pub fn change_role(&self, profile: CoachProfile) {
        let mut guard = self.lock();
        if guard.state.status == SessionStatus::InFlight {
            self.cancel_locked(&mut guard);
        }
        guard.reset();
        let profile_id = profile.id.clone();
        guard.profile = profile;

        debug!(coach = %profile_id, "Coach changed");
        self.emit(SessionEvent::RoleChanged { profile_id });
    }

    /// Wipe history, keeping the active coach. An in-flight turn is cancelled.
    pub fn clear_history(&self) {
        let mut guard = self.lock();
        if guard.state.status == SessionStatus::InFlight {
            self.cancel_locked(&mut guard);
        }
        guard.reset();
        self.emit(SessionEvent::HistoryCleared);
    }

    async fn run_turn(
        self,
        turn: u64,
        request: ChatRequest,
        token: CancellationToken,
    ) -> TurnOutcome {
        let result = if self.settings.streaming {
            self.stream_reply(turn, request, &token).await
        } else {
            self.buffered_reply(turn, request, &token).await
        };

        match result {
            Ok(()) => self.complete_turn(turn),
            Err(TurnStop::Cancelled) => TurnOutcome::Cancelled,
            Err(TurnStop::Failed(err)) => self.fail_turn(turn, err),
        }
    }

    async fn stream_reply(
        &self,
        turn: u64,
        request: ChatRequest,
        token: &CancellationToken,
    ) -> Result<(), TurnStop> {
        let bytes = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(TurnStop::Cancelled),
            opened = self.transport.stream(request) => opened.map_err(TurnStop::Failed)?,
        };

        let mut fragments = Box::pin(fragment_stream(bytes));
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(TurnStop::Cancelled),
                next = fragments.next() => next,
            };

            match next {
                Some(Ok(delta)) => {
                    if !self.apply_fragment(turn, delta) {
                        return Err(TurnStop::Cancelled);
                    }
                }
                Some(Err(err)) => return Err(TurnStop::Failed(err)),
                None => return Ok(()),
            }
        }
    }

    async fn buffered_reply(
        &self,
        turn: u64,
        request: ChatRequest,
        token: &CancellationToken,
    ) -> Result<(), TurnStop> {
        let completion = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(TurnStop::Cancelled),
            completion = self.transport.complete(request) => completion.map_err(TurnStop::Failed)?,
        };

        let content = completion.first_content().ok_or_else(|| {
            TurnStop::Failed(ChatError::InvalidResponse(
                "completion has no choices".to_string(),
            ))
        })?;

        if !content.is_empty() && !self.apply_fragment(turn, content.to_string()) {
            return Err(TurnStop::Cancelled);
        }
        Ok(())
    }

    fn apply_fragment(&self, turn: u64, delta: String) -> bool {
        let mut guard = self.lock();
        if !guard.is_active(turn) {
            return false;
        }

        let pending = guard.state.pending.get_or_insert_with(String::new);
        pending.push_str(&delta);
        let pending = pending.clone();
        self.emit(SessionEvent::Fragment {
            turn,
            delta,
            pending,
        });
        true
    }

    fn complete_turn(&self, turn: u64) -> TurnOutcome {
        let mut guard = self.lock();
        if !guard.is_active(turn) {
            return TurnOutcome::Cancelled;
        }

        let content = guard.state.pending.take().unwrap_or_default();
        let message = Message::assistant(content.clone());
        guard.state.history.push(message.clone());
        guard.state.status = SessionStatus::Idle;
        guard.cancel_token = None;

        debug!(turn, chars = content.chars().count(), "Turn completed");
        self.emit(SessionEvent::TurnCompleted { turn, message });
        TurnOutcome::Completed(content)
    }

    fn fail_turn(&self, turn: u64, err: ChatError) -> TurnOutcome {
        let mut guard = self.lock();
        if !guard.is_active(turn) {
            return TurnOutcome::Cancelled;
        }

        warn!(turn, error = %err, "Turn failed");
        let summary = err.to_string();
        let message = Message::assistant(format!("Error: {summary}"));
        guard.state.pending = None;
        guard.state.status = SessionStatus::Errored;
        guard.cancel_token = None;
        guard.last_error = Some(message.clone());

        self.emit(SessionEvent::TurnFailed { turn, message });
        TurnOutcome::Failed(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatCompletion;
    use crate::core::transport::ByteStream;
    use futures_util::stream;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Context, Poll};
    use std::time::Duration;

    #[derive(Clone)]
    enum Script {
        Lines(Vec<String>),
        LinesThenHang(Vec<String>),
        LinesThenError(Vec<String>, String),
        Reject(u16, String),
        Completion(String),
    }

    /// Response body that never yields and records when it is dropped.
    struct HangingBody {
        dropped: Arc<AtomicBool>,
    }

    impl futures_util::Stream for HangingBody {
        type Item = Result<Vec<u8>, ChatError>;

        fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
            Poll::Pending
        }
    }

    impl Drop for HangingBody {
        fn drop(&mut self) {
            self.dropped.store(true, Ordering::SeqCst);
        }
    }

    struct ScriptedTransport {
        scripts: Mutex<Vec<Script>>,
        requests: Mutex<Vec<ChatRequest>>,
        body_dropped: Arc<AtomicBool>,
    }

    impl ScriptedTransport {
        fn new(scripts: Vec<Script>) -> Arc<Self> {
            Arc::new(Self {
                scripts: Mutex::new(scripts),
                requests: Mutex::new(Vec::new()),
                body_dropped: Arc::new(AtomicBool::new(false)),
            })
        }

        fn next_script(&self, request: ChatRequest) -> Script {
            self.requests.lock().unwrap().push(request);
            let mut scripts = self.scripts.lock().unwrap();
            assert!(!scripts.is_empty(), "unexpected extra request");
            scripts.remove(0)
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn lines_body(lines: Vec<String>) -> Vec<Result<Vec<u8>, ChatError>> {
            lines
                .into_iter()
                .map(|line| Ok(format!("{line}\n").into_bytes()))
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl ChatTransport for ScriptedTransport {
        async fn complete(&self, request: ChatRequest) -> Result<ChatCompletion, ChatError> {
            match self.next_script(request) {
                Script::Completion(content) => {
                    let body = serde_json::json!({
                        "choices": [{"message": {"role": "assistant", "content": content}}]
                    });
                    Ok(serde_json::from_value(body).expect("valid completion"))
                }
                Script::Reject(status, message) => Err(ChatError::Api { status, message }),
                _ => panic!("streaming script used for buffered request"),
            }
        }

        async fn stream(&self, request: ChatRequest) -> Result<ByteStream, ChatError> {
            match self.next_script(request) {
                Script::Lines(lines) => Ok(Box::pin(stream::iter(Self::lines_body(lines)))),
                Script::LinesThenHang(lines) => {
                    let hanging = HangingBody {
                        dropped: Arc::clone(&self.body_dropped),
                    };
                    Ok(Box::pin(
                        stream::iter(Self::lines_body(lines)).chain(hanging),
                    ))
                }
                Script::LinesThenError(lines, detail) => Ok(Box::pin(
                    stream::iter(Self::lines_body(lines))
                        .chain(stream::iter(vec![Err(ChatError::Stream(detail))])),
                )),
                Script::Reject(status, message) => Err(ChatError::Api { status, message }),
                Script::Completion(_) => panic!("buffered script used for streaming request"),
            }
        }
    }

    fn event_line(content: &str) -> String {
        format!(
            "data: {}",
            serde_json::json!({"choices": [{"delta": {"content": content}}]})
        )
    }

    fn hello_lines() -> Vec<String> {
        vec![
            r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#.to_string(),
            r#"data: {"choices":[{"delta":{"content":"lo"}}]}"#.to_string(),
            "data: [DONE]".to_string(),
        ]
    }

    fn profile(id: &str, prompt: &str) -> CoachProfile {
        CoachProfile {
            id: id.to_string(),
            display_name: id.to_string(),
            system_prompt: prompt.to_string(),
        }
    }

    fn new_session(
        transport: Arc<ScriptedTransport>,
        streaming: bool,
    ) -> (ConversationSession, mpsc::UnboundedReceiver<SessionEvent>) {
        let settings = SessionSettings {
            model: "test-model".to_string(),
            temperature: Some(0.7),
            streaming,
        };
        ConversationSession::new(transport, profile("p1", "P1"), settings)
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for session event")
            .expect("event channel closed")
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn wait_for_fragment(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) {
        loop {
            if let SessionEvent::Fragment { .. } = next_event(rx).await {
                return;
            }
        }
    }

    #[tokio::test]
    async fn streamed_reply_is_committed_as_assistant_message() {
        let transport = ScriptedTransport::new(vec![Script::Lines(hello_lines())]);
        let (session, mut rx) = new_session(Arc::clone(&transport), true);

        let handle = session.send("hi").expect("send should start a turn");
        assert_eq!(handle.turn(), 1);
        assert_eq!(handle.outcome().await, TurnOutcome::Completed("Hello".to_string()));

        assert_eq!(
            session.history(),
            vec![
                Message::system("P1"),
                Message::user("hi"),
                Message::assistant("Hello")
            ]
        );
        let state = session.snapshot();
        assert_eq!(state.pending, None);
        assert_eq!(state.status, SessionStatus::Idle);

        assert_eq!(
            drain(&mut rx),
            vec![
                SessionEvent::TurnStarted { turn: 1 },
                SessionEvent::Fragment {
                    turn: 1,
                    delta: "Hel".to_string(),
                    pending: "Hel".to_string(),
                },
                SessionEvent::Fragment {
                    turn: 1,
                    delta: "lo".to_string(),
                    pending: "Hello".to_string(),
                },
                SessionEvent::TurnCompleted {
                    turn: 1,
                    message: Message::assistant("Hello"),
                },
            ]
        );

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].stream);
        assert_eq!(requests[0].model, "test-model");
        assert_eq!(requests[0].temperature, Some(0.7));
        let roles: Vec<&str> = requests[0].messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user"]);
    }

    #[tokio::test]
    async fn blank_input_is_rejected_without_side_effects() {
        let transport = ScriptedTransport::new(Vec::new());
        let (session, mut rx) = new_session(Arc::clone(&transport), true);

        for text in ["", "   ", "\n\t"] {
            assert!(matches!(session.send(text), Err(ChatError::EmptyInput)));
        }

        assert!(session.history().is_empty());
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(transport.requests().is_empty());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn send_outside_runtime_is_rejected() {
        let transport = ScriptedTransport::new(Vec::new());
        let (session, _rx) = new_session(transport, true);
        assert!(matches!(session.send("hi"), Err(ChatError::NoRuntime)));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn system_prompt_stays_single_and_first_across_turns() {
        let transport = ScriptedTransport::new(vec![
            Script::Lines(hello_lines()),
            Script::Lines(vec![event_line("Again")]),
        ]);
        let (session, _rx) = new_session(Arc::clone(&transport), true);

        session.send("hi").unwrap().outcome().await;
        session.send("once more").unwrap().outcome().await;

        let history = session.history();
        assert_eq!(history.len(), 5);
        assert_eq!(history[0], Message::system("P1"));
        assert_eq!(history.iter().filter(|m| m.is_system()).count(), 1);
        assert_eq!(history[4], Message::assistant("Again"));

        let second = &transport.requests()[1];
        assert_eq!(second.messages.len(), 4);
        assert_eq!(second.messages[0].content, "P1");
    }

    #[tokio::test]
    async fn change_role_starts_fresh_with_new_prompt() {
        let transport = ScriptedTransport::new(vec![
            Script::Lines(hello_lines()),
            Script::Lines(hello_lines()),
        ]);
        let (session, mut rx) = new_session(Arc::clone(&transport), true);

        session.send("hi").unwrap().outcome().await;
        drain(&mut rx);

        session.change_role(profile("p2", "P2"));
        assert!(session.history().is_empty());
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.active_profile().id, "p2");
        assert_eq!(
            drain(&mut rx),
            vec![SessionEvent::RoleChanged {
                profile_id: "p2".to_string()
            }]
        );

        session.send("hi").unwrap().outcome().await;
        let history = session.history();
        assert_eq!(history[0], Message::system("P2"));
        assert_eq!(history[1], Message::user("hi"));

        let request = &transport.requests()[1];
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].content, "P2");
    }

    #[tokio::test]
    async fn cancel_discards_pending_and_closes_the_body() {
        let transport =
            ScriptedTransport::new(vec![Script::LinesThenHang(vec![event_line("Partial")])]);
        let (session, mut rx) = new_session(Arc::clone(&transport), true);

        let handle = session.send("tell me a story").unwrap();
        wait_for_fragment(&mut rx).await;
        assert_eq!(session.snapshot().pending.as_deref(), Some("Partial"));

        assert!(session.cancel());
        assert_eq!(handle.outcome().await, TurnOutcome::Cancelled);

        let state = session.snapshot();
        assert_eq!(state.status, SessionStatus::Cancelled);
        assert_eq!(state.pending, None);
        assert_eq!(
            state.history,
            vec![Message::system("P1"), Message::user("tell me a story")]
        );
        assert!(transport.body_dropped.load(Ordering::SeqCst));

        let events = drain(&mut rx);
        assert_eq!(events, vec![SessionEvent::TurnCancelled { turn: 1 }]);

        assert!(!session.cancel());
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn cancel_when_idle_is_a_no_op() {
        let transport = ScriptedTransport::new(Vec::new());
        let (session, mut rx) = new_session(transport, true);
        assert!(!session.cancel());
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn send_after_cancel_starts_a_new_turn() {
        let transport = ScriptedTransport::new(vec![
            Script::LinesThenHang(vec![event_line("Part")]),
            Script::Lines(hello_lines()),
        ]);
        let (session, mut rx) = new_session(Arc::clone(&transport), true);

        let first = session.send("first").unwrap();
        wait_for_fragment(&mut rx).await;
        session.cancel();
        first.outcome().await;

        let second = session.send("second").unwrap();
        assert_eq!(second.turn(), 2);
        assert_eq!(second.outcome().await, TurnOutcome::Completed("Hello".to_string()));
        assert_eq!(
            session.history(),
            vec![
                Message::system("P1"),
                Message::user("first"),
                Message::user("second"),
                Message::assistant("Hello"),
            ]
        );
    }

    #[tokio::test]
    async fn second_send_while_in_flight_is_rejected() {
        let transport =
            ScriptedTransport::new(vec![Script::LinesThenHang(vec![event_line("Wait")])]);
        let (session, mut rx) = new_session(Arc::clone(&transport), true);

        let handle = session.send("first").unwrap();
        wait_for_fragment(&mut rx).await;

        assert!(matches!(session.send("second"), Err(ChatError::TurnInFlight)));
        assert_eq!(session.history().len(), 2);
        assert_eq!(transport.requests().len(), 1);

        session.cancel();
        assert_eq!(handle.outcome().await, TurnOutcome::Cancelled);
    }

    #[tokio::test]
    async fn transport_failure_surfaces_synthetic_error_message() {
        let transport = ScriptedTransport::new(vec![Script::Reject(
            500,
            "API Error: upstream unavailable".to_string(),
        )]);
        let (session, mut rx) = new_session(Arc::clone(&transport), true);

        let outcome = session.send("hi").unwrap().outcome().await;
        assert_eq!(
            outcome,
            TurnOutcome::Failed("HTTP 500: API Error: upstream unavailable".to_string())
        );

        let state = session.snapshot();
        assert_eq!(state.status, SessionStatus::Errored);
        assert_eq!(state.pending, None);
        assert_eq!(state.history, vec![Message::system("P1"), Message::user("hi")]);

        let expected = Message::assistant("Error: HTTP 500: API Error: upstream unavailable");
        assert_eq!(session.last_error(), Some(expected.clone()));
        assert_eq!(
            drain(&mut rx),
            vec![
                SessionEvent::TurnStarted { turn: 1 },
                SessionEvent::TurnFailed {
                    turn: 1,
                    message: expected
                },
            ]
        );
    }

    #[tokio::test]
    async fn mid_stream_failure_does_not_commit_partial_text() {
        let transport = ScriptedTransport::new(vec![
            Script::LinesThenError(vec![event_line("Half")], "connection reset".to_string()),
            Script::Lines(hello_lines()),
        ]);
        let (session, _rx) = new_session(Arc::clone(&transport), true);

        let outcome = session.send("hi").unwrap().outcome().await;
        assert_eq!(
            outcome,
            TurnOutcome::Failed("Stream interrupted: connection reset".to_string())
        );
        assert!(session.history().iter().all(|m| m.role != crate::core::message::Role::Assistant));

        // the next turn clears the error and proceeds normally
        session.send("retry").unwrap().outcome().await;
        assert_eq!(session.last_error(), None);
        assert_eq!(session.status(), SessionStatus::Idle);
        assert_eq!(session.history().last(), Some(&Message::assistant("Hello")));
    }

    #[tokio::test]
    async fn malformed_events_are_skipped_mid_stream() {
        let transport = ScriptedTransport::new(vec![Script::Lines(vec![
            event_line("Good"),
            "data: {oops".to_string(),
            ": ping".to_string(),
            String::new(),
            event_line(" job"),
        ])]);
        let (session, _rx) = new_session(transport, true);

        let outcome = session.send("hi").unwrap().outcome().await;
        assert_eq!(outcome, TurnOutcome::Completed("Good job".to_string()));
    }

    #[tokio::test]
    async fn clear_history_cancels_in_flight_turn_and_keeps_profile() {
        let transport =
            ScriptedTransport::new(vec![Script::LinesThenHang(vec![event_line("Busy")])]);
        let (session, mut rx) = new_session(Arc::clone(&transport), true);

        let handle = session.send("hi").unwrap();
        wait_for_fragment(&mut rx).await;

        session.clear_history();
        assert_eq!(handle.outcome().await, TurnOutcome::Cancelled);

        let state = session.snapshot();
        assert!(state.history.is_empty());
        assert_eq!(state.status, SessionStatus::Idle);
        assert_eq!(state.pending, None);
        assert_eq!(session.active_profile().id, "p1");
        assert_eq!(
            drain(&mut rx),
            vec![
                SessionEvent::TurnCancelled { turn: 1 },
                SessionEvent::HistoryCleared
            ]
        );
    }

    #[tokio::test]
    async fn change_role_during_turn_leaves_session_idle_and_empty() {
        let transport =
            ScriptedTransport::new(vec![Script::LinesThenHang(vec![event_line("Busy")])]);
        let (session, mut rx) = new_session(Arc::clone(&transport), true);

        let handle = session.send("hi").unwrap();
        wait_for_fragment(&mut rx).await;

        session.change_role(profile("p2", "P2"));
        assert_eq!(handle.outcome().await, TurnOutcome::Cancelled);
        assert!(session.history().is_empty());
        assert_eq!(session.status(), SessionStatus::Idle);
        assert!(transport.body_dropped.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn buffered_mode_uses_complete_and_reports_one_fragment() {
        let transport =
            ScriptedTransport::new(vec![Script::Completion("Nice to meet you!".to_string())]);
        let (session, mut rx) = new_session(Arc::clone(&transport), false);

        let outcome = session.send("hello").unwrap().outcome().await;
        assert_eq!(
            outcome,
            TurnOutcome::Completed("Nice to meet you!".to_string())
        );
        assert!(!transport.requests()[0].stream);

        let fragments: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|event| matches!(event, SessionEvent::Fragment { .. }))
            .collect();
        assert_eq!(fragments.len(), 1);
        assert_eq!(
            session.history().last(),
            Some(&Message::assistant("Nice to meet you!"))
        );
    }
}
