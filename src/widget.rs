use std::sync::Arc;

use chrono::{Local, Timelike};

use crate::api::{ApiError, ChatApi};

pub const LABEL_CHECKING: &str = "확인 중...";
pub const LABEL_CONNECTED: &str = "연결됨";
pub const LABEL_UNAVAILABLE: &str = "연결 실패";
pub const LABEL_UNREACHABLE: &str = "연결 오류";

pub const APPLICATION_ERROR_PREFIX: &str = "죄송합니다. 오류가 발생했습니다: ";
pub const TRANSPORT_ERROR_MESSAGE: &str =
    "서버와의 통신 중 오류가 발생했습니다. 잠시 후 다시 시도해주세요.";
pub const CLEAR_PROMPT: &str = "대화 내용을 모두 지우시겠습니까?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: String,
    pub is_error: bool,
}

impl ChatMessage {
    fn now(role: Role, content: String, is_error: bool) -> Self {
        let now = Local::now();
        Self {
            role,
            content,
            timestamp: clock_label(now.hour(), now.minute()),
            is_error,
        }
    }
}

/// Two-digit 12-hour clock with a Korean AM/PM marker, e.g. `오후 03:27`.
pub fn clock_label(hour: u32, minute: u32) -> String {
    let marker = if hour < 12 { "오전" } else { "오후" };
    let hour12 = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{} {:02}:{:02}", marker, hour12, minute)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Error,
    Unknown,
}

impl ConnectionState {
    /// Indicator class name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Connected => "connected",
            ConnectionState::Error => "error",
            ConnectionState::Unknown => "unknown",
        }
    }
}

/// The UI handles the widget drives.
pub trait ChatView {
    fn set_status(&mut self, state: ConnectionState, label: &str);
    fn append_message(&mut self, message: &ChatMessage);
    /// Remove every rendered message except the welcome element.
    fn clear_messages(&mut self);
    fn clear_input(&mut self);
    fn set_loading(&mut self, loading: bool);
    fn focus_input(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestState {
    Idle,
    Sending,
}

pub struct ChatWidget<V, A> {
    view: V,
    api: Arc<A>,
    state: RequestState,
    connection: ConnectionState,
    history: Vec<ChatMessage>,
}

impl<V: ChatView, A: ChatApi> ChatWidget<V, A> {
    pub fn new(mut view: V, api: Arc<A>) -> Self {
        view.set_status(ConnectionState::Unknown, LABEL_CHECKING);
        Self {
            view,
            api,
            state: RequestState::Idle,
            connection: ConnectionState::Unknown,
            history: Vec::new(),
        }
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn api(&self) -> Arc<A> {
        Arc::clone(&self.api)
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    /// The loading flag: true exactly while a chat request is in flight.
    pub fn is_loading(&self) -> bool {
        self.state == RequestState::Sending
    }

    pub async fn probe_connection(&mut self) {
        let result = self.api.status().await;
        self.apply_status(result);
    }

    /// Update the indicator from a status probe outcome.
    pub fn apply_status(&mut self, result: Result<bool, ApiError>) {
        let (state, label) = match result {
            Ok(true) => {
                tracing::info!("backend connected");
                (ConnectionState::Connected, LABEL_CONNECTED)
            }
            Ok(false) => {
                tracing::warn!("backend reported itself unavailable");
                (ConnectionState::Error, LABEL_UNAVAILABLE)
            }
            Err(err) => {
                tracing::warn!(error = %err, "status probe failed");
                (ConnectionState::Error, LABEL_UNREACHABLE)
            }
        };
        self.connection = state;
        self.view.set_status(state, label);
    }

    /// Send one message and render the outcome. Returns false without any
    /// network call when the text is blank or a request is already in flight.
    pub async fn send_message(&mut self, text: &str) -> bool {
        let Some(message) = self.begin_send(text) else {
            return false;
        };
        let result = self.api.chat(&message).await;
        self.complete_send(result);
        true
    }

    /// First half of a send: record and render the user message, clear the
    /// input and raise the loading flag. Returns the text to dispatch.
    pub fn begin_send(&mut self, text: &str) -> Option<String> {
        let message = text.trim();
        if message.is_empty() {
            return None;
        }
        if self.is_loading() {
            tracing::debug!("send ignored: request already in flight");
            return None;
        }

        self.push(ChatMessage::now(Role::User, message.to_string(), false));
        self.view.clear_input();
        self.state = RequestState::Sending;
        self.view.set_loading(true);

        tracing::debug!(chars = message.chars().count(), "dispatching chat request");
        Some(message.to_string())
    }

    /// Second half of a send: render the reply or error and lower the flag.
    pub fn complete_send(&mut self, result: Result<String, ApiError>) {
        if !self.is_loading() {
            tracing::warn!("chat result arrived with no request in flight; dropped");
            return;
        }

        let reply = match result {
            Ok(reply) => ChatMessage::now(Role::Bot, reply, false),
            Err(ApiError::Application(error)) => {
                tracing::warn!(%error, "backend rejected chat request");
                ChatMessage::now(Role::Bot, format!("{}{}", APPLICATION_ERROR_PREFIX, error), true)
            }
            Err(err @ ApiError::Transport(_)) => {
                tracing::warn!(error = %err, "chat request failed");
                ChatMessage::now(Role::Bot, TRANSPORT_ERROR_MESSAGE.to_string(), true)
            }
        };
        self.push(reply);

        self.state = RequestState::Idle;
        self.view.set_loading(false);
        self.view.focus_input();
    }

    /// Clear the transcript and history if `confirm` accepts the prompt.
    pub fn clear_history(&mut self, confirm: impl FnOnce(&str) -> bool) -> bool {
        if !confirm(CLEAR_PROMPT) {
            return false;
        }

        tracing::info!(messages = self.history.len(), "clearing chat history");
        self.view.clear_messages();
        self.history.clear();
        self.view.focus_input();
        true
    }

    fn push(&mut self, message: ChatMessage) {
        self.view.append_message(&message);
        self.history.push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::FakeApi;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Status(ConnectionState, String),
        Append(Role, String, bool),
        Clear,
        ClearInput,
        Loading(bool),
        Focus,
    }

    #[derive(Default)]
    struct RecordingView {
        calls: Vec<Call>,
    }

    impl RecordingView {
        fn appended(&self) -> usize {
            self.calls.iter().filter(|c| matches!(c, Call::Append(..))).count()
        }
    }

    impl ChatView for RecordingView {
        fn set_status(&mut self, state: ConnectionState, label: &str) {
            self.calls.push(Call::Status(state, label.to_string()));
        }
        fn append_message(&mut self, message: &ChatMessage) {
            self.calls.push(Call::Append(message.role, message.content.clone(), message.is_error));
        }
        fn clear_messages(&mut self) {
            self.calls.push(Call::Clear);
        }
        fn clear_input(&mut self) {
            self.calls.push(Call::ClearInput);
        }
        fn set_loading(&mut self, loading: bool) {
            self.calls.push(Call::Loading(loading));
        }
        fn focus_input(&mut self) {
            self.calls.push(Call::Focus);
        }
    }

    fn widget(api: FakeApi) -> ChatWidget<RecordingView, FakeApi> {
        ChatWidget::new(RecordingView::default(), Arc::new(api))
    }

    #[tokio::test]
    async fn test_send_appends_user_and_bot_messages() {
        let api = FakeApi::with_replies(vec![Ok("학생수 12345".to_string())]);
        let mut w = widget(api.clone());

        assert!(w.send_message("  학생수 알려줘  ").await);

        assert_eq!(api.sent(), vec!["학생수 알려줘".to_string()]);
        assert_eq!(w.history().len(), 2);
        assert_eq!(w.history()[0].role, Role::User);
        assert_eq!(w.history()[0].content, "학생수 알려줘");
        assert_eq!(w.history()[1].role, Role::Bot);
        assert_eq!(w.history()[1].content, "학생수 12345");
        assert!(!w.history()[1].is_error);
        assert!(!w.is_loading());

        assert_eq!(
            &w.view().calls[1..],
            &[
                Call::Append(Role::User, "학생수 알려줘".to_string(), false),
                Call::ClearInput,
                Call::Loading(true),
                Call::Append(Role::Bot, "학생수 12345".to_string(), false),
                Call::Loading(false),
                Call::Focus,
            ]
        );
    }

    #[tokio::test]
    async fn test_blank_input_makes_no_request() {
        let api = FakeApi::default();
        let mut w = widget(api.clone());

        assert!(!w.send_message("").await);
        assert!(!w.send_message(" \n\t ").await);

        assert!(api.sent().is_empty());
        assert!(w.history().is_empty());
        assert_eq!(w.view().appended(), 0);
    }

    #[tokio::test]
    async fn test_second_send_while_loading_is_noop() {
        let api = FakeApi::with_replies(vec![Ok("첫 번째".to_string())]);
        let mut w = widget(api.clone());

        let first = w.begin_send("첫 질문").unwrap();
        assert!(w.is_loading());
        assert_eq!(w.history().len(), 1);

        assert!(w.begin_send("두 번째 질문").is_none());
        assert!(!w.send_message("세 번째 질문").await);
        assert_eq!(w.history().len(), 1);
        assert!(api.sent().is_empty());

        let reply = w.api().chat(&first).await;
        w.complete_send(reply);
        assert!(!w.is_loading());
        assert_eq!(w.history().len(), 2);
        assert_eq!(api.sent(), vec!["첫 질문".to_string()]);
    }

    #[tokio::test]
    async fn test_application_error_is_prefixed() {
        let api = FakeApi::with_replies(vec![Err(ApiError::Application("분석 실패".to_string()))]);
        let mut w = widget(api);

        w.send_message("질문").await;

        let reply = &w.history()[1];
        assert!(reply.is_error);
        assert_eq!(reply.content, "죄송합니다. 오류가 발생했습니다: 분석 실패");
        assert!(!w.is_loading());
    }

    #[tokio::test]
    async fn test_transport_error_uses_fallback_and_resets_loading() {
        let api = FakeApi::with_replies(vec![
            Err(ApiError::Transport("connection refused".to_string())),
            Ok("복구됨".to_string()),
        ]);
        let mut w = widget(api);

        w.send_message("질문").await;
        assert_eq!(w.history()[1].content, TRANSPORT_ERROR_MESSAGE);
        assert!(w.history()[1].is_error);
        assert!(!w.is_loading());
        assert_eq!(w.view().calls.last(), Some(&Call::Focus));

        // The widget is usable again.
        assert!(w.send_message("다시").await);
        assert_eq!(w.history().len(), 4);
        assert_eq!(w.history()[3].content, "복구됨");
    }

    #[test]
    fn test_stray_completion_is_ignored() {
        let mut w = widget(FakeApi::default());
        w.complete_send(Ok("늦은 응답".to_string()));
        assert!(w.history().is_empty());
    }

    #[tokio::test]
    async fn test_clear_history_with_confirmation() {
        let mut w = widget(FakeApi::with_replies(vec![Ok("답".to_string())]));
        w.send_message("질문").await;

        let mut prompt = String::new();
        assert!(w.clear_history(|p| {
            prompt = p.to_string();
            true
        }));

        assert_eq!(prompt, CLEAR_PROMPT);
        assert!(w.history().is_empty());
        let tail = &w.view().calls[w.view().calls.len() - 2..];
        assert_eq!(tail, &[Call::Clear, Call::Focus]);
    }

    #[tokio::test]
    async fn test_clear_during_request_keeps_late_reply() {
        let api = FakeApi::with_replies(vec![Ok("늦은 답".to_string())]);
        let mut w = widget(api.clone());

        let message = w.begin_send("질문").unwrap();
        assert!(w.clear_history(|_| true));
        assert!(w.history().is_empty());
        assert!(w.is_loading());

        let reply = w.api().chat(&message).await;
        w.complete_send(reply);

        assert!(!w.is_loading());
        assert_eq!(w.history().len(), 1);
        assert_eq!(w.history()[0].role, Role::Bot);
        assert_eq!(w.history()[0].content, "늦은 답");
        let tail = &w.view().calls[w.view().calls.len() - 3..];
        assert_eq!(
            tail,
            &[
                Call::Append(Role::Bot, "늦은 답".to_string(), false),
                Call::Loading(false),
                Call::Focus,
            ]
        );
    }

    #[tokio::test]
    async fn test_clear_history_declined_keeps_everything() {
        let mut w = widget(FakeApi::with_replies(vec![Ok("답".to_string())]));
        w.send_message("질문").await;
        let calls_before = w.view().calls.len();

        assert!(!w.clear_history(|_| false));
        assert_eq!(w.history().len(), 2);
        assert_eq!(w.view().calls.len(), calls_before);
    }

    #[tokio::test]
    async fn test_status_probe_states() {
        let api = FakeApi::default();
        let mut w = widget(api.clone());
        assert_eq!(w.connection(), ConnectionState::Unknown);
        assert_eq!(
            w.view().calls[0],
            Call::Status(ConnectionState::Unknown, LABEL_CHECKING.to_string())
        );

        w.probe_connection().await;
        assert_eq!(w.connection(), ConnectionState::Connected);

        *api.status.lock().unwrap() = Some(Err(ApiError::Transport("timeout".to_string())));
        w.probe_connection().await;
        assert_eq!(
            w.view().calls.last(),
            Some(&Call::Status(ConnectionState::Error, LABEL_UNREACHABLE.to_string()))
        );
    }

    #[tokio::test]
    async fn test_unavailable_status_does_not_block_chat() {
        let api = FakeApi::with_replies(vec![Ok("정상 응답".to_string())]);
        *api.status.lock().unwrap() = Some(Ok(false));
        let mut w = widget(api);

        w.probe_connection().await;
        assert_eq!(w.connection(), ConnectionState::Error);
        assert_eq!(
            w.view().calls.last(),
            Some(&Call::Status(ConnectionState::Error, LABEL_UNAVAILABLE.to_string()))
        );

        assert!(w.send_message("질문").await);
        assert_eq!(w.history()[1].content, "정상 응답");
    }

    #[test]
    fn test_clock_label() {
        assert_eq!(clock_label(0, 5), "오전 12:05");
        assert_eq!(clock_label(9, 30), "오전 09:30");
        assert_eq!(clock_label(12, 0), "오후 12:00");
        assert_eq!(clock_label(15, 27), "오후 03:27");
        assert_eq!(clock_label(23, 59), "오후 11:59");
    }

    #[test]
    fn test_connection_state_class() {
        assert_eq!(ConnectionState::Connected.as_str(), "connected");
        assert_eq!(ConnectionState::Error.as_str(), "error");
        assert_eq!(ConnectionState::Unknown.as_str(), "unknown");
    }
}
