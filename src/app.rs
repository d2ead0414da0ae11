use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::api::{ApiError, ChatApi};
use crate::view::TranscriptView;
use crate::widget::{ChatView, ChatWidget};

pub struct App<A: ChatApi + 'static> {
    pub should_quit: bool,
    pub widget: ChatWidget<TranscriptView, A>,
    pub base_url: String,

    // Clear-history confirmation popup
    pub confirm_clear: bool,

    // In-flight backend calls, polled by the event loop
    pub chat_task: Option<JoinHandle<Result<String, ApiError>>>,
    pub status_task: Option<JoinHandle<Result<bool, ApiError>>>,

    // Transcript scrolling
    pub scroll: u16,
    pub max_scroll: u16,
    pub chat_height: u16, // inner height of the transcript area
    pub chat_width: u16,  // inner width of the transcript area

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl<A: ChatApi + 'static> App<A> {
    pub fn new(widget: ChatWidget<TranscriptView, A>, base_url: &str) -> Self {
        Self {
            should_quit: false,
            widget,
            base_url: base_url.to_string(),
            confirm_clear: false,
            chat_task: None,
            status_task: None,
            scroll: 0,
            max_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
        }
    }

    pub fn view(&self) -> &TranscriptView {
        self.widget.view()
    }

    pub fn view_mut(&mut self) -> &mut TranscriptView {
        self.widget.view_mut()
    }

    /// Probe `/api/status` in the background unless a probe is running.
    pub fn start_probe(&mut self) {
        if self.status_task.is_some() {
            return;
        }
        let api = self.widget.api();
        self.status_task = Some(tokio::spawn(async move { api.status().await }));
    }

    /// Send whatever is in the input box.
    pub fn submit(&mut self) {
        let text = self.view().input.clone();
        if let Some(message) = self.widget.begin_send(&text) {
            let api: Arc<A> = self.widget.api();
            self.chat_task = Some(tokio::spawn(async move { api.chat(&message).await }));
        }
    }

    /// Hand finished background calls back to the widget.
    pub async fn poll_tasks(&mut self) {
        if self.chat_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.chat_task.take() {
                let result = task
                    .await
                    .unwrap_or_else(|e| Err(ApiError::Transport(e.to_string())));
                self.widget.complete_send(result);
            }
        }

        if self.status_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.status_task.take() {
                let result = task
                    .await
                    .unwrap_or_else(|e| Err(ApiError::Transport(e.to_string())));
                self.widget.apply_status(result);
            }
        }
    }

    pub fn request_clear(&mut self) {
        self.confirm_clear = true;
    }

    pub fn answer_clear(&mut self, confirmed: bool) {
        self.confirm_clear = false;
        if self.widget.clear_history(|_| confirmed) {
            self.scroll = 0;
        } else {
            self.view_mut().focus_input();
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.widget.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.scroll = self.scroll.saturating_add(lines).min(self.max_scroll);
    }

    pub fn page(&self) -> u16 {
        (self.chat_height / 2).max(1)
    }
}
