use crate::format::{ReplyFormatter, Segment};
use crate::widget::{ChatMessage, ChatView, ConnectionState, Role};

pub const WELCOME_MESSAGE: &str = "안녕하세요! 교육 데이터 분석 챗봇입니다.\n\
학생수, 교사수, 교육예산, 출생아수, 폐교 현황 등 지역별 교육 통계에 대해 물어보세요.";

/// A transcript entry ready to draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub role: Role,
    pub segments: Vec<Segment>,
    pub timestamp: String,
    pub is_error: bool,
}

/// Terminal-side state behind [`ChatView`]: the status indicator, the
/// transcript below a fixed welcome entry, and the input box.
pub struct TranscriptView {
    formatter: ReplyFormatter,
    pub status: ConnectionState,
    pub status_label: String,
    welcome: Vec<Segment>,
    pub messages: Vec<RenderedMessage>,
    pub loading: bool,
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars
    pub input_focused: bool,
    /// Set whenever a message lands; the UI consumes it to scroll to the end.
    pub scroll_to_bottom: bool,
}

impl TranscriptView {
    pub fn new(formatter: ReplyFormatter) -> Self {
        let welcome = formatter.segments(WELCOME_MESSAGE);
        Self {
            formatter,
            status: ConnectionState::Unknown,
            status_label: String::new(),
            welcome,
            messages: Vec::new(),
            loading: false,
            input: String::new(),
            cursor: 0,
            input_focused: true,
            scroll_to_bottom: false,
        }
    }

    pub fn welcome(&self) -> &[Segment] {
        &self.welcome
    }

    /// Whether the send action is currently available.
    pub fn can_send(&self) -> bool {
        !self.loading && !self.input.trim().is_empty()
    }

    pub fn insert_char(&mut self, c: char) {
        if self.loading {
            return;
        }
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.loading || self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.remove(byte_pos);
    }

    pub fn delete(&mut self) {
        if self.loading || self.cursor >= self.input.chars().count() {
            return;
        }
        let byte_pos = char_to_byte_index(&self.input, self.cursor);
        self.input.remove(byte_pos);
    }

    pub fn cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.chars().count());
    }

    pub fn cursor_home(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.cursor = self.input.chars().count();
    }
}

impl ChatView for TranscriptView {
    fn set_status(&mut self, state: ConnectionState, label: &str) {
        self.status = state;
        self.status_label = label.to_string();
    }

    fn append_message(&mut self, message: &ChatMessage) {
        let segments = match message.role {
            // User input is shown verbatim.
            Role::User => message
                .content
                .split('\n')
                .enumerate()
                .flat_map(|(i, line)| {
                    let brk = (i > 0).then_some(Segment::LineBreak);
                    let text = (!line.is_empty()).then(|| Segment::Text(line.to_string()));
                    brk.into_iter().chain(text)
                })
                .collect(),
            Role::Bot => self.formatter.segments(&message.content),
        };

        self.messages.push(RenderedMessage {
            role: message.role,
            segments,
            timestamp: message.timestamp.clone(),
            is_error: message.is_error,
        });
        self.scroll_to_bottom = true;
    }

    fn clear_messages(&mut self) {
        self.messages.clear();
        self.scroll_to_bottom = true;
    }

    fn clear_input(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
        if loading {
            self.input_focused = false;
        }
        self.scroll_to_bottom = true;
    }

    fn focus_input(&mut self) {
        self.input_focused = true;
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}
