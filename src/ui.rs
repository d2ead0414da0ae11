use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};

use unicode_width::UnicodeWidthChar;

use crate::api::ChatApi;
use crate::app::App;
use crate::format::Segment;
use crate::view::TranscriptView;
use crate::widget::{ConnectionState, Role, CLEAR_PROMPT};

const ACCENT: Color = Color::Rgb(102, 126, 234);
const ERROR: Color = Color::Rgb(245, 101, 101);

pub fn render<A: ChatApi + 'static>(app: &mut App<A>, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, transcript, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_transcript(app, frame, chat_area);
    render_input(app.view(), frame, input_area);
    render_footer(app, frame, footer_area);

    if app.confirm_clear {
        render_confirm(frame, area);
    }
}

fn status_color(state: ConnectionState) -> Color {
    match state {
        ConnectionState::Connected => Color::Green,
        ConnectionState::Error => ERROR,
        ConnectionState::Unknown => Color::Gray,
    }
}

fn render_header<A: ChatApi + 'static>(app: &App<A>, frame: &mut Frame, area: Rect) {
    let view = app.view();
    let title = Line::from(vec![
        Span::styled(" 교육 데이터 분석 챗봇 ", Style::default().fg(Color::White).bold()),
        Span::styled("●", Style::default().fg(status_color(view.status))),
        Span::raw(" "),
        Span::styled(view.status_label.clone(), Style::default().fg(Color::White)),
        Span::styled(format!("  {}", app.base_url), Style::default().fg(Color::Gray)),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(ACCENT));
    frame.render_widget(header, area);
}

fn segment_lines(segments: &[Segment], base: Style) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut spans: Vec<Span<'static>> = Vec::new();

    for segment in segments {
        match segment {
            Segment::Text(text) => spans.push(Span::styled(text.clone(), base)),
            Segment::Emphasis(text) => spans.push(Span::styled(
                text.clone(),
                base.fg(ACCENT).add_modifier(Modifier::BOLD),
            )),
            Segment::LineBreak => lines.push(Line::from(std::mem::take(&mut spans))),
        }
    }
    lines.push(Line::from(spans));
    lines
}

fn speaker_line(role: Role, timestamp: &str, is_error: bool) -> Line<'static> {
    let (label, color) = match (role, is_error) {
        (Role::User, _) => ("나", Color::Cyan),
        (Role::Bot, false) => ("챗봇", Color::Yellow),
        (Role::Bot, true) => ("⚠ 챗봇", ERROR),
    };
    let mut spans = vec![Span::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )];
    if !timestamp.is_empty() {
        spans.push(Span::styled(format!("  {}", timestamp), Style::default().fg(Color::DarkGray)));
    }
    Line::from(spans)
}

/// The transcript as styled lines: welcome entry, messages, loading indicator.
pub fn transcript_lines(view: &TranscriptView, animation_frame: u8) -> Vec<Line<'static>> {
    let mut lines = vec![speaker_line(Role::Bot, "", false)];
    lines.extend(segment_lines(view.welcome(), Style::default().fg(Color::DarkGray)));
    lines.push(Line::default());

    for msg in &view.messages {
        lines.push(speaker_line(msg.role, &msg.timestamp, msg.is_error));
        let base = if msg.is_error { Style::default().fg(ERROR) } else { Style::default() };
        lines.extend(segment_lines(&msg.segments, base));
        lines.push(Line::default());
    }

    if view.loading {
        lines.push(speaker_line(Role::Bot, "", false));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("분석 중{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    lines
}

fn render_transcript<A: ChatApi + 'static>(app: &mut App<A>, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    // Row count must come from the same word wrapping that draws the text.
    let chat = Paragraph::new(Text::from(transcript_lines(app.view(), app.animation_frame)))
        .wrap(Wrap { trim: false });
    let total = chat.line_count(app.chat_width).min(u16::MAX as usize) as u16;
    app.max_scroll = total.saturating_sub(app.chat_height);

    if app.view().scroll_to_bottom {
        app.view_mut().scroll_to_bottom = false;
        app.scroll = app.max_scroll;
    }
    app.scroll = app.scroll.min(app.max_scroll);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" 대화 ");

    let chat = chat.block(block).scroll((app.scroll, 0));
    frame.render_widget(chat, area);

    if app.max_scroll > 0 {
        let mut state = ScrollbarState::new(app.max_scroll as usize).position(app.scroll as usize);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight),
            area,
            &mut state,
        );
    }
}

fn render_input(view: &TranscriptView, frame: &mut Frame, area: Rect) {
    let border_color = if view.loading {
        Color::DarkGray
    } else if view.input_focused {
        Color::Yellow
    } else {
        Color::Gray
    };
    let title = if view.loading {
        " 응답을 기다리는 중... "
    } else if view.can_send() {
        " 질문 (Enter 전송) "
    } else {
        " 질문 "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2);
    let (visible_text, cursor_x) = input_window(&view.input, view.cursor, inner_width);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);
    frame.render_widget(input, area);

    if view.input_focused && !view.loading {
        frame.set_cursor_position((area.x + 1 + cursor_x, area.y + 1));
    }
}

/// Slice of `input` that fits in `width` columns with the cursor visible,
/// and the cursor's column within it. Hangul is two columns wide.
fn input_window(input: &str, cursor: usize, width: u16) -> (String, u16) {
    let width = width as usize;
    let widths: Vec<usize> = input.chars().map(|c| c.width().unwrap_or(0)).collect();
    let cursor = cursor.min(widths.len());

    // The cursor itself needs one free column.
    let mut offset = 0;
    let mut cursor_col: usize = widths[..cursor].iter().sum();
    while offset < cursor && cursor_col + 1 > width {
        cursor_col -= widths[offset];
        offset += 1;
    }

    let mut used = 0;
    let visible: String = input
        .chars()
        .zip(&widths)
        .skip(offset)
        .take_while(|(_, w)| {
            used += **w;
            used <= width
        })
        .map(|(c, _)| c)
        .collect();

    (visible, cursor_col.min(width.saturating_sub(1)) as u16)
}

fn render_footer<A: ChatApi + 'static>(app: &App<A>, frame: &mut Frame, area: Rect) {
    let hints = Line::from(vec![
        Span::styled(" Enter", Style::default().fg(Color::Yellow)),
        Span::raw(" 전송  "),
        Span::styled("Ctrl+L", Style::default().fg(Color::Yellow)),
        Span::raw(" 대화 지우기  "),
        Span::styled("F5", Style::default().fg(Color::Yellow)),
        Span::raw(" 연결 확인  "),
        Span::styled("PgUp/PgDn", Style::default().fg(Color::Yellow)),
        Span::raw(" 스크롤  "),
        Span::styled("Ctrl+Q", Style::default().fg(Color::Yellow)),
        Span::raw(" 종료"),
        Span::styled(
            format!("   메시지 {}", app.widget.history().len()),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    frame.render_widget(Paragraph::new(hints), area);
}

fn render_confirm(frame: &mut Frame, area: Rect) {
    let popup_width = 44.min(area.width.saturating_sub(4));
    let popup_height = 5;
    let popup_area = Rect::new(
        area.x + area.width.saturating_sub(popup_width) / 2,
        area.y + area.height.saturating_sub(popup_height) / 2,
        popup_width,
        popup_height.min(area.height),
    );

    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" 확인 ");

    let body = Paragraph::new(vec![
        Line::from(CLEAR_PROMPT),
        Line::default(),
        Line::from(Span::styled("y: 지우기   n/Esc: 취소", Style::default().fg(Color::DarkGray))),
    ])
    .block(block);

    frame.render_widget(body, popup_area);
}
