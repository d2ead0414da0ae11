//! Reply formatting.
//!
//! Bot replies are turned into [`Segment`]s first: digit grouping and keyword
//! emphasis operate on raw text, and markup only appears when the segments are
//! rendered. HTML escaping therefore only ever touches text the backend sent.

use regex::Regex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Emphasis(String),
    LineBreak,
}

pub struct ReplyFormatter {
    keywords: Option<Regex>,
    digits: Regex,
}

impl ReplyFormatter {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Result<Self, regex::Error> {
        let mut words: Vec<&str> = keywords
            .iter()
            .map(|k| k.as_ref().trim())
            .filter(|k| !k.is_empty())
            .collect();
        // Longest first so overlapping terms emphasise the whole word.
        words.sort_by_key(|w| std::cmp::Reverse(w.chars().count()));

        let keywords = if words.is_empty() {
            None
        } else {
            let alternation: Vec<String> = words.iter().map(|w| regex::escape(w)).collect();
            Some(Regex::new(&format!("(?i)(?:{})", alternation.join("|")))?)
        };

        Ok(Self {
            keywords,
            digits: Regex::new("[0-9]+")?,
        })
    }

    /// Split a reply into renderable segments.
    pub fn segments(&self, text: &str) -> Vec<Segment> {
        let grouped = self.group_thousands(text);
        let mut segments = Vec::new();

        for (i, line) in grouped.split('\n').enumerate() {
            if i > 0 {
                segments.push(Segment::LineBreak);
            }
            self.push_emphasis(line, &mut segments);
        }

        segments
    }

    /// Format a bot reply as an HTML paragraph.
    pub fn format_reply(&self, text: &str) -> String {
        render_html(&self.segments(text))
    }

    fn push_emphasis(&self, line: &str, segments: &mut Vec<Segment>) {
        let Some(keywords) = &self.keywords else {
            if !line.is_empty() {
                segments.push(Segment::Text(line.to_string()));
            }
            return;
        };

        let mut last = 0;
        for m in keywords.find_iter(line) {
            if m.start() > last {
                segments.push(Segment::Text(line[last..m.start()].to_string()));
            }
            segments.push(Segment::Emphasis(m.as_str().to_string()));
            last = m.end();
        }
        if last < line.len() {
            segments.push(Segment::Text(line[last..].to_string()));
        }
    }

    /// Insert thousands separators into bare integers of four or more digits.
    fn group_thousands(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + text.len() / 3);
        let mut last = 0;

        for m in self.digits.find_iter(text) {
            let before = text[..m.start()].chars().next_back();
            let after = text[m.end()..].chars().next();
            let bare = !before.is_some_and(is_ascii_word) && !after.is_some_and(is_ascii_word);

            if m.as_str().len() >= 4 && bare {
                out.push_str(&text[last..m.start()]);
                out.push_str(&group_digits(m.as_str()));
                last = m.end();
            }
        }

        out.push_str(&text[last..]);
        out
    }
}

fn is_ascii_word(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// `"0012345"` -> `"12,345"`
fn group_digits(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    let trimmed = if trimmed.is_empty() { "0" } else { trimmed };

    let mut grouped = String::with_capacity(trimmed.len() + trimmed.len() / 3);
    for (i, c) in trimmed.chars().enumerate() {
        if i > 0 && (trimmed.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#039;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

pub fn render_html(segments: &[Segment]) -> String {
    let mut html = String::from("<p>");
    for segment in segments {
        match segment {
            Segment::Text(text) => html.push_str(&escape_html(text)),
            Segment::Emphasis(text) => {
                html.push_str("<strong>");
                html.push_str(&escape_html(text));
                html.push_str("</strong>");
            }
            Segment::LineBreak => html.push_str("<br>"),
        }
    }
    html.push_str("</p>");
    html
}
