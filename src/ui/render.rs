//! Display-line assembly for the conversation log.
//!
//! User turns are always rendered as literal text behind a speaker prefix;
//! model and error turns go through the markdown renderer (error turns with
//! their own base style). The pending indicator is a display-only line, not
//! part of the conversation history.

use ratatui::text::{Line, Span};

use crate::core::message::{Message, Sender};
use crate::ui::markdown::render_markdown;
use crate::ui::theme::Theme;

pub const USER_PREFIX: &str = "You: ";
pub const PENDING_INDICATOR: &str = "Thinking\u{2026}";

/// Rows the conversation area always keeps when the input grows.
const MIN_CHAT_ROWS: u16 = 5;

pub fn build_display_lines(
    messages: &[Message],
    pending: bool,
    markdown: bool,
    theme: &Theme,
) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for msg in messages {
        match msg.sender {
            Sender::User => push_user_lines(&mut lines, &msg.content, theme),
            Sender::Model | Sender::Error => {
                push_reply_lines(&mut lines, &msg.content, msg.sender, markdown, theme)
            }
        }
        lines.push(Line::from(""));
    }

    if pending {
        lines.push(Line::from(Span::styled(
            PENDING_INDICATOR,
            theme.pending_style,
        )));
        lines.push(Line::from(""));
    }

    lines
}

/// Literal rendering: the content is never interpreted as markup, so
/// user-authored `**stars**` or `<tags>` show up exactly as typed.
fn push_user_lines(lines: &mut Vec<Line<'static>>, content: &str, theme: &Theme) {
    let continuation = " ".repeat(USER_PREFIX.len());
    for (i, text) in content.lines().enumerate() {
        let lead = if i == 0 {
            Span::styled(USER_PREFIX.to_string(), theme.user_prefix_style)
        } else {
            Span::raw(continuation.clone())
        };
        lines.push(Line::from(vec![
            lead,
            Span::styled(text.to_string(), theme.user_text_style),
        ]));
    }
    if content.is_empty() {
        lines.push(Line::from(Span::styled(
            USER_PREFIX.to_string(),
            theme.user_prefix_style,
        )));
    }
}

fn push_reply_lines(
    lines: &mut Vec<Line<'static>>,
    content: &str,
    sender: Sender,
    markdown: bool,
    theme: &Theme,
) {
    let base_style = match sender {
        Sender::Error => theme.error_text_style,
        _ => theme.model_text_style,
    };

    if markdown {
        lines.extend(render_markdown(content, base_style, theme));
    } else {
        for text in content.lines() {
            lines.push(Line::from(Span::styled(text.to_string(), base_style)));
        }
    }
}

pub fn max_scroll_offset(total_lines: u16, viewport_height: u16) -> u16 {
    total_lines.saturating_sub(viewport_height)
}

/// Grow-to-fit input height: two border rows plus one row per content line,
/// bounded only by the space the frame can give up without losing the chat
/// area entirely.
pub fn input_area_height(content_lines: u16, frame_height: u16) -> u16 {
    let max_content = frame_height
        .saturating_sub(MIN_CHAT_ROWS + 2)
        .max(1);
    content_lines.clamp(1, max_content) + 2
}
