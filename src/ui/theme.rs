use ratatui::style::{Color, Modifier, Style};

/// Styles for every element the chat screen draws. One built-in dark
/// palette; error turns share the model rendering path but get their own
/// base text style.
#[derive(Debug, Clone)]
pub struct Theme {
    pub background_color: Color,

    // Chat message styles
    pub user_prefix_style: Style,
    pub user_text_style: Style,
    pub model_text_style: Style,
    pub error_text_style: Style,

    // Chrome
    pub title_style: Style,
    pub pending_style: Style,
    pub input_border_style: Style,
    pub input_title_style: Style,

    // Input area
    pub input_text_style: Style,
    pub input_cursor_style: Style,
}

impl Theme {
    pub fn dark_default() -> Self {
        Theme {
            background_color: Color::Black,
            user_prefix_style: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Cyan),
            model_text_style: Style::default().fg(Color::White),
            error_text_style: Style::default().fg(Color::Red),

            title_style: Style::default().fg(Color::Gray),
            pending_style: Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
            input_border_style: Style::default().fg(Color::Gray),
            input_title_style: Style::default().fg(Color::Gray),

            input_text_style: Style::default().fg(Color::White),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
        }
    }

    pub fn md_heading_style(&self, level: u8) -> Style {
        let base = self.model_text_style.add_modifier(Modifier::BOLD);
        match level {
            1 => base.fg(Color::Magenta),
            2 => base.fg(Color::Blue),
            _ => base,
        }
    }

    pub fn md_inline_code_style(&self) -> Style {
        Style::default().fg(Color::Yellow)
    }

    pub fn md_codeblock_style(&self) -> Style {
        Style::default().fg(Color::Green)
    }

    pub fn md_list_marker_style(&self) -> Style {
        self.model_text_style.add_modifier(Modifier::BOLD)
    }

    pub fn md_blockquote_style(&self) -> Style {
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC)
    }

    pub fn md_link_style(&self) -> Style {
        Style::default()
            .fg(Color::Blue)
            .add_modifier(Modifier::UNDERLINED)
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::dark_default()
    }
}
