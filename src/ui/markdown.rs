//! Markdown rendering for model and error turns.
//!
//! Walks pulldown-cmark events and produces styled ratatui lines. Fenced
//! and indented code blocks are buffered and emitted with the code-block
//! style; inline styling nests via a style stack. The renderer is total:
//! any input string produces some sequence of lines.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};

use crate::ui::theme::Theme;

enum ListKind {
    Unordered,
    Ordered(u64),
}

pub fn render_markdown(content: &str, base_style: Style, theme: &Theme) -> Vec<Line<'static>> {
    Renderer::new(base_style, theme).render(content)
}

struct Renderer<'a> {
    theme: &'a Theme,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    style_stack: Vec<Style>,
    list_stack: Vec<ListKind>,
    in_code_block: bool,
    code_lines: Vec<String>,
}

impl<'a> Renderer<'a> {
    fn new(base_style: Style, theme: &'a Theme) -> Self {
        Self {
            theme,
            lines: Vec::new(),
            current: Vec::new(),
            style_stack: vec![base_style],
            list_stack: Vec::new(),
            in_code_block: false,
            code_lines: Vec::new(),
        }
    }

    fn current_style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or_default()
    }

    fn push_style(&mut self, style: Style) {
        self.style_stack.push(style);
    }

    fn push_modifier(&mut self, modifier: Modifier) {
        let style = self.current_style().add_modifier(modifier);
        self.style_stack.push(style);
    }

    fn pop_style(&mut self) {
        // The base style at the bottom of the stack stays put.
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }

    fn flush_line(&mut self) {
        if !self.current.is_empty() {
            let spans = std::mem::take(&mut self.current);
            self.lines.push(Line::from(spans));
        }
    }

    fn push_blank(&mut self) {
        self.flush_line();
        self.lines.push(Line::from(""));
    }

    fn push_text(&mut self, text: &str, style: Style) {
        self.current.push(Span::styled(detab(text), style));
    }

    fn list_marker(&mut self) -> String {
        let indent = "  ".repeat(self.list_stack.len().saturating_sub(1));
        match self.list_stack.last_mut() {
            Some(ListKind::Ordered(next)) => {
                let marker = format!("{}{}. ", indent, next);
                *next += 1;
                marker
            }
            _ => format!("{}- ", indent),
        }
    }

    fn finish_code_block(&mut self) {
        let style = self.theme.md_codeblock_style();
        for code_line in self.code_lines.drain(..) {
            self.lines.push(Line::from(Span::styled(code_line, style)));
        }
        self.in_code_block = false;
        self.lines.push(Line::from(""));
    }

    fn render(mut self, content: &str) -> Vec<Line<'static>> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);

        for event in Parser::new_ext(content, options) {
            match event {
                Event::Start(tag) => match tag {
                    Tag::Paragraph => {}
                    Tag::Heading { level, .. } => {
                        self.flush_line();
                        self.push_style(self.theme.md_heading_style(level as u8));
                    }
                    Tag::BlockQuote(_) => {
                        self.flush_line();
                        self.push_style(self.theme.md_blockquote_style());
                    }
                    // The language hint is dropped: blocks render with one
                    // code style regardless of language.
                    Tag::CodeBlock(_) => {
                        self.flush_line();
                        self.in_code_block = true;
                        self.code_lines.clear();
                    }
                    Tag::List(start) => {
                        self.flush_line();
                        self.list_stack.push(match start {
                            Some(n) => ListKind::Ordered(n),
                            None => ListKind::Unordered,
                        });
                    }
                    Tag::Item => {
                        self.flush_line();
                        let marker = self.list_marker();
                        self.current
                            .push(Span::styled(marker, self.theme.md_list_marker_style()));
                    }
                    Tag::Emphasis => self.push_modifier(Modifier::ITALIC),
                    Tag::Strong => self.push_modifier(Modifier::BOLD),
                    Tag::Strikethrough => self.push_modifier(Modifier::DIM),
                    Tag::Link { .. } | Tag::Image { .. } => {
                        self.push_style(self.theme.md_link_style());
                    }
                    _ => {}
                },
                Event::End(tag_end) => match tag_end {
                    TagEnd::Paragraph => {
                        self.flush_line();
                        self.push_blank();
                    }
                    TagEnd::Heading(_) => {
                        self.flush_line();
                        self.push_blank();
                        self.pop_style();
                    }
                    TagEnd::BlockQuote(_) => {
                        self.flush_line();
                        self.pop_style();
                    }
                    TagEnd::CodeBlock => self.finish_code_block(),
                    TagEnd::List(_) => {
                        self.flush_line();
                        if self.list_stack.len() == 1 {
                            self.push_blank();
                        }
                        self.list_stack.pop();
                    }
                    TagEnd::Item => self.flush_line(),
                    TagEnd::Emphasis
                    | TagEnd::Strong
                    | TagEnd::Strikethrough
                    | TagEnd::Link
                    | TagEnd::Image => self.pop_style(),
                    _ => {}
                },
                Event::Text(text) => {
                    if self.in_code_block {
                        for code_line in text.lines() {
                            self.code_lines.push(detab(code_line));
                        }
                    } else {
                        let style = self.current_style();
                        self.push_text(&text, style);
                    }
                }
                Event::Code(code) => {
                    let style = self.theme.md_inline_code_style();
                    self.push_text(&code, style);
                }
                Event::SoftBreak | Event::HardBreak => self.flush_line(),
                Event::Rule => {
                    self.flush_line();
                    self.lines.push(Line::from(Span::styled(
                        "\u{2500}".repeat(40),
                        self.theme.title_style,
                    )));
                    self.push_blank();
                }
                Event::TaskListMarker(checked) => {
                    let marker = if checked { "[x] " } else { "[ ] " };
                    self.current
                        .push(Span::styled(marker, self.theme.md_list_marker_style()));
                }
                Event::Html(html) | Event::InlineHtml(html) => {
                    // Raw markup is shown literally, one line at a time.
                    let style = self.current_style();
                    for (i, html_line) in html.lines().enumerate() {
                        if i > 0 {
                            self.flush_line();
                        }
                        self.push_text(html_line, style);
                    }
                }
                _ => {}
            }
        }

        self.flush_line();
        while matches!(self.lines.last(), Some(line) if line_text(line).is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}

fn detab(text: &str) -> String {
    text.replace('\t', "    ")
}

fn line_text(line: &Line) -> String {
    line.spans
        .iter()
        .map(|span| span.content.as_ref())
        .collect()
}
