use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use review_core::ThemeConfig;

use crate::layout::DisplayRow;
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct TuiTheme {
    pub highlight: Color,
    pub status: Color,
    pub error: Color,
}

impl Default for TuiTheme {
    fn default() -> Self {
        Self {
            highlight: Color::White,
            status: Color::Cyan,
            error: Color::Red,
        }
    }
}

impl TuiTheme {
    pub fn from_config(theme: &ThemeConfig) -> Self {
        Self {
            highlight: parse_theme_color(&theme.highlight),
            status: parse_theme_color(&theme.status),
            error: parse_theme_color(&theme.error),
        }
    }

    fn match_style(&self) -> Style {
        Style::default()
            .fg(Color::Black)
            .bg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }
}

fn parse_theme_color(name: &str) -> Color {
    match name.to_ascii_lowercase().as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" | "grey" => Color::Gray,
        "darkgray" | "darkgrey" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightmagenta" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        _ => Color::White,
    }
}

/// Rows reserved below the text for status, prompt and message lines.
const CHROME_ROWS: u16 = 3;

fn row_line<'a>(row: &'a DisplayRow, marker: &'a str, theme: &TuiTheme) -> Line<'a> {
    let mut spans = Vec::with_capacity(row.segments.len() + 1);
    if row.continuation {
        spans.push(Span::styled(marker, Style::default().fg(Color::DarkGray)));
    }
    for segment in &row.segments {
        let style = if segment.emphasized {
            theme.match_style()
        } else {
            Style::default()
        };
        spans.push(Span::styled(segment.text.as_str(), style));
    }
    Line::from(spans)
}

/// Draws one frame: wrapped text, then status, prompt and message rows.
///
/// Terminals shorter than the chrome get the prompt alone so the pattern
/// stays editable.
pub fn draw(frame: &mut Frame, session: &mut Session, theme: &TuiTheme, marker: &str) {
    let area = frame.area();
    if area.width == 0 || area.height == 0 {
        return;
    }
    let width = area.width as usize;

    if area.height < CHROME_ROWS {
        draw_prompt(frame, session, Rect::new(area.x, area.y, area.width, 1));
        return;
    }

    let text_height = area.height - CHROME_ROWS;
    let marker_width = unicode_width::UnicodeWidthStr::width(marker);
    let layout = session.layout_frame(width, text_height as usize, marker_width);
    let lines: Vec<Line> = layout
        .rows
        .iter()
        .map(|row| row_line(row, marker, theme))
        .collect();
    frame.render_widget(
        Paragraph::new(lines),
        Rect::new(area.x, area.y, area.width, text_height),
    );

    let status_y = area.y + text_height;
    frame.render_widget(
        Paragraph::new(Span::styled(
            session.status_line(),
            Style::default()
                .fg(Color::Black)
                .bg(theme.status)
                .add_modifier(Modifier::BOLD),
        )),
        Rect::new(area.x, status_y, area.width, 1),
    );

    draw_prompt(frame, session, Rect::new(area.x, status_y + 1, area.width, 1));

    let message = if let Some(err) = session.last_error() {
        Span::styled(format!("error: {err}"), Style::default().fg(theme.error))
    } else if let Some(info) = session.info_line() {
        Span::styled(info.to_string(), Style::default().fg(Color::DarkGray))
    } else {
        Span::raw("")
    };
    frame.render_widget(
        Paragraph::new(message),
        Rect::new(area.x, status_y + 2, area.width, 1),
    );
}

fn draw_prompt(frame: &mut Frame, session: &Session, area: Rect) {
    let (prompt, column) = session.prompt_window(area.width as usize);
    frame.render_widget(Paragraph::new(prompt), area);
    let column = (column as u16).min(area.width.saturating_sub(1));
    frame.set_cursor_position((area.x + column, area.y));
}
