use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::tui::format::FormattedLine;

/// Columns kept free on the right of the record pane.
const RECORD_MARGIN: u16 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Width handed to the record formatter.
    pub width: usize,
    /// Rows available for record lines.
    pub height: usize,
}

impl Viewport {
    pub fn for_area(area: Rect) -> Self {
        let [record, _, _] = split(area);
        Self {
            width: record.width.saturating_sub(RECORD_MARGIN).max(1) as usize,
            height: record.height as usize,
        }
    }
}

#[derive(Debug)]
pub struct ScreenData<'a> {
    /// Formatted lines of the current record; `None` when the active set is empty.
    pub lines: Option<&'a [FormattedLine]>,
    pub scroll: usize,
    pub query: &'a str,
    pub editing_query: bool,
    pub status: &'a str,
}

fn split(area: Rect) -> [Rect; 3] {
    Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(area)
}

pub fn draw(frame: &mut Frame, data: &ScreenData<'_>) {
    let [record_area, query_area, status_area] = split(frame.area());

    let record_lines: Vec<Line> = match data.lines {
        None => vec![Line::from(Span::styled(
            "No records found.",
            Style::default().fg(Color::White),
        ))],
        Some(lines) => lines
            .iter()
            .skip(data.scroll)
            .take(record_area.height as usize)
            .map(|l| {
                if l.emphasize {
                    Line::from(Span::styled(
                        l.text.clone(),
                        Style::default().fg(Color::Black).bg(Color::White),
                    ))
                } else {
                    Line::from(l.text.clone())
                }
            })
            .collect(),
    };
    frame.render_widget(Paragraph::new(record_lines), record_area);

    let query_style = Style::default().fg(Color::Yellow).bg(Color::Blue);
    let mut query_spans = vec![Span::styled(format!("Search: {}", data.query), query_style)];
    if data.editing_query {
        query_spans.push(Span::styled(
            "▌",
            query_style.add_modifier(Modifier::SLOW_BLINK),
        ));
    }
    frame.render_widget(
        Paragraph::new(Line::from(query_spans)).style(query_style),
        query_area,
    );

    let status_style = Style::default().fg(Color::Yellow).bg(Color::Blue);
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(data.status.to_string(), status_style)))
            .style(status_style),
        status_area,
    );
}
