//! Modal entity picker.
//!
//! [`pick`] runs its own blocking key loop and returns one choice, so the
//! controller calls it like any other function and resumes where it left off.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::Frame;
use ratatui::layout::{Constraint, Flex, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Paragraph};

use crate::tui::input::KeySource;

const POPUP_MAX_WIDTH: u16 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickerEvent {
    Pending,
    Selected(String),
    Cancelled,
}

#[derive(Debug, Clone)]
pub struct EntityPicker<'a> {
    entities: &'a [String],
    query: String,
    /// Indices into `entities` shown for the current query.
    filtered: Vec<usize>,
    /// Selected row within `filtered`.
    selected: usize,
    /// First visible row within `filtered`.
    scroll: usize,
    page: usize,
}

impl<'a> EntityPicker<'a> {
    pub fn new(entities: &'a [String], page: usize) -> Self {
        let mut picker = Self {
            entities,
            query: String::new(),
            filtered: Vec::new(),
            selected: 0,
            scroll: 0,
            page: page.max(1),
        };
        picker.refilter();
        picker
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    #[cfg(test)]
    pub fn candidates(&self) -> Vec<&'a str> {
        self.filtered
            .iter()
            .map(|&i| self.entities[i].as_str())
            .collect()
    }

    pub fn selected(&self) -> Option<&'a str> {
        self.filtered
            .get(self.selected)
            .map(|&i| self.entities[i].as_str())
    }

    #[cfg(test)]
    pub fn scroll(&self) -> usize {
        self.scroll
    }

    /// True when the query matched nothing and the full list is shown instead.
    pub fn is_fallback(&self) -> bool {
        !self.query.is_empty() && self.filtered.len() == self.entities.len() && {
            let q = self.query.to_lowercase();
            !self.entities.iter().any(|e| e.to_lowercase().contains(&q))
        }
    }

    /// Rows currently on screen, each with its selected flag.
    pub fn visible(&self) -> Vec<(bool, &'a str)> {
        self.filtered
            .iter()
            .enumerate()
            .skip(self.scroll)
            .take(self.page)
            .map(|(row, &i)| (row == self.selected, self.entities[i].as_str()))
            .collect()
    }

    fn refilter(&mut self) {
        let q = self.query.to_lowercase();
        self.filtered = if q.is_empty() {
            (0..self.entities.len()).collect()
        } else {
            self.entities
                .iter()
                .enumerate()
                .filter(|(_, e)| e.to_lowercase().contains(&q))
                .map(|(i, _)| i)
                .collect()
        };
        if self.filtered.is_empty() {
            self.filtered = (0..self.entities.len()).collect();
        }
        self.selected = 0;
        self.scroll = 0;
    }

    fn last(&self) -> usize {
        self.filtered.len().saturating_sub(1)
    }

    fn keep_selection_visible(&mut self) {
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + self.page {
            self.scroll = self.selected + 1 - self.page;
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> PickerEvent {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return match key.code {
                KeyCode::Char('c') => PickerEvent::Cancelled,
                _ => PickerEvent::Pending,
            };
        }
        match key.code {
            KeyCode::Esc => return PickerEvent::Cancelled,
            KeyCode::Enter => {
                return match self.selected() {
                    Some(choice) => PickerEvent::Selected(choice.to_string()),
                    None => PickerEvent::Cancelled,
                };
            }
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.selected = (self.selected + 1).min(self.last()),
            KeyCode::PageUp => {
                self.selected = self.selected.saturating_sub(self.page);
                self.scroll = self.scroll.saturating_sub(self.page);
            }
            KeyCode::PageDown => {
                self.selected = (self.selected + self.page).min(self.last());
                let max_scroll = self.filtered.len().saturating_sub(self.page);
                self.scroll = (self.scroll + self.page).min(max_scroll);
            }
            KeyCode::Home => self.selected = 0,
            KeyCode::End => self.selected = self.last(),
            KeyCode::Backspace => {
                if self.query.pop().is_some() {
                    self.refilter();
                }
            }
            KeyCode::Char(c) => {
                self.query.push(c);
                self.refilter();
            }
            _ => {}
        }
        self.keep_selection_visible();
        PickerEvent::Pending
    }
}

/// Run the picker until the user chooses or cancels.
///
/// Returns `None` straight away, without reading a key, when there is nothing
/// to pick from. `redraw` is called before every key read.
pub fn pick<K: KeySource>(
    entities: &[String],
    page: usize,
    keys: &mut K,
    mut redraw: impl FnMut(&EntityPicker<'_>) -> Result<()>,
) -> Result<Option<String>> {
    if entities.is_empty() {
        return Ok(None);
    }
    let mut picker = EntityPicker::new(entities, page);
    loop {
        redraw(&picker)?;
        let Some(key) = keys.next_key()? else {
            continue;
        };
        match picker.handle_key(key) {
            PickerEvent::Pending => {}
            PickerEvent::Selected(choice) => return Ok(Some(choice)),
            PickerEvent::Cancelled => return Ok(None),
        }
    }
}

/// Screen area of the popup for a list of `count` entities.
pub fn popup_area(area: Rect, count: usize) -> Rect {
    let max_height = area.height.saturating_sub(4).max(3);
    let height = (count.min(u16::MAX as usize) as u16)
        .saturating_add(2)
        .min(max_height);
    let width = POPUP_MAX_WIDTH.min(area.width.saturating_sub(4)).max(10);
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::horizontal([Constraint::Length(width)])
        .flex(Flex::Center)
        .areas(row);
    popup
}

/// Number of list rows that fit inside the popup's border.
pub fn page_height(area: Rect, count: usize) -> usize {
    popup_area(area, count).height.saturating_sub(2).max(1) as usize
}

pub fn draw(frame: &mut Frame, picker: &EntityPicker<'_>) {
    let area = popup_area(frame.area(), picker.entities.len());
    frame.render_widget(Clear, area);

    let row_width = area.width.saturating_sub(4) as usize;
    let lines: Vec<Line> = picker
        .visible()
        .into_iter()
        .map(|(selected, text)| {
            let style = if selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            Line::from(Span::styled(format!(" {text:<row_width$}"), style))
        })
        .collect();

    let mut block = Block::default()
        .title(Line::from(Span::styled(
            " Select Entity Text ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .style(Style::default().fg(Color::Black).bg(Color::White));
    if !picker.query().is_empty() {
        let suffix = if picker.is_fallback() { " (no match)" } else { "" };
        block = block.title_bottom(Line::from(Span::styled(
            format!(" Search: {}{} ", picker.query(), suffix),
            Style::default().fg(Color::Yellow).bg(Color::Blue),
        )));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::input::test_support::{ScriptedKeys, key};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;

    fn entities(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    fn type_str(picker: &mut EntityPicker<'_>, text: &str) {
        for c in text.chars() {
            assert_eq!(picker.handle_key(key(KeyCode::Char(c))), PickerEvent::Pending);
        }
    }

    #[test]
    fn typing_narrows_and_backspace_restores() {
        let list = entities(&["Chad", "China", "France"]);
        let mut picker = EntityPicker::new(&list, 10);
        type_str(&mut picker, "c");
        let after_c = picker.candidates();
        assert_eq!(after_c, vec!["Chad", "China", "France"]);

        type_str(&mut picker, "h");
        assert_eq!(picker.candidates(), vec!["Chad", "China"]);

        picker.handle_key(key(KeyCode::Backspace));
        assert_eq!(picker.candidates(), after_c);
    }

    #[test]
    fn unmatched_query_falls_back_to_full_list() {
        let list = entities(&["Chad", "China"]);
        let mut picker = EntityPicker::new(&list, 10);
        type_str(&mut picker, "zz");
        assert_eq!(picker.candidates(), vec!["Chad", "China"]);
        assert!(picker.is_fallback());
        assert_eq!(
            picker.handle_key(key(KeyCode::Enter)),
            PickerEvent::Selected("Chad".into())
        );
    }

    #[test]
    fn query_edits_reset_selection_to_top() {
        let list = entities(&["a1", "a2", "a3", "b1"]);
        let mut picker = EntityPicker::new(&list, 2);
        picker.handle_key(key(KeyCode::Down));
        picker.handle_key(key(KeyCode::Down));
        assert_eq!(picker.selected(), Some("a3"));
        assert_eq!(picker.scroll(), 1);
        type_str(&mut picker, "a");
        assert_eq!(picker.selected(), Some("a1"));
        assert_eq!(picker.scroll(), 0);
    }

    #[test]
    fn arrows_scroll_at_viewport_edges() {
        let list = entities(&["a", "b", "c", "d", "e"]);
        let mut picker = EntityPicker::new(&list, 2);
        for _ in 0..10 {
            picker.handle_key(key(KeyCode::Down));
        }
        assert_eq!(picker.selected(), Some("e"));
        assert_eq!(picker.visible(), vec![(false, "d"), (true, "e")]);
        picker.handle_key(key(KeyCode::Up));
        picker.handle_key(key(KeyCode::Up));
        assert_eq!(picker.visible(), vec![(true, "c"), (false, "d")]);
    }

    #[test]
    fn page_keys_move_a_full_page() {
        let list = entities(&["a", "b", "c", "d", "e", "f", "g"]);
        let mut picker = EntityPicker::new(&list, 3);
        picker.handle_key(key(KeyCode::PageDown));
        assert_eq!(picker.selected(), Some("d"));
        assert_eq!(picker.scroll(), 3);
        picker.handle_key(key(KeyCode::PageDown));
        assert_eq!(picker.selected(), Some("g"));
        assert_eq!(picker.scroll(), 4);
        picker.handle_key(key(KeyCode::PageUp));
        assert_eq!(picker.selected(), Some("d"));
        assert_eq!(picker.scroll(), 1);
        picker.handle_key(key(KeyCode::Home));
        assert_eq!(picker.selected(), Some("a"));
        assert_eq!(picker.scroll(), 0);
    }

    #[test]
    fn q_is_query_text_and_escape_cancels() {
        let list = entities(&["Iraq", "Qatar", "Peru"]);
        let mut keys = ScriptedKeys::new(
            ScriptedKeys::typed("q")
                .into_iter()
                .chain([KeyCode::Esc]),
        );
        let mut seen = Vec::new();
        let choice = pick(&list, 5, &mut keys, |p| {
            seen.push(p.candidates().len());
            Ok(())
        })
        .unwrap();
        assert_eq!(choice, None);
        assert_eq!(seen, vec![3, 2]);
    }

    #[test]
    fn pick_returns_selected_entity() {
        let list = entities(&["Chad", "China", "France"]);
        let mut keys = ScriptedKeys::new(
            ScriptedKeys::typed("ch")
                .into_iter()
                .chain([KeyCode::Down, KeyCode::Enter]),
        );
        let choice = pick(&list, 5, &mut keys, |_| Ok(())).unwrap();
        assert_eq!(choice.as_deref(), Some("China"));
    }

    #[test]
    fn pick_on_empty_index_reads_no_keys() {
        let mut keys = ScriptedKeys::new([KeyCode::Enter]);
        let choice = pick(&[], 5, &mut keys, |_| Ok(())).unwrap();
        assert_eq!(choice, None);
        assert_eq!(keys.reads, 0);
    }

    #[test]
    fn popup_renders_title_and_selection() {
        let list = entities(&["Chad", "China"]);
        let picker = EntityPicker::new(&list, 5);
        let mut terminal = Terminal::new(TestBackend::new(40, 12)).unwrap();
        terminal.draw(|f| draw(f, &picker)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains("Select Entity Text"));
        assert!(text.contains("Chad"));
        assert!(text.contains("China"));
    }

    #[test]
    fn page_height_fits_inside_border() {
        let area = Rect::new(0, 0, 80, 24);
        assert_eq!(page_height(area, 3), 3);
        assert_eq!(page_height(area, 500), 18);
    }
}
