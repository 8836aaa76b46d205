use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::KeyEvent;
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::{Frame, Terminal};

use crate::config::Config;
use crate::corpus::Corpus;
use crate::corpus::model::{Record, RecordId};
use crate::export::{self, ExportKind, ExportSummary};
use crate::tui::filter;
use crate::tui::format::{FormattedLine, format_record};
use crate::tui::input::{self, Action, Direction, KeySource, TerminalKeys};
use crate::tui::popup;
use crate::tui::render::{self, ScreenData, Viewport};
use crate::tui::state::{BaseSet, ViewState};

const DEFAULT_VIEWPORT: Viewport = Viewport {
    width: 76,
    height: 22,
};

/// What the event loop should do after a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
    /// Run the entity picker, then hand its result to [`App::apply_entity_choice`].
    PickEntity,
}

#[derive(Debug)]
struct App {
    corpus: Corpus,
    config: Config,
    view: ViewState,
    viewport: Viewport,
    status_message: Option<String>,
}

impl App {
    fn new(corpus: Corpus, config: Config) -> Self {
        Self {
            corpus,
            config,
            view: ViewState::new(),
            viewport: DEFAULT_VIEWPORT,
            status_message: None,
        }
    }

    fn active(&self) -> Vec<&Record> {
        filter::active(&self.corpus, &self.view)
    }

    fn current_record(&self) -> Option<&Record> {
        let active = self.active();
        let idx = self.view.current_index(active.len())?;
        Some(active[idx])
    }

    fn current_lines(&self) -> Option<Vec<FormattedLine>> {
        let record = self.current_record()?;
        let terms: Vec<&str> = if self.view.query.is_empty() {
            Vec::new()
        } else {
            vec![self.view.query.as_str()]
        };
        Some(format_record(
            record,
            self.viewport.width,
            &terms,
            self.view.is_marked(record.id()),
        ))
    }

    fn draw(&mut self, frame: &mut Frame) {
        self.viewport = Viewport::for_area(frame.area());
        if let Some(lines) = self.current_lines() {
            self.view.clamp_scroll(lines.len(), self.viewport.height);
        }
        self.render(frame);
    }

    /// Draw without touching state; used underneath the entity picker.
    fn render(&self, frame: &mut Frame) {
        let lines = self.current_lines();
        let scroll = lines.as_ref().map_or(0, |l| {
            self.view
                .scroll()
                .min(l.len().saturating_sub(self.viewport.height))
        });
        let status = self.status_line();
        render::draw(
            frame,
            &ScreenData {
                lines: lines.as_deref(),
                scroll,
                query: &self.view.query,
                editing_query: self.view.editing_query,
                status: &status,
            },
        );
    }

    fn status_line(&self) -> String {
        let mut parts = Vec::new();
        if let Some(tag) = &self.view.tag_filter {
            parts.push(format!("NER Tag: {tag}"));
        }
        if let Some(entity) = &self.view.entity_filter {
            parts.push(format!("Entity: {entity}"));
        }
        match &self.view.base {
            BaseSet::Corpus => {}
            BaseSet::Search { query, .. } => parts.push(format!("Search: {query}")),
            BaseSet::Source(name) => parts.push(format!("Source: {}", source_label(name))),
        }
        if self.view.marked_only {
            parts.push("Showing Marked Only".to_string());
        }
        if self.view.filters_active() {
            parts.push(format!(
                "{} matches / {} total",
                self.active().len(),
                self.corpus.len()
            ));
        } else {
            parts.push(format!("{} records", self.corpus.len()));
        }
        parts.push(format!("Marked: {}", self.view.marked.len()));
        if let Some(message) = &self.status_message {
            parts.push(message.clone());
        }
        parts.push(self.hints().to_string());
        parts.join(" | ")
    }

    fn hints(&self) -> &'static str {
        if self.view.editing_query {
            "typing search: [Enter] search  [Backspace] delete  [Esc] clear all"
        } else {
            concat!(
                "↑↓: Sources | ←→: Navigate | PgUp/PgDn: Scroll | ",
                "f: NER Filter | e: Entities | ",
                "Space: Mark | m: Mark All | s: Show Marked | x: Export Shown | ",
                "r: Export Marked | /: Search | Esc: Clear | q: Quit"
            )
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Outcome {
        self.status_message = None;
        let action = input::action_for_key(key, self.view.editing_query);

        match action {
            Action::Quit => return Outcome::Quit,
            Action::Move(Direction::Left) => {
                let len = self.active().len();
                self.view.move_cursor(-1, len);
            }
            Action::Move(Direction::Right) => {
                let len = self.active().len();
                self.view.move_cursor(1, len);
            }
            Action::Move(Direction::Up) => self.cycle_source(-1),
            Action::Move(Direction::Down) => self.cycle_source(1),
            Action::PageUp => self.scroll_pages(-1),
            Action::PageDown => self.scroll_pages(1),
            Action::ToggleMark => self.toggle_current_mark(),
            Action::MarkAll => {
                let ids: Vec<RecordId> = self.active().iter().map(|r| r.id().clone()).collect();
                self.view.mark_all(&ids);
                self.status_message = Some(format!("Marked {} records", ids.len()));
            }
            Action::ToggleMarkedOnly => {
                self.view.toggle_marked_only();
                self.status_message = Some(
                    if self.view.marked_only {
                        "Showing only marked records"
                    } else {
                        "Showing all records"
                    }
                    .to_string(),
                );
            }
            Action::CycleTagFilter => {
                self.view.cycle_tag(&self.config.tags);
                tracing::debug!(tag = ?self.view.tag_filter, "tag filter changed");
            }
            Action::PickEntity => {
                if self.corpus.entities().is_empty() {
                    self.status_message = Some("No entities to pick from".to_string());
                } else {
                    return Outcome::PickEntity;
                }
            }
            Action::ExportShown => self.export(ExportKind::Shown),
            Action::ExportMarked => self.export(ExportKind::Marked),
            Action::StartQuery => self.view.editing_query = true,
            Action::SubmitQuery => self.commit_search(),
            Action::ClearFilters => self.view.clear_filters(),
            Action::Backspace => {
                self.view.query.pop();
                if self.view.query.is_empty() {
                    self.view.editing_query = false;
                }
            }
            Action::InputChar(c) => {
                self.view.editing_query = true;
                self.view.query.push(c);
            }
            Action::Noop => {}
        }
        Outcome::Continue
    }

    fn apply_entity_choice(&mut self, choice: Option<String>) {
        let Some(entity) = choice else {
            return;
        };
        tracing::debug!(entity = %entity, "entity filter set");
        self.status_message = Some(format!("Filtering by entity: {entity}"));
        self.view.set_entity_filter(Some(entity));
    }

    fn cycle_source(&mut self, delta: isize) {
        let anchor = self.current_record().map(|r| r.source().into_owned());
        if let Some(name) = self
            .view
            .cycle_source(delta, self.corpus.sources(), anchor.as_deref())
        {
            tracing::debug!(source = %name, "source selected");
        }
    }

    fn scroll_pages(&mut self, pages: isize) {
        let line_count = self.current_lines().map_or(0, |l| l.len());
        self.view
            .scroll_pages(pages, line_count, self.viewport.height);
    }

    fn toggle_current_mark(&mut self) {
        let Some(id) = self.current_record().map(|r| r.id().clone()) else {
            return;
        };
        let marked = self.view.toggle_mark(&id);
        self.status_message = Some(if marked {
            format!("Marked record {id}")
        } else {
            format!("Unmarked record {id}")
        });
    }

    fn commit_search(&mut self) {
        self.status_message = Some(match self.view.commit_search(&self.corpus) {
            Ok(Some(count)) => format!("{count} records match {:?}", self.view.query.trim()),
            Ok(None) => "Search cleared".to_string(),
            Err(e) => format!("Search failed: {e:#}"),
        });
    }

    fn export(&mut self, kind: ExportKind) {
        let result: Result<Option<ExportSummary>> = {
            let records: Vec<&Record> = match kind {
                ExportKind::Shown => self.active(),
                ExportKind::Marked => self
                    .corpus
                    .records()
                    .iter()
                    .filter(|r| self.view.is_marked(r.id()))
                    .collect(),
            };
            if records.is_empty() {
                Ok(None)
            } else {
                export::export_records(&self.config.export_dir, kind, &records).map(Some)
            }
        };
        self.status_message = Some(match result {
            Ok(Some(summary)) => summary.message(),
            Ok(None) => match kind {
                ExportKind::Shown => "No records to export".to_string(),
                ExportKind::Marked => "No marked records to export".to_string(),
            },
            Err(e) => {
                tracing::error!(error = %format!("{e:#}"), "export failed");
                format!("Export failed: {e:#}")
            }
        });
    }
}

fn source_label(name: &str) -> &str {
    if name.is_empty() { "(none)" } else { name }
}

pub fn run(corpus: Corpus, config: Config) -> Result<()> {
    let mut app = App::new(corpus, config);
    let mut keys = TerminalKeys {
        poll_interval: Duration::from_millis(app.config.poll_interval_ms),
    };

    let mut stdout = io::stdout();
    enable_raw_mode()?;
    execute!(stdout, EnterAlternateScreen)?;
    let _guard = TerminalGuard;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    loop {
        terminal.draw(|f| app.draw(f))?;
        let Some(key) = keys.next_key()? else {
            continue;
        };
        match app.handle_key(key) {
            Outcome::Continue => {}
            Outcome::Quit => break,
            Outcome::PickEntity => {
                let size = terminal.size()?;
                let area = Rect::new(0, 0, size.width, size.height);
                let entities = app.corpus.entities();
                let page = popup::page_height(area, entities.len());
                let choice = popup::pick(entities, page, &mut keys, |picker| {
                    terminal.draw(|f| {
                        app.render(f);
                        popup::draw(f, picker);
                    })?;
                    Ok(())
                })?;
                app.apply_entity_choice(choice);
            }
        }
    }

    tracing::info!(marked = app.view.marked.len(), "viewer closed");
    Ok(())
}

struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let mut stdout = io::stdout();
        let _ = execute!(stdout, LeaveAlternateScreen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::test_support::corpus;
    use crate::tui::input::test_support::key;
    use crossterm::event::KeyCode;
    use ratatui::backend::TestBackend;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn app(values: Vec<Value>) -> App {
        App::new(corpus(values), Config::default())
    }

    fn press(app: &mut App, codes: impl IntoIterator<Item = KeyCode>) -> Outcome {
        let mut last = Outcome::Continue;
        for code in codes {
            last = app.handle_key(key(code));
        }
        last
    }

    fn typed(text: &str) -> Vec<KeyCode> {
        text.chars().map(KeyCode::Char).collect()
    }

    fn current_id(app: &App) -> Option<RecordId> {
        app.current_record().map(|r| r.id().clone())
    }

    fn three_sources() -> App {
        app(vec![
            json!({"id": 5, "source": "A", "title": "five"}),
            json!({"id": 2, "source": "B", "title": "two"}),
            json!({"id": 9, "source": "A", "title": "nine", "ner": [
                {"sentence": "Lagarde spoke.", "spans": [{"text": "Lagarde", "value": "PERSON"}]}
            ]}),
        ])
    }

    #[test]
    fn down_from_source_b_lands_on_first_record_of_a() {
        let mut app = app(vec![
            json!({"id": 5, "source": "A"}),
            json!({"id": 2, "source": "B"}),
            json!({"id": 9, "source": "A"}),
        ]);
        assert_eq!(current_id(&app), Some(RecordId::Int(2)));
        press(&mut app, [KeyCode::Down]);
        assert_eq!(app.view.base, BaseSet::Source("A".into()));
        assert_eq!(current_id(&app), Some(RecordId::Int(5)));
        assert_eq!(app.active().len(), 2);
    }

    #[test]
    fn tag_filter_without_matches_reports_zero() {
        let mut app = app(vec![
            json!({"id": 5, "source": "A"}),
            json!({"id": 2, "source": "B"}),
            json!({"id": 9, "source": "A"}),
        ]);
        press(&mut app, [KeyCode::Char('f')]);
        assert_eq!(app.view.tag_filter.as_deref(), Some("PERSON"));
        assert!(app.active().is_empty());
        assert!(app.status_line().contains("0 matches / 3 total"));
        assert_eq!(app.current_lines(), None);
        press(&mut app, [KeyCode::Right, KeyCode::Left, KeyCode::Char(' ')]);
        assert!(app.view.marked.is_empty());
    }

    #[test]
    fn right_wraps_around_active_set() {
        let mut app = three_sources();
        let start = current_id(&app);
        press(&mut app, [KeyCode::Right, KeyCode::Right, KeyCode::Right]);
        assert_eq!(current_id(&app), start);
        press(&mut app, [KeyCode::Left]);
        assert_eq!(current_id(&app), Some(RecordId::Int(9)));
    }

    #[test]
    fn typed_query_captures_command_letters_and_commits() {
        let mut app = three_sources();
        let outcome = press(&mut app, typed("nine"));
        assert_eq!(outcome, Outcome::Continue);
        assert!(app.view.editing_query);
        press(&mut app, typed(" q"));
        assert_eq!(app.view.query, "nine q");
        for _ in 0..2 {
            press(&mut app, [KeyCode::Backspace]);
        }
        press(&mut app, [KeyCode::Enter]);
        assert!(!app.view.editing_query);
        assert_eq!(app.active().len(), 1);
        assert_eq!(current_id(&app), Some(RecordId::Int(9)));
        assert_eq!(press(&mut app, [KeyCode::Char('q')]), Outcome::Quit);
    }

    #[test]
    fn zero_result_search_shows_empty_active_set() {
        let mut app = three_sources();
        press(&mut app, typed("/zzz"));
        assert_eq!(app.view.query, "zzz");
        press(&mut app, [KeyCode::Enter]);
        assert!(app.active().is_empty());
        assert!(app.view.filters_active());
        assert!(app.status_line().contains("0 matches / 3 total"));
    }

    #[test]
    fn escape_restores_full_corpus_but_keeps_marks() {
        let mut app = three_sources();
        press(&mut app, [KeyCode::Char(' ')]);
        press(&mut app, [KeyCode::Char('f'), KeyCode::Char('s'), KeyCode::Down]);
        press(&mut app, typed("abc"));
        press(&mut app, [KeyCode::Esc]);
        assert_eq!(app.active().len(), 3);
        assert!(!app.view.filters_active());
        assert!(app.view.query.is_empty());
        assert!(app.status_line().starts_with("3 records | Marked: 1"));
        assert!(app.view.is_marked(&RecordId::Int(2)));
    }

    #[test]
    fn marking_twice_restores_state_and_mark_all_marks_active() {
        let mut app = three_sources();
        press(&mut app, [KeyCode::Char(' ')]);
        assert!(app.view.is_marked(&RecordId::Int(2)));
        press(&mut app, [KeyCode::Char(' ')]);
        assert!(!app.view.is_marked(&RecordId::Int(2)));

        press(&mut app, [KeyCode::Down]);
        press(&mut app, [KeyCode::Char('m')]);
        assert_eq!(app.view.marked.len(), 2);
        assert_eq!(app.status_message.as_deref(), Some("Marked 2 records"));

        press(&mut app, [KeyCode::Esc, KeyCode::Char('s')]);
        let ids: Vec<_> = app.active().iter().map(|r| r.id().clone()).collect();
        assert_eq!(ids, vec![RecordId::Int(5), RecordId::Int(9)]);
    }

    #[test]
    fn entity_picker_request_and_result() {
        let mut app = three_sources();
        assert_eq!(press(&mut app, [KeyCode::Char('e')]), Outcome::PickEntity);
        app.apply_entity_choice(Some("Lagarde".into()));
        assert_eq!(app.view.entity_filter.as_deref(), Some("Lagarde"));
        assert_eq!(current_id(&app), Some(RecordId::Int(9)));

        app.apply_entity_choice(None);
        assert_eq!(app.view.entity_filter.as_deref(), Some("Lagarde"));
    }

    #[test]
    fn entity_picker_is_skipped_without_entities() {
        let mut app = app(vec![json!({"id": 1})]);
        assert_eq!(press(&mut app, [KeyCode::Char('e')]), Outcome::Continue);
        assert_eq!(
            app.status_message.as_deref(),
            Some("No entities to pick from")
        );
    }

    #[test]
    fn page_keys_scroll_current_record() {
        let mut app = app(vec![json!({
            "id": 1,
            "text": (0..40).map(|i| format!("word{i}")).collect::<Vec<_>>().join(" ")
        })]);
        app.viewport = Viewport { width: 14, height: 5 };
        let total = app.current_lines().unwrap().len();
        assert!(total > 10);
        press(&mut app, [KeyCode::PageDown]);
        assert_eq!(app.view.scroll(), 5);
        for _ in 0..20 {
            press(&mut app, [KeyCode::PageDown]);
        }
        assert_eq!(app.view.scroll(), total - 5);
        press(&mut app, [KeyCode::PageUp]);
        assert_eq!(app.view.scroll(), total - 10);
        assert_eq!(current_id(&app), Some(RecordId::Int(1)));
    }

    #[test]
    fn exports_marked_and_shown_sets() {
        let dir = TempDir::new().unwrap();
        let mut app = three_sources();
        app.config.export_dir = dir.path().to_path_buf();

        press(&mut app, [KeyCode::Char('r')]);
        assert_eq!(
            app.status_message.as_deref(),
            Some("No marked records to export")
        );

        press(&mut app, [KeyCode::Char(' '), KeyCode::Char('r')]);
        let marked_path = dir.path().join("exported_marked_1_records.jsonl");
        assert_eq!(
            std::fs::read_to_string(&marked_path).unwrap(),
            "{\"id\":2,\"source\":\"B\",\"title\":\"two\"}\n"
        );

        press(&mut app, [KeyCode::Char('x')]);
        let shown =
            std::fs::read_to_string(dir.path().join("exported_shown_3_records.jsonl")).unwrap();
        assert_eq!(shown.lines().count(), 3);
    }

    #[test]
    fn export_failure_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let mut app = three_sources();
        app.config.export_dir = dir.path().join("missing");
        assert_eq!(press(&mut app, [KeyCode::Char('x')]), Outcome::Continue);
        assert!(
            app.status_message
                .as_deref()
                .unwrap_or_default()
                .starts_with("Export failed")
        );
    }

    #[test]
    fn empty_corpus_navigation_is_inert() {
        let mut app = app(Vec::new());
        let outcome = press(
            &mut app,
            [
                KeyCode::Left,
                KeyCode::Right,
                KeyCode::Up,
                KeyCode::Down,
                KeyCode::PageDown,
                KeyCode::Char(' '),
                KeyCode::Char('m'),
                KeyCode::Char('x'),
                KeyCode::Char('e'),
            ],
        );
        assert_eq!(outcome, Outcome::Continue);
        assert_eq!(app.view.base, BaseSet::Corpus);
        assert!(app.status_line().starts_with("0 records | "));

        let mut terminal = Terminal::new(TestBackend::new(60, 6)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        let first_row: String = (0..60u16)
            .map(|x| terminal.backend().buffer()[(x, 0u16)].symbol().to_string())
            .collect();
        assert!(first_row.starts_with("No records found."));
    }
}
