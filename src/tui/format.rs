//! Turns one record into display lines for the record pane.
//!
//! Pure and deterministic: the same record, width, terms and mark state always
//! yield the same lines, which the scroll clamp depends on.

use serde_json::Value;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::corpus::model::Record;

const INDENT: &str = "    ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedLine {
    pub text: String,
    /// Line contains one of the highlight terms (case-insensitive).
    pub emphasize: bool,
}

struct LineBuilder {
    terms: Vec<String>,
    lines: Vec<FormattedLine>,
}

impl LineBuilder {
    fn push(&mut self, text: String) {
        let emphasize = if self.terms.is_empty() {
            false
        } else {
            let lower = text.to_lowercase();
            self.terms.iter().any(|t| lower.contains(t.as_str()))
        };
        self.lines.push(FormattedLine { text, emphasize });
    }

    fn field(&mut self, name: &str, value: Option<&Value>) {
        match value {
            None | Some(Value::Null) => {}
            Some(Value::Array(items)) if items.first().is_some_and(Value::is_object) => {
                self.push(format!("{name}: ["));
                for item in items {
                    match item {
                        Value::Object(map) => {
                            for (k, v) in map {
                                self.push(format!("{INDENT}{k}: {}", plain(v)));
                            }
                        }
                        other => self.push(format!("{INDENT}{}", plain(other))),
                    }
                }
                self.push("]".to_string());
            }
            Some(Value::Array(items)) => {
                if !items.is_empty() {
                    let joined = items.iter().map(plain).collect::<Vec<_>>().join(", ");
                    self.push(format!("{name}: {joined}"));
                }
            }
            Some(other) => self.push(format!("{name}: {}", plain(other))),
        }
    }

    fn wrapped_block(&mut self, header: &str, text: &str, width: usize) {
        self.push(format!("{header}:"));
        for line in wrap(text, width.saturating_sub(INDENT.len()).max(1)) {
            self.push(format!("{INDENT}{line}"));
        }
    }
}

/// Format `record` for a pane `width` columns wide.
///
/// Field order is fixed: ID, Lang, Source, Title, Link, Published, Summary,
/// Text, NER. A marked record gets a `[M]` prefix on its ID line.
pub fn format_record(
    record: &Record,
    width: usize,
    highlight_terms: &[&str],
    is_marked: bool,
) -> Vec<FormattedLine> {
    let mut b = LineBuilder {
        terms: highlight_terms
            .iter()
            .filter(|t| !t.is_empty())
            .map(|t| t.to_lowercase())
            .collect(),
        lines: Vec::new(),
    };

    let marker = if is_marked { "[M] " } else { INDENT };
    b.push(format!("{marker}ID: {}", record.id()));
    b.field("Lang", record.get("lang"));
    b.field("Source", record.get("source"));
    b.field("Title", record.get("title"));
    b.field("Link", record.get("link"));
    b.field("Published", record.get("published"));

    match record.get("summary") {
        Some(Value::String(s)) if "Summary: ".width() + s.width() > width => {
            b.wrapped_block("Summary", s, width);
        }
        other => b.field("Summary", other),
    }

    match record.get("text") {
        None | Some(Value::Null) => {}
        Some(Value::String(s)) if s.trim().is_empty() => {}
        Some(Value::String(s)) => b.wrapped_block("Text", s, width),
        Some(other) => b.wrapped_block("Text", &other.to_string(), width),
    }

    if !record.ner().is_empty() {
        b.push("NER:".to_string());
        for sentence in record.ner() {
            b.push(format!(
                "{INDENT}Sentence: {}",
                truncate(&sentence.sentence, width.saturating_sub(12))
            ));
            for span in &sentence.spans {
                if !span.text.is_empty() && !span.value.is_empty() {
                    b.push(format!("{INDENT}{INDENT}Span: {} -> {}", span.text, span.value));
                }
            }
        }
    }

    b.lines
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Greedy word wrap to `width` display columns. Whitespace runs collapse to a
/// single space; words wider than a line are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0;

    for word in text.split_whitespace() {
        let word_width = word.width();
        if current_width > 0 && current_width + 1 + word_width <= width {
            current.push(' ');
            current.push_str(word);
            current_width += 1 + word_width;
            continue;
        }
        if current_width > 0 {
            lines.push(std::mem::take(&mut current));
            current_width = 0;
        }
        if word_width <= width {
            current.push_str(word);
            current_width = word_width;
            continue;
        }
        for ch in word.chars() {
            let w = ch.width().unwrap_or(0);
            if current_width + w > width && current_width > 0 {
                lines.push(std::mem::take(&mut current));
                current_width = 0;
            }
            current.push(ch);
            current_width += w;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Longest prefix of `text` that fits in `width` display columns.
pub fn truncate(text: &str, width: usize) -> &str {
    let mut used = 0;
    for (idx, ch) in text.char_indices() {
        let w = ch.width().unwrap_or(0);
        if used + w > width {
            return &text[..idx];
        }
        used += w;
    }
    text
}
