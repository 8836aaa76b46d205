use std::borrow::Cow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

/// Sort and identity key of a record.
///
/// Numeric ids compare by value across all three numeric variants and sort
/// before any textual id. A missing or `null` id is treated as `0` so the
/// corpus order stays total.
#[derive(Debug, Clone)]
pub enum RecordId {
    Int(i64),
    /// Integers above `i64::MAX`.
    UInt(u64),
    /// Non-integral numbers, or integers outside both integer ranges.
    Float(f64),
    Text(String),
}

const TWO_POW_63: f64 = 9_223_372_036_854_775_808.0;
const TWO_POW_64: f64 = 18_446_744_073_709_551_616.0;

impl RecordId {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Self::Int(0),
            Some(Value::String(s)) => Self::Text(s.clone()),
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    match n.as_f64() {
                        Some(f) => Self::from_f64(f),
                        None => Self::Text(n.to_string()),
                    }
                }
            }
            Some(other) => Self::Text(other.to_string()),
        }
    }

    fn from_f64(f: f64) -> Self {
        if f.fract() == 0.0 && (-TWO_POW_63..TWO_POW_63).contains(&f) {
            Self::Int(f as i64)
        } else if f.fract() == 0.0 && (0.0..TWO_POW_64).contains(&f) {
            Self::UInt(f as u64)
        } else {
            Self::Float(f)
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Int(_) => 0,
            Self::UInt(_) => 1,
            Self::Float(_) => 2,
            Self::Text(_) => 3,
        }
    }
}

impl Ord for RecordId {
    fn cmp(&self, other: &Self) -> Ordering {
        use RecordId::*;
        let by_value = match (self, other) {
            (Text(a), Text(b)) => a.cmp(b),
            (Text(_), _) => Ordering::Greater,
            (_, Text(_)) => Ordering::Less,
            (Int(a), Int(b)) => a.cmp(b),
            (UInt(a), UInt(b)) => a.cmp(b),
            (Int(_), UInt(_)) => Ordering::Less,
            (UInt(_), Int(_)) => Ordering::Greater,
            (Float(a), Float(b)) => a.total_cmp(b),
            (Int(a), Float(b)) => (*a as f64).total_cmp(b),
            (Float(a), Int(b)) => a.total_cmp(&(*b as f64)),
            (UInt(a), Float(b)) => (*a as f64).total_cmp(b),
            (Float(a), UInt(b)) => a.total_cmp(&(*b as f64)),
        };
        by_value.then_with(|| self.rank().cmp(&other.rank()))
    }
}

impl PartialOrd for RecordId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RecordId {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RecordId {}

impl Hash for RecordId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Int(i) => i.hash(state),
            Self::UInt(u) => u.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Text(s) => s.hash(state),
        }
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::Int(0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::UInt(u) => write!(f, "{u}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// A recognized entity mention: the surface text and its type tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Span {
    pub text: String,
    /// Entity type, e.g. `PERSON` or `GPE`.
    pub value: String,
}

/// One annotated sentence of the `ner` field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NerSentence {
    pub sentence: String,
    #[serde(deserialize_with = "lenient_spans")]
    pub spans: Vec<Span>,
}

fn lenient_spans<'de, D>(deserializer: D) -> Result<Vec<Span>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    let Value::Array(items) = raw else {
        return Ok(Vec::new());
    };
    Ok(items
        .iter()
        .filter_map(|item| Span::deserialize(item).ok())
        .collect())
}

/// One corpus entry.
///
/// The original field map is kept verbatim (key order included) so exports
/// reproduce the input exactly; `id` and `ner` are decoded once up front.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: RecordId,
    fields: Map<String, Value>,
    ner: Vec<NerSentence>,
}

impl Record {
    pub fn from_map(fields: Map<String, Value>) -> Self {
        let id = RecordId::from_value(fields.get("id"));
        let ner = match fields.get("ner") {
            Some(Value::Array(sentences)) => sentences
                .iter()
                .filter_map(|s| NerSentence::deserialize(s).ok())
                .collect(),
            _ => Vec::new(),
        };
        Self { id, fields, ner }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Field rendered as plain text: strings verbatim, other values as JSON,
    /// missing or `null` as the empty string.
    pub fn text_of(&self, key: &str) -> Cow<'_, str> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Cow::Borrowed(""),
            Some(Value::String(s)) => Cow::Borrowed(s.as_str()),
            Some(other) => Cow::Owned(other.to_string()),
        }
    }

    pub fn source(&self) -> Cow<'_, str> {
        self.text_of("source")
    }

    pub fn ner(&self) -> &[NerSentence] {
        &self.ner
    }

    pub fn spans(&self) -> impl Iterator<Item = &Span> {
        self.ner.iter().flat_map(|s| s.spans.iter())
    }

    /// True when any span carries the given type tag.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.spans().any(|s| s.value == tag)
    }

    /// True when any span's text equals `text` exactly.
    pub fn has_entity(&self, text: &str) -> bool {
        self.spans().any(|s| s.text == text)
    }

    /// The record as one compact JSON line (no trailing newline).
    pub fn to_json_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::test_support::record;
    use serde_json::json;

    #[test]
    fn missing_and_null_ids_default_to_zero() {
        assert_eq!(record(json!({"title": "x"})).id(), &RecordId::Int(0));
        assert_eq!(record(json!({"id": null})).id(), &RecordId::Int(0));
    }

    #[test]
    fn integral_float_ids_compare_as_integers() {
        assert_eq!(record(json!({"id": 7.0})).id(), &RecordId::Int(7));
        assert_eq!(record(json!({"id": 7.5})).id(), &RecordId::Float(7.5));
        assert_eq!(
            record(json!({"id": 10_000_000_000_000_000_000u64})).id(),
            &RecordId::UInt(10_000_000_000_000_000_000)
        );
    }

    #[test]
    fn numeric_ids_order_by_value_across_variants() {
        let mut ids = vec![
            RecordId::Text("1".into()),
            RecordId::UInt(u64::MAX),
            RecordId::Float(-0.5),
            RecordId::Int(i64::MAX),
            RecordId::Float(2.5),
            RecordId::Int(2),
            RecordId::Float(1e30),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                RecordId::Float(-0.5),
                RecordId::Int(2),
                RecordId::Float(2.5),
                RecordId::Int(i64::MAX),
                RecordId::UInt(u64::MAX),
                RecordId::Float(1e30),
                RecordId::Text("1".into()),
            ]
        );
        assert_ne!(RecordId::Int(2), RecordId::Float(2.5));
        assert_eq!(RecordId::Float(2.5).to_string(), "2.5");
    }

    #[test]
    fn integer_ids_sort_before_text_ids() {
        let mut ids = vec![
            RecordId::Text("a".into()),
            RecordId::Int(10),
            RecordId::Int(2),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                RecordId::Int(2),
                RecordId::Int(10),
                RecordId::Text("a".into())
            ]
        );
    }

    #[test]
    fn ner_decoding_skips_malformed_entries() {
        let r = record(json!({
            "id": 1,
            "ner": [
                {"sentence": "Paris is big.", "spans": [
                    {"text": "Paris", "value": "GPE", "start": 0},
                    "not a span",
                    {"text": null}
                ]},
                42,
                {"spans": "nope"}
            ]
        }));
        assert_eq!(r.ner().len(), 2);
        assert_eq!(r.ner()[0].spans.len(), 1);
        assert_eq!(r.ner()[0].spans[0].text, "Paris");
        assert!(r.ner()[1].spans.is_empty());
        assert!(r.has_tag("GPE"));
        assert!(r.has_entity("Paris"));
        assert!(!r.has_entity("paris"));
    }

    #[test]
    fn text_of_stringifies_non_strings() {
        let r = record(json!({"id": 3, "source": 12, "title": null}));
        assert_eq!(r.source(), "12");
        assert_eq!(r.text_of("title"), "");
        assert_eq!(r.text_of("missing"), "");
    }

    #[test]
    fn json_line_preserves_field_order() {
        let r = record(json!({"title": "t", "id": 1, "extra": {"k": [1, 2]}}));
        assert_eq!(
            r.to_json_line().unwrap(),
            r#"{"title":"t","id":1,"extra":{"k":[1,2]}}"#
        );
    }
}
