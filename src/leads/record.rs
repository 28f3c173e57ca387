//! Lead records: schema-less, column-ordered rows plus typed accessors for the
//! fields the pipeline gives meaning to.

use std::fmt;

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

pub const NAME: &str = "name";
pub const INDUSTRY: &str = "industry";
pub const SCORE: &str = "score";
pub const PRIORITY: &str = "priority";

/// Cell spellings treated as missing values.
const NULL_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// A single cell value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
}

/// Storage type shared by every cell of one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ColumnKind {
    Integer,
    Float,
    Text,
}

impl ColumnKind {
    /// The narrowest kind every non-null cell fits, like a dataframe reader
    /// picking a column dtype. A column with no non-null cells is text.
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a str>) -> Self {
        let mut kind = None;
        for cell in cells {
            let trimmed = cell.trim();
            if is_null(trimmed) {
                continue;
            }
            let cell_kind = if trimmed.parse::<i64>().is_ok() {
                Self::Integer
            } else if trimmed.parse::<f64>().is_ok_and(f64::is_finite) {
                Self::Float
            } else {
                return Self::Text;
            };
            kind = kind.max(Some(cell_kind));
        }
        kind.unwrap_or(Self::Text)
    }
}

fn is_null(trimmed: &str) -> bool {
    trimmed.is_empty() || NULL_MARKERS.contains(&trimmed)
}

impl FieldValue {
    /// Read a raw CSV cell as a value of its column's kind.
    ///
    /// Null cells normalize to empty text; nothing downstream ever sees a null.
    pub fn from_cell(raw: &str, kind: ColumnKind) -> Self {
        let trimmed = raw.trim();
        if is_null(trimmed) {
            return Self::Text(String::new());
        }
        match kind {
            ColumnKind::Integer => trimmed
                .parse()
                .map_or_else(|_| Self::Text(raw.to_string()), Self::Integer),
            ColumnKind::Float => trimmed
                .parse()
                .map_or_else(|_| Self::Text(raw.to_string()), Self::Float),
            ColumnKind::Text => Self::Text(raw.to_string()),
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl Default for FieldValue {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

/// Priority tier derived from a lead's score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    /// Score outside every band (zero, negative, or above 100).
    Unscored,
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unscored => "Unscored",
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Unscored" => Some(Self::Unscored),
            "Low" => Some(Self::Low),
            "Medium" => Some(Self::Medium),
            "High" => Some(Self::High),
            _ => None,
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One prospective customer: an ordered mapping of column name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Lead {
    fields: Vec<(String, FieldValue)>,
}

impl Lead {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Set a field, keeping its position if it already exists, appending otherwise.
    pub fn set(&mut self, column: &str, value: impl Into<FieldValue>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| name == column) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((column.to_string(), value)),
        }
    }

    pub fn with(mut self, column: &str, value: impl Into<FieldValue>) -> Self {
        self.set(column, value);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The display name, if the lead carries a `name` column.
    pub fn name(&self) -> Option<String> {
        self.get(NAME).map(ToString::to_string)
    }

    /// The `industry` field coerced to text; empty when absent.
    pub fn industry_text(&self) -> String {
        self.get(INDUSTRY).map(ToString::to_string).unwrap_or_default()
    }

    pub fn score(&self) -> Option<i64> {
        self.get(SCORE).and_then(FieldValue::as_integer)
    }

    pub fn priority(&self) -> Option<Priority> {
        match self.get(PRIORITY) {
            Some(FieldValue::Text(s)) => Priority::parse(s),
            _ => None,
        }
    }
}

impl Serialize for Lead {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (name, value) in &self.fields {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Ordered leads sharing one column set. Row order is input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    columns: Vec<String>,
    leads: Vec<Lead>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            leads: Vec::new(),
        }
    }

    /// Append a row. Missing columns are filled with empty text so every lead
    /// carries the full column set.
    pub fn push(&mut self, mut lead: Lead) {
        for (name, _) in &lead.fields {
            if !self.columns.iter().any(|c| c == name) {
                self.columns.push(name.clone());
            }
        }
        for column in &self.columns {
            if lead.get(column).is_none() {
                lead.set(column, FieldValue::default());
            }
        }
        self.leads.push(lead);
    }

    /// Add a column if not yet present, filling every existing lead with `fill`.
    pub fn ensure_column(&mut self, column: &str, fill: FieldValue) {
        if self.has_column(column) {
            return;
        }
        self.columns.push(column.to_string());
        for lead in &mut self.leads {
            lead.set(column, fill.clone());
        }
    }

    /// Register a column name without touching any lead. Used when a
    /// transformation is about to set the field on every lead itself.
    pub(crate) fn declare_column(&mut self, column: &str) {
        if !self.has_column(column) {
            self.columns.push(column.to_string());
        }
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn leads(&self) -> &[Lead] {
        &self.leads
    }

    pub(crate) fn leads_mut(&mut self) -> &mut [Lead] {
        &mut self.leads
    }

    pub fn len(&self) -> usize {
        self.leads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leads.is_empty()
    }

    /// Cell values of one lead, in column order.
    pub fn row<'a>(&'a self, lead: &'a Lead) -> impl Iterator<Item = Option<&'a FieldValue>> {
        self.columns.iter().map(move |c| lead.get(c))
    }
}

impl Serialize for RecordSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.leads.serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_kind_is_the_narrowest_fit() {
        assert_eq!(ColumnKind::infer(["42", "-3", ""]), ColumnKind::Integer);
        assert_eq!(ColumnKind::infer(["1", "2.5"]), ColumnKind::Float);
        assert_eq!(ColumnKind::infer(["Acme", "123"]), ColumnKind::Text);
        assert_eq!(ColumnKind::infer(["1.5", "inf"]), ColumnKind::Text);
        assert_eq!(ColumnKind::infer(["", "NaN", "N/A"]), ColumnKind::Text);
        assert_eq!(ColumnKind::infer(std::iter::empty()), ColumnKind::Text);
    }

    #[test]
    fn cells_follow_their_column_kind() {
        assert_eq!(FieldValue::from_cell("42", ColumnKind::Integer), FieldValue::Integer(42));
        assert_eq!(FieldValue::from_cell("1", ColumnKind::Float), FieldValue::Float(1.0));
        assert_eq!(FieldValue::from_cell("123", ColumnKind::Text), FieldValue::from("123"));
        assert_eq!(FieldValue::from_cell("   ", ColumnKind::Integer), FieldValue::from(""));
        assert_eq!(FieldValue::from_cell("null", ColumnKind::Text), FieldValue::from(""));
    }

    #[test]
    fn set_keeps_position_of_existing_field() {
        let mut lead = Lead::new().with("name", "Acme").with("score", 1i64);
        lead.set("name", "Acme Corp");
        let order: Vec<&str> = lead.fields().map(|(n, _)| n).collect();
        assert_eq!(order, vec!["name", "score"]);
        assert_eq!(lead.name().as_deref(), Some("Acme Corp"));
    }

    #[test]
    fn lead_serializes_in_column_order() {
        let lead = Lead::new()
            .with("zeta", "z")
            .with("alpha", 1i64)
            .with("priority", "High");
        let json = serde_json::to_string(&lead).unwrap();
        assert_eq!(json, r#"{"zeta":"z","alpha":1,"priority":"High"}"#);
    }

    #[test]
    fn numeric_industry_is_coerced_to_text() {
        let lead = Lead::new().with("industry", 7i64);
        assert_eq!(lead.industry_text(), "7");
        assert_eq!(Lead::new().industry_text(), "");
    }

    #[test]
    fn typed_accessors() {
        let lead = Lead::new()
            .with("score", 90i64)
            .with("priority", Priority::High.as_str());
        assert_eq!(lead.score(), Some(90));
        assert_eq!(lead.priority(), Some(Priority::High));
        assert_eq!(lead.name(), None);
    }

    #[test]
    fn push_fills_missing_columns() {
        let mut set = RecordSet::new(vec!["name".into(), "industry".into()]);
        set.push(Lead::new().with("name", "Acme"));
        assert_eq!(set.leads()[0].get("industry"), Some(&FieldValue::from("")));
    }

    #[test]
    fn ensure_column_only_adds_once() {
        let mut set = RecordSet::new(vec!["name".into()]);
        set.push(Lead::new().with("name", "Acme"));
        set.ensure_column("industry", FieldValue::default());
        set.ensure_column("industry", FieldValue::from("ignored"));
        assert_eq!(set.columns(), &["name".to_string(), "industry".to_string()]);
        assert_eq!(set.leads()[0].industry_text(), "");
    }
}
