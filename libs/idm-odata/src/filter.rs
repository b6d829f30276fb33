//! Filter clauses in the Dynamics `$filter` dialect.
//!
//! Clauses are joined with ` and ` at the top level. Id lists and explicit
//! alternatives are always parenthesised with single spaces inside the
//! parentheses, which is the exact text the upstream accepts:
//!
//! ```text
//! ( statecode eq 0 or statecode eq 1 ) and emailaddress1 eq 'a@b.c'
//! ```

use std::borrow::Cow;
use std::fmt;

use serde_json::Value;

use crate::error::ODataError;

/// A right-hand-side literal.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum FilterValue {
    /// Rendered verbatim: GUIDs, lookup ids and option-set codes.
    Literal(String),
    Int(i64),
    /// Rendered single-quoted with embedded quotes doubled.
    Text(String),
}

impl FilterValue {
    pub fn literal(value: impl Into<String>) -> Self {
        Self::Literal(value.into())
    }

    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(v) => f.write_str(v),
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "'{}'", escape_text(v)),
        }
    }
}

fn escape_text(value: &str) -> Cow<'_, str> {
    if value.contains('\'') {
        Cow::Owned(value.replace('\'', "''"))
    } else {
        Cow::Borrowed(value)
    }
}

/// How a [`TextMatch`] compares its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatchKind {
    Exact,
    StartsWith,
    EndsWith,
    Contains,
}

impl MatchKind {
    /// Parse the kind names accepted in JSON filter payloads.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "exact" | "eq" | "equals" => Some(Self::Exact),
            "startswith" => Some(Self::StartsWith),
            "endswith" => Some(Self::EndsWith),
            "contains" => Some(Self::Contains),
            _ => None,
        }
    }

    fn function_name(self) -> Option<&'static str> {
        match self {
            Self::Exact => None,
            Self::StartsWith => Some("startswith"),
            Self::EndsWith => Some("endswith"),
            Self::Contains => Some("contains"),
        }
    }
}

/// A string predicate: exact equality or one of the substring functions.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextMatch {
    pub kind: MatchKind,
    pub value: String,
}

impl TextMatch {
    pub fn new(kind: MatchKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn exact(value: impl Into<String>) -> Self {
        Self::new(MatchKind::Exact, value)
    }

    pub fn starts_with(value: impl Into<String>) -> Self {
        Self::new(MatchKind::StartsWith, value)
    }

    pub fn ends_with(value: impl Into<String>) -> Self {
        Self::new(MatchKind::EndsWith, value)
    }

    pub fn contains(value: impl Into<String>) -> Self {
        Self::new(MatchKind::Contains, value)
    }

    /// Accepts either a bare string (exact match) or `{"type": <kind>, "value": <string>}`.
    ///
    /// # Errors
    ///
    /// Returns [`ODataError::UnsupportedPredicate`] for any other JSON shape or
    /// an unknown match kind.
    pub fn from_json(field: &str, value: &Value) -> Result<Self, ODataError> {
        match value {
            Value::String(s) => Ok(Self::exact(s.as_str())),
            Value::Object(obj) => {
                let kind = obj
                    .get("type")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ODataError::unsupported(field, "missing string `type`"))?;
                let text = obj
                    .get("value")
                    .and_then(Value::as_str)
                    .ok_or_else(|| ODataError::unsupported(field, "missing string `value`"))?;
                let kind = MatchKind::parse(kind).ok_or_else(|| {
                    ODataError::unsupported(field, format!("unknown match type `{kind}`"))
                })?;
                Ok(Self::new(kind, text))
            }
            other => Err(ODataError::unsupported(
                field,
                format!("expected string or object, got {}", json_kind(other)),
            )),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One predicate of a `$filter` expression.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Clause {
    Eq { field: String, value: FilterValue },
    /// `( f eq a or f eq b )`
    AnyOf {
        field: String,
        values: Vec<FilterValue>,
    },
    Match { field: String, pattern: TextMatch },
    /// `( c1 or c2 )`
    Or(Vec<Clause>),
}

impl Clause {
    pub fn eq(field: impl Into<String>, value: FilterValue) -> Self {
        Self::Eq {
            field: field.into(),
            value,
        }
    }

    /// `None` when `values` is empty, so the clause drops out of the filter.
    pub fn any_of<I>(field: impl Into<String>, values: I) -> Option<Self>
    where
        I: IntoIterator<Item = FilterValue>,
    {
        let values: Vec<FilterValue> = values.into_iter().collect();
        if values.is_empty() {
            return None;
        }
        Some(Self::AnyOf {
            field: field.into(),
            values,
        })
    }

    pub fn matches(field: impl Into<String>, pattern: TextMatch) -> Self {
        Self::Match {
            field: field.into(),
            pattern,
        }
    }
}

impl fmt::Display for Clause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq { field, value } => write!(f, "{field} eq {value}"),
            Self::AnyOf { field, values } => {
                f.write_str("( ")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    write!(f, "{field} eq {value}")?;
                }
                f.write_str(" )")
            }
            Self::Match { field, pattern } => {
                let value = escape_text(&pattern.value);
                match pattern.kind.function_name() {
                    None => write!(f, "{field} eq '{value}'"),
                    Some(func) => write!(f, "{func}({field},'{value}')"),
                }
            }
            Self::Or(alternatives) => {
                f.write_str("( ")?;
                for (i, clause) in alternatives.iter().enumerate() {
                    if i > 0 {
                        f.write_str(" or ")?;
                    }
                    write!(f, "{clause}")?;
                }
                f.write_str(" )")
            }
        }
    }
}

/// A rendered `$filter` value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilterExpression(String);

impl FilterExpression {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accumulates clauses and joins them with ` and `.
///
/// Absent optional values and empty lists are skipped rather than rendered,
/// so callers can feed optional inputs straight through.
#[derive(Clone, Debug, Default)]
#[must_use]
pub struct FilterBuilder {
    clauses: Vec<Clause>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clause(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    pub fn eq(self, field: &str, value: FilterValue) -> Self {
        self.clause(Clause::eq(field, value))
    }

    pub fn eq_opt(self, field: &str, value: Option<FilterValue>) -> Self {
        match value {
            Some(value) => self.eq(field, value),
            None => self,
        }
    }

    pub fn any_of<I>(mut self, field: &str, values: I) -> Self
    where
        I: IntoIterator<Item = FilterValue>,
    {
        if let Some(clause) = Clause::any_of(field, values) {
            self.clauses.push(clause);
        }
        self
    }

    pub fn matches(self, field: &str, pattern: TextMatch) -> Self {
        self.clause(Clause::matches(field, pattern))
    }

    /// Adds `( a or b ... )`. A single alternative is added bare; none adds nothing.
    pub fn either(mut self, mut alternatives: Vec<Clause>) -> Self {
        match alternatives.len() {
            0 => {}
            1 => self.clauses.extend(alternatives.pop()),
            _ => self.clauses.push(Clause::Or(alternatives)),
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// `None` when no clause was added.
    #[must_use]
    pub fn build(self) -> Option<FilterExpression> {
        if self.clauses.is_empty() {
            return None;
        }
        let rendered = self
            .clauses
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" and ");
        Some(FilterExpression(rendered))
    }
}
