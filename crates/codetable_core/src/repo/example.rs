//! Query-by-example for small codes.
//!
//! # Responsibility
//! - Describe a partially populated small code (`SmallCodeExample`).
//! - Turn the populated fields into an AND-combined SQL predicate, using the
//!   per-field comparison chosen in an `ExampleMatcher`.
//!
//! # Invariants
//! - Unset fields (`None` or empty text) never become predicates.
//! - An example with no populated field produces no predicate at all.
//! - Comparisons are case-sensitive unless a field is mapped to
//!   `MatchKind::IgnoreCase`.

use crate::model::small_code::SmallCode;
use crate::model::use_flag::UseFlag;
use rusqlite::types::Value;
use std::collections::BTreeMap;

/// Probe-able `SmallCode` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SmallCodeField {
    LargeCode,
    SmallCode,
    Name,
    SortSequence,
    UseFlag,
    Memo,
}

impl SmallCodeField {
    pub const ALL: [Self; 6] = [
        Self::LargeCode,
        Self::SmallCode,
        Self::Name,
        Self::SortSequence,
        Self::UseFlag,
        Self::Memo,
    ];

    /// Column backing this field in `small_codes`.
    pub fn column(self) -> &'static str {
        match self {
            Self::LargeCode => "large_code",
            Self::SmallCode => "small_code",
            Self::Name => "name",
            Self::SortSequence => "sort_sequence",
            Self::UseFlag => "use_flag",
            Self::Memo => "memo",
        }
    }

    fn is_text(self) -> bool {
        !matches!(self, Self::SortSequence | Self::UseFlag)
    }
}

/// How one populated text field is compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchKind {
    /// Whole value, case-sensitive.
    #[default]
    Exact,
    /// Whole value, case folded.
    ///
    /// Only ASCII letters fold (SQLite `NOCASE`): `"www01"` matches
    /// `"WWW01"`, but `"é"` does not match `"É"`.
    IgnoreCase,
    /// Substring, case-sensitive.
    Contains,
}

/// Per-field comparison rules for `SmallCodeExample` queries.
///
/// Fields without an explicit rule use `MatchKind::Exact`. Rules on
/// `SortSequence` and `UseFlag` are ignored; those always match exactly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExampleMatcher {
    rules: BTreeMap<SmallCodeField, MatchKind>,
}

impl ExampleMatcher {
    /// Matcher with no custom rules.
    pub fn matching() -> Self {
        Self::default()
    }

    pub fn with_matcher(mut self, field: SmallCodeField, kind: MatchKind) -> Self {
        self.rules.insert(field, kind);
        self
    }

    /// Effective comparison for `field`.
    pub fn kind_for(&self, field: SmallCodeField) -> MatchKind {
        if !field.is_text() {
            return MatchKind::Exact;
        }
        self.rules.get(&field).copied().unwrap_or_default()
    }
}

/// Partially populated small code used as a query template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmallCodeExample {
    pub large_code: Option<String>,
    pub small_code: Option<String>,
    pub name: Option<String>,
    pub sort_sequence: Option<i64>,
    pub use_flag: Option<UseFlag>,
    pub memo: Option<String>,
}

impl SmallCodeExample {
    pub fn large_code(mut self, value: impl Into<String>) -> Self {
        self.large_code = Some(value.into());
        self
    }

    pub fn small_code(mut self, value: impl Into<String>) -> Self {
        self.small_code = Some(value.into());
        self
    }

    pub fn name(mut self, value: impl Into<String>) -> Self {
        self.name = Some(value.into());
        self
    }

    pub fn sort_sequence(mut self, value: i64) -> Self {
        self.sort_sequence = Some(value);
        self
    }

    pub fn use_flag(mut self, value: UseFlag) -> Self {
        self.use_flag = Some(value);
        self
    }

    pub fn memo(mut self, value: impl Into<String>) -> Self {
        self.memo = Some(value.into());
        self
    }

    /// Returns whether no field would become a predicate.
    pub fn is_empty(&self) -> bool {
        SmallCodeField::ALL
            .iter()
            .all(|field| self.probe(*field).is_none())
    }

    /// In-memory counterpart of the SQL filter, for already loaded records.
    pub fn matches(&self, code: &SmallCode, matcher: &ExampleMatcher) -> bool {
        SmallCodeField::ALL.iter().all(|field| {
            let Some(probe) = self.probe(*field) else {
                return true;
            };
            match (probe, field_value(code, *field)) {
                (Probe::Text(expected), Some(actual)) => match matcher.kind_for(*field) {
                    MatchKind::Exact => actual == expected,
                    MatchKind::IgnoreCase => actual.eq_ignore_ascii_case(expected),
                    MatchKind::Contains => actual.contains(expected),
                },
                (Probe::Text(_), None) => false,
                (Probe::Integer(expected), _) => code.sort_sequence == expected,
                (Probe::Flag(expected), _) => code.use_flag == expected,
            }
        })
    }

    fn probe(&self, field: SmallCodeField) -> Option<Probe<'_>> {
        match field {
            SmallCodeField::LargeCode => text_probe(self.large_code.as_deref()),
            SmallCodeField::SmallCode => text_probe(self.small_code.as_deref()),
            SmallCodeField::Name => text_probe(self.name.as_deref()),
            SmallCodeField::SortSequence => self.sort_sequence.map(Probe::Integer),
            SmallCodeField::UseFlag => self.use_flag.map(Probe::Flag),
            SmallCodeField::Memo => text_probe(self.memo.as_deref()),
        }
    }
}

impl From<&SmallCode> for SmallCodeExample {
    fn from(code: &SmallCode) -> Self {
        Self {
            large_code: Some(code.large_code.clone()),
            small_code: Some(code.small_code.clone()),
            name: Some(code.name.clone()),
            sort_sequence: Some(code.sort_sequence),
            use_flag: Some(code.use_flag),
            memo: code.memo.clone(),
        }
    }
}

/// SQL predicate produced from one example.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExampleFilter {
    /// `AND`-joined conditions with positional `?` placeholders. Empty when
    /// the example has no populated field.
    pub conditions: Vec<String>,
    /// Bind values in placeholder order.
    pub values: Vec<Value>,
}

impl ExampleFilter {
    /// Builds the predicate for `example` under `matcher`.
    pub fn build(example: &SmallCodeExample, matcher: &ExampleMatcher) -> Self {
        let mut filter = Self::default();
        for field in SmallCodeField::ALL {
            let Some(probe) = example.probe(field) else {
                continue;
            };
            let column = field.column();
            match probe {
                Probe::Text(value) => {
                    let condition = match matcher.kind_for(field) {
                        MatchKind::Exact => format!("{column} = ?"),
                        MatchKind::IgnoreCase => format!("{column} = ? COLLATE NOCASE"),
                        // instr() stays case-sensitive, unlike LIKE.
                        MatchKind::Contains => format!("instr({column}, ?) > 0"),
                    };
                    filter.conditions.push(condition);
                    filter.values.push(Value::Text(value.to_string()));
                }
                Probe::Integer(value) => {
                    filter.conditions.push(format!("{column} = ?"));
                    filter.values.push(Value::Integer(value));
                }
                Probe::Flag(value) => {
                    filter.conditions.push(format!("{column} = ?"));
                    filter.values.push(Value::Text(value.as_str().to_string()));
                }
            }
        }
        filter
    }

    /// Renders `WHERE ...` or an empty string.
    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            return String::new();
        }
        format!(" WHERE {}", self.conditions.join(" AND "))
    }
}

#[derive(Debug, Clone, Copy)]
enum Probe<'a> {
    Text(&'a str),
    Integer(i64),
    Flag(UseFlag),
}

fn text_probe(value: Option<&str>) -> Option<Probe<'_>> {
    value.filter(|text| !text.is_empty()).map(Probe::Text)
}

fn field_value(code: &SmallCode, field: SmallCodeField) -> Option<&str> {
    match field {
        SmallCodeField::LargeCode => Some(code.large_code.as_str()),
        SmallCodeField::SmallCode => Some(code.small_code.as_str()),
        SmallCodeField::Name => Some(code.name.as_str()),
        SmallCodeField::Memo => code.memo.as_deref(),
        SmallCodeField::SortSequence | SmallCodeField::UseFlag => None,
    }
}
