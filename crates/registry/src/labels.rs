//! Label and field selectors.
//!
//! Selectors use the Kubernetes string syntax. A label selector is a
//! comma-separated list of requirements, all of which must hold:
//!
//! - `key=value`, `key==value`, `key!=value`
//! - `key in (a,b)`, `key notin (a,b)`
//! - `key` (key present), `!key` (key absent)
//!
//! Field selectors accept only the equality forms. The empty string selects
//! everything.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A set of labels (or selectable fields).
pub type Set = BTreeMap<String, String>;

/// Errors produced while parsing a selector string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    /// Two commas with nothing in between, or a trailing comma
    #[error("empty requirement in selector {0:?}")]
    EmptyRequirement(String),

    /// Key is empty or contains characters not allowed in a key
    #[error("invalid key {0:?}")]
    InvalidKey(String),

    /// Value contains characters not allowed in a label value
    #[error("invalid value {value:?} for key {key:?}")]
    InvalidValue {
        /// Key the value belongs to
        key: String,
        /// Offending value
        value: String,
    },

    /// Set-based requirement with an empty value list
    #[error("values for {0:?} can't be empty")]
    EmptyValueSet(String),

    /// Operator not allowed here (set operators in a field selector)
    #[error("unsupported operator in {0:?}")]
    UnsupportedOperator(String),

    /// Unbalanced parentheses or otherwise unparseable text
    #[error("malformed selector {0:?}")]
    Malformed(String),
}

/// A single condition on one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    /// `key=value`
    Equals(String, String),
    /// `key!=value`; also true when the key is missing
    NotEquals(String, String),
    /// `key in (v1,v2)`
    In(String, BTreeSet<String>),
    /// `key notin (v1,v2)`; also true when the key is missing
    NotIn(String, BTreeSet<String>),
    /// `key`
    Exists(String),
    /// `!key`
    DoesNotExist(String),
}

impl Requirement {
    /// The key this requirement constrains
    pub fn key(&self) -> &str {
        match self {
            Self::Equals(k, _)
            | Self::NotEquals(k, _)
            | Self::In(k, _)
            | Self::NotIn(k, _)
            | Self::Exists(k)
            | Self::DoesNotExist(k) => k,
        }
    }

    /// Evaluates the requirement against a label set
    pub fn matches(&self, set: &Set) -> bool {
        let actual = set.get(self.key());
        match self {
            Self::Equals(_, v) => actual == Some(v),
            Self::NotEquals(_, v) => actual != Some(v),
            Self::In(_, values) => actual.is_some_and(|a| values.contains(a)),
            Self::NotIn(_, values) => actual.is_none_or(|a| !values.contains(a)),
            Self::Exists(_) => actual.is_some(),
            Self::DoesNotExist(_) => actual.is_none(),
        }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(values: &BTreeSet<String>) -> String {
            values.iter().map(String::as_str).collect::<Vec<_>>().join(",")
        }

        match self {
            Self::Equals(k, v) => write!(f, "{}={}", k, v),
            Self::NotEquals(k, v) => write!(f, "{}!={}", k, v),
            Self::In(k, values) => write!(f, "{} in ({})", k, join(values)),
            Self::NotIn(k, values) => write!(f, "{} notin ({})", k, join(values)),
            Self::Exists(k) => write!(f, "{}", k),
            Self::DoesNotExist(k) => write!(f, "!{}", k),
        }
    }
}

/// A conjunction of requirements over a label or field set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    requirements: Vec<Requirement>,
}

impl Selector {
    /// Selector that matches every set
    pub fn everything() -> Self {
        Self::default()
    }

    /// Builds a selector from already-parsed requirements
    pub fn from_requirements(requirements: Vec<Requirement>) -> Self {
        Self { requirements }
    }

    /// Equality selector requiring every entry of `set`
    pub fn from_set(set: &Set) -> Self {
        Self {
            requirements: set
                .iter()
                .map(|(k, v)| Requirement::Equals(k.clone(), v.clone()))
                .collect(),
        }
    }

    /// Parses a label selector
    pub fn parse(selector: &str) -> Result<Self, SelectorError> {
        parse_requirements(selector, false).map(Self::from_requirements)
    }

    /// Parses a field selector (equality operators only)
    pub fn parse_fields(selector: &str) -> Result<Self, SelectorError> {
        parse_requirements(selector, true).map(Self::from_requirements)
    }

    /// The parsed requirements, in selector order
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Whether this selector matches everything
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// True iff every requirement holds for `set`
    pub fn matches(&self, set: &Set) -> bool {
        self.requirements.iter().all(|r| r.matches(set))
    }

    /// Value required by an `Equals` requirement on `key`, if any
    pub fn requires_exact(&self, key: &str) -> Option<&str> {
        self.requirements.iter().find_map(|r| match r {
            Requirement::Equals(k, v) if k == key => Some(v.as_str()),
            _ => None,
        })
    }
}

impl FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, r) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", r)?;
        }
        Ok(())
    }
}

fn parse_requirements(selector: &str, fields_only: bool) -> Result<Vec<Requirement>, SelectorError> {
    if selector.trim().is_empty() {
        return Ok(Vec::new());
    }

    split_terms(selector)?
        .into_iter()
        .map(|term| {
            let term = term.trim();
            if term.is_empty() {
                return Err(SelectorError::EmptyRequirement(selector.to_string()));
            }
            parse_term(term, fields_only)
        })
        .collect()
}

/// Splits on commas that are not inside a `( ... )` value list.
fn split_terms(selector: &str) -> Result<Vec<&str>, SelectorError> {
    let mut terms = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in selector.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| SelectorError::Malformed(selector.to_string()))?;
            }
            ',' if depth == 0 => {
                terms.push(&selector[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }

    if depth != 0 {
        return Err(SelectorError::Malformed(selector.to_string()));
    }
    terms.push(&selector[start..]);
    Ok(terms)
}

fn parse_term(term: &str, fields_only: bool) -> Result<Requirement, SelectorError> {
    if let Some((key, value)) = term.split_once("!=") {
        let (key, value) = (key.trim(), value.trim());
        validate_key(key)?;
        validate_value(key, value, fields_only)?;
        return Ok(Requirement::NotEquals(key.to_string(), value.to_string()));
    }

    if let Some((key, value)) = term.split_once('=') {
        // `==` leaves the second '=' at the front of the value
        let value = value.strip_prefix('=').unwrap_or(value);
        let (key, value) = (key.trim(), value.trim());
        validate_key(key)?;
        validate_value(key, value, fields_only)?;
        return Ok(Requirement::Equals(key.to_string(), value.to_string()));
    }

    if fields_only {
        return Err(SelectorError::UnsupportedOperator(term.to_string()));
    }

    if let Some(key) = term.strip_prefix('!') {
        let key = key.trim();
        validate_key(key)?;
        return Ok(Requirement::DoesNotExist(key.to_string()));
    }

    if let Some(open) = term.find('(') {
        return parse_set_term(term, open);
    }

    validate_key(term)?;
    Ok(Requirement::Exists(term.to_string()))
}

fn parse_set_term(term: &str, open: usize) -> Result<Requirement, SelectorError> {
    let head = term[..open].trim_end();
    let list = term[open..]
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| SelectorError::Malformed(term.to_string()))?;

    let (key, op) = head
        .rsplit_once(char::is_whitespace)
        .ok_or_else(|| SelectorError::Malformed(term.to_string()))?;
    let key = key.trim();
    validate_key(key)?;

    let values: BTreeSet<String> = list
        .split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    if values.is_empty() {
        return Err(SelectorError::EmptyValueSet(key.to_string()));
    }
    for value in &values {
        validate_value(key, value, false)?;
    }

    match op {
        "in" => Ok(Requirement::In(key.to_string(), values)),
        "notin" => Ok(Requirement::NotIn(key.to_string(), values)),
        _ => Err(SelectorError::UnsupportedOperator(term.to_string())),
    }
}

fn validate_key(key: &str) -> Result<(), SelectorError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/'));
    if valid {
        Ok(())
    } else {
        Err(SelectorError::InvalidKey(key.to_string()))
    }
}

fn validate_value(key: &str, value: &str, fields_only: bool) -> Result<(), SelectorError> {
    // Field values are free-form apart from the separators
    let valid = if fields_only {
        !value.contains(['(', ')'])
    } else {
        value.len() <= 63
            && value
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    if valid {
        Ok(())
    } else {
        Err(SelectorError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}
