//! Label selectors: the set of `key op value` terms used to restrict `List`/`Watch` and
//! to bind controllers/services to the pods they manage.
use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

type Labels = BTreeMap<String, String>;

/// A single selector term.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expression {
    In(String, BTreeSet<String>),
    NotIn(String, BTreeSet<String>),
    Equal(String, String),
    NotEqual(String, String),
    Exists(String),
    DoesNotExist(String),
}

impl Expression {
    /// A term with a missing key never matches for `=`/`in`/`Exists`; always matches for
    /// `!=`/`notin`/`DoesNotExist`.
    fn matches(&self, labels: &Labels) -> bool {
        match self {
            Expression::In(key, values) => labels.get(key).is_some_and(|v| values.contains(v)),
            Expression::NotIn(key, values) => labels.get(key).is_none_or(|v| !values.contains(v)),
            Expression::Equal(key, value) => labels.get(key) == Some(value),
            Expression::NotEqual(key, value) => labels.get(key) != Some(value),
            Expression::Exists(key) => labels.contains_key(key),
            Expression::DoesNotExist(key) => !labels.contains_key(key),
        }
    }

    fn to_query_term(&self) -> String {
        match self {
            Expression::In(key, values) => {
                format!("{key} in ({})", values.iter().cloned().collect::<Vec<_>>().join(","))
            }
            Expression::NotIn(key, values) => {
                format!("{key} notin ({})", values.iter().cloned().collect::<Vec<_>>().join(","))
            }
            Expression::Equal(key, value) => format!("{key}={value}"),
            Expression::NotEqual(key, value) => format!("{key}!={value}"),
            Expression::Exists(key) => key.clone(),
            Expression::DoesNotExist(key) => format!("!{key}"),
        }
    }
}

/// A conjunction of [`Expression`] terms: an object matches a `Selector` iff it matches
/// every term.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selector(Vec<Expression>);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid label selector term: {0:?}")]
pub struct ParseSelectorError(pub String);

impl Selector {
    pub fn everything() -> Self {
        Self(Vec::new())
    }

    pub fn selects_all(&self) -> bool {
        self.0.is_empty()
    }

    pub fn matches(&self, labels: &Labels) -> bool {
        self.0.iter().all(|expr| expr.matches(labels))
    }

    pub fn push(&mut self, expr: Expression) -> &mut Self {
        self.0.push(expr);
        self
    }

    /// Parse the comma-separated query syntax accepted by the REST surface's `labels=`
    /// parameter: `key=value`, `key!=value`, `key in (a,b)`, `key notin (a,b)`, bare
    /// `key` (exists), `!key` (does not exist).
    pub fn parse(raw: &str) -> Result<Self, ParseSelectorError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(Self::everything());
        }
        let mut exprs = Vec::new();
        for term in split_terms(raw) {
            exprs.push(parse_term(term.trim())?);
        }
        Ok(Self(exprs))
    }

    pub fn to_query_string(&self) -> String {
        self.0.iter().map(Expression::to_query_term).collect::<Vec<_>>().join(",")
    }
}

impl FromIterator<(String, String)> for Selector {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| Expression::Equal(k, v)).collect())
    }
}

/// Splits on commas that are not inside a `(...)` group, since `in (a,b)` contains commas
/// that are not term separators.
fn split_terms(raw: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    for (i, c) in raw.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                terms.push(&raw[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    terms.push(&raw[start..]);
    terms
}

fn parse_term(term: &str) -> Result<Expression, ParseSelectorError> {
    if let Some(key) = term.strip_prefix('!') {
        let key = key.trim();
        if key.is_empty() {
            return Err(ParseSelectorError(term.to_string()));
        }
        return Ok(Expression::DoesNotExist(key.to_string()));
    }
    if let Some((key, rest)) = term.split_once("!=") {
        return Ok(Expression::NotEqual(key.trim().to_string(), rest.trim().to_string()));
    }
    if let Some((key, rest)) = term.split_once("==") {
        return Ok(Expression::Equal(key.trim().to_string(), rest.trim().to_string()));
    }
    if let Some((key, rest)) = term.split_once('=') {
        return Ok(Expression::Equal(key.trim().to_string(), rest.trim().to_string()));
    }
    if let Some(rest) = term.strip_suffix(')') {
        if let Some((key, set)) = rest.split_once(" notin (") {
            return Ok(Expression::NotIn(key.trim().to_string(), parse_set(set)));
        }
        if let Some((key, set)) = rest.split_once(" in (") {
            return Ok(Expression::In(key.trim().to_string(), parse_set(set)));
        }
        return Err(ParseSelectorError(term.to_string()));
    }
    if term.is_empty() {
        return Err(ParseSelectorError(term.to_string()));
    }
    Ok(Expression::Exists(term.to_string()))
}

fn parse_set(set: &str) -> BTreeSet<String> {
    set.split(',').map(|v| v.trim().to_string()).filter(|v| !v.is_empty()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Labels {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn equality_round_trips() {
        let sel = Selector::parse("app=foo,tier!=frontend").unwrap();
        assert!(sel.matches(&labels(&[("app", "foo"), ("tier", "backend")])));
        assert!(!sel.matches(&labels(&[("app", "foo"), ("tier", "frontend")])));
    }

    #[test]
    fn missing_key_semantics() {
        // missing key never matches `=`/`in`
        let eq = Selector::parse("app=foo").unwrap();
        assert!(!eq.matches(&labels(&[("other", "x")])));
        // missing key always matches `!=`/`notin`
        let neq = Selector::parse("app!=foo").unwrap();
        assert!(neq.matches(&labels(&[("other", "x")])));
        let notin = Selector::parse("app notin (foo,bar)").unwrap();
        assert!(notin.matches(&labels(&[("other", "x")])));
        let r#in = Selector::parse("app in (foo,bar)").unwrap();
        assert!(!r#in.matches(&labels(&[("other", "x")])));
    }

    #[test]
    fn in_and_notin() {
        let sel = Selector::parse("env in (prod, staging)").unwrap();
        assert!(sel.matches(&labels(&[("env", "prod")])));
        assert!(!sel.matches(&labels(&[("env", "dev")])));
    }

    #[test]
    fn empty_selects_all() {
        let sel = Selector::parse("").unwrap();
        assert!(sel.selects_all());
        assert!(sel.matches(&labels(&[])));
    }
}
