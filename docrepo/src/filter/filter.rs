use crate::common::{Document, Value, DOC_ID};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use itertools::Itertools;
use regex::Regex;
use std::cmp::Ordering;
use std::fmt::Display;

/// Field name the elements of a scalar array are exposed under inside an
/// [Filter::ElemMatch] condition.
pub const ELEMENT_FIELD: &str = "$";

/// A filter condition over documents.
///
/// Filters form a plain expression tree. They are built with the fluent
/// API ([crate::filter::field], [all], [and], ...) or from typed entity
/// predicates, translated once by the repository and handed to the store,
/// which either encodes them for the wire or evaluates them with
/// [Filter::apply].
///
/// # Matching rules
///
/// - a missing field equals null
/// - when the field holds an array, comparisons match if any element matches
/// - range comparisons only match values of the same kind (numbers with
///   numbers, strings with strings, ...)
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    Eq(String, Value),
    Ne(String, Value),
    Gt(String, Value),
    Gte(String, Value),
    Lt(String, Value),
    Lte(String, Value),
    In(String, Vec<Value>),
    NotIn(String, Vec<Value>),
    /// Matches when the field's presence equals the flag.
    Exists(String, bool),
    /// Matches string values against a regular expression.
    Regex(String, String),
    /// Matches arrays holding at least one element that satisfies the
    /// inner filter. Scalar elements are exposed under [ELEMENT_FIELD].
    ElemMatch(String, Box<Filter>),
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Nor(Vec<Filter>),
}

impl Filter {
    /// Combines this filter with another using logical AND.
    pub fn and(self, filter: Filter) -> Filter {
        match self {
            Filter::All => filter,
            Filter::And(mut filters) => {
                filters.push(filter);
                Filter::And(filters)
            }
            other => Filter::And(vec![other, filter]),
        }
    }

    /// Combines this filter with another using logical OR.
    pub fn or(self, filter: Filter) -> Filter {
        match self {
            Filter::Or(mut filters) => {
                filters.push(filter);
                Filter::Or(filters)
            }
            other => Filter::Or(vec![other, filter]),
        }
    }

    /// Negates this filter.
    pub fn not(self) -> Filter {
        Filter::Not(Box::new(self))
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Filter::All)
    }

    /// Evaluates the filter against a document.
    pub fn apply(&self, document: &Document) -> RepoResult<bool> {
        match self {
            Filter::All => Ok(true),
            Filter::Eq(field, value) => Ok(matches_eq(document.lookup(field), value)),
            Filter::Ne(field, value) => Ok(!matches_eq(document.lookup(field), value)),
            Filter::Gt(field, value) => Ok(matches_cmp(document.lookup(field), value, |o| {
                o == Ordering::Greater
            })),
            Filter::Gte(field, value) => Ok(matches_cmp(document.lookup(field), value, |o| {
                o != Ordering::Less
            })),
            Filter::Lt(field, value) => Ok(matches_cmp(document.lookup(field), value, |o| {
                o == Ordering::Less
            })),
            Filter::Lte(field, value) => Ok(matches_cmp(document.lookup(field), value, |o| {
                o != Ordering::Greater
            })),
            Filter::In(field, values) => {
                let found = document.lookup(field);
                Ok(values.iter().any(|v| matches_eq(found.clone(), v)))
            }
            Filter::NotIn(field, values) => {
                let found = document.lookup(field);
                Ok(!values.iter().any(|v| matches_eq(found.clone(), v)))
            }
            Filter::Exists(field, exists) => Ok(document.lookup(field).is_some() == *exists),
            Filter::Regex(field, pattern) => {
                let regex = Regex::new(pattern)?;
                Ok(match document.lookup(field) {
                    Some(Value::String(s)) => regex.is_match(&s),
                    Some(Value::Array(items)) => items
                        .iter()
                        .any(|it| it.as_str().map(|s| regex.is_match(s)).unwrap_or(false)),
                    _ => false,
                })
            }
            Filter::ElemMatch(field, filter) => {
                if contains_elem_match(filter) {
                    log::error!("ElemMatch filter {} cannot nest another ElemMatch", self);
                    return Err(RepoError::new(
                        "ElemMatch filter cannot nest another ElemMatch",
                        ErrorKind::FilterError,
                    ));
                }

                match document.lookup(field) {
                    Some(Value::Array(items)) => {
                        for item in items.iter() {
                            let matched = match item {
                                Value::Document(doc) => filter.apply(doc)?,
                                scalar => {
                                    let mut doc = Document::new();
                                    doc.insert(ELEMENT_FIELD, scalar.clone());
                                    filter.apply(&doc)?
                                }
                            };
                            if matched {
                                return Ok(true);
                            }
                        }
                        Ok(false)
                    }
                    _ => Ok(false),
                }
            }
            Filter::And(filters) => {
                for filter in filters {
                    if !filter.apply(document)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Filter::Or(filters) => {
                for filter in filters {
                    if filter.apply(document)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Filter::Not(filter) => Ok(!filter.apply(document)?),
            Filter::Nor(filters) => {
                for filter in filters {
                    if filter.apply(document)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    /// Returns a copy of this filter with every field name passed through
    /// `rename`. Fields nested inside an [Filter::ElemMatch] are relative to
    /// the array element and are left untouched.
    pub fn map_fields<F>(self, rename: &F) -> Filter
    where
        F: Fn(&str) -> String,
    {
        match self {
            Filter::All => Filter::All,
            Filter::Eq(f, v) => Filter::Eq(rename(&f), v),
            Filter::Ne(f, v) => Filter::Ne(rename(&f), v),
            Filter::Gt(f, v) => Filter::Gt(rename(&f), v),
            Filter::Gte(f, v) => Filter::Gte(rename(&f), v),
            Filter::Lt(f, v) => Filter::Lt(rename(&f), v),
            Filter::Lte(f, v) => Filter::Lte(rename(&f), v),
            Filter::In(f, v) => Filter::In(rename(&f), v),
            Filter::NotIn(f, v) => Filter::NotIn(rename(&f), v),
            Filter::Exists(f, b) => Filter::Exists(rename(&f), b),
            Filter::Regex(f, p) => Filter::Regex(rename(&f), p),
            Filter::ElemMatch(f, inner) => Filter::ElemMatch(rename(&f), inner),
            Filter::And(filters) => Filter::And(filters.into_iter().map(|it| it.map_fields(rename)).collect()),
            Filter::Or(filters) => Filter::Or(filters.into_iter().map(|it| it.map_fields(rename)).collect()),
            Filter::Not(inner) => Filter::Not(Box::new(inner.map_fields(rename))),
            Filter::Nor(filters) => Filter::Nor(filters.into_iter().map(|it| it.map_fields(rename)).collect()),
        }
    }

    /// Top level equality terms, the fields an upsert copies into the new
    /// document.
    pub fn equality_terms(&self) -> Vec<(&str, &Value)> {
        match self {
            Filter::Eq(field, value) => vec![(field.as_str(), value)],
            Filter::And(filters) => filters.iter().flat_map(|it| it.equality_terms()).collect(),
            _ => Vec::new(),
        }
    }
}

fn contains_elem_match(filter: &Filter) -> bool {
    match filter {
        Filter::ElemMatch(_, _) => true,
        Filter::And(filters) | Filter::Or(filters) | Filter::Nor(filters) => {
            filters.iter().any(contains_elem_match)
        }
        Filter::Not(inner) => contains_elem_match(inner),
        _ => false,
    }
}

fn matches_eq(found: Option<Value>, expected: &Value) -> bool {
    match found {
        None => expected.is_null(),
        Some(value) => {
            if &value == expected {
                return true;
            }
            match value {
                Value::Array(items) => items.iter().any(|it| it == expected),
                _ => false,
            }
        }
    }
}

fn matches_cmp<F>(found: Option<Value>, expected: &Value, accept: F) -> bool
where
    F: Fn(Ordering) -> bool,
{
    let compare = |value: &Value| {
        value.kind_rank() == expected.kind_rank() && accept(value.cmp(expected))
    };

    match found {
        None => false,
        Some(Value::Array(items)) if !expected.is_array() => items.iter().any(compare),
        Some(value) => compare(&value),
    }
}

impl Display for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Filter::All => write!(f, "All"),
            Filter::Eq(field, value) => write!(f, "({} == {})", field, value),
            Filter::Ne(field, value) => write!(f, "({} != {})", field, value),
            Filter::Gt(field, value) => write!(f, "({} > {})", field, value),
            Filter::Gte(field, value) => write!(f, "({} >= {})", field, value),
            Filter::Lt(field, value) => write!(f, "({} < {})", field, value),
            Filter::Lte(field, value) => write!(f, "({} <= {})", field, value),
            Filter::In(field, values) => write!(f, "({} in [{}])", field, values.iter().join(", ")),
            Filter::NotIn(field, values) => {
                write!(f, "({} not in [{}])", field, values.iter().join(", "))
            }
            Filter::Exists(field, exists) => write!(f, "({} exists {})", field, exists),
            Filter::Regex(field, pattern) => write!(f, "({} regex {})", field, pattern),
            Filter::ElemMatch(field, filter) => write!(f, "({} elemMatch {})", field, filter),
            Filter::And(filters) => write!(f, "({})", filters.iter().join(" && ")),
            Filter::Or(filters) => write!(f, "({})", filters.iter().join(" || ")),
            Filter::Not(filter) => write!(f, "!{}", filter),
            Filter::Nor(filters) => write!(f, "!({})", filters.iter().join(" || ")),
        }
    }
}

/// Creates a filter that matches all documents.
pub fn all() -> Filter {
    Filter::All
}

/// Creates a filter matching a document by its stored `_id`.
pub fn by_id<T: Into<Value>>(id: T) -> Filter {
    Filter::Eq(DOC_ID.to_string(), id.into())
}

/// Combines multiple filters using logical AND.
pub fn and(filters: Vec<Filter>) -> Filter {
    Filter::And(filters)
}

/// Combines multiple filters using logical OR.
pub fn or(filters: Vec<Filter>) -> Filter {
    Filter::Or(filters)
}

pub fn not(filter: Filter) -> Filter {
    Filter::Not(Box::new(filter))
}

/// Matches documents that satisfy none of the filters.
pub fn nor(filters: Vec<Filter>) -> Filter {
    Filter::Nor(filters)
}
