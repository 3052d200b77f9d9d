use crate::common::Value;

use super::Filter;

/// Creates a fluent filter builder for the specified field name.
///
/// Dotted names address embedded fields (`"address.city"`).
///
/// ```rust,ignore
/// let filter = field("total").gt(100).and(field("status").eq("open"));
/// ```
pub fn field(field_name: &str) -> FluentFilter {
    FluentFilter {
        field_name: field_name.to_string(),
    }
}

/// A fluent builder for conditions on a single field.
///
/// Each method consumes the builder and returns a [Filter] that can be used
/// directly or combined with other filters.
pub struct FluentFilter {
    field_name: String,
}

impl FluentFilter {
    #[inline]
    pub fn eq<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Eq(self.field_name, value.into())
    }

    #[inline]
    pub fn ne<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Ne(self.field_name, value.into())
    }

    #[inline]
    pub fn gt<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Gt(self.field_name, value.into())
    }

    #[inline]
    pub fn gte<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Gte(self.field_name, value.into())
    }

    #[inline]
    pub fn lt<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Lt(self.field_name, value.into())
    }

    #[inline]
    pub fn lte<T: Into<Value>>(self, value: T) -> Filter {
        Filter::Lte(self.field_name, value.into())
    }

    /// Matches values in the inclusive range `[lower, upper]`.
    pub fn between<T: Into<Value>>(self, lower: T, upper: T) -> Filter {
        Filter::And(vec![
            Filter::Gte(self.field_name.clone(), lower.into()),
            Filter::Lte(self.field_name, upper.into()),
        ])
    }

    /// Matches when the field equals any of the values.
    pub fn in_array<T: Into<Value>>(self, values: Vec<T>) -> Filter {
        Filter::In(self.field_name, values.into_iter().map(|v| v.into()).collect())
    }

    /// Matches when the field equals none of the values.
    pub fn not_in_array<T: Into<Value>>(self, values: Vec<T>) -> Filter {
        Filter::NotIn(self.field_name, values.into_iter().map(|v| v.into()).collect())
    }

    pub fn exists(self, exists: bool) -> Filter {
        Filter::Exists(self.field_name, exists)
    }

    /// Matches string values against a regular expression. The pattern is
    /// compiled where the filter is evaluated; an invalid pattern surfaces as
    /// a [crate::errors::ErrorKind::FilterError].
    pub fn regex(self, pattern: &str) -> Filter {
        Filter::Regex(self.field_name, pattern.to_string())
    }

    /// Matches arrays with at least one element satisfying `filter`.
    pub fn elem_match(self, filter: Filter) -> Filter {
        Filter::ElemMatch(self.field_name, Box::new(filter))
    }
}
