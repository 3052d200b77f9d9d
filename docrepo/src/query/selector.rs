use crate::common::Value;
use crate::filter::FieldRef;
use itertools::Itertools;
use std::fmt::Display;

/// Selects entity fields for sorting and projection.
///
/// Selectors mirror the shapes a member-selection expression can take:
/// a single field, a record of members, or members that are not plain
/// fields at all. Only some shapes are meaningful for a given use; the
/// query translator rejects the rest before anything reaches the store.
///
/// ```rust,ignore
/// let by_total = Selector::from(Order::fields().total);
/// let summary = record![f.customer, f.total];
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    /// A plain field, by logical name.
    Field(String),
    /// An ordered group of members.
    Record(Vec<Selector>),
    /// A member computed from an expression over fields.
    Computed(String),
    /// A constant member.
    Literal(Value),
}

impl Selector {
    pub fn field(name: &str) -> Selector {
        Selector::Field(name.to_string())
    }

    pub fn computed(expression: &str) -> Selector {
        Selector::Computed(expression.to_string())
    }

    pub fn literal<T: Into<Value>>(value: T) -> Selector {
        Selector::Literal(value.into())
    }

    /// The field name, when this is a plain field.
    pub fn as_field(&self) -> Option<&str> {
        match self {
            Selector::Field(name) => Some(name),
            _ => None,
        }
    }
}

impl<E, T> From<FieldRef<E, T>> for Selector {
    fn from(field: FieldRef<E, T>) -> Self {
        Selector::Field(field.name().to_string())
    }
}

impl From<&str> for Selector {
    fn from(name: &str) -> Self {
        Selector::Field(name.to_string())
    }
}

impl From<String> for Selector {
    fn from(name: String) -> Self {
        Selector::Field(name)
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Selector::Field(name) => write!(f, "{}", name),
            Selector::Record(members) => write!(f, "{{{}}}", members.iter().join(", ")),
            Selector::Computed(expression) => write!(f, "<{}>", expression),
            Selector::Literal(value) => write!(f, "{}", value),
        }
    }
}

/// Builds a [Selector::Record] from fields or other selectors.
///
/// ```rust,ignore
/// let projected: Vec<Summary> = repo.get_projected(None, |f| record![f.customer, f.total], FindOptions::new()).await?;
/// ```
#[macro_export]
macro_rules! record {
    ($($member:expr),* $(,)?) => {
        $crate::query::Selector::Record(vec![$($crate::query::Selector::from($member)),*])
    };
}
