use crate::common::{Convertible, Value};
use crate::errors::RepoResult;
use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;

use super::Filter;

/// A typed handle on one persisted field of entity `E`, holding values of
/// type `T`.
///
/// Handles are generated by `#[derive(Entity)]` into the entity's `Fields`
/// struct and are what repository closures receive:
///
/// ```rust,ignore
/// let open = repo.get_list_by(|f| f.status.eq("open").and(f.total.gt(100)), FindOptions::new()).await?;
/// ```
///
/// Comparisons accept anything convertible into `T`, so a handle on a
/// `String` field cannot be compared with a number.
pub struct FieldRef<E, T> {
    name: &'static str,
    _marker: PhantomData<fn() -> (E, T)>,
}

impl<E, T> FieldRef<E, T> {
    pub const fn new(name: &'static str) -> Self {
        FieldRef {
            name,
            _marker: PhantomData,
        }
    }

    /// Logical field name as declared on the entity.
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn exists(&self, exists: bool) -> Predicate<E> {
        Predicate::from_filter(Filter::Exists(self.name.to_string(), exists))
    }

    pub fn is_null(&self) -> Predicate<E> {
        Predicate::from_filter(Filter::Eq(self.name.to_string(), Value::Null))
    }

    pub fn regex(&self, pattern: &str) -> Predicate<E> {
        Predicate::from_filter(Filter::Regex(self.name.to_string(), pattern.to_string()))
    }

    pub fn elem_match(&self, filter: Filter) -> Predicate<E> {
        Predicate::from_filter(Filter::ElemMatch(self.name.to_string(), Box::new(filter)))
    }
}

impl<E, T: Convertible> FieldRef<E, T> {
    fn term<V, F>(&self, value: V, build: F) -> Predicate<E>
    where
        V: Into<T>,
        F: FnOnce(String, Value) -> Filter,
    {
        let name = self.name.to_string();
        let value: T = value.into();
        Predicate::new(value.to_value().map(|v| build(name, v)))
    }

    pub fn eq<V: Into<T>>(&self, value: V) -> Predicate<E> {
        self.term(value, Filter::Eq)
    }

    pub fn ne<V: Into<T>>(&self, value: V) -> Predicate<E> {
        self.term(value, Filter::Ne)
    }

    pub fn gt<V: Into<T>>(&self, value: V) -> Predicate<E> {
        self.term(value, Filter::Gt)
    }

    pub fn gte<V: Into<T>>(&self, value: V) -> Predicate<E> {
        self.term(value, Filter::Gte)
    }

    pub fn lt<V: Into<T>>(&self, value: V) -> Predicate<E> {
        self.term(value, Filter::Lt)
    }

    pub fn lte<V: Into<T>>(&self, value: V) -> Predicate<E> {
        self.term(value, Filter::Lte)
    }

    pub fn between<V: Into<T>>(&self, lower: V, upper: V) -> Predicate<E> {
        self.gte(lower).and(self.lte(upper))
    }

    pub fn in_array<V: Into<T>>(&self, values: Vec<V>) -> Predicate<E> {
        let name = self.name.to_string();
        Predicate::new(convert_all::<T, V>(values).map(|vs| Filter::In(name, vs)))
    }

    pub fn not_in_array<V: Into<T>>(&self, values: Vec<V>) -> Predicate<E> {
        let name = self.name.to_string();
        Predicate::new(convert_all::<T, V>(values).map(|vs| Filter::NotIn(name, vs)))
    }
}

fn convert_all<T: Convertible, V: Into<T>>(values: Vec<V>) -> RepoResult<Vec<Value>> {
    values
        .into_iter()
        .map(|v| {
            let value: T = v.into();
            value.to_value()
        })
        .collect()
}

impl<E, T> Clone for FieldRef<E, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, T> Copy for FieldRef<E, T> {}

impl<E, T> Debug for FieldRef<E, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "FieldRef({})", self.name)
    }
}

/// A filter over entity `E` built from typed [FieldRef]s.
///
/// Converting a comparison value can fail; the failure is kept and reported
/// when the repository translates the predicate, before any store call.
pub struct Predicate<E> {
    inner: RepoResult<Filter>,
    _marker: PhantomData<fn() -> E>,
}

impl<E> Predicate<E> {
    fn new(inner: RepoResult<Filter>) -> Self {
        Predicate {
            inner,
            _marker: PhantomData,
        }
    }

    pub fn from_filter(filter: Filter) -> Self {
        Predicate::new(Ok(filter))
    }

    /// A predicate matching every entity.
    pub fn all() -> Self {
        Predicate::from_filter(Filter::All)
    }

    pub fn and(self, other: Predicate<E>) -> Predicate<E> {
        Predicate::new(self.inner.and_then(|a| other.inner.map(|b| a.and(b))))
    }

    pub fn or(self, other: Predicate<E>) -> Predicate<E> {
        Predicate::new(self.inner.and_then(|a| other.inner.map(|b| a.or(b))))
    }

    pub fn not(self) -> Predicate<E> {
        Predicate::new(self.inner.map(|f| f.not()))
    }

    pub fn into_filter(self) -> RepoResult<Filter> {
        self.inner
    }
}

impl<E> From<Filter> for Predicate<E> {
    fn from(filter: Filter) -> Self {
        Predicate::from_filter(filter)
    }
}

impl<E> Clone for Predicate<E> {
    fn clone(&self) -> Self {
        Predicate::new(self.inner.clone())
    }
}

impl<E> Debug for Predicate<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            Ok(filter) => write!(f, "Predicate({})", filter),
            Err(err) => write!(f, "Predicate(error: {})", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    struct Order;

    struct OrderFields {
        customer: FieldRef<Order, String>,
        total: FieldRef<Order, i64>,
        size: FieldRef<Order, u64>,
    }

    fn fields() -> OrderFields {
        OrderFields {
            customer: FieldRef::new("customer"),
            total: FieldRef::new("total"),
            size: FieldRef::new("size"),
        }
    }

    #[test]
    fn test_typed_comparisons() {
        let f = fields();
        let filter = f.customer.eq("Alice").into_filter().unwrap();
        assert_eq!(filter, Filter::Eq("customer".into(), Value::from("Alice")));

        let filter = f.total.gt(10).into_filter().unwrap();
        assert_eq!(filter, Filter::Gt("total".into(), Value::I64(10)));
    }

    #[test]
    fn test_combinators() {
        let f = fields();
        let filter = f
            .customer
            .eq("Alice")
            .and(f.total.gte(5).or(f.total.lt(0)))
            .not()
            .into_filter()
            .unwrap();
        assert_eq!(
            filter,
            Filter::Not(Box::new(Filter::And(vec![
                Filter::Eq("customer".into(), Value::from("Alice")),
                Filter::Or(vec![
                    Filter::Gte("total".into(), Value::I64(5)),
                    Filter::Lt("total".into(), Value::I64(0)),
                ]),
            ])))
        );
    }

    #[test]
    fn test_conversion_failure_is_deferred() {
        let f = fields();
        let predicate = f.customer.eq("Alice").and(f.size.eq(u64::MAX));
        let err = predicate.into_filter().unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ObjectMappingError);
    }

    #[test]
    fn test_in_array_and_between() {
        let f = fields();
        let filter = f.customer.in_array(vec!["a", "b"]).into_filter().unwrap();
        assert_eq!(filter, Filter::In("customer".into(), vec![Value::from("a"), Value::from("b")]));

        let filter = f.total.between(1, 9).into_filter().unwrap();
        assert_eq!(
            filter,
            Filter::And(vec![
                Filter::Gte("total".into(), Value::I64(1)),
                Filter::Lte("total".into(), Value::I64(9)),
            ])
        );
    }

    #[test]
    fn test_field_ref_is_copy() {
        let f = fields();
        let a = f.total;
        let b = a;
        assert_eq!(a.name(), b.name());
    }
}
