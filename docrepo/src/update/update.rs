use crate::common::{Convertible, Document, Value};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::filter::FieldRef;
use itertools::Itertools;
use std::fmt::Display;
use std::marker::PhantomData;

/// One update operator applied to one field.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOperator {
    Set(String, Value),
    Unset(String),
    /// Adds a number; a missing field is set to it.
    Inc(String, Value),
    /// Multiplies by a number; a missing field is set to zero.
    Mul(String, Value),
    /// Keeps the smaller of the current and the given value.
    Min(String, Value),
    /// Keeps the larger of the current and the given value.
    Max(String, Value),
    /// Sets the value only when the update inserts a new document.
    SetOnInsert(String, Value),
    Push(String, Value),
    /// Appends the value unless the array already holds it.
    AddToSet(String, Value),
    /// Removes every array element equal to the value.
    Pull(String, Value),
    /// Moves the value of the first field to the second.
    Rename(String, String),
}

impl UpdateOperator {
    /// Store-native operator name.
    pub fn name(&self) -> &'static str {
        match self {
            UpdateOperator::Set(_, _) => "$set",
            UpdateOperator::Unset(_) => "$unset",
            UpdateOperator::Inc(_, _) => "$inc",
            UpdateOperator::Mul(_, _) => "$mul",
            UpdateOperator::Min(_, _) => "$min",
            UpdateOperator::Max(_, _) => "$max",
            UpdateOperator::SetOnInsert(_, _) => "$setOnInsert",
            UpdateOperator::Push(_, _) => "$push",
            UpdateOperator::AddToSet(_, _) => "$addToSet",
            UpdateOperator::Pull(_, _) => "$pull",
            UpdateOperator::Rename(_, _) => "$rename",
        }
    }

    /// The field the operator writes.
    pub fn field(&self) -> &str {
        match self {
            UpdateOperator::Set(f, _)
            | UpdateOperator::Unset(f)
            | UpdateOperator::Inc(f, _)
            | UpdateOperator::Mul(f, _)
            | UpdateOperator::Min(f, _)
            | UpdateOperator::Max(f, _)
            | UpdateOperator::SetOnInsert(f, _)
            | UpdateOperator::Push(f, _)
            | UpdateOperator::AddToSet(f, _)
            | UpdateOperator::Pull(f, _)
            | UpdateOperator::Rename(f, _) => f,
        }
    }

    fn map_fields<F: Fn(&str) -> String>(self, rename: &F) -> UpdateOperator {
        match self {
            UpdateOperator::Set(f, v) => UpdateOperator::Set(rename(&f), v),
            UpdateOperator::Unset(f) => UpdateOperator::Unset(rename(&f)),
            UpdateOperator::Inc(f, v) => UpdateOperator::Inc(rename(&f), v),
            UpdateOperator::Mul(f, v) => UpdateOperator::Mul(rename(&f), v),
            UpdateOperator::Min(f, v) => UpdateOperator::Min(rename(&f), v),
            UpdateOperator::Max(f, v) => UpdateOperator::Max(rename(&f), v),
            UpdateOperator::SetOnInsert(f, v) => UpdateOperator::SetOnInsert(rename(&f), v),
            UpdateOperator::Push(f, v) => UpdateOperator::Push(rename(&f), v),
            UpdateOperator::AddToSet(f, v) => UpdateOperator::AddToSet(rename(&f), v),
            UpdateOperator::Pull(f, v) => UpdateOperator::Pull(rename(&f), v),
            UpdateOperator::Rename(f, to) => UpdateOperator::Rename(rename(&f), rename(&to)),
        }
    }

    fn apply(&self, document: &mut Document, inserting: bool) -> RepoResult<()> {
        match self {
            UpdateOperator::Set(field, value) => document.put(field, value.clone()),
            UpdateOperator::Unset(field) => document.remove(field).map(|_| ()),
            UpdateOperator::SetOnInsert(field, value) => {
                if inserting {
                    document.put(field, value.clone())
                } else {
                    Ok(())
                }
            }
            UpdateOperator::Inc(field, value) => {
                let current = document.lookup(field).unwrap_or(Value::Null);
                let result = match current {
                    Value::Null => numeric(self, value)?.clone(),
                    current => arithmetic(self, &current, value, Arithmetic::Add)?,
                };
                document.put(field, result)
            }
            UpdateOperator::Mul(field, value) => {
                let current = document.lookup(field).unwrap_or(Value::Null);
                let result = match current {
                    Value::Null => arithmetic(self, &Value::I32(0), value, Arithmetic::Mul)?,
                    current => arithmetic(self, &current, value, Arithmetic::Mul)?,
                };
                document.put(field, result)
            }
            UpdateOperator::Min(field, value) => match document.lookup(field) {
                Some(current) if !current.is_null() && &current <= value => Ok(()),
                _ => document.put(field, value.clone()),
            },
            UpdateOperator::Max(field, value) => match document.lookup(field) {
                Some(current) if !current.is_null() && &current >= value => Ok(()),
                _ => document.put(field, value.clone()),
            },
            UpdateOperator::Push(field, value) => {
                let mut items = array_of(self, document, field)?;
                items.push(value.clone());
                document.put(field, Value::Array(items))
            }
            UpdateOperator::AddToSet(field, value) => {
                let mut items = array_of(self, document, field)?;
                if !items.contains(value) {
                    items.push(value.clone());
                }
                document.put(field, Value::Array(items))
            }
            UpdateOperator::Pull(field, value) => match document.lookup(field) {
                None | Some(Value::Null) => Ok(()),
                Some(_) => {
                    let mut items = array_of(self, document, field)?;
                    items.retain(|it| it != value);
                    document.put(field, Value::Array(items))
                }
            },
            UpdateOperator::Rename(field, to) => {
                if let Some(value) = document.remove(field)? {
                    document.put(to, value)?;
                }
                Ok(())
            }
        }
    }
}

impl Display for UpdateOperator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpdateOperator::Unset(field) => write!(f, "{} {}", self.name(), field),
            UpdateOperator::Rename(field, to) => write!(f, "{} {} -> {}", self.name(), field, to),
            UpdateOperator::Set(field, v)
            | UpdateOperator::Inc(field, v)
            | UpdateOperator::Mul(field, v)
            | UpdateOperator::Min(field, v)
            | UpdateOperator::Max(field, v)
            | UpdateOperator::SetOnInsert(field, v)
            | UpdateOperator::Push(field, v)
            | UpdateOperator::AddToSet(field, v)
            | UpdateOperator::Pull(field, v) => write!(f, "{} {}: {}", self.name(), field, v),
        }
    }
}

#[derive(Clone, Copy)]
enum Arithmetic {
    Add,
    Mul,
}

fn numeric<'a>(op: &UpdateOperator, value: &'a Value) -> RepoResult<&'a Value> {
    if value.is_number() {
        Ok(value)
    } else {
        log::error!("{} requires a numeric argument, found {}", op.name(), value);
        Err(RepoError::new(
            &format!("{} requires a numeric argument, found {}", op.name(), value),
            ErrorKind::UpdateError,
        ))
    }
}

fn arithmetic(op: &UpdateOperator, current: &Value, value: &Value, kind: Arithmetic) -> RepoResult<Value> {
    numeric(op, value)?;
    if !current.is_number() {
        log::error!(
            "Cannot apply {} to non-numeric field '{}' holding {}",
            op.name(),
            op.field(),
            current
        );
        return Err(RepoError::new(
            &format!("Cannot apply {} to non-numeric field '{}'", op.name(), op.field()),
            ErrorKind::UpdateError,
        ));
    }

    match (current, value) {
        (Value::F64(_), _) | (_, Value::F64(_)) => {
            let a = current.as_f64().unwrap_or_default();
            let b = value.as_f64().unwrap_or_default();
            Ok(Value::F64(match kind {
                Arithmetic::Add => a + b,
                Arithmetic::Mul => a * b,
            }))
        }
        (Value::I32(a), Value::I32(b)) => {
            let result = match kind {
                Arithmetic::Add => a.checked_add(*b),
                Arithmetic::Mul => a.checked_mul(*b),
            };
            // 32-bit results that overflow widen to 64 bits
            match result {
                Some(r) => Ok(Value::I32(r)),
                None => arithmetic(op, &Value::I64(*a as i64), &Value::I64(*b as i64), kind),
            }
        }
        _ => {
            let a = current.as_i64().unwrap_or_default();
            let b = value.as_i64().unwrap_or_default();
            let result = match kind {
                Arithmetic::Add => a.checked_add(b),
                Arithmetic::Mul => a.checked_mul(b),
            };
            result.map(Value::I64).ok_or_else(|| {
                log::error!("{} overflowed field '{}'", op.name(), op.field());
                RepoError::new(
                    &format!("{} overflowed field '{}'", op.name(), op.field()),
                    ErrorKind::UpdateError,
                )
            })
        }
    }
}

fn array_of(op: &UpdateOperator, document: &Document, field: &str) -> RepoResult<Vec<Value>> {
    match document.lookup(field) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items),
        Some(other) => {
            log::error!("{} requires an array field, '{}' holds {}", op.name(), field, other);
            Err(RepoError::new(
                &format!("{} requires an array field, '{}' is not an array", op.name(), field),
                ErrorKind::UpdateError,
            ))
        }
    }
}

/// An ordered list of update operators.
///
/// Updates are built with the stateless functions of this module and
/// combined by chaining:
///
/// ```rust,ignore
/// let update = set("status", "shipped").inc("version", 1).push("history", "shipped");
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Update {
    operators: Vec<UpdateOperator>,
}

impl Update {
    pub fn new() -> Self {
        Update {
            operators: Vec::new(),
        }
    }

    pub fn operators(&self) -> &[UpdateOperator] {
        &self.operators
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn with(mut self, operator: UpdateOperator) -> Update {
        self.operators.push(operator);
        self
    }

    /// Appends every operator of `other`.
    pub fn and(mut self, other: Update) -> Update {
        self.operators.extend(other.operators);
        self
    }

    pub fn set<T: Into<Value>>(self, field: &str, value: T) -> Update {
        self.with(UpdateOperator::Set(field.to_string(), value.into()))
    }

    pub fn unset(self, field: &str) -> Update {
        self.with(UpdateOperator::Unset(field.to_string()))
    }

    pub fn inc<T: Into<Value>>(self, field: &str, value: T) -> Update {
        self.with(UpdateOperator::Inc(field.to_string(), value.into()))
    }

    pub fn mul<T: Into<Value>>(self, field: &str, value: T) -> Update {
        self.with(UpdateOperator::Mul(field.to_string(), value.into()))
    }

    pub fn min<T: Into<Value>>(self, field: &str, value: T) -> Update {
        self.with(UpdateOperator::Min(field.to_string(), value.into()))
    }

    pub fn max<T: Into<Value>>(self, field: &str, value: T) -> Update {
        self.with(UpdateOperator::Max(field.to_string(), value.into()))
    }

    pub fn set_on_insert<T: Into<Value>>(self, field: &str, value: T) -> Update {
        self.with(UpdateOperator::SetOnInsert(field.to_string(), value.into()))
    }

    pub fn push<T: Into<Value>>(self, field: &str, value: T) -> Update {
        self.with(UpdateOperator::Push(field.to_string(), value.into()))
    }

    pub fn add_to_set<T: Into<Value>>(self, field: &str, value: T) -> Update {
        self.with(UpdateOperator::AddToSet(field.to_string(), value.into()))
    }

    pub fn pull<T: Into<Value>>(self, field: &str, value: T) -> Update {
        self.with(UpdateOperator::Pull(field.to_string(), value.into()))
    }

    pub fn rename(self, field: &str, new_name: &str) -> Update {
        self.with(UpdateOperator::Rename(field.to_string(), new_name.to_string()))
    }

    /// Returns a copy with every field name passed through `rename`.
    pub fn map_fields<F: Fn(&str) -> String>(self, rename: &F) -> Update {
        Update {
            operators: self.operators.into_iter().map(|op| op.map_fields(rename)).collect(),
        }
    }

    /// Applies the operators in order. `inserting` is set when the document
    /// is being created by an upsert, which enables `$setOnInsert`.
    pub fn apply(&self, document: &mut Document, inserting: bool) -> RepoResult<()> {
        for operator in self.operators.iter() {
            operator.apply(document, inserting)?;
        }
        Ok(())
    }
}

impl Display for Update {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.operators.iter().join(", "))
    }
}

pub fn set<T: Into<Value>>(field: &str, value: T) -> Update {
    Update::new().set(field, value)
}

pub fn unset(field: &str) -> Update {
    Update::new().unset(field)
}

pub fn inc<T: Into<Value>>(field: &str, value: T) -> Update {
    Update::new().inc(field, value)
}

pub fn mul<T: Into<Value>>(field: &str, value: T) -> Update {
    Update::new().mul(field, value)
}

pub fn min<T: Into<Value>>(field: &str, value: T) -> Update {
    Update::new().min(field, value)
}

pub fn max<T: Into<Value>>(field: &str, value: T) -> Update {
    Update::new().max(field, value)
}

pub fn set_on_insert<T: Into<Value>>(field: &str, value: T) -> Update {
    Update::new().set_on_insert(field, value)
}

pub fn push<T: Into<Value>>(field: &str, value: T) -> Update {
    Update::new().push(field, value)
}

pub fn add_to_set<T: Into<Value>>(field: &str, value: T) -> Update {
    Update::new().add_to_set(field, value)
}

pub fn pull<T: Into<Value>>(field: &str, value: T) -> Update {
    Update::new().pull(field, value)
}

pub fn rename(field: &str, new_name: &str) -> Update {
    Update::new().rename(field, new_name)
}

/// Combines several updates into one, keeping operator order.
pub fn combine(updates: Vec<Update>) -> Update {
    updates.into_iter().fold(Update::new(), |acc, it| acc.and(it))
}

/// Typed update builder over entity `E`, fed with the entity's [FieldRef]s.
///
/// ```rust,ignore
/// repo.update_one_with(filter, |u, f| u.set(f.status, "closed").inc(f.version, 1), UpdateOptions::new()).await?;
/// ```
///
/// Value conversion failures are kept and reported by [UpdateBuilder::build].
pub struct UpdateBuilder<E> {
    inner: RepoResult<Update>,
    _marker: PhantomData<fn() -> E>,
}

impl<E> UpdateBuilder<E> {
    pub fn new() -> Self {
        UpdateBuilder {
            inner: Ok(Update::new()),
            _marker: PhantomData,
        }
    }

    fn typed<T, V, F>(self, value: V, build: F) -> Self
    where
        T: Convertible,
        V: Into<T>,
        F: FnOnce(Value) -> UpdateOperator,
    {
        let value: T = value.into();
        let inner = self
            .inner
            .and_then(|update| value.to_value().map(|v| update.with(build(v))));
        UpdateBuilder {
            inner,
            _marker: PhantomData,
        }
    }

    fn untyped(self, operator: UpdateOperator) -> Self {
        UpdateBuilder {
            inner: self.inner.map(|update| update.with(operator)),
            _marker: PhantomData,
        }
    }

    pub fn set<T: Convertible, V: Into<T>>(self, field: FieldRef<E, T>, value: V) -> Self {
        self.typed::<T, V, _>(value, |v| UpdateOperator::Set(field.name().to_string(), v))
    }

    pub fn unset<T>(self, field: FieldRef<E, T>) -> Self {
        self.untyped(UpdateOperator::Unset(field.name().to_string()))
    }

    pub fn inc<T: Convertible, V: Into<T>>(self, field: FieldRef<E, T>, value: V) -> Self {
        self.typed::<T, V, _>(value, |v| UpdateOperator::Inc(field.name().to_string(), v))
    }

    pub fn mul<T: Convertible, V: Into<T>>(self, field: FieldRef<E, T>, value: V) -> Self {
        self.typed::<T, V, _>(value, |v| UpdateOperator::Mul(field.name().to_string(), v))
    }

    pub fn min<T: Convertible, V: Into<T>>(self, field: FieldRef<E, T>, value: V) -> Self {
        self.typed::<T, V, _>(value, |v| UpdateOperator::Min(field.name().to_string(), v))
    }

    pub fn max<T: Convertible, V: Into<T>>(self, field: FieldRef<E, T>, value: V) -> Self {
        self.typed::<T, V, _>(value, |v| UpdateOperator::Max(field.name().to_string(), v))
    }

    pub fn set_on_insert<T: Convertible, V: Into<T>>(self, field: FieldRef<E, T>, value: V) -> Self {
        self.typed::<T, V, _>(value, |v| UpdateOperator::SetOnInsert(field.name().to_string(), v))
    }

    pub fn push<T: Convertible, V: Into<T>>(self, field: FieldRef<E, Vec<T>>, value: V) -> Self {
        self.typed::<T, V, _>(value, |v| UpdateOperator::Push(field.name().to_string(), v))
    }

    pub fn add_to_set<T: Convertible, V: Into<T>>(self, field: FieldRef<E, Vec<T>>, value: V) -> Self {
        self.typed::<T, V, _>(value, |v| UpdateOperator::AddToSet(field.name().to_string(), v))
    }

    pub fn pull<T: Convertible, V: Into<T>>(self, field: FieldRef<E, Vec<T>>, value: V) -> Self {
        self.typed::<T, V, _>(value, |v| UpdateOperator::Pull(field.name().to_string(), v))
    }

    pub fn rename<T>(self, field: FieldRef<E, T>, new_name: &str) -> Self {
        self.untyped(UpdateOperator::Rename(field.name().to_string(), new_name.to_string()))
    }

    pub fn build(self) -> RepoResult<Update> {
        self.inner
    }
}

impl<E> Default for UpdateBuilder<E> {
    fn default() -> Self {
        UpdateBuilder::new()
    }
}
