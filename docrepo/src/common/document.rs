use crate::common::{Value, FIELD_SEPARATOR};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use indexmap::IndexMap;
use itertools::Itertools;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display};
use std::hash::{Hash, Hasher};

pub type FieldVec = SmallVec<[String; 8]>;

/// Represents a document as the store sees it.
///
/// A document is an insertion-ordered map of [String] keys to [Value]s.
/// Nested documents are addressed with dotted keys: for `{"a": {"b": 1}}`,
/// `document.get("a.b")` returns `1`. A numeric segment indexes into an
/// array, any other segment applied to an array collects the matching values
/// of every element.
///
/// Equality, ordering and hashing are sensitive to field order, like the
/// store's own comparison of embedded documents.
#[derive(Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Document {
    data: IndexMap<String, Value>,
}

impl Document {
    /// Creates a new empty document.
    pub fn new() -> Self {
        Document {
            data: IndexMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns the number of top level entries.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Associates the specified value with the key. Dotted keys create the
    /// intermediate documents as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the key, or any of its segments, is empty.
    ///
    /// ```ignore
    /// let mut doc = Document::new();
    /// doc.put("user.name", "Alice")?;
    /// assert_eq!(doc.get("user.name")?, Value::from("Alice"));
    /// ```
    pub fn put<T: Into<Value>>(&mut self, key: &str, value: T) -> RepoResult<()> {
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(RepoError::new(
                "Document does not support empty key",
                ErrorKind::InvalidOperation,
            ));
        }

        if key.contains(FIELD_SEPARATOR) {
            let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
            self.deep_put(&splits, value.into())
        } else {
            self.data.insert(key.to_string(), value.into());
            Ok(())
        }
    }

    /// Inserts a top level entry without interpreting dots, returning the
    /// previous value if any.
    pub fn insert<K: Into<String>, T: Into<Value>>(&mut self, key: K, value: T) -> Option<Value> {
        self.data.insert(key.into(), value.into())
    }

    /// Returns the value of a top level or embedded key, [Value::Null] when
    /// the key is absent.
    pub fn get(&self, key: &str) -> RepoResult<Value> {
        if key.is_empty() || key.split(FIELD_SEPARATOR).any(|it| it.is_empty()) {
            log::error!("Document does not support empty key '{}'", key);
            return Err(RepoError::new(
                &format!("Document does not support empty key '{}'", key),
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(self.lookup(key).unwrap_or(Value::Null))
    }

    /// Borrows the value of a top level key.
    pub fn get_ref(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.data.get_mut(key)
    }

    /// Resolves a top level or embedded key, distinguishing an absent field
    /// (`None`) from one holding null.
    pub fn lookup(&self, key: &str) -> Option<Value> {
        match self.data.get(key) {
            Some(value) => Some(value.clone()),
            None if key.contains(FIELD_SEPARATOR) => {
                let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
                recursive_get(self.data.get(splits[0]), &splits[1..])
            }
            None => None,
        }
    }

    /// Removes a top level or embedded key and returns the removed value.
    /// Removing an absent key is not an error.
    pub fn remove(&mut self, key: &str) -> RepoResult<Option<Value>> {
        if key.contains(FIELD_SEPARATOR) {
            let splits: Vec<&str> = key.split(FIELD_SEPARATOR).collect();
            self.deep_remove(&splits)
        } else {
            Ok(self.data.shift_remove(key))
        }
    }

    /// Merges another document into this one. Embedded documents present on
    /// both sides are merged recursively, other values are overwritten.
    pub fn merge(&mut self, other: &Document) {
        for (key, value) in other.data.iter() {
            match (self.data.get_mut(key), value) {
                (Some(Value::Document(nested)), Value::Document(obj)) => nested.merge(obj),
                _ => {
                    self.data.insert(key.clone(), value.clone());
                }
            }
        }
    }

    /// Checks if a top level key exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Checks if a top level or embedded field exists.
    pub fn contains_field(&self, field: &str) -> bool {
        if self.contains_key(field) {
            true
        } else {
            self.fields().iter().any(|it| it == field)
        }
    }

    /// Retrieves all leaf field paths, embedded fields joined by dots.
    pub fn fields(&self) -> FieldVec {
        self.get_fields_internal("")
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
        self.data.iter()
    }

    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.data.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }

    pub(crate) fn to_json(&self) -> String {
        if self.data.is_empty() {
            return "{}".to_string();
        }
        let entries = self
            .data
            .iter()
            .map(|(k, v)| format!("\"{}\": {}", k, v.to_json()))
            .join(", ");
        format!("{{{}}}", entries)
    }

    fn get_fields_internal(&self, prefix: &str) -> FieldVec {
        let mut fields = FieldVec::new();
        for (key, value) in self.data.iter() {
            if key.is_empty() {
                continue;
            }

            let field = if prefix.is_empty() {
                key.clone()
            } else {
                format!("{}{}{}", prefix, FIELD_SEPARATOR, key)
            };

            match value {
                Value::Document(doc) if !doc.is_empty() => {
                    fields.append(&mut doc.get_fields_internal(&field))
                }
                _ => fields.push(field),
            }
        }
        fields
    }

    fn deep_put(&mut self, splits: &[&str], value: Value) -> RepoResult<()> {
        let key = splits[0];
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(RepoError::new(
                "Document does not support empty key",
                ErrorKind::InvalidOperation,
            ));
        }

        if splits.len() == 1 {
            self.data.insert(key.to_string(), value);
            return Ok(());
        }

        match self.data.get_mut(key) {
            Some(Value::Document(obj)) => obj.deep_put(&splits[1..], value),
            _ => {
                // a missing or scalar level is replaced by a new embedded document
                let mut nested = Document::new();
                nested.deep_put(&splits[1..], value)?;
                self.data.insert(key.to_string(), Value::Document(nested));
                Ok(())
            }
        }
    }

    fn deep_remove(&mut self, splits: &[&str]) -> RepoResult<Option<Value>> {
        let key = splits[0];
        if key.is_empty() {
            log::error!("Document does not support empty key");
            return Err(RepoError::new(
                "Document does not support empty key",
                ErrorKind::InvalidOperation,
            ));
        }

        if splits.len() == 1 {
            return Ok(self.data.shift_remove(key));
        }

        match self.data.get_mut(key) {
            Some(Value::Document(obj)) => obj.deep_remove(&splits[1..]),
            Some(Value::Array(arr)) => match splits[1].parse::<usize>() {
                Ok(index) if index < arr.len() => {
                    if splits.len() == 2 {
                        // unsetting an array element leaves a null hole
                        Ok(Some(arr[index].take()))
                    } else if let Value::Document(obj) = &mut arr[index] {
                        obj.deep_remove(&splits[2..])
                    } else {
                        Ok(None)
                    }
                }
                _ => Ok(None),
            },
            _ => Ok(None),
        }
    }
}

fn recursive_get(value: Option<&Value>, splits: &[&str]) -> Option<Value> {
    let value = value?;
    if splits.is_empty() {
        return Some(value.clone());
    }

    let key = splits[0];
    match value {
        Value::Document(obj) => recursive_get(obj.data.get(key), &splits[1..]),
        Value::Array(arr) => match key.parse::<usize>() {
            Ok(index) => recursive_get(arr.get(index), &splits[1..]),
            Err(_) => decompose(arr, splits),
        },
        _ => None,
    }
}

fn decompose(arr: &[Value], splits: &[&str]) -> Option<Value> {
    let mut items: Vec<Value> = Vec::with_capacity(arr.len());
    for item in arr {
        match recursive_get(Some(item), splits) {
            Some(Value::Array(values)) => items.extend(values),
            Some(value) => items.push(value),
            None => {}
        }
    }

    if items.is_empty() {
        None
    } else {
        Some(Value::Array(items))
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.data.len() == other.data.len()
            && self.data.iter().zip(other.data.iter()).all(|(a, b)| a == b)
    }
}

impl Eq for Document {}

impl PartialOrd for Document {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Document {
    fn cmp(&self, other: &Self) -> Ordering {
        self.data.iter().cmp(other.data.iter())
    }
}

impl Hash for Document {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.len().hash(state);
        for (key, value) in self.data.iter() {
            key.hash(state);
            value.hash(state);
        }
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.data.iter()).finish()
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl FromIterator<(String, Value)> for Document {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Document {
            data: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Document {
    type Item = (String, Value);
    type IntoIter = indexmap::map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = indexmap::map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

pub fn normalize(value: &str) -> String {
    value.trim_matches('"').to_string()
}

/// Creates a [Document] with JSON-like syntax.
///
/// ```rust,ignore
/// let order = doc! {
///     customer: "Alice",
///     "total": (base * 2),
///     items: [{ sku: "A-1", qty: 2 }],
/// };
/// ```
#[macro_export]
macro_rules! doc {
    ({}) => {
        $crate::common::Document::new()
    };

    () => {
        $crate::common::Document::new()
    };

    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::doc!($($key : $value),*)
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::doc_value;

            let mut doc = $crate::common::Document::new();
            $(
                doc.insert($crate::common::normalize(stringify!($key)), $crate::doc_value!($value));
            )*
            doc
        }
    };
}

/// Helper macro converting the values of [doc!]: nested documents, arrays
/// and expressions.
#[macro_export]
macro_rules! doc_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Document($crate::doc!{ $($key : $value),* })
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array(vec![$($crate::doc_value!($value)),*])
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
