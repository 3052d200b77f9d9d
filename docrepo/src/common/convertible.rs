use crate::common::{Document, ObjectId, Value};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;
use std::str::FromStr;

/// Two-way mapping between a Rust type and a document [Value].
///
/// Entities and every type used in their fields implement this trait,
/// usually through `#[derive(Convertible)]`.
pub trait Convertible {
    type Output;

    fn to_value(&self) -> RepoResult<Value>;
    fn from_value(value: &Value) -> RepoResult<Self::Output>;
}

/// Converts a value into any [Convertible] type.
pub fn from_value<T: Convertible<Output = T>>(value: &Value) -> RepoResult<T> {
    T::from_value(value)
}

pub fn to_value<T: Convertible>(item: &T) -> RepoResult<Value> {
    item.to_value()
}

fn mapping_error(value: &Value, expected: &str) -> RepoError {
    log::error!("Value {} is not {}", value, expected);
    RepoError::new(
        &format!("Value {} is not {}", value, expected),
        ErrorKind::ObjectMappingError,
    )
}

// integers decode from any integer kind (or an integral float) as long as
// the number fits the target width
macro_rules! impl_convertible_for_integers {
    ($($t:ty => $variant:ident as $repr:ty, $name:expr);+ $(;)?) => {
        $(
            impl Convertible for $t {
                type Output = $t;

                fn to_value(&self) -> RepoResult<Value> {
                    Ok(Value::$variant(*self as $repr))
                }

                fn from_value(value: &Value) -> RepoResult<Self> {
                    value
                        .as_i64()
                        .and_then(|it| <$t>::try_from(it).ok())
                        .ok_or_else(|| mapping_error(value, $name))
                }
            }
        )+
    };
}

impl_convertible_for_integers! {
    i8 => I32 as i32, "an i8";
    i16 => I32 as i32, "an i16";
    i32 => I32 as i32, "an i32";
    i64 => I64 as i64, "an i64";
    u8 => I32 as i32, "a u8";
    u16 => I32 as i32, "a u16";
    u32 => I64 as i64, "a u32";
}

impl Convertible for u64 {
    type Output = u64;

    fn to_value(&self) -> RepoResult<Value> {
        match i64::try_from(*self) {
            Ok(v) => Ok(Value::I64(v)),
            Err(_) => {
                log::error!("Value {} does not fit a signed 64-bit integer", self);
                Err(RepoError::new(
                    &format!("Value {} does not fit a signed 64-bit integer", self),
                    ErrorKind::ObjectMappingError,
                ))
            }
        }
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        value
            .as_i64()
            .and_then(|it| u64::try_from(it).ok())
            .ok_or_else(|| mapping_error(value, "a u64"))
    }
}

impl Convertible for f32 {
    type Output = f32;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::F64(*self as f64))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        value
            .as_f64()
            .map(|it| it as f32)
            .ok_or_else(|| mapping_error(value, "an f32"))
    }
}

impl Convertible for f64 {
    type Output = f64;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::F64(*self))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        value.as_f64().ok_or_else(|| mapping_error(value, "an f64"))
    }
}

impl Convertible for bool {
    type Output = bool;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::Bool(*self))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(mapping_error(value, "a bool")),
        }
    }
}

impl Convertible for String {
    type Output = String;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::String(self.clone()))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            // string identities may be stored with object-id representation
            Value::ObjectId(id) => Ok(id.to_hex()),
            _ => Err(mapping_error(value, "a string")),
        }
    }
}

impl Convertible for &str {
    type Output = String;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::String(self.to_string()))
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        String::from_value(value)
    }
}

impl Convertible for () {
    type Output = ();

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::Null)
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        match value {
            Value::Null => Ok(()),
            _ => Err(mapping_error(value, "a null")),
        }
    }
}

impl Convertible for ObjectId {
    type Output = ObjectId;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::ObjectId(*self))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        match value {
            Value::ObjectId(id) => Ok(*id),
            Value::String(s) => ObjectId::parse_str(s),
            _ => Err(mapping_error(value, "an object id")),
        }
    }
}

impl Convertible for DateTime<Utc> {
    type Output = DateTime<Utc>;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::DateTime(*self))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            _ => Err(mapping_error(value, "a date")),
        }
    }
}

impl Convertible for Document {
    type Output = Document;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(Value::Document(self.clone()))
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        match value {
            Value::Document(doc) => Ok(doc.clone()),
            _ => Err(mapping_error(value, "a document")),
        }
    }
}

impl Convertible for Value {
    type Output = Value;

    fn to_value(&self) -> RepoResult<Value> {
        Ok(self.clone())
    }

    fn from_value(value: &Value) -> RepoResult<Self> {
        Ok(value.clone())
    }
}

impl<T> Convertible for Option<T>
where
    T: Convertible,
{
    type Output = Option<T::Output>;

    fn to_value(&self) -> RepoResult<Value> {
        match self {
            Some(v) => v.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        match value {
            Value::Null => Ok(None),
            _ => Ok(Some(T::from_value(value)?)),
        }
    }
}

impl<T> Convertible for Box<T>
where
    T: Convertible,
{
    type Output = Box<T::Output>;

    fn to_value(&self) -> RepoResult<Value> {
        self.as_ref().to_value()
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        Ok(Box::new(T::from_value(value)?))
    }
}

impl<T> Convertible for Vec<T>
where
    T: Convertible,
{
    type Output = Vec<T::Output>;

    fn to_value(&self) -> RepoResult<Value> {
        let mut arr = Vec::with_capacity(self.len());
        for item in self {
            arr.push(item.to_value()?);
        }
        Ok(Value::Array(arr))
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        match value {
            Value::Array(arr) => {
                let mut vec = Vec::with_capacity(arr.len());
                for item in arr {
                    vec.push(T::from_value(item)?);
                }
                Ok(vec)
            }
            Value::Bytes(bytes) => {
                let mut vec = Vec::with_capacity(bytes.len());
                for byte in bytes {
                    vec.push(T::from_value(&Value::I32(*byte as i32))?);
                }
                Ok(vec)
            }
            _ => Err(mapping_error(value, "an array")),
        }
    }
}

impl<V> Convertible for HashSet<V>
where
    V: Convertible,
    V::Output: Eq + Hash,
{
    type Output = HashSet<V::Output>;

    fn to_value(&self) -> RepoResult<Value> {
        let mut arr = Vec::with_capacity(self.len());
        for item in self {
            arr.push(item.to_value()?);
        }
        Ok(Value::Array(arr))
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        match value {
            Value::Array(arr) => {
                let mut set = HashSet::with_capacity(arr.len());
                for item in arr {
                    set.insert(V::from_value(item)?);
                }
                Ok(set)
            }
            _ => Err(mapping_error(value, "an array")),
        }
    }
}

fn map_key<K: FromStr>(key: &str) -> RepoResult<K> {
    K::from_str(key).map_err(|_| {
        log::error!("Failed to convert key {} to map key type", key);
        RepoError::new(
            &format!("Failed to convert key {} to map key type", key),
            ErrorKind::ObjectMappingError,
        )
    })
}

impl<K, V> Convertible for BTreeMap<K, V>
where
    K: ToString + FromStr + Ord,
    V: Convertible,
{
    type Output = BTreeMap<K, V::Output>;

    fn to_value(&self) -> RepoResult<Value> {
        let mut doc = Document::new();
        for (k, v) in self {
            doc.insert(k.to_string(), v.to_value()?);
        }
        Ok(Value::Document(doc))
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        match value {
            Value::Document(doc) => {
                let mut result = BTreeMap::new();
                for (k, v) in doc.iter() {
                    result.insert(map_key::<K>(k)?, V::from_value(v)?);
                }
                Ok(result)
            }
            _ => Err(mapping_error(value, "a document")),
        }
    }
}

impl<K, V> Convertible for HashMap<K, V>
where
    K: ToString + FromStr + Eq + Hash,
    V: Convertible,
{
    type Output = HashMap<K, V::Output>;

    fn to_value(&self) -> RepoResult<Value> {
        // sorted keys keep the stored document stable
        let mut entries: Vec<(String, &V)> = self.iter().map(|(k, v)| (k.to_string(), v)).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        let mut doc = Document::new();
        for (k, v) in entries {
            doc.insert(k, v.to_value()?);
        }
        Ok(Value::Document(doc))
    }

    fn from_value(value: &Value) -> RepoResult<Self::Output> {
        match value {
            Value::Document(doc) => {
                let mut result = HashMap::with_capacity(doc.size());
                for (k, v) in doc.iter() {
                    result.insert(map_key::<K>(k)?, V::from_value(v)?);
                }
                Ok(result)
            }
            _ => Err(mapping_error(value, "a document")),
        }
    }
}
