use crate::common::{Document, SortOrder, Value, DOC_ID};
use itertools::Itertools;
use std::cmp::Ordering;
use std::fmt::Display;

/// Ordered list of physical sort keys.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SortSpec {
    fields: Vec<(String, SortOrder)>,
}

impl SortSpec {
    pub fn new() -> Self {
        SortSpec { fields: Vec::new() }
    }

    pub fn add(mut self, field: &str, sort_order: SortOrder) -> Self {
        self.fields.push((field.to_string(), sort_order));
        self
    }

    pub fn fields(&self) -> &[(String, SortOrder)] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Compares two documents key by key; a missing key sorts as null.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        for (field, order) in self.fields.iter() {
            let left = a.lookup(field).unwrap_or(Value::Null);
            let right = b.lookup(field).unwrap_or(Value::Null);
            let ordering = order.apply(left.cmp(&right));
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    }
}

impl Display for SortSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fields = self
            .fields
            .iter()
            .map(|(field, order)| format!("{}: {}", field, order.direction()))
            .join(", ");
        write!(f, "{{{}}}", fields)
    }
}

/// Physical fields a read returns. The stored `_id` is always returned
/// unless explicitly excluded.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionSpec {
    fields: Vec<String>,
    include_id: bool,
}

impl ProjectionSpec {
    pub fn new(fields: Vec<String>) -> Self {
        ProjectionSpec {
            fields,
            include_id: true,
        }
    }

    pub fn exclude_id(mut self) -> Self {
        self.include_id = false;
        self
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn includes_id(&self) -> bool {
        self.include_id
    }

    /// Copies the projected fields of `document` into a new document.
    pub fn apply(&self, document: &Document) -> Document {
        let mut projected = Document::new();
        if self.include_id {
            if let Some(id) = document.get_ref(DOC_ID) {
                projected.insert(DOC_ID, id.clone());
            }
        }

        for field in self.fields.iter() {
            if field == DOC_ID {
                continue;
            }
            if let Some(value) = document.lookup(field) {
                // projected paths are valid document keys
                if let Err(err) = projected.put(field, value) {
                    log::debug!("Skipping projected field {}: {}", field, err);
                }
            }
        }
        projected
    }
}

impl Display for ProjectionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut fields = self.fields.iter().map(|field| format!("{}: 1", field)).collect_vec();
        if !self.include_id {
            fields.push(format!("{}: 0", DOC_ID));
        }
        write!(f, "{{{}}}", fields.join(", "))
    }
}
