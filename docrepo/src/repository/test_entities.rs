use crate::common::{from_value, Convertible, Document, ObjectId, Value};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::filter::FieldRef;
use crate::repository::{AutoIncrement, Capability, Entity, EntityKey};

fn document_of(value: &Value) -> RepoResult<&Document> {
    match value {
        Value::Document(doc) => Ok(doc),
        _ => {
            log::error!("Expected a document for entity deserialization, got {:?}", value);
            Err(RepoError::new(
                "Expected a document for entity deserialization",
                ErrorKind::ObjectMappingError,
            ))
        }
    }
}

fn read<T: Convertible<Output = T> + Default>(doc: &Document, name: &str) -> RepoResult<T> {
    let value = doc.get(name)?;
    if value.is_null() {
        Ok(T::default())
    } else {
        from_value::<T>(&value)
    }
}

/// Auto-increment entity keyed by `id`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Order {
    pub id: i64,
    pub customer: String,
    pub total: f64,
    pub tags: Vec<String>,
    pub status: Option<String>,
}

pub(crate) struct OrderFields {
    pub id: FieldRef<Order, i64>,
    pub customer: FieldRef<Order, String>,
    pub total: FieldRef<Order, f64>,
    pub tags: FieldRef<Order, Vec<String>>,
    pub status: FieldRef<Order, String>,
}

impl Convertible for Order {
    type Output = Order;

    fn to_value(&self) -> RepoResult<Value> {
        let mut doc = Document::new();
        doc.put("id", self.id.to_value()?)?;
        doc.put("customer", self.customer.to_value()?)?;
        doc.put("total", self.total.to_value()?)?;
        doc.put("tags", self.tags.to_value()?)?;
        doc.put("status", self.status.to_value()?)?;
        Ok(Value::Document(doc))
    }

    fn from_value(value: &Value) -> RepoResult<Order> {
        let doc = document_of(value)?;
        Ok(Order {
            id: read(doc, "id")?,
            customer: read(doc, "customer")?,
            total: read(doc, "total")?,
            tags: read(doc, "tags")?,
            status: read(doc, "status")?,
        })
    }
}

impl Entity for Order {
    type Key = i64;
    type Fields = OrderFields;

    fn entity_name() -> &'static str {
        "Order"
    }

    fn id_field() -> &'static str {
        "id"
    }

    fn field_names() -> &'static [&'static str] {
        &["id", "customer", "total", "tags", "status"]
    }

    fn fields() -> OrderFields {
        OrderFields {
            id: FieldRef::new("id"),
            customer: FieldRef::new("customer"),
            total: FieldRef::new("total"),
            tags: FieldRef::new("tags"),
            status: FieldRef::new("status"),
        }
    }

    fn key(&self) -> Option<i64> {
        if self.id.is_absent() {
            None
        } else {
            Some(self.id)
        }
    }

    fn set_key(&mut self, key: i64) {
        self.id = key;
    }

    fn capability() -> Capability<Self> {
        Capability::AutoIncrement(<Self as AutoIncrement>::set_auto_id)
    }
}

impl AutoIncrement for Order {
    fn set_auto_id(&mut self, id: i64) {
        self.id = id;
    }
}

/// Entity keyed by a caller-supplied string `code`.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Note {
    pub code: String,
    pub text: String,
}

pub(crate) struct NoteFields {
    pub code: FieldRef<Note, String>,
    pub text: FieldRef<Note, String>,
}

impl Convertible for Note {
    type Output = Note;

    fn to_value(&self) -> RepoResult<Value> {
        let mut doc = Document::new();
        doc.put("code", self.code.to_value()?)?;
        doc.put("text", self.text.to_value()?)?;
        Ok(Value::Document(doc))
    }

    fn from_value(value: &Value) -> RepoResult<Note> {
        let doc = document_of(value)?;
        Ok(Note {
            code: read(doc, "code")?,
            text: read(doc, "text")?,
        })
    }
}

impl Entity for Note {
    type Key = String;
    type Fields = NoteFields;

    fn entity_name() -> &'static str {
        "Note"
    }

    fn id_field() -> &'static str {
        "code"
    }

    fn field_names() -> &'static [&'static str] {
        &["code", "text"]
    }

    fn fields() -> NoteFields {
        NoteFields {
            code: FieldRef::new("code"),
            text: FieldRef::new("text"),
        }
    }

    fn key(&self) -> Option<String> {
        if self.code.is_absent() {
            None
        } else {
            Some(self.code.clone())
        }
    }

    fn set_key(&mut self, key: String) {
        self.code = key;
    }
}

/// Entity keyed by a client-generated object id.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Event {
    pub id: Option<ObjectId>,
    pub kind: String,
}

pub(crate) struct EventFields {
    pub id: FieldRef<Event, ObjectId>,
    pub kind: FieldRef<Event, String>,
}

impl Convertible for Event {
    type Output = Event;

    fn to_value(&self) -> RepoResult<Value> {
        let mut doc = Document::new();
        doc.put("id", self.id.to_value()?)?;
        doc.put("kind", self.kind.to_value()?)?;
        Ok(Value::Document(doc))
    }

    fn from_value(value: &Value) -> RepoResult<Event> {
        let doc = document_of(value)?;
        Ok(Event {
            id: read(doc, "id")?,
            kind: read(doc, "kind")?,
        })
    }
}

impl Entity for Event {
    type Key = ObjectId;
    type Fields = EventFields;

    fn entity_name() -> &'static str {
        "Event"
    }

    fn id_field() -> &'static str {
        "id"
    }

    fn field_names() -> &'static [&'static str] {
        &["id", "kind"]
    }

    fn fields() -> EventFields {
        EventFields {
            id: FieldRef::new("id"),
            kind: FieldRef::new("kind"),
        }
    }

    fn key(&self) -> Option<ObjectId> {
        self.id
    }

    fn set_key(&mut self, key: ObjectId) {
        self.id = Some(key);
    }
}
