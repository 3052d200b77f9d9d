use crate::common::{Convertible, ObjectId};
use std::fmt::Debug;

/// Types usable as the identity of an entity.
pub trait EntityKey: Convertible<Output = Self> + Clone + Debug + Send + Sync + 'static {
    /// Generates a fresh key on the client when an entity is inserted
    /// without one. Keys that must be supplied by the caller return `None`.
    fn generate() -> Option<Self> {
        None
    }

    /// Whether this value stands for "no identity yet".
    fn is_absent(&self) -> bool {
        false
    }
}

impl EntityKey for String {
    fn is_absent(&self) -> bool {
        self.is_empty()
    }
}

impl EntityKey for i64 {
    fn is_absent(&self) -> bool {
        *self == 0
    }
}

impl EntityKey for ObjectId {
    fn generate() -> Option<Self> {
        Some(ObjectId::new())
    }
}

/// How the identity of an entity type is produced on insert.
///
/// Resolved once, when a repository is created, and carried as a plain
/// function pointer so no per-call type inspection happens.
pub enum Capability<E> {
    /// The identity is supplied by the caller, or generated client-side
    /// for object-id keys.
    Plain,
    /// The identity is always assigned from the store-side sequence.
    AutoIncrement(fn(&mut E, i64)),
}

impl<E> Capability<E> {
    pub fn is_auto_increment(&self) -> bool {
        matches!(self, Capability::AutoIncrement(_))
    }
}

impl<E> Clone for Capability<E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for Capability<E> {}

impl<E> Debug for Capability<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Capability::Plain => write!(f, "Plain"),
            Capability::AutoIncrement(_) => write!(f, "AutoIncrement"),
        }
    }
}

/// A type persisted in its own collection.
///
/// Usually derived:
///
/// ```rust,ignore
/// #[derive(Entity, Convertible, Default, Debug, Clone)]
/// #[entity(name = "orders", id(field = "id", auto_increment))]
/// pub struct Order {
///     pub id: i64,
///     pub customer: String,
///     pub total: f64,
/// }
/// ```
///
/// The logical identity field is stored under `_id`.
pub trait Entity: Convertible<Output = Self> + Default + Send + Sync + 'static {
    type Key: EntityKey;

    /// Typed field handles, see [crate::filter::FieldRef].
    type Fields;

    /// Default collection name.
    fn entity_name() -> &'static str;

    /// Logical name of the identity field.
    fn id_field() -> &'static str;

    /// Declared, persisted field names, identity included.
    fn field_names() -> &'static [&'static str];

    fn fields() -> Self::Fields;

    /// Current identity, `None` while absent.
    fn key(&self) -> Option<Self::Key>;

    fn set_key(&mut self, key: Self::Key);

    fn capability() -> Capability<Self> {
        Capability::Plain
    }
}

/// Entities whose identity is a dense `i64` minted by the sequence
/// allocator. Such entities never supply their own identity on insert.
pub trait AutoIncrement: Entity {
    fn set_auto_id(&mut self, id: i64);
}
