use crate::common::SortOrder;
use crate::query::Selector;

/// Acknowledgement level requested for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WriteConcern {
    /// Fire and forget.
    W0,
    /// Acknowledged by the primary.
    #[default]
    W1,
    /// Acknowledged by the primary after the journal write.
    Journaled,
    /// Acknowledged by a majority of members, journaled.
    Majority,
}

impl WriteConcern {
    /// The strongest available concern, used for every sequence increment.
    pub fn strongest() -> WriteConcern {
        WriteConcern::Majority
    }

    pub fn is_journaled(&self) -> bool {
        matches!(self, WriteConcern::Journaled | WriteConcern::Majority)
    }
}

/// Replica set members a read may be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReadPreference {
    #[default]
    Primary,
    PrimaryPreferred,
    Secondary,
    SecondaryPreferred,
    Nearest,
}

impl ReadPreference {
    /// Store-native mode name.
    pub fn mode(&self) -> &'static str {
        match self {
            ReadPreference::Primary => "primary",
            ReadPreference::PrimaryPreferred => "primaryPreferred",
            ReadPreference::Secondary => "secondary",
            ReadPreference::SecondaryPreferred => "secondaryPreferred",
            ReadPreference::Nearest => "nearest",
        }
    }
}

/// Which image of the document a find-and-modify returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ReturnDocument {
    /// The document as it was before the modification.
    #[default]
    Before,
    /// The document as it is after the modification.
    After,
}

/// Options for find operations: sort, pagination, index hint and read
/// routing.
///
/// ```rust,ignore
/// let options = FindOptions::new()
///     .order_by(record![f.customer, f.total], SortOrder::Descending)
///     .skip(10)
///     .limit(20);
///
/// let options = order_by("total", SortOrder::Ascending);
/// let options = limit_to(100);
/// ```
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub(crate) sort: Option<Selector>,
    pub(crate) sort_order: SortOrder,
    pub(crate) skip: Option<u64>,
    pub(crate) limit: Option<u64>,
    pub(crate) hint: Option<String>,
    pub(crate) read_preference: Option<ReadPreference>,
}

/// Creates `FindOptions` sorted by a field or a record of fields.
pub fn order_by<S: Into<Selector>>(selector: S, sort_order: SortOrder) -> FindOptions {
    FindOptions::new().order_by(selector, sort_order)
}

pub fn skip_by(skip: u64) -> FindOptions {
    FindOptions::new().skip(skip)
}

pub fn limit_to(limit: u64) -> FindOptions {
    FindOptions::new().limit(limit)
}

impl FindOptions {
    pub fn new() -> FindOptions {
        FindOptions::default()
    }

    /// Sorts by the selected fields, all in the given direction.
    pub fn order_by<S: Into<Selector>>(mut self, selector: S, sort_order: SortOrder) -> FindOptions {
        self.sort = Some(selector.into());
        self.sort_order = sort_order;
        self
    }

    /// Appends one field to the sort and sets the direction.
    pub fn sort_by(mut self, field_name: &str, sort_order: SortOrder) -> FindOptions {
        let field = Selector::field(field_name);
        self.sort = Some(match self.sort.take() {
            None => field,
            Some(Selector::Record(mut members)) => {
                members.push(field);
                Selector::Record(members)
            }
            Some(other) => Selector::Record(vec![other, field]),
        });
        self.sort_order = sort_order;
        self
    }

    pub fn skip(mut self, skip: u64) -> FindOptions {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> FindOptions {
        self.limit = Some(limit);
        self
    }

    /// Index hint passed through to the store.
    pub fn hint(mut self, index_name: &str) -> FindOptions {
        self.hint = Some(index_name.to_string());
        self
    }

    pub fn read_preference(mut self, read_preference: ReadPreference) -> FindOptions {
        self.read_preference = Some(read_preference);
        self
    }

    pub fn get_skip(&self) -> Option<u64> {
        self.skip
    }

    pub fn get_limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn get_hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }
}

/// Options for count operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountOptions {
    pub(crate) skip: Option<u64>,
    pub(crate) limit: Option<u64>,
    pub(crate) hint: Option<String>,
    pub(crate) read_preference: Option<ReadPreference>,
}

impl CountOptions {
    pub fn new() -> CountOptions {
        CountOptions::default()
    }

    pub fn skip(mut self, skip: u64) -> CountOptions {
        self.skip = Some(skip);
        self
    }

    /// Stops counting once this many documents matched.
    pub fn limit(mut self, limit: u64) -> CountOptions {
        self.limit = Some(limit);
        self
    }

    pub fn hint(mut self, index_name: &str) -> CountOptions {
        self.hint = Some(index_name.to_string());
        self
    }

    pub fn read_preference(mut self, read_preference: ReadPreference) -> CountOptions {
        self.read_preference = Some(read_preference);
        self
    }

    pub fn get_skip(&self) -> Option<u64> {
        self.skip
    }

    pub fn get_limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn get_hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn get_read_preference(&self) -> Option<ReadPreference> {
        self.read_preference
    }
}

/// Options for update operations.
///
/// ```rust,ignore
/// // Insert if no matches found
/// let options = insert_if_absent();
/// let options = UpdateOptions::new().upsert(true).write_concern(WriteConcern::Majority);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateOptions {
    pub(crate) upsert: bool,
    pub(crate) write_concern: Option<WriteConcern>,
}

impl UpdateOptions {
    pub fn new() -> UpdateOptions {
        UpdateOptions::default()
    }

    /// Inserts a new document when nothing matches.
    pub fn upsert(mut self, upsert: bool) -> UpdateOptions {
        self.upsert = upsert;
        self
    }

    pub fn write_concern(mut self, write_concern: WriteConcern) -> UpdateOptions {
        self.write_concern = Some(write_concern);
        self
    }

    pub fn is_upsert(&self) -> bool {
        self.upsert
    }

    pub fn get_write_concern(&self) -> Option<WriteConcern> {
        self.write_concern
    }
}

/// Creates `UpdateOptions` with upsert enabled.
pub fn insert_if_absent() -> UpdateOptions {
    UpdateOptions::new().upsert(true)
}

/// Options for insert operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InsertOptions {
    pub(crate) write_concern: Option<WriteConcern>,
}

impl InsertOptions {
    pub fn new() -> InsertOptions {
        InsertOptions::default()
    }

    pub fn write_concern(mut self, write_concern: WriteConcern) -> InsertOptions {
        self.write_concern = Some(write_concern);
        self
    }

    pub fn get_write_concern(&self) -> Option<WriteConcern> {
        self.write_concern
    }
}

/// Options for delete operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteOptions {
    pub(crate) write_concern: Option<WriteConcern>,
}

impl DeleteOptions {
    pub fn new() -> DeleteOptions {
        DeleteOptions::default()
    }

    pub fn write_concern(mut self, write_concern: WriteConcern) -> DeleteOptions {
        self.write_concern = Some(write_concern);
        self
    }

    pub fn get_write_concern(&self) -> Option<WriteConcern> {
        self.write_concern
    }
}

/// Options for find-one-and-update, -replace and -delete.
///
/// By default the document is returned as it was before the modification.
#[derive(Debug, Clone, Default)]
pub struct FindOneAndModifyOptions {
    pub(crate) sort: Option<Selector>,
    pub(crate) sort_order: SortOrder,
    pub(crate) upsert: bool,
    pub(crate) return_document: ReturnDocument,
    pub(crate) write_concern: Option<WriteConcern>,
}

impl FindOneAndModifyOptions {
    pub fn new() -> FindOneAndModifyOptions {
        FindOneAndModifyOptions::default()
    }

    /// Picks the first match in this order when several documents match.
    pub fn order_by<S: Into<Selector>>(mut self, selector: S, sort_order: SortOrder) -> Self {
        self.sort = Some(selector.into());
        self.sort_order = sort_order;
        self
    }

    pub fn upsert(mut self, upsert: bool) -> Self {
        self.upsert = upsert;
        self
    }

    pub fn return_document(mut self, return_document: ReturnDocument) -> Self {
        self.return_document = return_document;
        self
    }

    pub fn write_concern(mut self, write_concern: WriteConcern) -> Self {
        self.write_concern = Some(write_concern);
        self
    }

    pub fn is_upsert(&self) -> bool {
        self.upsert
    }

    pub fn get_return_document(&self) -> ReturnDocument {
        self.return_document
    }
}
