use crate::common::{Document, ObjectId, Value, DOC_ID};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::filter::Filter;
use crate::query::SortSpec;
use crate::update::Update;
use std::sync::atomic::{AtomicU64, Ordering};

/// The documents of one namespace, in insertion order.
///
/// Every method runs under the caller's collection lock, so each one is a
/// single atomic step as seen by other callers.
#[derive(Debug, Default)]
pub(crate) struct MemoryCollection {
    documents: Vec<Document>,
}

impl MemoryCollection {
    pub(crate) fn new() -> Self {
        MemoryCollection {
            documents: Vec::new(),
        }
    }

    pub(crate) fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub(crate) fn get(&self, position: usize) -> Option<&Document> {
        self.documents.get(position)
    }

    /// Positions of the matching documents, in `sort` order when given
    /// and insertion order otherwise. Stops after `max` matches when no
    /// sort is requested.
    pub(crate) fn positions(
        &self,
        filter: &Filter,
        sort: Option<&SortSpec>,
        max: Option<usize>,
        scanned: &AtomicU64,
    ) -> RepoResult<Vec<usize>> {
        let mut positions = Vec::new();
        for (position, document) in self.documents.iter().enumerate() {
            if sort.is_none() && max.is_some_and(|max| positions.len() >= max) {
                break;
            }
            scanned.fetch_add(1, Ordering::Relaxed);
            if filter.apply(document)? {
                positions.push(position);
            }
        }

        if let Some(sort) = sort {
            positions.sort_by(|a, b| sort.compare(&self.documents[*a], &self.documents[*b]));
            if let Some(max) = max {
                positions.truncate(max);
            }
        }
        Ok(positions)
    }

    /// Appends a document, generating an object id when `_id` is missing.
    pub(crate) fn insert(&mut self, document: Document) -> RepoResult<Value> {
        let document = ensure_id(document);
        let id = document.get(DOC_ID)?;
        if self.contains_id(&id) {
            log::error!("Duplicate key {} on insert", id);
            return Err(RepoError::new(
                &format!("duplicate key error: _id {}", id),
                ErrorKind::DuplicateKey,
            ));
        }
        self.documents.push(document);
        Ok(id)
    }

    /// Applies `update` to the document at `position`. Returns whether the
    /// document changed.
    pub(crate) fn update_at(&mut self, position: usize, update: &Update) -> RepoResult<bool> {
        let current = match self.documents.get(position) {
            Some(document) => document,
            None => return Ok(false),
        };

        let mut updated = current.clone();
        update.apply(&mut updated, false)?;
        check_id_unchanged(current, &updated)?;

        let modified = &updated != current;
        self.documents[position] = updated;
        Ok(modified)
    }

    /// Replaces the document at `position`, keeping its `_id` first.
    pub(crate) fn replace_at(&mut self, position: usize, replacement: Document) -> RepoResult<()> {
        let current = match self.documents.get(position) {
            Some(document) => document,
            None => return Ok(()),
        };

        let id = current.get(DOC_ID)?;
        if let Some(new_id) = replacement.get_ref(DOC_ID) {
            if new_id != &id {
                log::error!("Replacement changes _id from {} to {}", id, new_id);
                return Err(RepoError::new(
                    "the (immutable) field '_id' was found to have been altered",
                    ErrorKind::ImmutableField,
                ));
            }
        }

        self.documents[position] = with_id_first(id, replacement);
        Ok(())
    }

    pub(crate) fn remove_at(&mut self, position: usize) -> Document {
        self.documents.remove(position)
    }

    /// Removes the documents at `positions`, which must be ascending.
    pub(crate) fn remove_all(&mut self, positions: &[usize]) -> usize {
        for position in positions.iter().rev() {
            self.documents.remove(*position);
        }
        positions.len()
    }

    /// Inserts the document an upsert creates when nothing matched: the
    /// top level equality terms of `filter`, then `update` in inserting
    /// mode.
    pub(crate) fn upsert(&mut self, filter: &Filter, update: &Update) -> RepoResult<Document> {
        let mut document = seed(filter)?;
        update.apply(&mut document, true)?;
        let document = ensure_id(document);
        self.insert(document.clone())?;
        Ok(document)
    }

    /// Inserts a replacement when nothing matched, taking its `_id` from
    /// the replacement, then from the filter.
    pub(crate) fn upsert_replacement(&mut self, filter: &Filter, replacement: Document) -> RepoResult<Document> {
        let document = match replacement.get_ref(DOC_ID) {
            Some(_) => replacement,
            None => match seed(filter)?.get_ref(DOC_ID) {
                Some(id) => with_id_first(id.clone(), replacement),
                None => ensure_id(replacement),
            },
        };
        self.insert(document.clone())?;
        Ok(document)
    }

    fn contains_id(&self, id: &Value) -> bool {
        self.documents
            .iter()
            .any(|doc| doc.get_ref(DOC_ID).is_some_and(|it| it == id))
    }
}

fn seed(filter: &Filter) -> RepoResult<Document> {
    let mut document = Document::new();
    for (field, value) in filter.equality_terms() {
        document.put(field, value.clone())?;
    }
    Ok(document)
}

fn ensure_id(document: Document) -> Document {
    match document.get_ref(DOC_ID) {
        Some(id) if !id.is_null() => {
            let id = id.clone();
            with_id_first(id, document)
        }
        _ => with_id_first(Value::ObjectId(ObjectId::new()), document),
    }
}

fn with_id_first(id: Value, document: Document) -> Document {
    let mut ordered = Document::new();
    ordered.insert(DOC_ID, id);
    for (key, value) in document {
        if key != DOC_ID {
            ordered.insert(key, value);
        }
    }
    ordered
}

fn check_id_unchanged(before: &Document, after: &Document) -> RepoResult<()> {
    if before.get_ref(DOC_ID) != after.get_ref(DOC_ID) {
        log::error!(
            "Update changes _id from {:?} to {:?}",
            before.get_ref(DOC_ID),
            after.get_ref(DOC_ID)
        );
        return Err(RepoError::new(
            "performing an update on the path '_id' would modify the immutable field '_id'",
            ErrorKind::ImmutableField,
        ));
    }
    Ok(())
}
