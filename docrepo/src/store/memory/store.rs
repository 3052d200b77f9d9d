use super::MemoryCollection;
use crate::aggregate::Pipeline;
use crate::common::{atomic, Atomic, Document, ReadExecutor, Value, WriteExecutor, DOC_ID};
use crate::errors::{RepoError, RepoResult};
use crate::filter::Filter;
use crate::query::{CountOptions, ReturnDocument, WriteConcern};
use crate::store::encoding::{encode_filter, encode_find, encode_modify, encode_pipeline, encode_update};
use crate::store::{
    DeleteResult, DocumentStore, FindCommand, InsertManyResult, InsertOneResult, ModifyCommand, Namespace,
    UpdateResult,
};
use crate::update::Update;
use async_trait::async_trait;
use dashmap::DashMap;
use itertools::Itertools;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// In-memory implementation of [DocumentStore].
///
/// Collections are vectors of documents behind a `parking_lot` lock, one
/// lock per namespace. Each command holds the write lock of its namespace
/// for its whole read-modify-write, so concurrent increments on the same
/// document are serialized exactly as a store would serialize them.
///
/// There are no indexes and no persistence: every read is a full scan.
/// [MemoryStore::scanned_documents] counts the documents examined, which
/// lets tests observe short-circuiting.
///
/// ```rust,ignore
/// let store = MemoryStore::new();
/// let client = StoreClient::new("memory://test", Arc::new(store.clone()));
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore {
            inner: Arc::new(MemoryStoreInner::new()),
        }
    }

    /// Total number of documents examined by filters so far.
    pub fn scanned_documents(&self) -> u64 {
        self.inner.scanned.load(Ordering::Relaxed)
    }

    /// Number of documents currently stored in `namespace`.
    pub fn document_count(&self, namespace: &Namespace) -> usize {
        self.inner
            .collection(namespace)
            .read_with(|collection| collection.documents().len())
    }

    /// Drops every collection.
    pub fn clear(&self) {
        self.inner.collections.clear();
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert_one(
        &self,
        namespace: &Namespace,
        document: Document,
        write_concern: WriteConcern,
    ) -> RepoResult<InsertOneResult> {
        self.inner.insert_one(namespace, document, write_concern)
    }

    async fn insert_many(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
        write_concern: WriteConcern,
    ) -> RepoResult<InsertManyResult> {
        self.inner.insert_many(namespace, documents, write_concern)
    }

    async fn delete_one(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        write_concern: WriteConcern,
    ) -> RepoResult<DeleteResult> {
        self.inner.delete(namespace, filter, Some(1), write_concern)
    }

    async fn delete_many(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        write_concern: WriteConcern,
    ) -> RepoResult<DeleteResult> {
        self.inner.delete(namespace, filter, None, write_concern)
    }

    async fn update_one(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &Update,
        upsert: bool,
        write_concern: WriteConcern,
    ) -> RepoResult<UpdateResult> {
        self.inner.update(namespace, filter, update, upsert, Some(1), write_concern)
    }

    async fn update_many(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &Update,
        upsert: bool,
        write_concern: WriteConcern,
    ) -> RepoResult<UpdateResult> {
        self.inner.update(namespace, filter, update, upsert, None, write_concern)
    }

    async fn find(&self, namespace: &Namespace, command: &FindCommand) -> RepoResult<Vec<Document>> {
        self.inner.find(namespace, command)
    }

    async fn find_one_and_update(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &Update,
        command: &ModifyCommand,
    ) -> RepoResult<Option<Document>> {
        self.inner.find_one_and_update(namespace, filter, update, command)
    }

    async fn find_one_and_replace(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        replacement: Document,
        command: &ModifyCommand,
    ) -> RepoResult<Option<Document>> {
        self.inner.find_one_and_replace(namespace, filter, replacement, command)
    }

    async fn find_one_and_delete(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        command: &ModifyCommand,
    ) -> RepoResult<Option<Document>> {
        self.inner.find_one_and_delete(namespace, filter, command)
    }

    async fn count(&self, namespace: &Namespace, filter: &Filter, options: &CountOptions) -> RepoResult<u64> {
        self.inner.count(namespace, filter, options)
    }

    async fn distinct(&self, namespace: &Namespace, field: &str, filter: &Filter) -> RepoResult<Vec<Value>> {
        self.inner.distinct(namespace, field, filter)
    }

    async fn aggregate(&self, namespace: &Namespace, pipeline: &Pipeline) -> RepoResult<Vec<Document>> {
        self.inner.aggregate(namespace, pipeline)
    }
}

#[derive(Default)]
struct MemoryStoreInner {
    collections: DashMap<Namespace, Atomic<MemoryCollection>>,
    scanned: AtomicU64,
}

impl MemoryStoreInner {
    fn new() -> Self {
        MemoryStoreInner {
            collections: DashMap::new(),
            scanned: AtomicU64::new(0),
        }
    }

    fn collection(&self, namespace: &Namespace) -> Atomic<MemoryCollection> {
        if let Some(collection) = self.collections.get(namespace) {
            return collection.value().clone();
        }
        self.collections
            .entry(namespace.clone())
            .or_insert_with(|| atomic(MemoryCollection::new()))
            .value()
            .clone()
    }

    fn insert_one(
        &self,
        namespace: &Namespace,
        document: Document,
        write_concern: WriteConcern,
    ) -> RepoResult<InsertOneResult> {
        log::debug!("{} insert {} with {:?}", namespace, document, write_concern);
        let inserted_id = self.collection(namespace).write_with(|c| c.insert(document))?;
        Ok(InsertOneResult { inserted_id })
    }

    fn insert_many(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
        write_concern: WriteConcern,
    ) -> RepoResult<InsertManyResult> {
        log::debug!("{} insert {} documents with {:?}", namespace, documents.len(), write_concern);
        // ordered insert: stops at the first failure, earlier documents stay
        let inserted_ids = self.collection(namespace).write_with(|c| {
            let mut ids = Vec::with_capacity(documents.len());
            for document in documents {
                ids.push(c.insert(document)?);
            }
            Ok::<_, RepoError>(ids)
        })?;
        Ok(InsertManyResult { inserted_ids })
    }

    fn delete(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        max: Option<usize>,
        write_concern: WriteConcern,
    ) -> RepoResult<DeleteResult> {
        log::debug!("{} delete {} with {:?}", namespace, encode_filter(filter), write_concern);
        let deleted = self.collection(namespace).write_with(|c| {
            let positions = c.positions(filter, None, max, &self.scanned)?;
            Ok::<_, RepoError>(c.remove_all(&positions))
        })?;
        Ok(DeleteResult {
            deleted_count: deleted as u64,
        })
    }

    fn update(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &Update,
        upsert: bool,
        max: Option<usize>,
        write_concern: WriteConcern,
    ) -> RepoResult<UpdateResult> {
        log::debug!(
            "{} update {} with {} (upsert: {}, {:?})",
            namespace,
            encode_filter(filter),
            encode_update(update),
            upsert,
            write_concern
        );

        self.collection(namespace).write_with(|c| {
            let positions = c.positions(filter, None, max, &self.scanned)?;
            if positions.is_empty() {
                if upsert {
                    let created = c.upsert(filter, update)?;
                    return Ok(UpdateResult {
                        matched_count: 0,
                        modified_count: 0,
                        upserted_id: created.get_ref(DOC_ID).cloned(),
                    });
                }
                return Ok(UpdateResult {
                    matched_count: 0,
                    modified_count: 0,
                    upserted_id: None,
                });
            }

            let mut modified = 0;
            for position in positions.iter() {
                if c.update_at(*position, update)? {
                    modified += 1;
                }
            }
            Ok(UpdateResult {
                matched_count: positions.len() as u64,
                modified_count: modified,
                upserted_id: None,
            })
        })
    }

    fn find(&self, namespace: &Namespace, command: &FindCommand) -> RepoResult<Vec<Document>> {
        log::debug!("{} find {}", namespace, encode_find(command));
        let skip = command.skip.unwrap_or(0);
        let max = scan_bound(command.limit, skip);

        self.collection(namespace).read_with(|c| {
            let positions = c.positions(&command.filter, command.sort.as_ref(), max, &self.scanned)?;
            let documents = positions
                .into_iter()
                .skip(to_usize(skip))
                .filter_map(|position| c.get(position))
                .map(|document| match &command.projection {
                    Some(projection) => projection.apply(document),
                    None => document.clone(),
                })
                .collect();
            Ok(documents)
        })
    }

    fn find_one_and_update(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &Update,
        command: &ModifyCommand,
    ) -> RepoResult<Option<Document>> {
        let encoded = Value::Document(encode_update(update));
        log::debug!("{} findAndModify {}", namespace, encode_modify(filter, Some(encoded), command));

        self.collection(namespace).write_with(|c| {
            let positions = c.positions(filter, command.sort.as_ref(), Some(1), &self.scanned)?;
            let result = match positions.first() {
                Some(position) => {
                    let before = c.get(*position).cloned();
                    c.update_at(*position, update)?;
                    match command.return_document {
                        ReturnDocument::Before => before,
                        ReturnDocument::After => c.get(*position).cloned(),
                    }
                }
                None if command.upsert => {
                    let created = c.upsert(filter, update)?;
                    match command.return_document {
                        ReturnDocument::Before => None,
                        ReturnDocument::After => Some(created),
                    }
                }
                None => None,
            };
            Ok(project(result, command))
        })
    }

    fn find_one_and_replace(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        replacement: Document,
        command: &ModifyCommand,
    ) -> RepoResult<Option<Document>> {
        log::debug!(
            "{} findAndModify {}",
            namespace,
            encode_modify(filter, Some(Value::Document(replacement.clone())), command)
        );

        self.collection(namespace).write_with(|c| {
            let positions = c.positions(filter, command.sort.as_ref(), Some(1), &self.scanned)?;
            let result = match positions.first() {
                Some(position) => {
                    let before = c.get(*position).cloned();
                    c.replace_at(*position, replacement)?;
                    match command.return_document {
                        ReturnDocument::Before => before,
                        ReturnDocument::After => c.get(*position).cloned(),
                    }
                }
                None if command.upsert => {
                    let created = c.upsert_replacement(filter, replacement)?;
                    match command.return_document {
                        ReturnDocument::Before => None,
                        ReturnDocument::After => Some(created),
                    }
                }
                None => None,
            };
            Ok(project(result, command))
        })
    }

    fn find_one_and_delete(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        command: &ModifyCommand,
    ) -> RepoResult<Option<Document>> {
        log::debug!("{} findAndModify {}", namespace, encode_modify(filter, None, command));

        self.collection(namespace).write_with(|c| {
            let positions = c.positions(filter, command.sort.as_ref(), Some(1), &self.scanned)?;
            let removed = positions.first().map(|position| c.remove_at(*position));
            Ok(project(removed, command))
        })
    }

    fn count(&self, namespace: &Namespace, filter: &Filter, options: &CountOptions) -> RepoResult<u64> {
        log::debug!("{} count {} with {:?}", namespace, encode_filter(filter), options);
        let skip = options.get_skip().unwrap_or(0);
        let max = scan_bound(options.get_limit(), skip);

        self.collection(namespace).read_with(|c| {
            let matched = c.positions(filter, None, max, &self.scanned)?.len();
            Ok(matched.saturating_sub(to_usize(skip)) as u64)
        })
    }

    fn distinct(&self, namespace: &Namespace, field: &str, filter: &Filter) -> RepoResult<Vec<Value>> {
        log::debug!("{} distinct {} over {}", namespace, field, encode_filter(filter));
        self.collection(namespace).read_with(|c| {
            let positions = c.positions(filter, None, None, &self.scanned)?;
            let values = positions
                .into_iter()
                .filter_map(|position| c.get(position).and_then(|doc| doc.lookup(field)))
                .flat_map(|value| match value {
                    Value::Array(items) => items,
                    other => vec![other],
                })
                .unique()
                .collect();
            Ok(values)
        })
    }

    fn aggregate(&self, namespace: &Namespace, pipeline: &Pipeline) -> RepoResult<Vec<Document>> {
        log::debug!(
            "{} aggregate [{}]",
            namespace,
            encode_pipeline(pipeline).iter().join(", ")
        );
        let documents = self.collection(namespace).read_with(|c| {
            let count = c.documents().len() as u64;
            self.scanned.fetch_add(count, Ordering::Relaxed);
            c.documents().to_vec()
        });
        pipeline.evaluate(documents)
    }
}

fn project(document: Option<Document>, command: &ModifyCommand) -> Option<Document> {
    match (&command.projection, document) {
        (Some(projection), Some(document)) => Some(projection.apply(&document)),
        (_, document) => document,
    }
}

/// Documents to scan for `skip` plus a positive `limit`; `None` scans all.
fn scan_bound(limit: Option<u64>, skip: u64) -> Option<usize> {
    limit
        .filter(|limit| *limit > 0)
        .map(|limit| to_usize(limit.saturating_add(skip)))
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}
