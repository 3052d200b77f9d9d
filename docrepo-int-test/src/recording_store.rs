use async_trait::async_trait;
use docrepo::aggregate::Pipeline;
use docrepo::common::{Document, Value};
use docrepo::errors::RepoResult;
use docrepo::filter::Filter;
use docrepo::query::{CountOptions, WriteConcern};
use docrepo::store::encoding::{
    encode_filter, encode_find, encode_modify, encode_pipeline, encode_update, encode_write_concern,
};
use docrepo::store::{
    DeleteResult, DocumentStore, FindCommand, InsertManyResult, InsertOneResult, ModifyCommand, Namespace,
    UpdateResult,
};
use docrepo::update::Update;
use parking_lot::Mutex;
use std::sync::Arc;

/// One command as it reached the store, in store-native form. The first
/// key of `command` names the operation (`insert`, `findAndModify`, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct StoreCall {
    pub namespace: Namespace,
    pub command: Document,
}

impl StoreCall {
    pub fn operation(&self) -> &str {
        self.command.keys().next().map(|key| key.as_str()).unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Value {
        self.command.get(key).unwrap_or(Value::Null)
    }
}

/// A [DocumentStore] that records every command before passing it on.
#[derive(Clone)]
pub struct RecordingStore {
    inner: Arc<dyn DocumentStore>,
    calls: Arc<Mutex<Vec<StoreCall>>>,
}

impl RecordingStore {
    pub fn new(inner: Arc<dyn DocumentStore>) -> Self {
        RecordingStore {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    /// Calls of one operation, optionally on one collection only.
    pub fn calls_of(&self, operation: &str, collection: Option<&str>) -> Vec<StoreCall> {
        self.calls
            .lock()
            .iter()
            .filter(|call| call.operation() == operation)
            .filter(|call| collection.map_or(true, |c| call.namespace.collection() == c))
            .cloned()
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn reset(&self) {
        self.calls.lock().clear();
    }

    fn record(&self, namespace: &Namespace, operation: &str, body: Document) {
        let mut command = Document::new();
        command.insert(operation, namespace.collection());
        command.merge(&body);
        log::debug!("recorded {} on {}: {}", operation, namespace, command);
        self.calls.lock().push(StoreCall {
            namespace: namespace.clone(),
            command,
        });
    }
}

fn body(entries: Vec<(&str, Value)>) -> Document {
    let mut document = Document::new();
    for (key, value) in entries {
        document.insert(key, value);
    }
    document
}

#[async_trait]
impl DocumentStore for RecordingStore {
    async fn insert_one(
        &self,
        namespace: &Namespace,
        document: Document,
        write_concern: WriteConcern,
    ) -> RepoResult<InsertOneResult> {
        self.record(
            namespace,
            "insert",
            body(vec![
                ("documents", Value::Array(vec![Value::Document(document.clone())])),
                ("writeConcern", Value::Document(encode_write_concern(write_concern))),
            ]),
        );
        self.inner.insert_one(namespace, document, write_concern).await
    }

    async fn insert_many(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
        write_concern: WriteConcern,
    ) -> RepoResult<InsertManyResult> {
        let encoded = documents.iter().cloned().map(Value::Document).collect();
        self.record(
            namespace,
            "insert",
            body(vec![
                ("documents", Value::Array(encoded)),
                ("writeConcern", Value::Document(encode_write_concern(write_concern))),
            ]),
        );
        self.inner.insert_many(namespace, documents, write_concern).await
    }

    async fn delete_one(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        write_concern: WriteConcern,
    ) -> RepoResult<DeleteResult> {
        self.record(
            namespace,
            "delete",
            body(vec![
                ("q", Value::Document(encode_filter(filter))),
                ("limit", Value::I32(1)),
                ("writeConcern", Value::Document(encode_write_concern(write_concern))),
            ]),
        );
        self.inner.delete_one(namespace, filter, write_concern).await
    }

    async fn delete_many(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        write_concern: WriteConcern,
    ) -> RepoResult<DeleteResult> {
        self.record(
            namespace,
            "delete",
            body(vec![
                ("q", Value::Document(encode_filter(filter))),
                ("limit", Value::I32(0)),
                ("writeConcern", Value::Document(encode_write_concern(write_concern))),
            ]),
        );
        self.inner.delete_many(namespace, filter, write_concern).await
    }

    async fn update_one(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &Update,
        upsert: bool,
        write_concern: WriteConcern,
    ) -> RepoResult<UpdateResult> {
        self.record(
            namespace,
            "update",
            body(vec![
                ("q", Value::Document(encode_filter(filter))),
                ("u", Value::Document(encode_update(update))),
                ("upsert", Value::Bool(upsert)),
                ("multi", Value::Bool(false)),
                ("writeConcern", Value::Document(encode_write_concern(write_concern))),
            ]),
        );
        self.inner
            .update_one(namespace, filter, update, upsert, write_concern)
            .await
    }

    async fn update_many(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &Update,
        upsert: bool,
        write_concern: WriteConcern,
    ) -> RepoResult<UpdateResult> {
        self.record(
            namespace,
            "update",
            body(vec![
                ("q", Value::Document(encode_filter(filter))),
                ("u", Value::Document(encode_update(update))),
                ("upsert", Value::Bool(upsert)),
                ("multi", Value::Bool(true)),
                ("writeConcern", Value::Document(encode_write_concern(write_concern))),
            ]),
        );
        self.inner
            .update_many(namespace, filter, update, upsert, write_concern)
            .await
    }

    async fn find(&self, namespace: &Namespace, command: &FindCommand) -> RepoResult<Vec<Document>> {
        self.record(namespace, "find", encode_find(command));
        self.inner.find(namespace, command).await
    }

    async fn find_one_and_update(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &Update,
        command: &ModifyCommand,
    ) -> RepoResult<Option<Document>> {
        let encoded = Value::Document(encode_update(update));
        self.record(namespace, "findAndModify", encode_modify(filter, Some(encoded), command));
        self.inner
            .find_one_and_update(namespace, filter, update, command)
            .await
    }

    async fn find_one_and_replace(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        replacement: Document,
        command: &ModifyCommand,
    ) -> RepoResult<Option<Document>> {
        let encoded = Value::Document(replacement.clone());
        self.record(namespace, "findAndModify", encode_modify(filter, Some(encoded), command));
        self.inner
            .find_one_and_replace(namespace, filter, replacement, command)
            .await
    }

    async fn find_one_and_delete(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        command: &ModifyCommand,
    ) -> RepoResult<Option<Document>> {
        self.record(namespace, "findAndModify", encode_modify(filter, None, command));
        self.inner.find_one_and_delete(namespace, filter, command).await
    }

    async fn count(&self, namespace: &Namespace, filter: &Filter, options: &CountOptions) -> RepoResult<u64> {
        let mut entries = vec![("query", Value::Document(encode_filter(filter)))];
        if let Some(limit) = options.get_limit() {
            entries.push(("limit", Value::I64(limit as i64)));
        }
        if let Some(skip) = options.get_skip() {
            entries.push(("skip", Value::I64(skip as i64)));
        }
        if let Some(hint) = options.get_hint() {
            entries.push(("hint", Value::from(hint)));
        }
        self.record(namespace, "count", body(entries));
        self.inner.count(namespace, filter, options).await
    }

    async fn distinct(&self, namespace: &Namespace, field: &str, filter: &Filter) -> RepoResult<Vec<Value>> {
        self.record(
            namespace,
            "distinct",
            body(vec![
                ("key", Value::from(field)),
                ("query", Value::Document(encode_filter(filter))),
            ]),
        );
        self.inner.distinct(namespace, field, filter).await
    }

    async fn aggregate(&self, namespace: &Namespace, pipeline: &Pipeline) -> RepoResult<Vec<Document>> {
        let stages = encode_pipeline(pipeline).into_iter().map(Value::Document).collect();
        self.record(namespace, "aggregate", body(vec![("pipeline", Value::Array(stages))]));
        self.inner.aggregate(namespace, pipeline).await
    }
}
