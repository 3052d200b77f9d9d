use crate::aggregate::Pipeline;
use crate::common::{Document, Value};
use crate::errors::RepoResult;
use crate::filter::Filter;
use crate::query::{CountOptions, ProjectionSpec, ReadPreference, ReturnDocument, SortSpec, WriteConcern};
use crate::update::Update;
use async_trait::async_trait;
use std::fmt::Display;

/// Database and collection a command targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    database: String,
    collection: String,
}

impl Namespace {
    pub fn new(database: &str, collection: &str) -> Self {
        Namespace {
            database: database.to_string(),
            collection: collection.to_string(),
        }
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// A fully translated find: physical field names only.
#[derive(Debug, Clone, PartialEq)]
pub struct FindCommand {
    pub filter: Filter,
    pub sort: Option<SortSpec>,
    pub projection: Option<ProjectionSpec>,
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub hint: Option<String>,
    pub read_preference: ReadPreference,
}

impl FindCommand {
    pub fn new(filter: Filter) -> Self {
        FindCommand {
            filter,
            sort: None,
            projection: None,
            skip: None,
            limit: None,
            hint: None,
            read_preference: ReadPreference::Primary,
        }
    }
}

/// A fully translated find-one-and-{update,replace,delete}.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyCommand {
    pub sort: Option<SortSpec>,
    pub projection: Option<ProjectionSpec>,
    pub upsert: bool,
    pub return_document: ReturnDocument,
    pub write_concern: WriteConcern,
}

impl Default for ModifyCommand {
    fn default() -> Self {
        ModifyCommand {
            sort: None,
            projection: None,
            upsert: false,
            return_document: ReturnDocument::Before,
            write_concern: WriteConcern::W1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertOneResult {
    pub inserted_id: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InsertManyResult {
    pub inserted_ids: Vec<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteResult {
    pub deleted_count: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateResult {
    pub matched_count: u64,
    pub modified_count: u64,
    /// Stored `_id` of the document an upsert inserted.
    pub upserted_id: Option<Value>,
}

/// The boundary to a document store.
///
/// Implementations speak the store's protocol; every argument arrives fully
/// translated (physical field names, resolved write concern). Each method
/// maps to exactly one store command. Implementations must not retry.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_one(
        &self,
        namespace: &Namespace,
        document: Document,
        write_concern: WriteConcern,
    ) -> RepoResult<InsertOneResult>;

    async fn insert_many(
        &self,
        namespace: &Namespace,
        documents: Vec<Document>,
        write_concern: WriteConcern,
    ) -> RepoResult<InsertManyResult>;

    async fn delete_one(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        write_concern: WriteConcern,
    ) -> RepoResult<DeleteResult>;

    async fn delete_many(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        write_concern: WriteConcern,
    ) -> RepoResult<DeleteResult>;

    async fn update_one(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &Update,
        upsert: bool,
        write_concern: WriteConcern,
    ) -> RepoResult<UpdateResult>;

    async fn update_many(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &Update,
        upsert: bool,
        write_concern: WriteConcern,
    ) -> RepoResult<UpdateResult>;

    async fn find(&self, namespace: &Namespace, command: &FindCommand) -> RepoResult<Vec<Document>>;

    async fn find_one_and_update(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        update: &Update,
        command: &ModifyCommand,
    ) -> RepoResult<Option<Document>>;

    async fn find_one_and_replace(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        replacement: Document,
        command: &ModifyCommand,
    ) -> RepoResult<Option<Document>>;

    async fn find_one_and_delete(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        command: &ModifyCommand,
    ) -> RepoResult<Option<Document>>;

    /// Counts matches; with a limit, stops once the limit is reached.
    async fn count(
        &self,
        namespace: &Namespace,
        filter: &Filter,
        options: &CountOptions,
    ) -> RepoResult<u64>;

    async fn distinct(
        &self,
        namespace: &Namespace,
        field: &str,
        filter: &Filter,
    ) -> RepoResult<Vec<Value>>;

    async fn aggregate(&self, namespace: &Namespace, pipeline: &Pipeline) -> RepoResult<Vec<Document>>;
}
