use crate::aggregate::{Group, Pipeline};
use crate::common::{Convertible, Document, Value};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::filter::{Filter, Predicate};
use crate::query::{
    id_filter, physical_field, translate_count, translate_field, translate_filter, translate_find, translate_modify,
    translate_pipeline, translate_projection, translate_sort, translate_update, CountOptions, DeleteOptions,
    FindOneAndModifyOptions, FindOptions, InsertOptions, ProjectionSpec, ReadPreference, Selector, UpdateOptions,
    WriteConcern,
};
use crate::repository::{
    from_document, from_documents, from_values, to_document, to_documents, Capability, Entity, EntityKey,
    RepositoryConfig,
};
use crate::sequence::SequenceAllocator;
use crate::store::{DeleteResult, DocumentStore, Namespace, StoreClient, UpdateResult};
use crate::update::{synthesize, Update, UpdateBuilder};
use std::fmt::Debug;
use std::sync::Arc;

/// Typed, asynchronous access to the collection of entity `E`.
///
/// A repository is a cheap handle: clones share the same client,
/// namespace and allocator. It holds no lock and no cache, so it can be
/// used from any number of tasks at once.
///
/// Filters may be given as a [Filter] built with the fluent API, as
/// `None` to match every document, or as a typed predicate through the
/// `*_by` methods.
///
/// ```rust,ignore
/// let orders: Repository<Order> = RepositoryBuilder::new().database("shop").open()?;
///
/// let order = orders.insert(Order::new("alice", 12.5), InsertOptions::new()).await?;
/// let found = orders.get_by_id(&order.id).await?;
/// let big = orders.get_list_by(|f| f.total.gt(100.0), FindOptions::new()).await?;
/// orders
///     .update_one_with(by_id(order.id), |u, f| u.set(f.status, "paid"), UpdateOptions::new())
///     .await?;
/// ```
pub struct Repository<E: Entity> {
    inner: Arc<RepositoryInner<E>>,
}

struct RepositoryInner<E: Entity> {
    client: StoreClient,
    namespace: Namespace,
    allocator: SequenceAllocator,
    capability: Capability<E>,
    write_concern: WriteConcern,
    read_preference: ReadPreference,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Repository {
            inner: self.inner.clone(),
        }
    }
}

impl<E: Entity> Debug for Repository<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("namespace", &self.inner.namespace)
            .field("capability", &self.inner.capability)
            .finish()
    }
}

impl<E: Entity> Repository<E> {
    /// Opens the repository of `E` over `client`. See
    /// [crate::repository::RepositoryBuilder] for the usual entry point.
    pub fn new(client: StoreClient, config: &RepositoryConfig) -> RepoResult<Repository<E>> {
        config.validate()?;
        let database = config.database().unwrap_or_default();
        let collection = config.collection_for::<E>();
        let namespace = Namespace::new(database, &collection);
        let allocator = SequenceAllocator::new(client.clone(), database, config.sequence_collection());
        let capability = E::capability();

        log::info!(
            "Opened repository of {} on {} ({:?}) at {}",
            E::entity_name(),
            namespace,
            capability,
            client.endpoint()
        );

        Ok(Repository {
            inner: Arc::new(RepositoryInner {
                client,
                namespace,
                allocator,
                capability,
                write_concern: config.write_concern(),
                read_preference: config.read_preference(),
            }),
        })
    }

    pub fn collection_name(&self) -> &str {
        self.inner.namespace.collection()
    }

    pub fn database_name(&self) -> &str {
        self.inner.namespace.database()
    }

    pub fn namespace(&self) -> &Namespace {
        &self.inner.namespace
    }

    pub fn client(&self) -> &StoreClient {
        &self.inner.client
    }

    pub fn allocator(&self) -> &SequenceAllocator {
        &self.inner.allocator
    }

    /// Inserts one entity and returns it with its identity filled in.
    ///
    /// Auto-increment entities always receive the next id of their
    /// sequence, whatever they carried. Other entities keep the identity
    /// they carry; an absent one is generated for object-id keys and is an
    /// [ErrorKind::InvalidId] otherwise.
    pub async fn insert(&self, entity: E, options: InsertOptions) -> RepoResult<E> {
        let mut entity = entity;
        match self.inner.capability {
            Capability::AutoIncrement(assign) => {
                let id = self.inner.allocator.allocate_id(self.sequence_name()).await?;
                assign(&mut entity, id);
            }
            Capability::Plain => assign_plain_key(&mut entity)?,
        }

        let document = to_document(&entity)?;
        let write_concern = self.write_concern(options.write_concern);
        self.store()
            .insert_one(&self.inner.namespace, document, write_concern)
            .await?;
        Ok(entity)
    }

    /// Inserts a batch in order. Auto-increment entities share a single
    /// range reservation and receive its ids in ascending iteration order.
    /// An empty batch does nothing.
    pub async fn insert_many(&self, entities: Vec<E>, options: InsertOptions) -> RepoResult<Vec<E>> {
        if entities.is_empty() {
            return Ok(entities);
        }

        let mut entities = entities;
        match self.inner.capability {
            Capability::AutoIncrement(assign) => {
                let first = self
                    .inner
                    .allocator
                    .allocate_range(self.sequence_name(), entities.len() as i64)
                    .await?;
                for (offset, entity) in entities.iter_mut().enumerate() {
                    assign(entity, first + offset as i64);
                }
            }
            Capability::Plain => {
                for entity in entities.iter_mut() {
                    assign_plain_key(entity)?;
                }
            }
        }

        let documents = to_documents(&entities)?;
        let write_concern = self.write_concern(options.write_concern);
        self.store()
            .insert_many(&self.inner.namespace, documents, write_concern)
            .await?;
        Ok(entities)
    }

    /// First entity matching `filter`, in the order of `options`.
    pub async fn get(&self, filter: impl Into<Option<Filter>>, options: FindOptions) -> RepoResult<Option<E>> {
        let command = translate_find::<E>(filter.into(), options.limit(1), None, self.inner.read_preference)?;
        let documents = self.store().find(&self.inner.namespace, &command).await?;
        self.entity_of(documents.into_iter().next())
    }

    pub async fn get_by<P>(&self, predicate: P, options: FindOptions) -> RepoResult<Option<E>>
    where
        P: FnOnce(&E::Fields) -> Predicate<E>,
    {
        let filter = predicate(&E::fields()).into_filter()?;
        self.get(filter, options).await
    }

    pub async fn get_by_id(&self, key: &E::Key) -> RepoResult<Option<E>> {
        let filter = id_filter::<E>(key)?;
        self.get(filter, FindOptions::new()).await
    }

    pub async fn get_list(&self, filter: impl Into<Option<Filter>>, options: FindOptions) -> RepoResult<Vec<E>> {
        self.find::<E>(filter.into(), options, None).await
    }

    pub async fn get_list_by<P>(&self, predicate: P, options: FindOptions) -> RepoResult<Vec<E>>
    where
        P: FnOnce(&E::Fields) -> Predicate<E>,
    {
        let filter = predicate(&E::fields()).into_filter()?;
        self.find::<E>(Some(filter), options, None).await
    }

    /// Reads only the selected fields and maps them into `R`, which may be
    /// `E` itself (unselected fields take their defaults) or any other
    /// [Convertible] with matching field names.
    ///
    /// The selector must be a record of declared fields, such as
    /// `|f| record![f.customer, f.total]`; anything else fails with
    /// [ErrorKind::InvalidProjectionExpression] before the store is
    /// contacted.
    pub async fn get_projected<R, S>(
        &self,
        filter: impl Into<Option<Filter>>,
        selector: S,
        options: FindOptions,
    ) -> RepoResult<Vec<R>>
    where
        R: Convertible<Output = R>,
        S: FnOnce(&E::Fields) -> Selector,
    {
        let projection = translate_projection::<E>(selector(&E::fields()))?;
        self.find::<R>(filter.into(), options, Some(projection)).await
    }

    pub async fn delete_one(&self, filter: impl Into<Option<Filter>>, options: DeleteOptions) -> RepoResult<DeleteResult> {
        let filter = translate_filter::<E>(filter.into());
        let write_concern = self.write_concern(options.write_concern);
        self.store()
            .delete_one(&self.inner.namespace, &filter, write_concern)
            .await
    }

    pub async fn delete_many(&self, filter: impl Into<Option<Filter>>, options: DeleteOptions) -> RepoResult<DeleteResult> {
        let filter = translate_filter::<E>(filter.into());
        let write_concern = self.write_concern(options.write_concern);
        self.store()
            .delete_many(&self.inner.namespace, &filter, write_concern)
            .await
    }

    pub async fn delete_by_id(&self, key: &E::Key, options: DeleteOptions) -> RepoResult<DeleteResult> {
        let filter = id_filter::<E>(key)?;
        self.delete_one(filter, options).await
    }

    pub async fn update_one(
        &self,
        filter: impl Into<Option<Filter>>,
        update: Update,
        options: UpdateOptions,
    ) -> RepoResult<UpdateResult> {
        let filter = translate_filter::<E>(filter.into());
        let update = self.checked_update(update)?;
        let write_concern = self.write_concern(options.write_concern);
        self.store()
            .update_one(&self.inner.namespace, &filter, &update, options.upsert, write_concern)
            .await
    }

    pub async fn update_many(
        &self,
        filter: impl Into<Option<Filter>>,
        update: Update,
        options: UpdateOptions,
    ) -> RepoResult<UpdateResult> {
        let filter = translate_filter::<E>(filter.into());
        let update = self.checked_update(update)?;
        let write_concern = self.write_concern(options.write_concern);
        self.store()
            .update_many(&self.inner.namespace, &filter, &update, options.upsert, write_concern)
            .await
    }

    /// [Repository::update_one] with an update built over typed fields.
    pub async fn update_one_with<B>(
        &self,
        filter: impl Into<Option<Filter>>,
        build: B,
        options: UpdateOptions,
    ) -> RepoResult<UpdateResult>
    where
        B: FnOnce(UpdateBuilder<E>, &E::Fields) -> UpdateBuilder<E>,
    {
        let update = build(UpdateBuilder::new(), &E::fields()).build()?;
        self.update_one(filter, update, options).await
    }

    pub async fn update_many_with<B>(
        &self,
        filter: impl Into<Option<Filter>>,
        build: B,
        options: UpdateOptions,
    ) -> RepoResult<UpdateResult>
    where
        B: FnOnce(UpdateBuilder<E>, &E::Fields) -> UpdateBuilder<E>,
    {
        let update = build(UpdateBuilder::new(), &E::fields()).build()?;
        self.update_many(filter, update, options).await
    }

    /// Overwrites every field of the first match with the fields of
    /// `entity`. The stored identity is never changed; an auto-increment
    /// upsert gives an inserted document a fresh id.
    pub async fn update_entity(
        &self,
        filter: impl Into<Option<Filter>>,
        entity: &E,
        options: UpdateOptions,
    ) -> RepoResult<UpdateResult> {
        let update = synthesize(entity, options.upsert, &self.inner.allocator, self.sequence_name()).await?;
        self.update_one(filter, update, options).await
    }

    /// Updates the first match and returns it, as it was before the update
    /// unless the options ask for the updated document.
    pub async fn find_one_and_update(
        &self,
        filter: impl Into<Option<Filter>>,
        update: Update,
        options: FindOneAndModifyOptions,
    ) -> RepoResult<Option<E>> {
        let filter = translate_filter::<E>(filter.into());
        let update = self.checked_update(update)?;
        let command = translate_modify::<E>(options, self.inner.write_concern, None)?;
        let document = self
            .store()
            .find_one_and_update(&self.inner.namespace, &filter, &update, &command)
            .await?;
        self.entity_of(document)
    }

    pub async fn find_one_and_update_with<B>(
        &self,
        filter: impl Into<Option<Filter>>,
        build: B,
        options: FindOneAndModifyOptions,
    ) -> RepoResult<Option<E>>
    where
        B: FnOnce(UpdateBuilder<E>, &E::Fields) -> UpdateBuilder<E>,
    {
        let update = build(UpdateBuilder::new(), &E::fields()).build()?;
        self.find_one_and_update(filter, update, options).await
    }

    /// [Repository::find_one_and_update] with the update synthesized from
    /// `entity`, as in [Repository::update_entity].
    pub async fn find_one_and_update_entity(
        &self,
        filter: impl Into<Option<Filter>>,
        entity: &E,
        options: FindOneAndModifyOptions,
    ) -> RepoResult<Option<E>> {
        let update = synthesize(entity, options.upsert, &self.inner.allocator, self.sequence_name()).await?;
        self.find_one_and_update(filter, update, options).await
    }

    /// Replaces the first match with `entity`.
    ///
    /// The replacement carries the entity's identity when it has one. An
    /// auto-increment entity replaced with upsert goes through
    /// [Repository::find_one_and_update_entity] instead, whatever id it
    /// holds: a matched document keeps its id and an inserted one gets a
    /// fresh id.
    pub async fn find_one_and_replace(
        &self,
        filter: impl Into<Option<Filter>>,
        entity: E,
        options: FindOneAndModifyOptions,
    ) -> RepoResult<Option<E>> {
        if options.upsert && self.inner.capability.is_auto_increment() {
            return self.find_one_and_update_entity(filter, &entity, options).await;
        }

        let filter = translate_filter::<E>(filter.into());
        let replacement = to_document(&entity)?;
        let command = translate_modify::<E>(options, self.inner.write_concern, None)?;
        let document = self
            .store()
            .find_one_and_replace(&self.inner.namespace, &filter, replacement, &command)
            .await?;
        self.entity_of(document)
    }

    /// Deletes the first match, in the order of `options`, and returns it.
    pub async fn find_one_and_delete(
        &self,
        filter: impl Into<Option<Filter>>,
        options: FindOneAndModifyOptions,
    ) -> RepoResult<Option<E>> {
        let filter = translate_filter::<E>(filter.into());
        let command = translate_modify::<E>(options, self.inner.write_concern, None)?;
        let document = self
            .store()
            .find_one_and_delete(&self.inner.namespace, &filter, &command)
            .await?;
        self.entity_of(document)
    }

    pub async fn count(&self, filter: impl Into<Option<Filter>>, options: CountOptions) -> RepoResult<u64> {
        let filter = translate_filter::<E>(filter.into());
        let options = translate_count(options, self.inner.read_preference);
        self.store().count(&self.inner.namespace, &filter, &options).await
    }

    /// Whether anything matches. Counts with a limit of one, so the store
    /// stops at the first match.
    pub async fn exists(&self, filter: impl Into<Option<Filter>>, options: CountOptions) -> RepoResult<bool> {
        let options = CountOptions { skip: None, ..options }.limit(1);
        Ok(self.count(filter, options).await? > 0)
    }

    /// Distinct values of `field` over the matches; array values
    /// contribute their elements.
    pub async fn distinct<T>(&self, field: &str, filter: impl Into<Option<Filter>>) -> RepoResult<Vec<T>>
    where
        T: Convertible<Output = T>,
    {
        let field = translate_field::<E>(field);
        let filter = translate_filter::<E>(filter.into());
        let values = self
            .store()
            .distinct(&self.inner.namespace, &field, &filter)
            .await?;
        from_values(values)
    }

    /// Groups the matches and maps each group into `R`.
    ///
    /// Runs match, then the sort of `options`, then `group`, then the skip
    /// and limit of `options`; so skip and limit apply to groups.
    ///
    /// ```rust,ignore
    /// let totals: Vec<CustomerTotal> = orders
    ///     .aggregate(
    ///         field("status").eq("paid"),
    ///         Group::by("customer").key_as("customer").sum("total", "total"),
    ///         FindOptions::new().limit(10),
    ///     )
    ///     .await?;
    /// ```
    pub async fn aggregate<R>(
        &self,
        filter: impl Into<Option<Filter>>,
        group: Group,
        options: FindOptions,
    ) -> RepoResult<Vec<R>>
    where
        R: Convertible<Output = R>,
    {
        let mut pipeline = Pipeline::new().filter(translate_filter::<E>(filter.into()));
        if let Some(sort) = translate_sort::<E>(options.sort, options.sort_order)? {
            pipeline = pipeline.sort(sort);
        }
        pipeline = pipeline.group(group.map_fields(&physical_field::<E>));
        if let Some(skip) = options.skip.filter(|skip| *skip > 0) {
            pipeline = pipeline.skip(skip);
        }
        if let Some(limit) = options.limit.filter(|limit| *limit > 0) {
            pipeline = pipeline.limit(limit);
        }

        log::debug!("Aggregating {} with {}", E::entity_name(), pipeline);
        self.run_pipeline(&pipeline).await
    }

    /// Runs a hand-built pipeline. Entity fields are translated up to the
    /// first group; later stages see the group's output as it is.
    pub async fn aggregate_pipeline<R>(&self, pipeline: Pipeline) -> RepoResult<Vec<R>>
    where
        R: Convertible<Output = R>,
    {
        let pipeline = translate_pipeline::<E>(pipeline);
        self.run_pipeline(&pipeline).await
    }

    fn store(&self) -> &Arc<dyn DocumentStore> {
        self.inner.client.store()
    }

    // one sequence per collection
    fn sequence_name(&self) -> &str {
        self.inner.namespace.collection()
    }

    fn write_concern(&self, requested: Option<WriteConcern>) -> WriteConcern {
        requested.unwrap_or(self.inner.write_concern)
    }

    fn checked_update(&self, update: Update) -> RepoResult<Update> {
        if update.is_empty() {
            log::error!("Empty update for {}", self.inner.namespace);
            return Err(RepoError::new(
                "update must contain at least one operator",
                ErrorKind::UpdateError,
            ));
        }
        Ok(translate_update::<E>(update))
    }

    async fn find<R: Convertible<Output = R>>(
        &self,
        filter: Option<Filter>,
        options: FindOptions,
        projection: Option<ProjectionSpec>,
    ) -> RepoResult<Vec<R>> {
        let command = translate_find::<E>(filter, options, projection, self.inner.read_preference)?;
        let documents = self.store().find(&self.inner.namespace, &command).await?;
        from_documents::<E, R>(documents)
    }

    async fn run_pipeline<R: Convertible<Output = R>>(&self, pipeline: &Pipeline) -> RepoResult<Vec<R>> {
        let documents = self.store().aggregate(&self.inner.namespace, pipeline).await?;
        from_values(documents.into_iter().map(Value::Document).collect())
    }

    fn entity_of(&self, document: Option<Document>) -> RepoResult<Option<E>> {
        match document {
            Some(document) => Ok(Some(from_document::<E, E>(document)?)),
            None => Ok(None),
        }
    }
}

fn assign_plain_key<E: Entity>(entity: &mut E) -> RepoResult<()> {
    if entity.key().is_some() {
        return Ok(());
    }

    match E::Key::generate() {
        Some(key) => {
            entity.set_key(key);
            Ok(())
        }
        None => {
            log::error!("{} inserted without identity in field {}", E::entity_name(), E::id_field());
            Err(RepoError::new(
                &format!(
                    "{} requires an identity in field '{}' before insert",
                    E::entity_name(),
                    E::id_field()
                ),
                ErrorKind::InvalidId,
            ))
        }
    }
}
