use crate::errors::{RepoError, RepoResult};
use crate::query::{ReadPreference, WriteConcern};
use crate::repository::{Entity, Repository, RepositoryConfig};
use crate::store::StoreClient;

/// Builder for opening a [Repository].
///
/// Invalid settings are captured as they are given and reported by
/// [RepositoryBuilder::open] or [RepositoryBuilder::open_with].
///
/// ```rust,ignore
/// let orders: Repository<Order> = RepositoryBuilder::new()
///     .endpoint("memory://shop")
///     .database("shop")
///     .write_concern(WriteConcern::Majority)
///     .open()?;
///
/// // several repositories over one client
/// let client = StoreClient::connect("memory://shop")?;
/// let customers: Repository<Customer> = RepositoryBuilder::new()
///     .database("shop")
///     .open_with(client.clone())?;
/// ```
#[derive(Default)]
pub struct RepositoryBuilder {
    error: Option<RepoError>,
    config: RepositoryConfig,
}

impl RepositoryBuilder {
    pub fn new() -> Self {
        RepositoryBuilder {
            error: None,
            config: RepositoryConfig::new(),
        }
    }

    /// Store endpoint, `memory://default` unless set.
    pub fn endpoint(mut self, endpoint: &str) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_endpoint(endpoint) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn database(mut self, database: &str) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_database(database) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Overrides the collection name, which is the entity name by default.
    pub fn collection(mut self, collection: &str) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_collection(collection) {
                self.error = Some(e);
            }
        }
        self
    }

    pub fn sequence_collection(mut self, sequence_collection: &str) -> Self {
        if self.error.is_none() {
            if let Err(e) = self.config.set_sequence_collection(sequence_collection) {
                self.error = Some(e);
            }
        }
        self
    }

    /// Write concern of mutating operations that do not set their own.
    pub fn write_concern(mut self, write_concern: WriteConcern) -> Self {
        self.config.set_write_concern(write_concern);
        self
    }

    /// Read preference of reads that do not set their own.
    pub fn read_preference(mut self, read_preference: ReadPreference) -> Self {
        self.config.set_read_preference(read_preference);
        self
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Connects to the configured endpoint and opens the repository.
    pub fn open<E: Entity>(self) -> RepoResult<Repository<E>> {
        if let Some(error) = self.error {
            return Err(error);
        }
        self.config.validate()?;
        let client = StoreClient::connect(self.config.endpoint())?;
        Repository::new(client, &self.config)
    }

    /// Opens the repository over an existing client; the configured
    /// endpoint is ignored.
    pub fn open_with<E: Entity>(self, client: StoreClient) -> RepoResult<Repository<E>> {
        if let Some(error) = self.error {
            return Err(error);
        }
        Repository::new(client, &self.config)
    }
}
