use crate::common::{DEFAULT_ENDPOINT, SEQUENCE_COLLECTION};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::query::{ReadPreference, WriteConcern};
use crate::repository::Entity;

/// Settings a [crate::repository::Repository] is opened with.
///
/// Usually filled through [crate::repository::RepositoryBuilder]; the
/// setters validate their input so an invalid value never reaches a
/// repository.
#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    endpoint: String,
    database: Option<String>,
    collection: Option<String>,
    sequence_collection: String,
    write_concern: WriteConcern,
    read_preference: ReadPreference,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl RepositoryConfig {
    pub fn new() -> Self {
        RepositoryConfig {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            database: None,
            collection: None,
            sequence_collection: SEQUENCE_COLLECTION.to_string(),
            write_concern: WriteConcern::default(),
            read_preference: ReadPreference::default(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn set_endpoint(&mut self, endpoint: &str) -> RepoResult<()> {
        self.endpoint = non_empty("endpoint", endpoint)?;
        Ok(())
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    pub fn set_database(&mut self, database: &str) -> RepoResult<()> {
        self.database = Some(non_empty("database", database)?);
        Ok(())
    }

    /// The configured collection name, if any.
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn set_collection(&mut self, collection: &str) -> RepoResult<()> {
        self.collection = Some(non_empty("collection", collection)?);
        Ok(())
    }

    /// The collection `E` is stored in: the configured name, or else the
    /// entity name.
    pub fn collection_for<E: Entity>(&self) -> String {
        self.collection
            .clone()
            .unwrap_or_else(|| E::entity_name().to_string())
    }

    pub fn sequence_collection(&self) -> &str {
        &self.sequence_collection
    }

    pub fn set_sequence_collection(&mut self, sequence_collection: &str) -> RepoResult<()> {
        self.sequence_collection = non_empty("sequence collection", sequence_collection)?;
        Ok(())
    }

    pub fn write_concern(&self) -> WriteConcern {
        self.write_concern
    }

    pub fn set_write_concern(&mut self, write_concern: WriteConcern) {
        self.write_concern = write_concern;
    }

    pub fn read_preference(&self) -> ReadPreference {
        self.read_preference
    }

    pub fn set_read_preference(&mut self, read_preference: ReadPreference) {
        self.read_preference = read_preference;
    }

    /// Checks that everything a repository needs is present.
    pub fn validate(&self) -> RepoResult<()> {
        if self.database.is_none() {
            log::error!("Repository configuration has no database");
            return Err(RepoError::new(
                "a database name is required",
                ErrorKind::InvalidOperation,
            ));
        }
        Ok(())
    }
}

fn non_empty(setting: &str, value: &str) -> RepoResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        log::error!("Empty {} in repository configuration", setting);
        return Err(RepoError::new(
            &format!("{} must not be empty", setting),
            ErrorKind::InvalidOperation,
        ));
    }
    Ok(trimmed.to_string())
}
