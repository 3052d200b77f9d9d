use crate::common::{DOC_ID, SEQUENCE_COUNTER};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::filter::Filter;
use crate::query::{ReturnDocument, WriteConcern};
use crate::store::{ModifyCommand, Namespace, StoreClient};
use crate::update::inc;

/// Mints dense, monotonically increasing `i64` ids from a store-side
/// counter document.
///
/// The sequence collection holds one document per sequence,
/// `{ _id: <sequence name>, counter: <last issued id> }`. A reservation is a
/// single atomic `$inc` with upsert, so concurrent callers, in this process
/// or any other, always receive disjoint ranges. Nothing is cached, locked
/// or retried on the client.
///
/// ```rust,ignore
/// let allocator = SequenceAllocator::new(client, "shop", "_Sequence");
/// let first = allocator.allocate_range("orders", 10).await?; // first..=first + 9
/// let next = allocator.allocate_id("orders").await?;
/// ```
#[derive(Debug, Clone)]
pub struct SequenceAllocator {
    client: StoreClient,
    namespace: Namespace,
}

impl SequenceAllocator {
    pub fn new(client: StoreClient, database: &str, sequence_collection: &str) -> SequenceAllocator {
        SequenceAllocator {
            client,
            namespace: Namespace::new(database, sequence_collection),
        }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Reserves one id.
    pub async fn allocate_id(&self, sequence_name: &str) -> RepoResult<i64> {
        self.allocate_range(sequence_name, 1).await
    }

    /// Reserves `count` consecutive ids and returns the first one.
    ///
    /// The reserved range is `first..=first + count - 1`. Fails with
    /// [ErrorKind::InvalidOperation] for an empty name or a count below
    /// one, without touching the store; any other failure is an
    /// [ErrorKind::AllocationFailure] and reserves nothing usable.
    pub async fn allocate_range(&self, sequence_name: &str, count: i64) -> RepoResult<i64> {
        if sequence_name.is_empty() {
            log::error!("Sequence name must not be empty");
            return Err(RepoError::new(
                "sequence name must not be empty",
                ErrorKind::InvalidOperation,
            ));
        }
        if count < 1 {
            log::error!("Invalid allocation count {} for sequence {}", count, sequence_name);
            return Err(RepoError::new(
                &format!("allocation count must be at least 1, got {}", count),
                ErrorKind::InvalidOperation,
            ));
        }

        let counter = self.increment(sequence_name, count).await.map_err(|err| {
            log::error!(
                "Failed to reserve {} ids from sequence {} in {}: {}",
                count,
                sequence_name,
                self.namespace,
                err
            );
            RepoError::new_with_cause(
                &format!("failed to reserve {} ids from sequence '{}'", count, sequence_name),
                ErrorKind::AllocationFailure,
                err,
            )
        })?;

        let first = counter - count + 1;
        log::debug!(
            "Reserved ids {}..={} from sequence {}",
            first,
            counter,
            sequence_name
        );
        Ok(first)
    }

    // returns the counter after the increment
    async fn increment(&self, sequence_name: &str, count: i64) -> RepoResult<i64> {
        let filter = Filter::Eq(DOC_ID.to_string(), sequence_name.into());
        let update = inc(SEQUENCE_COUNTER, count);
        let command = ModifyCommand {
            upsert: true,
            return_document: ReturnDocument::After,
            write_concern: WriteConcern::strongest(),
            ..ModifyCommand::default()
        };

        let document = self
            .client
            .store()
            .find_one_and_update(&self.namespace, &filter, &update, &command)
            .await?;

        let document = match document {
            Some(document) => document,
            None => {
                log::error!("Sequence {} returned no document", sequence_name);
                return Err(RepoError::new(
                    "sequence update returned no document",
                    ErrorKind::StoreFailure,
                ));
            }
        };

        let counter = document.get(SEQUENCE_COUNTER)?;
        match counter.as_i64() {
            Some(value) if counter.is_integer() => Ok(value),
            _ => {
                log::error!("Sequence {} has a non-integer counter {:?}", sequence_name, counter);
                Err(RepoError::new(
                    &format!("sequence counter is not an integer: {}", counter.type_name()),
                    ErrorKind::StoreFailure,
                ))
            }
        }
    }
}
