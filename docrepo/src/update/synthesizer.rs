use crate::common::DOC_ID;
use crate::errors::RepoResult;
use crate::repository::{to_document, Entity};
use crate::sequence::SequenceAllocator;
use crate::update::{Update, UpdateOperator};

/// Builds the update that writes a whole entity: `$set` of every field but
/// the identity, which is never touched by an update.
///
/// With `upsert` on an auto-increment entity, one id is reserved up front
/// and written with `$setOnInsert`, so a document created by the upsert
/// gets a fresh id while a matched document keeps its own.
pub async fn synthesize<E: Entity>(
    entity: &E,
    upsert: bool,
    allocator: &SequenceAllocator,
    sequence_name: &str,
) -> RepoResult<Update> {
    let document = to_document(entity)?;
    let mut update = Update::new();
    for (field, value) in document {
        if field != DOC_ID {
            update = update.with(UpdateOperator::Set(field, value));
        }
    }

    if upsert && E::capability().is_auto_increment() {
        let id = allocator.allocate_id(sequence_name).await?;
        update = update.set_on_insert(DOC_ID, id);
    }

    log::debug!("Synthesized update for {}: {}", E::entity_name(), update);
    Ok(update)
}
