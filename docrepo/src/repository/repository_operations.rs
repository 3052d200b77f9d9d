use crate::common::{Convertible, Document, Value, DOC_ID};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::repository::Entity;

/// Converts an entity to its stored form: the identity, when present,
/// first and under `_id`, followed by the remaining fields.
pub(crate) fn to_document<E: Entity>(entity: &E) -> RepoResult<Document> {
    let value = entity.to_value()?;
    let document = match value {
        Value::Document(doc) => doc,
        other => {
            log::error!("Expected Document from entity Convertible, got {:?}", other);
            return Err(RepoError::new(
                &format!(
                    "Entity conversion failed: expected a document for {} but got {}",
                    E::entity_name(),
                    other.type_name()
                ),
                ErrorKind::ObjectMappingError,
            ));
        }
    };

    let id_field = E::id_field();
    let mut stored = Document::new();
    if let Some(key) = entity.key() {
        stored.insert(DOC_ID, key.to_value()?);
    }
    for (field, value) in document {
        if field != id_field && field != DOC_ID {
            stored.insert(field, value);
        }
    }
    Ok(stored)
}

pub(crate) fn to_documents<E: Entity>(entities: &[E]) -> RepoResult<Vec<Document>> {
    let mut documents = Vec::with_capacity(entities.len());
    for entity in entities {
        documents.push(to_document(entity)?);
    }
    Ok(documents)
}

/// Reads a stored document back as `R`, moving `_id` to the identity
/// field of `E` first. `R` is `E` itself or a projection of it.
pub(crate) fn from_document<E: Entity, R: Convertible<Output = R>>(document: Document) -> RepoResult<R> {
    let id_field = E::id_field();
    let mut logical = Document::new();
    for (field, value) in document {
        if field == DOC_ID {
            logical.insert(id_field, value);
        } else {
            logical.insert(field, value);
        }
    }

    R::from_value(&Value::Document(logical)).map_err(|err| {
        log::error!("Failed to map a {} document: {}", E::entity_name(), err);
        err
    })
}

pub(crate) fn from_documents<E: Entity, R: Convertible<Output = R>>(documents: Vec<Document>) -> RepoResult<Vec<R>> {
    let mut results = Vec::with_capacity(documents.len());
    for document in documents {
        results.push(from_document::<E, R>(document)?);
    }
    Ok(results)
}

/// Reads an aggregation or distinct result as it is, with no renaming.
pub(crate) fn from_values<R: Convertible<Output = R>>(values: Vec<Value>) -> RepoResult<Vec<R>> {
    let mut results = Vec::with_capacity(values.len());
    for value in values.iter() {
        results.push(R::from_value(value)?);
    }
    Ok(results)
}
