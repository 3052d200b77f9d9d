use crate::aggregate::Pipeline;
use crate::common::{Convertible, SortOrder, DOC_ID, FIELD_SEPARATOR};
use crate::errors::{ErrorKind, RepoError, RepoResult};
use crate::filter::{Filter, Predicate};
use crate::query::{
    CountOptions, FindOneAndModifyOptions, FindOptions, ProjectionSpec, ReadPreference, Selector, SortSpec,
    WriteConcern,
};
use crate::repository::Entity;
use crate::store::{FindCommand, ModifyCommand};
use crate::update::Update;

const INVALID_PROJECTION: &str = "projection must be a record of entity fields, e.g. |f| record![f.name, f.price]";
const INVALID_SORT: &str = "sort selector must be a field or a record of fields";

/// Maps a logical field path of `E` to its physical name. The identity
/// field, and any path below it, lives under `_id`.
pub fn physical_field<E: Entity>(name: &str) -> String {
    let id_field = E::id_field();
    if name == id_field {
        return DOC_ID.to_string();
    }

    match name.strip_prefix(id_field) {
        Some(rest) if rest.starts_with(FIELD_SEPARATOR) => format!("{}{}", DOC_ID, rest),
        _ => name.to_string(),
    }
}

/// Translates an optional filter; `None` matches every document.
pub fn translate_filter<E: Entity>(filter: Option<Filter>) -> Filter {
    let filter = filter.unwrap_or(Filter::All).map_fields(&physical_field::<E>);
    log::debug!("Translated filter for {}: {}", E::entity_name(), filter);
    filter
}

/// Translates a typed predicate through the same path as untyped filters.
pub fn translate_predicate<E: Entity>(predicate: Predicate<E>) -> RepoResult<Filter> {
    let filter = predicate.into_filter()?;
    Ok(translate_filter::<E>(Some(filter)))
}

/// Equality on the identity field.
pub fn id_filter<E: Entity>(key: &E::Key) -> RepoResult<Filter> {
    let value = key.to_value()?;
    Ok(Filter::Eq(DOC_ID.to_string(), value))
}

/// Translates a sort selector; every selected field is sorted in
/// `sort_order`.
pub fn translate_sort<E: Entity>(selector: Option<Selector>, sort_order: SortOrder) -> RepoResult<Option<SortSpec>> {
    let selector = match selector {
        None => return Ok(None),
        Some(selector) => selector,
    };

    let fields = match selector {
        Selector::Field(name) => vec![name],
        Selector::Record(members) => {
            let mut names = Vec::with_capacity(members.len());
            for member in members {
                match member {
                    Selector::Field(name) => names.push(name),
                    other => {
                        log::error!("Invalid sort member {} for {}", other, E::entity_name());
                        return Err(RepoError::new(INVALID_SORT, ErrorKind::InvalidOperation));
                    }
                }
            }
            names
        }
        other => {
            log::error!("Invalid sort selector {} for {}", other, E::entity_name());
            return Err(RepoError::new(INVALID_SORT, ErrorKind::InvalidOperation));
        }
    };

    let sort = fields
        .iter()
        .fold(SortSpec::new(), |spec, name| spec.add(&physical_field::<E>(name), sort_order));
    if sort.is_empty() {
        return Ok(None);
    }
    log::debug!("Translated sort for {}: {}", E::entity_name(), sort);
    Ok(Some(sort))
}

/// Accepts only a non-empty record of plain, declared fields of `E`.
pub fn translate_projection<E: Entity>(selector: Selector) -> RepoResult<ProjectionSpec> {
    let members = match selector {
        Selector::Record(members) if !members.is_empty() => members,
        other => {
            log::error!("Invalid projection {} for {}", other, E::entity_name());
            return Err(RepoError::new(INVALID_PROJECTION, ErrorKind::InvalidProjectionExpression));
        }
    };

    let declared = E::field_names();
    let mut fields = Vec::with_capacity(members.len());
    for member in members {
        match member {
            Selector::Field(name) if declared.contains(&name.as_str()) => {
                fields.push(physical_field::<E>(&name));
            }
            other => {
                log::error!("Invalid projection member {} for {}", other, E::entity_name());
                return Err(RepoError::new(INVALID_PROJECTION, ErrorKind::InvalidProjectionExpression));
            }
        }
    }

    let projection = ProjectionSpec::new(fields);
    log::debug!("Translated projection for {}: {}", E::entity_name(), projection);
    Ok(projection)
}

/// Maps the fields of a builder update.
pub fn translate_update<E: Entity>(update: Update) -> Update {
    let update = update.map_fields(&physical_field::<E>);
    log::debug!("Translated update for {}: {}", E::entity_name(), update);
    update
}

/// Maps a single field, as used by distinct.
pub fn translate_field<E: Entity>(name: &str) -> String {
    physical_field::<E>(name)
}

/// Maps entity fields in a raw pipeline up to its first group.
pub fn translate_pipeline<E: Entity>(pipeline: Pipeline) -> Pipeline {
    let pipeline = pipeline.map_fields(&physical_field::<E>);
    log::debug!("Translated pipeline for {}: {}", E::entity_name(), pipeline);
    pipeline
}

pub fn translate_find<E: Entity>(
    filter: Option<Filter>,
    options: FindOptions,
    projection: Option<ProjectionSpec>,
    default_read_preference: ReadPreference,
) -> RepoResult<FindCommand> {
    let mut command = FindCommand::new(translate_filter::<E>(filter));
    command.sort = translate_sort::<E>(options.sort, options.sort_order)?;
    command.projection = projection;
    command.skip = options.skip;
    command.limit = options.limit;
    command.hint = options.hint;
    command.read_preference = options.read_preference.unwrap_or(default_read_preference);
    Ok(command)
}

pub fn translate_modify<E: Entity>(
    options: FindOneAndModifyOptions,
    default_write_concern: WriteConcern,
    projection: Option<ProjectionSpec>,
) -> RepoResult<ModifyCommand> {
    Ok(ModifyCommand {
        sort: translate_sort::<E>(options.sort, options.sort_order)?,
        projection,
        upsert: options.upsert,
        return_document: options.return_document,
        write_concern: options.write_concern.unwrap_or(default_write_concern),
    })
}

/// Fills in the default read preference.
pub fn translate_count(options: CountOptions, default_read_preference: ReadPreference) -> CountOptions {
    let read_preference = options.read_preference.unwrap_or(default_read_preference);
    options.read_preference(read_preference)
}
