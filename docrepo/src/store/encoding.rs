//! Store-native document forms of filters, updates, sorts, projections,
//! pipelines and command options.
//!
//! This is the only place that knows the shape of the wire documents; a
//! network driver sends these, the in-memory driver logs them.

use crate::aggregate::{Accumulator, Group, GroupKey, Pipeline, Stage};
use crate::common::{Document, Value, DOC_ID};
use crate::filter::{Filter, ELEMENT_FIELD};
use crate::query::{ProjectionSpec, ReadPreference, ReturnDocument, SortSpec, WriteConcern};
use crate::store::{FindCommand, ModifyCommand};
use crate::update::{Update, UpdateOperator};

fn single(key: &str, value: Value) -> Document {
    let mut doc = Document::new();
    doc.insert(key, value);
    doc
}

fn comparison(filter: &Filter) -> Option<(&str, Document)> {
    let (field, operator, value) = match filter {
        Filter::Eq(f, v) => (f, "$eq", v.clone()),
        Filter::Ne(f, v) => (f, "$ne", v.clone()),
        Filter::Gt(f, v) => (f, "$gt", v.clone()),
        Filter::Gte(f, v) => (f, "$gte", v.clone()),
        Filter::Lt(f, v) => (f, "$lt", v.clone()),
        Filter::Lte(f, v) => (f, "$lte", v.clone()),
        Filter::In(f, v) => (f, "$in", Value::Array(v.clone())),
        Filter::NotIn(f, v) => (f, "$nin", Value::Array(v.clone())),
        Filter::Exists(f, b) => (f, "$exists", Value::Bool(*b)),
        Filter::Regex(f, p) => (f, "$regex", Value::from(p.as_str())),
        Filter::ElemMatch(f, inner) => (f, "$elemMatch", Value::Document(encode_element_filter(inner))),
        _ => return None,
    };
    Some((field.as_str(), single(operator, value)))
}

fn encode_list(filters: &[Filter]) -> Value {
    Value::Array(filters.iter().map(|it| Value::Document(encode_filter(it))).collect())
}

/// `{"qty": {"$gt": 1}}`, `{"$and": [..]}`; `All` is the empty document.
pub fn encode_filter(filter: &Filter) -> Document {
    if let Some((field, condition)) = comparison(filter) {
        return single(field, Value::Document(condition));
    }

    match filter {
        Filter::And(filters) => single("$and", encode_list(filters)),
        Filter::Or(filters) => single("$or", encode_list(filters)),
        Filter::Nor(filters) => single("$nor", encode_list(filters)),
        Filter::Not(inner) => single("$nor", encode_list(std::slice::from_ref(&**inner))),
        _ => Document::new(),
    }
}

// conditions on scalar elements drop the field: {"$gt": 1, "$lt": 5}
fn encode_element_filter(filter: &Filter) -> Document {
    match comparison(filter) {
        Some((field, condition)) if field == ELEMENT_FIELD => return condition,
        _ => {}
    }

    if let Filter::And(filters) = filter {
        let conditions: Vec<Document> = filters
            .iter()
            .filter_map(|it| match comparison(it) {
                Some((field, condition)) if field == ELEMENT_FIELD => Some(condition),
                _ => None,
            })
            .collect();
        if conditions.len() == filters.len() {
            let mut merged = Document::new();
            for condition in conditions.iter() {
                merged.merge(condition);
            }
            return merged;
        }
    }
    encode_filter(filter)
}

/// `{"$set": {..}, "$inc": {..}}`, operators grouped in first-seen order.
pub fn encode_update(update: &Update) -> Document {
    let mut encoded = Document::new();
    for operator in update.operators() {
        let value = match operator {
            UpdateOperator::Set(_, v)
            | UpdateOperator::Inc(_, v)
            | UpdateOperator::Mul(_, v)
            | UpdateOperator::Min(_, v)
            | UpdateOperator::Max(_, v)
            | UpdateOperator::SetOnInsert(_, v)
            | UpdateOperator::Push(_, v)
            | UpdateOperator::AddToSet(_, v)
            | UpdateOperator::Pull(_, v) => v.clone(),
            UpdateOperator::Unset(_) => Value::from(""),
            UpdateOperator::Rename(_, to) => Value::from(to.as_str()),
        };

        let name = operator.name();
        if let Some(Value::Document(fields)) = encoded.get_mut(name) {
            fields.insert(operator.field(), value);
        } else {
            encoded.insert(name, Value::Document(single(operator.field(), value)));
        }
    }
    encoded
}

/// `{"total": -1, "customer": 1}`
pub fn encode_sort(sort: &SortSpec) -> Document {
    sort.fields()
        .iter()
        .map(|(field, order)| (field.clone(), Value::I32(order.direction())))
        .collect()
}

/// `{"customer": 1, "total": 1}`, with `"_id": 0` when the id is excluded.
pub fn encode_projection(projection: &ProjectionSpec) -> Document {
    let mut encoded: Document = projection
        .fields()
        .iter()
        .map(|field| (field.clone(), Value::I32(1)))
        .collect();
    if !projection.includes_id() {
        encoded.insert(DOC_ID, Value::I32(0));
    }
    encoded
}

fn field_reference(field: &str) -> Value {
    Value::String(format!("${}", field))
}

fn encode_group(group: &Group) -> Vec<Document> {
    let key = match group.key() {
        GroupKey::None => Value::Null,
        GroupKey::Field(field) => field_reference(field),
        GroupKey::Fields(fields) => Value::Document(
            fields
                .iter()
                .map(|field| (field.clone(), field_reference(field)))
                .collect(),
        ),
    };

    let mut spec = single(DOC_ID, key);
    for (name, accumulator) in group.accumulators() {
        let input = match accumulator {
            Accumulator::Count => Value::I32(1),
            other => other.field().map(field_reference).unwrap_or(Value::Null),
        };
        let operator = match accumulator {
            Accumulator::Count => "$sum",
            other => other.name(),
        };
        spec.insert(name.as_str(), Value::Document(single(operator, input)));
    }

    let mut stages = vec![single("$group", Value::Document(spec))];
    if group.key_name() != DOC_ID {
        stages.push(single(
            "$addFields",
            Value::Document(single(group.key_name(), field_reference(DOC_ID))),
        ));
        stages.push(single("$unset", Value::from(DOC_ID)));
    }
    stages
}

/// One document per stage; a renamed group key adds two stages.
pub fn encode_pipeline(pipeline: &Pipeline) -> Vec<Document> {
    let mut stages = Vec::with_capacity(pipeline.stages().len());
    for stage in pipeline.stages() {
        match stage {
            Stage::Match(filter) => stages.push(single("$match", Value::Document(encode_filter(filter)))),
            Stage::Sort(sort) => stages.push(single("$sort", Value::Document(encode_sort(sort)))),
            Stage::Group(group) => stages.extend(encode_group(group)),
            Stage::Project(projection) => {
                stages.push(single("$project", Value::Document(encode_projection(projection))))
            }
            Stage::Skip(n) => stages.push(single("$skip", Value::I64(*n as i64))),
            Stage::Limit(n) => stages.push(single("$limit", Value::I64(*n as i64))),
        }
    }
    stages
}

/// `{"w": 1}`, `{"w": 1, "j": true}`, `{"w": "majority", "j": true}`
pub fn encode_write_concern(write_concern: WriteConcern) -> Document {
    let w = match write_concern {
        WriteConcern::W0 => Value::I32(0),
        WriteConcern::W1 | WriteConcern::Journaled => Value::I32(1),
        WriteConcern::Majority => Value::from("majority"),
    };
    let mut encoded = single("w", w);
    if write_concern.is_journaled() {
        encoded.insert("j", true);
    }
    encoded
}

pub fn encode_read_preference(read_preference: ReadPreference) -> Document {
    single("mode", Value::from(read_preference.mode()))
}

/// The body of a `find` command.
pub fn encode_find(command: &FindCommand) -> Document {
    let mut encoded = single("filter", Value::Document(encode_filter(&command.filter)));
    if let Some(sort) = &command.sort {
        encoded.insert("sort", encode_sort(sort));
    }
    if let Some(projection) = &command.projection {
        encoded.insert("projection", encode_projection(projection));
    }
    if let Some(skip) = command.skip {
        encoded.insert("skip", skip as i64);
    }
    if let Some(limit) = command.limit {
        encoded.insert("limit", limit as i64);
    }
    if let Some(hint) = &command.hint {
        encoded.insert("hint", hint.as_str());
    }
    encoded.insert("$readPreference", encode_read_preference(command.read_preference));
    encoded
}

/// The body of a `findAndModify` command. `update` is absent for deletes.
pub fn encode_modify(filter: &Filter, update: Option<Value>, command: &ModifyCommand) -> Document {
    let mut encoded = single("query", Value::Document(encode_filter(filter)));
    if let Some(sort) = &command.sort {
        encoded.insert("sort", encode_sort(sort));
    }
    match update {
        Some(update) => {
            encoded.insert("update", update);
            encoded.insert("new", command.return_document == ReturnDocument::After);
            encoded.insert("upsert", command.upsert);
        }
        None => {
            encoded.insert("remove", true);
        }
    }
    if let Some(projection) = &command.projection {
        encoded.insert("fields", encode_projection(projection));
    }
    encoded.insert("writeConcern", encode_write_concern(command.write_concern));
    encoded
}
