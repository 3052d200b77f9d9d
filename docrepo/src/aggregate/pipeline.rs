use crate::common::{Document, Value, GROUP_ID};
use crate::errors::RepoResult;
use crate::filter::Filter;
use crate::query::{ProjectionSpec, SortSpec};
use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt::Display;

/// How documents are bucketed by a [Group] stage.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupKey {
    /// One bucket for the whole input; the key is null.
    None,
    /// Bucket by the value of one field.
    Field(String),
    /// Bucket by several fields; the key is a document of their values.
    Fields(Vec<String>),
}

impl GroupKey {
    fn map_fields<F: Fn(&str) -> String>(self, rename: &F) -> GroupKey {
        match self {
            GroupKey::None => GroupKey::None,
            GroupKey::Field(field) => GroupKey::Field(rename(&field)),
            GroupKey::Fields(fields) => GroupKey::Fields(fields.iter().map(|it| rename(it)).collect()),
        }
    }

    fn extract(&self, document: &Document) -> Value {
        match self {
            GroupKey::None => Value::Null,
            GroupKey::Field(field) => document.lookup(field).unwrap_or(Value::Null),
            GroupKey::Fields(fields) => {
                let mut key = Document::new();
                for field in fields.iter() {
                    key.insert(field.as_str(), document.lookup(field).unwrap_or(Value::Null));
                }
                Value::Document(key)
            }
        }
    }
}

/// Computes one output field per group.
#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    /// Sum of the numeric values; integer when every input is an integer.
    Sum(String),
    /// Average of the numeric values, null when there are none.
    Avg(String),
    Min(String),
    Max(String),
    /// Value of the first document in the group, in input order.
    First(String),
    Last(String),
    /// Every present value, duplicates kept.
    Push(String),
    /// Distinct present values in first-seen order.
    AddToSet(String),
    /// Number of documents in the group.
    Count,
}

impl Accumulator {
    /// Store-native operator name.
    pub fn name(&self) -> &'static str {
        match self {
            Accumulator::Sum(_) => "$sum",
            Accumulator::Avg(_) => "$avg",
            Accumulator::Min(_) => "$min",
            Accumulator::Max(_) => "$max",
            Accumulator::First(_) => "$first",
            Accumulator::Last(_) => "$last",
            Accumulator::Push(_) => "$push",
            Accumulator::AddToSet(_) => "$addToSet",
            Accumulator::Count => "$count",
        }
    }

    /// The input field, `None` for [Accumulator::Count].
    pub fn field(&self) -> Option<&str> {
        match self {
            Accumulator::Sum(field)
            | Accumulator::Avg(field)
            | Accumulator::Min(field)
            | Accumulator::Max(field)
            | Accumulator::First(field)
            | Accumulator::Last(field)
            | Accumulator::Push(field)
            | Accumulator::AddToSet(field) => Some(field),
            Accumulator::Count => None,
        }
    }

    fn map_fields<F: Fn(&str) -> String>(self, rename: &F) -> Accumulator {
        match self {
            Accumulator::Sum(field) => Accumulator::Sum(rename(&field)),
            Accumulator::Avg(field) => Accumulator::Avg(rename(&field)),
            Accumulator::Min(field) => Accumulator::Min(rename(&field)),
            Accumulator::Max(field) => Accumulator::Max(rename(&field)),
            Accumulator::First(field) => Accumulator::First(rename(&field)),
            Accumulator::Last(field) => Accumulator::Last(rename(&field)),
            Accumulator::Push(field) => Accumulator::Push(rename(&field)),
            Accumulator::AddToSet(field) => Accumulator::AddToSet(rename(&field)),
            Accumulator::Count => Accumulator::Count,
        }
    }

    fn accumulate(&self, members: &[Document]) -> Value {
        let present = |field: &str| -> Vec<Value> {
            members.iter().filter_map(|doc| doc.lookup(field)).collect()
        };

        match self {
            Accumulator::Sum(field) => sum(&present(field.as_str())),
            Accumulator::Avg(field) => {
                let numbers = present(field.as_str()).iter().filter_map(|it| it.as_f64()).collect_vec();
                if numbers.is_empty() {
                    Value::Null
                } else {
                    Value::F64(numbers.iter().sum::<f64>() / numbers.len() as f64)
                }
            }
            Accumulator::Min(field) => present(field.as_str())
                .into_iter()
                .filter(|it| !it.is_null())
                .min()
                .unwrap_or(Value::Null),
            Accumulator::Max(field) => present(field.as_str())
                .into_iter()
                .filter(|it| !it.is_null())
                .max()
                .unwrap_or(Value::Null),
            Accumulator::First(field) => members
                .first()
                .and_then(|doc| doc.lookup(field))
                .unwrap_or(Value::Null),
            Accumulator::Last(field) => members
                .last()
                .and_then(|doc| doc.lookup(field))
                .unwrap_or(Value::Null),
            Accumulator::Push(field) => Value::Array(present(field.as_str())),
            Accumulator::AddToSet(field) => {
                Value::Array(present(field.as_str()).into_iter().unique().collect())
            }
            Accumulator::Count => Value::I64(members.len() as i64),
        }
    }
}

fn sum(values: &[Value]) -> Value {
    let mut integral: Option<i64> = Some(0);
    let mut total = 0.0;
    for value in values.iter() {
        if !value.is_number() {
            continue;
        }
        total += value.as_f64().unwrap_or_default();
        integral = match (integral, value) {
            (Some(acc), Value::I32(n)) => acc.checked_add(*n as i64),
            (Some(acc), Value::I64(n)) => acc.checked_add(*n),
            _ => None,
        };
    }

    match integral {
        Some(n) => Value::I64(n),
        None => Value::F64(total),
    }
}

/// A `$group` stage: a key plus named accumulators.
///
/// The key is emitted as `_id` unless renamed with [Group::key_as], which
/// lets a plain result type pick it up under a field of its own.
///
/// ```rust,ignore
/// let group = Group::by("customer")
///     .key_as("customer")
///     .sum("total", "amount")
///     .count("orders");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    key: GroupKey,
    key_as: Option<String>,
    accumulators: Vec<(String, Accumulator)>,
}

impl Group {
    /// A single group over every input document.
    pub fn all() -> Group {
        Group::new(GroupKey::None)
    }

    pub fn by(field: &str) -> Group {
        Group::new(GroupKey::Field(field.to_string()))
    }

    pub fn by_fields(fields: &[&str]) -> Group {
        Group::new(GroupKey::Fields(fields.iter().map(|it| it.to_string()).collect()))
    }

    pub fn new(key: GroupKey) -> Group {
        Group {
            key,
            key_as: None,
            accumulators: Vec::new(),
        }
    }

    /// Emits the group key under `name` instead of `_id`.
    pub fn key_as(mut self, name: &str) -> Group {
        self.key_as = Some(name.to_string());
        self
    }

    pub fn accumulate(mut self, name: &str, accumulator: Accumulator) -> Group {
        self.accumulators.push((name.to_string(), accumulator));
        self
    }

    pub fn sum(self, name: &str, field: &str) -> Group {
        self.accumulate(name, Accumulator::Sum(field.to_string()))
    }

    pub fn avg(self, name: &str, field: &str) -> Group {
        self.accumulate(name, Accumulator::Avg(field.to_string()))
    }

    pub fn min(self, name: &str, field: &str) -> Group {
        self.accumulate(name, Accumulator::Min(field.to_string()))
    }

    pub fn max(self, name: &str, field: &str) -> Group {
        self.accumulate(name, Accumulator::Max(field.to_string()))
    }

    pub fn first(self, name: &str, field: &str) -> Group {
        self.accumulate(name, Accumulator::First(field.to_string()))
    }

    pub fn last(self, name: &str, field: &str) -> Group {
        self.accumulate(name, Accumulator::Last(field.to_string()))
    }

    pub fn push(self, name: &str, field: &str) -> Group {
        self.accumulate(name, Accumulator::Push(field.to_string()))
    }

    pub fn add_to_set(self, name: &str, field: &str) -> Group {
        self.accumulate(name, Accumulator::AddToSet(field.to_string()))
    }

    pub fn count(self, name: &str) -> Group {
        self.accumulate(name, Accumulator::Count)
    }

    pub fn key(&self) -> &GroupKey {
        &self.key
    }

    /// Output name of the group key.
    pub fn key_name(&self) -> &str {
        self.key_as.as_deref().unwrap_or(GROUP_ID)
    }

    pub fn accumulators(&self) -> &[(String, Accumulator)] {
        &self.accumulators
    }

    /// Renames input fields; output names are left as declared.
    pub fn map_fields<F: Fn(&str) -> String>(self, rename: &F) -> Group {
        Group {
            key: self.key.map_fields(rename),
            key_as: self.key_as,
            accumulators: self
                .accumulators
                .into_iter()
                .map(|(name, acc)| (name, acc.map_fields(rename)))
                .collect(),
        }
    }

    /// Buckets `documents` in first-seen key order and folds each bucket.
    pub fn evaluate(&self, documents: Vec<Document>) -> Vec<Document> {
        let mut buckets: IndexMap<Value, Vec<Document>> = IndexMap::new();
        for document in documents {
            let key = self.key.extract(&document);
            buckets.entry(key).or_default().push(document);
        }

        buckets
            .into_iter()
            .map(|(key, members)| {
                let mut output = Document::new();
                output.insert(self.key_name(), key);
                for (name, accumulator) in self.accumulators.iter() {
                    output.insert(name.as_str(), accumulator.accumulate(&members));
                }
                output
            })
            .collect()
    }
}

impl Display for Group {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = match &self.key {
            GroupKey::None => "null".to_string(),
            GroupKey::Field(field) => field.clone(),
            GroupKey::Fields(fields) => format!("({})", fields.join(", ")),
        };
        let accumulators = self
            .accumulators
            .iter()
            .map(|(name, acc)| match acc.field() {
                Some(field) => format!("{}: {}({})", name, acc.name(), field),
                None => format!("{}: {}", name, acc.name()),
            })
            .join(", ");
        write!(f, "by {} as {} {{{}}}", key, self.key_name(), accumulators)
    }
}

/// One stage of an aggregation pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    Match(Filter),
    Sort(SortSpec),
    Group(Group),
    Project(ProjectionSpec),
    Skip(u64),
    Limit(u64),
}

impl Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Match(filter) => write!(f, "match {}", filter),
            Stage::Sort(sort) => write!(f, "sort {}", sort),
            Stage::Group(group) => write!(f, "group {}", group),
            Stage::Project(projection) => write!(f, "project {}", projection),
            Stage::Skip(n) => write!(f, "skip {}", n),
            Stage::Limit(n) => write!(f, "limit {}", n),
        }
    }
}

/// An ordered list of aggregation stages.
///
/// ```rust,ignore
/// let pipeline = Pipeline::new()
///     .filter(field("status").eq("paid"))
///     .group(Group::by("customer").key_as("customer").sum("total", "amount"))
///     .sort(SortSpec::new().add("total", SortOrder::Descending))
///     .limit(10);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
}

impl Pipeline {
    pub fn new() -> Pipeline {
        Pipeline { stages: Vec::new() }
    }

    pub fn stage(mut self, stage: Stage) -> Pipeline {
        self.stages.push(stage);
        self
    }

    pub fn filter(self, filter: Filter) -> Pipeline {
        self.stage(Stage::Match(filter))
    }

    pub fn sort(self, sort: SortSpec) -> Pipeline {
        self.stage(Stage::Sort(sort))
    }

    pub fn group(self, group: Group) -> Pipeline {
        self.stage(Stage::Group(group))
    }

    pub fn project(self, projection: ProjectionSpec) -> Pipeline {
        self.stage(Stage::Project(projection))
    }

    pub fn skip(self, skip: u64) -> Pipeline {
        self.stage(Stage::Skip(skip))
    }

    pub fn limit(self, limit: u64) -> Pipeline {
        self.stage(Stage::Limit(limit))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Renames entity fields in every stage up to and including the first
    /// group. Later stages see the group's output and keep their names.
    pub fn map_fields<F: Fn(&str) -> String>(self, rename: &F) -> Pipeline {
        let mut grouped = false;
        let stages = self
            .stages
            .into_iter()
            .map(|stage| {
                if grouped {
                    return stage;
                }
                match stage {
                    Stage::Match(filter) => Stage::Match(filter.map_fields(rename)),
                    Stage::Sort(sort) => Stage::Sort(map_sort(sort, rename)),
                    Stage::Group(group) => {
                        grouped = true;
                        Stage::Group(group.map_fields(rename))
                    }
                    Stage::Project(projection) => Stage::Project(map_projection(projection, rename)),
                    other => other,
                }
            })
            .collect();
        Pipeline { stages }
    }

    /// Runs every stage over `documents` in order.
    pub fn evaluate(&self, documents: Vec<Document>) -> RepoResult<Vec<Document>> {
        let mut documents = documents;
        for stage in self.stages.iter() {
            documents = match stage {
                Stage::Match(filter) => {
                    let mut matched = Vec::with_capacity(documents.len());
                    for document in documents {
                        if filter.apply(&document)? {
                            matched.push(document);
                        }
                    }
                    matched
                }
                Stage::Sort(sort) => {
                    documents.sort_by(|a, b| sort.compare(a, b));
                    documents
                }
                Stage::Group(group) => group.evaluate(documents),
                Stage::Project(projection) => documents.iter().map(|it| projection.apply(it)).collect(),
                Stage::Skip(n) => documents.into_iter().skip(*n as usize).collect(),
                Stage::Limit(n) => documents.into_iter().take(*n as usize).collect(),
            };
        }
        Ok(documents)
    }
}

fn map_sort<F: Fn(&str) -> String>(sort: SortSpec, rename: &F) -> SortSpec {
    sort.fields()
        .iter()
        .fold(SortSpec::new(), |acc, (field, order)| acc.add(&rename(field), *order))
}

fn map_projection<F: Fn(&str) -> String>(projection: ProjectionSpec, rename: &F) -> ProjectionSpec {
    let mapped = ProjectionSpec::new(projection.fields().iter().map(|it| rename(it)).collect());
    if projection.includes_id() {
        mapped
    } else {
        mapped.exclude_id()
    }
}

impl Display for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.stages.iter().join(" | "))
    }
}
