//! The repository façade and the entity contract it is generic over.
//!
//! A [Repository] gives typed, asynchronous CRUD, find-and-modify, count,
//! distinct and aggregation over the collection of one [Entity] type.
//! Repositories are opened through a [RepositoryBuilder].

mod entity;
mod repository;
mod repository_builder;
mod repository_config;
mod repository_operations;

#[cfg(test)]
pub(crate) mod test_entities;

pub use entity::*;
pub use repository::*;
pub use repository_builder::*;
pub use repository_config::*;
pub(crate) use repository_operations::*;
