#![allow(clippy::module_inception)]
//! # docrepo - Typed repositories over a document store
//!
//! docrepo puts a generic, asynchronous repository layer in front of a
//! document store: one collection per entity type, typed CRUD, filtering,
//! sorting, projection, find-and-modify, count, distinct and aggregation.
//! Entities can take dense, monotonically increasing `i64` identities
//! minted by an atomic store-side sequence.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docrepo::filter::field;
//! use docrepo::query::{FindOptions, InsertOptions};
//! use docrepo::repository::{Repository, RepositoryBuilder};
//! use docrepo_derive::{Convertible, Entity};
//!
//! #[derive(Entity, Convertible, Default, Debug, Clone)]
//! #[entity(name = "orders", id(field = "id", auto_increment))]
//! pub struct Order {
//!     pub id: i64,
//!     pub customer: String,
//!     pub total: f64,
//! }
//!
//! let orders: Repository<Order> = RepositoryBuilder::new()
//!     .endpoint("memory://shop")
//!     .database("shop")
//!     .open()?;
//!
//! let order = orders.insert(Order { customer: "alice".into(), total: 12.5, ..Default::default() }, InsertOptions::new()).await?;
//! assert_eq!(order.id, 1);
//!
//! let big = orders.get_list_by(|f| f.total.gt(10.0), FindOptions::new()).await?;
//! let alice = orders.get(field("customer").eq("alice"), FindOptions::new()).await?;
//! ```
//!
//! ## Design
//!
//! Everything above the [store::DocumentStore] trait is store-agnostic:
//! specifications are plain values, translated from logical entity fields
//! to physical store fields in one place ([query]) and encoded to the
//! store's document form in another ([store::encoding]). No network driver
//! ships with the crate; `memory://` endpoints resolve to the in-memory
//! reference driver.
//!
//! ## Module Organization
//!
//! - [`aggregate`] - Aggregation pipelines, group stages and accumulators
//! - [`common`] - Values, documents, object ids and conversion traits
//! - [`errors`] - Error types and result definitions
//! - [`filter`] - Filter conditions, fluent and typed
//! - [`query`] - Sort, projection and query options, and their translation
//! - [`repository`] - The repository façade, its builder and the entity contract
//! - [`sequence`] - The store-side sequence allocator
//! - [`store`] - The driver boundary, store client and in-memory driver
//! - [`update`] - Update operators, typed update builder and entity synthesis

pub mod aggregate;
pub mod common;
pub mod errors;
pub mod filter;
pub mod query;
pub mod repository;
pub mod sequence;
pub mod store;
pub mod update;
