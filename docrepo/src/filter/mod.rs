//! Filter conditions over documents and entities.
//!
//! Untyped filters are built with the fluent API:
//! - `field("age").gt(30)` - comparison operators
//! - `field("tags").in_array(vec!["a", "b"])` - membership
//! - `field("lines").elem_match(field("qty").gt(1))` - array elements
//! - `all()`, `and(..)`, `or(..)`, `not(..)`, `nor(..)`, `by_id(..)`
//!
//! Typed filters go through the [FieldRef] handles generated for an entity:
//!
//! ```rust,ignore
//! let big = repo.get_list_by(|f| f.total.gt(100), FindOptions::new()).await?;
//! ```

mod filter;
mod fluent;
mod predicate;

pub use filter::*;
pub use fluent::*;
pub use predicate::*;
