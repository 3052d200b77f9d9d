//! Value model shared by every layer of the repository.
//!
//! - [Value] and [Document] describe data the way the store holds it.
//! - [ObjectId] is the store-native 12-byte identifier.
//! - [Convertible] maps Rust types to and from [Value].
//!
//! ```rust,ignore
//! use docrepo::doc;
//!
//! let order = doc! { customer: "Alice", total: 12.5, items: ["A-1", "B-2"] };
//! assert_eq!(order.get("customer")?, Value::from("Alice"));
//! ```

mod constants;
mod convertible;
mod document;
mod object_id;
mod sort_order;
mod type_utils;
mod value;

pub use constants::*;
pub use convertible::*;
pub use document::*;
pub use object_id::*;
pub use sort_order::*;
pub use type_utils::*;
pub use value::*;
