//! Sorting, projection and query options, and their translation from
//! logical entity fields to physical store fields.

mod options;
mod selector;
mod spec;
mod translator;

pub use options::*;
pub use selector::*;
pub use spec::*;
pub use translator::*;
