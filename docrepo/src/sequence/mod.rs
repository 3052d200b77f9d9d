//! Store-side sequences for auto-increment identities.

mod allocator;

pub use allocator::*;
