//! The boundary to a document store.
//!
//! [DocumentStore] is the one trait a driver implements. Everything that
//! reaches it is already translated to physical field names, with write
//! concern and read preference resolved. [StoreClient] shares a driver
//! across repositories, and [MemoryStore] is the in-memory reference
//! driver behind `memory://` endpoints.

mod client;
mod driver;
pub mod encoding;
mod memory;

pub use client::*;
pub use driver::*;
pub use memory::*;
