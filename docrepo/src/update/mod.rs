//! Update specifications.
//!
//! Updates are ordered lists of operators built with stateless functions
//! (`set("status", "paid").inc("version", 1)`) or, over an entity's typed
//! field handles, with an [UpdateBuilder]. The [synthesize] step turns a
//! whole entity into an update.

mod synthesizer;
mod update;

pub use synthesizer::*;
pub use update::*;
