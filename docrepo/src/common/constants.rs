// doc constants
pub const DOC_ID: &str = "_id";
pub const FIELD_SEPARATOR: &str = ".";

// sequence constants
pub const SEQUENCE_COLLECTION: &str = "_Sequence";
pub const SEQUENCE_COUNTER: &str = "counter";

// store constants
pub const MEMORY_SCHEME: &str = "memory://";
pub const DEFAULT_ENDPOINT: &str = "memory://default";

// aggregation constants
pub const GROUP_ID: &str = "_id";

pub const DOCREPO_VERSION: &str = env!("CARGO_PKG_VERSION");
