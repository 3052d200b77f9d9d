use crate::errors::{ErrorKind, RepoError, RepoResult};
use chrono::{DateTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use rand::rngs::OsRng;
use rand::Rng;
use std::fmt::{Debug, Display};
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};

static OBJECT_ID_GENERATOR: Lazy<ObjectIdGenerator> = Lazy::new(ObjectIdGenerator::new);

const COUNTER_MASK: u32 = 0x00FF_FFFF;

/// A 12-byte store-native identifier.
///
/// Layout: 4-byte big-endian seconds since the epoch, 5 bytes unique to
/// the process, 3-byte big-endian counter. Ids generated by one process are
/// strictly increasing within the same second.
///
/// Entities keyed by `ObjectId` get one generated client-side on insert when
/// their identity is absent.
///
/// ```rust,ignore
/// let id = ObjectId::new();
/// let parsed: ObjectId = id.to_hex().parse()?;
/// assert_eq!(id, parsed);
/// ```
#[derive(PartialEq, Eq, Ord, PartialOrd, Hash, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectId {
    bytes: [u8; 12],
}

impl ObjectId {
    /// Generates a new unique `ObjectId`.
    pub fn new() -> Self {
        OBJECT_ID_GENERATOR.next_id()
    }

    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        ObjectId { bytes }
    }

    /// Parses a 24 character hex string.
    pub fn parse_str(value: &str) -> RepoResult<ObjectId> {
        if value.len() != 24 {
            log::error!("Invalid object id {}: expected 24 hex characters", value);
            return Err(RepoError::new(
                &format!("Invalid object id '{}': expected 24 hex characters", value),
                ErrorKind::InvalidId,
            ));
        }

        let mut bytes = [0u8; 12];
        hex::decode_to_slice(value, &mut bytes)?;
        Ok(ObjectId { bytes })
    }

    pub fn bytes(&self) -> [u8; 12] {
        self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Creation time encoded in the leading four bytes.
    pub fn timestamp(&self) -> DateTime<Utc> {
        let seconds = u32::from_be_bytes([self.bytes[0], self.bytes[1], self.bytes[2], self.bytes[3]]);
        Utc.timestamp_opt(seconds as i64, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        ObjectId::new()
    }
}

impl FromStr for ObjectId {
    type Err = RepoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ObjectId::parse_str(s)
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Debug for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ObjectId(\"{}\")", self.to_hex())
    }
}

struct ObjectIdGenerator {
    process_unique: [u8; 5],
    counter: AtomicU32,
}

impl ObjectIdGenerator {
    fn new() -> Self {
        let uuid = uuid::Uuid::new_v4();
        let uid = uuid.as_bytes();
        let rnd: [u8; 5] = OsRng.gen();

        let mut process_unique = [0u8; 5];
        for (i, byte) in process_unique.iter_mut().enumerate() {
            *byte = uid[uid.len() - 1 - i] ^ rnd[i];
        }

        let seed = OsRng.gen::<u32>() & COUNTER_MASK;
        log::debug!("Initialized object id generator with counter seed {}", seed);

        ObjectIdGenerator {
            process_unique,
            counter: AtomicU32::new(seed),
        }
    }

    fn next_id(&self) -> ObjectId {
        let seconds = Utc::now().timestamp().max(0) as u32;
        let counter = self.counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0u8; 12];
        bytes[0..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(&self.process_unique);
        bytes[9..12].copy_from_slice(&counter.to_be_bytes()[1..4]);
        ObjectId { bytes }
    }
}
