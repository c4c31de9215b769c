use thiserror::Error;

/// Faults raised by the economy storage layer and the operations built on it.
///
/// Expected business outcomes (cooldowns, missing items, away pets) are not
/// errors; they travel as [`crate::economy::Reason`] inside an
/// [`crate::economy::ActionResult`].
#[derive(Debug, Error)]
pub enum EconomyError {
    /// Wrapper around sled's error type.
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Wrapper around bincode serialization and deserialization errors.
    #[error("serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    /// Wrapper around IO errors (directory creation, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Returned when fetching a record that is not present.
    #[error("record not found: {0}")]
    NotFound(String),

    /// Returned when deserializing a record with an unexpected schema version.
    #[error("schema mismatch for {entity}: expected {expected}, got {found}")]
    SchemaMismatch {
        entity: &'static str,
        expected: u8,
        found: u8,
    },

    /// Unexpected conditions, e.g. a failed transfer compensation.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Inventory consumption failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    #[error("item {item_id} is not in the inventory")]
    NotOwned { item_id: String },

    #[error("not enough {item_id}: have {have}, wanted {wanted}")]
    NotEnough {
        item_id: String,
        have: u32,
        wanted: u32,
    },
}
