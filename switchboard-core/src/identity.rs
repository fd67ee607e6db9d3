//! Identity types for Switchboard entities

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Entity identifier. UUIDv7 carries a Unix timestamp in its high bits, so
/// ids sort by creation time without a separate sequence column.
pub type EntityId = Uuid;

/// All timestamps are UTC.
pub type Timestamp = DateTime<Utc>;

/// Mint a fresh, creation-ordered [`EntityId`].
pub fn new_entity_id() -> EntityId {
    Uuid::now_v7()
}
