//! Realm Core
//!
//! Zone/instance runtime core for a sharded action-combat MMO world server:
//! per-zone entity and spatial state, creature AI and combat scheduling,
//! boss-encounter phase engines, PvP sub-game state machines, packet
//! dispatch, and the connection/session state machine that ties them to a
//! TCP client.
//!
//! ## Architecture
//!
//! ```text
//! WorldRouter  (router.rs)          ← GUID allocation, zone transfer
//!   └── ZoneInstance  (zone.rs)     ← single-writer actor per shard
//!         ├── SpatialGrid  (spatial.rs)
//!         ├── CreatureZoneManager  (ai.rs)
//!         └── EncounterEngine  (encounter/)
//! ConnectionServer  (connection.rs) ← per-session worker, dispatch (protocol/)
//! PvpRegistry  (pvp/)               ← duels, arena matches, battlegrounds
//! ContentCatalog  (catalog/)        ← read-only, process-wide game data
//! ```
//!
//! Every actor above owns its state exclusively; workers communicate only
//! by message passing, never by sharing a lock across an await point.

pub mod ai;
pub mod catalog;
pub mod config;
pub mod connection;
pub mod encounter;
pub mod entity;
pub mod error;
pub mod guid;
pub mod persistence;
pub mod protocol;
pub mod pvp;
pub mod router;
pub mod spatial;
pub mod types;
pub mod zone;

pub use entity::{AiState, AiStateKind, Entity, EntityType};
pub use error::{
    AiError, CatalogError, ConnectionError, EncounterError, PersistenceError, ProtocolError, PvpError,
    RouterError, SpatialError, ZoneError,
};
pub use router::WorldRouter;
pub use types::{RuntimeConfig, Vec3, ZoneRef};
pub use zone::{ZoneHandle, ZoneState};
