//! Per-subsystem error types.
//!
//! Each worker owns its own error enum rather than funneling everything
//! through one crate-wide type — mirrors how the teacher keeps
//! `janet::Result`/`anyhow::Result` scoped to the module producing the
//! failure.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("table `{0}` not found")]
    UnknownTable(String),
    #[error("entry {1} not found in table `{0}`")]
    NotFound(String, i64),
    #[error("content file `{0}` malformed: {1}")]
    Malformed(String, String),
    #[error("continuation token is stale or unknown")]
    InvalidContinuation,
    #[error("io error reading `{0}`: {1}")]
    Io(String, String),
}

#[derive(Debug, Error)]
pub enum SpatialError {
    #[error("guid {0} already present in grid")]
    AlreadyPresent(u64),
    #[error("guid {0} not present in grid")]
    NotPresent(u64),
}

#[derive(Debug, Error)]
pub enum ZoneError {
    #[error("entity {0} not found")]
    EntityNotFound(u64),
    #[error("entity {0} already present")]
    EntityAlreadyPresent(u64),
    #[error("spatial grid invariant violated for guid {0}")]
    SpatialInvariantViolated(u64),
    #[error("zone transfer to {0:?} failed: {1}")]
    TransferFailed(crate::types::ZoneRef, String),
}

#[derive(Debug, Error)]
pub enum AiError {
    #[error("creature {0} has no AI state")]
    MissingAiState(u64),
    #[error("creature {0} is not alive")]
    NotAlive(u64),
    #[error("target {0} not found for creature {1}")]
    TargetNotFound(u64, u64),
}

#[derive(Debug, Error)]
pub enum EncounterError {
    #[error("phase `{0}` not found")]
    UnknownPhase(String),
    #[error("inherit_from cycle detected starting at `{0}`")]
    InheritanceCycle(String),
    #[error("ability `{0}` not found")]
    UnknownAbility(String),
    #[error("encounter is not currently engaged")]
    NotEngaged,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame exceeds maximum packet size: {0} bytes")]
    FrameTooLarge(u32),
    #[error("unexpected end of buffer while decoding {0}")]
    UnexpectedEof(&'static str),
    #[error("opcode {0:#06x} unknown for this connection type")]
    UnknownOpcode(u16),
    #[error("opcode {0:#06x} has no bound handler")]
    UnhandledOpcode(u16),
    #[error("opcode {0:#06x} invalid for session stage {1:?}")]
    OpcodeOutOfStage(u16, crate::connection::SessionStage),
    #[error("malformed field `{0}`: {1}")]
    MalformedField(&'static str, String),
    #[error("string length exceeds protocol maximum")]
    StringTooLong,
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("framing error: {0}")]
    Framing(String),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum PvpError {
    #[error("target is already in a duel or queue")]
    TargetBusy,
    #[error("no such duel {0}")]
    NoSuchDuel(u64),
    #[error("no such arena match {0}")]
    NoSuchArena(u64),
    #[error("action invalid for current state {0}")]
    InvalidState(&'static str),
}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("no zone instance registered for {0:?}")]
    NoSuchInstance(crate::types::ZoneRef),
    #[error("GUID space for type {0:?} exhausted")]
    GuidSpaceExhausted(crate::entity::EntityType),
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("record not found")]
    NotFound,
    #[error("timed out after {0} retries")]
    Timeout(u32),
    #[error("database error: {0}")]
    Database(String),
}
