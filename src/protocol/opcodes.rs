//! Per-category opcode tables (spec §4.6: "Known opcode tables for auth,
//! realm, and world are data-driven").
//!
//! A received opcode with no table entry is *unknown*; one with a table
//! entry but no bound handler is *unhandled*. Both are tracked at the
//! dispatch boundary (see [`crate::protocol::dispatch`]), never treated as
//! a framing error.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionCategory {
    Auth,
    Realm,
    World,
}

pub mod world {
    pub const SERVER_ITEM_MOVE: u16 = 0x0100;
    pub const SERVER_ITEM_SWAP: u16 = 0x0101;
    pub const SERVER_CHAT: u16 = 0x0110;
    pub const CLIENT_CHAT: u16 = 0x0111;
    pub const SERVER_CHAT_RESULT: u16 = 0x0112;
    pub const SERVER_QUEST_ADD: u16 = 0x0120;
    pub const SERVER_QUEST_UPDATE: u16 = 0x0121;
    pub const SERVER_QUEST_REMOVE: u16 = 0x0122;
    pub const SERVER_TELEGRAPH: u16 = 0x0130;
    pub const SERVER_ITEM_VISUAL_UPDATE: u16 = 0x0131;
    pub const SERVER_BUFF_APPLY: u16 = 0x0140;
    pub const SERVER_BUFF_REMOVE: u16 = 0x0141;
    pub const SERVER_PLAYER_DEATH: u16 = 0x0150;
}

/// The set of opcodes valid for a connection category. Unrecognized
/// opcodes are rejected at dispatch as "unknown" rather than panicking.
pub struct OpcodeTable {
    names: HashMap<u16, &'static str>,
}

impl OpcodeTable {
    pub fn world() -> Self {
        use world::*;
        let mut names = HashMap::new();
        names.insert(SERVER_ITEM_MOVE, "ServerItemMove");
        names.insert(SERVER_ITEM_SWAP, "ServerItemSwap");
        names.insert(SERVER_CHAT, "ServerChat");
        names.insert(CLIENT_CHAT, "ClientChat");
        names.insert(SERVER_CHAT_RESULT, "ServerChatResult");
        names.insert(SERVER_QUEST_ADD, "ServerQuestAdd");
        names.insert(SERVER_QUEST_UPDATE, "ServerQuestUpdate");
        names.insert(SERVER_QUEST_REMOVE, "ServerQuestRemove");
        names.insert(SERVER_TELEGRAPH, "ServerTelegraph");
        names.insert(SERVER_ITEM_VISUAL_UPDATE, "ServerItemVisualUpdate");
        names.insert(SERVER_BUFF_APPLY, "ServerBuffApply");
        names.insert(SERVER_BUFF_REMOVE, "ServerBuffRemove");
        names.insert(SERVER_PLAYER_DEATH, "ServerPlayerDeath");
        Self { names }
    }

    /// Auth and realm connections carry their own (smaller, largely
    /// out-of-scope per spec §1) opcode sets; this core only needs to know
    /// they exist as distinct categories for session-stage gating.
    pub fn auth() -> Self {
        Self {
            names: HashMap::new(),
        }
    }

    pub fn realm() -> Self {
        Self {
            names: HashMap::new(),
        }
    }

    pub fn for_category(category: ConnectionCategory) -> Self {
        match category {
            ConnectionCategory::Auth => Self::auth(),
            ConnectionCategory::Realm => Self::realm(),
            ConnectionCategory::World => Self::world(),
        }
    }

    pub fn name_of(&self, opcode: u16) -> Option<&'static str> {
        self.names.get(&opcode).copied()
    }

    pub fn is_known(&self, opcode: u16) -> bool {
        self.names.contains_key(&opcode)
    }
}
