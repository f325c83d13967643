//! PvP sub-game state machines (spec §4.7): duels, arena matches, and
//! battlegrounds. Each is an isolated worker per spec §5 — this module
//! only wires the pure state machines together behind a registry; the
//! actor/task wiring mirrors [`crate::zone::spawn_zone`].

pub mod arena;
pub mod battleground;
pub mod duel;

use std::collections::HashMap;

use crate::error::PvpError;

use arena::ArenaMatch;
use battleground::BattlegroundInstance;
use duel::Duel;

/// Read-mostly registry of live PvP instances, keyed by an opaque match
/// id allocated by the caller (typically the world router).
#[derive(Default)]
pub struct PvpRegistry {
    duels: HashMap<u64, Duel>,
    arenas: HashMap<u64, ArenaMatch>,
    battlegrounds: HashMap<u64, BattlegroundInstance>,
}

impl PvpRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_duel(&mut self, id: u64, duel: Duel) {
        self.duels.insert(id, duel);
    }

    pub fn duel(&self, id: u64) -> Result<&Duel, PvpError> {
        self.duels.get(&id).ok_or(PvpError::NoSuchDuel(id))
    }

    pub fn duel_mut(&mut self, id: u64) -> Result<&mut Duel, PvpError> {
        self.duels.get_mut(&id).ok_or(PvpError::NoSuchDuel(id))
    }

    pub fn remove_duel(&mut self, id: u64) -> Option<Duel> {
        self.duels.remove(&id)
    }

    pub fn insert_arena(&mut self, id: u64, arena: ArenaMatch) {
        self.arenas.insert(id, arena);
    }

    pub fn arena(&self, id: u64) -> Result<&ArenaMatch, PvpError> {
        self.arenas.get(&id).ok_or(PvpError::NoSuchArena(id))
    }

    pub fn arena_mut(&mut self, id: u64) -> Result<&mut ArenaMatch, PvpError> {
        self.arenas.get_mut(&id).ok_or(PvpError::NoSuchArena(id))
    }

    pub fn remove_arena(&mut self, id: u64) -> Option<ArenaMatch> {
        self.arenas.remove(&id)
    }

    pub fn insert_battleground(&mut self, id: u64, bg: BattlegroundInstance) {
        self.battlegrounds.insert(id, bg);
    }

    pub fn battleground_mut(&mut self, id: u64) -> Option<&mut BattlegroundInstance> {
        self.battlegrounds.get_mut(&id)
    }

    /// A player already in a duel or ad-hoc arena match cannot be
    /// challenged again until it ends.
    pub fn is_busy(&self, guid: u64) -> bool {
        self.duels
            .values()
            .any(|d| d.state != duel::DuelState::Ended && (d.challenger == guid || d.defender == guid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vec3;
    use std::time::Instant;

    #[test]
    fn busy_check_ignores_ended_duels() {
        let mut registry = PvpRegistry::new();
        let mut duel = Duel::new(1, 2, Vec3::zero(), 40.0, Instant::now());
        duel.state = duel::DuelState::Ended;
        registry.insert_duel(1, duel);
        assert!(!registry.is_busy(1));
    }

    #[test]
    fn busy_check_flags_active_participants() {
        let mut registry = PvpRegistry::new();
        let duel = Duel::new(1, 2, Vec3::zero(), 40.0, Instant::now());
        registry.insert_duel(1, duel);
        assert!(registry.is_busy(1));
        assert!(registry.is_busy(2));
        assert!(!registry.is_busy(3));
    }
}
