//! Entity and creature-AI data model (spec §3).

use std::collections::HashMap;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::types::Vec3;

// ---------------------------------------------------------------------------
// Entity type
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    Player,
    Creature,
    ItemOnGround,
    Trigger,
}

impl EntityType {
    pub fn discriminant(self) -> u8 {
        match self {
            EntityType::Player => 1,
            EntityType::Creature => 2,
            EntityType::ItemOnGround => 3,
            EntityType::Trigger => 4,
        }
    }

    pub fn from_discriminant(d: u8) -> Option<Self> {
        match d {
            1 => Some(EntityType::Player),
            2 => Some(EntityType::Creature),
            3 => Some(EntityType::ItemOnGround),
            4 => Some(EntityType::Trigger),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// The runtime object placed in the world.
///
/// Invariant: `0 <= health <= max_health`; for creatures,
/// `health == 0 <-> ai.state == AiState::Dead`.
#[derive(Debug, Clone)]
pub struct Entity {
    pub guid: u64,
    pub entity_type: EntityType,
    pub position: Vec3,
    pub faction: u32,
    pub level: u16,
    pub health: i64,
    pub max_health: i64,
    pub name: String,
    pub display_info: u32,
    /// Template reference; only meaningful for creatures.
    pub creature_id: Option<u32>,
    /// Present only for creature entities.
    pub ai: Option<AiState>,
}

impl Entity {
    pub fn new_player(guid: u64, name: impl Into<String>, position: Vec3) -> Self {
        Self {
            guid,
            entity_type: EntityType::Player,
            position,
            faction: 0,
            level: 1,
            health: 100,
            max_health: 100,
            name: name.into(),
            display_info: 0,
            creature_id: None,
            ai: None,
        }
    }

    pub fn new_creature(
        guid: u64,
        creature_id: u32,
        name: impl Into<String>,
        position: Vec3,
        max_health: i64,
        faction: u32,
    ) -> Self {
        Self {
            guid,
            entity_type: EntityType::Creature,
            position,
            faction,
            level: 1,
            health: max_health,
            max_health,
            name: name.into(),
            display_info: 0,
            creature_id: Some(creature_id),
            ai: Some(AiState::new(position)),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Applies damage, clamping health to `[0, max_health]`.
    ///
    /// Returns the actual amount of health removed.
    pub fn apply_damage(&mut self, amount: i64) -> i64 {
        let amount = amount.max(0);
        let before = self.health;
        self.health = (self.health - amount).clamp(0, self.max_health);
        before - self.health
    }

    pub fn heal_to_full(&mut self) {
        self.health = self.max_health;
    }
}

// ---------------------------------------------------------------------------
// AI state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiStateKind {
    Idle,
    Combat,
    Evade,
    Dead,
}

/// Per-creature AI state, coupled 1:1 with its entity.
#[derive(Debug, Clone)]
pub struct AiState {
    pub state: AiStateKind,
    /// Cumulative threat per attacker GUID; always non-negative.
    pub threat_table: HashMap<u64, u64>,
    pub spawn_position: Vec3,
    pub combat_start_time: Option<Instant>,
    pub last_attack_time: Option<Instant>,
}

impl AiState {
    pub fn new(spawn_position: Vec3) -> Self {
        Self {
            state: AiStateKind::Idle,
            threat_table: HashMap::new(),
            spawn_position,
            combat_start_time: None,
            last_attack_time: None,
        }
    }

    pub fn add_threat(&mut self, attacker: u64, amount: u64) {
        *self.threat_table.entry(attacker).or_insert(0) += amount;
    }

    /// Highest-threat attacker, ties broken by lower GUID for determinism.
    pub fn highest_threat(&self) -> Option<u64> {
        self.threat_table
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(guid, _)| *guid)
    }

    pub fn enter_combat(&mut self, now: Instant) {
        if self.state != AiStateKind::Combat {
            self.state = AiStateKind::Combat;
            self.combat_start_time = Some(now);
        }
    }

    pub fn enter_evade(&mut self) {
        self.state = AiStateKind::Evade;
        self.threat_table.clear();
    }

    pub fn enter_dead(&mut self) {
        self.state = AiStateKind::Dead;
        self.threat_table.clear();
        self.combat_start_time = None;
    }

    pub fn respawn(&mut self) {
        self.state = AiStateKind::Idle;
        self.threat_table.clear();
        self.combat_start_time = None;
        self.last_attack_time = None;
    }

    /// Whether combat may exit: both the timeout has elapsed *and* the
    /// threat table is empty (spec §9 Open Question — the stricter
    /// dual-condition reading is adopted).
    pub fn combat_may_exit(&self, now: Instant, combat_timeout_ms: u64) -> bool {
        if self.state != AiStateKind::Combat {
            return false;
        }
        let timed_out = self
            .combat_start_time
            .map(|start| now.duration_since(start).as_millis() as u64 > combat_timeout_ms)
            .unwrap_or(true);
        timed_out && self.threat_table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn health_zero_implies_dead_state_is_reachable() {
        let mut e = Entity::new_creature(1, 1, "Wolf", Vec3::zero(), 100, 0);
        e.apply_damage(100);
        assert_eq!(e.health, 0);
        e.ai.as_mut().unwrap().enter_dead();
        assert_eq!(e.ai.as_ref().unwrap().state, AiStateKind::Dead);
        assert!(!e.is_alive());
    }

    #[test]
    fn highest_threat_breaks_ties_by_lower_guid() {
        let mut ai = AiState::new(Vec3::zero());
        ai.add_threat(50, 100);
        ai.add_threat(10, 100);
        assert_eq!(ai.highest_threat(), Some(10));
    }

    #[test]
    fn combat_may_exit_requires_both_timeout_and_empty_threat() {
        let mut ai = AiState::new(Vec3::zero());
        let start = Instant::now() - Duration::from_secs(40);
        ai.state = AiStateKind::Combat;
        ai.combat_start_time = Some(start);
        ai.add_threat(5, 1);
        // timed out, but threat table non-empty -> must not exit.
        assert!(!ai.combat_may_exit(Instant::now(), 30_000));
        ai.threat_table.clear();
        assert!(ai.combat_may_exit(Instant::now(), 30_000));
    }

    #[test]
    fn apply_damage_clamps_to_zero() {
        let mut e = Entity::new_player(1, "p", Vec3::zero());
        let removed = e.apply_damage(1000);
        assert_eq!(e.health, 0);
        assert_eq!(removed, 100);
    }
}
