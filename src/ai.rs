//! `CreatureZoneManager`: fixed-interval AI tick over one zone's creatures
//! (spec §4.4).
//!
//! One manager per `ZoneInstance`. The tick loop itself is a plain
//! function over a `ZoneState` slice — kept free of `tokio::time` so it
//! can be driven by the zone actor's own interval timer (spec §5: "the AI
//! tick batch cap exists for exactly [keeping per-message work short]").

use std::time::{Duration, Instant};

use crate::entity::{AiStateKind, Entity, EntityType};
use crate::error::AiError;
use crate::types::Vec3;

/// A creature's template-derived combat stats. Fetched once per tick from
/// the content catalog by the caller; kept separate from `Entity` since
/// the entity itself only stores the template id.
#[derive(Debug, Clone, Copy)]
pub struct CreatureTemplate {
    pub min_damage: i64,
    pub max_damage: i64,
    pub attack_range: f32,
    pub attack_cooldown: Duration,
    pub move_speed: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CreatureAction {
    None,
    Attack { target: u64 },
    MoveTo { position: Vec3 },
    EnterIdle,
    CompleteEvade,
}

/// Outcome of `damage_creature` (spec §4.4).
#[derive(Debug, Clone)]
pub enum DamageOutcome {
    Damaged { remaining: i64, max: i64 },
    Killed { guid: u64, killer: u64 },
}

/// Selects which creatures need processing this tick: in combat, evading,
/// or holding unresolved threat (spec §4.4). Order is stable (entity
/// iteration order from the caller) so a batch cap truncates deterministically
/// given a deterministic input order.
pub fn creatures_needing_processing<'a>(creatures: &'a [&'a Entity]) -> Vec<&'a Entity> {
    creatures
        .iter()
        .copied()
        .filter(|e| {
            e.ai.as_ref().is_some_and(|ai| {
                matches!(ai.state, AiStateKind::Combat | AiStateKind::Evade) || !ai.threat_table.is_empty()
            })
        })
        .collect()
}

/// Runs one AI step for a single creature, per spec §4.4 steps 1-4.
/// Returns the action the caller (the owning `ZoneInstance`) must realize
/// — this function never mutates zone state directly, keeping AI decision
/// logic testable without a live actor.
pub fn tick_creature(
    entity: &Entity,
    template: &CreatureTemplate,
    current_target: Option<&Entity>,
    now: Instant,
    combat_timeout_ms: u64,
) -> Result<CreatureAction, AiError> {
    let ai = entity.ai.as_ref().ok_or(AiError::MissingAiState(entity.guid))?;

    match ai.state {
        AiStateKind::Combat => {
            // Step 1: dual-condition combat exit.
            if ai.combat_may_exit(now, combat_timeout_ms) {
                return Ok(CreatureAction::EnterIdle);
            }
            // Step 2.
            let Some(target) = current_target else {
                return Ok(CreatureAction::None);
            };
            let in_range = entity.position.distance(&target.position) <= template.attack_range;
            let cooldown_elapsed = ai
                .last_attack_time
                .map(|t| now.duration_since(t) >= template.attack_cooldown)
                .unwrap_or(true);
            if in_range && cooldown_elapsed {
                Ok(CreatureAction::Attack { target: target.guid })
            } else if !in_range {
                Ok(CreatureAction::MoveTo { position: target.position })
            } else {
                Ok(CreatureAction::None)
            }
        }
        AiStateKind::Evade => {
            // Step 4.
            if entity.position.distance(&ai.spawn_position) <= 1.0 {
                Ok(CreatureAction::CompleteEvade)
            } else {
                Ok(CreatureAction::MoveTo { position: ai.spawn_position })
            }
        }
        AiStateKind::Idle | AiStateKind::Dead => Ok(CreatureAction::None),
    }
}

/// Rolls damage within `[min_damage, max_damage]` using `rng`. Caller
/// supplies the RNG so tests can pin outcomes deterministically.
pub fn roll_damage(template: &CreatureTemplate, rng: &mut impl rand::Rng) -> i64 {
    if template.max_damage <= template.min_damage {
        return template.min_damage.max(0);
    }
    rng.gen_range(template.min_damage..=template.max_damage)
}

/// `damage_creature` (spec §4.4): clamps health, accrues threat, enters
/// combat, and signals a kill when health reaches zero. Respawn-timer
/// scheduling and loot/XP rolls are the caller's responsibility (they need
/// the content catalog and the zone's broadcast channel, neither of which
/// this pure step has access to).
pub fn damage_creature(
    entity: &mut Entity,
    attacker_guid: u64,
    amount: i64,
    now: Instant,
) -> Result<DamageOutcome, AiError> {
    if !entity.is_alive() {
        return Err(AiError::NotAlive(entity.guid));
    }
    let removed = entity.apply_damage(amount);
    let ai = entity.ai.as_mut().ok_or(AiError::MissingAiState(entity.guid))?;
    ai.add_threat(attacker_guid, removed.max(0) as u64);
    ai.enter_combat(now);

    if entity.health == 0 {
        if let Some(ai) = entity.ai.as_mut() {
            ai.enter_dead();
        }
        Ok(DamageOutcome::Killed {
            guid: entity.guid,
            killer: attacker_guid,
        })
    } else {
        Ok(DamageOutcome::Damaged {
            remaining: entity.health,
            max: entity.max_health,
        })
    }
}

/// Completes a respawn: full health, spawn position, `dead -> idle`,
/// cleared threat table (spec §4.4 "Respawn").
pub fn respawn_creature(entity: &mut Entity) -> Result<(), AiError> {
    let spawn_position = entity
        .ai
        .as_ref()
        .ok_or(AiError::MissingAiState(entity.guid))?
        .spawn_position;
    entity.heal_to_full();
    entity.position = spawn_position;
    if let Some(ai) = entity.ai.as_mut() {
        ai.respawn();
    }
    Ok(())
}

/// Applies an `EntityType::Creature` filter and a batch cap over the
/// entities that need processing this tick (spec §4.4: "Up to a batch cap
/// per tick (default 100); the remainder is deferred").
pub fn select_tick_batch<'a>(creatures: &'a [&'a Entity], batch_cap: usize) -> (&'a [&'a Entity], usize) {
    let needing = creatures
        .iter()
        .all(|e| e.entity_type == EntityType::Creature);
    debug_assert!(needing, "select_tick_batch expects creature entities only");
    if creatures.len() <= batch_cap {
        (creatures, 0)
    } else {
        (&creatures[..batch_cap], creatures.len() - batch_cap)
    }
}
