//! `EncounterEngine`: boss-fight phase state machine (spec §4.5).
//!
//! Runs inside the owning `ZoneInstance`'s single-writer step — the engine
//! itself holds no concurrency primitives, matching spec §5's requirement
//! that "the encounter engine and the creature tick are colocated... so
//! that target selection, damage, and phase transitions see one
//! consistent timeline."

pub mod coordination;
pub mod definition;
pub mod effects;
pub mod targeting;

use std::collections::{HashMap, HashSet};

use crate::error::EncounterError;

use definition::{EncounterDefinition, PhaseCondition, PhaseDefinition};
use effects::InterruptArmor;

#[derive(Debug, Clone, PartialEq)]
pub enum EncounterState {
    NotEngaged,
    Engaged { phase: String },
    Defeated,
    Wiped,
}

pub struct AbilityCooldown {
    pub remaining_ms: u64,
}

/// Owned, mutable encounter runtime state. A thin wrapper around the
/// compiled [`EncounterDefinition`] plus the bits that change during the
/// fight: current state, per-ability cooldowns, and interrupt armor.
pub struct EncounterEngine {
    definition: EncounterDefinition,
    state: EncounterState,
    cooldowns: HashMap<String, AbilityCooldown>,
    armor: InterruptArmor,
    intermission_remaining_ms: Option<u64>,
    /// Names of `IntermissionAtHealth` phases already triggered this
    /// descent; cleared once health recovers back above their threshold
    /// (spec §4.5: an intermission "runs for a fixed duration, then
    /// returns control to health-based selection").
    fired_intermissions: HashSet<String>,
}

impl EncounterEngine {
    pub fn new(definition: EncounterDefinition) -> Self {
        let armor = InterruptArmor::new(definition.default_interrupt_armor);
        Self {
            definition,
            state: EncounterState::NotEngaged,
            cooldowns: HashMap::new(),
            armor,
            intermission_remaining_ms: None,
            fired_intermissions: HashSet::new(),
        }
    }

    pub fn state(&self) -> &EncounterState {
        &self.state
    }

    /// Transitions `not-engaged -> engaged`, selecting the starting phase
    /// from full health.
    pub fn engage(&mut self) -> Result<(), EncounterError> {
        let phase = self
            .definition
            .select_phase(100.0)
            .ok_or_else(|| EncounterError::UnknownPhase("<none matched 100%>".to_string()))?;
        self.enter_phase(phase.name.clone())?;
        self.state = EncounterState::Engaged { phase: self.current_phase_name().unwrap().to_string() };
        Ok(())
    }

    fn current_phase_name(&self) -> Option<&str> {
        match &self.state {
            EncounterState::Engaged { phase } => Some(phase.as_str()),
            _ => None,
        }
    }

    /// Re-evaluates phase selection after a boss damage event (spec §4.5:
    /// "on engaged and after every damage event to the boss, compute
    /// current health percent; select the first phase whose condition
    /// matches"). If selection changes, runs a phase transition.
    pub fn on_boss_damaged(&mut self, health_percent: f32) -> Result<Option<String>, EncounterError> {
        if !matches!(self.state, EncounterState::Engaged { .. }) {
            return Err(EncounterError::NotEngaged);
        }
        if self.intermission_remaining_ms.is_some() {
            // Intermission runs for a fixed duration regardless of damage.
            return Ok(None);
        }
        // Rearm any one-shot intermission whose threshold health has been
        // recovered past (e.g. a heal), so it can trigger again on a later
        // descent.
        for phase in &self.definition.phases {
            if let PhaseCondition::IntermissionAtHealth(threshold) = &phase.condition {
                if health_percent > *threshold {
                    self.fired_intermissions.remove(&phase.name);
                }
            }
        }
        let next_phase = self
            .definition
            .select_phase_excluding(health_percent, &self.fired_intermissions)
            .ok_or_else(|| EncounterError::UnknownPhase(format!("<none matched {health_percent}%>")))?;
        let current = self.current_phase_name().map(str::to_string);
        if current.as_deref() != Some(next_phase.name.as_str()) {
            let name = next_phase.name.clone();
            if matches!(next_phase.condition, PhaseCondition::IntermissionAtHealth(_)) {
                self.fired_intermissions.insert(name.clone());
            }
            self.enter_phase(name.clone())?;
            self.state = EncounterState::Engaged { phase: name.clone() };
            return Ok(Some(name));
        }
        Ok(None)
    }

    /// Performs a phase transition: resets cooldowns for abilities not in
    /// the new effective ability set, clears cooldowns on abilities that
    /// carry over, and arms an intermission timer if applicable.
    fn enter_phase(&mut self, phase_name: String) -> Result<(), EncounterError> {
        let effective = self.definition.effective_abilities(&phase_name)?;
        self.cooldowns.retain(|name, _| effective.contains(name));
        for cooldown in self.cooldowns.values_mut() {
            cooldown.remaining_ms = 0;
        }
        let phase = self.definition.phase(&phase_name)?;
        self.intermission_remaining_ms = phase.intermission_duration_ms;
        Ok(())
    }

    /// Advances intermission timers; once exhausted, control returns to
    /// health-based phase selection on the next damage event.
    pub fn tick_intermission(&mut self, elapsed_ms: u64) {
        if let Some(remaining) = self.intermission_remaining_ms {
            self.intermission_remaining_ms = remaining.checked_sub(elapsed_ms).filter(|r| *r > 0);
        }
    }

    pub fn is_boss_immune(&self) -> Result<bool, EncounterError> {
        match self.current_phase_name() {
            Some(name) => Ok(self.definition.phase(name)?.boss_immune),
            None => Ok(false),
        }
    }

    /// Advances every known ability's cooldown by `elapsed_ms`.
    pub fn tick_cooldowns(&mut self, elapsed_ms: u64) {
        for cooldown in self.cooldowns.values_mut() {
            cooldown.remaining_ms = cooldown.remaining_ms.saturating_sub(elapsed_ms);
        }
    }

    pub fn is_ability_ready(&self, ability: &str) -> bool {
        self.cooldowns
            .get(ability)
            .map(|c| c.remaining_ms == 0)
            .unwrap_or(true)
    }

    /// Call after an ability resolves, to put it on cooldown.
    pub fn start_cooldown(&mut self, ability: &str) -> Result<(), EncounterError> {
        let def = self.definition.ability(ability)?;
        self.cooldowns.insert(
            ability.to_string(),
            AbilityCooldown { remaining_ms: def.cooldown_ms },
        );
        Ok(())
    }

    /// A player interrupt attempt against the currently casting ability.
    /// Returns `true` if the pool was emptied (the ability should now be
    /// interrupted and its `on_interrupt` effect fired).
    pub fn attempt_interrupt(&mut self, ability: &str) -> Result<bool, EncounterError> {
        let def = self.definition.ability(ability)?;
        Ok(self.armor.consume_one(def.uninterruptible))
    }

    pub fn restore_interrupt_armor(&mut self) {
        self.armor.restore_full();
    }

    pub fn defeat(&mut self) {
        self.state = EncounterState::Defeated;
    }

    /// All players dead within the encounter area: runs `on_wipe`,
    /// resetting to full health and `not-engaged` (the boss-health reset
    /// itself is the caller's responsibility, via the zone/entity layer).
    pub fn wipe(&mut self) {
        self.state = EncounterState::Wiped;
        self.cooldowns.clear();
        self.armor.restore_full();
        self.intermission_remaining_ms = None;
        self.fired_intermissions.clear();
    }

    pub fn reset_to_not_engaged(&mut self) {
        self.state = EncounterState::NotEngaged;
        self.fired_intermissions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use definition::{AbilityDefinition, PhaseCondition};

    fn sample_definition() -> EncounterDefinition {
        let phases = vec![
            PhaseDefinition {
                name: "enrage".to_string(),
                condition: PhaseCondition::HealthBelow(20.0),
                intermission_duration_ms: None,
                boss_immune: false,
                inherit_from: Some("p1".to_string()),
                own_abilities: vec!["berserk".to_string()],
            },
            PhaseDefinition {
                name: "intermission".to_string(),
                condition: PhaseCondition::IntermissionAtHealth(50.0),
                intermission_duration_ms: Some(15_000),
                boss_immune: true,
                inherit_from: None,
                own_abilities: vec![],
            },
            PhaseDefinition {
                name: "p1".to_string(),
                condition: PhaseCondition::Always,
                intermission_duration_ms: None,
                boss_immune: false,
                inherit_from: None,
                own_abilities: vec!["slam".to_string()],
            },
        ];
        let mut abilities = HashMap::new();
        abilities.insert(
            "slam".to_string(),
            AbilityDefinition {
                name: "slam".to_string(),
                cooldown_ms: 5000,
                interrupt_armor_cost: 1,
                uninterruptible: false,
                telegraph_duration_ms: 1500,
                telegraph_delay_ms: 0,
                effects: vec![],
            },
        );
        abilities.insert(
            "berserk".to_string(),
            AbilityDefinition {
                name: "berserk".to_string(),
                cooldown_ms: 0,
                interrupt_armor_cost: 0,
                uninterruptible: true,
                telegraph_duration_ms: 0,
                telegraph_delay_ms: 0,
                effects: vec![],
            },
        );
        EncounterDefinition::new(phases, abilities, 3, 10_000).unwrap()
    }

    #[test]
    fn engage_enters_the_phase_matching_full_health() {
        let mut engine = EncounterEngine::new(sample_definition());
        engine.engage().unwrap();
        assert_eq!(engine.state(), &EncounterState::Engaged { phase: "p1".to_string() });
    }

    #[test]
    fn damage_event_transitions_phase_when_threshold_crossed() {
        let mut engine = EncounterEngine::new(sample_definition());
        engine.engage().unwrap();
        let transitioned = engine.on_boss_damaged(45.0).unwrap();
        assert_eq!(transitioned, Some("intermission".to_string()));
    }

    #[test]
    fn same_phase_damage_event_reports_no_transition() {
        let mut engine = EncounterEngine::new(sample_definition());
        engine.engage().unwrap();
        let transitioned = engine.on_boss_damaged(90.0).unwrap();
        assert_eq!(transitioned, None);
    }

    #[test]
    fn intermission_suppresses_further_phase_selection_until_elapsed() {
        let mut engine = EncounterEngine::new(sample_definition());
        engine.engage().unwrap();
        engine.on_boss_damaged(45.0).unwrap();
        assert!(engine.is_boss_immune().unwrap());
        let transitioned = engine.on_boss_damaged(10.0).unwrap();
        assert_eq!(transitioned, None);
    }

    #[test]
    fn entering_enrage_inherits_p1_abilities_and_interrupt_resets_are_independent() {
        let mut engine = EncounterEngine::new(sample_definition());
        engine.engage().unwrap();
        engine.start_cooldown("slam").unwrap();
        engine.on_boss_damaged(15.0).unwrap();
        assert_eq!(engine.state(), &EncounterState::Engaged { phase: "enrage".to_string() });
    }

    #[test]
    fn phase_transition_resets_cooldowns_of_carried_over_abilities() {
        let mut engine = EncounterEngine::new(sample_definition());
        engine.engage().unwrap();
        engine.start_cooldown("slam").unwrap();
        assert!(!engine.is_ability_ready("slam"));
        // "enrage" inherits "slam" from "p1", so it carries over rather
        // than being cancelled — but its cooldown must still reset.
        engine.on_boss_damaged(15.0).unwrap();
        assert_eq!(engine.state(), &EncounterState::Engaged { phase: "enrage".to_string() });
        assert!(engine.is_ability_ready("slam"));
    }

    #[test]
    fn intermission_is_one_shot_and_returns_control_to_health_based_selection() {
        let mut engine = EncounterEngine::new(sample_definition());
        engine.engage().unwrap();
        let transitioned = engine.on_boss_damaged(45.0).unwrap();
        assert_eq!(transitioned, Some("intermission".to_string()));
        assert!(engine.is_boss_immune().unwrap());

        engine.tick_intermission(15_000);
        // Health hasn't moved, but the intermission already fired once —
        // the engine must not re-select it and must instead fall through
        // to the next matching phase.
        let transitioned = engine.on_boss_damaged(45.0).unwrap();
        assert_eq!(transitioned, Some("p1".to_string()));
        assert!(!engine.is_boss_immune().unwrap());
    }

    #[test]
    fn intermission_rearms_once_health_recovers_above_its_threshold() {
        let mut engine = EncounterEngine::new(sample_definition());
        engine.engage().unwrap();
        engine.on_boss_damaged(45.0).unwrap();
        engine.tick_intermission(15_000);
        engine.on_boss_damaged(45.0).unwrap();
        assert_eq!(engine.state(), &EncounterState::Engaged { phase: "p1".to_string() });

        // A heal crosses back above the intermission threshold, rearming it.
        engine.on_boss_damaged(80.0).unwrap();
        let transitioned = engine.on_boss_damaged(45.0).unwrap();
        assert_eq!(transitioned, Some("intermission".to_string()));
    }

    #[test]
    fn interrupt_empties_pool_after_max_stacks_attempts() {
        let mut engine = EncounterEngine::new(sample_definition());
        engine.engage().unwrap();
        assert!(!engine.attempt_interrupt("slam").unwrap());
        assert!(!engine.attempt_interrupt("slam").unwrap());
        assert!(engine.attempt_interrupt("slam").unwrap());
    }

    #[test]
    fn uninterruptible_ability_never_empties_the_pool() {
        let mut engine = EncounterEngine::new(sample_definition());
        engine.engage().unwrap();
        for _ in 0..10 {
            assert!(!engine.attempt_interrupt("berserk").unwrap());
        }
    }

    #[test]
    fn wipe_resets_cooldowns_and_armor() {
        let mut engine = EncounterEngine::new(sample_definition());
        engine.engage().unwrap();
        engine.start_cooldown("slam").unwrap();
        engine.attempt_interrupt("slam").unwrap();
        engine.wipe();
        assert_eq!(engine.state(), &EncounterState::Wiped);
        assert!(engine.is_ability_ready("slam"));
    }
}
