//! Compiled encounter definition: phases, abilities, and effects (spec
//! §4.5). Grounded in the pack's `baras-app` boss-definition shape
//! (`BossEncounterDefinition`, `PhaseDefinition`, `PhaseTrigger`) —
//! generalized from a log-analysis schema into a runtime-executed one.

use std::collections::{HashMap, HashSet};

use crate::error::EncounterError;
use crate::types::Vec3;

use super::coordination::CoordinationMechanic;
use super::effects::TelegraphShape;

#[derive(Debug, Clone, PartialEq)]
pub enum PhaseCondition {
    HealthBelow(f32),
    HealthAbove(f32),
    HealthBetween(f32, f32),
    Always,
    /// Fires once when health crosses at or below `threshold`. Unlike the
    /// other conditions, a match here is consumed by the engine after the
    /// intermission runs its course — see
    /// [`EncounterEngine::on_boss_damaged`](super::EncounterEngine::on_boss_damaged) —
    /// so control returns to ordinary health-based selection instead of
    /// re-entering the same intermission for the rest of the health band.
    IntermissionAtHealth(f32),
}

impl PhaseCondition {
    pub fn matches(&self, health_percent: f32) -> bool {
        match self {
            PhaseCondition::HealthBelow(threshold) => health_percent < *threshold,
            PhaseCondition::HealthAbove(threshold) => health_percent > *threshold,
            PhaseCondition::HealthBetween(low, high) => health_percent > *low && health_percent <= *high,
            PhaseCondition::Always => true,
            PhaseCondition::IntermissionAtHealth(threshold) => health_percent <= *threshold,
        }
    }
}

/// An ability's declared effect: a closed sum type covering every
/// mechanic shape an ability can carry (spec §4.5, §9). Effects within
/// an ability run in declared order at impact time, via
/// [`super::effects::execute_effects`].
#[derive(Debug, Clone)]
pub enum Effect {
    Telegraph { shape: TelegraphShape, duration_ms: u64, delay_ms: u64 },
    Damage { amount: i64 },
    Debuff { name: String, duration_ms: u64 },
    Buff { name: String, duration_ms: u64 },
    Heal { amount: i64 },
    Movement { knockback_distance: f32 },
    Spawn { creature_id: u32, offset: Vec3 },
    Environmental { hazard_id: u32 },
    Coordination(CoordinationMechanic),
}

#[derive(Debug, Clone)]
pub struct AbilityDefinition {
    pub name: String,
    pub cooldown_ms: u64,
    pub interrupt_armor_cost: u32,
    pub uninterruptible: bool,
    pub telegraph_duration_ms: u64,
    pub telegraph_delay_ms: u64,
    /// Executed in this order at impact time (spec §4.5).
    pub effects: Vec<Effect>,
}

#[derive(Debug, Clone)]
pub struct PhaseDefinition {
    pub name: String,
    pub condition: PhaseCondition,
    /// An intermission runs for a fixed duration once entered, then
    /// returns control to health-based selection (spec §4.5).
    pub intermission_duration_ms: Option<u64>,
    pub boss_immune: bool,
    pub inherit_from: Option<String>,
    pub own_abilities: Vec<String>,
}

/// A fully compiled encounter, validated at construction time (phase
/// inheritance cycles are rejected here rather than at runtime, per spec
/// §4.5: "cycles are rejected at compile-time validation").
pub struct EncounterDefinition {
    pub phases: Vec<PhaseDefinition>,
    pub abilities: HashMap<String, AbilityDefinition>,
    pub default_interrupt_armor: u32,
    pub interrupt_armor_recovery_ms: u64,
}

impl EncounterDefinition {
    pub fn new(
        phases: Vec<PhaseDefinition>,
        abilities: HashMap<String, AbilityDefinition>,
        default_interrupt_armor: u32,
        interrupt_armor_recovery_ms: u64,
    ) -> Result<Self, EncounterError> {
        let def = Self {
            phases,
            abilities,
            default_interrupt_armor,
            interrupt_armor_recovery_ms,
        };
        for phase in &def.phases {
            def.effective_abilities(&phase.name)?;
        }
        Ok(def)
    }

    pub fn phase(&self, name: &str) -> Result<&PhaseDefinition, EncounterError> {
        self.phases
            .iter()
            .find(|p| p.name == name)
            .ok_or_else(|| EncounterError::UnknownPhase(name.to_string()))
    }

    /// Selects the first phase whose condition matches `health_percent`
    /// (spec §4.5: "select the first phase whose condition matches").
    pub fn select_phase(&self, health_percent: f32) -> Option<&PhaseDefinition> {
        self.phases.iter().find(|p| p.condition.matches(health_percent))
    }

    /// Like [`select_phase`](Self::select_phase), but skips any phase name
    /// in `exclude` — used by the engine to suppress a one-shot
    /// `IntermissionAtHealth` phase that already fired this descent, until
    /// health recovers back above its threshold.
    pub fn select_phase_excluding(&self, health_percent: f32, exclude: &HashSet<String>) -> Option<&PhaseDefinition> {
        self.phases
            .iter()
            .find(|p| !exclude.contains(&p.name) && p.condition.matches(health_percent))
    }

    /// The union of a phase's own abilities with its `inherit_from`
    /// chain's effective abilities, applied recursively. Detects cycles by
    /// walking the chain with a visited set.
    pub fn effective_abilities(&self, phase_name: &str) -> Result<HashSet<String>, EncounterError> {
        let mut visited = HashSet::new();
        self.effective_abilities_inner(phase_name, &mut visited)
    }

    fn effective_abilities_inner(
        &self,
        phase_name: &str,
        visited: &mut HashSet<String>,
    ) -> Result<HashSet<String>, EncounterError> {
        if !visited.insert(phase_name.to_string()) {
            return Err(EncounterError::InheritanceCycle(phase_name.to_string()));
        }
        let phase = self.phase(phase_name)?;
        let mut abilities: HashSet<String> = phase.own_abilities.iter().cloned().collect();
        if let Some(parent) = &phase.inherit_from {
            abilities.extend(self.effective_abilities_inner(parent, visited)?);
        }
        Ok(abilities)
    }

    pub fn ability(&self, name: &str) -> Result<&AbilityDefinition, EncounterError> {
        self.abilities
            .get(name)
            .ok_or_else(|| EncounterError::UnknownAbility(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phase(name: &str, condition: PhaseCondition, inherit_from: Option<&str>, abilities: &[&str]) -> PhaseDefinition {
        PhaseDefinition {
            name: name.to_string(),
            condition,
            intermission_duration_ms: None,
            boss_immune: false,
            inherit_from: inherit_from.map(str::to_string),
            own_abilities: abilities.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn effective_abilities_unions_inheritance_chain() {
        let def = EncounterDefinition::new(
            vec![
                phase("p1", PhaseCondition::Always, None, &["slam"]),
                phase("p2", PhaseCondition::Always, Some("p1"), &["cleave"]),
            ],
            HashMap::new(),
            3,
            10_000,
        )
        .unwrap();
        let abilities = def.effective_abilities("p2").unwrap();
        assert!(abilities.contains("slam"));
        assert!(abilities.contains("cleave"));
    }

    #[test]
    fn inheritance_cycle_is_rejected_at_construction() {
        let result = EncounterDefinition::new(
            vec![
                phase("a", PhaseCondition::Always, Some("b"), &[]),
                phase("b", PhaseCondition::Always, Some("a"), &[]),
            ],
            HashMap::new(),
            3,
            10_000,
        );
        assert!(result.is_err());
    }

    #[test]
    fn select_phase_picks_first_matching_condition() {
        let def = EncounterDefinition::new(
            vec![
                phase("enrage", PhaseCondition::HealthBelow(10.0), None, &[]),
                phase("p2", PhaseCondition::HealthBelow(50.0), None, &[]),
                phase("p1", PhaseCondition::Always, None, &[]),
            ],
            HashMap::new(),
            3,
            10_000,
        )
        .unwrap();
        assert_eq!(def.select_phase(75.0).unwrap().name, "p1");
        assert_eq!(def.select_phase(40.0).unwrap().name, "p2");
        assert_eq!(def.select_phase(5.0).unwrap().name, "enrage");
    }

    #[test]
    fn health_between_matches_only_its_band() {
        let condition = PhaseCondition::HealthBetween(20.0, 50.0);
        assert!(!condition.matches(60.0));
        assert!(condition.matches(50.0));
        assert!(condition.matches(21.0));
        assert!(!condition.matches(20.0));
    }

    #[test]
    fn select_phase_excluding_skips_named_phases() {
        let def = EncounterDefinition::new(
            vec![
                phase("intermission", PhaseCondition::IntermissionAtHealth(50.0), None, &[]),
                phase("p1", PhaseCondition::Always, None, &[]),
            ],
            HashMap::new(),
            3,
            10_000,
        )
        .unwrap();
        let mut exclude = HashSet::new();
        assert_eq!(def.select_phase_excluding(45.0, &exclude).unwrap().name, "intermission");
        exclude.insert("intermission".to_string());
        assert_eq!(def.select_phase_excluding(45.0, &exclude).unwrap().name, "p1");
    }
}
