//! Effect execution and telegraph shape geometry (spec §4.5).

use std::collections::HashMap;

use crate::types::Vec3;

use super::coordination::{self, PlayerSnapshot};
use super::definition::Effect;

#[derive(Debug, Clone, Copy)]
pub enum TelegraphShape {
    Circle { radius: f32 },
    Cone { angle_degrees: f32, length: f32 },
    Line { width: f32, length: f32 },
    Rectangle { width: f32, length: f32 },
    Donut { inner_radius: f32, outer_radius: f32 },
    Cross { width: f32, length: f32 },
    RoomWide,
    Wave { width: f32, speed: f32 },
}

/// Whether `point` falls inside `shape`, anchored at `origin` and facing
/// `facing_degrees` (0 = +x axis, measured counter-clockwise in the XZ
/// plane). `elapsed_ms` only matters for `Wave`, whose ring expands over
/// time.
pub fn point_in_shape(
    shape: &TelegraphShape,
    origin: Vec3,
    facing_degrees: f32,
    point: Vec3,
    elapsed_ms: u64,
) -> bool {
    let dx = point.x - origin.x;
    let dz = point.z - origin.z;
    let distance = (dx * dx + dz * dz).sqrt();

    match shape {
        TelegraphShape::Circle { radius } => distance <= *radius,
        TelegraphShape::Cone { angle_degrees, length } => {
            if distance > *length {
                return false;
            }
            let point_angle = dz.atan2(dx).to_degrees();
            let delta = angle_diff(point_angle, facing_degrees);
            delta.abs() <= angle_degrees / 2.0
        }
        TelegraphShape::Line { width, length } => {
            let (local_x, local_z) = rotate_into_local(dx, dz, facing_degrees);
            local_x >= 0.0 && local_x <= *length && local_z.abs() <= width / 2.0
        }
        TelegraphShape::Rectangle { width, length } => {
            let (local_x, local_z) = rotate_into_local(dx, dz, facing_degrees);
            local_x.abs() <= length / 2.0 && local_z.abs() <= width / 2.0
        }
        TelegraphShape::Donut { inner_radius, outer_radius } => {
            distance >= *inner_radius && distance <= *outer_radius
        }
        TelegraphShape::Cross { width, length } => {
            let (local_x, local_z) = rotate_into_local(dx, dz, facing_degrees);
            (local_x.abs() <= length / 2.0 && local_z.abs() <= width / 2.0)
                || (local_z.abs() <= length / 2.0 && local_x.abs() <= width / 2.0)
        }
        TelegraphShape::RoomWide => true,
        TelegraphShape::Wave { width, speed } => {
            let ring_radius = speed * (elapsed_ms as f32 / 1000.0);
            (distance - ring_radius).abs() <= width / 2.0
        }
    }
}

fn angle_diff(a: f32, b: f32) -> f32 {
    let mut diff = (a - b) % 360.0;
    if diff > 180.0 {
        diff -= 360.0;
    } else if diff < -180.0 {
        diff += 360.0;
    }
    diff
}

fn rotate_into_local(dx: f32, dz: f32, facing_degrees: f32) -> (f32, f32) {
    let rad = -facing_degrees.to_radians();
    let (sin, cos) = rad.sin_cos();
    (dx * cos - dz * sin, dx * sin + dz * cos)
}

// ---------------------------------------------------------------------------
// Effect execution
// ---------------------------------------------------------------------------

/// Read-only context an ability's declared effects execute against at
/// impact time.
pub struct EffectContext<'a> {
    pub origin: Vec3,
    pub facing_degrees: f32,
    pub elapsed_ms: u64,
    pub players: &'a [PlayerSnapshot],
}

/// The result of applying one declared [`Effect`], in the same order the
/// ability declared it.
#[derive(Debug, Clone)]
pub enum EffectOutcome {
    Telegraph { affected: Vec<u64> },
    Damage { amounts: HashMap<u64, i64> },
    Debuff { name: String, duration_ms: u64 },
    Buff { name: String, duration_ms: u64 },
    Heal { amount: i64 },
    Movement { knockback_distance: f32 },
    Spawn { creature_id: u32, position: Vec3 },
    Environmental { hazard_id: u32 },
    Coordination { amounts: HashMap<u64, i64>, penalty: i64 },
}

/// Runs an ability's effects in declared order (spec §4.5: "effects
/// within an ability execute in declared order at impact time").
pub fn execute_effects(effects: &[Effect], ctx: &EffectContext) -> Vec<EffectOutcome> {
    effects.iter().map(|effect| execute_one(effect, ctx)).collect()
}

fn execute_one(effect: &Effect, ctx: &EffectContext) -> EffectOutcome {
    match effect {
        Effect::Telegraph { shape, .. } => {
            let affected = ctx
                .players
                .iter()
                .filter(|p| point_in_shape(shape, ctx.origin, ctx.facing_degrees, p.position, ctx.elapsed_ms))
                .map(|p| p.guid)
                .collect();
            EffectOutcome::Telegraph { affected }
        }
        Effect::Damage { amount } => {
            let amounts = ctx.players.iter().map(|p| (p.guid, *amount)).collect();
            EffectOutcome::Damage { amounts }
        }
        Effect::Debuff { name, duration_ms } => EffectOutcome::Debuff {
            name: name.clone(),
            duration_ms: *duration_ms,
        },
        Effect::Buff { name, duration_ms } => EffectOutcome::Buff {
            name: name.clone(),
            duration_ms: *duration_ms,
        },
        Effect::Heal { amount } => EffectOutcome::Heal { amount: *amount },
        Effect::Movement { knockback_distance } => EffectOutcome::Movement {
            knockback_distance: *knockback_distance,
        },
        Effect::Spawn { creature_id, offset } => EffectOutcome::Spawn {
            creature_id: *creature_id,
            position: Vec3::new(ctx.origin.x + offset.x, ctx.origin.y + offset.y, ctx.origin.z + offset.z),
        },
        Effect::Environmental { hazard_id } => EffectOutcome::Environmental { hazard_id: *hazard_id },
        Effect::Coordination(mechanic) => {
            let (amounts, penalty) = coordination::resolve_mechanic(mechanic, ctx.players, ctx.origin);
            EffectOutcome::Coordination { amounts, penalty }
        }
    }
}

// ---------------------------------------------------------------------------
// Interrupt armor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InterruptEffect {
    Stun { duration_ms: u64 },
    Vulnerable { multiplier: f32, duration_ms: u64 },
    MarkOfOblivion,
    Knockdown,
    PhaseSkip,
}

/// Tracks one boss's interrupt-armor pool. `uninterruptible` abilities
/// never consume the pool (spec §4.5: "infinite armor").
#[derive(Debug, Clone)]
pub struct InterruptArmor {
    pub stacks: u32,
    pub max_stacks: u32,
}

impl InterruptArmor {
    pub fn new(max_stacks: u32) -> Self {
        Self { stacks: max_stacks, max_stacks }
    }

    /// Returns `true` if this interrupt attempt emptied the pool (the
    /// ability being cast should now be interrupted).
    pub fn consume_one(&mut self, uninterruptible: bool) -> bool {
        if uninterruptible {
            return false;
        }
        if self.stacks == 0 {
            return false;
        }
        self.stacks -= 1;
        self.stacks == 0
    }

    pub fn restore_full(&mut self) {
        self.stacks = self.max_stacks;
    }
}

// ---------------------------------------------------------------------------
// `pass`: a carried debuff with a timeout
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct PassToken {
    pub holder: u64,
    pub remaining_ms: u64,
    pub stacks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PassOutcome {
    StillCarried,
    Expired { damage: i64 },
    Passed { to: u64 },
}

/// Advances a pass token by `elapsed_ms`; if it expires, `damage_on_expire`
/// applies to the holder. Passing to `new_holder` either transfers
/// (stacks stays 1) or duplicates (`stack_on_same` adds a stack when the
/// same holder is re-passed the token), matching spec §4.5's "passing
/// transfers or duplicates per `stack_on_same`".
pub fn advance_pass_token(
    token: &mut PassToken,
    elapsed_ms: u64,
    damage_on_expire: i64,
) -> PassOutcome {
    if token.remaining_ms <= elapsed_ms {
        PassOutcome::Expired { damage: damage_on_expire }
    } else {
        token.remaining_ms -= elapsed_ms;
        PassOutcome::StillCarried
    }
}

pub fn pass_token_to(token: &mut PassToken, new_holder: u64, reset_ms: u64, stack_on_same: bool) -> PassOutcome {
    if stack_on_same && token.holder == new_holder {
        token.stacks += 1;
    } else {
        token.holder = new_holder;
        token.stacks = 1;
    }
    token.remaining_ms = reset_ms;
    PassOutcome::Passed { to: new_holder }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_contains_points_within_radius() {
        let shape = TelegraphShape::Circle { radius: 5.0 };
        assert!(point_in_shape(&shape, Vec3::zero(), 0.0, Vec3::new(4.0, 0.0, 0.0), 0));
        assert!(!point_in_shape(&shape, Vec3::zero(), 0.0, Vec3::new(6.0, 0.0, 0.0), 0));
    }

    #[test]
    fn cone_excludes_points_outside_the_angle() {
        let shape = TelegraphShape::Cone { angle_degrees: 90.0, length: 10.0 };
        assert!(point_in_shape(&shape, Vec3::zero(), 0.0, Vec3::new(5.0, 0.0, 0.0), 0));
        assert!(!point_in_shape(&shape, Vec3::zero(), 0.0, Vec3::new(0.0, 0.0, 5.0), 0));
    }

    #[test]
    fn donut_excludes_center_and_far_outside() {
        let shape = TelegraphShape::Donut { inner_radius: 3.0, outer_radius: 6.0 };
        assert!(!point_in_shape(&shape, Vec3::zero(), 0.0, Vec3::new(1.0, 0.0, 0.0), 0));
        assert!(point_in_shape(&shape, Vec3::zero(), 0.0, Vec3::new(4.0, 0.0, 0.0), 0));
        assert!(!point_in_shape(&shape, Vec3::zero(), 0.0, Vec3::new(10.0, 0.0, 0.0), 0));
    }

    #[test]
    fn interrupt_armor_depletes_and_reports_emptied_pool() {
        let mut armor = InterruptArmor::new(2);
        assert!(!armor.consume_one(false));
        assert!(armor.consume_one(false));
        assert_eq!(armor.stacks, 0);
    }

    #[test]
    fn uninterruptible_ability_never_consumes_armor() {
        let mut armor = InterruptArmor::new(1);
        assert!(!armor.consume_one(true));
        assert_eq!(armor.stacks, 1);
    }

    #[test]
    fn pass_token_expires_and_deals_damage() {
        let mut token = PassToken { holder: 1, remaining_ms: 500, stacks: 1 };
        assert_eq!(advance_pass_token(&mut token, 1000, 50), PassOutcome::Expired { damage: 50 });
    }

    #[test]
    fn pass_token_to_same_holder_stacks_when_configured() {
        let mut token = PassToken { holder: 1, remaining_ms: 500, stacks: 1 };
        pass_token_to(&mut token, 1, 3000, true);
        assert_eq!(token.stacks, 2);
        pass_token_to(&mut token, 2, 3000, true);
        assert_eq!(token.stacks, 1);
        assert_eq!(token.holder, 2);
    }

    #[test]
    fn execute_effects_runs_in_declared_order_and_dispatches_each_variant() {
        let players = vec![
            PlayerSnapshot { guid: 1, position: Vec3::new(1.0, 0.0, 0.0) },
            PlayerSnapshot { guid: 2, position: Vec3::new(100.0, 0.0, 0.0) },
        ];
        let ctx = EffectContext {
            origin: Vec3::zero(),
            facing_degrees: 0.0,
            elapsed_ms: 0,
            players: &players,
        };
        let effects = vec![
            Effect::Telegraph {
                shape: TelegraphShape::Circle { radius: 5.0 },
                duration_ms: 1000,
                delay_ms: 0,
            },
            Effect::Damage { amount: 25 },
        ];
        let outcomes = execute_effects(&effects, &ctx);
        assert_eq!(outcomes.len(), 2);
        match &outcomes[0] {
            EffectOutcome::Telegraph { affected } => assert_eq!(affected, &vec![1]),
            other => panic!("expected Telegraph first, got {other:?}"),
        }
        match &outcomes[1] {
            EffectOutcome::Damage { amounts } => {
                assert_eq!(amounts.get(&1), Some(&25));
                assert_eq!(amounts.get(&2), Some(&25));
            }
            other => panic!("expected Damage second, got {other:?}"),
        }
    }
}
