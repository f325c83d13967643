//! Coordination mechanics (spec §4.5): checked predicates evaluated at an
//! ability's impact time, each independent of the others.

use std::collections::HashMap;

use crate::types::Vec3;

#[derive(Debug, Clone, Copy)]
pub struct PlayerSnapshot {
    pub guid: u64,
    pub position: Vec3,
}

/// `stack`: damage splits across everyone in `center_radius` of `center`
/// if at least `min_players` are present; otherwise `failure_damage` is
/// dealt instead (typically to everyone, decided by the caller).
pub fn resolve_stack(
    players: &[PlayerSnapshot],
    center: Vec3,
    center_radius: f32,
    min_players: usize,
    damage: i64,
    split: bool,
    failure_damage: i64,
) -> HashMap<u64, i64> {
    let inside: Vec<&PlayerSnapshot> = players
        .iter()
        .filter(|p| p.position.distance(&center) <= center_radius)
        .collect();
    let mut result = HashMap::new();
    if inside.len() >= min_players {
        let per_player = if split && !inside.is_empty() {
            damage / inside.len() as i64
        } else {
            damage
        };
        for p in inside {
            result.insert(p.guid, per_player);
        }
    } else {
        for p in players {
            result.insert(p.guid, failure_damage);
        }
    }
    result
}

/// `spread`: any two marked targets within `required_distance` of each
/// other at impact both take `damage`.
pub fn resolve_spread(marked: &[PlayerSnapshot], required_distance: f32, damage: i64) -> HashMap<u64, i64> {
    let mut result = HashMap::new();
    for (i, a) in marked.iter().enumerate() {
        for b in marked.iter().skip(i + 1) {
            if a.position.distance(&b.position) <= required_distance {
                result.insert(a.guid, damage);
                result.insert(b.guid, damage);
            }
        }
    }
    result
}

/// `soak`: splits `base_damage` among players inside the circle if at
/// least `required_players` soak it; each missing soaker (below
/// `required_players`) adds `damage_per_missing` to the boss-side penalty,
/// returned as the second element.
pub fn resolve_soak(
    players: &[PlayerSnapshot],
    center: Vec3,
    radius: f32,
    required_players: usize,
    base_damage: i64,
    damage_per_missing: i64,
) -> (HashMap<u64, i64>, i64) {
    let soakers: Vec<&PlayerSnapshot> = players
        .iter()
        .filter(|p| p.position.distance(&center) <= radius)
        .collect();
    let mut result = HashMap::new();
    if !soakers.is_empty() {
        let per_player = base_damage / soakers.len() as i64;
        for p in &soakers {
            result.insert(p.guid, per_player);
        }
    }
    let missing = required_players.saturating_sub(soakers.len());
    (result, missing as i64 * damage_per_missing)
}

/// `tether`: paired players must stay within `[min_distance, max_distance]`.
/// Too close -> `too_close_damage` to both; too far -> the tether breaks
/// and `break_damage` applies to both.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TetherOutcome {
    Ok,
    TooClose,
    Broken,
}

pub fn evaluate_tether(a: Vec3, b: Vec3, min_distance: f32, max_distance: f32) -> TetherOutcome {
    let d = a.distance(&b);
    if d < min_distance {
        TetherOutcome::TooClose
    } else if d > max_distance {
        TetherOutcome::Broken
    } else {
        TetherOutcome::Ok
    }
}

/// `chain` (of players): every consecutive pair in `ordered_players` must
/// stay within `max_distance`; each break beyond that applies
/// `damage_per_break` to both members of the broken link.
pub fn resolve_player_chain(
    ordered_players: &[PlayerSnapshot],
    max_distance: f32,
    damage_per_break: i64,
) -> HashMap<u64, i64> {
    let mut result = HashMap::new();
    for pair in ordered_players.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if a.position.distance(&b.position) > max_distance {
            *result.entry(a.guid).or_insert(0) += damage_per_break;
            *result.entry(b.guid).or_insert(0) += damage_per_break;
        }
    }
    result
}

/// A declared coordination mechanic, as carried by an ability's
/// `Effect::Coordination` (spec §9). Parameters mirror the corresponding
/// `resolve_*` function's arguments; `center` is supplied by the executor
/// from the ability's impact position, not stored here.
#[derive(Debug, Clone)]
pub enum CoordinationMechanic {
    Stack { center_radius: f32, min_players: usize, damage: i64, split: bool, failure_damage: i64 },
    Spread { required_distance: f32, damage: i64 },
    Soak { radius: f32, required_players: usize, base_damage: i64, damage_per_missing: i64 },
    Chain { max_distance: f32, damage_per_break: i64 },
}

/// Dispatches a declared mechanic against `players`, anchored at `center`.
/// Returns per-player damage plus a boss-side penalty (only `Soak`
/// produces a nonzero one). `tether` isn't modeled here: it checks a
/// single ordered pair and reports a distinct too-close/broken outcome
/// rather than a flat per-player damage map, so callers that need it use
/// [`evaluate_tether`] directly instead of going through an `Effect`.
pub fn resolve_mechanic(mechanic: &CoordinationMechanic, players: &[PlayerSnapshot], center: Vec3) -> (HashMap<u64, i64>, i64) {
    match mechanic {
        CoordinationMechanic::Stack { center_radius, min_players, damage, split, failure_damage } => {
            (resolve_stack(players, center, *center_radius, *min_players, *damage, *split, *failure_damage), 0)
        }
        CoordinationMechanic::Spread { required_distance, damage } => {
            (resolve_spread(players, *required_distance, *damage), 0)
        }
        CoordinationMechanic::Soak { radius, required_players, base_damage, damage_per_missing } => {
            resolve_soak(players, center, *radius, *required_players, *base_damage, *damage_per_missing)
        }
        CoordinationMechanic::Chain { max_distance, damage_per_break } => {
            (resolve_player_chain(players, *max_distance, *damage_per_break), 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(guid: u64, x: f32) -> PlayerSnapshot {
        PlayerSnapshot {
            guid,
            position: Vec3::new(x, 0.0, 0.0),
        }
    }

    #[test]
    fn stack_splits_damage_when_enough_players_present() {
        let players = vec![p(1, 0.0), p(2, 1.0), p(3, 100.0)];
        let result = resolve_stack(&players, Vec3::zero(), 5.0, 2, 100, true, 9999);
        assert_eq!(result.get(&1), Some(&50));
        assert_eq!(result.get(&2), Some(&50));
        assert_eq!(result.get(&3), None);
    }

    #[test]
    fn stack_applies_failure_damage_when_too_few_players() {
        let players = vec![p(1, 0.0)];
        let result = resolve_stack(&players, Vec3::zero(), 5.0, 2, 100, true, 30);
        assert_eq!(result.get(&1), Some(&30));
    }

    #[test]
    fn spread_hits_both_members_of_a_close_pair_only() {
        let marked = vec![p(1, 0.0), p(2, 2.0), p(3, 100.0)];
        let result = resolve_spread(&marked, 5.0, 20);
        assert_eq!(result.get(&1), Some(&20));
        assert_eq!(result.get(&2), Some(&20));
        assert_eq!(result.get(&3), None);
    }

    #[test]
    fn soak_penalizes_missing_soakers() {
        let players = vec![p(1, 0.0)];
        let (damage, penalty) = resolve_soak(&players, Vec3::zero(), 5.0, 3, 90, 10);
        assert_eq!(damage.get(&1), Some(&90));
        assert_eq!(penalty, 20); // 2 missing soakers
    }

    #[test]
    fn tether_detects_too_close_and_broken() {
        assert_eq!(evaluate_tether(Vec3::zero(), Vec3::new(1.0, 0.0, 0.0), 5.0, 20.0), TetherOutcome::TooClose);
        assert_eq!(evaluate_tether(Vec3::zero(), Vec3::new(30.0, 0.0, 0.0), 5.0, 20.0), TetherOutcome::Broken);
        assert_eq!(evaluate_tether(Vec3::zero(), Vec3::new(10.0, 0.0, 0.0), 5.0, 20.0), TetherOutcome::Ok);
    }

    #[test]
    fn player_chain_penalizes_each_broken_consecutive_link() {
        let chain = vec![p(1, 0.0), p(2, 5.0), p(3, 50.0)];
        let result = resolve_player_chain(&chain, 10.0, 15);
        assert_eq!(result.get(&1), None);
        assert_eq!(result.get(&2), Some(&15));
        assert_eq!(result.get(&3), Some(&15));
    }

    #[test]
    fn resolve_mechanic_dispatches_soak_and_returns_its_penalty() {
        let players = vec![p(1, 0.0)];
        let mechanic = CoordinationMechanic::Soak { radius: 5.0, required_players: 3, base_damage: 90, damage_per_missing: 10 };
        let (damage, penalty) = resolve_mechanic(&mechanic, &players, Vec3::zero());
        assert_eq!(damage.get(&1), Some(&90));
        assert_eq!(penalty, 20);
    }
}
