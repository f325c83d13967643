//! Deterministic target selection (spec §4.5).
//!
//! Every tie-break rule is spelled out in the spec precisely so encounter
//! replays are reproducible; this module is the single place those rules
//! live, shared by every ability that needs a target.

use std::collections::HashMap;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::types::Vec3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub guid: u64,
    pub position: Vec3,
    pub health: i64,
    pub max_health: i64,
}

#[derive(Debug, Clone)]
pub enum TargetSelector {
    Tank,
    SecondThreat,
    Farthest,
    Nearest,
    LowestHealth,
    Random,
    RandomN(usize),
    Marked,
    Chain { range: f32, damage_falloff: f32 },
}

/// Threat table ordered highest-first, ties broken by lower GUID — the
/// same tie-break `AiState::highest_threat` uses for consistency.
fn threat_ranked(threat_table: &HashMap<u64, u64>) -> Vec<u64> {
    let mut ranked: Vec<(u64, u64)> = threat_table.iter().map(|(&g, &t)| (g, t)).collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.into_iter().map(|(guid, _)| guid).collect()
}

pub fn select_targets(
    selector: &TargetSelector,
    candidates: &[Candidate],
    boss_position: Vec3,
    threat_table: &HashMap<u64, u64>,
    marked_guids: &[u64],
    rng: &mut impl Rng,
) -> Vec<u64> {
    match selector {
        TargetSelector::Tank => threat_ranked(threat_table).into_iter().take(1).collect(),
        TargetSelector::SecondThreat => {
            let ranked = threat_ranked(threat_table);
            if ranked.len() < 2 {
                ranked.into_iter().take(1).collect()
            } else {
                vec![ranked[1]]
            }
        }
        TargetSelector::Farthest => pick_by_distance(candidates, boss_position, true),
        TargetSelector::Nearest => pick_by_distance(candidates, boss_position, false),
        TargetSelector::LowestHealth => {
            let mut ranked: Vec<&Candidate> = candidates.iter().collect();
            ranked.sort_by(|a, b| {
                let ratio_a = a.health as f32 / a.max_health.max(1) as f32;
                let ratio_b = b.health as f32 / b.max_health.max(1) as f32;
                ratio_a
                    .partial_cmp(&ratio_b)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.guid.cmp(&b.guid))
            });
            ranked.first().map(|c| c.guid).into_iter().collect()
        }
        TargetSelector::Random => candidates.choose(rng).map(|c| c.guid).into_iter().collect(),
        TargetSelector::RandomN(n) => {
            let mut shuffled: Vec<&Candidate> = candidates.iter().collect();
            shuffled.shuffle(rng);
            shuffled.into_iter().take(*n).map(|c| c.guid).collect()
        }
        TargetSelector::Marked => marked_guids.to_vec(),
        TargetSelector::Chain { range, damage_falloff } => {
            chain_targets(candidates, boss_position, *range, *damage_falloff)
                .into_iter()
                .map(|(guid, _)| guid)
                .collect()
        }
    }
}

fn pick_by_distance(candidates: &[Candidate], origin: Vec3, farthest: bool) -> Vec<u64> {
    let mut ranked: Vec<&Candidate> = candidates.iter().collect();
    ranked.sort_by(|a, b| {
        let da = a.position.distance_squared(&origin);
        let db = b.position.distance_squared(&origin);
        let ord = da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal);
        let ord = if farthest { ord.reverse() } else { ord };
        ord.then(a.guid.cmp(&b.guid))
    });
    ranked.first().map(|c| c.guid).into_iter().collect()
}

/// `chain`: from `origin`, repeatedly jump to the nearest not-yet-hit
/// candidate within `range`, applying `damage_falloff` multiplicatively
/// per jump. Returns `(guid, cumulative_multiplier)` pairs in hit order.
pub fn chain_targets(
    candidates: &[Candidate],
    origin: Vec3,
    range: f32,
    damage_falloff: f32,
) -> Vec<(u64, f32)> {
    let mut hit = Vec::new();
    let mut hit_guids = std::collections::HashSet::new();
    let mut current_position = origin;
    let mut multiplier = 1.0f32;

    loop {
        let next = candidates
            .iter()
            .filter(|c| !hit_guids.contains(&c.guid))
            .filter(|c| c.position.distance(&current_position) <= range)
            .min_by(|a, b| {
                a.position
                    .distance_squared(&current_position)
                    .partial_cmp(&b.position.distance_squared(&current_position))
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.guid.cmp(&b.guid))
            });
        let Some(next) = next else { break };
        hit_guids.insert(next.guid);
        hit.push((next.guid, multiplier));
        current_position = next.position;
        multiplier *= damage_falloff;
    }
    hit
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    fn candidate(guid: u64, x: f32, health: i64, max_health: i64) -> Candidate {
        Candidate {
            guid,
            position: Vec3::new(x, 0.0, 0.0),
            health,
            max_health,
        }
    }

    #[test]
    fn tank_selects_highest_threat() {
        let mut threat = HashMap::new();
        threat.insert(1, 100);
        threat.insert(2, 200);
        let mut rng = StepRng::new(0, 1);
        let targets = select_targets(&TargetSelector::Tank, &[], Vec3::zero(), &threat, &[], &mut rng);
        assert_eq!(targets, vec![2]);
    }

    #[test]
    fn second_threat_falls_back_to_tank_with_fewer_than_two_entries() {
        let mut threat = HashMap::new();
        threat.insert(1, 100);
        let mut rng = StepRng::new(0, 1);
        let targets = select_targets(&TargetSelector::SecondThreat, &[], Vec3::zero(), &threat, &[], &mut rng);
        assert_eq!(targets, vec![1]);
    }

    #[test]
    fn farthest_and_nearest_break_ties_by_lower_guid() {
        let candidates = vec![candidate(5, 10.0, 100, 100), candidate(2, 10.0, 100, 100)];
        let mut rng = StepRng::new(0, 1);
        let nearest = select_targets(&TargetSelector::Nearest, &candidates, Vec3::zero(), &HashMap::new(), &[], &mut rng);
        assert_eq!(nearest, vec![2]);
        let farthest = select_targets(&TargetSelector::Farthest, &candidates, Vec3::zero(), &HashMap::new(), &[], &mut rng);
        assert_eq!(farthest, vec![2]);
    }

    #[test]
    fn lowest_health_ranks_by_ratio_not_absolute() {
        let candidates = vec![candidate(1, 0.0, 50, 100), candidate(2, 0.0, 10, 100)];
        let mut rng = StepRng::new(0, 1);
        let targets = select_targets(&TargetSelector::LowestHealth, &candidates, Vec3::zero(), &HashMap::new(), &[], &mut rng);
        assert_eq!(targets, vec![2]);
    }

    #[test]
    fn chain_hops_to_nearest_unhit_target_with_falloff() {
        let candidates = vec![candidate(1, 5.0, 100, 100), candidate(2, 10.0, 100, 100), candidate(3, 100.0, 100, 100)];
        let hits = chain_targets(&candidates, Vec3::zero(), 20.0, 0.5);
        assert_eq!(hits[0].0, 1);
        assert_eq!(hits[1].0, 2);
        assert_eq!(hits.len(), 2); // target 3 is out of range from target 2
        assert_eq!(hits[0].1, 1.0);
        assert_eq!(hits[1].1, 0.5);
    }
}
