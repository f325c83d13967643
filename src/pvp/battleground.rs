//! Battleground instances: long-running, objective-based PvP (spec §4.7).
//!
//! Spec.md is intentionally light on battlegrounds relative to duels and
//! arenas — this module covers the matchmaker's batching contract and the
//! scoring/objective runtime a spawned instance needs; map-specific
//! objective layouts live in content, not here.

use std::collections::{HashMap, VecDeque};

use crate::types::ZoneRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Faction {
    Exile,
    Dominion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattlegroundState {
    Warmup,
    InProgress,
    Complete,
}

/// One capturable or holdable objective on the map.
#[derive(Debug, Clone)]
pub struct Objective {
    pub id: u32,
    pub owner: Option<Faction>,
    pub points_per_tick: u32,
}

pub struct BattlegroundInstance {
    pub zone_ref: ZoneRef,
    pub state: BattlegroundState,
    pub objectives: Vec<Objective>,
    pub scores: HashMap<Faction, u64>,
    pub score_cap: u64,
}

impl BattlegroundInstance {
    pub fn new(zone_ref: ZoneRef, objectives: Vec<Objective>, score_cap: u64) -> Self {
        let mut scores = HashMap::new();
        scores.insert(Faction::Exile, 0);
        scores.insert(Faction::Dominion, 0);
        Self {
            zone_ref,
            state: BattlegroundState::Warmup,
            objectives,
            scores,
            score_cap,
        }
    }

    pub fn start(&mut self) {
        self.state = BattlegroundState::InProgress;
    }

    pub fn capture(&mut self, objective_id: u32, faction: Faction) {
        if let Some(objective) = self.objectives.iter_mut().find(|o| o.id == objective_id) {
            objective.owner = Some(faction);
        }
    }

    /// Advances scoring by one tick: every owned objective contributes its
    /// points to its owning faction. Returns the winner once a faction
    /// crosses `score_cap`.
    pub fn tick_scoring(&mut self) -> Option<Faction> {
        if self.state != BattlegroundState::InProgress {
            return None;
        }
        for objective in &self.objectives {
            if let Some(owner) = objective.owner {
                *self.scores.entry(owner).or_insert(0) += objective.points_per_tick as u64;
            }
        }
        for (&faction, &score) in &self.scores {
            if score >= self.score_cap {
                self.state = BattlegroundState::Complete;
                return Some(faction);
            }
        }
        None
    }
}

/// Batches queued players into balanced exile/dominion groups once both
/// queues reach `team_size`, handing the matchmaker's supervisor a ready
/// instance roster to spawn.
pub struct Matchmaker {
    team_size: usize,
    exile_queue: VecDeque<u64>,
    dominion_queue: VecDeque<u64>,
}

pub struct MatchedGroup {
    pub exile: Vec<u64>,
    pub dominion: Vec<u64>,
}

impl Matchmaker {
    pub fn new(team_size: usize) -> Self {
        Self {
            team_size,
            exile_queue: VecDeque::new(),
            dominion_queue: VecDeque::new(),
        }
    }

    pub fn enqueue(&mut self, guid: u64, faction: Faction) {
        match faction {
            Faction::Exile => self.exile_queue.push_back(guid),
            Faction::Dominion => self.dominion_queue.push_back(guid),
        }
    }

    /// Pops one matched group if both queues hold enough players.
    pub fn try_form_group(&mut self) -> Option<MatchedGroup> {
        if self.exile_queue.len() < self.team_size || self.dominion_queue.len() < self.team_size {
            return None;
        }
        let exile = self.exile_queue.drain(..self.team_size).collect();
        let dominion = self.dominion_queue.drain(..self.team_size).collect();
        Some(MatchedGroup { exile, dominion })
    }
}
