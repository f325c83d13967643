//! Arena match state machine (spec §4.7):
//! `preparation -> active -> ending -> complete`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::error::PvpError;
use crate::types::RuntimeConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bracket {
    TwoVTwo,
    ThreeVThree,
    FiveVFive,
}

impl Bracket {
    pub fn team_size(self) -> usize {
        match self {
            Bracket::TwoVTwo => 2,
            Bracket::ThreeVThree => 3,
            Bracket::FiveVFive => 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArenaState {
    Preparation,
    Active,
    Ending,
    Complete,
}

/// A registered team (`team_id > 0`) persists a team rating across
/// matches; an ad-hoc team (`team_id == 0`) only updates its members'
/// individual player records.
#[derive(Debug, Clone)]
pub struct Team {
    pub team_id: u64,
    pub members: Vec<u64>,
    pub rating: i32,
    pub alive: usize,
}

impl Team {
    pub fn new(team_id: u64, members: Vec<u64>, rating: i32) -> Self {
        let alive = members.len();
        Self { team_id, members, rating, alive }
    }

    pub fn is_registered(&self) -> bool {
        self.team_id > 0
    }
}

pub struct ArenaMatch {
    pub bracket: Bracket,
    pub teams: [Team; 2],
    pub state: ArenaState,
    started_at: Option<Instant>,
    ending_started_at: Option<Instant>,
    pub winner_team_index: Option<usize>,
}

/// Duration of the `Ending` state once a winner is decided. Not part of
/// `RuntimeConfig` (spec §6 doesn't name it as a tunable).
const ENDING: Duration = Duration::from_secs(10);
const DAMPENING_CAP: f32 = 100.0;

/// The config-driven knobs for one match (spec §6:
/// `arena_preparation_ms`, `arena_round_cap_ms`, `dampening_start_ms`,
/// `dampening_tick_ms`, `dampening_per_tick`). Threaded through
/// explicitly the same way `duel::Duel::tick` takes its timeouts as
/// parameters, rather than read from a global.
#[derive(Debug, Clone, Copy)]
pub struct ArenaTiming {
    pub preparation: Duration,
    pub match_cap: Duration,
    pub dampening_start: Duration,
    pub dampening_step: Duration,
    pub dampening_per_step: f32,
}

impl ArenaTiming {
    pub fn from_config(config: &RuntimeConfig) -> Self {
        Self {
            preparation: Duration::from_millis(config.arena_preparation_ms),
            match_cap: Duration::from_millis(config.arena_round_cap_ms),
            dampening_start: Duration::from_millis(config.dampening_start_ms),
            dampening_step: Duration::from_millis(config.dampening_tick_ms),
            dampening_per_step: config.dampening_per_tick as f32,
        }
    }
}

impl ArenaMatch {
    pub fn new(bracket: Bracket, team_a: Team, team_b: Team) -> Self {
        Self {
            bracket,
            teams: [team_a, team_b],
            state: ArenaState::Preparation,
            started_at: None,
            ending_started_at: None,
            winner_team_index: None,
        }
    }

    fn team_index_of(&self, guid: u64) -> Option<usize> {
        self.teams.iter().position(|t| t.members.contains(&guid))
    }

    /// Current damage/heal dampening percent, based on time spent active.
    /// Starts accruing at `timing.dampening_start`, `+dampening_per_step`
    /// every `dampening_step`, capped at 100%.
    pub fn dampening_percent(&self, now: Instant, timing: &ArenaTiming) -> f32 {
        let Some(started) = self.started_at else { return 0.0 };
        let elapsed = now.duration_since(started);
        if elapsed <= timing.dampening_start {
            return 0.0;
        }
        let over = elapsed - timing.dampening_start;
        let steps = (over.as_secs_f32() / timing.dampening_step.as_secs_f32()).floor();
        (steps * timing.dampening_per_step).min(DAMPENING_CAP)
    }

    pub fn tick(&mut self, now: Instant, timing: &ArenaTiming) {
        match self.state {
            ArenaState::Preparation => {
                if self.started_at.is_none() {
                    self.started_at = Some(now);
                }
            }
            ArenaState::Active => {
                if let Some(started) = self.started_at {
                    if now.duration_since(started) >= timing.match_cap {
                        self.begin_ending(self.higher_alive_team(), now);
                    }
                }
            }
            ArenaState::Ending => {
                if let Some(started) = self.ending_started_at {
                    if now.duration_since(started) >= ENDING {
                        self.state = ArenaState::Complete;
                    }
                }
            }
            ArenaState::Complete => {}
        }
    }

    /// Called once preparation's countdown elapses.
    pub fn begin_active(&mut self, now: Instant) -> Result<(), PvpError> {
        if self.state != ArenaState::Preparation {
            return Err(PvpError::InvalidState("arena not in preparation"));
        }
        self.state = ArenaState::Active;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn preparation_elapsed(&self, now: Instant) -> Duration {
        self.started_at.map(|s| now.duration_since(s)).unwrap_or_default()
    }

    pub fn preparation_remaining(&self, timing: &ArenaTiming) -> Duration {
        timing.preparation
    }

    /// Registers a death; if it empties a team's alive count, ends the
    /// match in favor of the other team.
    pub fn report_death(&mut self, guid: u64, now: Instant) {
        if self.state != ArenaState::Active {
            return;
        }
        let Some(idx) = self.team_index_of(guid) else { return };
        self.teams[idx].alive = self.teams[idx].alive.saturating_sub(1);
        if self.teams[idx].alive == 0 {
            let winner = 1 - idx;
            self.begin_ending(winner, now);
        }
    }

    fn higher_alive_team(&self) -> usize {
        if self.teams[0].alive >= self.teams[1].alive { 0 } else { 1 }
    }

    fn begin_ending(&mut self, winner_index: usize, now: Instant) {
        self.state = ArenaState::Ending;
        self.ending_started_at = Some(now);
        self.winner_team_index = Some(winner_index);
    }

    /// Pairwise Elo-style rating delta for the winning and losing team,
    /// computed once the match enters `Ending`. `k_factor` is the maximum
    /// points exchanged in a fully-unexpected outcome.
    pub fn rating_deltas(&self, k_factor: f32) -> Option<(i32, i32)> {
        let winner = self.winner_team_index?;
        let loser = 1 - winner;
        let expected_winner = expected_score(self.teams[winner].rating, self.teams[loser].rating);
        let delta_winner = (k_factor * (1.0 - expected_winner)).round() as i32;
        let delta_loser = -delta_winner;
        Some(if winner == 0 { (delta_winner, delta_loser) } else { (delta_loser, delta_winner) })
    }
}

fn expected_score(rating_a: i32, rating_b: i32) -> f32 {
    1.0 / (1.0 + 10f32.powf((rating_b - rating_a) as f32 / 400.0))
}

/// Applies the winning/losing rating deltas computed by `rating_deltas`
/// to per-player and (if registered) per-team rating maps.
pub fn apply_rating_deltas(
    teams: &[Team; 2],
    deltas: (i32, i32),
    player_ratings: &mut HashMap<u64, i32>,
    team_ratings: &mut HashMap<u64, i32>,
) {
    for (team, delta) in teams.iter().zip([deltas.0, deltas.1]) {
        for &member in &team.members {
            *player_ratings.entry(member).or_insert(1500) += delta;
        }
        if team.is_registered() {
            *team_ratings.entry(team.team_id).or_insert(1500) += delta;
        }
    }
}
