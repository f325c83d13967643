//! Duel state machine (spec §4.7): `pending -> countdown -> active -> ended`.

use std::time::{Duration, Instant};

use crate::error::PvpError;
use crate::types::Vec3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelState {
    Pending,
    Countdown,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    Defeat,
    Forfeit,
    Flee,
    Timeout,
}

pub struct Duel {
    pub challenger: u64,
    pub defender: u64,
    pub position: Vec3,
    pub boundary_radius: f32,
    pub state: DuelState,
    pending_started_at: Instant,
    countdown_started_at: Option<Instant>,
    active_started_at: Option<Instant>,
    /// When a participant leaves the boundary sphere, the grace window
    /// starts; if they don't return in time the duel ends as a flee.
    flee_grace_started_at: Option<(u64, Instant)>,
    pub end_reason: Option<EndReason>,
    pub winner: Option<u64>,
}

impl Duel {
    pub fn new(challenger: u64, defender: u64, position: Vec3, boundary_radius: f32, now: Instant) -> Self {
        Self {
            challenger,
            defender,
            position,
            boundary_radius,
            state: DuelState::Pending,
            pending_started_at: now,
            countdown_started_at: None,
            active_started_at: None,
            flee_grace_started_at: None,
            end_reason: None,
            winner: None,
        }
    }

    fn participants(&self) -> (u64, u64) {
        (self.challenger, self.defender)
    }

    fn is_participant(&self, guid: u64) -> bool {
        guid == self.challenger || guid == self.defender
    }

    fn other(&self, guid: u64) -> u64 {
        if guid == self.challenger {
            self.defender
        } else {
            self.challenger
        }
    }

    pub fn accept(&mut self, now: Instant) -> Result<(), PvpError> {
        if self.state != DuelState::Pending {
            return Err(PvpError::InvalidState("duel not pending"));
        }
        self.state = DuelState::Countdown;
        self.countdown_started_at = Some(now);
        Ok(())
    }

    pub fn forfeit(&mut self, guid: u64, now: Instant) -> Result<(), PvpError> {
        if !self.is_participant(guid) {
            return Err(PvpError::InvalidState("not a duel participant"));
        }
        self.end(EndReason::Forfeit, self.other(guid), now);
        Ok(())
    }

    /// Advances timers: pending timeout, countdown completion, and total
    /// duel timeout. Call once per zone tick.
    pub fn tick(
        &mut self,
        now: Instant,
        pending_timeout: Duration,
        countdown: Duration,
        total_timeout: Duration,
        flee_grace: Duration,
        health_percents: impl Fn(u64) -> f32,
    ) {
        match self.state {
            DuelState::Pending => {
                if now.duration_since(self.pending_started_at) >= pending_timeout {
                    self.state = DuelState::Ended;
                    self.end_reason = Some(EndReason::Timeout);
                }
            }
            DuelState::Countdown => {
                if let Some(started) = self.countdown_started_at {
                    if now.duration_since(started) >= countdown {
                        self.state = DuelState::Active;
                        self.active_started_at = Some(now);
                    }
                }
            }
            DuelState::Active => {
                if let Some((fleeing, grace_started)) = self.flee_grace_started_at {
                    if now.duration_since(grace_started) >= flee_grace {
                        self.end(EndReason::Flee, self.other(fleeing), now);
                        return;
                    }
                }
                if let Some(started) = self.active_started_at {
                    if now.duration_since(started) >= total_timeout {
                        let (a, b) = self.participants();
                        let winner = if health_percents(a) >= health_percents(b) { a } else { b };
                        self.end(EndReason::Timeout, winner, now);
                    }
                }
            }
            DuelState::Ended => {}
        }
    }

    /// Checks a participant's position against the boundary sphere,
    /// starting or clearing the flee grace window as needed.
    pub fn check_boundary(&mut self, guid: u64, position: Vec3, now: Instant) {
        if self.state != DuelState::Active || !self.is_participant(guid) {
            return;
        }
        let inside = position.distance(&self.position) <= self.boundary_radius;
        match (inside, self.flee_grace_started_at) {
            (false, None) => self.flee_grace_started_at = Some((guid, now)),
            (true, Some((fleeing, _))) if fleeing == guid => self.flee_grace_started_at = None,
            _ => {}
        }
    }

    /// Gated damage report: only damage between the two duel participants
    /// progresses the duel. Returns `true` if the duel ended as a result.
    pub fn report_damage(&mut self, attacker: u64, victim: u64, victim_health_after: i64, now: Instant) -> bool {
        if self.state != DuelState::Active || !self.is_participant(attacker) || !self.is_participant(victim) {
            return false;
        }
        if victim_health_after <= 0 {
            self.end(EndReason::Defeat, attacker, now);
            true
        } else {
            false
        }
    }

    fn end(&mut self, reason: EndReason, winner: u64, _now: Instant) {
        self.state = DuelState::Ended;
        self.end_reason = Some(reason);
        self.winner = Some(winner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accept_moves_pending_to_countdown() {
        let mut duel = Duel::new(1, 2, Vec3::zero(), 40.0, Instant::now());
        duel.accept(Instant::now()).unwrap();
        assert_eq!(duel.state, DuelState::Countdown);
    }

    #[test]
    fn countdown_elapses_into_active() {
        let mut duel = Duel::new(1, 2, Vec3::zero(), 40.0, Instant::now());
        duel.accept(Instant::now()).unwrap();
        let later = Instant::now() + Duration::from_secs(6);
        duel.tick(later, Duration::from_secs(30), Duration::from_secs(5), Duration::from_secs(600), Duration::from_secs(5), |_| 100.0);
        assert_eq!(duel.state, DuelState::Active);
    }

    #[test]
    fn damage_between_third_party_does_not_progress_duel() {
        let mut duel = Duel::new(1, 2, Vec3::zero(), 40.0, Instant::now());
        duel.accept(Instant::now()).unwrap();
        duel.state = DuelState::Active;
        let ended = duel.report_damage(1, 99, 0, Instant::now());
        assert!(!ended);
        assert_eq!(duel.state, DuelState::Active);
    }

    #[test]
    fn victim_health_zero_ends_duel_with_attacker_as_winner() {
        let mut duel = Duel::new(1, 2, Vec3::zero(), 40.0, Instant::now());
        duel.state = DuelState::Active;
        let ended = duel.report_damage(1, 2, 0, Instant::now());
        assert!(ended);
        assert_eq!(duel.winner, Some(1));
        assert_eq!(duel.end_reason, Some(EndReason::Defeat));
    }

    #[test]
    fn leaving_boundary_and_not_returning_ends_as_flee() {
        let mut duel = Duel::new(1, 2, Vec3::zero(), 40.0, Instant::now());
        duel.state = DuelState::Active;
        duel.active_started_at = Some(Instant::now());
        let now = Instant::now();
        duel.check_boundary(1, Vec3::new(100.0, 0.0, 0.0), now);
        let later = now + Duration::from_secs(6);
        duel.tick(later, Duration::from_secs(30), Duration::from_secs(5), Duration::from_secs(600), Duration::from_secs(5), |_| 100.0);
        assert_eq!(duel.state, DuelState::Ended);
        assert_eq!(duel.end_reason, Some(EndReason::Flee));
        assert_eq!(duel.winner, Some(2));
    }

    #[test]
    fn returning_within_grace_clears_the_flee_timer() {
        let mut duel = Duel::new(1, 2, Vec3::zero(), 40.0, Instant::now());
        duel.state = DuelState::Active;
        duel.active_started_at = Some(Instant::now());
        let now = Instant::now();
        duel.check_boundary(1, Vec3::new(100.0, 0.0, 0.0), now);
        duel.check_boundary(1, Vec3::zero(), now + Duration::from_secs(1));
        let later = now + Duration::from_secs(6);
        duel.tick(later, Duration::from_secs(30), Duration::from_secs(5), Duration::from_secs(600), Duration::from_secs(5), |_| 100.0);
        assert_eq!(duel.state, DuelState::Active);
    }

    #[test]
    fn total_timeout_breaks_tie_by_health_percent() {
        let mut duel = Duel::new(1, 2, Vec3::zero(), 40.0, Instant::now());
        duel.state = DuelState::Active;
        let start = Instant::now();
        duel.active_started_at = Some(start);
        let later = start + Duration::from_secs(601);
        duel.tick(later, Duration::from_secs(30), Duration::from_secs(5), Duration::from_secs(600), Duration::from_secs(5), |guid| {
            if guid == 1 { 80.0 } else { 20.0 }
        });
        assert_eq!(duel.state, DuelState::Ended);
        assert_eq!(duel.end_reason, Some(EndReason::Timeout));
        assert_eq!(duel.winner, Some(1));
    }
}
