//! Core shared types: vectors, zone/instance identity, and runtime config.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Math
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    pub fn distance_squared(&self, other: &Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance(&self, other: &Vec3) -> f32 {
        self.distance_squared(other).sqrt()
    }

    pub fn lerp_towards(&self, target: &Vec3, max_step: f32) -> Vec3 {
        let dist = self.distance(target);
        if dist <= max_step || dist == 0.0 {
            return *target;
        }
        let t = max_step / dist;
        Vec3::new(
            self.x + (target.x - self.x) * t,
            self.y + (target.y - self.y) * t,
            self.z + (target.z - self.z) * t,
        )
    }
}

impl std::fmt::Display for Vec3 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.2}, {:.2}, {:.2})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Zone / instance identity
// ---------------------------------------------------------------------------

/// Identifies one running shard of a zone: `{zone_id, instance_id}`.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ZoneRef {
    pub zone_id: u32,
    pub instance_id: u32,
}

impl ZoneRef {
    pub fn new(zone_id: u32, instance_id: u32) -> Self {
        Self {
            zone_id,
            instance_id,
        }
    }
}

impl std::fmt::Display for ZoneRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.zone_id, self.instance_id)
    }
}

// ---------------------------------------------------------------------------
// Runtime configuration (§6)
// ---------------------------------------------------------------------------

/// Named, defaulted configuration options, as enumerated in spec §6.
///
/// Loaded from a TOML file via the `config` crate, with environment and CLI
/// overrides layered on top in `src/bin/server.rs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub ai_tick_interval_ms: u64,
    pub max_creatures_per_tick: usize,
    pub combat_timeout_ms: u64,
    pub spatial_cell_size: f32,
    pub default_page_size: usize,
    pub duel_request_timeout_ms: u64,
    pub duel_countdown_s: u64,
    pub duel_boundary_radius: f32,
    pub duel_total_timeout_ms: u64,
    pub arena_preparation_ms: u64,
    pub arena_round_cap_ms: u64,
    pub dampening_start_ms: u64,
    pub dampening_tick_ms: u64,
    pub dampening_per_tick: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            ai_tick_interval_ms: 1000,
            max_creatures_per_tick: 100,
            combat_timeout_ms: 30_000,
            spatial_cell_size: 50.0,
            default_page_size: 100,
            duel_request_timeout_ms: 30_000,
            duel_countdown_s: 5,
            duel_boundary_radius: 40.0,
            duel_total_timeout_ms: 600_000,
            arena_preparation_ms: 30_000,
            arena_round_cap_ms: 600_000,
            dampening_start_ms: 300_000,
            dampening_tick_ms: 10_000,
            dampening_per_tick: 1,
        }
    }
}
