//! `ZoneInstance`: single-writer actor owning one zone shard's entities and
//! spatial index (spec §4.3).
//!
//! Structured the way the teacher's `WorldService` owns its world state
//! behind a single `Arc<Mutex<..>>` agent — generalized here into an
//! explicit actor task driven by an mpsc command channel, since spec §5
//! requires many independent zone workers rather than one world singleton.

use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc, oneshot};

use crate::entity::{Entity, EntityType};
use crate::error::ZoneError;
use crate::spatial::SpatialGrid;
use crate::types::{RuntimeConfig, Vec3, ZoneRef};

/// Owned zone state. Never shared — every mutation and read goes through
/// [`ZoneInstance::run`]'s single-threaded command loop, which is what
/// makes every invariant in spec §8 hold without locking.
pub struct ZoneState {
    pub zone_ref: ZoneRef,
    entities: HashMap<u64, Entity>,
    spatial_grid: SpatialGrid,
    players: HashSet<u64>,
    creatures: HashSet<u64>,
}

impl ZoneState {
    pub fn new(zone_ref: ZoneRef, cell_size: f32) -> Self {
        Self {
            zone_ref,
            entities: HashMap::new(),
            spatial_grid: SpatialGrid::new(cell_size),
            players: HashSet::new(),
            creatures: HashSet::new(),
        }
    }

    pub fn add_entity(&mut self, entity: Entity) -> Result<(), ZoneError> {
        if self.entities.contains_key(&entity.guid) {
            return Err(ZoneError::EntityAlreadyPresent(entity.guid));
        }
        self.spatial_grid
            .insert(entity.guid, entity.position)
            .map_err(|_| ZoneError::SpatialInvariantViolated(entity.guid))?;
        match entity.entity_type {
            EntityType::Player => {
                self.players.insert(entity.guid);
            }
            EntityType::Creature => {
                self.creatures.insert(entity.guid);
            }
            _ => {}
        }
        self.entities.insert(entity.guid, entity);
        Ok(())
    }

    pub fn remove_entity(&mut self, guid: u64) -> Result<Entity, ZoneError> {
        let entity = self
            .entities
            .remove(&guid)
            .ok_or(ZoneError::EntityNotFound(guid))?;
        let _ = self.spatial_grid.remove(guid);
        self.players.remove(&guid);
        self.creatures.remove(&guid);
        Ok(entity)
    }

    pub fn get_entity(&self, guid: u64) -> Result<&Entity, ZoneError> {
        self.entities.get(&guid).ok_or(ZoneError::EntityNotFound(guid))
    }

    pub fn update_entity(
        &mut self,
        guid: u64,
        update: impl FnOnce(&mut Entity),
    ) -> Result<(), ZoneError> {
        let entity = self
            .entities
            .get_mut(&guid)
            .ok_or(ZoneError::EntityNotFound(guid))?;
        update(entity);
        Ok(())
    }

    pub fn update_entity_position(&mut self, guid: u64, new_position: Vec3) -> Result<(), ZoneError> {
        self.spatial_grid
            .update(guid, new_position)
            .map_err(|_| ZoneError::SpatialInvariantViolated(guid))?;
        if let Some(entity) = self.entities.get_mut(&guid) {
            entity.position = new_position;
        }
        Ok(())
    }

    pub fn entities_in_range(&self, center: &Vec3, radius: f32) -> Vec<&Entity> {
        self.spatial_grid
            .entities_in_range(center, radius)
            .into_iter()
            .filter_map(|guid| self.entities.get(&guid))
            .collect()
    }

    pub fn list_players(&self) -> Vec<&Entity> {
        self.players.iter().filter_map(|g| self.entities.get(g)).collect()
    }

    pub fn list_creatures(&self) -> Vec<&Entity> {
        self.creatures.iter().filter_map(|g| self.entities.get(g)).collect()
    }

    pub fn info(&self) -> ZoneInfo {
        ZoneInfo {
            zone_ref: self.zone_ref,
            entity_count: self.entities.len(),
            player_count: self.players.len(),
            creature_count: self.creatures.len(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ZoneInfo {
    pub zone_ref: ZoneRef,
    pub entity_count: usize,
    pub player_count: usize,
    pub creature_count: usize,
}

// ---------------------------------------------------------------------------
// Actor command surface
// ---------------------------------------------------------------------------

pub enum ZoneCommand {
    AddEntity {
        entity: Entity,
        reply: oneshot::Sender<Result<(), ZoneError>>,
    },
    RemoveEntity {
        guid: u64,
        reply: oneshot::Sender<Result<Entity, ZoneError>>,
    },
    GetEntity {
        guid: u64,
        reply: oneshot::Sender<Result<Entity, ZoneError>>,
    },
    UpdateEntityPosition {
        guid: u64,
        position: Vec3,
        reply: oneshot::Sender<Result<(), ZoneError>>,
    },
    EntitiesInRange {
        center: Vec3,
        radius: f32,
        reply: oneshot::Sender<Vec<Entity>>,
    },
    Broadcast {
        message: Vec<u8>,
    },
    Info {
        reply: oneshot::Sender<ZoneInfo>,
    },
}

/// Handle to a running zone actor. Cloning shares the command channel, not
/// the state — every call round-trips through the single-writer task.
#[derive(Clone)]
pub struct ZoneHandle {
    tx: mpsc::Sender<ZoneCommand>,
}

impl ZoneHandle {
    pub async fn add_entity(&self, entity: Entity) -> Result<(), ZoneError> {
        let (reply, rx) = oneshot::channel();
        self.send(ZoneCommand::AddEntity { entity, reply }).await;
        rx.await.unwrap_or(Err(ZoneError::EntityNotFound(0)))
    }

    pub async fn remove_entity(&self, guid: u64) -> Result<Entity, ZoneError> {
        let (reply, rx) = oneshot::channel();
        self.send(ZoneCommand::RemoveEntity { guid, reply }).await;
        rx.await.unwrap_or(Err(ZoneError::EntityNotFound(guid)))
    }

    pub async fn get_entity(&self, guid: u64) -> Result<Entity, ZoneError> {
        let (reply, rx) = oneshot::channel();
        self.send(ZoneCommand::GetEntity { guid, reply }).await;
        rx.await.unwrap_or(Err(ZoneError::EntityNotFound(guid)))
    }

    pub async fn update_entity_position(&self, guid: u64, position: Vec3) -> Result<(), ZoneError> {
        let (reply, rx) = oneshot::channel();
        self.send(ZoneCommand::UpdateEntityPosition { guid, position, reply })
            .await;
        rx.await.unwrap_or(Err(ZoneError::EntityNotFound(guid)))
    }

    pub async fn entities_in_range(&self, center: Vec3, radius: f32) -> Vec<Entity> {
        let (reply, rx) = oneshot::channel();
        self.send(ZoneCommand::EntitiesInRange { center, radius, reply }).await;
        rx.await.unwrap_or_default()
    }

    pub async fn broadcast(&self, message: Vec<u8>) {
        self.send(ZoneCommand::Broadcast { message }).await;
    }

    pub async fn info(&self) -> Option<ZoneInfo> {
        let (reply, rx) = oneshot::channel();
        self.send(ZoneCommand::Info { reply }).await;
        rx.await.ok()
    }

    async fn send(&self, command: ZoneCommand) {
        if self.tx.send(command).await.is_err() {
            tracing::warn!("zone actor channel closed, dropping command");
        }
    }
}

/// Spawns the zone's command loop as a task and returns a handle to it.
/// `broadcast_sink` receives every `broadcast()` payload in the order it
/// was enqueued within one actor step (spec §4.3's broadcast contract);
/// fanning that out to individual player connections is the caller's job.
pub fn spawn_zone(
    zone_ref: ZoneRef,
    config: &RuntimeConfig,
    broadcast_sink: mpsc::UnboundedSender<Vec<u8>>,
) -> ZoneHandle {
    let (tx, mut rx) = mpsc::channel::<ZoneCommand>(1024);
    let mut state = ZoneState::new(zone_ref, config.spatial_cell_size);

    tokio::spawn(async move {
        while let Some(command) = rx.recv().await {
            match command {
                ZoneCommand::AddEntity { entity, reply } => {
                    let _ = reply.send(state.add_entity(entity));
                }
                ZoneCommand::RemoveEntity { guid, reply } => {
                    let _ = reply.send(state.remove_entity(guid));
                }
                ZoneCommand::GetEntity { guid, reply } => {
                    let _ = reply.send(state.get_entity(guid).cloned());
                }
                ZoneCommand::UpdateEntityPosition { guid, position, reply } => {
                    let _ = reply.send(state.update_entity_position(guid, position));
                }
                ZoneCommand::EntitiesInRange { center, radius, reply } => {
                    let snapshot = state
                        .entities_in_range(&center, radius)
                        .into_iter()
                        .cloned()
                        .collect();
                    let _ = reply.send(snapshot);
                }
                ZoneCommand::Broadcast { message } => {
                    if broadcast_sink.send(message).is_err() {
                        tracing::debug!(zone = ?state.zone_ref, "broadcast sink closed");
                    }
                }
                ZoneCommand::Info { reply } => {
                    let _ = reply.send(state.info());
                }
            }
        }
        tracing::info!(zone = ?state.zone_ref, "zone actor shut down");
    });

    ZoneHandle { tx }
}
