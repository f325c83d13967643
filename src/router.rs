//! `WorldRouter`: GUID allocation, zone-worker registry, and zone-transfer
//! coordination (spec §4.3, §5).
//!
//! A read-mostly registry, guarded the way the teacher guards its agent
//! registry state — a `parking_lot::RwLock` rather than a tokio mutex,
//! since lookups vastly outnumber registrations and never cross an await
//! point.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::entity::{Entity, EntityType};
use crate::error::RouterError;
use crate::guid;
use crate::types::ZoneRef;
use crate::zone::ZoneHandle;

/// Per-entity-type monotonic GUID counters (spec §3).
struct GuidAllocator {
    counters: [AtomicU64; 16],
}

impl GuidAllocator {
    fn new() -> Self {
        Self {
            counters: Default::default(),
        }
    }

    fn allocate(&self, entity_type: EntityType) -> Result<u64, RouterError> {
        let slot = &self.counters[entity_type.discriminant() as usize];
        let counter = slot.fetch_add(1, Ordering::Relaxed);
        if counter >= (1u64 << 60) {
            return Err(RouterError::GuidSpaceExhausted(entity_type));
        }
        Ok(guid::encode(entity_type, counter))
    }
}

/// Routes GUIDs to the zone worker currently hosting them, and coordinates
/// moving an entity between zone workers.
///
/// Zone transfers are not transactional across instances (spec §4.3): the
/// entity is removed from the source zone, then added to the destination;
/// if the add fails, the router attempts to re-add it to the source as a
/// best-effort rollback, but a crash between those steps can still strand
/// the entity in neither zone. Callers that need a stronger guarantee must
/// build it on top (e.g. persisting position before a transfer).
pub struct WorldRouter {
    allocator: GuidAllocator,
    zones: RwLock<HashMap<ZoneRef, ZoneHandle>>,
    locations: RwLock<HashMap<u64, ZoneRef>>,
}

impl WorldRouter {
    pub fn new() -> Self {
        Self {
            allocator: GuidAllocator::new(),
            zones: RwLock::new(HashMap::new()),
            locations: RwLock::new(HashMap::new()),
        }
    }

    pub fn allocate_guid(&self, entity_type: EntityType) -> Result<u64, RouterError> {
        self.allocator.allocate(entity_type)
    }

    pub fn register_zone(&self, zone_ref: ZoneRef, handle: ZoneHandle) {
        self.zones.write().insert(zone_ref, handle);
    }

    pub fn deregister_zone(&self, zone_ref: ZoneRef) {
        self.zones.write().remove(&zone_ref);
    }

    pub fn zone_handle(&self, zone_ref: ZoneRef) -> Result<ZoneHandle, RouterError> {
        self.zones
            .read()
            .get(&zone_ref)
            .cloned()
            .ok_or(RouterError::NoSuchInstance(zone_ref))
    }

    pub fn location_of(&self, guid: u64) -> Option<ZoneRef> {
        self.locations.read().get(&guid).copied()
    }

    /// Moves `entity` from `source` to `destination`: removes it from the
    /// source zone, then adds it to the destination. On add failure, tries
    /// to restore it to the source zone so the entity isn't silently
    /// dropped, and surfaces the destination error either way.
    pub async fn transfer(
        &self,
        entity_guid: u64,
        source: ZoneRef,
        destination: ZoneRef,
    ) -> Result<(), RouterError> {
        let source_handle = self.zone_handle(source)?;
        let destination_handle = self.zone_handle(destination)?;

        let entity = source_handle
            .remove_entity(entity_guid)
            .await
            .map_err(|_| RouterError::NoSuchInstance(source))?;

        match destination_handle.add_entity(entity.clone()).await {
            Ok(()) => {
                self.locations.write().insert(entity_guid, destination);
                Ok(())
            }
            Err(add_err) => {
                tracing::error!(
                    guid = entity_guid,
                    ?source,
                    ?destination,
                    error = ?add_err,
                    "zone transfer failed, attempting rollback to source"
                );
                if let Err(rollback_err) = source_handle.add_entity(entity).await {
                    tracing::error!(
                        guid = entity_guid,
                        ?rollback_err,
                        "zone transfer rollback also failed; entity is stranded"
                    );
                }
                Err(RouterError::NoSuchInstance(destination))
            }
        }
    }

    /// Picks the zone worker with the fewest tracked entities for a given
    /// zone id, across its running instances — a simple least-loaded
    /// balancer, not a full scheduler.
    pub async fn least_loaded_instance(&self, zone_id: u32) -> Option<ZoneRef> {
        let candidates: Vec<(ZoneRef, ZoneHandle)> = self
            .zones
            .read()
            .iter()
            .filter(|(zone_ref, _)| zone_ref.zone_id == zone_id)
            .map(|(zone_ref, handle)| (*zone_ref, handle.clone()))
            .collect();

        let mut best: Option<(ZoneRef, usize)> = None;
        for (zone_ref, handle) in candidates {
            if let Some(info) = handle.info().await {
                if best.is_none() || info.entity_count < best.unwrap().1 {
                    best = Some((zone_ref, info.entity_count));
                }
            }
        }
        best.map(|(zone_ref, _)| zone_ref)
    }
}

impl Default for WorldRouter {
    fn default() -> Self {
        Self::new()
    }
}
