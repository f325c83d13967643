//! End-to-end zone-actor and AI-tick scenarios (spec §8).

use realm_core::ai::{damage_creature, tick_creature, CreatureAction, CreatureTemplate, DamageOutcome};
use realm_core::entity::{AiStateKind, Entity};
use realm_core::types::{RuntimeConfig, Vec3, ZoneRef};
use realm_core::zone::spawn_zone;
use std::time::{Duration, Instant};

#[tokio::test]
async fn zone_actor_tracks_players_and_creatures_independently() {
    let (sink, _rx) = tokio::sync::mpsc::unbounded_channel();
    let config = RuntimeConfig::default();
    let handle = spawn_zone(ZoneRef::new(7, 0), &config, sink);

    handle
        .add_entity(Entity::new_player(1, "Alice", Vec3::zero()))
        .await
        .unwrap();
    handle
        .add_entity(Entity::new_creature(2, 10, "Wolf", Vec3::new(5.0, 0.0, 0.0), 50, 0))
        .await
        .unwrap();

    let info = handle.info().await.unwrap();
    assert_eq!(info.player_count, 1);
    assert_eq!(info.creature_count, 1);

    let nearby = handle.entities_in_range(Vec3::zero(), 10.0).await;
    assert_eq!(nearby.len(), 2);
}

#[test]
fn creature_damage_flow_kills_and_awards_threat_correctly() {
    let mut creature = Entity::new_creature(2, 10, "Wolf", Vec3::zero(), 30, 0);
    creature.ai.as_mut().unwrap().enter_combat(Instant::now());

    let outcome = damage_creature(&mut creature, 1, 30, Instant::now()).unwrap();
    match outcome {
        DamageOutcome::Killed { guid, killer } => {
            assert_eq!(guid, 2);
            assert_eq!(killer, 1);
        }
        other => panic!("expected Killed, got {other:?}"),
    }
    assert_eq!(creature.health, 0);
    assert_eq!(creature.ai.as_ref().unwrap().state, AiStateKind::Dead);
}

#[test]
fn tick_creature_attacks_when_target_in_range() {
    let mut creature = Entity::new_creature(2, 10, "Wolf", Vec3::zero(), 50, 0);
    creature.ai.as_mut().unwrap().enter_combat(Instant::now());
    creature.ai.as_mut().unwrap().add_threat(1, 10);

    let template = CreatureTemplate {
        min_damage: 5,
        max_damage: 10,
        attack_range: 5.0,
        attack_cooldown: Duration::from_millis(500),
        move_speed: 3.0,
    };
    let target = Entity::new_player(1, "Hero", Vec3::new(2.0, 0.0, 0.0));
    let action = tick_creature(&creature, &template, Some(&target), Instant::now(), 30_000).unwrap();
    assert_eq!(action, CreatureAction::Attack { target: 1 });
}
