//! Venting system - chunks release their compounds over time

use hecs::{Entity, World};
use primordia_logic::chunk::ChunkConfiguration;
use primordia_logic::compounds::CompoundBag;
use primordia_logic::tutorial::TutorialEvent;

use super::{find_configuration, find_player};
use crate::components::{CompoundStorage, FloatingChunk, Position};

/// Vent compounds from every chunk for `delta` seconds.
///
/// Each compound a chunk holds drains at the configuration's `vent_amount`
/// per second. Compounds vented within `absorb_radius` of the player are
/// absorbed into its storage; the rest dissolves into `environment`.
/// Chunks that dissolve are despawned once empty.
pub fn chunk_venting_system(
    world: &mut World,
    configurations: &[ChunkConfiguration],
    environment: &mut CompoundBag,
    absorb_radius: f32,
    delta: f32,
) -> Vec<TutorialEvent> {
    let player = find_player(world);
    let mut near_player = CompoundBag::new();
    let mut dissolved: Vec<Entity> = Vec::new();

    for (entity, (position, chunk)) in world.query_mut::<(&Position, &mut FloatingChunk)>() {
        let Some(configuration) = find_configuration(configurations, &chunk.configuration) else {
            continue;
        };

        if configuration.vent_amount > 0.0 && !chunk.remaining.is_empty() {
            let rate = configuration.vent_amount * delta;
            let held: Vec<_> = chunk.remaining.iter().map(|(c, _)| c).collect();

            let absorbed = player
                .is_some_and(|(_, at)| at.distance(&position.0) <= absorb_radius);
            let target = if absorbed {
                &mut near_player
            } else {
                &mut *environment
            };
            for compound in held {
                target.add(compound, chunk.remaining.take(compound, rate));
            }
        }

        if configuration.dissolves && chunk.remaining.is_empty() {
            dissolved.push(entity);
        }
    }

    for entity in dissolved {
        log::debug!("Chunk {:?} dissolved", entity);
        let _ = world.despawn(entity);
    }

    let mut events = Vec::new();
    let Some((player, _)) = player else {
        near_player.drain_into(environment);
        return events;
    };
    let Ok(mut storage) = world.get::<&mut CompoundStorage>(player) else {
        near_player.drain_into(environment);
        return events;
    };
    for (compound, amount) in near_player.iter() {
        let stored = storage.store(compound, amount);
        if stored > 0.0 {
            events.push(TutorialEvent::PlayerCompoundCollected {
                compound,
                amount: stored,
            });
        }
        environment.add(compound, amount - stored);
    }
    events
}
