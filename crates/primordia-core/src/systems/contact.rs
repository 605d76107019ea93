//! Contact system - what happens when the player touches a chunk

use hecs::{Entity, World};
use primordia_logic::chunk::ChunkConfiguration;
use primordia_logic::compounds::CompoundBag;
use primordia_logic::tutorial::TutorialEvent;

use super::{find_configuration, find_player};
use crate::components::{CompoundStorage, Engulfing, FloatingChunk, Health, Position};

/// Seconds between two hits from the same damaging chunk
pub const CHUNK_DAMAGE_COOLDOWN: f32 = 1.0;

/// Resolve player/chunk contacts for one frame.
///
/// A chunk is touched when the player is within the chunk radius plus
/// `engulf_reach`. Damaging chunks hurt the player once their cooldown has
/// run out, delete-on-touch chunks vanish once they have acted, and harmless chunks are engulfed while the player is in engulf
/// mode: their compounds move into the player's storage and the chunk is
/// despawned.
pub fn chunk_contact_system(
    world: &mut World,
    configurations: &[ChunkConfiguration],
    engulf_reach: f32,
    delta: f32,
) -> Vec<TutorialEvent> {
    for (_, chunk) in world.query_mut::<&mut FloatingChunk>() {
        chunk.damage_cooldown = (chunk.damage_cooldown - delta).max(0.0);
    }

    let mut events = Vec::new();
    let Some((player, player_position)) = find_player(world) else {
        return events;
    };
    let engulfing = world.get::<&Engulfing>(player).is_ok();

    let touching: Vec<Entity> = world
        .query::<(&Position, &FloatingChunk)>()
        .iter()
        .filter(|(_, (position, chunk))| {
            player_position.distance(&position.0) <= chunk.radius + engulf_reach
        })
        .map(|(entity, _)| entity)
        .collect();

    let mut despawn = Vec::new();
    for entity in touching {
        let Ok(mut chunk) = world.get::<&mut FloatingChunk>(entity) else {
            continue;
        };
        let Some(configuration) = find_configuration(configurations, &chunk.configuration) else {
            log::warn!("Chunk uses unknown configuration '{}'", chunk.configuration);
            continue;
        };

        if configuration.is_damaging() {
            // A damaging chunk only vanishes on the touch that actually hurts
            if chunk.damage_cooldown > 0.0 {
                continue;
            }
            chunk.damage_cooldown = CHUNK_DAMAGE_COOLDOWN;
            drop(chunk);
            damage_player(world, player, configuration, &mut events);
        } else if engulfing && !configuration.delete_on_touch {
            let absorbed = std::mem::take(&mut chunk.remaining);
            drop(chunk);
            absorb_into_player(world, player, absorbed, &mut events);
            events.push(TutorialEvent::PlayerEngulfing);
            despawn.push(entity);
            continue;
        }

        if configuration.delete_on_touch {
            despawn.push(entity);
        }
    }

    for entity in despawn {
        let _ = world.despawn(entity);
    }
    events
}

fn damage_player(
    world: &World,
    player: Entity,
    configuration: &ChunkConfiguration,
    events: &mut Vec<TutorialEvent>,
) {
    if let Ok(mut health) = world.get::<&mut Health>(player) {
        let taken = health.damage(configuration.damages);
        log::debug!(
            "Player took {:.1} {} damage from {}",
            taken,
            configuration.damage_type,
            configuration.name
        );
    }
    events.push(TutorialEvent::PlayerDamaged {
        damage_type: configuration.damage_type.clone(),
    });
}

fn absorb_into_player(
    world: &World,
    player: Entity,
    absorbed: CompoundBag,
    events: &mut Vec<TutorialEvent>,
) {
    let Ok(mut storage) = world.get::<&mut CompoundStorage>(player) else {
        return;
    };
    for (compound, amount) in absorbed.iter() {
        let stored = storage.store(compound, amount);
        if stored > 0.0 {
            events.push(TutorialEvent::PlayerCompoundCollected {
                compound,
                amount: stored,
            });
        }
    }
}
