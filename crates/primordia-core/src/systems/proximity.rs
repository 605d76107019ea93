//! Proximity system - finds what the player could head for next

use hecs::World;
use primordia_logic::chunk::ChunkConfiguration;
use primordia_logic::geometry::Vec3;
use primordia_logic::tutorial::TutorialEvent;

use super::{find_configuration, find_player};
use crate::components::{FloatingChunk, Position};

/// Nearest points of interest around the player
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProximityReport {
    /// Nearest chunk of any kind
    pub nearest_chunk: Option<Vec3>,
    /// Nearest chunk currently venting compounds
    pub nearest_compound_source: Option<Vec3>,
}

impl ProximityReport {
    pub fn events(&self) -> [TutorialEvent; 2] {
        [
            TutorialEvent::ChunksNearPlayer {
                position: self.nearest_chunk,
            },
            TutorialEvent::CompoundsNearPlayer {
                position: self.nearest_compound_source,
            },
        ]
    }
}

/// Scan chunks within `radius` of the player
pub fn proximity_system(
    world: &World,
    configurations: &[ChunkConfiguration],
    radius: f32,
) -> ProximityReport {
    let mut report = ProximityReport::default();
    let Some((_, player)) = find_player(world) else {
        return report;
    };

    let radius_squared = radius * radius;
    let mut chunk_best = f32::MAX;
    let mut source_best = f32::MAX;

    for (_, (position, chunk)) in world.query::<(&Position, &FloatingChunk)>().iter() {
        let distance_squared = player.distance_squared(&position.0);
        if distance_squared > radius_squared {
            continue;
        }

        if distance_squared < chunk_best {
            chunk_best = distance_squared;
            report.nearest_chunk = Some(position.0);
        }

        let venting = find_configuration(configurations, &chunk.configuration)
            .is_some_and(|c| c.vent_amount > 0.0)
            && !chunk.remaining.is_empty();
        if venting && distance_squared < source_best {
            source_best = distance_squared;
            report.nearest_compound_source = Some(position.0);
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Player;
    use primordia_logic::chunk::load_chunk_configurations;

    fn configurations() -> Vec<ChunkConfiguration> {
        load_chunk_configurations(include_str!("../../../../data/chunks.json")).unwrap()
    }

    fn spawn_chunk(world: &mut World, configurations: &[ChunkConfiguration], name: &str, at: Vec3) {
        let configuration = find_configuration(configurations, name).unwrap();
        world.spawn((Position(at), FloatingChunk::from_configuration(configuration)));
    }

    #[test]
    fn test_no_player_reports_nothing() {
        let configurations = configurations();
        let mut world = World::new();
        spawn_chunk(&mut world, &configurations, "Marine Snow", Vec3::ZERO);
        assert_eq!(
            proximity_system(&world, &configurations, 10.0),
            ProximityReport::default()
        );
    }

    #[test]
    fn test_nearest_within_radius() {
        let configurations = configurations();
        let mut world = World::new();
        world.spawn((Player, Position::new(0.0, 0.0, 0.0)));
        spawn_chunk(&mut world, &configurations, "Toxin Blob", Vec3::new(3.0, 0.0, 0.0));
        spawn_chunk(&mut world, &configurations, "Marine Snow", Vec3::new(6.0, 0.0, 0.0));
        spawn_chunk(&mut world, &configurations, "Marine Snow", Vec3::new(40.0, 0.0, 0.0));

        let report = proximity_system(&world, &configurations, 10.0);
        assert_eq!(report.nearest_chunk, Some(Vec3::new(3.0, 0.0, 0.0)));
        // Toxin blobs hold nothing to vent
        assert_eq!(report.nearest_compound_source, Some(Vec3::new(6.0, 0.0, 0.0)));
    }

    #[test]
    fn test_out_of_range_is_none() {
        let configurations = configurations();
        let mut world = World::new();
        world.spawn((Player, Position::new(0.0, 0.0, 0.0)));
        spawn_chunk(&mut world, &configurations, "Marine Snow", Vec3::new(40.0, 0.0, 0.0));

        let report = proximity_system(&world, &configurations, 10.0);
        assert_eq!(report.nearest_chunk, None);
        assert!(matches!(
            report.events()[0],
            TutorialEvent::ChunksNearPlayer { position: None }
        ));
    }
}
