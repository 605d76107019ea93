//! Chunk spawning - scatters floating chunks weighted by spawn density

use hecs::{Entity, World};
use primordia_logic::chunk::ChunkConfiguration;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use crate::components::{FloatingChunk, Position};

/// Spawn `count` chunks on the y = 0 plane within `half_extent` of the
/// origin. Configurations are picked in proportion to their density;
/// easter eggs and zero-density configurations never spawn this way.
pub fn spawn_chunks(
    world: &mut World,
    configurations: &[ChunkConfiguration],
    count: usize,
    half_extent: f32,
    rng: &mut impl Rng,
) -> Vec<Entity> {
    let spawnable: Vec<&ChunkConfiguration> = configurations
        .iter()
        .filter(|c| !c.easter_egg && c.density > 0.0)
        .collect();

    let weights = match WeightedIndex::new(spawnable.iter().map(|c| c.density)) {
        Ok(weights) => weights,
        Err(e) => {
            log::warn!("No spawnable chunk configurations: {}", e);
            return Vec::new();
        }
    };

    let extent = half_extent.abs().max(f32::EPSILON);
    let mut spawned = Vec::with_capacity(count);
    for _ in 0..count {
        let configuration = spawnable[weights.sample(rng)];
        let position = Position::new(
            rng.gen_range(-extent..extent),
            0.0,
            rng.gen_range(-extent..extent),
        );
        spawned.push(world.spawn((position, FloatingChunk::from_configuration(configuration))));
    }

    log::info!(
        "Spawned {} chunks from {} configurations",
        spawned.len(),
        spawnable.len()
    );
    spawned
}

#[cfg(test)]
mod tests {
    use super::*;
    use primordia_logic::chunk::load_chunk_configurations;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn configurations() -> Vec<ChunkConfiguration> {
        load_chunk_configurations(include_str!("../../../../data/chunks.json")).unwrap()
    }

    #[test]
    fn test_spawn_count_and_bounds() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(1);
        let spawned = spawn_chunks(&mut world, &configurations(), 50, 20.0, &mut rng);

        assert_eq!(spawned.len(), 50);
        for (_, (position, _)) in world.query::<(&Position, &FloatingChunk)>().iter() {
            assert!(position.0.x.abs() <= 20.0);
            assert!(position.0.z.abs() <= 20.0);
        }
    }

    #[test]
    fn test_easter_eggs_never_spawn() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(2);
        spawn_chunks(&mut world, &configurations(), 500, 50.0, &mut rng);

        let mut query = world.query::<&FloatingChunk>();
        assert!(query
            .iter()
            .all(|(_, chunk)| chunk.configuration != "Floating Tardigrade"));
    }

    #[test]
    fn test_density_weighting() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(3);
        spawn_chunks(&mut world, &configurations(), 2000, 50.0, &mut rng);

        let mut snow = 0;
        let mut toxin = 0;
        for (_, chunk) in world.query::<&FloatingChunk>().iter() {
            match chunk.configuration.as_str() {
                "Marine Snow" => snow += 1,
                "Toxin Blob" => toxin += 1,
                _ => {}
            }
        }
        // Marine snow is five times as dense as toxin blobs
        assert!(snow > toxin * 3);
    }

    #[test]
    fn test_nothing_spawnable() {
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(4);
        let only_egg: Vec<ChunkConfiguration> = configurations()
            .into_iter()
            .filter(|c| c.easter_egg)
            .collect();

        assert!(spawn_chunks(&mut world, &only_egg, 10, 10.0, &mut rng).is_empty());
        assert_eq!(world.len(), 0);
    }
}
