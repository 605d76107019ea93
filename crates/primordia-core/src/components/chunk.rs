//! Floating chunk component.

use primordia_logic::chunk::ChunkConfiguration;
use primordia_logic::compounds::CompoundBag;
use serde::{Deserialize, Serialize};

/// Radius used when a configuration doesn't set one
pub const DEFAULT_CHUNK_RADIUS: f32 = 1.0;

/// A spawned environment chunk. The configuration is referenced by name
/// and looked up in the session's chunk table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloatingChunk {
    pub configuration: String,
    /// Compounds still held, vented or engulfed over time
    pub remaining: CompoundBag,
    pub radius: f32,
    /// Seconds until this chunk can damage again
    pub damage_cooldown: f32,
}

impl FloatingChunk {
    pub fn from_configuration(configuration: &ChunkConfiguration) -> Self {
        let scale = if configuration.chunk_scale > 0.0 {
            configuration.chunk_scale
        } else {
            1.0
        };
        let radius = if configuration.radius > 0.0 {
            configuration.radius * scale
        } else {
            DEFAULT_CHUNK_RADIUS
        };

        Self {
            configuration: configuration.name.clone(),
            remaining: configuration.initial_compounds(),
            radius,
            damage_cooldown: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primordia_logic::chunk::ChunkCompound;
    use primordia_logic::compounds::Compound;
    use std::collections::HashMap;

    #[test]
    fn test_from_configuration() {
        let configuration = ChunkConfiguration {
            name: "Small Iron Chunk".to_string(),
            radius: 2.0,
            chunk_scale: 0.5,
            compounds: Some(HashMap::from([(
                Compound::Iron,
                ChunkCompound { amount: 50.0 },
            )])),
            ..Default::default()
        };

        let chunk = FloatingChunk::from_configuration(&configuration);
        assert_eq!(chunk.configuration, "Small Iron Chunk");
        assert_eq!(chunk.radius, 1.0);
        assert_eq!(chunk.remaining.get(Compound::Iron), 50.0);
    }

    #[test]
    fn test_missing_radius_uses_default() {
        let chunk = FloatingChunk::from_configuration(&ChunkConfiguration::default());
        assert_eq!(chunk.radius, DEFAULT_CHUNK_RADIUS);
    }
}
