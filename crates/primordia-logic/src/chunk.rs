//! Spawnable environment chunk descriptions.
//!
//! A `ChunkConfiguration` is loaded once from the biome definitions and is
//! read-only afterwards. Equality is structural over every field so spawn
//! tables can be deduplicated and hot reloads diffed. Hashing only looks at
//! the name: names are expected to be unique, and two equal configurations
//! always share a name, so the hash stays a subset of equality. Different
//! configurations sharing a name just collide.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compounds::{Compound, CompoundBag};

#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("chunk '{0}' is defined more than once")]
    DuplicateName(String),
    #[error("chunk JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Compound held by a chunk when it spawns
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkCompound {
    pub amount: f32,
}

/// One possible visual for a chunk. Paths point at engine assets; they are
/// stored and compared, never loaded here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkScene {
    pub scene_path: String,
    /// Model node inside the scene, `None` if it is the root
    pub scene_model_path: Option<String>,
    /// Animation player inside the scene, `None` if not animated
    pub scene_animation_path: Option<String>,
    pub convex_shape_path: Option<String>,
    /// Particle visuals need special handling
    pub is_particles: bool,
    /// Keep animations playing once spawned
    pub play_animation: bool,
    /// The default dissolve shader can't be applied to this visual
    pub missing_default_shader_support: bool,
}

impl ChunkScene {
    pub fn new(scene_path: impl Into<String>) -> Self {
        Self {
            scene_path: scene_path.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfiguration {
    pub name: String,
    pub meshes: Vec<ChunkScene>,
    /// Spawn density
    pub density: f32,
    pub dissolves: bool,
    pub radius: f32,
    pub chunk_scale: f32,
    pub physics_density: f32,
    pub size: f32,
    /// Compound vented per second
    pub vent_amount: f32,
    /// Damage dealt on touch when above zero
    pub damages: f32,
    pub delete_on_touch: bool,
    pub damage_type: String,
    pub compounds: Option<HashMap<Compound, ChunkCompound>>,
    pub easter_egg: bool,
    /// Enzyme needed to digest this chunk
    pub dissolver_enzyme: String,
}

// Structural equality with float fields; a NaN in a definition makes that
// configuration unequal to itself
impl Eq for ChunkConfiguration {}

impl Hash for ChunkConfiguration {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl ChunkConfiguration {
    pub fn is_damaging(&self) -> bool {
        self.damages > 0.0
    }

    /// Compounds a freshly spawned chunk holds
    pub fn initial_compounds(&self) -> CompoundBag {
        self.compounds
            .iter()
            .flatten()
            .map(|(compound, chunk)| (*compound, chunk.amount))
            .collect()
    }
}

/// Parses a JSON array of chunk definitions, rejecting duplicate names
pub fn load_chunk_configurations(json: &str) -> Result<Vec<ChunkConfiguration>, ChunkError> {
    let configurations: Vec<ChunkConfiguration> = serde_json::from_str(json)?;

    let mut seen = std::collections::HashSet::with_capacity(configurations.len());
    for configuration in &configurations {
        if !seen.insert(configuration.name.as_str()) {
            return Err(ChunkError::DuplicateName(configuration.name.clone()));
        }
    }

    log::debug!("Loaded {} chunk configurations", configurations.len());
    Ok(configurations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashSet;

    fn iron_chunk() -> ChunkConfiguration {
        ChunkConfiguration {
            name: "Small Iron Chunk".to_string(),
            meshes: vec![ChunkScene::new("res://assets/models/Iron1.tscn")],
            density: 0.00004,
            dissolves: true,
            radius: 1.0,
            chunk_scale: 1.0,
            physics_density: 1000.0,
            size: 100.0,
            vent_amount: 3.0,
            damages: 0.0,
            delete_on_touch: false,
            damage_type: String::new(),
            compounds: Some(HashMap::from([(
                Compound::Iron,
                ChunkCompound { amount: 50.0 },
            )])),
            easter_egg: false,
            dissolver_enzyme: "lipase".to_string(),
        }
    }

    fn hash_of(value: &ChunkConfiguration) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_damage_type_breaks_equality() {
        let a = iron_chunk();
        let mut b = iron_chunk();
        b.damage_type = "toxin".to_string();
        assert_ne!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_equal_by_value_compound_maps() {
        let a = iron_chunk();
        let mut b = iron_chunk();
        b.compounds = Some(HashMap::from([(
            Compound::Iron,
            ChunkCompound { amount: 50.0 },
        )]));
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));
    }

    #[test]
    fn test_compound_amount_and_presence_matter() {
        let a = iron_chunk();
        let mut b = iron_chunk();
        b.compounds = None;
        assert_ne!(a, b);

        b.compounds = Some(HashMap::from([(
            Compound::Iron,
            ChunkCompound { amount: 51.0 },
        )]));
        assert_ne!(a, b);
    }

    #[test]
    fn test_meshes_compared_by_value() {
        let a = iron_chunk();
        let mut b = iron_chunk();
        assert_eq!(a, b);
        b.meshes[0].is_particles = true;
        assert_ne!(a, b);
    }

    #[test]
    fn test_set_dedupes_identical_configurations() {
        let mut renamed = iron_chunk();
        renamed.name = "Big Iron Chunk".to_string();

        let set: HashSet<ChunkConfiguration> = [iron_chunk(), iron_chunk(), renamed]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_initial_compounds() {
        let bag = iron_chunk().initial_compounds();
        assert_eq!(bag.get(Compound::Iron), 50.0);

        let mut empty = iron_chunk();
        empty.compounds = None;
        assert!(empty.initial_compounds().is_empty());
    }

    #[test]
    fn test_load_defaults_and_duplicates() {
        let json = r#"[
            {"name": "Marine Snow", "density": 0.0001, "meshes": [{"scene_path": "res://snow.tscn"}],
             "compounds": {"Glucose": {"amount": 5.0}}},
            {"name": "Toxin Cloud", "damages": 10.0, "damage_type": "oxytoxy", "delete_on_touch": true}
        ]"#;
        let loaded = load_chunk_configurations(json).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].meshes[0].scene_model_path, None);
        assert_eq!(loaded[0].initial_compounds().get(Compound::Glucose), 5.0);
        assert!(loaded[1].is_damaging());
        assert!(loaded[1].compounds.is_none());

        let dup = r#"[{"name": "A"}, {"name": "A"}]"#;
        assert!(matches!(
            load_chunk_configurations(dup),
            Err(ChunkError::DuplicateName(n)) if n == "A"
        ));
    }
}
