//! Static organelle definition registry.
//!
//! Definitions are loaded once from JSON and then handed to the operations
//! that need them. There is no global instance; the session owns one and
//! passes it down.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Classification tags carried by organelle definitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrganelleFeature {
    /// Nerve tissue; cells with axons count as brain tissue
    Axon,
    /// Contractile tissue; cells with myofibrils count as muscle
    Myofibril,
    IronOxidizing,
    Chemosynthesis,
    Storage,
    Movement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganelleDefinition {
    pub internal_name: String,
    pub name: String,
    /// Number of hexes the organelle occupies
    pub hexes: u32,
    #[serde(default)]
    pub features: Vec<OrganelleFeature>,
}

impl OrganelleDefinition {
    pub fn has_feature(&self, feature: OrganelleFeature) -> bool {
        self.features.contains(&feature)
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("unknown organelle definition '{0}'")]
    UnknownOrganelle(String),
    #[error("organelle definition '{0}' is defined more than once")]
    DuplicateOrganelle(String),
    #[error("definition JSON is malformed: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Lookup of game definitions by string key
#[derive(Debug, Clone, Default)]
pub struct SimulationParameters {
    organelles: BTreeMap<String, OrganelleDefinition>,
}

impl SimulationParameters {
    pub fn new(definitions: Vec<OrganelleDefinition>) -> Result<Self, RegistryError> {
        let mut organelles = BTreeMap::new();

        for definition in definitions {
            if organelles.contains_key(&definition.internal_name) {
                return Err(RegistryError::DuplicateOrganelle(definition.internal_name));
            }
            organelles.insert(definition.internal_name.clone(), definition);
        }

        log::debug!("Loaded {} organelle definitions", organelles.len());
        Ok(Self { organelles })
    }

    /// Parses a JSON array of organelle definitions
    pub fn from_json(json: &str) -> Result<Self, RegistryError> {
        let definitions: Vec<OrganelleDefinition> = serde_json::from_str(json)?;
        Self::new(definitions)
    }

    pub fn organelle(&self, key: &str) -> Result<&OrganelleDefinition, RegistryError> {
        self.organelles
            .get(key)
            .ok_or_else(|| RegistryError::UnknownOrganelle(key.to_string()))
    }

    pub fn organelle_count(&self) -> usize {
        self.organelles.len()
    }

    /// Definitions in key order
    pub fn organelles(&self) -> impl Iterator<Item = &OrganelleDefinition> {
        self.organelles.values()
    }

    /// Definitions carrying `feature`, in key order
    pub fn organelles_with_feature(&self, feature: OrganelleFeature) -> Vec<&OrganelleDefinition> {
        self.organelles
            .values()
            .filter(|d| d.has_feature(feature))
            .collect()
    }
}
