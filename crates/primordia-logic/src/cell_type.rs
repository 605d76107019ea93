//! Cell types - reusable organelle compositions referenced by metaballs.

use serde::{Deserialize, Serialize};

use crate::geometry::Hex;
use crate::registry::{OrganelleFeature, RegistryError, SimulationParameters};

/// Handle to a cell type inside one species' catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellTypeId(pub u32);

/// An organelle placed inside a cell, referring to its definition by key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrganelleTemplate {
    pub definition: String,
    pub position: Hex,
    /// Rotation in 60 degree steps (0-5)
    pub orientation: u8,
}

impl OrganelleTemplate {
    pub fn new(definition: impl Into<String>, position: Hex, orientation: u8) -> Self {
        Self {
            definition: definition.into(),
            position,
            orientation: orientation % 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellType {
    pub id: CellTypeId,
    pub type_name: String,
    pub organelles: Vec<OrganelleTemplate>,
    pub membrane_type: String,
    /// RGBA
    pub colour: [f32; 4],
}

impl CellType {
    pub fn new(id: CellTypeId, type_name: impl Into<String>) -> Self {
        Self {
            id,
            type_name: type_name.into(),
            organelles: Vec::new(),
            membrane_type: "single".to_string(),
            colour: [1.0, 1.0, 1.0, 1.0],
        }
    }

    pub fn with_organelle(mut self, organelle: OrganelleTemplate) -> Self {
        self.organelles.push(organelle);
        self
    }

    fn has_feature(
        &self,
        feature: OrganelleFeature,
        params: &SimulationParameters,
    ) -> Result<bool, RegistryError> {
        for organelle in &self.organelles {
            if params.organelle(&organelle.definition)?.has_feature(feature) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn is_brain_tissue_type(&self, params: &SimulationParameters) -> Result<bool, RegistryError> {
        self.has_feature(OrganelleFeature::Axon, params)
    }

    pub fn is_muscular_tissue_type(
        &self,
        params: &SimulationParameters,
    ) -> Result<bool, RegistryError> {
        self.has_feature(OrganelleFeature::Myofibril, params)
    }

    pub fn hex_count(&self, params: &SimulationParameters) -> Result<u32, RegistryError> {
        let mut total = 0;
        for organelle in &self.organelles {
            total += params.organelle(&organelle.definition)?.hexes;
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::test_support;

    fn cell(organelles: &[&str]) -> CellType {
        organelles
            .iter()
            .enumerate()
            .fold(CellType::new(CellTypeId(0), "test"), |c, (i, key)| {
                c.with_organelle(OrganelleTemplate::new(*key, Hex::new(i as i32, 0), 0))
            })
    }

    #[test]
    fn test_brain_tissue() {
        let params = test_support::parameters();
        assert!(cell(&["cytoplasm", "axon"]).is_brain_tissue_type(&params).unwrap());
        assert!(!cell(&["cytoplasm"]).is_brain_tissue_type(&params).unwrap());
    }

    #[test]
    fn test_muscle_tissue() {
        let params = test_support::parameters();
        assert!(cell(&["myofibril"]).is_muscular_tissue_type(&params).unwrap());
        assert!(!cell(&["axon"]).is_muscular_tissue_type(&params).unwrap());
    }

    #[test]
    fn test_hex_count() {
        let params = test_support::parameters();
        assert_eq!(cell(&["cytoplasm", "chemoplast"]).hex_count(&params).unwrap(), 3);
    }

    #[test]
    fn test_unknown_organelle_fails() {
        let params = test_support::parameters();
        assert!(cell(&["nucleus"]).is_brain_tissue_type(&params).is_err());
    }

    #[test]
    fn test_orientation_wraps() {
        assert_eq!(OrganelleTemplate::new("axon", Hex::default(), 7).orientation, 1);
    }
}
