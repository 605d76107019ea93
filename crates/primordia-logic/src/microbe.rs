//! Single-celled species.

use serde::{Deserialize, Serialize};

use crate::cell_type::OrganelleTemplate;
use crate::geometry::Hex;
use crate::registry::SimulationParameters;
use crate::species::{
    Species, SpeciesBehaviour, SpeciesCore, SpeciesError, SpeciesKind, StartingCompounds,
};

/// Bacteria are half the size of an equivalent eukaryote for predation
const BACTERIA_SIZE_FACTOR: f32 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MicrobeSpecies {
    pub core: SpeciesCore,
    pub organelles: Vec<OrganelleTemplate>,
    pub membrane_type: String,
    pub membrane_rigidity: f32,
    pub is_bacteria: bool,
}

impl MicrobeSpecies {
    pub fn new(id: u32, genus: impl Into<String>, epithet: impl Into<String>) -> Self {
        Self {
            core: SpeciesCore::new(id, genus, epithet),
            organelles: Vec::new(),
            membrane_type: "single".to_string(),
            membrane_rigidity: 0.0,
            is_bacteria: false,
        }
    }

    pub fn with_organelle(mut self, organelle: OrganelleTemplate) -> Self {
        self.organelles.push(organelle);
        self
    }

    /// Rounded mean organelle position
    fn centre_hex(&self) -> Hex {
        if self.organelles.is_empty() {
            return Hex::default();
        }

        let count = self.organelles.len() as f32;
        let (q, r) = self.organelles.iter().fold((0.0, 0.0), |(q, r), o| {
            (q + o.position.q as f32, r + o.position.r as f32)
        });

        Hex::new((q / count).round() as i32, (r / count).round() as i32)
    }
}

impl SpeciesBehaviour for MicrobeSpecies {
    fn core(&self) -> &SpeciesCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SpeciesCore {
        &mut self.core
    }

    fn kind(&self) -> SpeciesKind {
        SpeciesKind::Microbe
    }

    fn on_edited(&mut self, params: &SimulationParameters) -> Result<(), SpeciesError> {
        // Classify before recentring so a failure leaves the species as it was
        let package = StartingCompounds::classify(&self.organelles, params)?;
        self.reposition_to_origin();
        package.fill(&mut self.core.initial_compounds);
        Ok(())
    }

    fn reposition_to_origin(&mut self) -> bool {
        let centre = self.centre_hex();
        if centre == Hex::default() {
            return false;
        }

        for organelle in &mut self.organelles {
            organelle.position = organelle.position - centre;
        }
        true
    }

    fn update_initial_compounds(
        &mut self,
        params: &SimulationParameters,
    ) -> Result<(), SpeciesError> {
        let package = StartingCompounds::classify(&self.organelles, params)?;
        package.fill(&mut self.core.initial_compounds);
        Ok(())
    }

    fn apply_mutation(&mut self, mutation: &Species) -> Result<(), SpeciesError> {
        let Species::Microbe(casted) = mutation else {
            return Err(SpeciesError::KindMismatch {
                expected: SpeciesKind::Microbe,
                found: mutation.kind(),
            });
        };

        self.core.apply_mutation_from(&casted.core);
        self.organelles = casted.organelles.clone();
        self.membrane_type = casted.membrane_type.clone();
        self.membrane_rigidity = casted.membrane_rigidity;
        self.is_bacteria = casted.is_bacteria;
        Ok(())
    }

    fn predation_target_size_factor(
        &self,
        params: &SimulationParameters,
    ) -> Result<f32, SpeciesError> {
        let mut hexes = 0;
        for organelle in &self.organelles {
            hexes += params.organelle(&organelle.definition)?.hexes;
        }

        let factor = hexes as f32;
        Ok(if self.is_bacteria {
            factor * BACTERIA_SIZE_FACTOR
        } else {
            factor
        })
    }
}
