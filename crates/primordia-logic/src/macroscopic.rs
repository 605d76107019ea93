//! Macroscopic species - 3D bodies built from placed tissues.
//!
//! Brain power, muscular power and the stage tier are derived from the body
//! layout and always recomputed wholesale in [`SpeciesBehaviour::on_edited`].
//! The tier can also be forced by the two explicit stage overrides; a later
//! edit commit recomputes it from brain power again.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::cell_type::{CellType, CellTypeId, OrganelleTemplate};
use crate::constants::{BRAIN_POWER_REQUIRED_FOR_AWAKENING, BRAIN_POWER_REQUIRED_FOR_AWARE};
use crate::geometry::Vec3;
use crate::metaball::{LayoutError, MetaballId, MetaballLayout};
use crate::registry::{RegistryError, SimulationParameters};
use crate::species::{
    Species, SpeciesBehaviour, SpeciesCore, SpeciesError, SpeciesKind, StartingCompounds,
};

/// Stage tiers, ordered from least to most developed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MacroscopicType {
    #[default]
    Macroscopic,
    Aware,
    Awakened,
}

impl MacroscopicType {
    /// Highest tier checked first
    pub fn from_brain_power(brain_power: f32) -> Self {
        if brain_power >= BRAIN_POWER_REQUIRED_FOR_AWAKENING {
            Self::Awakened
        } else if brain_power >= BRAIN_POWER_REQUIRED_FOR_AWARE {
            Self::Aware
        } else {
            Self::Macroscopic
        }
    }
}

/// Where the species reproduces, which also decides where it spawns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReproductionLocation {
    #[default]
    Water,
    Land,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroscopicSpecies {
    pub core: SpeciesCore,
    body_layout: MetaballLayout,
    cell_types: Vec<CellType>,
    /// Size of the species in meters
    pub scale: f32,
    brain_power: f32,
    muscular_power: f32,
    pub reproduction_location: ReproductionLocation,
    macroscopic_type: MacroscopicType,
    next_cell_type_id: u32,
}

impl MacroscopicSpecies {
    pub fn new(id: u32, genus: impl Into<String>, epithet: impl Into<String>) -> Self {
        Self {
            core: SpeciesCore::new(id, genus, epithet),
            body_layout: MetaballLayout::new(),
            cell_types: Vec::new(),
            scale: 1.0,
            brain_power: 0.0,
            muscular_power: 0.0,
            reproduction_location: ReproductionLocation::default(),
            macroscopic_type: MacroscopicType::default(),
            next_cell_type_id: 0,
        }
    }

    pub fn body_layout(&self) -> &MetaballLayout {
        &self.body_layout
    }

    /// Editor access. Derived values go stale until the next `on_edited`.
    pub fn body_layout_mut(&mut self) -> &mut MetaballLayout {
        &mut self.body_layout
    }

    pub fn cell_types(&self) -> &[CellType] {
        &self.cell_types
    }

    pub fn cell_type(&self, id: CellTypeId) -> Option<&CellType> {
        self.cell_types.iter().find(|c| c.id == id)
    }

    pub fn cell_type_mut(&mut self, id: CellTypeId) -> Option<&mut CellType> {
        self.cell_types.iter_mut().find(|c| c.id == id)
    }

    pub fn brain_power(&self) -> f32 {
        self.brain_power
    }

    pub fn muscular_power(&self) -> f32 {
        self.muscular_power
    }

    pub fn macroscopic_type(&self) -> MacroscopicType {
        self.macroscopic_type
    }

    /// Adds a cell type to the catalog. The catalog holds each type name
    /// once; adding a name that is already there returns the existing id.
    pub fn add_cell_type(
        &mut self,
        type_name: impl Into<String>,
        organelles: Vec<OrganelleTemplate>,
    ) -> CellTypeId {
        let type_name = type_name.into();
        if let Some(existing) = self.cell_types.iter().find(|c| c.type_name == type_name) {
            return existing.id;
        }

        let id = CellTypeId(self.next_cell_type_id);
        self.next_cell_type_id += 1;

        let mut cell_type = CellType::new(id, type_name);
        cell_type.organelles = organelles;
        self.cell_types.push(cell_type);
        id
    }

    /// Places a metaball of a catalogued cell type
    pub fn add_metaball(
        &mut self,
        position: Vec3,
        size: f32,
        parent: Option<MetaballId>,
        cell_type: CellTypeId,
    ) -> Result<MetaballId, SpeciesError> {
        if self.cell_type(cell_type).is_none() {
            return Err(SpeciesError::UnknownCellType(cell_type));
        }
        Ok(self.body_layout.add(position, size, parent, cell_type)?)
    }

    /// Organelles of every distinct cell type placed in the body
    pub fn organelles(&self) -> impl Iterator<Item = &OrganelleTemplate> {
        let used: BTreeSet<CellTypeId> = self.body_layout.iter().map(|m| m.cell_type).collect();
        self.cell_types
            .iter()
            .filter(move |c| used.contains(&c.id))
            .flat_map(|c| c.organelles.iter())
    }

    /// Checks the tree and that every metaball's cell type is catalogued
    pub fn validate(&self) -> Result<(), SpeciesError> {
        validate_layout(&self.body_layout, &self.cell_types)
    }

    pub fn calculate_brain_power(
        layout: &MetaballLayout,
        cell_types: &[CellType],
        scale: f32,
        params: &SimulationParameters,
    ) -> Result<f32, SpeciesError> {
        sum_tissue_volume(layout, cell_types, scale, |c| c.is_brain_tissue_type(params))
    }

    pub fn calculate_muscular_power(
        layout: &MetaballLayout,
        cell_types: &[CellType],
        scale: f32,
        params: &SimulationParameters,
    ) -> Result<f32, SpeciesError> {
        sum_tissue_volume(layout, cell_types, scale, |c| c.is_muscular_tissue_type(params))
    }

    pub fn calculate_macroscopic_type_from_layout(
        layout: &MetaballLayout,
        cell_types: &[CellType],
        scale: f32,
        params: &SimulationParameters,
    ) -> Result<MacroscopicType, SpeciesError> {
        let brain_power = Self::calculate_brain_power(layout, cell_types, scale, params)?;
        Ok(MacroscopicType::from_brain_power(brain_power))
    }

    /// Forces the top tier so a player who grew a large brain doesn't stay
    /// stuck underwater
    pub fn move_player_to_awakened_status(&mut self) {
        self.macroscopic_type = MacroscopicType::Awakened;
    }

    /// Drops an awakened species back to aware. Lower tiers are untouched.
    pub fn keep_player_in_aware_stage(&mut self) {
        if self.macroscopic_type == MacroscopicType::Awakened {
            self.macroscopic_type = MacroscopicType::Aware;
        }
    }

    fn set_type_from_brain_power(&mut self) {
        let derived = MacroscopicType::from_brain_power(self.brain_power);

        // This overwrites explicit overrides too. Callers relying on an
        // override must re-apply it after committing an edit.
        if derived < self.macroscopic_type {
            log::warn!(
                "Species {} drops from {:?} to {:?} (brain power {:.3})",
                self.core.id,
                self.macroscopic_type,
                derived,
                self.brain_power
            );
        } else if derived != self.macroscopic_type {
            log::debug!(
                "Species {} advances from {:?} to {:?}",
                self.core.id,
                self.macroscopic_type,
                derived
            );
        }
        self.macroscopic_type = derived;
    }
}

fn validate_layout(layout: &MetaballLayout, cell_types: &[CellType]) -> Result<(), SpeciesError> {
    layout.validate()?;
    for metaball in layout.iter() {
        if !cell_types.iter().any(|c| c.id == metaball.cell_type) {
            return Err(LayoutError::UnknownCellType {
                metaball: metaball.id,
                cell_type: metaball.cell_type,
            }
            .into());
        }
    }
    Ok(())
}

fn sum_tissue_volume(
    layout: &MetaballLayout,
    cell_types: &[CellType],
    scale: f32,
    is_tissue: impl Fn(&CellType) -> Result<bool, RegistryError>,
) -> Result<f32, SpeciesError> {
    // Classify each cell type once rather than once per metaball
    let mut classified: HashMap<CellTypeId, bool> = HashMap::with_capacity(cell_types.len());
    let mut result = 0.0;

    for metaball in layout.iter() {
        let matches = match classified.get(&metaball.cell_type) {
            Some(&known) => known,
            None => {
                let cell_type = cell_types
                    .iter()
                    .find(|c| c.id == metaball.cell_type)
                    .ok_or(SpeciesError::UnknownCellType(metaball.cell_type))?;
                let matches = is_tissue(cell_type)?;
                classified.insert(metaball.cell_type, matches);
                matches
            }
        };

        if matches {
            result += metaball.volume(scale);
        }
    }

    Ok(result)
}

impl SpeciesBehaviour for MacroscopicSpecies {
    fn core(&self) -> &SpeciesCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SpeciesCore {
        &mut self.core
    }

    fn kind(&self) -> SpeciesKind {
        SpeciesKind::Macroscopic
    }

    fn on_edited(&mut self, params: &SimulationParameters) -> Result<(), SpeciesError> {
        self.validate()?;

        // Compute everything fallible before touching the species
        let package = StartingCompounds::classify(self.organelles(), params)?;
        let brain_power =
            Self::calculate_brain_power(&self.body_layout, &self.cell_types, self.scale, params)?;
        let muscular_power = Self::calculate_muscular_power(
            &self.body_layout,
            &self.cell_types,
            self.scale,
            params,
        )?;

        // Volumes don't depend on placement, so grounding first or last
        // gives the same powers
        self.reposition_to_origin();
        package.fill(&mut self.core.initial_compounds);
        self.brain_power = brain_power;
        self.muscular_power = muscular_power;
        self.set_type_from_brain_power();

        log::debug!(
            "Species {} edited: brain {:.3}, muscle {:.3}, {:?}",
            self.core.id,
            self.brain_power,
            self.muscular_power,
            self.macroscopic_type
        );
        Ok(())
    }

    fn reposition_to_origin(&mut self) -> bool {
        self.body_layout.reposition_to_ground()
    }

    fn update_initial_compounds(
        &mut self,
        params: &SimulationParameters,
    ) -> Result<(), SpeciesError> {
        let package = StartingCompounds::classify(self.organelles(), params)?;
        package.fill(&mut self.core.initial_compounds);
        Ok(())
    }

    fn apply_mutation(&mut self, mutation: &Species) -> Result<(), SpeciesError> {
        let Species::Macroscopic(casted) = mutation else {
            return Err(SpeciesError::KindMismatch {
                expected: SpeciesKind::Macroscopic,
                found: mutation.kind(),
            });
        };

        validate_layout(&casted.body_layout, &casted.cell_types)?;

        // Parents are cloned before children so the remapping table always
        // has the new parent id ready
        let mut body_layout = self.body_layout.emptied();
        body_layout.extend_cloned_from(&casted.body_layout)?;

        self.core.apply_mutation_from(&casted.core);
        self.cell_types = casted.cell_types.clone();
        self.next_cell_type_id = self.next_cell_type_id.max(casted.next_cell_type_id);
        self.body_layout = body_layout;
        Ok(())
    }

    fn predation_target_size_factor(
        &self,
        _params: &SimulationParameters,
    ) -> Result<f32, SpeciesError> {
        Err(SpeciesError::Unsupported {
            operation: "predation target size factor",
            kind: SpeciesKind::Macroscopic,
        })
    }
}
