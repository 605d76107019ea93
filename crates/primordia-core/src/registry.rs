//! Species registry - every species in a game session, keyed by id.
//!
//! Edits and mutations run against a copy of the stored species and only
//! replace it once the whole operation succeeded, so a failed commit never
//! leaves a half-edited species behind.

use std::collections::BTreeMap;

use primordia_logic::registry::SimulationParameters;
use primordia_logic::species::{Species, SpeciesBehaviour, SpeciesError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpeciesRegistryError {
    #[error("no species with id {0}")]
    UnknownSpecies(u32),
    #[error("species id {0} is already registered")]
    DuplicateId(u32),
    #[error(transparent)]
    Species(#[from] SpeciesError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRegistry {
    species: BTreeMap<u32, Species>,
    next_id: u32,
}

impl SpeciesRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a fresh species id
    pub fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Registers a species under its own id
    pub fn insert(&mut self, species: Species) -> Result<u32, SpeciesRegistryError> {
        let id = species.id();
        if self.species.contains_key(&id) {
            return Err(SpeciesRegistryError::DuplicateId(id));
        }
        self.next_id = self.next_id.max(id + 1);

        log::info!("Registered {} species {} ({})", species.kind(), id, species.formatted_name());
        self.species.insert(id, species);
        Ok(id)
    }

    pub fn get(&self, id: u32) -> Option<&Species> {
        self.species.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Species> {
        self.species.get_mut(&id)
    }

    pub fn remove(&mut self, id: u32) -> Option<Species> {
        self.species.remove(&id)
    }

    pub fn len(&self) -> usize {
        self.species.len()
    }

    pub fn is_empty(&self) -> bool {
        self.species.is_empty()
    }

    /// Species in id order
    pub fn iter(&self) -> impl Iterator<Item = &Species> {
        self.species.values()
    }

    pub fn player_species(&self) -> Option<&Species> {
        self.species.values().find(|s| s.core().player_species)
    }

    /// Applies an editor change and commits it through `on_edited`
    pub fn commit_edit(
        &mut self,
        id: u32,
        params: &SimulationParameters,
        edit: impl FnOnce(&mut Species),
    ) -> Result<(), SpeciesRegistryError> {
        let stored = self
            .species
            .get_mut(&id)
            .ok_or(SpeciesRegistryError::UnknownSpecies(id))?;

        let mut edited = stored.clone();
        edit(&mut edited);
        edited.core_mut().id = id;
        edited.on_edited(params)?;

        *stored = edited;
        Ok(())
    }

    /// Deep-copies a species under a fresh id so auto-evo can evolve the
    /// branch without touching the original. Returns the new id.
    pub fn branch_for_auto_evo(&mut self, id: u32) -> Result<u32, SpeciesRegistryError> {
        let mut branch = self
            .species
            .get(&id)
            .cloned()
            .ok_or(SpeciesRegistryError::UnknownSpecies(id))?;

        let new_id = self.allocate_id();
        let core = branch.core_mut();
        core.id = new_id;
        core.generation += 1;
        core.player_species = false;

        log::debug!("Branched species {} into {}", id, new_id);
        self.species.insert(new_id, branch);
        Ok(new_id)
    }

    /// Takes over `candidate`'s composition and recomputes derived data
    pub fn apply_mutation(
        &mut self,
        id: u32,
        candidate: &Species,
        params: &SimulationParameters,
    ) -> Result<(), SpeciesRegistryError> {
        let stored = self
            .species
            .get_mut(&id)
            .ok_or(SpeciesRegistryError::UnknownSpecies(id))?;

        let mut mutated = stored.clone();
        mutated.apply_mutation(candidate)?;
        mutated.on_edited(params)?;

        log::debug!("Applied mutation to species {} ({})", id, mutated.formatted_name());
        *stored = mutated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primordia_logic::cell_type::OrganelleTemplate;
    use primordia_logic::geometry::{Hex, Vec3};
    use primordia_logic::macroscopic::MacroscopicSpecies;
    use primordia_logic::metaball::MetaballId;
    use primordia_logic::microbe::MicrobeSpecies;
    use primordia_logic::species::SpeciesKind;

    fn params() -> SimulationParameters {
        SimulationParameters::from_json(include_str!("../../../data/organelles.json")).unwrap()
    }

    fn creature(id: u32) -> Species {
        let mut species = MacroscopicSpecies::new(id, "Gigas", "cerebrum");
        let brain = species.add_cell_type(
            "brain",
            vec![OrganelleTemplate::new("axon", Hex::new(0, 0), 0)],
        );
        let root = species
            .add_metaball(Vec3::new(0.0, 1.0, 0.0), 1.0, None, brain)
            .unwrap();
        species
            .add_metaball(Vec3::new(0.0, 2.0, 0.0), 0.5, Some(root), brain)
            .unwrap();
        species.into()
    }

    #[test]
    fn test_insert_tracks_next_id() {
        let mut registry = SpeciesRegistry::new();
        registry.insert(creature(4)).unwrap();
        assert_eq!(registry.allocate_id(), 5);
        assert!(matches!(
            registry.insert(creature(4)),
            Err(SpeciesRegistryError::DuplicateId(4))
        ));
    }

    #[test]
    fn test_commit_edit_recomputes() {
        let params = params();
        let mut registry = SpeciesRegistry::new();
        registry.insert(creature(0)).unwrap();

        registry
            .commit_edit(0, &params, |species| {
                if let Some(m) = species.as_macroscopic_mut() {
                    m.body_layout_mut().iter_mut().for_each(|ball| ball.size = 3.0);
                }
            })
            .unwrap();

        let stored = registry.get(0).unwrap().as_macroscopic().unwrap();
        assert!(stored.brain_power() > 5.0);
    }

    #[test]
    fn test_failed_commit_leaves_species_unchanged() {
        let params = params();
        let mut registry = SpeciesRegistry::new();
        registry.insert(creature(0)).unwrap();
        let before = registry.get(0).unwrap().clone();

        let result = registry.commit_edit(0, &params, |species| {
            if let Some(m) = species.as_macroscopic_mut() {
                if let Some(ball) = m.body_layout_mut().get_mut(MetaballId(1)) {
                    ball.parent = Some(MetaballId(40));
                }
            }
        });

        assert!(result.is_err());
        assert_eq!(registry.get(0).unwrap(), &before);
    }

    #[test]
    fn test_branch_is_independent() {
        let params = params();
        let mut registry = SpeciesRegistry::new();
        registry.insert(creature(0)).unwrap();

        let branch = registry.branch_for_auto_evo(0).unwrap();
        assert_ne!(branch, 0);
        assert_eq!(registry.get(branch).unwrap().core().generation, 2);

        registry
            .commit_edit(branch, &params, |species| {
                if let Some(m) = species.as_macroscopic_mut() {
                    m.body_layout_mut().iter_mut().for_each(|ball| ball.size *= 2.0);
                }
            })
            .unwrap();

        let original = registry.get(0).unwrap().as_macroscopic().unwrap();
        assert_eq!(original.body_layout().get(MetaballId(0)).unwrap().size, 1.0);
    }

    #[test]
    fn test_apply_mutation_kind_mismatch_keeps_species() {
        let params = params();
        let mut registry = SpeciesRegistry::new();
        registry.insert(creature(0)).unwrap();
        let before = registry.get(0).unwrap().clone();

        let microbe: Species = MicrobeSpecies::new(9, "Parvus", "simplex").into();
        assert!(matches!(
            registry.apply_mutation(0, &microbe, &params),
            Err(SpeciesRegistryError::Species(SpeciesError::KindMismatch {
                expected: SpeciesKind::Macroscopic,
                ..
            }))
        ));
        assert_eq!(registry.get(0).unwrap(), &before);
    }

    #[test]
    fn test_unknown_species() {
        let params = params();
        let mut registry = SpeciesRegistry::new();
        assert!(matches!(
            registry.commit_edit(3, &params, |_| {}),
            Err(SpeciesRegistryError::UnknownSpecies(3))
        ));
        assert!(registry.branch_for_auto_evo(3).is_err());
    }
}
