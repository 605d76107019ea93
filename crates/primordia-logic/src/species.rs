//! Species - shared identity data plus the per-kind variants.
//!
//! `Species` is a tagged variant over the concrete kinds. Everything a kind
//! must be able to do goes through [`SpeciesBehaviour`], which the enum
//! implements by delegating to the variant.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cell_type::{CellTypeId, OrganelleTemplate};
use crate::compounds::{Compound, CompoundBag};
use crate::constants::{initial_compounds, organelle_keys};
use crate::macroscopic::MacroscopicSpecies;
use crate::metaball::LayoutError;
use crate::microbe::MicrobeSpecies;
use crate::registry::{OrganelleFeature, RegistryError, SimulationParameters};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpeciesKind {
    Microbe,
    Macroscopic,
}

impl fmt::Display for SpeciesKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpeciesKind::Microbe => write!(f, "microbe"),
            SpeciesKind::Macroscopic => write!(f, "macroscopic"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SpeciesError {
    #[error("{operation} is not supported for {kind} species")]
    Unsupported {
        operation: &'static str,
        kind: SpeciesKind,
    },
    #[error("cannot apply a {found} mutation to a {expected} species")]
    KindMismatch {
        expected: SpeciesKind,
        found: SpeciesKind,
    },
    #[error("cell type {0:?} is not in the species catalog")]
    UnknownCellType(CellTypeId),
    #[error(transparent)]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Identity and bookkeeping shared by every species kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesCore {
    pub id: u32,
    pub genus: String,
    pub epithet: String,
    /// RGBA
    pub colour: [f32; 4],
    pub population: i64,
    pub generation: u32,
    pub player_species: bool,
    pub initial_compounds: CompoundBag,
}

impl SpeciesCore {
    pub fn new(id: u32, genus: impl Into<String>, epithet: impl Into<String>) -> Self {
        Self {
            id,
            genus: genus.into(),
            epithet: epithet.into(),
            colour: [1.0, 1.0, 1.0, 1.0],
            population: 100,
            generation: 1,
            player_species: false,
            initial_compounds: CompoundBag::new(),
        }
    }

    pub fn formatted_name(&self) -> String {
        format!("{} {}", self.genus, self.epithet)
    }

    /// The parts of a mutation candidate every kind takes over
    pub fn apply_mutation_from(&mut self, mutation: &SpeciesCore) {
        self.genus = mutation.genus.clone();
        self.epithet = mutation.epithet.clone();
        self.colour = mutation.colour;
    }
}

/// Which starting compound package a composition earns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartingCompounds {
    Iron,
    Chemosynthesis,
    Default,
}

impl StartingCompounds {
    /// Priority ordered: iron beats chemosynthesis beats the base ration.
    /// Organelles are classified by their definition's feature tags. The
    /// canonical iron and chemosynthesis keys must exist in the registry.
    pub fn classify<'a>(
        organelles: impl IntoIterator<Item = &'a OrganelleTemplate>,
        params: &SimulationParameters,
    ) -> Result<Self, RegistryError> {
        for key in [
            organelle_keys::RUSTICYANIN,
            organelle_keys::CHEMOPLAST,
            organelle_keys::CHEMOSYNTHESIZING_PROTEINS,
        ] {
            params.organelle(key)?;
        }

        let mut has_chemo = false;
        for organelle in organelles {
            let definition = params.organelle(&organelle.definition)?;
            if definition.has_feature(OrganelleFeature::IronOxidizing) {
                return Ok(Self::Iron);
            }
            has_chemo |= definition.has_feature(OrganelleFeature::Chemosynthesis);
        }

        Ok(if has_chemo {
            Self::Chemosynthesis
        } else {
            Self::Default
        })
    }

    /// Replaces the contents of `bag` with this package
    pub fn fill(self, bag: &mut CompoundBag) {
        bag.clear();
        bag.add(Compound::Atp, initial_compounds::ATP);
        bag.add(Compound::Glucose, initial_compounds::GLUCOSE);

        match self {
            Self::Iron => bag.add(Compound::Iron, initial_compounds::IRON),
            Self::Chemosynthesis => {
                bag.add(Compound::Hydrogensulfide, initial_compounds::HYDROGEN_SULFIDE)
            }
            Self::Default => {}
        }
    }
}

/// What every species kind must support
pub trait SpeciesBehaviour {
    fn core(&self) -> &SpeciesCore;

    fn core_mut(&mut self) -> &mut SpeciesCore;

    fn kind(&self) -> SpeciesKind;

    /// Recomputes everything derived from the species' composition after an
    /// editor commit
    fn on_edited(&mut self, params: &SimulationParameters) -> Result<(), SpeciesError>;

    /// Returns true if the body moved
    fn reposition_to_origin(&mut self) -> bool;

    fn update_initial_compounds(&mut self, params: &SimulationParameters)
        -> Result<(), SpeciesError>;

    /// Takes over the composition of `mutation`, which must be the same kind
    fn apply_mutation(&mut self, mutation: &Species) -> Result<(), SpeciesError>;

    /// Relative size used when auto-evo scores predation
    fn predation_target_size_factor(&self, params: &SimulationParameters)
        -> Result<f32, SpeciesError>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Species {
    Microbe(MicrobeSpecies),
    Macroscopic(MacroscopicSpecies),
}

impl Species {
    pub fn id(&self) -> u32 {
        self.core().id
    }

    pub fn formatted_name(&self) -> String {
        self.core().formatted_name()
    }

    pub fn as_microbe(&self) -> Option<&MicrobeSpecies> {
        match self {
            Species::Microbe(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_macroscopic(&self) -> Option<&MacroscopicSpecies> {
        match self {
            Species::Macroscopic(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_macroscopic_mut(&mut self) -> Option<&mut MacroscopicSpecies> {
        match self {
            Species::Macroscopic(s) => Some(s),
            _ => None,
        }
    }

    fn behaviour(&self) -> &dyn SpeciesBehaviour {
        match self {
            Species::Microbe(s) => s,
            Species::Macroscopic(s) => s,
        }
    }

    fn behaviour_mut(&mut self) -> &mut dyn SpeciesBehaviour {
        match self {
            Species::Microbe(s) => s,
            Species::Macroscopic(s) => s,
        }
    }
}

impl SpeciesBehaviour for Species {
    fn core(&self) -> &SpeciesCore {
        self.behaviour().core()
    }

    fn core_mut(&mut self) -> &mut SpeciesCore {
        self.behaviour_mut().core_mut()
    }

    fn kind(&self) -> SpeciesKind {
        self.behaviour().kind()
    }

    fn on_edited(&mut self, params: &SimulationParameters) -> Result<(), SpeciesError> {
        self.behaviour_mut().on_edited(params)
    }

    fn reposition_to_origin(&mut self) -> bool {
        self.behaviour_mut().reposition_to_origin()
    }

    fn update_initial_compounds(
        &mut self,
        params: &SimulationParameters,
    ) -> Result<(), SpeciesError> {
        self.behaviour_mut().update_initial_compounds(params)
    }

    fn apply_mutation(&mut self, mutation: &Species) -> Result<(), SpeciesError> {
        self.behaviour_mut().apply_mutation(mutation)
    }

    fn predation_target_size_factor(
        &self,
        params: &SimulationParameters,
    ) -> Result<f32, SpeciesError> {
        self.behaviour().predation_target_size_factor(params)
    }
}

impl From<MicrobeSpecies> for Species {
    fn from(species: MicrobeSpecies) -> Self {
        Species::Microbe(species)
    }
}

impl From<MacroscopicSpecies> for Species {
    fn from(species: MacroscopicSpecies) -> Self {
        Species::Macroscopic(species)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Hex;
    use crate::registry::{test_support, OrganelleDefinition};

    fn templates(keys: &[&str]) -> Vec<OrganelleTemplate> {
        keys.iter()
            .map(|k| OrganelleTemplate::new(*k, Hex::default(), 0))
            .collect()
    }

    #[test]
    fn test_classify_priority() {
        let params = test_support::parameters();
        let classify = |keys: &[&str]| StartingCompounds::classify(&templates(keys), &params).unwrap();

        assert_eq!(classify(&["cytoplasm"]), StartingCompounds::Default);
        assert_eq!(classify(&["chemoplast"]), StartingCompounds::Chemosynthesis);
        assert_eq!(
            classify(&["chemoSynthesizingProteins"]),
            StartingCompounds::Chemosynthesis
        );
        // Iron wins even when chemosynthesis shows up first
        assert_eq!(
            classify(&["chemoplast", "rusticyanin"]),
            StartingCompounds::Iron
        );
    }

    #[test]
    fn test_classify_needs_registry_keys() {
        let params = SimulationParameters::default();
        assert!(StartingCompounds::classify(&templates(&["cytoplasm"]), &params).is_err());
    }

    #[test]
    fn test_classify_reads_feature_tags() {
        let mut definitions: Vec<OrganelleDefinition> = test_support::parameters()
            .organelles()
            .cloned()
            .collect();
        definitions.push(OrganelleDefinition {
            internal_name: "ferroplast".to_string(),
            name: "Ferroplast".to_string(),
            hexes: 2,
            features: vec![OrganelleFeature::IronOxidizing],
        });
        let params = SimulationParameters::new(definitions).unwrap();

        assert_eq!(
            StartingCompounds::classify(&templates(&["cytoplasm", "ferroplast"]), &params).unwrap(),
            StartingCompounds::Iron
        );
    }

    #[test]
    fn test_classify_rejects_unknown_organelle() {
        let params = test_support::parameters();
        assert!(matches!(
            StartingCompounds::classify(&templates(&["plastidium"]), &params),
            Err(RegistryError::UnknownOrganelle(key)) if key == "plastidium"
        ));
    }

    #[test]
    fn test_fill_exactly_one_branch() {
        let mut bag = CompoundBag::new();
        bag.add(Compound::Oxytoxy, 5.0);

        StartingCompounds::Iron.fill(&mut bag);
        assert_eq!(bag.get(Compound::Atp), 180.0);
        assert_eq!(bag.get(Compound::Glucose), 90.0);
        assert_eq!(bag.get(Compound::Iron), 90.0);
        assert_eq!(bag.get(Compound::Hydrogensulfide), 0.0);
        assert_eq!(bag.get(Compound::Oxytoxy), 0.0);

        StartingCompounds::Chemosynthesis.fill(&mut bag);
        assert_eq!(bag.get(Compound::Iron), 0.0);
        assert_eq!(bag.get(Compound::Hydrogensulfide), 90.0);

        StartingCompounds::Default.fill(&mut bag);
        assert!((bag.total() - 270.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_core_mutation_copies_identity() {
        let mut core = SpeciesCore::new(1, "Primum", "vetus");
        let mut other = SpeciesCore::new(2, "Novum", "recens");
        other.colour = [0.2, 0.3, 0.4, 1.0];
        other.population = 5;

        core.apply_mutation_from(&other);

        assert_eq!(core.formatted_name(), "Novum recens");
        assert_eq!(core.colour, other.colour);
        assert_eq!(core.id, 1);
        assert_eq!(core.population, 100);
    }
}
