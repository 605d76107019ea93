//! Procedural species and auto-evo mutation candidates

use primordia_logic::cell_type::OrganelleTemplate;
use primordia_logic::geometry::{Hex, Vec3};
use primordia_logic::macroscopic::MacroscopicSpecies;
use primordia_logic::metaball::MetaballId;
use primordia_logic::microbe::MicrobeSpecies;
use primordia_logic::registry::{OrganelleFeature, SimulationParameters};
use primordia_logic::species::{Species, SpeciesBehaviour, SpeciesError};
use rand::seq::SliceRandom;
use rand::Rng;

use super::names::generate_species_name;

/// Smallest metaball a mutation may shrink to
const MIN_METABALL_SIZE: f32 = 0.1;

/// Tissues every generated macroscopic species starts with
const BODY_TISSUE: &[&str] = &["cytoplasm", "mitochondrion"];
const BRAIN_TISSUE: &[&str] = &["axon", "cytoplasm"];
const MUSCLE_TISSUE: &[&str] = &["myofibril", "cytoplasm"];

fn tissue(keys: &[&str]) -> Vec<OrganelleTemplate> {
    keys.iter()
        .enumerate()
        .map(|(i, key)| OrganelleTemplate::new(*key, Hex::new(i as i32, 0), 0))
        .collect()
}

fn random_colour(rng: &mut impl Rng) -> [f32; 4] {
    [rng.gen_range(0.2..1.0), rng.gen_range(0.2..1.0), rng.gen_range(0.2..1.0), 1.0]
}

/// Random direction in the upper hemisphere, scaled to `length`
fn random_offset(rng: &mut impl Rng, length: f32) -> Vec3 {
    let x: f32 = rng.gen_range(-1.0..1.0);
    let y: f32 = rng.gen_range(0.0..1.0);
    let z: f32 = rng.gen_range(-1.0..1.0);
    let direction = Vec3::new(x, y, z);
    let norm = direction.length();
    if norm > 0.0 {
        direction * (length / norm)
    } else {
        Vec3::new(0.0, length, 0.0)
    }
}

/// Generate a single-celled species with cytoplasm plus a few organelles
/// drawn from the registry
pub fn generate_microbe_species(
    id: u32,
    params: &SimulationParameters,
    rng: &mut impl Rng,
) -> Result<MicrobeSpecies, SpeciesError> {
    let (genus, epithet) = generate_species_name(rng);
    let mut species = MicrobeSpecies::new(id, genus, epithet);
    species.core.colour = random_colour(rng);
    species.is_bacteria = rng.gen_bool(0.5);

    // Cytoplasm must exist; the rest is optional flavour
    params.organelle("cytoplasm")?;
    species = species.with_organelle(OrganelleTemplate::new("cytoplasm", Hex::new(0, 0), 0));

    let candidates: Vec<&str> = params
        .organelles()
        .filter(|o| {
            !o.has_feature(OrganelleFeature::Axon) && !o.has_feature(OrganelleFeature::Myofibril)
        })
        .map(|o| o.internal_name.as_str())
        .collect();

    let extra = rng.gen_range(0..=3);
    for q in 1..=extra {
        if let Some(key) = candidates.choose(rng) {
            let orientation = rng.gen_range(0..6);
            species = species.with_organelle(OrganelleTemplate::new(*key, Hex::new(q, 0), orientation));
        }
    }

    species.on_edited(params)?;
    Ok(species)
}

/// Generate a macroscopic species: a random metaball tree of body, brain
/// and muscle tissue, committed through `on_edited`
pub fn generate_macroscopic_species(
    id: u32,
    params: &SimulationParameters,
    rng: &mut impl Rng,
) -> Result<MacroscopicSpecies, SpeciesError> {
    let (genus, epithet) = generate_species_name(rng);
    let mut species = MacroscopicSpecies::new(id, genus, epithet);
    species.core.colour = random_colour(rng);
    species.scale = rng.gen_range(0.5..2.0);

    let cell_types = [
        species.add_cell_type("body", tissue(BODY_TISSUE)),
        species.add_cell_type("brain", tissue(BRAIN_TISSUE)),
        species.add_cell_type("muscle", tissue(MUSCLE_TISSUE)),
    ];

    let root_size = rng.gen_range(1.0..2.0);
    let root = species.add_metaball(
        Vec3::new(0.0, root_size, 0.0),
        root_size,
        None,
        cell_types[0],
    )?;

    let mut placed = vec![(root, Vec3::new(0.0, root_size, 0.0), root_size)];
    let children = rng.gen_range(2..=6);
    for _ in 0..children {
        let (parent, parent_position, parent_size) = placed[rng.gen_range(0..placed.len())];
        let size = rng.gen_range(0.3..1.2);
        let position = parent_position + random_offset(rng, (parent_size + size) * 0.4);
        let cell_type = cell_types[rng.gen_range(0..cell_types.len())];

        let child = species.add_metaball(position, size, Some(parent), cell_type)?;
        placed.push((child, position, size));
    }

    species.on_edited(params)?;
    log::debug!(
        "Generated {} with {} metaballs ({:?})",
        species.core.formatted_name(),
        species.body_layout().len(),
        species.macroscopic_type()
    );
    Ok(species)
}

/// Clone a species and perturb it into an auto-evo candidate. The
/// candidate is not committed; hand it to the registry's `apply_mutation`.
pub fn propose_mutation(species: &Species, rng: &mut impl Rng) -> Species {
    let mut candidate = species.clone();

    let colour = &mut candidate.core_mut().colour;
    for channel in colour.iter_mut().take(3) {
        *channel = (*channel + rng.gen_range(-0.05..0.05)).clamp(0.0, 1.0);
    }

    match &mut candidate {
        Species::Microbe(microbe) => {
            if rng.gen_bool(0.5) {
                let next_q = microbe
                    .organelles
                    .iter()
                    .map(|o| o.position.q)
                    .max()
                    .map_or(0, |q| q + 1);
                microbe
                    .organelles
                    .push(OrganelleTemplate::new("cytoplasm", Hex::new(next_q, 0), 0));
            } else {
                microbe.membrane_rigidity =
                    (microbe.membrane_rigidity + rng.gen_range(-0.1..0.1)).clamp(-1.0, 1.0);
            }
        }
        Species::Macroscopic(macroscopic) => {
            for metaball in macroscopic.body_layout_mut().iter_mut() {
                let factor = rng.gen_range(0.9..1.1);
                metaball.size = (metaball.size * factor).max(MIN_METABALL_SIZE);
            }

            if rng.gen_bool(0.5) {
                grow_metaball(macroscopic, rng);
            }
        }
    }

    candidate
}

/// Appends a child to a random metaball, reusing one of the species' cell
/// types
fn grow_metaball(species: &mut MacroscopicSpecies, rng: &mut impl Rng) {
    let parents: Vec<(MetaballId, Vec3, f32)> = species
        .body_layout()
        .iter()
        .map(|m| (m.id, m.position, m.size))
        .collect();
    let Some(&(parent, position, size)) = parents.choose(rng) else {
        return;
    };
    let Some(cell_type) = species.cell_types().choose(rng).map(|c| c.id) else {
        return;
    };

    let child_size = (size * rng.gen_range(0.3..0.8)).max(MIN_METABALL_SIZE);
    let child_position = position + random_offset(rng, (size + child_size) * 0.4);
    if let Err(e) = species.add_metaball(child_position, child_size, Some(parent), cell_type) {
        log::warn!("Mutation could not grow a metaball: {}", e);
    }
}
