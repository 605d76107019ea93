//! Save/Load functionality
//!
//! Two formats live here:
//! - **Species documents** (JSON): a portable export of species. Cell types
//!   and metaballs get document-wide reference ids, and metaballs point at
//!   their parent and cell type by reference. Every cell type is written
//!   once no matter how many metaballs use it. Import resolves references
//!   through the table and rebuilds each body parents first.
//! - **Session saves** (bincode): a snapshot of the whole game session.
//!   Components are serialized per entity and reconstructed on load.

use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};

use hecs::World;
use primordia_logic::cell_type::{CellType, CellTypeId, OrganelleTemplate};
use primordia_logic::compounds::CompoundBag;
use primordia_logic::geometry::Vec3;
use primordia_logic::macroscopic::{MacroscopicSpecies, MacroscopicType, ReproductionLocation};
use primordia_logic::metaball::MetaballId;
use primordia_logic::microbe::MicrobeSpecies;
use primordia_logic::registry::SimulationParameters;
use primordia_logic::species::{Species, SpeciesBehaviour, SpeciesCore, SpeciesError};
use primordia_logic::tutorial::TutorialState;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::*;
use crate::engine::SessionConfig;
use crate::registry::SpeciesRegistry;

/// Version number for save file format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Version number for species documents
const DOCUMENT_VERSION: u32 = 1;

/// Errors that can occur during save/load
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
    #[error("reference {0} is defined more than once")]
    DuplicateReference(u32),
    #[error("{owner} refers to missing reference {reference}")]
    DanglingReference { owner: u32, reference: u32 },
    #[error("metaball reference {0} is part of a parent cycle")]
    ReferenceCycle(u32),
    #[error("species {owner} lists cell type '{type_name}' more than once")]
    DuplicateCellTypeName { owner: u32, type_name: String },
    #[error(transparent)]
    Species(#[from] SpeciesError),
}

// ── Species documents ───────────────────────────────────────────────────

/// A set of species with their shared objects written once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesDocument {
    pub version: u32,
    /// Identity table of every cell type in the document
    pub cell_types: Vec<CellTypeRecord>,
    pub species: Vec<SpeciesRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellTypeRecord {
    pub reference: u32,
    pub type_name: String,
    pub organelles: Vec<OrganelleTemplate>,
    pub membrane_type: String,
    pub colour: [f32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaballRecord {
    pub reference: u32,
    pub position: Vec3,
    pub size: f32,
    /// Reference of the parent metaball, `None` for the root
    pub parent: Option<u32>,
    /// Reference into the cell type table
    pub cell_type: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesRecord {
    pub core: SpeciesCore,
    pub body: SpeciesBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SpeciesBody {
    Microbe {
        organelles: Vec<OrganelleTemplate>,
        membrane_type: String,
        membrane_rigidity: f32,
        is_bacteria: bool,
    },
    Macroscopic(MacroscopicBody),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroscopicBody {
    pub scale: f32,
    pub reproduction_location: ReproductionLocation,
    /// Stage at export time, kept so stage overrides survive
    pub macroscopic_type: MacroscopicType,
    /// The species' cell type catalog, by reference
    pub cell_types: Vec<u32>,
    pub metaballs: Vec<MetaballRecord>,
}

impl SpeciesDocument {
    /// Export species. Fails if a body layout is corrupt.
    pub fn from_species<'a>(
        species: impl IntoIterator<Item = &'a Species>,
    ) -> Result<Self, PersistenceError> {
        let mut document = Self {
            version: DOCUMENT_VERSION,
            cell_types: Vec::new(),
            species: Vec::new(),
        };
        let mut next_reference = 0u32;

        for entry in species {
            let body = match entry {
                Species::Microbe(microbe) => SpeciesBody::Microbe {
                    organelles: microbe.organelles.clone(),
                    membrane_type: microbe.membrane_type.clone(),
                    membrane_rigidity: microbe.membrane_rigidity,
                    is_bacteria: microbe.is_bacteria,
                },
                Species::Macroscopic(macroscopic) => {
                    macroscopic.validate()?;
                    export_macroscopic(macroscopic, &mut document.cell_types, &mut next_reference)
                }
            };
            document.species.push(SpeciesRecord {
                core: entry.core().clone(),
                body,
            });
        }

        Ok(document)
    }

    /// Rebuild the species, resolving every reference through the identity
    /// table. Macroscopic species are committed through `on_edited`.
    pub fn into_species(self, params: &SimulationParameters) -> Result<Vec<Species>, PersistenceError> {
        if self.version != DOCUMENT_VERSION {
            return Err(PersistenceError::VersionMismatch {
                expected: DOCUMENT_VERSION,
                found: self.version,
            });
        }

        let mut seen = HashSet::new();
        let mut cell_types: HashMap<u32, &CellTypeRecord> = HashMap::with_capacity(self.cell_types.len());
        for record in &self.cell_types {
            if !seen.insert(record.reference) {
                return Err(PersistenceError::DuplicateReference(record.reference));
            }
            cell_types.insert(record.reference, record);
        }

        let mut imported = Vec::with_capacity(self.species.len());
        for record in &self.species {
            let species = match &record.body {
                SpeciesBody::Microbe {
                    organelles,
                    membrane_type,
                    membrane_rigidity,
                    is_bacteria,
                } => {
                    let mut microbe = MicrobeSpecies::new(record.core.id, "", "");
                    microbe.core = record.core.clone();
                    microbe.organelles = organelles.clone();
                    microbe.membrane_type = membrane_type.clone();
                    microbe.membrane_rigidity = *membrane_rigidity;
                    microbe.is_bacteria = *is_bacteria;
                    Species::Microbe(microbe)
                }
                SpeciesBody::Macroscopic(body) => Species::Macroscopic(import_macroscopic(
                    &record.core,
                    body,
                    &cell_types,
                    &mut seen,
                    params,
                )?),
            };
            imported.push(species);
        }

        Ok(imported)
    }
}

fn export_macroscopic(
    species: &MacroscopicSpecies,
    table: &mut Vec<CellTypeRecord>,
    next_reference: &mut u32,
) -> SpeciesBody {
    let mut allocate = || {
        let reference = *next_reference;
        *next_reference += 1;
        reference
    };

    let mut cell_type_refs: HashMap<CellTypeId, u32> = HashMap::new();
    let mut catalog = Vec::with_capacity(species.cell_types().len());
    for cell_type in species.cell_types() {
        let reference = allocate();
        cell_type_refs.insert(cell_type.id, reference);
        catalog.push(reference);
        table.push(cell_type_record(reference, cell_type));
    }

    let metaball_refs: HashMap<MetaballId, u32> = species
        .body_layout()
        .iter()
        .map(|m| (m.id, allocate()))
        .collect();

    // A validated layout only points at metaballs and cell types that exist
    let metaballs = species
        .body_layout()
        .iter()
        .filter_map(|m| {
            Some(MetaballRecord {
                reference: *metaball_refs.get(&m.id)?,
                position: m.position,
                size: m.size,
                parent: match m.parent {
                    Some(parent) => Some(*metaball_refs.get(&parent)?),
                    None => None,
                },
                cell_type: *cell_type_refs.get(&m.cell_type)?,
            })
        })
        .collect();

    SpeciesBody::Macroscopic(MacroscopicBody {
        scale: species.scale,
        reproduction_location: species.reproduction_location,
        macroscopic_type: species.macroscopic_type(),
        cell_types: catalog,
        metaballs,
    })
}

fn cell_type_record(reference: u32, cell_type: &CellType) -> CellTypeRecord {
    CellTypeRecord {
        reference,
        type_name: cell_type.type_name.clone(),
        organelles: cell_type.organelles.clone(),
        membrane_type: cell_type.membrane_type.clone(),
        colour: cell_type.colour,
    }
}

fn import_macroscopic(
    core: &SpeciesCore,
    body: &MacroscopicBody,
    table: &HashMap<u32, &CellTypeRecord>,
    seen: &mut HashSet<u32>,
    params: &SimulationParameters,
) -> Result<MacroscopicSpecies, PersistenceError> {
    let metaballs = &body.metaballs;

    let mut species = MacroscopicSpecies::new(core.id, "", "");
    species.core = core.clone();
    species.scale = body.scale;
    species.reproduction_location = body.reproduction_location;

    let mut catalog: HashMap<u32, CellTypeId> = HashMap::with_capacity(body.cell_types.len());
    for reference in &body.cell_types {
        let cell_type = table.get(reference).ok_or(PersistenceError::DanglingReference {
            owner: core.id,
            reference: *reference,
        })?;
        if catalog.contains_key(reference) {
            return Err(PersistenceError::DuplicateReference(*reference));
        }
        // Adding by name would silently merge a repeated name into one type
        if species
            .cell_types()
            .iter()
            .any(|existing| existing.type_name == cell_type.type_name)
        {
            return Err(PersistenceError::DuplicateCellTypeName {
                owner: core.id,
                type_name: cell_type.type_name.clone(),
            });
        }
        let id = species.add_cell_type(cell_type.type_name.clone(), cell_type.organelles.clone());
        if let Some(added) = species.cell_type_mut(id) {
            added.membrane_type = cell_type.membrane_type.clone();
            added.colour = cell_type.colour;
        }
        catalog.insert(*reference, id);
    }

    let mut by_reference: HashMap<u32, &MetaballRecord> = HashMap::with_capacity(metaballs.len());
    for metaball in metaballs {
        if !seen.insert(metaball.reference) {
            return Err(PersistenceError::DuplicateReference(metaball.reference));
        }
        by_reference.insert(metaball.reference, metaball);
    }

    for metaball in metaballs {
        if let Some(parent) = metaball.parent {
            if !by_reference.contains_key(&parent) {
                return Err(PersistenceError::DanglingReference {
                    owner: metaball.reference,
                    reference: parent,
                });
            }
        }
        if !catalog.contains_key(&metaball.cell_type) {
            return Err(PersistenceError::DanglingReference {
                owner: metaball.reference,
                reference: metaball.cell_type,
            });
        }
    }

    // Parents before children so every parent id is known when a child is added
    let mut ordered: Vec<(usize, &MetaballRecord)> = Vec::with_capacity(metaballs.len());
    for metaball in metaballs {
        ordered.push((reference_depth(metaball, &by_reference)?, metaball));
    }
    ordered.sort_by_key(|(depth, _)| *depth);

    let mut ids: HashMap<u32, MetaballId> = HashMap::with_capacity(metaballs.len());
    for (_, metaball) in ordered {
        let dangling = |reference| PersistenceError::DanglingReference {
            owner: metaball.reference,
            reference,
        };
        let parent = match metaball.parent {
            Some(parent) => Some(ids.get(&parent).copied().ok_or(dangling(parent))?),
            None => None,
        };
        let cell_type = catalog
            .get(&metaball.cell_type)
            .copied()
            .ok_or(dangling(metaball.cell_type))?;
        let id = species.add_metaball(metaball.position, metaball.size, parent, cell_type)?;
        ids.insert(metaball.reference, id);
    }

    species.on_edited(params)?;
    restore_stage_override(&mut species, body.macroscopic_type);
    Ok(species)
}

fn reference_depth(
    metaball: &MetaballRecord,
    by_reference: &HashMap<u32, &MetaballRecord>,
) -> Result<usize, PersistenceError> {
    let mut depth = 0;
    let mut current = metaball;
    while let Some(parent) = current.parent {
        depth += 1;
        if depth > by_reference.len() {
            return Err(PersistenceError::ReferenceCycle(metaball.reference));
        }
        current = by_reference.get(&parent).ok_or(PersistenceError::DanglingReference {
            owner: current.reference,
            reference: parent,
        })?;
    }
    Ok(depth)
}

/// Re-applies an explicit stage override the export captured
fn restore_stage_override(species: &mut MacroscopicSpecies, stored: MacroscopicType) {
    let derived = species.macroscopic_type();
    match (stored, derived) {
        (s, d) if s == d => {}
        (MacroscopicType::Awakened, _) => species.move_player_to_awakened_status(),
        (MacroscopicType::Aware, MacroscopicType::Awakened) => species.keep_player_in_aware_stage(),
        _ => log::warn!(
            "Species {} was saved as {:?} but its body now derives {:?}",
            species.core.id,
            stored,
            derived
        ),
    }
}

/// Write species to a JSON document
pub fn write_species_document<'a, W: Write>(
    writer: W,
    species: impl IntoIterator<Item = &'a Species>,
) -> Result<(), PersistenceError> {
    let document = SpeciesDocument::from_species(species)?;
    serde_json::to_writer_pretty(writer, &document)?;
    log::info!(
        "Exported {} species with {} cell types",
        document.species.len(),
        document.cell_types.len()
    );
    Ok(())
}

/// Read species from a JSON document
pub fn read_species_document<R: Read>(
    reader: R,
    params: &SimulationParameters,
) -> Result<Vec<Species>, PersistenceError> {
    let document: SpeciesDocument = serde_json::from_reader(reader)?;
    document.into_species(params)
}

// ── Session saves ───────────────────────────────────────────────────────

/// Serializable snapshot of a game session
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    /// Save format version
    pub version: u32,
    /// Seconds played
    pub elapsed: f64,
    pub config: SessionConfig,
    pub species: SpeciesRegistry,
    pub tutorial: TutorialState,
    /// Compounds dissolved into the surroundings
    pub environment: CompoundBag,
    /// All entities with their components
    pub entities: Vec<SerializableEntity>,
}

/// All possible components for an entity, serialized as optionals
#[derive(Serialize, Deserialize, Default)]
pub struct SerializableEntity {
    pub position: Option<Position>,
    pub species_member: Option<SpeciesMember>,
    pub player: Option<Player>,
    pub engulfing: Option<Engulfing>,
    pub storage: Option<CompoundStorage>,
    pub health: Option<Health>,
    pub chunk: Option<FloatingChunk>,
}

/// Extract all entities from a world into serializable form
fn serialize_entities(world: &World) -> Vec<SerializableEntity> {
    let mut entities = Vec::new();

    for entity_ref in world.iter() {
        let mut se = SerializableEntity::default();

        if let Some(c) = entity_ref.get::<&Position>() {
            se.position = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&SpeciesMember>() {
            se.species_member = Some(*c);
        }
        if entity_ref.has::<Player>() {
            se.player = Some(Player);
        }
        if entity_ref.has::<Engulfing>() {
            se.engulfing = Some(Engulfing);
        }
        if let Some(c) = entity_ref.get::<&CompoundStorage>() {
            se.storage = Some((*c).clone());
        }
        if let Some(c) = entity_ref.get::<&Health>() {
            se.health = Some(*c);
        }
        if let Some(c) = entity_ref.get::<&FloatingChunk>() {
            se.chunk = Some((*c).clone());
        }

        entities.push(se);
    }

    entities
}

/// Spawn an entity with all its components
fn spawn_entity(world: &mut World, se: SerializableEntity) {
    let entity = world.spawn(());

    if let Some(c) = se.position {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.species_member {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.player {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.engulfing {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.storage {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.health {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = se.chunk {
        let _ = world.insert_one(entity, c);
    }
}

/// Borrowed view of everything a session save contains
pub struct SessionSnapshot<'a> {
    pub world: &'a World,
    pub elapsed: f64,
    pub config: &'a SessionConfig,
    pub species: &'a SpeciesRegistry,
    pub tutorial: &'a TutorialState,
    pub environment: &'a CompoundBag,
}

/// Save a session to a writer
pub fn save_session<W: Write>(writer: W, snapshot: SessionSnapshot<'_>) -> Result<(), PersistenceError> {
    let save_data = SaveData {
        version: SAVE_VERSION,
        elapsed: snapshot.elapsed,
        config: snapshot.config.clone(),
        species: snapshot.species.clone(),
        tutorial: snapshot.tutorial.clone(),
        environment: snapshot.environment.clone(),
        entities: serialize_entities(snapshot.world),
    };

    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// Result of loading a session
pub struct LoadedSession {
    pub world: World,
    pub elapsed: f64,
    pub config: SessionConfig,
    pub species: SpeciesRegistry,
    pub tutorial: TutorialState,
    pub environment: CompoundBag,
}

/// Load a session from a reader
pub fn load_session<R: Read>(reader: R) -> Result<LoadedSession, PersistenceError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(PersistenceError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    let mut world = World::new();
    for se in save_data.entities {
        spawn_entity(&mut world, se);
    }

    Ok(LoadedSession {
        world,
        elapsed: save_data.elapsed,
        config: save_data.config,
        species: save_data.species,
        tutorial: save_data.tutorial,
        environment: save_data.environment,
    })
}
