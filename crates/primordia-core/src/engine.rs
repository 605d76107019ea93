//! Game session - main entry point for running the game

use hecs::{Entity, World};
use primordia_logic::chunk::{load_chunk_configurations, ChunkConfiguration, ChunkError};
use primordia_logic::compounds::CompoundBag;
use primordia_logic::geometry::Vec3;
use primordia_logic::registry::{RegistryError, SimulationParameters};
use primordia_logic::species::{Species, SpeciesBehaviour, SpeciesError};
use primordia_logic::tutorial::{TutorialEvent, TutorialState};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::components::*;
use crate::generation::{
    generate_macroscopic_species, generate_microbe_species, propose_mutation, spawn_chunks,
};
use crate::persistence::{self, PersistenceError, SessionSnapshot};
use crate::registry::{SpeciesRegistry, SpeciesRegistryError};
use crate::systems::*;

/// Session tuning, fixed for the lifetime of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// How far the player notices chunks and compound sources
    pub proximity_radius: f32,
    /// Extra reach beyond a chunk's radius that still counts as touching
    pub engulf_reach: f32,
    /// Vented compounds within this distance are absorbed by the player
    pub absorb_radius: f32,
    pub tutorial_enabled: bool,
    pub seed: u64,
    /// Chunks placed by `spawn_chunks`
    pub chunk_count: usize,
    /// Chunks spawn within this distance of the origin on both axes
    pub spawn_half_extent: f32,
    /// Player storage cap per compound
    pub storage_capacity: f32,
    pub player_health: f32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            proximity_radius: 30.0,
            engulf_reach: 1.5,
            absorb_radius: 5.0,
            tutorial_enabled: true,
            seed: 42,
            chunk_count: 40,
            spawn_half_extent: 100.0,
            storage_capacity: 500.0,
            player_health: 100.0,
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Definitions(#[from] RegistryError),
    #[error(transparent)]
    Chunks(#[from] ChunkError),
    #[error(transparent)]
    Species(#[from] SpeciesError),
    #[error(transparent)]
    SpeciesRegistry(#[from] SpeciesRegistryError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error("a player is already spawned")]
    PlayerExists,
    #[error("no player is spawned")]
    NoPlayer,
}

/// One running game: the ECS world plus everything the systems need
pub struct GameSession {
    /// ECS world containing the player and chunks
    pub world: World,
    /// Organelle definitions
    pub params: SimulationParameters,
    /// Chunk definitions, looked up by name
    pub chunks: Vec<ChunkConfiguration>,
    pub species: SpeciesRegistry,
    pub tutorial: TutorialState,
    /// Compounds vented into the surroundings
    pub environment: CompoundBag,

    config: SessionConfig,
    rng: StdRng,
    elapsed: f64,
}

impl GameSession {
    /// Create a session around already loaded definitions
    pub fn new(
        params: SimulationParameters,
        chunks: Vec<ChunkConfiguration>,
        config: SessionConfig,
    ) -> Self {
        log::info!(
            "New session: {} organelles, {} chunk types, seed {}",
            params.organelle_count(),
            chunks.len(),
            config.seed
        );
        Self {
            world: World::new(),
            params,
            chunks,
            species: SpeciesRegistry::new(),
            tutorial: TutorialState::new(config.tutorial_enabled),
            environment: CompoundBag::new(),
            rng: StdRng::seed_from_u64(config.seed),
            config,
            elapsed: 0.0,
        }
    }

    /// Create a session from the JSON definition files
    pub fn from_json(
        organelles_json: &str,
        chunks_json: &str,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let params = SimulationParameters::from_json(organelles_json)?;
        let chunks = load_chunk_configurations(chunks_json)?;
        Ok(Self::new(params, chunks, config))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Seconds played
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    pub fn player(&self) -> Option<Entity> {
        find_player(&self.world).map(|(entity, _)| entity)
    }

    /// Spawn the player cell at the origin. Reuses the registered player
    /// species if there is one, otherwise generates a new microbe species.
    pub fn spawn_player(&mut self) -> Result<Entity, SessionError> {
        if self.player().is_some() {
            return Err(SessionError::PlayerExists);
        }

        let existing = self.species.player_species().map(Species::id);
        let species_id = match existing {
            Some(id) => id,
            None => {
                let id = self.species.allocate_id();
                let mut species = generate_microbe_species(id, &self.params, &mut self.rng)?;
                species.core.player_species = true;
                self.species.insert(species.into())?
            }
        };
        let initial = self
            .species
            .get(species_id)
            .map(|s| s.core().initial_compounds.clone())
            .unwrap_or_default();

        let entity = self.world.spawn((
            Player,
            Position::default(),
            SpeciesMember::new(species_id),
            CompoundStorage::with_compounds(self.config.storage_capacity, &initial),
            Health::new(self.config.player_health),
        ));
        log::info!("Spawned player of species {}", species_id);
        Ok(entity)
    }

    /// Scatter the configured number of chunks around the origin
    pub fn spawn_chunks(&mut self) -> Vec<Entity> {
        spawn_chunks(
            &mut self.world,
            &self.chunks,
            self.config.chunk_count,
            self.config.spawn_half_extent,
            &mut self.rng,
        )
    }

    /// Generate and register a new macroscopic species
    pub fn generate_species(&mut self) -> Result<u32, SessionError> {
        let id = self.species.allocate_id();
        let species = generate_macroscopic_species(id, &self.params, &mut self.rng)?;
        Ok(self.species.insert(species.into())?)
    }

    /// One auto-evo step: branch the species and mutate the branch.
    /// Returns the branch id.
    pub fn auto_evo_step(&mut self, species_id: u32) -> Result<u32, SessionError> {
        let branch = self.species.branch_for_auto_evo(species_id)?;
        let candidate: Species = match self.species.get(branch) {
            Some(species) => propose_mutation(species, &mut self.rng),
            None => return Err(SpeciesRegistryError::UnknownSpecies(branch).into()),
        };
        self.species.apply_mutation(branch, &candidate, &self.params)?;
        Ok(branch)
    }

    pub fn move_player(&mut self, to: Vec3) -> Result<(), SessionError> {
        let player = self.player().ok_or(SessionError::NoPlayer)?;
        if let Ok(mut position) = self.world.get::<&mut Position>(player) {
            position.0 = to;
        }
        Ok(())
    }

    /// Toggle engulf mode on the player
    pub fn set_engulfing(&mut self, engulfing: bool) -> Result<(), SessionError> {
        let player = self.player().ok_or(SessionError::NoPlayer)?;
        if engulfing {
            let _ = self.world.insert_one(player, Engulfing);
        } else {
            let _ = self.world.remove_one::<Engulfing>(player);
        }
        Ok(())
    }

    /// Count floating chunks
    pub fn chunk_count(&self) -> usize {
        self.world.query::<&FloatingChunk>().iter().count()
    }

    /// Update the session by delta_seconds. Returns the events the systems
    /// reported, after they were delivered to the tutorial.
    pub fn update(&mut self, delta_seconds: f32) -> Vec<TutorialEvent> {
        self.elapsed += delta_seconds as f64;

        let mut events = chunk_venting_system(
            &mut self.world,
            &self.chunks,
            &mut self.environment,
            self.config.absorb_radius,
            delta_seconds,
        );
        events.extend(chunk_contact_system(
            &mut self.world,
            &self.chunks,
            self.config.engulf_reach,
            delta_seconds,
        ));
        let report = proximity_system(&self.world, &self.chunks, self.config.proximity_radius);
        events.extend(report.events());
        events.push(TutorialEvent::Process {
            delta: delta_seconds,
        });

        for event in &events {
            self.tutorial.send_event(event);
        }
        events
    }

    /// Save session state to a writer
    pub fn save<W: std::io::Write>(&self, writer: W) -> Result<(), PersistenceError> {
        persistence::save_session(
            writer,
            SessionSnapshot {
                world: &self.world,
                elapsed: self.elapsed,
                config: &self.config,
                species: &self.species,
                tutorial: &self.tutorial,
                environment: &self.environment,
            },
        )?;
        log::info!("Saved session at {:.1}s", self.elapsed);
        Ok(())
    }

    /// Load session state from a reader. Definitions stay as they are.
    pub fn load<R: std::io::Read>(&mut self, reader: R) -> Result<(), PersistenceError> {
        let loaded = persistence::load_session(reader)?;

        self.world = loaded.world;
        self.elapsed = loaded.elapsed;
        self.species = loaded.species;
        self.tutorial = loaded.tutorial;
        self.environment = loaded.environment;
        self.rng = StdRng::seed_from_u64(loaded.config.seed ^ self.elapsed.to_bits());
        self.config = loaded.config;

        for (_, chunk) in self.world.query::<&FloatingChunk>().iter() {
            if find_configuration(&self.chunks, &chunk.configuration).is_none() {
                log::warn!("Loaded chunk uses unknown configuration '{}'", chunk.configuration);
            }
        }

        log::info!("Loaded session at {:.1}s", self.elapsed);
        Ok(())
    }

    /// Export every registered species as a JSON species document
    pub fn export_species<W: std::io::Write>(&self, writer: W) -> Result<(), PersistenceError> {
        persistence::write_species_document(writer, self.species.iter())
    }

    /// Import species from a JSON species document. Returns their ids.
    pub fn import_species<R: std::io::Read>(&mut self, reader: R) -> Result<Vec<u32>, SessionError> {
        let imported = persistence::read_species_document(reader, &self.params)?;
        imported
            .into_iter()
            .map(|species| -> Result<u32, SessionError> { Ok(self.species.insert(species)?) })
            .collect()
    }
}
