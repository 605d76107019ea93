//! Primordia Core - game session on top of the pure gameplay data
//!
//! Holds everything that needs an ECS world, randomness or I/O: the entity
//! components for microbes and floating chunks, the per-frame systems that
//! turn contacts into tutorial events, procedural species and chunk
//! generation, the species registry and save/load.
//!
//! # Architecture
//!
//! The session uses an Entity Component System (ECS) architecture via `hecs`:
//! - **Entities**: The player cell, floating chunks
//! - **Components**: Pure data attached to entities (Position, Health, FloatingChunk, etc.)
//! - **Systems**: Functions that query and update components and report events
//!
//! Species data lives outside the world in [`registry::SpeciesRegistry`];
//! entities only carry the species id.
//!
//! # Example
//!
//! ```rust,no_run
//! use primordia_core::prelude::*;
//!
//! let organelles = std::fs::read_to_string("data/organelles.json").unwrap();
//! let chunks = std::fs::read_to_string("data/chunks.json").unwrap();
//! let mut session = GameSession::from_json(&organelles, &chunks, SessionConfig::default()).unwrap();
//!
//! session.spawn_player().unwrap();
//! session.spawn_chunks();
//!
//! loop {
//!     session.update(1.0 / 60.0);
//! }
//! ```

pub mod components;
pub mod engine;
pub mod generation;
pub mod persistence;
pub mod registry;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::engine::{GameSession, SessionConfig, SessionError};
    pub use crate::registry::SpeciesRegistry;
}
