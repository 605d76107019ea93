//! Systems - logic that operates on components
//!
//! Systems report what happened as tutorial events; the session decides
//! where those go.

mod contact;
mod proximity;
mod venting;

pub use contact::*;
pub use proximity::*;
pub use venting::*;

use hecs::{Entity, World};
use primordia_logic::chunk::ChunkConfiguration;
use primordia_logic::geometry::Vec3;

use crate::components::{Player, Position};

/// The player entity and where it is, if one is spawned
pub fn find_player(world: &World) -> Option<(Entity, Vec3)> {
    world
        .query::<(&Player, &Position)>()
        .iter()
        .next()
        .map(|(entity, (_, position))| (entity, position.0))
}

/// Looks up a chunk configuration by name
pub fn find_configuration<'a>(
    configurations: &'a [ChunkConfiguration],
    name: &str,
) -> Option<&'a ChunkConfiguration> {
    configurations.iter().find(|c| c.name == name)
}
