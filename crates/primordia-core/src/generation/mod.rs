//! Generation - procedural creation of species, mutations and chunk spawns

mod chunks;
mod names;
mod species;

pub use chunks::*;
pub use names::*;
pub use species::*;
