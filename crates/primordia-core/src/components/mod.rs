//! Component definitions for the ECS world.
//!
//! Components are pure data structs attached to entities.
//! They have no behavior - that lives in systems.

mod cell;
mod chunk;
mod common;

pub use cell::*;
pub use chunk::*;
pub use common::*;
