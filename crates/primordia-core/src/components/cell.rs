//! Cell components: species membership and the player markers.

use serde::{Deserialize, Serialize};

/// The entity is a member of a species. Species data (initial compounds,
/// composition) applies to it through the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeciesMember {
    pub species_id: u32,
}

impl SpeciesMember {
    pub fn new(species_id: u32) -> Self {
        Self { species_id }
    }
}

/// Marker component for the player-controlled cell
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Player;

/// Marker component present while a cell is in engulf mode
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Engulfing;
