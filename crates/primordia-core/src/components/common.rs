//! Components shared by cells and chunks.

use primordia_logic::compounds::{Compound, CompoundBag};
use primordia_logic::geometry::Vec3;
use serde::{Deserialize, Serialize};

/// World-space position component
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position(pub Vec3);

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self(Vec3::new(x, y, z))
    }

    pub fn distance(&self, other: &Position) -> f32 {
        self.0.distance(&other.0)
    }
}

/// Hitpoints of anything that can be hurt
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Health {
    pub fn new(max: f32) -> Self {
        Self { current: max, max }
    }

    /// Applies damage and returns the amount actually taken
    pub fn damage(&mut self, amount: f32) -> f32 {
        let taken = amount.max(0.0).min(self.current);
        self.current -= taken;
        taken
    }

    pub fn is_dead(&self) -> bool {
        self.current <= 0.0
    }

    pub fn fraction(&self) -> f32 {
        if self.max > 0.0 {
            self.current / self.max
        } else {
            0.0
        }
    }
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

/// Compounds held by a cell, capped per compound
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompoundStorage {
    pub compounds: CompoundBag,
    /// Maximum amount of any single compound
    pub capacity: f32,
}

impl CompoundStorage {
    pub fn new(capacity: f32) -> Self {
        Self {
            compounds: CompoundBag::new(),
            capacity,
        }
    }

    /// Storage pre-filled with `initial`, clamped to capacity
    pub fn with_compounds(capacity: f32, initial: &CompoundBag) -> Self {
        let mut storage = Self::new(capacity);
        for (compound, amount) in initial.iter() {
            storage.store(compound, amount);
        }
        storage
    }

    /// Stores as much as fits. Environmental compounds can't be stored.
    /// Returns the amount stored.
    pub fn store(&mut self, compound: Compound, amount: f32) -> f32 {
        if compound.is_environmental() || amount <= 0.0 {
            return 0.0;
        }
        let free = (self.capacity - self.compounds.get(compound)).max(0.0);
        let stored = amount.min(free);
        self.compounds.add(compound, stored);
        stored
    }

    pub fn get(&self, compound: Compound) -> f32 {
        self.compounds.get(compound)
    }

    pub fn is_full(&self, compound: Compound) -> bool {
        self.compounds.get(compound) >= self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_distance() {
        let a = Position::new(0.0, 0.0, 0.0);
        let b = Position::new(3.0, 0.0, 4.0);
        assert_eq!(a.distance(&b), 5.0);
    }

    #[test]
    fn test_health_damage_clamps() {
        let mut health = Health::new(20.0);
        assert_eq!(health.damage(15.0), 15.0);
        assert_eq!(health.damage(15.0), 5.0);
        assert!(health.is_dead());
        assert_eq!(health.damage(-3.0), 0.0);
    }

    #[test]
    fn test_storage_capacity() {
        let mut storage = CompoundStorage::new(50.0);
        assert_eq!(storage.store(Compound::Glucose, 40.0), 40.0);
        assert_eq!(storage.store(Compound::Glucose, 40.0), 10.0);
        assert!(storage.is_full(Compound::Glucose));
        assert_eq!(storage.store(Compound::Oxygen, 5.0), 0.0);
    }

    #[test]
    fn test_storage_initial_is_clamped() {
        let initial: CompoundBag = [(Compound::Atp, 180.0), (Compound::Iron, 10.0)]
            .into_iter()
            .collect();
        let storage = CompoundStorage::with_compounds(100.0, &initial);
        assert_eq!(storage.get(Compound::Atp), 100.0);
        assert_eq!(storage.get(Compound::Iron), 10.0);
    }
}
