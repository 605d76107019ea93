//! Compounds and compound storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Every compound the game tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Compound {
    Atp,
    Glucose,
    Iron,
    Hydrogensulfide,
    Ammonia,
    Phosphates,
    Oxytoxy,
    Mucilage,
    Oxygen,
    Carbondioxide,
    Nitrogen,
    Sunlight,
}

impl Compound {
    /// Environmental compounds exist as gas/light levels and can't be stored
    pub fn is_environmental(self) -> bool {
        matches!(
            self,
            Self::Oxygen | Self::Carbondioxide | Self::Nitrogen | Self::Sunlight
        )
    }
}

/// Amounts of compounds, kept ordered so saves and logs are stable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompoundBag {
    amounts: BTreeMap<Compound, f32>,
}

impl CompoundBag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, compound: Compound) -> f32 {
        self.amounts.get(&compound).copied().unwrap_or(0.0)
    }

    /// Adds to the existing amount. Non-positive amounts are ignored.
    pub fn add(&mut self, compound: Compound, amount: f32) {
        if amount <= 0.0 {
            return;
        }
        *self.amounts.entry(compound).or_insert(0.0) += amount;
    }

    /// Removes up to `amount`, returning what was actually taken.
    pub fn take(&mut self, compound: Compound, amount: f32) -> f32 {
        let Some(stored) = self.amounts.get_mut(&compound) else {
            return 0.0;
        };

        let taken = amount.max(0.0).min(*stored);
        *stored -= taken;

        if *stored <= 0.0 {
            self.amounts.remove(&compound);
        }

        taken
    }

    /// Moves everything into `target`, leaving this bag empty
    pub fn drain_into(&mut self, target: &mut CompoundBag) {
        for (compound, amount) in std::mem::take(&mut self.amounts) {
            target.add(compound, amount);
        }
    }

    pub fn clear(&mut self) {
        self.amounts.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.amounts.is_empty()
    }

    pub fn total(&self) -> f32 {
        self.amounts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Compound, f32)> + '_ {
        self.amounts.iter().map(|(c, a)| (*c, *a))
    }
}

impl FromIterator<(Compound, f32)> for CompoundBag {
    fn from_iter<I: IntoIterator<Item = (Compound, f32)>>(iter: I) -> Self {
        let mut bag = Self::new();
        for (compound, amount) in iter {
            bag.add(compound, amount);
        }
        bag
    }
}
