//! Gameplay constants - stage thresholds, starting compounds, organelle keys.
//!
//! Plain values with no registry dependency. The session, the editor and the
//! simtest harness all use these.

/// Brain power at which a macroscopic species becomes aware
pub const BRAIN_POWER_REQUIRED_FOR_AWARE: f32 = 0.5;

/// Brain power at which a macroscopic species becomes awakened
pub const BRAIN_POWER_REQUIRED_FOR_AWAKENING: f32 = 5.0;

pub mod initial_compounds {
    pub const ATP: f32 = 180.0;
    pub const GLUCOSE: f32 = 90.0;
    pub const IRON: f32 = 90.0;
    pub const HYDROGEN_SULFIDE: f32 = 90.0;
}

/// Registry keys consulted when picking starting compounds
pub mod organelle_keys {
    pub const RUSTICYANIN: &str = "rusticyanin";
    pub const CHEMOPLAST: &str = "chemoplast";
    pub const CHEMOSYNTHESIZING_PROTEINS: &str = "chemoSynthesizingProteins";
}

/// Seconds the chunk damage warning stays up before closing itself
pub const CHUNK_DAMAGE_WARNING_DURATION: f32 = 8.0;

/// Glucose the player must collect to finish the glucose tutorial
pub const GLUCOSE_TUTORIAL_COLLECT_THRESHOLD: f32 = 1.0;
