//! Tutorial phases driven by gameplay events.
//!
//! Each phase is a small one-way state machine: NotShown → ShownCurrently →
//! Closed. Phases only share the "is any tutorial shown right now" guard;
//! otherwise they react to events independently.

use serde::{Deserialize, Serialize};

use crate::compounds::Compound;
use crate::constants::{CHUNK_DAMAGE_WARNING_DURATION, GLUCOSE_TUTORIAL_COLLECT_THRESHOLD};
use crate::geometry::Vec3;

/// Gameplay notifications with their payloads
#[derive(Debug, Clone, PartialEq)]
pub enum TutorialEvent {
    /// Nearest chunk to the player, if any
    ChunksNearPlayer { position: Option<Vec3> },
    /// Nearest compound cloud to the player, if any
    CompoundsNearPlayer { position: Option<Vec3> },
    PlayerEngulfing,
    PlayerCompoundCollected { compound: Compound, amount: f32 },
    PlayerDamaged { damage_type: String },
    /// Once per frame
    Process { delta: f32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TutorialEventType {
    ChunksNearPlayer,
    CompoundsNearPlayer,
    PlayerEngulfing,
    PlayerCompoundCollected,
    PlayerDamaged,
    Process,
}

impl TutorialEvent {
    pub fn event_type(&self) -> TutorialEventType {
        match self {
            Self::ChunksNearPlayer { .. } => TutorialEventType::ChunksNearPlayer,
            Self::CompoundsNearPlayer { .. } => TutorialEventType::CompoundsNearPlayer,
            Self::PlayerEngulfing => TutorialEventType::PlayerEngulfing,
            Self::PlayerCompoundCollected { .. } => TutorialEventType::PlayerCompoundCollected,
            Self::PlayerDamaged { .. } => TutorialEventType::PlayerDamaged,
            Self::Process { .. } => TutorialEventType::Process,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PhaseState {
    #[default]
    NotShown,
    ShownCurrently,
    /// Terminal
    Closed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseStatus {
    state: PhaseState,
    /// Cleared to keep a phase from ever triggering
    pub can_trigger: bool,
    /// Seconds spent shown
    pub time_shown: f32,
}

impl Default for PhaseStatus {
    fn default() -> Self {
        Self {
            state: PhaseState::NotShown,
            can_trigger: true,
            time_shown: 0.0,
        }
    }
}

impl PhaseStatus {
    pub fn state(&self) -> PhaseState {
        self.state
    }

    pub fn shown_currently(&self) -> bool {
        self.state == PhaseState::ShownCurrently
    }

    pub fn has_been_shown(&self) -> bool {
        self.state != PhaseState::NotShown
    }

    pub fn is_closed(&self) -> bool {
        self.state == PhaseState::Closed
    }

    /// NotShown → ShownCurrently. Returns false if the phase was already
    /// shown once.
    pub fn show(&mut self) -> bool {
        if self.state != PhaseState::NotShown {
            return false;
        }
        self.state = PhaseState::ShownCurrently;
        self.time_shown = 0.0;
        true
    }

    /// ShownCurrently → Closed
    pub fn hide(&mut self) -> bool {
        if self.state != PhaseState::ShownCurrently {
            return false;
        }
        self.state = PhaseState::Closed;
        true
    }
}

/// What a phase may know about the tutorial as a whole
#[derive(Debug, Clone, Copy)]
pub struct TutorialContext {
    pub tutorial_active: bool,
}

pub trait TutorialPhase {
    /// Name the GUI uses to close this phase
    fn closed_by_name(&self) -> &'static str;

    fn status(&self) -> &PhaseStatus;

    fn status_mut(&mut self) -> &mut PhaseStatus;

    /// Reacts to an event. Returns true if the event was consumed.
    fn check_event(&mut self, context: TutorialContext, event: &TutorialEvent) -> bool;

    fn uses_position_guidance(&self) -> bool {
        false
    }

    fn position_guidance(&self) -> Option<Vec3> {
        None
    }
}

/// Points the player at a nearby chunk and closes once they engulf
/// something
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngulfmentExplanation {
    status: PhaseStatus,
    chunk_position: Option<Vec3>,
}

impl TutorialPhase for EngulfmentExplanation {
    fn closed_by_name(&self) -> &'static str {
        "MicrobeEngulfmentExplanation"
    }

    fn status(&self) -> &PhaseStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut PhaseStatus {
        &mut self.status
    }

    fn check_event(&mut self, context: TutorialContext, event: &TutorialEvent) -> bool {
        match event {
            TutorialEvent::ChunksNearPlayer { position } => {
                if !self.status.has_been_shown()
                    && position.is_some()
                    && self.status.can_trigger
                    && !context.tutorial_active
                {
                    self.status.show();
                }

                if self.status.shown_currently() {
                    self.chunk_position = *position;
                    return true;
                }
                false
            }
            TutorialEvent::PlayerEngulfing => {
                if !self.status.shown_currently() {
                    return false;
                }
                self.status.hide();
                true
            }
            _ => false,
        }
    }

    fn uses_position_guidance(&self) -> bool {
        true
    }

    fn position_guidance(&self) -> Option<Vec3> {
        self.chunk_position
    }
}

/// Points at a compound cloud until the player collects some glucose
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlucoseCollecting {
    status: PhaseStatus,
    compound_position: Option<Vec3>,
    collected: f32,
}

impl TutorialPhase for GlucoseCollecting {
    fn closed_by_name(&self) -> &'static str {
        "GlucoseCollecting"
    }

    fn status(&self) -> &PhaseStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut PhaseStatus {
        &mut self.status
    }

    fn check_event(&mut self, context: TutorialContext, event: &TutorialEvent) -> bool {
        match event {
            TutorialEvent::CompoundsNearPlayer { position } => {
                if !self.status.has_been_shown()
                    && position.is_some()
                    && self.status.can_trigger
                    && !context.tutorial_active
                {
                    self.status.show();
                }

                if self.status.shown_currently() {
                    self.compound_position = *position;
                    return true;
                }
                false
            }
            TutorialEvent::PlayerCompoundCollected {
                compound: Compound::Glucose,
                amount,
            } => {
                if !self.status.shown_currently() {
                    return false;
                }
                self.collected += amount;
                if self.collected >= GLUCOSE_TUTORIAL_COLLECT_THRESHOLD {
                    self.status.hide();
                }
                true
            }
            _ => false,
        }
    }

    fn uses_position_guidance(&self) -> bool {
        true
    }

    fn position_guidance(&self) -> Option<Vec3> {
        self.compound_position
    }
}

/// Warns the first time a chunk hurts the player, then closes by itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChunkDamageWarning {
    status: PhaseStatus,
    damage_type: Option<String>,
}

impl ChunkDamageWarning {
    pub fn damage_type(&self) -> Option<&str> {
        self.damage_type.as_deref()
    }
}

impl TutorialPhase for ChunkDamageWarning {
    fn closed_by_name(&self) -> &'static str {
        "ChunkDamageWarning"
    }

    fn status(&self) -> &PhaseStatus {
        &self.status
    }

    fn status_mut(&mut self) -> &mut PhaseStatus {
        &mut self.status
    }

    fn check_event(&mut self, context: TutorialContext, event: &TutorialEvent) -> bool {
        match event {
            TutorialEvent::PlayerDamaged { damage_type } => {
                if self.status.can_trigger
                    && !context.tutorial_active
                    && self.status.show()
                {
                    self.damage_type = Some(damage_type.clone());
                    return true;
                }
                false
            }
            TutorialEvent::Process { delta } => {
                if !self.status.shown_currently() {
                    return false;
                }
                self.status.time_shown += delta;
                if self.status.time_shown >= CHUNK_DAMAGE_WARNING_DURATION {
                    self.status.hide();
                }
                false
            }
            _ => false,
        }
    }
}

const PHASE_COUNT: usize = 3;

/// All tutorial phases of the microbe stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TutorialState {
    pub enabled: bool,
    pub engulfment_explanation: EngulfmentExplanation,
    pub glucose_collecting: GlucoseCollecting,
    pub chunk_damage_warning: ChunkDamageWarning,
}

impl Default for TutorialState {
    fn default() -> Self {
        Self::new(true)
    }
}

impl TutorialState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            engulfment_explanation: EngulfmentExplanation::default(),
            glucose_collecting: GlucoseCollecting::default(),
            chunk_damage_warning: ChunkDamageWarning::default(),
        }
    }

    fn phases(&self) -> [&dyn TutorialPhase; PHASE_COUNT] {
        [
            &self.engulfment_explanation,
            &self.glucose_collecting,
            &self.chunk_damage_warning,
        ]
    }

    fn phases_mut(&mut self) -> [&mut dyn TutorialPhase; PHASE_COUNT] {
        [
            &mut self.engulfment_explanation,
            &mut self.glucose_collecting,
            &mut self.chunk_damage_warning,
        ]
    }

    /// True while any phase is on screen
    pub fn tutorial_active(&self) -> bool {
        self.phases().iter().any(|p| p.status().shown_currently())
    }

    /// Delivers an event to every phase. Returns true if any phase consumed it.
    pub fn send_event(&mut self, event: &TutorialEvent) -> bool {
        if !self.enabled {
            return false;
        }

        let mut handled = false;
        for index in 0..PHASE_COUNT {
            // Re-read each time so a phase opened earlier in this loop
            // blocks the later ones
            let context = TutorialContext {
                tutorial_active: self.tutorial_active(),
            };
            let Some(phase) = self.phases_mut().into_iter().nth(index) else {
                break;
            };
            let was_shown = phase.status().shown_currently();

            if phase.check_event(context, event) {
                handled = true;
            }

            let now_shown = phase.status().shown_currently();
            if was_shown != now_shown {
                log::debug!(
                    "Tutorial {} {}",
                    phase.closed_by_name(),
                    if now_shown { "shown" } else { "closed" }
                );
            }
        }
        handled
    }

    /// Closes the phase the GUI identifies by name
    pub fn close_by_name(&mut self, name: &str) -> bool {
        self.phases_mut()
            .into_iter()
            .find(|p| p.closed_by_name() == name)
            .map(|p| p.status_mut().hide())
            .unwrap_or(false)
    }

    /// Where the active phase wants the player to go
    pub fn position_guidance(&self) -> Option<Vec3> {
        self.phases()
            .into_iter()
            .filter(|p| p.uses_position_guidance() && p.status().shown_currently())
            .find_map(|p| p.position_guidance())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idle() -> TutorialContext {
        TutorialContext {
            tutorial_active: false,
        }
    }

    #[test]
    fn test_status_is_one_way() {
        let mut status = PhaseStatus::default();
        assert!(!status.hide());
        assert!(status.show());
        assert!(!status.show());
        assert!(status.hide());
        assert!(status.is_closed());
        assert!(!status.show());
        assert!(status.has_been_shown());
    }

    #[test]
    fn test_engulfment_sequence() {
        let p = Vec3::new(4.0, 0.0, -2.0);
        let mut phase = EngulfmentExplanation::default();

        assert!(phase.check_event(idle(), &TutorialEvent::ChunksNearPlayer { position: Some(p) }));
        assert!(phase.status().shown_currently());
        assert_eq!(phase.position_guidance(), Some(p));

        assert!(phase.check_event(idle(), &TutorialEvent::PlayerEngulfing));
        assert!(phase.status().is_closed());

        // Never re-opens
        assert!(!phase.check_event(idle(), &TutorialEvent::ChunksNearPlayer { position: Some(p) }));
        assert!(phase.status().is_closed());
    }

    #[test]
    fn test_engulfment_needs_position() {
        let mut phase = EngulfmentExplanation::default();
        assert!(!phase.check_event(idle(), &TutorialEvent::ChunksNearPlayer { position: None }));
        assert_eq!(phase.status().state(), PhaseState::NotShown);
    }

    #[test]
    fn test_engulfment_blocked_by_other_tutorial() {
        let mut phase = EngulfmentExplanation::default();
        let busy = TutorialContext {
            tutorial_active: true,
        };
        phase.check_event(
            busy,
            &TutorialEvent::ChunksNearPlayer {
                position: Some(Vec3::ZERO),
            },
        );
        assert!(!phase.status().has_been_shown());
    }

    #[test]
    fn test_engulfing_before_shown_is_ignored() {
        let mut phase = EngulfmentExplanation::default();
        assert!(!phase.check_event(idle(), &TutorialEvent::PlayerEngulfing));
        assert_eq!(phase.status().state(), PhaseState::NotShown);
    }

    #[test]
    fn test_engulfment_tracks_latest_position() {
        let mut phase = EngulfmentExplanation::default();
        let first = Vec3::new(1.0, 0.0, 0.0);
        let second = Vec3::new(2.0, 0.0, 0.0);
        phase.check_event(idle(), &TutorialEvent::ChunksNearPlayer { position: Some(first) });
        phase.check_event(idle(), &TutorialEvent::ChunksNearPlayer { position: Some(second) });
        assert_eq!(phase.position_guidance(), Some(second));
    }

    #[test]
    fn test_glucose_collecting_closes_on_glucose_only() {
        let mut phase = GlucoseCollecting::default();
        phase.check_event(
            idle(),
            &TutorialEvent::CompoundsNearPlayer {
                position: Some(Vec3::ZERO),
            },
        );
        assert!(!phase.check_event(
            idle(),
            &TutorialEvent::PlayerCompoundCollected {
                compound: Compound::Iron,
                amount: 10.0
            }
        ));
        assert!(phase.status().shown_currently());

        phase.check_event(
            idle(),
            &TutorialEvent::PlayerCompoundCollected {
                compound: Compound::Glucose,
                amount: 2.0,
            },
        );
        assert!(phase.status().is_closed());
    }

    #[test]
    fn test_damage_warning_times_out() {
        let mut phase = ChunkDamageWarning::default();
        assert!(phase.check_event(
            idle(),
            &TutorialEvent::PlayerDamaged {
                damage_type: "toxin".into()
            }
        ));
        assert_eq!(phase.damage_type(), Some("toxin"));

        phase.check_event(idle(), &TutorialEvent::Process { delta: 5.0 });
        assert!(phase.status().shown_currently());
        phase.check_event(idle(), &TutorialEvent::Process { delta: 5.0 });
        assert!(phase.status().is_closed());
    }

    #[test]
    fn test_state_sequence_and_guidance() {
        let p = Vec3::new(10.0, 0.0, 3.0);
        let mut state = TutorialState::default();

        assert!(state.send_event(&TutorialEvent::ChunksNearPlayer { position: Some(p) }));
        assert!(state.tutorial_active());
        assert_eq!(state.position_guidance(), Some(p));

        // Blocked while the engulfment explanation is up
        state.send_event(&TutorialEvent::CompoundsNearPlayer {
            position: Some(Vec3::ZERO),
        });
        assert!(!state.glucose_collecting.status().has_been_shown());

        assert!(state.send_event(&TutorialEvent::PlayerEngulfing));
        assert!(!state.tutorial_active());
        assert_eq!(state.position_guidance(), None);

        state.send_event(&TutorialEvent::ChunksNearPlayer { position: Some(p) });
        assert!(state.engulfment_explanation.status().is_closed());
        assert!(!state.tutorial_active());
    }

    #[test]
    fn test_only_one_phase_opens_per_event_burst() {
        let mut state = TutorialState::default();
        state.send_event(&TutorialEvent::PlayerDamaged {
            damage_type: "toxin".into(),
        });
        state.send_event(&TutorialEvent::ChunksNearPlayer {
            position: Some(Vec3::ZERO),
        });
        assert!(state.chunk_damage_warning.status().shown_currently());
        assert!(!state.engulfment_explanation.status().has_been_shown());
    }

    #[test]
    fn test_disabled_state_ignores_events() {
        let mut state = TutorialState::new(false);
        assert!(!state.send_event(&TutorialEvent::ChunksNearPlayer {
            position: Some(Vec3::ZERO)
        }));
        assert!(!state.tutorial_active());
    }

    #[test]
    fn test_close_by_name() {
        let mut state = TutorialState::default();
        state.send_event(&TutorialEvent::ChunksNearPlayer {
            position: Some(Vec3::ZERO),
        });
        assert!(!state.close_by_name("NoSuchTutorial"));
        assert!(state.close_by_name("MicrobeEngulfmentExplanation"));
        assert!(state.engulfment_explanation.status().is_closed());
    }
}
