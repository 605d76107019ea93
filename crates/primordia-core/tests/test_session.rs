//! Integration tests for a full game session.
//!
//! Exercises: definitions → player spawn → chunk contact and venting
//! → tutorial phases → save/load → species documents

use primordia_core::prelude::*;
use primordia_logic::compounds::Compound;
use primordia_logic::geometry::Vec3;
use primordia_logic::species::SpeciesBehaviour;
use primordia_logic::tutorial::{TutorialEvent, TutorialPhase};

// ── Helpers ────────────────────────────────────────────────────────────

fn new_session() -> GameSession {
    GameSession::from_json(
        include_str!("../../../data/organelles.json"),
        include_str!("../../../data/chunks.json"),
        SessionConfig::default(),
    )
    .unwrap()
}

fn place_chunk(session: &mut GameSession, name: &str, at: Vec3) {
    let configuration = session
        .chunks
        .iter()
        .find(|c| c.name == name)
        .cloned()
        .unwrap();
    session
        .world
        .spawn((Position(at), FloatingChunk::from_configuration(&configuration)));
}

fn player_health(session: &GameSession) -> f32 {
    let player = session.player().unwrap();
    session.world.get::<&Health>(player).unwrap().current
}

fn player_compound(session: &GameSession, compound: Compound) -> f32 {
    let player = session.player().unwrap();
    session.world.get::<&CompoundStorage>(player).unwrap().get(compound)
}

// ── Tutorial flow ──────────────────────────────────────────────────────

#[test]
fn microbe_tutorial_runs_in_order() {
    let mut session = new_session();
    session.spawn_player().unwrap();

    // A snow flake just out of reach opens the engulfment explanation
    place_chunk(&mut session, "Marine Snow", Vec3::new(4.0, 0.0, 0.0));
    session.update(0.1);
    assert!(session.tutorial.engulfment_explanation.status().shown_currently());
    assert!(!session.tutorial.glucose_collecting.status().has_been_shown());
    assert_eq!(
        session.tutorial.position_guidance(),
        Some(Vec3::new(4.0, 0.0, 0.0))
    );

    // Engulfing it closes the explanation
    session.set_engulfing(true).unwrap();
    session.move_player(Vec3::new(4.0, 0.0, 0.0)).unwrap();
    let events = session.update(0.1);
    assert!(events.contains(&TutorialEvent::PlayerEngulfing));
    assert!(session.tutorial.engulfment_explanation.status().is_closed());
    assert_eq!(session.chunk_count(), 0);

    // A venting chunk nearby starts the glucose tutorial
    session.set_engulfing(false).unwrap();
    place_chunk(&mut session, "Marine Snow", Vec3::new(8.0, 0.0, 0.0));
    let glucose_before = player_compound(&session, Compound::Glucose);
    session.update(0.5);
    assert!(session.tutorial.glucose_collecting.status().shown_currently());

    for _ in 0..20 {
        if session.tutorial.glucose_collecting.status().is_closed() {
            break;
        }
        session.update(0.5);
    }
    assert!(session.tutorial.glucose_collecting.status().is_closed());
    assert!(player_compound(&session, Compound::Glucose) > glucose_before);

    // A toxin blob hurts once, vanishes and raises the damage warning
    let health_before = player_health(&session);
    let position = session
        .world
        .get::<&Position>(session.player().unwrap())
        .unwrap()
        .0;
    place_chunk(&mut session, "Toxin Blob", position);
    session.update(0.1);
    assert_eq!(player_health(&session), health_before - 15.0);
    assert!(session.tutorial.chunk_damage_warning.status().shown_currently());
    assert_eq!(
        session.tutorial.chunk_damage_warning.damage_type(),
        Some("oxytoxy")
    );

    // The warning closes itself after a while
    for _ in 0..10 {
        session.update(1.0);
    }
    assert!(session.tutorial.chunk_damage_warning.status().is_closed());
    assert!(!session.tutorial.tutorial_active());
}

#[test]
fn disabled_tutorial_stays_closed() {
    let config = SessionConfig {
        tutorial_enabled: false,
        ..SessionConfig::default()
    };
    let mut session = GameSession::from_json(
        include_str!("../../../data/organelles.json"),
        include_str!("../../../data/chunks.json"),
        config,
    )
    .unwrap();
    session.spawn_player().unwrap();
    place_chunk(&mut session, "Small Iron Chunk", Vec3::new(5.0, 0.0, 0.0));

    let events = session.update(0.1);

    assert!(!events.is_empty());
    assert!(!session.tutorial.tutorial_active());
    assert!(!session
        .tutorial
        .engulfment_explanation
        .status()
        .has_been_shown());
}

// ── Persistence ────────────────────────────────────────────────────────

#[test]
fn save_and_resume_mid_tutorial() {
    let mut session = new_session();
    session.spawn_player().unwrap();
    place_chunk(&mut session, "Small Iron Chunk", Vec3::new(6.0, 0.0, 0.0));
    session.update(0.1);
    assert!(session.tutorial.engulfment_explanation.status().shown_currently());

    let mut save = Vec::new();
    session.save(&mut save).unwrap();

    let mut resumed = new_session();
    resumed.load(&save[..]).unwrap();
    assert!(resumed.tutorial.engulfment_explanation.status().shown_currently());

    // Engulfing after the reload still closes the phase
    resumed.set_engulfing(true).unwrap();
    resumed.move_player(Vec3::new(6.0, 0.0, 0.0)).unwrap();
    resumed.update(0.1);
    assert!(resumed.tutorial.engulfment_explanation.status().is_closed());
    assert!(player_compound(&resumed, Compound::Iron) > 0.0);
}

#[test]
fn evolved_species_survive_a_document_round_trip() {
    let mut session = new_session();
    session.spawn_player().unwrap();
    let ancestor = session.generate_species().unwrap();
    let mut lineage = ancestor;
    for _ in 0..5 {
        lineage = session.auto_evo_step(lineage).unwrap();
    }
    assert_eq!(
        session.species.get(lineage).unwrap().core().generation,
        session.species.get(ancestor).unwrap().core().generation + 5
    );

    let mut document = Vec::new();
    session.export_species(&mut document).unwrap();

    let mut other = new_session();
    let ids = other.import_species(&document[..]).unwrap();
    assert_eq!(ids.len(), session.species.len());

    for id in ids {
        let exported = session.species.get(id).unwrap();
        let imported = other.species.get(id).unwrap();
        assert_eq!(imported.formatted_name(), exported.formatted_name());
        if let (Some(a), Some(b)) = (exported.as_macroscopic(), imported.as_macroscopic()) {
            assert!(a.body_layout().structurally_eq(b.body_layout()));
            assert_eq!(a.macroscopic_type(), b.macroscopic_type());
        }
    }
    assert!(other.species.player_species().is_some());
}
