//! Primordia Headless Harness
//!
//! Validates definitions, species logic and a short game session.
//! Runs entirely in-process, no rendering and no physics.
//!
//! Usage:
//!   cargo run -p primordia-simtest
//!   cargo run -p primordia-simtest -- --verbose

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use primordia_core::generation::{generate_macroscopic_species, propose_mutation};
use primordia_core::persistence::{read_species_document, write_species_document};
use primordia_core::prelude::*;
use primordia_logic::cell_type::OrganelleTemplate;
use primordia_logic::chunk::{load_chunk_configurations, ChunkConfiguration};
use primordia_logic::constants::organelle_keys;
use primordia_logic::geometry::{Hex, Vec3};
use primordia_logic::macroscopic::{MacroscopicSpecies, MacroscopicType};
use primordia_logic::registry::{OrganelleFeature, SimulationParameters};
use primordia_logic::species::{Species, SpeciesBehaviour};
use primordia_logic::tutorial::{TutorialEvent, TutorialPhase, TutorialState};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;

// ── Definitions (same JSON the session loads) ──────────────────────────
const ORGANELLES_JSON: &str = include_str!("../../../data/organelles.json");
const CHUNKS_JSON: &str = include_str!("../../../data/chunks.json");

/// Just the fields the raw cross-check needs
#[derive(Debug, Deserialize)]
struct RawChunk {
    name: String,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    println!("=== Primordia Harness ===\n");

    let mut results = Vec::new();

    // 1. Definition files
    let (params, chunks) = match load_definitions(&mut results) {
        Some(loaded) => loaded,
        None => {
            report(&results, verbose);
            std::process::exit(1);
        }
    };
    results.extend(validate_definitions(&params, &chunks, verbose));

    // 2. Chunk equality and hashing
    results.extend(validate_chunk_semantics(&chunks, verbose));

    // 3. Brain power and stage tiers
    results.extend(validate_power_and_tiers(&params, verbose));

    // 4. Mutation depth ordering
    results.extend(validate_mutation(&params, verbose));

    // 5. Tutorial event sequence
    results.extend(validate_tutorial(verbose));

    // 6. Species document round trip
    results.extend(validate_species_documents(&params, verbose));

    // 7. Short session run
    results.extend(validate_session(&params, &chunks, verbose));

    if !report(&results, verbose) {
        std::process::exit(1);
    }
}

/// Prints the summary. Returns true when everything passed.
fn report(results: &[TestResult], verbose: bool) -> bool {
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );
    failed == 0
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

// ── 1. Definitions ──────────────────────────────────────────────────────

fn load_definitions(
    results: &mut Vec<TestResult>,
) -> Option<(SimulationParameters, Vec<ChunkConfiguration>)> {
    println!("--- Definitions ---");

    let params = match SimulationParameters::from_json(ORGANELLES_JSON) {
        Ok(p) => p,
        Err(e) => {
            results.push(check("organelles_parse", false, format!("{}", e)));
            return None;
        }
    };
    let chunks = match load_chunk_configurations(CHUNKS_JSON) {
        Ok(c) => c,
        Err(e) => {
            results.push(check("chunks_parse", false, format!("{}", e)));
            return None;
        }
    };

    results.push(check(
        "definitions_parse",
        true,
        format!(
            "{} organelles, {} chunk types",
            params.organelle_count(),
            chunks.len()
        ),
    ));
    Some((params, chunks))
}

fn validate_definitions(
    params: &SimulationParameters,
    chunks: &[ChunkConfiguration],
    verbose: bool,
) -> Vec<TestResult> {
    let mut results = Vec::new();

    // Keys the starting compound classifier looks up
    let required = [
        "cytoplasm",
        organelle_keys::RUSTICYANIN,
        organelle_keys::CHEMOPLAST,
        organelle_keys::CHEMOSYNTHESIZING_PROTEINS,
    ];
    let missing: Vec<&str> = required
        .iter()
        .copied()
        .filter(|key| params.organelle(key).is_err())
        .collect();
    results.push(check(
        "organelles_required_keys",
        missing.is_empty(),
        if missing.is_empty() {
            "classifier keys present".to_string()
        } else {
            format!("missing: {}", missing.join(", "))
        },
    ));

    let bad_hexes: Vec<&str> = params
        .organelles()
        .filter(|o| o.hexes == 0)
        .map(|o| o.internal_name.as_str())
        .collect();
    results.push(check(
        "organelles_positive_hexes",
        bad_hexes.is_empty(),
        format!("{} organelles with zero hexes", bad_hexes.len()),
    ));

    let brain = params.organelles_with_feature(OrganelleFeature::Axon).len();
    let muscle = params.organelles_with_feature(OrganelleFeature::Myofibril).len();
    results.push(check(
        "organelles_tissue_features",
        brain > 0 && muscle > 0,
        format!("axon={} myofibril={}", brain, muscle),
    ));

    // Typed loading keeps every entry of the raw file
    let raw: Vec<RawChunk> = serde_json::from_str(CHUNKS_JSON).unwrap_or_default();
    let raw_names: HashSet<&str> = raw.iter().map(|c| c.name.as_str()).collect();
    let typed_names: HashSet<&str> = chunks.iter().map(|c| c.name.as_str()).collect();
    results.push(check(
        "chunks_match_raw_file",
        raw_names == typed_names,
        format!("{} raw, {} typed", raw_names.len(), typed_names.len()),
    ));

    let spawnable = chunks
        .iter()
        .filter(|c| !c.easter_egg && c.density > 0.0)
        .count();
    results.push(check(
        "chunks_spawnable",
        spawnable > 0,
        format!("{} of {} chunk types spawn naturally", spawnable, chunks.len()),
    ));

    let bad_damage: Vec<&str> = chunks
        .iter()
        .filter(|c| c.is_damaging() && c.damage_type.is_empty())
        .map(|c| c.name.as_str())
        .collect();
    results.push(check(
        "chunks_damage_types",
        bad_damage.is_empty(),
        if bad_damage.is_empty() {
            "every damaging chunk names its damage type".to_string()
        } else {
            format!("no damage type: {}", bad_damage.join(", "))
        },
    ));

    if verbose {
        println!("  Chunk types:");
        for chunk in chunks {
            println!(
                "    {:22} density={:<8} vent={:<4} damages={:<4} easter_egg={}",
                chunk.name, chunk.density, chunk.vent_amount, chunk.damages, chunk.easter_egg
            );
        }
    }

    results
}

// ── 2. Chunk Semantics ──────────────────────────────────────────────────

fn hash_of(chunk: &ChunkConfiguration) -> u64 {
    let mut hasher = DefaultHasher::new();
    chunk.hash(&mut hasher);
    hasher.finish()
}

fn validate_chunk_semantics(chunks: &[ChunkConfiguration], _verbose: bool) -> Vec<TestResult> {
    println!("--- Chunk Equality & Hashing ---");
    let mut results = Vec::new();

    let reflexive = chunks.iter().all(|c| c == &c.clone());
    results.push(check(
        "chunk_clone_equal",
        reflexive,
        "every configuration equals its clone",
    ));

    let consistent = chunks.iter().all(|c| hash_of(c) == hash_of(&c.clone()));
    results.push(check(
        "chunk_hash_consistent",
        consistent,
        "equal configurations hash equally",
    ));

    // Hash covers the name only; equality covers everything
    if let Some(first) = chunks.first() {
        let mut denser = first.clone();
        denser.density *= 2.0;
        results.push(check(
            "chunk_eq_structural",
            denser != *first && hash_of(&denser) == hash_of(first),
            "changing density breaks equality but keeps the hash",
        ));

        let mut remeshed = first.clone();
        remeshed.meshes.push(primordia_logic::chunk::ChunkScene::new("extra.tscn"));
        results.push(check(
            "chunk_eq_meshes",
            remeshed != *first,
            "meshes compared by value",
        ));
    }

    let set: HashSet<&ChunkConfiguration> = chunks.iter().collect();
    results.push(check(
        "chunk_hash_set",
        set.len() == chunks.len(),
        format!("{} distinct configurations in a hash set", set.len()),
    ));

    results
}

// ── 3. Power & Tiers ────────────────────────────────────────────────────

fn brain_creature(size: f32) -> MacroscopicSpecies {
    let mut species = MacroscopicSpecies::new(0, "Harness", "cerebrum");
    let brain = species.add_cell_type(
        "brain",
        vec![OrganelleTemplate::new("axon", Hex::new(0, 0), 0)],
    );
    let body = species.add_cell_type(
        "body",
        vec![OrganelleTemplate::new("cytoplasm", Hex::new(0, 0), 0)],
    );
    if let Ok(root) = species.add_metaball(Vec3::new(0.0, 1.0, 0.0), 1.0, None, body) {
        let _ = species.add_metaball(Vec3::new(0.0, 2.0, 0.0), size, Some(root), brain);
    }
    species
}

fn validate_power_and_tiers(params: &SimulationParameters, verbose: bool) -> Vec<TestResult> {
    println!("--- Brain Power & Tiers ---");
    let mut results = Vec::new();

    let boundaries = [
        (0.0, MacroscopicType::Macroscopic),
        (0.49, MacroscopicType::Macroscopic),
        (0.5, MacroscopicType::Aware),
        (4.99, MacroscopicType::Aware),
        (5.0, MacroscopicType::Awakened),
        (100.0, MacroscopicType::Awakened),
    ];
    let wrong: Vec<String> = boundaries
        .iter()
        .filter(|(power, tier)| MacroscopicType::from_brain_power(*power) != *tier)
        .map(|(power, tier)| format!("{} should be {:?}", power, tier))
        .collect();
    results.push(check(
        "tier_thresholds",
        wrong.is_empty(),
        if wrong.is_empty() {
            "threshold boundaries map to the right tier".to_string()
        } else {
            wrong.join("; ")
        },
    ));

    // Growing the brain never lowers the tier
    let mut previous = MacroscopicType::Macroscopic;
    let mut monotonic = true;
    let mut muscle_free = true;
    for step in 1..=30 {
        let size = step as f32 * 0.1;
        let mut species = brain_creature(size);
        if species.on_edited(params).is_err() {
            monotonic = false;
            break;
        }
        if verbose && step % 5 == 0 {
            println!(
                "  brain size {:.1}: power {:.3} → {:?}",
                size,
                species.brain_power(),
                species.macroscopic_type()
            );
        }
        monotonic &= species.macroscopic_type() >= previous;
        muscle_free &= species.muscular_power() == 0.0;
        previous = species.macroscopic_type();
    }
    results.push(check(
        "tier_monotonic_in_brain_size",
        monotonic && previous == MacroscopicType::Awakened,
        format!("largest brain reaches {:?}", previous),
    ));
    results.push(check(
        "muscle_power_needs_myofibril",
        muscle_free,
        "no myofibril tissue, no muscular power",
    ));

    // Scale applies to every metaball
    let mut small = brain_creature(1.0);
    let mut big = brain_creature(1.0);
    big.scale = 2.0;
    let scaled = small.on_edited(params).is_ok()
        && big.on_edited(params).is_ok()
        && (big.brain_power() - small.brain_power() * 8.0).abs() < 0.001;
    results.push(check(
        "power_scales_with_volume",
        scaled,
        format!(
            "scale 1: {:.3}, scale 2: {:.3}",
            small.brain_power(),
            big.brain_power()
        ),
    ));

    results
}

// ── 4. Mutation ─────────────────────────────────────────────────────────

fn validate_mutation(params: &SimulationParameters, verbose: bool) -> Vec<TestResult> {
    println!("--- Mutation ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(7);
    let mut registry = SpeciesRegistry::new();

    let source = match generate_macroscopic_species(0, params, &mut rng) {
        Ok(species) => species,
        Err(e) => {
            results.push(check("mutation_source", false, format!("{}", e)));
            return results;
        }
    };
    let _ = registry.insert(source.into());

    let mut lineage = 0;
    let mut failures = Vec::new();
    let mut max_len = 0;
    for generation in 0..25 {
        let branch = match registry.branch_for_auto_evo(lineage) {
            Ok(id) => id,
            Err(e) => {
                failures.push(format!("gen {}: {}", generation, e));
                break;
            }
        };
        let Some(candidate) = registry.get(branch).map(|s| propose_mutation(s, &mut rng)) else {
            break;
        };
        if let Err(e) = registry.apply_mutation(branch, &candidate, params) {
            failures.push(format!("gen {}: {}", generation, e));
            break;
        }

        if let Some(species) = registry.get(branch).and_then(Species::as_macroscopic) {
            let layout = species.body_layout();
            max_len = max_len.max(layout.len());
            if let Err(e) = species.validate() {
                failures.push(format!("gen {}: {}", generation, e));
            }
            // Every parent sits shallower than its child
            if let Ok(depths) = layout.tree_depths() {
                let ordered = layout.iter().all(|m| match m.parent {
                    Some(parent) => depths.get(&parent) < depths.get(&m.id),
                    None => true,
                });
                if !ordered {
                    failures.push(format!("gen {}: parent deeper than child", generation));
                }
            }
        }
        lineage = branch;
    }

    results.push(check(
        "mutation_lineage_valid",
        failures.is_empty(),
        if failures.is_empty() {
            format!("25 generations, up to {} metaballs", max_len)
        } else {
            failures.join("; ")
        },
    ));

    let untouched = registry
        .get(0)
        .map(|s| s.core().generation == 1)
        .unwrap_or(false);
    results.push(check(
        "mutation_original_untouched",
        untouched,
        "auto-evo branches leave the ancestor alone",
    ));

    if verbose {
        println!("  {} species in the lineage registry", registry.len());
    }

    results
}

// ── 5. Tutorial ─────────────────────────────────────────────────────────

fn validate_tutorial(_verbose: bool) -> Vec<TestResult> {
    println!("--- Tutorial ---");
    let mut results = Vec::new();
    let chunk_at = Some(Vec3::new(3.0, 0.0, 4.0));

    let mut tutorial = TutorialState::new(true);
    tutorial.send_event(&TutorialEvent::ChunksNearPlayer { position: None });
    results.push(check(
        "tutorial_needs_position",
        !tutorial.tutorial_active(),
        "no chunk position, no explanation",
    ));

    tutorial.send_event(&TutorialEvent::ChunksNearPlayer { position: chunk_at });
    results.push(check(
        "tutorial_engulf_shown",
        tutorial.engulfment_explanation.status().shown_currently()
            && tutorial.position_guidance() == chunk_at,
        "explanation shown with guidance",
    ));

    // Another phase cannot open over the active one
    tutorial.send_event(&TutorialEvent::CompoundsNearPlayer { position: chunk_at });
    results.push(check(
        "tutorial_one_phase_at_a_time",
        !tutorial.glucose_collecting.status().has_been_shown(),
        "glucose phase waits",
    ));

    tutorial.send_event(&TutorialEvent::PlayerEngulfing);
    tutorial.send_event(&TutorialEvent::ChunksNearPlayer { position: chunk_at });
    results.push(check(
        "tutorial_engulf_closed_for_good",
        tutorial.engulfment_explanation.status().is_closed(),
        "engulfing closes the explanation and it never reopens",
    ));

    let mut disabled = TutorialState::new(false);
    disabled.send_event(&TutorialEvent::ChunksNearPlayer { position: chunk_at });
    results.push(check(
        "tutorial_disabled",
        !disabled.tutorial_active(),
        "disabled tutorial ignores events",
    ));

    results
}

// ── 6. Species Documents ────────────────────────────────────────────────

fn validate_species_documents(params: &SimulationParameters, _verbose: bool) -> Vec<TestResult> {
    println!("--- Species Documents ---");
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(11);

    let species: Vec<Species> = (0..5)
        .filter_map(|id| generate_macroscopic_species(id, params, &mut rng).ok())
        .map(Species::from)
        .collect();

    let mut document = Vec::new();
    if let Err(e) = write_species_document(&mut document, species.iter()) {
        results.push(check("document_write", false, format!("{}", e)));
        return results;
    }
    results.push(check(
        "document_write",
        true,
        format!("{} species in {} bytes", species.len(), document.len()),
    ));

    let imported = match read_species_document(&document[..], params) {
        Ok(imported) => imported,
        Err(e) => {
            results.push(check("document_read", false, format!("{}", e)));
            return results;
        }
    };

    let same = imported.len() == species.len()
        && species.iter().zip(&imported).all(|(a, b)| {
            match (a.as_macroscopic(), b.as_macroscopic()) {
                (Some(a), Some(b)) => {
                    a.body_layout().structurally_eq(b.body_layout())
                        && a.macroscopic_type() == b.macroscopic_type()
                        && a.core.formatted_name() == b.core.formatted_name()
                }
                _ => false,
            }
        });
    results.push(check(
        "document_round_trip",
        same,
        "layouts, tiers and names survive export and import",
    ));

    results
}

// ── 7. Session ──────────────────────────────────────────────────────────

fn validate_session(
    params: &SimulationParameters,
    chunks: &[ChunkConfiguration],
    verbose: bool,
) -> Vec<TestResult> {
    println!("--- Session ---");
    let mut results = Vec::new();

    let config = SessionConfig {
        chunk_count: 60,
        spawn_half_extent: 20.0,
        ..SessionConfig::default()
    };
    let mut session = GameSession::new(params.clone(), chunks.to_vec(), config);
    if let Err(e) = session.spawn_player() {
        results.push(check("session_player", false, format!("{}", e)));
        return results;
    }
    let spawned = session.spawn_chunks().len();

    // One simulated minute, swimming along the x axis in engulf mode
    let _ = session.set_engulfing(true);
    let mut event_count = 0;
    for frame in 0..3600 {
        let x = -20.0 + frame as f32 * (40.0 / 3600.0);
        let _ = session.move_player(Vec3::new(x, 0.0, 0.0));
        event_count += session.update(1.0 / 60.0).len();
    }

    results.push(check(
        "session_runs",
        (session.elapsed() - 60.0).abs() < 0.01,
        format!("{:.1}s simulated, {} events", session.elapsed(), event_count),
    ));
    results.push(check(
        "session_chunks_consumed",
        session.chunk_count() < spawned,
        format!("{} of {} chunks left", session.chunk_count(), spawned),
    ));
    results.push(check(
        "session_tutorial_progressed",
        session.tutorial.engulfment_explanation.status().has_been_shown(),
        "engulfment explanation was shown",
    ));

    let mut save = Vec::new();
    let reloaded = session.save(&mut save).is_ok() && {
        let mut other = GameSession::new(params.clone(), chunks.to_vec(), SessionConfig::default());
        other.load(&save[..]).is_ok()
            && other.chunk_count() == session.chunk_count()
            && other.tutorial == session.tutorial
            && other.config() == session.config()
    };
    results.push(check(
        "session_save_load",
        reloaded,
        format!("{} byte save", save.len()),
    ));

    if verbose {
        println!(
            "  environment holds {:.2} vented compounds",
            session.environment.total()
        );
    }

    results
}
