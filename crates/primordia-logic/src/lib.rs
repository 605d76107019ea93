//! Pure gameplay data for Primordia.
//!
//! This crate holds the species and body data model and the small pieces of
//! gameplay logic built on it. Nothing here knows about the ECS, rendering
//! or physics; functions take plain data plus the definition registry and
//! return results, so everything is unit-testable on its own.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`cell_type`] | Organelle compositions and tissue classification |
//! | [`chunk`] | Spawnable chunk descriptions with structural equality |
//! | [`compounds`] | Compound kinds and compound storage |
//! | [`constants`] | Stage thresholds, starting compounds, organelle keys |
//! | [`geometry`] | `Vec3` and hex coordinates |
//! | [`macroscopic`] | Metaball-bodied species, brain/muscle power, stage tiers |
//! | [`metaball`] | Metaball trees, depth ordering, clone-with-remap |
//! | [`microbe`] | Single-celled species |
//! | [`registry`] | Organelle definitions looked up by key |
//! | [`species`] | Shared species data and the tagged species variant |
//! | [`tutorial`] | Event-driven tutorial phase state machines |

pub mod cell_type;
pub mod chunk;
pub mod compounds;
pub mod constants;
pub mod geometry;
pub mod macroscopic;
pub mod metaball;
pub mod microbe;
pub mod registry;
pub mod species;
pub mod tutorial;
