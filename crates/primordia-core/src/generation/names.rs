//! Binomial name generation

use rand::Rng;

/// Generate a random genus and epithet
pub fn generate_species_name(rng: &mut impl Rng) -> (String, String) {
    let genus = format!(
        "{}{}",
        GENUS_PREFIXES[rng.gen_range(0..GENUS_PREFIXES.len())],
        GENUS_SUFFIXES[rng.gen_range(0..GENUS_SUFFIXES.len())]
    );
    let epithet = EPITHETS[rng.gen_range(0..EPITHETS.len())].to_string();
    (genus, epithet)
}

static GENUS_PREFIXES: &[&str] = &[
    "Prim", "Proto", "Micro", "Macro", "Cyano", "Chloro", "Ferro", "Thermo", "Halo", "Neo",
    "Pseudo", "Para", "Endo", "Xeno", "Lepto", "Megalo", "Brachy", "Dolicho", "Cerato", "Rhizo",
];

static GENUS_SUFFIXES: &[&str] = &[
    "bacter", "coccus", "monas", "phyta", "zoon", "cystis", "soma", "derma", "pus", "gnathus",
    "morpha", "cephalus", "podus", "saurus", "spira",
];

static EPITHETS: &[&str] = &[
    "primus", "vulgaris", "minor", "major", "ferrous", "oceanicus", "profundus", "rapidus",
    "lentus", "gigas", "minimus", "aureus", "ruber", "viridis", "caeruleus", "sulfuris",
    "terrestris", "aquaticus", "cerebralis", "robustus",
];
