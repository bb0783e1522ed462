//! Brazilian federative units: full name → two-letter abbreviation.

use crate::text::fold_key;

/// Folded state name (and common English/Portuguese variants) → UF.
const STATES: &[(&str, &str)] = &[
    ("acre", "AC"),
    ("alagoas", "AL"),
    ("amapa", "AP"),
    ("amazonas", "AM"),
    ("bahia", "BA"),
    ("ceara", "CE"),
    ("distrito federal", "DF"),
    ("federal district", "DF"),
    ("espirito santo", "ES"),
    ("goias", "GO"),
    ("maranhao", "MA"),
    ("mato grosso", "MT"),
    ("mato grosso do sul", "MS"),
    ("minas gerais", "MG"),
    ("para", "PA"),
    ("paraiba", "PB"),
    ("parana", "PR"),
    ("pernambuco", "PE"),
    ("piaui", "PI"),
    ("rio de janeiro", "RJ"),
    ("rio grande do norte", "RN"),
    ("rio grande do sul", "RS"),
    ("rondonia", "RO"),
    ("roraima", "RR"),
    ("santa catarina", "SC"),
    ("sao paulo", "SP"),
    ("sergipe", "SE"),
    ("tocantins", "TO"),
];

const PREFIXES: &[&str] = &["state of ", "estado de ", "estado do ", "estado da "];

/// Abbreviation for a full state name, if it is one.
pub fn abbreviation_for(state: &str) -> Option<&'static str> {
    let folded = fold_key(state.trim());
    let name = PREFIXES
        .iter()
        .find_map(|p| folded.strip_prefix(p))
        .unwrap_or(folded.as_str());

    STATES
        .iter()
        .find(|(full, _)| *full == name)
        .map(|(_, uf)| *uf)
        .or_else(|| STATES.iter().find(|(_, uf)| uf.eq_ignore_ascii_case(name)).map(|(_, uf)| *uf))
}

/// Table abbreviation, falling back to the raw (trimmed) state string.
pub fn derive_abbreviation(state: &str) -> String {
    abbreviation_for(state)
        .map(str::to_string)
        .unwrap_or_else(|| state.trim().to_string())
}
