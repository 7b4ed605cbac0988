//! Specialty procedures catalog.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Mapping from specialty group to the procedure names it allows.
///
/// Owned by the remote store; the core only consumes it to validate and
/// populate procedure entries. Specialties absent from the catalog accept
/// free-text procedure names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpecialtyCatalog {
    groups: HashMap<String, Vec<String>>,
}

impl SpecialtyCatalog {
    /// Build a catalog, normalizing the specialty keys.
    pub fn new(groups: HashMap<String, Vec<String>>) -> Self {
        let groups = groups
            .into_iter()
            .map(|(key, procs)| (normalize_specialty(&key), procs))
            .collect();
        Self { groups }
    }

    /// Allowed procedure names for a specialty, if it is catalogued.
    pub fn allowed_for(&self, specialty: &str) -> Option<&[String]> {
        self.groups
            .get(&normalize_specialty(specialty))
            .map(Vec::as_slice)
    }

    /// Whether a procedure name is acceptable under a specialty. Uncatalogued
    /// specialties accept anything.
    pub fn is_allowed(&self, specialty: &str, procedure: &str) -> bool {
        match self.allowed_for(specialty) {
            Some(allowed) => allowed.iter().any(|name| name == procedure),
            None => true,
        }
    }
}

/// Normalize a specialty key: uppercase, accents folded, plural `LASERS`
/// collapsed onto `LASER`.
pub fn normalize_specialty(raw: &str) -> String {
    let folded: String = raw
        .trim()
        .to_uppercase()
        .chars()
        .map(|c| match c {
            'Ç' => 'C',
            'Ã' | 'Á' | 'Â' => 'A',
            'Õ' | 'Ó' => 'O',
            'É' | 'Ê' => 'E',
            'Í' => 'I',
            'Ú' => 'U',
            other => other,
        })
        .collect();

    if folded == "LASERS" {
        "LASER".to_string()
    } else {
        folded
    }
}
