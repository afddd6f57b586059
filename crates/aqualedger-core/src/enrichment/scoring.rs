//! Offline sustainability heuristic.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SustainabilityReport {
    /// 0 (harmful or illegal) to 100 (fully sustainable)
    pub score: u8,
    /// Possible regulatory concern
    pub warning: bool,
    pub rationale: String,
}

const RULES: &[(&str, u8, &str)] = &[
    (
        "tuna",
        45,
        "Tuna populations are generally overfished. Verify species (Yellowfin/Bluefin) for accurate score.",
    ),
    (
        "mackerel",
        85,
        "Mackerel is typically a fast-growing, sustainable choice.",
    ),
    (
        "tilapia",
        75,
        "Tilapia is often farmed sustainably, but wild stocks vary.",
    ),
];

const DEFAULT_SCORE: u8 = 60;
const DEFAULT_RATIONALE: &str = "Species data not locally available. Pending full AI analysis.";

/// Score a species from a small built-in table; never raises a warning.
pub fn local_sustainability(species: &str) -> SustainabilityReport {
    let species = species.to_lowercase();
    let (score, rationale) = RULES
        .iter()
        .find(|(keyword, _, _)| species.contains(keyword))
        .map_or((DEFAULT_SCORE, DEFAULT_RATIONALE), |(_, score, rationale)| {
            (*score, *rationale)
        });

    SustainabilityReport {
        score,
        warning: false,
        rationale: rationale.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_species_use_table_scores() {
        assert_eq!(local_sustainability("Yellowfin Tuna").score, 45);
        assert_eq!(local_sustainability("MACKEREL").score, 85);
        assert_eq!(local_sustainability("Sea Of Galilee Tilapia").score, 75);
    }

    #[test]
    fn unknown_species_get_default() {
        let report = local_sustainability("Red Snapper");
        assert_eq!(report.score, 60);
        assert!(!report.warning);
        assert!(report.rationale.contains("Pending full AI analysis"));
    }
}
