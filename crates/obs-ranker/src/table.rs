use std::collections::HashMap;

use obs_types::{Facet, FacetRankKey};

/// Score returned for a facet whose import name has no entry in the rank
/// table, or whose entries all disqualify (spec §4.1).
pub const BASE_RANK: i32 = 100;

/// A facet is "inferior" once its score exceeds this threshold (spec §4.1).
pub const INFERIOR_THRESHOLD: i32 = 1000;

/// Process-global `importName -> [(FacetRankKey, score)]` table (spec §4.1,
/// §4.11). Immutable after construction; cheap to clone (an `Arc` wrapper
/// is left to the caller, mirroring how the teacher lineage hands
/// already-parsed config tables to its engine rather than re-reading them).
#[derive(Debug, Clone, Default)]
pub struct RankTable {
    by_import: HashMap<String, Vec<(FacetRankKey, i32)>>,
}

impl RankTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, import_name: impl Into<String>, key: FacetRankKey, score: i32) {
        self.by_import.entry(import_name.into()).or_default().push((key, score));
    }

    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, FacetRankKey, i32)>,
    ) -> Self {
        let mut table = Self::new();
        for (import_name, key, score) in entries {
            table.insert(import_name, key, score);
        }
        table
    }

    /// Returns the score for `facet` per the "most-specific matching entry
    /// wins" rule of spec §4.1. Ties on match count are broken by lower
    /// score. No entry for the import name (or no matching entry at all)
    /// yields `BASE_RANK`.
    pub fn score(&self, facet: &Facet) -> i32 {
        let Some(entries) = self.by_import.get(&facet.import_name) else {
            return BASE_RANK;
        };

        let mut best: Option<(u8, i32)> = None;
        for (key, score) in entries {
            let Some(match_count) = key.match_against(facet) else { continue };
            best = Some(match best {
                None => (match_count, *score),
                Some((best_count, best_score)) => {
                    if match_count > best_count || (match_count == best_count && *score < best_score)
                    {
                        (match_count, *score)
                    } else {
                        (best_count, best_score)
                    }
                }
            });
        }
        best.map(|(_, score)| score).unwrap_or(BASE_RANK)
    }

    pub fn is_inferior(&self, facet: &Facet) -> bool {
        self.score(facet) > INFERIOR_THRESHOLD
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facet(import: &str, mm: &str) -> Facet {
        Facet {
            import_name: import.to_owned(),
            measurement_method: mm.to_owned(),
            observation_period: "P1Y".to_owned(),
            unit: "Person".to_owned(),
            scaling_factor: "1".to_owned(),
            provenance_url: "https://example.org".to_owned(),
        }
    }

    #[test]
    fn unknown_import_gets_base_rank() {
        let table = RankTable::new();
        assert_eq!(table.score(&facet("Unknown", "Whatever")), BASE_RANK);
    }

    #[test]
    fn most_specific_entry_wins() {
        let mut table = RankTable::new();
        table.insert(
            "CensusPEP",
            FacetRankKey { measurement_method: None, observation_period: None, unit: None },
            50,
        );
        table.insert(
            "CensusPEP",
            FacetRankKey {
                measurement_method: Some("CensusPEPSurvey".into()),
                observation_period: None,
                unit: None,
            },
            10,
        );
        assert_eq!(table.score(&facet("CensusPEP", "CensusPEPSurvey")), 10);
        assert_eq!(table.score(&facet("CensusPEP", "SomeOtherSurvey")), 50);
    }

    #[test]
    fn tie_on_match_count_prefers_lower_score() {
        let mut table = RankTable::new();
        table.insert(
            "CensusPEP",
            FacetRankKey { measurement_method: None, observation_period: None, unit: None },
            80,
        );
        table.insert(
            "CensusPEP",
            FacetRankKey { measurement_method: None, observation_period: None, unit: None },
            20,
        );
        assert_eq!(table.score(&facet("CensusPEP", "Whatever")), 20);
    }

    #[test]
    fn inferior_threshold() {
        let mut table = RankTable::new();
        table.insert(
            "WikidataPopulation",
            FacetRankKey { measurement_method: None, observation_period: None, unit: None },
            1500,
        );
        assert!(table.is_inferior(&facet("WikidataPopulation", "Whatever")));
        assert!(!table.is_inferior(&facet("CensusPEP", "Whatever")));
    }
}
