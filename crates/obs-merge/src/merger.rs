use std::collections::HashMap;

use obs_ranker::Ranker;
use obs_types::{facet_hash, ObsError, SourceSeries};

use crate::units::UnitTable;

/// One table's contribution of already-decoded series, tagged with
/// origin (spec §4.4: "lists of SourceSeries from multiple tables,
/// already tagged with origin").
#[derive(Debug, Clone)]
pub struct TaggedSeries {
    pub is_branch: bool,
    pub series: Vec<SourceSeries>,
}

struct Kept {
    is_branch: bool,
    series: SourceSeries,
}

/// Deduplicates source series across stores by facet hash, applies unit
/// normalization, and produces a final rank-ordered list (spec §4.4).
pub struct SeriesMerger<'a> {
    ranker: &'a Ranker,
    units: &'a UnitTable,
}

impl<'a> SeriesMerger<'a> {
    pub fn new(ranker: &'a Ranker, units: &'a UnitTable) -> Self {
        Self { ranker, units }
    }

    /// Merges `tables` into one rank-ordered, facet-hash-deduplicated
    /// list (spec §4.4's invariants). Returns `ObsError::Internal` if two
    /// distinct facets collide on their 32-bit hash within this response
    /// (spec §9, open question on hash width).
    pub fn merge(&self, tables: Vec<TaggedSeries>) -> Result<Vec<SourceSeries>, ObsError> {
        let mut by_hash: HashMap<u32, Kept> = HashMap::new();

        for table in tables {
            for mut series in table.series {
                self.units.normalize(&mut series);
                let hash = facet_hash(&series.facet);

                match by_hash.get_mut(&hash) {
                    None => {
                        by_hash.insert(hash, Kept { is_branch: table.is_branch, series });
                    }
                    Some(kept) => {
                        if kept.series.facet != series.facet {
                            return Err(ObsError::internal(format!(
                                "facet hash collision between distinct facets: {} and {}",
                                kept.series.facet, series.facet
                            )));
                        }
                        // A branch table's copy always wins verbatim.
                        // Among non-branch copies, the one with more
                        // values (a proxy for coverage) wins.
                        let replace = if table.is_branch && !kept.is_branch {
                            true
                        } else if kept.is_branch {
                            false
                        } else {
                            series.len() > kept.series.len()
                        };
                        if replace {
                            *kept = Kept { is_branch: table.is_branch, series };
                        }
                    }
                }
            }
        }

        let mut merged: Vec<SourceSeries> = by_hash.into_values().map(|kept| kept.series).collect();
        self.ranker.sort_series(&mut merged);
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use obs_types::{Date, Facet};

    use super::*;
    use obs_ranker::RankTable;

    fn facet(import: &str) -> Facet {
        Facet {
            import_name: import.to_owned(),
            measurement_method: "m".to_owned(),
            observation_period: "P1Y".to_owned(),
            unit: "Person".to_owned(),
            scaling_factor: "1".to_owned(),
            provenance_url: "https://example.org".to_owned(),
        }
    }

    fn series(import: &str, values: &[(&str, f64)]) -> SourceSeries {
        SourceSeries::with_values(
            facet(import),
            values.iter().map(|(d, v)| (Date::new(*d).unwrap(), *v)),
        )
    }

    #[test]
    fn one_series_per_facet_hash_after_merge() {
        let ranker = Ranker::new(RankTable::new());
        let units = UnitTable::new();
        let merger = SeriesMerger::new(&ranker, &units);

        let base = TaggedSeries { is_branch: false, series: vec![series("A", &[("2019", 1.0)])] };
        let merged = merger.merge(vec![base]).unwrap();
        assert_eq!(merged.len(), 1);
    }

    #[test]
    fn non_branch_table_with_more_values_wins_when_no_branch_present() {
        let ranker = Ranker::new(RankTable::new());
        let units = UnitTable::new();
        let merger = SeriesMerger::new(&ranker, &units);

        let thin = TaggedSeries { is_branch: false, series: vec![series("A", &[("2019", 1.0)])] };
        let thick = TaggedSeries {
            is_branch: false,
            series: vec![series("A", &[("2018", 1.0), ("2019", 1.0)])],
        };
        let merged = merger.merge(vec![thin, thick]).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].len(), 2);
    }

    #[test]
    fn branch_table_wins_even_when_seen_before_a_thicker_non_branch_copy() {
        let ranker = Ranker::new(RankTable::new());
        let units = UnitTable::new();
        let merger = SeriesMerger::new(&ranker, &units);

        let branch_thin = TaggedSeries { is_branch: true, series: vec![series("A", &[("2019", 1.0)])] };
        let base_thick = TaggedSeries {
            is_branch: false,
            series: vec![series("A", &[("2017", 1.0), ("2018", 1.0), ("2019", 1.0)])],
        };
        let merged = merger.merge(vec![branch_thin, base_thick]).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].len(), 1, "branch copy must win verbatim regardless of arrival order");
    }

    #[test]
    fn facet_only_in_non_branch_table_survives() {
        let ranker = Ranker::new(RankTable::new());
        let units = UnitTable::new();
        let merger = SeriesMerger::new(&ranker, &units);

        let branch = TaggedSeries { is_branch: true, series: vec![series("Branch", &[("2020", 1.0)])] };
        let base = TaggedSeries { is_branch: false, series: vec![series("Base", &[("2019", 1.0)])] };
        let merged = merger.merge(vec![branch, base]).unwrap();
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn distinct_facets_never_spuriously_collide() {
        let ranker = Ranker::new(RankTable::new());
        let units = UnitTable::new();
        let merger = SeriesMerger::new(&ranker, &units);

        let a = TaggedSeries { is_branch: false, series: vec![series("A", &[("2019", 1.0)])] };
        let b = TaggedSeries { is_branch: false, series: vec![series("B", &[("2019", 1.0)])] };
        assert!(merger.merge(vec![a, b]).is_ok());
    }
}
