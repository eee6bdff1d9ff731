use std::cmp::Ordering;

use obs_types::{PlaceVariableFacetSummary, SourceCohort, SourceSeries};

use crate::table::RankTable;

/// Pure, deterministic total orders over ranked entities (spec §4.1).
///
/// `Ranker` holds no I/O and no interior mutability; it is cheap to share
/// (typically behind an `Arc`) across every concurrently-running request.
#[derive(Debug, Clone)]
pub struct Ranker {
    table: RankTable,
}

impl Ranker {
    pub fn new(table: RankTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &RankTable {
        &self.table
    }

    /// Total order on series for the same `(variable, entity)` (spec §4.1):
    /// 1. lower facet score wins
    /// 2. later latest-date wins
    /// 3. larger value count wins
    /// 4. lexicographic tie-break on facet identity fields
    pub fn cmp_series(&self, a: &SourceSeries, b: &SourceSeries) -> Ordering {
        let score_a = self.table.score(&a.facet);
        let score_b = self.table.score(&b.facet);
        score_a
            .cmp(&score_b)
            .then_with(|| b.latest_date().cmp(&a.latest_date()))
            .then_with(|| b.len().cmp(&a.len()))
            .then_with(|| a.facet.tie_break_key().cmp(&b.facet.tie_break_key()))
    }

    pub fn sort_series(&self, series: &mut [SourceSeries]) {
        series.sort_by(|a, b| self.cmp_series(a, b));
    }

    /// Total order on cohorts (spec §4.1): rule 1, then rule 4 — dates and
    /// counts are omitted because every cohort of one `ObsCollection`
    /// shares the same collection query date.
    pub fn cmp_cohort(&self, a: &SourceCohort, b: &SourceCohort) -> Ordering {
        let score_a = self.table.score(&a.facet);
        let score_b = self.table.score(&b.facet);
        score_a.cmp(&score_b).then_with(|| a.facet.tie_break_key().cmp(&b.facet.tie_break_key()))
    }

    pub fn sort_cohorts(&self, cohorts: &mut [SourceCohort]) {
        cohorts.sort_by(|a, b| self.cmp_cohort(a, b));
    }

    /// Total order on place–variable-facet summary metadata (spec §4.1):
    /// rule 1, then later `latestDate`, then larger `obsCount`, then
    /// rule 4.
    pub fn cmp_place_variable_facet(
        &self,
        a: &PlaceVariableFacetSummary,
        b: &PlaceVariableFacetSummary,
    ) -> Ordering {
        let score_a = self.table.score(&a.facet);
        let score_b = self.table.score(&b.facet);
        score_a
            .cmp(&score_b)
            .then_with(|| b.latest_date.cmp(&a.latest_date))
            .then_with(|| b.obs_count.cmp(&a.obs_count))
            .then_with(|| a.facet.tie_break_key().cmp(&b.facet.tie_break_key()))
    }

    pub fn sort_place_variable_facets(&self, summaries: &mut [PlaceVariableFacetSummary]) {
        summaries.sort_by(|a, b| self.cmp_place_variable_facet(a, b));
    }
}
