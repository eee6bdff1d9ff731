//! In-process private-observation overlay (spec §4.8).
//!
//! Backed by an atomically-swappable snapshot so that a reload never
//! races with an in-flight request (spec §4.8, §5): every reader takes
//! one `Arc` snapshot up front and operates on it for the remainder of
//! the request, exactly mirroring the "readers take a snapshot at
//! request entry and do not observe in-flight swaps" rule for the
//! schema/metadata cache.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use arc_swap::ArcSwap;
use obs_types::{Date, Entity, Point, SourceSeries, Variable};

#[derive(Debug, Default)]
struct OverlayData {
    series: HashMap<(Variable, Entity), Vec<SourceSeries>>,
    known_variables: HashSet<Variable>,
}

/// Process-wide `(variable, entity) -> [SourceSeries]` mapping, loaded at
/// startup or atomically replaced (spec §4.8).
pub struct Overlay {
    data: ArcSwap<OverlayData>,
}

impl Default for Overlay {
    fn default() -> Self {
        Self::empty()
    }
}

impl Overlay {
    pub fn empty() -> Self {
        Self { data: ArcSwap::from_pointee(OverlayData::default()) }
    }

    /// Atomically replaces the entire overlay, e.g. on a private-data
    /// reload. In-flight requests holding an earlier snapshot (via
    /// `snapshot`) are unaffected.
    pub fn replace(&self, entries: HashMap<(Variable, Entity), Vec<SourceSeries>>) {
        let known_variables = entries.keys().map(|(v, _)| v.clone()).collect();
        self.data.store(Arc::new(OverlayData { series: entries, known_variables }));
    }

    /// Takes a point-in-time snapshot to use for the remainder of one
    /// request (spec §5).
    pub fn snapshot(&self) -> OverlaySnapshot {
        OverlaySnapshot { data: self.data.load_full() }
    }
}

/// A request-scoped, immutable view of the overlay (spec §4.8).
#[derive(Clone)]
pub struct OverlaySnapshot {
    data: Arc<OverlayData>,
}

impl OverlaySnapshot {
    pub fn has_variable(&self, variable: &Variable) -> bool {
        self.data.known_variables.contains(variable)
    }

    pub fn series_of(&self, variable: &Variable, entity: &Entity) -> Vec<SourceSeries> {
        self.data
            .series
            .get(&(variable.clone(), entity.clone()))
            .cloned()
            .unwrap_or_default()
    }

    /// `(point, facet)` for `(variable, entity)`, honoring an exact date
    /// if given, else the series with the latest value; earlier entries
    /// in the stored list win ties (spec §4.8).
    pub fn point_at(
        &self,
        variable: &Variable,
        entity: &Entity,
        date: Option<&Date>,
    ) -> Option<(Point, obs_types::Facet)> {
        let series = self.series_of(variable, entity);
        if series.is_empty() {
            return None;
        }

        if let Some(date) = date {
            return series.iter().find_map(|s| {
                s.value_at(date).map(|value| (Point { date: date.clone(), value }, s.facet.clone()))
            });
        }

        series
            .iter()
            .filter_map(|s| s.latest_date().map(|d| (d.clone(), s)))
            .max_by(|(date_a, _), (date_b, _)| date_a.cmp(date_b))
            .map(|(date, s)| (Point { value: s.value_at(&date).unwrap(), date }, s.facet.clone()))
    }
}
