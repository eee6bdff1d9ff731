use std::collections::BTreeMap;

use crate::facet::Facet;
use crate::ids::{Date, Entity, Variable};

/// A single `(date, value)` observation, paired with the facet it was
/// picked from. This is the payload returned by `pointAt` and the leaves
/// of `pointsWithin`/`derivedSeries`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    pub date: Date,
    pub value: f64,
}

/// Values of one variable, for one entity, from one facet (spec §3).
///
/// The `values` map is sparse and unordered by construction; iteration
/// order must never be relied upon (`BTreeMap` is used only so that
/// snapshot tests are deterministic, not because order is meaningful).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceSeries {
    pub facet: Facet,
    pub values: BTreeMap<Date, f64>,
    pub place_name: Option<String>,
}

impl SourceSeries {
    pub fn new(facet: Facet) -> Self {
        Self { facet, values: BTreeMap::new(), place_name: None }
    }

    pub fn with_values(facet: Facet, values: impl IntoIterator<Item = (Date, f64)>) -> Self {
        Self { facet, values: values.into_iter().collect(), place_name: None }
    }

    /// The latest (lexicographically greatest) date present in `values`,
    /// or `None` for an empty series.
    pub fn latest_date(&self) -> Option<&Date> {
        self.values.keys().max()
    }

    pub fn value_at(&self, date: &Date) -> Option<f64> {
        self.values.get(date).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The date signature used by `obs-formula` alignment: the sorted
    /// dates joined into one opaque key (spec §4.7).
    pub fn date_signature(&self) -> String {
        self.values.keys().map(Date::as_str).collect::<Vec<_>>().join(",")
    }
}

/// All source series for one `(variable, entity)` pair (spec §3).
///
/// Invariant, upheld by `obs-merge::SeriesMerger` and checked by its
/// tests: no two member series share a facet hash.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ObsTimeSeries {
    pub entity: Entity,
    pub variable: Variable,
    pub source_series: Vec<SourceSeries>,
}

impl ObsTimeSeries {
    pub fn new(entity: Entity, variable: Variable) -> Self {
        Self { entity, variable, source_series: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.source_series.is_empty()
    }
}

/// One facet's slice of an `ObsCollection`: a per-child-entity snapshot for
/// a single collection query date (spec §3, §4.6).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SourceCohort {
    pub facet: Facet,
    /// child entity -> (value, latest date this cohort actually observed)
    pub values: BTreeMap<Entity, (f64, Date)>,
}

impl SourceCohort {
    pub fn new(facet: Facet) -> Self {
        Self { facet, values: BTreeMap::new() }
    }
}

/// Precomputed rollup of one variable over the children of a given type
/// under a given ancestor (spec §3).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ObsCollection {
    pub variable: Variable,
    pub ancestor_entity: Entity,
    pub child_type: String,
    pub source_cohorts: Vec<SourceCohort>,
}

impl ObsCollection {
    pub fn new(variable: Variable, ancestor_entity: Entity, child_type: impl Into<String>) -> Self {
        Self { variable, ancestor_entity, child_type: child_type.into(), source_cohorts: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.source_cohorts.is_empty()
    }
}

/// Third store payload variant (spec §3, §9): a boolean existence record
/// for `(entity, variable)`, decoded by the store reader but only
/// consumed by external collaborators. The core never ranks or merges it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EntityStatVarExistence {
    pub has_data: bool,
}

/// Summary metadata used by the place–variable-facet total order of
/// spec §4.1 (third bullet): the ranker needs this to order candidate
/// facets for a `(place, variable)` pair even though it carries neither
/// per-date values nor a cohort.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlaceVariableFacetSummary {
    pub facet: Facet,
    pub latest_date: Date,
    pub obs_count: u64,
}
