use std::collections::HashMap;
use std::time::Instant;

use obs_merge::{BestPicker, CollectionResolver, ContainedInLookup, SeriesMerger, TaggedSeries, UnitTable};
use obs_overlay::Overlay;
use obs_ranker::{apply_facet_filter, RankTable, Ranker};
use obs_store::keys::series_keys;
use obs_store::payload::Payload;
use obs_store::reader::StoreGroup;
use obs_types::{Date, Entity, Facet, FacetFilterSpec, ObsError, Point, RequestContext, SourceSeries, Variable};
use obs_formula::FormulaEngine;
use tracing::{instrument, warn};

use crate::decode;

/// Default slow-query threshold (spec §4.10, §5); overridable via
/// `ObservationEngine::with_slow_query_threshold`.
const DEFAULT_SLOW_QUERY_THRESHOLD_MS: u64 = 500;

/// The single public entry point into the core (spec §4.9): owns the
/// process-global `Ranker`, unit table, `StoreGroup`, and `Overlay`, and
/// exposes exactly the six operations of spec §6. `Ranker`,
/// `SeriesMerger`, `BestPicker`, `CollectionResolver`, and
/// `FormulaEngine` stay crate-internal building blocks composed here.
pub struct ObservationEngine {
    ranker: Ranker,
    units: UnitTable,
    store: StoreGroup,
    overlay: Overlay,
    slow_query_threshold_ms: u64,
}

impl ObservationEngine {
    pub fn new(rank_table: RankTable, units: UnitTable, store: StoreGroup, overlay: Overlay) -> Self {
        Self {
            ranker: Ranker::new(rank_table),
            units,
            store,
            overlay,
            slow_query_threshold_ms: DEFAULT_SLOW_QUERY_THRESHOLD_MS,
        }
    }

    pub fn with_slow_query_threshold_ms(mut self, threshold_ms: u64) -> Self {
        self.slow_query_threshold_ms = threshold_ms;
        self
    }

    fn log_if_slow(&self, operation: &str, started: Instant) {
        let elapsed = started.elapsed();
        if elapsed.as_millis() as u64 >= self.slow_query_threshold_ms {
            warn!(operation, elapsed_ms = elapsed.as_millis() as u64, "slow observation-engine query");
        }
    }

    /// Reads and merges every source series the store group and overlay
    /// know about for `(variable, entity)`, applying `filter` if given.
    /// The overlay is consulted as a fallback only when the store group
    /// is entirely empty for this pair (spec §4.8).
    async fn fetch_series(
        &self,
        ctx: &RequestContext,
        variable: &Variable,
        entity: &Entity,
        filter: Option<&FacetFilterSpec>,
    ) -> Result<Vec<SourceSeries>, ObsError> {
        let keys = series_keys(&[entity.as_str()], &[variable.as_str()]);
        let table_rows = self.store.read(ctx, keys, decode::series).await?;

        let mut tagged: Vec<TaggedSeries> = Vec::new();
        for table in &table_rows {
            let series: Vec<SourceSeries> = table
                .rows
                .iter()
                .filter_map(|(_, payload)| match payload {
                    Payload::Series(s) => Some(s.source_series.clone()),
                    _ => None,
                })
                .flatten()
                .collect();
            if !series.is_empty() {
                tagged.push(TaggedSeries { is_branch: table.is_branch, series });
            }
        }

        if let Some(relational) = self.store.relational() {
            let rows = relational.query_series(std::slice::from_ref(entity), std::slice::from_ref(variable)).await?;
            let series: Vec<SourceSeries> = rows.into_iter().flat_map(|ts| ts.source_series).collect();
            if !series.is_empty() {
                tagged.push(TaggedSeries { is_branch: false, series });
            }
        }

        if tagged.is_empty() {
            let overlay_series = self.overlay.snapshot().series_of(variable, entity);
            if !overlay_series.is_empty() {
                tagged.push(TaggedSeries { is_branch: false, series: overlay_series });
            }
        }

        let merger = SeriesMerger::new(&self.ranker, &self.units);
        let mut merged = merger.merge(tagged)?;
        if let Some(filter) = filter {
            merged = apply_facet_filter(&merged, filter);
        }
        self.ranker.sort_series(&mut merged);
        Ok(merged)
    }

    /// `pointAt(variable, entity, date?, filter?)` (spec §6).
    #[instrument(skip(self, ctx), fields(variable = variable.as_str(), entity = entity.as_str()))]
    pub async fn point_at(
        &self,
        ctx: &RequestContext,
        variable: &Variable,
        entity: &Entity,
        date: Option<&Date>,
        filter: Option<&FacetFilterSpec>,
    ) -> Result<Option<(Point, Facet)>, ObsError> {
        let started = Instant::now();
        ctx.check()?;

        let merged = self.fetch_series(ctx, variable, entity, filter).await?;
        let picker = BestPicker::new(&self.ranker);
        let mut result = picker.best_point_at(&merged, date);

        let snapshot = self.overlay.snapshot();
        if snapshot.has_variable(variable) {
            if let Some(overridden) = snapshot.point_at(variable, entity, date) {
                result = Some(overridden);
            }
        }

        self.log_if_slow("point_at", started);
        Ok(result)
    }

    /// `seriesOf(variable, entity, filter?, rankedPick)` (spec §6):
    /// `ranked_pick = true` returns the rank-winner of the filtered
    /// candidates; `false` returns the one with the latest date. The
    /// overlay is always consulted at the end to override this slot if it
    /// knows the variable (spec §4.8).
    #[instrument(skip(self, ctx), fields(variable = variable.as_str(), entity = entity.as_str()))]
    pub async fn series_of(
        &self,
        ctx: &RequestContext,
        variable: &Variable,
        entity: &Entity,
        filter: Option<&FacetFilterSpec>,
        ranked_pick: bool,
    ) -> Result<Option<(SourceSeries, Facet)>, ObsError> {
        let started = Instant::now();
        ctx.check()?;

        let merged = self.fetch_series(ctx, variable, entity, filter).await?;
        let picker = BestPicker::new(&self.ranker);
        let mut picked = picker.best_series(&merged, None, !ranked_pick).map(|s| (s.clone(), s.facet.clone()));

        let snapshot = self.overlay.snapshot();
        if snapshot.has_variable(variable) {
            let overlay_series = snapshot.series_of(variable, entity);
            if let Some(overridden) = picker.best_series(&overlay_series, None, !ranked_pick) {
                picked = Some((overridden.clone(), overridden.facet.clone()));
            }
        }

        self.log_if_slow("series_of", started);
        Ok(picked)
    }

    /// `bulkPoints(variables[], entities[], date?, allFacets)` (spec §6).
    /// The overlay is always consulted at the end to override matching
    /// slots for every variable it knows about (spec §4.8).
    #[instrument(skip(self, ctx, variables, entities))]
    pub async fn bulk_points(
        &self,
        ctx: &RequestContext,
        variables: &[Variable],
        entities: &[Entity],
        date: Option<&Date>,
        all_facets: bool,
    ) -> Result<HashMap<Variable, HashMap<Entity, Vec<(Point, Facet)>>>, ObsError> {
        let started = Instant::now();
        ctx.check()?;

        let snapshot = self.overlay.snapshot();
        let mut out: HashMap<Variable, HashMap<Entity, Vec<(Point, Facet)>>> = HashMap::new();
        for variable in variables {
            let mut per_entity = HashMap::new();
            for entity in entities {
                let merged = self.fetch_series(ctx, variable, entity, None).await?;
                let mut points = self.points_for(&merged, date, all_facets);
                if snapshot.has_variable(variable) {
                    if let Some(overridden) = snapshot.point_at(variable, entity, date) {
                        overlay_override_point(&mut points, overridden, all_facets);
                    }
                }
                if !points.is_empty() {
                    per_entity.insert(entity.clone(), points);
                }
            }
            out.insert(variable.clone(), per_entity);
        }

        self.log_if_slow("bulk_points", started);
        Ok(out)
    }

    /// `bulkSeries(variables[], entities[], allFacets)` (spec §6). The
    /// overlay is always consulted at the end to override matching slots
    /// for every variable it knows about (spec §4.8).
    #[instrument(skip(self, ctx, variables, entities))]
    pub async fn bulk_series(
        &self,
        ctx: &RequestContext,
        variables: &[Variable],
        entities: &[Entity],
        all_facets: bool,
    ) -> Result<HashMap<Variable, HashMap<Entity, Vec<(SourceSeries, Facet)>>>, ObsError> {
        let started = Instant::now();
        ctx.check()?;

        let snapshot = self.overlay.snapshot();
        let picker = BestPicker::new(&self.ranker);
        let mut out: HashMap<Variable, HashMap<Entity, Vec<(SourceSeries, Facet)>>> = HashMap::new();
        for variable in variables {
            let mut per_entity = HashMap::new();
            for entity in entities {
                let merged = self.fetch_series(ctx, variable, entity, None).await?;
                let mut series = if merged.is_empty() {
                    Vec::new()
                } else if all_facets {
                    merged.iter().map(|s| (s.clone(), s.facet.clone())).collect()
                } else {
                    vec![(merged[0].clone(), merged[0].facet.clone())]
                };

                if snapshot.has_variable(variable) {
                    let overlay_series = snapshot.series_of(variable, entity);
                    if all_facets {
                        for s in &overlay_series {
                            overlay_override_series(&mut series, s.clone());
                        }
                    } else if let Some(winner) = picker.best_series(&overlay_series, None, false) {
                        series = vec![(winner.clone(), winner.facet.clone())];
                    }
                }

                if !series.is_empty() {
                    per_entity.insert(entity.clone(), series);
                }
            }
            out.insert(variable.clone(), per_entity);
        }

        self.log_if_slow("bulk_series", started);
        Ok(out)
    }

    /// `pointsWithin(variable, ancestor, childType, date?, allFacets)`
    /// (spec §6, §4.6). `all_facets` is accepted for surface parity with
    /// `bulkPoints`/`bulkSeries`; the rollup path resolved by
    /// `CollectionResolver` already names a single ranked winner per
    /// child, so both values currently return that same winner (see
    /// DESIGN.md).
    #[instrument(skip(self, ctx, contained_in), fields(variable = variable.as_str(), ancestor = ancestor.as_str()))]
    pub async fn points_within(
        &self,
        ctx: &RequestContext,
        contained_in: &dyn ContainedInLookup,
        variable: &Variable,
        ancestor: &Entity,
        child_type: &str,
        date: Option<&Date>,
        _all_facets: bool,
    ) -> Result<HashMap<Entity, (Point, Facet)>, ObsError> {
        let started = Instant::now();
        ctx.check()?;

        let resolver = CollectionResolver::new(&self.ranker, &self.units);
        let snapshot = self.overlay.snapshot();
        let result = resolver
            .resolve(
                ctx,
                &self.store,
                &snapshot,
                contained_in,
                ancestor,
                child_type,
                std::slice::from_ref(variable),
                date,
                decode::collection,
                decode::series,
            )
            .await?;

        self.log_if_slow("points_within", started);
        Ok(result.into_iter().next().map(|(_, points)| points).unwrap_or_default())
    }

    /// `derivedSeries(formula, entity)` (spec §6, §4.7).
    #[instrument(skip(self, ctx, formula), fields(entity = entity.as_str()))]
    pub async fn derived_series(
        &self,
        ctx: &RequestContext,
        entity: &Entity,
        formula: &str,
    ) -> Result<Vec<Point>, ObsError> {
        let started = Instant::now();
        ctx.check()?;

        let engine = FormulaEngine::new(&self.ranker);
        let result = engine.derived_series(ctx, &self.store, entity, formula, decode::series).await;

        self.log_if_slow("derived_series", started);
        result
    }

    fn points_for(&self, merged: &[SourceSeries], date: Option<&Date>, all_facets: bool) -> Vec<(Point, Facet)> {
        if all_facets {
            merged
                .iter()
                .filter_map(|s| match date {
                    Some(d) => s.value_at(d).map(|v| (Point { date: d.clone(), value: v }, s.facet.clone())),
                    None => s
                        .latest_date()
                        .map(|d| (Point { date: d.clone(), value: s.value_at(d).unwrap() }, s.facet.clone())),
                })
                .collect()
        } else {
            let picker = BestPicker::new(&self.ranker);
            picker.best_point_at(merged, date).into_iter().collect()
        }
    }
}

/// Applies an overlay point override to a `bulkPoints` slot list (spec
/// §4.8): with `all_facets`, replaces the entry sharing the overlay
/// facet's import name, or adds it if no entry matches; without
/// `all_facets`, the overlay point simply replaces the whole slot.
fn overlay_override_point(points: &mut Vec<(Point, Facet)>, overridden: (Point, Facet), all_facets: bool) {
    if !all_facets {
        *points = vec![overridden];
        return;
    }
    match points.iter_mut().find(|(_, facet)| facet.import_name == overridden.1.import_name) {
        Some(slot) => *slot = overridden,
        None => points.push(overridden),
    }
}

/// Applies one overlay series override to a `bulkSeries` all-facets slot
/// list (spec §4.8): replaces the entry sharing the overlay series'
/// facet import name, or adds it if no entry matches.
fn overlay_override_series(series: &mut Vec<(SourceSeries, Facet)>, overlay_series: SourceSeries) {
    let facet = overlay_series.facet.clone();
    match series.iter_mut().find(|(_, f)| f.import_name == facet.import_name) {
        Some(slot) => *slot = (overlay_series, facet),
        None => series.push((overlay_series, facet)),
    }
}
