use std::collections::HashMap;

use async_trait::async_trait;
use obs_overlay::OverlaySnapshot;
use obs_ranker::Ranker;
use obs_store::keys::{collection_key, series_keys};
use obs_store::payload::{Decoder, Payload};
use obs_store::reader::StoreGroup;
use obs_types::{Date, Entity, Facet, ObsError, Point, RequestContext, Variable};

use crate::merger::{SeriesMerger, TaggedSeries};
use crate::picker::BestPicker;
use crate::units::UnitTable;

/// External collaborator boundary (spec §4.6): enumerates the direct
/// children of `ancestor` with type `child_type`. Backed by the
/// entity-property graph reader; the core consumes it only through this
/// trait.
#[async_trait]
pub trait ContainedInLookup: Send + Sync {
    async fn children(
        &self,
        ctx: &RequestContext,
        ancestor: &Entity,
        child_type: &str,
    ) -> Result<Vec<Entity>, ObsError>;
}

/// Resolves "within-place" queries against pre-aggregated rollups, with a
/// per-variable lazy fallback to the per-entity pipeline (spec §4.6).
pub struct CollectionResolver<'a> {
    ranker: &'a Ranker,
    units: &'a UnitTable,
}

impl<'a> CollectionResolver<'a> {
    pub fn new(ranker: &'a Ranker, units: &'a UnitTable) -> Self {
        Self { ranker, units }
    }

    /// Resolves `variables` for every child of `(ancestor, child_type)`,
    /// falling back per-variable when the rollup cache misses entirely,
    /// then applies the overlay's override precedence (spec §4.8).
    #[allow(clippy::too_many_arguments)]
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        store: &StoreGroup,
        overlay: &OverlaySnapshot,
        contained_in: &dyn ContainedInLookup,
        ancestor: &Entity,
        child_type: &str,
        variables: &[Variable],
        date: Option<&Date>,
        collection_decode: Decoder,
        series_decode: Decoder,
    ) -> Result<HashMap<Variable, HashMap<Entity, (Point, Facet)>>, ObsError> {
        ctx.check()?;

        let keys = variables
            .iter()
            .map(|v| collection_key(ancestor.as_str(), child_type, v.as_str(), date.map(Date::as_str)))
            .collect();
        let table_rows = store.read(ctx, keys, collection_decode).await?;

        let mut result: HashMap<Variable, HashMap<Entity, (Point, Facet)>> = HashMap::new();
        let mut missing: Vec<&Variable> = Vec::new();
        let mut children: Option<Vec<Entity>> = None;

        for variable in variables {
            let cohorts = self.collect_cohorts(&table_rows, variable);
            if cohorts.is_empty() {
                missing.push(variable);
                continue;
            }
            result.insert(variable.clone(), self.rollup_points(cohorts, date));
        }

        for variable in missing {
            if children.is_none() {
                children = Some(contained_in.children(ctx, ancestor, child_type).await?);
            }
            let fallback = self
                .resolve_fallback(ctx, store, variable, children.as_deref().unwrap(), date, series_decode)
                .await?;
            result.insert(variable.clone(), fallback);
        }

        // The overlay is always consulted last to override matching slots
        // (spec §4.8). A private observation can exist for a child the
        // rollup never covered (e.g. a cohort that skips that child while
        // still covering enough others to avoid the fallback path), so
        // every known child of `(ancestor, child_type)` is checked, not
        // just the entities the rollup/fallback already produced.
        for variable in variables {
            if !overlay.has_variable(variable) {
                continue;
            }
            let entry = result.entry(variable.clone()).or_default();
            for entity in entry.keys().cloned().collect::<Vec<_>>() {
                if let Some((point, facet)) = overlay.point_at(variable, &entity, date) {
                    entry.insert(entity, (point, facet));
                }
            }

            if children.is_none() {
                children = Some(contained_in.children(ctx, ancestor, child_type).await?);
            }
            for entity in children.as_deref().unwrap() {
                if entry.contains_key(entity) {
                    continue;
                }
                if let Some((point, facet)) = overlay.point_at(variable, entity, date) {
                    entry.insert(entity.clone(), (point, facet));
                }
            }
        }

        Ok(result)
    }

    fn collect_cohorts(
        &self,
        table_rows: &[obs_store::reader::TableRows],
        variable: &Variable,
    ) -> Vec<obs_types::SourceCohort> {
        let mut cohorts = Vec::new();
        for table in table_rows {
            for (key, payload) in &table.rows {
                if key.parts.get(2).map(String::as_str) != Some(variable.as_str()) {
                    continue;
                }
                if let Payload::Collection(collection) = payload {
                    cohorts.extend(collection.source_cohorts.iter().cloned());
                }
            }
        }
        cohorts
    }

    /// Builds the per-child point map from rank-ordered cohorts (spec
    /// §4.6, step 2).
    fn rollup_points(
        &self,
        mut cohorts: Vec<obs_types::SourceCohort>,
        date: Option<&Date>,
    ) -> HashMap<Entity, (Point, Facet)> {
        self.ranker.sort_cohorts(&mut cohorts);

        let mut recorded: HashMap<Entity, Date> = HashMap::new();
        let mut points: HashMap<Entity, (Point, Facet)> = HashMap::new();

        for cohort in &cohorts {
            let is_inferior = self.ranker.table().is_inferior(&cohort.facet);
            for (child, (value, per_entity_date)) in &cohort.values {
                let applicable_date = date.cloned().unwrap_or_else(|| per_entity_date.clone());

                let should_insert = match recorded.get(child) {
                    None => true,
                    Some(current_date) => applicable_date > *current_date && !is_inferior,
                };

                if should_insert {
                    recorded.insert(child.clone(), applicable_date.clone());
                    points.insert(
                        child.clone(),
                        (Point { date: applicable_date, value: *value }, cohort.facet.clone()),
                    );
                }
            }
        }

        points
    }

    async fn resolve_fallback(
        &self,
        ctx: &RequestContext,
        store: &StoreGroup,
        variable: &Variable,
        children: &[Entity],
        date: Option<&Date>,
        series_decode: Decoder,
    ) -> Result<HashMap<Entity, (Point, Facet)>, ObsError> {
        if children.is_empty() {
            return Ok(HashMap::new());
        }

        let entity_strs: Vec<&str> = children.iter().map(Entity::as_str).collect();
        let keys = series_keys(&entity_strs, &[variable.as_str()]);
        let table_rows = store.read(ctx, keys, series_decode).await?;

        let merger = SeriesMerger::new(self.ranker, self.units);
        let picker = BestPicker::new(self.ranker);

        let mut out = HashMap::new();
        for entity in children {
            let tagged: Vec<TaggedSeries> = table_rows
                .iter()
                .filter_map(|table| {
                    let series: Vec<_> = table
                        .rows
                        .iter()
                        .filter(|(key, _)| key.parts.first().map(String::as_str) == Some(entity.as_str()))
                        .filter_map(|(_, payload)| match payload {
                            Payload::Series(s) => Some(s.source_series.clone()),
                            _ => None,
                        })
                        .flatten()
                        .collect();
                    if series.is_empty() {
                        None
                    } else {
                        Some(TaggedSeries { is_branch: table.is_branch, series })
                    }
                })
                .collect();

            if tagged.is_empty() {
                continue;
            }

            let mut merged = merger.merge(tagged)?;
            self.ranker.sort_series(&mut merged);
            if let Some((point, facet)) = picker.best_point_at(&merged, date) {
                out.insert(entity.clone(), (point, facet));
            }
        }

        Ok(out)
    }
}
