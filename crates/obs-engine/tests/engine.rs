use std::sync::Arc;

use async_trait::async_trait;
use obs_engine::ObservationEngine;
use obs_merge::{ContainedInLookup, UnitTable};
use obs_overlay::Overlay;
use obs_ranker::RankTable;
use obs_store::cache::InMemoryCacheTable;
use obs_store::keys::{collection_key, series_keys};
use obs_store::reader::StoreGroup;
use obs_types::{Date, Entity, Facet, FacetFilterSpec, ObsCollection, ObsError, ObsTimeSeries, RequestContext,
    SourceCohort, SourceSeries, Variable};

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

fn series(facet: Facet, values: &[(&str, f64)]) -> SourceSeries {
    SourceSeries::with_values(facet, values.iter().map(|(d, v)| (Date::new(*d).unwrap(), *v)))
}

fn build_engine(rank_table: RankTable, rows: Vec<(String, Vec<u8>)>) -> ObservationEngine {
    build_engine_with_overlay(rank_table, rows, Overlay::empty())
}

fn build_engine_with_overlay(
    rank_table: RankTable,
    rows: Vec<(String, Vec<u8>)>,
    overlay: Overlay,
) -> ObservationEngine {
    let mut table = InMemoryCacheTable::new("base", 0, true);
    for (key, value) in rows {
        table.insert_raw(key, value);
    }
    let store = StoreGroup::new(vec![Arc::new(table)], None);
    ObservationEngine::new(rank_table, UnitTable::new(), store, overlay)
}

fn overlay_with(variable: &Variable, entity: &Entity, series: SourceSeries) -> Overlay {
    let overlay = Overlay::empty();
    overlay.replace(std::collections::HashMap::from([((variable.clone(), entity.clone()), vec![series])]));
    overlay
}

fn time_series_row(entity: &Entity, variable: &Variable, series: Vec<SourceSeries>) -> (String, Vec<u8>) {
    let ts = ObsTimeSeries { entity: entity.clone(), variable: variable.clone(), source_series: series };
    let key = series_keys(&[entity.as_str()], &[variable.as_str()]).remove(0);
    (key.key, serde_json::to_vec(&ts).unwrap())
}

/// Spec §8 scenario 1.
#[tokio::test]
async fn point_at_prefers_better_ranked_series_on_an_exact_date() {
    let entity = Entity::new("USA").unwrap();
    let variable = Variable::new("Count_Person").unwrap();

    let mut rank = RankTable::new();
    rank.insert("CensusPEP", obs_types::FacetRankKey::default(), 10);

    let pep = series(facet("CensusPEP", "CensusPEPSurvey"), &[("2017", 105.0), ("2018", 205.0), ("2019", 305.0)]);
    let acs = series(
        facet("CensusACS5YearSurvey", "CensusACS5yrSurvey"),
        &[("2017", 100.0), ("2018", 200.0), ("2019", 300.0)],
    );
    let row = time_series_row(&entity, &variable, vec![pep, acs]);
    let engine = build_engine(rank, vec![(row.0, row.1)]);

    let ctx = RequestContext::unbounded();
    let (point, facet) =
        engine.point_at(&ctx, &variable, &entity, Some(&Date::new("2018").unwrap()), None).await.unwrap().unwrap();
    assert_eq!(point.value, 205.0);
    assert_eq!(facet.import_name, "CensusPEP");
}

/// Spec §8 scenario 2.
#[tokio::test]
async fn point_at_prefers_later_latest_date_when_scores_tie() {
    let entity = Entity::new("USA").unwrap();
    let variable = Variable::new("Count_Person").unwrap();

    let pep = series(facet("CensusPEP", "CensusPEPSurvey"), &[("2017", 105.0), ("2018", 205.0), ("2019", 305.0)]);
    let acs = series(
        facet("CensusACS5YearSurvey", "CensusACS5yrSurvey"),
        &[("2017", 100.0), ("2018", 200.0), ("2019", 300.0), ("2020", 400.0)],
    );
    let row = time_series_row(&entity, &variable, vec![pep, acs]);
    let engine = build_engine(RankTable::new(), vec![(row.0, row.1)]);

    let ctx = RequestContext::unbounded();
    let (point, facet) = engine.point_at(&ctx, &variable, &entity, None, None).await.unwrap().unwrap();
    assert_eq!(point.value, 400.0);
    assert_eq!(facet.import_name, "CensusACS5YearSurvey");
}

/// Spec §8 scenario 3.
#[tokio::test]
async fn point_at_inferior_guard_blocks_override() {
    let entity = Entity::new("USA").unwrap();
    let variable = Variable::new("Count_Person").unwrap();

    let mut rank = RankTable::new();
    rank.insert("WikidataPopulation", obs_types::FacetRankKey::default(), 1500);

    let pep = series(facet("CensusPEP", "CensusPEPSurvey"), &[("2017", 105.0), ("2018", 205.0), ("2019", 305.0)]);
    let wikidata = series(facet("WikidataPopulation", "Stats"), &[("2022", 999.0)]);
    let row = time_series_row(&entity, &variable, vec![pep, wikidata]);
    let engine = build_engine(rank, vec![(row.0, row.1)]);

    let ctx = RequestContext::unbounded();
    let (point, facet) = engine.point_at(&ctx, &variable, &entity, None, None).await.unwrap().unwrap();
    assert_eq!(point.value, 305.0);
    assert_eq!(facet.import_name, "CensusPEP");
}

/// Spec §8 scenario 6.
#[tokio::test]
async fn series_of_honors_filter_regardless_of_rank() {
    let entity = Entity::new("USA").unwrap();
    let variable = Variable::new("Count_Person").unwrap();

    let pep = series(facet("CensusPEP", "CensusPEPSurvey"), &[("2019", 305.0)]);
    let acs = series(facet("CensusACS5YearSurvey", "CensusACS5yrSurvey"), &[("2019", 300.0)]);
    let row = time_series_row(&entity, &variable, vec![pep, acs]);
    let engine = build_engine(RankTable::new(), vec![(row.0, row.1)]);

    let filter = FacetFilterSpec { measurement_method: Some("CensusACS5yrSurvey".to_owned()), ..Default::default() };
    let ctx = RequestContext::unbounded();
    let (series, facet) = engine.series_of(&ctx, &variable, &entity, Some(&filter), true).await.unwrap().unwrap();
    assert_eq!(facet.import_name, "CensusACS5YearSurvey");
    assert_eq!(series.value_at(&Date::new("2019").unwrap()), Some(300.0));
}

struct FixedChildren(Vec<Entity>);

#[async_trait]
impl ContainedInLookup for FixedChildren {
    async fn children(
        &self,
        _ctx: &RequestContext,
        _ancestor: &Entity,
        _child_type: &str,
    ) -> Result<Vec<Entity>, ObsError> {
        Ok(self.0.clone())
    }
}

/// Spec §8 scenario 4: a rollup covers most counties; one missing county
/// is supplied by the per-entity fallback path.
#[tokio::test]
async fn points_within_combines_rollup_and_fallback() {
    let variable = Variable::new("Count_Person").unwrap();
    let ancestor = Entity::new("geoId/06").unwrap();
    let county_with_rollup = Entity::new("geoId/06001").unwrap();
    let county_missing = Entity::new("geoId/06003").unwrap();

    let mut cohort = SourceCohort::new(facet("CensusPEP", "CensusPEPSurvey"));
    cohort.values.insert(county_with_rollup.clone(), (100.0, Date::new("2020").unwrap()));
    let mut collection = ObsCollection::new(variable.clone(), ancestor.clone(), "County");
    collection.source_cohorts.push(cohort);
    let rollup_key = collection_key("geoId/06", "County", "Count_Person", None);

    let fallback_series = series(facet("CensusPEP", "CensusPEPSurvey"), &[("2020", 55.0)]);
    let fallback_row = time_series_row(&county_missing, &variable, vec![fallback_series]);

    let mut table = InMemoryCacheTable::new("base", 0, true);
    table.insert_raw(rollup_key.key, serde_json::to_vec(&collection).unwrap());
    table.insert_raw(fallback_row.0, fallback_row.1);
    let store = StoreGroup::new(vec![Arc::new(table)], None);
    let engine = ObservationEngine::new(RankTable::new(), UnitTable::new(), store, Overlay::empty());

    let lookup = FixedChildren(vec![county_missing.clone()]);
    let ctx = RequestContext::unbounded();
    let result =
        engine.points_within(&ctx, &lookup, &variable, &ancestor, "County", None, false).await.unwrap();

    assert_eq!(result[&county_with_rollup].0.value, 100.0);
    assert_eq!(result[&county_missing].0.value, 55.0);
}

/// Spec §4.8: the overlay overrides `seriesOf`'s pick even when the store
/// already has a non-empty result for that `(variable, entity)`.
#[tokio::test]
async fn series_of_is_overridden_by_overlay_over_a_nonempty_store_result() {
    let entity = Entity::new("USA").unwrap();
    let variable = Variable::new("Count_Person").unwrap();

    let pep = series(facet("CensusPEP", "CensusPEPSurvey"), &[("2019", 305.0)]);
    let row = time_series_row(&entity, &variable, vec![pep]);

    let overlay_series = series(facet("PrivateImport", "Survey"), &[("2019", 999.0)]);
    let overlay = overlay_with(&variable, &entity, overlay_series);
    let engine = build_engine_with_overlay(RankTable::new(), vec![(row.0, row.1)], overlay);

    let ctx = RequestContext::unbounded();
    let (series, facet) = engine.series_of(&ctx, &variable, &entity, None, false).await.unwrap().unwrap();
    assert_eq!(facet.import_name, "PrivateImport");
    assert_eq!(series.value_at(&Date::new("2019").unwrap()), Some(999.0));
}

/// Spec §4.8: the overlay overrides a `bulkPoints` slot for a
/// `(variable, entity)` pair the store already answered.
#[tokio::test]
async fn bulk_points_is_overridden_by_overlay_over_a_nonempty_store_result() {
    let entity = Entity::new("USA").unwrap();
    let variable = Variable::new("Count_Person").unwrap();

    let pep = series(facet("CensusPEP", "CensusPEPSurvey"), &[("2019", 305.0)]);
    let row = time_series_row(&entity, &variable, vec![pep]);

    let overlay_series = series(facet("PrivateImport", "Survey"), &[("2019", 999.0)]);
    let overlay = overlay_with(&variable, &entity, overlay_series);
    let engine = build_engine_with_overlay(RankTable::new(), vec![(row.0, row.1)], overlay);

    let ctx = RequestContext::unbounded();
    let result = engine.bulk_points(&ctx, &[variable.clone()], &[entity.clone()], None, false).await.unwrap();
    let slots = &result[&variable][&entity];
    assert_eq!(slots.len(), 1);
    assert_eq!(slots[0].0.value, 999.0);
    assert_eq!(slots[0].1.import_name, "PrivateImport");
}

/// Spec §4.8, `allFacets=true` branch: the overlay's series replaces the
/// list entry sharing its facet's import name rather than being dropped.
#[tokio::test]
async fn bulk_series_all_facets_overrides_the_matching_facet_slot() {
    let entity = Entity::new("USA").unwrap();
    let variable = Variable::new("Count_Person").unwrap();

    let pep = series(facet("CensusPEP", "CensusPEPSurvey"), &[("2019", 305.0)]);
    let acs = series(facet("CensusACS5YearSurvey", "CensusACS5yrSurvey"), &[("2019", 300.0)]);
    let row = time_series_row(&entity, &variable, vec![pep, acs]);

    let overlay_series = series(facet("CensusPEP", "CensusPEPSurvey"), &[("2019", 999.0)]);
    let overlay = overlay_with(&variable, &entity, overlay_series);
    let engine = build_engine_with_overlay(RankTable::new(), vec![(row.0, row.1)], overlay);

    let ctx = RequestContext::unbounded();
    let result = engine.bulk_series(&ctx, &[variable.clone()], &[entity.clone()], true).await.unwrap();
    let slots = &result[&variable][&entity];
    assert_eq!(slots.len(), 2);
    let pep_slot = slots.iter().find(|(_, f)| f.import_name == "CensusPEP").unwrap();
    assert_eq!(pep_slot.0.value_at(&Date::new("2019").unwrap()), Some(999.0));
    let acs_slot = slots.iter().find(|(_, f)| f.import_name == "CensusACS5YearSurvey").unwrap();
    assert_eq!(acs_slot.0.value_at(&Date::new("2019").unwrap()), Some(300.0));
}

/// Spec §8 boundary behavior: empty inputs return structurally empty
/// responses, never an error or panic.
#[tokio::test]
async fn bulk_points_with_empty_inputs_returns_empty_map() {
    let engine = build_engine(RankTable::new(), Vec::new());
    let ctx = RequestContext::unbounded();
    let result = engine.bulk_points(&ctx, &[], &[], None, false).await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn point_at_on_entirely_missing_cache_is_not_found_not_zero() {
    let engine = build_engine(RankTable::new(), Vec::new());
    let ctx = RequestContext::unbounded();
    let variable = Variable::new("Count_Person").unwrap();
    let entity = Entity::new("USA").unwrap();
    let result = engine.point_at(&ctx, &variable, &entity, None, None).await.unwrap();
    assert!(result.is_none());
}

/// Spec §8 scenario 5, exercised end to end through the engine facade.
#[tokio::test]
async fn derived_series_evaluates_a_three_variable_formula() {
    let entity = Entity::new("USA").unwrap();
    let total = Variable::new("Count_Person").unwrap();
    let female = Variable::new("Count_Person_Female").unwrap();
    let male = Variable::new("Count_Person_Male").unwrap();

    let rows = vec![
        time_series_row(&entity, &total, vec![series(facet("CensusPEP", "m"), &[("2010", 100.0), ("2011", 110.0)])]),
        time_series_row(&entity, &female, vec![series(facet("CensusPEP", "m"), &[("2010", 49.0), ("2011", 55.0)])]),
        time_series_row(&entity, &male, vec![series(facet("CensusPEP", "m"), &[("2010", 50.0), ("2011", 54.0)])]),
    ];
    let engine = build_engine(RankTable::new(), rows);

    let ctx = RequestContext::unbounded();
    let points = engine
        .derived_series(&ctx, &entity, "Count_Person - Count_Person_Female - Count_Person_Male")
        .await
        .unwrap();

    assert_eq!(points.len(), 2);
    assert_eq!(points[0].value, 1.0);
    assert_eq!(points[1].value, 1.0);
}
