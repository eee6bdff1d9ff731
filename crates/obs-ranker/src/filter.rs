use obs_types::{FacetFilterSpec, SourceSeries};

/// Narrows `series` by `filter`, preserving input order (spec §4.2).
pub fn apply_facet_filter(series: &[SourceSeries], filter: &FacetFilterSpec) -> Vec<SourceSeries> {
    series.iter().filter(|s| filter.matches(&s.facet)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use obs_types::{Date, Facet};

    use super::*;

    fn series(mm: &str) -> SourceSeries {
        SourceSeries::with_values(
            Facet {
                import_name: "CensusACS5YearSurvey".to_owned(),
                measurement_method: mm.to_owned(),
                observation_period: "P1Y".to_owned(),
                unit: "Person".to_owned(),
                scaling_factor: "1".to_owned(),
                provenance_url: "https://example.org".to_owned(),
            },
            [(Date::new("2019").unwrap(), 100.0)],
        )
    }

    #[test]
    fn absent_fields_match_anything() {
        let filter = FacetFilterSpec::default();
        let all = vec![series("CensusACS5yrSurvey"), series("CensusPEPSurvey")];
        assert_eq!(apply_facet_filter(&all, &filter).len(), 2);
    }

    #[test]
    fn present_field_narrows_and_preserves_order() {
        let filter = FacetFilterSpec {
            measurement_method: Some("CensusACS5yrSurvey".to_owned()),
            ..Default::default()
        };
        let all = vec![series("CensusPEPSurvey"), series("CensusACS5yrSurvey")];
        let filtered = apply_facet_filter(&all, &filter);
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].facet.measurement_method, "CensusACS5yrSurvey");
    }
}
