use std::collections::HashMap;

use obs_types::SourceSeries;

/// Process-global unit normalization table (spec §4.4, §4.11): maps a
/// source unit to a canonical unit plus a multiplicative scaling factor.
#[derive(Debug, Clone, Default)]
pub struct UnitTable {
    canonical: HashMap<String, (String, f64)>,
}

impl UnitTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, source_unit: impl Into<String>, canonical_unit: impl Into<String>, factor: f64) {
        self.canonical.insert(source_unit.into(), (canonical_unit.into(), factor));
    }

    /// Builds a table from `(source_unit, canonical_unit, factor)` triples,
    /// e.g. already-parsed config rows (spec §4.11).
    pub fn from_entries(entries: impl IntoIterator<Item = (String, String, f64)>) -> Self {
        let mut table = Self::new();
        for (source_unit, canonical_unit, factor) in entries {
            table.insert(source_unit, canonical_unit, factor);
        }
        table
    }

    /// Rewrites `series.facet.unit` to its canonical form and multiplies
    /// every value by the recorded factor. A unit with no table entry is
    /// left untouched (it is already canonical, or unit-less).
    ///
    /// Applying this twice is a no-op the second time: once rewritten,
    /// `series.facet.unit` equals the canonical unit, which either has no
    /// table entry or maps to itself with factor `1.0` (spec §8, "unit
    /// idempotence").
    pub fn normalize(&self, series: &mut SourceSeries) {
        let Some((canonical_unit, factor)) = self.canonical.get(&series.facet.unit) else {
            return;
        };
        if canonical_unit == &series.facet.unit && *factor == 1.0 {
            return;
        }
        for value in series.values.values_mut() {
            *value *= factor;
        }
        series.facet.unit = canonical_unit.clone();
    }
}

#[cfg(test)]
mod tests {
    use obs_types::{Date, Facet};

    use super::*;

    fn series(unit: &str, value: f64) -> SourceSeries {
        SourceSeries::with_values(
            Facet {
                import_name: "Import".to_owned(),
                measurement_method: "m".to_owned(),
                observation_period: "P1Y".to_owned(),
                unit: unit.to_owned(),
                scaling_factor: "1".to_owned(),
                provenance_url: "https://example.org".to_owned(),
            },
            [(Date::new("2019").unwrap(), value)],
        )
    }

    #[test]
    fn normalize_rewrites_unit_and_scales_values() {
        let mut table = UnitTable::new();
        table.insert("Thousand", "Person", 1000.0);
        let mut s = series("Thousand", 12.0);
        table.normalize(&mut s);
        assert_eq!(s.facet.unit, "Person");
        assert_eq!(s.value_at(&Date::new("2019").unwrap()), Some(12000.0));
    }

    #[test]
    fn idempotent_under_repeated_application() {
        let mut table = UnitTable::new();
        table.insert("Thousand", "Person", 1000.0);
        let mut s = series("Thousand", 12.0);
        table.normalize(&mut s);
        let once = s.clone();
        table.normalize(&mut s);
        assert_eq!(s, once);
    }

    #[test]
    fn unknown_unit_is_untouched() {
        let table = UnitTable::new();
        let mut s = series("Person", 12.0);
        table.normalize(&mut s);
        assert_eq!(s.facet.unit, "Person");
        assert_eq!(s.value_at(&Date::new("2019").unwrap()), Some(12.0));
    }

    #[test]
    fn from_entries_builds_the_same_table_as_repeated_insert() {
        let table = UnitTable::from_entries([("Thousand".to_owned(), "Person".to_owned(), 1000.0)]);
        let mut s = series("Thousand", 12.0);
        table.normalize(&mut s);
        assert_eq!(s.value_at(&Date::new("2019").unwrap()), Some(12000.0));
    }
}
