use std::fmt;

/// Provenance tuple for a measurement (spec §3).
///
/// Two facets are equal iff all six fields are equal; field order here is
/// load-bearing for the lexicographic tie-break used throughout
/// `obs-ranker` (spec §4.1, rule 4): `(importName, measurementMethod,
/// observationPeriod, scalingFactor, unit, provenanceUrl)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Facet {
    pub import_name: String,
    pub measurement_method: String,
    pub observation_period: String,
    pub unit: String,
    pub scaling_factor: String,
    pub provenance_url: String,
}

impl Facet {
    /// The tie-break tuple used by rule 4 of the series/cohort/place-variable
    /// total orders. Kept as a method (rather than relying on derived `Ord`
    /// on `Facet` itself) because the field order for tie-breaking differs
    /// from struct declaration order.
    pub fn tie_break_key(&self) -> (&str, &str, &str, &str, &str, &str) {
        (
            &self.import_name,
            &self.measurement_method,
            &self.observation_period,
            &self.scaling_factor,
            &self.unit,
            &self.provenance_url,
        )
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.import_name, self.measurement_method, self.observation_period, self.unit
        )
    }
}

/// Lookup key into the process-global ranking table (spec §3, §4.1).
///
/// Any field being `None` means "wildcard": it matches any corresponding
/// facet field without contributing to the match-specificity count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FacetRankKey {
    pub measurement_method: Option<String>,
    pub observation_period: Option<String>,
    pub unit: Option<String>,
}

impl FacetRankKey {
    /// Returns `Some(match_count)` if every non-wildcard field of `self`
    /// equals the corresponding field of `facet`, `None` if any disqualifies.
    pub fn match_against(&self, facet: &Facet) -> Option<u8> {
        let mut count = 0u8;
        if let Some(mm) = &self.measurement_method {
            if mm != &facet.measurement_method {
                return None;
            }
            count += 1;
        }
        if let Some(op) = &self.observation_period {
            if op != &facet.observation_period {
                return None;
            }
            count += 1;
        }
        if let Some(unit) = &self.unit {
            if unit != &facet.unit {
                return None;
            }
            count += 1;
        }
        Some(count)
    }
}

/// A user-supplied narrowing filter (spec §4.2). Every present field must
/// equal the corresponding facet field; absent fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetFilterSpec {
    pub measurement_method: Option<String>,
    pub observation_period: Option<String>,
    pub unit: Option<String>,
    pub scaling_factor: Option<String>,
}

impl FacetFilterSpec {
    pub fn matches(&self, facet: &Facet) -> bool {
        self.measurement_method.as_deref().map_or(true, |v| v == facet.measurement_method)
            && self.observation_period.as_deref().map_or(true, |v| v == facet.observation_period)
            && self.unit.as_deref().map_or(true, |v| v == facet.unit)
            && self.scaling_factor.as_deref().map_or(true, |v| v == facet.scaling_factor)
    }
}

/// 32-bit FNV-1a hash of a facet's identity fields (spec §6).
///
/// Computed over `importName | measurementMethod | observationPeriod |
/// scalingFactor | unit` joined by `-`. `provenanceUrl` is deliberately
/// excluded: two rows that differ only in an upstream provenance link
/// still describe "the same" measurement method for merge purposes.
pub fn facet_hash(facet: &Facet) -> u32 {
    const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
    const FNV_PRIME: u32 = 0x0100_0193;

    let joined = [
        facet.import_name.as_str(),
        facet.measurement_method.as_str(),
        facet.observation_period.as_str(),
        facet.scaling_factor.as_str(),
        facet.unit.as_str(),
    ]
    .join("-");

    let mut hash = FNV_OFFSET_BASIS;
    for byte in joined.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}
