/// Stable ASCII prefixes for the cache-store row-key families this crate
/// builds keys for (spec §6). Spec §6 also names a "within-place
/// date-index" row family; no `[MODULE]` operation (§4.1-§4.8) describes
/// a consumer for it, so it is intentionally not built here (see
/// DESIGN.md).
pub const SERIES_PREFIX: &str = "d";
pub const COLLECTION_PREFIX: &str = "ranked_locations";
pub const METADATA_PREFIX: &str = "place_obs";

/// Field delimiter used when concatenating key parts.
const DELIM: char = '^';

/// Sentinel substituted for an absent date in a collection-rollup key.
pub const LATEST: &str = "LATEST";

/// A fully-built composite row key, along with the parts it was built
/// from (the parts are carried back out of `StoreGroup::read` alongside
/// the decoded row so callers can re-associate a result with the
/// `(entity, variable, ...)` tuple that produced it).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    pub key: String,
    pub parts: Vec<String>,
}

fn build_key(prefix: &str, parts: &[&str]) -> RowKey {
    let mut key = String::from(prefix);
    for part in parts {
        key.push(DELIM);
        key.push_str(part);
    }
    RowKey { key, parts: parts.iter().map(|s| s.to_string()).collect() }
}

/// Addresses the cross product of `part_lists` against `prefix`, one row
/// key per combination (spec §4.3, §6: "one `read` call covers many
/// `(entity, variable)` pairs").
///
/// `part_lists` is ordered the same way as the row's conceptual fields
/// (e.g. `[entities, variables]` for the series prefix); the returned
/// `RowKey::parts` preserve that order so callers can destructure them
/// positionally.
pub fn cross_product_keys(prefix: &str, part_lists: &[&[&str]]) -> Vec<RowKey> {
    let mut combos: Vec<Vec<&str>> = vec![Vec::new()];
    for parts in part_lists {
        let mut next = Vec::with_capacity(combos.len() * parts.len().max(1));
        for combo in &combos {
            for part in parts.iter() {
                let mut extended = combo.clone();
                extended.push(*part);
                next.push(extended);
            }
        }
        combos = next;
    }
    combos.into_iter().map(|parts| build_key(prefix, &parts)).collect()
}

/// Builds the series-prefix keys for every `(entity, variable)` pair.
pub fn series_keys(entities: &[&str], variables: &[&str]) -> Vec<RowKey> {
    cross_product_keys(SERIES_PREFIX, &[entities, variables])
}

/// Builds the collection-prefix key for one `(ancestor, childType,
/// variable, date)` tuple, substituting `LATEST` for an absent date.
pub fn collection_key(ancestor: &str, child_type: &str, variable: &str, date: Option<&str>) -> RowKey {
    let date = date.unwrap_or(LATEST);
    build_key(COLLECTION_PREFIX, &[ancestor, child_type, variable, date])
}

pub fn metadata_keys(entities: &[&str]) -> Vec<RowKey> {
    cross_product_keys(METADATA_PREFIX, &[entities])
}
