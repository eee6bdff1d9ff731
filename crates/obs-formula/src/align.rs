use std::collections::{HashMap, HashSet};

use obs_ranker::Ranker;
use obs_types::{ObsError, SourceSeries};

/// Aligns each node's candidate series onto the longest date coverage
/// they all share, then picks the rank-winner per node (spec §4.7).
///
/// `candidates` maps a node's name to the source series that already
/// passed its facet filter. Every node must have at least one candidate,
/// and the date signatures across nodes must intersect, or a typed
/// error names the offending node(s).
pub fn align_nodes(
    mut candidates: HashMap<String, Vec<SourceSeries>>,
    ranker: &Ranker,
) -> Result<HashMap<String, SourceSeries>, ObsError> {
    for (name, series) in &candidates {
        if series.is_empty() {
            return Err(ObsError::not_found(format!("no source series matched node '{name}'")));
        }
    }

    let mut signature_sets = candidates
        .values()
        .map(|series| series.iter().map(SourceSeries::date_signature).collect::<HashSet<_>>());
    let mut common = signature_sets.next().unwrap_or_default();
    for set in signature_sets {
        common.retain(|sig| set.contains(sig));
    }

    if common.is_empty() {
        let mut names: Vec<&str> = candidates.keys().map(String::as_str).collect();
        names.sort_unstable();
        return Err(ObsError::not_found(format!(
            "no common date coverage across formula nodes: {}",
            names.join(", ")
        )));
    }

    // "Longest" is measured on the signature string itself (spec §4.7),
    // not the number of dates it encodes.
    let max_len = common.iter().map(String::len).max().unwrap_or(0);
    let longest: HashSet<String> = common.into_iter().filter(|sig| sig.len() == max_len).collect();

    let mut winners = HashMap::with_capacity(candidates.len());
    for (name, mut series) in candidates.drain() {
        series.retain(|s| longest.contains(&s.date_signature()));
        if series.is_empty() {
            return Err(ObsError::not_found(format!(
                "node '{name}' has no candidate within the longest common date coverage"
            )));
        }
        ranker.sort_series(&mut series);
        winners.insert(name, series.into_iter().next().expect("checked non-empty above"));
    }

    Ok(winners)
}
