//! `obs_store::Decoder` implementations backing the engine's own calls
//! to `StoreGroup::read`. A `Decoder` is a bare `fn` pointer (spec §9),
//! so these stay free functions rather than closures.

use obs_store::payload::Payload;
use obs_types::{EntityStatVarExistence, ObsCollection, ObsError, ObsTimeSeries};

pub fn series(bytes: &[u8]) -> Result<Payload, ObsError> {
    let series: ObsTimeSeries = serde_json::from_slice(bytes).map_err(|e| ObsError::internal(e.to_string()))?;
    Ok(Payload::Series(series))
}

pub fn collection(bytes: &[u8]) -> Result<Payload, ObsError> {
    let collection: ObsCollection =
        serde_json::from_slice(bytes).map_err(|e| ObsError::internal(e.to_string()))?;
    Ok(Payload::Collection(collection))
}

pub fn existence(bytes: &[u8]) -> Result<Payload, ObsError> {
    let existence: EntityStatVarExistence =
        serde_json::from_slice(bytes).map_err(|e| ObsError::internal(e.to_string()))?;
    Ok(Payload::Existence(existence))
}
