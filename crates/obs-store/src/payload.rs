use obs_types::{EntityStatVarExistence, ObsCollection, ObsTimeSeries};

/// Tagged sum of the row-value payloads the store reader can decode
/// (spec §9: "model this as a tagged sum at the reader boundary, not a
/// universal any-type").
#[derive(Debug, Clone)]
pub enum Payload {
    Series(ObsTimeSeries),
    Collection(ObsCollection),
    Existence(EntityStatVarExistence),
}

impl Payload {
    pub fn into_series(self) -> Option<ObsTimeSeries> {
        match self {
            Payload::Series(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_collection(self) -> Option<ObsCollection> {
        match self {
            Payload::Collection(c) => Some(c),
            _ => None,
        }
    }

    pub fn into_existence(self) -> Option<EntityStatVarExistence> {
        match self {
            Payload::Existence(e) => Some(e),
            _ => None,
        }
    }
}

/// A decoder turns a raw row's bytes into a `Payload`; callers supply one
/// per `StoreGroup::read` call so the reader stays payload-agnostic
/// (spec §4.3, §9).
pub type Decoder = fn(&[u8]) -> Result<Payload, obs_types::ObsError>;
