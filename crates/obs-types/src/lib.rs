//! Core data model, error taxonomy, and request context shared by every
//! crate in the observation gateway (spec §3, §4.9, §7).

pub mod context;
pub mod error;
pub mod facet;
pub mod ids;
pub mod series;

pub use context::RequestContext;
pub use error::{ErrorCode, ObsError, ObsResult};
pub use facet::{facet_hash, Facet, FacetFilterSpec, FacetRankKey};
pub use ids::{ChildType, Date, Entity, Variable};
pub use series::{
    EntityStatVarExistence, ObsCollection, ObsTimeSeries, PlaceVariableFacetSummary, Point,
    SourceCohort, SourceSeries,
};
