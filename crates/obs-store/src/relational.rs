use async_trait::async_trait;
use obs_types::{Entity, ObsError, ObsTimeSeries, Variable};

/// Interface onto the SQL-backed relational store (spec §4.3): "details
/// outside the core; the core sees only a request/response interface
/// expressed as a trait." The actual SQL translation lives in an
/// external collaborator.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    fn name(&self) -> &str;

    async fn query_series(
        &self,
        entities: &[Entity],
        variables: &[Variable],
    ) -> Result<Vec<ObsTimeSeries>, ObsError>;
}

/// A relational store with no rows; used where a deployment has no
/// user-supplied data configured, or by tests exercising only the cache
/// path.
pub struct EmptyRelationalStore;

#[async_trait]
impl RelationalStore for EmptyRelationalStore {
    fn name(&self) -> &str {
        "empty-relational"
    }

    async fn query_series(
        &self,
        _entities: &[Entity],
        _variables: &[Variable],
    ) -> Result<Vec<ObsTimeSeries>, ObsError> {
        Ok(Vec::new())
    }
}
