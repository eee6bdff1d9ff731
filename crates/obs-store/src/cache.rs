use async_trait::async_trait;
use obs_types::ObsError;

use crate::keys::RowKey;
use crate::payload::{Decoder, Payload};

/// One import-group cache table (spec §4.3): a priority-ordered row store
/// decoded via a caller-supplied [`Decoder`].
#[async_trait]
pub trait CacheTable: Send + Sync {
    /// Stable name used to label returned rows with their origin.
    fn name(&self) -> &str;

    /// Lower priority values are read (and tie-broken) first; purely a
    /// labeling/ordering concern, not a correctness one — branch
    /// precedence is decided per-facet by `is_branch`, not by priority.
    fn priority(&self) -> u32;

    /// Whether this is the "branch" table: the freshest import, allowed
    /// to override other tables on a per-facet basis (spec §4.3, §4.4).
    fn is_branch(&self) -> bool;

    /// Fetches every row addressed by `keys`, decoding each with `decode`.
    /// Missing keys are simply absent from the result, not an error.
    async fn get_rows(
        &self,
        keys: &[RowKey],
        decode: Decoder,
    ) -> Result<Vec<(RowKey, Payload)>, ObsError>;
}

/// An in-memory `CacheTable` used by tests and, in a deployed gateway, as
/// the process-local L1 in front of a real wide-row backend. Keyed on the
/// exact `RowKey::key` string.
pub struct InMemoryCacheTable {
    name: String,
    priority: u32,
    is_branch: bool,
    rows: std::collections::HashMap<String, Vec<u8>>,
}

impl InMemoryCacheTable {
    pub fn new(name: impl Into<String>, priority: u32, is_branch: bool) -> Self {
        Self { name: name.into(), priority, is_branch, rows: std::collections::HashMap::new() }
    }

    pub fn insert_raw(&mut self, key: impl Into<String>, value: Vec<u8>) {
        self.rows.insert(key.into(), value);
    }
}

#[async_trait]
impl CacheTable for InMemoryCacheTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    fn is_branch(&self) -> bool {
        self.is_branch
    }

    async fn get_rows(
        &self,
        keys: &[RowKey],
        decode: Decoder,
    ) -> Result<Vec<(RowKey, Payload)>, ObsError> {
        let mut out = Vec::new();
        for key in keys {
            if let Some(raw) = self.rows.get(&key.key) {
                out.push((key.clone(), decode(raw)?));
            }
        }
        Ok(out)
    }
}
