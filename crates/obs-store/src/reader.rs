use std::sync::Arc;

use obs_types::{ObsError, RequestContext};
use tokio::task::JoinSet;
use tracing::instrument;

use crate::cache::CacheTable;
use crate::keys::RowKey;
use crate::payload::{Decoder, Payload};
use crate::relational::RelationalStore;

/// One cache table's contribution to a `StoreGroup::read` call, labeled
/// with its origin (spec §4.3: "labels each result with its origin").
#[derive(Debug, Clone)]
pub struct TableRows {
    pub table_name: String,
    pub is_branch: bool,
    pub rows: Vec<(RowKey, Payload)>,
}

/// An ordered list of backing stores (spec §4.3), fanned out to in
/// parallel under a shared `RequestContext`.
///
/// `cache_tables` preserves the caller's priority order; `read` returns
/// results in that same order regardless of which table's task finishes
/// first — ordering of the *output* is independent of read completion
/// order (spec §5), only the concurrent scheduling is unordered.
pub struct StoreGroup {
    cache_tables: Vec<Arc<dyn CacheTable>>,
    relational: Option<Arc<dyn RelationalStore>>,
}

impl StoreGroup {
    pub fn new(cache_tables: Vec<Arc<dyn CacheTable>>, relational: Option<Arc<dyn RelationalStore>>) -> Self {
        Self { cache_tables, relational }
    }

    pub fn relational(&self) -> Option<&Arc<dyn RelationalStore>> {
        self.relational.as_ref()
    }

    pub fn cache_tables(&self) -> &[Arc<dyn CacheTable>] {
        &self.cache_tables
    }

    /// Ships `keys` in parallel to every cache table, decodes each row
    /// with `decode`, and returns one `TableRows` per table in the
    /// group's declared order. A single table error, or a cancelled
    /// context, fails the whole operation (spec §4.3, §5).
    #[instrument(skip(self, keys, decode), fields(table_count = self.cache_tables.len(), key_count = keys.len()))]
    pub async fn read(
        &self,
        ctx: &RequestContext,
        keys: Vec<RowKey>,
        decode: Decoder,
    ) -> Result<Vec<TableRows>, ObsError> {
        ctx.check()?;
        if self.cache_tables.is_empty() {
            return Ok(Vec::new());
        }

        let mut set: JoinSet<(usize, Result<Vec<(RowKey, Payload)>, ObsError>)> = JoinSet::new();
        for (index, table) in self.cache_tables.iter().cloned().enumerate() {
            let keys = keys.clone();
            set.spawn(async move {
                let result = table.get_rows(&keys, decode).await;
                (index, result)
            });
        }

        let mut slots: Vec<Option<TableRows>> = (0..self.cache_tables.len()).map(|_| None).collect();
        loop {
            if slots.iter().all(Option::is_some) {
                break;
            }
            tokio::select! {
                biased;
                () = ctx.cancelled() => {
                    set.abort_all();
                    return Err(ObsError::Cancelled);
                }
                joined = set.join_next() => {
                    match joined {
                        None => break,
                        Some(Ok((index, Ok(rows)))) => {
                            let table = &self.cache_tables[index];
                            slots[index] = Some(TableRows {
                                table_name: table.name().to_owned(),
                                is_branch: table.is_branch(),
                                rows,
                            });
                        }
                        Some(Ok((_, Err(err)))) => {
                            set.abort_all();
                            return Err(err);
                        }
                        Some(Err(join_err)) => {
                            set.abort_all();
                            return Err(ObsError::internal(format!(
                                "cache table read task panicked: {join_err}"
                            )));
                        }
                    }
                }
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }
}
