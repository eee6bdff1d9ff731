//! Parallel fan-out reads across ordered backing stores (spec §4.3).

pub mod cache;
pub mod keys;
pub mod payload;
pub mod reader;
pub mod relational;

pub use cache::{CacheTable, InMemoryCacheTable};
pub use keys::{RowKey, COLLECTION_PREFIX, LATEST, METADATA_PREFIX, SERIES_PREFIX};
pub use payload::{Decoder, Payload};
pub use reader::{StoreGroup, TableRows};
pub use relational::{EmptyRelationalStore, RelationalStore};
