//! Pure, deterministic facet ranking and filtering (spec §4.1, §4.2).
//!
//! Nothing in this crate performs I/O or suspends; it is the "pure CPU"
//! half of the engine referenced by spec §5.

pub mod filter;
pub mod order;
pub mod table;

pub use filter::apply_facet_filter;
pub use order::Ranker;
pub use table::{RankTable, BASE_RANK, INFERIOR_THRESHOLD};
