//! Series merge, unit normalization, best-point picking, and within-place
//! collection resolution (spec §4.4, §4.5, §4.6).

pub mod collection;
pub mod merger;
pub mod picker;
pub mod units;

pub use collection::{CollectionResolver, ContainedInLookup};
pub use merger::{SeriesMerger, TaggedSeries};
pub use picker::BestPicker;
pub use units::UnitTable;
