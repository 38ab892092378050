//! Top-hits reduction for sharded search
//!
//! Each shard answers a top-hits request with a [`TopHitsPartial`]: its best
//! hits, how many documents it matched, and its highest score. This crate
//! merges those partials into one globally ranked [`TopHitsMerged`]:
//! - [`reduce`] / [`TopHitsReducer`]: the reducer (single stage or tree)
//! - [`SortField`] / [`SortValue`]: typed sort declarations and keys
//! - [`ComparatorSource`]: injectable per-field comparison policy
//! - [`ReduceConfig`]: environment/file driven reducer settings

#![forbid(unsafe_code)]

pub mod comparator;
pub mod config;
pub mod error;
pub mod hits;
pub mod reduce;
pub mod sort;

#[cfg(test)]
mod proptest_generators;

pub use comparator::{ComparatorSource, HitComparator, NaturalComparators, SortValueComparator};
pub use config::{
    ConfigOverrides, MAX_PARTIALS_ENV, ReduceConfig, STRICT_WINDOW_ENV, VALIDATE_SHARD_ORDER_ENV,
};
pub use error::{ReduceError, ReduceResult};
pub use hits::{HitPayload, ReduceStats, TopHit, TopHitsMerged, TopHitsPartial, read_partials};
pub use reduce::{TopHitsReducer, reduce};
pub use sort::{SortField, SortFieldType, SortValue, describe_sort};
