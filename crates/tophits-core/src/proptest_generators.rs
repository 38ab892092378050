//! Property-based generators and reduce properties.
//!
//! Generates shard partials the way a coordinating node would receive them:
//! one shared window and sort declaration per reduction, every shard's hits
//! already ranked, typed sort values drawn per field type (with narrow ranges
//! mixed in so ties are common).

use std::cmp::Ordering;

use proptest::prelude::*;

use crate::hits::{HitPayload, TopHit, TopHitsMerged, TopHitsPartial};
use crate::sort::{SortField, SortFieldType, SortValue};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Shared proptest configuration.
pub fn proptest_config() -> ProptestConfig {
    ProptestConfig {
        cases: 256,
        max_shrink_iters: 2000,
        ..ProptestConfig::default()
    }
}

// ─── Leaf strategies ─────────────────────────────────────────────────────────

/// Any sort field type with a comparison policy.
pub fn arb_mergeable_type() -> impl Strategy<Value = SortFieldType> {
    let mergeable: Vec<SortFieldType> = SortFieldType::ALL
        .into_iter()
        .filter(|t| t.is_mergeable())
        .collect();
    proptest::sample::select(mergeable)
}

/// A sort declaration: empty (score ranking) or 1–5 typed fields.
pub fn arb_sort() -> impl Strategy<Value = Vec<SortField>> {
    prop_oneof![
        Just(Vec::<SortField>::new()),
        proptest::collection::vec((arb_mergeable_type(), any::<bool>()), 1..=5).prop_map(
            |fields| {
                fields
                    .into_iter()
                    .enumerate()
                    .map(|(i, (field_type, reverse))| {
                        let field = SortField::new(format!("field_{i}"), field_type);
                        if reverse { field.reversed() } else { field }
                    })
                    .collect()
            }
        ),
    ]
}

/// A value fitting `field_type`.
pub fn arb_sort_value(field_type: SortFieldType) -> BoxedStrategy<SortValue> {
    match field_type {
        SortFieldType::Score => (0.0f32..1.0).prop_map(SortValue::Float).boxed(),
        SortFieldType::Float => prop_oneof![-3.0f32..3.0, -1e6f32..1e6]
            .prop_map(SortValue::Float)
            .boxed(),
        SortFieldType::Double => prop_oneof![-3.0f64..3.0, -1e12f64..1e12]
            .prop_map(SortValue::Double)
            .boxed(),
        SortFieldType::Int => prop_oneof![-3i32..3, any::<i32>()]
            .prop_map(SortValue::Int)
            .boxed(),
        SortFieldType::Long => prop_oneof![-3i64..3, any::<i64>()]
            .prop_map(SortValue::Long)
            .boxed(),
        SortFieldType::Doc => (0i32..64).prop_map(SortValue::Doc).boxed(),
        SortFieldType::String | SortFieldType::StringVal => prop_oneof![
            4 => "[a-c]{1,2}".prop_map(SortValue::Str),
            1 => "[ -~]{5}".prop_map(SortValue::Str),
            1 => Just(SortValue::Missing),
        ]
        .boxed(),
        SortFieldType::Custom | SortFieldType::Rewriteable => {
            unreachable!("only mergeable types are generated")
        }
    }
}

/// A hit with one value per field of `sort`.
pub fn arb_hit(sort: &[SortField]) -> BoxedStrategy<TopHit> {
    let values: Vec<BoxedStrategy<SortValue>> =
        sort.iter().map(|f| arb_sort_value(f.field_type)).collect();
    (0i32..i32::MAX, prop_oneof![0.0f32..1.0, Just(0.5f32)], values)
        .prop_map(|(doc_id, score, values)| TopHit::new(doc_id, score).with_sort_values(values))
        .boxed()
}

// ─── Composite strategies ────────────────────────────────────────────────────

/// One shard's partial: up to `size` ranked hits and `total_hits >= hits`.
pub fn arb_partial(
    size: usize,
    sort: Vec<SortField>,
    shard: usize,
) -> impl Strategy<Value = TopHitsPartial> {
    proptest::collection::vec(arb_hit(&sort), 0..=size)
        .prop_flat_map(|hits| {
            let returned = hits.len() as u64;
            (Just(hits), returned..=500_000u64)
        })
        .prop_map(move |(mut hits, total_hits)| {
            hits.sort_by(|a, b| reference_cmp(&sort, a, b));
            for (i, hit) in hits.iter_mut().enumerate() {
                hit.payload = HitPayload::new(format!("s{shard}-h{i}"));
            }
            TopHitsPartial::from_hits(size, hits, total_hits).with_sort(sort.clone())
        })
}

/// 1–6 partials sharing a window (`size` 1–40) and sort declaration.
pub fn arb_partials() -> impl Strategy<Value = Vec<TopHitsPartial>> {
    (1usize..=40, arb_sort(), 1usize..=6).prop_flat_map(|(size, sort, shards)| {
        (0..shards)
            .map(|shard| arb_partial(size, sort.clone(), shard))
            .collect::<Vec<_>>()
    })
}

// ─── Reference ranking ───────────────────────────────────────────────────────

/// Ranking written out per value kind, kept separate from the comparators
/// under test.
pub fn reference_cmp(sort: &[SortField], a: &TopHit, b: &TopHit) -> Ordering {
    if sort.is_empty() {
        return b.score.total_cmp(&a.score);
    }
    for (i, field) in sort.iter().enumerate() {
        let ord = match (&a.sort_values[i], &b.sort_values[i]) {
            (SortValue::Float(x), SortValue::Float(y)) => {
                if field.field_type == SortFieldType::Score {
                    y.total_cmp(x)
                } else {
                    x.total_cmp(y)
                }
            }
            (SortValue::Double(x), SortValue::Double(y)) => x.total_cmp(y),
            (SortValue::Int(x), SortValue::Int(y)) | (SortValue::Doc(x), SortValue::Doc(y)) => {
                x.cmp(y)
            }
            (SortValue::Long(x), SortValue::Long(y)) => x.cmp(y),
            (SortValue::Str(x), SortValue::Str(y)) => x.cmp(y),
            (SortValue::Missing, SortValue::Missing) => Ordering::Equal,
            (SortValue::Missing, _) => Ordering::Less,
            (_, SortValue::Missing) => Ordering::Greater,
            (x, y) => unreachable!("mismatched kinds {x:?} / {y:?}"),
        };
        let ord = if field.reverse { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Payload ids the reduction of `partials` must return, in order.
pub fn expected_ids(partials: &[TopHitsPartial]) -> Vec<String> {
    let sort = &partials[0].sort;
    let size = partials[0].size;
    let mut all: Vec<(usize, &TopHit)> = partials
        .iter()
        .enumerate()
        .flat_map(|(shard, p)| p.hits.iter().map(move |h| (shard, h)))
        .collect();
    all.sort_by(|(sa, a), (sb, b)| reference_cmp(sort, a, b).then(sa.cmp(sb)));
    all.into_iter()
        .take(size)
        .map(|(_, h)| h.payload.id.clone())
        .collect()
}

fn ids(merged: &TopHitsMerged) -> Vec<String> {
    merged.hits.iter().map(|h| h.payload.id.clone()).collect()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comparator::{HitComparator, NaturalComparators};
    use crate::config::ReduceConfig;
    use crate::reduce::{TopHitsReducer, reduce};

    proptest! {
        #![proptest_config(proptest_config())]

        /// Reduced hits equal the reference ranking of every input hit.
        #[test]
        fn proptest_reduce_matches_reference(partials in arb_partials()) {
            let expected = expected_ids(&partials);
            let merged = reduce(partials).unwrap();
            prop_assert_eq!(ids(&merged), expected);
        }

        /// `total_hits` is the sum and `max_score` the max over all partials.
        #[test]
        fn proptest_counts_and_max_score(partials in arb_partials()) {
            let total: u64 = partials.iter().map(|p| p.total_hits).sum();
            let max = partials
                .iter()
                .filter_map(|p| p.max_score)
                .fold(None::<f32>, |acc, s| Some(acc.map_or(s, |a| a.max(s))));
            let merged = reduce(partials).unwrap();
            prop_assert_eq!(merged.total_hits, total);
            prop_assert_eq!(merged.max_score, max);
        }

        /// Output never exceeds the window nor the candidate count.
        #[test]
        fn proptest_size_bound(partials in arb_partials()) {
            let size = partials[0].size;
            let candidates: usize = partials.iter().map(|p| p.hits.len()).sum();
            let merged = reduce(partials).unwrap();
            prop_assert!(merged.hits.len() <= size);
            prop_assert_eq!(merged.hits.len(), size.min(candidates));
            prop_assert_eq!(merged.stats.candidates, candidates);
        }

        /// Adjacent output hits are never inverted under the shared comparator.
        #[test]
        fn proptest_no_inversions(partials in arb_partials()) {
            let sort = partials[0].sort.clone();
            let merged = reduce(partials).unwrap();
            let cmp = HitComparator::for_sort(&sort, &NaturalComparators).unwrap();
            for pair in merged.hits.windows(2) {
                prop_assert!(
                    cmp.compare(&pair[0], &pair[1]) != Ordering::Greater,
                    "inversion between {:?} and {:?}", pair[0].payload.id, pair[1].payload.id
                );
            }
        }

        /// A single partial reduces to its own hits, truncated, totals intact.
        #[test]
        fn proptest_single_partial_idempotent(partials in arb_partials()) {
            let only = partials.into_iter().next().unwrap();
            let expected: Vec<String> = only
                .hits
                .iter()
                .take(only.size)
                .map(|h| h.payload.id.clone())
                .collect();
            let (total, max) = (only.total_hits, only.max_score);
            let merged = reduce(vec![only]).unwrap();
            prop_assert_eq!(ids(&merged), expected);
            prop_assert_eq!(merged.total_hits, total);
            prop_assert_eq!(merged.max_score, max);
        }

        /// Tree reduction over contiguous groups ranks like a single stage.
        #[test]
        fn proptest_tree_matches_single_stage(
            partials in arb_partials(),
            fan_in in 2usize..=4,
        ) {
            let single = reduce(partials.clone()).unwrap();
            let tree = TopHitsReducer::new(ReduceConfig::default())
                .reduce_tree(partials, fan_in)
                .unwrap();
            prop_assert_eq!(ids(&tree), ids(&single));
            prop_assert_eq!(tree.total_hits, single.total_hits);
            prop_assert_eq!(tree.max_score, single.max_score);
        }

        /// Lenient tree reduction ranks like a single stage even when later
        /// partials ask for a different `size`.
        #[test]
        fn proptest_lenient_tree_matches_single_stage(
            partials in arb_partials(),
            sizes in proptest::collection::vec(0usize..=40, 6),
            fan_in in 2usize..=3,
        ) {
            let partials: Vec<TopHitsPartial> = partials
                .into_iter()
                .zip(sizes)
                .enumerate()
                .map(|(i, (mut partial, size))| {
                    if i > 0 {
                        partial.size = size;
                    }
                    partial
                })
                .collect();
            let reducer = TopHitsReducer::new(ReduceConfig {
                strict_window: false,
                ..ReduceConfig::default()
            });
            let single = reducer.reduce(partials.clone()).unwrap();
            let tree = reducer.reduce_tree(partials, fan_in).unwrap();
            prop_assert_eq!(ids(&tree), ids(&single));
            prop_assert_eq!(tree.size, single.size);
        }

        /// Generated partials pass strict order validation.
        #[test]
        fn proptest_generated_partials_are_ranked(partials in arb_partials()) {
            let reducer = TopHitsReducer::new(ReduceConfig {
                validate_shard_order: true,
                ..ReduceConfig::default()
            });
            prop_assert!(reducer.reduce(partials).is_ok());
        }
    }
}
