//! Reduction of shard partials into one globally ranked top-hits result.
//!
//! Every hit from every partial becomes a candidate tagged with the input
//! position of its partial. Candidates are stable-sorted by the shared
//! [`HitComparator`], so hits that tie on their ranking key keep shard order
//! first and then the order their shard returned them in. The `from`/`size`
//! window is applied after ranking.
//!
//! `total_hits` is summed and `max_score` is the maximum over all partials,
//! including partials that returned no hits.

use tracing::{debug, debug_span, warn};

use crate::comparator::{ComparatorSource, HitComparator, NaturalComparators};
use crate::config::ReduceConfig;
use crate::error::{ReduceError, ReduceResult};
use crate::hits::{ReduceStats, TopHit, TopHitsMerged, TopHitsPartial};
use crate::sort::describe_sort;

/// Merges top-hits partials with an injected comparison policy.
#[derive(Debug, Clone, Default)]
pub struct TopHitsReducer<S = NaturalComparators> {
    config: ReduceConfig,
    source: S,
}

impl TopHitsReducer<NaturalComparators> {
    /// Reducer using the built-in per-type comparators.
    #[must_use]
    pub const fn new(config: ReduceConfig) -> Self {
        Self {
            config,
            source: NaturalComparators,
        }
    }
}

impl<S: ComparatorSource> TopHitsReducer<S> {
    /// Reducer resolving sort-field comparators through `source`.
    #[must_use]
    pub const fn with_source(config: ReduceConfig, source: S) -> Self {
        Self { config, source }
    }

    #[must_use]
    pub const fn config(&self) -> &ReduceConfig {
        &self.config
    }

    /// Reduce `partials` into one result holding hits `from..from + size`.
    ///
    /// # Errors
    /// - [`ReduceError::NoPartials`] for empty input
    /// - [`ReduceError::TooManyPartials`] above the configured limit
    /// - [`ReduceError::WindowMismatch`] / [`ReduceError::SortMismatch`] when
    ///   partials disagree on the request
    /// - [`ReduceError::UnsupportedSortType`] / [`ReduceError::InvalidSortValue`]
    ///   when sort keys cannot be ranked
    /// - [`ReduceError::UnorderedPartial`] when order validation is enabled
    pub fn reduce(&self, partials: Vec<TopHitsPartial>) -> ReduceResult<TopHitsMerged> {
        let window = Window::of(&partials)?;
        self.merge(partials, window, true)
    }

    /// Reduce in groups of `fan_in`, then reduce the group results.
    ///
    /// Groups are contiguous runs of the input, so ties resolve exactly as in
    /// a single-stage [`reduce`](Self::reduce). Every stage uses the window of
    /// the first input partial, including groups that start with a partial
    /// whose window differs (lenient mode). The returned stats describe the
    /// final stage, except `partials` which counts the original input.
    ///
    /// # Errors
    /// [`ReduceError::InvalidFanIn`] when `fan_in < 2`, plus every error of
    /// [`reduce`](Self::reduce).
    pub fn reduce_tree(
        &self,
        partials: Vec<TopHitsPartial>,
        fan_in: usize,
    ) -> ReduceResult<TopHitsMerged> {
        if fan_in < 2 {
            return Err(ReduceError::InvalidFanIn(fan_in));
        }
        let window = Window::of(&partials)?;
        let original = partials.len();
        let mut level = partials;
        let mut depth = 0usize;
        while level.len() > fan_in {
            depth += 1;
            let mut next = Vec::with_capacity(level.len().div_ceil(fan_in));
            let mut groups = level.into_iter();
            loop {
                let group: Vec<TopHitsPartial> = groups.by_ref().take(fan_in).collect();
                if group.is_empty() {
                    break;
                }
                // Keep the whole window so the final stage can still skip `from`.
                next.push(self.merge(group, window, false)?.into_partial());
            }
            debug!(depth, groups = next.len(), "tree reduce level done");
            level = next;
        }
        let mut merged = self.merge(level, window, true)?;
        merged.stats.partials = original;
        Ok(merged)
    }

    fn merge(
        &self,
        partials: Vec<TopHitsPartial>,
        window: Window,
        apply_offset: bool,
    ) -> ReduceResult<TopHitsMerged> {
        let _span = debug_span!("tophits.reduce", partials = partials.len()).entered();

        let Some(first) = partials.first() else {
            return Err(ReduceError::NoPartials);
        };
        if self.config.exceeds_partial_limit(partials.len()) {
            return Err(ReduceError::TooManyPartials {
                count: partials.len(),
                limit: self.config.max_partials,
            });
        }

        let Window { from, size } = window;
        let sort = first.sort.clone();
        let comparator = HitComparator::for_sort(&sort, &self.source)?;

        let partial_count = partials.len();
        let capacity = partials.iter().map(|p| p.hits.len()).sum();
        let mut candidates: Vec<TopHit> = Vec::with_capacity(capacity);
        let mut total_hits: u64 = 0;
        let mut max_score: Option<f32> = None;

        for (shard_index, partial) in partials.into_iter().enumerate() {
            self.check_window(shard_index, &partial, from, size)?;
            if partial.sort != sort {
                return Err(ReduceError::SortMismatch {
                    shard_index,
                    expected: describe_sort(&sort),
                    found: describe_sort(&partial.sort),
                });
            }
            for hit in &partial.hits {
                comparator.validate(hit, shard_index)?;
            }
            if self.config.validate_shard_order {
                check_ranked(&comparator, &partial.hits, shard_index)?;
            }
            if partial.hits.len() > partial.window_len() {
                warn!(
                    shard_index,
                    hits = partial.hits.len(),
                    window = partial.window_len(),
                    "partial returned more hits than requested"
                );
            }
            if (partial.hits.len() as u64) > partial.total_hits {
                warn!(
                    shard_index,
                    hits = partial.hits.len(),
                    total_hits = partial.total_hits,
                    "partial reports fewer total hits than it returned"
                );
            }

            total_hits = total_hits.saturating_add(partial.total_hits);
            max_score = max_of(max_score, partial.max_score);

            let tag = u32::try_from(shard_index).map_err(|_| ReduceError::TooManyPartials {
                count: partial_count,
                limit: u32::MAX as usize,
            })?;
            candidates.extend(partial.hits.into_iter().map(|mut hit| {
                hit.shard_index = Some(tag);
                hit
            }));
        }

        let candidate_count = candidates.len();
        // `sort_by` is stable: equal keys from one shard keep that shard's order.
        candidates.sort_by(|a, b| comparator.compare(a, b));

        let (skip, take) = if apply_offset {
            (from, size)
        } else {
            (0, from.saturating_add(size))
        };
        let hits: Vec<TopHit> = candidates.into_iter().skip(skip).take(take).collect();

        debug!(
            partials = partial_count,
            candidates = candidate_count,
            returned = hits.len(),
            total_hits,
            "reduced top hits"
        );

        Ok(TopHitsMerged {
            from,
            size,
            sort,
            stats: ReduceStats {
                partials: partial_count,
                candidates: candidate_count,
                returned: hits.len(),
            },
            hits,
            total_hits,
            max_score,
        })
    }

    fn check_window(
        &self,
        shard_index: usize,
        partial: &TopHitsPartial,
        from: usize,
        size: usize,
    ) -> ReduceResult<()> {
        if partial.from == from && partial.size == size {
            return Ok(());
        }
        if self.config.strict_window {
            return Err(ReduceError::WindowMismatch {
                shard_index,
                expected_from: from,
                expected_size: size,
                found_from: partial.from,
                found_size: partial.size,
            });
        }
        warn!(
            shard_index,
            expected_from = from,
            expected_size = size,
            found_from = partial.from,
            found_size = partial.size,
            "partial window differs; using the first partial's window"
        );
        Ok(())
    }
}

/// The `from`/`size` window every stage of one reduction applies.
#[derive(Debug, Clone, Copy)]
struct Window {
    from: usize,
    size: usize,
}

impl Window {
    /// Window of the first partial.
    fn of(partials: &[TopHitsPartial]) -> ReduceResult<Self> {
        partials
            .first()
            .map(|first| Self {
                from: first.from,
                size: first.size,
            })
            .ok_or(ReduceError::NoPartials)
    }
}

/// Reduce with the default configuration and comparators.
///
/// # Errors
/// See [`TopHitsReducer::reduce`].
pub fn reduce(partials: Vec<TopHitsPartial>) -> ReduceResult<TopHitsMerged> {
    TopHitsReducer::new(ReduceConfig::default()).reduce(partials)
}

fn check_ranked(
    comparator: &HitComparator,
    hits: &[TopHit],
    shard_index: usize,
) -> ReduceResult<()> {
    match hits
        .windows(2)
        .position(|pair| comparator.compare_keys(&pair[0], &pair[1]).is_gt())
    {
        Some(position) => Err(ReduceError::UnorderedPartial {
            shard_index,
            position: position + 1,
        }),
        None => Ok(()),
    }
}

fn max_of(acc: Option<f32>, next: Option<f32>) -> Option<f32> {
    match (acc, next) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}
