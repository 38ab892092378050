//! Per-field comparison strategies and the shared hit comparator
//!
//! A [`ComparatorSource`] resolves one [`SortValueComparator`] per declared
//! [`SortField`]. [`NaturalComparators`] is the built-in source; callers that
//! rank by engine-specific rules inject their own.
//!
//! [`HitComparator`] combines the per-field strategies into the single order
//! every shard shares:
//! 1. score descending (score-only ranking), or each sort field in declared
//!    order (first non-equal field decides, `reverse` inverts a field)
//! 2. origin shard index ascending

use std::cmp::Ordering;
use std::fmt;

use crate::error::{ReduceError, ReduceResult};
use crate::hits::TopHit;
use crate::sort::{SortField, SortFieldType, SortValue};

/// Natural ordering of values for one sort field.
pub trait SortValueComparator: fmt::Debug + Send + Sync {
    /// Whether `value` can be ranked by this comparator.
    fn accepts(&self, value: &SortValue) -> bool;

    /// Compare two accepted values. Lower sorts first.
    fn compare_values(&self, left: &SortValue, right: &SortValue) -> Ordering;
}

/// Resolves the comparison strategy for a sort field.
pub trait ComparatorSource: Send + Sync {
    /// # Errors
    /// Returns [`ReduceError::UnsupportedSortType`] when the field type has no
    /// comparison policy.
    fn comparator_for(&self, field: &SortField) -> ReduceResult<Box<dyn SortValueComparator>>;
}

/// Built-in comparison policy per [`SortFieldType`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NaturalComparators;

impl ComparatorSource for NaturalComparators {
    fn comparator_for(&self, field: &SortField) -> ReduceResult<Box<dyn SortValueComparator>> {
        let comparator: Box<dyn SortValueComparator> = match field.field_type {
            SortFieldType::Score => Box::new(RelevanceComparator),
            SortFieldType::Doc => Box::new(DocOrderComparator),
            SortFieldType::String | SortFieldType::StringVal => Box::new(TermComparator),
            SortFieldType::Int => Box::new(IntComparator),
            SortFieldType::Long => Box::new(LongComparator),
            SortFieldType::Float => Box::new(FloatComparator),
            SortFieldType::Double => Box::new(DoubleComparator),
            SortFieldType::Custom | SortFieldType::Rewriteable => {
                return Err(ReduceError::UnsupportedSortType {
                    field: field.field.clone(),
                    field_type: field.field_type,
                });
            }
        };
        Ok(comparator)
    }
}

/// Score values: higher first.
#[derive(Debug)]
struct RelevanceComparator;

impl SortValueComparator for RelevanceComparator {
    fn accepts(&self, value: &SortValue) -> bool {
        matches!(value, SortValue::Float(_))
    }

    fn compare_values(&self, left: &SortValue, right: &SortValue) -> Ordering {
        match (left, right) {
            (SortValue::Float(l), SortValue::Float(r)) => r.total_cmp(l),
            _ => Ordering::Equal,
        }
    }
}

#[derive(Debug)]
struct DocOrderComparator;

impl SortValueComparator for DocOrderComparator {
    fn accepts(&self, value: &SortValue) -> bool {
        matches!(value, SortValue::Doc(_))
    }

    fn compare_values(&self, left: &SortValue, right: &SortValue) -> Ordering {
        match (left, right) {
            (SortValue::Doc(l), SortValue::Doc(r)) => l.cmp(r),
            _ => Ordering::Equal,
        }
    }
}

/// Keywords compare bytewise; a missing value sorts before any term.
#[derive(Debug)]
struct TermComparator;

impl SortValueComparator for TermComparator {
    fn accepts(&self, value: &SortValue) -> bool {
        matches!(value, SortValue::Str(_) | SortValue::Missing)
    }

    fn compare_values(&self, left: &SortValue, right: &SortValue) -> Ordering {
        match (left, right) {
            (SortValue::Str(l), SortValue::Str(r)) => l.as_bytes().cmp(r.as_bytes()),
            (SortValue::Missing, SortValue::Missing) => Ordering::Equal,
            (SortValue::Missing, _) => Ordering::Less,
            (_, SortValue::Missing) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }
}

#[derive(Debug)]
struct IntComparator;

impl SortValueComparator for IntComparator {
    fn accepts(&self, value: &SortValue) -> bool {
        matches!(value, SortValue::Int(_))
    }

    fn compare_values(&self, left: &SortValue, right: &SortValue) -> Ordering {
        match (left, right) {
            (SortValue::Int(l), SortValue::Int(r)) => l.cmp(r),
            _ => Ordering::Equal,
        }
    }
}

#[derive(Debug)]
struct LongComparator;

impl SortValueComparator for LongComparator {
    fn accepts(&self, value: &SortValue) -> bool {
        matches!(value, SortValue::Long(_))
    }

    fn compare_values(&self, left: &SortValue, right: &SortValue) -> Ordering {
        match (left, right) {
            (SortValue::Long(l), SortValue::Long(r)) => l.cmp(r),
            _ => Ordering::Equal,
        }
    }
}

/// Floats use the IEEE total order, so `-0.0 < 0.0` and NaN sorts last.
#[derive(Debug)]
struct FloatComparator;

impl SortValueComparator for FloatComparator {
    fn accepts(&self, value: &SortValue) -> bool {
        matches!(value, SortValue::Float(_))
    }

    fn compare_values(&self, left: &SortValue, right: &SortValue) -> Ordering {
        match (left, right) {
            (SortValue::Float(l), SortValue::Float(r)) => l.total_cmp(r),
            _ => Ordering::Equal,
        }
    }
}

#[derive(Debug)]
struct DoubleComparator;

impl SortValueComparator for DoubleComparator {
    fn accepts(&self, value: &SortValue) -> bool {
        matches!(value, SortValue::Double(_))
    }

    fn compare_values(&self, left: &SortValue, right: &SortValue) -> Ordering {
        match (left, right) {
            (SortValue::Double(l), SortValue::Double(r)) => l.total_cmp(r),
            _ => Ordering::Equal,
        }
    }
}

#[derive(Debug)]
struct FieldOrder {
    comparator: Box<dyn SortValueComparator>,
    reverse: bool,
}

/// The single ranking order shared by all shards of one request.
#[derive(Debug)]
pub struct HitComparator {
    fields: Vec<FieldOrder>,
}

impl HitComparator {
    /// Resolve a comparator for `sort`. An empty declaration ranks by score.
    ///
    /// # Errors
    /// Propagates [`ReduceError::UnsupportedSortType`] from `source`.
    pub fn for_sort(sort: &[SortField], source: &dyn ComparatorSource) -> ReduceResult<Self> {
        let fields = sort
            .iter()
            .map(|field| {
                Ok(FieldOrder {
                    comparator: source.comparator_for(field)?,
                    reverse: field.reverse,
                })
            })
            .collect::<ReduceResult<Vec<_>>>()?;
        Ok(Self { fields })
    }

    /// True when hits are ranked by score alone.
    #[must_use]
    pub fn is_score_only(&self) -> bool {
        self.fields.is_empty()
    }

    /// Check that `hit` carries exactly one acceptable value per sort field.
    ///
    /// # Errors
    /// Returns [`ReduceError::InvalidSortValue`] naming the offending value.
    pub fn validate(&self, hit: &TopHit, shard_index: usize) -> ReduceResult<()> {
        let invalid = |reason: String| ReduceError::InvalidSortValue {
            shard_index,
            doc_id: hit.doc_id,
            reason,
        };
        if hit.sort_values.len() != self.fields.len() {
            return Err(invalid(format!(
                "expected {} sort values, found {}",
                self.fields.len(),
                hit.sort_values.len()
            )));
        }
        for (idx, (field, value)) in self.fields.iter().zip(&hit.sort_values).enumerate() {
            if !field.comparator.accepts(value) {
                return Err(invalid(format!(
                    "value {idx} of kind {} rejected by {:?}",
                    value.kind(),
                    field.comparator
                )));
            }
        }
        Ok(())
    }

    /// Compare ranking keys only (score or sort values), ignoring shard index.
    #[must_use]
    pub fn compare_keys(&self, left: &TopHit, right: &TopHit) -> Ordering {
        if self.fields.is_empty() {
            return right.score.total_cmp(&left.score);
        }
        for (field, (l, r)) in self
            .fields
            .iter()
            .zip(left.sort_values.iter().zip(&right.sort_values))
        {
            let ord = field.comparator.compare_values(l, r);
            let ord = if field.reverse { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    /// Full ranking order: keys, then origin shard index ascending.
    #[must_use]
    pub fn compare(&self, left: &TopHit, right: &TopHit) -> Ordering {
        self.compare_keys(left, right)
            .then_with(|| left.shard_index.cmp(&right.shard_index))
    }
}
