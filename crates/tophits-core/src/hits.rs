//! Top-hits data model
//!
//! [`TopHitsPartial`] is what one shard returns for a top-hits request.
//! [`TopHitsMerged`] is the output of reducing many partials. Both carry the
//! request window (`from`, `size`) and the shared sort declaration so that
//! merged results can be fed back into another reduction.

use std::collections::BTreeMap;
use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::error::ReduceResult;
use crate::sort::{SortField, SortValue};

/// Document payload returned alongside the ranking key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HitPayload {
    /// External document id
    pub id: String,
    /// Retrieved field values
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub fields: BTreeMap<String, serde_json::Value>,
}

impl HitPayload {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

/// One scored document as returned by a shard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopHit {
    /// Shard-local document number
    pub doc_id: i32,
    /// Relevance score
    pub score: f32,
    /// One value per declared sort field; empty for score-only ranking
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sort_values: Vec<SortValue>,
    #[serde(default)]
    pub payload: HitPayload,
    /// Position of the originating partial in the reduction that ranked this hit
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub shard_index: Option<u32>,
}

impl TopHit {
    #[must_use]
    pub fn new(doc_id: i32, score: f32) -> Self {
        Self {
            doc_id,
            score,
            sort_values: Vec::new(),
            payload: HitPayload::default(),
            shard_index: None,
        }
    }

    #[must_use]
    pub fn with_sort_values(mut self, sort_values: Vec<SortValue>) -> Self {
        self.sort_values = sort_values;
        self
    }

    #[must_use]
    pub fn with_payload(mut self, payload: HitPayload) -> Self {
        self.payload = payload;
        self
    }
}

/// A shard's answer to a top-hits request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopHitsPartial {
    /// Number of leading hits to skip in the final result
    #[serde(default)]
    pub from: usize,
    /// Requested number of hits
    pub size: usize,
    /// Sort declaration; empty means ranked by score
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sort: Vec<SortField>,
    /// Hits ranked by the shard
    #[serde(default)]
    pub hits: Vec<TopHit>,
    /// Number of documents the shard matched
    pub total_hits: u64,
    /// Highest score seen by the shard (`None` when it matched nothing)
    #[serde(default)]
    pub max_score: Option<f32>,
}

impl TopHitsPartial {
    /// Empty score-ranked partial for a `size`-hit request.
    #[must_use]
    pub const fn new(size: usize) -> Self {
        Self {
            from: 0,
            size,
            sort: Vec::new(),
            hits: Vec::new(),
            total_hits: 0,
            max_score: None,
        }
    }

    /// Partial holding `hits`, with `max_score` derived from them.
    #[must_use]
    pub fn from_hits(size: usize, hits: Vec<TopHit>, total_hits: u64) -> Self {
        let max_score = hits
            .iter()
            .map(|h| h.score)
            .fold(None::<f32>, |acc, s| Some(acc.map_or(s, |a| a.max(s))));
        Self {
            hits,
            total_hits,
            max_score,
            ..Self::new(size)
        }
    }

    #[must_use]
    pub fn with_sort(mut self, sort: Vec<SortField>) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn with_from(mut self, from: usize) -> Self {
        self.from = from;
        self
    }

    /// Whether hits are ranked by sort fields rather than score.
    #[must_use]
    pub fn is_sorted_by_fields(&self) -> bool {
        !self.sort.is_empty()
    }

    /// Number of hits a shard needs to return for the window to be exact.
    #[must_use]
    pub const fn window_len(&self) -> usize {
        self.from.saturating_add(self.size)
    }
}

/// Bookkeeping for one reduction stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReduceStats {
    /// Partials consumed
    pub partials: usize,
    /// Hits considered for ranking
    pub candidates: usize,
    /// Hits kept in the result
    pub returned: usize,
}

/// The globally ranked result of reducing shard partials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopHitsMerged {
    pub from: usize,
    pub size: usize,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub sort: Vec<SortField>,
    /// Globally ranked hits, at most `size`
    pub hits: Vec<TopHit>,
    /// Sum of every partial's `total_hits`
    pub total_hits: u64,
    /// Maximum of every partial's `max_score`
    pub max_score: Option<f32>,
    #[serde(default)]
    pub stats: ReduceStats,
}

impl TopHitsMerged {
    /// Turn this result into a partial for a further reduction stage.
    ///
    /// Shard tags are cleared; the next stage assigns its own. `from` is kept
    /// as is, so the next stage skips it again. Only feed back results that
    /// still hold the leading `from` hits (the intermediate stages of
    /// [`reduce_tree`](crate::reduce::TopHitsReducer::reduce_tree)); a result
    /// of [`reduce`](crate::reduce::TopHitsReducer::reduce) with `from > 0`
    /// has already dropped them.
    #[must_use]
    pub fn into_partial(self) -> TopHitsPartial {
        let hits = self
            .hits
            .into_iter()
            .map(|mut hit| {
                hit.shard_index = None;
                hit
            })
            .collect();
        TopHitsPartial {
            from: self.from,
            size: self.size,
            sort: self.sort,
            hits,
            total_hits: self.total_hits,
            max_score: self.max_score,
        }
    }

    /// Payload ids in rank order.
    #[must_use]
    pub fn hit_ids(&self) -> Vec<&str> {
        self.hits.iter().map(|h| h.payload.id.as_str()).collect()
    }
}

/// Read a JSON array of partials, as shards hand them to a coordinator.
///
/// # Errors
/// [`ReduceError::Io`](crate::error::ReduceError::Io) when `reader` fails,
/// [`ReduceError::Serialization`](crate::error::ReduceError::Serialization)
/// when the text is not an array of partials.
pub fn read_partials<R: Read>(mut reader: R) -> ReduceResult<Vec<TopHitsPartial>> {
    let mut text = String::new();
    reader.read_to_string(&mut text)?;
    Ok(serde_json::from_str(&text)?)
}
