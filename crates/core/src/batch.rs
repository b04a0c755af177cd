//! Chunked batch processing over property collections.
//!
//! Provides order-preserving chunked mapping with progress reporting (sync,
//! and async with a yield point per chunk), stable grouping, non-mutating
//! bulk updates, filtering, and the validate / auto-fix compositions used
//! by bulk-editing workflows.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::types::{PropertyPatch, PropertyRecord};
use crate::validation::{ValidationResult, ValidationRuleEngine};

/// Default number of items handled between progress reports.
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Progress callback receiving `(processed, total)`.
pub type ProgressFn<'a> = &'a mut (dyn FnMut(usize, usize) + Send);

/// A record predicate used by [`BatchProcessor::filter_batch`].
pub type RecordFilter<'a> = &'a dyn Fn(&PropertyRecord) -> bool;

// ---------------------------------------------------------------------------
// Options and outcomes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    /// Map the whole collection in one pass and report progress once.
    pub parallel: bool,
    /// Items per chunk in sequential mode. Zero is treated as one.
    pub chunk_size: usize,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl BatchOptions {
    pub fn chunked(chunk_size: usize) -> Self {
        Self {
            parallel: false,
            chunk_size,
        }
    }

    pub fn parallel() -> Self {
        Self {
            parallel: true,
            ..Self::default()
        }
    }

    fn effective_chunk_size(&self) -> usize {
        self.chunk_size.max(1)
    }
}

/// Records partitioned by validation outcome.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationPartition {
    pub valid: Vec<PropertyRecord>,
    pub invalid: Vec<PropertyRecord>,
    pub results: Vec<ValidationResult>,
}

/// Records partitioned by whether auto-fix changed them.
///
/// `unchanged` includes records that had nothing to fix; it keeps the
/// `unfixable` name on the wire for existing consumers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AutoFixBatch {
    pub fixed: Vec<PropertyRecord>,
    #[serde(rename = "unfixable")]
    pub unchanged: Vec<PropertyRecord>,
    pub fixed_issue_count: usize,
}

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Group records by key. Groups appear in order of first key occurrence and
/// members keep their input order.
pub fn group_by_key<K, F>(
    records: &[PropertyRecord],
    mut key_selector: F,
) -> Vec<(K, Vec<PropertyRecord>)>
where
    K: Eq + Hash + Clone,
    F: FnMut(&PropertyRecord) -> K,
{
    let mut index: HashMap<K, usize> = HashMap::new();
    let mut groups: Vec<(K, Vec<PropertyRecord>)> = Vec::new();

    for record in records {
        let key = key_selector(record);
        match index.get(&key) {
            Some(&i) => groups[i].1.push(record.clone()),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![record.clone()]));
            }
        }
    }

    groups
}

// ---------------------------------------------------------------------------
// BatchProcessor
// ---------------------------------------------------------------------------

/// Bulk operations over property collections, sharing one validation engine.
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    validator: Arc<ValidationRuleEngine>,
}

impl BatchProcessor {
    pub fn new(validator: Arc<ValidationRuleEngine>) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &ValidationRuleEngine {
        &self.validator
    }

    /// Map `f` over `items` chunk by chunk, reporting cumulative progress
    /// after every chunk. Output order always matches input order.
    pub fn process_batch<T, R>(
        &self,
        items: &[T],
        mut f: impl FnMut(&T) -> R,
        options: BatchOptions,
        mut on_progress: Option<ProgressFn<'_>>,
    ) -> Vec<R> {
        let total = items.len();

        if options.parallel {
            let out: Vec<R> = items.iter().map(&mut f).collect();
            if let Some(progress) = on_progress.as_deref_mut() {
                progress(total, total);
            }
            return out;
        }

        let mut out = Vec::with_capacity(total);
        for chunk in items.chunks(options.effective_chunk_size()) {
            out.extend(chunk.iter().map(&mut f));
            if let Some(progress) = on_progress.as_deref_mut() {
                progress(out.len(), total);
            }
        }
        out
    }

    /// Async variant of [`process_batch`](Self::process_batch) that yields to
    /// the runtime after each chunk and stops at the next chunk boundary once
    /// `cancel` fires.
    pub async fn process_batch_yielding<T, R>(
        &self,
        items: &[T],
        mut f: impl FnMut(&T) -> R,
        options: BatchOptions,
        mut on_progress: Option<ProgressFn<'_>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Vec<R>, CoreError> {
        let total = items.len();
        let is_cancelled = || cancel.is_some_and(|c| c.is_cancelled());

        if options.parallel {
            if is_cancelled() {
                return Err(CoreError::Cancelled { processed: 0, total });
            }
            let out: Vec<R> = items.iter().map(&mut f).collect();
            if let Some(progress) = on_progress.as_deref_mut() {
                progress(total, total);
            }
            return Ok(out);
        }

        let mut out = Vec::with_capacity(total);
        for chunk in items.chunks(options.effective_chunk_size()) {
            if is_cancelled() {
                return Err(CoreError::Cancelled {
                    processed: out.len(),
                    total,
                });
            }
            out.extend(chunk.iter().map(&mut f));
            if let Some(progress) = on_progress.as_deref_mut() {
                progress(out.len(), total);
            }
            tokio::task::yield_now().await;
        }
        Ok(out)
    }

    /// Stable grouping, see [`group_by_key`].
    pub fn group_properties<K, F>(
        &self,
        records: &[PropertyRecord],
        key_selector: F,
    ) -> Vec<(K, Vec<PropertyRecord>)>
    where
        K: Eq + Hash + Clone,
        F: FnMut(&PropertyRecord) -> K,
    {
        group_by_key(records, key_selector)
    }

    /// Return new records with each record's patch merged in.
    pub fn apply_batch_update(
        &self,
        records: &[PropertyRecord],
        mut update_fn: impl FnMut(&PropertyRecord) -> PropertyPatch,
    ) -> Vec<PropertyRecord> {
        records
            .iter()
            .map(|r| {
                let patch = update_fn(r);
                r.merged(&patch)
            })
            .collect()
    }

    /// Keep records that satisfy every filter.
    pub fn filter_batch(
        &self,
        records: &[PropertyRecord],
        filters: &[RecordFilter<'_>],
    ) -> Vec<PropertyRecord> {
        records
            .iter()
            .filter(|r| filters.iter().all(|f| f(r)))
            .cloned()
            .collect()
    }

    /// Keep records whose id is in `ids`. Records without an id never match.
    pub fn select_by_ids(
        &self,
        records: &[PropertyRecord],
        ids: &HashSet<String>,
    ) -> Vec<PropertyRecord> {
        records
            .iter()
            .filter(|r| r.id.as_ref().is_some_and(|id| ids.contains(id)))
            .cloned()
            .collect()
    }

    pub fn validate_and_group(&self, records: &[PropertyRecord]) -> ValidationPartition {
        partition_results(self.validator.validate_batch(records))
    }

    /// Auto-fix each record; a record counts as fixed iff it changed.
    pub fn auto_fix_batch(&self, records: &[PropertyRecord]) -> AutoFixBatch {
        let mut batch = AutoFixBatch {
            fixed: Vec::new(),
            unchanged: Vec::new(),
            fixed_issue_count: 0,
        };

        for record in records {
            let outcome = self.validator.auto_fix(record);
            batch.fixed_issue_count += outcome.fixed_issues.len();
            if outcome.record != *record {
                batch.fixed.push(outcome.record);
            } else {
                batch.unchanged.push(outcome.record);
            }
        }

        batch
    }
}

/// Split already computed validation results into valid and invalid records.
pub fn partition_results(results: Vec<ValidationResult>) -> ValidationPartition {
    let (valid, invalid) = results
        .iter()
        .map(|r| (r.is_valid, r.record.clone()))
        .partition::<Vec<_>, _>(|(is_valid, _)| *is_valid);

    ValidationPartition {
        valid: valid.into_iter().map(|(_, r)| r).collect(),
        invalid: invalid.into_iter().map(|(_, r)| r).collect(),
        results,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
