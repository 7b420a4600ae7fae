// File: src/core/terms.rs
use crate::core::types::{Record, RecordIndex};
use std::collections::HashMap;

/// Page size used when a caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Clamps the page `[low, low + size)` to `[0, max)`.
///
/// Never panics and never returns `from > upto`; a `low` past the end yields
/// the empty range `(max, max)`.
pub fn clamp_range(low: usize, size: usize, max: usize) -> (usize, usize) {
    let from = low.min(max);
    let upto = low.saturating_add(size).min(max);
    (from, upto)
}

/// A distinct input string and the number of records sharing it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermFrequency {
    pub term: String,
    pub freq: usize,
}

/// One record that carries a looked-up term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub index: RecordIndex,
    /// The record's own id, if it has one.
    pub source_id: Option<String>,
    pub restricted: bool,
    pub answered: bool,
}

/// A page of occurrences for one term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermPage {
    pub term: String,
    pub from: usize,
    pub size: usize,
    /// Occurrences across all pages.
    pub total: usize,
    /// Restricted occurrences across all pages.
    pub restricted_total: usize,
    pub occurrences: Vec<Occurrence>,
}

/// Groups record indices by input string and ranks inputs by frequency.
///
/// Built once after load. Inputs never change afterwards, so the index needs
/// no updates; answered status is read from the ledger on every lookup.
#[derive(Debug, Clone, Default)]
pub struct TermIndex {
    by_input: HashMap<String, Vec<RecordIndex>>,
    /// Inputs by descending group size, first appearance breaking ties.
    by_freq: Vec<String>,
}

impl TermIndex {
    pub fn build(records: &[Record]) -> Self {
        let mut by_input: HashMap<String, Vec<RecordIndex>> = HashMap::new();
        let mut by_freq = Vec::new();
        for (index, record) in records.iter().enumerate() {
            let hits = by_input.entry(record.input.clone()).or_default();
            if hits.is_empty() {
                by_freq.push(record.input.clone());
            }
            hits.push(index);
        }

        // Stable sort keeps load order among equally frequent terms.
        by_freq.sort_by_key(|term| std::cmp::Reverse(by_input[term].len()));

        Self { by_input, by_freq }
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.by_freq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_freq.is_empty()
    }

    /// Record indices sharing `term`, in load order.
    pub fn occurrences(&self, term: &str) -> Option<&[RecordIndex]> {
        self.by_input.get(term).map(Vec::as_slice)
    }

    /// Returns the page `[from, from + size)` of the frequency ranking.
    pub fn list_terms(&self, from: usize, size: usize) -> Vec<TermFrequency> {
        let (from, upto) = clamp_range(from, size, self.by_freq.len());
        self.by_freq[from..upto]
            .iter()
            .map(|term| TermFrequency {
                term: term.clone(),
                freq: self.by_input[term].len(),
            })
            .collect()
    }
}

/// Orders occurrences restricted first, then by record index.
pub(crate) fn sort_occurrences(occurrences: &mut [Occurrence]) {
    occurrences.sort_by(|a, b| b.restricted.cmp(&a.restricted).then(a.index.cmp(&b.index)));
}
