//! # Batch Outcomes
//!
//! Batch operations apply the single-item operation sequentially and keep
//! going past individual failures. The caller receives one result per
//! input position and must inspect them; a batch never aborts as a whole.

use crate::error::CertError;

/// Per-item results of a batch operation, in input order.
#[derive(Debug)]
pub struct BatchOutcome<T, E = CertError> {
    results: Vec<Result<T, E>>,
}

impl<T, E> BatchOutcome<T, E> {
    /// Wrap an ordered list of per-item results.
    pub fn new(results: Vec<Result<T, E>>) -> Self {
        Self { results }
    }

    /// Number of items in the batch.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Whether the batch had no items.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Result for the item at `index`.
    pub fn get(&self, index: usize) -> Option<&Result<T, E>> {
        self.results.get(index)
    }

    /// All results, in input order.
    pub fn results(&self) -> &[Result<T, E>] {
        &self.results
    }

    /// Consume into the underlying result list.
    pub fn into_results(self) -> Vec<Result<T, E>> {
        self.results
    }

    /// Number of items that succeeded.
    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.is_ok()).count()
    }

    /// Number of items that failed.
    pub fn failed(&self) -> usize {
        self.len() - self.succeeded()
    }

    /// True when every item succeeded (vacuously true for an empty batch).
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(Result::is_ok)
    }

    /// Successful values with their input positions.
    pub fn successes(&self) -> impl Iterator<Item = (usize, &T)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().ok().map(|v| (i, v)))
    }

    /// Failures with their input positions.
    pub fn failures(&self) -> impl Iterator<Item = (usize, &E)> {
        self.results
            .iter()
            .enumerate()
            .filter_map(|(i, r)| r.as_ref().err().map(|e| (i, e)))
    }
}

impl<T, E> FromIterator<Result<T, E>> for BatchOutcome<T, E> {
    fn from_iter<I: IntoIterator<Item = Result<T, E>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
