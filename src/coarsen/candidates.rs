//! Priority-ordered merge candidates

use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// An adjacent pair of live clusters, keyed by representative ids (`lo < hi`).
///
/// The version stamps record the state of each cluster when the score was
/// taken; a merge bumps the version, which turns older entries stale.
#[derive(Debug, Clone, Copy)]
pub struct Candidate {
    /// Quantized similarity score
    pub score: f64,

    /// Size of the cluster the merge would create
    pub combined_size: usize,

    pub lo: u32,
    pub hi: u32,
    pub lo_version: u32,
    pub hi_version: u32,
}

impl Ord for Candidate {
    /// Higher score first, then smaller combined size, then lower
    /// representative ids
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.combined_size.cmp(&self.combined_size))
            .then_with(|| other.lo.cmp(&self.lo))
            .then_with(|| other.hi.cmp(&self.hi))
            .then_with(|| self.lo_version.cmp(&other.lo_version))
            .then_with(|| self.hi_version.cmp(&other.hi_version))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// Max-heap of candidates; ordering comes only from [`Candidate`]'s `Ord`
#[derive(Debug, Default)]
pub struct CandidateQueue {
    heap: BinaryHeap<Candidate>,
}

impl CandidateQueue {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, candidate: Candidate) {
        self.heap.push(candidate);
    }

    pub fn pop(&mut self) -> Option<Candidate> {
        self.heap.pop()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(score: f64, combined_size: usize, lo: u32, hi: u32) -> Candidate {
        Candidate {
            score,
            combined_size,
            lo,
            hi,
            lo_version: 0,
            hi_version: 0,
        }
    }

    #[test]
    fn pops_by_score_then_size_then_ids() {
        let mut queue = CandidateQueue::with_capacity(8);
        queue.push(candidate(0.5, 2, 1, 2));
        queue.push(candidate(0.5, 2, 0, 2));
        queue.push(candidate(0.5, 3, 0, 1));
        queue.push(candidate(0.9, 9, 7, 8));
        queue.push(candidate(0.5, 2, 0, 1));

        let order: Vec<(u32, u32, usize)> = std::iter::from_fn(|| queue.pop())
            .map(|c| (c.lo, c.hi, c.combined_size))
            .collect();
        assert_eq!(
            order,
            vec![(7, 8, 9), (0, 1, 2), (0, 2, 2), (1, 2, 2), (0, 1, 3)]
        );
    }
}
