//! Priority queue derived from the workload store.
//!
//! There is no persistent queue position: every call re-sorts the `queued`
//! workloads by priority rank, then by submission sequence, so a priority
//! change applies to the very next scheduling decision. There is no aging;
//! a steady stream of high-priority work can starve low-priority work.

use std::cmp::Ordering;

use crate::core::{Workload, WorkloadStatus};

/// Sort key: lower rank first, then earlier submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueKey {
    rank: u8,
    sequence: u64,
}

impl QueueKey {
    /// Key for a workload.
    pub const fn of(workload: &Workload) -> Self {
        Self {
            rank: workload.priority.rank(),
            sequence: workload.sequence,
        }
    }
}

impl PartialOrd for QueueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank
            .cmp(&other.rank)
            .then_with(|| self.sequence.cmp(&other.sequence))
    }
}

/// The queued workload that should run next, if any.
pub fn next_eligible<'a, I>(workloads: I) -> Option<&'a Workload>
where
    I: IntoIterator<Item = &'a Workload>,
{
    workloads
        .into_iter()
        .filter(|w| w.status == WorkloadStatus::Queued)
        .min_by_key(|w| QueueKey::of(w))
}

/// All queued workloads in scheduling order.
pub fn scheduling_order<'a, I>(workloads: I) -> Vec<&'a Workload>
where
    I: IntoIterator<Item = &'a Workload>,
{
    let mut queued: Vec<&Workload> = workloads
        .into_iter()
        .filter(|w| w.status == WorkloadStatus::Queued)
        .collect();
    queued.sort_by_key(|w| QueueKey::of(w));
    queued
}
