//! Bounded print job history

use std::collections::VecDeque;

use shared::PrintJob;

/// Jobs kept by the virtual printer
pub const HISTORY_CAPACITY: usize = 10;

/// Newest-first job list; the oldest job is evicted when full
#[derive(Debug, Clone)]
pub struct JobHistory {
    jobs: VecDeque<PrintJob>,
    capacity: usize,
}

impl Default for JobHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl JobHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            jobs: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert at the front, dropping the oldest job past capacity
    pub fn push(&mut self, job: PrintJob) {
        self.jobs.push_front(job);
        self.jobs.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn latest(&self) -> Option<&PrintJob> {
        self.jobs.front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PrintJob> {
        self.jobs.iter()
    }

    /// Snapshot, newest first
    pub fn to_vec(&self) -> Vec<PrintJob> {
        self.jobs.iter().cloned().collect()
    }
}
