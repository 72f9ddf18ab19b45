//! Job registry: id -> job map plus insertion order.

use std::collections::HashMap;
use std::sync::Arc;

use crate::job::{Job, JobId};

/// Every id in `order` is a key of `jobs` and vice versa.
#[derive(Debug, Default)]
pub(super) struct Registry {
    jobs: HashMap<JobId, Arc<Job>>,
    order: Vec<JobId>,
}

impl Registry {
    pub(super) fn insert(&mut self, job: Arc<Job>) {
        let id = job.id().to_string();
        if self.jobs.insert(id.clone(), job).is_none() {
            self.order.push(id);
        }
    }

    pub(super) fn get(&self, id: &str) -> Option<Arc<Job>> {
        self.jobs.get(id).cloned()
    }

    pub(super) fn remove(&mut self, id: &str) -> Option<Arc<Job>> {
        let job = self.jobs.remove(id)?;
        self.order.retain(|oid| oid != id);
        Some(job)
    }

    /// Removes every job matching `pred`; returns them oldest first.
    pub(super) fn remove_where<F>(&mut self, mut pred: F) -> Vec<Arc<Job>>
    where
        F: FnMut(&Job) -> bool,
    {
        let mut removed = Vec::new();
        let jobs = &mut self.jobs;
        self.order.retain(|id| {
            let matched = jobs.get(id).map(|job| pred(job.as_ref()));
            match matched {
                Some(true) => {
                    if let Some(job) = jobs.remove(id) {
                        removed.push(job);
                    }
                    false
                }
                Some(false) => true,
                None => false,
            }
        });
        removed
    }

    pub(super) fn newest_first(&self) -> Vec<Arc<Job>> {
        self.order
            .iter()
            .rev()
            .filter_map(|id| self.jobs.get(id).cloned())
            .collect()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.jobs.len()
    }
}
