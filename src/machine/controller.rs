use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tokio::time::sleep;
use tracing::{debug, info};

use super::brew::{BrewTime, RandomBrewTime};
use super::id::{IdGenerator, OsIdGenerator};
use super::job::{Job, Product};
use super::state::MachineState;
use crate::error::MachineError;

/// Everything guarded by the machine lock.
#[derive(Debug)]
struct MachineInner {
    state: MachineState,
    /// Every job ever admitted, keyed by identifier.
    jobs: HashMap<String, Job>,
    /// Job identifiers in admission order.
    history: Vec<String>,
    /// The job occupying the machine while `Brewing` or `Blocked`.
    current_job: Option<String>,
}

impl MachineInner {
    fn new() -> Self {
        Self {
            state: MachineState::Available,
            jobs: HashMap::new(),
            history: Vec::new(),
            current_job: None,
        }
    }

    fn is_current(&self, job_id: &str) -> bool {
        self.current_job.as_deref() == Some(job_id)
    }
}

/// A single in-memory coffee machine.
///
/// Cloning is cheap and every clone drives the same machine. All operations
/// take one lock for their whole duration, so admission, retrieval, the brew
/// completion timer and the read-only views never interleave partially.
///
/// [`Machine::start_job`] spawns the completion timer onto the current Tokio
/// runtime and must be called from within one.
#[derive(Clone)]
pub struct Machine {
    inner: Arc<Mutex<MachineInner>>,
    brew_time: Arc<dyn BrewTime>,
    ids: Arc<dyn IdGenerator>,
}

impl Default for Machine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Machine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Machine").field("state", &self.status()).finish_non_exhaustive()
    }
}

impl Machine {
    /// An idle machine with the default 20–55 second brew range.
    pub fn new() -> Self {
        Self::with_brew_time(RandomBrewTime::default())
    }

    /// An idle machine that draws brew durations from `brew_time`.
    pub fn with_brew_time(brew_time: impl BrewTime + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(MachineInner::new())),
            brew_time: Arc::new(brew_time),
            ids: Arc::new(OsIdGenerator),
        }
    }

    #[cfg(test)]
    fn with_id_generator(mut self, ids: impl IdGenerator + 'static) -> Self {
        self.ids = Arc::new(ids);
        self
    }

    /// Current machine state.
    pub fn status(&self) -> MachineState {
        lock(&self.inner).state
    }

    /// Whether a new job would be accepted right now.
    pub fn is_ready(&self) -> bool {
        self.status().accepts_jobs()
    }

    /// Admit a new brew job.
    ///
    /// `job_id` may be `None` (or empty) to have one generated. Checks run in
    /// this order:
    /// - the product must be supported (checked before locking),
    /// - a caller-supplied id must not belong to any earlier job,
    /// - the machine must be `Available`.
    ///
    /// On success the machine is `Brewing` and a detached timer will move it
    /// to `Blocked` once the brew duration has elapsed.
    pub fn start_job(&self, product: &str, job_id: Option<&str>) -> Result<Job, MachineError> {
        let product: Product = product.parse()?;
        let requested = job_id.filter(|id| !id.is_empty());

        let (job, brew_duration) = {
            let mut inner = lock(&self.inner);

            if let Some(id) = requested
                && inner.jobs.contains_key(id)
            {
                return Err(MachineError::JobIdExists(id.to_string()));
            }

            if !inner.state.accepts_jobs() {
                return Err(MachineError::Busy);
            }

            let job_id = match requested {
                Some(id) => id.to_string(),
                None => loop {
                    let id = self.ids.generate()?;
                    if !inner.jobs.contains_key(&id) {
                        break id;
                    }
                },
            };

            let brew_duration = self.brew_time.brew_duration();
            let started = Utc::now();
            let job = Job::new(job_id.clone(), product, started, ready_at(started, brew_duration));

            inner.jobs.insert(job_id.clone(), job.clone());
            inner.history.push(job_id.clone());
            inner.current_job = Some(job_id);
            inner.state = MachineState::Brewing;

            (job, brew_duration)
        };

        info!(
            job_id = %job.job_id,
            product = %job.product,
            brew_ms = brew_duration.as_millis() as u64,
            "job admitted"
        );

        let inner = Arc::clone(&self.inner);
        let job_id = job.job_id.clone();
        tokio::spawn(async move {
            sleep(brew_duration).await;
            complete_brew(&inner, &job_id);
        });

        Ok(job)
    }

    /// Claim a finished job.
    ///
    /// Fails with `NotFound` for unknown ids, `AlreadyRetrieved` on any call
    /// after the first success and `NotReady` while the job's ready time is
    /// still in the future. Readiness follows the job's timestamp, not the
    /// completion timer, so a job can be retrieved before the timer has run.
    pub fn retrieve_job(&self, job_id: &str) -> Result<Job, MachineError> {
        let mut inner = lock(&self.inner);

        let now = Utc::now();
        let job = inner
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| MachineError::NotFound(job_id.to_string()))?;

        if job.is_retrieved() {
            return Err(MachineError::AlreadyRetrieved(job_id.to_string()));
        }
        if !job.is_ready_at(now) {
            return Err(MachineError::NotReady(job_id.to_string()));
        }

        job.job_retrieved = Some(now);
        let snapshot = job.clone();

        if inner.is_current(job_id) {
            inner.current_job = None;
            inner.state = MachineState::Available;
        }

        info!(job_id = %snapshot.job_id, product = %snapshot.product, "job retrieved");
        Ok(snapshot)
    }

    #[cfg(test)]
    fn job(&self, job_id: &str) -> Option<Job> {
        lock(&self.inner).jobs.get(job_id).cloned()
    }

    /// Number of jobs admitted so far.
    pub fn job_count(&self) -> usize {
        lock(&self.inner).history.len()
    }

    /// Snapshot of every job in admission order.
    pub fn history(&self) -> Vec<Job> {
        let inner = lock(&self.inner);
        inner
            .history
            .iter()
            .filter_map(|id| inner.jobs.get(id).cloned())
            .collect()
    }

    #[cfg(test)]
    fn fire_completion(&self, job_id: &str) {
        complete_brew(&self.inner, job_id);
    }
}

// Operations never panic while holding the lock, so a poisoned guard still
// protects consistent state.
fn lock(inner: &Mutex<MachineInner>) -> MutexGuard<'_, MachineInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

fn ready_at(started: DateTime<Utc>, brew: Duration) -> DateTime<Utc> {
    TimeDelta::from_std(brew)
        .ok()
        .and_then(|delta| started.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Timer callback: `Brewing` → `Blocked`, but only for the job that is still
/// current and unretrieved. A stale timer is a no-op.
fn complete_brew(inner: &Mutex<MachineInner>, job_id: &str) {
    let mut inner = lock(inner);

    let unretrieved = inner.jobs.get(job_id).is_some_and(|job| !job.is_retrieved());
    if inner.is_current(job_id) && unretrieved && inner.state == MachineState::Brewing {
        inner.state = MachineState::Blocked;
        info!(job_id, "brew complete, waiting for retrieval");
    } else {
        debug!(job_id, state = %inner.state, "ignoring stale brew timer");
    }
}
