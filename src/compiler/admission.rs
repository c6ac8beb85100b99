//! Admission control for compiler processes.
//!
//! Keeps a process-wide count of running compilations. A request is admitted
//! when `running < max_instances`; otherwise it parks until some token is
//! released and then re-checks. The ceiling is hard: `running` never exceeds
//! the `max_instances` of the request that was admitted last.
//!
//! Admission is not fair. All parked requests are woken together on every
//! release and whichever re-checks first takes the slot, so callers must not
//! assume FIFO order.

use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Shared running-instance counter.
#[derive(Debug, Default)]
pub struct Admission {
    running: Mutex<usize>,
    /// Highest `running` value ever observed
    peak: AtomicUsize,
    released: Notify,
}

/// Permission to run one compiler process. Dropping it releases the slot.
#[derive(Debug)]
pub struct AdmissionToken {
    admission: Arc<Admission>,
}

impl Admission {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wait until fewer than `max_instances` compilations are running.
    ///
    /// `max_instances` of zero is treated as one.
    pub async fn admit(self: &Arc<Self>, max_instances: usize) -> AdmissionToken {
        let max_instances = max_instances.max(1);
        let mut waited = false;

        loop {
            // Register interest before checking so a release between the
            // check and the await is not lost.
            let released = self.released.notified();
            tokio::pin!(released);
            released.as_mut().enable();

            if let Some(token) = self.try_admit(max_instances) {
                if waited {
                    crate::debug!("admit"; "admitted after waiting (limit {})", max_instances);
                }
                return token;
            }

            if !waited {
                crate::debug!("admit"; "{} compiler(s) running, waiting for a slot", self.running());
                waited = true;
            }
            released.await;
        }
    }

    /// Admit immediately if a slot is free.
    pub fn try_admit(self: &Arc<Self>, max_instances: usize) -> Option<AdmissionToken> {
        let mut running = self.running.lock();
        if *running >= max_instances.max(1) {
            return None;
        }
        *running += 1;
        self.peak.fetch_max(*running, Ordering::SeqCst);
        Some(AdmissionToken {
            admission: Arc::clone(self),
        })
    }

    /// Number of compilations currently admitted.
    pub fn running(&self) -> usize {
        *self.running.lock()
    }

    /// Highest number of simultaneously admitted compilations so far.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn release(&self) {
        {
            let mut running = self.running.lock();
            *running = running.saturating_sub(1);
        }
        self.released.notify_waiters();
    }
}

impl Drop for AdmissionToken {
    fn drop(&mut self) {
        self.admission.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_try_admit_respects_ceiling() {
        let admission = Admission::new();
        let first = admission.try_admit(2).unwrap();
        let second = admission.try_admit(2).unwrap();
        assert!(admission.try_admit(2).is_none());
        assert_eq!(admission.running(), 2);

        drop(first);
        assert_eq!(admission.running(), 1);
        let third = admission.try_admit(2);
        assert!(third.is_some());

        drop(second);
        drop(third);
        assert_eq!(admission.running(), 0);
        assert_eq!(admission.peak(), 2);
    }

    #[test]
    fn test_zero_limit_means_one() {
        let admission = Admission::new();
        let token = admission.try_admit(0);
        assert!(token.is_some());
        assert!(admission.try_admit(0).is_none());
    }

    #[tokio::test]
    async fn test_waiter_admitted_after_release() {
        let admission = Admission::new();
        let held = admission.admit(1).await;

        let waiter = {
            let admission = Arc::clone(&admission);
            tokio::spawn(async move {
                let _token = admission.admit(1).await;
                admission.running()
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        assert_eq!(admission.running(), 1);

        drop(held);
        let running_inside = waiter.await.unwrap();
        assert_eq!(running_inside, 1);
        assert_eq!(admission.running(), 0);
    }

    #[tokio::test]
    async fn test_ceiling_never_exceeded_under_contention() {
        for limit in [1usize, 4] {
            let admission = Admission::new();
            let mut tasks = tokio::task::JoinSet::new();
            for _ in 0..12 {
                let admission = Arc::clone(&admission);
                tasks.spawn(async move {
                    let _token = admission.admit(limit).await;
                    assert!(admission.running() <= limit);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                });
            }
            while let Some(res) = tasks.join_next().await {
                res.unwrap();
            }
            assert!(admission.peak() <= limit);
            assert_eq!(admission.running(), 0);
        }
    }
}
