//! Periodic link reachability watcher

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// How the network can currently be reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReachabilityStatus {
    NotReachable,
    ReachableViaWifi,
    ReachableViaWwan,
}

/// Source of reachability samples (platform specific)
pub trait ReachabilityProbe: Send + Sync {
    fn status(&self) -> ReachabilityStatus;
}

impl<F> ReachabilityProbe for F
where
    F: Fn() -> ReachabilityStatus + Send + Sync,
{
    fn status(&self) -> ReachabilityStatus {
        self()
    }
}

/// Polls a probe and reports status changes
///
/// The status at start is the baseline and is not reported.
pub struct ReachabilityWatcher {
    task: JoinHandle<()>,
}

impl ReachabilityWatcher {
    /// Start polling on the current tokio runtime
    pub fn start<C>(probe: Arc<dyn ReachabilityProbe>, interval: Duration, on_change: C) -> Self
    where
        C: Fn(ReachabilityStatus) + Send + Sync + 'static,
    {
        let mut last = probe.status();
        log::debug!("Reachability baseline: {last:?}");

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let status = probe.status();
                if status != last {
                    log::debug!("Reachability changed: {last:?} -> {status:?}");
                    last = status;
                    on_change(status);
                }
            }
        });

        Self { task }
    }

    pub fn stop(&self) {
        self.task.abort();
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for ReachabilityWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
