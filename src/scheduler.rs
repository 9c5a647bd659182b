//! Cancellable recurring task.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// What a recurring action asks the scheduler to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Stop,
}

/// Handle to a task started with [`start_recurring`].
///
/// [`RecurringTask::cancel`] lets a run that is already in progress finish;
/// dropping the handle aborts the task outright.
#[derive(Debug)]
pub struct RecurringTask {
    handle: Option<JoinHandle<()>>,
    stop_tx: watch::Sender<bool>,
}

/// Runs `action` every `interval`, starting one interval from now.
///
/// Each run is awaited before the next tick, and ticks missed while a run is
/// in progress are skipped rather than queued, so runs never overlap.
pub fn start_recurring<F, Fut>(interval: Duration, mut action: F) -> RecurringTask
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Tick> + Send + 'static,
{
    let (stop_tx, mut cancelled) = watch::channel(false);
    let first = Instant::now() + interval;
    let handle = tokio::spawn(async move {
        let mut ticker = time::interval_at(first, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = cancelled.changed() => break,
            }
            if *cancelled.borrow() {
                break;
            }
            if action().await == Tick::Stop {
                log::debug!("Recurring task stopped by its action");
                break;
            }
        }
    });
    RecurringTask {
        handle: Some(handle),
        stop_tx,
    }
}

impl RecurringTask {
    /// Stops the task. No new run starts after this returns.
    pub fn cancel(mut self) {
        let _ = self.stop_tx.send(true);
        // detach: a run in progress is allowed to complete
        self.handle.take();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for RecurringTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(interval: Duration, stop_after: usize) -> (RecurringTask, Arc<AtomicUsize>) {
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = runs.clone();
        let task = start_recurring(interval, move || {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                if n >= stop_after { Tick::Stop } else { Tick::Continue }
            }
        });
        (task, runs)
    }

    #[tokio::test(start_paused = true)]
    async fn first_run_waits_one_interval() {
        let (_task, runs) = counting(Duration::from_secs(30), usize::MAX);
        time::sleep(Duration::from_secs(29)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_further_runs() {
        let (task, runs) = counting(Duration::from_secs(30), usize::MAX);
        time::sleep(Duration::from_secs(31)).await;
        task.cancel();
        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_lets_the_current_run_finish() {
        let finished = Arc::new(AtomicUsize::new(0));
        let done = finished.clone();
        let task = start_recurring(Duration::from_secs(1), move || {
            let done = done.clone();
            async move {
                time::sleep(Duration::from_secs(5)).await;
                done.fetch_add(1, Ordering::SeqCst);
                Tick::Continue
            }
        });
        time::sleep(Duration::from_secs(2)).await;
        task.cancel();
        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn drop_aborts() {
        let (task, runs) = counting(Duration::from_secs(30), usize::MAX);
        drop(task);
        time::sleep(Duration::from_secs(300)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn action_can_stop_the_task() {
        let (task, runs) = counting(Duration::from_secs(1), 2);
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_runs_do_not_overlap() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let (flight, seen) = (in_flight.clone(), max_seen.clone());
        let _task = start_recurring(Duration::from_secs(1), move || {
            let (flight, seen) = (flight.clone(), seen.clone());
            async move {
                let now = flight.fetch_add(1, Ordering::SeqCst) + 1;
                seen.fetch_max(now, Ordering::SeqCst);
                time::sleep(Duration::from_secs(5)).await;
                flight.fetch_sub(1, Ordering::SeqCst);
                Tick::Continue
            }
        });
        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
    }
}
