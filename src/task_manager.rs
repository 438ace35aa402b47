//! Tracks a set of named tasks and joins them under a deadline.
use futures::stream::{FuturesUnordered, StreamExt};
use std::fmt::Debug;
use std::future::Future;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// A group of tasks spawned on one runtime.
///
/// This struct is responsible for:
/// - Spawning tasks and keeping track of their `JoinHandle`s.
/// - Waiting for all of them, but never past a deadline. Tasks still running
///   at the deadline are detached, not cancelled.
pub struct TaskManager<K, T> {
    runtime: Handle,
    handles: Vec<(K, JoinHandle<T>)>,
}

/// What a deadline-bounded join observed.
#[derive(Debug)]
pub struct JoinOutcome<K, T> {
    /// Tasks that ran to completion, in completion order.
    pub finished: Vec<(K, T)>,
    /// Tasks that panicked or were cancelled.
    pub failed: Vec<K>,
    /// Tasks still running when the deadline fired.
    pub pending: Vec<K>,
}

impl<K, T> JoinOutcome<K, T> {
    pub fn timed_out(&self) -> bool {
        !self.pending.is_empty()
    }
}

impl<K, T> TaskManager<K, T>
where
    K: Copy + PartialEq + Debug + Send + 'static,
    T: Send + 'static,
{
    /// Creates a new `TaskManager` spawning onto `runtime`.
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            handles: Vec::new(),
        }
    }

    /// Spawns a new task and adds its handle to the manager.
    pub fn spawn<F>(&mut self, key: K, future: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        debug!(task = ?key, "Spawning task");
        let handle = self.runtime.spawn(future);
        self.handles.push((key, handle));
    }

    /// Spawns blocking work on the runtime's blocking pool.
    pub fn spawn_blocking<F>(&mut self, key: K, f: F)
    where
        F: FnOnce() -> T + Send + 'static,
    {
        debug!(task = ?key, "Spawning blocking task");
        let handle = self.runtime.spawn_blocking(f);
        self.handles.push((key, handle));
    }

    /// Waits for all managed tasks to complete or for `deadline`, whichever
    /// comes first.
    pub async fn join_until(self, deadline: Instant) -> JoinOutcome<K, T> {
        let keys: Vec<K> = self.handles.iter().map(|(key, _)| *key).collect();
        let mut running: FuturesUnordered<_> = self
            .handles
            .into_iter()
            .map(|(key, handle)| async move { (key, handle.await) })
            .collect();

        let mut outcome = JoinOutcome {
            finished: Vec::with_capacity(keys.len()),
            failed: Vec::new(),
            pending: Vec::new(),
        };

        loop {
            match tokio::time::timeout_at(deadline, running.next()).await {
                Ok(Some((key, Ok(value)))) => {
                    debug!(task = ?key, "Task finished.");
                    outcome.finished.push((key, value));
                }
                Ok(Some((key, Err(e)))) => {
                    error!(task = ?key, error = %e, "Task panicked.");
                    outcome.failed.push(key);
                }
                Ok(None) => break,
                Err(_) => {
                    outcome.pending = keys
                        .into_iter()
                        .filter(|key| {
                            !outcome.failed.contains(key)
                                && !outcome.finished.iter().any(|(done, _)| done == key)
                        })
                        .collect();
                    warn!(pending = ?outcome.pending, "Deadline reached, abandoning tasks.");
                    break;
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_join_collects_all_results() {
        let mut tasks = TaskManager::new(Handle::current());
        tasks.spawn("a", async { 1 });
        tasks.spawn("b", async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            2
        });
        tasks.spawn_blocking("c", || 3);

        let outcome = tasks
            .join_until(Instant::now() + Duration::from_secs(5))
            .await;

        assert!(!outcome.timed_out());
        let mut values: Vec<_> = outcome.finished.iter().map(|(_, v)| *v).collect();
        values.sort();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_join_stops_at_deadline() {
        let mut tasks = TaskManager::new(Handle::current());
        tasks.spawn("fast", async {});
        tasks.spawn("stuck", std::future::pending::<()>());

        let start = Instant::now();
        let outcome = tasks.join_until(start + Duration::from_millis(100)).await;

        assert!(start.elapsed() < Duration::from_secs(1));
        assert!(outcome.timed_out());
        assert_eq!(outcome.pending, vec!["stuck"]);
        assert_eq!(outcome.finished.len(), 1);
    }

    #[tokio::test]
    async fn test_panicking_task_is_reported_as_failed() {
        let mut tasks: TaskManager<&str, ()> = TaskManager::new(Handle::current());
        tasks.spawn("boom", async { panic!("task exploded") });

        let outcome = tasks
            .join_until(Instant::now() + Duration::from_secs(5))
            .await;

        assert_eq!(outcome.failed, vec!["boom"]);
        assert!(!outcome.timed_out());
    }
}
