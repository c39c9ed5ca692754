//! Periodic task scheduling
//!
//! A single loop wakes on a fixed tick, runs every due task sequentially in
//! registration order, and reschedules each task relative to its completion
//! time. Task failures are logged and swallowed; a failing task stays on its
//! schedule. Manual runs are funneled through the same loop so scheduled and
//! requested executions never overlap.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::time::{interval, Instant};
use tracing::{debug, error, info, warn};

use crate::config::SchedulerConfig;
use crate::error::AppError;

/// Trait for periodically runnable work
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SyncTask: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Perform one execution
    async fn execute(&self) -> Result<(), AppError>;
}

/// One scheduled task with its bookkeeping
struct TaskEntry {
    id: u64,
    task: Arc<dyn SyncTask>,
    interval: Duration,
    enabled: bool,
    last_run: Option<Instant>,
    next_run: Instant,
}

/// Manual run request
struct ManualRunRequest {
    task_id: u64,
    response: mpsc::Sender<Result<(), AppError>>,
}

/// Task scheduler driven by a fixed tick
///
/// All bookkeeping lives behind the [`SchedulerHandle`], so tasks can be
/// registered and adjusted both before and after the loop starts.
pub struct Scheduler {
    config: SchedulerConfig,
    tasks: Arc<RwLock<Vec<TaskEntry>>>,
    run_now_rx: mpsc::Receiver<ManualRunRequest>,
    shutdown_rx: broadcast::Receiver<()>,
    // Keeps the run_now channel open even when every external handle is gone.
    handle: SchedulerHandle,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(config: SchedulerConfig) -> Self {
        let (run_now_tx, run_now_rx) = mpsc::channel(32);
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let tasks = Arc::new(RwLock::new(Vec::new()));
        let handle = SchedulerHandle {
            tasks: tasks.clone(),
            next_id: Arc::new(AtomicU64::new(1)),
            run_now_tx,
            shutdown_tx,
        };

        Self {
            config,
            tasks,
            run_now_rx,
            shutdown_rx,
            handle,
        }
    }

    /// Get a handle for registering tasks and controlling the loop
    pub fn handle(&self) -> SchedulerHandle {
        self.handle.clone()
    }

    /// Spawn the scheduling loop onto the runtime
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Run the scheduling loop until a stop is signaled
    pub async fn run(mut self) {
        info!(tick_secs = self.config.tick_secs, "Starting scheduler");

        let mut ticker = interval(Duration::from_secs(self.config.tick_secs));

        loop {
            tokio::select! {
                _ = self.shutdown_rx.recv() => {
                    info!("Shutdown signal received, stopping scheduler");
                    break;
                }
                Some(request) = self.run_now_rx.recv() => {
                    self.handle_run_now(request).await;
                }
                _ = ticker.tick() => {
                    self.run_due_tasks().await;
                }
            }
        }

        info!("Scheduler stopped");
    }

    async fn run_due_tasks(&self) {
        // Snapshot what is due, then execute without holding the lock.
        let now = Instant::now();
        let due: Vec<(u64, Arc<dyn SyncTask>)> = {
            let tasks = self.tasks.read().await;
            tasks
                .iter()
                .filter(|entry| entry.enabled && entry.next_run <= now)
                .map(|entry| (entry.id, entry.task.clone()))
                .collect()
        };

        if due.is_empty() {
            return;
        }

        debug!(due = due.len(), "Running due tasks");
        for (id, task) in due {
            let _ = self.execute_task(id, &task).await;
        }
    }

    async fn execute_task(&self, id: u64, task: &Arc<dyn SyncTask>) -> Result<(), AppError> {
        debug!(task = task.name(), "Running task");
        let result = task.execute().await;

        match &result {
            Ok(()) => info!(task = task.name(), "Task completed"),
            Err(err) => error!(task = task.name(), error = %err, "Task failed"),
        }

        // The next run is anchored to completion, not to the previous
        // deadline, even when the task failed.
        let completed = Instant::now();
        let mut tasks = self.tasks.write().await;
        if let Some(entry) = tasks.iter_mut().find(|entry| entry.id == id) {
            entry.last_run = Some(completed);
            entry.next_run = completed + entry.interval;
        }

        result
    }

    async fn handle_run_now(&self, request: ManualRunRequest) {
        let task = {
            let tasks = self.tasks.read().await;
            tasks
                .iter()
                .find(|entry| entry.id == request.task_id)
                .map(|entry| entry.task.clone())
        };

        match task {
            Some(task) => {
                info!(task = task.name(), "Manual run triggered");
                let result = self.execute_task(request.task_id, &task).await;
                let _ = request.response.send(result).await;
            }
            None => {
                warn!(task_id = request.task_id, "Manual run requested for unknown task");
                let _ = request
                    .response
                    .send(Err(AppError::Internal(format!(
                        "No task with id {}",
                        request.task_id
                    ))))
                    .await;
            }
        }
    }
}

/// Handle for registering tasks and controlling a [`Scheduler`]
#[derive(Clone)]
pub struct SchedulerHandle {
    tasks: Arc<RwLock<Vec<TaskEntry>>>,
    next_id: Arc<AtomicU64>,
    run_now_tx: mpsc::Sender<ManualRunRequest>,
    shutdown_tx: broadcast::Sender<()>,
}

impl SchedulerHandle {
    /// Register a task and return its ID
    ///
    /// The first execution happens one interval after registration.
    pub async fn register(&self, task: Arc<dyn SyncTask>, interval: Duration) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let entry = TaskEntry {
            id,
            task,
            interval,
            enabled: true,
            last_run: None,
            next_run: Instant::now() + interval,
        };

        let mut tasks = self.tasks.write().await;
        info!(task = entry.task.name(), id, interval_secs = interval.as_secs(), "Registered task");
        tasks.push(entry);
        id
    }

    /// Remove a task; returns whether it existed
    pub async fn unregister(&self, id: u64) -> bool {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|entry| entry.id != id);
        let removed = tasks.len() < before;
        if removed {
            info!(id, "Unregistered task");
        }
        removed
    }

    /// Enable a task, rescheduling it one interval from now
    pub async fn enable(&self, id: u64) -> bool {
        let mut tasks = self.tasks.write().await;
        match tasks.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.enabled = true;
                entry.next_run = Instant::now() + entry.interval;
                info!(id, "Enabled task");
                true
            }
            None => false,
        }
    }

    /// Disable a task; it stays registered but stops executing
    pub async fn disable(&self, id: u64) -> bool {
        let mut tasks = self.tasks.write().await;
        match tasks.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.enabled = false;
                info!(id, "Disabled task");
                true
            }
            None => false,
        }
    }

    /// Change a task's interval
    ///
    /// The next run is re-anchored to the last completion, or to now for a
    /// task that has never run.
    pub async fn update_interval(&self, id: u64, interval: Duration) -> bool {
        let mut tasks = self.tasks.write().await;
        match tasks.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.interval = interval;
                let anchor = entry.last_run.unwrap_or_else(Instant::now);
                entry.next_run = anchor + interval;
                info!(id, interval_secs = interval.as_secs(), "Updated task interval");
                true
            }
            None => false,
        }
    }

    /// Run a task immediately, regardless of its schedule
    ///
    /// Execution happens inside the scheduler loop, so it never overlaps a
    /// scheduled run. The task is rescheduled from this completion like any
    /// other execution.
    pub async fn run_now(&self, id: u64) -> Result<(), AppError> {
        let (response_tx, mut response_rx) = mpsc::channel(1);

        self.run_now_tx
            .send(ManualRunRequest {
                task_id: id,
                response: response_tx,
            })
            .await
            .map_err(|_| AppError::Internal("Scheduler not running".to_string()))?;

        response_rx
            .recv()
            .await
            .ok_or_else(|| AppError::Internal("No response from scheduler".to_string()))?
    }

    /// Signal the scheduling loop to stop
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;
    use tokio::time::timeout;

    /// Counting task double; optionally fails every execution.
    struct TestTask {
        name: String,
        run_count: Arc<AtomicU32>,
        fail: bool,
    }

    impl TestTask {
        fn new(name: &str) -> Self {
            Self {
                name: name.to_string(),
                run_count: Arc::new(AtomicU32::new(0)),
                fail: false,
            }
        }

        fn failing(name: &str) -> Self {
            Self {
                fail: true,
                ..Self::new(name)
            }
        }

        fn run_count(&self) -> Arc<AtomicU32> {
            self.run_count.clone()
        }
    }

    #[async_trait]
    impl SyncTask for TestTask {
        fn name(&self) -> &str {
            &self.name
        }

        async fn execute(&self) -> Result<(), AppError> {
            self.run_count.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AppError::Internal("task failed".to_string()))
            } else {
                Ok(())
            }
        }
    }

    /// Task double that appends its label to a shared log.
    struct OrderedTask {
        label: String,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl SyncTask for OrderedTask {
        fn name(&self) -> &str {
            &self.label
        }

        async fn execute(&self) -> Result<(), AppError> {
            self.log.lock().unwrap().push(self.label.clone());
            Ok(())
        }
    }

    fn test_scheduler() -> (Scheduler, SchedulerHandle) {
        let scheduler = Scheduler::new(SchedulerConfig { tick_secs: 60 });
        let handle = scheduler.handle();
        (scheduler, handle)
    }

    // Test 1: A task first runs one interval after registration
    #[tokio::test(start_paused = true)]
    async fn test_task_runs_after_interval() {
        let (scheduler, handle) = test_scheduler();
        let task = TestTask::new("sync");
        let count = task.run_count();
        handle
            .register(Arc::new(task), Duration::from_secs(3600))
            .await;

        let join = tokio::spawn(scheduler.run());

        tokio::time::advance(Duration::from_secs(61 * 60)).await;
        tokio::task::yield_now().await;

        assert_eq!(count.load(Ordering::SeqCst), 1);

        handle.stop();
        let _ = join.await;
    }

    // Test 2: Nothing runs before the interval has elapsed
    #[tokio::test]
    async fn test_no_run_before_interval() {
        tokio::time::pause();

        let (scheduler, handle) = test_scheduler();
        let task = TestTask::new("sync");
        let count = task.run_count();
        handle
            .register(Arc::new(task), Duration::from_secs(3600))
            .await;

        let join = tokio::spawn(scheduler.run());

        tokio::time::advance(Duration::from_secs(59 * 60)).await;
        tokio::task::yield_now().await;

        assert_eq!(count.load(Ordering::SeqCst), 0);

        handle.stop();
        let _ = join.await;
    }

    // Test 3: The next run is anchored to completion, not to the deadline
    #[tokio::test(start_paused = true)]
    async fn test_interval_anchored_to_completion() {
        let (scheduler, handle) = test_scheduler();
        let task = TestTask::new("sync");
        let count = task.run_count();
        handle
            .register(Arc::new(task), Duration::from_secs(3600))
            .await;

        let join = tokio::spawn(scheduler.run());

        // First execution completes at the 3660s mark.
        tokio::time::advance(Duration::from_secs(3660)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // A deadline-anchored schedule would fire again at 7200s.
        tokio::time::advance(Duration::from_secs(3599)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        // Completion + interval lands at 7260s.
        tokio::time::advance(Duration::from_secs(70)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 2);

        handle.stop();
        let _ = join.await;
    }

    // Test 4: Due tasks run sequentially in registration order
    #[tokio::test(start_paused = true)]
    async fn test_registration_order() {
        let (scheduler, handle) = test_scheduler();
        let log = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            handle
                .register(
                    Arc::new(OrderedTask {
                        label: label.to_string(),
                        log: log.clone(),
                    }),
                    Duration::from_secs(60),
                )
                .await;
        }

        let join = tokio::spawn(scheduler.run());

        tokio::time::advance(Duration::from_secs(121)).await;
        tokio::task::yield_now().await;

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "first".to_string(),
                "second".to_string(),
                "third".to_string()
            ]
        );

        handle.stop();
        let _ = join.await;
    }

    // Test 5: A failing task is logged, swallowed, and rescheduled
    #[tokio::test(start_paused = true)]
    async fn test_failing_task_stays_scheduled() {
        let (scheduler, handle) = test_scheduler();
        let failing = TestTask::failing("broken");
        let failing_count = failing.run_count();
        let healthy = TestTask::new("healthy");
        let healthy_count = healthy.run_count();

        handle
            .register(Arc::new(failing), Duration::from_secs(60))
            .await;
        handle
            .register(Arc::new(healthy), Duration::from_secs(60))
            .await;

        let join = tokio::spawn(scheduler.run());

        tokio::time::advance(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        // The failure did not stop the task registered after it.
        assert_eq!(failing_count.load(Ordering::SeqCst), 1);
        assert_eq!(healthy_count.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        tokio::task::yield_now().await;

        assert_eq!(failing_count.load(Ordering::SeqCst), 2);

        handle.stop();
        let _ = join.await;
    }

    // Test 6: Disabled tasks are skipped until re-enabled
    #[tokio::test]
    async fn test_disable_and_enable() {
        tokio::time::pause();

        let (scheduler, handle) = test_scheduler();
        let task = TestTask::new("sync");
        let count = task.run_count();
        let id = handle
            .register(Arc::new(task), Duration::from_secs(60))
            .await;

        assert!(handle.disable(id).await);

        let join = tokio::spawn(scheduler.run());

        tokio::time::advance(Duration::from_secs(301)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        assert!(handle.enable(id).await);

        tokio::time::advance(Duration::from_secs(121)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        handle.stop();
        let _ = join.await;
    }

    // Test 7: An unregistered task never runs again
    #[tokio::test]
    async fn test_unregister() {
        tokio::time::pause();

        let (scheduler, handle) = test_scheduler();
        let task = TestTask::new("sync");
        let count = task.run_count();
        let id = handle
            .register(Arc::new(task), Duration::from_secs(60))
            .await;

        assert!(handle.unregister(id).await);
        assert!(!handle.unregister(id).await);

        let join = tokio::spawn(scheduler.run());

        tokio::time::advance(Duration::from_secs(301)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        handle.stop();
        let _ = join.await;
    }

    // Test 8: Updating the interval re-anchors the next run
    #[tokio::test(start_paused = true)]
    async fn test_update_interval() {
        let (scheduler, handle) = test_scheduler();
        let task = TestTask::new("sync");
        let count = task.run_count();
        let id = handle
            .register(Arc::new(task), Duration::from_secs(3600))
            .await;

        assert!(handle.update_interval(id, Duration::from_secs(60)).await);
        assert!(!handle.update_interval(999, Duration::from_secs(60)).await);

        let join = tokio::spawn(scheduler.run());

        tokio::time::advance(Duration::from_secs(121)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        handle.stop();
        let _ = join.await;
    }

    // Test 9: Manual runs execute immediately and report the task's result
    #[tokio::test]
    async fn test_run_now() {
        let (scheduler, handle) = test_scheduler();
        let task = TestTask::new("sync");
        let count = task.run_count();
        let id = handle
            .register(Arc::new(task), Duration::from_secs(3600))
            .await;

        let join = tokio::spawn(scheduler.run());

        let result = handle.run_now(id).await;
        assert!(result.is_ok());
        assert_eq!(count.load(Ordering::SeqCst), 1);

        handle.stop();
        let _ = timeout(Duration::from_secs(1), join).await;
    }

    // Test 10: A manual run surfaces the task's failure to the caller
    #[tokio::test]
    async fn test_run_now_reports_failure() {
        let (scheduler, handle) = test_scheduler();
        let id = handle
            .register(
                Arc::new(TestTask::failing("broken")),
                Duration::from_secs(3600),
            )
            .await;

        let join = tokio::spawn(scheduler.run());

        let result = handle.run_now(id).await;
        assert!(matches!(result, Err(AppError::Internal(msg)) if msg.contains("task failed")));

        handle.stop();
        let _ = timeout(Duration::from_secs(1), join).await;
    }

    // Test 11: A manual run for an unknown ID is an error
    #[tokio::test]
    async fn test_run_now_unknown_task() {
        let (scheduler, handle) = test_scheduler();
        let join = tokio::spawn(scheduler.run());

        let result = handle.run_now(42).await;
        assert!(matches!(result, Err(AppError::Internal(msg)) if msg.contains("No task")));

        handle.stop();
        let _ = timeout(Duration::from_secs(1), join).await;
    }

    // Test 12: Stop halts the loop promptly
    #[tokio::test]
    async fn test_stop() {
        let (scheduler, handle) = test_scheduler();
        handle
            .register(Arc::new(TestTask::new("sync")), Duration::from_secs(3600))
            .await;

        let join = tokio::spawn(scheduler.run());
        tokio::task::yield_now().await;

        handle.stop();
        let result = timeout(Duration::from_secs(1), join).await;
        assert!(result.is_ok());
    }

    // Test 13: Tasks can be registered while the loop is running
    #[tokio::test]
    async fn test_register_after_start() {
        tokio::time::pause();

        let (scheduler, handle) = test_scheduler();
        let join = tokio::spawn(scheduler.run());
        tokio::task::yield_now().await;

        let task = TestTask::new("late");
        let count = task.run_count();
        handle
            .register(Arc::new(task), Duration::from_secs(60))
            .await;

        tokio::time::advance(Duration::from_secs(121)).await;
        tokio::task::yield_now().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);

        handle.stop();
        let _ = join.await;
    }
}
