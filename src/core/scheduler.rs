// Copyright (c) 2026 minewatch contributors
// Licensed under the MIT License. See LICENSE file in the project root.

//! Task scheduler for timed operations

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;
type TaskFn = Arc<dyn Fn() -> TaskFuture + Send + Sync + 'static>;

struct ScheduledTask {
    interval: Duration,
    task: TaskFn,
    enabled: Arc<AtomicBool>,
}

/// Runs named async jobs on fixed intervals until shutdown.
///
/// A tick that arrives while the previous run is still going is delayed,
/// never run concurrently with it.
pub struct Scheduler {
    tasks: Arc<RwLock<HashMap<String, ScheduledTask>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn add_task<F, Fut>(&self, name: &str, interval: Duration, task: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.write().await;
        tasks.insert(
            name.to_string(),
            ScheduledTask {
                interval,
                task: Arc::new(move || Box::pin(task()) as TaskFuture),
                enabled: Arc::new(AtomicBool::new(true)),
            },
        );
        debug!("Scheduled task '{}' with interval {:?}", name, interval);
    }

    pub async fn remove_task(&self, name: &str) {
        let mut tasks = self.tasks.write().await;
        tasks.remove(name);
    }

    /// Pause or resume a task; takes effect on its next tick
    pub async fn enable_task(&self, name: &str, enabled: bool) {
        let tasks = self.tasks.read().await;
        if let Some(task) = tasks.get(name) {
            task.enabled.store(enabled, Ordering::Relaxed);
        }
    }

    /// Spawn one loop per registered task. Each loop runs its first tick
    /// immediately and exits when `shutdown` fires.
    pub async fn start(&self, shutdown: &broadcast::Sender<()>) -> Vec<JoinHandle<()>> {
        let tasks = self.tasks.read().await;
        let mut handles = Vec::with_capacity(tasks.len());

        for (name, scheduled) in tasks.iter() {
            let name = name.clone();
            let period = scheduled.interval;
            let task = Arc::clone(&scheduled.task);
            let enabled = Arc::clone(&scheduled.enabled);
            let mut shutdown_rx = shutdown.subscribe();

            handles.push(tokio::spawn(async move {
                let mut ticker = interval(period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

                loop {
                    tokio::select! {
                        _ = ticker.tick() => {
                            if enabled.load(Ordering::Relaxed) {
                                task().await;
                            }
                        }
                        _ = shutdown_rx.recv() => {
                            info!("Task '{}' shutting down...", name);
                            break;
                        }
                    }
                }
            }));
        }

        handles
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}
