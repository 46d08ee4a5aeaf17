// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! Background thread running short periodic tasks.
//!
//! Tasks are expected to be quick, run at most once per frequency period,
//! and have a frequency of a second or more.
//!
//! ```no_run
//! use std::time::Duration;
//! use runez::heartbeat::{Heartbeat, HeartbeatTask};
//!
//! let heartbeat = Heartbeat::new();
//! heartbeat.add_task(HeartbeatTask::new("report", Some(Duration::from_secs(30)), || {
//!     tracing::info!("still alive");
//!     Ok(())
//! }));
//! heartbeat.start();
//! // ...
//! heartbeat.stop();
//! ```

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::Result;

#[cfg(test)]
#[path = "./heartbeat_test.rs"]
mod heartbeat_test;

/// Frequency of tasks that don't state one.
pub const DEFAULT_FREQUENCY: Duration = Duration::from_secs(60);

/// Sleep delay when there are no tasks, new tasks are noticed right away regardless.
const IDLE_DELAY: Duration = Duration::from_secs(1);

/// Shortest sleep between two checks for due tasks.
const MIN_DELAY: Duration = Duration::from_millis(100);

type TaskFn = Arc<dyn Fn() -> Result<()> + Send + Sync>;

/// A task executed periodically.
#[derive(Clone)]
pub struct HeartbeatTask {
    pub name: String,
    pub frequency: Duration,
    next_execution: Instant,
    execute: TaskFn,
}

impl HeartbeatTask {
    pub fn new<F>(name: impl Into<String>, frequency: Option<Duration>, execute: F) -> Self
    where
        F: Fn() -> Result<()> + Send + Sync + 'static,
    {
        let frequency = frequency
            .filter(|f| !f.is_zero())
            .unwrap_or(DEFAULT_FREQUENCY);
        Self {
            name: name.into(),
            frequency,
            next_execution: Instant::now() + frequency,
            execute: Arc::new(execute),
        }
    }

    /// When this task is next due.
    pub fn next_execution(&self) -> Instant {
        self.next_execution
    }
}

impl std::fmt::Debug for HeartbeatTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeartbeatTask")
            .field("name", &self.name)
            .field("frequency", &self.frequency)
            .field("next_execution", &self.next_execution)
            .finish()
    }
}

#[derive(Debug, Default)]
struct State {
    /// Sorted by next execution.
    upcoming: Vec<HeartbeatTask>,
    running: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    wakeup: Condvar,
}

/// Runs registered tasks from a background thread, earliest due first.
#[derive(Debug, Default)]
pub struct Heartbeat {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Heartbeat {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `task`, first due one frequency period from now.
    pub fn add_task(&self, mut task: HeartbeatTask) {
        let mut state = self.shared.state.lock().unwrap();
        task.next_execution = Instant::now() + task.frequency;
        tracing::debug!("Adding heartbeat task {}", task.name);
        state.upcoming.push(task);
        state.upcoming.sort_by_key(|t| t.next_execution);
        self.shared.wakeup.notify_all();
    }

    /// Unregister the task named `name`, returns true if there was one.
    pub fn remove_task(&self, name: &str) -> bool {
        let mut state = self.shared.state.lock().unwrap();
        let count = state.upcoming.len();
        state.upcoming.retain(|t| t.name != name);
        count != state.upcoming.len()
    }

    /// Names of registered tasks, next due first.
    pub fn task_names(&self) -> Vec<String> {
        let state = self.shared.state.lock().unwrap();
        state.upcoming.iter().map(|t| t.name.clone()).collect()
    }

    pub fn is_running(&self) -> bool {
        self.shared.state.lock().unwrap().running
    }

    /// Start the background thread, if not already started.
    pub fn start(&self) {
        let mut worker = self.worker.lock().unwrap();
        if worker.is_some() {
            return;
        }
        self.shared.state.lock().unwrap().running = true;
        let shared = Arc::clone(&self.shared);
        let handle = std::thread::Builder::new()
            .name("heartbeat".to_string())
            .spawn(move || run(&shared));
        match handle {
            Ok(handle) => *worker = Some(handle),
            Err(err) => {
                tracing::warn!("Can't start heartbeat thread: {err}");
                self.shared.state.lock().unwrap().running = false;
            }
        }
    }

    /// Stop executing tasks, and wait for the background thread to exit.
    pub fn stop(&self) {
        let handle = self.worker.lock().unwrap().take();
        self.shared.state.lock().unwrap().running = false;
        self.shared.wakeup.notify_all();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::warn!("Heartbeat thread panicked");
            }
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(shared: &Shared) {
    let mut state = shared.state.lock().unwrap();
    while state.running {
        let now = Instant::now();
        let delay = match state.upcoming.first_mut() {
            Some(task) if task.next_execution <= now => {
                // Bumped before execution, run time does not shift the schedule
                task.next_execution = now + task.frequency;
                let name = task.name.clone();
                let execute = Arc::clone(&task.execute);
                state.upcoming.sort_by_key(|t| t.next_execution);
                drop(state);
                match std::panic::catch_unwind(AssertUnwindSafe(|| execute())) {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => tracing::warn!("Task {name} crashed: {err}"),
                    Err(_) => tracing::warn!("Task {name} panicked"),
                }
                state = shared.state.lock().unwrap();
                continue;
            }
            Some(task) => task.next_execution - now,
            None => IDLE_DELAY,
        };
        let (guard, _) = shared
            .wakeup
            .wait_timeout(state, delay.max(MIN_DELAY))
            .unwrap();
        state = guard;
    }
}
