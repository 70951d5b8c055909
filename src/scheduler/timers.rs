// src/scheduler/timers.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::DedupScheduler;

#[derive(Clone, Copy, Debug)]
pub struct TimerCfg {
    pub first_delay: Duration,
    pub every: Duration,
}

/// Channel sweep for the process lifetime.
pub fn spawn_sweep_timer(sched: Arc<DedupScheduler>, cfg: TimerCfg) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + cfg.first_delay, cfg.every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let report = sched.sweep_cycle().await;
            tracing::debug!(
                target: "timers",
                delivered = report.delivered.len(),
                "sweep tick"
            );
        }
    })
}

/// Per-chat manual timers started by `/start`. One timer per chat; starting
/// again replaces the running one.
pub struct ChatTimers {
    sched: Arc<DedupScheduler>,
    cfg: TimerCfg,
    running: Mutex<HashMap<i64, JoinHandle<()>>>,
}

impl ChatTimers {
    pub fn new(sched: Arc<DedupScheduler>, cfg: TimerCfg) -> Self {
        Self {
            sched,
            cfg,
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true when a previous timer for the chat was replaced.
    pub fn start(&self, chat_id: i64) -> bool {
        let sched = self.sched.clone();
        let cfg = self.cfg;
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + cfg.first_delay, cfg.every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let report = sched.manual_cycle(chat_id).await;
                tracing::debug!(
                    target: "timers",
                    chat_id,
                    delivered = report.delivered.len(),
                    "chat tick"
                );
            }
        });

        let previous = self
            .running
            .lock()
            .expect("chat timers mutex poisoned")
            .insert(chat_id, handle);
        match previous {
            Some(old) => {
                old.abort();
                true
            }
            None => false,
        }
    }

    /// Returns true when a timer was running for the chat.
    pub fn stop(&self, chat_id: i64) -> bool {
        let removed = self
            .running
            .lock()
            .expect("chat timers mutex poisoned")
            .remove(&chat_id);
        match removed {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn active(&self) -> usize {
        self.running
            .lock()
            .expect("chat timers mutex poisoned")
            .len()
    }

    pub fn shutdown(&self) {
        let mut running = self.running.lock().expect("chat timers mutex poisoned");
        for (_, handle) in running.drain() {
            handle.abort();
        }
    }
}

impl Drop for ChatTimers {
    fn drop(&mut self) {
        if let Ok(mut running) = self.running.lock() {
            for (_, handle) in running.drain() {
                handle.abort();
            }
        }
    }
}
