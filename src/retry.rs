// src/retry.rs
use std::collections::{HashMap, HashSet};

/// Capped retry counter for links whose delivery keeps failing.
/// - A link may be attempted until it has failed `max_attempts` times.
/// - The failure that reaches the cap dead-letters the link for the rest of
///   the process lifetime.
/// - A successful delivery clears its counter.
#[derive(Debug, Clone)]
pub struct DeliveryAttempts {
    max_attempts: u32,
    failures: HashMap<String, u32>,
    dead: HashSet<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Will be attempted again next cycle.
    WillRetry { failures: u32 },
    /// Cap reached on this failure.
    DeadLettered,
}

impl DeliveryAttempts {
    /// `max_attempts` of 0 is treated as 1.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            failures: HashMap::new(),
            dead: HashSet::new(),
        }
    }

    /// Check if `link` may be attempted. Does NOT mutate state.
    pub fn should_attempt(&self, link: &str) -> bool {
        !self.dead.contains(link)
    }

    pub fn record_failure(&mut self, link: &str) -> FailureOutcome {
        let count = self.failures.entry(link.to_string()).or_insert(0);
        *count += 1;
        if *count >= self.max_attempts {
            self.failures.remove(link);
            self.dead.insert(link.to_string());
            FailureOutcome::DeadLettered
        } else {
            FailureOutcome::WillRetry { failures: *count }
        }
    }

    pub fn record_success(&mut self, link: &str) {
        self.failures.remove(link);
    }
}
