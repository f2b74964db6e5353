//! Cooperative resource limits.
//!
//! Long-running loops call [`ResourceLimit::check`] once per iteration. A check
//! fails when the wall-clock deadline passed, the step budget ran out, or a
//! [`CancelHandle`] was triggered from elsewhere.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LimitExceeded {
    #[error("{context}: timed out after {limit_ms}ms")]
    Timeout { context: String, limit_ms: u64 },
    #[error("{context}: step budget of {budget} exhausted")]
    Budget { context: String, budget: u64 },
    #[error("{context}: cancelled")]
    Cancelled { context: String },
}

/// Limit settings. Zero disables the corresponding limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitConfig {
    pub timeout_ms: u64,
    pub step_budget: u64,
}

/// Shared flag for cancelling a running operation from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

fn deadline_from_timeout_ms(timeout_ms: u64) -> Option<Instant> {
    if timeout_ms == 0 {
        None
    } else {
        Instant::now().checked_add(Duration::from_millis(timeout_ms))
    }
}

#[derive(Debug, Clone)]
pub struct ResourceLimit {
    config: LimitConfig,
    deadline: Option<Instant>,
    spent: u64,
    cancel: CancelHandle,
}

impl Default for ResourceLimit {
    fn default() -> Self {
        Self::new(LimitConfig::default())
    }
}

impl ResourceLimit {
    /// Start the clock for `config`.
    pub fn new(config: LimitConfig) -> Self {
        Self {
            config,
            deadline: deadline_from_timeout_ms(config.timeout_ms),
            spent: 0,
            cancel: CancelHandle::new(),
        }
    }

    /// No deadline, no budget.
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn with_cancel(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn spent(&self) -> u64 {
        self.spent
    }

    /// Count one step and fail if any limit is exceeded.
    pub fn check(&mut self, context: &str) -> Result<(), LimitExceeded> {
        self.spent += 1;
        if self.cancel.is_cancelled() {
            return Err(LimitExceeded::Cancelled {
                context: context.to_string(),
            });
        }
        if self.config.step_budget > 0 && self.spent > self.config.step_budget {
            debug!(context, spent = self.spent, "step budget exhausted");
            return Err(LimitExceeded::Budget {
                context: context.to_string(),
                budget: self.config.step_budget,
            });
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                debug!(context, spent = self.spent, "deadline reached");
                return Err(LimitExceeded::Timeout {
                    context: context.to_string(),
                    limit_ms: self.config.timeout_ms,
                });
            }
        }
        Ok(())
    }
}
