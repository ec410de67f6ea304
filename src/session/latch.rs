// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! One-shot countdown barrier tracking outstanding task runs.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::{Condvar, Mutex};

use crate::errors::LatchError;
use crate::observability::messages::{session::LatchUnderflow, StructuredLog};

/// Countdown barrier: producers register work with `count_up`, one waiter
/// blocks in `wait` until every registration is cleared.
///
/// The latch releases exactly once, on the `count_down` that takes the count
/// to zero; afterwards `wait` never blocks again. A `count_down` with nothing
/// outstanding is rejected with [`LatchError::Underflow`] and leaves the count
/// at zero.
///
/// # Examples
/// ```
/// use pipeline_session::session::CompletionLatch;
///
/// let latch = CompletionLatch::new();
/// latch.count_up();
/// latch.count_up();
/// latch.count_down().unwrap();
/// assert!(!latch.is_released());
/// latch.count_down().unwrap();
/// assert!(latch.is_released());
/// latch.wait(); // returns immediately
/// ```
#[derive(Debug, Default)]
pub struct CompletionLatch {
    outstanding: AtomicUsize,
    released: AtomicBool,
    gate: Mutex<bool>,
    opened: Condvar,
}

impl CompletionLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one unit of outstanding work.
    pub fn count_up(&self) {
        self.outstanding.fetch_add(1, Ordering::AcqRel);
    }

    /// Clear one unit of outstanding work, releasing waiters when the count reaches zero.
    pub fn count_down(&self) -> Result<(), LatchError> {
        let mut current = self.outstanding.load(Ordering::Acquire);
        loop {
            if current == 0 {
                LatchUnderflow { outstanding: current }.log();
                return Err(LatchError::Underflow { outstanding: current });
            }
            match self.outstanding.compare_exchange_weak(
                current,
                current - 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        if current == 1 {
            self.release();
        }
        Ok(())
    }

    /// Block until the latch has been released.
    ///
    /// Returns immediately if nothing is outstanding or the latch was already released.
    pub fn wait(&self) {
        if self.is_released() || self.outstanding() == 0 {
            return;
        }

        let mut open = self.gate.lock();
        while !*open {
            self.opened.wait(&mut open);
        }
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    fn release(&self) {
        let mut open = self.gate.lock();
        if !*open {
            *open = true;
            self.released.store(true, Ordering::Release);
            self.opened.notify_all();
        }
    }
}
