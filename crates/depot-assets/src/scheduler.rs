//! Tick-driven polling for native operations.
//!
//! Native providers do their I/O elsewhere; this layer only polls their
//! "is done" flags. A future that finds its operation unfinished parks its
//! waker on the [`TickScheduler`], and the host wakes all parked futures by
//! calling [`TickScheduler::tick`] once per frame.

use std::future::Future;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Poll, Waker};

use parking_lot::Mutex;

use crate::native::NativeOperation;

/// Per-frame wake source for pending asset futures.
#[derive(Default)]
pub struct TickScheduler {
    parked: Mutex<Vec<Waker>>,
    frame: AtomicU64,
}

impl TickScheduler {
    /// Create a scheduler at frame zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one frame and wake every parked future.
    ///
    /// Returns how many wakers were woken.
    pub fn tick(&self) -> usize {
        let woken = std::mem::take(&mut *self.parked.lock());
        self.frame.fetch_add(1, Ordering::Relaxed);
        let count = woken.len();
        for waker in woken {
            waker.wake();
        }
        count
    }

    /// Park `waker` until the next tick.
    pub fn park(&self, waker: &Waker) {
        let mut parked = self.parked.lock();
        if !parked.iter().any(|w| w.will_wake(waker)) {
            parked.push(waker.clone());
        }
    }

    /// Number of wakers waiting for the next tick.
    pub fn parked(&self) -> usize {
        self.parked.lock().len()
    }

    /// Number of ticks since creation.
    pub fn frame(&self) -> u64 {
        self.frame.load(Ordering::Relaxed)
    }
}

/// Wait until `op` reports done, polling once per tick.
///
/// Resolves to the native error message if the operation failed.
pub fn drive<'a, O>(scheduler: &'a TickScheduler, op: &'a O) -> impl Future<Output = Result<(), String>> + 'a
where
    O: NativeOperation + ?Sized,
{
    futures_lite::future::poll_fn(move |cx| {
        if op.is_done() {
            return Poll::Ready(op.error().map_or(Ok(()), Err));
        }
        scheduler.park(cx.waker());
        Poll::Pending
    })
}

/// Owns a package-level native operation and releases it exactly once on drop.
///
/// Dropping the guard before the operation finishes (for example when a
/// caller abandons the future on timeout) still releases it.
pub struct OpGuard<O: NativeOperation + ?Sized> {
    op: Box<O>,
}

impl<O: NativeOperation + ?Sized> OpGuard<O> {
    /// Take ownership of `op`.
    pub fn new(op: Box<O>) -> Self {
        Self { op }
    }
}

impl<O: NativeOperation + ?Sized> Deref for OpGuard<O> {
    type Target = O;

    fn deref(&self) -> &O {
        &self.op
    }
}

impl<O: NativeOperation + ?Sized> Drop for OpGuard<O> {
    fn drop(&mut self) {
        self.op.release();
    }
}
