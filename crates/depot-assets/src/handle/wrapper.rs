//! The pooled wrapper behind every handle type.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::context::AssetContext;
use crate::error::HandleError;
use crate::native::NativeOperation;
use crate::pool::{HandlePool, Poolable};
use crate::state::{HandleStatus, Phase};

pub(crate) const CANCELED_MESSAGE: &str = "operation was canceled";

/// Reads a typed result out of a finished native operation.
pub(crate) type Extract<O, R> = fn(&O) -> Result<R, String>;

/// The reusable part of a handle. Taken from a [`HandlePool`] on issue and
/// returned to it, cleared, on dispose.
pub(crate) struct Slot<O: ?Sized, R> {
    pub(crate) op: Option<Arc<O>>,
    pub(crate) phase: Phase,
    pub(crate) error: String,
    pub(crate) result: Option<R>,
    pub(crate) cancel: Option<CancellationToken>,
    pub(crate) location: String,
}

impl<O: ?Sized, R> Default for Slot<O, R> {
    fn default() -> Self {
        Self {
            op: None,
            phase: Phase::Pending,
            error: String::new(),
            result: None,
            cancel: None,
            location: String::new(),
        }
    }
}

impl<O, R> Poolable for Slot<O, R>
where
    O: NativeOperation + ?Sized + 'static,
    R: Send + 'static,
{
    fn reset(&mut self) {
        self.op = None;
        self.phase = Phase::Pending;
        self.error.clear();
        self.result = None;
        self.cancel = None;
        self.location.clear();
    }
}

impl<O: NativeOperation + ?Sized, R> Slot<O, R> {
    /// Advance the state machine by one observation of the native operation.
    ///
    /// Returns the operation if a pending cancellation was observed; the
    /// caller releases it after dropping the slot lock.
    fn step(&mut self, extract: Extract<O, R>) -> Option<Arc<O>> {
        if self.phase != Phase::Polling {
            return None;
        }
        let Some(op) = self.op.as_deref() else {
            self.phase = Phase::Failed;
            self.error.push_str("native operation missing");
            return None;
        };

        if op.is_done() {
            let outcome = match op.error() {
                Some(error) => Err(error),
                None => extract(op),
            };
            match outcome {
                Ok(result) => {
                    self.result = Some(result);
                    self.phase = Phase::Completed;
                }
                Err(error) => {
                    self.error = if error.is_empty() {
                        format!("failed to load '{}'", self.location)
                    } else {
                        error
                    };
                    self.phase = Phase::Failed;
                }
            }
            None
        } else if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            self.mark_canceled();
            self.op.take()
        } else {
            None
        }
    }

    fn mark_canceled(&mut self) {
        self.phase = Phase::Canceled;
        self.error.clear();
        self.error.push_str(CANCELED_MESSAGE);
    }
}

/// The slot cell a handle shares with its [`Watch`]es. Empty once disposed.
type SharedSlot<O, R> = Arc<Mutex<Option<Box<Slot<O, R>>>>>;

/// Step the slot in `cell`, then read it.
///
/// Also returns the operation if a cancellation was observed; the caller
/// releases it. Returns `None` once disposed.
fn step_and_read<O, R, T>(
    cell: &Mutex<Option<Box<Slot<O, R>>>>,
    extract: Extract<O, R>,
    read: impl FnOnce(&mut Slot<O, R>) -> T,
) -> Option<(T, Option<Arc<O>>)>
where
    O: NativeOperation + ?Sized,
{
    let mut guard = cell.lock();
    let slot = guard.as_mut()?;
    let canceled = slot.step(extract);
    Some((read(slot), canceled))
}

/// Everything needed to issue a handle.
pub(crate) struct Ticket<'a> {
    pub(crate) context: &'a Arc<AssetContext>,
    pub(crate) package: &'a Arc<str>,
    pub(crate) id: u64,
    pub(crate) location: &'a str,
    pub(crate) kind: &'static str,
    pub(crate) cancel: Option<CancellationToken>,
}

/// Exclusive owner of one native operation.
///
/// Dispose is guarded by an atomic flag: repeated or concurrent calls release
/// the native operation at most once. Dropping the core disposes it.
pub(crate) struct HandleCore<O, R>
where
    O: NativeOperation + ?Sized + 'static,
    R: Send + 'static,
{
    id: u64,
    package: Arc<str>,
    disposed: AtomicBool,
    slot: SharedSlot<O, R>,
    pool: Arc<HandlePool<Slot<O, R>>>,
    context: Arc<AssetContext>,
    extract: Extract<O, R>,
    interrupt: fn(&O),
}

impl<O, R> HandleCore<O, R>
where
    O: NativeOperation + ?Sized + 'static,
    R: Send + 'static,
{
    /// Take a wrapper from `H`'s pool and issue the native operation.
    ///
    /// `start` is never called if the ticket's token is already canceled.
    pub(crate) fn issue<H: 'static>(ticket: Ticket<'_>, extract: Extract<O, R>, start: impl FnOnce() -> Box<O>) -> Self {
        let Ticket {
            context,
            package,
            id,
            location,
            kind,
            cancel,
        } = ticket;

        let pool = context.pools().pool::<H, Slot<O, R>>();
        let mut slot = pool.get();
        slot.location.push_str(location);

        if cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            tracing::debug!("{} '{}' canceled before issue", kind, location);
            slot.mark_canceled();
        } else {
            slot.op = Some(Arc::from(start()));
            slot.phase = Phase::Polling;
            slot.cancel = cancel;
        }

        context
            .tracker()
            .register(package, id, || format!("{} {}", kind, location));

        Self {
            id,
            package: Arc::clone(package),
            disposed: AtomicBool::new(false),
            slot: Arc::new(Mutex::new(Some(slot))),
            pool,
            context: Arc::clone(context),
            extract,
            interrupt: |_| {},
        }
    }

    /// Run `interrupt` on the native operation before releasing it when a
    /// cancellation is observed.
    pub(crate) fn with_interrupt(mut self, interrupt: fn(&O)) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn package(&self) -> &str {
        &self.package
    }

    pub(crate) fn same_package(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.package, &other.package) || self.package == other.package
    }

    /// Step the state machine, then read the slot.
    ///
    /// Returns `None` once disposed.
    fn refresh<T>(&self, read: impl FnOnce(&mut Slot<O, R>) -> T) -> Option<T> {
        let (out, canceled) = step_and_read(&self.slot, self.extract, read)?;
        if let Some(op) = canceled {
            tracing::debug!("Handle {} of package '{}' canceled", self.id, self.package);
            (self.interrupt)(&*op);
            op.release();
        }
        Some(out)
    }

    pub(crate) fn status(&self) -> HandleStatus {
        if self.disposed.load(Ordering::Acquire) {
            return HandleStatus::Disposed;
        }
        self.refresh(|slot| HandleStatus::from(slot.phase))
            .unwrap_or(HandleStatus::Disposed)
    }

    pub(crate) fn is_done(&self) -> bool {
        self.status().is_done()
    }

    pub(crate) fn progress(&self) -> f32 {
        self.refresh(|slot| match slot.phase {
            Phase::Pending => 0.0,
            Phase::Polling => slot
                .op
                .as_deref()
                .map(|op| op.progress().clamp(0.0, 1.0))
                .unwrap_or(0.0),
            _ => 1.0,
        })
        .unwrap_or(1.0)
    }

    pub(crate) fn error(&self) -> String {
        self.refresh(|slot| slot.error.clone()).unwrap_or_default()
    }

    pub(crate) fn location(&self) -> String {
        self.refresh(|slot| slot.location.clone()).unwrap_or_default()
    }

    /// Read the result, if the handle completed and is not disposed.
    pub(crate) fn result<T>(&self, read: impl FnOnce(&R) -> T) -> Option<T> {
        self.refresh(|slot| slot.result.as_ref().map(read)).flatten()
    }

    /// The native operation, while this handle still owns it.
    ///
    /// Callers run native code on the returned operation without holding the
    /// slot lock, so a concurrent dispose may release it in the meantime.
    pub(crate) fn op(&self) -> Option<Arc<O>> {
        self.slot.lock().as_ref()?.op.clone()
    }

    /// Run `f` against the native operation while it is still owned.
    pub(crate) fn with_op<T>(&self, f: impl FnOnce(&O) -> T) -> Option<T> {
        self.op().map(|op| f(&op))
    }

    /// Force the native operation to finish where the provider supports it.
    pub(crate) fn wait(&self) {
        let op = {
            let guard = self.slot.lock();
            guard
                .as_ref()
                .filter(|slot| slot.phase == Phase::Polling)
                .and_then(|slot| slot.op.clone())
        };
        if let Some(op) = op {
            op.wait_for_completion();
        }
        self.refresh(|_| ());
    }

    /// A non-owning view of this handle's state for other operations to
    /// wait on.
    pub(crate) fn watch(&self) -> Watch<O, R> {
        Watch {
            id: self.id,
            package: Arc::clone(&self.package),
            slot: Arc::clone(&self.slot),
            extract: self.extract,
            interrupt: self.interrupt,
        }
    }

    /// Observe `token` from now on.
    pub(crate) fn set_cancel(&self, token: CancellationToken) {
        if let Some(slot) = self.slot.lock().as_mut() {
            slot.cancel = Some(token);
        }
    }

    /// Cancel immediately: run `before_release` on the operation, then release it.
    ///
    /// Returns `false` if there was nothing left to cancel.
    pub(crate) fn abort(&self, before_release: impl FnOnce(&O)) -> bool {
        let op = {
            let mut guard = self.slot.lock();
            let Some(slot) = guard.as_mut() else {
                return false;
            };
            if slot.phase.is_terminal() {
                return false;
            }
            slot.mark_canceled();
            slot.op.take()
        };
        if let Some(op) = op {
            before_release(&op);
            op.release();
        }
        true
    }

    pub(crate) fn poll_done(&self, cx: &mut Context<'_>) -> Poll<Result<(), HandleError>> {
        let outcome = self.refresh(|slot| match slot.phase {
            Phase::Completed => Some(Ok(())),
            Phase::Failed => Some(Err(HandleError::Failed(slot.error.clone()))),
            Phase::Canceled => Some(Err(HandleError::Canceled)),
            Phase::Pending | Phase::Polling => None,
        });

        match outcome {
            None => Poll::Ready(Err(HandleError::Disposed)),
            Some(Some(result)) => Poll::Ready(result),
            Some(None) => {
                self.context.scheduler().park(cx.waker());
                Poll::Pending
            }
        }
    }

    pub(crate) fn completion(&self) -> impl Future<Output = Result<(), HandleError>> + '_ {
        futures_lite::future::poll_fn(move |cx| self.poll_done(cx))
    }

    /// Release the native operation, unregister and return the wrapper to its pool.
    pub(crate) fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }

        let slot = self.slot.lock().take();
        if let Some(mut slot) = slot {
            if let Some(op) = slot.op.take() {
                op.release();
            }
            self.pool.release(slot);
        }
        self.context.tracker().unregister(&self.package, self.id);
        tracing::trace!("Disposed handle {} of package '{}'", self.id, self.package);
    }

    pub(crate) fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }
}

impl<O, R> Drop for HandleCore<O, R>
where
    O: NativeOperation + ?Sized + 'static,
    R: Send + 'static,
{
    fn drop(&mut self) {
        self.dispose();
    }
}

/// What a [`Watch`] saw.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Observed<R> {
    Pending,
    Ready(R),
    /// Failed or canceled, with the handle's error message.
    Failed(String),
    /// The watched handle was disposed.
    Gone,
}

/// Observes another handle's state without owning its operation.
///
/// Observing steps the watched handle's state machine exactly as its own
/// accessors do, so cancellations are still released once.
pub(crate) struct Watch<O: ?Sized, R> {
    id: u64,
    package: Arc<str>,
    slot: SharedSlot<O, R>,
    extract: Extract<O, R>,
    interrupt: fn(&O),
}

impl<O, R> Watch<O, R>
where
    O: NativeOperation + ?Sized,
    R: Clone,
{
    pub(crate) fn observe(&self) -> Observed<R> {
        let observed = step_and_read(&self.slot, self.extract, |slot| match slot.phase {
            Phase::Completed => slot
                .result
                .clone()
                .map_or_else(|| Observed::Failed("result missing".into()), Observed::Ready),
            Phase::Failed | Phase::Canceled => Observed::Failed(slot.error.clone()),
            Phase::Pending | Phase::Polling => Observed::Pending,
        });
        let Some((observed, canceled)) = observed else {
            return Observed::Gone;
        };
        if let Some(op) = canceled {
            tracing::debug!("Handle {} of package '{}' canceled", self.id, self.package);
            (self.interrupt)(&*op);
            op.release();
        }
        observed
    }

    /// Force the watched operation to finish where the provider supports it.
    pub(crate) fn wait(&self) {
        let op = {
            let guard = self.slot.lock();
            guard
                .as_ref()
                .filter(|slot| slot.phase == Phase::Polling)
                .and_then(|slot| slot.op.clone())
        };
        if let Some(op) = op {
            op.wait_for_completion();
        }
    }
}

impl<O: ?Sized, R> Clone for Watch<O, R> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            package: Arc::clone(&self.package),
            slot: Arc::clone(&self.slot),
            extract: self.extract,
            interrupt: self.interrupt,
        }
    }
}
