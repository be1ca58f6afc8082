//! Driving tick-polled futures from synchronous tests.

use std::future::Future;

use depot_assets::AssetContext;
use futures_lite::future::{block_on, poll_once};

/// Ticks [`run_ticked`] performs before giving up.
pub const MAX_TICKS: usize = 1_000;

/// Poll `future` once per module tick until it resolves.
///
/// # Panics
///
/// Panics if the future is still pending after [`MAX_TICKS`] ticks.
pub fn run_ticked<F: Future>(context: &AssetContext, future: F) -> F::Output {
    run_ticked_with(context, future, |_| {})
}

/// Like [`run_ticked`], calling `between` with the tick number before each tick.
///
/// Tests use `between` to advance native work, for example to pump downloads.
pub fn run_ticked_with<F: Future>(context: &AssetContext, future: F, mut between: impl FnMut(usize)) -> F::Output {
    let mut future = std::pin::pin!(future);
    for tick in 0..MAX_TICKS {
        if let Some(output) = block_on(poll_once(&mut future)) {
            return output;
        }
        between(tick);
        context.scheduler().tick();
    }
    panic!("future still pending after {} ticks", MAX_TICKS);
}

/// Poll `future` once without ticking.
pub fn poll_now<F: Future + Unpin>(future: &mut F) -> Option<F::Output> {
    block_on(poll_once(future))
}
