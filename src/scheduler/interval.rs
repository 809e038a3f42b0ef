//! Native frame loop on top of `tokio::time`.
//!
//! Hosts without a display link pace frames with an [`IntervalTickSource`].
//! [`run_interval_loop`] waits for each pending deadline and forwards it to
//! the scheduler until the cancellation token fires or nothing is pending.
//!
//! ```ignore
//! let ticker = IntervalTickSource::from_fps(config.target_fps);
//! let mut scheduler = FrameScheduler::new(config, ticker.clone());
//! let cancel = CancellationToken::new();
//! run_interval_loop(&mut scheduler, ticker, cancel.child_token()).await;
//! ```
//!
//! The scheduler is single-threaded, so the future is not `Send`; run it
//! with `block_on` or inside a `LocalSet`.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::clock::IntervalTickSource;
use crate::scheduler::budget::frame_interval_ms;
use crate::scheduler::driver::FrameScheduler;

/// Drive `scheduler` from `ticker` until `cancel` fires.
///
/// `ticker` must share state with the tick source the scheduler was built
/// with. The loop starts the scheduler, keeps the ticker's interval in step
/// with the effective frame rate, and stops the scheduler on cancellation.
/// It also returns once no tick is pending, e.g. after a config update
/// disabled the scheduler.
///
/// Frames follow the ticker's fixed grid, so callback time does not stretch
/// the frame period until it exceeds the interval.
pub async fn run_interval_loop(
    scheduler: &mut FrameScheduler,
    ticker: IntervalTickSource,
    cancel: CancellationToken,
) {
    ticker.set_interval(interval_for(scheduler.effective_fps()));
    scheduler.start();
    info!(target_fps = scheduler.effective_fps(), "interval frame loop started");

    loop {
        let Some(deadline) = ticker.pending_deadline() else {
            debug!("no tick pending; leaving interval frame loop");
            break;
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                scheduler.stop();
                break;
            }
            () = tokio::time::sleep_until(deadline) => {
                // `tick` requests the next deadline using this interval.
                ticker.set_interval(interval_for(scheduler.effective_fps()));
                scheduler.tick();
            }
        }
    }

    info!("interval frame loop stopped");
}

fn interval_for(fps: f64) -> Duration {
    Duration::from_secs_f64(frame_interval_ms(fps) / 1000.0)
}
