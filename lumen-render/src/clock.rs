//! Display-rate frame clock and the shared dirty flag.
//!
//! The clock runs on its own thread and only ever reads the dirty flag.
//! When the flag is set it posts a `FrameTick` to the render thread over a
//! channel of capacity one, so ticks the render thread has not consumed yet
//! are coalesced instead of queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::{RendererError, Result};

/// "Needs display" flag shared between the host, the clock and the renderer.
#[derive(Debug, Clone)]
pub struct DirtyFlag(Arc<AtomicBool>);

impl Default for DirtyFlag {
    fn default() -> Self {
        Self::new()
    }
}

impl DirtyFlag {
    /// A new flag, initially dirty so the first frame is drawn.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Request a redraw.
    #[inline]
    pub fn mark(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Clear the flag, returning whether it was set.
    #[inline]
    pub fn take(&self) -> bool {
        self.0.swap(false, Ordering::AcqRel)
    }
}

/// One display refresh that found the flag set.
#[derive(Debug, Clone, Copy)]
pub struct FrameTick {
    /// Ticks the clock has produced so far, including coalesced ones.
    pub sequence: u64,
    pub timestamp: Instant,
}

#[derive(Debug, Default)]
struct ClockCounters {
    sent: AtomicU64,
    coalesced: AtomicU64,
}

/// Background thread ticking at a fixed rate. Stopped and joined on drop.
pub struct FrameClock {
    running: Arc<AtomicBool>,
    counters: Arc<ClockCounters>,
    handle: Option<JoinHandle<()>>,
}

impl FrameClock {
    /// Spawn the clock. Returns it with the receiving end for the render thread.
    pub fn start(refresh_rate_hz: f32, dirty: DirtyFlag) -> Result<(Self, Receiver<FrameTick>)> {
        if !(refresh_rate_hz.is_finite() && refresh_rate_hz > 0.0) {
            return Err(RendererError::InvalidConfig(format!(
                "refresh_rate_hz must be positive, got {refresh_rate_hz}"
            )));
        }

        let interval = Duration::from_secs_f64(1.0 / refresh_rate_hz as f64);
        let (tx, rx) = mpsc::sync_channel(1);
        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::new(ClockCounters::default());

        let handle = {
            let running = running.clone();
            let counters = counters.clone();
            thread::Builder::new()
                .name("lumen-frame-clock".into())
                .spawn(move || run(interval, dirty, tx, running, counters))
                .map_err(RendererError::ClockThread)?
        };

        debug!("frame clock started at {refresh_rate_hz} Hz");
        Ok((
            Self {
                running,
                counters,
                handle: Some(handle),
            },
            rx,
        ))
    }

    /// Ticks delivered to the channel.
    pub fn ticks_sent(&self) -> u64 {
        self.counters.sent.load(Ordering::Relaxed)
    }

    /// Ticks dropped because the previous one was still pending.
    pub fn ticks_coalesced(&self) -> u64 {
        self.counters.coalesced.load(Ordering::Relaxed)
    }

    /// Stop the thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!("frame clock stopped");
        }
    }
}

impl Drop for FrameClock {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run(
    interval: Duration,
    dirty: DirtyFlag,
    tx: SyncSender<FrameTick>,
    running: Arc<AtomicBool>,
    counters: Arc<ClockCounters>,
) {
    let mut next = Instant::now() + interval;
    let mut sequence = 0u64;

    while running.load(Ordering::Acquire) {
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        }
        // Skip missed deadlines instead of bursting to catch up.
        next = (next + interval).max(Instant::now());
        sequence += 1;

        if !dirty.is_dirty() {
            continue;
        }

        match tx.try_send(FrameTick { sequence, timestamp: Instant::now() }) {
            Ok(()) => {
                counters.sent.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) => {
                counters.coalesced.fetch_add(1, Ordering::Relaxed);
                trace!("frame tick {sequence} coalesced");
            }
            Err(TrySendError::Disconnected(_)) => break,
        }
    }
}
