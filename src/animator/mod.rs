//! Idle animation shown while the input is silent.
//!
//! An [`Animator`] owns one worker thread for the life of the process. The
//! worker sleeps on a single-slot wake channel while idle and renders one
//! frame per interval while running. Frames are rendered with the engine
//! lock held and `stop()` takes the same lock, so once `stop()` returns the
//! animator has turned off everything it lit and will not write again until
//! the next `start()`.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
    time::Duration,
};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace};

use crate::{
    driver::{PadCommand, PadGrid},
    topology::PadTopology,
    util::Interval,
};

mod pulse;
mod row;

pub use pulse::TravelingPulse;
pub use row::RowPulse;

/// A frame generator. `next_frame` writes the intensity of every pad into
/// `frame` (zero is unlit) and advances.
pub trait Animation: Send {
    /// Rewinds to the first frame.
    fn reset(&mut self);

    fn next_frame(&mut self, frame: &mut [u8]);
}

impl<A: Animation + ?Sized> Animation for Box<A> {
    fn reset(&mut self) {
        (**self).reset()
    }

    fn next_frame(&mut self, frame: &mut [u8]) {
        (**self).next_frame(frame)
    }
}

struct Engine {
    animation: Box<dyn Animation>,
    frame: Vec<u8>,
    lit: Vec<u8>,
}

struct Shared {
    running: AtomicBool,
    engine: Mutex<Engine>,
    topology: Arc<PadTopology>,
    grid: PadGrid,
    wake_tx: flume::Sender<()>,
}

/// Start/stop access to a running animator.
#[derive(Clone)]
pub struct AnimatorHandle(Arc<Shared>);

impl AnimatorHandle {
    fn new(
        animation: Box<dyn Animation>,
        topology: Arc<PadTopology>,
        grid: PadGrid,
    ) -> (Self, flume::Receiver<()>) {
        let (wake_tx, wake_rx) = flume::bounded(1);
        let pads = topology.len();

        let shared = Shared {
            running: AtomicBool::new(false),
            engine: Mutex::new(Engine {
                animation,
                frame: vec![0; pads],
                lit: vec![0; pads],
            }),
            topology,
            grid,
            wake_tx,
        };

        (Self(Arc::new(shared)), wake_rx)
    }

    pub fn is_running(&self) -> bool {
        self.0.running.load(Ordering::Acquire)
    }

    /// Starts the animation from its first frame. Returns `false` if it was
    /// already running, in which case nothing changes.
    pub fn start(&self) -> bool {
        if self.is_running() {
            return false;
        }

        let mut engine = self.0.engine.lock();
        if self.0.running.load(Ordering::Acquire) {
            return false;
        }

        engine.animation.reset();
        self.0.running.store(true, Ordering::Release);
        drop(engine);

        debug!("silence animation started");
        let _ = self.0.wake_tx.try_send(());

        true
    }

    /// Stops the animation and turns off every pad it had lit before
    /// returning. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        if !self.is_running() {
            return false;
        }

        let mut engine = self.0.engine.lock();
        if !self.0.running.swap(false, Ordering::AcqRel) {
            return false;
        }

        let mut grid = self.0.grid.lock();
        for (pad, value) in engine.lit.iter_mut().enumerate() {
            if *value != 0 {
                grid.send(PadCommand::off(self.0.topology.note(pad)));
                *value = 0;
            }
        }

        debug!("silence animation stopped");

        true
    }

    /// Renders one frame if running, sending only the pads that changed.
    fn render_frame(&self) {
        let mut engine = self.0.engine.lock();
        if !self.0.running.load(Ordering::Acquire) {
            return;
        }

        let Engine {
            animation,
            frame,
            lit,
        } = &mut *engine;

        frame.fill(0);
        animation.next_frame(frame);

        let mut grid = self.0.grid.lock();
        for (pad, (&want, have)) in frame.iter().zip(lit.iter_mut()).enumerate() {
            if want == *have {
                continue;
            }

            let note = self.0.topology.note(pad);
            grid.send(if want == 0 {
                PadCommand::off(note)
            } else {
                PadCommand::on(note, want)
            });
            *have = want;
        }
    }
}

/// Owns the animation worker thread.
pub struct Animator {
    handle: AnimatorHandle,
    ct: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl Animator {
    pub fn spawn(
        ct: CancellationToken,
        animation: impl Animation + 'static,
        topology: Arc<PadTopology>,
        grid: PadGrid,
        period: Duration,
    ) -> Self {
        let (handle, wake_rx) = AnimatorHandle::new(Box::new(animation), topology, grid);
        let ct = ct.child_token();

        let worker = {
            let handle = handle.clone();
            let ct = ct.clone();
            std::thread::spawn(move || run(handle, ct, wake_rx, period))
        };

        Self {
            handle,
            ct,
            worker: Some(worker),
        }
    }

    pub fn handle(&self) -> AnimatorHandle {
        self.handle.clone()
    }

    /// Stops the animation (clearing its pads) and joins the worker.
    pub fn shutdown(&mut self) {
        self.handle.stop();
        self.ct.cancel();

        if let Some(worker) = self.worker.take() {
            let _ = self.handle.0.wake_tx.try_send(());
            if worker.join().is_err() {
                error!("silence animation worker panicked");
            }
            debug!("silence animation worker exited");
        }
    }
}

impl Drop for Animator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(
    handle: AnimatorHandle,
    ct: CancellationToken,
    wake_rx: flume::Receiver<()>,
    period: Duration,
) {
    let mut interval = Interval::new(period);

    while !ct.is_cancelled() {
        if !handle.is_running() {
            // idle until started, but look at the flag at least once a frame
            match wake_rx.recv_timeout(period) {
                Ok(()) => interval.reset(),
                Err(flume::RecvTimeoutError::Timeout) => {}
                Err(flume::RecvTimeoutError::Disconnected) => break,
            }
            continue;
        }

        trace!("rendering silence frame");
        handle.render_frame();
        interval.tick();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::Animation;

    /// Lights every pad at a fixed intensity and counts restarts.
    #[derive(Clone, Default)]
    pub struct Counting {
        pub resets: Arc<AtomicUsize>,
        pub frames: Arc<AtomicUsize>,
    }

    impl Counting {
        pub fn resets(&self) -> usize {
            self.resets.load(Ordering::SeqCst)
        }
    }

    impl Animation for Counting {
        fn reset(&mut self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }

        fn next_frame(&mut self, frame: &mut [u8]) {
            self.frames.fetch_add(1, Ordering::SeqCst);
            frame.fill(7);
        }
    }

    pub fn detached(
        animation: impl Animation + 'static,
        topology: Arc<crate::topology::PadTopology>,
        grid: crate::driver::PadGrid,
    ) -> super::AnimatorHandle {
        super::AnimatorHandle::new(Box::new(animation), topology, grid).0
    }

    /// Renders one frame, as the worker would.
    pub fn step(handle: &super::AnimatorHandle) {
        handle.render_frame();
    }
}
