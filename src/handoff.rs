// ── Render-thread handoff ─────────────────────────────────────────────────────
//
// `Registry` never leaves the render thread.  Other threads package the work
// they want done as a closure, send it through a `RenderHandle`, and the
// render thread runs it with the registry during its next `drain` (the
// plugin drains once per flight loop).

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::error::{Error, Result};
use crate::host::Host;
use crate::registry::Registry;

type Task<H> = Box<dyn FnOnce(&Registry<H>) + Send>;

/// Tasks beyond this many per `drain` wait for the next one, so a task that
/// keeps resubmitting itself cannot stall a frame.
const MAX_TASKS_PER_DRAIN: usize = 1024;

/// Receiving end; lives on the render thread next to the registry.
pub struct RenderQueue<H: Host> {
    tx: Sender<Task<H>>,
    rx: Receiver<Task<H>>,
}

/// Sending end.  `Send + Sync + Clone`; hand one to each worker thread.
pub struct RenderHandle<H: Host> {
    tx: Sender<Task<H>>,
}

impl<H: Host> Clone for RenderHandle<H> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<H: Host> Default for RenderQueue<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Host> RenderQueue<H> {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        Self { tx, rx }
    }

    pub fn handle(&self) -> RenderHandle<H> {
        RenderHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run queued tasks against `registry`.  Returns how many ran.
    ///
    /// A panicking task is logged and skipped; the rest still run.
    pub fn drain(&self, registry: &Registry<H>) -> usize {
        let mut ran = 0;
        while ran < MAX_TASKS_PER_DRAIN {
            let Ok(task) = self.rx.try_recv() else {
                break;
            };
            if catch_unwind(AssertUnwindSafe(|| task(registry))).is_err() {
                log::error!("render-thread task panicked");
            }
            ran += 1;
        }
        if ran == MAX_TASKS_PER_DRAIN {
            log::debug!("render queue still busy after {ran} tasks; continuing next frame");
        }
        ran
    }

    /// Drop queued tasks unrun, e.g. when no registry could be built.
    pub fn discard(&self) -> usize {
        self.rx.try_iter().count()
    }
}

impl<H: Host> RenderHandle<H> {
    /// Queue `task` for the render thread.
    ///
    /// Fails with `QueueClosed` once the `RenderQueue` is gone.
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce(&Registry<H>) + Send + 'static,
    {
        self.tx.send(Box::new(task)).map_err(|_| Error::QueueClosed)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
