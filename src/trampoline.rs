// ── One-shot draw interposition ───────────────────────────────────────────────
//
// The host calls draw callbacks through a plain C function pointer with no
// room for extra state, so every injected window points at the same
// `trampoline` function, which finds its way back to the pending hooks via a
// single routing slot.
//
// Single-instance invariant: the routing slot is thread-local (the host has
// one render thread) and holds at most one registry's state.  `RouteLease`
// is the proof of ownership; claiming a second lease on the same thread fails
// with `Error::RegistryActive`.  Multiple live registries are unsupported.

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::c_void;
use std::marker::PhantomData;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::{Error, Result};
use crate::host::WindowId;
use crate::record::{DrawHandler, Record, WordField};

// ── Routing state ─────────────────────────────────────────────────────────────

/// A hook waiting for the next draw of its window.
struct PendingInjection {
    hook: Box<dyn FnOnce()>,
    /// The draw slot's value before the trampoline replaced it.
    original: usize,
}

#[derive(Default)]
struct Route {
    claimed: bool,
    /// Set once discovery has found the draw slot.
    draw: Option<WordField>,
    /// At most one entry per window.
    pending: HashMap<WindowId, PendingInjection>,
}

thread_local! {
    static ROUTE: RefCell<Route> = RefCell::new(Route::default());
}

/// Result of `Registry::inject`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InjectOutcome {
    /// The hook was stored and the draw slot redirected.
    Installed,
    /// The window already has a hook pending.  Nothing changed; the new hook
    /// was dropped without running.
    AlreadyPending,
}

/// The value written into hooked draw slots.
pub(crate) fn address() -> usize {
    DrawHandler::address(trampoline)
}

// ── The trampoline ────────────────────────────────────────────────────────────

/// Installed as the draw callback of injected windows; called by the host.
///
/// Removes the window's pending entry, restores the original draw pointer,
/// runs the hook once, then chains to the original so the frame is still
/// drawn.  Unknown windows are ignored.
extern "C" fn trampoline(window: WindowId, refcon: *mut c_void) {
    let fired = ROUTE
        .try_with(|route| {
            let mut route = route.try_borrow_mut().ok()?;
            let draw = route.draw?;
            let pending = route.pending.remove(&window)?;
            Record::of(window)?.set_word(draw, pending.original);
            Some(pending)
        })
        .ok()
        .flatten();

    // The routing borrow is released here, so the hook may inject again.
    let Some(pending) = fired else {
        log::debug!("trampoline called for {window:?} without a pending hook");
        return;
    };

    if catch_unwind(AssertUnwindSafe(pending.hook)).is_err() {
        log::error!("draw hook for {window:?} panicked");
    }

    if let Some(original) = DrawHandler::from_word(pending.original) {
        original.call(window, refcon);
    }
}

// ── RouteLease ────────────────────────────────────────────────────────────────

/// Exclusive ownership of this thread's routing slot.
///
/// `!Send`: the slot is thread-local, so the lease must stay on the thread
/// that claimed it.
#[derive(Debug)]
pub(crate) struct RouteLease {
    _render_thread: PhantomData<*const ()>,
}

impl RouteLease {
    /// Claim the routing slot, or fail if another registry holds it.
    pub(crate) fn claim() -> Result<Self> {
        ROUTE.with(|route| {
            let mut route = route.borrow_mut();
            if route.claimed {
                return Err(Error::RegistryActive);
            }
            route.claimed = true;
            Ok(Self {
                _render_thread: PhantomData,
            })
        })
    }

    /// Tell the trampoline where the draw slot lives.
    pub(crate) fn bind(&self, draw: WordField) {
        ROUTE.with(|route| route.borrow_mut().draw = Some(draw));
    }

    /// Redirect `record`'s draw slot to the trampoline, unless it already
    /// points there.  In that case the saved original is left untouched.
    pub(crate) fn inject(&self, record: Record, hook: Box<dyn FnOnce()>) -> InjectOutcome {
        let window = record.window();
        ROUTE.with(|route| {
            let mut route = route.borrow_mut();
            let Some(draw) = route.draw else {
                // bind() runs before the registry is handed out.
                return InjectOutcome::AlreadyPending;
            };

            let current = record.word(draw);
            if current == address() {
                log::debug!("draw hook already pending for {window:?}");
                return InjectOutcome::AlreadyPending;
            }

            let stale = route.pending.insert(
                window,
                PendingInjection {
                    hook,
                    original: current,
                },
            );
            if stale.is_some() {
                log::warn!("draw slot of {window:?} was rewritten; replacing its stale hook");
            }
            record.set_word(draw, address());
            InjectOutcome::Installed
        })
    }

    /// Drop `window`'s pending hook without running it and restore its draw
    /// slot.  Returns whether a hook was pending.
    pub(crate) fn cancel(&self, record: Record) -> bool {
        ROUTE.with(|route| {
            let mut route = route.borrow_mut();
            let Some(draw) = route.draw else {
                return false;
            };
            match route.pending.remove(&record.window()) {
                Some(pending) => {
                    if record.word(draw) == address() {
                        record.set_word(draw, pending.original);
                    }
                    true
                }
                None => false,
            }
        })
    }

    /// Windows with a hook still waiting for their next draw.
    pub(crate) fn pending(&self) -> Vec<WindowId> {
        ROUTE.with(|route| route.borrow().pending.keys().copied().collect())
    }

    /// Undo every pending hook on windows still in `live`; forget the rest.
    /// Called when the registry goes away, since nobody would route the
    /// trampoline afterwards.
    pub(crate) fn restore_all(&self, live: &[WindowId]) {
        let pending: Vec<(WindowId, PendingInjection)> =
            ROUTE.with(|route| route.borrow_mut().pending.drain().collect());
        let draw = ROUTE.with(|route| route.borrow().draw);
        let Some(draw) = draw else {
            return;
        };

        for (window, entry) in pending {
            if !live.contains(&window) {
                log::debug!("dropping hook for vanished window {window:?}");
                continue;
            }
            if let Some(record) = Record::of(window) {
                if record.word(draw) == address() {
                    record.set_word(draw, entry.original);
                }
            }
        }
    }
}

impl Drop for RouteLease {
    fn drop(&mut self) {
        // try_with: the registry may be dropped during thread teardown.
        let _ = ROUTE.try_with(|route| {
            if let Ok(mut route) = route.try_borrow_mut() {
                *route = Route::default();
            }
        });
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
//
// End-to-end injection behaviour is tested through `Registry` in
// `registry.rs`; these cover the routing slot itself.

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_claim_on_the_same_thread_fails() {
        let first = RouteLease::claim().expect("first claim");
        assert!(matches!(RouteLease::claim(), Err(Error::RegistryActive)));
        drop(first);
        let _again = RouteLease::claim().expect("claim after release");
    }

    #[test]
    fn claims_are_per_thread() {
        let _here = RouteLease::claim().expect("claim here");
        std::thread::spawn(|| {
            let _there = RouteLease::claim().expect("claim on another thread");
        })
        .join()
        .expect("thread");
    }

    #[test]
    fn trampoline_without_route_is_a_no_op() {
        let mut record = [0usize; crate::record::RECORD_SIZE / crate::record::WORD];
        trampoline(
            WindowId::from_raw(record.as_mut_ptr().cast()),
            std::ptr::null_mut(),
        );
        assert!(record.iter().all(|&w| w == 0));
    }
}
