// ── Trigger receivers ─────────────────────────────────────────────────────────
//
// A VR controller trigger is a command, not a mouse event, so windows never
// see it.  Windows registered here receive each trigger phase as a cursor
// move followed by a click at the same panel coordinates.

use std::ffi::c_int;

use crate::host::{Host, MouseStatus, WindowId};
use crate::registry::Registry;

/// Phase of a host command (`XPLMCommandPhase`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPhase {
    Begin,
    Continue,
    End,
}

impl CommandPhase {
    /// `xplm_CommandBegin` = 0, `xplm_CommandContinue` = 1,
    /// `xplm_CommandEnd` = 2.
    pub fn from_raw(raw: c_int) -> Option<Self> {
        match raw {
            0 => Some(Self::Begin),
            1 => Some(Self::Continue),
            2 => Some(Self::End),
            _ => None,
        }
    }

    pub fn mouse_status(self) -> MouseStatus {
        match self {
            Self::Begin => MouseStatus::DOWN,
            Self::Continue => MouseStatus::DRAG,
            Self::End => MouseStatus::UP,
        }
    }
}

/// Windows that want trigger clicks, in registration order.
#[derive(Debug, Default, Clone)]
pub struct TriggerReceivers {
    windows: Vec<WindowId>,
}

impl TriggerReceivers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if `window` was already registered.
    pub fn add(&mut self, window: WindowId) -> bool {
        if window.is_null() || self.windows.contains(&window) {
            return false;
        }
        self.windows.push(window);
        true
    }

    pub fn remove(&mut self, window: WindowId) -> bool {
        let before = self.windows.len();
        self.windows.retain(|&w| w != window);
        self.windows.len() != before
    }

    pub fn contains(&self, window: WindowId) -> bool {
        self.windows.contains(&window)
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    /// Deliver one trigger phase to every registered window.
    ///
    /// Windows no longer in the host's list are dropped first.  Hidden
    /// windows stay registered and silently ignore the trigger.  Returns how
    /// many windows were handled without error.  Render thread only.
    pub fn forward<H: Host>(
        &mut self,
        registry: &Registry<H>,
        status: MouseStatus,
        x: c_int,
        y: c_int,
    ) -> usize {
        let live = registry.find_windows();
        self.windows.retain(|w| {
            let alive = live.contains(w);
            if !alive {
                log::debug!("trigger receiver {w:?} is gone");
            }
            alive
        });

        let mut sent = 0;
        for &window in &self.windows {
            let moved = registry.dispatch_cursor_move(window, x, y);
            let clicked = registry.dispatch_click(window, status, x, y);
            match moved.and(clicked) {
                Ok(()) => sent += 1,
                Err(e) => log::warn!("trigger to {window:?} failed: {e}"),
            }
        }
        sent
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
