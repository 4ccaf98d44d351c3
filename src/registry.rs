// ── Window registry ───────────────────────────────────────────────────────────
//
// Owns the discovered layout and the anchor window, and exposes the safe
// operations built on them: enumeration, owner lookup, direct event dispatch
// and one-shot draw injection.
//
// Render thread only.  Every public operation here must be called on the
// host's render thread (the thread that delivers draw and click callbacks).
// `Registry` is `!Send` and `!Sync`, so the compiler keeps it there; other
// threads go through `handoff::RenderHandle`.

use std::ffi::c_int;

use crate::config::Config;
use crate::discovery::{discover, DiscoveryOptions};
use crate::error::{Error, Result, UnreliableLayout};
use crate::host::{Host, ModuleId, MouseStatus, WindowId};
use crate::layout::{LayoutOffsets, OwnerResolution, SignatureCatalog};
use crate::record::{Record, WordField};
use crate::trampoline::{InjectOutcome, RouteLease};

/// Upper bound on one direction of a list walk.  A corrupted link would
/// otherwise loop forever.
pub const MAX_WINDOWS: usize = 4096;

/// Follow `link` from `start` until the null terminator.  `start` itself is
/// not included.
pub(crate) fn walk(start: Record, link: WordField) -> Vec<WindowId> {
    let origin = start.window();
    let mut windows = Vec::new();
    let mut current = start.link(link);

    while let Some(record) = Record::of(current) {
        if current == origin {
            log::warn!("window list loops back to its start; stopping walk");
            break;
        }
        if windows.len() == MAX_WINDOWS {
            log::warn!("window list longer than {MAX_WINDOWS}; stopping walk");
            break;
        }
        windows.push(current);
        current = record.link(link);
    }

    windows
}

// ── WindowInfo ────────────────────────────────────────────────────────────────

/// A snapshot of one listed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowInfo {
    pub id: WindowId,
    pub owner: ModuleId,
    pub visible: bool,
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Access to every window in the host, including other modules' windows.
///
/// Exists only with a fully valid layout: construction runs discovery and
/// fails if any field cannot be located.
pub struct Registry<H: Host> {
    host: H,
    /// Our own invisible window.  Always linked, so always a valid starting
    /// point for list walks; destroyed in `Drop` and nowhere else.
    anchor: Record,
    layout: LayoutOffsets,
    owner: OwnerResolution,
    warning: Option<UnreliableLayout>,
    route: RouteLease,
}

impl<H: Host> Registry<H> {
    /// Discover the layout with an empty signature catalog and the weak
    /// owner-id fallback allowed.
    pub fn new(host: H) -> Result<Self> {
        Self::with_catalog(host, &SignatureCatalog::default(), true)
    }

    /// Discover the layout using the signatures and policy from `config`.
    pub fn from_config(host: H, config: &Config) -> Result<Self> {
        Self::with_catalog(host, &config.catalog(), config.allow_weak_owner_fallback)
    }

    /// Discover the layout, trying `catalog` before the owner-id scan.
    ///
    /// Fails with `RegistryActive` if another registry is alive on this
    /// thread, and with `DiscoveryFailed`/`HostRefused` if the host's record
    /// layout cannot be learned.  In every failure case no window is left
    /// behind.
    pub fn with_catalog(host: H, catalog: &SignatureCatalog, allow_weak_fallback: bool) -> Result<Self> {
        let route = RouteLease::claim()?;

        let found = discover(
            &host,
            DiscoveryOptions {
                catalog,
                allow_weak_fallback,
            },
        )?;

        route.bind(found.layout.draw_field());

        if let Some(warning) = &found.warning {
            log::warn!("{warning}; owner lookups are best-effort");
        }
        log::info!("window registry ready ({})", found.layout);

        Ok(Self {
            host,
            anchor: found.anchor,
            layout: found.layout,
            owner: found.owner,
            warning: found.warning,
            route,
        })
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn layout(&self) -> &LayoutOffsets {
        &self.layout
    }

    /// How the owner-id offset was learned.
    pub fn owner_resolution(&self) -> &OwnerResolution {
        &self.owner
    }

    /// Set when owner lookups are best-effort for this run.
    pub fn unreliable_layout(&self) -> Option<&UnreliableLayout> {
        self.warning.as_ref()
    }

    // ── Enumeration ───────────────────────────────────────────────────────────

    /// Every window in the host's list except the anchor.
    ///
    /// Windows behind the anchor come first, nearest first, followed by the
    /// windows after it, nearest first.  The order is the host's list order
    /// and means nothing else.  Render thread only.
    pub fn find_windows(&self) -> Vec<WindowId> {
        let mut windows = walk(self.anchor, self.layout.prev_field());
        windows.extend(walk(self.anchor, self.layout.next_field()));
        windows
    }

    /// `find_windows` with owner and visibility for each entry.
    pub fn describe_windows(&self) -> Vec<WindowInfo> {
        self.find_windows()
            .into_iter()
            .filter_map(|id| {
                let record = Record::of(id)?;
                Some(WindowInfo {
                    id,
                    owner: ModuleId(record.int(self.layout.owner_field())),
                    visible: self.host.is_visible(id),
                })
            })
            .collect()
    }

    // ── Ownership ─────────────────────────────────────────────────────────────

    /// The module that created `window`.  Re-read on every call.
    ///
    /// Best-effort when `unreliable_layout()` is set.  Render thread only.
    pub fn owner_of(&self, window: WindowId) -> Result<ModuleId> {
        let record = Record::of(window).ok_or(Error::InvalidHandle)?;
        Ok(ModuleId(record.int(self.layout.owner_field())))
    }

    // ── Direct dispatch ───────────────────────────────────────────────────────

    /// Call `window`'s click handler directly, bypassing the host's input
    /// routing and focus handling.
    ///
    /// Hidden windows and windows without a click handler are skipped
    /// silently.  Render thread only.
    pub fn dispatch_click(&self, window: WindowId, status: MouseStatus, x: c_int, y: c_int) -> Result<()> {
        let record = Record::of(window).ok_or(Error::InvalidHandle)?;
        if !self.host.is_visible(window) {
            log::trace!("click for hidden window {window:?} dropped");
            return Ok(());
        }

        if let Some(handler) = record.click_handler(self.layout.click_field()) {
            let refcon = self.host.user_data(window);
            handler.call(window, x, y, status, refcon);
        }
        Ok(())
    }

    /// Call `window`'s cursor handler directly.  Same rules as
    /// `dispatch_click`.
    pub fn dispatch_cursor_move(&self, window: WindowId, x: c_int, y: c_int) -> Result<()> {
        let record = Record::of(window).ok_or(Error::InvalidHandle)?;
        if !self.host.is_visible(window) {
            return Ok(());
        }

        if let Some(handler) = record.cursor_handler(self.layout.cursor_field()) {
            let refcon = self.host.user_data(window);
            handler.call(window, x, y, refcon);
        }
        Ok(())
    }

    // ── Injection ─────────────────────────────────────────────────────────────

    /// Run `hook` on the render thread during `window`'s next draw, exactly
    /// once.  Afterwards the window's own draw callback is back in place.
    ///
    /// Idempotent per window: while a hook is pending, further calls return
    /// `AlreadyPending` and drop their hook unrun.  Render thread only.
    pub fn inject<F>(&self, window: WindowId, hook: F) -> Result<InjectOutcome>
    where
        F: FnOnce() + 'static,
    {
        let record = Record::of(window).ok_or(Error::InvalidHandle)?;
        let outcome = self.route.inject(record, Box::new(hook));
        if outcome == InjectOutcome::Installed {
            log::debug!("draw hook installed on {window:?}");
        }
        Ok(outcome)
    }

    /// Withdraw `window`'s pending hook, if any, without running it.
    pub fn cancel_injection(&self, window: WindowId) -> Result<bool> {
        let record = Record::of(window).ok_or(Error::InvalidHandle)?;
        Ok(self.route.cancel(record))
    }

    /// Windows whose hook has not fired yet.
    pub fn pending_injections(&self) -> Vec<WindowId> {
        self.route.pending()
    }
}

impl<H: Host> Drop for Registry<H> {
    fn drop(&mut self) {
        // Unhook first: once the lease is gone the trampoline can no longer
        // route, and a window left pointing at it would stop drawing.
        let live = self.find_windows();
        self.route.restore_all(&live);
        self.host.destroy_window(self.anchor.window());
        log::debug!("window registry released");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
