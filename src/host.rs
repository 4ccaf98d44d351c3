// ── Host capability surface ───────────────────────────────────────────────────
//
// The handful of documented host calls the registry is built on, expressed as
// a trait so the core can run against X-Plane (`platform::xplm`) or against
// the in-memory fake host used by the tests.
//
// Handle and callback types mirror XPLM's C ABI (`XPLMWindowID`,
// `XPLMHandleMouseClick_f`, …) so that pointers read out of a host record can
// be called directly.

use std::ffi::{c_char, c_int, c_void};

// ── Handles ───────────────────────────────────────────────────────────────────

/// An opaque host window handle (`XPLMWindowID`).
///
/// Really the address of the host's window record.  Copying the handle around
/// is harmless; only the `record` module ever dereferences it.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowId(*mut c_void);

impl WindowId {
    /// The null handle.  Terminates list walks; rejected by every operation.
    pub const NULL: Self = Self(std::ptr::null_mut());

    /// Wrap a raw handle received from the host.
    pub fn from_raw(raw: *mut c_void) -> Self {
        Self(raw)
    }

    /// The raw handle, for passing back to the host.
    pub fn as_raw(self) -> *mut c_void {
        self.0
    }

    /// The handle's numeric address, i.e. the bytes the host stores in its
    /// list links.
    pub fn addr(self) -> usize {
        self.0 as usize
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

// SAFETY: a WindowId is an identifier.  Sending one to another thread does
// not touch the record it names; every dereference happens in `record` on the
// render thread (see `handoff` for how other threads reach it).
#[allow(unsafe_code)]
unsafe impl Send for WindowId {}
// SAFETY: as above; shared references to a WindowId only expose its address.
#[allow(unsafe_code)]
unsafe impl Sync for WindowId {}

/// A host module (plugin) identity, `XPLMPluginID`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub c_int);

// ── Input enums ───────────────────────────────────────────────────────────────

/// `XPLMMouseStatus`.  A newtype rather than an enum: values come from the
/// host, and an out-of-range discriminant in a Rust enum would be UB.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseStatus(pub c_int);

impl MouseStatus {
    pub const DOWN: Self = Self(1);
    pub const DRAG: Self = Self(2);
    pub const UP: Self = Self(3);
}

/// `XPLMCursorStatus`, returned by cursor handlers.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorStatus(pub c_int);

impl CursorStatus {
    pub const DEFAULT: Self = Self(0);
    pub const HIDDEN: Self = Self(1);
    pub const ARROW: Self = Self(2);
    pub const CUSTOM: Self = Self(3);
}

// ── Callback signatures ───────────────────────────────────────────────────────

/// `XPLMDrawWindow_f`.
pub type DrawFn = unsafe extern "C" fn(window: WindowId, refcon: *mut c_void);

/// `XPLMHandleMouseClick_f` (left and right click share it).
pub type ClickFn = unsafe extern "C" fn(
    window: WindowId,
    x: c_int,
    y: c_int,
    status: MouseStatus,
    refcon: *mut c_void,
) -> c_int;

/// `XPLMHandleKey_f`.
pub type KeyFn = unsafe extern "C" fn(
    window: WindowId,
    key: c_char,
    flags: c_int,
    virtual_key: c_char,
    refcon: *mut c_void,
    losing_focus: c_int,
);

/// `XPLMHandleCursor_f`.
pub type CursorFn =
    unsafe extern "C" fn(window: WindowId, x: c_int, y: c_int, refcon: *mut c_void) -> CursorStatus;

/// `XPLMHandleMouseWheel_f`.
pub type WheelFn = unsafe extern "C" fn(
    window: WindowId,
    x: c_int,
    y: c_int,
    wheel: c_int,
    clicks: c_int,
    refcon: *mut c_void,
) -> c_int;

// ── Window creation ───────────────────────────────────────────────────────────

/// Window bounds in global desktop coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub left: c_int,
    pub top: c_int,
    pub right: c_int,
    pub bottom: c_int,
}

/// The callback slots a window is created with.
#[derive(Debug, Clone, Copy)]
pub struct CallbackSlots {
    pub draw: DrawFn,
    pub click: ClickFn,
    pub key: KeyFn,
    pub cursor: CursorFn,
    pub wheel: WheelFn,
    pub right_click: ClickFn,
}

/// Everything `Host::create_window` needs.
#[derive(Debug, Clone, Copy)]
pub struct WindowParams {
    pub geometry: Geometry,
    pub visible: bool,
    pub callbacks: CallbackSlots,
    /// Opaque pointer handed back to every callback (`refcon`).
    pub user_data: *mut c_void,
}

// ── The trait ─────────────────────────────────────────────────────────────────

/// The host's documented window API.
///
/// # Safety
///
/// Implementers guarantee that every non-null `WindowId` returned from
/// `create_window`, and every handle reachable from one through the host's
/// list links, addresses at least `record::RECORD_SIZE` bytes that are
/// readable and writable from the render thread and stay mapped for the rest
/// of the process, including after `destroy_window`.  The registry reads and
/// writes those bytes directly.
///
/// All methods are called on the render thread only.
#[allow(unsafe_code)]
pub unsafe trait Host {
    /// Create a window; `None` when the host refuses.
    fn create_window(&self, params: &WindowParams) -> Option<WindowId>;

    /// Destroy a window.  The host unlinks it from its window list.
    fn destroy_window(&self, window: WindowId);

    /// The window's `refcon` (user data) pointer.
    fn user_data(&self, window: WindowId) -> *mut c_void;

    fn is_visible(&self, window: WindowId) -> bool;

    /// The calling module's own identity.
    fn my_module_id(&self) -> ModuleId;
}

// ── Tests ─────────────────────────────────────────────────────────────────────
