// ── Raw XPLM declarations ─────────────────────────────────────────────────────
//
// Only the calls this crate makes.  Layouts follow the XPLM 3.0 headers
// (`XPLMDisplay.h`, `XPLMPlugin.h`, `XPLMProcessing.h`, `XPLMUtilities.h`).

#![allow(non_snake_case)]

use std::ffi::{c_char, c_float, c_int, c_void};

use crate::host::{ClickFn, CursorFn, DrawFn, KeyFn, WheelFn, WindowId};

/// `xplm_WindowDecorationSelfDecoratedResizable`
pub(crate) const DECORATION_SELF_DECORATED_RESIZABLE: c_int = 3;

/// `xplm_WindowLayerModal`
pub(crate) const LAYER_MODAL: c_int = 2;

/// `XPLMCreateWindow_t`.
#[repr(C)]
pub(crate) struct CreateWindow {
    pub(crate) struct_size: c_int,
    pub(crate) left: c_int,
    pub(crate) top: c_int,
    pub(crate) right: c_int,
    pub(crate) bottom: c_int,
    pub(crate) visible: c_int,
    pub(crate) draw: DrawFn,
    pub(crate) click: ClickFn,
    pub(crate) key: KeyFn,
    pub(crate) cursor: CursorFn,
    pub(crate) wheel: WheelFn,
    pub(crate) refcon: *mut c_void,
    pub(crate) decoration: c_int,
    pub(crate) layer: c_int,
    pub(crate) right_click: ClickFn,
}

/// `XPLMFlightLoop_f`
pub(crate) type FlightLoopFn = unsafe extern "C" fn(
    since_last_call: c_float,
    since_last_loop: c_float,
    counter: c_int,
    refcon: *mut c_void,
) -> c_float;

#[cfg_attr(windows, link(name = "XPLM_64"))]
extern "C" {
    pub(crate) fn XPLMCreateWindowEx(params: *mut CreateWindow) -> WindowId;
    pub(crate) fn XPLMDestroyWindow(window: WindowId);
    pub(crate) fn XPLMGetWindowRefCon(window: WindowId) -> *mut c_void;
    pub(crate) fn XPLMGetWindowIsVisible(window: WindowId) -> c_int;

    pub(crate) fn XPLMGetMyID() -> c_int;
    pub(crate) fn XPLMGetPluginInfo(
        plugin: c_int,
        out_name: *mut c_char,
        out_file_path: *mut c_char,
        out_signature: *mut c_char,
        out_description: *mut c_char,
    );

    pub(crate) fn XPLMDebugString(text: *const c_char);

    pub(crate) fn XPLMRegisterFlightLoopCallback(
        callback: FlightLoopFn,
        interval: c_float,
        refcon: *mut c_void,
    );
    pub(crate) fn XPLMUnregisterFlightLoopCallback(callback: FlightLoopFn, refcon: *mut c_void);
}
