// ── X-Plane host binding ──────────────────────────────────────────────────────
//
// `XPlane` implements `Host` on top of the real XPLM library.  `unsafe` is
// permitted here; every block carries a `// SAFETY:` comment.  All calls are
// made from X-Plane's main (render) thread, which is the only thread XPLM
// may be called from.

#![allow(unsafe_code)]

pub(crate) mod sys;

use std::ffi::{c_char, c_int, c_void, CStr, CString};
use std::path::PathBuf;

use crate::host::{Host, ModuleId, WindowId, WindowParams};

/// The running X-Plane instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct XPlane;

// SAFETY: X-Plane allocates window records on its heap and, on every release
// this crate supports, neither frees nor unmaps them while the process runs;
// records span well over `RECORD_SIZE` bytes.  Destroyed windows are unlinked,
// not freed, so stale list links still point at mapped memory.
unsafe impl Host for XPlane {
    fn create_window(&self, params: &WindowParams) -> Option<WindowId> {
        let cb = &params.callbacks;
        let mut raw = sys::CreateWindow {
            struct_size: std::mem::size_of::<sys::CreateWindow>() as c_int,
            left: params.geometry.left,
            top: params.geometry.top,
            right: params.geometry.right,
            bottom: params.geometry.bottom,
            visible: c_int::from(params.visible),
            draw: cb.draw,
            click: cb.click,
            key: cb.key,
            cursor: cb.cursor,
            wheel: cb.wheel,
            refcon: params.user_data,
            decoration: sys::DECORATION_SELF_DECORATED_RESIZABLE,
            layer: sys::LAYER_MODAL,
            right_click: cb.right_click,
        };
        // SAFETY: raw is a fully initialised XPLMCreateWindow_t with its size
        // field set; XPLM copies it before returning.
        let window = unsafe { sys::XPLMCreateWindowEx(&mut raw) };
        (!window.is_null()).then_some(window)
    }

    fn destroy_window(&self, window: WindowId) {
        // SAFETY: callers only pass windows they created and still own.
        unsafe { sys::XPLMDestroyWindow(window) }
    }

    fn user_data(&self, window: WindowId) -> *mut c_void {
        // SAFETY: window comes from the host's own list; XPLM only reads the
        // refcon field.
        unsafe { sys::XPLMGetWindowRefCon(window) }
    }

    fn is_visible(&self, window: WindowId) -> bool {
        // SAFETY: as user_data.
        unsafe { sys::XPLMGetWindowIsVisible(window) != 0 }
    }

    fn my_module_id(&self) -> ModuleId {
        // SAFETY: no arguments; valid once the plugin is loaded.
        ModuleId(unsafe { sys::XPLMGetMyID() })
    }
}

/// Append `line` to X-Plane's Log.txt.  Interior NULs are dropped.
pub(crate) fn debug_string(line: &str) {
    let text = CString::new(line.replace('\0', "")).unwrap_or_default();
    // SAFETY: text is NUL-terminated and outlives the call.
    unsafe { sys::XPLMDebugString(text.as_ptr()) }
}

/// Directory holding this plugin's binary, where `movevr.json` lives.
pub fn plugin_dir() -> Option<PathBuf> {
    // XPLM documents 256 bytes as enough for every out-parameter.
    let mut path: [c_char; 512] = [0; 512];
    // SAFETY: XPLMGetMyID has no preconditions; null out-pointers are
    // documented as "not wanted", and path is large enough for the file path.
    unsafe {
        sys::XPLMGetPluginInfo(
            sys::XPLMGetMyID(),
            std::ptr::null_mut(),
            path.as_mut_ptr(),
            std::ptr::null_mut(),
            std::ptr::null_mut(),
        );
    }
    // SAFETY: the buffer was zeroed, so it is NUL-terminated whether or not
    // XPLM wrote to it.
    let file = unsafe { CStr::from_ptr(path.as_ptr()) };
    let file = PathBuf::from(file.to_str().ok()?);
    file.parent().map(PathBuf::from)
}
