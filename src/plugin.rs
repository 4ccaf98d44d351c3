// ── X-Plane plugin entry points ───────────────────────────────────────────────
//
// The five `XPlugin*` exports X-Plane looks up in the `.xpl`.  All of them,
// and the flight loop, run on X-Plane's main thread, so plugin state lives in
// a thread-local next to the registry's routing slot.
//
// A host whose window records cannot be decoded is not an error for the
// plugin: it stays enabled and simply runs without window access.

#![allow(unsafe_code)]
#![allow(non_snake_case)]

use std::cell::RefCell;
use std::ffi::{c_char, c_float, c_int, c_void, CStr};

use crate::config::{self, Config};
use crate::handoff::{RenderHandle, RenderQueue};
use crate::layout::{OwnerResolution, Signature};
use crate::logging;
use crate::platform::xplm::{self, sys, XPlane};
use crate::registry::Registry;

const NAME: &CStr = c"MoveVR Window Registry";
const SIGNATURE: &CStr = c"movevr.window_registry";
const DESCRIPTION: &CStr = c"Enumerates and drives X-Plane windows for VR use";

/// XPLM hands out 256-byte buffers for the plugin description.
const INFO_BUFFER: usize = 256;

/// Negative interval: call back every frame.
const EVERY_FRAME: c_float = -1.0;

struct Plugin {
    config: Config,
    queue: RenderQueue<XPlane>,
    registry: Option<Registry<XPlane>>,
    flight_loop: bool,
}

thread_local! {
    static PLUGIN: RefCell<Option<Plugin>> = const { RefCell::new(None) };
}

/// A handle for queuing work onto the render thread, while the plugin is
/// started.  Call from the main thread; send the handle anywhere.
pub fn render_handle() -> Option<RenderHandle<XPlane>> {
    PLUGIN.with(|p| p.try_borrow().ok()?.as_ref().map(|plugin| plugin.queue.handle()))
}

impl Plugin {
    fn enable(&mut self) {
        match Registry::from_config(XPlane, &self.config) {
            Ok(registry) => {
                log::info!("window access ready: {} windows listed", registry.find_windows().len());
                log_signature_hint(&registry);
                self.registry = Some(registry);
            }
            Err(e) => {
                log::error!("window access unavailable on this host version: {e}");
            }
        }

        if !self.flight_loop {
            // SAFETY: flight_loop matches XPLMFlightLoop_f and ignores its
            // refcon; it is unregistered in disable() with the same pair.
            unsafe {
                sys::XPLMRegisterFlightLoopCallback(flight_loop, EVERY_FRAME, std::ptr::null_mut())
            };
            self.flight_loop = true;
        }
    }

    fn disable(&mut self) {
        if self.flight_loop {
            // SAFETY: same callback/refcon pair as registered in enable().
            unsafe { sys::XPLMUnregisterFlightLoopCallback(flight_loop, std::ptr::null_mut()) };
            self.flight_loop = false;
        }
        let dropped = self.queue.discard();
        if dropped > 0 {
            log::debug!("discarded {dropped} queued render tasks");
        }
        // Drop restores any pending draw hooks and destroys the anchor.
        self.registry = None;
    }
}

/// A verified fallback layout is worth cataloging; print it in config form.
fn log_signature_hint(registry: &Registry<XPlane>) {
    if registry.owner_resolution() != &(OwnerResolution::Fallback { verified: true }) {
        return;
    }
    let layout = registry.layout();
    let signature = Signature {
        host_version: "unlabelled".to_owned(),
        pointer_width: std::mem::size_of::<usize>(),
        fingerprint: layout.fingerprint(),
        owner_id: layout.owner_id(),
    };
    if let Ok(json) = serde_json::to_string(&signature) {
        log::info!("add to the \"signatures\" list in {} to skip the scan: {json}", config::CONFIG_FILE);
    }
}

/// Copy `src` into an XPLM-provided buffer.
///
/// # Safety
/// `dst` must be null or point to at least `INFO_BUFFER` writable bytes.
unsafe fn copy_out(dst: *mut c_char, src: &CStr) {
    if dst.is_null() {
        return;
    }
    let bytes = src.to_bytes_with_nul();
    let len = bytes.len().min(INFO_BUFFER);
    // SAFETY: the caller guarantees INFO_BUFFER bytes at dst; len never
    // exceeds that or the source length.
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr().cast::<c_char>(), dst, len);
        *dst.add(INFO_BUFFER - 1) = 0;
    }
}

// ── Flight loop ───────────────────────────────────────────────────────────────

unsafe extern "C" fn flight_loop(
    _since_last_call: c_float,
    _since_last_loop: c_float,
    _counter: c_int,
    _refcon: *mut c_void,
) -> c_float {
    PLUGIN.with(|p| {
        // A task that re-enters the plugin (e.g. asks for a render handle)
        // only needs a shared borrow.
        let Ok(p) = p.try_borrow() else {
            return;
        };
        if let Some(plugin) = p.as_ref() {
            match &plugin.registry {
                Some(registry) => {
                    plugin.queue.drain(registry);
                }
                None => {
                    plugin.queue.discard();
                }
            }
        }
    });
    EVERY_FRAME
}

// ── Exports ───────────────────────────────────────────────────────────────────

/// # Safety
/// Called by X-Plane with three 256-byte output buffers.
#[no_mangle]
pub unsafe extern "C" fn XPluginStart(
    out_name: *mut c_char,
    out_signature: *mut c_char,
    out_description: *mut c_char,
) -> c_int {
    // SAFETY: X-Plane passes INFO_BUFFER-sized buffers.
    unsafe {
        copy_out(out_name, NAME);
        copy_out(out_signature, SIGNATURE);
        copy_out(out_description, DESCRIPTION);
    }

    let path = xplm::plugin_dir().map(|dir| config::config_path(&dir));
    let config = path.as_deref().and_then(config::load).unwrap_or_default();
    logging::init(config.level_filter());
    match &path {
        Some(path) => log::info!("started; config {}", path.display()),
        None => log::info!("started; plugin directory unknown, using defaults"),
    }

    PLUGIN.with(|p| {
        *p.borrow_mut() = Some(Plugin {
            config,
            queue: RenderQueue::new(),
            registry: None,
            flight_loop: false,
        });
    });
    1
}

#[no_mangle]
pub extern "C" fn XPluginEnable() -> c_int {
    PLUGIN.with(|p| {
        if let Some(plugin) = p.borrow_mut().as_mut() {
            plugin.enable();
        }
    });
    // Enabled even without window access.
    1
}

#[no_mangle]
pub extern "C" fn XPluginDisable() {
    PLUGIN.with(|p| {
        if let Some(plugin) = p.borrow_mut().as_mut() {
            plugin.disable();
        }
    });
}

#[no_mangle]
pub extern "C" fn XPluginStop() {
    let plugin = PLUGIN.with(|p| p.borrow_mut().take());
    if let Some(mut plugin) = plugin {
        plugin.disable();
    }
    log::info!("stopped");
}

#[no_mangle]
pub extern "C" fn XPluginReceiveMessage(from: c_int, message: c_int, _param: *mut c_void) {
    log::trace!("message {message} from plugin {from} ignored");
}
