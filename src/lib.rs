// ── Safety policy ────────────────────────────────────────────────────────────
// Unsafe code is forbidden everywhere except:
//   • `record`          – reads and writes inside host window records
//   • `host`            – the `Host` trait contract and `WindowId`'s Send/Sync
//   • `platform::*`     – XPLM and Win32 FFI
//   • `plugin`          – the `XPlugin*` exports
// Each unsafe block in those modules MUST carry a `// SAFETY:` comment.
#![deny(unsafe_code)]

//! Window access for X-Plane plugins.
//!
//! The host's plugin API only exposes windows a plugin created itself.  This
//! crate learns the layout of the host's opaque window records at runtime and
//! then offers, on the render thread:
//!
//! * enumeration of every window in the host (`Registry::find_windows`),
//! * the owning plugin of any window (`Registry::owner_of`),
//! * direct click and cursor dispatch (`Registry::dispatch_click`, …),
//! * one-shot code injection into a window's next draw (`Registry::inject`).
//!
//! Other threads queue work through `handoff::RenderHandle`.

pub mod config;
pub mod error;
pub mod handoff;
pub mod host;
pub mod layout;
pub mod logging;
pub mod platform;
pub mod receivers;
pub mod registry;

mod discovery;
mod record;
mod trampoline;

#[cfg(feature = "xplm")]
mod plugin;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result, UnreliableLayout};
pub use handoff::{RenderHandle, RenderQueue};
pub use host::{
    CallbackSlots, CursorStatus, Geometry, Host, ModuleId, MouseStatus, WindowId, WindowParams,
};
pub use layout::{Fingerprint, LayoutOffsets, OwnerResolution, Signature, SignatureCatalog};
pub use receivers::{CommandPhase, TriggerReceivers};
pub use record::RECORD_SIZE;
pub use registry::{Registry, WindowInfo, MAX_WINDOWS};
pub use trampoline::InjectOutcome;

#[cfg(feature = "xplm")]
pub use plugin::render_handle;
