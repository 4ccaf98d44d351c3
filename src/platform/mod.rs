// ── Platform layer ────────────────────────────────────────────────────────────
//
// Everything that talks to something outside this crate: the X-Plane plugin
// API (`xplm`, behind the `xplm` feature) and the Win32 debugger output
// (`win32`).  No `unsafe` lives here; FFI is confined to the sub-modules.

#[cfg(windows)]
pub(crate) mod win32;

#[cfg(feature = "xplm")]
pub mod xplm;

/// Hand one complete log line to every debug output this build has.
pub(crate) fn emit(line: &str) {
    #[cfg(feature = "xplm")]
    xplm::debug_string(line);

    #[cfg(windows)]
    win32::debug::output_debug_string(line);

    #[cfg(not(any(feature = "xplm", windows)))]
    {
        use std::io::Write;
        let _ = std::io::stderr().write_all(line.as_bytes());
    }
}
