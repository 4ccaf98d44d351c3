// ── Debugger output ───────────────────────────────────────────────────────────
//
// Mirrors log lines to `OutputDebugStringW`, so they show up in a debugger or
// DebugView even when X-Plane's Log.txt is not being watched.

use windows::core::PCWSTR;
use windows::Win32::System::Diagnostics::Debug::OutputDebugStringW;

use super::to_wide;

pub(crate) fn output_debug_string(line: &str) {
    let wide = to_wide(line);
    // SAFETY: wide is a valid NUL-terminated UTF-16 string that stays
    // allocated for the duration of the call.  OutputDebugStringW does not
    // retain the pointer.
    unsafe { OutputDebugStringW(PCWSTR(wide.as_ptr())) };
}
