// ── Win32 platform implementation ─────────────────────────────────────────────
//
// One of the few modules in the crate where `unsafe` code is permitted (the
// others are `record`, `platform::xplm` and `plugin`).  Every `unsafe` block
// MUST carry a `// SAFETY:` comment that states:
//   • which invariant makes the operation sound, and
//   • what the caller is responsible for maintaining.
//
// Nothing in this module is `pub` beyond what callers genuinely need; keep the
// unsafe surface as small as possible.

#![allow(unsafe_code)]

// ── Sub-modules ───────────────────────────────────────────────────────────────

pub(crate) mod debug; // debugger output for the log sink

/// NUL-terminated UTF-16 copy of `s`, for `PCWSTR` arguments.
pub(crate) fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_strings_are_terminated() {
        assert_eq!(to_wide("ok"), vec![u16::from(b'o'), u16::from(b'k'), 0]);
        assert_eq!(to_wide(""), vec![0]);
    }
}
