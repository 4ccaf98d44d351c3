// ── Opaque window record access ───────────────────────────────────────────────
//
// The only module that does raw offset arithmetic on host memory.  Everything
// else sees typed, validated accessors:
//   • `WordField` / `IntField` can only be built for in-bounds, aligned offsets
//   • `Record` can only be built from a non-null handle
//   • callback pointers read out of a record come back as typed handlers
//
// Every `unsafe` block MUST carry a `// SAFETY:` comment.  The blanket
// justification for dereferencing a record is the `Host` trait contract:
// a non-null handle from the host addresses `RECORD_SIZE` readable and
// writable bytes for the rest of the process.

#![allow(unsafe_code)]

use std::ffi::{c_int, c_void};
use std::mem::size_of;
use std::ptr::NonNull;

use crate::host::{ClickFn, CursorFn, CursorStatus, DrawFn, MouseStatus, WindowId};

// ── Record geometry ───────────────────────────────────────────────────────────

/// Upper bound on the host's window record.  Discovery never looks past it.
pub const RECORD_SIZE: usize = 128;

/// Width of a pointer-sized slot (list links, callback pointers).
pub(crate) const WORD: usize = size_of::<usize>();

/// Width of an integer slot (module id).
pub(crate) const INT: usize = size_of::<c_int>();

// ── Validated offsets ─────────────────────────────────────────────────────────

/// Offset of a pointer-sized field: `WORD`-aligned and fully inside the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct WordField(usize);

impl WordField {
    pub(crate) fn new(offset: usize) -> Option<Self> {
        (offset % WORD == 0 && offset + WORD <= RECORD_SIZE).then_some(Self(offset))
    }

    pub(crate) fn offset(self) -> usize {
        self.0
    }

    /// Whether `[start, start + len)` intersects this field.
    pub(crate) fn overlaps(self, start: usize, len: usize) -> bool {
        start < self.0 + WORD && self.0 < start + len
    }
}

/// Offset of a `c_int` field: `INT`-aligned and fully inside the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct IntField(usize);

impl IntField {
    pub(crate) fn new(offset: usize) -> Option<Self> {
        (offset % INT == 0 && offset + INT <= RECORD_SIZE).then_some(Self(offset))
    }

    pub(crate) fn offset(self) -> usize {
        self.0
    }
}

// ── Record ────────────────────────────────────────────────────────────────────

/// Borrowed view of one host window record.
///
/// Deliberately `!Send`: records are only touched on the render thread.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Record {
    base: NonNull<u8>,
}

impl Record {
    /// View the record behind `window`; `None` for the null handle.
    pub(crate) fn of(window: WindowId) -> Option<Self> {
        NonNull::new(window.as_raw().cast::<u8>()).map(|base| Self { base })
    }

    pub(crate) fn window(self) -> WindowId {
        WindowId::from_raw(self.base.as_ptr().cast::<c_void>())
    }

    fn read_word_at(self, offset: usize) -> usize {
        debug_assert!(offset + WORD <= RECORD_SIZE);
        // SAFETY: offset + WORD <= RECORD_SIZE (callers pass validated fields
        // or scan indices), and the Host contract keeps RECORD_SIZE bytes
        // readable.  read_unaligned: the host's packing is unknown.
        unsafe { self.base.as_ptr().add(offset).cast::<usize>().read_unaligned() }
    }

    fn read_int_at(self, offset: usize) -> c_int {
        debug_assert!(offset + INT <= RECORD_SIZE);
        // SAFETY: as read_word_at, for an INT-sized read.
        unsafe { self.base.as_ptr().add(offset).cast::<c_int>().read_unaligned() }
    }

    // ── Scanning ──────────────────────────────────────────────────────────────

    /// First `WORD`-aligned offset whose bytes equal `needle`.
    pub(crate) fn find_word(self, needle: usize) -> Option<WordField> {
        (0..=RECORD_SIZE - WORD)
            .step_by(WORD)
            .find(|&offset| self.read_word_at(offset) == needle)
            .and_then(WordField::new)
    }

    /// Every `INT`-aligned offset whose bytes equal `needle`, in order.
    pub(crate) fn find_ints(self, needle: c_int) -> impl Iterator<Item = IntField> {
        (0..=RECORD_SIZE - INT)
            .step_by(INT)
            .filter(move |&offset| self.read_int_at(offset) == needle)
            .filter_map(IntField::new)
    }

    // ── Typed accessors ───────────────────────────────────────────────────────

    pub(crate) fn word(self, field: WordField) -> usize {
        self.read_word_at(field.0)
    }

    pub(crate) fn set_word(self, field: WordField, value: usize) {
        // SAFETY: field is in bounds by construction; the Host contract keeps
        // the record writable from the render thread, the only thread that
        // calls this.
        unsafe {
            self.base
                .as_ptr()
                .add(field.0)
                .cast::<usize>()
                .write_unaligned(value);
        }
    }

    pub(crate) fn int(self, field: IntField) -> c_int {
        self.read_int_at(field.0)
    }

    /// Follow a list link.  `WindowId::NULL` ends the list.
    pub(crate) fn link(self, field: WordField) -> WindowId {
        WindowId::from_raw(self.word(field) as *mut c_void)
    }

    pub(crate) fn click_handler(self, field: WordField) -> Option<ClickHandler> {
        ClickHandler::from_word(self.word(field))
    }

    pub(crate) fn cursor_handler(self, field: WordField) -> Option<CursorHandler> {
        CursorHandler::from_word(self.word(field))
    }
}

// ── Foreign callbacks ─────────────────────────────────────────────────────────
//
// The host only ever stores function pointers of the documented signature in
// the callback slots, so a non-zero word read from a discovered slot can be
// reinterpreted as that signature.

/// A draw callback taken from (or destined for) a record's draw slot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DrawHandler(DrawFn);

impl DrawHandler {
    pub(crate) fn from_word(word: usize) -> Option<Self> {
        if word == 0 {
            return None;
        }
        // SAFETY: word is non-zero and was read from a draw slot, which the
        // host only fills with XPLMDrawWindow_f pointers.  usize and fn
        // pointers have the same size on every supported target.
        Some(Self(unsafe { std::mem::transmute::<usize, DrawFn>(word) }))
    }

    pub(crate) fn address(f: DrawFn) -> usize {
        f as usize
    }

    pub(crate) fn call(self, window: WindowId, refcon: *mut c_void) {
        // SAFETY: a host draw callback invoked on the render thread with the
        // window it belongs to, exactly as the host itself would call it.
        unsafe { (self.0)(window, refcon) }
    }
}

/// A click callback read from a record's click slot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ClickHandler(ClickFn);

impl ClickHandler {
    fn from_word(word: usize) -> Option<Self> {
        if word == 0 {
            return None;
        }
        // SAFETY: see DrawHandler::from_word; click slots hold
        // XPLMHandleMouseClick_f pointers.
        Some(Self(unsafe { std::mem::transmute::<usize, ClickFn>(word) }))
    }

    pub(crate) fn call(
        self,
        window: WindowId,
        x: c_int,
        y: c_int,
        status: MouseStatus,
        refcon: *mut c_void,
    ) -> c_int {
        // SAFETY: the handler belongs to `window`, refcon is that window's
        // user data, and we are on the render thread.
        unsafe { (self.0)(window, x, y, status, refcon) }
    }
}

/// A cursor callback read from a record's cursor slot.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CursorHandler(CursorFn);

impl CursorHandler {
    fn from_word(word: usize) -> Option<Self> {
        if word == 0 {
            return None;
        }
        // SAFETY: see DrawHandler::from_word; cursor slots hold
        // XPLMHandleCursor_f pointers.
        Some(Self(unsafe { std::mem::transmute::<usize, CursorFn>(word) }))
    }

    pub(crate) fn call(
        self,
        window: WindowId,
        x: c_int,
        y: c_int,
        refcon: *mut c_void,
    ) -> CursorStatus {
        // SAFETY: as ClickHandler::call.
        unsafe { (self.0)(window, x, y, refcon) }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// A pointer-aligned record-sized buffer standing in for host memory.
    fn buffer() -> Box<[usize; RECORD_SIZE / WORD]> {
        Box::new([0; RECORD_SIZE / WORD])
    }

    fn record_of(buf: &mut [usize; RECORD_SIZE / WORD]) -> Record {
        Record::of(WindowId::from_raw(buf.as_mut_ptr().cast())).expect("non-null")
    }

    #[test]
    fn fields_reject_misaligned_and_out_of_bounds_offsets() {
        assert!(WordField::new(0).is_some());
        assert!(WordField::new(RECORD_SIZE - WORD).is_some());
        assert!(WordField::new(RECORD_SIZE).is_none());
        assert!(WordField::new(WORD + 1).is_none());
        assert!(IntField::new(RECORD_SIZE - INT).is_some());
        assert!(IntField::new(2).is_none());
    }

    #[test]
    fn null_handle_has_no_record() {
        assert!(Record::of(WindowId::NULL).is_none());
    }

    #[test]
    fn find_word_returns_first_match() {
        let mut buf = buffer();
        buf[3] = 0xDEAD_BEEF;
        buf[7] = 0xDEAD_BEEF;
        let rec = record_of(&mut buf);
        let field = rec.find_word(0xDEAD_BEEF).expect("present");
        assert_eq!(field.offset(), 3 * WORD);
        assert!(rec.find_word(0x1234_5678).is_none());
    }

    #[test]
    fn find_ints_lists_every_match() {
        let mut buf = buffer();
        buf[1] = 7;
        buf[5] = 7;
        let rec = record_of(&mut buf);
        let hits: Vec<usize> = rec.find_ints(7).map(IntField::offset).collect();
        // Little- or big-endian, each word holding 7 yields exactly one hit.
        assert_eq!(hits.len(), 2);
        assert!(hits[0] < hits[1]);
        assert!(hits.iter().all(|&o| rec.int(IntField::new(o).expect("aligned")) == 7));
    }

    #[test]
    fn set_word_writes_through() {
        let mut buf = buffer();
        let rec = record_of(&mut buf);
        let field = WordField::new(2 * WORD).expect("aligned");
        rec.set_word(field, 42);
        assert_eq!(rec.word(field), 42);
        assert_eq!(buf[2], 42);
    }

    #[test]
    fn overlap_detection() {
        let field = WordField::new(WORD).expect("aligned");
        assert!(field.overlaps(WORD, INT));
        assert!(field.overlaps(2 * WORD - INT, INT));
        assert!(!field.overlaps(2 * WORD, INT));
        assert!(!field.overlaps(0, WORD));
    }

    #[test]
    fn zero_callback_slots_have_no_handler() {
        let mut buf = buffer();
        let rec = record_of(&mut buf);
        let field = WordField::new(0).expect("aligned");
        assert!(rec.click_handler(field).is_none());
        assert!(rec.cursor_handler(field).is_none());
        assert!(DrawHandler::from_word(0).is_none());
    }
}
