// ── In-memory fake host ───────────────────────────────────────────────────────
//
// Test-only implementation of `Host` over fixed-size records with its own
// intrusive doubly linked window list.  Where each field lives inside a record
// is decided by a `TrueLayout`, fixed or randomized, so discovery can be
// checked against ground truth.
//
// Records are leaked on purpose: the real host keeps destroyed records
// mapped, and the registry relies on that.

#![allow(unsafe_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::ffi::{c_char, c_int, c_void};
use std::rc::Rc;

use rand::seq::SliceRandom;
use rand::Rng;

use crate::host::{
    CursorStatus, DrawFn, Host, ModuleId, MouseStatus, WindowId, WindowParams,
};
use crate::layout::Fingerprint;
use crate::record::{INT, RECORD_SIZE, WORD};

const SLOTS: usize = RECORD_SIZE / WORD;

// ── Ground truth ──────────────────────────────────────────────────────────────

/// Where the fake host keeps each field (byte offsets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TrueLayout {
    pub prev: usize,
    pub next: usize,
    pub draw: usize,
    pub click: usize,
    pub key: usize,
    pub cursor: usize,
    pub wheel: usize,
    pub right_click: usize,
    pub refcon: usize,
    pub left: usize,
    pub top: usize,
    pub right: usize,
    pub bottom: usize,
    pub visible: usize,
    pub owner: usize,
}

impl TrueLayout {
    fn from_parts(words: [usize; 9], ints: [usize; 6]) -> Self {
        let [prev, next, draw, click, key, cursor, wheel, right_click, refcon] = words;
        let [left, top, right, bottom, visible, owner] = ints;
        Self {
            prev,
            next,
            draw,
            click,
            key,
            cursor,
            wheel,
            right_click,
            refcon,
            left,
            top,
            right,
            bottom,
            visible,
            owner,
        }
    }

    /// Pointers first in declaration order, integers packed after them.
    pub(crate) fn fixed() -> Self {
        let words: [usize; 9] = std::array::from_fn(|i| i * WORD);
        let ints: [usize; 6] = std::array::from_fn(|i| 9 * WORD + i * INT);
        Self::from_parts(words, ints)
    }

    /// Pointer fields on random word slots, integer fields on random integer
    /// slots among the words left over.
    pub(crate) fn random(rng: &mut impl Rng) -> Self {
        let mut slots: Vec<usize> = (0..SLOTS).collect();
        slots.shuffle(rng);
        let words: [usize; 9] = std::array::from_fn(|i| slots[i] * WORD);

        let mut int_slots: Vec<usize> = slots[9..]
            .iter()
            .flat_map(|&s| (0..WORD / INT).map(move |k| s * WORD + k * INT))
            .collect();
        int_slots.shuffle(rng);
        let ints: [usize; 6] = std::array::from_fn(|i| int_slots[i]);

        Self::from_parts(words, ints)
    }

    pub(crate) fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            prev_link: self.prev,
            next_link: self.next,
            click_callback: self.click,
            cursor_callback: self.cursor,
            draw_callback: self.draw,
        }
    }

    /// Whether an `INT` at `offset` would touch any field of this layout.
    pub(crate) fn occupies(&self, offset: usize) -> bool {
        let words = [
            self.prev,
            self.next,
            self.draw,
            self.click,
            self.key,
            self.cursor,
            self.wheel,
            self.right_click,
            self.refcon,
        ];
        let ints = [self.left, self.top, self.right, self.bottom, self.visible, self.owner];
        words.iter().any(|&w| offset < w + WORD && w < offset + INT)
            || ints.iter().any(|&i| offset < i + INT && i < offset + INT)
    }
}

// ── Raw record access ─────────────────────────────────────────────────────────

fn write_word(window: WindowId, offset: usize, value: usize) {
    // SAFETY: window is a leaked SLOTS-word allocation made by this module;
    // offset + WORD <= RECORD_SIZE for every TrueLayout field.
    unsafe {
        window
            .as_raw()
            .cast::<u8>()
            .add(offset)
            .cast::<usize>()
            .write_unaligned(value);
    }
}

fn read_word(window: WindowId, offset: usize) -> usize {
    // SAFETY: as write_word.
    unsafe { window.as_raw().cast::<u8>().add(offset).cast::<usize>().read_unaligned() }
}

fn write_int(window: WindowId, offset: usize, value: c_int) {
    // SAFETY: as write_word, for an INT-sized field.
    unsafe {
        window
            .as_raw()
            .cast::<u8>()
            .add(offset)
            .cast::<c_int>()
            .write_unaligned(value);
    }
}

fn read_int(window: WindowId, offset: usize) -> c_int {
    // SAFETY: as write_int.
    unsafe { window.as_raw().cast::<u8>().add(offset).cast::<c_int>().read_unaligned() }
}

fn link_of(window: WindowId, offset: usize) -> WindowId {
    WindowId::from_raw(read_word(window, offset) as *mut c_void)
}

// ── Counting callbacks for "other plugins'" windows ───────────────────────────

/// What happened to a spawned window.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub clicks: Cell<u32>,
    pub cursor_moves: Cell<u32>,
    pub draws: Cell<u32>,
    pub last_click: Cell<Option<(c_int, c_int, MouseStatus)>>,
}

fn counters_of(refcon: *mut c_void) -> &'static Counters {
    // SAFETY: spawned windows get a leaked `Counters` as their refcon.
    unsafe { &*refcon.cast::<Counters>() }
}

extern "C" fn counting_draw(_window: WindowId, refcon: *mut c_void) {
    let c = counters_of(refcon);
    c.draws.set(c.draws.get() + 1);
}

extern "C" fn counting_click(
    _window: WindowId,
    x: c_int,
    y: c_int,
    status: MouseStatus,
    refcon: *mut c_void,
) -> c_int {
    let c = counters_of(refcon);
    c.clicks.set(c.clicks.get() + 1);
    c.last_click.set(Some((x, y, status)));
    1
}

extern "C" fn counting_cursor(
    _window: WindowId,
    _x: c_int,
    _y: c_int,
    refcon: *mut c_void,
) -> CursorStatus {
    let c = counters_of(refcon);
    c.cursor_moves.set(c.cursor_moves.get() + 1);
    CursorStatus::ARROW
}

extern "C" fn ignore_key(
    _window: WindowId,
    _key: c_char,
    _flags: c_int,
    _virtual_key: c_char,
    _refcon: *mut c_void,
    _losing_focus: c_int,
) {
}

extern "C" fn ignore_wheel(
    _window: WindowId,
    _x: c_int,
    _y: c_int,
    _wheel: c_int,
    _clicks: c_int,
    _refcon: *mut c_void,
) -> c_int {
    0
}

extern "C" fn ignore_right_click(
    _window: WindowId,
    _x: c_int,
    _y: c_int,
    _status: MouseStatus,
    _refcon: *mut c_void,
) -> c_int {
    0
}

// ── FakeHost ──────────────────────────────────────────────────────────────────

struct State {
    layout: TrueLayout,
    module_id: c_int,
    link: bool,
    hide_owner: Cell<bool>,
    refuse_after: Cell<Option<usize>>,
    created: Cell<usize>,
    destroyed: Cell<usize>,
    tail: Cell<WindowId>,
    live: RefCell<Vec<WindowId>>,
    counters: RefCell<HashMap<WindowId, &'static Counters>>,
}

/// Cheap to clone; clones share the same windows.
#[derive(Clone)]
pub(crate) struct FakeHost {
    state: Rc<State>,
}

impl FakeHost {
    pub(crate) fn new(layout: TrueLayout, module_id: c_int) -> Self {
        Self::build(layout, module_id, true)
    }

    /// A host that never writes list links, i.e. a record layout discovery
    /// cannot understand.
    pub(crate) fn without_links(layout: TrueLayout, module_id: c_int) -> Self {
        Self::build(layout, module_id, false)
    }

    fn build(layout: TrueLayout, module_id: c_int, link: bool) -> Self {
        Self {
            state: Rc::new(State {
                layout,
                module_id,
                link,
                hide_owner: Cell::new(false),
                refuse_after: Cell::new(None),
                created: Cell::new(0),
                destroyed: Cell::new(0),
                tail: Cell::new(WindowId::NULL),
                live: RefCell::new(Vec::new()),
                counters: RefCell::new(HashMap::new()),
            }),
        }
    }

    fn allocate(&self, params: &WindowParams, owner: c_int) -> WindowId {
        let s = &self.state;
        let l = &s.layout;
        let raw = Box::into_raw(Box::new([0usize; SLOTS]));
        let w = WindowId::from_raw(raw.cast());

        let cb = &params.callbacks;
        write_word(w, l.draw, cb.draw as usize);
        write_word(w, l.click, cb.click as usize);
        write_word(w, l.key, cb.key as usize);
        write_word(w, l.cursor, cb.cursor as usize);
        write_word(w, l.wheel, cb.wheel as usize);
        write_word(w, l.right_click, cb.right_click as usize);
        write_word(w, l.refcon, params.user_data as usize);
        write_int(w, l.left, params.geometry.left);
        write_int(w, l.top, params.geometry.top);
        write_int(w, l.right, params.geometry.right);
        write_int(w, l.bottom, params.geometry.bottom);
        write_int(w, l.visible, c_int::from(params.visible));
        write_int(w, l.owner, owner);

        if s.link {
            let tail = s.tail.get();
            write_word(w, l.prev, tail.addr());
            if !tail.is_null() {
                write_word(tail, l.next, w.addr());
            }
            s.tail.set(w);
        }
        s.live.borrow_mut().push(w);
        s.created.set(s.created.get() + 1);
        w
    }

    /// Create a window on behalf of another module, with counting handlers.
    pub(crate) fn spawn(&self, owner: c_int, visible: bool) -> WindowId {
        let counters: &'static Counters = Box::leak(Box::default());
        let params = WindowParams {
            geometry: crate::host::Geometry {
                left: 100,
                top: 400,
                right: 300,
                bottom: 200,
            },
            visible,
            callbacks: crate::host::CallbackSlots {
                draw: counting_draw,
                click: counting_click,
                key: ignore_key,
                cursor: counting_cursor,
                wheel: ignore_wheel,
                right_click: ignore_right_click,
            },
            user_data: (counters as *const Counters).cast_mut().cast(),
        };
        let w = self.allocate(&params, owner);
        self.state.counters.borrow_mut().insert(w, counters);
        w
    }

    pub(crate) fn counters(&self, window: WindowId) -> &'static Counters {
        self.state
            .counters
            .borrow()
            .get(&window)
            .copied()
            .expect("window was spawned")
    }

    /// One host draw pass over `window`: call whatever its draw slot holds.
    pub(crate) fn draw(&self, window: WindowId) {
        let slot = self.draw_slot(window);
        if slot == 0 {
            return;
        }
        // SAFETY: draw slots only ever hold DrawFn pointers (our own or the
        // trampoline written by the registry).
        let f = unsafe { std::mem::transmute::<usize, DrawFn>(slot) };
        let refcon = read_word(window, self.state.layout.refcon) as *mut c_void;
        // SAFETY: called like the host would, on this (the render) thread.
        unsafe { f(window, refcon) }
    }

    pub(crate) fn draw_slot(&self, window: WindowId) -> usize {
        read_word(window, self.state.layout.draw)
    }

    pub(crate) fn set_visible(&self, window: WindowId, visible: bool) {
        write_int(window, self.state.layout.visible, c_int::from(visible));
    }

    /// Point `window`'s next link at `target`, e.g. to build a cycle.
    pub(crate) fn corrupt_next(&self, window: WindowId, target: WindowId) {
        write_word(window, self.state.layout.next, target.addr());
    }

    /// Windows created and not yet destroyed, in creation order.
    pub(crate) fn live_windows(&self) -> Vec<WindowId> {
        self.state.live.borrow().clone()
    }

    pub(crate) fn destroyed_count(&self) -> usize {
        self.state.destroyed.get()
    }

    /// Let `n` more creations succeed, then refuse.
    pub(crate) fn refuse_after(&self, n: usize) {
        self.state.refuse_after.set(Some(self.state.created.get() + n));
    }

    /// Store a different id than `my_module_id` in windows we create.
    pub(crate) fn hide_owner_ids(&self) {
        self.state.hide_owner.set(true);
    }
}

// SAFETY: every handle is a leaked RECORD_SIZE allocation that is never
// freed, and list links only ever point at such handles.
unsafe impl Host for FakeHost {
    fn create_window(&self, params: &WindowParams) -> Option<WindowId> {
        let s = &self.state;
        if s.refuse_after.get().is_some_and(|limit| s.created.get() >= limit) {
            return None;
        }
        let owner = if s.hide_owner.get() {
            s.module_id + 1000
        } else {
            s.module_id
        };
        Some(self.allocate(params, owner))
    }

    fn destroy_window(&self, window: WindowId) {
        let s = &self.state;
        let l = &s.layout;

        if s.link {
            // Unlink only; the record keeps its own stale links, as the real
            // host does.
            let prev = link_of(window, l.prev);
            let next = link_of(window, l.next);
            if !prev.is_null() {
                write_word(prev, l.next, next.addr());
            }
            if next.is_null() {
                s.tail.set(prev);
            } else {
                write_word(next, l.prev, prev.addr());
            }
        }

        s.live.borrow_mut().retain(|&w| w != window);
        s.destroyed.set(s.destroyed.get() + 1);
    }

    fn user_data(&self, window: WindowId) -> *mut c_void {
        read_word(window, self.state.layout.refcon) as *mut c_void
    }

    fn is_visible(&self, window: WindowId) -> bool {
        read_int(window, self.state.layout.visible) != 0
    }

    fn my_module_id(&self) -> ModuleId {
        ModuleId(self.state.module_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn random_layouts_never_overlap() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..64 {
            let l = TrueLayout::random(&mut rng);
            let mut spans = vec![
                (l.prev, WORD),
                (l.next, WORD),
                (l.draw, WORD),
                (l.click, WORD),
                (l.key, WORD),
                (l.cursor, WORD),
                (l.wheel, WORD),
                (l.right_click, WORD),
                (l.refcon, WORD),
                (l.left, INT),
                (l.top, INT),
                (l.right, INT),
                (l.bottom, INT),
                (l.visible, INT),
                (l.owner, INT),
            ];
            spans.sort_unstable();
            for pair in spans.windows(2) {
                assert!(pair[0].0 + pair[0].1 <= pair[1].0, "{pair:?}");
            }
            assert!(spans.iter().all(|&(o, len)| o + len <= RECORD_SIZE));
        }
    }

    #[test]
    fn destroy_unlinks_but_keeps_the_record() {
        let host = FakeHost::new(TrueLayout::fixed(), 7);
        let a = host.spawn(1, true);
        let b = host.spawn(2, true);
        let c = host.spawn(3, true);
        let l = TrueLayout::fixed();

        host.destroy_window(b);
        assert_eq!(link_of(a, l.next), c);
        assert_eq!(link_of(c, l.prev), a);
        assert_eq!(link_of(b, l.next), c, "stale link left in place");
        assert_eq!(host.live_windows(), vec![a, c]);
    }
}
