// ── Layout discovery ──────────────────────────────────────────────────────────
//
// Learns where the host keeps list links, callback pointers and the owning
// module id inside its window record, using nothing but documented calls:
//
//   1. Create two probe windows (anchor + companion) with the same, unique
//      callback pointers and unusual geometry.
//   2. The host splices both into its doubly linked window list, so the
//      companion's address appears in the anchor's record (next link) and
//      vice versa (prev link).
//   3. The probe callbacks' addresses appear in the anchor's record.
//   4. The owner id comes from a cataloged signature, or failing that from a
//      scan for our own module id.
//
// The anchor survives discovery and becomes the registry's traversal root;
// the companion is destroyed before `discover` returns.

use std::ffi::{c_char, c_int, c_void};
use std::sync::atomic::{AtomicU32, Ordering};

use crate::error::{Error, Result, UnreliableLayout};
use crate::host::{
    CallbackSlots, ClickFn, CursorFn, CursorStatus, DrawFn, Geometry, Host, ModuleId,
    MouseStatus, WindowId, WindowParams,
};
use crate::layout::{Fingerprint, LayoutOffsets, OwnerResolution, SignatureCatalog};
use crate::record::{IntField, Record, WordField, INT};
use crate::registry::walk;

// ── Probe identity ────────────────────────────────────────────────────────────

/// Geometry values nobody picks for a real window, and far above the small
/// integers the owner-id scan looks for.
const PROBE_GEOMETRY: Geometry = Geometry {
    left: 0xBABE,
    top: 0xDEAD,
    right: 0xCAFE,
    bottom: 0xF00D,
};

/// Touched by every probe callback.  Each probe adds a different amount so
/// that no two have identical machine code: the linker may fold identical
/// functions into one address, which would make the slots indistinguishable.
static PROBE_CALLS: AtomicU32 = AtomicU32::new(0);

extern "C" fn probe_draw(_window: WindowId, _refcon: *mut c_void) {
    PROBE_CALLS.fetch_add(1, Ordering::Relaxed);
}

extern "C" fn probe_click(
    _window: WindowId,
    _x: c_int,
    _y: c_int,
    _status: MouseStatus,
    _refcon: *mut c_void,
) -> c_int {
    PROBE_CALLS.fetch_add(2, Ordering::Relaxed);
    0
}

extern "C" fn probe_key(
    _window: WindowId,
    _key: c_char,
    _flags: c_int,
    _virtual_key: c_char,
    _refcon: *mut c_void,
    _losing_focus: c_int,
) {
    PROBE_CALLS.fetch_add(3, Ordering::Relaxed);
}

extern "C" fn probe_cursor(
    _window: WindowId,
    _x: c_int,
    _y: c_int,
    _refcon: *mut c_void,
) -> CursorStatus {
    PROBE_CALLS.fetch_add(4, Ordering::Relaxed);
    CursorStatus::DEFAULT
}

extern "C" fn probe_wheel(
    _window: WindowId,
    _x: c_int,
    _y: c_int,
    _wheel: c_int,
    _clicks: c_int,
    _refcon: *mut c_void,
) -> c_int {
    PROBE_CALLS.fetch_add(5, Ordering::Relaxed);
    0
}

extern "C" fn probe_right_click(
    _window: WindowId,
    _x: c_int,
    _y: c_int,
    _status: MouseStatus,
    _refcon: *mut c_void,
) -> c_int {
    PROBE_CALLS.fetch_add(6, Ordering::Relaxed);
    0
}

fn probe_params() -> WindowParams {
    WindowParams {
        geometry: PROBE_GEOMETRY,
        visible: false,
        callbacks: CallbackSlots {
            draw: probe_draw,
            click: probe_click,
            key: probe_key,
            cursor: probe_cursor,
            wheel: probe_wheel,
            right_click: probe_right_click,
        },
        user_data: std::ptr::null_mut(),
    }
}

// ── Options & result ──────────────────────────────────────────────────────────

/// Knobs for one discovery run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct DiscoveryOptions<'a> {
    pub(crate) catalog: &'a SignatureCatalog,
    /// When `false`, a missing signature is a hard failure.
    pub(crate) allow_weak_fallback: bool,
}

/// A successful discovery.  The caller takes ownership of `anchor`.
#[derive(Debug)]
pub(crate) struct Discovered {
    pub(crate) anchor: Record,
    pub(crate) layout: LayoutOffsets,
    pub(crate) owner: OwnerResolution,
    pub(crate) warning: Option<UnreliableLayout>,
}

// ── Probe windows ─────────────────────────────────────────────────────────────

/// RAII pair of probe windows.  Dropping destroys the companion, and the
/// anchor too unless `into_anchor` released it to the caller.
struct Probes<'h, H: Host> {
    host: &'h H,
    anchor: Record,
    companion: Record,
    keep_anchor: bool,
}

impl<'h, H: Host> Probes<'h, H> {
    fn create(host: &'h H) -> Result<Self> {
        let params = probe_params();

        let anchor = host
            .create_window(&params)
            .and_then(Record::of)
            .ok_or(Error::HostRefused {
                function: "XPLMCreateWindowEx (anchor)",
            })?;

        let Some(companion) = host.create_window(&params).and_then(Record::of) else {
            host.destroy_window(anchor.window());
            return Err(Error::HostRefused {
                function: "XPLMCreateWindowEx (companion)",
            });
        };

        Ok(Self {
            host,
            anchor,
            companion,
            keep_anchor: false,
        })
    }

    /// Destroy the companion and hand the anchor to the caller.
    fn into_anchor(mut self) -> Record {
        self.keep_anchor = true;
        self.anchor
    }
}

impl<H: Host> Drop for Probes<'_, H> {
    fn drop(&mut self) {
        // Destroying only unlinks; the companion's record stays readable, but
        // nothing reads it after this point.
        self.host.destroy_window(self.companion.window());
        if !self.keep_anchor {
            self.host.destroy_window(self.anchor.window());
        }
    }
}

// ── Discovery ─────────────────────────────────────────────────────────────────

/// Run layout discovery against `host`.
///
/// On failure no window is left behind and no layout is produced.
pub(crate) fn discover<H: Host>(host: &H, options: DiscoveryOptions<'_>) -> Result<Discovered> {
    log::debug!("probing host window record layout");

    let probes = Probes::create(host)?;
    let fingerprint = find_pointer_fields(&probes)?;
    log::debug!(
        "pointer fields: prev={} next={} click={} cursor={} draw={}",
        fingerprint.prev_link,
        fingerprint.next_link,
        fingerprint.click_callback,
        fingerprint.cursor_callback,
        fingerprint.draw_callback
    );

    let my_id = host.my_module_id();
    let words = word_fields(&fingerprint)?;

    let (layout, owner, warning) =
        match owner_from_signature(options.catalog, &fingerprint, probes.anchor, my_id) {
            Some((layout, host_version)) => {
                log::info!("window layout matches cataloged host \"{host_version}\"");
                (layout, OwnerResolution::Signature { host_version }, None)
            }
            None if !options.allow_weak_fallback => {
                log::error!("no cataloged signature matches and the owner-id scan is disabled");
                return Err(Error::DiscoveryFailed {
                    field: "owner id (no matching signature)",
                });
            }
            None => {
                let others = other_windows(&probes, &fingerprint)?;
                let scan = owner_from_scan(probes.anchor, probes.companion, &words, my_id, &others)
                    .ok_or(Error::DiscoveryFailed { field: "owner id" })?;
                let layout = LayoutOffsets::new(fingerprint, scan.offset.offset())
                    .ok_or(Error::DiscoveryFailed { field: "owner id" })?;
                let warning = UnreliableLayout {
                    owner_offset: scan.offset.offset(),
                    verified: scan.verified,
                    small_module_id: my_id.0 <= 1,
                };
                (
                    layout,
                    OwnerResolution::Fallback {
                        verified: scan.verified,
                    },
                    Some(warning),
                )
            }
        };

    let anchor = probes.into_anchor();
    log::debug!("window layout: {layout}");

    Ok(Discovered {
        anchor,
        layout,
        owner,
        warning,
    })
}

/// Steps 2 and 3: list links and callback slots, by exact address match.
fn find_pointer_fields<H: Host>(probes: &Probes<'_, H>) -> Result<Fingerprint> {
    let anchor = probes.anchor;
    let companion = probes.companion;

    let find = |record: Record, needle: usize, field: &'static str| {
        record
            .find_word(needle)
            .map(WordField::offset)
            .ok_or(Error::DiscoveryFailed { field })
    };

    let next_link = find(anchor, companion.window().addr(), "next link")?;
    let prev_link = find(companion, anchor.window().addr(), "previous link")?;
    let click_callback = find(anchor, probe_click as ClickFn as usize, "click callback")?;
    let cursor_callback = find(anchor, probe_cursor as CursorFn as usize, "cursor callback")?;
    let draw_callback = find(anchor, probe_draw as DrawFn as usize, "draw callback")?;

    Ok(Fingerprint {
        prev_link,
        next_link,
        click_callback,
        cursor_callback,
        draw_callback,
    })
}

fn word_fields(fingerprint: &Fingerprint) -> Result<[WordField; 5]> {
    let field = |offset| {
        WordField::new(offset).ok_or(Error::DiscoveryFailed {
            field: "pointer field",
        })
    };
    let words = [
        field(fingerprint.prev_link)?,
        field(fingerprint.next_link)?,
        field(fingerprint.click_callback)?,
        field(fingerprint.cursor_callback)?,
        field(fingerprint.draw_callback)?,
    ];
    for (i, w) in words.iter().enumerate() {
        if words[i + 1..].contains(w) {
            // Two probes resolved to the same slot: the host stores something
            // other than what we think, so none of the offsets can be trusted.
            return Err(Error::DiscoveryFailed {
                field: "distinct pointer fields",
            });
        }
    }
    Ok(words)
}

/// Every listed window except our two probes.
fn other_windows<H: Host>(probes: &Probes<'_, H>, fingerprint: &Fingerprint) -> Result<Vec<Record>> {
    let prev = WordField::new(fingerprint.prev_link);
    let next = WordField::new(fingerprint.next_link);
    let (Some(prev), Some(next)) = (prev, next) else {
        return Err(Error::DiscoveryFailed { field: "list links" });
    };

    let companion = probes.companion.window();
    Ok(walk(probes.anchor, prev)
        .into_iter()
        .chain(walk(probes.anchor, next))
        .filter(|&w| w != companion)
        .filter_map(Record::of)
        .collect())
}

// ── Owner id: signature shortcut ──────────────────────────────────────────────

/// Step 5a.  `None` when no entry matches or the entry is stale.
fn owner_from_signature(
    catalog: &SignatureCatalog,
    fingerprint: &Fingerprint,
    anchor: Record,
    my_id: ModuleId,
) -> Option<(LayoutOffsets, String)> {
    let signature = catalog.lookup(fingerprint)?;

    let Some(layout) = LayoutOffsets::new(*fingerprint, signature.owner_id) else {
        log::warn!(
            "cataloged signature \"{}\" has an unusable owner offset {}",
            signature.host_version,
            signature.owner_id
        );
        return None;
    };

    // One read, not a scan: the anchor is ours, so the field must hold our id.
    let found = anchor.int(layout.owner_field());
    if found != my_id.0 {
        log::warn!(
            "cataloged signature \"{}\" looks stale (owner field holds {found}, expected {})",
            signature.host_version,
            my_id.0
        );
        return None;
    }

    Some((layout, signature.host_version.clone()))
}

// ── Owner id: weak fallback ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScanResult {
    offset: IntField,
    verified: bool,
}

/// Step 5b.  Look for our own module id as a plain integer.
///
/// Small integers collide with flags, counters and enum fields, so a
/// candidate must hold our id in both probe records and must not overlap a
/// pointer field.  A candidate is "verified" when at least one other window
/// holds a different value there, which an unrelated constant field would
/// not.  The first verified candidate wins; otherwise the first candidate.
fn owner_from_scan(
    anchor: Record,
    companion: Record,
    words: &[WordField],
    my_id: ModuleId,
    others: &[Record],
) -> Option<ScanResult> {
    if my_id.0 <= 1 {
        log::warn!(
            "scanning for module id {} is unreliable; install more plugins",
            my_id.0
        );
    }

    let candidates: Vec<IntField> = anchor
        .find_ints(my_id.0)
        .filter(|f| companion.int(*f) == my_id.0)
        .filter(|f| !words.iter().any(|w| w.overlaps(f.offset(), INT)))
        .collect();
    log::debug!(
        "owner id candidates: {:?}",
        candidates.iter().map(|f| f.offset()).collect::<Vec<_>>()
    );

    let verified = candidates
        .iter()
        .copied()
        .find(|&f| others.iter().any(|r| r.int(f) != my_id.0));

    match (verified, candidates.first()) {
        (Some(offset), _) => Some(ScanResult {
            offset,
            verified: true,
        }),
        (None, Some(&offset)) => Some(ScanResult {
            offset,
            verified: false,
        }),
        (None, None) => None,
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
