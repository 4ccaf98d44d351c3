// ── Record layout model ───────────────────────────────────────────────────────
//
// `LayoutOffsets` is the output of discovery: where the interesting fields
// live inside the host's window record.  It can only be built through
// `LayoutOffsets::new`, which validates every offset, so a registry never
// holds a partially-valid layout.
//
// The signature catalog maps a fingerprint (the pointer-field offsets, which
// are found reliably) to an owner-id offset known to be correct for a given
// host build.

use serde::{Deserialize, Serialize};

use crate::record::{IntField, WordField, INT};

// ── LayoutOffsets ─────────────────────────────────────────────────────────────

/// Byte offsets of the fields the registry uses inside a window record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutOffsets {
    prev_link: WordField,
    next_link: WordField,
    click_callback: WordField,
    cursor_callback: WordField,
    draw_callback: WordField,
    owner_id: IntField,
}

impl LayoutOffsets {
    /// Validate and freeze a layout.
    ///
    /// Returns `None` unless every pointer field is aligned and in bounds, the
    /// pointer fields are pairwise distinct, the owner field is aligned and in
    /// bounds and does not overlap any pointer field.
    pub fn new(fingerprint: Fingerprint, owner_id: usize) -> Option<Self> {
        let words = [
            WordField::new(fingerprint.prev_link)?,
            WordField::new(fingerprint.next_link)?,
            WordField::new(fingerprint.click_callback)?,
            WordField::new(fingerprint.cursor_callback)?,
            WordField::new(fingerprint.draw_callback)?,
        ];
        for (i, a) in words.iter().enumerate() {
            if words[i + 1..].contains(a) {
                return None;
            }
        }

        let owner = IntField::new(owner_id)?;
        if words.iter().any(|w| w.overlaps(owner.offset(), INT)) {
            return None;
        }

        let [prev_link, next_link, click_callback, cursor_callback, draw_callback] = words;
        Some(Self {
            prev_link,
            next_link,
            click_callback,
            cursor_callback,
            draw_callback,
            owner_id: owner,
        })
    }

    /// The pointer-field part of the layout.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint {
            prev_link: self.prev_link.offset(),
            next_link: self.next_link.offset(),
            click_callback: self.click_callback.offset(),
            cursor_callback: self.cursor_callback.offset(),
            draw_callback: self.draw_callback.offset(),
        }
    }

    pub fn owner_id(&self) -> usize {
        self.owner_id.offset()
    }

    // Typed fields for the registry and trampoline.

    pub(crate) fn prev_field(&self) -> WordField {
        self.prev_link
    }

    pub(crate) fn next_field(&self) -> WordField {
        self.next_link
    }

    pub(crate) fn click_field(&self) -> WordField {
        self.click_callback
    }

    pub(crate) fn cursor_field(&self) -> WordField {
        self.cursor_callback
    }

    pub(crate) fn draw_field(&self) -> WordField {
        self.draw_callback
    }

    pub(crate) fn owner_field(&self) -> IntField {
        self.owner_id
    }
}

impl std::fmt::Display for LayoutOffsets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fp = self.fingerprint();
        write!(
            f,
            "prev={} next={} click={} cursor={} draw={} owner={}",
            fp.prev_link,
            fp.next_link,
            fp.click_callback,
            fp.cursor_callback,
            fp.draw_callback,
            self.owner_id()
        )
    }
}

// ── Fingerprint ───────────────────────────────────────────────────────────────

/// The pointer-field offsets of a layout.  Exact matches identify a host
/// build in the signature catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    pub prev_link: usize,
    pub next_link: usize,
    pub click_callback: usize,
    pub cursor_callback: usize,
    pub draw_callback: usize,
}

// ── Signature catalog ─────────────────────────────────────────────────────────

/// A cataloged host build: its fingerprint and the owner-id offset that goes
/// with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    /// Free-form label, e.g. `"X-Plane 11.26 x64"`.  Only used in logs.
    pub host_version: String,
    /// Pointer width the entry was recorded with.  Entries for another width
    /// never match.
    #[serde(default = "native_pointer_width")]
    pub pointer_width: usize,
    pub fingerprint: Fingerprint,
    pub owner_id: usize,
}

fn native_pointer_width() -> usize {
    crate::record::WORD
}

/// Known host builds.
///
/// Starts empty; entries come from the `signatures` list in the config file,
/// usually added after a fallback run was confirmed correct.
#[derive(Debug, Clone, Default)]
pub struct SignatureCatalog {
    entries: Vec<Signature>,
}

impl SignatureCatalog {
    pub fn new(entries: Vec<Signature>) -> Self {
        Self { entries }
    }

    pub fn push(&mut self, entry: Signature) {
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The first entry recorded for this pointer width whose fingerprint
    /// matches exactly.
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<&Signature> {
        self.entries
            .iter()
            .filter(|s| s.pointer_width == native_pointer_width())
            .find(|s| s.fingerprint == *fingerprint)
    }
}

// ── Owner resolution ──────────────────────────────────────────────────────────

/// How the owner-id offset was learned.  The two strategies carry different
/// trust and stay distinguishable for callers and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OwnerResolution {
    /// Taken from a cataloged signature.
    Signature { host_version: String },
    /// Guessed by scanning for our own module id.
    Fallback {
        /// Another window held a different value at the chosen offset.
        verified: bool,
    },
}

impl OwnerResolution {
    pub fn is_cataloged(&self) -> bool {
        matches!(self, Self::Signature { .. })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
