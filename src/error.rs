// ── Central error type ────────────────────────────────────────────────────────
//
// All fallible operations in movevr return `error::Result<T>`.  No panics in
// production paths; the plugin entry points log errors and keep the host
// running (a discovery failure means "feature unavailable", not a crash).

/// Every error that movevr can produce.
#[derive(Debug)]
pub enum Error {
    /// A required field of the host's window record could not be located.
    ///
    /// Fatal to registry construction.  Retrying in the same process is
    /// pointless: it means the host version lays out its records differently.
    DiscoveryFailed {
        /// Which field was not found, for display purposes.
        field: &'static str,
    },

    /// A host call that should produce a resource returned nothing.
    /// Treated like `DiscoveryFailed` when it happens during discovery.
    HostRefused {
        /// The name of the failing host function.
        function: &'static str,
    },

    /// A null (or otherwise unusable) window handle was passed in.
    InvalidHandle,

    /// Another registry already owns the draw trampoline on this thread.
    RegistryActive,

    /// The render-thread queue was dropped; the command was not delivered.
    QueueClosed,

    /// A standard I/O error (config file read).
    Io(std::io::Error),

    /// The config file is not valid JSON for `config::Config`.
    Json(serde_json::Error),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DiscoveryFailed { field } => {
                write!(f, "window layout discovery failed: {field} not found")
            }
            Self::HostRefused { function } => write!(f, "{function} failed"),
            Self::InvalidHandle => write!(f, "invalid window handle"),
            Self::RegistryActive => {
                write!(f, "another window registry is already active on this thread")
            }
            Self::QueueClosed => write!(f, "render queue is closed"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Json(e) => write!(f, "config error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

// ── Diagnostics ───────────────────────────────────────────────────────────────

/// The owner-id offset was found by the small-integer scan rather than a
/// cataloged signature.
///
/// Not an error: the registry is usable, but `owner_of` results for this run
/// are best-effort.  Reported once, when the registry is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnreliableLayout {
    /// The offset that was picked.
    pub owner_offset: usize,
    /// `true` when some other window held a different value at that offset.
    pub verified: bool,
    /// `true` when the caller's own module id was 0 or 1, which collides
    /// with flags and counters all over the record.
    pub small_module_id: bool,
}

impl std::fmt::Display for UnreliableLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "owner id offset {} guessed from our own module id",
            self.owner_offset
        )?;
        if !self.verified {
            write!(f, ", no other plugin's window to cross-check against")?;
        }
        if self.small_module_id {
            write!(f, ", module id is very small (install more plugins)")?;
        }
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discovery_failure_names_the_field() {
        let e = Error::DiscoveryFailed { field: "next link" };
        assert_eq!(e.to_string(), "window layout discovery failed: next link not found");
    }

    #[test]
    fn json_errors_keep_their_source() {
        let json_err = serde_json::from_str::<u32>("nope").unwrap_err();
        let e = Error::from(json_err);
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn unreliable_layout_mentions_every_caveat() {
        let w = UnreliableLayout {
            owner_offset: 44,
            verified: false,
            small_module_id: true,
        };
        let text = w.to_string();
        assert!(text.contains("44"));
        assert!(text.contains("cross-check"));
        assert!(text.contains("very small"));
    }
}
