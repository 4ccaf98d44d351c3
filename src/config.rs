// ── Plugin configuration ──────────────────────────────────────────────────────
//
// Reads `movevr.json` from the plugin's own directory.
// No `unsafe`: pure safe Rust + serde_json.

use std::{fs, path::Path, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::layout::{Signature, SignatureCatalog};

// ── On-disk types ─────────────────────────────────────────────────────────────

/// Root of the JSON config file.  Every field except `version` may be
/// omitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub version: u32,
    /// `off`, `error`, `warn`, `info`, `debug` or `trace`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Allow the owner-id scan when no signature matches.
    #[serde(default = "default_true")]
    pub allow_weak_owner_fallback: bool,
    /// Host builds whose owner-id offset is known.
    #[serde(default)]
    pub signatures: Vec<Signature>,
}

fn default_log_level() -> String {
    "info".to_owned()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            log_level: default_log_level(),
            allow_weak_owner_fallback: true,
            signatures: Vec::new(),
        }
    }
}

impl Config {
    /// The configured signatures as a lookup catalog.
    pub fn catalog(&self) -> SignatureCatalog {
        SignatureCatalog::new(self.signatures.clone())
    }

    /// `log_level` parsed for the `log` crate.  Unknown names fall back to
    /// `Info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

// ── Format version ────────────────────────────────────────────────────────────

const CONFIG_VERSION: u32 = 1;

pub const CONFIG_FILE: &str = "movevr.json";

// ── Path ──────────────────────────────────────────────────────────────────────

/// `<dir>/movevr.json`.
pub fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

// ── Load ──────────────────────────────────────────────────────────────────────

/// Read and parse the config file.
///
/// Returns `None` on any error: file missing, JSON parse failure, or an
/// unrecognised version number.  The plugin then runs with
/// `Config::default()`.
pub fn load(path: &Path) -> Option<Config> {
    let data = fs::read(path).ok()?;
    let config: Config = match serde_json::from_slice(&data) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("ignoring {}: {e}", path.display());
            return None;
        }
    };
    if config.version != CONFIG_VERSION {
        log::warn!(
            "ignoring {}: version {} (expected {CONFIG_VERSION})",
            path.display(),
            config.version
        );
        return None;
    }
    Some(config)
}

// ── Save ──────────────────────────────────────────────────────────────────────

/// Write `config` to `path`, creating the directory if needed.
pub fn save(path: &Path, config: &Config) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let file = fs::File::create(path)?;
    serde_json::to_writer_pretty(file, config)?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
