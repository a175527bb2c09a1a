//! Backend selection flag.
//!
//! The choice between the command (subprocess) and library (libgit2) backend
//! is a persisted external setting, not state owned by this crate. It is read
//! fresh on every operation so a long-running process honors flag changes
//! immediately; nothing here caches.
//!
//! Sources, highest priority first:
//! 1. `DUOGIT_NATIVE_GIT` environment variable (`1`/`true` selects the
//!    command backend, `0`/`false` the library backend)
//! 2. TOML settings file at `$DUOGIT_SETTINGS`, falling back to
//!    `~/.config/duogit/settings.toml`
//! 3. Default: library backend

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Which implementation executes a given operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// External `git` executable invoked as a subprocess
    Command,
    /// In-process libgit2 via the git2 crate
    Library,
}

/// Persisted settings, deserialized from the settings file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// When true, operations run through the external git executable
    #[serde(default)]
    pub enable_native_git: bool,
}

/// Path of the settings file, honoring the `DUOGIT_SETTINGS` override.
fn settings_path() -> Option<PathBuf> {
    if let Ok(path) = env::var("DUOGIT_SETTINGS") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|d| d.join("duogit").join("settings.toml"))
}

/// Read the settings file. A missing or unparsable file yields defaults;
/// a parse failure is logged since it usually means a typo, not absence.
pub fn read_settings() -> Settings {
    let Some(path) = settings_path() else {
        return Settings::default();
    };
    let Ok(raw) = fs::read_to_string(&path) else {
        return Settings::default();
    };
    match toml::from_str(&raw) {
        Ok(settings) => settings,
        Err(e) => {
            log::warn!("ignoring unparsable settings file {}: {}", path.display(), e);
            Settings::default()
        }
    }
}

/// Resolve the backend for the current call.
///
/// Pure function of external configuration; called at the start of every
/// operation and never cached across calls.
pub fn resolve_backend() -> BackendKind {
    if let Ok(value) = env::var("DUOGIT_NATIVE_GIT") {
        return match value.as_str() {
            "1" | "true" | "yes" => BackendKind::Command,
            _ => BackendKind::Library,
        };
    }

    if read_settings().enable_native_git {
        BackendKind::Command
    } else {
        BackendKind::Library
    }
}
