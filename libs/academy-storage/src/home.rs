use std::path::PathBuf;

/// File name of the session store inside the home directory.
pub const DEFAULT_STORAGE_FILE: &str = "storage.json";

/// Default home directory: `~/.academy`, or `./.academy` when the user home
/// cannot be determined.
#[must_use]
pub fn default_home_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".academy")
}

/// Expand a leading `~` to the user home directory.
///
/// Paths without the prefix are returned unchanged, as is `~` itself when the
/// home directory is unknown.
#[must_use]
pub fn expand_tilde(raw: &str) -> PathBuf {
    let Some(home) = dirs::home_dir() else {
        return PathBuf::from(raw);
    };
    if raw == "~" {
        home
    } else if let Some(rest) = raw.strip_prefix("~/") {
        home.join(rest)
    } else {
        PathBuf::from(raw)
    }
}
