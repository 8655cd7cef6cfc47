//! `steam.inf` parsing.
//!
//! The descriptor is a flat `Key=Value` file. Only two keys matter here:
//! `VersionDate` (the patch date Valve uses as the public version) and
//! `ClientVersion` (the numeric build).

use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Placeholder for a field the descriptor does not carry.
pub const UNKNOWN: &str = "Unknown";

/// Ground-truth version read from the game's own descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameVersion {
    pub version: String,
    pub build: String,
}

impl std::fmt::Display for GameVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (build {})", self.version, self.build)
    }
}

/// Extracts version and build from descriptor text.
///
/// Returns `None` when neither key is present, since that means the file is
/// not a version descriptor at all. A single missing key resolves to
/// [`UNKNOWN`].
pub fn parse_descriptor(content: &str) -> Option<GameVersion> {
    static VERSION_RE: OnceLock<Regex> = OnceLock::new();
    static BUILD_RE: OnceLock<Regex> = OnceLock::new();

    let version_re = VERSION_RE
        .get_or_init(|| Regex::new(r"(?m)^[ \t]*VersionDate[ \t]*=[ \t]*([^\r\n]*?)[ \t\r]*$").unwrap());
    let build_re =
        BUILD_RE.get_or_init(|| Regex::new(r"(?m)^[ \t]*ClientVersion[ \t]*=[ \t]*(\d+)").unwrap());

    let version = version_re
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|v| !v.is_empty());
    let build = build_re
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string());

    if version.is_none() && build.is_none() {
        return None;
    }

    Some(GameVersion {
        version: version.unwrap_or_else(|| UNKNOWN.to_string()),
        build: build.unwrap_or_else(|| UNKNOWN.to_string()),
    })
}

/// Reads and parses the descriptor at `path`.
///
/// `None` means the path does not point at a usable installation.
pub async fn read_version_descriptor(path: &Path) -> Option<GameVersion> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!("Cannot read version descriptor {}: {}", path.display(), e);
            return None;
        }
    };

    let parsed = parse_descriptor(&String::from_utf8_lossy(&bytes));
    if parsed.is_none() {
        debug!("No version keys in {}", path.display());
    }
    parsed
}
