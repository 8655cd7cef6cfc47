//! Dota 2 installation layout.
//!
//! Every artifact the doctor inspects lives at a fixed path relative to the
//! game root (the folder that contains `game/`). The names are engine-level
//! and must not change, otherwise an existing install stops being recognised.

use std::path::{Path, PathBuf};

/// Version descriptor shipped by Steam.
pub const STEAM_INF: &str = "game/dota/steam.inf";

/// Last-patched record written by the patcher.
pub const VERSION_CACHE: &str = "game/_ArdysaMods/version.json";

/// Packaged modspack.
pub const MOD_VPK: &str = "game/_ArdysaMods/pak01_dir.vpk";

/// Branch-specific gameinfo that the patcher injects the mod search path into.
pub const GAMEINFO_BRANCH: &str = "game/dota/gameinfo_branchspecific.gi";

/// Signature file the engine checks gameinfo against.
pub const SIGNATURES: &str = "game/bin/win64/dota.signatures";

/// Marker the patcher leaves in `gameinfo_branchspecific.gi`.
pub const DEFAULT_MOD_MARKER: &str = "_Ardysa";

/// Line the patcher writes into `dota.signatures` for the current patch format.
pub const DEFAULT_SIGNATURE_MARKER: &str =
    "DOTA_ARDYSA_PATCH gameinfo_branchspecific.gi~SHA1:ARDYSA;CRC:ARDYSA";

/// Resolved artifact paths for one game installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameLayout {
    root: PathBuf,
}

impl GameLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The game root this layout was built from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn steam_inf(&self) -> PathBuf {
        self.root.join(STEAM_INF)
    }

    pub fn version_cache(&self) -> PathBuf {
        self.root.join(VERSION_CACHE)
    }

    pub fn mod_vpk(&self) -> PathBuf {
        self.root.join(MOD_VPK)
    }

    pub fn gameinfo_branch(&self) -> PathBuf {
        self.root.join(GAMEINFO_BRANCH)
    }

    pub fn signatures(&self) -> PathBuf {
        self.root.join(SIGNATURES)
    }
}

/// Content markers the patcher leaves behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    /// Substring expected in the branch gameinfo
    pub mod_marker: String,
    /// Exact patch-format line expected in the signatures file
    pub signature_marker: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            mod_marker: DEFAULT_MOD_MARKER.to_string(),
            signature_marker: DEFAULT_SIGNATURE_MARKER.to_string(),
        }
    }
}

/// Returns true if the file at `path` contains `needle`.
///
/// Missing or unreadable files count as "does not contain". Signature files
/// carry binary noise, so the content is decoded lossily.
pub async fn file_contains(path: &Path, needle: &str) -> bool {
    match tokio::fs::read(path).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).contains(needle),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_layout_paths() {
        let layout = GameLayout::new("/games/dota 2 beta");
        assert_eq!(
            layout.steam_inf(),
            PathBuf::from("/games/dota 2 beta/game/dota/steam.inf")
        );
        assert_eq!(
            layout.mod_vpk(),
            PathBuf::from("/games/dota 2 beta/game/_ArdysaMods/pak01_dir.vpk")
        );
        assert_eq!(
            layout.signatures(),
            PathBuf::from("/games/dota 2 beta/game/bin/win64/dota.signatures")
        );
        assert_eq!(layout.root(), Path::new("/games/dota 2 beta"));
    }

    #[test]
    fn test_default_markers() {
        let markers = Markers::default();
        assert_eq!(markers.mod_marker, "_Ardysa");
        assert!(!markers.signature_marker.is_empty());
    }

    #[tokio::test]
    async fn test_file_contains() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("gameinfo_branchspecific.gi");

        assert!(!file_contains(&path, "_Ardysa").await);

        let mut content = b"\"GameInfo\"\n{\n\tGame\t_Ardysa\n".to_vec();
        content.extend_from_slice(&[0xff, 0xfe, 0x00]);
        std::fs::write(&path, content).unwrap();

        assert!(file_contains(&path, "_Ardysa").await);
        assert!(!file_contains(&path, "_Other").await);
    }
}
